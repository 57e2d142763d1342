/*
 * Copyright (c) 2021 gematik GmbH
 * 
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 * 
 *    http://www.apache.org/licenses/LICENSE-2.0
 * 
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 *
 */

use resources::{
    operation_outcome::Issue,
    types::{Extension, ExtensionValue, Reference},
    OperationOutcome, Organization,
};
use serde::Serialize;
use xmldoc::Element;

use crate::{
    error::Error,
    hl7v3::{Code, ElementExt},
};

use super::{
    actors::create_organization,
    common::{convert_telecoms, new_id, ods_identifier},
    taxonomy::ISSUE_PRESCRIPTION_WITH_ANOTHER_DISPENSER,
};

pub const URL_SUPPORTING_INFO: &str =
    "https://fhir.nhs.uk/StructureDefinition/Extension-Spine-supportingInfo";

const PATH_REJECTION_REASON: &str = "pertinentInformation/pertinentRejectionReason";
const UNKNOWN: &str = "UNKNOWN";

/// Contact details of the dispenser currently holding the prescription.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OtherDispenser {
    ods_code: Option<String>,
    name: Option<String>,
    tel: Option<String>,
}

/// Reason codes of a `PrescriptionReleaseReject`. There is at most one.
pub fn rejection_codes(rejection: &Element) -> Result<Vec<Code>, Error> {
    rejection
        .find(&format!("{}/value", PATH_REJECTION_REASON))
        .map(Code::from_element)
        .into_iter()
        .collect()
}

/// Points the outcome to the dispenser the prescription is with, if the
/// release was rejected for that reason.
pub fn add_other_dispenser(
    outcome: &mut OperationOutcome,
    rejection: &Element,
) -> Result<(), Error> {
    let with_another_dispenser = |issue: &Issue| {
        issue.details.as_ref().map_or(false, |details| {
            details
                .coding
                .iter()
                .any(|c| c.code.as_deref() == Some(ISSUE_PRESCRIPTION_WITH_ANOTHER_DISPENSER))
        })
    };

    if !outcome.issue.iter().any(with_another_dispenser) {
        return Ok(());
    }

    let agent_person = rejection.find(&format!("{}/performer/AgentPerson", PATH_REJECTION_REASON));

    let organization = match agent_person {
        Some(agent_person) => create_organization(agent_person.required("representedOrganization")?)?,
        None => {
            let mut organization = Organization::new(new_id()?);
            organization.identifier.push(ods_identifier(UNKNOWN));
            organization.name = Some(UNKNOWN.into());

            organization
        }
    };

    if let Some(agent_person) = agent_person {
        let diagnostics = serde_json::to_string(&OtherDispenser {
            ods_code: agent_person
                .optional_attr("representedOrganization/id", "extension")
                .map(Into::into),
            name: agent_person.text_at("representedOrganization/name"),
            tel: convert_telecoms(agent_person.children_named("telecom"))?
                .into_iter()
                .next()
                .and_then(|telecom| telecom.value),
        })?;

        for issue in outcome.issue.iter_mut().filter(|i| with_another_dispenser(&**i)) {
            issue.diagnostics = Some(diagnostics.clone());
        }
    }

    outcome.extension = vec![Extension::new(
        URL_SUPPORTING_INFO,
        ExtensionValue::Reference(Reference::contained(&organization.id)),
    )];
    outcome.contained = vec![organization.into()];

    Ok(())
}
