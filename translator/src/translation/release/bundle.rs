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
    bundle::{Bundle, Type as BundleType},
    primitives::Id,
    types::{Identifier, Meta},
    Resource,
};
use xmldoc::Element;

use crate::{
    error::Error,
    hl7v3::{to_fhir_date_time, ElementExt},
};

use super::{
    super::{
        actors::Actors,
        additional_instructions::AdditionalInstructions,
        common::{into_entries, new_id, SYSTEM_RFC4122},
        message_header::{create_message_header, MessageEvent},
        patient::create_patient,
        provenance::create_provenance,
    },
    medication_request::{create_medication_request, Context},
};

pub const PATH_PRESCRIPTION: &str = "pertinentInformation1/pertinentPrescription";
pub const PATH_LINE_ITEMS: &str = "pertinentInformation2/pertinentLineItem";

/// Translates one released `ParentPrescription` into a message bundle.
pub fn create_prescription_bundle(
    parent_prescription: &Element,
    release_request_id: &str,
) -> Result<Bundle, Error> {
    let prescription = parent_prescription.required(PATH_PRESCRIPTION)?;
    let prescription_id = parent_prescription.required_attr("id", "root")?;

    let patient = create_patient(parent_prescription.required("recordTarget/Patient")?)?;

    let mut actors = Actors::default();
    let author = actors.resolve(prescription.required("author/AgentPerson")?)?;
    let responsible_party = match prescription.find("responsibleParty/AgentPerson") {
        Some(agent_person) => actors.resolve(agent_person)?,
        None => author,
    };

    let line_items = prescription.find_all(PATH_LINE_ITEMS);
    if line_items.is_empty() {
        return Err(Error::MissingElement(format!(
            "{}/{}",
            prescription.name(),
            PATH_LINE_ITEMS
        )));
    }

    let mut resources: Vec<Resource> = Vec::new();

    let instructions = AdditionalInstructions::parse(
        &line_items[0]
            .text_at("pertinentInformation1/pertinentAdditionalInstructions/value")
            .unwrap_or_default(),
    );
    if instructions.has_communication() {
        let patient_identifier = patient
            .identifier
            .first()
            .ok_or_else(|| Error::MissingElement("Patient/id".into()))?;
        let organization_identifier = actors
            .get(author)
            .organization
            .identifier
            .first()
            .ok_or_else(|| Error::MissingElement("representedOrganization/id".into()))?;

        let (request, list) = instructions.to_communication_request(
            &patient.id,
            patient_identifier,
            organization_identifier,
        )?;

        resources.push(request.into());
        if let Some(list) = list {
            resources.push(list.into());
        }
    }

    let ctx = Context {
        prescription,
        patient: &patient.id,
        requester: actors.get(author).role_reference(),
        responsible_party: actors.get(responsible_party).role_reference(),
    };
    let medication_requests = line_items
        .into_iter()
        .map(|line_item| create_medication_request(&ctx, line_item))
        .collect::<Result<Vec<_>, _>>()?;

    let mut focus: Vec<&Id> = vec![&patient.id];
    focus.extend(medication_requests.iter().map(|m| &m.id));
    let message_header = create_message_header(
        MessageEvent::PrescriptionOrder,
        prescription_id,
        release_request_id,
        prescription.optional_attr("performer/AgentOrgSDS/agentOrganizationSDS/id", "extension"),
        &focus,
    )?;

    let author_reference = actors.get(author).role_reference();

    resources.push(message_header.into());
    resources.push(patient.into());
    resources.extend(medication_requests.into_iter().map(Resource::from));
    resources.extend(actors.into_resources());

    if let Some(signature) = prescription.find("author/signatureText/Signature") {
        let signed_at = to_fhir_date_time(prescription.required_attr("author/time", "value")?)?;
        let targets = resources.iter().filter_map(Resource::id).collect::<Vec<_>>();
        let provenance = create_provenance(signature, signed_at, author_reference, &targets)?;

        resources.push(provenance.into());
    }

    let mut bundle = Bundle::new(BundleType::Message);
    bundle.id = Some(new_id()?);
    bundle.meta = Some(Meta::last_updated(to_fhir_date_time(
        parent_prescription.required_attr("effectiveTime", "value")?,
    )?));
    bundle.identifier = Some(Identifier::new(
        SYSTEM_RFC4122,
        prescription_id.to_lowercase(),
    ));
    bundle.entries = into_entries(resources);

    Ok(bundle)
}
