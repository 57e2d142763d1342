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
    medication_request::{DispenseRequest, Intent, Status},
    operation_outcome::{Issue, IssueType, Severity},
    types::{Coding, Extension, ExtensionValue, Identifier, Reference},
    MedicationRequest, OperationOutcome, Resource,
};
use xmldoc::Element;

use crate::{
    error::Error,
    hl7v3::{to_fhir_date_time, ElementExt},
};

use super::{
    actors::Actors,
    common::{
        into_entries, new_id, ods_identifier, SYSTEM_PRESCRIPTION_ORDER_ITEM_NUMBER,
        SYSTEM_PRESCRIPTION_ORDER_NUMBER, SYSTEM_RFC4122, SYSTEM_SNOMED,
    },
    message_header::{create_message_header, MessageEvent},
    patient::create_patient,
};

pub const SYSTEM_STATUS_HISTORY: &str =
    "https://fhir.nhs.uk/CodeSystem/medicationrequest-status-history";

const URL_TASK_STATUS_REASON: &str =
    "https://fhir.nhs.uk/StructureDefinition/Extension-DM-PrescriptionTaskStatusReason";
pub const URL_RESPONSIBLE_PRACTITIONER: &str =
    "https://fhir.nhs.uk/StructureDefinition/Extension-DM-ResponsiblePractitioner";
const URL_DISPENSING_PERFORMER: &str =
    "https://fhir.nhs.uk/StructureDefinition/Extension-DM-DispensingPerformer";

/* StatusInformation */

/// Outcome of a cancellation request as reported by the backbone.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusInformation {
    pub code: &'static str,
    pub display: String,
    pub status: Status,
    pub issue: Option<IssueType>,
}

impl StatusInformation {
    pub fn from_response(response: &Element) -> Result<Self, Error> {
        let value = response.required("pertinentInformation3/pertinentResponse/value")?;
        let code = value.required_attr("", "code")?;

        let (code, display, status, issue) = match code {
            "0001" => ("R-0001", "Prescription/item was cancelled", Status::Cancelled, None),
            "0002" => ("R-0002", "Prescription/item was not cancelled – With dispenser", Status::Active, None),
            "0003" => ("R-0003", "Prescription item was not cancelled – With dispenser active", Status::Active, None),
            "0004" => ("R-0004", "Prescription/item was not cancelled – Dispensed to Patient", Status::Completed, None),
            "0005" => ("R-0005", "Prescription item had expired", Status::Stopped, None),
            "0006" => ("R-0006", "Prescription/item had already been cancelled", Status::Cancelled, None),
            "0007" => ("R-0007", "Prescription/item cancellation requested by another prescriber", Status::Unknown, None),
            "0008" => ("R-0008", "Prescription/item not found", Status::Unknown, Some(IssueType::NotFound)),
            "0009" => ("R-0009", "Cancellation functionality disabled in Spine", Status::Active, None),
            "0010" => ("R-0010", "Prescription/item was not cancelled. Prescription has been not dispensed", Status::Stopped, None),
            "5000" => {
                let detail = value
                    .attr("displayName")
                    .and_then(|d| d.split('-').nth(1))
                    .unwrap_or_default();

                return Ok(Self {
                    code: "R-5000",
                    display: format!("Unable to process message.{}", detail),
                    status: Status::Unknown,
                    issue: Some(IssueType::Exception),
                });
            }
            "5888" => ("R-5888", "Invalid message", Status::Unknown, Some(IssueType::Invalid)),
            other => {
                return Err(Error::InvalidValue(format!(
                    "Unhandled cancellation response code '{}'.",
                    other
                )))
            }
        };

        Ok(Self {
            code,
            display: display.to_owned(),
            status,
            issue,
        })
    }

    fn coding(&self) -> Coding {
        Coding::new(SYSTEM_STATUS_HISTORY, self.code, Some(self.display.clone()))
    }
}

/* translation */

/// Translates a `CancellationResponse` into a message bundle, or into an
/// operation outcome if the backbone could not process the cancellation.
pub fn translate_cancellation(response: &Element) -> Result<Resource, Error> {
    let status = StatusInformation::from_response(response)?;

    match status.issue {
        Some(code) => {
            let mut issue = Issue::new(Severity::Error, code);
            issue.details = Some(status.coding().into());

            Ok(OperationOutcome::new(vec![issue]).into())
        }
        None => Ok(create_bundle(response, &status)?.into()),
    }
}

fn create_bundle(response: &Element, status: &StatusInformation) -> Result<Bundle, Error> {
    let message_id = response.required_attr("id", "root")?;
    let effective_time = to_fhir_date_time(response.required_attr("effectiveTime", "value")?)?;

    let patient = create_patient(response.required("recordTarget/Patient")?)?;

    let mut actors = Actors::default();
    let cancel_requester_person = response.required("author/AgentPerson")?;
    let cancel_requester = actors.resolve(cancel_requester_person)?;

    let original_author = match response.find("responsibleParty/AgentPerson") {
        Some(agent_person) if agent_person.child("agentPerson").is_some() => {
            actors.resolve(agent_person)?
        }
        _ => cancel_requester,
    };

    let performer = match response.find("performer/AgentPerson") {
        Some(agent_person) => Some((actors.resolve(agent_person)?, agent_person)),
        None => None,
    };

    let mut medication_request = MedicationRequest::new(
        new_id()?,
        status.status,
        Intent::Order,
        Coding::new(SYSTEM_SNOMED, "763158003", Some("Medicinal product".into())).into(),
        Reference::to(&patient.id),
    );
    medication_request.extension = vec![
        Extension::complex(
            URL_TASK_STATUS_REASON,
            vec![
                Extension::new("status", ExtensionValue::Coding(status.coding())),
                Extension::new("statusDate", ExtensionValue::DateTime(effective_time.clone())),
            ],
        ),
        Extension::new(
            URL_RESPONSIBLE_PRACTITIONER,
            ExtensionValue::Reference(actors.get(cancel_requester).role_reference()),
        ),
    ];
    medication_request.identifier.push(Identifier::new(
        SYSTEM_PRESCRIPTION_ORDER_ITEM_NUMBER,
        response
            .required_attr("pertinentInformation1/pertinentLineItemRef/id", "root")?
            .to_lowercase(),
    ));
    medication_request.requester = Some(actors.get(original_author).role_reference());
    medication_request.group_identifier = Some(Identifier::new(
        SYSTEM_PRESCRIPTION_ORDER_NUMBER,
        response.required_attr(
            "pertinentInformation2/pertinentPrescriptionID/value",
            "extension",
        )?,
    ));

    if let Some((performer, agent_person)) = performer {
        let mut reference = Reference::by_identifier(ods_identifier(
            agent_person.required_attr("representedOrganization/id", "extension")?,
        ));
        reference.extension.push(Extension::new(
            URL_DISPENSING_PERFORMER,
            ExtensionValue::Reference(actors.get(performer).role_reference()),
        ));
        reference.display = agent_person.text_at("representedOrganization/name");

        medication_request.dispense_request = Some(DispenseRequest {
            performer: Some(reference),
            ..Default::default()
        });
    }

    let message_header = create_message_header(
        MessageEvent::PrescriptionOrderResponse,
        message_id,
        response.required_attr(
            "pertinentInformation4/pertinentCancellationRequestRef/id",
            "root",
        )?,
        actors.get(cancel_requester).ods_code(),
        &[&patient.id, &medication_request.id],
    )?;

    let mut resources: Vec<Resource> = vec![
        message_header.into(),
        patient.into(),
        medication_request.into(),
    ];
    resources.extend(actors.into_resources());

    let mut bundle = Bundle::new(BundleType::Message);
    bundle.identifier = Some(Identifier::new(SYSTEM_RFC4122, message_id.to_lowercase()));
    bundle.timestamp = Some(effective_time);
    bundle.entries = into_entries(resources);

    Ok(bundle)
}

#[cfg(test)]
mod tests {
    use xmldoc::Doc;

    use crate::test_support::{agent_person, cancellation_response};

    use super::*;

    fn response(
        code: &str,
        display: &str,
        author: &str,
        responsible: &str,
        performer: &str,
    ) -> Element {
        let xml = cancellation_response(code, display, author, responsible, performer);
        Doc::parse_stripped(&xml).unwrap().into_root()
    }

    fn bundle(resource: Resource) -> Bundle {
        match resource {
            Resource::Bundle(bundle) => bundle,
            other => panic!("expected bundle, got {}", other.resource_type()),
        }
    }

    fn count(bundle: &Bundle, type_: &str) -> usize {
        bundle
            .entries
            .iter()
            .filter(|e| e.resource.resource_type() == type_)
            .count()
    }

    #[test]
    fn cancelled_prescription() {
        let author = agent_person("100102238986", "G9999999", "A83008");
        let responsible = agent_person("201715352555", "C1234567", "A83008");
        let resource = translate_cancellation(&response(
            "0001",
            "Prescription/item was cancelled",
            &author,
            &responsible,
            "",
        ))
        .unwrap();
        let bundle = bundle(resource);

        assert_eq!(bundle.entries[0].resource.resource_type(), "MessageHeader");
        assert_eq!(count(&bundle, "Practitioner"), 2);
        assert_eq!(count(&bundle, "PractitionerRole"), 2);
        assert_eq!(
            bundle.identifier.as_ref().and_then(|i| i.value.as_deref()),
            Some("a7b86f8d-1dbd-fc28-e050-d20ae3a215f0")
        );
        assert_eq!(
            bundle.timestamp.as_ref().map(|t| t.as_str()),
            Some("2021-03-02T15:14:10+00:00")
        );

        let medication_request = bundle
            .entries
            .iter()
            .find_map(|e| match &e.resource {
                Resource::MedicationRequest(v) => Some(v),
                _ => None,
            })
            .unwrap();
        assert_eq!(medication_request.status, Status::Cancelled);
        assert!(medication_request.dispense_request.is_none());
        assert_eq!(
            medication_request.group_identifier.as_ref().and_then(|i| i.value.as_deref()),
            Some("DA923A-Z8827F-11EBAK")
        );
        assert_eq!(
            medication_request.identifier[0].value.as_deref(),
            Some("a54219b8-f741-4c47-b662-e4f8dfa49ab6")
        );
    }

    #[test]
    fn performer_equal_to_author_is_deduplicated() {
        let author = agent_person("100102238986", "G9999999", "A83008");
        let performer = format!(
            "<performer>{}</performer>",
            agent_person("100102238986", "654321", "A83008")
        );
        let resource = translate_cancellation(&response(
            "0002",
            "With dispenser",
            &author,
            &author,
            &performer,
        ))
        .unwrap();
        let bundle = bundle(resource);

        assert_eq!(count(&bundle, "Practitioner"), 1);
        assert_eq!(count(&bundle, "PractitionerRole"), 1);
        assert_eq!(count(&bundle, "Organization"), 1);

        let medication_request = bundle
            .entries
            .iter()
            .find_map(|e| match &e.resource {
                Resource::MedicationRequest(v) => Some(v),
                _ => None,
            })
            .unwrap();
        let performer = medication_request
            .dispense_request
            .as_ref()
            .and_then(|d| d.performer.as_ref())
            .unwrap();
        assert_eq!(
            performer.identifier.as_ref().and_then(|i| i.value.as_deref()),
            Some("A83008")
        );
        assert_eq!(
            performer.extension[0].value,
            medication_request
                .requester
                .clone()
                .map(ExtensionValue::Reference)
        );
    }

    #[test]
    fn not_found_is_an_operation_outcome() {
        let author = agent_person("100102238986", "G9999999", "A83008");
        let resource = translate_cancellation(&response(
            "0008",
            "Prescription/item not found",
            &author,
            &author,
            "",
        ))
        .unwrap();

        match resource {
            Resource::OperationOutcome(outcome) => {
                assert_eq!(outcome.issue.len(), 1);
                assert_eq!(outcome.issue[0].code, IssueType::NotFound);
                let coding = &outcome.issue[0].details.as_ref().unwrap().coding[0];
                assert_eq!(coding.system.as_deref(), Some(SYSTEM_STATUS_HISTORY));
                assert_eq!(coding.code.as_deref(), Some("R-0008"));
            }
            other => panic!("expected operation outcome, got {}", other.resource_type()),
        }
    }

    #[test]
    fn failure_display_carries_detail() {
        let author = agent_person("100102238986", "G9999999", "A83008");
        let element = response("5000", "Failure - Prescription locked", &author, &author, "");
        let status = StatusInformation::from_response(&element).unwrap();

        assert_eq!(status.display, "Unable to process message. Prescription locked");
        assert_eq!(status.issue, Some(IssueType::Exception));
    }

    #[test]
    fn failure_display_takes_text_between_first_two_dashes() {
        let author = agent_person("100102238986", "G9999999", "A83008");
        let element = response(
            "5000",
            "Failure - Prescription locked - retry later",
            &author,
            &author,
            "",
        );
        let status = StatusInformation::from_response(&element).unwrap();

        assert_eq!(status.display, "Unable to process message. Prescription locked ");
    }

    #[test]
    fn unknown_status_code_is_an_error() {
        let author = agent_person("100102238986", "G9999999", "A83008");

        assert!(matches!(
            translate_cancellation(&response("4242", "?", &author, &author, "")),
            Err(Error::InvalidValue(_))
        ));
    }
}
