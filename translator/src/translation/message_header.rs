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
    message_header::{Destination, Response, ResponseCode, Source},
    primitives::Id,
    types::{Coding, Extension, ExtensionValue, Identifier, Reference},
    MessageHeader,
};

use crate::error::Error;

use super::common::{new_id, ods_identifier, SYSTEM_RFC4122};

const URL_MESSAGE_ID: &str =
    "https://fhir.nhs.uk/StructureDefinition/Extension-Spine-MessageHeader-messageId";
const SYSTEM_MESSAGE_EVENT: &str = "https://fhir.nhs.uk/CodeSystem/message-event";
const ENDPOINT_DIRECTORY: &str = "https://directory.spineservices.nhs.uk/STU3/Organization";
const SPINE_ODS_CODE: &str = "X2601";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageEvent {
    PrescriptionOrder,
    PrescriptionOrderResponse,
}

impl MessageEvent {
    fn coding(self) -> Coding {
        let (code, display) = match self {
            Self::PrescriptionOrder => ("prescription-order", "Prescription Order"),
            Self::PrescriptionOrderResponse => {
                ("prescription-order-response", "Prescription Order Response")
            }
        };

        Coding::new(SYSTEM_MESSAGE_EVENT, code, Some(display.into()))
    }
}

/// Header of a translated message bundle.
///
/// `message_id` is the backbone id of the translated message and
/// `response_to` the id of the request it answers.
pub fn create_message_header(
    event: MessageEvent,
    message_id: &str,
    response_to: &str,
    destination: Option<&str>,
    focus: &[&Id],
) -> Result<MessageHeader, Error> {
    let message_id = Identifier::new(SYSTEM_RFC4122, message_id.to_lowercase());

    let destination = destination
        .map(|ods_code| Destination {
            endpoint: format!("{}/{}", ENDPOINT_DIRECTORY, ods_code),
            receiver: Some(Reference::by_identifier(ods_identifier(ods_code))),
        })
        .into_iter()
        .collect();

    let mut sender = Reference::by_identifier(ods_identifier(SPINE_ODS_CODE));
    sender.display = Some("NHS Digital Spine".into());

    Ok(MessageHeader {
        id: new_id()?,
        extension: vec![Extension::new(
            URL_MESSAGE_ID,
            ExtensionValue::Identifier(message_id),
        )],
        event_coding: event.coding(),
        destination,
        sender: Some(sender),
        source: Source {
            name: Some("NHS Spine".into()),
            endpoint: format!("{}/{}", ENDPOINT_DIRECTORY, SPINE_ODS_CODE),
        },
        response: Some(Response {
            identifier: response_to.to_lowercase(),
            code: ResponseCode::Ok,
        }),
        focus: focus.iter().map(|id| Reference::to(id)).collect(),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn create_header() {
        let patient = new_id().unwrap();
        let header = create_message_header(
            MessageEvent::PrescriptionOrderResponse,
            "A7B86F8D-1DBD-FC28-E050-D20AE3A215F0",
            "DB3A6A1E-2D66-4C39-8C1E-2A45F3D2B0A5",
            Some("FTX40"),
            &[&patient],
        )
        .unwrap();

        let mut value = serde_json::to_value(&header).unwrap();
        value.as_object_mut().unwrap().remove("id");

        assert_eq!(
            value,
            json!({
                "extension": [{
                    "url": URL_MESSAGE_ID,
                    "valueIdentifier": {
                        "system": "https://tools.ietf.org/html/rfc4122",
                        "value": "a7b86f8d-1dbd-fc28-e050-d20ae3a215f0"
                    }
                }],
                "eventCoding": {
                    "system": "https://fhir.nhs.uk/CodeSystem/message-event",
                    "code": "prescription-order-response",
                    "display": "Prescription Order Response"
                },
                "destination": [{
                    "endpoint": "https://directory.spineservices.nhs.uk/STU3/Organization/FTX40",
                    "receiver": {
                        "identifier": {
                            "system": "https://fhir.nhs.uk/Id/ods-organization-code",
                            "value": "FTX40"
                        }
                    }
                }],
                "sender": {
                    "identifier": {
                        "system": "https://fhir.nhs.uk/Id/ods-organization-code",
                        "value": "X2601"
                    },
                    "display": "NHS Digital Spine"
                },
                "source": {
                    "name": "NHS Spine",
                    "endpoint": "https://directory.spineservices.nhs.uk/STU3/Organization/X2601"
                },
                "response": {
                    "identifier": "db3a6a1e-2d66-4c39-8c1e-2a45f3d2b0a5",
                    "code": "ok"
                },
                "focus": [{ "reference": patient.to_urn() }]
            })
        );
    }
}
