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

use chrono::Utc;
use log::info;
use xmldoc::{C14nMode, Element};

use crate::{
    error::Error,
    hl7v3::{format_timestamp, ElementExt},
    translation::{common::new_id, release::PATH_PRESCRIPTION},
    verification::NAMESPACE_HL7,
};

pub const INTERACTION_DISPENSE_PROPOSAL_RETURN: &str = "PORX_IN100101SM31";

const OID_INTERACTION: &str = "2.16.840.1.113883.2.1.3.2.4.12";
const OID_MESSAGE_CODE: &str = "2.16.840.1.113883.2.1.3.2.4.17.30";
const OID_PRESCRIPTION_ID: &str = "2.16.840.1.113883.2.1.3.2.4.18.8";
const OID_RETURN_REASON: &str = "2.16.840.1.113883.2.1.3.2.4.16.44";

/// Reasons a released prescription is handed back to the backbone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnReason {
    InvalidDigitalSignature,
}

impl ReturnReason {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidDigitalSignature => "0005",
        }
    }

    pub fn display(&self) -> &'static str {
        match self {
            Self::InvalidDigitalSignature => "Invalid digital signature",
        }
    }
}

/// Return of a released prescription that must not be dispensed.
#[derive(Debug, Clone)]
pub struct DispenseProposalReturn {
    pub id: String,
    pub effective_time: String,
    pub author: Element,
    pub prescription_id: String,
    pub release_response_id: String,
    pub reason: ReturnReason,
}

impl DispenseProposalReturn {
    pub fn new(
        parent_prescription: &Element,
        release_response: &Element,
        reason: ReturnReason,
    ) -> Result<Self, Error> {
        let prescription = parent_prescription.required(PATH_PRESCRIPTION)?;
        let prescription_id = prescription
            .children_named("id")
            .nth(1)
            .and_then(|id| id.attr("extension"))
            .ok_or_else(|| Error::MissingElement(format!("{}/id[1]", prescription.name())))?;

        let ret = Self {
            id: new_id()?.to_uppercase(),
            effective_time: format_timestamp(&Utc::now()),
            author: prescription.required("author/AgentPerson")?.clone(),
            prescription_id: prescription_id.to_owned(),
            release_response_id: release_response.required_attr("id", "root")?.to_owned(),
            reason,
        };

        info!(
            "Generating auto return message: {} for prescription: {}",
            ret.id, ret.prescription_id
        );

        Ok(ret)
    }

    /// Serializes the return as `PORX_IN100101SM31` message.
    pub fn to_xml(&self) -> Result<String, Error> {
        let return_ = Element::new("DispenseProposalReturn")
            .with_attr("classCode", "INFO")
            .with_attr("moodCode", "EVN")
            .with_child(Element::new("id").with_attr("root", &self.id))
            .with_child(Element::new("effectiveTime").with_attr("value", &self.effective_time))
            .with_child(
                Element::new("author")
                    .with_attr("typeCode", "AUT")
                    .with_attr("contextControlCode", "OP")
                    .with_child(self.author.clone()),
            )
            .with_child(pertinent_information(
                "pertinentInformation1",
                Element::new("pertinentPrescriptionID")
                    .with_attr("classCode", "OBS")
                    .with_attr("moodCode", "EVN")
                    .with_child(message_code("PID"))
                    .with_child(
                        Element::new("value")
                            .with_attr("root", OID_PRESCRIPTION_ID)
                            .with_attr("extension", &self.prescription_id),
                    ),
            ))
            .with_child(pertinent_information(
                "pertinentInformation3",
                Element::new("pertinentReturnReason")
                    .with_attr("classCode", "OBS")
                    .with_attr("moodCode", "EVN")
                    .with_child(message_code("RR"))
                    .with_child(
                        Element::new("value")
                            .with_attr("codeSystem", OID_RETURN_REASON)
                            .with_attr("code", self.reason.code())
                            .with_attr("displayName", self.reason.display()),
                    ),
            ))
            .with_child(
                Element::new("reversalOf").with_attr("typeCode", "REV").with_child(
                    Element::new("priorPrescriptionReleaseResponseRef")
                        .with_attr("classCode", "INFO")
                        .with_attr("moodCode", "EVN")
                        .with_child(Element::new("id").with_attr("root", &self.release_response_id)),
                ),
            );

        let message = Element::new(INTERACTION_DISPENSE_PROPOSAL_RETURN)
            .with_attr("xmlns", NAMESPACE_HL7)
            .with_child(Element::new("id").with_attr("root", new_id()?.to_uppercase()))
            .with_child(Element::new("creationTime").with_attr("value", &self.effective_time))
            .with_child(Element::new("versionCode").with_attr("code", "V3NPfIT3.0"))
            .with_child(
                Element::new("interactionId")
                    .with_attr("root", OID_INTERACTION)
                    .with_attr("extension", INTERACTION_DISPENSE_PROPOSAL_RETURN),
            )
            .with_child(Element::new("processingCode").with_attr("code", "P"))
            .with_child(Element::new("processingModeCode").with_attr("code", "T"))
            .with_child(Element::new("acceptAckCode").with_attr("code", "NE"))
            .with_child(
                Element::new("ControlActEvent")
                    .with_attr("classCode", "CACT")
                    .with_attr("moodCode", "EVN")
                    .with_child(
                        Element::new("subject")
                            .with_attr("typeCode", "SUBJ")
                            .with_attr("contextConductionInd", "false")
                            .with_child(return_),
                    ),
            );

        Ok(message.to_c14n_string(C14nMode::Inclusive)?)
    }
}

fn pertinent_information(name: &str, content: Element) -> Element {
    Element::new(name)
        .with_attr("typeCode", "PERT")
        .with_attr("contextConductionInd", "true")
        .with_child(Element::new("seperatableInd").with_attr("value", "false"))
        .with_child(content)
}

fn message_code(code: &str) -> Element {
    Element::new("code")
        .with_attr("codeSystem", OID_MESSAGE_CODE)
        .with_attr("code", code)
}
