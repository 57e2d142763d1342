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

use regex::Regex;
use resources::{
    communication_request::Payload,
    primitives::Id,
    types::{Identifier, Reference},
    CommunicationRequest, List,
};
use xmldoc::Doc;

use crate::error::Error;

use super::common::new_id;

const CONTROLLED_DRUG_PREFIX: &str = "CD: ";

lazy_static! {
    static ref MEDICATION: Regex = Regex::new(r"^\s*<medication>(.*?)</medication>").unwrap();
    static ref PATIENT_INFO: Regex = Regex::new(r"^\s*<patientInfo>(.*?)</patientInfo>").unwrap();
}

/// Parts of the free text additional instructions of a line item.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct AdditionalInstructions {
    pub medication: Vec<String>,
    pub patient_info: Vec<String>,
    pub controlled_drug_words: String,
    pub additional_instructions: String,
}

impl AdditionalInstructions {
    /// Consumes leading `<medication>` and `<patientInfo>` tags one at a time
    /// (medication first) and splits the remainder into controlled drug words
    /// and free text.
    pub fn parse(text: &str) -> Self {
        let mut ret = Self::default();
        let mut text = text;

        loop {
            let (captures, target) = if let Some(captures) = MEDICATION.captures(text) {
                (captures, &mut ret.medication)
            } else if let Some(captures) = PATIENT_INFO.captures(text) {
                (captures, &mut ret.patient_info)
            } else {
                break;
            };

            let (whole, inner) = match (captures.get(0), captures.get(1)) {
                (Some(whole), Some(inner)) => (whole, inner),
                (_, _) => break,
            };

            target.push(decode(whole.as_str(), inner.as_str()));
            text = &text[whole.end()..];
        }

        match text.strip_prefix(CONTROLLED_DRUG_PREFIX) {
            Some(rest) => match rest.find('\n') {
                Some(pos) => {
                    ret.controlled_drug_words = rest[..pos].to_owned();
                    ret.additional_instructions = rest[pos + 1..].to_owned();
                }
                None => ret.controlled_drug_words = rest.to_owned(),
            },
            None => ret.additional_instructions = text.to_owned(),
        }

        ret
    }

    pub fn has_communication(&self) -> bool {
        !self.medication.is_empty() || !self.patient_info.is_empty()
    }

    /// Communication request carrying the patient info texts and, if there
    /// are medication entries, the list referencing them.
    pub fn to_communication_request(
        &self,
        patient: &Id,
        patient_identifier: &Identifier,
        organization_identifier: &Identifier,
    ) -> Result<(CommunicationRequest, Option<List>), Error> {
        let mut request = CommunicationRequest::new(new_id()?, Reference::to(patient));
        request.requester = Some(Reference::by_identifier(organization_identifier.clone()));
        request.add_recipient(patient_identifier.without_extension());
        request.payload = self
            .patient_info
            .iter()
            .cloned()
            .map(Payload::String)
            .collect();

        let list = if self.medication.is_empty() {
            None
        } else {
            let list = List::of_displays(new_id()?, self.medication.iter().cloned());
            request
                .payload
                .push(Payload::Reference(Reference::to(&list.id)));

            Some(list)
        };

        Ok((request, list))
    }
}

fn decode(whole: &str, inner: &str) -> String {
    match Doc::parse_stripped(whole) {
        Ok(doc) => doc.root().text().unwrap_or_default(),
        Err(_) => inner.to_owned(),
    }
}
