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

use regex::{escape, Regex};
use xmldoc::{Doc, Element};

use crate::error::Error;

use super::{AcknowledgementTypeCode, Code, ElementExt};

/* SendMessagePayload */

/// The interaction element embedded in a raw backbone response, parsed
/// without namespace prefixes.
#[derive(Debug, Clone)]
pub struct SendMessagePayload {
    pub interaction_id: String,
    pub root: Element,
}

impl SendMessagePayload {
    pub fn type_code(&self) -> Result<AcknowledgementTypeCode, Error> {
        let code = self.root.required_attr("acknowledgement", "typeCode")?;

        Ok(code.into())
    }

    /// Codes of all `acknowledgement/acknowledgementDetail` elements.
    pub fn rejection_codes(&self) -> Result<Vec<Code>, Error> {
        self.root
            .find_all("acknowledgement/acknowledgementDetail/code")
            .into_iter()
            .map(Code::from_element)
            .collect()
    }

    /// Codes of all `ControlActEvent/reason` detected issue events.
    pub fn error_codes(&self) -> Result<Vec<Code>, Error> {
        self.root
            .find_all("ControlActEvent/reason/justifyingDetectedIssueEvent/code")
            .into_iter()
            .map(Code::from_element)
            .collect()
    }

    /// The domain payload below `ControlActEvent/subject`.
    pub fn subject(&self, name: &str) -> Result<&Element, Error> {
        self.root.required(&format!("ControlActEvent/subject/{}", name))
    }
}

/// Locates the element named `interaction_id` inside `raw`. Returns `None` if
/// the raw text does not contain the interaction at all.
pub fn extract_envelope(raw: &str, interaction_id: &str) -> Result<Option<SendMessagePayload>, Error> {
    let id = escape(interaction_id);
    let rx = Regex::new(&format!(
        r"(?s)<(?:hl7:)?{id}[\s/>].*</(?:hl7:)?{id}>",
        id = id
    ))
    .map_err(|err| Error::Generic(err.to_string()))?;

    let xml = match rx.find(raw) {
        Some(m) => m.as_str(),
        None => return Ok(None),
    };

    let root = Doc::parse_stripped(xml)?.into_root();
    if root.name() != interaction_id {
        return Err(Error::MissingElement(interaction_id.to_owned()));
    }

    Ok(Some(SendMessagePayload {
        interaction_id: interaction_id.to_owned(),
        root,
    }))
}
