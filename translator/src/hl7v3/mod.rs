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

mod envelope;
mod timestamp;

pub use envelope::*;
pub use timestamp::*;

use xmldoc::Element;

use crate::error::Error;

/* ElementExt */

/// Path based access to HL7 V3 elements parsed without namespace prefixes.
pub trait ElementExt {
    fn required(&self, path: &str) -> Result<&Element, Error>;

    fn required_attr(&self, path: &str, name: &str) -> Result<&str, Error>;

    fn optional_attr(&self, path: &str, name: &str) -> Option<&str>;

    fn text_at(&self, path: &str) -> Option<String>;
}

impl ElementExt for Element {
    fn required(&self, path: &str) -> Result<&Element, Error> {
        self.find(path)
            .ok_or_else(|| Error::MissingElement(format!("{}/{}", self.name(), path)))
    }

    fn required_attr(&self, path: &str, name: &str) -> Result<&str, Error> {
        self.required(path)?
            .attr(name)
            .ok_or_else(|| Error::MissingAttribute {
                path: format!("{}/{}", self.name(), path),
                name: name.to_owned(),
            })
    }

    fn optional_attr(&self, path: &str, name: &str) -> Option<&str> {
        self.find(path).and_then(|e| e.attr(name))
    }

    fn text_at(&self, path: &str) -> Option<String> {
        self.find(path).and_then(Element::text)
    }
}

/* Code */

/// Coded value as carried by `code` and `value` elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Code {
    pub code_system: Option<String>,
    pub code: String,
    pub display_name: Option<String>,
}

impl Code {
    pub fn from_element(element: &Element) -> Result<Self, Error> {
        Ok(Self {
            code_system: element.attr("codeSystem").map(Into::into),
            code: element.required_attr("", "code")?.to_owned(),
            display_name: element.attr("displayName").map(Into::into),
        })
    }

    pub fn new<S, C, D>(code_system: S, code: C, display_name: D) -> Self
    where
        S: Into<String>,
        C: Into<String>,
        D: Into<String>,
    {
        Self {
            code_system: Some(code_system.into()),
            code: code.into(),
            display_name: Some(display_name.into()),
        }
    }
}

/* Acknowledgement */

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcknowledgementTypeCode {
    Acknowledged,
    Error,
    ErrorAlternative,
    Rejected,
    Other(String),
}

impl From<&str> for AcknowledgementTypeCode {
    fn from(code: &str) -> Self {
        match code {
            "AA" => Self::Acknowledged,
            "AE" => Self::Error,
            "CE" => Self::ErrorAlternative,
            "AR" => Self::Rejected,
            other => Self::Other(other.to_owned()),
        }
    }
}
