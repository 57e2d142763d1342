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

use serde::Serialize;
use serde_json::Number;

use super::primitives::{Date, DateTime, Id};

/* Identifier */

#[derive(Clone, PartialEq, Debug, Default, Serialize)]
pub struct Identifier {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extension: Vec<Extension>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Identifier {
    pub fn new<S, V>(system: S, value: V) -> Self
    where
        S: Into<String>,
        V: Into<String>,
    {
        Self {
            extension: Vec::new(),
            system: Some(system.into()),
            value: Some(value.into()),
        }
    }

    /// Same system and value, extensions dropped.
    pub fn without_extension(&self) -> Self {
        Self {
            extension: Vec::new(),
            system: self.system.clone(),
            value: self.value.clone(),
        }
    }

    pub fn matches(&self, other: &Identifier) -> bool {
        self.system == other.system && self.value == other.value
    }
}

/* Coding */

#[derive(Clone, PartialEq, Debug, Default, Serialize)]
pub struct Coding {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl Coding {
    pub fn new<S, C>(system: S, code: C, display: Option<String>) -> Self
    where
        S: Into<String>,
        C: Into<String>,
    {
        Self {
            system: Some(system.into()),
            code: Some(code.into()),
            display,
        }
    }
}

#[derive(Clone, PartialEq, Debug, Default, Serialize)]
pub struct CodeableConcept {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub coding: Vec<Coding>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl From<Coding> for CodeableConcept {
    fn from(coding: Coding) -> Self {
        Self {
            coding: vec![coding],
            text: None,
        }
    }
}

/* Reference */

#[derive(Clone, PartialEq, Debug, Default, Serialize)]
pub struct Reference {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extension: Vec<Extension>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<Identifier>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl Reference {
    /// Bundle-local reference to the resource with the passed id.
    pub fn to(id: &Id) -> Self {
        Self {
            reference: Some(id.to_urn()),
            ..Default::default()
        }
    }

    pub fn by_identifier(identifier: Identifier) -> Self {
        Self {
            identifier: Some(identifier),
            ..Default::default()
        }
    }

    /// Reference to a contained resource.
    pub fn contained(id: &Id) -> Self {
        Self {
            reference: Some(format!("#{}", id)),
            ..Default::default()
        }
    }
}

/* Extension */

#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct Extension {
    pub url: String,

    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub value: Option<ExtensionValue>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extension: Vec<Extension>,
}

#[derive(Clone, PartialEq, Debug, Serialize)]
pub enum ExtensionValue {
    #[serde(rename = "valueCoding")]
    Coding(Coding),

    #[serde(rename = "valueCodeableConcept")]
    CodeableConcept(CodeableConcept),

    #[serde(rename = "valueReference")]
    Reference(Reference),

    #[serde(rename = "valueIdentifier")]
    Identifier(Identifier),

    #[serde(rename = "valueDateTime")]
    DateTime(DateTime),

    #[serde(rename = "valueDate")]
    Date(Date),

    #[serde(rename = "valueString")]
    String(String),

    #[serde(rename = "valueBoolean")]
    Boolean(bool),

    #[serde(rename = "valueUnsignedInt")]
    UnsignedInt(u32),

    #[serde(rename = "valueInteger")]
    Integer(i64),
}

impl Extension {
    pub fn new<U: Into<String>>(url: U, value: ExtensionValue) -> Self {
        Self {
            url: url.into(),
            value: Some(value),
            extension: Vec::new(),
        }
    }

    pub fn complex<U: Into<String>>(url: U, extension: Vec<Extension>) -> Self {
        Self {
            url: url.into(),
            value: None,
            extension,
        }
    }
}

/* ContactPoint */

#[derive(Clone, PartialEq, Debug, Default, Serialize)]
pub struct ContactPoint {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub use_: Option<String>,
}

/* Address */

#[derive(Clone, PartialEq, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub use_: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub line: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
}

/* HumanName */

#[derive(Clone, PartialEq, Debug, Default, Serialize)]
pub struct HumanName {
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub use_: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub given: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub prefix: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suffix: Vec<String>,
}

/* Quantity */

#[derive(Clone, PartialEq, Debug, Default, Serialize)]
pub struct Quantity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Number>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/* Period */

#[derive(Clone, PartialEq, Debug, Default, Serialize)]
pub struct Period {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<Date>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<Date>,
}

/* Annotation */

#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct Annotation {
    pub text: String,
}

/* Meta */

#[derive(Clone, PartialEq, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime>,
}

impl Meta {
    pub fn last_updated(last_updated: DateTime) -> Self {
        Self {
            last_updated: Some(last_updated),
        }
    }
}
