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

use super::{
    primitives::{DateTime, Id},
    types::{Coding, Reference},
};

#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct Provenance {
    pub id: Id,
    pub target: Vec<Reference>,
    pub recorded: DateTime,
    pub agent: Vec<Agent>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub signature: Vec<Signature>,
}

#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct Agent {
    pub who: Reference,
}

#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct Signature {
    #[serde(rename = "type")]
    pub type_: Vec<Coding>,
    pub when: DateTime,
    pub who: Reference,

    /// Base64 encoded signature block.
    pub data: String,
}
