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
    primitives::Id,
    types::{Coding, Extension, Reference},
};

#[derive(Clone, PartialEq, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageHeader {
    pub id: Id,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extension: Vec<Extension>,

    pub event_coding: Coding,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub destination: Vec<Destination>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<Reference>,

    pub source: Source,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<Response>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub focus: Vec<Reference>,
}

#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct Destination {
    pub endpoint: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver: Option<Reference>,
}

#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct Source {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub endpoint: String,
}

#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct Response {
    pub identifier: String,
    pub code: ResponseCode,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseCode {
    Ok,
    TransientError,
    FatalError,
}
