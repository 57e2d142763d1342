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
    types::{Identifier, Reference},
};

#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct CommunicationRequest {
    pub id: Id,
    pub status: RequestStatus,
    pub subject: Reference,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub payload: Vec<Payload>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub requester: Option<Reference>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub recipient: Vec<Reference>,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestStatus {
    Draft,
    Active,
    OnHold,
    Revoked,
    Completed,
    EnteredInError,
    Unknown,
}

#[derive(Clone, PartialEq, Debug, Serialize)]
pub enum Payload {
    #[serde(rename = "contentString")]
    String(String),

    #[serde(rename = "contentReference")]
    Reference(Reference),
}

impl CommunicationRequest {
    pub fn new(id: Id, subject: Reference) -> Self {
        Self {
            id,
            status: RequestStatus::Unknown,
            subject,
            payload: Vec::new(),
            requester: None,
            recipient: Vec::new(),
        }
    }

    pub fn add_recipient(&mut self, identifier: Identifier) {
        self.recipient.push(Reference::by_identifier(identifier));
    }
}
