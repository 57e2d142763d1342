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
    resource::Resource,
    types::{Identifier, Meta},
};

#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct Bundle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<Identifier>,

    #[serde(rename = "type")]
    pub type_: Type,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,

    #[serde(rename = "entry", skip_serializing_if = "Vec::is_empty")]
    pub entries: Vec<Entry>,
}

#[derive(Clone, PartialEq, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_url: Option<String>,

    pub resource: Resource,
}

#[derive(Clone, Copy, PartialEq, Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Type {
    Document,
    Message,
    Transaction,
    TransactionResponse,
    Batch,
    BatchResponse,
    History,
    Searchset,
    Collection,
}

impl Bundle {
    pub fn new(type_: Type) -> Self {
        Self {
            id: None,
            meta: None,
            identifier: None,
            type_,
            timestamp: None,
            total: None,
            entries: Vec::new(),
        }
    }

    /// Bundle ids of the contained resources, in entry order.
    pub fn resource_ids(&self) -> impl Iterator<Item = &Id> {
        self.entries.iter().filter_map(|e| e.resource.id())
    }
}

impl Entry {
    pub fn new(resource: Resource) -> Self {
        Self {
            full_url: None,
            resource,
        }
    }

    /// Entry addressed by the `urn:uuid` form of the resource id.
    pub fn with_full_url(resource: Resource) -> Self {
        Self {
            full_url: resource.id().map(Id::to_urn),
            resource,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::convert::TryFrom;

    use serde_json::json;

    use super::*;
    use crate::OperationOutcome;

    #[test]
    fn serialize_searchset() {
        let mut outcome = OperationOutcome::default();
        outcome.id = Some(Id::try_from("outcome-1").unwrap());

        let mut bundle = Bundle::new(Type::Searchset);
        bundle.total = Some(1);
        bundle
            .entries
            .push(Entry::with_full_url(Resource::OperationOutcome(outcome)));

        assert_eq!(
            serde_json::to_value(Resource::Bundle(bundle)).unwrap(),
            json!({
                "resourceType": "Bundle",
                "type": "searchset",
                "total": 1,
                "entry": [{
                    "fullUrl": "urn:uuid:outcome-1",
                    "resource": {
                        "resourceType": "OperationOutcome",
                        "id": "outcome-1",
                        "issue": []
                    }
                }]
            })
        );
    }
}
