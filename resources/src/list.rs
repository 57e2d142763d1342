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

use super::{primitives::Id, types::Reference};

#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct List {
    pub id: Id,
    pub status: ListStatus,
    pub mode: ListMode,

    #[serde(rename = "entry", skip_serializing_if = "Vec::is_empty")]
    pub entries: Vec<ListEntry>,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ListStatus {
    Current,
    Retired,
    EnteredInError,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListMode {
    Working,
    Snapshot,
    Changes,
}

#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct ListEntry {
    pub item: Reference,
}

impl List {
    /// Snapshot list whose entries only carry a display text.
    pub fn of_displays<I, S>(id: Id, displays: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id,
            status: ListStatus::Current,
            mode: ListMode::Snapshot,
            entries: displays
                .into_iter()
                .map(|display| ListEntry {
                    item: Reference {
                        display: Some(display.into()),
                        ..Default::default()
                    },
                })
                .collect(),
        }
    }
}
