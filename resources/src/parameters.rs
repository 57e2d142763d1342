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

use super::resource::Resource;

#[derive(Clone, PartialEq, Debug, Default, Serialize)]
pub struct Parameters {
    pub parameter: Vec<Parameter>,
}

#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct Parameter {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<Resource>,
}

impl Parameters {
    pub fn with_resource<N: Into<String>>(mut self, name: N, resource: Resource) -> Self {
        self.parameter.push(Parameter {
            name: name.into(),
            resource: Some(resource),
        });

        self
    }

    pub fn get(&self, name: &str) -> Option<&Resource> {
        self.parameter
            .iter()
            .find(|p| p.name == name)
            .and_then(|p| p.resource.as_ref())
    }
}
