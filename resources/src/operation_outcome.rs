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
    resource::Resource,
    types::{CodeableConcept, Extension, Meta},
};

#[derive(Clone, PartialEq, Debug, Default, Serialize)]
pub struct OperationOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub contained: Vec<Resource>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extension: Vec<Extension>,

    pub issue: Vec<Issue>,
}

#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct Issue {
    pub severity: Severity,
    pub code: IssueType,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<CodeableConcept>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub expression: Vec<String>,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Fatal,
    Error,
    Warning,
    Information,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueType {
    Invalid,
    Structure,
    Required,
    Value,
    Invariant,
    Security,
    Processing,
    NotSupported,
    Duplicate,
    NotFound,
    CodeInvalid,
    BusinessRule,
    Conflict,
    Transient,
    Exception,
    Informational,
}

impl OperationOutcome {
    pub fn new(issue: Vec<Issue>) -> Self {
        Self {
            issue,
            ..Default::default()
        }
    }

    pub fn has_errors(&self) -> bool {
        self.issue.iter().any(|i| i.severity == Severity::Error)
    }
}

impl Issue {
    pub fn new(severity: Severity, code: IssueType) -> Self {
        Self {
            severity,
            code,
            details: None,
            diagnostics: None,
            expression: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::types::Coding;

    #[test]
    fn serialize_issue_codes() {
        let mut issue = Issue::new(Severity::Error, IssueType::BusinessRule);
        issue.details = Some(
            Coding::new(
                "https://fhir.nhs.uk/CodeSystem/EPS-IssueCode",
                "PATIENT_DECEASED",
                Some("Patient is recorded as dead".into()),
            )
            .into(),
        );

        let outcome = OperationOutcome::new(vec![issue]);
        assert!(outcome.has_errors());
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({
                "issue": [{
                    "severity": "error",
                    "code": "business-rule",
                    "details": {
                        "coding": [{
                            "system": "https://fhir.nhs.uk/CodeSystem/EPS-IssueCode",
                            "code": "PATIENT_DECEASED",
                            "display": "Patient is recorded as dead"
                        }]
                    }
                }]
            })
        );
    }

    #[test]
    fn information_only_has_no_errors() {
        let outcome = OperationOutcome::new(vec![Issue::new(
            Severity::Information,
            IssueType::Informational,
        )]);

        assert!(!outcome.has_errors());
    }
}
