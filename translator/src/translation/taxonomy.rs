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

use resources::{
    operation_outcome::{Issue, IssueType, Severity},
    types::{CodeableConcept, Coding},
};

use crate::hl7v3::Code;

pub const CODE_SYSTEM_PRESCRIBE: &str = "2.16.840.1.113883.2.1.3.2.4.17.22";
pub const CODE_SYSTEM_DISPENSE: &str = "2.16.840.1.113883.2.1.3.2.4.16.34";

pub const SYSTEM_EPS_ISSUE_CODE: &str = "https://fhir.nhs.uk/CodeSystem/EPS-IssueCode";
pub const SYSTEM_SPINE_ERROR_OR_WARNING_CODE: &str =
    "https://fhir.nhs.uk/CodeSystem/Spine-ErrorOrWarningCode";

pub const ISSUE_PRESCRIPTION_WITH_ANOTHER_DISPENSER: &str = "PRESCRIPTION_WITH_ANOTHER_DISPENSER";

/* IssueDescriptor */

/// Standard issue a backbone error or rejection code translates to.
#[derive(Debug, Clone, PartialEq)]
pub struct IssueDescriptor {
    pub code: IssueType,
    pub severity: Severity,
    pub system: &'static str,
    pub issue_code: String,
    pub display: Option<String>,
    pub original: Option<Code>,
}

impl IssueDescriptor {
    pub fn into_issue(self) -> Issue {
        let mut coding = vec![Coding::new(self.system, self.issue_code, self.display)];

        if let Some(original) = self.original {
            if let Some(code_system) = original.code_system {
                coding.push(Coding::new(
                    format!("urn:oid:{}", code_system),
                    original.code,
                    original.display_name,
                ));
            }
        }

        let mut issue = Issue::new(self.severity, self.code);
        issue.details = Some(CodeableConcept { coding, text: None });

        issue
    }
}

/// Maps a backbone code to its issue descriptor. Never fails: unknown code
/// systems and unmapped codes fall back to a generic `invalid` issue.
pub fn translate(code: &Code) -> IssueDescriptor {
    match code.code_system.as_deref() {
        Some(CODE_SYSTEM_PRESCRIBE) => known(code, prescribe(code)),
        Some(CODE_SYSTEM_DISPENSE) => known(code, dispense(code)),
        _ => IssueDescriptor {
            code: IssueType::Invalid,
            severity: Severity::Error,
            system: SYSTEM_SPINE_ERROR_OR_WARNING_CODE,
            issue_code: code.code.clone(),
            display: code.display_name.clone(),
            original: None,
        },
    }
}

pub fn translate_all(codes: &[Code]) -> Vec<Issue> {
    codes
        .iter()
        .map(|code| translate(code).into_issue())
        .collect()
}

/// Entry of a domain table.
struct Mapping {
    code: IssueType,
    severity: Severity,
    system: &'static str,
    issue_code: &'static str,
    display: Display,
}

enum Display {
    Fixed(&'static str),
    Original,
}

fn known(code: &Code, mapping: Option<Mapping>) -> IssueDescriptor {
    let mapping = mapping.unwrap_or(Mapping {
        code: IssueType::Invalid,
        severity: Severity::Error,
        system: SYSTEM_SPINE_ERROR_OR_WARNING_CODE,
        issue_code: "ERROR",
        display: Display::Original,
    });

    let display = match mapping.display {
        Display::Fixed(display) => Some(display.to_owned()),
        Display::Original => code.display_name.clone(),
    };

    IssueDescriptor {
        code: mapping.code,
        severity: mapping.severity,
        system: mapping.system,
        issue_code: mapping.issue_code.to_owned(),
        display,
        original: Some(code.clone()),
    }
}

macro_rules! mapping {
    ($code:ident, $system:ident, $issue_code:expr, $display:expr) => {
        Some(Mapping {
            code: IssueType::$code,
            severity: Severity::Error,
            system: $system,
            issue_code: $issue_code,
            display: $display,
        })
    };
}

const EPS: &str = SYSTEM_EPS_ISSUE_CODE;
const SPINE: &str = SYSTEM_SPINE_ERROR_OR_WARNING_CODE;

use self::Display::{Fixed, Original};

fn prescribe(code: &Code) -> Option<Mapping> {
    match code.code.as_str() {
        "0001" => mapping!(BusinessRule, EPS, "PATIENT_DECEASED", Fixed("Patient is recorded as dead")),
        "0002" => mapping!(Duplicate, EPS, "DUPLICATE_PRESCRIPTION_ID", Fixed("Duplicate prescription ID exists")),
        "0003" => mapping!(BusinessRule, EPS, "MISSING_DIGITAL_SIGNATURE", Fixed("Digital signature not found")),
        "0005" => mapping!(NotFound, EPS, "PRESCRIPTION_NOT_FOUND", Fixed("Prescription can not be found. Contact prescriber")),
        "0007" => mapping!(CodeInvalid, SPINE, "INVALID_RESOURCE_ID", Fixed("The resource ID was not valid. For example a NHS Number is presented which is not a valid NHS Number.")),
        "0008" => mapping!(Value, SPINE, "MISSING_VALUE", Original),
        "0009" | "7002" => mapping!(Structure, EPS, "INVALID_MESSAGE", Fixed("Invalid Message")),
        "0010" => mapping!(BusinessRule, EPS, "INVALID_NUMBER_MEDICATIONREQUESTS", Fixed("Number of items on a prescription should be between 1 and 4")),
        "0012" => mapping!(BusinessRule, EPS, "PRESCRIPTION_INVALID_STATE_TRANSITION", Fixed("Invalid State Transition for Prescription")),
        "0013" => mapping!(BusinessRule, EPS, "MEDICATIONREQUEST_INVALID_STATE_TRANSITION", Fixed("Invalid State Transition for Prescription Item")),
        "0014" => mapping!(NotFound, EPS, "MEDICATIONREQUEST_NOT_FOUND", Fixed("Prescription Item Not found")),
        "0015" => mapping!(BusinessRule, EPS, "CLAIM_INVALID_NOT_DISPENSED", Fixed("Invalid Claim. Prescription is not Dispensed")),
        "0018" => mapping!(BusinessRule, EPS, "MISMATCH_AUTHORISED_REPEAT_COUNT", Fixed("Mismatch in authorised repeat counts")),
        "0019" => mapping!(BusinessRule, EPS, "INVALID_REPEAT_COUNT", Fixed("Repeat count should be between 1 and 99")),
        "0021" => mapping!(BusinessRule, EPS, "DISPENSE_AMEND_IDENTIFIER_MISMATCH", Fixed("Dispense Amendment/Cancellation Request does not pertain to Last Dispense")),
        "0099" => mapping!(Conflict, SPINE, "RESOURCE_VERSION_MISMATCH", Fixed("Resource version mismatch")),
        "0100" => mapping!(BusinessRule, SPINE, "CLAIM_AMEND_PERIOD_ISSUE", Fixed("Claim amendment is not permitted outside of the claim period")),
        "5008" => mapping!(Duplicate, EPS, "DUPLICATE_MEDICATIONREQUEST_ID", Fixed("Duplicate item ID exists")),
        "5009" => mapping!(Value, EPS, "INVALID_CHECK_DIGIT", Fixed("Error in check digit")),
        "9006" => mapping!(Value, EPS, "INVALID_DATE_FORMAT", Fixed("Format of date passed is invalid")),
        "9999" => mapping!(Processing, SPINE, "FAILURE_TO_PROCESS_MESSAGE", Original),
        _ => None,
    }
}

fn dispense(code: &Code) -> Option<Mapping> {
    match code.code.as_str() {
        "0001" => mapping!(BusinessRule, EPS, "PRESCRIPTION_CANCELLED", Fixed("Prescription has been cancelled")),
        "0002" => mapping!(BusinessRule, EPS, "PRESCRIPTION_EXPIRED", Fixed("Prescription has expired")),
        "0003" => mapping!(NotFound, SPINE, "RESOURCE_NOT_FOUND", Fixed("Resource not found")),
        "0004" => mapping!(BusinessRule, EPS, ISSUE_PRESCRIPTION_WITH_ANOTHER_DISPENSER, Fixed("Prescription is with another dispenser")),
        "0005" => mapping!(BusinessRule, EPS, "PRESCRIPTION_DISPENSED", Fixed("Prescription has been dispensed")),
        "0006" => Some(Mapping {
            code: IssueType::Informational,
            severity: Severity::Information,
            system: EPS,
            issue_code: "NO_MORE_PRESCRIPTIONS",
            display: Fixed("No more prescriptions available"),
        }),
        "0007" => mapping!(Exception, EPS, "SERVICE_DISABLED", Fixed("Functionality disabled in spine")),
        "0099" => mapping!(Conflict, SPINE, "RESOURCE_VERSION_MISMATCH", Fixed("Resource version mismatch")),
        "5000" => mapping!(Processing, SPINE, "FAILURE_TO_PROCESS_MESSAGE", Original),
        "5888" => mapping!(Invalid, EPS, "INVALID_MESSAGE", Fixed("Invalid message")),
        "9006" => mapping!(Value, EPS, "INVALID_DATE_FORMAT", Fixed("Format of date passed is invalid")),
        _ => None,
    }
}
