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
    bundle::Bundle, communication_request::CommunicationRequest, list::List,
    medication_request::MedicationRequest, message_header::MessageHeader,
    operation_outcome::OperationOutcome, organization::Organization, parameters::Parameters,
    patient::Patient, practitioner::Practitioner, practitioner_role::PractitionerRole,
    primitives::Id, provenance::Provenance,
};

#[derive(Clone, PartialEq, Debug, Serialize)]
#[serde(tag = "resourceType")]
pub enum Resource {
    Bundle(Bundle),
    CommunicationRequest(CommunicationRequest),
    List(List),
    MedicationRequest(MedicationRequest),
    MessageHeader(MessageHeader),
    OperationOutcome(OperationOutcome),
    Organization(Organization),
    Parameters(Parameters),
    Patient(Patient),
    Practitioner(Practitioner),
    PractitionerRole(PractitionerRole),
    Provenance(Provenance),
}

impl Resource {
    pub fn id(&self) -> Option<&Id> {
        match self {
            Self::Bundle(v) => v.id.as_ref(),
            Self::CommunicationRequest(v) => Some(&v.id),
            Self::List(v) => Some(&v.id),
            Self::MedicationRequest(v) => Some(&v.id),
            Self::MessageHeader(v) => Some(&v.id),
            Self::OperationOutcome(v) => v.id.as_ref(),
            Self::Organization(v) => Some(&v.id),
            Self::Parameters(_) => None,
            Self::Patient(v) => Some(&v.id),
            Self::Practitioner(v) => Some(&v.id),
            Self::PractitionerRole(v) => Some(&v.id),
            Self::Provenance(v) => Some(&v.id),
        }
    }

    pub fn resource_type(&self) -> &'static str {
        match self {
            Self::Bundle(_) => "Bundle",
            Self::CommunicationRequest(_) => "CommunicationRequest",
            Self::List(_) => "List",
            Self::MedicationRequest(_) => "MedicationRequest",
            Self::MessageHeader(_) => "MessageHeader",
            Self::OperationOutcome(_) => "OperationOutcome",
            Self::Organization(_) => "Organization",
            Self::Parameters(_) => "Parameters",
            Self::Patient(_) => "Patient",
            Self::Practitioner(_) => "Practitioner",
            Self::PractitionerRole(_) => "PractitionerRole",
            Self::Provenance(_) => "Provenance",
        }
    }
}

macro_rules! impl_from {
    ($( $type:ident ),*) => {
        $(
            impl From<$type> for Resource {
                fn from(v: $type) -> Self {
                    Self::$type(v)
                }
            }
        )*
    };
}

impl_from!(
    Bundle,
    CommunicationRequest,
    List,
    MedicationRequest,
    MessageHeader,
    OperationOutcome,
    Organization,
    Parameters,
    Patient,
    Practitioner,
    PractitionerRole,
    Provenance
);

#[cfg(test)]
mod tests {
    use std::convert::TryFrom;

    use serde_json::json;

    use super::*;

    #[test]
    fn tagged_with_resource_type() {
        let mut organization = Organization::new(Id::try_from("org-1").unwrap());
        organization.name = Some("UNKNOWN".into());

        let resource = Resource::from(organization);
        assert_eq!(resource.resource_type(), "Organization");
        assert_eq!(resource.id().map(|id| id.to_string()), Some("org-1".into()));
        assert_eq!(
            serde_json::to_value(&resource).unwrap(),
            json!({
                "resourceType": "Organization",
                "id": "org-1",
                "name": "UNKNOWN"
            })
        );
    }
}
