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

use std::collections::HashMap;

use resources::{
    types::{CodeableConcept, Coding, Identifier, Reference},
    Organization, Practitioner, PractitionerRole, Resource,
};
use serde::Deserialize;
use xmldoc::Element;

use crate::{error::Error, hl7v3::ElementExt};

use super::common::{
    convert_addresses, convert_names, convert_telecoms, new_id, ods_identifier,
};

pub const SYSTEM_SDS_ROLE_PROFILE_ID: &str = "https://fhir.nhs.uk/Id/sds-role-profile-id";
pub const SYSTEM_GMP_NUMBER: &str = "https://fhir.hl7.org.uk/Id/gmp-number";
pub const SYSTEM_GMC_NUMBER: &str = "https://fhir.hl7.org.uk/Id/gmc-number";
pub const SYSTEM_SPURIOUS_CODE: &str = "https://fhir.hl7.org.uk/Id/nhsbsa-spurious-code";
pub const SYSTEM_PROFESSIONAL_CODE: &str = "https://fhir.hl7.org.uk/Id/professional-code";

const SYSTEM_JOB_ROLE_CODE: &str = "https://fhir.hl7.org.uk/CodeSystem/UKCore-SDSJobRoleCode";
const SYSTEM_JOB_ROLE_NAME: &str = "https://fhir.hl7.org.uk/CodeSystem/UKCore-SDSJobRoleName";

/* ActorIdentity */

/// Comparison key of an `AgentPerson`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorIdentity {
    pub role_profile_id: Option<String>,
    pub user_id: Option<String>,
}

impl ActorIdentity {
    pub fn from_agent_person(agent_person: &Element) -> Self {
        Self {
            role_profile_id: agent_person.optional_attr("id", "extension").map(Into::into),
            user_id: agent_person
                .optional_attr("agentPerson/id", "extension")
                .map(Into::into),
        }
    }

    /// Actors are the same only if both carry the same role profile id.
    pub fn is_same(&self, other: &ActorIdentity) -> bool {
        match (&self.role_profile_id, &other.role_profile_id) {
            (Some(a), Some(b)) => a == b,
            (_, _) => false,
        }
    }
}

/* Actor */

#[derive(Debug, Clone)]
pub struct Actor {
    pub identity: ActorIdentity,
    pub practitioner_role: PractitionerRole,
    pub practitioner: Practitioner,
    pub organization: Organization,
}

impl Actor {
    pub fn from_agent_person(agent_person: &Element) -> Result<Self, Error> {
        let identity = ActorIdentity::from_agent_person(agent_person);
        let represented_organization = agent_person.required("representedOrganization")?;

        let organization = create_organization(represented_organization)?;

        let mut practitioner = Practitioner::new(new_id()?);
        if let Some(user_id) = &identity.user_id {
            let identifier = classify_user_id(user_id);
            if identifier.system.as_deref() != Some(SYSTEM_SPURIOUS_CODE) {
                practitioner.identifier.push(identifier);
            }
        }
        practitioner.name = convert_names(agent_person.find_all("agentPerson/name"))?;

        let mut practitioner_role = PractitionerRole::new(new_id()?);
        if let Some(role_profile_id) = &identity.role_profile_id {
            practitioner_role
                .identifier
                .push(Identifier::new(SYSTEM_SDS_ROLE_PROFILE_ID, role_profile_id.as_str()));
        }
        if let Some(user_id) = &identity.user_id {
            let identifier = classify_user_id(user_id);
            if identifier.system.as_deref() == Some(SYSTEM_SPURIOUS_CODE) {
                practitioner_role.identifier.push(identifier);
            }
        }
        practitioner_role.practitioner = Some(Reference::to(&practitioner.id));
        practitioner_role.organization = Some(Reference::to(&organization.id));
        if let Some(code) = agent_person.optional_attr("code", "code") {
            practitioner_role.code.push(job_role_code(code));
        }
        practitioner_role.telecom = convert_telecoms(
            agent_person
                .children_named("telecom")
                .filter(|t| !t.attributes().is_empty()),
        )?;

        Ok(Self {
            identity,
            practitioner_role,
            practitioner,
            organization,
        })
    }

    pub fn role_reference(&self) -> Reference {
        Reference::to(&self.practitioner_role.id)
    }

    pub fn ods_code(&self) -> Option<&str> {
        self.organization
            .identifier
            .first()
            .and_then(|i| i.value.as_deref())
    }

    /// Adds the identifiers `identity` carries that are not yet known.
    fn merge(&mut self, identity: &ActorIdentity) {
        let user_id = match &identity.user_id {
            Some(user_id) => user_id,
            None => return,
        };

        let identifier = classify_user_id(user_id);
        let identifiers = if identifier.system.as_deref() == Some(SYSTEM_SPURIOUS_CODE) {
            &mut self.practitioner_role.identifier
        } else {
            &mut self.practitioner.identifier
        };

        if !identifiers.iter().any(|i| i.matches(&identifier)) {
            identifiers.push(identifier);
        }
    }
}

/* Actors */

/// Index of a resolved actor inside [`Actors`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActorRef(usize);

/// Distinct actors of one bundle. Resolving an agent person that matches an
/// already known actor returns the existing one.
#[derive(Debug, Default)]
pub struct Actors {
    actors: Vec<Actor>,
}

impl Actors {
    pub fn resolve(&mut self, agent_person: &Element) -> Result<ActorRef, Error> {
        let identity = ActorIdentity::from_agent_person(agent_person);

        if let Some(pos) = self.actors.iter().position(|a| a.identity.is_same(&identity)) {
            self.actors[pos].merge(&identity);

            return Ok(ActorRef(pos));
        }

        self.actors.push(Actor::from_agent_person(agent_person)?);

        Ok(ActorRef(self.actors.len() - 1))
    }

    pub fn get(&self, actor: ActorRef) -> &Actor {
        &self.actors[actor.0]
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    pub fn into_resources(self) -> Vec<Resource> {
        let mut ret = Vec::with_capacity(3 * self.actors.len());

        for actor in self.actors {
            ret.push(actor.practitioner.into());
            ret.push(actor.practitioner_role.into());
            ret.push(actor.organization.into());
        }

        ret
    }
}

/* helpers */

pub fn create_organization(organization: &Element) -> Result<Organization, Error> {
    let mut ret = Organization::new(new_id()?);

    if let Some(ods_code) = organization.optional_attr("id", "extension") {
        ret.identifier.push(ods_identifier(ods_code));
    }
    ret.name = organization.text_at("name");
    ret.telecom = convert_telecoms(organization.children_named("telecom"))?;
    ret.address = convert_addresses(organization.children_named("addr"))?;

    if let Some(parent) = organization.find("healthCareProviderLicense/Organization") {
        if let Some(ods_code) = parent.optional_attr("id", "extension") {
            let mut part_of = Reference::by_identifier(ods_identifier(ods_code));
            part_of.display = parent.text_at("name");

            ret.part_of = Some(part_of);
        }
    }

    Ok(ret)
}

/// Identifier for the professional id of an agent person.
pub fn classify_user_id(user_id: &str) -> Identifier {
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());

    let rest = user_id.get(1..).unwrap_or_default();
    let prefixed = |prefix: char| user_id.starts_with(prefix) && rest.len() == 7 && digits(rest);

    let system = if prefixed('G') {
        SYSTEM_GMP_NUMBER
    } else if prefixed('C') {
        SYSTEM_GMC_NUMBER
    } else if user_id.len() == 6 && digits(user_id) {
        SYSTEM_SPURIOUS_CODE
    } else {
        SYSTEM_PROFESSIONAL_CODE
    };

    Identifier::new(system, user_id)
}

fn job_role_code(code: &str) -> CodeableConcept {
    let system = if code.contains(':') {
        SYSTEM_JOB_ROLE_CODE
    } else {
        SYSTEM_JOB_ROLE_NAME
    };
    let last = code.rsplit(':').next().unwrap_or(code);
    let display = JOB_ROLE_NAMES.get(last).cloned();

    Coding::new(system, code, display).into()
}

#[derive(Deserialize)]
struct RoleName {
    code: String,
    display: String,
}

lazy_static! {
    static ref JOB_ROLE_NAMES: HashMap<String, String> =
        serde_json::from_str::<Vec<RoleName>>(include_str!("role_names.json"))
            .unwrap()
            .into_iter()
            .map(|role| (role.code, role.display))
            .collect();
}
