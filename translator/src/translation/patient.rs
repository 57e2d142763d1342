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
    patient::Gender,
    types::{CodeableConcept, Coding, Extension, ExtensionValue, Identifier, Reference},
    Patient,
};
use xmldoc::Element;

use crate::{
    error::Error,
    hl7v3::{to_fhir_date, ElementExt},
};

use super::common::{convert_addresses, convert_names, convert_telecoms, new_id, ods_identifier};

pub const SYSTEM_NHS_NUMBER: &str = "https://fhir.nhs.uk/Id/nhs-number";

const URL_NHS_NUMBER_VERIFICATION_STATUS: &str =
    "https://fhir.hl7.org.uk/StructureDefinition/Extension-UKCore-NHSNumberVerificationStatus";
const SYSTEM_NHS_NUMBER_VERIFICATION_STATUS: &str =
    "https://fhir.hl7.org.uk/CodeSystem/UKCore-NHSNumberVerificationStatus";

/// Creates the patient from a `recordTarget/Patient` element.
pub fn create_patient(patient: &Element) -> Result<Patient, Error> {
    let mut ret = Patient::new(new_id()?);

    let nhs_number = patient.required_attr("id", "extension")?;
    let mut identifier = Identifier::new(SYSTEM_NHS_NUMBER, nhs_number);
    identifier.extension.push(Extension::new(
        URL_NHS_NUMBER_VERIFICATION_STATUS,
        ExtensionValue::CodeableConcept(CodeableConcept::from(Coding::new(
            SYSTEM_NHS_NUMBER_VERIFICATION_STATUS,
            "01",
            Some("Number present and verified".into()),
        ))),
    ));
    ret.identifier.push(identifier);

    ret.address = convert_addresses(patient.children_named("addr"))?;
    ret.telecom = convert_telecoms(patient.children_named("telecom"))?;

    if let Some(person) = patient.child("patientPerson") {
        ret.name = convert_names(person.children_named("name"))?;
        ret.gender = person
            .optional_attr("administrativeGenderCode", "code")
            .map(convert_gender);
        ret.birth_date = person
            .optional_attr("birthTime", "value")
            .map(to_fhir_date)
            .transpose()?;

        let gp = person.optional_attr(
            "playedProviderPatient/subjectOf/patientCareProvision/responsibleParty/healthCareProvider/id",
            "extension",
        );
        if let Some(gp) = gp {
            ret.general_practitioner
                .push(Reference::by_identifier(ods_identifier(gp)));
        }
    }

    Ok(ret)
}

fn convert_gender(code: &str) -> Gender {
    match code {
        "1" => Gender::Male,
        "2" => Gender::Female,
        "9" => Gender::Other,
        _ => Gender::Unknown,
    }
}
