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

use std::convert::TryFrom;

use resources::{
    medication_request::{DispenseRequest, Dosage, Intent, Status, Substitution},
    primitives::{DateTime, Id},
    types::{
        Annotation, CodeableConcept, Coding, Extension, ExtensionValue, Identifier, Period,
        Quantity, Reference,
    },
    MedicationRequest,
};
use serde_json::Number;
use xmldoc::Element;

use crate::{
    error::Error,
    hl7v3::{to_fhir_date, to_fhir_date_time, ElementExt},
};

use super::super::{
    additional_instructions::AdditionalInstructions,
    cancellation::URL_RESPONSIBLE_PRACTITIONER,
    common::{
        new_id, ods_identifier, SYSTEM_PRESCRIPTION_ORDER_ITEM_NUMBER,
        SYSTEM_PRESCRIPTION_ORDER_NUMBER, SYSTEM_SNOMED,
    },
};

const URL_PRESCRIPTION_TYPE: &str =
    "https://fhir.nhs.uk/StructureDefinition/Extension-DM-PrescriptionType";
const URL_PRESCRIPTION_ENDORSEMENT: &str =
    "https://fhir.nhs.uk/StructureDefinition/Extension-DM-PrescriptionEndorsement";
const URL_REPEAT_INFORMATION: &str =
    "https://fhir.hl7.org.uk/StructureDefinition/Extension-UKCore-MedicationRepeatInformation";
const URL_CONTROLLED_DRUG: &str =
    "https://fhir.nhs.uk/StructureDefinition/Extension-DM-ControlledDrug";
const URL_DISPENSING_INFORMATION: &str =
    "https://fhir.nhs.uk/StructureDefinition/Extension-EPS-DispensingInformation";
const URL_EPS_REPEAT_INFORMATION: &str =
    "https://fhir.nhs.uk/StructureDefinition/Extension-EPS-RepeatInformation";
const URL_PRESCRIPTION_ID: &str =
    "https://fhir.nhs.uk/StructureDefinition/Extension-DM-PrescriptionId";
const URL_PERFORMER_SITE_TYPE: &str =
    "https://fhir.nhs.uk/StructureDefinition/Extension-DM-PerformerSiteType";

const SYSTEM_PRESCRIPTION_TYPE: &str = "https://fhir.nhs.uk/CodeSystem/prescription-type";
const SYSTEM_ENDORSEMENT: &str = "https://fhir.nhs.uk/CodeSystem/medicationrequest-endorsement";
const SYSTEM_PRESCRIPTION: &str = "https://fhir.nhs.uk/Id/prescription";
const SYSTEM_CATEGORY: &str = "http://terminology.hl7.org/CodeSystem/medicationrequest-category";
const SYSTEM_COURSE_OF_THERAPY: &str =
    "http://terminology.hl7.org/CodeSystem/medicationrequest-course-of-therapy";
const SYSTEM_COURSE_OF_THERAPY_NHS: &str =
    "https://fhir.nhs.uk/CodeSystem/medicationrequest-course-of-therapy";
const SYSTEM_SITE_PREFERENCE: &str = "https://fhir.nhs.uk/CodeSystem/dispensing-site-preference";
const SYSTEM_UCUM: &str = "http://unitsofmeasure.org";

const TREATMENT_TYPE_REPEAT_DISPENSING: &str = "0003";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CourseOfTherapy {
    Acute,
    Continuous,
    ContinuousRepeatDispensing,
}

impl CourseOfTherapy {
    fn new(prescription: &Element, line_item: &Element) -> Self {
        let treatment_type = prescription.optional_attr(
            "pertinentInformation5/pertinentPrescriptionTreatmentType/value",
            "code",
        );

        if treatment_type == Some(TREATMENT_TYPE_REPEAT_DISPENSING) {
            Self::ContinuousRepeatDispensing
        } else if line_item.child("repeatNumber").is_some() {
            Self::Continuous
        } else {
            Self::Acute
        }
    }

    fn codeable_concept(self) -> CodeableConcept {
        let coding = match self {
            Self::Acute => Coding::new(
                SYSTEM_COURSE_OF_THERAPY,
                "acute",
                Some("Short course (acute) therapy".into()),
            ),
            Self::Continuous => Coding::new(
                SYSTEM_COURSE_OF_THERAPY,
                "continuous",
                Some("Continuous long term therapy".into()),
            ),
            Self::ContinuousRepeatDispensing => Coding::new(
                SYSTEM_COURSE_OF_THERAPY_NHS,
                "continuous-repeat-dispensing",
                Some("Continuous long term (repeat dispensing)".into()),
            ),
        };

        coding.into()
    }
}

/// Resources a medication request of a released prescription refers to.
pub struct Context<'a> {
    pub prescription: &'a Element,
    pub patient: &'a Id,
    pub requester: Reference,
    pub responsible_party: Reference,
}

/// Creates the medication request for one `pertinentLineItem` of a
/// `pertinentPrescription`.
pub fn create_medication_request(
    ctx: &Context<'_>,
    line_item: &Element,
) -> Result<MedicationRequest, Error> {
    let prescription = ctx.prescription;

    let instructions = AdditionalInstructions::parse(
        &line_item
            .text_at("pertinentInformation1/pertinentAdditionalInstructions/value")
            .unwrap_or_default(),
    );
    let course_of_therapy = CourseOfTherapy::new(prescription, line_item);
    let intent = match course_of_therapy {
        CourseOfTherapy::ContinuousRepeatDispensing => Intent::ReflexOrder,
        _ => Intent::Order,
    };
    let status = match line_item.optional_attr("pertinentInformation4/pertinentItemStatus/value", "code") {
        Some(code) => item_status(code)?,
        None => Status::Active,
    };

    let material = line_item.required("product/manufacturedProduct/manufacturedRequestedMaterial/code")?;
    let medication = Coding::new(
        SYSTEM_SNOMED,
        material.required_attr("", "code")?,
        material.attr("displayName").map(Into::into),
    );

    let mut ret = MedicationRequest::new(
        new_id()?,
        status,
        intent,
        medication.into(),
        Reference::to(ctx.patient),
    );

    ret.extension = extensions(ctx, line_item, &instructions)?;
    ret.identifier.push(Identifier::new(
        SYSTEM_PRESCRIPTION_ORDER_ITEM_NUMBER,
        line_item.required_attr("id", "root")?.to_lowercase(),
    ));
    ret.authored_on = Some(to_fhir_date_time(
        prescription.required_attr("author/time", "value")?,
    )?);
    ret.category.push(
        Coding::new(SYSTEM_CATEGORY, "outpatient", Some("Outpatient".into())).into(),
    );
    ret.requester = Some(ctx.requester.clone());
    ret.group_identifier = Some(group_identifier(prescription)?);
    ret.course_of_therapy_type = Some(course_of_therapy.codeable_concept());

    if !instructions.additional_instructions.is_empty() {
        ret.note.push(Annotation {
            text: instructions.additional_instructions.clone(),
        });
    }

    ret.dosage_instruction.push(Dosage {
        text: line_item.text_at("pertinentInformation2/pertinentDosageInstructions/value"),
        ..Default::default()
    });
    ret.dispense_request = Some(dispense_request(prescription, line_item)?);
    ret.substitution = Some(Substitution {
        allowed_boolean: false,
    });

    if course_of_therapy != CourseOfTherapy::Acute {
        if let Some(repeat_number) = prescription.child("repeatNumber") {
            ret.based_on.push(based_on(line_item, repeat_number)?);
        }
    }

    Ok(ret)
}

fn item_status(code: &str) -> Result<Status, Error> {
    match code {
        "0001" => Ok(Status::Completed),
        "0002" | "0006" => Ok(Status::Stopped),
        "0003" | "0004" | "0007" | "0008" => Ok(Status::Active),
        "0005" => Ok(Status::Cancelled),
        other => Err(Error::InvalidValue(format!(
            "Unhandled item status code '{}'.",
            other
        ))),
    }
}

fn extensions(
    ctx: &Context<'_>,
    line_item: &Element,
    instructions: &AdditionalInstructions,
) -> Result<Vec<Extension>, Error> {
    let prescription = ctx.prescription;

    let prescription_type =
        CodedValue::read(prescription.required("pertinentInformation4/pertinentPrescriptionType/value")?)?;

    let mut ret = vec![
        Extension::new(
            URL_RESPONSIBLE_PRACTITIONER,
            ExtensionValue::Reference(ctx.responsible_party.clone()),
        ),
        Extension::new(
            URL_PRESCRIPTION_TYPE,
            ExtensionValue::Coding(prescription_type.coding(SYSTEM_PRESCRIPTION_TYPE)),
        ),
    ];

    for endorsement in line_item.find_all("pertinentInformation3/pertinentPrescriberEndorsement/value") {
        let endorsement = CodedValue::read(endorsement)?;

        ret.push(Extension::new(
            URL_PRESCRIPTION_ENDORSEMENT,
            ExtensionValue::CodeableConcept(endorsement.coding(SYSTEM_ENDORSEMENT).into()),
        ));
    }

    let review_date = prescription.optional_attr("pertinentInformation7/pertinentReviewDate/value", "value");
    let issued = line_item.optional_attr("repeatNumber/low", "value");
    if review_date.is_some() || line_item.child("repeatNumber").is_some() {
        let mut extension = Vec::new();

        if let Some(review_date) = review_date {
            let date = to_fhir_date(review_date)?;
            let date = DateTime::try_from(date.as_str()).map_err(Error::InvalidValue)?;

            extension.push(Extension::new(
                "authorisationExpiryDate",
                ExtensionValue::DateTime(date),
            ));
        }

        if let Some(issued) = issued {
            extension.push(Extension::new(
                "numberOfPrescriptionsIssued",
                ExtensionValue::UnsignedInt(parse_number(issued)?),
            ));
        }

        ret.push(Extension::complex(URL_REPEAT_INFORMATION, extension));
    }

    if !instructions.controlled_drug_words.is_empty() {
        ret.push(Extension::complex(
            URL_CONTROLLED_DRUG,
            vec![Extension::new(
                "quantityWords",
                ExtensionValue::String(instructions.controlled_drug_words.clone()),
            )],
        ));
    }

    if let Some(previous) = prescription.optional_attr("predecessor/priorPreviousIssueDate/value", "value") {
        ret.push(Extension::complex(
            URL_DISPENSING_INFORMATION,
            vec![Extension::new(
                "dateLastDispensed",
                ExtensionValue::DateTime(to_fhir_date_time(previous)?),
            )],
        ));
    }

    Ok(ret)
}

fn group_identifier(prescription: &Element) -> Result<Identifier, Error> {
    let mut ids = prescription.children_named("id");
    let long_form = ids
        .next()
        .and_then(|id| id.attr("root"))
        .ok_or_else(|| Error::MissingElement("pertinentPrescription/id".into()))?;
    let short_form = ids
        .next()
        .and_then(|id| id.attr("extension"))
        .ok_or_else(|| Error::MissingElement("pertinentPrescription/id[1]".into()))?;

    let mut ret = Identifier::new(SYSTEM_PRESCRIPTION_ORDER_NUMBER, short_form);
    ret.extension.push(Extension::new(
        URL_PRESCRIPTION_ID,
        ExtensionValue::Identifier(Identifier::new(
            SYSTEM_PRESCRIPTION,
            long_form.to_lowercase(),
        )),
    ));

    Ok(ret)
}

fn dispense_request(prescription: &Element, line_item: &Element) -> Result<DispenseRequest, Error> {
    let site_preference = prescription.required_attr(
        "pertinentInformation1/pertinentDispensingSitePreference/value",
        "code",
    )?;

    let mut ret = DispenseRequest {
        extension: vec![Extension::new(
            URL_PERFORMER_SITE_TYPE,
            ExtensionValue::Coding(Coding::new(SYSTEM_SITE_PREFERENCE, site_preference, None)),
        )],
        number_of_repeats_allowed: Some(
            match line_item.optional_attr("repeatNumber/high", "value") {
                Some(high) => parse_number::<u32>(high)?.saturating_sub(1),
                None => 0,
            },
        ),
        quantity: Some(quantity(
            line_item.required("component/lineItemQuantity/quantity/translation")?,
        )?),
        ..Default::default()
    };

    if let Some(effective_time) = prescription.find("component1/daysSupply/effectiveTime") {
        let start = effective_time.optional_attr("low", "value").map(to_fhir_date).transpose()?;
        let end = effective_time.optional_attr("high", "value").map(to_fhir_date).transpose()?;

        if start.is_some() || end.is_some() {
            ret.validity_period = Some(Period { start, end });
        }
    }

    if let Some(width) = prescription.optional_attr("component1/daysSupply/expectedUseTime/width", "value") {
        ret.expected_supply_duration = Some(Quantity {
            value: Some(parse_decimal(width)?),
            unit: Some("days".into()),
            system: Some(SYSTEM_UCUM.into()),
            code: Some("d".into()),
        });
    }

    if let Some(ods_code) = prescription.optional_attr("performer/AgentOrgSDS/agentOrganizationSDS/id", "extension") {
        ret.performer = Some(Reference::by_identifier(ods_identifier(ods_code)));
    }

    Ok(ret)
}

fn quantity(translation: &Element) -> Result<Quantity, Error> {
    let value = translation.required_attr("", "value")?;
    let value = if value.starts_with('.') {
        format!("0{}", value)
    } else {
        value.to_owned()
    };

    Ok(Quantity {
        value: Some(parse_decimal(&value)?),
        unit: translation.attr("displayName").map(Into::into),
        system: Some(SYSTEM_SNOMED.into()),
        code: translation.attr("code").map(Into::into),
    })
}

fn based_on(line_item: &Element, repeat_number: &Element) -> Result<Reference, Error> {
    let high = parse_number::<i64>(repeat_number.required_attr("high", "value")?)?;
    let low = parse_number::<i64>(repeat_number.required_attr("low", "value")?)?;

    Ok(Reference {
        extension: vec![Extension::complex(
            URL_EPS_REPEAT_INFORMATION,
            vec![
                Extension::new("numberOfRepeatsAllowed", ExtensionValue::Integer(high - 1)),
                Extension::new("numberOfRepeatsIssued", ExtensionValue::Integer(low - 1)),
            ],
        )],
        reference: Some(line_item.required_attr("id", "root")?.to_lowercase()),
        ..Default::default()
    })
}

fn parse_number<T: std::str::FromStr>(value: &str) -> Result<T, Error> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::InvalidValue(format!("Invalid number '{}'.", value)))
}

fn parse_decimal(value: &str) -> Result<Number, Error> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::InvalidValue(format!("Invalid decimal '{}'.", value)))
}

/// Coded value whose code system is replaced by a FHIR code system.
struct CodedValue<'a> {
    code: &'a str,
    display: Option<&'a str>,
}

impl<'a> CodedValue<'a> {
    fn read(element: &'a Element) -> Result<Self, Error> {
        Ok(Self {
            code: element.required_attr("", "code")?,
            display: element.attr("displayName"),
        })
    }

    fn coding(&self, system: &str) -> Coding {
        Coding::new(system, self.code, self.display.map(Into::into))
    }
}

#[cfg(test)]
mod tests {
    use xmldoc::Doc;

    use crate::test_support::PARENT_PRESCRIPTION;

    use super::*;

    fn prescription() -> Element {
        Doc::parse_stripped(PARENT_PRESCRIPTION)
            .unwrap()
            .into_root()
            .find("pertinentInformation1/pertinentPrescription")
            .unwrap()
            .clone()
    }

    fn create(prescription: &Element) -> MedicationRequest {
        let patient = new_id().unwrap();
        let role = new_id().unwrap();
        let ctx = Context {
            prescription,
            patient: &patient,
            requester: Reference::to(&role),
            responsible_party: Reference::to(&role),
        };
        let line_item = prescription
            .find("pertinentInformation2/pertinentLineItem")
            .unwrap();

        create_medication_request(&ctx, line_item).unwrap()
    }

    #[test]
    fn acute_prescription() {
        let prescription = prescription();
        let medication_request = create(&prescription);

        assert_eq!(medication_request.status, Status::Active);
        assert_eq!(medication_request.intent, Intent::Order);
        assert_eq!(
            medication_request.course_of_therapy_type,
            Some(CourseOfTherapy::Acute.codeable_concept())
        );
        assert!(medication_request.based_on.is_empty());

        let dispense_request = medication_request.dispense_request.unwrap();
        assert_eq!(dispense_request.number_of_repeats_allowed, Some(0));
        let quantity = dispense_request.quantity.unwrap();
        assert_eq!(quantity.value, Some(Number::from(28)));
        assert_eq!(quantity.unit.as_deref(), Some("tablet"));
        assert_eq!(
            dispense_request
                .performer
                .and_then(|p| p.identifier)
                .and_then(|i| i.value)
                .as_deref(),
            Some("VNCEL")
        );

        let group_identifier = medication_request.group_identifier.unwrap();
        assert_eq!(group_identifier.value.as_deref(), Some("83C40E-A23856-00123C"));
        assert_eq!(
            group_identifier.extension[0].value,
            Some(ExtensionValue::Identifier(Identifier::new(
                SYSTEM_PRESCRIPTION,
                "f2bbcd8c-e1d5-4a8b-8cf1-2a4e0c7f9b11"
            )))
        );
        assert_eq!(
            medication_request.note,
            vec![Annotation {
                text: "Take with food".into()
            }]
        );
    }

    #[test]
    fn repeat_dispensing_prescription() {
        let mut prescription = prescription();
        prescription
            .find_mut("pertinentInformation5/pertinentPrescriptionTreatmentType/value")
            .unwrap()
            .set_attr("code", "0003");
        prescription.push_element(
            Element::new("repeatNumber")
                .with_child(Element::new("low").with_attr("value", "1"))
                .with_child(Element::new("high").with_attr("value", "6")),
        );
        prescription
            .find_mut("pertinentInformation2/pertinentLineItem")
            .unwrap()
            .push_element(
                Element::new("repeatNumber")
                    .with_child(Element::new("low").with_attr("value", "1"))
                    .with_child(Element::new("high").with_attr("value", "6")),
            );

        let medication_request = create(&prescription);

        assert_eq!(medication_request.intent, Intent::ReflexOrder);
        assert_eq!(
            medication_request
                .dispense_request
                .and_then(|d| d.number_of_repeats_allowed),
            Some(5)
        );
        assert_eq!(
            medication_request.based_on[0].reference.as_deref(),
            Some("a54219b8-f741-4c47-b662-e4f8dfa49ab6")
        );
        assert_eq!(
            medication_request.based_on[0].extension[0].extension[0].value,
            Some(ExtensionValue::Integer(5))
        );
        assert!(medication_request
            .extension
            .iter()
            .any(|e| e.url == URL_REPEAT_INFORMATION));
    }

    #[test]
    fn unknown_item_status_is_an_error() {
        assert!(matches!(item_status("0042"), Err(Error::InvalidValue(_))));
        assert_eq!(item_status("0005").unwrap(), Status::Cancelled);
    }
}
