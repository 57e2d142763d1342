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
    bundle::Entry,
    primitives::Id,
    types::{Address, ContactPoint, HumanName, Identifier},
    Resource,
};
use xmldoc::Element;

use crate::error::Error;

pub const SYSTEM_ODS_CODE: &str = "https://fhir.nhs.uk/Id/ods-organization-code";
pub const SYSTEM_SNOMED: &str = "http://snomed.info/sct";
pub const SYSTEM_RFC4122: &str = "https://tools.ietf.org/html/rfc4122";
pub const SYSTEM_PRESCRIPTION_ORDER_NUMBER: &str = "https://fhir.nhs.uk/Id/prescription-order-number";
pub const SYSTEM_PRESCRIPTION_ORDER_ITEM_NUMBER: &str =
    "https://fhir.nhs.uk/Id/prescription-order-item-number";

pub fn new_id() -> Result<Id, Error> {
    Ok(Id::generate()?)
}

pub fn ods_identifier<V: Into<String>>(value: V) -> Identifier {
    Identifier::new(SYSTEM_ODS_CODE, value)
}

/* conversions */

pub fn convert_names<'a, I>(names: I) -> Result<Vec<HumanName>, Error>
where
    I: IntoIterator<Item = &'a Element>,
{
    names.into_iter().map(convert_name).collect()
}

fn convert_name(name: &Element) -> Result<HumanName, Error> {
    let mut ret = HumanName {
        use_: name.attr("use").map(convert_name_use).transpose()?,
        ..Default::default()
    };

    if let Some(text) = name.text().filter(|t| !t.trim().is_empty()) {
        ret.text = Some(text);

        return Ok(ret);
    }

    ret.family = name.child("family").and_then(Element::text);
    ret.given = texts(name, "given");
    ret.prefix = texts(name, "prefix");
    ret.suffix = texts(name, "suffix");

    Ok(ret)
}

fn convert_name_use(value: &str) -> Result<String, Error> {
    let ret = match value {
        "L" => "usual",
        "A" => "temp",
        "PREFERRED" => "nickname",
        "PREVIOUS" | "PREVIOUS-BIRTH" => "old",
        "PREVIOUS-BACHELOR" | "PREVIOUS-MAIDEN" => "maiden",
        other => return Err(Error::InvalidValue(format!("Unhandled name use '{}'.", other))),
    };

    Ok(ret.into())
}

pub fn convert_addresses<'a, I>(addresses: I) -> Result<Vec<Address>, Error>
where
    I: IntoIterator<Item = &'a Element>,
{
    addresses.into_iter().map(convert_address).collect()
}

fn convert_address(address: &Element) -> Result<Address, Error> {
    let mut ret = Address {
        use_: address.attr("use").map(convert_address_use).transpose()?,
        ..Default::default()
    };

    if let Some(text) = address.text().filter(|t| !t.trim().is_empty()) {
        ret.text = Some(text);

        return Ok(ret);
    }

    ret.line = texts(address, "streetAddressLine");
    ret.postal_code = address.child("postalCode").and_then(Element::text);

    Ok(ret)
}

fn convert_address_use(value: &str) -> Result<String, Error> {
    let ret = match value {
        "H" | "HP" => "home",
        "WP" | "BP" => "work",
        "TMP" => "temp",
        "PST" => "billing",
        other => {
            return Err(Error::InvalidValue(format!(
                "Unhandled address use '{}'.",
                other
            )))
        }
    };

    Ok(ret.into())
}

pub fn convert_telecoms<'a, I>(telecoms: I) -> Result<Vec<ContactPoint>, Error>
where
    I: IntoIterator<Item = &'a Element>,
{
    telecoms.into_iter().map(convert_telecom).collect()
}

fn convert_telecom(telecom: &Element) -> Result<ContactPoint, Error> {
    let use_ = telecom.attr("use").map(convert_telecom_use).transpose()?;
    let value = telecom.attr("value").map(|value| match value.find(':') {
        Some(pos) => value[pos + 1..].to_owned(),
        None => value.to_owned(),
    });

    Ok(ContactPoint {
        system: Some("phone".into()),
        value,
        use_,
    })
}

fn convert_telecom_use(value: &str) -> Result<String, Error> {
    let ret = match value {
        "H" | "HP" => "home",
        "WP" => "work",
        "HV" => "temp",
        "MC" | "PG" => "mobile",
        other => {
            return Err(Error::InvalidValue(format!(
                "Unhandled telecom use '{}'.",
                other
            )))
        }
    };

    Ok(ret.into())
}

fn texts(element: &Element, name: &str) -> Vec<String> {
    element
        .children_named(name)
        .filter_map(Element::text)
        .collect()
}

/* bundle helpers */

fn sort_index(resource: &Resource) -> usize {
    match resource {
        Resource::MessageHeader(_) => 0,
        Resource::MedicationRequest(_) => 1,
        Resource::Patient(_) => 2,
        Resource::Practitioner(_) => 3,
        Resource::PractitionerRole(_) => 4,
        Resource::Organization(_) => 5,
        Resource::Provenance(_) => 8,
        _ => 0,
    }
}

/// Orders resources by kind. Resources of the same kind keep their order.
pub fn sort_resources(resources: &mut Vec<Resource>) {
    resources.sort_by_key(sort_index);
}

pub fn into_entries(mut resources: Vec<Resource>) -> Vec<Entry> {
    sort_resources(&mut resources);

    resources.into_iter().map(Entry::with_full_url).collect()
}

#[cfg(test)]
mod tests {
    use resources::{
        message_header::Source, provenance::Provenance, types::Coding, MessageHeader,
        OperationOutcome, Patient, Practitioner,
    };
    use xmldoc::Doc;

    use super::*;

    fn parse(xml: &str) -> Element {
        Doc::parse_stripped(xml).unwrap().into_root()
    }

    #[test]
    fn convert_structured_name() {
        let name = parse(
            r#"<name use="L"><prefix>MR</prefix><given>DONOTUSE</given><given>XXTESTPATIENT-TGNP</given><family>TESTPATIENT-TGNP</family></name>"#,
        );
        let names = convert_names(vec![&name]).unwrap();

        assert_eq!(names[0].use_.as_deref(), Some("usual"));
        assert_eq!(names[0].family.as_deref(), Some("TESTPATIENT-TGNP"));
        assert_eq!(names[0].given, vec!["DONOTUSE", "XXTESTPATIENT-TGNP"]);
        assert_eq!(names[0].prefix, vec!["MR"]);
    }

    #[test]
    fn text_name_keeps_only_use_and_text() {
        let name = parse(r#"<name use="A">Dr Smith<family>Smith</family></name>"#);
        let names = convert_names(vec![&name]).unwrap();

        assert_eq!(names[0].use_.as_deref(), Some("temp"));
        assert_eq!(names[0].text.as_deref(), Some("Dr Smith"));
        assert!(names[0].family.is_none());
    }

    #[test]
    fn unknown_uses_are_rejected() {
        let name = parse(r#"<name use="XX"><family>Smith</family></name>"#);
        let telecom = parse(r#"<telecom use="AS" value="tel:01234567890"/>"#);

        assert!(matches!(convert_names(vec![&name]), Err(Error::InvalidValue(_))));
        assert!(matches!(convert_telecoms(vec![&telecom]), Err(Error::InvalidValue(_))));
    }

    #[test]
    fn convert_telecom_and_address() {
        let telecom = parse(r#"<telecom use="WP" value="tel:01234567890"/>"#);
        let address = parse(
            r#"<addr use="PST"><streetAddressLine>1 TRINITY TERRACE</streetAddressLine><streetAddressLine>LEEDS</streetAddressLine><postalCode>LS1 1AA</postalCode></addr>"#,
        );

        let telecoms = convert_telecoms(vec![&telecom]).unwrap();
        let addresses = convert_addresses(vec![&address]).unwrap();

        assert_eq!(telecoms[0].system.as_deref(), Some("phone"));
        assert_eq!(telecoms[0].use_.as_deref(), Some("work"));
        assert_eq!(telecoms[0].value.as_deref(), Some("01234567890"));
        assert_eq!(addresses[0].use_.as_deref(), Some("billing"));
        assert_eq!(addresses[0].line, vec!["1 TRINITY TERRACE", "LEEDS"]);
        assert_eq!(addresses[0].postal_code.as_deref(), Some("LS1 1AA"));
    }

    #[test]
    fn message_header_first_and_provenance_last() {
        let patient = Patient::new(new_id().unwrap());
        let first = Practitioner::new(new_id().unwrap());
        let second = Practitioner::new(new_id().unwrap());
        let header = MessageHeader {
            id: new_id().unwrap(),
            extension: Vec::new(),
            event_coding: Coding::default(),
            destination: Vec::new(),
            sender: None,
            source: Source {
                name: None,
                endpoint: "https://example.org".into(),
            },
            response: None,
            focus: Vec::new(),
        };
        let provenance = Provenance {
            id: new_id().unwrap(),
            target: Vec::new(),
            recorded: chrono::Utc::now().into(),
            agent: Vec::new(),
            signature: Vec::new(),
        };

        let first_id = first.id.clone();
        let second_id = second.id.clone();
        let entries = into_entries(vec![
            provenance.into(),
            first.into(),
            patient.into(),
            second.into(),
            header.into(),
        ]);

        let types = entries
            .iter()
            .map(|e| e.resource.resource_type())
            .collect::<Vec<_>>();
        assert_eq!(
            types,
            vec!["MessageHeader", "Patient", "Practitioner", "Practitioner", "Provenance"]
        );
        assert_eq!(entries[2].resource.id(), Some(&first_id));
        assert_eq!(entries[3].resource.id(), Some(&second_id));
        assert_eq!(
            entries[0].full_url,
            entries[0].resource.id().map(Id::to_urn)
        );
    }

    #[test]
    fn unlisted_resources_sort_with_message_header() {
        let mut resources: Vec<Resource> = vec![
            Patient::new(new_id().unwrap()).into(),
            OperationOutcome::default().into(),
        ];
        sort_resources(&mut resources);

        assert_eq!(resources[0].resource_type(), "OperationOutcome");
        assert_eq!(resources[1].resource_type(), "Patient");
        assert_eq!(
            sort_index(&resources[0]),
            sort_index(&Resource::Parameters(Default::default()))
        );
    }
}
