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

use xmldoc::Element;

use crate::{
    error::Error,
    hl7v3::ElementExt,
    translation::release::{PATH_LINE_ITEMS, PATH_PRESCRIPTION},
};

pub const NAMESPACE_HL7: &str = "urn:hl7-org:v3";

/// Builds the `FragmentsToBeHashed` element whose canonical form is covered
/// by the prescription signature.
pub fn create_fragments(parent_prescription: &Element) -> Result<Element, Error> {
    let prescription = parent_prescription.required(PATH_PRESCRIPTION)?;

    let time = namespaced(prescription.required("author/time")?.clone());
    let id = namespaced(prescription.required("id")?.clone());
    let agent_person = namespaced(prescription.required("author/AgentPerson")?.clone());
    let record_target = namespaced(parent_prescription.required("recordTarget")?.clone());

    let mut ret = Element::new("FragmentsToBeHashed")
        .with_child(Element::new("Fragment").with_child(time).with_child(id))
        .with_child(Element::new("Fragment").with_child(agent_person))
        .with_child(Element::new("Fragment").with_child(record_target));

    for line_item in prescription.find_all(PATH_LINE_ITEMS) {
        let mut line_item = line_item.clone();
        if let Some(repeat_number) = line_item.child_mut("repeatNumber") {
            repeat_number.remove_children_named("low");
        }

        ret.push_element(Element::new("Fragment").with_child(namespaced(line_item)));
    }

    Ok(ret)
}

fn namespaced(mut element: Element) -> Element {
    element.set_attr("xmlns", NAMESPACE_HL7);

    element
}
