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

use std::borrow::Cow;
use std::str::{from_utf8, FromStr};

use quick_xml::{
    escape::unescape, events::BytesStart, events::Event, Error as QuickXmlError, Reader,
};

use crate::{node::split_name, Element, Error};

/* Namespaces */

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Namespaces {
    /// Element names are stored as written, including their prefix.
    Keep,

    /// Element names are stored without their prefix. Attributes, including
    /// namespace declarations, are kept as written.
    Strip,
}

/* Doc */

#[derive(Debug, Clone, PartialEq)]
pub struct Doc {
    root: Element,
}

impl Doc {
    pub fn parse(xml: &str, namespaces: Namespaces) -> Result<Self, Error> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(false);
        reader.check_end_names(true);

        let mut buf = Vec::new();
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let event = reader.read_event(&mut buf).map_err(|error| Error::XmlError {
                position: reader.buffer_position(),
                error,
            })?;

            match event {
                Event::Start(start) => {
                    stack.push(element_from_start(&start, namespaces, &reader)?);
                }
                Event::Empty(start) => {
                    let element = element_from_start(&start, namespaces, &reader)?;

                    close_element(element, &mut stack, &mut root)?;
                }
                Event::End(end) => {
                    let element = stack.pop().ok_or_else(|| {
                        Error::UnexpectedEndTag(String::from_utf8_lossy(end.name()).into_owned())
                    })?;

                    close_element(element, &mut stack, &mut root)?;
                }
                Event::Text(text) => {
                    let text = normalize_line_ends(text.escaped());
                    let text = unescape(&text).map_err(|error| Error::XmlError {
                        position: reader.buffer_position(),
                        error: QuickXmlError::EscapeError(error),
                    })?;
                    let text = from_utf8(&text)?;

                    match stack.last_mut() {
                        _ if is_whitespace(text) => (),
                        Some(parent) => parent.push_text(text),
                        None => return Err(Error::TextOutsideRoot),
                    }
                }
                Event::CData(text) => {
                    let text = normalize_line_ends(text.escaped());
                    let text = from_utf8(&text)?;

                    match stack.last_mut() {
                        Some(parent) => parent.push_text(text),
                        None => return Err(Error::TextOutsideRoot),
                    }
                }
                Event::Eof => break,
                _ => (),
            }

            buf.clear();
        }

        if let Some(element) = stack.pop() {
            return Err(Error::UnclosedElement(element.name().to_owned()));
        }

        let root = root.ok_or(Error::EmptyDocument)?;

        Ok(Self { root })
    }

    pub fn parse_stripped(xml: &str) -> Result<Self, Error> {
        Self::parse(xml, Namespaces::Strip)
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }

    pub fn into_root(self) -> Element {
        self.root
    }
}

impl FromStr for Doc {
    type Err = Error;

    fn from_str(xml: &str) -> Result<Self, Self::Err> {
        Self::parse(xml, Namespaces::Keep)
    }
}

impl From<Element> for Doc {
    fn from(root: Element) -> Self {
        Self { root }
    }
}

fn element_from_start(
    start: &BytesStart,
    namespaces: Namespaces,
    reader: &Reader<&[u8]>,
) -> Result<Element, Error> {
    let name = from_utf8(start.name())?;
    let name = match namespaces {
        Namespaces::Keep => name,
        Namespaces::Strip => split_name(name).1,
    };

    let mut element = Element::new(name);
    for attrib in start.attributes() {
        let attrib = attrib.map_err(|error| Error::XmlError {
            position: reader.buffer_position(),
            error,
        })?;
        let value = normalize_attr_whitespace(&attrib.value);
        let value = unescape(&value).map_err(|error| Error::XmlError {
            position: reader.buffer_position(),
            error: QuickXmlError::EscapeError(error),
        })?;

        element.set_attr(from_utf8(attrib.key)?, from_utf8(&value)?);
    }

    Ok(element)
}

fn close_element(
    element: Element,
    stack: &mut Vec<Element>,
    root: &mut Option<Element>,
) -> Result<(), Error> {
    match stack.last_mut() {
        Some(parent) => parent.push_element(element),
        None if root.is_some() => return Err(Error::MultipleRoots(element.name().to_owned())),
        None => *root = Some(element),
    }

    Ok(())
}

/// Folds `\r\n` and lone `\r` into `\n` (XML 1.0, 2.11). Character
/// references are left alone so `&#xD;` survives unescaping.
fn normalize_line_ends(raw: &[u8]) -> Cow<[u8]> {
    if !raw.contains(&b'\r') {
        return Cow::Borrowed(raw);
    }

    let mut ret = Vec::with_capacity(raw.len());
    let mut iter = raw.iter().peekable();
    while let Some(&b) = iter.next() {
        if b == b'\r' {
            if iter.peek() == Some(&&b'\n') {
                iter.next();
            }

            ret.push(b'\n');
        } else {
            ret.push(b);
        }
    }

    Cow::Owned(ret)
}

/// Attribute value normalization (XML 1.0, 3.3.3): literal whitespace
/// characters become a single space each, after line ends are folded.
fn normalize_attr_whitespace(raw: &[u8]) -> Cow<[u8]> {
    let raw = normalize_line_ends(raw);
    if !raw.iter().any(|b| *b == b'\t' || *b == b'\n') {
        return raw;
    }

    Cow::Owned(
        raw.iter()
            .map(|&b| match b {
                b'\t' | b'\n' => b' ',
                b => b,
            })
            .collect(),
    )
}

fn is_whitespace(s: &str) -> bool {
    s.chars().all(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    const XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<hl7:PORX_IN050101UK31 xmlns:hl7="urn:hl7-org:v3">
    <hl7:id root="ABC"/>
    <hl7:acknowledgement typeCode="AR">
        <hl7:note>a &amp; b<![CDATA[ <raw> ]]></hl7:note>
    </hl7:acknowledgement>
</hl7:PORX_IN050101UK31>"#;

    #[test]
    fn parse_strips_element_prefixes() {
        let doc = Doc::parse_stripped(XML).unwrap();
        let root = doc.root();

        assert_eq!(root.name(), "PORX_IN050101UK31");
        assert_eq!(root.attr("xmlns:hl7"), Some("urn:hl7-org:v3"));
        assert_eq!(root.find("id").and_then(|e| e.attr("root")), Some("ABC"));
        assert_eq!(
            root.find("acknowledgement/note").and_then(Element::text).as_deref(),
            Some("a & b <raw> ")
        );
    }

    #[test]
    fn parse_keeps_element_prefixes() {
        let doc: Doc = XML.parse().unwrap();

        assert_eq!(doc.root().name(), "hl7:PORX_IN050101UK31");
        assert_eq!(doc.root().local_name(), "PORX_IN050101UK31");
        assert_eq!(doc.root().prefix(), Some("hl7"));
    }

    #[test]
    fn parse_drops_whitespace_between_elements() {
        let doc = Doc::parse_stripped(XML).unwrap();

        assert_eq!(doc.root().children().len(), 2);
    }

    #[test]
    fn parse_rejects_broken_documents() {
        assert!(Doc::parse_stripped("<a><b></a>").is_err());
        assert!(Doc::parse_stripped("<a>").is_err());
        assert!(Doc::parse_stripped("<a/><b/>").is_err());
        assert!(Doc::parse_stripped("   ").is_err());
    }

    #[test]
    fn parse_folds_line_ends_in_text() {
        let doc = Doc::parse_stripped("<a>x\r\ny\rz<![CDATA[1\r\n2]]></a>").unwrap();

        assert_eq!(doc.root().text().as_deref(), Some("x\ny\nz1\n2"));
    }

    #[test]
    fn parse_keeps_escaped_carriage_return() {
        let doc = Doc::parse_stripped("<a>x&#xD;\r\ny</a>").unwrap();

        assert_eq!(doc.root().text().as_deref(), Some("x\r\ny"));
    }

    #[test]
    fn parse_normalizes_attribute_whitespace() {
        let doc = Doc::parse_stripped("<a b=\"x\ny\tz\r\nw\" c=\"1&#xA;2\"/>").unwrap();

        assert_eq!(doc.root().attr("b"), Some("x y z w"));
        assert_eq!(doc.root().attr("c"), Some("1\n2"));
    }
}
