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

use std::collections::BTreeMap;
use std::io::Write;

use crate::{node::split_name, Doc, Element, Error, Node};

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/* C14nMode */

/// Canonical XML flavours. Comments are never part of the tree, so both
/// modes behave like their "without comments" variant.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum C14nMode {
    Inclusive,
    Exclusive,
}

type NamespaceMap = BTreeMap<String, String>;

impl Element {
    pub fn c14n<W: Write>(&self, mode: C14nMode, writer: &mut W) -> Result<(), Error> {
        let mut canonicalizer = Canonicalizer { writer, mode };

        canonicalizer.element(self, &NamespaceMap::new(), &NamespaceMap::new())
    }

    pub fn to_c14n_string(&self, mode: C14nMode) -> Result<String, Error> {
        let mut buf = Vec::new();

        self.c14n(mode, &mut buf)?;

        Ok(String::from_utf8(buf)?)
    }
}

impl Doc {
    pub fn c14n<W: Write>(&self, mode: C14nMode, writer: &mut W) -> Result<(), Error> {
        self.root().c14n(mode, writer)
    }
}

struct Canonicalizer<'a, W: Write> {
    writer: &'a mut W,
    mode: C14nMode,
}

impl<W: Write> Canonicalizer<'_, W> {
    fn element(
        &mut self,
        element: &Element,
        in_scope: &NamespaceMap,
        rendered: &NamespaceMap,
    ) -> Result<(), Error> {
        let mut in_scope = in_scope.clone();
        for attrib in element.attributes() {
            if let Some(prefix) = attrib.namespace_prefix() {
                in_scope.insert(prefix.to_owned(), attrib.value.clone());
            }
        }

        let candidates = match self.mode {
            C14nMode::Inclusive => in_scope.keys().cloned().collect::<Vec<_>>(),
            C14nMode::Exclusive => visibly_utilized(element),
        };

        let mut rendered = rendered.clone();
        let mut declarations = Vec::new();
        for prefix in candidates {
            let uri = in_scope.get(&prefix).map(String::as_str).unwrap_or("");
            let current = rendered.get(&prefix).map(String::as_str).unwrap_or("");

            if uri == current || (uri.is_empty() && !prefix.is_empty()) {
                continue;
            }

            declarations.push((prefix.clone(), uri.to_owned()));
            rendered.insert(prefix, uri.to_owned());
        }

        let mut attributes = element
            .attributes()
            .iter()
            .filter(|a| a.namespace_prefix().is_none())
            .map(|a| {
                let (prefix, local) = split_name(&a.name);
                let uri = match prefix {
                    None => "",
                    Some("xml") => XML_NAMESPACE,
                    Some(p) => in_scope.get(p).map(String::as_str).unwrap_or(p),
                };

                (uri, local, a)
            })
            .collect::<Vec<_>>();
        attributes.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

        write!(self.writer, "<{}", element.name())?;
        for (prefix, uri) in &declarations {
            if prefix.is_empty() {
                write!(self.writer, " xmlns=\"{}\"", escape_attrib(uri))?;
            } else {
                write!(self.writer, " xmlns:{}=\"{}\"", prefix, escape_attrib(uri))?;
            }
        }
        for (_, _, attrib) in &attributes {
            write!(
                self.writer,
                " {}=\"{}\"",
                attrib.name,
                escape_attrib(&attrib.value)
            )?;
        }
        write!(self.writer, ">")?;

        for child in element.children() {
            match child {
                Node::Element(e) => self.element(e, &in_scope, &rendered)?,
                Node::Text(t) => write!(self.writer, "{}", escape_text(t))?,
            }
        }

        write!(self.writer, "</{}>", element.name())?;

        Ok(())
    }
}

fn visibly_utilized(element: &Element) -> Vec<String> {
    let mut ret = vec![element.prefix().unwrap_or("").to_owned()];

    for attrib in element.attributes() {
        if attrib.namespace_prefix().is_some() {
            continue;
        }

        match split_name(&attrib.name).0 {
            Some("xml") | None => (),
            Some(prefix) => ret.push(prefix.to_owned()),
        }
    }

    ret.sort();
    ret.dedup();

    ret
}

fn escape_text(s: &str) -> String {
    let mut ret = String::with_capacity(s.len());

    for c in s.chars() {
        match c {
            '&' => ret.push_str("&amp;"),
            '<' => ret.push_str("&lt;"),
            '>' => ret.push_str("&gt;"),
            '\r' => ret.push_str("&#xD;"),
            c => ret.push(c),
        }
    }

    ret
}

fn escape_attrib(s: &str) -> String {
    let mut ret = String::with_capacity(s.len());

    for c in s.chars() {
        match c {
            '&' => ret.push_str("&amp;"),
            '<' => ret.push_str("&lt;"),
            '"' => ret.push_str("&quot;"),
            '\t' => ret.push_str("&#x9;"),
            '\n' => ret.push_str("&#xA;"),
            '\r' => ret.push_str("&#xD;"),
            c => ret.push(c),
        }
    }

    ret
}
