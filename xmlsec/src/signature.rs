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

use base64::decode;
use openssl::{
    pkey::{HasPublic, PKeyRef},
    x509::X509,
};
use xmldoc::Element;

use super::{
    C14n, C14nMethod, ChainBuilder, Data, DigestValue, Error, Hash, HashMethod, SignatureMethod,
    SignatureValue,
};

macro_rules! read_xml {
    // Iterate over the child elements of the passed element
    ( begin $element:expr ) => {{
        $element.child_elements().peekable()
    }};

    // Check if no siblings are left
    ( end $iter:expr ) => {{
        if let Some(element) = $iter.next() {
            return Err(Error::InvalidSignatureNode(format!(
                "Expected end but found element '{}'",
                element.local_name()
            )));
        }
    }};

    // Move on to the next sibling and check if it has the correct name
    ( next $iter:expr, $name:expr ) => {{
        match $iter.next() {
            Some(element) if element.local_name() == $name => element,
            Some(element) => {
                return Err(Error::InvalidSignatureNode(format!(
                    "Expected element '{}' but found '{}'",
                    $name,
                    element.local_name()
                )))
            }
            None => {
                return Err(Error::InvalidSignatureNode(format!(
                    "Expected element '{}' but found end",
                    $name
                )))
            }
        }
    }};

    // Move on to the next sibling if it has the given name
    ( next_opt $iter:expr, $name:expr ) => {{
        if $iter.peek().map_or(false, |e| e.local_name() == $name) {
            $iter.next()
        } else {
            None
        }
    }};

    // Collect all following siblings with the given name
    ( next_vec $iter:expr, $name:expr ) => {{
        let mut ret = Vec::new();

        while let Some(element) = read_xml!(next_opt $iter, $name) {
            ret.push(element);
        }

        ret
    }};
}

/* SignatureMaterial */

/// Parts of an enveloped XML-DSig `Signature` element needed to verify it.
///
/// The passed element is expected to carry unprefixed names, as produced by
/// `xmldoc::Doc::parse_stripped`.
#[derive(Debug, Clone)]
pub struct SignatureMaterial {
    signed_info: Element,
    canonicalization_method: C14nMethod,
    signature_method: SignatureMethod,
    digest_method: HashMethod,
    digest_value: String,
    signature_value: String,
    certificate: String,
}

impl SignatureMaterial {
    pub fn from_element(signature: &Element) -> Result<Self, Error> {
        if signature.local_name() != NODE_SIGNATURE {
            return Err(Error::InvalidSignatureNode(format!(
                "Expected element '{}' but found '{}'",
                NODE_SIGNATURE,
                signature.local_name()
            )));
        }

        let mut iter = read_xml!(begin signature);
        let node_signed_info = read_xml!(next iter, NODE_SIGNED_INFO);
        let node_signature_value = read_xml!(next iter, NODE_SIGNATURE_VALUE);
        let node_key_info = read_xml!(next iter, NODE_KEY_INFO);
        let _node_objects = read_xml!(next_vec iter, NODE_OBJECT);
        read_xml!(end iter);

        let certificate = process_key_info(node_key_info)?;
        let signature_value = content(node_signature_value)?;

        let mut iter = read_xml!(begin node_signed_info);
        let node_canonicalization_method = read_xml!(next iter, NODE_CANONICALIZATION_METHOD);
        let node_signature_method = read_xml!(next iter, NODE_SIGNATURE_METHOD);
        let node_reference = read_xml!(next iter, NODE_REFERENCE);
        read_xml!(end iter);

        let canonicalization_method =
            C14nMethod::from_algorithm(algorithm(node_canonicalization_method)?)?;
        let signature_method = SignatureMethod::from_algorithm(algorithm(node_signature_method)?);

        let mut iter = read_xml!(begin node_reference);
        let _node_transforms = read_xml!(next_opt iter, NODE_TRANSFORMS);
        let node_digest_method = read_xml!(next iter, NODE_DIGEST_METHOD);
        let node_digest_value = read_xml!(next iter, NODE_DIGEST_VALUE);
        read_xml!(end iter);

        /* Unknown signature methods are read as rsa-sha1 with a sha1 digest */
        let (signature_method, digest_method) = match signature_method {
            Ok(signature_method) => (
                signature_method,
                HashMethod::from_algorithm(algorithm(node_digest_method)?)?,
            ),
            Err(_) => (SignatureMethod::RsaSha1, HashMethod::Sha1),
        };
        let digest_value = content(node_digest_value)?;

        let namespace = signature.attr("xmlns").unwrap_or(NAMESPACE_HREF);
        let mut signed_info = node_signed_info.clone();
        if signed_info.attr("xmlns").is_none() {
            signed_info.set_attr("xmlns", namespace);
        }

        Ok(Self {
            signed_info,
            canonicalization_method,
            signature_method,
            digest_method,
            digest_value,
            signature_value,
            certificate,
        })
    }

    pub fn signed_info(&self) -> &Element {
        &self.signed_info
    }

    pub fn canonicalization_method(&self) -> C14nMethod {
        self.canonicalization_method
    }

    pub fn signature_method(&self) -> SignatureMethod {
        self.signature_method
    }

    pub fn digest_method(&self) -> HashMethod {
        self.digest_method
    }

    pub fn digest_value(&self) -> &str {
        &self.digest_value
    }

    /// Decodes the embedded DER certificate.
    pub fn certificate(&self) -> Result<X509, Error> {
        let der = self
            .certificate
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>();
        let der = decode(&der).map_err(|err| Error::InvalidCertificate(err.to_string()))?;

        X509::from_der(&der).map_err(|err| Error::InvalidCertificate(err.to_string()))
    }

    /// Checks the signature value over the canonical form of `SignedInfo`.
    pub fn verify_signed_info<T>(&self, key: &PKeyRef<T>) -> Result<(), Error>
    where
        T: HasPublic,
    {
        let mut builder = ChainBuilder::default();
        builder.append(C14n::new(self.canonicalization_method));
        builder.append(SignatureValue::new(
            key,
            self.signature_method,
            Data::Base64(self.signature_value.clone()),
        ));

        builder.run(Data::Xml(&self.signed_info))
    }

    /// Checks the referenced digest against the canonical form of `content`.
    pub fn verify_digest(&self, content: &Element) -> Result<(), Error> {
        let mut builder = ChainBuilder::default();
        builder.append(C14n::new(self.canonicalization_method));
        builder.append(Hash::new(self.digest_method));
        builder.append(DigestValue::new(Data::Base64(self.digest_value.clone())));

        builder.run(Data::Xml(content))
    }
}

fn process_key_info(node: &Element) -> Result<String, Error> {
    let node_x509_data = node.child(NODE_X509_DATA).ok_or_else(|| {
        Error::InvalidSignatureNode(format!(
            "Node '{}' is missing '{}'",
            NODE_KEY_INFO, NODE_X509_DATA
        ))
    })?;

    let mut certificates = node_x509_data.children_named(NODE_X509_CERTIFICATE);
    let node_cert = certificates.next().ok_or_else(|| {
        Error::InvalidSignatureNode(format!(
            "Node '{}' is missing '{}'",
            NODE_X509_DATA, NODE_X509_CERTIFICATE
        ))
    })?;
    if certificates.next().is_some() {
        return Err(Error::MultipleCertificates);
    }

    let cert = content(node_cert)?;
    if cert.contains("BEGIN CERTIFICATE") || cert.contains("END CERTIFICATE") {
        return Err(Error::MultipleCertificates);
    }

    Ok(cert)
}

fn content(node: &Element) -> Result<String, Error> {
    let text = node.text().unwrap_or_default();
    let text = text.trim();

    if text.is_empty() {
        return Err(Error::InvalidSignatureNode(format!(
            "Node '{}' has no content",
            node.local_name()
        )));
    }

    Ok(text.to_owned())
}

fn algorithm(node: &Element) -> Result<&str, Error> {
    node.attr(PROP_ALGORITHM).ok_or_else(|| {
        Error::InvalidSignatureNode(format!(
            "Node '{}' is missing the '{}' property",
            node.local_name(),
            PROP_ALGORITHM
        ))
    })
}

pub const NODE_SIGNATURE: &str = "Signature";
pub const NODE_SIGNED_INFO: &str = "SignedInfo";
pub const NODE_SIGNATURE_VALUE: &str = "SignatureValue";
pub const NODE_KEY_INFO: &str = "KeyInfo";
pub const NODE_OBJECT: &str = "Object";
pub const NODE_CANONICALIZATION_METHOD: &str = "CanonicalizationMethod";
pub const NODE_SIGNATURE_METHOD: &str = "SignatureMethod";
pub const NODE_REFERENCE: &str = "Reference";
pub const NODE_X509_DATA: &str = "X509Data";
pub const NODE_X509_CERTIFICATE: &str = "X509Certificate";
pub const NODE_TRANSFORMS: &str = "Transforms";
pub const NODE_DIGEST_METHOD: &str = "DigestMethod";
pub const NODE_DIGEST_VALUE: &str = "DigestValue";

pub const PROP_ALGORITHM: &str = "Algorithm";

pub const NAMESPACE_HREF: &str = "http://www.w3.org/2000/09/xmldsig#";
