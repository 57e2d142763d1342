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

mod fragments;
mod trust_store;

pub use fragments::{create_fragments, NAMESPACE_HL7};
pub use trust_store::TrustStore;

use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};
use openssl::{
    asn1::{Asn1Time, Asn1TimeRef},
    x509::X509Ref,
};
use xmldoc::Element;
use xmlsec::{Error as XmlSecError, SignatureMaterial};

use crate::{
    error::Error,
    hl7v3::{parse_timestamp, ElementExt},
    translation::release::PATH_PRESCRIPTION,
};

pub const REASON_INVALID_FORMAT: &str = "Invalid signature format";
pub const REASON_MULTIPLE_CERTIFICATES: &str = "Multiple certificates detected";
pub const REASON_INVALID_CERTIFICATE: &str = "Invalid certificate";
pub const REASON_INVALID_SIGNATURE: &str = "Signature is invalid";
pub const REASON_DIGEST_MISMATCH: &str = "Signature doesn't match prescription";
pub const REASON_CERTIFICATE_REVOKED: &str = "Certificate is revoked";
pub const REASON_CA_CERTIFICATE_REVOKED: &str = "CA certificate is revoked";
pub const REASON_CERTIFICATE_EXPIRED: &str = "Certificate expired when signed";
pub const REASON_CERTIFICATE_NOT_TRUSTED: &str = "Certificate not trusted";

const PATH_SIGNATURE: &str = "author/signatureText/Signature";

/// Verifies the signature of a `ParentPrescription` and returns the reasons
/// it is not trustworthy. An empty list means the prescription is verified.
///
/// Revocation and chain checks run only if a `trust_store` is passed.
pub fn verify_prescription_signature(
    parent_prescription: &Element,
    trust_store: Option<&TrustStore>,
) -> Result<Vec<String>, Error> {
    let prescription = parent_prescription.required(PATH_PRESCRIPTION)?;

    let signature = match prescription.find(PATH_SIGNATURE) {
        Some(signature) if has_correct_format(signature) => signature,
        _ => return Ok(reasons(&[REASON_INVALID_FORMAT])),
    };

    if !has_single_certificate(signature) {
        return Ok(reasons(&[REASON_MULTIPLE_CERTIFICATES]));
    }

    let material = match SignatureMaterial::from_element(signature) {
        Ok(material) => material,
        Err(XmlSecError::MultipleCertificates) => {
            return Ok(reasons(&[REASON_MULTIPLE_CERTIFICATES]))
        }
        Err(err) => {
            warn!("Could not read signature: {}", err);

            return Ok(reasons(&[REASON_INVALID_FORMAT]));
        }
    };

    let certificate = match material.certificate() {
        Ok(certificate) => certificate,
        Err(err) => {
            warn!("Could not parse X509 certificate: {}", err);

            return Ok(reasons(&[REASON_INVALID_CERTIFICATE]));
        }
    };

    let signed_at = parse_timestamp(prescription.required_attr("author/time", "value")?)?;

    let mut ret = Vec::new();

    let signature_valid = match certificate.public_key() {
        Ok(key) => material.verify_signed_info(&key),
        Err(err) => Err(err.into()),
    };
    if let Err(err) = signature_valid {
        debug!("Signature verification failed: {}", err);

        ret.push(REASON_INVALID_SIGNATURE.to_owned());
    }

    let fragments = create_fragments(parent_prescription)?;
    if let Err(err) = material.verify_digest(&fragments) {
        debug!("Digest verification failed: {}", err);

        ret.push(REASON_DIGEST_MISMATCH.to_owned());
    }

    if let Some(trust_store) = trust_store {
        if trust_store.is_revoked(&certificate, &signed_at)? {
            ret.push(REASON_CERTIFICATE_REVOKED.to_owned());
        }

        if trust_store.is_issuer_revoked(&certificate, &signed_at)? {
            ret.push(REASON_CA_CERTIFICATE_REVOKED.to_owned());
        }
    }

    if !valid_when_signed(&certificate, &signed_at)? {
        ret.push(REASON_CERTIFICATE_EXPIRED.to_owned());
    }

    if let Some(trust_store) = trust_store {
        if !trust_store.is_trusted(&certificate) {
            ret.push(REASON_CERTIFICATE_NOT_TRUSTED.to_owned());
        }
    }

    Ok(ret)
}

fn has_correct_format(signature: &Element) -> bool {
    let has_text = |path: &str| {
        signature
            .text_at(path)
            .map_or(false, |text| !text.trim().is_empty())
    };

    signature.child("SignedInfo").is_some()
        && has_text("SignatureValue")
        && has_text("KeyInfo/X509Data/X509Certificate")
}

fn has_single_certificate(signature: &Element) -> bool {
    let certificate = signature
        .text_at("KeyInfo/X509Data/X509Certificate")
        .unwrap_or_default();

    !certificate.contains("BEGIN CERTIFICATE") && !certificate.contains("END CERTIFICATE")
}

/// Checks the signing time against the validity window of the certificate,
/// both bounds included.
fn valid_when_signed(cert: &X509Ref, signed_at: &DateTime<Utc>) -> Result<bool, Error> {
    let not_before = asn1_to_chrono(cert.not_before())?;
    let not_after = asn1_to_chrono(cert.not_after())?;

    Ok(not_before <= *signed_at && *signed_at <= not_after)
}

fn asn1_to_chrono(time: &Asn1TimeRef) -> Result<DateTime<Utc>, Error> {
    let epoch = Asn1Time::from_unix(0)?;
    let diff = epoch.diff(time)?;

    Ok(DateTime::<Utc>::from(std::time::UNIX_EPOCH)
        + Duration::days(diff.days as _)
        + Duration::seconds(diff.secs as _))
}

fn reasons(reasons: &[&str]) -> Vec<String> {
    reasons.iter().map(|r| (*r).to_owned()).collect()
}

#[cfg(test)]
mod tests {
    use xmldoc::Doc;

    use crate::test_support::{
        pki_signed_parent_prescription, pki_trust_store, signed_parent_prescription,
        PARENT_PRESCRIPTION,
    };

    use super::*;

    fn verify(xml: &str) -> Vec<String> {
        let doc = Doc::parse_stripped(xml).unwrap();

        verify_prescription_signature(doc.root(), None).unwrap()
    }

    fn verify_trusted(xml: &str) -> Vec<String> {
        let doc = Doc::parse_stripped(xml).unwrap();
        let trust_store = pki_trust_store();

        verify_prescription_signature(doc.root(), Some(&trust_store)).unwrap()
    }

    #[test]
    fn valid_signature() {
        assert!(verify(&signed_parent_prescription(0)).is_empty());
    }

    #[test]
    fn tampered_prescription() {
        let xml = signed_parent_prescription(0).replace("Take with food", "Take with fool");

        assert_eq!(verify(&xml), vec![REASON_DIGEST_MISMATCH]);
    }

    #[test]
    fn signed_before_certificate_was_valid() {
        assert_eq!(
            verify(&signed_parent_prescription(-1)),
            vec![REASON_CERTIFICATE_EXPIRED]
        );
    }

    #[test]
    fn signed_after_certificate_expired() {
        assert_eq!(
            verify(&signed_parent_prescription(1)),
            vec![REASON_CERTIFICATE_EXPIRED]
        );
    }

    #[test]
    fn unreadable_certificate() {
        assert_eq!(verify(PARENT_PRESCRIPTION), vec![REASON_INVALID_CERTIFICATE]);
    }

    #[test]
    fn missing_signature() {
        let mut doc = Doc::parse_stripped(PARENT_PRESCRIPTION).unwrap();
        doc.root_mut()
            .find_mut(&format!("{}/author", PATH_PRESCRIPTION))
            .unwrap()
            .remove_children_named("signatureText");

        assert_eq!(
            verify_prescription_signature(doc.root(), None).unwrap(),
            vec![REASON_INVALID_FORMAT]
        );
    }

    #[test]
    fn pem_certificate() {
        let xml = PARENT_PRESCRIPTION.replace(
            "<X509Certificate>",
            "<X509Certificate>-----BEGIN CERTIFICATE-----",
        );

        assert_eq!(verify(&xml), vec![REASON_MULTIPLE_CERTIFICATES]);
    }

    #[test]
    fn trusted_certificate() {
        assert!(verify_trusted(&pki_signed_parent_prescription("leaf_valid.pem")).is_empty());
    }

    #[test]
    fn untrusted_certificate() {
        assert_eq!(
            verify_trusted(&signed_parent_prescription(0)),
            vec![REASON_CERTIFICATE_NOT_TRUSTED]
        );
    }

    #[test]
    fn revoked_certificate() {
        assert_eq!(
            verify_trusted(&pki_signed_parent_prescription("leaf_key_compromise.pem")),
            vec![REASON_CERTIFICATE_REVOKED]
        );
    }

    #[test]
    fn certificate_superseded_after_signing() {
        assert!(
            verify_trusted(&pki_signed_parent_prescription("leaf_superseded_after.pem")).is_empty()
        );
        assert_eq!(
            verify_trusted(&pki_signed_parent_prescription("leaf_superseded_before.pem")),
            vec![REASON_CERTIFICATE_REVOKED]
        );
    }

    #[test]
    fn revoked_ca_certificate() {
        assert_eq!(
            verify_trusted(&pki_signed_parent_prescription("leaf_revoked_ca.pem")),
            vec![REASON_CA_CERTIFICATE_REVOKED]
        );
    }

    #[test]
    fn reasons_keep_their_order() {
        let xml = pki_signed_parent_prescription("leaf_key_compromise.pem")
            .replace("Take with food", "Take with fool")
            .replace(r#"<time value="20210302100514""#, r#"<time value="20210402100514""#);

        assert_eq!(
            verify_trusted(&xml),
            vec![
                REASON_DIGEST_MISMATCH,
                REASON_CERTIFICATE_REVOKED,
                REASON_CERTIFICATE_EXPIRED
            ]
        );
    }
}
