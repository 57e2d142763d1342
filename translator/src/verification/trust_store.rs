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

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::fs::{read, read_dir};
use std::path::Path;

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use openssl::x509::{CrlStatus, ReasonCode, X509Crl, X509RevokedRef, X509VerifyResult, X509};

use crate::error::Error;

use super::asn1_to_chrono;

/* CRL reason codes (RFC 5280, 5.3.1) */
const REASON_UNSPECIFIED: i64 = 0;
const REASON_KEY_COMPROMISE: i64 = 1;
const REASON_CA_COMPROMISE: i64 = 2;
const REASON_AFFILIATION_CHANGED: i64 = 3;
const REASON_SUPERSEDED: i64 = 4;
const REASON_CESSATION_OF_OPERATION: i64 = 5;
const REASON_CERTIFICATE_HOLD: i64 = 6;
const REASON_REMOVE_FROM_CRL: i64 = 8;

/// Sub-CA certificates that prescriber certificates must be issued by, and
/// the revocation lists for both.
pub struct TrustStore {
    ca_certs: Vec<X509>,
    crls: Vec<X509Crl>,
}

impl TrustStore {
    pub fn new(ca_certs: Vec<X509>, crls: Vec<X509Crl>) -> Self {
        Self { ca_certs, crls }
    }

    /// Loads `*.pem`, `*.crt`, `*.cer` and `*.der` files of `dir` as CA
    /// certificates and `*.crl` files as revocation lists. Both may be PEM or
    /// DER encoded and PEM files may hold more than one certificate.
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Self, Error> {
        let mut paths = read_dir(dir.as_ref())?
            .map(|entry| entry.map(|entry| entry.path()))
            .collect::<Result<Vec<_>, _>>()?;
        paths.sort();

        let mut ca_certs = Vec::new();
        let mut crls = Vec::new();

        for path in paths {
            let extension = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(str::to_ascii_lowercase);

            match extension.as_deref() {
                Some("pem") | Some("crt") | Some("cer") | Some("der") => {
                    ca_certs.extend(parse_certs(&read(&path)?)?);
                }
                Some("crl") => crls.push(parse_crl(&read(&path)?)?),
                _ => debug!("Ignoring trust store file {}", path.display()),
            }
        }

        info!(
            "Loaded trust store from {}: {} CA certificate(s), {} revocation list(s)",
            dir.as_ref().display(),
            ca_certs.len(),
            crls.len()
        );

        Ok(Self::new(ca_certs, crls))
    }

    /// The CA certificate that issued and signed `cert`.
    pub fn issuer_of(&self, cert: &X509) -> Option<&X509> {
        self.ca_certs.iter().find(|ca| {
            ca.issued(cert) == X509VerifyResult::OK
                && ca
                    .public_key()
                    .and_then(|key| cert.verify(&key))
                    .unwrap_or(false)
        })
    }

    pub fn is_trusted(&self, cert: &X509) -> bool {
        self.issuer_of(cert).is_some()
    }

    /// Whether `cert` is listed on one of the revocation lists in a way that
    /// invalidates a signature created at `signed_at`.
    pub fn is_revoked(&self, cert: &X509, signed_at: &DateTime<Utc>) -> Result<bool, Error> {
        for crl in &self.crls {
            match crl.get_by_cert(cert) {
                CrlStatus::NotRevoked => (),
                CrlStatus::Revoked(entry) | CrlStatus::RemoveFromCrl(entry) => {
                    return is_entry_revoked(entry, signed_at)
                }
            }
        }

        Ok(false)
    }

    /// Whether the CA certificate that issued `cert` is revoked. Certificates
    /// without a known issuer are reported by `is_trusted` instead.
    pub fn is_issuer_revoked(&self, cert: &X509, signed_at: &DateTime<Utc>) -> Result<bool, Error> {
        match self.issuer_of(cert) {
            Some(ca) => self.is_revoked(ca, signed_at),
            None => Ok(false),
        }
    }
}

impl Debug for TrustStore {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("TrustStore")
            .field("ca_certs", &self.ca_certs.len())
            .field("crls", &self.crls.len())
            .finish()
    }
}

fn is_entry_revoked(entry: &X509RevokedRef, signed_at: &DateTime<Utc>) -> Result<bool, Error> {
    let serial = entry.serial_number().to_bn()?.to_hex_str()?.to_lowercase();

    let reason = match entry.extension::<ReasonCode>()? {
        Some((_, reason)) => reason.get_i64()?,
        None => {
            error!(
                "Cannot extract Reason Code from CRL for certificate with serial {}",
                serial
            );

            return Ok(false);
        }
    };

    match reason {
        REASON_UNSPECIFIED
        | REASON_AFFILIATION_CHANGED
        | REASON_SUPERSEDED
        | REASON_CESSATION_OF_OPERATION
        | REASON_CERTIFICATE_HOLD
        | REASON_REMOVE_FROM_CRL => {
            let revoked_at = asn1_to_chrono(entry.revocation_date())?;
            let revoked = *signed_at >= revoked_at;
            if revoked {
                warn!(
                    "Certificate with serial '{}' found on CRL with Reason Code {}",
                    serial, reason
                );
            }

            Ok(revoked)
        }
        REASON_KEY_COMPROMISE | REASON_CA_COMPROMISE => {
            warn!(
                "Certificate with serial '{}' found on CRL with Reason Code {}",
                serial, reason
            );

            Ok(true)
        }
        reason => {
            error!(
                "Certificate with serial '{}' found on CRL with unhandled Reason Code {}",
                serial, reason
            );

            Ok(false)
        }
    }
}

fn parse_certs(data: &[u8]) -> Result<Vec<X509>, Error> {
    if data.starts_with(b"-----BEGIN") {
        Ok(X509::stack_from_pem(data)?)
    } else {
        Ok(vec![X509::from_der(data)?])
    }
}

fn parse_crl(data: &[u8]) -> Result<X509Crl, Error> {
    if data.starts_with(b"-----BEGIN") {
        Ok(X509Crl::from_pem(data)?)
    } else {
        Ok(X509Crl::from_der(data)?)
    }
}
