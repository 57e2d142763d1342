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

use std::fs::read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, TimeZone, Utc};
use openssl::{
    asn1::Asn1Time,
    bn::BigNum,
    hash::{hash, MessageDigest},
    pkey::{PKey, Private},
    rsa::Rsa,
    sign::Signer,
    x509::{X509Builder, X509NameBuilder, X509},
};
use xmldoc::{C14nMode, Doc};
use xmlsec::{DIGEST_SHA1, NAMESPACE_HREF, SIGNATURE_RSA_SHA256, TRANSFORM_C14N_1_0_EXCLUSIVE};

use crate::{
    hl7v3::format_timestamp,
    verification::{create_fragments, TrustStore},
};

pub const PATIENT: &str = include_str!("../test-data/patient.xml");

pub const PARENT_PRESCRIPTION: &str = include_str!("../test-data/parent_prescription.xml");

/// `AgentPerson` with the given role profile id, user id and ODS code.
pub fn agent_person(role_profile_id: &str, user_id: &str, ods_code: &str) -> String {
    format!(
        r#"<AgentPerson classCode="AGNT">
            <id root="1.2.826.0.1285.0.2.0.67" extension="{role_profile_id}"/>
            <code codeSystem="1.2.826.0.1285.0.2.1.104" code="R8000"/>
            <telecom use="WP" value="tel:01234567890"/>
            <agentPerson classCode="PSN" determinerCode="INSTANCE">
                <id root="1.2.826.0.1285.0.2.0.65" extension="{user_id}"/>
                <name><prefix>DR</prefix><given>Thomas</given><family>Edwards</family></name>
            </agentPerson>
            <representedOrganization classCode="ORG" determinerCode="INSTANCE">
                <id root="1.2.826.0.1285.0.1.10" extension="{ods_code}"/>
                <name>HALLGARTH SURGERY</name>
                <telecom use="WP" value="tel:01234567890"/>
            </representedOrganization>
        </AgentPerson>"#,
        role_profile_id = role_profile_id,
        user_id = user_id,
        ods_code = ods_code,
    )
}

/// `CancellationResponse` with the given response code and actors.
/// `performer` is inserted verbatim and may be empty.
pub fn cancellation_response(
    code: &str,
    display: &str,
    author: &str,
    responsible: &str,
    performer: &str,
) -> String {
    format!(
        r#"<CancellationResponse classCode="INFO" moodCode="EVN">
            <id root="A7B86F8D-1DBD-FC28-E050-D20AE3A215F0"/>
            <effectiveTime value="20210302151410"/>
            <recordTarget>{patient}</recordTarget>
            <author>{author}</author>
            <responsibleParty>{responsible}</responsibleParty>
            {performer}
            <pertinentInformation1><pertinentLineItemRef><id root="A54219B8-F741-4C47-B662-E4F8DFA49AB6"/></pertinentLineItemRef></pertinentInformation1>
            <pertinentInformation2><pertinentPrescriptionID><value root="2.16.840.1.113883.2.1.3.2.4.18.8" extension="DA923A-Z8827F-11EBAK"/></pertinentPrescriptionID></pertinentInformation2>
            <pertinentInformation3><pertinentResponse><value codeSystem="2.16.840.1.113883.2.1.3.2.4.17.19" code="{code}" displayName="{display}"/></pertinentResponse></pertinentInformation3>
            <pertinentInformation4><pertinentCancellationRequestRef><id root="DB3A6A1E-2D66-4C39-8C1E-2A45F3D2B0A5"/></pertinentCancellationRequestRef></pertinentInformation4>
        </CancellationResponse>"#,
        patient = PATIENT,
        author = author,
        responsible = responsible,
        performer = performer,
        code = code,
        display = display,
    )
}

/// `PrescriptionReleaseResponse` releasing the given parent prescriptions.
pub fn release_response(parent_prescriptions: &[&str]) -> String {
    let components = parent_prescriptions
        .iter()
        .map(|parent_prescription| {
            format!(
                r#"<component typeCode="COMP"><templateId root="2.16.840.1.113883.2.1.3.2.4.18.2" extension="PORX_MT122003UK32"/>{}</component>"#,
                parent_prescription
            )
        })
        .collect::<String>();

    format!(
        r#"<PrescriptionReleaseResponse classCode="INFO" moodCode="EVN">
            <id root="6B6CBD52-A8D4-4E0E-A0A8-C4C0B6A3F1E2"/>
            <effectiveTime value="20210302131220"/>
            {}
            <inFulfillmentOf typeCode="FLFS">
                <priorDownloadRequestRef classCode="INFO" moodCode="RQO">
                    <id root="EE0C0E4E-5A4E-4F05-9A4F-8E2D3B1C0A11"/>
                </priorDownloadRequestRef>
            </inFulfillmentOf>
        </PrescriptionReleaseResponse>"#,
        components
    )
}

/// Raw backbone response carrying `details` inside the acknowledgement and
/// `content` inside the interaction element.
pub fn spine_response(interaction_id: &str, type_code: &str, details: &str, content: &str) -> String {
    format!(
        r#"------=_MIME-Boundary
Content-Id: <ebXMLHeader@spine.nhs.uk>
Content-Type: text/xml; charset=UTF-8

<SOAP:Envelope xmlns:SOAP="http://schemas.xmlsoap.org/soap/envelope/"><SOAP:Body>
<hl7:{id} xmlns:hl7="urn:hl7-org:v3" xmlns="urn:hl7-org:v3">
    <id root="9D2AD60A-3A36-4F2A-A1E3-0B2C7E6A4F11"/>
    <creationTime value="20210302151412"/>
    <interactionId root="2.16.840.1.113883.2.1.3.2.4.12" extension="{id}"/>
    <acknowledgement typeCode="{type_code}">
        {details}
        <messageRef><id root="C3D9C7B4-0E11-4AF8-9D04-6B2E7F1A9C55"/></messageRef>
    </acknowledgement>
    {content}
</hl7:{id}>
</SOAP:Body></SOAP:Envelope>
--------=_MIME-Boundary--"#,
        id = interaction_id,
        type_code = type_code,
        details = details,
        content = content,
    )
}

/// `PARENT_PRESCRIPTION` with a valid signature. The signing time is set one
/// second before the certificate becomes valid for a negative `offset`, one
/// second after it expired for a positive `offset`, and inside the validity
/// window otherwise.
pub fn signed_parent_prescription(offset: i64) -> String {
    let not_before = Utc.ymd(2021, 3, 1).and_hms(0, 0, 0);
    let not_after = Utc.ymd(2021, 3, 31).and_hms(23, 59, 59);
    let signed_at = if offset < 0 {
        not_before - Duration::seconds(1)
    } else if offset > 0 {
        not_after + Duration::seconds(1)
    } else {
        Utc.ymd(2021, 3, 2).and_hms(10, 5, 14)
    };

    let (key, cert) = key_and_certificate(&not_before, &not_after);

    sign_parent_prescription(&key, &cert, &signed_at)
}

/// `PARENT_PRESCRIPTION` signed inside the validity window with the fixture
/// key and the given certificate from `test-data/pki`.
pub fn pki_signed_parent_prescription(cert_file: &str) -> String {
    let key = PKey::private_key_from_pem(&read(pki_path("leaf_key.pem")).unwrap()).unwrap();
    let cert = pki_certificate(cert_file);

    sign_parent_prescription(&key, &cert, &Utc.ymd(2021, 3, 2).and_hms(10, 5, 14))
}

/// Certificate from `test-data/pki`.
pub fn pki_certificate(file: &str) -> X509 {
    X509::from_pem(&read(pki_path(file)).unwrap()).unwrap()
}

/// Sub-CAs and revocation lists of `test-data/pki/store`.
pub fn pki_trust_store() -> TrustStore {
    TrustStore::from_dir(pki_path("store")).unwrap()
}

fn pki_path(file: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("test-data/pki")
        .join(file)
}

fn sign_parent_prescription(key: &PKey<Private>, cert: &X509, signed_at: &DateTime<Utc>) -> String {
    let mut parent_prescription = Doc::parse_stripped(PARENT_PRESCRIPTION)
        .unwrap()
        .into_root();
    parent_prescription
        .find_mut("pertinentInformation1/pertinentPrescription/author/time")
        .unwrap()
        .set_attr("value", format_timestamp(signed_at));

    let fragments = create_fragments(&parent_prescription).unwrap();
    let digest = hash(
        MessageDigest::sha1(),
        fragments
            .to_c14n_string(C14nMode::Exclusive)
            .unwrap()
            .as_bytes(),
    )
    .unwrap();

    let signed_info = format!(
        r#"<SignedInfo xmlns="{ns}"><CanonicalizationMethod Algorithm="{c14n}"></CanonicalizationMethod><SignatureMethod Algorithm="{sig}"></SignatureMethod><Reference><Transforms><Transform Algorithm="{c14n}"></Transform></Transforms><DigestMethod Algorithm="{dig}"></DigestMethod><DigestValue>{digest}</DigestValue></Reference></SignedInfo>"#,
        ns = NAMESPACE_HREF,
        c14n = TRANSFORM_C14N_1_0_EXCLUSIVE,
        sig = SIGNATURE_RSA_SHA256,
        dig = DIGEST_SHA1,
        digest = base64::encode(&*digest),
    );

    let mut signer = Signer::new(MessageDigest::sha256(), key).unwrap();
    signer.update(signed_info.as_bytes()).unwrap();
    let signature_value = base64::encode(signer.sign_to_vec().unwrap());
    let certificate = base64::encode(cert.to_der().unwrap());

    let signature = format!(
        r#"<Signature xmlns="{ns}">{signed_info}<SignatureValue>{signature_value}</SignatureValue><KeyInfo><X509Data><X509Certificate>{certificate}</X509Certificate></X509Data></KeyInfo></Signature>"#,
        ns = NAMESPACE_HREF,
        signed_info = signed_info.replacen(&format!(r#" xmlns="{}""#, NAMESPACE_HREF), "", 1),
        signature_value = signature_value,
        certificate = certificate,
    );
    let signature = Doc::parse_stripped(&signature).unwrap().into_root();

    let signature_text = parent_prescription
        .find_mut("pertinentInformation1/pertinentPrescription/author/signatureText")
        .unwrap();
    signature_text.remove_children_named("Signature");
    signature_text.push_element(signature);

    parent_prescription
        .to_c14n_string(C14nMode::Inclusive)
        .unwrap()
}

fn key_and_certificate(
    not_before: &DateTime<Utc>,
    not_after: &DateTime<Utc>,
) -> (PKey<Private>, X509) {
    let key = PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap();

    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_text("CN", "prescriber").unwrap();
    let name = name.build();

    let mut builder = X509Builder::new().unwrap();
    builder.set_version(2).unwrap();
    builder
        .set_serial_number(&BigNum::from_u32(1).unwrap().to_asn1_integer().unwrap())
        .unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder.set_pubkey(&key).unwrap();
    builder
        .set_not_before(&Asn1Time::from_unix(not_before.timestamp()).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::from_unix(not_after.timestamp()).unwrap())
        .unwrap();
    builder.sign(&key, MessageDigest::sha256()).unwrap();

    (key, builder.build())
}
