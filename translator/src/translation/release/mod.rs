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

mod bundle;
mod medication_request;

pub use bundle::{create_prescription_bundle, PATH_LINE_ITEMS, PATH_PRESCRIPTION};
pub use medication_request::{create_medication_request, Context};

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use log::error;
use resources::{
    bundle::{Bundle, Entry, Type as BundleType},
    operation_outcome::{Issue, IssueType, Severity},
    primitives::DateTime,
    types::{Coding, Extension, ExtensionValue, Identifier, Meta, Reference},
    OperationOutcome, Parameters, Resource,
};
use tokio::task::spawn_blocking;
use xmldoc::Element;

use crate::{
    error::Error,
    hl7v3::{to_fhir_date_time, ElementExt},
    notifier::{DispenseProposalReturn, ReturnReason},
    verification::{verify_prescription_signature, TrustStore},
};

use super::{
    common::{new_id, SYSTEM_RFC4122},
    taxonomy::SYSTEM_SPINE_ERROR_OR_WARNING_CODE,
};

pub const TEMPLATE_PARENT_PRESCRIPTION: &str = "PORX_MT122003UK32";
pub const PARAMETER_PASSED: &str = "passedPrescriptions";
pub const PARAMETER_FAILED: &str = "failedPrescriptions";

const URL_SUPPORTING_INFO_PRESCRIPTION: &str =
    "https://fhir.nhs.uk/StructureDefinition/Extension-Spine-supportingInfo-prescription";
const UNCAUGHT_VERIFICATION_ERROR: &str = "Uncaught error during signature verification";

/// Result of translating a `PrescriptionReleaseResponse`.
#[derive(Debug)]
pub struct ReleaseTranslation {
    pub parameters: Parameters,
    pub returns: Vec<DispenseProposalReturn>,
}

/// Translates a `PrescriptionReleaseResponse`, verifying the signature of
/// every released prescription. Prescriptions that fail verification are
/// reported in `failedPrescriptions` and produce a dispense proposal return.
pub async fn translate_release(
    response: &Element,
    trust_store: Option<Arc<TrustStore>>,
) -> Result<ReleaseTranslation, Error> {
    let release_request_id =
        response.required_attr("inFulfillmentOf/priorDownloadRequestRef/id", "root")?;

    let parent_prescriptions = response
        .children_named("component")
        .filter(|c| c.optional_attr("templateId", "extension") == Some(TEMPLATE_PARENT_PRESCRIPTION))
        .map(|c| c.required("ParentPrescription"))
        .collect::<Result<Vec<_>, _>>()?;

    let bundles = parent_prescriptions
        .iter()
        .map(|parent_prescription| create_prescription_bundle(parent_prescription, release_request_id))
        .collect::<Result<Vec<_>, _>>()?;

    let verifications = verify_all(&parent_prescriptions, trust_store).await;

    let mut passed = Vec::new();
    let mut failed = Vec::new();
    let mut returns = Vec::new();

    for ((parent_prescription, bundle), errors) in parent_prescriptions
        .into_iter()
        .zip(bundles)
        .zip(verifications)
    {
        if errors.is_empty() {
            passed.push(bundle.into());

            continue;
        }

        let prescription_id = parent_prescription.required_attr("id", "root")?.to_lowercase();
        error!(
            "[Verifying signature for prescription ID {}]: {}",
            prescription_id,
            errors.join(", ")
        );

        let outcome = create_invalid_signature_outcome(&bundle)?;
        returns.push(DispenseProposalReturn::new(
            parent_prescription,
            response,
            ReturnReason::InvalidDigitalSignature,
        )?);

        failed.push(outcome.into());
        failed.push(bundle.into());
    }

    let parameters = Parameters::default()
        .with_resource(PARAMETER_PASSED, create_searchset(response, passed)?.into())
        .with_resource(PARAMETER_FAILED, create_searchset(response, failed)?.into());

    Ok(ReleaseTranslation {
        parameters,
        returns,
    })
}

/// Verifies the prescriptions on the blocking pool. The results keep the
/// order of the input.
async fn verify_all(
    parent_prescriptions: &[&Element],
    trust_store: Option<Arc<TrustStore>>,
) -> Vec<Vec<String>> {
    let tasks = parent_prescriptions.iter().map(|parent_prescription| {
        let parent_prescription = (*parent_prescription).clone();
        let trust_store = trust_store.clone();

        spawn_blocking(move || {
            verify_prescription_signature(&parent_prescription, trust_store.as_deref())
        })
    });

    join_all(tasks)
        .await
        .into_iter()
        .map(|result| match result {
            Ok(Ok(errors)) => errors,
            Ok(Err(err)) => {
                error!("{}: {}", UNCAUGHT_VERIFICATION_ERROR, err);

                vec![UNCAUGHT_VERIFICATION_ERROR.to_owned()]
            }
            Err(err) => {
                error!("{}: {}", UNCAUGHT_VERIFICATION_ERROR, err);

                vec![UNCAUGHT_VERIFICATION_ERROR.to_owned()]
            }
        })
        .collect()
}

fn create_invalid_signature_outcome(bundle: &Bundle) -> Result<OperationOutcome, Error> {
    let mut issue = Issue::new(Severity::Error, IssueType::Invalid);
    issue.details = Some(
        Coding::new(
            SYSTEM_SPINE_ERROR_OR_WARNING_CODE,
            "INVALID_VALUE",
            Some("Signature is invalid.".into()),
        )
        .into(),
    );
    issue.expression.push("Provenance.signature.data".into());

    let supporting_info = Reference {
        identifier: bundle.identifier.clone(),
        ..Default::default()
    };

    Ok(OperationOutcome {
        id: Some(new_id()?),
        meta: Some(Meta::last_updated(DateTime::from(Utc::now()))),
        extension: vec![Extension::new(
            URL_SUPPORTING_INFO_PRESCRIPTION,
            ExtensionValue::Reference(supporting_info),
        )],
        issue: vec![issue],
        ..Default::default()
    })
}

fn create_searchset(response: &Element, resources: Vec<Resource>) -> Result<Bundle, Error> {
    let mut bundle = Bundle::new(BundleType::Searchset);
    bundle.id = Some(new_id()?);
    bundle.meta = Some(Meta::last_updated(to_fhir_date_time(
        response.required_attr("effectiveTime", "value")?,
    )?));
    bundle.identifier = Some(Identifier::new(
        SYSTEM_RFC4122,
        response.required_attr("id", "root")?.to_lowercase(),
    ));
    bundle.total = Some(resources.len());
    bundle.entries = resources.into_iter().map(Entry::with_full_url).collect();

    Ok(bundle)
}

#[cfg(test)]
mod tests {
    use xmldoc::Doc;

    use crate::test_support::{
        pki_signed_parent_prescription, pki_trust_store, release_response,
        signed_parent_prescription, PARENT_PRESCRIPTION,
    };

    use super::*;

    fn searchset<'a>(parameters: &'a Parameters, name: &str) -> &'a Bundle {
        match parameters.get(name) {
            Some(Resource::Bundle(bundle)) => bundle,
            _ => panic!("missing parameter {}", name),
        }
    }

    #[tokio::test]
    async fn invalid_signature_fails_verification() {
        let xml = release_response(&[PARENT_PRESCRIPTION]);
        let doc = Doc::parse_stripped(&xml).unwrap();

        let translation = translate_release(doc.root(), None).await.unwrap();

        let passed = searchset(&translation.parameters, PARAMETER_PASSED);
        let failed = searchset(&translation.parameters, PARAMETER_FAILED);
        assert_eq!(passed.total, Some(0));
        assert_eq!(failed.total, Some(2));
        assert_eq!(failed.entries[0].resource.resource_type(), "OperationOutcome");
        assert_eq!(failed.entries[1].resource.resource_type(), "Bundle");
        assert_eq!(
            passed.identifier.as_ref().and_then(|i| i.value.as_deref()),
            Some("6b6cbd52-a8d4-4e0e-a0a8-c4c0b6a3f1e2")
        );

        match &failed.entries[0].resource {
            Resource::OperationOutcome(outcome) => {
                let bundle_identifier = match &failed.entries[1].resource {
                    Resource::Bundle(bundle) => bundle.identifier.clone(),
                    _ => None,
                };
                assert_eq!(
                    outcome.extension[0].value,
                    Some(ExtensionValue::Reference(Reference {
                        identifier: bundle_identifier,
                        ..Default::default()
                    }))
                );
                assert_eq!(outcome.issue[0].expression, vec!["Provenance.signature.data"]);
            }
            _ => unreachable!(),
        }

        assert_eq!(translation.returns.len(), 1);
        assert_eq!(translation.returns[0].prescription_id, "83C40E-A23856-00123C");
    }

    #[tokio::test]
    async fn signed_prescription_passes_verification() {
        let signed = signed_parent_prescription(0);
        let xml = release_response(&[signed.as_str(), PARENT_PRESCRIPTION]);
        let doc = Doc::parse_stripped(&xml).unwrap();

        let translation = translate_release(doc.root(), None).await.unwrap();

        let passed = searchset(&translation.parameters, PARAMETER_PASSED);
        let failed = searchset(&translation.parameters, PARAMETER_FAILED);
        assert_eq!(passed.total, Some(1));
        assert_eq!(failed.total, Some(2));
        assert_eq!(translation.returns.len(), 1);
    }

    #[tokio::test]
    async fn trust_store_rejects_untrusted_signer() {
        let trusted = pki_signed_parent_prescription("leaf_valid.pem");
        let untrusted = signed_parent_prescription(0);
        let xml = release_response(&[trusted.as_str(), untrusted.as_str()]);
        let doc = Doc::parse_stripped(&xml).unwrap();

        let translation = translate_release(doc.root(), Some(Arc::new(pki_trust_store())))
            .await
            .unwrap();

        assert_eq!(searchset(&translation.parameters, PARAMETER_PASSED).total, Some(1));
        assert_eq!(searchset(&translation.parameters, PARAMETER_FAILED).total, Some(2));
        assert_eq!(translation.returns.len(), 1);
    }

    #[tokio::test]
    async fn unsupported_templates_are_skipped() {
        let xml = release_response(&[PARENT_PRESCRIPTION])
            .replace(TEMPLATE_PARENT_PRESCRIPTION, "PORX_MT122002UK32");
        let doc = Doc::parse_stripped(&xml).unwrap();

        let translation = translate_release(doc.root(), None).await.unwrap();

        assert_eq!(searchset(&translation.parameters, PARAMETER_PASSED).total, Some(0));
        assert_eq!(searchset(&translation.parameters, PARAMETER_FAILED).total, Some(0));
        assert!(translation.returns.is_empty());
    }
}
