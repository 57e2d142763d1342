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

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use log::{debug, error, info};
use resources::{
    operation_outcome::{Issue, IssueType, Severity},
    OperationOutcome, Resource,
};
use serde::Serialize;

use crate::{
    config::Config,
    error::Error,
    hl7v3::{extract_envelope, AcknowledgementTypeCode, SendMessagePayload},
    notifier::Outbox,
    translation::{
        cancellation::translate_cancellation,
        release::translate_release,
        release_rejection::{add_other_dispenser, rejection_codes},
        taxonomy::translate_all,
    },
};

/// Raw response as received from the backbone.
#[derive(Debug, Clone)]
pub struct SpineResponse {
    pub body: String,
    pub status_code: u16,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslatedSpineResponse {
    pub status_code: u16,
    pub fhir_response: Resource,
}

/// State shared by all translations.
#[derive(Clone)]
pub struct Context {
    pub config: Arc<Config>,
    pub outbox: Outbox,
}

type Translation = Result<TranslatedSpineResponse, Error>;
type SuccessHandler = for<'a> fn(&'a SendMessagePayload, &'a Context) -> BoxFuture<'a, Translation>;
type IssuesHandler = fn(&SendMessagePayload) -> Translation;

/* Interaction */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interaction {
    Generic,
    Cancellation,
    Release,
    ReleaseRejection,
}

/// Interactions tried in order. The first one found in the raw response
/// handles it.
pub const REGISTRY: &[(&str, Interaction)] = &[
    ("MCCI_IN010000UK13", Interaction::Generic),
    ("PORX_IN050101UK31", Interaction::Cancellation),
    ("PORX_IN050102UK32", Interaction::Cancellation),
    ("PORX_IN070101UK31", Interaction::Release),
    ("PORX_IN070103UK31", Interaction::Release),
    ("PORX_IN110101UK30", Interaction::ReleaseRejection),
];

struct Handlers {
    success: SuccessHandler,
    error: IssuesHandler,
    rejection: IssuesHandler,
}

impl Interaction {
    fn handlers(self) -> Handlers {
        match self {
            Self::Generic => Handlers {
                success: generic_success,
                error: generic_error,
                rejection: generic_rejection,
            },
            Self::Cancellation => Handlers {
                success: cancellation_success,
                error: cancellation_error,
                rejection: generic_rejection,
            },
            Self::Release => Handlers {
                success: release_success,
                error: generic_error,
                rejection: generic_rejection,
            },
            Self::ReleaseRejection => Handlers {
                success: generic_success,
                error: release_rejection_error,
                rejection: generic_rejection,
            },
        }
    }
}

/* translate */

/// Translates a raw backbone response. Never fails: every failure is
/// logged and reported as a server error response.
pub async fn translate(response: &SpineResponse, ctx: &Context) -> TranslatedSpineResponse {
    debug!("Translating spine response with status {}", response.status_code);

    for (interaction_id, interaction) in REGISTRY {
        let payload = match extract_envelope(&response.body, interaction_id) {
            Ok(Some(payload)) => payload,
            Ok(None) => continue,
            Err(err) => {
                error!("Unable to parse {} response: {}", interaction_id, err);

                return server_error_response();
            }
        };

        return match handle(*interaction, &payload, ctx).await {
            Ok(res) => res,
            Err(err) => {
                error!("Unable to translate {} response: {}", interaction_id, err);

                server_error_response()
            }
        };
    }

    error!("No response handler was able to handle the spine response");

    server_error_response()
}

async fn handle(interaction: Interaction, payload: &SendMessagePayload, ctx: &Context) -> Translation {
    let handlers = interaction.handlers();

    match payload.type_code()? {
        AcknowledgementTypeCode::Acknowledged => (handlers.success)(payload, ctx).await,
        AcknowledgementTypeCode::Error | AcknowledgementTypeCode::ErrorAlternative => {
            (handlers.error)(payload)
        }
        AcknowledgementTypeCode::Rejected => (handlers.rejection)(payload),
        AcknowledgementTypeCode::Other(code) => {
            error!("Unhandled acknowledgement type code {}", code);

            Ok(server_error_response())
        }
    }
}

/* responses */

pub fn success_response() -> TranslatedSpineResponse {
    TranslatedSpineResponse {
        status_code: 200,
        fhir_response: OperationOutcome::new(vec![Issue::new(
            Severity::Information,
            IssueType::Informational,
        )])
        .into(),
    }
}

pub fn server_error_response() -> TranslatedSpineResponse {
    TranslatedSpineResponse {
        status_code: 500,
        fhir_response: OperationOutcome::new(vec![Issue::new(Severity::Error, IssueType::Invalid)])
            .into(),
    }
}

/// Wraps translated issues. A response without any issue is a server error,
/// otherwise the status is 400 if any issue is an error and 200 if not.
pub fn issues_response(issues: Vec<Issue>) -> TranslatedSpineResponse {
    if issues.is_empty() {
        error!("Trying to return bad request response with no error details");

        return server_error_response();
    }

    info!("Issues found in spine response. Returning non successful result");

    let outcome = OperationOutcome::new(issues);
    let status_code = if outcome.has_errors() { 400 } else { 200 };

    TranslatedSpineResponse {
        status_code,
        fhir_response: outcome.into(),
    }
}

/* generic */

fn generic_success<'a>(_: &'a SendMessagePayload, _: &'a Context) -> BoxFuture<'a, Translation> {
    async { Ok(success_response()) }.boxed()
}

fn generic_error(payload: &SendMessagePayload) -> Translation {
    Ok(issues_response(translate_all(&payload.error_codes()?)))
}

fn generic_rejection(payload: &SendMessagePayload) -> Translation {
    Ok(issues_response(translate_all(&payload.rejection_codes()?)))
}

/* cancellation */

const SUBJECT_CANCELLATION: &str = "CancellationResponse";

fn cancellation_success<'a>(
    payload: &'a SendMessagePayload,
    _: &'a Context,
) -> BoxFuture<'a, Translation> {
    async move {
        Ok(TranslatedSpineResponse {
            status_code: 200,
            fhir_response: translate_cancellation(payload.subject(SUBJECT_CANCELLATION)?)?,
        })
    }
    .boxed()
}

fn cancellation_error(payload: &SendMessagePayload) -> Translation {
    Ok(TranslatedSpineResponse {
        status_code: 400,
        fhir_response: translate_cancellation(payload.subject(SUBJECT_CANCELLATION)?)?,
    })
}

/* release */

const SUBJECT_RELEASE: &str = "PrescriptionReleaseResponse";
const SUBJECT_RELEASE_REJECTION: &str = "PrescriptionReleaseReject";

fn release_success<'a>(payload: &'a SendMessagePayload, ctx: &'a Context) -> BoxFuture<'a, Translation> {
    async move {
        let translation = translate_release(
            payload.subject(SUBJECT_RELEASE)?,
            ctx.config.trust_store.clone(),
        )
        .await?;

        if !translation.returns.is_empty() {
            if ctx.config.environment.sends_returns() {
                ctx.outbox.post(translation.returns).await;
            } else {
                info!(
                    "Skipping {} dispense proposal return(s) in environment {}",
                    translation.returns.len(),
                    ctx.config.environment
                );
            }
        }

        Ok(TranslatedSpineResponse {
            status_code: 200,
            fhir_response: translation.parameters.into(),
        })
    }
    .boxed()
}

fn release_rejection_error(payload: &SendMessagePayload) -> Translation {
    let rejection = payload.subject(SUBJECT_RELEASE_REJECTION)?;
    let mut res = issues_response(translate_all(&rejection_codes(rejection)?));

    if let Resource::OperationOutcome(outcome) = &mut res.fhir_response {
        add_other_dispenser(outcome, rejection)?;
    }

    Ok(res)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::{
        config::Environment,
        notifier::{DispenseProposalReturn, Notifier},
        test_support::{
            agent_person, cancellation_response, release_response, spine_response,
            PARENT_PRESCRIPTION,
        },
        translation::release::{PARAMETER_FAILED, PARAMETER_PASSED},
    };

    use super::*;

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, message: &DispenseProposalReturn) -> Result<u16, Error> {
            self.sent.lock().unwrap().push(message.prescription_id.clone());

            Ok(200)
        }
    }

    fn context(environment: Environment) -> (Context, Arc<Mutex<Vec<String>>>) {
        let notifier = RecordingNotifier::default();
        let sent = notifier.sent.clone();
        let ctx = Context {
            config: Arc::new(Config::new(environment)),
            outbox: Outbox::new(Arc::new(notifier)),
        };

        (ctx, sent)
    }

    async fn run(body: String, ctx: &Context) -> TranslatedSpineResponse {
        translate(
            &SpineResponse {
                body,
                status_code: 200,
            },
            ctx,
        )
        .await
    }

    fn outcome(res: &TranslatedSpineResponse) -> &OperationOutcome {
        match &res.fhir_response {
            Resource::OperationOutcome(outcome) => outcome,
            other => panic!("expected operation outcome, got {}", other.resource_type()),
        }
    }

    fn issue_code(issue: &Issue) -> Option<&str> {
        issue.details.as_ref()?.coding[0].code.as_deref()
    }

    fn subject(content: &str) -> String {
        format!(
            "<ControlActEvent classCode=\"CACT\" moodCode=\"EVN\"><subject>{}</subject></ControlActEvent>",
            content
        )
    }

    #[tokio::test]
    async fn rejected_cancellation_returns_bad_request() {
        let (ctx, _) = context(Environment::InternalDev);
        let detail = r#"<acknowledgementDetail typeCode="ER">
            <code codeSystem="2.16.840.1.113883.2.1.3.2.4.17.32" code="RejectionCode" displayName="Rejection Display Name"/>
        </acknowledgementDetail>"#;
        let body = spine_response("PORX_IN050101UK31", "AR", detail, "");

        let res = run(body, &ctx).await;
        let outcome = outcome(&res);

        assert_eq!(res.status_code, 400);
        assert_eq!(outcome.issue.len(), 1);
        assert_eq!(issue_code(&outcome.issue[0]), Some("RejectionCode"));
    }

    #[tokio::test]
    async fn cancellation_with_performer_equal_to_author() {
        let (ctx, _) = context(Environment::InternalDev);
        let author = agent_person("100102238986", "G9999999", "A83008");
        let performer = format!(
            "<performer>{}</performer>",
            agent_person("100102238986", "654321", "A83008")
        );
        let cancellation = cancellation_response(
            "0002",
            "Prescription/item was not cancelled - With dispenser",
            &author,
            &author,
            &performer,
        );
        let body = spine_response("PORX_IN050101UK31", "AA", "", &subject(&cancellation));

        let res = run(body, &ctx).await;
        let bundle = match &res.fhir_response {
            Resource::Bundle(bundle) => bundle,
            other => panic!("expected bundle, got {}", other.resource_type()),
        };
        let count = |type_: &str| {
            bundle
                .entries
                .iter()
                .filter(|e| e.resource.resource_type() == type_)
                .count()
        };

        assert_eq!(res.status_code, 200);
        assert_eq!(count("Practitioner"), 1);
        assert_eq!(count("PractitionerRole"), 1);
        assert_eq!(count("Organization"), 1);
    }

    #[tokio::test]
    async fn cancellation_error_returns_bad_request() {
        let (ctx, _) = context(Environment::InternalDev);
        let author = agent_person("100102238986", "G9999999", "A83008");
        let cancellation = cancellation_response(
            "0008",
            "Prescription/item not found",
            &author,
            &author,
            "",
        );
        let body = spine_response("PORX_IN050101UK31", "AE", "", &subject(&cancellation));

        let res = run(body, &ctx).await;

        assert_eq!(res.status_code, 400);
        assert_eq!(outcome(&res).issue[0].code, IssueType::NotFound);
    }

    #[tokio::test]
    async fn unknown_acknowledgement_is_a_server_error() {
        let (ctx, _) = context(Environment::InternalDev);
        let body = spine_response("MCCI_IN010000UK13", "XX", "", "");

        let res = run(body, &ctx).await;

        assert_eq!(res.status_code, 500);
        assert_eq!(outcome(&res).issue[0].code, IssueType::Invalid);
    }

    #[tokio::test]
    async fn unknown_interaction_is_a_server_error() {
        let (ctx, _) = context(Environment::InternalDev);
        let body = spine_response("PORX_IN999999UK99", "AA", "", "");

        assert_eq!(run(body, &ctx).await.status_code, 500);
    }

    #[tokio::test]
    async fn error_without_details_is_a_server_error() {
        let (ctx, _) = context(Environment::InternalDev);
        let body = spine_response("MCCI_IN010000UK13", "AE", "", "");

        assert_eq!(run(body, &ctx).await.status_code, 500);
    }

    #[tokio::test]
    async fn generic_error_is_translated() {
        let (ctx, _) = context(Environment::InternalDev);
        let reason = r#"<ControlActEvent><reason><justifyingDetectedIssueEvent>
            <code codeSystem="2.16.840.1.113883.2.1.3.2.4.17.22" code="0002" displayName="Duplicate HL7 ID Error"/>
        </justifyingDetectedIssueEvent></reason></ControlActEvent>"#;
        let body = spine_response("MCCI_IN010000UK13", "CE", "", reason);

        let res = run(body, &ctx).await;
        let outcome = outcome(&res);

        assert_eq!(res.status_code, 400);
        assert_eq!(outcome.issue[0].code, IssueType::Duplicate);
        assert_eq!(issue_code(&outcome.issue[0]), Some("DUPLICATE_PRESCRIPTION_ID"));
    }

    #[tokio::test]
    async fn acknowledged_generic_response_succeeds() {
        let (ctx, _) = context(Environment::InternalDev);
        let body = spine_response("MCCI_IN010000UK13", "AA", "", "");

        let res = run(body, &ctx).await;

        assert_eq!(res.status_code, 200);
        assert_eq!(outcome(&res).issue[0].severity, Severity::Information);
    }

    #[tokio::test]
    async fn release_rejected_with_another_dispenser() {
        let (ctx, _) = context(Environment::InternalDev);
        let rejection = format!(
            r#"<PrescriptionReleaseReject classCode="INFO" moodCode="EVN">
                <pertinentInformation>
                    <pertinentRejectionReason classCode="OBS" moodCode="EVN">
                        <value codeSystem="2.16.840.1.113883.2.1.3.2.4.16.34" code="0004" displayName="Prescription is with another dispenser"/>
                        <performer>{}</performer>
                    </pertinentRejectionReason>
                </pertinentInformation>
            </PrescriptionReleaseReject>"#,
            agent_person("555086415105", "3415870201", "VNE51")
        );
        let body = spine_response("PORX_IN110101UK30", "AE", "", &subject(&rejection));

        let res = run(body, &ctx).await;
        let outcome = outcome(&res);

        assert_eq!(res.status_code, 400);
        assert_eq!(
            issue_code(&outcome.issue[0]),
            Some("PRESCRIPTION_WITH_ANOTHER_DISPENSER")
        );
        assert_eq!(outcome.contained.len(), 1);
        assert_eq!(outcome.extension.len(), 1);
    }

    fn release_body() -> String {
        spine_response(
            "PORX_IN070101UK31",
            "AA",
            "",
            &subject(&release_response(&[PARENT_PRESCRIPTION])),
        )
    }

    fn parameter_total(res: &TranslatedSpineResponse, name: &str) -> Option<usize> {
        let parameters = match &res.fhir_response {
            Resource::Parameters(parameters) => parameters,
            other => panic!("expected parameters, got {}", other.resource_type()),
        };

        match parameters.get(name) {
            Some(Resource::Bundle(bundle)) => bundle.total,
            _ => None,
        }
    }

    #[tokio::test]
    async fn release_with_invalid_signature_sends_return() {
        let (ctx, sent) = context(Environment::Other("int".into()));

        let res = run(release_body(), &ctx).await;
        ctx.outbox.flush().await;

        assert_eq!(res.status_code, 200);
        assert_eq!(parameter_total(&res, PARAMETER_PASSED), Some(0));
        assert_eq!(parameter_total(&res, PARAMETER_FAILED), Some(2));
        assert_eq!(*sent.lock().unwrap(), vec!["83C40E-A23856-00123C".to_owned()]);
    }

    #[tokio::test]
    async fn release_does_not_send_returns_in_internal_dev() {
        let (ctx, sent) = context(Environment::InternalDev);

        let res = run(release_body(), &ctx).await;
        ctx.outbox.flush().await;

        assert_eq!(res.status_code, 200);
        assert!(sent.lock().unwrap().is_empty());
    }
}
