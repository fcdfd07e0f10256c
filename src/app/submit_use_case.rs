use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

use crate::app::encoding;
use crate::app::interpret::{excerpt, parse_signal};
use crate::app::ports::UpstreamPort;
use crate::constants::{
    MISSING_EMAIL, SUBMISSION_FAILED, UPSTREAM_SEND_FAILED, UPSTREAM_SUBMISSION_FAILED,
};
use crate::domain::{
    DeliveryAttempt, Encoding, GatewayResult, ParsedSignal, RecordRejection, SubmissionRecord,
    TransportOutcome,
};
use crate::error::Result;
use crate::observability::metrics;

/// Progress of one submission through the two encodings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionState {
    AttemptJson,
    AttemptForm { primary: DeliveryAttempt },
    Finished(GatewayResult),
}

impl SubmissionState {
    pub fn start() -> Self {
        SubmissionState::AttemptJson
    }

    /// Fold the outcome of the pending attempt into the next state.
    pub fn advance(self, attempt: DeliveryAttempt) -> Self {
        match self {
            SubmissionState::AttemptJson if attempt.succeeded() => {
                SubmissionState::Finished(GatewayResult::accepted())
            }
            SubmissionState::AttemptJson => SubmissionState::AttemptForm { primary: attempt },
            SubmissionState::AttemptForm { .. } if attempt.succeeded() => {
                SubmissionState::Finished(GatewayResult::accepted())
            }
            SubmissionState::AttemptForm { primary } => {
                SubmissionState::Finished(normalize_failure(&primary, &attempt))
            }
            finished @ SubmissionState::Finished(_) => finished,
        }
    }
}

/// Collapse two failed attempts into one `upstreamFailed` result.
///
/// The primary attempt's error message wins over the fallback's; the detail
/// excerpt prefers the fallback body, then the primary body.
pub fn normalize_failure(primary: &DeliveryAttempt, fallback: &DeliveryAttempt) -> GatewayResult {
    let detail = excerpt(fallback.body_text().or_else(|| primary.body_text()));

    let explicit = primary.signal.is_explicit_failure() || fallback.signal.is_explicit_failure();
    if explicit {
        let error = primary
            .signal
            .error_message()
            .or_else(|| fallback.signal.error_message())
            .unwrap_or(UPSTREAM_SEND_FAILED);
        GatewayResult::upstream_failed(error, detail)
    } else {
        GatewayResult::upstream_failed(UPSTREAM_SUBMISSION_FAILED, detail)
    }
}

/// Use case relaying a submission to the upstream intake endpoint.
///
/// Holds no per-call state, so one instance serves concurrent submissions.
#[derive(Clone)]
pub struct SubmitUseCase {
    upstream: Arc<dyn UpstreamPort>,
}

impl SubmitUseCase {
    pub fn new(upstream: Arc<dyn UpstreamPort>) -> Self {
        Self { upstream }
    }

    /// Validate a raw inbound body and submit it.
    pub async fn submit_value(&self, value: &Value) -> GatewayResult {
        match SubmissionRecord::from_value(value) {
            Ok(record) => self.submit(&record).await,
            Err(rejection) => {
                let result = match rejection {
                    RecordRejection::MissingEmail => GatewayResult::rejected_input(MISSING_EMAIL),
                };
                debug!(?rejection, "Rejected submission input");
                metrics::submission::completed(result.status);
                result
            }
        }
    }

    /// Deliver a validated record. Never fails: every outcome is a result.
    pub async fn submit(&self, record: &SubmissionRecord) -> GatewayResult {
        let span = tracing::info_span!(
            "submission",
            id = %Uuid::new_v4(),
            email_domain = %record.email_domain()
        );
        self.run(record).instrument(span).await
    }

    async fn run(&self, record: &SubmissionRecord) -> GatewayResult {
        let mut state = SubmissionState::start();

        let result = loop {
            let encoding = match &state {
                SubmissionState::AttemptJson => Encoding::Json,
                SubmissionState::AttemptForm { .. } => Encoding::FormUrlEncoded,
                SubmissionState::Finished(result) => break result.clone(),
            };

            let attempt = match self.deliver(record, encoding).await {
                Ok(attempt) => attempt,
                Err(e) => {
                    warn!("Could not build {} request: {}", encoding.as_str(), e);
                    break GatewayResult::gateway_error(
                        SUBMISSION_FAILED,
                        excerpt(Some(&e.to_string())),
                    );
                }
            };
            metrics::submission::attempt(&attempt);
            state = state.advance(attempt);
        };

        match &result.error {
            Some(error) => warn!(
                status = result.status.as_str(),
                detail = result.detail.as_deref().unwrap_or(""),
                "Submission failed: {}",
                error
            ),
            None => info!(status = result.status.as_str(), "Submission completed"),
        }
        metrics::submission::completed(result.status);
        result
    }

    async fn deliver(&self, record: &SubmissionRecord, encoding: Encoding) -> Result<DeliveryAttempt> {
        let request = encoding::encode(record, encoding)?;

        let attempt = match self.upstream.post(request).await {
            Ok(reply) => DeliveryAttempt {
                encoding,
                transport: TransportOutcome::from_status(reply.status),
                signal: parse_signal(&reply.body),
                upstream_body: Some(reply.body),
            },
            Err(e) => DeliveryAttempt {
                encoding,
                transport: TransportOutcome::NetworkError(e),
                upstream_body: None,
                signal: ParsedSignal::Unparseable,
            },
        };

        debug!(
            encoding = encoding.as_str(),
            transport = ?attempt.transport,
            signal = ?attempt.signal,
            "Upstream attempt finished"
        );
        Ok(attempt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ports::{UpstreamReply, UpstreamRequest};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use tokio::sync::Mutex;

    /// Upstream returning scripted replies in order and recording requests.
    struct MockUpstream {
        replies: Mutex<VecDeque<std::result::Result<UpstreamReply, String>>>,
        pub requests: Arc<Mutex<Vec<UpstreamRequest>>>,
    }

    impl MockUpstream {
        fn new(replies: Vec<std::result::Result<UpstreamReply, String>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                requests: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait]
    impl UpstreamPort for MockUpstream {
        async fn post(&self, request: UpstreamRequest) -> std::result::Result<UpstreamReply, String> {
            self.requests.lock().await.push(request);
            self.replies
                .lock()
                .await
                .pop_front()
                .unwrap_or_else(|| Err("no scripted reply".to_string()))
        }
    }

    fn reply(status: u16, body: &str) -> std::result::Result<UpstreamReply, String> {
        Ok(UpstreamReply { status, body: body.to_string() })
    }

    fn use_case(
        replies: Vec<std::result::Result<UpstreamReply, String>>,
    ) -> (SubmitUseCase, Arc<Mutex<Vec<UpstreamRequest>>>) {
        let upstream = MockUpstream::new(replies);
        let requests = upstream.requests.clone();
        (SubmitUseCase::new(Arc::new(upstream)), requests)
    }

    fn attempt(encoding: Encoding, status: u16, body: Option<&str>) -> DeliveryAttempt {
        DeliveryAttempt {
            encoding,
            transport: TransportOutcome::from_status(status),
            upstream_body: body.map(String::from),
            signal: body.map(parse_signal).unwrap_or(ParsedSignal::Unparseable),
        }
    }

    #[tokio::test]
    async fn test_missing_or_non_string_email_makes_no_call() {
        for body in [json!({}), json!({ "email": 5 }), json!({ "email": null }), json!("x")] {
            let (use_case, requests) = use_case(vec![reply(200, r#"{"ok":true}"#)]);
            let result = use_case.submit_value(&body).await;

            assert_eq!(result.status, crate::domain::GatewayStatus::RejectedInput);
            assert_eq!(result.error.as_deref(), Some("Missing email"));
            assert!(requests.lock().await.is_empty());
        }
    }

    #[tokio::test]
    async fn test_json_ok_is_accepted_without_fallback() {
        let (use_case, requests) = use_case(vec![reply(200, r#"{"ok": true}"#)]);
        let result = use_case.submit_value(&json!({ "email": "ana@lab.org" })).await;

        assert_eq!(result, GatewayResult::accepted());
        let requests = requests.lock().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].content_type, "application/json");
    }

    #[tokio::test]
    async fn test_non_string_optional_field_is_relayed() {
        let (use_case, requests) = use_case(vec![reply(200, r#"{"ok": true}"#)]);
        let result = use_case.submit_value(&json!({ "email": "a@b.c", "role": 5 })).await;

        assert!(result.is_accepted());
        let requests = requests.lock().await;
        assert_eq!(requests.len(), 1);
        let forwarded: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(forwarded, json!({ "email": "a@b.c", "role": "5" }));
    }

    #[tokio::test]
    async fn test_unparseable_200_is_accepted() {
        let (use_case, requests) = use_case(vec![reply(200, "Thanks!")]);
        let result = use_case.submit_value(&json!({ "email": "ana@lab.org" })).await;

        assert!(result.is_accepted());
        assert_eq!(requests.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_primary_error_message_takes_precedence() {
        let (use_case, requests) = use_case(vec![
            reply(200, r#"{"ok": false, "error": "quota exceeded"}"#),
            reply(200, r#"{"ok": false, "error": "bad form"}"#),
        ]);
        let result = use_case.submit_value(&json!({ "email": "ana@lab.org" })).await;

        assert_eq!(result.status, crate::domain::GatewayStatus::UpstreamFailed);
        assert_eq!(result.error.as_deref(), Some("quota exceeded"));
        assert_eq!(result.detail.as_deref(), Some(r#"{"ok": false, "error": "bad form"}"#));

        let requests = requests.lock().await;
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].content_type, "application/x-www-form-urlencoded;charset=UTF-8");
    }

    #[tokio::test]
    async fn test_network_error_then_form_success_is_accepted() {
        let (use_case, requests) = use_case(vec![
            Err("connection refused".to_string()),
            reply(200, ""),
        ]);
        let result = use_case.submit_value(&json!({ "email": "ana@lab.org", "role": "pi" })).await;

        assert!(result.is_accepted());
        let requests = requests.lock().await;
        assert_eq!(
            String::from_utf8(requests[1].body.clone()).unwrap(),
            "email=ana%40lab.org&role=pi&source=&message="
        );
    }

    #[tokio::test]
    async fn test_both_fail_without_body() {
        let (use_case, _) = use_case(vec![Err("connection refused".to_string()), reply(503, "")]);
        let result = use_case.submit_value(&json!({ "email": "ana@lab.org" })).await;

        assert_eq!(result.status, crate::domain::GatewayStatus::UpstreamFailed);
        assert_eq!(result.error.as_deref(), Some("Upstream submission failed"));
        assert_eq!(result.detail.as_deref(), Some("No response body"));
    }

    #[tokio::test]
    async fn test_form_explicit_failure_after_http_error() {
        let (use_case, _) = use_case(vec![
            reply(500, "<html>\n  <body>Internal   error</body>\n</html>"),
            reply(200, r#"{"ok": false}"#),
        ]);
        let result = use_case.submit_value(&json!({ "email": "ana@lab.org" })).await;

        assert_eq!(result.error.as_deref(), Some("Upstream mail/send failed"));
        assert_eq!(result.detail.as_deref(), Some(r#"{"ok": false}"#));
    }

    #[tokio::test]
    async fn test_concurrent_submissions_are_independent() {
        /// Accepts addresses at `ok.org`, fails everything else explicitly.
        struct DomainUpstream;

        #[async_trait]
        impl UpstreamPort for DomainUpstream {
            async fn post(
                &self,
                request: UpstreamRequest,
            ) -> std::result::Result<UpstreamReply, String> {
                tokio::task::yield_now().await;
                let body = String::from_utf8_lossy(&request.body);
                if body.contains("ok.org") {
                    reply(200, r#"{"ok": true}"#)
                } else {
                    reply(200, r#"{"ok": false, "error": "rejected"}"#)
                }
            }
        }

        let use_case = SubmitUseCase::new(Arc::new(DomainUpstream));
        let handles: Vec<_> = (0..32)
            .map(|i| {
                let use_case = use_case.clone();
                tokio::spawn(async move {
                    let domain = if i % 2 == 0 { "ok.org" } else { "no.org" };
                    let email = format!("user{}@{}", i, domain);
                    (i, use_case.submit_value(&json!({ "email": email })).await)
                })
            })
            .collect();

        for handle in handles {
            let (i, result) = handle.await.unwrap();
            if i % 2 == 0 {
                assert!(result.is_accepted(), "submission {} should be accepted", i);
            } else {
                assert_eq!(result.error.as_deref(), Some("rejected"), "submission {}", i);
            }
        }
    }

    #[test]
    fn test_state_transitions() {
        let state = SubmissionState::start();
        assert_eq!(state, SubmissionState::AttemptJson);

        let primary = attempt(Encoding::Json, 502, None);
        let state = state.advance(primary.clone());
        assert_eq!(state, SubmissionState::AttemptForm { primary });

        let state = state.advance(attempt(Encoding::FormUrlEncoded, 200, Some(r#"{"ok":true}"#)));
        assert_eq!(state, SubmissionState::Finished(GatewayResult::accepted()));

        // finished states absorb further attempts
        let state = state.advance(attempt(Encoding::Json, 500, None));
        assert_eq!(state, SubmissionState::Finished(GatewayResult::accepted()));
    }

    #[test]
    fn test_normalize_prefers_fallback_body_for_detail() {
        let primary = attempt(Encoding::Json, 200, Some(r#"{"ok":false,"error":"first"}"#));
        let fallback = attempt(Encoding::FormUrlEncoded, 404, Some("Not   Found"));

        let result = normalize_failure(&primary, &fallback);
        assert_eq!(result.error.as_deref(), Some("first"));
        assert_eq!(result.detail.as_deref(), Some("Not Found"));

        let fallback = attempt(Encoding::FormUrlEncoded, 404, None);
        let result = normalize_failure(&primary, &fallback);
        assert_eq!(result.detail.as_deref(), Some(r#"{"ok":false,"error":"first"}"#));
    }

    #[test]
    fn test_normalize_uses_fallback_message_when_primary_has_none() {
        let primary = attempt(Encoding::Json, 200, Some(r#"{"ok":false,"error":""}"#));
        let fallback = attempt(Encoding::FormUrlEncoded, 200, Some(r#"{"ok":false,"error":"second"}"#));
        assert_eq!(normalize_failure(&primary, &fallback).error.as_deref(), Some("second"));
    }
}
