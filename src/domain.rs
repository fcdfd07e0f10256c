//! Data shapes shared by the submission use case, its ports and the HTTP layer.

use serde::Serialize;
use serde_json::Value;

/// A visitor-submitted record to relay upstream.
///
/// Fields are private so a record cannot be altered once validated; the
/// gateway only ever reads and serializes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionRecord {
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

/// Why an inbound record was refused before any network call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordRejection {
    MissingEmail,
}

impl SubmissionRecord {
    pub fn new(
        email: impl Into<String>,
        role: Option<String>,
        source: Option<String>,
        message: Option<String>,
    ) -> Result<Self, RecordRejection> {
        let email = email.into();
        if email.is_empty() {
            return Err(RecordRejection::MissingEmail);
        }
        Ok(Self { email, role, source, message })
    }

    /// Validate a loosely-shaped inbound JSON value.
    ///
    /// Only `email` is checked: it must be a non-empty string. Optional
    /// fields are relayed as text; numbers and booleans are stringified,
    /// `null`, arrays and objects count as absent. Unknown keys are ignored.
    pub fn from_value(value: &Value) -> Result<Self, RecordRejection> {
        let email = match value.get("email") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            _ => return Err(RecordRejection::MissingEmail),
        };

        Ok(Self {
            email,
            role: optional_text(value, "role"),
            source: optional_text(value, "source"),
            message: optional_text(value, "message"),
        })
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Domain part of the email, for logs that must not carry the address.
    pub fn email_domain(&self) -> &str {
        self.email.rsplit_once('@').map(|(_, d)| d).unwrap_or("<none>")
    }
}

fn optional_text(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Wire format of one delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Json,
    FormUrlEncoded,
}

impl Encoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::Json => "json",
            Encoding::FormUrlEncoded => "form",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportOutcome {
    Success,
    HttpError(u16),
    NetworkError(String),
}

impl TransportOutcome {
    pub fn from_status(status: u16) -> Self {
        if (200..300).contains(&status) {
            TransportOutcome::Success
        } else {
            TransportOutcome::HttpError(status)
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransportOutcome::Success => "success",
            TransportOutcome::HttpError(_) => "http_error",
            TransportOutcome::NetworkError(_) => "network_error",
        }
    }
}

/// Business-level signal embedded in the upstream body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedSignal {
    /// Body parsed as JSON and did not carry `ok: false`.
    ExplicitOk,
    ExplicitFailure(Option<String>),
    /// Body absent or not JSON. Neutral: never a failure on its own.
    Unparseable,
}

impl ParsedSignal {
    pub fn is_explicit_failure(&self) -> bool {
        matches!(self, ParsedSignal::ExplicitFailure(_))
    }

    /// Upstream error message, if the signal carried a non-empty one.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            ParsedSignal::ExplicitFailure(Some(msg)) if !msg.is_empty() => Some(msg),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryAttempt {
    pub encoding: Encoding,
    pub transport: TransportOutcome,
    pub upstream_body: Option<String>,
    pub signal: ParsedSignal,
}

impl DeliveryAttempt {
    /// Transport succeeded (2xx) and the body did not signal failure.
    pub fn succeeded(&self) -> bool {
        self.transport == TransportOutcome::Success && !self.signal.is_explicit_failure()
    }

    /// Body text if the upstream returned anything other than whitespace.
    pub fn body_text(&self) -> Option<&str> {
        self.upstream_body
            .as_deref()
            .filter(|body| !body.trim().is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayStatus {
    Accepted,
    RejectedInput,
    UpstreamFailed,
    GatewayError,
}

impl GatewayStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayStatus::Accepted => "accepted",
            GatewayStatus::RejectedInput => "rejected_input",
            GatewayStatus::UpstreamFailed => "upstream_failed",
            GatewayStatus::GatewayError => "gateway_error",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            GatewayStatus::Accepted => 200,
            GatewayStatus::RejectedInput => 400,
            GatewayStatus::UpstreamFailed => 502,
            GatewayStatus::GatewayError => 500,
        }
    }
}

/// Normalized outcome of one `submit` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayResult {
    pub status: GatewayStatus,
    pub error: Option<String>,
    pub detail: Option<String>,
}

impl GatewayResult {
    pub fn accepted() -> Self {
        Self { status: GatewayStatus::Accepted, error: None, detail: None }
    }

    pub fn rejected_input(error: impl Into<String>) -> Self {
        Self { status: GatewayStatus::RejectedInput, error: Some(error.into()), detail: None }
    }

    pub fn upstream_failed(error: impl Into<String>, detail: String) -> Self {
        Self {
            status: GatewayStatus::UpstreamFailed,
            error: Some(error.into()),
            detail: Some(detail),
        }
    }

    pub fn gateway_error(error: impl Into<String>, detail: String) -> Self {
        Self {
            status: GatewayStatus::GatewayError,
            error: Some(error.into()),
            detail: Some(detail),
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.status == GatewayStatus::Accepted
    }

    /// Body returned to the UI: `{"ok": bool, "error"?, "detail"?}`.
    pub fn to_body(&self) -> Value {
        let mut body = serde_json::Map::new();
        body.insert("ok".to_string(), Value::Bool(self.is_accepted()));
        if let Some(error) = &self.error {
            body.insert("error".to_string(), Value::String(error.clone()));
        }
        if let Some(detail) = &self.detail {
            body.insert("detail".to_string(), Value::String(detail.clone()));
        }
        Value::Object(body)
    }
}
