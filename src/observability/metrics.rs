//! Prometheus metrics for the submission gateway.
//!
//! Counters go through the `metrics` facade; the recorder is installed once
//! by [`init`] and rendered by the `/metrics` route.

use std::fmt;
use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::{info, warn};

/// All metric names used by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    SubmissionsTotal,
    AttemptsTotal,
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::SubmissionsTotal => "waitlist_gateway_submissions_total",
            MetricName::AttemptsTotal => "waitlist_gateway_attempts_total",
        }
    }

    pub fn all_metrics() -> impl Iterator<Item = MetricName> {
        [MetricName::SubmissionsTotal, MetricName::AttemptsTotal].into_iter()
    }

    pub fn description(&self) -> &'static str {
        match self {
            MetricName::SubmissionsTotal => "Completed submissions by final status",
            MetricName::AttemptsTotal => "Upstream delivery attempts by encoding and outcome",
        }
    }
}

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Idempotent; failures only log.
pub fn init() {
    if HANDLE.get().is_some() {
        return;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if HANDLE.set(handle).is_err() {
                warn!("Metrics handle was already set");
                return;
            }
            for name in MetricName::all_metrics() {
                ::metrics::describe_counter!(name.as_str(), name.description());
            }
            info!("Prometheus recorder installed");
        }
        Err(e) => warn!("Failed to install Prometheus recorder: {}", e),
    }
}

/// Text exposition of all metrics, empty when no recorder is installed.
pub fn render() -> String {
    HANDLE.get().map(|handle| handle.render()).unwrap_or_default()
}

// ============================================================================
// Submission Metrics
// ============================================================================

pub mod submission {
    use super::MetricName;
    use crate::domain::{DeliveryAttempt, GatewayStatus};

    /// Record a finished `submit` call
    pub fn completed(status: GatewayStatus) {
        ::metrics::counter!(MetricName::SubmissionsTotal.as_str(), "status" => status.as_str())
            .increment(1);
    }

    /// Record one upstream delivery attempt
    pub fn attempt(attempt: &DeliveryAttempt) {
        let outcome = if attempt.succeeded() {
            "accepted"
        } else if attempt.signal.is_explicit_failure() {
            "explicit_failure"
        } else {
            attempt.transport.as_str()
        };
        ::metrics::counter!(
            MetricName::AttemptsTotal.as_str(),
            "encoding" => attempt.encoding.as_str(),
            "outcome" => outcome
        )
        .increment(1);
    }
}
