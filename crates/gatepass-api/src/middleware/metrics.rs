//! # Request and Pass Metrics
//!
//! Counters recorded through the `metrics` facade into a Prometheus
//! recorder owned by the application state, rendered at `/metrics`.
//!
//! Each [`ApiMetrics`] has its own recorder rather than a process-global
//! one, so every router (and every test) counts in isolation.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use metrics::{counter, describe_counter, with_local_recorder};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle, PrometheusRecorder};

use gatepass_protocol::VerificationVerdict;

use crate::state::AppState;

const REQUESTS: &str = "gatepass_http_requests_total";
const ERRORS: &str = "gatepass_http_errors_total";
const PASSES_ISSUED: &str = "gatepass_passes_issued_total";
const ISSUANCE_FAILURES: &str = "gatepass_issuance_failures_total";
const VERDICTS: &str = "gatepass_verdicts_total";
const LEDGER_UNAVAILABLE: &str = "gatepass_ledger_unavailable_total";

/// Shared metrics state. Clones record into the same recorder.
#[derive(Clone)]
pub struct ApiMetrics {
    recorder: Arc<PrometheusRecorder>,
    handle: PrometheusHandle,
}

impl std::fmt::Debug for ApiMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiMetrics").finish_non_exhaustive()
    }
}

impl Default for ApiMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiMetrics {
    pub fn new() -> Self {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let metrics = Self {
            recorder: Arc::new(recorder),
            handle,
        };
        metrics.record(|| {
            describe_counter!(REQUESTS, "HTTP requests handled.");
            describe_counter!(ERRORS, "HTTP responses with a 4xx or 5xx status.");
            describe_counter!(PASSES_ISSUED, "Passes accepted by the ledger.");
            describe_counter!(ISSUANCE_FAILURES, "Issuance attempts that failed at any stage.");
            describe_counter!(VERDICTS, "Verification verdicts by outcome.");
            describe_counter!(
                LEDGER_UNAVAILABLE,
                "Verifications deferred because the ledger was unreachable."
            );
        });
        metrics
    }

    fn record(&self, f: impl FnOnce()) {
        with_local_recorder(self.recorder.as_ref(), f);
    }

    pub fn record_request(&self, is_error: bool) {
        self.record(|| {
            counter!(REQUESTS).increment(1);
            if is_error {
                counter!(ERRORS).increment(1);
            }
        });
    }

    pub fn record_issued(&self) {
        self.record(|| counter!(PASSES_ISSUED).increment(1));
    }

    pub fn record_issuance_failure(&self) {
        self.record(|| counter!(ISSUANCE_FAILURES).increment(1));
    }

    pub fn record_verdict(&self, verdict: &VerificationVerdict) {
        let outcome = match verdict {
            VerificationVerdict::Valid { .. } => "valid",
            VerificationVerdict::Invalid { .. } => "invalid",
            VerificationVerdict::NotFound => "not_found",
        };
        self.record(|| counter!(VERDICTS, "verdict" => outcome).increment(1));
    }

    pub fn record_ledger_unavailable(&self) {
        self.record(|| counter!(LEDGER_UNAVAILABLE).increment(1));
    }

    /// Prometheus text exposition.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Middleware that increments request and error counters.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();

    let response = next.run(request).await;

    if let Some(m) = metrics {
        let status = response.status();
        m.record_request(status.is_client_error() || status.is_server_error());
    }

    response
}

/// `GET /metrics`.
pub async fn render(State(state): State<AppState>) -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
        .into_response()
}
