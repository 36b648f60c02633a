//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Issuance failures carry the pipeline stage they came from so a client
//! knows whether to re-upload, retry, or stop. Internal details of 500-class
//! errors are logged, never returned.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use gatepass_clients::ExtractionError;
use gatepass_protocol::{BuildError, IssuanceError, IssuanceStage, SubmissionError};
use gatepass_signing::SigningError;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g. `LEDGER_REJECTED`).
    pub code: String,
    pub message: String,
    /// Issuance stage that failed, for issuance errors only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<IssuanceStage>,
}

/// Application-level error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Request body could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Request parsed but failed validation (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// A dependency is not configured or not reachable (503).
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error(transparent)]
    Issuance(#[from] IssuanceError),

    /// Internal server error (500). Message is logged but not returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status and machine-readable code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::ServiceUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE"),
            Self::Issuance(e) => issuance_status(e),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

fn issuance_status(error: &IssuanceError) -> (StatusCode, &'static str) {
    match error {
        IssuanceError::Extraction(ExtractionError::Unavailable { .. }) => {
            (StatusCode::BAD_GATEWAY, "EXTRACTION_UNAVAILABLE")
        }
        IssuanceError::Extraction(_) => (StatusCode::UNPROCESSABLE_ENTITY, "EXTRACTION_FAILED"),
        IssuanceError::Pinning(_) => (StatusCode::BAD_GATEWAY, "PINNING_FAILED"),
        IssuanceError::Encoding(_) => (StatusCode::UNPROCESSABLE_ENTITY, "ENCODING_FAILED"),
        IssuanceError::Build(BuildError::StaleAccountState { .. }) => {
            (StatusCode::CONFLICT, "STALE_ACCOUNT_STATE")
        }
        IssuanceError::Build(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        IssuanceError::Signing(SigningError::UserRejected { .. }) => {
            (StatusCode::FORBIDDEN, "SIGNING_REJECTED")
        }
        IssuanceError::Signing(SigningError::AgentUnavailable { .. }) => {
            (StatusCode::SERVICE_UNAVAILABLE, "SIGNER_UNAVAILABLE")
        }
        IssuanceError::Signing(_) => (StatusCode::BAD_GATEWAY, "SIGNING_FAILED"),
        IssuanceError::Submission(SubmissionError::Rejected { .. }) => {
            (StatusCode::UNPROCESSABLE_ENTITY, "LEDGER_REJECTED")
        }
        IssuanceError::Submission(SubmissionError::Timeout) => {
            (StatusCode::GATEWAY_TIMEOUT, "SUBMISSION_OUTCOME_UNKNOWN")
        }
        IssuanceError::Submission(SubmissionError::NetworkUnavailable { .. }) => {
            (StatusCode::SERVICE_UNAVAILABLE, "LEDGER_UNAVAILABLE")
        }
        IssuanceError::Submission(SubmissionError::Expired) => {
            (StatusCode::CONFLICT, "TRANSACTION_EXPIRED")
        }
        IssuanceError::Submission(SubmissionError::EnvelopeMismatch { .. }) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let stage = match &self {
            Self::Issuance(e) => Some(e.stage()),
            _ => None,
        };

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "internal server error");
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                stage,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<gatepass_core::ValidationError> for AppError {
    fn from(err: gatepass_core::ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn issuance_errors_carry_stage() {
        let err = AppError::Issuance(IssuanceError::Submission(SubmissionError::Rejected {
            code: "tx_bad_seq".into(),
        }));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "LEDGER_REJECTED");
        assert_eq!(body["error"]["stage"], "submission");
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("tx_bad_seq"));
    }

    #[tokio::test]
    async fn submission_timeout_is_gateway_timeout() {
        let response =
            AppError::Issuance(IssuanceError::Submission(SubmissionError::Timeout)).into_response();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[tokio::test]
    async fn internal_details_are_hidden() {
        let response = AppError::Internal("db password wrong".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"]["message"], "An internal error occurred");
        assert!(body["error"].get("stage").is_none());
    }

    #[tokio::test]
    async fn user_rejection_is_forbidden() {
        let response = AppError::Issuance(IssuanceError::Signing(SigningError::UserRejected {
            reason: "declined".into(),
        }))
        .into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_json(response).await["error"]["stage"], "signing");
    }
}
