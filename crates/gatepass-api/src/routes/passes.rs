//! # Pass Routes
//!
//! - `POST /v1/passes`: issue a pass from a base64 document image.
//! - `POST /v1/passes/verify`: verify the text scanned from a QR code.
//!
//! Verification always answers 200 with a verdict body, including for
//! `invalid` and `not_found`. Only a ledger outage is an error (503), since
//! the scan can be retried.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use gatepass_core::{AccountId, PassRecord};
use gatepass_protocol::{VerificationError, VerificationVerdict};
use gatepass_signing::SignerSession;

use crate::error::AppError;
use crate::extractors::extract_json;
use crate::state::AppState;

/// Largest accepted document image after base64 decoding.
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Deserialize)]
pub struct IssuePassRequest {
    pub image_base64: String,
    /// Source account to issue from. Defaults to the configured signer's.
    #[serde(default)]
    pub account_id: Option<AccountId>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IssuePassResponse {
    pub pass: PassRecord,
    /// JSON text to render as the QR code.
    pub qr_payload: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

pub fn issuance_router() -> Router<AppState> {
    Router::new().route("/v1/passes", post(issue_pass))
}

pub fn verification_router() -> Router<AppState> {
    Router::new().route("/v1/passes/verify", post(verify_pass))
}

async fn issue_pass(
    State(state): State<AppState>,
    body: Result<Json<IssuePassRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<IssuePassResponse>), AppError> {
    let request = extract_json(body)?;
    let issuance = state
        .issuance
        .clone()
        .ok_or_else(|| AppError::ServiceUnavailable("issuance is not configured".into()))?;

    let image = STANDARD
        .decode(request.image_base64.trim())
        .map_err(|e| AppError::Validation(format!("image_base64: {e}")))?;
    if image.is_empty() {
        return Err(AppError::Validation("image_base64: empty image".into()));
    }
    if image.len() > MAX_IMAGE_BYTES {
        return Err(AppError::Validation(format!(
            "image exceeds {MAX_IMAGE_BYTES} bytes"
        )));
    }

    let session = match request.account_id {
        Some(account) => SignerSession::new(
            account,
            issuance.signer.network().clone(),
            issuance.signer.gateway().clone(),
        ),
        None => issuance.signer.clone(),
    };

    match issuance.issuer.issue_pass(&image, &session).await {
        Ok(issued) => {
            state.metrics.record_issued();
            Ok((
                StatusCode::CREATED,
                Json(IssuePassResponse {
                    qr_payload: issued.qr_payload.to_json(),
                    pass: issued.record,
                    photo_url: issued.photo_url,
                }),
            ))
        }
        Err(e) => {
            state.metrics.record_issuance_failure();
            tracing::warn!(stage = %e.stage(), error = %e, "issuance failed");
            Err(e.into())
        }
    }
}

async fn verify_pass(
    State(state): State<AppState>,
    body: axum::body::Bytes,
) -> Result<Json<VerificationVerdict>, AppError> {
    match state.verifier.verify_pass(&body).await {
        Ok(verdict) => {
            state.metrics.record_verdict(&verdict);
            Ok(Json(verdict))
        }
        Err(VerificationError::LedgerUnavailable { reason }) => {
            state.metrics.record_ledger_unavailable();
            Err(AppError::ServiceUnavailable(format!(
                "ledger unavailable, retry the scan: {reason}"
            )))
        }
    }
}
