//! Product verification handler
//!
//! Handles POST /verify requests: evaluates the product against the trust
//! ledger and logs one scan event tagged with the resulting classification.

use axum::{extract::State, Json};
use serde::Deserialize;
use utoipa::ToSchema;

use authentica_core::{DeviceInfo, LedgerSnapshot, ProductStatus, ScanInput, Verdict};

use crate::error::ApiError;
use crate::state::AppState;

/// Verification request payload
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    /// Product identifier, as decoded from the QR code
    #[schema(example = "SKU-12345")]
    pub product_id: String,

    /// Canonical details string for the fingerprint integrity check
    #[serde(default)]
    pub details: Option<String>,

    /// Scanner latitude, for fraud analytics
    #[serde(default)]
    pub latitude: Option<f64>,

    /// Scanner longitude, for fraud analytics
    #[serde(default)]
    pub longitude: Option<f64>,

    /// Human-readable address of the scan, if known
    #[serde(default)]
    pub address: Option<String>,

    /// Device information reported by the scanning client
    #[serde(default)]
    #[schema(value_type = Object)]
    pub device_info: Option<DeviceInfo>,
}

/// Verify a product identifier against the trust ledger
///
/// Runs the full verification sequence (existence, manufacturer trust,
/// details fingerprint, sale/retailer checks) and returns the verdict with
/// its accumulated reasons. One scan event is appended for fraud analytics;
/// logging is best-effort and never fails the verification.
#[utoipa::path(
    post,
    path = "/verify",
    tag = "Verification",
    request_body = VerifyRequest,
    responses(
        (status = 200, description = "Verification verdict with accumulated reasons"),
        (status = 400, description = "Malformed request"),
        (status = 503, description = "Trust ledger unavailable")
    )
)]
pub async fn verify_handler(
    State(state): State<AppState>,
    Json(request): Json<VerifyRequest>,
) -> Result<Json<Verdict>, ApiError> {
    let product_id = request.product_id.trim();
    if product_id.is_empty() {
        return Err(ApiError::bad_request("productId must not be empty"));
    }

    let verdict = state
        .evaluator
        .evaluate(product_id, request.details.as_deref())
        .await?;

    // Best-effort scan logging: the verdict is returned even when the
    // append fails.
    let snapshot = verdict.exists.then(|| LedgerSnapshot {
        manufacturer: Some(verdict.manufacturer.clone()),
        batch_number: Some(verdict.batch_number.clone()),
        status: Some(
            match verdict.status {
                ProductStatus::Available => "Available",
                ProductStatus::Sold => "Sold",
            }
            .to_string(),
        ),
    });

    let input = ScanInput {
        product_id: verdict.product_id.clone(),
        scan_result: verdict.classification.into(),
        latitude: request.latitude,
        longitude: request.longitude,
        address: request.address,
        ledger_snapshot: snapshot,
        device_info: request.device_info,
    };

    if let Err(err) = state.gate.record(input).await {
        tracing::warn!(
            error = %err,
            product_id = %verdict.product_id,
            "Failed to log scan event; returning verdict anyway"
        );
    }

    Ok(Json(verdict))
}
