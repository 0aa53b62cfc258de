//! Scan ingestion and listing handlers
//!
//! POST /api/scans logs one scan event; GET /api/scans lists recent events
//! with optional filters for dashboards.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use authentica_core::{ScanEvent, ScanFilter, ScanInput, ScanResult};

use crate::error::ApiError;
use crate::state::AppState;

/// Query parameters for listing scans
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListScansQuery {
    /// Only events at or after this instant (RFC 3339)
    #[param(value_type = Option<String>)]
    pub start_date: Option<DateTime<Utc>>,

    /// Only events at or before this instant (RFC 3339)
    #[param(value_type = Option<String>)]
    pub end_date: Option<DateTime<Utc>>,

    /// Filter by scan result (NOT_FOUND, AUTHENTIC, ALREADY_SOLD)
    pub scan_result: Option<String>,

    /// Filter by product identifier
    pub product_id: Option<String>,

    /// Page size (default 100, max 1000)
    pub limit: Option<usize>,
}

/// Listing response
#[derive(Debug, Serialize, ToSchema)]
pub struct ScanListResponse {
    /// Number of events returned
    pub count: usize,
    /// The events, newest first
    #[schema(value_type = Vec<Object>)]
    pub scans: Vec<ScanEvent>,
}

/// Log a scan event
///
/// Validates the payload (non-empty product id, well-formed coordinates)
/// and appends one immutable event with a server-assigned timestamp.
#[utoipa::path(
    post,
    path = "/api/scans",
    tag = "Scans",
    request_body(content = Object, description = "Scan event payload"),
    responses(
        (status = 201, description = "Scan event recorded"),
        (status = 400, description = "Malformed payload")
    )
)]
pub async fn log_scan_handler(
    State(state): State<AppState>,
    Json(input): Json<ScanInput>,
) -> Result<(StatusCode, Json<ScanEvent>), ApiError> {
    let event = state.gate.record(input).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// List recent scan events
///
/// Returns events newest first, optionally filtered by time window, result,
/// and product identifier.
#[utoipa::path(
    get,
    path = "/api/scans",
    tag = "Scans",
    params(ListScansQuery),
    responses(
        (status = 200, description = "Recent scan events", body = ScanListResponse),
        (status = 400, description = "Invalid filter")
    )
)]
pub async fn list_scans_handler(
    State(state): State<AppState>,
    Query(query): Query<ListScansQuery>,
) -> Result<Json<ScanListResponse>, ApiError> {
    let scan_result = query
        .scan_result
        .as_deref()
        .map(str::parse::<ScanResult>)
        .transpose()?;

    let mut filter = ScanFilter {
        product_id: query.product_id,
        scan_result,
        since: query.start_date,
        until: query.end_date,
        ..Default::default()
    };
    if let Some(limit) = query.limit {
        filter.limit = limit;
    }

    let scans = state.store.recent(&filter).await?;
    Ok(Json(ScanListResponse {
        count: scans.len(),
        scans,
    }))
}
