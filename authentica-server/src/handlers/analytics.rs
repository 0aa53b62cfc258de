//! Fraud analytics handlers
//!
//! Read-side reports over the accumulated scan log: the combined dashboard
//! payload, the composite suspicious-product report, and the radius query.
//! Thresholds default to the configured values and can be overridden per
//! request through query parameters.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use authentica_core::{
    Coordinates, DetectorConfig, FraudAnalytics, ScanEvent, SuspiciousProduct,
};

use crate::error::ApiError;
use crate::state::AppState;

/// Optional threshold overrides for the fraud reports
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdQuery {
    /// Grouping precision for location cells, in decimal places
    pub cell_precision: Option<u32>,

    /// Minimum failed lookups at one cell before it is reported
    pub suspicious_location_min: Option<u64>,

    /// Minimum already-sold rescans of one product before it is reported
    pub duplicate_sale_min: Option<u64>,

    /// Minimum not-found scans before the composite report flags a product
    pub suspicious_not_found_min: Option<u64>,
}

impl ThresholdQuery {
    fn apply(self, defaults: &DetectorConfig) -> DetectorConfig {
        DetectorConfig {
            cell_precision: self.cell_precision.unwrap_or(defaults.cell_precision),
            suspicious_location_min: self
                .suspicious_location_min
                .unwrap_or(defaults.suspicious_location_min),
            duplicate_sale_min: self.duplicate_sale_min.unwrap_or(defaults.duplicate_sale_min),
            suspicious_not_found_min: self
                .suspicious_not_found_min
                .unwrap_or(defaults.suspicious_not_found_min),
            ..defaults.clone()
        }
    }
}

/// Query parameters for the radius query
#[derive(Debug, Deserialize, IntoParams)]
pub struct NearbyQuery {
    /// Center latitude
    pub latitude: f64,

    /// Center longitude
    pub longitude: f64,

    /// Radius in meters (default 5000)
    pub radius: Option<f64>,
}

/// Radius query response
#[derive(Debug, Serialize, ToSchema)]
pub struct NearbyResponse {
    pub count: usize,
    /// Events within the radius, nearest first
    #[schema(value_type = Vec<Object>)]
    pub scans: Vec<ScanEvent>,
}

/// Suspicious product report response
#[derive(Debug, Serialize, ToSchema)]
pub struct SuspiciousResponse {
    pub count: usize,
    #[schema(value_type = Vec<Object>)]
    pub products: Vec<SuspiciousProduct>,
}

/// Fraud analytics dashboard payload
///
/// Returns suspicious locations (clusters of failed lookups), duplicate-sold
/// products (cloned QR codes), and overview statistics.
#[utoipa::path(
    get,
    path = "/api/scans/analytics",
    tag = "Analytics",
    params(ThresholdQuery),
    responses(
        (status = 200, description = "Combined fraud analytics report")
    )
)]
pub async fn analytics_handler(
    State(state): State<AppState>,
    Query(thresholds): Query<ThresholdQuery>,
) -> Result<Json<FraudAnalytics>, ApiError> {
    let config = thresholds.apply(state.detector.config());
    let report = state.detector.overridden(config).analytics().await?;
    Ok(Json(report))
}

/// Composite suspicious-product report
///
/// Flags products whose already-sold or not-found scan counts cross the
/// configured thresholds, sorted by total scan volume.
#[utoipa::path(
    get,
    path = "/api/scans/suspicious",
    tag = "Analytics",
    params(ThresholdQuery),
    responses(
        (status = 200, description = "Flagged products", body = SuspiciousResponse)
    )
)]
pub async fn suspicious_handler(
    State(state): State<AppState>,
    Query(thresholds): Query<ThresholdQuery>,
) -> Result<Json<SuspiciousResponse>, ApiError> {
    let config = thresholds.apply(state.detector.config());
    let products = state
        .detector
        .overridden(config)
        .suspicious_products()
        .await?;
    Ok(Json(SuspiciousResponse {
        count: products.len(),
        products,
    }))
}

/// Scan events near a location
///
/// Returns up to the configured page of events within the radius of the
/// given center, nearest first. Serves map views of scan activity.
#[utoipa::path(
    get,
    path = "/api/scans/nearby",
    tag = "Analytics",
    params(NearbyQuery),
    responses(
        (status = 200, description = "Events within the radius, nearest first", body = NearbyResponse),
        (status = 400, description = "Malformed coordinates")
    )
)]
pub async fn nearby_handler(
    State(state): State<AppState>,
    Query(query): Query<NearbyQuery>,
) -> Result<Json<NearbyResponse>, ApiError> {
    let center = Coordinates::new(query.latitude, query.longitude)?;

    if let Some(radius) = query.radius {
        if !radius.is_finite() || radius <= 0.0 {
            return Err(ApiError::bad_request("radius must be a positive number"));
        }
    }

    let scans = state.detector.scans_near(center, query.radius).await?;
    Ok(Json(NearbyResponse {
        count: scans.len(),
        scans,
    }))
}
