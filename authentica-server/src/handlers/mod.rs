//! HTTP request handlers
//!
//! This module contains all the request handlers for the API endpoints.

pub mod analytics;
pub mod health;
pub mod scans;
pub mod verify;

pub use crate::state::AppState;
pub use analytics::{
    analytics_handler, nearby_handler, suspicious_handler, NearbyQuery, NearbyResponse,
    SuspiciousResponse, ThresholdQuery,
};
pub use health::{health, ready, HealthResponse, ReadyResponse};
pub use scans::{list_scans_handler, log_scan_handler, ListScansQuery, ScanListResponse};
pub use verify::{verify_handler, VerifyRequest};
