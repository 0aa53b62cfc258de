//! Scan event model.
//!
//! Every verification attempt leaves exactly one immutable [`ScanEvent`] in
//! the scan store. Events are analytics input only: they are never read back
//! into a verification decision, never mutated, and never deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AuthenticaError, Result};
use crate::evaluator::Classification;
use crate::geo::Coordinates;

/// Outcome bucket recorded for a single scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanResult {
    NotFound,
    Authentic,
    AlreadySold,
}

impl ScanResult {
    /// Wire name, as stored and exposed over the API.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::Authentic => "AUTHENTIC",
            Self::AlreadySold => "ALREADY_SOLD",
        }
    }
}

impl std::fmt::Display for ScanResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ScanResult {
    type Err = AuthenticaError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "NOT_FOUND" => Ok(Self::NotFound),
            "AUTHENTIC" => Ok(Self::Authentic),
            "ALREADY_SOLD" => Ok(Self::AlreadySold),
            other => Err(AuthenticaError::Validation(format!(
                "unknown scan result '{other}'"
            ))),
        }
    }
}

impl From<Classification> for ScanResult {
    fn from(classification: Classification) -> Self {
        match classification {
            Classification::NotFound => Self::NotFound,
            Classification::Authentic => Self::Authentic,
            Classification::AlreadySold => Self::AlreadySold,
        }
    }
}

/// Ledger facts captured at scan time, for later forensics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSnapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Device information reported by the scanning client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
}

/// One immutable record of a single verification attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanEvent {
    pub id: Uuid,
    pub product_id: String,
    pub scan_result: ScanResult,
    pub occurred_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Coordinates>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub human_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ledger_snapshot: Option<LedgerSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<DeviceInfo>,
}

/// Raw scan payload, before validation by the ingestion gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanInput {
    pub product_id: String,
    pub scan_result: ScanResult,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub ledger_snapshot: Option<LedgerSnapshot>,
    #[serde(default)]
    pub device_info: Option<DeviceInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_result_wire_names() {
        assert_eq!(ScanResult::NotFound.as_str(), "NOT_FOUND");
        assert_eq!(ScanResult::Authentic.as_str(), "AUTHENTIC");
        assert_eq!(ScanResult::AlreadySold.as_str(), "ALREADY_SOLD");
    }

    #[test]
    fn test_scan_result_roundtrip() {
        for result in [
            ScanResult::NotFound,
            ScanResult::Authentic,
            ScanResult::AlreadySold,
        ] {
            assert_eq!(result.as_str().parse::<ScanResult>().unwrap(), result);
        }
        assert!("BOGUS".parse::<ScanResult>().is_err());
    }

    #[test]
    fn test_scan_result_json_matches_wire_names() {
        let json = serde_json::to_string(&ScanResult::AlreadySold).unwrap();
        assert_eq!(json, "\"ALREADY_SOLD\"");
    }

    #[test]
    fn test_classification_maps_onto_scan_result() {
        assert_eq!(
            ScanResult::from(Classification::NotFound),
            ScanResult::NotFound
        );
        assert_eq!(
            ScanResult::from(Classification::AlreadySold),
            ScanResult::AlreadySold
        );
    }

    #[test]
    fn test_scan_input_accepts_minimal_payload() {
        let input: ScanInput =
            serde_json::from_str(r#"{"productId":"P1","scanResult":"AUTHENTIC"}"#).unwrap();
        assert_eq!(input.product_id, "P1");
        assert_eq!(input.scan_result, ScanResult::Authentic);
        assert!(input.latitude.is_none());
    }
}
