//! Scan ingestion gate.
//!
//! Single write path into the scan store: validates one payload, stamps it
//! with a server-assigned id and timestamp, and appends it. Verification is
//! never gated on logging; callers composing evaluation with ingestion treat
//! a failed append as best-effort and still return the verdict.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::error::{AuthenticaError, Result};
use crate::geo::Coordinates;
use crate::scan::{ScanEvent, ScanInput};
use crate::store::ScanStore;

/// Validates scan payloads and appends immutable scan events.
pub struct IngestionGate {
    store: Arc<dyn ScanStore>,
}

impl IngestionGate {
    pub fn new(store: Arc<dyn ScanStore>) -> Self {
        Self { store }
    }

    /// Validate `input` and append one event.
    ///
    /// Returns the persisted event, or a validation error for a malformed
    /// payload. The event's timestamp is assigned here, not by the client.
    pub async fn record(&self, input: ScanInput) -> Result<ScanEvent> {
        let event = Self::admit(input)?;
        self.store.append(event.clone()).await?;
        tracing::debug!(
            product_id = %event.product_id,
            scan_result = %event.scan_result,
            "Scan event recorded"
        );
        Ok(event)
    }

    /// Pure validation and stamping, without the store append.
    fn admit(input: ScanInput) -> Result<ScanEvent> {
        let product_id = input.product_id.trim();
        if product_id.is_empty() {
            return Err(AuthenticaError::Validation(
                "productId must not be empty".into(),
            ));
        }

        let location = match (input.latitude, input.longitude) {
            (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)?),
            (None, None) => None,
            _ => {
                return Err(AuthenticaError::Validation(
                    "latitude and longitude must be provided together".into(),
                ))
            }
        };

        Ok(ScanEvent {
            id: Uuid::new_v4(),
            product_id: product_id.to_string(),
            scan_result: input.scan_result,
            occurred_at: Utc::now(),
            location,
            human_address: input.address,
            ledger_snapshot: input.ledger_snapshot,
            device: input.device_info,
        })
    }
}
