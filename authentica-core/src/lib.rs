//! Authentica Core - Product trust verification and scan fraud analytics
//!
//! This crate decides whether a scanned physical product is genuine by
//! cross-checking an external trust ledger, and surfaces fraud patterns
//! across accumulated scans (cloned QR codes, counterfeit clusters).
//!
//! # Features
//!
//! - Verification evaluator composing ledger facts into a pass/fail verdict
//!   with accumulated reasons (fail closed on any uncertain lookup)
//! - Keccak-256 content fingerprints for details integrity checks
//! - Append-only scan store with a geospatial index for radius queries
//! - Fraud pattern detector: suspicious locations, duplicate-sold products,
//!   composite per-product suspicion, and overview statistics
//! - Ingestion gate validating one scan event per verification attempt
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use authentica_core::{Evaluator, MockLedger, ProductFact, ProductStatus};
//!
//! # async fn example() -> authentica_core::Result<()> {
//! let ledger = MockLedger::new()
//!     .with_product(ProductFact {
//!         product_id: "SKU-1".into(),
//!         exists: true,
//!         manufacturer: "0xA11CE".into(),
//!         manufacture_date: None,
//!         batch_number: "B-7".into(),
//!         category: "electronics".into(),
//!         status: ProductStatus::Available,
//!         content_fingerprint: None,
//!     })
//!     .with_manufacturer("0xA11CE");
//!
//! let evaluator = Evaluator::new(Arc::new(ledger));
//! let verdict = evaluator.evaluate("SKU-1", None).await?;
//! assert!(verdict.verdict_ok);
//! # Ok(())
//! # }
//! ```

pub mod detector;
pub mod error;
pub mod evaluator;
pub mod fingerprint;
pub mod gate;
pub mod geo;
pub mod ledger;
pub mod scan;
pub mod store;

// Re-export main types for convenience
pub use detector::{
    DetectorConfig, DuplicateProduct, FraudAnalytics, FraudDetector, ScanStatistics, Sighting,
    SuspiciousLocation, SuspiciousProduct,
};
pub use error::{AuthenticaError, Result};
pub use evaluator::{Classification, Evaluator, SaleAssessment, Verdict};
pub use fingerprint::{details_fingerprint, fingerprints_match};
pub use gate::IngestionGate;
pub use geo::{Coordinates, GeoCell};
pub use ledger::{
    HttpLedger, LedgerHttpConfig, MockLedger, ProductFact, ProductStatus, SaleFact, TrustLedger,
};
pub use scan::{DeviceInfo, LedgerSnapshot, ScanEvent, ScanInput, ScanResult};
pub use store::{MemoryScanStore, ScanFilter, ScanStore};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    /// Integration test: evaluate, log the scan, detect the pattern.
    #[tokio::test]
    async fn test_full_verification_workflow() {
        let ledger = MockLedger::new()
            .with_product(ProductFact {
                product_id: "SKU-1".into(),
                exists: true,
                manufacturer: "0xA11CE".into(),
                manufacture_date: None,
                batch_number: "B-7".into(),
                category: "electronics".into(),
                status: ProductStatus::Available,
                content_fingerprint: None,
            })
            .with_manufacturer("0xA11CE");

        let store = Arc::new(MemoryScanStore::new());
        let evaluator = Evaluator::new(Arc::new(ledger));
        let gate = IngestionGate::new(store.clone());
        let detector = FraudDetector::new(store, DetectorConfig::default());

        let verdict = evaluator.evaluate("SKU-1", None).await.unwrap();
        assert!(verdict.verdict_ok);
        assert_eq!(verdict.classification, Classification::Authentic);

        gate.record(ScanInput {
            product_id: verdict.product_id.clone(),
            scan_result: verdict.classification.into(),
            latitude: Some(48.8566),
            longitude: Some(2.3522),
            address: None,
            ledger_snapshot: None,
            device_info: None,
        })
        .await
        .unwrap();

        let stats = detector.statistics().await.unwrap();
        assert_eq!(stats.authentic, 1);
        assert_eq!(stats.total(), 1);
    }
}
