//! Application state module
//!
//! Defines shared state accessible across all request handlers.

use std::sync::Arc;

use authentica_core::{
    DetectorConfig, Evaluator, FraudDetector, IngestionGate, ScanStore, TrustLedger,
};

/// Application state containing shared resources.
#[derive(Clone)]
pub struct AppState {
    /// Trust verification evaluator over the injected ledger client
    pub evaluator: Arc<Evaluator>,
    /// Single write path into the scan store
    pub gate: Arc<IngestionGate>,
    /// Read-side fraud aggregation with the configured thresholds
    pub detector: Arc<FraudDetector>,
    /// Scan store, shared by the gate and the detector
    pub store: Arc<dyn ScanStore>,
}

impl AppState {
    /// Wire the core components over a ledger client and scan store.
    pub fn new(
        ledger: Arc<dyn TrustLedger>,
        store: Arc<dyn ScanStore>,
        detector_config: DetectorConfig,
    ) -> Self {
        Self {
            evaluator: Arc::new(Evaluator::new(ledger)),
            gate: Arc::new(IngestionGate::new(store.clone())),
            detector: Arc::new(FraudDetector::new(store.clone(), detector_config)),
            store,
        }
    }
}
