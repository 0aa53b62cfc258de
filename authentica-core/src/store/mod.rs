//! Append-only scan event storage.
//!
//! The store is the boundary between ingestion (one append per completed
//! verification attempt) and the read-side fraud aggregation. Reads are
//! snapshot reads: a report reflects the store at query time, never a
//! linearizable view, and concurrent appends are expected.

mod memory;

pub use memory::MemoryScanStore;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::geo::Coordinates;
use crate::scan::{ScanEvent, ScanResult};

/// Default page size when listing recent events.
pub const DEFAULT_LIST_LIMIT: usize = 100;

/// Hard cap on any single listing, regardless of what the caller asks for.
pub const MAX_LIST_LIMIT: usize = 1000;

/// Filter for listing recent events.
#[derive(Debug, Clone)]
pub struct ScanFilter {
    pub product_id: Option<String>,
    pub scan_result: Option<ScanResult>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: usize,
}

impl Default for ScanFilter {
    fn default() -> Self {
        Self {
            product_id: None,
            scan_result: None,
            since: None,
            until: None,
            limit: DEFAULT_LIST_LIMIT,
        }
    }
}

impl ScanFilter {
    /// The effective page size: requested limit clamped to [1, MAX_LIST_LIMIT].
    pub fn effective_limit(&self) -> usize {
        self.limit.clamp(1, MAX_LIST_LIMIT)
    }
}

/// Append-only scan event store with geospatial and categorical reads.
///
/// Implementations must be thread-safe; appends from concurrent scans of the
/// same product are independent records, not conflicts.
#[async_trait]
pub trait ScanStore: Send + Sync {
    /// Append one immutable event.
    async fn append(&self, event: ScanEvent) -> Result<()>;

    /// Snapshot of all events whose result is one of `results`.
    async fn events_with_result(&self, results: &[ScanResult]) -> Result<Vec<ScanEvent>>;

    /// Recent events matching `filter`, newest first.
    async fn recent(&self, filter: &ScanFilter) -> Result<Vec<ScanEvent>>;

    /// Events within `radius_m` meters of `center`, nearest first, at most
    /// `limit`. Served from an index, not a full scan.
    async fn near(
        &self,
        center: Coordinates,
        radius_m: f64,
        limit: usize,
    ) -> Result<Vec<ScanEvent>>;

    /// Event counts grouped by scan result.
    async fn result_counts(&self) -> Result<HashMap<ScanResult, u64>>;
}
