//! In-memory scan store.
//!
//! Backs tests and database-less deployments. Events live in an append-only
//! vector; located events are additionally indexed by a coarse latitude band
//! (hundredths of a degree, ~1.1 km) so circular-region queries range-scan
//! the bands covering the radius instead of walking the whole log.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;

use super::{ScanFilter, ScanStore};
use crate::error::{AuthenticaError, Result};
use crate::geo::{Coordinates, METERS_PER_DEGREE_LAT};
use crate::scan::{ScanEvent, ScanResult};

const LAT_BAND_SCALE: f64 = 100.0;

#[derive(Default)]
struct Inner {
    events: Vec<ScanEvent>,
    /// Scaled latitude band -> indexes into `events` (located events only).
    lat_bands: BTreeMap<i64, Vec<usize>>,
}

/// In-memory [`ScanStore`] implementation.
#[derive(Default)]
pub struct MemoryScanStore {
    inner: RwLock<Inner>,
}

impl MemoryScanStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|_| AuthenticaError::Store("scan store lock poisoned".into()))
    }
}

#[async_trait]
impl ScanStore for MemoryScanStore {
    async fn append(&self, event: ScanEvent) -> Result<()> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| AuthenticaError::Store("scan store lock poisoned".into()))?;

        let index = inner.events.len();
        if let Some(location) = &event.location {
            let band = (location.latitude * LAT_BAND_SCALE).trunc() as i64;
            inner.lat_bands.entry(band).or_default().push(index);
        }
        inner.events.push(event);
        Ok(())
    }

    async fn events_with_result(&self, results: &[ScanResult]) -> Result<Vec<ScanEvent>> {
        let inner = self.read()?;
        Ok(inner
            .events
            .iter()
            .filter(|e| results.contains(&e.scan_result))
            .cloned()
            .collect())
    }

    async fn recent(&self, filter: &ScanFilter) -> Result<Vec<ScanEvent>> {
        let inner = self.read()?;
        Ok(inner
            .events
            .iter()
            .rev()
            .filter(|e| {
                filter
                    .product_id
                    .as_ref()
                    .is_none_or(|id| &e.product_id == id)
                    && filter.scan_result.is_none_or(|r| e.scan_result == r)
                    && filter.since.is_none_or(|t| e.occurred_at >= t)
                    && filter.until.is_none_or(|t| e.occurred_at <= t)
            })
            .take(filter.effective_limit())
            .cloned()
            .collect())
    }

    async fn near(
        &self,
        center: Coordinates,
        radius_m: f64,
        limit: usize,
    ) -> Result<Vec<ScanEvent>> {
        let inner = self.read()?;

        let band_halfwidth = (radius_m / METERS_PER_DEGREE_LAT) * LAT_BAND_SCALE;
        let center_band = center.latitude * LAT_BAND_SCALE;
        let low = (center_band - band_halfwidth).floor() as i64;
        let high = (center_band + band_halfwidth).ceil() as i64;

        let mut hits: Vec<(f64, &ScanEvent)> = inner
            .lat_bands
            .range(low..=high)
            .flat_map(|(_, indexes)| indexes.iter())
            .filter_map(|&i| {
                let event = &inner.events[i];
                let location = event.location.as_ref()?;
                let distance = center.distance_m(location);
                (distance <= radius_m).then_some((distance, event))
            })
            .collect();

        hits.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(hits
            .into_iter()
            .take(limit)
            .map(|(_, e)| e.clone())
            .collect())
    }

    async fn result_counts(&self) -> Result<HashMap<ScanResult, u64>> {
        let inner = self.read()?;
        let mut counts = HashMap::new();
        for event in &inner.events {
            *counts.entry(event.scan_result).or_insert(0) += 1;
        }
        Ok(counts)
    }
}
