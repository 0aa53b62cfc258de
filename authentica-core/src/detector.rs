//! Scan fraud-pattern detection.
//!
//! Read-side aggregation over the scan store. Three patterns are surfaced:
//! failed lookups concentrated at one place (a point of sale pushing
//! counterfeits), one product repeatedly rescanned as already sold (a cloned
//! QR code in circulation), and a composite per-product view combining both
//! signals. Reports are recomputed per query and never persisted.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::geo::{Coordinates, GeoCell};
use crate::scan::{ScanEvent, ScanResult};
use crate::store::ScanStore;

/// Default grouping precision for location cells, in decimal places.
/// Four places is roughly 11 m: coarse enough to absorb GPS jitter from
/// independent scans at the same storefront.
pub const DEFAULT_CELL_PRECISION: u32 = 4;

/// Failed lookups at one cell before it is reported.
pub const DEFAULT_SUSPICIOUS_LOCATION_MIN: u64 = 5;

/// Already-sold rescans of one product before it is reported.
pub const DEFAULT_DUPLICATE_SALE_MIN: u64 = 3;

/// Not-found scans of one product before the composite report flags it.
pub const DEFAULT_SUSPICIOUS_NOT_FOUND_MIN: u64 = 5;

/// Page size cap for radius queries.
pub const DEFAULT_NEARBY_LIMIT: usize = 100;

/// Default radius for nearby queries, in meters.
pub const DEFAULT_NEARBY_RADIUS_M: f64 = 5000.0;

/// Tunable thresholds for all fraud reports.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub cell_precision: u32,
    pub suspicious_location_min: u64,
    pub duplicate_sale_min: u64,
    pub suspicious_not_found_min: u64,
    pub nearby_limit: usize,
    pub nearby_default_radius_m: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            cell_precision: DEFAULT_CELL_PRECISION,
            suspicious_location_min: DEFAULT_SUSPICIOUS_LOCATION_MIN,
            duplicate_sale_min: DEFAULT_DUPLICATE_SALE_MIN,
            suspicious_not_found_min: DEFAULT_SUSPICIOUS_NOT_FOUND_MIN,
            nearby_limit: DEFAULT_NEARBY_LIMIT,
            nearby_default_radius_m: DEFAULT_NEARBY_RADIUS_M,
        }
    }
}

/// A grid cell with an unusual concentration of failed lookups.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuspiciousLocation {
    /// Truncated cell coordinates.
    pub latitude: f64,
    pub longitude: f64,
    /// Geohash of the cell, for map display.
    pub geohash: String,
    pub count: u64,
    pub product_ids: Vec<String>,
}

/// One sighting of a duplicate-sold product.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sighting {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Coordinates>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// A product rescanned as already sold more often than one legitimate sale
/// can explain.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateProduct {
    pub product_id: String,
    pub count: u64,
    pub sightings: Vec<Sighting>,
}

/// Composite per-product suspicion summary.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuspiciousProduct {
    pub product_id: String,
    pub total_scans: u64,
    pub not_found_scans: u64,
    pub already_sold_scans: u64,
    pub distinct_locations: u64,
    pub first_scan: DateTime<Utc>,
    pub last_scan: DateTime<Utc>,
}

/// Scan counts by result, the denominator panel for dashboards.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanStatistics {
    pub not_found: u64,
    pub authentic: u64,
    pub already_sold: u64,
}

impl ScanStatistics {
    pub fn total(&self) -> u64 {
        self.not_found + self.authentic + self.already_sold
    }
}

impl From<HashMap<ScanResult, u64>> for ScanStatistics {
    fn from(counts: HashMap<ScanResult, u64>) -> Self {
        Self {
            not_found: counts.get(&ScanResult::NotFound).copied().unwrap_or(0),
            authentic: counts.get(&ScanResult::Authentic).copied().unwrap_or(0),
            already_sold: counts.get(&ScanResult::AlreadySold).copied().unwrap_or(0),
        }
    }
}

/// Combined dashboard payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FraudAnalytics {
    pub suspicious_locations: Vec<SuspiciousLocation>,
    pub duplicate_products: Vec<DuplicateProduct>,
    pub statistics: ScanStatistics,
}

/// Group not-found events by grid cell and keep the hot cells.
pub fn suspicious_locations(
    events: &[ScanEvent],
    config: &DetectorConfig,
) -> Vec<SuspiciousLocation> {
    let mut groups: HashMap<GeoCell, (u64, BTreeSet<String>)> = HashMap::new();

    for event in events {
        if event.scan_result != ScanResult::NotFound {
            continue;
        }
        let Some(location) = &event.location else {
            continue;
        };
        let cell = GeoCell::containing(location, config.cell_precision);
        let entry = groups.entry(cell).or_default();
        entry.0 += 1;
        entry.1.insert(event.product_id.clone());
    }

    let mut reports: Vec<SuspiciousLocation> = groups
        .into_iter()
        .filter(|(_, (count, _))| *count >= config.suspicious_location_min)
        .map(|(cell, (count, product_ids))| SuspiciousLocation {
            latitude: cell.latitude(),
            longitude: cell.longitude(),
            geohash: cell.geohash(),
            count,
            product_ids: product_ids.into_iter().collect(),
        })
        .collect();

    reports.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.geohash.cmp(&b.geohash)));
    reports
}

/// Group already-sold events by product and keep the repeat offenders.
pub fn duplicate_products(
    events: &[ScanEvent],
    config: &DetectorConfig,
) -> Vec<DuplicateProduct> {
    let mut groups: HashMap<&str, Vec<&ScanEvent>> = HashMap::new();

    for event in events {
        if event.scan_result == ScanResult::AlreadySold {
            groups.entry(&event.product_id).or_default().push(event);
        }
    }

    let mut reports: Vec<DuplicateProduct> = groups
        .into_iter()
        .filter(|(_, hits)| hits.len() as u64 >= config.duplicate_sale_min)
        .map(|(product_id, hits)| DuplicateProduct {
            product_id: product_id.to_string(),
            count: hits.len() as u64,
            sightings: hits
                .iter()
                .map(|e| Sighting {
                    location: e.location,
                    address: e.human_address.clone(),
                    occurred_at: e.occurred_at,
                })
                .collect(),
        })
        .collect();

    reports.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.product_id.cmp(&b.product_id))
    });
    reports
}

/// Composite per-product suspicion over not-found and already-sold events.
pub fn suspicious_products(
    events: &[ScanEvent],
    config: &DetectorConfig,
) -> Vec<SuspiciousProduct> {
    struct Acc {
        not_found: u64,
        already_sold: u64,
        locations: HashSet<(u64, u64)>,
        first: DateTime<Utc>,
        last: DateTime<Utc>,
    }

    let mut groups: HashMap<&str, Acc> = HashMap::new();

    for event in events {
        if !matches!(
            event.scan_result,
            ScanResult::NotFound | ScanResult::AlreadySold
        ) {
            continue;
        }
        let acc = groups.entry(&event.product_id).or_insert_with(|| Acc {
            not_found: 0,
            already_sold: 0,
            locations: HashSet::new(),
            first: event.occurred_at,
            last: event.occurred_at,
        });
        match event.scan_result {
            ScanResult::NotFound => acc.not_found += 1,
            ScanResult::AlreadySold => acc.already_sold += 1,
            ScanResult::Authentic => {}
        }
        if let Some(location) = &event.location {
            acc.locations
                .insert((location.latitude.to_bits(), location.longitude.to_bits()));
        }
        acc.first = acc.first.min(event.occurred_at);
        acc.last = acc.last.max(event.occurred_at);
    }

    let mut reports: Vec<SuspiciousProduct> = groups
        .into_iter()
        .filter(|(_, acc)| {
            acc.already_sold >= config.duplicate_sale_min
                || acc.not_found >= config.suspicious_not_found_min
        })
        .map(|(product_id, acc)| SuspiciousProduct {
            product_id: product_id.to_string(),
            total_scans: acc.not_found + acc.already_sold,
            not_found_scans: acc.not_found,
            already_sold_scans: acc.already_sold,
            distinct_locations: acc.locations.len() as u64,
            first_scan: acc.first,
            last_scan: acc.last,
        })
        .collect();

    reports.sort_by(|a, b| {
        b.total_scans
            .cmp(&a.total_scans)
            .then_with(|| a.product_id.cmp(&b.product_id))
    });
    reports
}

/// Read-side aggregation engine bound to a scan store.
#[derive(Clone)]
pub struct FraudDetector {
    store: Arc<dyn ScanStore>,
    config: DetectorConfig,
}

impl FraudDetector {
    pub fn new(store: Arc<dyn ScanStore>, config: DetectorConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// The same detector with different thresholds, for per-query overrides.
    pub fn overridden(&self, config: DetectorConfig) -> Self {
        Self {
            store: self.store.clone(),
            config,
        }
    }

    pub async fn suspicious_locations(&self) -> Result<Vec<SuspiciousLocation>> {
        let events = self
            .store
            .events_with_result(&[ScanResult::NotFound])
            .await?;
        Ok(suspicious_locations(&events, &self.config))
    }

    pub async fn duplicate_products(&self) -> Result<Vec<DuplicateProduct>> {
        let events = self
            .store
            .events_with_result(&[ScanResult::AlreadySold])
            .await?;
        Ok(duplicate_products(&events, &self.config))
    }

    pub async fn suspicious_products(&self) -> Result<Vec<SuspiciousProduct>> {
        let events = self
            .store
            .events_with_result(&[ScanResult::NotFound, ScanResult::AlreadySold])
            .await?;
        Ok(suspicious_products(&events, &self.config))
    }

    pub async fn statistics(&self) -> Result<ScanStatistics> {
        Ok(self.store.result_counts().await?.into())
    }

    /// The combined dashboard payload.
    pub async fn analytics(&self) -> Result<FraudAnalytics> {
        Ok(FraudAnalytics {
            suspicious_locations: self.suspicious_locations().await?,
            duplicate_products: self.duplicate_products().await?,
            statistics: self.statistics().await?,
        })
    }

    /// Scan events within `radius_m` of `center`, nearest first.
    pub async fn scans_near(
        &self,
        center: Coordinates,
        radius_m: Option<f64>,
    ) -> Result<Vec<ScanEvent>> {
        let radius = radius_m.unwrap_or(self.config.nearby_default_radius_m);
        self.store
            .near(center, radius, self.config.nearby_limit)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn event(product_id: &str, result: ScanResult, location: Option<(f64, f64)>) -> ScanEvent {
        ScanEvent {
            id: Uuid::new_v4(),
            product_id: product_id.to_string(),
            scan_result: result,
            occurred_at: Utc::now(),
            location: location.map(|(lat, lon)| Coordinates::new(lat, lon).unwrap()),
            human_address: None,
            ledger_snapshot: None,
            device: None,
        }
    }

    #[test]
    fn test_suspicious_location_groups_jittered_scans() {
        let config = DetectorConfig::default();
        // Six not-found scans at the same storefront, five distinct products,
        // coordinates differing only past the 4th decimal place.
        let events: Vec<ScanEvent> = (0..6)
            .map(|i| {
                let jitter = (i as f64) * 0.00001;
                let pid = format!("P{}", i.min(4));
                event(&pid, ScanResult::NotFound, Some((10.12340 + jitter, 20.5678)))
            })
            .collect();

        let reports = suspicious_locations(&events, &config);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].count, 6);
        assert_eq!(reports[0].product_ids.len(), 5);
    }

    #[test]
    fn test_suspicious_location_below_threshold_dropped() {
        let config = DetectorConfig::default();
        let events: Vec<ScanEvent> = (0..4)
            .map(|_| event("P1", ScanResult::NotFound, Some((10.1234, 20.5678))))
            .collect();

        assert!(suspicious_locations(&events, &config).is_empty());
    }

    #[test]
    fn test_suspicious_location_ignores_unlocated_and_other_results() {
        let config = DetectorConfig::default();
        let mut events: Vec<ScanEvent> = (0..5)
            .map(|_| event("P1", ScanResult::NotFound, None))
            .collect();
        events.extend((0..5).map(|_| event("P1", ScanResult::Authentic, Some((1.0, 1.0)))));

        assert!(suspicious_locations(&events, &config).is_empty());
    }

    #[test]
    fn test_suspicious_location_separate_cells_sorted_by_count() {
        let config = DetectorConfig::default();
        let mut events: Vec<ScanEvent> = (0..5)
            .map(|_| event("A", ScanResult::NotFound, Some((10.0, 10.0))))
            .collect();
        events.extend((0..7).map(|_| event("B", ScanResult::NotFound, Some((50.0, 50.0)))));

        let reports = suspicious_locations(&events, &config);
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].count, 7);
        assert_eq!(reports[1].count, 5);
    }

    #[test]
    fn test_duplicate_products_threshold_boundary() {
        let config = DetectorConfig::default();

        let two: Vec<ScanEvent> = (0..2)
            .map(|_| event("P1", ScanResult::AlreadySold, None))
            .collect();
        assert!(duplicate_products(&two, &config).is_empty());

        let three: Vec<ScanEvent> = (0..3)
            .map(|_| event("P1", ScanResult::AlreadySold, None))
            .collect();
        let reports = duplicate_products(&three, &config);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].count, 3);
        assert_eq!(reports[0].sightings.len(), 3);
    }

    #[test]
    fn test_duplicate_products_sorted_by_count() {
        let config = DetectorConfig::default();
        let mut events: Vec<ScanEvent> = (0..3)
            .map(|_| event("LOW", ScanResult::AlreadySold, None))
            .collect();
        events.extend((0..5).map(|_| event("HIGH", ScanResult::AlreadySold, None)));

        let reports = duplicate_products(&events, &config);
        assert_eq!(reports[0].product_id, "HIGH");
        assert_eq!(reports[1].product_id, "LOW");
    }

    #[test]
    fn test_suspicious_products_flags_and_counts() {
        let config = DetectorConfig::default();
        let mut events: Vec<ScanEvent> = (0..3).map(|i| {
            event("CLONED", ScanResult::AlreadySold, Some((10.0 + i as f64, 10.0)))
        })
        .collect();
        events.extend((0..5).map(|_| event("FAKE", ScanResult::NotFound, Some((20.0, 20.0)))));
        // Below both thresholds: not flagged.
        events.extend((0..2).map(|_| event("OK", ScanResult::AlreadySold, None)));

        let reports = suspicious_products(&events, &config);
        assert_eq!(reports.len(), 2);

        let fake = reports.iter().find(|r| r.product_id == "FAKE").unwrap();
        assert_eq!(fake.not_found_scans, 5);
        assert_eq!(fake.distinct_locations, 1);

        let cloned = reports.iter().find(|r| r.product_id == "CLONED").unwrap();
        assert_eq!(cloned.already_sold_scans, 3);
        assert_eq!(cloned.distinct_locations, 3);
    }

    #[test]
    fn test_suspicious_products_timestamps_span() {
        let config = DetectorConfig::default();
        let now = Utc::now();
        let mut events: Vec<ScanEvent> = (0..3)
            .map(|i| {
                let mut e = event("P1", ScanResult::AlreadySold, None);
                e.occurred_at = now + Duration::minutes(i);
                e
            })
            .collect();
        events.rotate_left(1);

        let reports = suspicious_products(&events, &config);
        assert_eq!(reports[0].first_scan, now);
        assert_eq!(reports[0].last_scan, now + Duration::minutes(2));
    }

    #[test]
    fn test_statistics_from_counts() {
        let mut counts = HashMap::new();
        counts.insert(ScanResult::NotFound, 4);
        counts.insert(ScanResult::Authentic, 10);

        let stats = ScanStatistics::from(counts);
        assert_eq!(stats.not_found, 4);
        assert_eq!(stats.authentic, 10);
        assert_eq!(stats.already_sold, 0);
        assert_eq!(stats.total(), 14);
    }

    #[test]
    fn test_custom_thresholds() {
        let config = DetectorConfig {
            duplicate_sale_min: 2,
            ..Default::default()
        };
        let events: Vec<ScanEvent> = (0..2)
            .map(|_| event("P1", ScanResult::AlreadySold, None))
            .collect();

        assert_eq!(duplicate_products(&events, &config).len(), 1);
    }
}
