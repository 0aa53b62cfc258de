//! Postgres-backed scan store.
//!
//! Persists scan events in the append-only `scan_events` table and serves
//! the detector's categorical and geospatial reads. Radius
//! queries prefilter on an indexed bounding box before ordering by exact
//! haversine distance, so they never walk the whole log.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use authentica_core::geo::{Coordinates, EARTH_RADIUS_M, METERS_PER_DEGREE_LAT};
use authentica_core::{
    AuthenticaError, DeviceInfo, LedgerSnapshot, Result, ScanEvent, ScanFilter, ScanResult,
    ScanStore,
};

/// Postgres [`ScanStore`] implementation.
#[derive(Clone)]
pub struct PgScanStore {
    pool: PgPool,
}

/// Row type for database queries.
#[derive(FromRow)]
struct ScanRow {
    id: Uuid,
    product_id: String,
    scan_result: String,
    occurred_at: DateTime<Utc>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    human_address: Option<String>,
    manufacturer_snapshot: Option<String>,
    batch_number_snapshot: Option<String>,
    status_snapshot: Option<String>,
    user_agent: Option<String>,
    platform: Option<String>,
}

impl ScanRow {
    fn into_event(self) -> Result<ScanEvent> {
        let scan_result: ScanResult = self.scan_result.parse()?;

        let location = match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)?),
            _ => None,
        };

        let ledger_snapshot = if self.manufacturer_snapshot.is_some()
            || self.batch_number_snapshot.is_some()
            || self.status_snapshot.is_some()
        {
            Some(LedgerSnapshot {
                manufacturer: self.manufacturer_snapshot,
                batch_number: self.batch_number_snapshot,
                status: self.status_snapshot,
            })
        } else {
            None
        };

        let device = if self.user_agent.is_some() || self.platform.is_some() {
            Some(DeviceInfo {
                user_agent: self.user_agent,
                platform: self.platform,
            })
        } else {
            None
        };

        Ok(ScanEvent {
            id: self.id,
            product_id: self.product_id,
            scan_result,
            occurred_at: self.occurred_at,
            location,
            human_address: self.human_address,
            ledger_snapshot,
            device,
        })
    }
}

const SCAN_COLUMNS: &str = "id, product_id, scan_result, occurred_at, latitude, longitude, \
     human_address, manufacturer_snapshot, batch_number_snapshot, status_snapshot, \
     user_agent, platform";

impl PgScanStore {
    /// Connect to the database and run migrations.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .connect(database_url)
            .await
            .map_err(|e| AuthenticaError::Store(format!("connection failed: {e}")))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| AuthenticaError::Store(format!("migration failed: {e}")))?;

        tracing::info!("Scan store connected and migrations applied");

        Ok(Self { pool })
    }

    /// Create a store from an existing pool (for testing).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    fn store_err(e: sqlx::Error) -> AuthenticaError {
        AuthenticaError::Store(e.to_string())
    }
}

#[async_trait]
impl ScanStore for PgScanStore {
    async fn append(&self, event: ScanEvent) -> Result<()> {
        let (manufacturer, batch_number, status) = match &event.ledger_snapshot {
            Some(s) => (
                s.manufacturer.clone(),
                s.batch_number.clone(),
                s.status.clone(),
            ),
            None => (None, None, None),
        };
        let (user_agent, platform) = match &event.device {
            Some(d) => (d.user_agent.clone(), d.platform.clone()),
            None => (None, None),
        };

        sqlx::query(
            r#"
            INSERT INTO scan_events (
                id, product_id, scan_result, occurred_at, latitude, longitude,
                human_address, manufacturer_snapshot, batch_number_snapshot,
                status_snapshot, user_agent, platform
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(event.id)
        .bind(&event.product_id)
        .bind(event.scan_result.as_str())
        .bind(event.occurred_at)
        .bind(event.location.map(|l| l.latitude))
        .bind(event.location.map(|l| l.longitude))
        .bind(&event.human_address)
        .bind(manufacturer)
        .bind(batch_number)
        .bind(status)
        .bind(user_agent)
        .bind(platform)
        .execute(&self.pool)
        .await
        .map_err(Self::store_err)?;

        Ok(())
    }

    async fn events_with_result(&self, results: &[ScanResult]) -> Result<Vec<ScanEvent>> {
        let names: Vec<String> = results.iter().map(|r| r.as_str().to_string()).collect();

        let rows: Vec<ScanRow> = sqlx::query_as(&format!(
            "SELECT {SCAN_COLUMNS} FROM scan_events WHERE scan_result = ANY($1)"
        ))
        .bind(&names)
        .fetch_all(&self.pool)
        .await
        .map_err(Self::store_err)?;

        rows.into_iter().map(ScanRow::into_event).collect()
    }

    async fn recent(&self, filter: &ScanFilter) -> Result<Vec<ScanEvent>> {
        let rows: Vec<ScanRow> = sqlx::query_as(&format!(
            r#"
            SELECT {SCAN_COLUMNS} FROM scan_events
            WHERE ($1::text IS NULL OR product_id = $1)
              AND ($2::text IS NULL OR scan_result = $2)
              AND ($3::timestamptz IS NULL OR occurred_at >= $3)
              AND ($4::timestamptz IS NULL OR occurred_at <= $4)
            ORDER BY occurred_at DESC
            LIMIT $5
            "#
        ))
        .bind(&filter.product_id)
        .bind(filter.scan_result.map(|r| r.as_str()))
        .bind(filter.since)
        .bind(filter.until)
        .bind(filter.effective_limit() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(Self::store_err)?;

        rows.into_iter().map(ScanRow::into_event).collect()
    }

    async fn near(
        &self,
        center: Coordinates,
        radius_m: f64,
        limit: usize,
    ) -> Result<Vec<ScanEvent>> {
        // Bounding box for the index prefilter; the longitude window widens
        // with latitude and is clamped near the poles.
        let lat_halfwidth = radius_m / METERS_PER_DEGREE_LAT;
        let lon_scale = center.latitude.to_radians().cos().max(0.01);
        let lon_halfwidth = radius_m / (METERS_PER_DEGREE_LAT * lon_scale);

        let rows: Vec<ScanRow> = sqlx::query_as(&format!(
            r#"
            SELECT {SCAN_COLUMNS} FROM (
                SELECT *,
                    2 * {EARTH_RADIUS_M} * asin(sqrt(
                        power(sin(radians(latitude - $1) / 2), 2)
                        + cos(radians($1)) * cos(radians(latitude))
                          * power(sin(radians(longitude - $2) / 2), 2)
                    )) AS distance_m
                FROM scan_events
                WHERE latitude IS NOT NULL
                  AND latitude BETWEEN $3 AND $4
                  AND longitude BETWEEN $5 AND $6
            ) candidates
            WHERE distance_m <= $7
            ORDER BY distance_m ASC
            LIMIT $8
            "#
        ))
        .bind(center.latitude)
        .bind(center.longitude)
        .bind(center.latitude - lat_halfwidth)
        .bind(center.latitude + lat_halfwidth)
        .bind(center.longitude - lon_halfwidth)
        .bind(center.longitude + lon_halfwidth)
        .bind(radius_m)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(Self::store_err)?;

        rows.into_iter().map(ScanRow::into_event).collect()
    }

    async fn result_counts(&self) -> Result<HashMap<ScanResult, u64>> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT scan_result, COUNT(*) FROM scan_events GROUP BY scan_result")
                .fetch_all(&self.pool)
                .await
                .map_err(Self::store_err)?;

        let mut counts = HashMap::new();
        for (name, count) in rows {
            let result: ScanResult = name.parse()?;
            counts.insert(result, count.max(0) as u64);
        }
        Ok(counts)
    }
}
