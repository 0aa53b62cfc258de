//! Read-only access to the product trust ledger.
//!
//! The ledger is the external source of truth for product, sale, and
//! trust-set facts. This module never writes to it: every call is an
//! idempotent read, and authorization membership is a point-in-time answer,
//! not a cached permanent fact.
//!
//! ## Implementations
//!
//! - [`HttpLedger`] - JSON client for a ledger read gateway
//! - [`MockLedger`] - deterministic in-memory fixture for testing

mod http;
mod mock;

pub use http::{HttpLedger, LedgerHttpConfig};
pub use mock::MockLedger;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Lifecycle status of a product on the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductStatus {
    Available,
    Sold,
}

/// Product record as reported by the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFact {
    pub product_id: String,
    /// False when the identifier is unknown to the ledger; the remaining
    /// fields carry no information in that case.
    pub exists: bool,
    pub manufacturer: String,
    pub manufacture_date: Option<DateTime<Utc>>,
    pub batch_number: String,
    pub category: String,
    pub status: ProductStatus,
    /// Keccak-256 fingerprint of the registered details string, if any.
    pub content_fingerprint: Option<String>,
}

impl ProductFact {
    /// The record returned for an identifier the ledger does not know.
    pub fn missing(product_id: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            exists: false,
            manufacturer: String::new(),
            manufacture_date: None,
            batch_number: String::new(),
            category: String::new(),
            status: ProductStatus::Available,
            content_fingerprint: None,
        }
    }
}

/// Sale record as reported by the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleFact {
    pub product_id: String,
    pub retailer: String,
    pub sale_date: Option<DateTime<Utc>>,
    pub location: String,
    /// False when no sale was ever recorded for the product.
    pub was_sold: bool,
}

impl SaleFact {
    /// The record returned when no sale exists for the product.
    pub fn absent(product_id: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            retailer: String::new(),
            sale_date: None,
            location: String::new(),
            was_sold: false,
        }
    }
}

/// Read-only client over the external trust ledger.
///
/// Implementations must be thread-safe (`Send + Sync`) and must surface
/// failures as errors rather than fabricating answers: a lookup the caller
/// cannot complete is never an implicit "authorized".
#[async_trait]
pub trait TrustLedger: Send + Sync {
    /// Fetch the product record for `product_id`.
    async fn product(&self, product_id: &str) -> Result<ProductFact>;

    /// Fetch the sale record for `product_id`.
    async fn sale(&self, product_id: &str) -> Result<SaleFact>;

    /// Whether `address` is on the manufacturer allow-list.
    async fn is_authorized_manufacturer(&self, address: &str) -> Result<bool>;

    /// Whether `address` is on the retailer allow-list.
    async fn is_authorized_retailer(&self, address: &str) -> Result<bool>;

    /// The registry owner address.
    async fn owner(&self) -> Result<String>;
}
