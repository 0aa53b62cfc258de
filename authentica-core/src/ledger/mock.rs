//! Mock ledger implementation for testing.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

use super::{ProductFact, SaleFact, TrustLedger};
use crate::error::{AuthenticaError, Result};

/// Deterministic in-memory ledger fixture.
///
/// Seeded through builder methods; address membership is case-insensitive,
/// matching the external ledger's treatment of addresses. Individual lookup
/// families can be made to fail, to exercise fail-closed paths.
#[derive(Debug, Default)]
pub struct MockLedger {
    products: HashMap<String, ProductFact>,
    sales: HashMap<String, SaleFact>,
    manufacturers: HashSet<String>,
    retailers: HashSet<String>,
    owner: String,
    fail_trust_lookups: bool,
    fail_sale_lookups: bool,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a product record.
    pub fn with_product(mut self, fact: ProductFact) -> Self {
        self.products.insert(fact.product_id.clone(), fact);
        self
    }

    /// Seed a sale record.
    pub fn with_sale(mut self, fact: SaleFact) -> Self {
        self.sales.insert(fact.product_id.clone(), fact);
        self
    }

    /// Add an address to the manufacturer allow-list.
    pub fn with_manufacturer(mut self, address: &str) -> Self {
        self.manufacturers.insert(address.to_ascii_lowercase());
        self
    }

    /// Add an address to the retailer allow-list.
    pub fn with_retailer(mut self, address: &str) -> Self {
        self.retailers.insert(address.to_ascii_lowercase());
        self
    }

    pub fn with_owner(mut self, address: &str) -> Self {
        self.owner = address.to_string();
        self
    }

    /// Make authorization lookups fail with a ledger error.
    pub fn failing_trust_lookups(mut self) -> Self {
        self.fail_trust_lookups = true;
        self
    }

    /// Make sale lookups fail with a ledger error.
    pub fn failing_sale_lookups(mut self) -> Self {
        self.fail_sale_lookups = true;
        self
    }
}

#[async_trait]
impl TrustLedger for MockLedger {
    async fn product(&self, product_id: &str) -> Result<ProductFact> {
        Ok(self
            .products
            .get(product_id)
            .cloned()
            .unwrap_or_else(|| ProductFact::missing(product_id)))
    }

    async fn sale(&self, product_id: &str) -> Result<SaleFact> {
        if self.fail_sale_lookups {
            return Err(AuthenticaError::Ledger("mock sale lookup failure".into()));
        }
        Ok(self
            .sales
            .get(product_id)
            .cloned()
            .unwrap_or_else(|| SaleFact::absent(product_id)))
    }

    async fn is_authorized_manufacturer(&self, address: &str) -> Result<bool> {
        if self.fail_trust_lookups {
            return Err(AuthenticaError::Ledger("mock trust lookup failure".into()));
        }
        Ok(self.manufacturers.contains(&address.to_ascii_lowercase()))
    }

    async fn is_authorized_retailer(&self, address: &str) -> Result<bool> {
        if self.fail_trust_lookups {
            return Err(AuthenticaError::Ledger("mock trust lookup failure".into()));
        }
        Ok(self.retailers.contains(&address.to_ascii_lowercase()))
    }

    async fn owner(&self) -> Result<String> {
        Ok(self.owner.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::ProductStatus;

    fn product(id: &str, manufacturer: &str) -> ProductFact {
        ProductFact {
            product_id: id.to_string(),
            exists: true,
            manufacturer: manufacturer.to_string(),
            manufacture_date: None,
            batch_number: "B-1".to_string(),
            category: "widget".to_string(),
            status: ProductStatus::Available,
            content_fingerprint: None,
        }
    }

    #[tokio::test]
    async fn test_unknown_product_is_missing() {
        let ledger = MockLedger::new();
        let fact = ledger.product("nope").await.unwrap();
        assert!(!fact.exists);
        assert_eq!(fact.product_id, "nope");
    }

    #[tokio::test]
    async fn test_seeded_product_returned() {
        let ledger = MockLedger::new().with_product(product("P1", "0xAb"));
        let fact = ledger.product("P1").await.unwrap();
        assert!(fact.exists);
        assert_eq!(fact.manufacturer, "0xAb");
    }

    #[tokio::test]
    async fn test_membership_is_case_insensitive() {
        let ledger = MockLedger::new().with_manufacturer("0xABCDEF");
        assert!(ledger.is_authorized_manufacturer("0xabcdef").await.unwrap());
        assert!(ledger.is_authorized_manufacturer("0xAbCdEf").await.unwrap());
        assert!(!ledger.is_authorized_manufacturer("0x123456").await.unwrap());
    }

    #[tokio::test]
    async fn test_failing_lookups() {
        let ledger = MockLedger::new().failing_trust_lookups();
        assert!(ledger.is_authorized_manufacturer("0xab").await.is_err());
        assert!(ledger.is_authorized_retailer("0xab").await.is_err());
    }

    #[tokio::test]
    async fn test_missing_sale_is_absent() {
        let ledger = MockLedger::new();
        let sale = ledger.sale("P1").await.unwrap();
        assert!(!sale.was_sold);
    }

    #[tokio::test]
    async fn test_owner_roundtrip() {
        let ledger = MockLedger::new().with_owner("0xFEED");
        assert_eq!(ledger.owner().await.unwrap(), "0xFEED");
    }
}
