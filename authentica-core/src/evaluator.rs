//! Trust verification evaluator.
//!
//! Composes read-only ledger answers into a [`Verdict`]: a conjunctive
//! pass/fail judgment plus the human-readable reasons behind it. Every
//! non-terminal finding is accumulated rather than raised; only a product
//! the ledger does not know short-circuits the lookup sequence. Lookups
//! that fail are treated as failed checks, never as implicit passes.

use std::sync::Arc;

use serde::Serialize;
use tracing::instrument;

use crate::error::Result;
use crate::fingerprint::{details_fingerprint, fingerprints_match};
use crate::ledger::{ProductStatus, TrustLedger};

/// Coarse bucket derived from raw ledger state only, independent of trust.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    Authentic,
    NotFound,
    AlreadySold,
}

/// Assessment of the recorded sale, present when the product is marked sold.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleAssessment {
    pub was_sold: bool,
    pub retailer: String,
    pub retailer_trusted: bool,
    pub sale_date: Option<chrono::DateTime<chrono::Utc>>,
    pub location: String,
}

/// The evaluator's complete judgment for one verification attempt.
///
/// Invariants: `reasons` is non-empty whenever `verdict_ok` is false, and
/// `classification` is `NotFound` exactly when `exists` is false.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub product_id: String,
    pub exists: bool,
    pub status: ProductStatus,
    pub manufacturer: String,
    pub batch_number: String,
    pub is_trusted_manufacturer: bool,
    pub details_provided: bool,
    /// `None` when no details were supplied or nothing was registered to
    /// compare against; absence of evidence is not a failed check.
    pub details_match: Option<bool>,
    pub sale: Option<SaleAssessment>,
    pub classification: Classification,
    pub verdict_ok: bool,
    pub reasons: Vec<String>,
}

/// Evaluates product identifiers against the trust ledger.
///
/// Holds an injected read-only ledger client; evaluation is deterministic
/// given the same ledger answers and has no side effects.
pub struct Evaluator {
    ledger: Arc<dyn TrustLedger>,
}

impl Evaluator {
    pub fn new(ledger: Arc<dyn TrustLedger>) -> Self {
        Self { ledger }
    }

    /// Evaluate one product identifier, with optional details for the
    /// fingerprint integrity check.
    ///
    /// Returns an error only when the initial product read fails; every
    /// later lookup failure is folded into the verdict's reasons with the
    /// corresponding trust treated as false.
    #[instrument(level = "debug", skip(self, details))]
    pub async fn evaluate(&self, product_id: &str, details: Option<&str>) -> Result<Verdict> {
        let product = self.ledger.product(product_id).await?;

        let details = details.unwrap_or("");
        let details_provided = !details.trim().is_empty();

        let mut reasons: Vec<String> = Vec::new();

        if !product.exists {
            return Ok(Verdict {
                product_id: product_id.to_string(),
                exists: false,
                status: product.status,
                manufacturer: product.manufacturer,
                batch_number: product.batch_number,
                is_trusted_manufacturer: false,
                details_provided,
                details_match: None,
                sale: None,
                classification: Classification::NotFound,
                verdict_ok: false,
                reasons: vec!["Product not found on-chain".to_string()],
            });
        }

        // Manufacturer trust. Addresses are case-insensitive identifiers;
        // a failed lookup counts as untrusted.
        let is_trusted_manufacturer = match self
            .ledger
            .is_authorized_manufacturer(&product.manufacturer.to_ascii_lowercase())
            .await
        {
            Ok(trusted) => trusted,
            Err(err) => {
                tracing::warn!(error = %err, "Manufacturer authorization lookup failed");
                reasons.push("Failed to check manufacturer authorization".to_string());
                false
            }
        };
        if !is_trusted_manufacturer {
            reasons.push("Manufacturer not in trusted list".to_string());
        }

        // Integrity via content fingerprint. `details_match` stays `None`
        // when there is nothing to compare; an unverifiable claim still
        // cannot pass the check.
        let mut details_match = None;
        if details_provided {
            match product.content_fingerprint.as_deref() {
                Some(onchain) => {
                    let local = details_fingerprint(details);
                    let matched = fingerprints_match(&local, onchain);
                    details_match = Some(matched);
                    if !matched {
                        reasons.push("Details do not match on-chain fingerprint".to_string());
                    }
                }
                None => {
                    reasons.push(
                        "No on-chain fingerprint to verify details against".to_string(),
                    );
                }
            }
        } else {
            reasons.push("No details provided to verify fingerprint".to_string());
        }

        // Sale checks when the ledger says the product was sold.
        let mut sale_assessment = None;
        if product.status == ProductStatus::Sold {
            match self.ledger.sale(product_id).await {
                Ok(sale) => {
                    let mut retailer_trusted = false;
                    if sale.was_sold {
                        match self
                            .ledger
                            .is_authorized_retailer(&sale.retailer.to_ascii_lowercase())
                            .await
                        {
                            Ok(trusted) => {
                                retailer_trusted = trusted;
                                if !trusted {
                                    reasons.push("Sale retailer not authorized".to_string());
                                }
                            }
                            Err(err) => {
                                tracing::warn!(error = %err, "Retailer authorization lookup failed");
                                reasons
                                    .push("Failed to check retailer authorization".to_string());
                            }
                        }
                    } else {
                        reasons.push("Marked sold but no sale record found".to_string());
                    }
                    sale_assessment = Some(SaleAssessment {
                        was_sold: sale.was_sold,
                        retailer: sale.retailer,
                        retailer_trusted,
                        sale_date: sale.sale_date,
                        location: sale.location,
                    });
                }
                Err(err) => {
                    tracing::warn!(error = %err, "Sale record lookup failed");
                    reasons.push("Failed to fetch sale info".to_string());
                }
            }
        }

        // Classification reflects raw ledger state; trust failures never
        // move a product between buckets.
        let classification = match product.status {
            ProductStatus::Sold => Classification::AlreadySold,
            ProductStatus::Available => Classification::Authentic,
        };

        let sale_ok = matches!(
            sale_assessment,
            Some(SaleAssessment {
                was_sold: true,
                retailer_trusted: true,
                ..
            })
        );
        let verdict_ok = is_trusted_manufacturer
            && (!details_provided || details_match == Some(true))
            && (product.status == ProductStatus::Available || sale_ok);

        Ok(Verdict {
            product_id: product_id.to_string(),
            exists: true,
            status: product.status,
            manufacturer: product.manufacturer,
            batch_number: product.batch_number,
            is_trusted_manufacturer,
            details_provided,
            details_match,
            sale: sale_assessment,
            classification,
            verdict_ok,
            reasons,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::details_fingerprint;
    use crate::ledger::{MockLedger, ProductFact, SaleFact};

    const MAKER: &str = "0xA11CE00000000000000000000000000000000001";
    const SELLER: &str = "0xB0B0000000000000000000000000000000000002";

    fn product(id: &str, status: ProductStatus) -> ProductFact {
        ProductFact {
            product_id: id.to_string(),
            exists: true,
            manufacturer: MAKER.to_string(),
            manufacture_date: None,
            batch_number: "BATCH-7".to_string(),
            category: "electronics".to_string(),
            status,
            content_fingerprint: None,
        }
    }

    fn sale(id: &str, retailer: &str) -> SaleFact {
        SaleFact {
            product_id: id.to_string(),
            retailer: retailer.to_string(),
            sale_date: None,
            location: "Store 5".to_string(),
            was_sold: true,
        }
    }

    fn evaluator(ledger: MockLedger) -> Evaluator {
        Evaluator::new(Arc::new(ledger))
    }

    #[tokio::test]
    async fn test_not_found_short_circuits() {
        let eval = evaluator(MockLedger::new().failing_trust_lookups());

        // Trust lookups would fail, but they must never be reached.
        let verdict = eval.evaluate("GHOST", None).await.unwrap();
        assert_eq!(verdict.classification, Classification::NotFound);
        assert!(!verdict.verdict_ok);
        assert_eq!(verdict.reasons, vec!["Product not found on-chain"]);
        assert!(verdict.sale.is_none());
    }

    #[tokio::test]
    async fn test_available_trusted_no_details() {
        let eval = evaluator(
            MockLedger::new()
                .with_product(product("P1", ProductStatus::Available))
                .with_manufacturer(MAKER),
        );

        let verdict = eval.evaluate("P1", None).await.unwrap();
        assert_eq!(verdict.classification, Classification::Authentic);
        assert!(verdict.verdict_ok);
        assert_eq!(verdict.details_match, None);
        assert_eq!(
            verdict.reasons,
            vec!["No details provided to verify fingerprint"]
        );
    }

    #[tokio::test]
    async fn test_untrusted_manufacturer_accumulates() {
        let eval = evaluator(
            MockLedger::new().with_product(product("P1", ProductStatus::Available)),
        );

        let verdict = eval.evaluate("P1", None).await.unwrap();
        assert!(!verdict.verdict_ok);
        assert!(verdict
            .reasons
            .contains(&"Manufacturer not in trusted list".to_string()));
        // Diagnostics keep accumulating past the trust failure.
        assert!(verdict
            .reasons
            .contains(&"No details provided to verify fingerprint".to_string()));
    }

    #[tokio::test]
    async fn test_manufacturer_case_insensitive() {
        let mut fact = product("P1", ProductStatus::Available);
        fact.manufacturer = MAKER.to_uppercase();
        let eval = evaluator(
            MockLedger::new()
                .with_product(fact)
                .with_manufacturer(&MAKER.to_lowercase()),
        );

        let verdict = eval.evaluate("P1", None).await.unwrap();
        assert!(verdict.is_trusted_manufacturer);
    }

    #[tokio::test]
    async fn test_details_match() {
        let details = "SKU-1 | Widget | 2025";
        let mut fact = product("P1", ProductStatus::Available);
        fact.content_fingerprint = Some(details_fingerprint(details).to_uppercase());
        let eval = evaluator(
            MockLedger::new().with_product(fact).with_manufacturer(MAKER),
        );

        let verdict = eval.evaluate("P1", Some(details)).await.unwrap();
        assert_eq!(verdict.details_match, Some(true));
        assert!(verdict.verdict_ok);
        assert!(verdict.reasons.is_empty());
    }

    #[tokio::test]
    async fn test_details_mismatch() {
        let mut fact = product("P1", ProductStatus::Available);
        fact.content_fingerprint = Some(details_fingerprint("registered details"));
        let eval = evaluator(
            MockLedger::new().with_product(fact).with_manufacturer(MAKER),
        );

        let verdict = eval.evaluate("P1", Some("tampered details")).await.unwrap();
        assert_eq!(verdict.details_match, Some(false));
        assert!(!verdict.verdict_ok);
        assert!(verdict
            .reasons
            .contains(&"Details do not match on-chain fingerprint".to_string()));
    }

    #[tokio::test]
    async fn test_details_without_registered_fingerprint() {
        let eval = evaluator(
            MockLedger::new()
                .with_product(product("P1", ProductStatus::Available))
                .with_manufacturer(MAKER),
        );

        // Nothing registered to compare against: not a failed check, but
        // the claim is unverifiable, so the verdict cannot pass.
        let verdict = eval.evaluate("P1", Some("anything")).await.unwrap();
        assert_eq!(verdict.details_match, None);
        assert!(!verdict.verdict_ok);
        assert!(verdict
            .reasons
            .contains(&"No on-chain fingerprint to verify details against".to_string()));
        assert!(!verdict.reasons.is_empty());
    }

    #[tokio::test]
    async fn test_sold_with_trusted_retailer() {
        let eval = evaluator(
            MockLedger::new()
                .with_product(product("P3", ProductStatus::Sold))
                .with_sale(sale("P3", SELLER))
                .with_manufacturer(MAKER)
                .with_retailer(SELLER),
        );

        let verdict = eval.evaluate("P3", None).await.unwrap();
        assert_eq!(verdict.classification, Classification::AlreadySold);
        assert!(verdict.verdict_ok);
        let sale = verdict.sale.unwrap();
        assert!(sale.was_sold);
        assert!(sale.retailer_trusted);
    }

    #[tokio::test]
    async fn test_sold_with_untrusted_retailer() {
        let eval = evaluator(
            MockLedger::new()
                .with_product(product("P3", ProductStatus::Sold))
                .with_sale(sale("P3", SELLER))
                .with_manufacturer(MAKER),
        );

        let verdict = eval.evaluate("P3", None).await.unwrap();
        // Classification stays AlreadySold; trust never moves the bucket.
        assert_eq!(verdict.classification, Classification::AlreadySold);
        assert!(!verdict.verdict_ok);
        assert!(verdict
            .reasons
            .contains(&"Sale retailer not authorized".to_string()));
    }

    #[tokio::test]
    async fn test_sold_without_sale_record() {
        let eval = evaluator(
            MockLedger::new()
                .with_product(product("P4", ProductStatus::Sold))
                .with_manufacturer(MAKER),
        );

        let verdict = eval.evaluate("P4", None).await.unwrap();
        assert_eq!(verdict.classification, Classification::AlreadySold);
        assert!(!verdict.verdict_ok);
        assert!(verdict
            .reasons
            .contains(&"Marked sold but no sale record found".to_string()));
        assert!(!verdict.sale.unwrap().retailer_trusted);
    }

    #[tokio::test]
    async fn test_failed_sale_lookup_fails_closed() {
        let eval = evaluator(
            MockLedger::new()
                .with_product(product("P5", ProductStatus::Sold))
                .with_manufacturer(MAKER)
                .failing_sale_lookups(),
        );

        let verdict = eval.evaluate("P5", None).await.unwrap();
        assert!(!verdict.verdict_ok);
        assert!(verdict
            .reasons
            .contains(&"Failed to fetch sale info".to_string()));
    }

    #[tokio::test]
    async fn test_failed_trust_lookup_fails_closed() {
        let eval = evaluator(
            MockLedger::new()
                .with_product(product("P6", ProductStatus::Available))
                .failing_trust_lookups(),
        );

        let verdict = eval.evaluate("P6", None).await.unwrap();
        assert!(!verdict.is_trusted_manufacturer);
        assert!(!verdict.verdict_ok);
        assert!(verdict
            .reasons
            .contains(&"Failed to check manufacturer authorization".to_string()));
        assert!(verdict
            .reasons
            .contains(&"Manufacturer not in trusted list".to_string()));
    }

    #[tokio::test]
    async fn test_reasons_nonempty_when_not_ok() {
        let eval = evaluator(
            MockLedger::new().with_product(product("P7", ProductStatus::Available)),
        );

        let verdict = eval.evaluate("P7", None).await.unwrap();
        assert!(!verdict.verdict_ok);
        assert!(!verdict.reasons.is_empty());
    }
}
