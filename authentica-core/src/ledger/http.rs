//! HTTP ledger client with retry, backoff, and per-request timeouts.
//!
//! Talks to a read-only ledger gateway exposing product, sale, and trust-set
//! lookups as JSON endpoints:
//!
//! - `GET {base}/products/{id}`
//! - `GET {base}/products/{id}/sale`
//! - `GET {base}/manufacturers/{address}`
//! - `GET {base}/retailers/{address}`
//! - `GET {base}/owner`

use async_trait::async_trait;
use backoff::{future::retry_notify, ExponentialBackoff};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

use super::{ProductFact, SaleFact, TrustLedger};
use crate::error::{AuthenticaError, Result};

/// Configuration for the HTTP ledger client.
#[derive(Debug, Clone)]
pub struct LedgerHttpConfig {
    /// Gateway base URL, without trailing slash.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Maximum retry attempts for transient errors.
    pub max_retries: u32,
    /// Initial retry interval.
    pub initial_interval: Duration,
    /// Maximum retry interval.
    pub max_interval: Duration,
}

impl LedgerHttpConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(10),
            max_retries: 3,
            initial_interval: Duration::from_millis(100),
            max_interval: Duration::from_secs(2),
        }
    }
}

/// JSON client for the ledger read gateway.
pub struct HttpLedger {
    client: Client,
    config: LedgerHttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
struct AuthorizationResponse {
    authorized: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct OwnerResponse {
    owner: String,
}

impl HttpLedger {
    /// Create a new ledger client.
    pub fn new(config: LedgerHttpConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AuthenticaError::Ledger(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// GET `path` and parse the JSON body, retrying transient failures.
    ///
    /// `on_not_found` supplies the value for a 404 response; endpoints where
    /// 404 is meaningful (unknown product, no sale record) map it to their
    /// "missing" fact instead of an error.
    async fn get_json<R>(&self, path: &str, on_not_found: Option<R>) -> Result<R>
    where
        R: DeserializeOwned + Clone + Send + Sync,
    {
        let url = format!("{}{}", self.config.base_url, path);
        let backoff = ExponentialBackoff {
            initial_interval: self.config.initial_interval,
            max_interval: self.config.max_interval,
            max_elapsed_time: Some(self.config.timeout * self.config.max_retries),
            ..Default::default()
        };

        retry_notify(
            backoff,
            || {
                let url = url.clone();
                let on_not_found = on_not_found.clone();
                async move { self.get_json_once(&url, on_not_found).await }
            },
            |err: AuthenticaError, duration: Duration| {
                warn!(
                    error = %err,
                    retry_after_ms = duration.as_millis() as u64,
                    "Ledger retry scheduled"
                );
            },
        )
        .await
    }

    async fn get_json_once<R>(
        &self,
        url: &str,
        on_not_found: Option<R>,
    ) -> std::result::Result<R, backoff::Error<AuthenticaError>>
    where
        R: DeserializeOwned,
    {
        let start = Instant::now();

        let response = self.client.get(url).send().await.map_err(|e| {
            let latency_ms = start.elapsed().as_millis() as u64;
            if e.is_timeout() {
                warn!(error = %e, latency_ms, "Ledger read timed out");
                backoff::Error::permanent(AuthenticaError::LedgerTimeout(format!(
                    "Ledger read timed out: {e}"
                )))
            } else if is_transient_error(&e) {
                warn!(error = %e, latency_ms, "Transient ledger error, will retry");
                backoff::Error::transient(AuthenticaError::Ledger(format!(
                    "Transient error (will retry): {e}"
                )))
            } else {
                warn!(error = %e, latency_ms, "Permanent ledger error, aborting");
                backoff::Error::permanent(AuthenticaError::Ledger(format!(
                    "Ledger request failed: {e}"
                )))
            }
        })?;

        let status = response.status();
        debug!(status = %status, "Received ledger response");

        if status == StatusCode::NOT_FOUND {
            if let Some(value) = on_not_found {
                return Ok(value);
            }
        }

        if !status.is_success() {
            let err = AuthenticaError::Ledger(format!("Ledger gateway returned status: {status}"));
            return if is_transient_status(status) {
                Err(backoff::Error::transient(err))
            } else {
                Err(backoff::Error::permanent(err))
            };
        }

        let parsed: R = response.json().await.map_err(|e| {
            warn!(error = %e, "Failed to parse ledger response");
            backoff::Error::permanent(AuthenticaError::Ledger(format!(
                "Failed to parse ledger response: {e}"
            )))
        })?;

        let latency_ms = start.elapsed().as_millis() as u64;
        debug!(latency_ms, "Ledger read completed");

        Ok(parsed)
    }
}

#[async_trait]
impl TrustLedger for HttpLedger {
    #[instrument(level = "debug", skip(self))]
    async fn product(&self, product_id: &str) -> Result<ProductFact> {
        self.get_json(
            &format!("/products/{product_id}"),
            Some(ProductFact::missing(product_id)),
        )
        .await
    }

    #[instrument(level = "debug", skip(self))]
    async fn sale(&self, product_id: &str) -> Result<SaleFact> {
        self.get_json(
            &format!("/products/{product_id}/sale"),
            Some(SaleFact::absent(product_id)),
        )
        .await
    }

    #[instrument(level = "debug", skip(self))]
    async fn is_authorized_manufacturer(&self, address: &str) -> Result<bool> {
        let response: AuthorizationResponse = self
            .get_json(
                &format!("/manufacturers/{address}"),
                Some(AuthorizationResponse { authorized: false }),
            )
            .await?;
        Ok(response.authorized)
    }

    #[instrument(level = "debug", skip(self))]
    async fn is_authorized_retailer(&self, address: &str) -> Result<bool> {
        let response: AuthorizationResponse = self
            .get_json(
                &format!("/retailers/{address}"),
                Some(AuthorizationResponse { authorized: false }),
            )
            .await?;
        Ok(response.authorized)
    }

    #[instrument(level = "debug", skip(self))]
    async fn owner(&self) -> Result<String> {
        let response: OwnerResponse = self.get_json("/owner", None).await?;
        Ok(response.owner)
    }
}

/// Check if a reqwest error is transient and should be retried.
fn is_transient_error(error: &reqwest::Error) -> bool {
    error.is_connect() || error.is_request()
}

/// Check if an HTTP status code indicates a transient error.
fn is_transient_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
            | StatusCode::BAD_GATEWAY
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_status_codes() {
        assert!(is_transient_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_transient_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(is_transient_status(StatusCode::GATEWAY_TIMEOUT));
        assert!(is_transient_status(StatusCode::BAD_GATEWAY));
        assert!(!is_transient_status(StatusCode::NOT_FOUND));
        assert!(!is_transient_status(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[test]
    fn test_config_defaults() {
        let config = LedgerHttpConfig::new("http://localhost:8545");
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.max_retries, 3);
    }
}
