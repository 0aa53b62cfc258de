//! Server configuration module
//!
//! Handles loading configuration from environment variables with sensible defaults.

use std::net::SocketAddr;
use std::time::Duration;

use authentica_core::{DetectorConfig, LedgerHttpConfig};

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port (default: 3000)
    pub port: u16,
    /// Server host (default: 127.0.0.1)
    pub host: [u8; 4],
    /// Allowed CORS origins, comma-separated (default: allow all in dev)
    pub allowed_origins: Option<Vec<String>>,
    /// Request body limit in MB (default: 2)
    pub body_limit_mb: usize,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
    /// Enable rate limiting (default: false for tests, true when loaded from env)
    pub rate_limit_enabled: bool,
    /// Rate limit: requests per second (default: 10)
    pub rate_limit_per_sec: u64,
    /// Rate limit: burst size (default: 20)
    pub rate_limit_burst: u32,
    /// Postgres connection string; in-memory scan store when unset
    pub database_url: Option<String>,
    /// Database connection pool maximum connections (default: 20)
    pub database_max_connections: u32,
    /// Database connection pool minimum connections (default: 2)
    pub database_min_connections: u32,
    /// Ledger gateway base URL; empty mock ledger when unset (dev only)
    pub ledger_url: Option<String>,
    /// Per-request ledger read timeout in seconds (default: 10)
    pub ledger_timeout_secs: u64,
    /// Fraud detector thresholds
    pub detector: DetectorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            host: [127, 0, 0, 1],
            allowed_origins: None, // None = allow all (dev mode)
            body_limit_mb: 2,
            timeout_secs: 30,
            rate_limit_enabled: false, // Disabled by default (for tests)
            rate_limit_per_sec: 10,
            rate_limit_burst: 20,
            database_url: None,
            database_max_connections: 20,
            database_min_connections: 2,
            ledger_url: None,
            ledger_timeout_secs: 10,
            detector: DetectorConfig::default(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let port = env_parse("PORT", 3000);

        let host = std::env::var("HOST")
            .ok()
            .map(|h| {
                if h == "0.0.0.0" {
                    [0, 0, 0, 0]
                } else {
                    [127, 0, 0, 1]
                }
            })
            .unwrap_or([127, 0, 0, 1]);

        let allowed_origins = std::env::var("ALLOWED_ORIGINS").ok().map(|origins| {
            origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        });

        // Rate limiting enabled by default in production, can be disabled with RATE_LIMIT_ENABLED=false
        let rate_limit_enabled = std::env::var("RATE_LIMIT_ENABLED")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(true);

        let defaults = DetectorConfig::default();
        let detector = DetectorConfig {
            cell_precision: env_parse("GEO_CELL_PRECISION", defaults.cell_precision),
            suspicious_location_min: env_parse(
                "SUSPICIOUS_LOCATION_MIN_SCANS",
                defaults.suspicious_location_min,
            ),
            duplicate_sale_min: env_parse("DUPLICATE_SALE_MIN_SCANS", defaults.duplicate_sale_min),
            suspicious_not_found_min: env_parse(
                "SUSPICIOUS_NOT_FOUND_MIN_SCANS",
                defaults.suspicious_not_found_min,
            ),
            nearby_limit: env_parse("NEARBY_RESULT_LIMIT", defaults.nearby_limit),
            nearby_default_radius_m: env_parse(
                "NEARBY_DEFAULT_RADIUS_M",
                defaults.nearby_default_radius_m,
            ),
        };

        Self {
            port,
            host,
            allowed_origins,
            body_limit_mb: env_parse("BODY_LIMIT_MB", 2),
            timeout_secs: env_parse("REQUEST_TIMEOUT_SECS", 30),
            rate_limit_enabled,
            rate_limit_per_sec: env_parse("RATE_LIMIT_PER_SEC", 10),
            rate_limit_burst: env_parse("RATE_LIMIT_BURST", 20),
            database_url: std::env::var("DATABASE_URL").ok(),
            database_max_connections: env_parse("DATABASE_MAX_CONNECTIONS", 20),
            database_min_connections: env_parse("DATABASE_MIN_CONNECTIONS", 2),
            ledger_url: std::env::var("LEDGER_URL").ok(),
            ledger_timeout_secs: env_parse("LEDGER_TIMEOUT_SECS", 10),
            detector,
        }
    }

    /// Get socket address from config
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::from((self.host, self.port))
    }

    /// Ledger client configuration, when a gateway URL is set.
    pub fn ledger_http_config(&self) -> Option<LedgerHttpConfig> {
        self.ledger_url.as_ref().map(|url| {
            let mut config = LedgerHttpConfig::new(url.trim_end_matches('/'));
            config.timeout = Duration::from_secs(self.ledger_timeout_secs);
            config
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port, 3000);
        assert!(config.database_url.is_none());
        assert!(!config.rate_limit_enabled);
        assert_eq!(config.detector.suspicious_location_min, 5);
        assert_eq!(config.detector.duplicate_sale_min, 3);
    }

    #[test]
    fn test_socket_addr() {
        let config = Config::default();
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3000");
    }

    #[test]
    fn test_ledger_config_absent_without_url() {
        let config = Config::default();
        assert!(config.ledger_http_config().is_none());
    }
}
