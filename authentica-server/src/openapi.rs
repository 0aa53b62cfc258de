//! OpenAPI documentation configuration
//!
//! Generates the OpenAPI 3.0 specification for the Authentica API.

use utoipa::OpenApi;

use crate::handlers::{
    HealthResponse, NearbyResponse, ReadyResponse, ScanListResponse, SuspiciousResponse,
    VerifyRequest,
};

/// Authentica API - OpenAPI Documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Authentica API",
        version = "0.1.0",
        description = r#"
## Product Authenticity Verification API

Authentica decides whether a scanned physical product is genuine by
cross-checking the external trust ledger, and surfaces fraud patterns
across accumulated scans:

- **Verification** - existence, manufacturer trust, details fingerprint,
  and sale/retailer checks, composed into a pass/fail verdict with reasons
- **Scan log** - one immutable event per verification attempt
- **Fraud analytics** - suspicious locations (counterfeit points of sale),
  duplicate-sold products (cloned QR codes), composite per-product reports

### How It Works

1. A client decodes a QR code and calls `POST /verify`
2. The verdict is returned and the scan is logged for analytics
3. Dashboards poll `GET /api/scans/analytics` and friends
"#,
        license(
            name = "MIT OR Apache-2.0",
            url = "https://github.com/authentica-labs/authentica/blob/main/LICENSE"
        ),
        contact(
            name = "Authentica Team",
            url = "https://github.com/authentica-labs/authentica"
        )
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server")
    ),
    tags(
        (name = "Verification", description = "Verify product identifiers against the trust ledger"),
        (name = "Scans", description = "Scan event ingestion and listing"),
        (name = "Analytics", description = "Fraud pattern reports over the scan log"),
        (name = "Health", description = "Service health and readiness endpoints")
    ),
    paths(
        crate::handlers::health::health,
        crate::handlers::health::ready,
        crate::handlers::verify::verify_handler,
        crate::handlers::scans::log_scan_handler,
        crate::handlers::scans::list_scans_handler,
        crate::handlers::analytics::analytics_handler,
        crate::handlers::analytics::suspicious_handler,
        crate::handlers::analytics::nearby_handler,
    ),
    components(
        schemas(
            HealthResponse,
            ReadyResponse,
            VerifyRequest,
            ScanListResponse,
            NearbyResponse,
            SuspiciousResponse,
        )
    )
)]
pub struct ApiDoc;
