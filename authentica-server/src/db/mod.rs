//! Database module for Authentica Server
//!
//! Contains the Postgres-backed scan store and connection utilities.

pub mod scan;

pub use scan::PgScanStore;
