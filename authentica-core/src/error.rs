use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthenticaError {
    #[error("Ledger error: {0}")]
    Ledger(String),

    #[error("Ledger timeout: {0}")]
    LedgerTimeout(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Scan store error: {0}")]
    Store(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, AuthenticaError>;
