//! Error types for sigmakit

use thiserror::Error;

/// Core errors that can occur outside transaction planning
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Amount error: {0}")]
    Amount(#[from] AmountError),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// ERG amount parsing and validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("Amount cannot be negative: {0}")]
    Negative(String),

    #[error("Invalid ERG amount: {0}")]
    Invalid(String),

    #[error("Too many decimal places in {0} (nanoERG precision is 9)")]
    TooPrecise(String),

    #[error("Amount {0} overflows nanoERG range")]
    Overflow(String),
}

/// Result type alias for sigmakit core operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Short machine-readable code for reports
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Amount(_) => "amount",
            Self::Serialization(_) => "serialization",
        }
    }
}
