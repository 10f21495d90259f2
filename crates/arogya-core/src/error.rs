use thiserror::Error;

/// Top-level error type for the Arogya system.
///
/// Each variant covers one failure class. Subsystem crates define their own
/// error types and implement `From<SubsystemError> for ArogyaError` so that
/// the `?` operator works seamlessly across crate boundaries.
///
/// Propagation policy: `Remote` and `Validation` are always recovered locally
/// into safe defaults before they reach the user; `Delivery` is caught at the
/// orchestrator boundary; `Config` is the only class allowed to abort a
/// startup path.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ArogyaError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Remote service unavailable: {0}")]
    Remote(String),

    #[error("Validation failure: {0}")]
    Validation(String),

    #[error("Delivery failure: {0}")]
    Delivery(String),

    #[error("Matcher error: {0}")]
    Matcher(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for ArogyaError {
    fn from(err: toml::de::Error) -> Self {
        ArogyaError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for ArogyaError {
    fn from(err: toml::ser::Error) -> Self {
        ArogyaError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for ArogyaError {
    fn from(err: serde_json::Error) -> Self {
        ArogyaError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Arogya operations.
pub type Result<T> = std::result::Result<T, ArogyaError>;
