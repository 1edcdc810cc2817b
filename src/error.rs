use thiserror::Error;

/// Main error type for the decision engine
#[derive(Error, Debug)]
pub enum PhasegateError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Feature input errors
    #[error("Feature set unavailable: {0}")]
    FeatureSetUnavailable(String),

    #[error("Invalid feature data: {0}")]
    InvalidFeatureData(String),

    // Audit output errors
    #[error("Audit log error: {path}: {reason}")]
    AuditLog { path: String, reason: String },

    // State persistence errors
    #[error("State store error: {0}")]
    StateStore(String),

    // Validation errors
    #[error("Validation failed: {0}")]
    Validation(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for PhasegateError
pub type Result<T> = std::result::Result<T, PhasegateError>;
