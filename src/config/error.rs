//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid bind address: {0}")]
    InvalidBindAddress(String),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Pool min_connections exceeds max_connections")]
    InvalidPoolSize,

    #[error("Pool size exceeds maximum allowed (100)")]
    PoolSizeTooLarge,

    #[error("Invalid bundle id: {0}")]
    InvalidBundleId(String),

    #[error("Grace period must be between 0 and 365 days")]
    InvalidGracePeriod,

    #[error("Deletion retention must be between 0 and 3650 days")]
    InvalidRetention,

    #[error("Write timeout must be between 1 and 120 seconds")]
    InvalidWriteTimeout,

    #[error("Health window must be between 1 and 720 hours")]
    InvalidHealthWindow,

    #[error("Health success threshold must be within 0.0..=1.0")]
    InvalidSuccessThreshold,
}
