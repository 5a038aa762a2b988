//! Error types for coresim

use thiserror::Error;

/// Error types for the coresim library crates.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network I/O errors.
    #[error("Network error: {0}")]
    Network(#[from] std::io::Error),

    /// YAML parsing errors.
    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// Event bus errors.
    #[error("Bus error: {0}")]
    Bus(#[from] crate::bus::BusError),

    /// Metrics registration errors.
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}
