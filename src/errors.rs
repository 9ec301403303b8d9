// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DevwatchError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    #[error("Dependency cycle detected: {0}")]
    DependencyCycle(String),

    #[error("Acquisition error: {0}")]
    AcquisitionError(String),

    #[error("Watch backend error: {0}")]
    WatchBackend(#[from] notify::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DevwatchError {
    /// Errors that stem from the configuration itself (unknown providers,
    /// unknown dependencies, cycles). These are reported before any task
    /// starts and are never retried.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            DevwatchError::ConfigError(_)
                | DevwatchError::ProviderNotFound(_)
                | DevwatchError::DependencyCycle(_)
        )
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, DevwatchError>;
