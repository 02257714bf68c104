//! Error types for the data object runtime.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Model(#[from] dataobject_model::Error),

    /// Fatal start-up error while building the registry.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("codec error: {0}")]
    Codec(String),

    /// A migration lookup with a version the inventory does not know.
    #[error("migration error: {0}")]
    Migration(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised by user visitor hooks and extension callbacks.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub(crate) fn codec(message: impl Into<String>) -> Self {
        Self::Codec(message.into())
    }

    pub(crate) fn migration(message: impl Into<String>) -> Self {
        Self::Migration(message.into())
    }
}

/// Result type alias using the runtime error type.
pub type Result<T> = std::result::Result<T, Error>;
