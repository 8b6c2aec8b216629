//! Error types shared across postwriter crates.

use miette::Diagnostic;
use std::path::PathBuf;

/// Errors raised by a [`DurableStore`](crate::store::DurableStore).
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum StoreError {
    /// The write would push the store past its byte quota.
    #[error("storage quota exceeded writing {key} ({needed} bytes, {available} available)")]
    #[diagnostic(
        code(postwriter::store::quota),
        help("large images are kept for this session only")
    )]
    QuotaExceeded {
        key: String,
        needed: usize,
        available: usize,
    },

    /// The backing file could not be read or written.
    #[error("failed to access store file {}", path.display())]
    #[diagnostic(code(postwriter::store::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The backing file is not a JSON object of strings.
    #[error(transparent)]
    #[diagnostic_source]
    Serde(#[from] SerDeError),
}

/// Errors raised while loading or saving [`Config`](crate::config::Config).
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum ConfigError {
    #[error("unsupported config format: {}", path.display())]
    #[diagnostic(
        code(postwriter::config::format),
        help("use a .json or .toml file")
    )]
    UnsupportedFormat { path: PathBuf },

    #[error("failed to access config file {}", path.display())]
    #[diagnostic(code(postwriter::config::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic_source]
    Serde(#[from] SerDeError),
}

/// Serialization/deserialization errors
#[derive(thiserror::Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum SerDeError {
    #[error(transparent)]
    #[diagnostic(code(postwriter::serde::json))]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    #[diagnostic(code(postwriter::serde::toml_de))]
    TomlDe(#[from] toml::de::Error),

    #[error(transparent)]
    #[diagnostic(code(postwriter::serde::toml_ser))]
    TomlSer(#[from] toml::ser::Error),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serde(SerDeError::Json(err))
    }
}
