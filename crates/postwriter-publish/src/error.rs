use miette::Diagnostic;
use postwriter_common::{ConfigError, StoreError};
use postwriter_editor_core::EditorError;
use std::path::PathBuf;

use crate::credentials::READINESS_MESSAGE;

/// Errors fetching a remote image or the scaffold page.
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum FetchError {
    #[error("failed to read {}", path.display())]
    #[diagnostic(code(postwriter::fetch::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("request to {url} failed")]
    #[diagnostic(code(postwriter::fetch::http))]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    #[diagnostic(code(postwriter::fetch::status))]
    Status { url: String, status: u16 },
}

/// Errors building an export archive.
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum ArchiveError {
    #[error("failed to write archive entry {entry}")]
    #[diagnostic(code(postwriter::archive::zip))]
    Zip {
        entry: String,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("failed to write archive entry {entry}")]
    #[diagnostic(code(postwriter::archive::io))]
    Io {
        entry: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize post manifest")]
    #[diagnostic(code(postwriter::archive::manifest))]
    Manifest(#[source] serde_json::Error),
}

/// Errors from the remote publish chain.
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum PublishError {
    /// Token, owner or repository missing. Raised before any network call.
    #[error("{}", READINESS_MESSAGE)]
    #[diagnostic(
        code(postwriter::publish::not_ready),
        help("pass --token/--owner/--repo or set POSTWRITER_GITHUB_TOKEN")
    )]
    NotReady,

    #[error("scaffold page is required for publishing")]
    #[diagnostic(code(postwriter::publish::scaffold))]
    ScaffoldUnavailable(#[source] FetchError),

    #[error("GitHub {operation} failed with HTTP {status}: {body}")]
    #[diagnostic(code(postwriter::publish::api))]
    Api {
        operation: &'static str,
        status: u16,
        body: String,
    },

    #[error("GitHub {operation} response had no sha")]
    #[diagnostic(code(postwriter::publish::missing_sha))]
    MissingSha { operation: &'static str },

    #[error("GitHub {operation} request failed")]
    #[diagnostic(code(postwriter::publish::http))]
    Http {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to serialize post manifest")]
    #[diagnostic(code(postwriter::publish::manifest))]
    Manifest(#[source] serde_json::Error),
}

/// Everything the postwriter front end can fail with.
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum PostwriterError {
    #[error(transparent)]
    #[diagnostic_source]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic_source]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic_source]
    Editor(#[from] EditorError),

    #[error(transparent)]
    #[diagnostic_source]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    #[diagnostic_source]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    #[diagnostic_source]
    Publish(#[from] PublishError),

    #[error("failed to access {}", path.display())]
    #[diagnostic(code(postwriter::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    #[diagnostic(code(postwriter::usage))]
    Usage(String),
}
