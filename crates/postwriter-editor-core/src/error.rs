use miette::Diagnostic;
use postwriter_common::StoreError;

/// Errors constructing or decoding an image asset.
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum AssetError {
    #[error("stored image {key} is not a base64 data URL")]
    #[diagnostic(
        code(postwriter::asset::data_url),
        help("run `postwriter clear` to drop the corrupt entry")
    )]
    InvalidDataUrl { key: String },
}

/// Errors surfaced by the editor controller.
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum EditorError {
    #[error("a publish is already in progress")]
    #[diagnostic(code(postwriter::editor::publish_in_flight))]
    PublishInFlight,

    #[error("no publish is in progress")]
    #[diagnostic(code(postwriter::editor::no_publish))]
    NoPublishInFlight,

    #[error("unknown draft field: {0}")]
    #[diagnostic(
        code(postwriter::editor::field),
        help("fields: title, youtube, date, profile, body, featured-url")
    )]
    UnknownField(String),

    #[error(transparent)]
    #[diagnostic_source]
    Store(#[from] StoreError),
}
