//! postwriter-editor-core: editor logic without any UI binding.
//!
//! This crate provides:
//! - `Draft` and the `DraftCache` that mirrors it into durable storage
//! - `AssetStore` - the featured image and inline images, with display handles
//! - `render_preview` - markdown body plus assets to preview HTML
//! - `EditorAction` / `EditorState::apply` - pure state transitions
//! - `Editor<S>` - the controller that applies transition effects to a store

pub mod actions;
pub mod assets;
pub mod debounce;
pub mod draft;
pub mod editor;
pub mod error;
pub mod execute;
pub mod manifest;
pub mod render;
pub mod text_helpers;

pub use actions::{EditorAction, FormatKind, Range};
pub use assets::{
    AssetOrigin, AssetRegistry, AssetStore, BinaryAsset, DisplayHandle, Persistence,
    PersistencePolicy, PreviewImages,
};
pub use debounce::Debouncer;
pub use draft::{Draft, DraftCache, DraftField};
pub use editor::{Dispatched, Editor, EditorWarning, RenderRequest};
pub use error::{AssetError, EditorError};
pub use execute::{Effect, EditorState, Transition};
pub use manifest::PublishManifest;
pub use render::{ImageResolver, render_markdown, render_preview};
pub use smol_str::SmolStr;
