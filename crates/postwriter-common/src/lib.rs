//! postwriter-common: pieces shared by the editor core, the publisher and the CLI.
//!
//! - `error` - store, config and serialization errors
//! - `config` - editor configuration and its file-backed loader
//! - `store` - durable key/value storage (`DurableStore`)
//! - `names` - filename sanitizing and post slugs
//! - `telemetry` - tracing subscriber setup

pub mod config;
pub mod error;
pub mod names;
pub mod store;
pub mod telemetry;

pub use crate::config::Config;
pub use crate::error::{ConfigError, SerDeError, StoreError};
pub use crate::names::{ARCHIVE_SLUG_LEN, post_slug, sanitize_filename};
pub use crate::store::{DurableStore, JsonFileStore, MemoryStore};
