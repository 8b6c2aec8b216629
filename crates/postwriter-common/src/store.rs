//! Durable key/value storage for drafts and image mirrors.
//!
//! ## Key layout
//!
//! - `markdownEditorCache`: JSON record of the draft text fields
//! - `featuredImageDataUrl` / `featuredImageName`: the featured image mirror
//! - `extraImage_{name}`: one data URL per inline image
//!
//! Keys keep insertion order, and overwriting a key keeps its position, so
//! restoring inline images yields them in the order they were added.

use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use crate::error::StoreError;

/// Key of the draft text record.
pub const DRAFT_KEY: &str = "markdownEditorCache";
/// Key of the featured image data URL.
pub const FEATURED_DATA_KEY: &str = "featuredImageDataUrl";
/// Key of the featured image's sanitized name.
pub const FEATURED_NAME_KEY: &str = "featuredImageName";
/// Prefix for inline image keys.
pub const INLINE_KEY_PREFIX: &str = "extraImage_";

/// Build the durable key for an inline image.
pub fn inline_key(name: &str) -> String {
    format!("{}{}", INLINE_KEY_PREFIX, name)
}

/// Synchronous string key/value storage, atomic per key.
pub trait DurableStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removing an absent key is not an error.
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;

    /// All keys in insertion order.
    fn keys(&self) -> Vec<String>;

    /// Keys starting with `prefix`, in insertion order.
    fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.keys()
            .into_iter()
            .filter(|k| k.starts_with(prefix))
            .collect()
    }
}

impl<T: DurableStore + ?Sized> DurableStore for &mut T {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }

    fn keys(&self) -> Vec<String> {
        (**self).keys()
    }
}

fn entry_size(key: &str, value: &str) -> usize {
    key.len() + value.len()
}

fn map_size(map: &Map<String, Value>) -> usize {
    map.iter()
        .map(|(k, v)| entry_size(k, v.as_str().unwrap_or_default()))
        .sum()
}

fn check_quota(
    map: &Map<String, Value>,
    quota: Option<usize>,
    key: &str,
    value: &str,
) -> Result<(), StoreError> {
    let Some(quota) = quota else {
        return Ok(());
    };
    let existing = map
        .get(key)
        .and_then(Value::as_str)
        .map(|old| entry_size(key, old))
        .unwrap_or(0);
    let used = map_size(map) - existing;
    let needed = entry_size(key, value);
    if used + needed > quota {
        return Err(StoreError::QuotaExceeded {
            key: key.to_owned(),
            needed,
            available: quota.saturating_sub(used),
        });
    }
    Ok(())
}

/// In-memory store, optionally bounded by a byte quota.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Map<String, Value>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that rejects writes once keys plus values exceed `bytes`.
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            entries: Map::new(),
            quota: Some(bytes),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl DurableStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .entries
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_owned))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        check_quota(&self.entries, self.quota, key, value)?;
        self.entries
            .insert(key.to_owned(), Value::String(value.to_owned()));
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.shift_remove(key);
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

/// Write-through store persisted as one JSON object per file.
///
/// Writes go to a sibling temp file which is then renamed over the original.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: Map<String, Value>,
    quota: Option<usize>,
}

impl JsonFileStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => Map::new(),
            Ok(text) => serde_json::from_str(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        tracing::debug!(path = %path.display(), keys = entries.len(), "opened durable store");
        Ok(Self {
            path,
            entries,
            quota: None,
        })
    }

    pub fn with_quota(mut self, bytes: usize) -> Self {
        self.quota = Some(bytes);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(io_err)?;
            }
        }
        let text = serde_json::to_string(&self.entries)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, text).map_err(io_err)?;
        std::fs::rename(&tmp, &self.path).map_err(io_err)
    }
}

impl DurableStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .entries
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_owned))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        check_quota(&self.entries, self.quota, key, value)?;
        let previous = self
            .entries
            .insert(key.to_owned(), Value::String(value.to_owned()));
        if let Err(e) = self.flush() {
            // Keep memory consistent with what is on disk.
            match previous {
                Some(old) => {
                    self.entries.insert(key.to_owned(), old);
                }
                None => {
                    self.entries.shift_remove(key);
                }
            }
            return Err(e);
        }
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        if self.entries.shift_remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}
