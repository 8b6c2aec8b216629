use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, SerDeError};

/// Default ceiling for mirroring a single asset into durable storage.
pub const DEFAULT_MAX_ASSET_BYTES: usize = 5 * 1024 * 1024;

/// Bounds for the preview debounce, in milliseconds.
pub const DEBOUNCE_MIN_MS: u64 = 100;
pub const DEBOUNCE_MAX_MS: u64 = 250;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the GitHub REST API.
    pub api_base: String,
    /// Base URL used for the browsable link shown after a publish.
    pub web_base: String,
    /// Branch that publishes advance.
    pub branch: String,
    /// Assets larger than this stay in memory for the current session only.
    pub max_asset_bytes: usize,
    /// Trailing-edge delay before a body edit re-renders the preview.
    pub preview_debounce_ms: u64,
    /// Scaffold page copied next to every post. A path or an http(s) URL.
    pub scaffold: String,
    /// Override for the durable store file.
    pub store_path: Option<PathBuf>,
    /// Saved repository owner. The token is never written to config.
    pub owner: Option<String>,
    /// Saved repository name.
    pub repo: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_owned(),
            web_base: "https://github.com".to_owned(),
            branch: "main".to_owned(),
            max_asset_bytes: DEFAULT_MAX_ASSET_BYTES,
            preview_debounce_ms: DEBOUNCE_MAX_MS,
            scaffold: "blog/index.html".to_owned(),
            store_path: None,
            owner: None,
            repo: None,
        }
    }
}

impl Config {
    /// Loads the configuration from the provided loader.
    pub fn load(loader: &impl Loader) -> Result<Self, ConfigError> {
        loader.load()
    }

    /// Saves the configuration using the provided saver.
    pub fn save(&self, saver: &impl Saver) -> Result<(), ConfigError> {
        saver.save(self)
    }

    /// Debounce delay clamped into the supported window.
    pub fn debounce_ms(&self) -> u64 {
        self.preview_debounce_ms
            .clamp(DEBOUNCE_MIN_MS, DEBOUNCE_MAX_MS)
    }

    /// Durable store location, falling back to the per-user config dir.
    pub fn resolved_store_path(&self) -> PathBuf {
        self.store_path
            .clone()
            .unwrap_or_else(|| config_dir().join("store.json"))
    }
}

/// The trait for loading configuration data.
pub trait Loader {
    fn load(&self) -> Result<Config, ConfigError>;
}

/// The trait for saving configuration data.
pub trait Saver {
    fn save(&self, config: &Config) -> Result<(), ConfigError>;
}

/// An implementation of [`Loader`] and [`Saver`] that reads and writes a configuration file.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Create a new [`FileStore`] with the given path.
    ///
    /// [`Config`] data is serialized according to the file extension, `.json` or `.toml`.
    /// Loading a file that does not exist yields the default configuration.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> ConfigError {
        ConfigError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl Default for FileStore {
    fn default() -> Self {
        Self::new(config_dir().join("config.toml"))
    }
}

impl Loader for FileStore {
    fn load(&self) -> Result<Config, ConfigError> {
        let ext = self.path.extension().and_then(|ext| ext.to_str());
        if !matches!(ext, Some("json") | Some("toml")) {
            return Err(ConfigError::UnsupportedFormat {
                path: self.path.clone(),
            });
        }
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no config file, using defaults");
                return Ok(Config::default());
            }
            Err(e) => return Err(self.io_error(e)),
        };
        match ext {
            Some("json") => Ok(serde_json::from_str(&text).map_err(SerDeError::from)?),
            _ => Ok(toml::from_str(&text).map_err(SerDeError::from)?),
        }
    }
}

impl Saver for FileStore {
    fn save(&self, config: &Config) -> Result<(), ConfigError> {
        let text = match self.path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::to_string_pretty(config).map_err(SerDeError::from)?,
            Some("toml") => toml::to_string_pretty(config).map_err(SerDeError::from)?,
            _ => {
                return Err(ConfigError::UnsupportedFormat {
                    path: self.path.clone(),
                });
            }
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        std::fs::write(&self.path, text).map_err(|e| self.io_error(e))
    }
}

pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("./"))
        .join("postwriter")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("config.toml"));
        assert_eq!(Config::load(&store).unwrap(), Config::default());
    }

    #[test]
    fn toml_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested/config.toml"));
        let config = Config {
            branch: "gh-pages".into(),
            max_asset_bytes: 2 * 1024 * 1024,
            owner: Some("octocat".into()),
            ..Config::default()
        };
        config.save(&store).unwrap();
        assert_eq!(Config::load(&store).unwrap(), config);
    }

    #[test]
    fn json_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "branch": "trunk" }"#).unwrap();
        let config = Config::load(&FileStore::new(&path)).unwrap();
        assert_eq!(config.branch, "trunk");
        assert_eq!(config.api_base, "https://api.github.com");
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let store = FileStore::new("config.ini");
        assert!(matches!(
            Config::load(&store),
            Err(ConfigError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn debounce_is_clamped() {
        let mut config = Config::default();
        config.preview_debounce_ms = 10;
        assert_eq!(config.debounce_ms(), 100);
        config.preview_debounce_ms = 1000;
        assert_eq!(config.debounce_ms(), 250);
        config.preview_debounce_ms = 180;
        assert_eq!(config.debounce_ms(), 180);
    }
}
