//! The static `index.html` scaffold shipped with every post.

use std::future::Future;
use std::path::PathBuf;

use crate::error::FetchError;

/// Archive/commit entry name of the scaffold page.
pub const SCAFFOLD_ENTRY: &str = "index.html";

pub trait ScaffoldSource {
    fn load(&self) -> impl Future<Output = Result<String, FetchError>> + Send;
}

/// Where the scaffold page lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScaffoldLocation {
    File(PathBuf),
    Url(String),
}

impl ScaffoldLocation {
    /// `http(s)://` locations are fetched, anything else is a file path.
    pub fn parse(location: &str) -> Self {
        if location.starts_with("http://") || location.starts_with("https://") {
            ScaffoldLocation::Url(location.to_owned())
        } else {
            ScaffoldLocation::File(PathBuf::from(location))
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScaffoldLoader {
    location: ScaffoldLocation,
    client: reqwest::Client,
}

impl ScaffoldLoader {
    pub fn new(location: ScaffoldLocation, client: reqwest::Client) -> Self {
        Self { location, client }
    }

    pub fn location(&self) -> &ScaffoldLocation {
        &self.location
    }
}

impl ScaffoldSource for ScaffoldLoader {
    async fn load(&self) -> Result<String, FetchError> {
        match &self.location {
            ScaffoldLocation::File(path) => {
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| FetchError::Io {
                        path: path.clone(),
                        source,
                    })
            }
            ScaffoldLocation::Url(url) => {
                let http = |source| FetchError::Http {
                    url: url.clone(),
                    source,
                };
                let response = self.client.get(url).send().await.map_err(http)?;
                let status = response.status();
                if !status.is_success() {
                    return Err(FetchError::Status {
                        url: url.clone(),
                        status: status.as_u16(),
                    });
                }
                response.text().await.map_err(http)
            }
        }
    }
}

/// Load the scaffold for an export, where it is optional.
pub async fn load_optional_scaffold<S: ScaffoldSource>(source: &S) -> Option<String> {
    match source.load().await {
        Ok(page) => Some(page),
        Err(e) => {
            tracing::warn!(error = %e, "scaffold page unavailable; exporting without it");
            None
        }
    }
}
