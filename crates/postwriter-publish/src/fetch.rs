//! Fetching images from URLs.

use bytes::Bytes;
use postwriter_common::names::file_name_from_url;
use postwriter_editor_core::assets::{FALLBACK_FEATURED_NAME, FALLBACK_IMAGE_NAME};
use postwriter_editor_core::{AssetOrigin, BinaryAsset};
use std::future::Future;

use crate::error::FetchError;

/// Raw response body plus its declared content type.
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

pub trait ImageFetcher {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<FetchedImage, FetchError>> + Send;
}

/// Fetches over HTTP with a shared `reqwest` client.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl ImageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedImage, FetchError> {
        let http = |source| FetchError::Http {
            url: url.to_owned(),
            source,
        };
        let response = self.client.get(url).send().await.map_err(http)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_owned(),
                status: status.as_u16(),
            });
        }
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(|v| v.trim().to_owned());
        let bytes = response.bytes().await.map_err(http)?;
        tracing::debug!(url, size = bytes.len(), "fetched image");
        Ok(FetchedImage {
            bytes,
            content_type,
        })
    }
}

async fn fetch_asset<F: ImageFetcher>(
    fetcher: &F,
    url: &str,
    fallback: &str,
) -> Result<BinaryAsset, FetchError> {
    let fetched = fetcher.fetch(url).await?;
    let name = file_name_from_url(url, fallback);
    Ok(BinaryAsset::new(
        name,
        fallback,
        fetched.bytes,
        fetched.content_type.as_deref(),
        AssetOrigin::RemoteUrl(url.to_owned()),
    ))
}

/// Fetch a featured image. Nothing in the editor changes if this fails.
pub async fn fetch_featured<F: ImageFetcher>(
    fetcher: &F,
    url: &str,
) -> Result<BinaryAsset, FetchError> {
    fetch_asset(fetcher, url, FALLBACK_FEATURED_NAME).await
}

/// Fetch an image for insertion into the body.
pub async fn fetch_inline<F: ImageFetcher>(
    fetcher: &F,
    url: &str,
) -> Result<BinaryAsset, FetchError> {
    fetch_asset(fetcher, url, FALLBACK_IMAGE_NAME).await
}
