//! Authenticated retrieval of thumbnails and PDFs from the RAG backend.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::Client;
use std::sync::Arc;
use tokio::sync::{AcquireError, Semaphore};
use tracing::{debug, warn};

use crate::config::Config;
use crate::models::internal::Document;
use crate::storage::blob_registry::{BlobHandle, BlobRegistry};

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Asset request failed: {status}")]
    Status { status: u16 },
    #[error("Invalid header: {0}")]
    InvalidHeader(String),
    #[error("Semaphore error: {0}")]
    SemaphoreError(String),
}

impl From<AcquireError> for FetchError {
    fn from(err: AcquireError) -> Self {
        FetchError::SemaphoreError(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct FetchedAsset {
    pub bytes: Bytes,
    pub content_type: String,
}

/// Builds the fixed header set every RAG backend request carries
pub(crate) fn auth_headers(config: &Config) -> Result<HeaderMap, FetchError> {
    let mut headers = HeaderMap::new();

    let mut bearer = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
        .map_err(|e| FetchError::InvalidHeader(format!("authorization: {}", e)))?;
    bearer.set_sensitive(true);
    headers.insert(AUTHORIZATION, bearer);

    let bypass = HeaderName::from_bytes(config.tunnel_bypass_header.as_bytes())
        .map_err(|e| FetchError::InvalidHeader(format!("{}: {}", config.tunnel_bypass_header, e)))?;
    headers.insert(bypass, HeaderValue::from_static("true"));

    let agent = HeaderValue::from_str(&config.user_agent)
        .map_err(|e| FetchError::InvalidHeader(format!("user-agent: {}", e)))?;
    headers.insert(USER_AGENT, agent);

    Ok(headers)
}

/// Fetches binary assets with the backend's bearer token.
///
/// The token only lives inside the default headers of the wrapped client;
/// callers get bytes, data URIs or blob handles back, never the key.
#[derive(Clone)]
pub struct ResourceFetcher {
    client: Client,
    base_url: String,
    blobs: BlobRegistry,
    semaphore: Arc<Semaphore>,
}

impl std::fmt::Debug for ResourceFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceFetcher")
            .field("base_url", &self.base_url)
            .field("authorization", &"<redacted>")
            .finish()
    }
}

impl ResourceFetcher {
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        Self::with_registry(config, BlobRegistry::new())
    }

    pub fn with_registry(config: &Config, blobs: BlobRegistry) -> Result<Self, FetchError> {
        let client = Client::builder()
            .default_headers(auth_headers(config)?)
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_base().to_string(),
            blobs,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_fetches.max(1))),
        })
    }

    pub fn blobs(&self) -> &BlobRegistry {
        &self.blobs
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn thumbnail_url(&self, dataset_id: &str, thumbnail: &str) -> String {
        format!("{}/v1/document/image/{}-{}", self.base_url, dataset_id, thumbnail)
    }

    pub fn document_url(&self, document_id: &str) -> String {
        format!("{}/v1/document/get/{}", self.base_url, document_id)
    }

    /// One authenticated GET; non-2xx is an error, nothing is retried
    pub async fn fetch_bytes(&self, url: &str) -> Result<FetchedAsset, FetchError> {
        debug!("Fetching asset {}", url);
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                status: response.status().as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let bytes = response.bytes().await?;
        Ok(FetchedAsset {
            bytes,
            content_type,
        })
    }

    /// `data:<mime>;base64,...` suitable for an image source
    pub async fn fetch_image_data_uri(&self, url: &str) -> Result<String, FetchError> {
        let asset = self.fetch_bytes(url).await?;
        Ok(to_data_uri(&asset))
    }

    /// Fetches a PDF into a scoped object URL owned by the returned handle
    pub async fn fetch_pdf_blob(&self, url: &str) -> Result<BlobHandle, FetchError> {
        let asset = self.fetch_bytes(url).await?;
        Ok(self.blobs.create(asset.bytes, asset.content_type))
    }

    /// Data URIs for every document thumbnail, at most `max_concurrent_fetches` in flight.
    ///
    /// Output order matches input order. Documents without a thumbnail and
    /// failed fetches yield `None`.
    pub async fn fetch_thumbnails(&self, documents: &[Document]) -> Vec<(String, Option<String>)> {
        let tasks = documents.iter().map(|doc| async move {
            let Some(thumb) = doc.thumbnail.as_deref().filter(|t| !t.is_empty()) else {
                return (doc.id.clone(), None);
            };
            let url = self.thumbnail_url(&doc.dataset_id, thumb);

            match self.fetch_limited(&url).await {
                Ok(uri) => (doc.id.clone(), Some(uri)),
                Err(e) => {
                    warn!("Thumbnail fetch failed for document {}: {}", doc.id, e);
                    (doc.id.clone(), None)
                }
            }
        });

        futures::future::join_all(tasks).await
    }

    async fn fetch_limited(&self, url: &str) -> Result<String, FetchError> {
        let _permit = self.semaphore.acquire().await?;
        self.fetch_image_data_uri(url).await
    }
}

pub fn to_data_uri(asset: &FetchedAsset) -> String {
    format!(
        "data:{};base64,{}",
        asset.content_type,
        STANDARD.encode(&asset.bytes)
    )
}
