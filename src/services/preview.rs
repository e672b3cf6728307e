//! Picks how a PDF reaches the viewer and tracks the viewer's page state.

use reqwest::Url;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

use crate::services::resource_fetcher::{FetchError, ResourceFetcher};
use crate::storage::blob_registry::BlobHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Native,
    Web,
}

/// How the web runtime should load PDFs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebStrategy {
    /// Same-origin `/pdf-proxy` avoids CORS and range-request problems
    Proxied,
    /// Pre-fetch into an object URL
    Blob,
}

#[derive(Debug)]
pub enum PdfSource {
    Direct(String),
    Proxied(String),
    Blob(BlobHandle),
}

impl PdfSource {
    pub fn uri(&self) -> &str {
        match self {
            PdfSource::Direct(url) | PdfSource::Proxied(url) => url,
            PdfSource::Blob(handle) => handle.url(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PreviewError {
    #[error("Failed to fetch PDF: {0}")]
    Fetch(#[from] FetchError),
    #[error("Failed to write PDF: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid proxy URL: {0}")]
    InvalidUrl(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResult {
    pub local_uri: String,
    /// True when an earlier download was found in the cache
    pub reused: bool,
}

pub struct PreviewCoordinator {
    fetcher: ResourceFetcher,
    platform: Platform,
    web_strategy: WebStrategy,
    proxy_base: String,
    cache_dir: PathBuf,
}

impl PreviewCoordinator {
    pub fn new(
        fetcher: ResourceFetcher,
        platform: Platform,
        proxy_base: impl Into<String>,
        cache_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            fetcher,
            platform,
            web_strategy: WebStrategy::Proxied,
            proxy_base: proxy_base.into().trim_end_matches('/').to_string(),
            cache_dir: cache_dir.into(),
        }
    }

    pub fn with_web_strategy(mut self, strategy: WebStrategy) -> Self {
        self.web_strategy = strategy;
        self
    }

    pub fn document_url(&self, document_id: &str) -> String {
        self.fetcher.document_url(document_id)
    }

    pub fn proxy_url(&self, upstream: &str) -> Result<String, PreviewError> {
        let url = Url::parse_with_params(&format!("{}/pdf-proxy", self.proxy_base), &[("url", upstream)])
            .map_err(|e| PreviewError::InvalidUrl(e.to_string()))?;
        Ok(url.to_string())
    }

    pub async fn resolve_source(&self, document_id: &str) -> Result<PdfSource, PreviewError> {
        let upstream = self.document_url(document_id);
        match (self.platform, self.web_strategy) {
            (Platform::Native, _) => Ok(PdfSource::Direct(upstream)),
            (Platform::Web, WebStrategy::Proxied) => Ok(PdfSource::Proxied(self.proxy_url(&upstream)?)),
            (Platform::Web, WebStrategy::Blob) => {
                Ok(PdfSource::Blob(self.fetcher.fetch_pdf_blob(&upstream).await?))
            }
        }
    }

    pub fn cache_path(&self, document_id: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.pdf", document_id))
    }

    /// Saves the PDF for offline use.
    ///
    /// Native: cached at `<cache_dir>/<id>.pdf`, skipped if already there.
    /// Web: nothing is written and the document URL is returned.
    pub async fn download(&self, document_id: &str) -> Result<DownloadResult, PreviewError> {
        let url = self.document_url(document_id);
        if self.platform == Platform::Web {
            return Ok(DownloadResult {
                local_uri: url,
                reused: false,
            });
        }

        let target = self.cache_path(document_id);
        if tokio::fs::try_exists(&target).await? {
            debug!("PDF {} already cached", document_id);
            return Ok(DownloadResult {
                local_uri: path_uri(&target),
                reused: true,
            });
        }

        let asset = self.fetcher.fetch_bytes(&url).await?;
        tokio::fs::create_dir_all(&self.cache_dir).await?;

        // Partial writes never land under the final name; each download gets its own
        let partial = self.cache_dir.join(format!(
            "{}.{}.pdf.part",
            document_id,
            Uuid::new_v4().simple()
        ));
        tokio::fs::write(&partial, &asset.bytes).await?;
        if let Err(e) = tokio::fs::rename(&partial, &target).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e.into());
        }

        info!("Downloaded PDF {} ({} bytes)", document_id, asset.bytes.len());
        Ok(DownloadResult {
            local_uri: path_uri(&target),
            reused: false,
        })
    }
}

fn path_uri(path: &Path) -> String {
    format!("file://{}", path.display())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerState {
    Loading,
    Ready,
    Failed(String),
}

/// Viewer callback sink backing the "Page X of Y" indicator
#[derive(Debug, Clone)]
pub struct PageTracker {
    current: u32,
    total: u32,
    state: ViewerState,
}

impl Default for PageTracker {
    fn default() -> Self {
        Self {
            current: 1,
            total: 0,
            state: ViewerState::Loading,
        }
    }
}

impl PageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_load_complete(&mut self, total_pages: u32) {
        self.total = total_pages;
        self.current = self.current.clamp(1, total_pages.max(1));
        self.state = ViewerState::Ready;
    }

    pub fn on_page_change(&mut self, page: u32, total_pages: u32) {
        self.total = total_pages;
        self.current = page.clamp(1, total_pages.max(1));
    }

    pub fn on_error(&mut self, message: impl Into<String>) {
        self.state = ViewerState::Failed(format!("PDF viewer error: {}", message.into()));
    }

    /// Back to loading, keeping nothing from the failed attempt
    pub fn retry(&mut self) {
        *self = Self::default();
    }

    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    pub fn current_page(&self) -> u32 {
        self.current
    }

    pub fn total_pages(&self) -> u32 {
        self.total
    }

    /// `None` until the page count is known
    pub fn indicator(&self) -> Option<String> {
        (self.total > 0).then(|| format!("Page {} of {}", self.current, self.total))
    }
}
