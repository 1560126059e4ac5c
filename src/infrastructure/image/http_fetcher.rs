//! Out-of-line HTTP image fetching.
//!
//! Each request is a single attempt bounded by the client timeout. Results
//! travel back over an unbounded channel so the owner of the document can
//! apply them on its own thread.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::runtime::Handle;
use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, error, warn};

use crate::domain::ports::{CacheError, CacheResult, ImageFetchPort};

/// Message sent when a fetch finishes.
#[derive(Debug, Clone)]
pub struct ImageFetchedEvent {
    /// The URL that was requested.
    pub url: String,
    /// Downloaded bytes, or why the download failed.
    pub result: CacheResult<Bytes>,
}

/// Configuration for the HTTP fetcher.
#[derive(Debug, Clone)]
pub struct HttpFetcherConfig {
    /// Maximum concurrent downloads.
    pub max_concurrent_downloads: usize,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for HttpFetcherConfig {
    fn default() -> Self {
        Self {
            max_concurrent_downloads: 4,
            timeout_secs: 30,
        }
    }
}

/// Downloads remote images on the tokio runtime.
pub struct HttpImageFetcher {
    http_client: reqwest::Client,
    semaphore: Arc<Semaphore>,
    event_tx: mpsc::UnboundedSender<ImageFetchedEvent>,
    runtime: Handle,
    config: HttpFetcherConfig,
}

impl std::fmt::Debug for HttpImageFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpImageFetcher")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HttpImageFetcher {
    /// Creates a fetcher bound to the current tokio runtime.
    ///
    /// # Errors
    /// Returns error if called outside a runtime or the HTTP client cannot be built.
    pub fn new(
        config: HttpFetcherConfig,
        event_tx: &mpsc::UnboundedSender<ImageFetchedEvent>,
    ) -> CacheResult<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| CacheError::NetworkError(format!("No async runtime: {e}")))?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CacheError::NetworkError(format!("Failed to create HTTP client: {e}")))?;

        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_downloads.max(1)));

        Ok(Self {
            http_client,
            semaphore,
            event_tx: event_tx.clone(),
            runtime,
            config,
        })
    }

    /// Returns the fetcher configuration.
    #[must_use]
    pub const fn config(&self) -> &HttpFetcherConfig {
        &self.config
    }

    /// Downloads image bytes from a URL.
    async fn download(client: &reqwest::Client, url: &str) -> CacheResult<Bytes> {
        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| CacheError::NetworkError(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(CacheError::NetworkError(format!(
                "HTTP {}: {}",
                response.status(),
                response.status().canonical_reason().unwrap_or("Unknown")
            )));
        }

        response
            .bytes()
            .await
            .map_err(|e| CacheError::NetworkError(format!("Failed to read body: {e}")))
    }
}

impl ImageFetchPort for HttpImageFetcher {
    fn fetch(&self, url: &str) {
        let client = self.http_client.clone();
        let semaphore = self.semaphore.clone();
        let event_tx = self.event_tx.clone();
        let url = url.to_string();

        self.runtime.spawn(async move {
            let result = match semaphore.acquire_owned().await {
                Ok(_permit) => {
                    debug!(url = %url, "Downloading image from network");
                    Self::download(&client, &url).await
                }
                Err(e) => Err(CacheError::NetworkError(format!("Fetcher closed: {e}"))),
            };

            if let Err(e) = &result {
                warn!(url = %url, error = %e, "Image download failed");
            }

            if let Err(e) = event_tx.send(ImageFetchedEvent { url, result }) {
                error!("Failed to deliver fetch result: {}", e);
            }
        });
    }
}
