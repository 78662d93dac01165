use crate::extractor::{MetadataExtractor, OEmbedResponse};
use crate::{Metadata, PreviewError};
use async_trait::async_trait;
use reqwest::{header::HeaderMap, Client, Response};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Default cap on any single response body.
pub const DEFAULT_MAX_BODY_SIZE: usize = 2 * 1024 * 1024;

/// Source of metadata records for URLs.
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Metadata, PreviewError>;
}

/// Fetches a page over HTTP, reads its Open Graph tags and, when the page
/// advertises one, merges in its oEmbed document.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    max_body_size: usize,
    extractor: MetadataExtractor,
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetcher {
    pub fn new() -> Self {
        debug!("Fetcher initialized with default configuration");
        Self::new_with_config(FetcherConfig::default()).unwrap_or_else(|e| {
            e.log();
            Self::with_client(Client::new())
        })
    }

    /// Creates a Fetcher with custom configuration
    pub fn new_with_config(config: FetcherConfig) -> Result<Self, PreviewError> {
        let (client, max_body_size) = build_client(config)?;
        Ok(Self {
            client,
            max_body_size,
            extractor: MetadataExtractor::new(),
        })
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            extractor: MetadataExtractor::new(),
        }
    }

    pub fn with_max_body_size(mut self, max_body_size: usize) -> Self {
        self.max_body_size = max_body_size;
        self
    }

    #[instrument(level = "debug", skip(self), err)]
    pub async fn fetch_text(&self, url: &str) -> Result<String, PreviewError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(PreviewError::from_reqwest)?;
        let body = read_limited(response, self.max_body_size).await?;

        debug!(url = %url, content_length = body.len(), "Successfully fetched webpage");
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    #[instrument(level = "debug", skip(self), err)]
    pub async fn fetch_oembed(&self, endpoint: &str) -> Result<OEmbedResponse, PreviewError> {
        let body = self.fetch_text(endpoint).await?;
        serde_json::from_str(&body).map_err(|e| PreviewError::ExternalServiceError {
            service: "oEmbed".to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl MetadataFetcher for Fetcher {
    #[instrument(level = "debug", skip(self), err)]
    async fn fetch(&self, url: &str) -> Result<Metadata, PreviewError> {
        let html = self.fetch_text(url).await?;
        let page = self.extractor.extract(&html, url)?;
        let mut metadata = page.metadata;

        if let Some(endpoint) = page.oembed_url {
            match self.fetch_oembed(&endpoint).await {
                Ok(oembed) => self.extractor.merge_oembed(&mut metadata, &oembed),
                Err(e) => {
                    warn!(url = %url, endpoint = %endpoint, error = %e, "oEmbed lookup failed, using page metadata only");
                }
            }
        }

        Ok(metadata)
    }
}

/// Builds the HTTP client described by `config`, returning it with the body
/// size cap.
pub(crate) fn build_client(config: FetcherConfig) -> Result<(Client, usize), PreviewError> {
    let mut client_builder = Client::builder()
        .user_agent(config.user_agent)
        .timeout(config.timeout)
        .pool_max_idle_per_host(10);

    if let Some(headers) = config.headers {
        client_builder = client_builder.default_headers(headers);
    }

    if let Some(redirect_policy) = config.redirect_policy {
        client_builder = client_builder.redirect(redirect_policy);
    }

    let client = client_builder
        .build()
        .map_err(|e| PreviewError::FetchError(format!("Failed to build HTTP client: {e}")))?;
    Ok((client, config.max_body_size))
}

/// Reads a response body, refusing anything larger than `limit` bytes.
pub(crate) async fn read_limited(response: Response, limit: usize) -> Result<Vec<u8>, PreviewError> {
    let mut response = response
        .error_for_status()
        .map_err(PreviewError::from_reqwest)?;

    if let Some(length) = response.content_length() {
        if length as usize > limit {
            return Err(PreviewError::ContentTooLarge {
                size: length as usize,
                limit,
            });
        }
    }

    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(PreviewError::from_reqwest)? {
        if body.len() + chunk.len() > limit {
            return Err(PreviewError::ContentTooLarge {
                size: body.len() + chunk.len(),
                limit,
            });
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

/// Options for [`Fetcher::new_with_config`] and
/// [`ImageDownloader::new_with_config`](crate::ImageDownloader::new_with_config).
///
/// # Examples
/// ```ignore
/// let fetcher = Fetcher::new_with_config(FetcherConfig {
///     user_agent: "my-forum/1.0".to_string(),
///     timeout: Duration::from_secs(5),
///     ..Default::default()
/// })?;
/// ```
pub struct FetcherConfig {
    pub user_agent: String,
    pub timeout: Duration,
    pub headers: Option<HeaderMap>,
    pub redirect_policy: Option<reqwest::redirect::Policy>,
    pub max_body_size: usize,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("topic-preview/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_secs(10),
            headers: None,
            redirect_policy: None,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}
