use crate::fetcher::{build_client, read_limited, FetcherConfig};
use crate::PreviewError;
use reqwest::{header::CONTENT_TYPE, Client};
use tracing::{debug, instrument};
use url::Url;

/// A linked image pulled down for thumbnailing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedImage {
    pub url: String,
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Size-capped image downloader.
#[derive(Clone)]
pub struct ImageDownloader {
    client: Client,
    max_size: usize,
}

impl ImageDownloader {
    /// Default client settings with a `max_size` byte cap.
    pub fn new(max_size: usize) -> Result<Self, PreviewError> {
        Self::new_with_config(FetcherConfig {
            max_body_size: max_size,
            ..FetcherConfig::default()
        })
    }

    /// Client from `config`; its `max_body_size` caps each image.
    pub fn new_with_config(config: FetcherConfig) -> Result<Self, PreviewError> {
        let (client, max_size) = build_client(config)?;
        Ok(Self { client, max_size })
    }

    pub fn with_client(client: Client, max_size: usize) -> Self {
        Self { client, max_size }
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    #[instrument(level = "debug", skip(self), err)]
    pub async fn download(&self, url: &str) -> Result<DownloadedImage, PreviewError> {
        let parsed = Url::parse(url)?;
        let response = self
            .client
            .get(parsed.clone())
            .send()
            .await
            .map_err(PreviewError::from_reqwest)?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = read_limited(response, self.max_size).await?;

        debug!(url = %url, size = bytes.len(), "Downloaded linked image");
        Ok(DownloadedImage {
            url: url.to_string(),
            filename: filename_of(&parsed),
            content_type,
            bytes,
        })
    }
}

/// Last path segment, or `image` when the path has none.
fn filename_of(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|s| !s.is_empty())
        .unwrap_or("image")
        .to_string()
}
