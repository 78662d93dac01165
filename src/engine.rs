use crate::cache::Cache;
use crate::classifier::ContentKind;
use crate::config::SiteSettings;
use crate::fetcher::{Fetcher, MetadataFetcher};
use crate::matcher::UrlMatcher;
use crate::policy::HostPolicy;
use crate::renderer::{ArticleLayout, DefaultArticleLayout, HtmlRenderer};
use crate::Metadata;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, instrument};
use url::Url;

/// Upper bound on metadata fetches in flight for one batch.
pub const MAX_CONCURRENT_REQUESTS: usize = 16;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheStrategy {
    #[default]
    UseCache,
    NoCache,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub cache_capacity: usize,
    pub cache_strategy: CacheStrategy,
    pub max_concurrent_requests: usize,
    pub title_length: usize,
    pub description_length: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl EngineConfig {
    pub fn new(cache_capacity: usize) -> Self {
        let settings = SiteSettings::default();
        Self {
            cache_capacity,
            cache_strategy: CacheStrategy::UseCache,
            max_concurrent_requests: MAX_CONCURRENT_REQUESTS,
            title_length: settings.title_length,
            description_length: settings.description_length,
        }
    }

    pub fn with_cache_strategy(mut self, cache_strategy: CacheStrategy) -> Self {
        self.cache_strategy = cache_strategy;
        self
    }

    pub fn with_max_concurrent_requests(mut self, max_concurrent_requests: usize) -> Self {
        self.max_concurrent_requests = max_concurrent_requests.max(1);
        self
    }

    pub fn with_text_lengths(mut self, title_length: usize, description_length: usize) -> Self {
        self.title_length = title_length;
        self.description_length = description_length;
        self
    }
}

/// URL → metadata → classification → HTML.
///
/// Fetched metadata is memoized per URL; rendering runs on every call so
/// policy changes apply immediately.
#[derive(Clone)]
pub struct PreviewEngine {
    policy: HostPolicy,
    matcher: UrlMatcher,
    renderer: HtmlRenderer,
    fetcher: Arc<dyn MetadataFetcher>,
    cache: Cache<Metadata>,
    config: EngineConfig,
}

impl Default for PreviewEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PreviewEngine {
    pub fn new() -> Self {
        Self::with_fetcher(Arc::new(Fetcher::new()))
    }

    pub fn with_fetcher(fetcher: Arc<dyn MetadataFetcher>) -> Self {
        Self::new_with_config(
            EngineConfig::default(),
            HostPolicy::new(),
            fetcher,
            Arc::new(DefaultArticleLayout),
        )
    }

    pub fn new_with_config(
        config: EngineConfig,
        policy: HostPolicy,
        fetcher: Arc<dyn MetadataFetcher>,
        layout: Arc<dyn ArticleLayout>,
    ) -> Self {
        debug!(
            cache_capacity = config.cache_capacity,
            strategy = ?config.cache_strategy,
            "Initializing PreviewEngine"
        );
        Self {
            matcher: UrlMatcher::new(policy.clone()),
            renderer: HtmlRenderer::with_layout(policy.clone(), layout),
            cache: Cache::new(config.cache_capacity),
            policy,
            fetcher,
            config,
        }
    }

    pub fn policy(&self) -> &HostPolicy {
        &self.policy
    }

    pub fn renderer(&self) -> &HtmlRenderer {
        &self.renderer
    }

    /// Whether `url` should go through the preview pipeline at all.
    pub fn should_handle(&self, url: &str) -> bool {
        match Url::parse(url) {
            Ok(parsed) => self.matcher.should_handle(&parsed),
            Err(_) => false,
        }
    }

    /// Normalized metadata for `url`. Fetch failures read as no metadata.
    #[instrument(level = "debug", skip(self))]
    pub async fn data(&self, url: &str) -> Option<Metadata> {
        if self.config.cache_strategy == CacheStrategy::UseCache {
            if let Some(cached) = self.cache.get(url) {
                return Some(cached);
            }
        }

        let raw = match self.fetcher.fetch(url).await {
            Ok(metadata) => metadata,
            Err(e) => {
                e.log();
                return None;
            }
        };
        let data = Metadata {
            link: url.to_string(),
            ..raw.normalized(self.config.title_length, self.config.description_length)
        };

        if self.config.cache_strategy == CacheStrategy::UseCache {
            self.cache.set(url.to_string(), data.clone());
        }
        Some(data)
    }

    pub async fn classify(&self, url: &str) -> ContentKind {
        match self.handled(url) {
            Some(_) => match self.data(url).await {
                Some(data) => self.renderer.classifier().classify(&data),
                None => ContentKind::None,
            },
            None => ContentKind::None,
        }
    }

    /// Full preview HTML, HTTPS-rewritten per policy. `None` for unhandled
    /// URLs, failed fetches and unclassifiable content.
    pub async fn to_html(&self, url: &str) -> Option<String> {
        let parsed = self.handled(url)?;
        let data = self.data(url).await?;
        let html = self.renderer.to_html(&parsed, &data);

        #[cfg(feature = "logging")]
        crate::logging::log_render_card(
            url,
            self.renderer.classifier().classify(&data),
            html.as_deref(),
        );
        html
    }

    /// Compact list-view HTML.
    pub async fn placeholder_html(&self, url: &str) -> Option<String> {
        let parsed = self.handled(url)?;
        let data = self.data(url).await?;
        self.renderer.placeholder_html(&parsed, &data)
    }

    /// [`to_html`](Self::to_html) for many URLs; results keep input order.
    pub async fn to_html_batch(&self, urls: &[&str]) -> Vec<Option<String>> {
        stream::iter(urls.iter().copied())
            .map(|url| self.to_html(url))
            .buffered(self.config.max_concurrent_requests.max(1))
            .collect()
            .await
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    fn handled(&self, url: &str) -> Option<Url> {
        let parsed = Url::parse(url).ok()?;
        if self.matcher.should_handle(&parsed) {
            Some(parsed)
        } else {
            debug!(url = %url, "URL not handled by preview engine");
            None
        }
    }
}
