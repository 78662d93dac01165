//! Link preview engine for forum topic lists.
//!
//! URLs found in posts are gated by a [`UrlMatcher`], described by a
//! [`MetadataFetcher`], classified by a [`Classifier`] and rendered by an
//! [`HtmlRenderer`], all sharing one [`HostPolicy`]. Topic list thumbnails are
//! computed and cached by a [`ThumbnailManager`].

mod cache;
mod classifier;
mod config;
mod downloader;
mod engine;
mod error;
mod extractor;
mod fetcher;
#[cfg(feature = "logging")]
mod logging;
mod matcher;
mod metadata;
mod policy;
mod post_processor;
mod renderer;
mod store;
mod thumbnails;
mod topic_list;
mod utils;

pub use cache::Cache;
pub use classifier::{
    is_article, is_embedded, is_image, is_video, Classifier, ContentKind, PlaceholderStyle,
};
pub use config::SiteSettings;
pub use downloader::{DownloadedImage, ImageDownloader};
pub use engine::{CacheStrategy, EngineConfig, PreviewEngine, MAX_CONCURRENT_REQUESTS};
pub use error::PreviewError;
pub use extractor::{ExtractedPage, MetadataExtractor, OEmbedResponse};
pub use fetcher::{Fetcher, FetcherConfig, MetadataFetcher, DEFAULT_MAX_BODY_SIZE};
#[cfg(feature = "logging")]
pub use logging::{
    log_error_card, log_render_card, log_thumbnail_card, setup_logging, LogConfig, LogLevelGuard,
};
pub use matcher::{probable_blog_post, probable_discussion, UrlMatcher};
pub use metadata::Metadata;
pub use policy::{
    host_matches, url_host_matches, HostPolicy, DEFAULT_ALLOWLIST, DEFAULT_HTML_PROVIDERS,
    DEFAULT_HTTPS_HOSTS,
};
pub use post_processor::{PostImageProcessor, PostRef, MAX_IMAGE_URL_LENGTH};
pub use renderer::{
    embedded_html, image_html, video_html, ArticleLayout, DefaultArticleLayout, HtmlRenderer,
};
pub use store::{
    CategoryId, CategoryListSettings, CustomField, CustomFieldStore, Entity, InMemoryStore, PostId,
    PostStore, TopicId,
};
pub use thumbnails::{
    migrate_null_thumbnails, AssetResolver, ImageRef, ThumbnailManager, ThumbnailPair,
    ThumbnailService,
};
pub use topic_list::{
    excerpt, Archetype, TopicListEntry, TopicListSerializer, TopicSummary, EXCERPT_IMAGE_MARKER,
};
