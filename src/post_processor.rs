use crate::config::SiteSettings;
use crate::downloader::ImageDownloader;
use crate::store::{PostId, PostStore, TopicId};
use crate::thumbnails::{ImageRef, ThumbnailManager, ThumbnailPair};
use crate::PreviewError;
use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, instrument};
use url::Url;

// Uploads embed their SHA1 in the stored path
static UPLOAD_SHA1: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[a-z0-9]{40,}").expect("sha1 pattern is valid"));

/// Longest image URL stored on a post or topic row.
pub const MAX_IMAGE_URL_LENGTH: usize = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostRef {
    pub id: PostId,
    pub topic_id: TopicId,
    pub is_first_post: bool,
}

/// Picks up the first image of a freshly cooked post and turns it into the
/// topic's list thumbnails.
#[derive(Clone)]
pub struct PostImageProcessor {
    settings: SiteSettings,
    base_url: Url,
    posts: Arc<dyn PostStore>,
    thumbnails: ThumbnailManager,
    downloader: ImageDownloader,
}

impl PostImageProcessor {
    pub fn new(
        settings: SiteSettings,
        base_url: Url,
        posts: Arc<dyn PostStore>,
        thumbnails: ThumbnailManager,
        downloader: ImageDownloader,
    ) -> Self {
        Self {
            settings,
            base_url,
            posts,
            thumbnails,
            downloader,
        }
    }

    /// Records `image_src` as the post's image (and the topic's, for first
    /// posts), then builds topic thumbnails unless hotlinking is on.
    ///
    /// Returns the new thumbnails when any were computed.
    #[instrument(level = "debug", skip(self))]
    pub async fn update_post_image(
        &self,
        post: PostRef,
        image_src: Option<&str>,
    ) -> Result<Option<ThumbnailPair>, PreviewError> {
        let Some(src) = image_src.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(None);
        };
        let stored: String = src.chars().take(MAX_IMAGE_URL_LENGTH).collect();

        self.posts.set_post_image_url(post.id, &stored).await?;
        if !post.is_first_post {
            return Ok(None);
        }

        self.posts.set_topic_image_url(post.topic_id, &stored).await?;
        if self.settings.topic_list_hotlink_thumbnails {
            debug!(topic = post.topic_id, "Hotlinking enabled, skipping thumbnail generation");
            return Ok(None);
        }

        self.create_topic_thumbnails(post.topic_id, src)
            .await
            .map(Some)
    }

    pub async fn create_topic_thumbnails(
        &self,
        topic: TopicId,
        url: &str,
    ) -> Result<ThumbnailPair, PreviewError> {
        let image = if self.is_local(url) {
            self.local_image(url).await
        } else {
            self.linked_image(url).await
        };
        info!(topic = topic, image = ?image.as_ref().map(|i| i.id), "Creating topic thumbnails");

        self.thumbnails
            .get_or_create_thumbnails(topic, image.as_ref(), url)
            .await
    }

    /// Path-relative URLs and URLs on the site's own host. Protocol-relative
    /// URLs (`//host/path`) are compared by host like absolute ones.
    pub fn is_local(&self, url: &str) -> bool {
        let url = url.trim();
        let parsed = if url.starts_with("//") {
            self.base_url.join(url)
        } else {
            Url::parse(url)
        };

        match parsed {
            Ok(parsed) => parsed.host_str() == self.base_url.host_str(),
            Err(url::ParseError::RelativeUrlWithoutBase) => true,
            Err(_) => false,
        }
    }

    async fn local_image(&self, url: &str) -> Option<ImageRef> {
        let sha1 = UPLOAD_SHA1.find(url)?.as_str();
        match self.thumbnails.assets().find_by_sha1(sha1).await {
            Ok(image) => image,
            Err(e) => {
                e.log();
                None
            }
        }
    }

    /// Downloads and imports a remote image. Oversized or failed downloads
    /// mean no image.
    async fn linked_image(&self, url: &str) -> Option<ImageRef> {
        let target = self
            .base_url
            .join(url.trim())
            .map(String::from)
            .unwrap_or_else(|_| url.to_string());
        let downloaded = match self.downloader.download(&target).await {
            Ok(image) => image,
            Err(e) => {
                e.log();
                return None;
            }
        };
        debug!(url = %url, file = %downloaded.filename, "Downloaded linked image");

        match self.thumbnails.assets().import(downloaded).await {
            Ok(image) => Some(image),
            Err(e) => {
                e.log();
                None
            }
        }
    }
}
