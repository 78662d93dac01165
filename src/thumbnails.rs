//! Topic-list thumbnail cache.
//!
//! Each topic owns at most one stored [`ThumbnailPair`] in its `thumbnails`
//! custom field. Pairs are computed on first use through a
//! [`ThumbnailService`] and then trusted until a newer computation for the
//! same topic overwrites them.

use crate::downloader::DownloadedImage;
use crate::store::{CustomField, CustomFieldStore, Entity, TopicId};
use crate::PreviewError;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Normal and retina (2x) thumbnail URLs for one topic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThumbnailPair {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub normal: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub retina: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl ThumbnailPair {
    pub fn new(normal: impl Into<String>, retina: impl Into<String>) -> Self {
        Self {
            normal: normal.into(),
            retina: retina.into(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Both slots pointing at the same URL.
    pub fn same(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            retina: url.clone(),
            normal: url,
        }
    }

    pub fn is_present(&self) -> bool {
        !self.normal.trim().is_empty()
    }

    /// Normalizes a stored field value: a JSON-encoded string, a mapping, or
    /// a legacy one-element list holding a mapping.
    pub fn from_stored(value: &Value) -> Option<Self> {
        let decoded;
        let mut value = value;
        if let Value::String(raw) = value {
            decoded = serde_json::from_str::<Value>(raw).ok()?;
            value = &decoded;
        }
        if let Value::Array(items) = value {
            value = items.first()?;
        }
        match value {
            Value::Object(_) => serde_json::from_value(value.clone()).ok(),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!({ "normal": self.normal, "retina": self.retina })
    }
}

/// Opaque handle to an uploaded image asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageRef {
    pub id: u64,
    pub url: String,
}

/// Generates resized copies of uploaded images.
#[async_trait]
pub trait ThumbnailService: Send + Sync {
    async fn exists(&self, image: &ImageRef, width: u32, height: u32) -> bool;

    async fn create(&self, image: &ImageRef, width: u32, height: u32) -> Result<(), PreviewError>;

    async fn url_of(&self, image: &ImageRef, width: u32, height: u32) -> String;
}

/// Maps image URLs and downloads onto uploaded assets.
#[async_trait]
pub trait AssetResolver: Send + Sync {
    /// Existing asset served at `image_url`, if any.
    async fn resolve(&self, image_url: &str) -> Result<Option<ImageRef>, PreviewError>;

    async fn find_by_sha1(&self, sha1: &str) -> Result<Option<ImageRef>, PreviewError>;

    /// Stores a downloaded image as a new asset.
    async fn import(&self, image: DownloadedImage) -> Result<ImageRef, PreviewError>;
}

/// Computes, stores and serves topic thumbnail pairs.
#[derive(Clone)]
pub struct ThumbnailManager {
    store: Arc<dyn CustomFieldStore>,
    service: Arc<dyn ThumbnailService>,
    assets: Arc<dyn AssetResolver>,
    width: u32,
    height: u32,
    locks: Arc<DashMap<TopicId, Arc<Mutex<()>>>>,
}

impl ThumbnailManager {
    pub fn new(
        store: Arc<dyn CustomFieldStore>,
        service: Arc<dyn ThumbnailService>,
        assets: Arc<dyn AssetResolver>,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            store,
            service,
            assets,
            width,
            height,
            locks: Arc::new(DashMap::new()),
        }
    }

    pub fn assets(&self) -> &Arc<dyn AssetResolver> {
        &self.assets
    }

    /// Builds the pair for `image` at the configured size and its 2x retina
    /// size, stores it over whatever the topic had, and returns it. Without an
    /// image both slots are `original_url`.
    #[instrument(level = "debug", skip(self, image))]
    pub async fn get_or_create_thumbnails(
        &self,
        topic: TopicId,
        image: Option<&ImageRef>,
        original_url: &str,
    ) -> Result<ThumbnailPair, PreviewError> {
        let lock = self.topic_lock(topic);
        let result = {
            let _guard = lock.lock().await;
            let pair = self.compute_pair(image, original_url).await;
            self.save_thumbnails(topic, &pair).await.map(|_| pair)
        };
        self.release_topic_lock(topic, lock);

        let pair = result?;
        debug!(topic = topic, normal = %pair.normal, "Stored topic thumbnails");
        #[cfg(feature = "logging")]
        crate::logging::log_thumbnail_card(topic, &pair);
        Ok(pair)
    }

    async fn compute_pair(&self, image: Option<&ImageRef>, original_url: &str) -> ThumbnailPair {
        match image {
            Some(image) => ThumbnailPair {
                normal: self
                    .thumbnail_url(image, self.width, self.height, original_url)
                    .await,
                retina: self
                    .thumbnail_url(
                        image,
                        self.width.saturating_mul(2),
                        self.height.saturating_mul(2),
                        original_url,
                    )
                    .await,
            },
            None => ThumbnailPair::same(original_url),
        }
    }

    /// URL of the `width`x`height` thumbnail of `image`, creating it when
    /// missing. Falls back to `original_url` when no thumbnail can be made.
    pub async fn thumbnail_url(
        &self,
        image: &ImageRef,
        width: u32,
        height: u32,
        original_url: &str,
    ) -> String {
        if !self.service.exists(image, width, height).await {
            if let Err(e) = self.service.create(image, width, height).await {
                warn!(image = image.id, width = width, height = height, error = %e, "Thumbnail creation failed");
            }
        }

        if self.service.exists(image, width, height).await {
            self.service.url_of(image, width, height).await
        } else {
            original_url.to_string()
        }
    }

    pub async fn save_thumbnails(
        &self,
        topic: TopicId,
        pair: &ThumbnailPair,
    ) -> Result<(), PreviewError> {
        self.store
            .set(Entity::Topic(topic), CustomField::Thumbnails, pair.to_value())
            .await
    }

    /// The stored pair, if it normalizes. Store failures read as a miss.
    pub async fn get_thumbnails(&self, topic: TopicId) -> Option<ThumbnailPair> {
        let stored = match self
            .store
            .get(Entity::Topic(topic), CustomField::Thumbnails)
            .await
        {
            Ok(stored) => stored?,
            Err(e) => {
                e.log();
                return None;
            }
        };

        let pair = ThumbnailPair::from_stored(&stored);
        if pair.is_none() && !stored.is_null() {
            warn!(topic = topic, "Stored thumbnails have an unexpected shape, recomputing");
        }
        pair
    }

    /// Backfill from the topic's flat image URL. The URL is resolved to an
    /// asset when possible; otherwise the URL itself (or nothing) is used.
    /// A failed store write is logged and the computed pair still returned.
    #[instrument(level = "debug", skip(self))]
    pub async fn thumbnails_from_image_url(
        &self,
        topic: TopicId,
        image_url: Option<&str>,
    ) -> ThumbnailPair {
        let lock = self.topic_lock(topic);
        let pair = {
            let _guard = lock.lock().await;
            self.backfill_locked(topic, image_url).await
        };
        self.release_topic_lock(topic, lock);
        pair
    }

    async fn backfill_locked(&self, topic: TopicId, image_url: Option<&str>) -> ThumbnailPair {
        // Another request may have filled the cache while we waited
        if let Some(pair) = self.get_thumbnails(topic).await {
            return pair;
        }

        let image_url = image_url.map(str::trim).filter(|u| !u.is_empty());
        let image = match image_url {
            Some(url) => match self.assets.resolve(url).await {
                Ok(image) => image,
                Err(e) => {
                    debug!(url = %url, error = %e, "No asset for topic image");
                    None
                }
            },
            None => None,
        };

        let pair = self
            .compute_pair(image.as_ref(), image_url.unwrap_or_default())
            .await;
        match self.save_thumbnails(topic, &pair).await {
            Ok(()) => debug!(topic = topic, normal = %pair.normal, "Backfilled topic thumbnails"),
            Err(e) => {
                warn!(topic = topic, error = %e, "Could not store backfilled thumbnails, serving them unsaved");
            }
        }
        #[cfg(feature = "logging")]
        crate::logging::log_thumbnail_card(topic, &pair);
        pair
    }

    /// Read-through entry point for list rendering: the stored pair, or a
    /// backfilled one. Never fails.
    pub async fn thumbnails_for(&self, topic: TopicId, image_url: Option<&str>) -> ThumbnailPair {
        match self.get_thumbnails(topic).await {
            Some(pair) => pair,
            None => self.thumbnails_from_image_url(topic, image_url).await,
        }
    }

    fn topic_lock(&self, topic: TopicId) -> Arc<Mutex<()>> {
        self.locks.entry(topic).or_default().clone()
    }

    // Drops the topic's lock entry once no other task holds a handle to it
    fn release_topic_lock(&self, topic: TopicId, lock: Arc<Mutex<()>>) {
        drop(lock);
        self.locks
            .remove_if(&topic, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Rewrites every stored `null` thumbnails value as an empty pair. Returns the
/// number of topics migrated.
pub async fn migrate_null_thumbnails(store: &dyn CustomFieldStore) -> Result<usize, PreviewError> {
    let mut migrated = 0;
    for (entity, value) in store.entries(CustomField::Thumbnails).await? {
        if value.is_null() {
            store
                .set(entity, CustomField::Thumbnails, ThumbnailPair::empty().to_value())
                .await?;
            migrated += 1;
        }
    }

    if migrated > 0 {
        info!(count = migrated, "Migrated null topic thumbnails");
    }
    Ok(migrated)
}
