#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use topic_preview::{
    AssetResolver, CustomField, CustomFieldStore, DownloadedImage, Entity, ImageRef,
    InMemoryStore, Metadata, MetadataFetcher, PreviewError, ThumbnailManager, ThumbnailService,
};
use serde_json::Value;

/// Serves canned metadata and counts fetches.
#[derive(Default)]
pub struct StaticFetcher {
    records: HashMap<String, Metadata>,
    pub calls: AtomicUsize,
}

impl StaticFetcher {
    pub fn with(mut self, metadata: Metadata) -> Self {
        self.records.insert(metadata.link.clone(), metadata);
        self
    }
}

#[async_trait]
impl MetadataFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<Metadata, PreviewError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.records
            .get(url)
            .cloned()
            .ok_or_else(|| PreviewError::FetchError(format!("no record for {url}")))
    }
}

/// Thumbnail service whose `create` can be made to fail.
#[derive(Default)]
pub struct FakeThumbnails {
    made: Mutex<HashSet<(u64, u32, u32)>>,
    pub fail_creates: bool,
    pub creates: AtomicUsize,
}

impl FakeThumbnails {
    pub fn failing() -> Self {
        Self {
            fail_creates: true,
            ..Default::default()
        }
    }

    pub fn preload(&self, image: u64, width: u32, height: u32) {
        self.made.lock().unwrap().insert((image, width, height));
    }
}

#[async_trait]
impl ThumbnailService for FakeThumbnails {
    async fn exists(&self, image: &ImageRef, width: u32, height: u32) -> bool {
        self.made.lock().unwrap().contains(&(image.id, width, height))
    }

    async fn create(&self, image: &ImageRef, width: u32, height: u32) -> Result<(), PreviewError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        if self.fail_creates {
            return Err(PreviewError::ExternalServiceError {
                service: "thumbnails".into(),
                message: "resize failed".into(),
            });
        }
        self.made.lock().unwrap().insert((image.id, width, height));
        Ok(())
    }

    async fn url_of(&self, image: &ImageRef, width: u32, height: u32) -> String {
        format!("https://forum.example.com/thumbs/{}_{}x{}.png", image.id, width, height)
    }
}

/// Asset table keyed by URL and SHA1.
#[derive(Default)]
pub struct FakeAssets {
    by_url: Mutex<HashMap<String, ImageRef>>,
    by_sha1: Mutex<HashMap<String, ImageRef>>,
    next_id: AtomicU64,
    pub resolves: AtomicUsize,
    pub imported: Mutex<Vec<DownloadedImage>>,
}

impl FakeAssets {
    pub fn add(&self, id: u64, url: &str, sha1: &str) -> ImageRef {
        let image = ImageRef {
            id,
            url: url.to_string(),
        };
        self.by_url.lock().unwrap().insert(url.to_string(), image.clone());
        self.by_sha1.lock().unwrap().insert(sha1.to_string(), image.clone());
        image
    }
}

#[async_trait]
impl AssetResolver for FakeAssets {
    async fn resolve(&self, image_url: &str) -> Result<Option<ImageRef>, PreviewError> {
        self.resolves.fetch_add(1, Ordering::SeqCst);
        if image_url.contains("broken") {
            return Err(PreviewError::StoreError("lookup failed".into()));
        }
        Ok(self.by_url.lock().unwrap().get(image_url).cloned())
    }

    async fn find_by_sha1(&self, sha1: &str) -> Result<Option<ImageRef>, PreviewError> {
        Ok(self.by_sha1.lock().unwrap().get(sha1).cloned())
    }

    async fn import(&self, image: DownloadedImage) -> Result<ImageRef, PreviewError> {
        let id = 1000 + self.next_id.fetch_add(1, Ordering::SeqCst);
        let stored = ImageRef {
            id,
            url: format!("https://forum.example.com/uploads/{}", image.filename),
        };
        self.imported.lock().unwrap().push(image);
        Ok(stored)
    }
}

/// Field store that reads as empty and rejects every write.
#[derive(Default)]
pub struct ReadOnlyStore;

#[async_trait]
impl CustomFieldStore for ReadOnlyStore {
    async fn get(&self, _: Entity, _: CustomField) -> Result<Option<Value>, PreviewError> {
        Ok(None)
    }

    async fn set(&self, _: Entity, _: CustomField, _: Value) -> Result<(), PreviewError> {
        Err(PreviewError::StoreError("store is read-only".into()))
    }

    async fn entries(&self, _: CustomField) -> Result<Vec<(Entity, Value)>, PreviewError> {
        Ok(Vec::new())
    }
}

pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub service: Arc<FakeThumbnails>,
    pub assets: Arc<FakeAssets>,
    pub manager: ThumbnailManager,
}

pub fn harness_with(service: FakeThumbnails) -> Harness {
    let store = Arc::new(InMemoryStore::new());
    let service = Arc::new(service);
    let assets = Arc::new(FakeAssets::default());
    let manager = ThumbnailManager::new(store.clone(), service.clone(), assets.clone(), 100, 50);
    Harness {
        store,
        service,
        assets,
        manager,
    }
}

pub fn harness() -> Harness {
    harness_with(FakeThumbnails::default())
}
