//! Persistence seams: the per-entity custom-field store and the post/topic
//! columns the image pipeline writes.

use crate::PreviewError;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

pub type TopicId = u64;
pub type PostId = u64;
pub type CategoryId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Entity {
    Topic(TopicId),
    Category(CategoryId),
}

/// Every custom field this crate reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomField {
    Thumbnails,
    AcceptedAnswerPostId,
    ListThumbnails,
    ListExcerpts,
    ListActions,
    ListCategoryBadgeMove,
    ListDefaultThumbnail,
}

impl CustomField {
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomField::Thumbnails => "thumbnails",
            CustomField::AcceptedAnswerPostId => "accepted_answer_post_id",
            CustomField::ListThumbnails => "list_thumbnails",
            CustomField::ListExcerpts => "list_excerpts",
            CustomField::ListActions => "list_actions",
            CustomField::ListCategoryBadgeMove => "list_category_badge_move",
            CustomField::ListDefaultThumbnail => "list_default_thumbnail",
        }
    }
}

/// Key-value custom fields attached to topics and categories.
///
/// `Ok(None)` means the field was never set; a stored JSON `null` comes back
/// as `Ok(Some(Value::Null))`.
#[async_trait]
pub trait CustomFieldStore: Send + Sync {
    async fn get(&self, entity: Entity, field: CustomField) -> Result<Option<Value>, PreviewError>;

    async fn set(&self, entity: Entity, field: CustomField, value: Value) -> Result<(), PreviewError>;

    /// Every entity that has `field` set, with its raw value.
    async fn entries(&self, field: CustomField) -> Result<Vec<(Entity, Value)>, PreviewError>;
}

/// Image URL columns on posts and topics.
#[async_trait]
pub trait PostStore: Send + Sync {
    async fn set_post_image_url(&self, post: PostId, url: &str) -> Result<(), PreviewError>;

    async fn set_topic_image_url(&self, topic: TopicId, url: &str) -> Result<(), PreviewError>;

    /// Rendered HTML of a post.
    async fn cooked(&self, post: PostId) -> Result<Option<String>, PreviewError>;
}

/// Process-local store backed by `DashMap`, for embedding and tests.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    fields: Arc<DashMap<(Entity, CustomField), Value>>,
    post_images: Arc<DashMap<PostId, String>>,
    topic_images: Arc<DashMap<TopicId, String>>,
    cooked: Arc<DashMap<PostId, String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn post_image_url(&self, post: PostId) -> Option<String> {
        self.post_images.get(&post).map(|v| v.clone())
    }

    pub fn topic_image_url(&self, topic: TopicId) -> Option<String> {
        self.topic_images.get(&topic).map(|v| v.clone())
    }

    pub fn insert_cooked(&self, post: PostId, html: impl Into<String>) {
        self.cooked.insert(post, html.into());
    }
}

#[async_trait]
impl CustomFieldStore for InMemoryStore {
    async fn get(&self, entity: Entity, field: CustomField) -> Result<Option<Value>, PreviewError> {
        Ok(self.fields.get(&(entity, field)).map(|v| v.clone()))
    }

    async fn set(&self, entity: Entity, field: CustomField, value: Value) -> Result<(), PreviewError> {
        self.fields.insert((entity, field), value);
        Ok(())
    }

    async fn entries(&self, field: CustomField) -> Result<Vec<(Entity, Value)>, PreviewError> {
        Ok(self
            .fields
            .iter()
            .filter(|entry| entry.key().1 == field)
            .map(|entry| (entry.key().0, entry.value().clone()))
            .collect())
    }
}

#[async_trait]
impl PostStore for InMemoryStore {
    async fn set_post_image_url(&self, post: PostId, url: &str) -> Result<(), PreviewError> {
        self.post_images.insert(post, url.to_string());
        Ok(())
    }

    async fn set_topic_image_url(&self, topic: TopicId, url: &str) -> Result<(), PreviewError> {
        self.topic_images.insert(topic, url.to_string());
        Ok(())
    }

    async fn cooked(&self, post: PostId) -> Result<Option<String>, PreviewError> {
        Ok(self.cooked.get(&post).map(|v| v.clone()))
    }
}

/// Per-category list display toggles. Read here, written elsewhere.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryListSettings {
    pub list_thumbnails: bool,
    pub list_excerpts: bool,
    pub list_actions: bool,
    pub list_category_badge_move: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_default_thumbnail: Option<String>,
}

impl CategoryListSettings {
    pub async fn load(
        store: &dyn CustomFieldStore,
        category: CategoryId,
    ) -> Result<Self, PreviewError> {
        let entity = Entity::Category(category);
        let flag = |value: Option<Value>| value.as_ref().map(as_bool).unwrap_or(false);

        Ok(Self {
            list_thumbnails: flag(store.get(entity, CustomField::ListThumbnails).await?),
            list_excerpts: flag(store.get(entity, CustomField::ListExcerpts).await?),
            list_actions: flag(store.get(entity, CustomField::ListActions).await?),
            list_category_badge_move: flag(
                store.get(entity, CustomField::ListCategoryBadgeMove).await?,
            ),
            list_default_thumbnail: store
                .get(entity, CustomField::ListDefaultThumbnail)
                .await?
                .and_then(|v| v.as_str().map(str::to_string))
                .filter(|s| !s.trim().is_empty()),
        })
    }
}

// Boolean custom fields arrive as real booleans or as "t"/"true"/"1" strings.
fn as_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => matches!(s.trim(), "t" | "true" | "1"),
        Value::Number(n) => n.as_i64() == Some(1),
        _ => false,
    }
}
