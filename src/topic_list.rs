use crate::config::SiteSettings;
use crate::store::{CustomField, CustomFieldStore, Entity, PostId, PostStore, TopicId};
use crate::thumbnails::{ThumbnailManager, ThumbnailPair};
use crate::utils::truncate_words;
use crate::PreviewError;
use scraper::{Html, Node};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Marker left in excerpts where an image used to be.
pub const EXCERPT_IMAGE_MARKER: &str = "[image]";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Archetype {
    #[default]
    Regular,
    PrivateMessage,
    Banner,
}

/// Topic columns the list view needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicSummary {
    pub id: TopicId,
    pub archetype: Archetype,
    pub image_url: Option<String>,
    pub first_post_id: Option<PostId>,
}

/// List-view fields added to each topic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TopicListEntry {
    pub id: TopicId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnails: Option<ThumbnailPair>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic_post_id: Option<PostId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
}

#[derive(Clone)]
pub struct TopicListSerializer {
    settings: SiteSettings,
    fields: Arc<dyn CustomFieldStore>,
    posts: Arc<dyn PostStore>,
    thumbnails: ThumbnailManager,
}

impl TopicListSerializer {
    pub fn new(
        settings: SiteSettings,
        fields: Arc<dyn CustomFieldStore>,
        posts: Arc<dyn PostStore>,
        thumbnails: ThumbnailManager,
    ) -> Self {
        Self {
            settings,
            fields,
            posts,
            thumbnails,
        }
    }

    pub async fn serialize(&self, topic: &TopicSummary) -> Result<TopicListEntry, PreviewError> {
        let thumbnails = self
            .thumbnails(topic)
            .await
            .filter(ThumbnailPair::is_present);
        let topic_post_id = self.topic_post_id(topic).await?;
        let excerpt = match topic_post_id {
            Some(post) => self.excerpt(post).await?,
            None => None,
        };

        Ok(TopicListEntry {
            id: topic.id,
            thumbnails,
            topic_post_id,
            excerpt,
        })
    }

    /// Thumbnails for regular topics: the raw image URL when hotlinking,
    /// otherwise the cached (or backfilled) pair.
    pub async fn thumbnails(&self, topic: &TopicSummary) -> Option<ThumbnailPair> {
        if topic.archetype != Archetype::Regular {
            return None;
        }

        if self.settings.topic_list_hotlink_thumbnails {
            let url = topic.image_url.clone().unwrap_or_default();
            return Some(ThumbnailPair::same(url));
        }

        Some(
            self.thumbnails
                .thumbnails_for(topic.id, topic.image_url.as_deref())
                .await,
        )
    }

    pub async fn include_thumbnails(&self, topic: &TopicSummary) -> bool {
        self.thumbnails(topic)
            .await
            .is_some_and(|pair| pair.is_present())
    }

    /// The accepted answer when there is one, else the first post.
    pub async fn topic_post_id(&self, topic: &TopicSummary) -> Result<Option<PostId>, PreviewError> {
        let accepted = self
            .fields
            .get(Entity::Topic(topic.id), CustomField::AcceptedAnswerPostId)
            .await?
            .and_then(|v| match v {
                serde_json::Value::Number(n) => n.as_u64(),
                serde_json::Value::String(s) => s.trim().parse::<u64>().ok(),
                _ => None,
            })
            .filter(|id| *id > 0);

        Ok(accepted.or(topic.first_post_id))
    }

    pub async fn excerpt(&self, post: PostId) -> Result<Option<String>, PreviewError> {
        let cooked = self.posts.cooked(post).await?;
        Ok(cooked
            .map(|html| excerpt(&html, self.settings.topic_list_excerpt_length))
            .filter(|text| !text.is_empty()))
    }
}

/// Plain-text excerpt of cooked post HTML. Images disappear, emoji keep their
/// alt text, and the result is cut to `max_chars` on a word boundary.
pub fn excerpt(cooked: &str, max_chars: usize) -> String {
    let fragment = Html::parse_fragment(cooked);
    let mut text = String::new();

    for node in fragment.tree.root().descendants() {
        match node.value() {
            Node::Text(t) => text.push_str(t),
            Node::Element(el) if el.name() == "img" => {
                let is_emoji = el.classes().any(|c| c == "emoji");
                match el.attr("alt") {
                    Some(alt) if is_emoji => text.push_str(alt),
                    _ => text.push_str(EXCERPT_IMAGE_MARKER),
                }
            }
            Node::Element(el) if matches!(el.name(), "p" | "br" | "li" | "div") => {
                text.push(' ')
            }
            _ => {}
        }
    }

    let collapsed = text
        .replace(EXCERPT_IMAGE_MARKER, "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    truncate_words(&collapsed, max_chars)
}
