use crate::utils::{self, is_blank};
use serde::{Deserialize, Serialize};

/// Structured description of a remote resource, as produced by a
/// [`MetadataFetcher`](crate::MetadataFetcher).
///
/// Every field except `link` is optional. Records are built once per fetch and
/// treated as immutable afterwards; [`Metadata::normalized`] returns the copy
/// that classification and rendering work from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub link: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_name: Option<String>,
}

impl Metadata {
    pub fn new(link: impl Into<String>) -> Self {
        Self {
            link: link.into(),
            ..Default::default()
        }
    }

    /// Case-insensitive substring match on the `type` field.
    pub fn type_contains(&self, needle: &str) -> bool {
        self.kind
            .as_deref()
            .map(|t| t.to_ascii_lowercase().contains(needle))
            .unwrap_or(false)
    }

    pub fn has_text(&self) -> bool {
        !is_blank(self.title.as_deref()) && !is_blank(self.description.as_deref())
    }

    pub fn has_image(&self) -> bool {
        !is_blank(self.image.as_deref()) || !is_blank(self.thumbnail_url.as_deref())
    }

    pub fn has_video(&self) -> bool {
        !is_blank(self.video.as_deref())
    }

    pub fn has_html(&self) -> bool {
        !is_blank(self.html.as_deref())
    }

    /// The image or, failing that, the thumbnail URL.
    pub fn image_src(&self) -> Option<&str> {
        utils::present(self.image.as_deref()).or(utils::present(self.thumbnail_url.as_deref()))
    }

    /// Returns the rendering copy of this record: title and description are
    /// HTML-entity-decoded, then truncated on a word boundary.
    pub fn normalized(&self, title_length: usize, description_length: usize) -> Metadata {
        let mut data = self.clone();
        data.title = clean_text(self.title.as_deref(), title_length);
        data.description = clean_text(self.description.as_deref(), description_length);
        data
    }
}

fn clean_text(value: Option<&str>, max_chars: usize) -> Option<String> {
    match value {
        Some(v) if !v.trim().is_empty() => {
            let decoded = html_escape::decode_html_entities(v.trim());
            Some(utils::truncate_words(&decoded, max_chars))
        }
        other => other.map(str::to_string),
    }
}
