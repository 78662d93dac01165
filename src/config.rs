use crate::PreviewError;
use serde::Deserialize;

/// Site-wide settings consulted by the thumbnail and list pipelines.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SiteSettings {
    pub topic_list_thumbnail_width: u32,
    pub topic_list_thumbnail_height: u32,
    pub topic_list_excerpt_length: usize,
    /// Largest linked image that will be downloaded for thumbnailing
    pub max_image_size_kb: usize,
    /// Use remote image URLs directly instead of generating thumbnails
    pub topic_list_hotlink_thumbnails: bool,
    pub title_length: usize,
    pub description_length: usize,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            topic_list_thumbnail_width: 200,
            topic_list_thumbnail_height: 200,
            topic_list_excerpt_length: 250,
            max_image_size_kb: 4096,
            topic_list_hotlink_thumbnails: false,
            title_length: 150,
            description_length: 250,
        }
    }
}

impl SiteSettings {
    /// Missing keys keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, PreviewError> {
        serde_json::from_str(json)
            .map_err(|e| PreviewError::ConfigError(format!("site settings: {e}")))
    }

    pub fn max_image_size_bytes(&self) -> usize {
        self.max_image_size_kb * 1024
    }

    pub fn with_thumbnail_size(mut self, width: u32, height: u32) -> Self {
        self.topic_list_thumbnail_width = width;
        self.topic_list_thumbnail_height = height;
        self
    }

    pub fn with_excerpt_length(mut self, length: usize) -> Self {
        self.topic_list_excerpt_length = length;
        self
    }

    pub fn with_max_image_size_kb(mut self, kb: usize) -> Self {
        self.max_image_size_kb = kb;
        self
    }

    pub fn with_hotlink_thumbnails(mut self, hotlink: bool) -> Self {
        self.topic_list_hotlink_thumbnails = hotlink;
        self
    }
}
