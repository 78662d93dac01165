use crate::utils::{self, is_blank};
use crate::{Metadata, PreviewError};
use scraper::{Html, Selector};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;
use url::Url;

/// JSON oEmbed document as returned by a provider endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OEmbedResponse {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub width: Option<serde_json::Value>,
    #[serde(default)]
    pub height: Option<serde_json::Value>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub thumbnail_width: Option<serde_json::Value>,
    #[serde(default)]
    pub thumbnail_height: Option<serde_json::Value>,
    #[serde(default)]
    pub provider_name: Option<String>,
}

/// What the page itself told us, plus where to find its oEmbed document.
#[derive(Debug, Clone)]
pub struct ExtractedPage {
    pub metadata: Metadata,
    pub oembed_url: Option<String>,
}

/// Metadata extractor, responsible for reading Open Graph and Twitter card
/// tags out of webpage content
#[derive(Clone)]
pub struct MetadataExtractor;

impl Default for MetadataExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, html: &str, url: &str) -> Result<ExtractedPage, PreviewError> {
        let base = Url::parse(url)?;
        let document = Html::parse_document(html);
        let tags = self.collect_meta_tags(&document)?;
        let get = |keys: &[&str]| -> Option<String> {
            keys.iter()
                .filter_map(|k| tags.get(*k))
                .find(|v| !v.trim().is_empty())
                .map(|v| v.trim().to_string())
        };

        let title = get(&["og:title", "twitter:title"]).or_else(|| self.extract_title(&document));
        let image = get(&[
            "og:image",
            "og:image:url",
            "og:image:secure_url",
            "twitter:image",
            "twitter:image:src",
        ])
        .map(|src| utils::absolutize(&base, &src));
        let video = get(&["og:video:secure_url", "og:video:url", "og:video"])
            .map(|src| utils::absolutize(&base, &src));

        let metadata = Metadata {
            link: url.to_string(),
            kind: get(&["og:type"]),
            title,
            description: get(&["og:description", "twitter:description", "description"]),
            image,
            image_width: get(&["og:image:width"]).as_deref().and_then(parse_dimension),
            image_height: get(&["og:image:height"]).as_deref().and_then(parse_dimension),
            video,
            video_type: get(&["og:video:type"]),
            video_width: get(&["og:video:width"]).as_deref().and_then(parse_dimension),
            video_height: get(&["og:video:height"]).as_deref().and_then(parse_dimension),
            provider_name: get(&["og:site_name"]),
            ..Metadata::new(url)
        };

        let oembed_url = self
            .extract_oembed_link(&document)
            .map(|href| utils::absolutize(&base, &href));

        debug!(
            url = %url,
            kind = ?metadata.kind,
            has_oembed = oembed_url.is_some(),
            "Extracted page metadata"
        );

        Ok(ExtractedPage {
            metadata,
            oembed_url,
        })
    }

    /// Folds an oEmbed document into page metadata. The provider's `html` and
    /// `provider_name` win; everything else only fills gaps.
    pub fn merge_oembed(&self, metadata: &mut Metadata, oembed: &OEmbedResponse) {
        if !is_blank(oembed.html.as_deref()) {
            metadata.html = oembed.html.clone();
        }
        if !is_blank(oembed.provider_name.as_deref()) {
            metadata.provider_name = oembed.provider_name.clone();
        }
        if is_blank(metadata.kind.as_deref()) {
            metadata.kind = oembed.kind.clone();
        }
        if is_blank(metadata.title.as_deref()) {
            metadata.title = oembed.title.clone();
        }
        if is_blank(metadata.thumbnail_url.as_deref()) {
            metadata.thumbnail_url = oembed.thumbnail_url.clone();
            metadata.thumbnail_width = oembed.thumbnail_width.as_ref().and_then(json_dimension);
            metadata.thumbnail_height = oembed.thumbnail_height.as_ref().and_then(json_dimension);
        }

        let is_photo = oembed.kind.as_deref() == Some("photo");
        if is_photo && is_blank(metadata.image.as_deref()) && !is_blank(oembed.url.as_deref()) {
            metadata.image = oembed.url.clone();
            metadata.image_width = oembed.width.as_ref().and_then(json_dimension);
            metadata.image_height = oembed.height.as_ref().and_then(json_dimension);
        }
    }

    fn collect_meta_tags(&self, document: &Html) -> Result<HashMap<String, String>, PreviewError> {
        let selector = Selector::parse("meta[content]")
            .map_err(|e| PreviewError::ExtractError(format!("Invalid selector: {}", e)))?;

        let mut tags = HashMap::new();
        for el in document.select(&selector) {
            let key = el
                .value()
                .attr("property")
                .or_else(|| el.value().attr("name"));
            if let (Some(key), Some(content)) = (key, el.value().attr("content")) {
                tags.entry(key.trim().to_ascii_lowercase())
                    .or_insert_with(|| content.to_string());
            }
        }
        Ok(tags)
    }

    fn extract_title(&self, document: &Html) -> Option<String> {
        let title_selector = Selector::parse("title").ok()?;

        document
            .select(&title_selector)
            .next()
            .map(|el| el.text().collect::<String>())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn extract_oembed_link(&self, document: &Html) -> Option<String> {
        let selector = Selector::parse("link[type='application/json+oembed']").ok()?;

        document
            .select(&selector)
            .next()
            .and_then(|el| el.value().attr("href"))
            .map(|s| s.trim().to_string())
    }
}

fn parse_dimension(value: &str) -> Option<u32> {
    let value = value.trim().trim_end_matches("px");
    value
        .parse::<u32>()
        .ok()
        .or_else(|| value.parse::<f64>().ok().filter(|v| *v >= 0.0).map(|v| v as u32))
}

fn json_dimension(value: &serde_json::Value) -> Option<u32> {
    match value {
        serde_json::Value::Number(n) => n.as_u64().map(|v| v as u32),
        serde_json::Value::String(s) => parse_dimension(s),
        _ => None,
    }
}
