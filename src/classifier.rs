use crate::metadata::Metadata;
use crate::policy::HostPolicy;
use serde::Serialize;

/// What a metadata record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Article,
    Image,
    Video,
    EmbeddedWidget,
    None,
}

/// Which renderer the compact list view should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    Article,
    Image,
    /// Fall through to the full renderer.
    Full,
}

type Predicate = fn(&Metadata, &HostPolicy) -> bool;

struct Rule {
    kind: ContentKind,
    applies: Predicate,
}

/// Full-render precedence, evaluated top to bottom; first match wins.
const RULES: &[Rule] = &[
    Rule {
        kind: ContentKind::Article,
        applies: article_rule,
    },
    Rule {
        kind: ContentKind::Image,
        applies: image_rule,
    },
    Rule {
        kind: ContentKind::Video,
        applies: video_rule,
    },
    Rule {
        kind: ContentKind::EmbeddedWidget,
        applies: is_embedded,
    },
];

fn article_rule(m: &Metadata, _: &HostPolicy) -> bool {
    is_article(m)
}

fn image_rule(m: &Metadata, _: &HostPolicy) -> bool {
    is_image(m)
}

fn video_rule(m: &Metadata, _: &HostPolicy) -> bool {
    is_video(m)
}

pub fn is_article(m: &Metadata) -> bool {
    m.type_contains("article") && m.has_text()
}

pub fn is_image(m: &Metadata) -> bool {
    (m.type_contains("photo") || m.type_contains("image"))
        && !m.type_contains("photostream")
        && m.has_image()
}

pub fn is_video(m: &Metadata) -> bool {
    m.type_contains("video") && m.has_video()
}

pub fn is_embedded(m: &Metadata, policy: &HostPolicy) -> bool {
    match m.html.as_deref() {
        Some(html) if m.has_html() => {
            html.contains("<iframe") || policy.prefers_html(m.provider_name.as_deref())
        }
        _ => false,
    }
}

#[derive(Debug, Clone)]
pub struct Classifier {
    policy: HostPolicy,
}

impl Classifier {
    pub fn new(policy: HostPolicy) -> Self {
        Self { policy }
    }

    pub fn classify(&self, metadata: &Metadata) -> ContentKind {
        RULES
            .iter()
            .find(|rule| (rule.applies)(metadata, &self.policy))
            .map(|rule| rule.kind)
            .unwrap_or(ContentKind::None)
    }

    /// Placeholder precedence for compact list rendering. Records with an
    /// image prefer the image even when they are videos.
    pub fn placeholder_style(&self, metadata: &Metadata) -> PlaceholderStyle {
        if is_article(metadata) {
            PlaceholderStyle::Article
        } else if metadata.has_image() && (is_video(metadata) || is_image(metadata)) {
            PlaceholderStyle::Image
        } else if metadata.has_text() && is_embedded(metadata, &self.policy) {
            PlaceholderStyle::Article
        } else {
            PlaceholderStyle::Full
        }
    }
}
