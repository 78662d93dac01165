use crate::classifier::{Classifier, ContentKind, PlaceholderStyle};
use crate::metadata::Metadata;
use crate::policy::HostPolicy;
use crate::PreviewError;
use html_escape::{encode_double_quoted_attribute as attr, encode_text};
use lol_html::{element, rewrite_str, RewriteStrSettings};
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Template collaborator used for article-style previews.
pub trait ArticleLayout: Send + Sync {
    fn render(&self, data: &Metadata) -> String;
}

/// Header / image / title / description card.
#[derive(Debug, Clone, Default)]
pub struct DefaultArticleLayout;

impl ArticleLayout for DefaultArticleLayout {
    fn render(&self, data: &Metadata) -> String {
        let link = attr(&data.link);
        let source = Url::parse(&data.link)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| data.link.clone());

        let mut html = String::new();
        html.push_str("<aside class=\"onebox allowlistedgeneric\">");
        html.push_str(&format!(
            "<header class=\"source\"><a href=\"{link}\" target=\"_blank\" rel=\"noopener\">{}</a></header>",
            encode_text(&source)
        ));
        html.push_str("<article class=\"onebox-body\">");
        if let Some(src) = data.image_src() {
            html.push_str(&format!("<img src=\"{}\" class=\"thumbnail\">", attr(src)));
        }
        if let Some(title) = data.title.as_deref() {
            html.push_str(&format!(
                "<h3><a href=\"{link}\" target=\"_blank\" rel=\"noopener\">{}</a></h3>",
                encode_text(title)
            ));
        }
        if let Some(description) = data.description.as_deref() {
            html.push_str(&format!("<p>{}</p>", encode_text(description)));
        }
        html.push_str("</article></aside>");
        html
    }
}

/// Turns a classified metadata record into a bounded HTML fragment.
#[derive(Clone)]
pub struct HtmlRenderer {
    policy: HostPolicy,
    classifier: Classifier,
    layout: Arc<dyn ArticleLayout>,
}

impl HtmlRenderer {
    pub fn new(policy: HostPolicy) -> Self {
        Self::with_layout(policy, Arc::new(DefaultArticleLayout))
    }

    pub fn with_layout(policy: HostPolicy, layout: Arc<dyn ArticleLayout>) -> Self {
        Self {
            classifier: Classifier::new(policy.clone()),
            policy,
            layout,
        }
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Renders `data` as `kind`. `None` means there is nothing to show.
    pub fn render(&self, kind: ContentKind, data: &Metadata) -> Option<String> {
        match kind {
            ContentKind::Article => Some(self.article_html(data)),
            ContentKind::Image => image_html(data),
            ContentKind::Video => Some(video_html(data)),
            ContentKind::EmbeddedWidget => match embedded_html(data) {
                Ok(html) => Some(html),
                Err(e) => {
                    e.log();
                    None
                }
            },
            ContentKind::None => None,
        }
    }

    /// Full render followed by the HTTPS rewrite for `url`.
    pub fn to_html(&self, url: &Url, data: &Metadata) -> Option<String> {
        let kind = self.classifier.classify(data);
        debug!(url = %url, kind = ?kind, "Rendering preview");
        self.render(kind, data)
            .map(|html| self.rewrite_https(url, html))
    }

    /// Compact list-view render.
    pub fn placeholder_html(&self, url: &Url, data: &Metadata) -> Option<String> {
        match self.classifier.placeholder_style(data) {
            PlaceholderStyle::Article => Some(self.article_html(data)),
            PlaceholderStyle::Image => image_html(data),
            PlaceholderStyle::Full => self.to_html(url, data),
        }
    }

    /// Replaces every literal `http://` with `https://` when `url`'s host is on
    /// the rewrite list. Text content is rewritten too.
    pub fn rewrite_https(&self, url: &Url, html: String) -> String {
        if self.policy.should_rewrite(url) {
            html.replace("http://", "https://")
        } else {
            html
        }
    }

    fn article_html(&self, data: &Metadata) -> String {
        self.layout.render(data)
    }
}

fn dimension(value: Option<u32>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

pub fn image_html(data: &Metadata) -> Option<String> {
    let src = data.image_src()?;
    let alt = crate::utils::present(data.description.as_deref())
        .or(data.title.as_deref())
        .unwrap_or_default();
    let width = data.image_width.or(data.thumbnail_width);
    let height = data.image_height.or(data.thumbnail_height);

    Some(format!(
        "<img src=\"{}\" alt=\"{}\" width=\"{}\" height=\"{}\">",
        attr(src),
        attr(alt),
        dimension(width),
        dimension(height)
    ))
}

pub fn video_html(data: &Metadata) -> String {
    let src = attr(data.video.as_deref().unwrap_or_default()).into_owned();
    let title = attr(data.title.as_deref().unwrap_or_default()).into_owned();
    let width = dimension(data.video_width);
    let height = dimension(data.video_height);

    if data.video_type.as_deref() == Some("video/mp4") {
        format!(
            "<video title=\"{title}\" width=\"{width}\" height=\"{height}\" style=\"max-width:100%\" controls=\"\">\
             <source src=\"{src}\">\
             </video>"
        )
    } else {
        format!(
            "<iframe src=\"{src}\" title=\"{title}\" width=\"{width}\" height=\"{height}\" frameborder=\"0\"></iframe>"
        )
    }
}

/// Provider HTML with `class="thumbnail"` set on every image.
pub fn embedded_html(data: &Metadata) -> Result<String, PreviewError> {
    let html = data.html.as_deref().unwrap_or_default();
    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("img", |el| {
                el.set_attribute("class", "thumbnail")?;
                Ok(())
            })],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|e| PreviewError::RenderError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> Metadata {
        Metadata::new("https://example.com/page")
    }

    #[test]
    fn test_image_html_escapes_values() {
        let m = Metadata {
            image: Some("https://example.com/a.png?x=1&y=2".into()),
            title: Some("Tom \"the\" <cat>".into()),
            image_width: Some(100),
            thumbnail_height: Some(50),
            ..record()
        };
        let html = image_html(&m).unwrap();
        assert!(html.starts_with("<img src=\"https://example.com/a.png?x=1&amp;y=2\""));
        assert!(html.contains("&quot;the&quot;"));
        assert!(!html.contains("<cat>"));
        assert!(html.ends_with("width=\"100\" height=\"50\">"));
    }

    #[test]
    fn test_image_html_prefers_description_for_alt() {
        let m = Metadata {
            thumbnail_url: Some("https://example.com/t.png".into()),
            title: Some("Title".into()),
            description: Some("Desc".into()),
            ..record()
        };
        let html = image_html(&m).unwrap();
        assert!(html.contains("src=\"https://example.com/t.png\""));
        assert!(html.contains("alt=\"Desc\""));
        assert!(html.contains("width=\"\""));
    }

    #[test]
    fn test_image_html_empty_without_source() {
        assert_eq!(image_html(&record()), None);
    }

    #[test]
    fn test_mp4_video_has_single_source() {
        let m = Metadata {
            video: Some("https://example.com/v.mp4".into()),
            video_type: Some("video/mp4".into()),
            title: Some("T".into()),
            video_width: Some(640),
            video_height: Some(360),
            ..record()
        };
        let html = video_html(&m);
        assert!(html.starts_with("<video "));
        assert_eq!(html.matches("<source ").count(), 1);
        assert!(html.contains("controls=\"\""));
        assert!(html.contains("width=\"640\""));
        assert!(!html.contains("<iframe"));
    }

    #[test]
    fn test_other_video_types_use_iframe() {
        let m = Metadata {
            video: Some("https://player.example.com/embed/1".into()),
            video_type: Some("text/html".into()),
            ..record()
        };
        let html = video_html(&m);
        assert!(html.starts_with("<iframe "));
        assert!(!html.contains("<video"));

        let untyped = Metadata {
            video_type: None,
            ..m
        };
        assert!(!video_html(&untyped).contains("<video"));
    }

    #[test]
    fn test_embedded_html_marks_images() {
        let m = Metadata {
            html: Some(
                "<a href=\"https://flickr.com/p/1\"><img src=\"a.jpg\" class=\"big\"></a><img src=\"b.jpg\">"
                    .into(),
            ),
            ..record()
        };
        let html = embedded_html(&m).unwrap();
        assert_eq!(html.matches("class=\"thumbnail\"").count(), 2);
        assert!(!html.contains("class=\"big\""));
        assert!(html.contains("href=\"https://flickr.com/p/1\""));
    }

    #[test]
    fn test_rewrite_https_is_blunt() {
        let renderer = HtmlRenderer::new(HostPolicy::new());
        let url = Url::parse("http://www.slideshare.net/deck").unwrap();
        let html = "<iframe src=\"http://a.com\"></iframe> see http://b.com".to_string();
        assert_eq!(
            renderer.rewrite_https(&url, html),
            "<iframe src=\"https://a.com\"></iframe> see https://b.com"
        );

        let other = Url::parse("http://example.com/").unwrap();
        assert_eq!(
            renderer.rewrite_https(&other, "http://x".to_string()),
            "http://x"
        );
    }

    #[test]
    fn test_none_renders_nothing() {
        let renderer = HtmlRenderer::new(HostPolicy::new());
        assert_eq!(renderer.render(ContentKind::None, &record()), None);
        let url = Url::parse("https://example.com/page").unwrap();
        assert_eq!(renderer.to_html(&url, &record()), None);
    }

    #[test]
    fn test_article_uses_layout() {
        struct Fixed;
        impl ArticleLayout for Fixed {
            fn render(&self, data: &Metadata) -> String {
                format!("<article>{}</article>", data.title.clone().unwrap_or_default())
            }
        }

        let renderer = HtmlRenderer::with_layout(HostPolicy::new(), Arc::new(Fixed));
        let m = Metadata {
            kind: Some("article".into()),
            title: Some("Hello".into()),
            description: Some("World".into()),
            ..record()
        };
        let url = Url::parse("https://example.com/page").unwrap();
        assert_eq!(
            renderer.to_html(&url, &m).as_deref(),
            Some("<article>Hello</article>")
        );
    }

    #[test]
    fn test_default_layout_escapes_text() {
        let m = Metadata {
            title: Some("<b>Bold</b>".into()),
            description: Some("A & B".into()),
            image: Some("https://example.com/i.png".into()),
            ..record()
        };
        let html = DefaultArticleLayout.render(&m);
        assert!(html.contains("&lt;b&gt;Bold&lt;/b&gt;"));
        assert!(html.contains("<p>A &amp; B</p>"));
        assert!(html.contains("<img src=\"https://example.com/i.png\" class=\"thumbnail\">"));
        assert!(html.contains(">example.com</a>"));
    }
}
