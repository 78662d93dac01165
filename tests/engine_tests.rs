mod common;

use common::StaticFetcher;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use topic_preview::{
    CacheStrategy, ContentKind, DefaultArticleLayout, EngineConfig, HostPolicy, Metadata,
    PreviewEngine,
};

fn engine_with(fetcher: Arc<StaticFetcher>) -> PreviewEngine {
    PreviewEngine::with_fetcher(fetcher)
}

#[tokio::test]
async fn test_mp4_on_rewrite_host_is_upgraded() {
    let url = "http://www.dailymotion.com/video/x1";
    let fetcher = Arc::new(StaticFetcher::default().with(Metadata {
        kind: Some("video".into()),
        video: Some("http://cdn.dailymotion.com/v.mp4".into()),
        video_type: Some("video/mp4".into()),
        title: Some("T".into()),
        video_width: Some(640),
        video_height: Some(360),
        ..Metadata::new(url)
    }));
    let engine = engine_with(fetcher);

    let html = engine.to_html(url).await.expect("video renders");
    assert!(html.contains("<video "));
    assert!(html.contains("<source src=\"https://cdn.dailymotion.com/v.mp4\">"));
    assert!(!html.contains("http://"));
}

#[tokio::test]
async fn test_no_rewrite_off_list() {
    let url = "https://vimeo.com/1";
    let fetcher = Arc::new(StaticFetcher::default().with(Metadata {
        kind: Some("video".into()),
        video: Some("http://player.vimeo.com/video/1".into()),
        ..Metadata::new(url)
    }));
    let engine = engine_with(fetcher);

    let html = engine.to_html(url).await.unwrap();
    assert!(html.starts_with("<iframe src=\"http://player.vimeo.com/video/1\""));
}

#[tokio::test]
async fn test_policy_swap_applies_to_next_render() {
    let url = "https://vimeo.com/1";
    let fetcher = Arc::new(StaticFetcher::default().with(Metadata {
        kind: Some("video".into()),
        video: Some("http://player.vimeo.com/video/1".into()),
        ..Metadata::new(url)
    }));
    let engine = engine_with(fetcher);

    engine.policy().set_rewrite_hosts(["vimeo.com"]);
    let html = engine.to_html(url).await.unwrap();
    assert!(html.contains("https://player.vimeo.com/video/1"));
}

#[tokio::test]
async fn test_unhandled_urls_are_not_fetched() {
    let fetcher = Arc::new(StaticFetcher::default());
    let engine = engine_with(fetcher.clone());

    assert!(!engine.should_handle("https://unknown.example.org/about"));
    assert_eq!(engine.to_html("https://unknown.example.org/about").await, None);
    assert_eq!(engine.to_html("not a url").await, None);
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_heuristic_urls_are_handled() {
    let engine = engine_with(Arc::new(StaticFetcher::default()));
    assert!(engine.should_handle("https://someblog.net/2015/03/hello-world/"));
    assert!(engine.should_handle("https://meta.example.com/t/a-topic/42/7"));
}

#[tokio::test]
async fn test_fetch_failure_yields_nothing() {
    let fetcher = Arc::new(StaticFetcher::default());
    let engine = engine_with(fetcher);
    assert_eq!(engine.to_html("https://vimeo.com/missing").await, None);
    assert_eq!(engine.classify("https://vimeo.com/missing").await, ContentKind::None);
}

#[tokio::test]
async fn test_metadata_is_memoized() {
    let url = "https://www.flickr.com/photos/1";
    let fetcher = Arc::new(StaticFetcher::default().with(Metadata {
        kind: Some("photo".into()),
        image: Some("https://live.staticflickr.com/1.jpg".into()),
        ..Metadata::new(url)
    }));
    let engine = engine_with(fetcher.clone());

    let first = engine.to_html(url).await;
    let second = engine.to_html(url).await;
    assert_eq!(first, second);
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_no_cache_strategy_refetches() {
    let url = "https://www.flickr.com/photos/1";
    let fetcher = Arc::new(StaticFetcher::default().with(Metadata {
        kind: Some("photo".into()),
        image: Some("https://live.staticflickr.com/1.jpg".into()),
        ..Metadata::new(url)
    }));
    let engine = PreviewEngine::new_with_config(
        EngineConfig::new(10).with_cache_strategy(CacheStrategy::NoCache),
        HostPolicy::new(),
        fetcher.clone(),
        Arc::new(DefaultArticleLayout),
    );

    engine.to_html(url).await;
    engine.to_html(url).await;
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_article_text_is_decoded_and_truncated() {
    let url = "https://www.nytimes.com/2020/01/01/story.html";
    let long_description = "word ".repeat(100);
    let fetcher = Arc::new(StaticFetcher::default().with(Metadata {
        kind: Some("article".into()),
        title: Some("Cats &amp; Dogs".into()),
        description: Some(long_description),
        ..Metadata::new(url)
    }));
    let engine = engine_with(fetcher);

    let data = engine.data(url).await.unwrap();
    assert_eq!(data.title.as_deref(), Some("Cats & Dogs"));
    assert!(data.description.as_ref().unwrap().chars().count() <= 253);
    assert!(data.description.as_ref().unwrap().ends_with("..."));

    let html = engine.to_html(url).await.unwrap();
    assert!(html.contains("Cats &amp; Dogs"));
    assert!(html.contains("class=\"onebox allowlistedgeneric\""));
}

#[tokio::test]
async fn test_placeholder_prefers_image_over_video() {
    let url = "https://vimeo.com/2";
    let fetcher = Arc::new(StaticFetcher::default().with(Metadata {
        kind: Some("video".into()),
        video: Some("https://player.vimeo.com/video/2".into()),
        thumbnail_url: Some("https://i.vimeocdn.com/2.jpg".into()),
        title: Some("Clip".into()),
        ..Metadata::new(url)
    }));
    let engine = engine_with(fetcher);

    let full = engine.to_html(url).await.unwrap();
    assert!(full.starts_with("<iframe"));

    let placeholder = engine.placeholder_html(url).await.unwrap();
    assert!(placeholder.starts_with("<img src=\"https://i.vimeocdn.com/2.jpg\""));
    assert!(placeholder.contains("alt=\"Clip\""));
}

#[tokio::test]
async fn test_embedded_widget() {
    let url = "https://www.flickr.com/photos/someone/sets/1";
    let fetcher = Arc::new(StaticFetcher::default().with(Metadata {
        kind: Some("rich".into()),
        provider_name: Some("Flickr".into()),
        html: Some("<a href=\"https://flickr.com/s/1\"><img src=\"https://live.staticflickr.com/c.jpg\"></a>".into()),
        ..Metadata::new(url)
    }));
    let engine = engine_with(fetcher);

    assert_eq!(engine.classify(url).await, ContentKind::EmbeddedWidget);
    let html = engine.to_html(url).await.unwrap();
    assert!(html.contains("class=\"thumbnail\""));
}

#[tokio::test]
async fn test_batch_keeps_order() {
    let a = "https://www.flickr.com/photos/a";
    let b = "https://unknown.example.org/b";
    let fetcher = Arc::new(StaticFetcher::default().with(Metadata {
        kind: Some("photo".into()),
        image: Some("https://live.staticflickr.com/a.jpg".into()),
        ..Metadata::new(a)
    }));
    let engine = engine_with(fetcher);

    let results = engine.to_html_batch(&[a, b, a]).await;
    assert_eq!(results.len(), 3);
    assert!(results[0].is_some());
    assert!(results[1].is_none());
    assert_eq!(results[0], results[2]);
}

#[cfg(feature = "logging")]
#[tokio::test]
async fn test_render_under_log_subscriber() {
    let _guard = topic_preview::LogLevelGuard::set_level("info");
    let url = "https://www.flickr.com/photos/logged";
    let fetcher = Arc::new(StaticFetcher::default().with(Metadata {
        kind: Some("photo".into()),
        image: Some("https://live.staticflickr.com/l.jpg".into()),
        ..Metadata::new(url)
    }));

    let html = engine_with(fetcher).to_html(url).await.unwrap();
    assert!(html.starts_with("<img"));
}
