use crate::policy::HostPolicy;
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

// Date-shaped path segment, e.g. `/2015/03/` from self-hosted blog software
static PROBABLE_BLOG_POST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{4}/\d{2}/").expect("blog post pattern is valid"));

// `/t/<slug>/<topic id>[/<post number>]` from self-hosted forum software
static PROBABLE_DISCUSSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/t/[^/]+/\d+(/\d+)?(\?.*)?$").expect("discussion pattern is valid")
});

/// Gate in front of the preview pipeline.
#[derive(Debug, Clone)]
pub struct UrlMatcher {
    policy: HostPolicy,
}

impl UrlMatcher {
    pub fn new(policy: HostPolicy) -> Self {
        Self { policy }
    }

    /// True when the host is allowlisted or the path looks like a blog post or
    /// a discussion thread.
    pub fn should_handle(&self, url: &Url) -> bool {
        let allowed = self.policy.is_allowed(url);
        let blog_post = probable_blog_post(url);
        let discussion = probable_discussion(url);
        allowed || blog_post || discussion
    }
}

pub fn probable_blog_post(url: &Url) -> bool {
    PROBABLE_BLOG_POST.is_match(url.path())
}

pub fn probable_discussion(url: &Url) -> bool {
    PROBABLE_DISCUSSION.is_match(url.path())
}
