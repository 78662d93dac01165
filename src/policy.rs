use parking_lot::RwLock;
use std::sync::Arc;
use url::Url;

/// Hosts the generic preview engine handles out of the box.
pub const DEFAULT_ALLOWLIST: &[&str] = &[
    "23hq.com",
    "500px.com",
    "8tracks.com",
    "abc.net.au",
    "about.com",
    "answers.com",
    "arstechnica.com",
    "ask.com",
    "battle.net",
    "bbc.co.uk",
    "bbs.boingboing.net",
    "bestbuy.ca",
    "bestbuy.com",
    "blip.tv",
    "bloomberg.com",
    "businessinsider.com",
    "change.org",
    "clikthrough.com",
    "cnet.com",
    "cnn.com",
    "codepen.io",
    "collegehumor.com",
    "consider.it",
    "coursera.org",
    "cracked.com",
    "dailymail.co.uk",
    "dailymotion.com",
    "deadline.com",
    "dell.com",
    "deviantart.com",
    "digg.com",
    "dotsub.com",
    "ebay.ca",
    "ebay.co.uk",
    "ebay.com",
    "ehow.com",
    "espn.go.com",
    "etsy.com",
    "findery.com",
    "flickr.com",
    "folksy.com",
    "forbes.com",
    "foxnews.com",
    "funnyordie.com",
    "gfycat.com",
    "groupon.com",
    "howtogeek.com",
    "huffingtonpost.ca",
    "huffingtonpost.com",
    "hulu.com",
    "ign.com",
    "ikea.com",
    "imdb.com",
    "indiatimes.com",
    "instagr.am",
    "instagram.com",
    "itunes.apple.com",
    "khanacademy.org",
    "kickstarter.com",
    "kinomap.com",
    "lessonplanet.com",
    "liveleak.com",
    "livestream.com",
    "mashable.com",
    "medium.com",
    "meetup.com",
    "mixcloud.com",
    "mlb.com",
    "myshopify.com",
    "myspace.com",
    "nba.com",
    "npr.org",
    "nytimes.com",
    "photobucket.com",
    "pinterest.com",
    "reference.com",
    "revision3.com",
    "rottentomatoes.com",
    "samsung.com",
    "screenr.com",
    "scribd.com",
    "slideshare.net",
    "sourceforge.net",
    "speakerdeck.com",
    "spotify.com",
    "squidoo.com",
    "techcrunch.com",
    "ted.com",
    "thefreedictionary.com",
    "theglobeandmail.com",
    "thenextweb.com",
    "theonion.com",
    "thestar.com",
    "thesun.co.uk",
    "thinkgeek.com",
    "tmz.com",
    "torontosun.com",
    "tumblr.com",
    "twitch.tv",
    "twitpic.com",
    "usatoday.com",
    "viddler.com",
    "videojug.com",
    "vimeo.com",
    "vine.co",
    "walmart.com",
    "washingtonpost.com",
    "wi.st",
    "wikia.com",
    "wikihow.com",
    "wired.com",
    "wistia.com",
    "wonderhowto.com",
    "wsj.com",
    "zappos.com",
    "zillow.com",
];

/// Providers whose oEmbed `html` is preferred over the generic layout.
///
/// Many blogs return the whole page in `html`; these providers return galleries
/// and animated media there instead.
pub const DEFAULT_HTML_PROVIDERS: &[&str] = &["Flickr", "Meetup"];

/// Hosts whose rendered `http://` links are upgraded to `https://`.
pub const DEFAULT_HTTPS_HOSTS: &[&str] = &["slideshare.net", "dailymotion.com", "livestream.com"];

#[derive(Debug, Clone)]
struct PolicyLists {
    allowlist: Vec<String>,
    html_providers: Vec<String>,
    rewrite_hosts: Vec<String>,
}

impl Default for PolicyLists {
    fn default() -> Self {
        Self {
            allowlist: to_owned(DEFAULT_ALLOWLIST),
            html_providers: to_owned(DEFAULT_HTML_PROVIDERS),
            rewrite_hosts: to_owned(DEFAULT_HTTPS_HOSTS),
        }
    }
}

fn to_owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Host policy registry shared by the matcher, classifier and renderer.
///
/// Cloning is cheap and every clone sees the same lists. Setters replace a
/// whole list (last write wins); nothing is persisted, so a fresh registry
/// always starts from the compiled-in defaults.
#[derive(Debug, Clone, Default)]
pub struct HostPolicy {
    lists: Arc<RwLock<PolicyLists>>,
}

impl HostPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with all three lists empty.
    pub fn empty() -> Self {
        Self {
            lists: Arc::new(RwLock::new(PolicyLists {
                allowlist: Vec::new(),
                html_providers: Vec::new(),
                rewrite_hosts: Vec::new(),
            })),
        }
    }

    pub fn allowlist(&self) -> Vec<String> {
        self.lists.read().allowlist.clone()
    }

    pub fn set_allowlist<I, S>(&self, hosts: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lists.write().allowlist = hosts.into_iter().map(Into::into).collect();
    }

    pub fn html_providers(&self) -> Vec<String> {
        self.lists.read().html_providers.clone()
    }

    pub fn set_html_providers<I, S>(&self, providers: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lists.write().html_providers = providers.into_iter().map(Into::into).collect();
    }

    pub fn rewrite_hosts(&self) -> Vec<String> {
        self.lists.read().rewrite_hosts.clone()
    }

    pub fn set_rewrite_hosts<I, S>(&self, hosts: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lists.write().rewrite_hosts = hosts.into_iter().map(Into::into).collect();
    }

    /// Restores all three lists to their compiled-in defaults.
    pub fn reset(&self) {
        *self.lists.write() = PolicyLists::default();
    }

    pub fn is_allowed(&self, url: &Url) -> bool {
        url_host_matches(url, &self.lists.read().allowlist)
    }

    pub fn should_rewrite(&self, url: &Url) -> bool {
        url_host_matches(url, &self.lists.read().rewrite_hosts)
    }

    /// Provider names are compared exactly, as reported by the provider.
    pub fn prefers_html(&self, provider_name: Option<&str>) -> bool {
        match provider_name {
            Some(name) => self.lists.read().html_providers.iter().any(|p| p == name),
            None => false,
        }
    }
}

/// True iff `host` equals an entry of `list` or is a subdomain of one.
///
/// Only whole labels match: `notexample.com` does not match `example.com`.
pub fn host_matches<S: AsRef<str>>(host: &str, list: &[S]) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    list.iter().any(|entry| {
        let entry = entry.as_ref().to_ascii_lowercase();
        !entry.is_empty()
            && (host == entry
                || (host.ends_with(&entry) && host[..host.len() - entry.len()].ends_with('.')))
    })
}

pub fn url_host_matches<S: AsRef<str>>(url: &Url, list: &[S]) -> bool {
    url.host_str()
        .map(|host| host_matches(host, list))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_matches_domain_and_subdomains() {
        assert!(host_matches("example.com", &["example.com"]));
        assert!(host_matches("blog.example.com", &["example.com"]));
        assert!(host_matches("a.b.example.com", &["example.com"]));
        assert!(!host_matches("notexample.com", &["example.com"]));
        assert!(!host_matches("example.com.evil.net", &["example.com"]));
        assert!(!host_matches("example.com", &[] as &[&str]));
    }

    #[test]
    fn test_host_matches_ignores_case() {
        assert!(host_matches("Blog.Example.COM", &["example.com"]));
    }

    #[test]
    fn test_defaults_are_seeded() {
        let policy = HostPolicy::new();
        assert!(policy.allowlist().iter().any(|h| h == "vimeo.com"));
        assert_eq!(policy.html_providers(), vec!["Flickr", "Meetup"]);
        assert_eq!(policy.rewrite_hosts().len(), 3);
    }

    #[test]
    fn test_setters_replace_lists_and_are_shared() {
        let policy = HostPolicy::new();
        let view = policy.clone();
        policy.set_allowlist(["example.org"]);

        let url = Url::parse("https://www.example.org/page").unwrap();
        assert!(view.is_allowed(&url));
        assert!(!view.is_allowed(&Url::parse("https://vimeo.com/1").unwrap()));

        policy.reset();
        assert!(!view.is_allowed(&url));
    }

    #[test]
    fn test_prefers_html() {
        let policy = HostPolicy::new();
        assert!(policy.prefers_html(Some("Flickr")));
        assert!(!policy.prefers_html(Some("flickr")));
        assert!(!policy.prefers_html(None));
    }

    #[test]
    fn test_should_rewrite() {
        let policy = HostPolicy::new();
        assert!(policy.should_rewrite(&Url::parse("http://www.slideshare.net/deck").unwrap()));
        assert!(!policy.should_rewrite(&Url::parse("http://example.com/").unwrap()));
    }
}
