// src/feeds/mod.rs
pub mod rss;
pub mod types;

pub use types::{ArticleSource, FeedSource, NewsArticle};

use anyhow::{anyhow, Context, Result};
use metrics::{counter, describe_counter, describe_histogram};
use once_cell::sync::OnceCell;
use std::fs;
use std::path::{Path, PathBuf};

const ENV_FEEDS_PATH: &str = "FEEDS_CONFIG_PATH";
const DEFAULT_FEEDS_PATH: &str = "config/feeds.toml";

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("feeds_articles_total", "Articles parsed from feeds.");
        describe_counter!("feeds_fetch_errors_total", "Feed fetch/parse errors.");
        describe_histogram!("feeds_parse_ms", "Feed parse time in milliseconds.");
    });
}

/// Strip HTML down to plain text: decode entities, drop tags, collapse
/// whitespace, trim.
pub fn clean_html(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();

    out.trim().to_string()
}

/// Built-in feed list, used when no config file overrides it.
pub fn default_feeds() -> Vec<FeedSource> {
    let tech = |name: &str, url: &str| FeedSource {
        name: name.to_string(),
        url: url.to_string(),
        category: "tech".to_string(),
        enabled: true,
    };
    vec![
        tech("TechCrunch", "https://techcrunch.com/feed/"),
        tech("Hacker News", "https://hnrss.org/frontpage"),
        tech("MIT Technology Review", "https://www.technologyreview.com/feed/"),
        tech("The Verge", "https://www.theverge.com/rss/index.xml"),
        tech("Wired", "https://www.wired.com/feed/rss"),
    ]
}

/// Load the feed list from an explicit TOML path (`[[feeds]]` array).
pub fn load_feeds_from(path: &Path) -> Result<Vec<FeedSource>> {
    #[derive(serde::Deserialize)]
    struct FeedsFile {
        feeds: Vec<FeedSource>,
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading feeds config from {}", path.display()))?;
    let parsed: FeedsFile = toml::from_str(&content).context("parsing feeds toml")?;
    if parsed.feeds.is_empty() {
        return Err(anyhow!("feeds config contains no feeds"));
    }
    Ok(parsed.feeds)
}

/// Load feeds using env var + fallbacks:
/// 1) $FEEDS_CONFIG_PATH
/// 2) config/feeds.toml
/// 3) built-in defaults
pub fn load_feeds_default() -> Result<Vec<FeedSource>> {
    if let Ok(p) = std::env::var(ENV_FEEDS_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_feeds_from(&pb);
        } else {
            return Err(anyhow!("FEEDS_CONFIG_PATH points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from(DEFAULT_FEEDS_PATH);
    if toml_p.exists() {
        return load_feeds_from(&toml_p);
    }
    Ok(default_feeds())
}

/// Fetch articles from all sources, capped per feed, newest first.
///
/// One source failing is logged and skipped; the rest still contribute.
pub async fn fetch_all_feeds(
    sources: &[Box<dyn ArticleSource>],
    limit_per_feed: usize,
) -> Vec<NewsArticle> {
    ensure_metrics_described();

    let mut all: Vec<NewsArticle> = Vec::new();
    for src in sources {
        match src.fetch_latest().await {
            Ok(mut articles) => {
                articles.truncate(limit_per_feed);
                tracing::info!(feed = src.name(), count = articles.len(), "feed fetched");
                all.append(&mut articles);
            }
            Err(e) => {
                tracing::warn!(error = ?e, feed = src.name(), "feed error");
                counter!("feeds_fetch_errors_total").increment(1);
            }
        }
    }

    // Newest first; undated articles sink to the end.
    all.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    tracing::info!(total = all.len(), "feeds fetch complete");
    all
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_html_strips_tags_and_entities() {
        let s = "<p>Hello&nbsp;&amp; <b>world</b></p>\n\n  extra ";
        assert_eq!(clean_html(s), "Hello & world extra");
    }

    #[test]
    fn default_feeds_are_enabled_tech() {
        let feeds = default_feeds();
        assert_eq!(feeds.len(), 5);
        assert!(feeds.iter().all(|f| f.enabled && f.category == "tech"));
    }

    #[test]
    fn feeds_toml_parses() {
        let toml = r#"
[[feeds]]
name = "Example"
url = "https://example.test/feed"
category = "science"

[[feeds]]
name = "Other"
url = "https://other.test/rss"
"#;
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("feeds.toml");
        std::fs::write(&p, toml).unwrap();
        let feeds = load_feeds_from(&p).unwrap();
        assert_eq!(feeds.len(), 2);
        assert_eq!(feeds[0].category, "science");
        assert_eq!(feeds[1].category, "tech");
        assert!(feeds[1].enabled);
    }

    #[serial_test::serial]
    #[test]
    fn load_default_falls_back_to_builtin() {
        let old = std::env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        std::env::set_current_dir(tmp.path()).unwrap();
        std::env::remove_var(ENV_FEEDS_PATH);

        let feeds = load_feeds_default().unwrap();
        assert_eq!(feeds.len(), default_feeds().len());

        std::env::set_current_dir(&old).unwrap();
    }
}
