// tests/feeds_rss.rs
use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use pai_intelligence_engine::feeds::rss::parse_feed;
use pai_intelligence_engine::feeds::{fetch_all_feeds, ArticleSource, FeedSource, NewsArticle};

// Use a static fixture via include_str! so parsing is covered without HTTP.
const NEWS_XML: &str = include_str!("fixtures/news_rss.xml");

fn fixture_feed() -> FeedSource {
    FeedSource {
        name: "Example Tech Wire".to_string(),
        url: "https://example-wire.test/feed".to_string(),
        category: "tech".to_string(),
        enabled: true,
    }
}

#[test]
fn fixture_parses_normalized_articles() {
    let articles = parse_feed(&fixture_feed(), NEWS_XML).expect("rss parse ok");

    // The linkless editorial is dropped.
    assert_eq!(articles.len(), 2);

    let first = &articles[0];
    assert_eq!(first.title, "Chip startup raises $200M & more");
    assert_eq!(
        first.summary,
        "An AI accelerator startup closed a new funding round, the largest this year."
    );
    assert_eq!(first.source, "Example Tech Wire");
    assert_eq!(first.author.as_deref(), Some("jane@example-wire.test"));
    assert_eq!(first.tags, vec!["hardware".to_string(), "funding".to_string()]);
    assert_eq!(
        first.published_at.unwrap(),
        Utc.with_ymd_and_hms(2025, 3, 4, 9, 30, 0).unwrap()
    );
    assert_eq!(
        first.metadata.get("category").unwrap().as_str().unwrap(),
        "tech"
    );

    // No HTML left anywhere.
    for a in &articles {
        assert!(!a.title.contains('<'), "title still has markup: {}", a.title);
        assert!(!a.summary.contains('<'), "summary still has markup: {}", a.summary);
    }
}

#[test]
fn fixture_ids_are_stable_across_reparses() {
    let first = parse_feed(&fixture_feed(), NEWS_XML).unwrap();
    let second = parse_feed(&fixture_feed(), NEWS_XML).unwrap();
    let ids1: Vec<&str> = first.iter().map(|a| a.id.as_str()).collect();
    let ids2: Vec<&str> = second.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids1, ids2);
    assert_eq!(
        first[0].id,
        NewsArticle::id_for_url("https://example-wire.test/chips-funding")
    );
}

struct FixtureSource {
    name: &'static str,
    xml: &'static str,
}

#[async_trait]
impl ArticleSource for FixtureSource {
    async fn fetch_latest(&self) -> anyhow::Result<Vec<NewsArticle>> {
        let feed = FeedSource {
            name: self.name.to_string(),
            url: format!("https://{}.test/feed", self.name),
            category: "tech".to_string(),
            enabled: true,
        };
        parse_feed(&feed, self.xml)
    }
    fn name(&self) -> &str {
        self.name
    }
}

struct BrokenSource;

#[async_trait]
impl ArticleSource for BrokenSource {
    async fn fetch_latest(&self) -> anyhow::Result<Vec<NewsArticle>> {
        anyhow::bail!("connection refused")
    }
    fn name(&self) -> &str {
        "Broken"
    }
}

#[tokio::test]
async fn one_broken_feed_does_not_abort_the_rest() {
    let sources: Vec<Box<dyn ArticleSource>> = vec![
        Box::new(BrokenSource),
        Box::new(FixtureSource {
            name: "wire",
            xml: NEWS_XML,
        }),
    ];

    let articles = fetch_all_feeds(&sources, 10).await;
    assert_eq!(articles.len(), 2);
    assert!(articles.iter().all(|a| a.source == "wire"));
}

#[tokio::test]
async fn per_feed_limit_and_newest_first_ordering() {
    let sources: Vec<Box<dyn ArticleSource>> = vec![Box::new(FixtureSource {
        name: "wire",
        xml: NEWS_XML,
    })];

    let capped = fetch_all_feeds(&sources, 1).await;
    assert_eq!(capped.len(), 1);

    let all = fetch_all_feeds(&sources, 10).await;
    assert!(all.windows(2).all(|w| w[0].published_at >= w[1].published_at));
}
