// src/feeds/rss.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;
use std::time::Duration;
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

use crate::feeds::types::{ArticleSource, FeedSource, NewsArticle};
use crate::feeds::clean_html;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = "pai-crawler/0.2 (+https://github.com/lumlich/pai-intelligence-engine)";

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}
#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
    author: Option<String>,
    #[serde(rename = "category", default)]
    categories: Vec<String>,
}

fn parse_rfc2822_utc(ts: &str) -> Option<DateTime<Utc>> {
    OffsetDateTime::parse(ts, &Rfc2822)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC).unix_timestamp())
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
}

/// Parse an RSS 2.0 document into normalized articles for one feed.
///
/// Entries without a link are skipped (no URL means no stable id). Titles,
/// summaries and tags come out HTML-stripped and entity-decoded.
pub fn parse_feed(feed: &FeedSource, xml: &str) -> Result<Vec<NewsArticle>> {
    let t0 = std::time::Instant::now();
    let xml_clean = scrub_html_entities_for_xml(xml);
    let rss: Rss = from_str(&xml_clean).with_context(|| format!("parsing rss xml for {}", feed.name))?;

    let fetched_at = Utc::now();
    let mut out = Vec::with_capacity(rss.channel.item.len());
    for it in rss.channel.item {
        let url = match it.link.as_deref().map(str::trim) {
            Some(u) if !u.is_empty() => u.to_string(),
            _ => continue,
        };

        let title = match it.title.as_deref().map(clean_html) {
            Some(t) if !t.is_empty() => t,
            _ => "Untitled".to_string(),
        };

        let mut metadata = serde_json::Map::new();
        metadata.insert("category".into(), feed.category.clone().into());
        metadata.insert("feed_url".into(), feed.url.clone().into());

        out.push(NewsArticle {
            id: NewsArticle::id_for_url(&url),
            title,
            url,
            source: feed.name.clone(),
            summary: it.description.as_deref().map(clean_html).unwrap_or_default(),
            content: String::new(),
            author: it
                .author
                .as_deref()
                .map(clean_html)
                .filter(|a| !a.is_empty()),
            published_at: it.pub_date.as_deref().and_then(parse_rfc2822_utc),
            fetched_at,
            tags: it
                .categories
                .iter()
                .map(|c| clean_html(c))
                .filter(|c| !c.is_empty())
                .collect(),
            metadata,
        });
    }

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("feeds_parse_ms").record(ms);
    counter!("feeds_articles_total").increment(out.len() as u64);
    Ok(out)
}

/// Generic RSS 2.0 source backed by an HTTP fetch of the feed URL.
pub struct RssFeed {
    feed: FeedSource,
    client: reqwest::Client,
}

impl RssFeed {
    pub fn new(feed: FeedSource) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(FETCH_TIMEOUT)
            .build()
            .expect("reqwest client");
        Self { feed, client }
    }
}

#[async_trait]
impl ArticleSource for RssFeed {
    async fn fetch_latest(&self) -> Result<Vec<NewsArticle>> {
        let resp = self
            .client
            .get(&self.feed.url)
            .send()
            .await
            .with_context(|| format!("fetching feed {}", self.feed.name))?;
        let resp = resp
            .error_for_status()
            .with_context(|| format!("feed {} returned error status", self.feed.name))?;
        let body = resp
            .text()
            .await
            .with_context(|| format!("reading feed body for {}", self.feed.name))?;
        parse_feed(&self.feed, &body)
    }

    fn name(&self) -> &str {
        &self.feed.name
    }
}

// Feeds in the wild carry bare HTML entities that are not valid XML; replace
// the common ones before handing the document to the XML parser.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
