use std::collections::HashMap;

use feed_rs::model::{Entry, Link};
use feed_rs::parser;
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::error::Result;

/// A normalized feed entry. Identity is `link`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub title: String,
    pub link: String,
    pub summary: String,
    /// RFC 3339 UTC timestamp, or empty when the feed gave no date
    pub published: String,
    /// Feed title, or the feed URL when the feed has none
    pub source: String,
}

pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("feed-digest/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }

    /// Fetch every feed in order and return the deduplicated, sorted and
    /// truncated article list. Feeds that fail contribute nothing.
    pub async fn fetch_articles(&self, feeds: &[String], max_articles: usize) -> Vec<Article> {
        info!("Fetching {} feeds", feeds.len());

        let mut articles = Vec::new();
        for feed_url in feeds {
            match self.fetch_feed(feed_url).await {
                Ok(mut fetched) => {
                    info!("Got {} entries from {}", fetched.len(), feed_url);
                    articles.append(&mut fetched);
                }
                Err(e) => warn!("Failed to fetch feed '{}': {:#}", feed_url, e),
            }
        }

        let selected = select_articles(articles, max_articles);
        info!("Selected {} articles", selected.len());
        selected
    }

    pub async fn fetch_feed(&self, feed_url: &str) -> anyhow::Result<Vec<Article>> {
        debug!("Fetching feed: {}", feed_url);

        let response = self.client.get(feed_url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;

        Self::parse_feed(&bytes, feed_url)
    }

    /// Parse a raw RSS/Atom/JSON feed document into articles, in document order.
    pub fn parse_feed(bytes: &[u8], feed_url: &str) -> anyhow::Result<Vec<Article>> {
        let parsed = parser::parse(bytes)?;

        let source = parsed
            .title
            .as_ref()
            .map(|t| t.content.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| feed_url.to_string());

        Ok(parsed
            .entries
            .iter()
            .filter_map(|entry| Self::extract_article(entry, &source))
            .collect())
    }

    /// Normalize one entry; `None` when it has no title or no link.
    pub fn extract_article(entry: &Entry, source: &str) -> Option<Article> {
        let title = entry
            .title
            .as_ref()
            .map(|t| t.content.trim().to_string())
            .unwrap_or_default();
        let link = primary_link(&entry.links)
            .map(|href| href.trim().to_string())
            .unwrap_or_default();

        if title.is_empty() || link.is_empty() {
            debug!("Skipping entry without title or link: {}", entry.id);
            return None;
        }

        let summary = entry
            .summary
            .as_ref()
            .map(|s| s.content.clone())
            .filter(|s| !s.is_empty())
            .or_else(|| entry.content.as_ref().and_then(|c| c.body.clone()))
            .unwrap_or_default();

        let published = entry
            .published
            .or(entry.updated)
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_default();

        Some(Article {
            title,
            link,
            summary,
            published,
            source: source.to_string(),
        })
    }
}

/// The entry's article URL: the first `alternate` (or rel-less) link, else the first link.
pub fn primary_link(links: &[Link]) -> Option<&str> {
    links
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .or_else(|| links.first())
        .map(|l| l.href.as_str())
}

/// Deduplicate by link (last write wins, first position kept), sort
/// descending by the `published` string, keep at most `max_articles`.
pub fn select_articles(articles: Vec<Article>, max_articles: usize) -> Vec<Article> {
    let mut unique: Vec<Article> = Vec::with_capacity(articles.len());
    let mut positions: HashMap<String, usize> = HashMap::new();

    for article in articles {
        match positions.get(&article.link) {
            Some(&idx) => unique[idx] = article,
            None => {
                positions.insert(article.link.clone(), unique.len());
                unique.push(article);
            }
        }
    }

    // Stable, so equal timestamps keep fetch order
    unique.sort_by(|a, b| b.published.cmp(&a.published));
    unique.truncate(max_articles);
    unique
}
