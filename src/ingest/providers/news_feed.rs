// src/ingest/providers/news_feed.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::counter;
use serde::Deserialize;

use crate::ingest::normalize_text;
use crate::ingest::types::SignalSource;
use crate::metrics::INGEST_ARTICLES_TOTAL;
use crate::signal::{RawSignal, RawTimestamp};

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
struct Article {
    title: Option<String>,
    description: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
    source: Option<ArticleSource>,
}

#[derive(Debug, Deserialize)]
struct ArticleSource {
    name: Option<String>,
}

/// News-search response (`{"articles": [...]}`) taken as content, not fetched.
/// Each article becomes a `news` signal with id `NEWS-001`, `NEWS-002`, ...
pub struct NewsFeedProvider {
    pub feed_content: String,
}

impl NewsFeedProvider {
    pub fn from_fixture(content: &str) -> Self {
        Self {
            feed_content: content.to_string(),
        }
    }
}

#[async_trait]
impl SignalSource for NewsFeedProvider {
    async fn fetch(&self) -> Result<Vec<RawSignal>> {
        let feed: Feed = serde_json::from_str(&self.feed_content).context("parsing news feed json")?;
        let mut out = Vec::with_capacity(feed.articles.len());

        for a in feed.articles {
            let title = a.title.as_deref().unwrap_or_default().trim();
            let desc = a.description.as_deref().unwrap_or_default().trim();
            let text_raw = if desc.is_empty() {
                title.to_string()
            } else {
                format!("{title}. {desc}")
            };
            let text = normalize_text(&text_raw);
            if text.is_empty() {
                continue;
            }
            out.push(RawSignal {
                id: Some(format!("NEWS-{:03}", out.len() + 1)),
                text: Some(text),
                source: Some("news".to_string()),
                timestamp: a.published_at.map(RawTimestamp::Text),
                location: a
                    .source
                    .and_then(|s| s.name)
                    .filter(|n| !n.trim().is_empty()),
                ..Default::default()
            });
        }

        counter!(INGEST_ARTICLES_TOTAL).increment(out.len() as u64);
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "news_feed"
    }
}
