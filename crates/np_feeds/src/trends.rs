//! Trending search keywords from the Google Trends RSS feed for Japan.

use std::time::Duration;

use async_trait::async_trait;
use feed_rs::model::Feed;
use np_core::text::sanitize_text;
use np_core::TrendSource;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

const TRENDS_URL: &str = "https://trends.google.co.jp/trending/rss?geo=JP";
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_KEYWORDS: usize = 20;

// Some entries carry a placeholder title instead of the actual query.
static GENERIC_LABEL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^トレンド\s*\d+$").unwrap());

pub struct GoogleTrends {
    client: reqwest::Client,
}

impl Default for GoogleTrends {
    fn default() -> Self {
        Self::new()
    }
}

impl GoogleTrends {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    async fn fetch(&self) -> np_core::Result<Feed> {
        let body = self
            .client
            .get(TRENDS_URL)
            .timeout(FETCH_TIMEOUT)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        feed_rs::parser::parse(&body[..])
            .map_err(|e| np_core::Error::Feed(format!("trends: {}", e)))
    }
}

#[async_trait]
impl TrendSource for GoogleTrends {
    async fn trending_keywords(&self) -> Vec<String> {
        match self.fetch().await {
            Ok(feed) => keywords_from_feed(feed),
            Err(e) => {
                warn!(error = %e, "trend fetch failed");
                Vec::new()
            }
        }
    }
}

fn keywords_from_feed(feed: Feed) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    feed.entries
        .into_iter()
        .filter_map(|e| e.title.map(|t| sanitize_text(&t.content)))
        .filter(|t| !t.is_empty() && !GENERIC_LABEL_RE.is_match(t))
        // First spelling wins; repeats differing only in case are noise.
        .filter(|t| seen.insert(t.to_lowercase()))
        .take(MAX_KEYWORDS)
        .collect()
}
