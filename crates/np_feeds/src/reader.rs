//! RSS fetching across the feed roster and conversion into candidates.

use std::collections::HashSet;
use std::time::Duration;

use chrono::Utc;
use feed_rs::model::Feed;
use np_core::text::{sanitize_text, truncate_chars};
use np_core::{candidate_id, Candidate, Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::sources::{infer_category, FeedSource, FEEDS};

const FETCH_TIMEOUT: Duration = Duration::from_secs(20);
const MAX_ENTRIES_PER_FEED: usize = 50;
const MAX_TOTAL_CANDIDATES: usize = 200;
const MAX_SUMMARY_CHARS: usize = 18_000;

const USER_AGENT: &str =
    "Mozilla/5.0 (compatible; np-feeds/0.1; +https://github.com/newspulse)";

// Feeds without media fields often inline a thumbnail in the summary HTML.
static IMG_SRC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<img[^>]+src=["']([^"']+)["']"#).unwrap());

pub struct FeedReader {
    client: reqwest::Client,
    feeds: &'static [FeedSource],
}

impl Default for FeedReader {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedReader {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            feeds: FEEDS,
        }
    }

    /// Fetch every subscribed feed and return a merged candidate batch,
    /// newest first, deduplicated by id and capped at
    /// [`MAX_TOTAL_CANDIDATES`]. A failing feed is logged and skipped; this
    /// never errors so one dead feed cannot starve a refresh cycle.
    pub async fn fetch_candidates(&self) -> Vec<Candidate> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut all: Vec<Candidate> = Vec::new();

        for source in self.feeds {
            match self.fetch_feed(source).await {
                Ok(candidates) => {
                    debug!(source = source.name, count = candidates.len(), "feed fetched");
                    for c in candidates {
                        if seen.insert(c.id.clone()) {
                            all.push(c);
                        }
                    }
                }
                Err(e) => warn!(source = source.name, error = %e, "feed fetch failed"),
            }
        }

        all.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        all.truncate(MAX_TOTAL_CANDIDATES);
        all
    }

    async fn fetch_feed(&self, source: &FeedSource) -> Result<Vec<Candidate>> {
        let body = self
            .client
            .get(source.url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .timeout(FETCH_TIMEOUT)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        let feed = feed_rs::parser::parse(&body[..])
            .map_err(|e| Error::Feed(format!("{}: {}", source.name, e)))?;
        Ok(candidates_from_feed(feed, source))
    }
}

/// Pure conversion from a parsed feed, separated from the network path so it
/// can be exercised with inline documents.
pub fn candidates_from_feed(feed: Feed, source: &FeedSource) -> Vec<Candidate> {
    let mut out = Vec::new();
    for entry in feed.entries.into_iter().take(MAX_ENTRIES_PER_FEED) {
        let title = match entry.title {
            Some(t) => sanitize_text(&t.content),
            None => continue,
        };
        let Some(link) = entry.links.first().map(|l| l.href.clone()) else {
            continue;
        };
        if title.is_empty() || link.is_empty() {
            continue;
        }

        let raw_summary = entry
            .summary
            .map(|t| t.content)
            .or_else(|| entry.content.and_then(|c| c.body))
            .unwrap_or_default();
        let summary = truncate_chars(&sanitize_text(&raw_summary), MAX_SUMMARY_CHARS);

        let published_at = entry
            .published
            .or(entry.updated)
            .map(|dt| dt.naive_utc())
            .unwrap_or_else(|| Utc::now().naive_utc());

        let image_url = entry
            .media
            .iter()
            .find_map(|m| {
                m.thumbnails
                    .first()
                    .map(|t| t.image.uri.clone())
                    .or_else(|| {
                        m.content.iter().find_map(|c| c.url.as_ref().map(|u| u.to_string()))
                    })
            })
            .or_else(|| {
                IMG_SRC_RE
                    .captures(&raw_summary)
                    .map(|caps| caps[1].to_string())
            });

        out.push(Candidate {
            id: candidate_id(&link, &title),
            category: infer_category(&title, &summary, source.category),
            title,
            summary,
            link,
            published_at,
            source: source.name.to_string(),
            image_url,
        });
    }
    out
}
