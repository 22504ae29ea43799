//! Full-text extraction for story links. Best effort only: any failure means
//! the pipeline falls back to the feed summary.

use std::time::Duration;

use async_trait::async_trait;
use np_core::BodyFetcher;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;

const FETCH_TIMEOUT: Duration = Duration::from_secs(20);
/// A selector hit longer than this is taken immediately.
const PREFERRED_LEN: usize = 200;
/// Shorter than this is treated as extraction failure.
const MIN_LEN: usize = 100;
const MAX_BODY_CHARS: usize = 50_000;

const USER_AGENT: &str =
    "Mozilla/5.0 (compatible; np-feeds/0.1; +https://github.com/newspulse)";

/// Article-body containers, most specific first.
const BODY_SELECTORS: &[&str] = &[
    "article",
    r#"div[class*="article-body"]"#,
    r#"div[class*="articleBody"]"#,
    r#"div[class*="article"]"#,
    r#"div[class*="story-body"]"#,
    r#"div[class*="content"]"#,
    "main",
];

// Chrome elements whose text would pollute the extraction. The regex crate
// has no backreferences, so each tag gets its own alternative.
static CHROME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?is)<script[^>]*>.*?</script>",
        r"|<style[^>]*>.*?</style>",
        r"|<nav[^>]*>.*?</nav>",
        r"|<header[^>]*>.*?</header>",
        r"|<footer[^>]*>.*?</footer>",
        r"|<aside[^>]*>.*?</aside>",
        r"|<form[^>]*>.*?</form>",
        r"|<iframe[^>]*>.*?</iframe>",
    ))
    .unwrap()
});

pub struct HttpBodyFetcher {
    client: reqwest::Client,
}

impl Default for HttpBodyFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpBodyFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl BodyFetcher for HttpBodyFetcher {
    async fn fetch_body(&self, url: &str) -> Option<String> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .timeout(FETCH_TIMEOUT)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .ok()?;
        let html = response.text().await.ok()?;
        let body = extract_body(&html);
        if body.is_none() {
            debug!(url, "no usable body container found");
        }
        body
    }
}

/// Try each container selector in order: the first hit over
/// [`PREFERRED_LEN`] wins; otherwise the longest hit over [`MIN_LEN`] is
/// used. None when nothing clears the minimum.
pub fn extract_body(html: &str) -> Option<String> {
    let cleaned = CHROME_RE.replace_all(html, " ");
    let document = Html::parse_document(&cleaned);

    let mut best: Option<String> = None;
    for selector_str in BODY_SELECTORS {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };
        let text: String = document
            .select(&selector)
            .flat_map(|el| el.text())
            .collect::<Vec<_>>()
            .join(" ");
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        let len = text.chars().count();
        if len > PREFERRED_LEN {
            return Some(truncate(text));
        }
        if len >= MIN_LEN && best.as_ref().map_or(true, |b| len > b.chars().count()) {
            best = Some(text);
        }
    }
    best.map(truncate)
}

fn truncate(text: String) -> String {
    if text.chars().count() <= MAX_BODY_CHARS {
        text
    } else {
        text.chars().take(MAX_BODY_CHARS).collect()
    }
}
