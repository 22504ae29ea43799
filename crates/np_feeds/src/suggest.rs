//! Search-autosuggest popularity lookups with an in-process cache.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use np_core::SuggestSource;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::debug;

const SUGGEST_URL: &str = "https://www.google.com/complete/search";
const FETCH_TIMEOUT: Duration = Duration::from_secs(5);
/// Keyword churn is unbounded; the cache is dropped wholesale at this size.
const MAX_CACHE_ENTRIES: usize = 10_000;

pub struct GoogleSuggest {
    client: reqwest::Client,
}

impl Default for GoogleSuggest {
    fn default() -> Self {
        Self::new()
    }
}

impl GoogleSuggest {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    async fn lookup(&self, phrase: &str) -> np_core::Result<u32> {
        let body: serde_json::Value = self
            .client
            .get(SUGGEST_URL)
            .query(&[("client", "firefox"), ("hl", "ja"), ("q", phrase)])
            .timeout(FETCH_TIMEOUT)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        // Response shape: [query, [suggestion, ...]].
        Ok(body
            .get(1)
            .and_then(|v| v.as_array())
            .map(|a| a.len() as u32)
            .unwrap_or(0))
    }
}

#[async_trait]
impl SuggestSource for GoogleSuggest {
    async fn suggestion_count(&self, phrase: &str) -> u32 {
        match self.lookup(phrase).await {
            Ok(count) => count,
            Err(e) => {
                debug!(phrase, error = %e, "suggest lookup failed");
                0
            }
        }
    }
}

/// Memoizing wrapper: scoring samples the same keywords across candidates of
/// one batch, so most lookups repeat within minutes.
pub struct CachedSuggest<S> {
    inner: S,
    cache: Mutex<HashMap<String, u32>>,
}

impl<S> CachedSuggest<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }
}

fn cache_key(phrase: &str) -> String {
    let digest = Sha256::digest(phrase.to_lowercase().as_bytes());
    format!("{:x}", digest)
}

#[async_trait]
impl<S: SuggestSource> SuggestSource for CachedSuggest<S> {
    async fn suggestion_count(&self, phrase: &str) -> u32 {
        let key = cache_key(phrase);
        {
            let cache = self.cache.lock().await;
            if let Some(&count) = cache.get(&key) {
                return count;
            }
        }
        let count = self.inner.suggestion_count(phrase).await;
        let mut cache = self.cache.lock().await;
        if cache.len() >= MAX_CACHE_ENTRIES {
            cache.clear();
        }
        cache.insert(key, count);
        count
    }
}
