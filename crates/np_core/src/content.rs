use async_trait::async_trait;

use crate::types::Block;
use crate::Result;

/// The content-generation capability (an LLM behind a chat API). Implementors
/// may fail; callers degrade per the pipeline error contract instead of
/// aborting the batch.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    fn name(&self) -> &str;

    /// Restructure an article into a block sequence. An empty vec signals
    /// give-up; the caller must not persist anything in that case.
    async fn generate_blocks(&self, title: &str, content: &str) -> Result<Vec<Block>>;

    /// One secondary commentary string for the given slot (0-based).
    async fn commentary(&self, title: &str, content: &str, slot: usize) -> Result<String>;

    /// Localize a foreign title + summary. Implementations should prefix the
    /// title with a short 【…】 attention marker. Echoing the input back is the
    /// accepted failure mode.
    async fn translate_pair(&self, title: &str, summary: &str) -> Result<(String, String)>;

    /// Localize a full article body. Identity on failure.
    async fn translate_body(&self, body: &str) -> Result<String>;
}

/// Full-text retrieval for a story link. None means "use the summary only".
#[async_trait]
pub trait BodyFetcher: Send + Sync {
    async fn fetch_body(&self, url: &str) -> Option<String>;
}

/// Search-autosuggest popularity proxy. The count is only meaningful as
/// "higher is more searched". Never errors; 0 covers every failure.
#[async_trait]
pub trait SuggestSource: Send + Sync {
    async fn suggestion_count(&self, phrase: &str) -> u32;
}

/// Currently-popular search keywords. Empty on failure, never errors.
#[async_trait]
pub trait TrendSource: Send + Sync {
    async fn trending_keywords(&self) -> Vec<String>;
}
