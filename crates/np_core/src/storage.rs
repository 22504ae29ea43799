use std::collections::HashSet;

use async_trait::async_trait;

use crate::types::{GeneratedContent, PublishedArticle};
use crate::Result;

/// Article metadata store. Keyed by the candidate id; at most one row per id.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Upsert. Re-saving an id overwrites the existing row (force reprocessing).
    async fn save_article(&self, article: &PublishedArticle) -> Result<()>;

    /// Insert-if-absent for seeding. Returns how many rows were actually added.
    async fn save_articles_batch(&self, articles: &[PublishedArticle]) -> Result<usize>;

    /// All stored articles, newest `added_at` first.
    async fn load_all(&self) -> Result<Vec<PublishedArticle>>;

    async fn load_by_id(&self, id: &str) -> Result<Option<PublishedArticle>>;

    /// Returns true if a row existed.
    async fn delete_article(&self, id: &str) -> Result<bool>;
}

/// Generated-content store. Shares the id keyspace with [`ArticleStore`]; the
/// two must be treated as one logical unit even when physically separate.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn save_content(&self, content: &GeneratedContent) -> Result<()>;

    /// None for missing ids AND for stored retry-fallback content, so a bad
    /// generation is regenerated on the next run instead of served.
    async fn load_content(&self, article_id: &str) -> Result<Option<GeneratedContent>>;

    /// Raw existence, fallback rows included.
    async fn content_exists(&self, article_id: &str) -> Result<bool>;

    /// Ids that have generated content, i.e. the displayable set. Raw like
    /// [`Self::content_exists`]: a fallback row keeps its article visible
    /// until a later run regenerates it.
    async fn processed_ids(&self) -> Result<HashSet<String>>;

    /// Subset of [`Self::processed_ids`] whose stored row is the retry
    /// fallback. Selection subtracts these so the articles get regenerated;
    /// display keeps them.
    async fn fallback_ids(&self) -> Result<HashSet<String>>;

    async fn delete_content(&self, article_id: &str) -> Result<bool>;
}
