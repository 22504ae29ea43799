use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use np_core::{ArticleStore, ContentStore, GeneratedContent, PublishedArticle, Result};
use tokio::sync::RwLock;

/// Non-persistent backend for tests and key-less local runs.
#[derive(Default)]
pub struct MemoryStorage {
    articles: RwLock<HashMap<String, PublishedArticle>>,
    contents: RwLock<HashMap<String, GeneratedContent>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ArticleStore for MemoryStorage {
    async fn save_article(&self, article: &PublishedArticle) -> Result<()> {
        self.articles
            .write()
            .await
            .insert(article.id.clone(), article.clone());
        Ok(())
    }

    async fn save_articles_batch(&self, articles: &[PublishedArticle]) -> Result<usize> {
        let mut map = self.articles.write().await;
        let mut added = 0;
        for article in articles {
            if !map.contains_key(&article.id) {
                map.insert(article.id.clone(), article.clone());
                added += 1;
            }
        }
        Ok(added)
    }

    async fn load_all(&self) -> Result<Vec<PublishedArticle>> {
        let mut all: Vec<PublishedArticle> =
            self.articles.read().await.values().cloned().collect();
        all.sort_by(|a, b| b.added_at.cmp(&a.added_at));
        Ok(all)
    }

    async fn load_by_id(&self, id: &str) -> Result<Option<PublishedArticle>> {
        Ok(self.articles.read().await.get(id).cloned())
    }

    async fn delete_article(&self, id: &str) -> Result<bool> {
        Ok(self.articles.write().await.remove(id).is_some())
    }
}

#[async_trait]
impl ContentStore for MemoryStorage {
    async fn save_content(&self, content: &GeneratedContent) -> Result<()> {
        self.contents
            .write()
            .await
            .insert(content.article_id.clone(), content.clone());
        Ok(())
    }

    async fn load_content(&self, article_id: &str) -> Result<Option<GeneratedContent>> {
        Ok(self
            .contents
            .read()
            .await
            .get(article_id)
            .filter(|c| !c.is_retry_fallback())
            .cloned())
    }

    async fn content_exists(&self, article_id: &str) -> Result<bool> {
        Ok(self.contents.read().await.contains_key(article_id))
    }

    async fn processed_ids(&self) -> Result<HashSet<String>> {
        Ok(self.contents.read().await.keys().cloned().collect())
    }

    async fn fallback_ids(&self) -> Result<HashSet<String>> {
        Ok(self
            .contents
            .read()
            .await
            .values()
            .filter(|c| c.is_retry_fallback())
            .map(|c| c.article_id.clone())
            .collect())
    }

    async fn delete_content(&self, article_id: &str) -> Result<bool> {
        Ok(self.contents.write().await.remove(article_id).is_some())
    }
}
