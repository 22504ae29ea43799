//! Read-side aggregation: a cached snapshot of displayable articles, cached
//! trending keywords and category-grouped pagination for the site.

use std::sync::Arc;
use std::time::{Duration, Instant};

use np_core::{
    ArticleStore, Category, ContentStore, GeneratedContent, PublishedArticle, Result, TrendSource,
    CATEGORY_ORDER,
};
use tokio::sync::RwLock;
use tracing::debug;

/// Hard cap on articles served to the site, newest first.
pub const DISPLAY_LIMIT: usize = 2000;
pub const ITEMS_PER_PAGE: usize = 24;

const DEFAULT_SNAPSHOT_TTL: Duration = Duration::from_secs(60);
const DEFAULT_TRENDS_TTL: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Pagination {
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub total_pages: usize,
    pub has_prev: bool,
    pub has_next: bool,
}

impl Pagination {
    fn new(page: usize, per_page: usize, total: usize) -> Self {
        let total_pages = (total.div_ceil(per_page)).max(1);
        let page = page.clamp(1, total_pages);
        Self {
            page,
            per_page,
            total,
            total_pages,
            has_prev: page > 1,
            has_next: page < total_pages,
        }
    }
}

/// One category section of a page, in site display order.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CategoryGroup {
    pub category: Category,
    pub articles: Vec<PublishedArticle>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct PageView {
    pub groups: Vec<CategoryGroup>,
    pub pagination: Pagination,
}

struct Cached<T> {
    value: T,
    fetched_at: Instant,
}

impl<T> Cached<T> {
    fn fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }
}

/// Serves site reads off a short-lived snapshot so page views never hit the
/// store more than once per TTL window. Writers call [`invalidate`] after a
/// pipeline run.
///
/// [`invalidate`]: NewsAggregator::invalidate
pub struct NewsAggregator {
    articles: Arc<dyn ArticleStore>,
    contents: Arc<dyn ContentStore>,
    trends: Arc<dyn TrendSource>,
    snapshot_ttl: Duration,
    trends_ttl: Duration,
    snapshot: RwLock<Option<Cached<Vec<PublishedArticle>>>>,
    trending: RwLock<Option<Cached<Vec<String>>>>,
}

impl NewsAggregator {
    pub fn new(
        articles: Arc<dyn ArticleStore>,
        contents: Arc<dyn ContentStore>,
        trends: Arc<dyn TrendSource>,
    ) -> Self {
        Self::with_ttls(articles, contents, trends, DEFAULT_SNAPSHOT_TTL, DEFAULT_TRENDS_TTL)
    }

    pub fn with_ttls(
        articles: Arc<dyn ArticleStore>,
        contents: Arc<dyn ContentStore>,
        trends: Arc<dyn TrendSource>,
        snapshot_ttl: Duration,
        trends_ttl: Duration,
    ) -> Self {
        Self {
            articles,
            contents,
            trends,
            snapshot_ttl,
            trends_ttl,
            snapshot: RwLock::new(None),
            trending: RwLock::new(None),
        }
    }

    /// Articles that have generated content, newest first, capped at
    /// [`DISPLAY_LIMIT`]. Seeded rows without content never appear here.
    pub async fn displayable(&self) -> Result<Vec<PublishedArticle>> {
        {
            let guard = self.snapshot.read().await;
            if let Some(cached) = guard.as_ref() {
                if cached.fresh(self.snapshot_ttl) {
                    return Ok(cached.value.clone());
                }
            }
        }

        let mut guard = self.snapshot.write().await;
        // Another task may have rebuilt while we waited for the write lock.
        if let Some(cached) = guard.as_ref() {
            if cached.fresh(self.snapshot_ttl) {
                return Ok(cached.value.clone());
            }
        }

        let processed = self.contents.processed_ids().await?;
        let mut displayable: Vec<PublishedArticle> = self
            .articles
            .load_all()
            .await?
            .into_iter()
            .filter(|a| processed.contains(&a.id))
            .collect();
        displayable.truncate(DISPLAY_LIMIT);
        debug!(count = displayable.len(), "rebuilt display snapshot");

        *guard = Some(Cached {
            value: displayable.clone(),
            fetched_at: Instant::now(),
        });
        Ok(displayable)
    }

    /// Drop the snapshot so the next read sees freshly published articles.
    pub async fn invalidate(&self) {
        *self.snapshot.write().await = None;
    }

    /// Single article lookup: snapshot first, store as fallback so a direct
    /// link works even for an article the snapshot predates.
    pub async fn article(&self, id: &str) -> Result<Option<PublishedArticle>> {
        let snapshot = self.displayable().await?;
        if let Some(article) = snapshot.iter().find(|a| a.id == id) {
            return Ok(Some(article.clone()));
        }
        self.articles.load_by_id(id).await
    }

    /// Generated content for one article. Retry-fallback rows read as absent.
    pub async fn content(&self, id: &str) -> Result<Option<GeneratedContent>> {
        self.contents.load_content(id).await
    }

    /// Current trending keywords, refreshed at most once per TTL window.
    /// An upstream failure yields the empty list and is cached like any other
    /// value, so a flaky trend source cannot hammer the network.
    pub async fn trending_keywords(&self) -> Vec<String> {
        {
            let guard = self.trending.read().await;
            if let Some(cached) = guard.as_ref() {
                if cached.fresh(self.trends_ttl) {
                    return cached.value.clone();
                }
            }
        }

        let mut guard = self.trending.write().await;
        if let Some(cached) = guard.as_ref() {
            if cached.fresh(self.trends_ttl) {
                return cached.value.clone();
            }
        }
        let keywords = self.trends.trending_keywords().await;
        *guard = Some(Cached {
            value: keywords.clone(),
            fetched_at: Instant::now(),
        });
        keywords
    }

    /// One page of the site: the page slice grouped by category, sections in
    /// fixed display order, empty sections omitted. Pages are 1-based and
    /// out-of-range requests clamp to the nearest valid page.
    pub async fn page(&self, page: usize) -> Result<PageView> {
        let all = self.displayable().await?;
        let pagination = Pagination::new(page, ITEMS_PER_PAGE, all.len());
        let start = (pagination.page - 1) * ITEMS_PER_PAGE;
        let slice = &all[start.min(all.len())..(start + ITEMS_PER_PAGE).min(all.len())];

        let mut groups = Vec::new();
        for category in CATEGORY_ORDER {
            let articles: Vec<PublishedArticle> = slice
                .iter()
                .filter(|a| a.category == category)
                .cloned()
                .collect();
            if !articles.is_empty() {
                groups.push(CategoryGroup { category, articles });
            }
        }
        Ok(PageView { groups, pagination })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, Utc};
    use np_core::{candidate_id, Block, Candidate};
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct CountingStore {
        articles: Mutex<HashMap<String, PublishedArticle>>,
        contents: Mutex<HashMap<String, GeneratedContent>>,
        load_all_calls: AtomicUsize,
    }

    #[async_trait]
    impl ArticleStore for CountingStore {
        async fn save_article(&self, article: &PublishedArticle) -> np_core::Result<()> {
            self.articles.lock().await.insert(article.id.clone(), article.clone());
            Ok(())
        }

        async fn save_articles_batch(
            &self,
            articles: &[PublishedArticle],
        ) -> np_core::Result<usize> {
            for a in articles {
                self.save_article(a).await?;
            }
            Ok(articles.len())
        }

        async fn load_all(&self) -> np_core::Result<Vec<PublishedArticle>> {
            self.load_all_calls.fetch_add(1, Ordering::SeqCst);
            let mut all: Vec<_> = self.articles.lock().await.values().cloned().collect();
            all.sort_by(|a, b| b.added_at.cmp(&a.added_at));
            Ok(all)
        }

        async fn load_by_id(&self, id: &str) -> np_core::Result<Option<PublishedArticle>> {
            Ok(self.articles.lock().await.get(id).cloned())
        }

        async fn delete_article(&self, id: &str) -> np_core::Result<bool> {
            Ok(self.articles.lock().await.remove(id).is_some())
        }
    }

    #[async_trait]
    impl ContentStore for CountingStore {
        async fn save_content(&self, content: &GeneratedContent) -> np_core::Result<()> {
            self.contents
                .lock()
                .await
                .insert(content.article_id.clone(), content.clone());
            Ok(())
        }

        async fn load_content(&self, id: &str) -> np_core::Result<Option<GeneratedContent>> {
            Ok(self
                .contents
                .lock()
                .await
                .get(id)
                .filter(|c| !c.is_retry_fallback())
                .cloned())
        }

        async fn content_exists(&self, id: &str) -> np_core::Result<bool> {
            Ok(self.contents.lock().await.contains_key(id))
        }

        async fn processed_ids(&self) -> np_core::Result<HashSet<String>> {
            Ok(self.contents.lock().await.keys().cloned().collect())
        }

        async fn fallback_ids(&self) -> np_core::Result<HashSet<String>> {
            Ok(self
                .contents
                .lock()
                .await
                .values()
                .filter(|c| c.is_retry_fallback())
                .map(|c| c.article_id.clone())
                .collect())
        }

        async fn delete_content(&self, id: &str) -> np_core::Result<bool> {
            Ok(self.contents.lock().await.remove(id).is_some())
        }
    }

    struct CountingTrends {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TrendSource for CountingTrends {
        async fn trending_keywords(&self) -> Vec<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            vec!["金利".to_string(), "半導体".to_string()]
        }
    }

    fn article(title: &str, category: Category, minutes_ago: i64) -> PublishedArticle {
        let link = format!("https://example.com/{}", title);
        let candidate = Candidate {
            id: candidate_id(&link, title),
            title: title.to_string(),
            summary: "要約".to_string(),
            link,
            published_at: Utc::now().naive_utc(),
            source: "NHK".to_string(),
            category,
            image_url: None,
        };
        PublishedArticle::from_candidate(
            candidate,
            Utc::now() - ChronoDuration::minutes(minutes_ago),
        )
    }

    fn content_for(id: &str) -> GeneratedContent {
        GeneratedContent {
            article_id: id.to_string(),
            blocks: vec![Block::Text { content: "本文".to_string() }],
            commentary: Default::default(),
        }
    }

    async fn seeded(n: usize, processed: usize) -> Arc<CountingStore> {
        let store = Arc::new(CountingStore::default());
        for i in 0..n {
            let a = article(&format!("記事その{}", i), Category::General, i as i64);
            if i < processed {
                store.save_content(&content_for(&a.id)).await.unwrap();
            }
            store.save_article(&a).await.unwrap();
        }
        store
    }

    fn aggregator(store: Arc<CountingStore>) -> NewsAggregator {
        NewsAggregator::new(store.clone(), store, Arc::new(CountingTrends { calls: AtomicUsize::new(0) }))
    }

    #[tokio::test]
    async fn test_displayable_excludes_unprocessed() {
        let store = seeded(6, 4).await;
        let agg = aggregator(store);
        let shown = agg.displayable().await.unwrap();
        assert_eq!(shown.len(), 4);
    }

    #[tokio::test]
    async fn test_snapshot_is_cached_within_ttl() {
        let store = seeded(3, 3).await;
        let agg = aggregator(store.clone());
        agg.displayable().await.unwrap();
        agg.displayable().await.unwrap();
        assert_eq!(store.load_all_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_reload() {
        let store = seeded(3, 3).await;
        let agg = aggregator(store.clone());
        agg.displayable().await.unwrap();

        let extra = article("追加の記事", Category::Technology, 0);
        store.save_content(&content_for(&extra.id)).await.unwrap();
        store.save_article(&extra).await.unwrap();

        // Stale until invalidated.
        assert_eq!(agg.displayable().await.unwrap().len(), 3);
        agg.invalidate().await;
        assert_eq!(agg.displayable().await.unwrap().len(), 4);
        assert_eq!(store.load_all_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_article_falls_back_to_store() {
        let store = seeded(2, 2).await;
        let agg = aggregator(store.clone());
        agg.displayable().await.unwrap();

        // Unprocessed article: absent from the snapshot, still reachable by id.
        let hidden = article("未処理の記事", Category::World, 0);
        store.save_article(&hidden).await.unwrap();
        let found = agg.article(&hidden.id).await.unwrap();
        assert_eq!(found.map(|a| a.id), Some(hidden.id));
        assert!(agg.article("no-such-id").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_trending_is_cached_within_ttl() {
        let store = seeded(0, 0).await;
        let trends = Arc::new(CountingTrends { calls: AtomicUsize::new(0) });
        let agg = NewsAggregator::new(store.clone(), store, trends.clone());
        assert_eq!(agg.trending_keywords().await.len(), 2);
        agg.trending_keywords().await;
        assert_eq!(trends.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_pagination_math() {
        let p = Pagination::new(2, 24, 50);
        assert_eq!(p.total_pages, 3);
        assert!(p.has_prev);
        assert!(p.has_next);
        // Out-of-range page clamps.
        let p = Pagination::new(9, 24, 50);
        assert_eq!(p.page, 3);
        assert!(!p.has_next);
        // Empty set still has one (empty) page.
        let p = Pagination::new(1, 24, 0);
        assert_eq!(p.total_pages, 1);
        assert!(!p.has_prev && !p.has_next);
    }

    #[tokio::test]
    async fn test_page_groups_by_category_in_display_order() {
        let store = Arc::new(CountingStore::default());
        for (i, cat) in [Category::Technology, Category::General, Category::Technology]
            .into_iter()
            .enumerate()
        {
            let a = article(&format!("分類テスト{}", i), cat, i as i64);
            store.save_content(&content_for(&a.id)).await.unwrap();
            store.save_article(&a).await.unwrap();
        }
        let agg = aggregator(store);
        let view = agg.page(1).await.unwrap();
        assert_eq!(view.groups.len(), 2);
        // 総合 (General) precedes テクノロジー (Technology) in display order.
        assert_eq!(view.groups[0].category, Category::General);
        assert_eq!(view.groups[1].category, Category::Technology);
        assert_eq!(view.groups[1].articles.len(), 2);
        assert_eq!(view.pagination.total, 3);
    }

    #[tokio::test]
    async fn test_page_slices_before_grouping() {
        let store = seeded(30, 30).await;
        let agg = aggregator(store);
        let first = agg.page(1).await.unwrap();
        let total_on_page: usize = first.groups.iter().map(|g| g.articles.len()).sum();
        assert_eq!(total_on_page, ITEMS_PER_PAGE);
        let second = agg.page(2).await.unwrap();
        let total_on_second: usize = second.groups.iter().map(|g| g.articles.len()).sum();
        assert_eq!(total_on_second, 6);
        assert!(second.pagination.has_prev);
        assert!(!second.pagination.has_next);
    }
}
