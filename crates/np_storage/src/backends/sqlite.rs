use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use np_core::{
    is_retry_fallback, ArticleStore, Block, Category, ContentStore, Error, GeneratedContent,
    PublishedArticle, Result,
};
use sqlx::sqlite::SqlitePool;
use sqlx::Row;

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS articles (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        summary TEXT NOT NULL,
        link TEXT NOT NULL,
        published_at TEXT NOT NULL,
        source TEXT NOT NULL,
        category TEXT NOT NULL,
        image_url TEXT,
        added_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS contents (
        article_id TEXT PRIMARY KEY,
        blocks TEXT NOT NULL,
        commentary TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_articles_added_at ON articles (added_at DESC)",
];

pub struct SqliteStorage {
    pool: SqlitePool,
    db_path: PathBuf,
}

impl SqliteStorage {
    pub async fn new(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let pool = SqlitePool::connect(&format!("sqlite:{}?mode=rwc", db_path.display()))
            .await
            .map_err(|e| Error::Storage(format!("connect {}: {}", db_path.display(), e)))?;
        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&pool)
                .await
                .map_err(|e| Error::Storage(format!("migration {}: {}", i, e)))?;
        }
        Ok(Self {
            pool,
            db_path: db_path.to_path_buf(),
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

fn article_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<PublishedArticle> {
    let published_at: String = row.get("published_at");
    let added_at: String = row.get("added_at");
    Ok(PublishedArticle {
        id: row.get("id"),
        title: row.get("title"),
        summary: row.get("summary"),
        link: row.get("link"),
        published_at: published_at
            .parse()
            .map_err(|e| Error::Storage(format!("published_at: {}", e)))?,
        source: row.get("source"),
        category: Category::from_label(row.get("category")),
        image_url: row.get("image_url"),
        added_at: chrono::DateTime::parse_from_rfc3339(&added_at)
            .map_err(|e| Error::Storage(format!("added_at: {}", e)))?
            .with_timezone(&chrono::Utc),
    })
}

#[async_trait]
impl ArticleStore for SqliteStorage {
    async fn save_article(&self, article: &PublishedArticle) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO articles
            (id, title, summary, link, published_at, source, category, image_url, added_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&article.id)
        .bind(&article.title)
        .bind(&article.summary)
        .bind(&article.link)
        .bind(article.published_at.to_string())
        .bind(&article.source)
        .bind(article.category.label())
        .bind(article.image_url.as_deref())
        .bind(article.added_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Storage(format!("save article: {}", e)))?;
        Ok(())
    }

    async fn save_articles_batch(&self, articles: &[PublishedArticle]) -> Result<usize> {
        let mut added = 0;
        for article in articles {
            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO articles
                (id, title, summary, link, published_at, source, category, image_url, added_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&article.id)
            .bind(&article.title)
            .bind(&article.summary)
            .bind(&article.link)
            .bind(article.published_at.to_string())
            .bind(&article.source)
            .bind(article.category.label())
            .bind(article.image_url.as_deref())
            .bind(article.added_at.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Storage(format!("batch insert: {}", e)))?;
            added += result.rows_affected() as usize;
        }
        Ok(added)
    }

    async fn load_all(&self) -> Result<Vec<PublishedArticle>> {
        let rows = sqlx::query("SELECT * FROM articles ORDER BY added_at DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::Storage(format!("load all: {}", e)))?;
        rows.iter().map(article_from_row).collect()
    }

    async fn load_by_id(&self, id: &str) -> Result<Option<PublishedArticle>> {
        let row = sqlx::query("SELECT * FROM articles WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::Storage(format!("load by id: {}", e)))?;
        row.as_ref().map(article_from_row).transpose()
    }

    async fn delete_article(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM articles WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Storage(format!("delete article: {}", e)))?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ContentStore for SqliteStorage {
    async fn save_content(&self, content: &GeneratedContent) -> Result<()> {
        let blocks = serde_json::to_string(&content.blocks)?;
        let commentary = serde_json::to_string(&content.commentary)?;
        sqlx::query(
            "INSERT OR REPLACE INTO contents (article_id, blocks, commentary) VALUES (?, ?, ?)",
        )
        .bind(&content.article_id)
        .bind(blocks)
        .bind(commentary)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Storage(format!("save content: {}", e)))?;
        Ok(())
    }

    async fn load_content(&self, article_id: &str) -> Result<Option<GeneratedContent>> {
        let row = sqlx::query("SELECT blocks, commentary FROM contents WHERE article_id = ?")
            .bind(article_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::Storage(format!("load content: {}", e)))?;
        let Some(row) = row else {
            return Ok(None);
        };
        let blocks: String = row.get("blocks");
        let commentary: String = row.get("commentary");
        let content = GeneratedContent {
            article_id: article_id.to_string(),
            blocks: serde_json::from_str(&blocks)?,
            commentary: serde_json::from_str(&commentary)?,
        };
        if content.is_retry_fallback() {
            return Ok(None);
        }
        Ok(Some(content))
    }

    async fn content_exists(&self, article_id: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM contents WHERE article_id = ?")
            .bind(article_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::Storage(format!("content exists: {}", e)))?;
        Ok(row.is_some())
    }

    async fn processed_ids(&self) -> Result<HashSet<String>> {
        let rows = sqlx::query("SELECT article_id FROM contents")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::Storage(format!("processed ids: {}", e)))?;
        Ok(rows.iter().map(|r| r.get::<String, _>("article_id")).collect())
    }

    async fn fallback_ids(&self) -> Result<HashSet<String>> {
        let rows = sqlx::query("SELECT article_id, blocks FROM contents")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::Storage(format!("fallback ids: {}", e)))?;
        let mut ids = HashSet::new();
        for row in &rows {
            let blocks: String = row.get("blocks");
            let blocks: Vec<Block> = serde_json::from_str(&blocks)?;
            if is_retry_fallback(&blocks) {
                ids.insert(row.get::<String, _>("article_id"));
            }
        }
        Ok(ids)
    }

    async fn delete_content(&self, article_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM contents WHERE article_id = ?")
            .bind(article_id)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Storage(format!("delete content: {}", e)))?;
        Ok(result.rows_affected() > 0)
    }
}
