use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::text::truncate_chars;

/// Coarse topic labels. Feeds carry a default; general-topic sources get a
/// title-based override in np_feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "総合")]
    General,
    #[serde(rename = "国内")]
    Domestic,
    #[serde(rename = "国際")]
    World,
    #[serde(rename = "テクノロジー")]
    Technology,
    #[serde(rename = "政治・社会")]
    Politics,
    #[serde(rename = "スポーツ")]
    Sports,
    #[serde(rename = "エンタメ")]
    Entertainment,
}

/// Display order on the site.
pub const CATEGORY_ORDER: [Category; 7] = [
    Category::General,
    Category::Domestic,
    Category::World,
    Category::Technology,
    Category::Politics,
    Category::Sports,
    Category::Entertainment,
];

impl Category {
    pub fn label(&self) -> &'static str {
        match self {
            Category::General => "総合",
            Category::Domestic => "国内",
            Category::World => "国際",
            Category::Technology => "テクノロジー",
            Category::Politics => "政治・社会",
            Category::Sports => "スポーツ",
            Category::Entertainment => "エンタメ",
        }
    }

    /// Unknown labels fall back to General.
    pub fn from_label(label: &str) -> Self {
        CATEGORY_ORDER
            .iter()
            .copied()
            .find(|c| c.label() == label)
            .unwrap_or(Category::General)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One story as produced by the feed reader, before any processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub link: String,
    /// Timezone-dropped so entries from mixed feeds compare cleanly.
    pub published_at: NaiveDateTime,
    pub source: String,
    pub category: Category,
    pub image_url: Option<String>,
}

/// Stable content fingerprint. Re-fetching the same story must reproduce the
/// same id, which is what makes cross-run dedup and the skip check work.
pub fn candidate_id(link: &str, title: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(link.as_bytes());
    hasher.update(title.as_bytes());
    let digest = hasher.finalize();
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    hex[..16].to_string()
}

/// A candidate with its batch-relative score attached. Never persisted.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub score: f64,
}

/// A candidate that made it onto the site. Keyed by the candidate id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishedArticle {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub link: String,
    pub published_at: NaiveDateTime,
    pub source: String,
    pub category: Category,
    pub image_url: Option<String>,
    pub added_at: DateTime<Utc>,
}

impl PublishedArticle {
    pub fn from_candidate(candidate: Candidate, added_at: DateTime<Utc>) -> Self {
        Self {
            id: candidate.id,
            title: candidate.title,
            summary: candidate.summary,
            link: candidate.link,
            published_at: candidate.published_at,
            source: candidate.source,
            category: candidate.category,
            image_url: candidate.image_url,
            added_at,
        }
    }
}

/// One unit of generated reading material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Block {
    Text { content: String },
    Explain { content: String },
    Section { section: SectionTag, content: String },
}

impl Block {
    pub fn content(&self) -> &str {
        match self {
            Block::Text { content } | Block::Explain { content } => content,
            Block::Section { content, .. } => content,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionTag {
    Facts,
    Background,
    Impact,
    Prediction,
    Caution,
}

/// Number of secondary commentary slots attached to every article.
pub const COMMENTARY_SLOTS: usize = 5;

/// The generated half of an article. Its existence for an id is what makes
/// the matching PublishedArticle displayable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedContent {
    pub article_id: String,
    pub blocks: Vec<Block>,
    pub commentary: [String; COMMENTARY_SLOTS],
}

impl GeneratedContent {
    /// True when this row holds the retry-notice fallback instead of real
    /// generated content.
    pub fn is_retry_fallback(&self) -> bool {
        is_retry_fallback(&self.blocks)
    }
}

/// Fixed explain notice used when block generation could not be structured.
/// Stores recognize it on read and report the article as unprocessed so it
/// gets regenerated instead of being served forever.
pub const RETRY_NOTICE: &str = "（生成に失敗しました。しばらくしてから再度お試しください。）";

pub fn fallback_blocks(text: &str) -> Vec<Block> {
    vec![
        Block::Text {
            content: truncate_chars(text, 3500),
        },
        Block::Explain {
            content: RETRY_NOTICE.to_string(),
        },
    ]
}

pub fn is_retry_fallback(blocks: &[Block]) -> bool {
    match blocks {
        [Block::Text { .. }, Block::Explain { content }] => content == RETRY_NOTICE,
        _ => false,
    }
}
