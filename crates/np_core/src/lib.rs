pub mod content;
pub mod error;
pub mod storage;
pub mod text;
pub mod types;

pub use content::{BodyFetcher, ContentGenerator, SuggestSource, TrendSource};
pub use error::Error;
pub use storage::{ArticleStore, ContentStore};
pub use types::{
    candidate_id, fallback_blocks, is_retry_fallback, Block, Candidate, Category,
    GeneratedContent, PublishedArticle, ScoredCandidate, SectionTag, CATEGORY_ORDER,
    COMMENTARY_SLOTS, RETRY_NOTICE,
};

pub type Result<T> = std::result::Result<T, Error>;
