//! News processing pipeline: lightweight filtering, keyword extraction,
//! multi-signal scoring, diversity-aware selection and the orchestration that
//! turns a fetched batch into published, AI-restructured articles.
//!
//! Everything network- and storage-shaped is behind the `np_core` traits, so
//! the whole pipeline runs against in-memory fakes in tests.

pub mod aggregator;
pub mod filter;
pub mod keywords;
pub mod processor;
pub mod scorer;
pub mod select;

pub use aggregator::{NewsAggregator, PageView, Pagination, DISPLAY_LIMIT, ITEMS_PER_PAGE};
pub use keywords::{KeywordExtractor, Tokenizer};
pub use processor::{seed_articles, Outcome, PipelineConfig, Processor};
pub use scorer::{rank_by_trending, rank_candidates};
pub use select::{select_diverse, Selection};
