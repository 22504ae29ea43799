//! Upstream data acquisition: RSS feeds, trending keywords, article bodies
//! and search-suggestion counts. Everything here is best effort; callers get
//! empty results rather than errors for network trouble.

pub mod body;
pub mod reader;
pub mod sources;
pub mod suggest;
pub mod trends;

pub use body::HttpBodyFetcher;
pub use reader::FeedReader;
pub use sources::{FeedSource, FEEDS};
pub use suggest::{CachedSuggest, GoogleSuggest};
pub use trends::GoogleTrends;
