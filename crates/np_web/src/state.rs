use std::sync::Arc;

use np_core::{ArticleStore, ContentGenerator, ContentStore};
use np_feeds::FeedReader;
use np_pipeline::{NewsAggregator, Processor};

pub struct AppState {
    pub aggregator: Arc<NewsAggregator>,
    pub processor: Arc<Processor>,
    pub reader: Arc<FeedReader>,
    pub generator: Arc<dyn ContentGenerator>,
    pub articles: Arc<dyn ArticleStore>,
    pub contents: Arc<dyn ContentStore>,
}
