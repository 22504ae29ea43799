use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use np_core::{ArticleStore, ContentGenerator, ContentStore, Error, Result};
use np_feeds::{CachedSuggest, FeedReader, GoogleSuggest, GoogleTrends, HttpBodyFetcher};
use np_pipeline::{NewsAggregator, PipelineConfig, Processor};
use np_storage::{MemoryStorage, SqliteStorage};
use np_web::AppState;
use tracing::{info, warn};

/// Articles seeded at startup when the store is emptier than this.
const STARTUP_SEED_TARGET: usize = 20;

#[derive(Parser, Debug)]
#[command(author, version, about = "Automated news site: fetch, score, generate, serve")]
struct Cli {
    /// Storage backend: memory or sqlite
    #[arg(long, default_value = "sqlite")]
    storage: String,
    /// Database file for the sqlite backend
    #[arg(long, default_value = "newspulse.db")]
    db_path: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run the HTTP server with periodic background refresh
    Serve {
        #[arg(long, default_value = "0.0.0.0:8000")]
        addr: String,
    },
    /// Run one fetch-score-generate cycle and exit
    Refresh,
    /// Fill the article store with trend-ranked candidates (no generation)
    Seed {
        #[arg(long, default_value_t = STARTUP_SEED_TARGET)]
        count: usize,
    },
    /// Print store counts
    Status,
}

#[derive(Debug, Clone)]
struct Settings {
    openai_api_key: Option<String>,
    openai_model: Option<String>,
    refresh_interval: Duration,
    pipeline: PipelineConfig,
}

impl Settings {
    fn from_env() -> Self {
        let minutes = env_parse("NP_REFRESH_INTERVAL_MIN", 30u64).max(1);
        let mut pipeline = PipelineConfig::default();
        pipeline.max_per_run = env_parse("NP_MAX_PER_RUN", pipeline.max_per_run);
        Self {
            openai_api_key: std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()),
            openai_model: std::env::var("OPENAI_MODEL").ok(),
            refresh_interval: Duration::from_secs(minutes * 60),
            pipeline,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

async fn create_storage(
    kind: &str,
    db_path: &PathBuf,
) -> Result<(Arc<dyn ArticleStore>, Arc<dyn ContentStore>)> {
    match kind {
        "memory" => {
            let storage = Arc::new(MemoryStorage::new());
            Ok((storage.clone(), storage))
        }
        "sqlite" => {
            let storage = Arc::new(SqliteStorage::new(db_path).await?);
            info!(path = %storage.db_path().display(), "sqlite storage ready");
            Ok((storage.clone(), storage))
        }
        other => Err(Error::Storage(format!("unknown storage backend: {}", other))),
    }
}

#[derive(Clone)]
struct App {
    articles: Arc<dyn ArticleStore>,
    contents: Arc<dyn ContentStore>,
    generator: Arc<dyn ContentGenerator>,
    reader: Arc<FeedReader>,
    aggregator: Arc<NewsAggregator>,
    processor: Arc<Processor>,
}

impl App {
    async fn build(cli: &Cli, settings: &Settings) -> Result<Self> {
        let (articles, contents) = create_storage(&cli.storage, &cli.db_path).await?;
        let generator = np_content::generator_from_env(
            settings.openai_api_key.clone(),
            settings.openai_model.clone(),
        );
        info!(generator = generator.name(), "content generator selected");

        let aggregator = Arc::new(NewsAggregator::new(
            articles.clone(),
            contents.clone(),
            Arc::new(GoogleTrends::new()),
        ));
        let processor = Arc::new(Processor::new(
            articles.clone(),
            contents.clone(),
            generator.clone(),
            Arc::new(HttpBodyFetcher::new()),
            Arc::new(CachedSuggest::new(GoogleSuggest::new())),
            settings.pipeline.clone(),
        ));
        Ok(Self {
            articles,
            contents,
            generator,
            reader: Arc::new(FeedReader::new()),
            aggregator,
            processor,
        })
    }

    async fn refresh_once(&self) -> Result<usize> {
        let candidates = self.reader.fetch_candidates().await;
        info!(candidates = candidates.len(), "fetched feed batch");
        let trending = self.aggregator.trending_keywords().await;
        let published = self.processor.run_batch(candidates, &trending).await?;
        self.aggregator.invalidate().await;
        Ok(published)
    }

    async fn seed(&self, target: usize) -> Result<usize> {
        let candidates = self.reader.fetch_candidates().await;
        let trending = self.aggregator.trending_keywords().await;
        np_pipeline::seed_articles(
            self.articles.clone(),
            self.generator.clone(),
            candidates,
            &trending,
            target,
        )
        .await
    }
}

async fn serve(app: App, settings: Settings, addr: String) -> Result<()> {
    let processed = app.contents.processed_ids().await?.len();
    if processed < STARTUP_SEED_TARGET {
        info!(processed, "store looks empty, seeding");
        match app.seed(STARTUP_SEED_TARGET).await {
            Ok(added) => info!(added, "startup seed finished"),
            Err(e) => warn!(error = %e, "startup seed failed"),
        }
    }

    let refresher = app.clone();
    let interval = settings.refresh_interval;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match refresher.refresh_once().await {
                Ok(published) => info!(published, "scheduled refresh finished"),
                Err(e) => warn!(error = %e, "scheduled refresh failed"),
            }
        }
    });

    let state = AppState {
        aggregator: app.aggregator,
        processor: app.processor,
        reader: app.reader,
        generator: app.generator,
        articles: app.articles,
        contents: app.contents,
    };
    np_web::serve(state, &addr).await
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    let settings = Settings::from_env();
    let app = App::build(&cli, &settings).await?;

    match cli.command {
        Commands::Serve { addr } => serve(app, settings, addr).await,
        Commands::Refresh => {
            let published = app.refresh_once().await?;
            info!(published, "refresh finished");
            Ok(())
        }
        Commands::Seed { count } => {
            let added = app.seed(count).await?;
            info!(added, "seed finished");
            Ok(())
        }
        Commands::Status => {
            let articles = app.articles.load_all().await?.len();
            let processed = app.contents.processed_ids().await?.len();
            info!(articles, processed, "store status");
            Ok(())
        }
    }
}
