pub mod backoff;
pub mod config;
pub mod crawlers;
pub mod dedup;
pub mod parsers;
pub mod results;
pub mod state;
pub mod store;
pub mod utils;

// Re-export commonly used types for convenience
pub use config::{ConfigError, SiteConfig};
pub use crawlers::paginator::{CategoryOutcome, PageProgress, TerminalReason};
pub use results::{ProductRecord, Variant};
pub use state::ScrapeState;
pub use store::PersistenceError;

use chrono::{DateTime, Local};
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use thiserror::Error;

use backoff::{BackoffPolicy, Sleeper, TokioSleeper};
use config::CategoryConfig;
use crawlers::fetcher::{Fetcher, HttpFetcher};
use crawlers::paginator::Paginator;
use parsers::Extractor;
use store::Store;

/// Errors that abort a whole run
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

type ProgressHook = Box<dyn FnMut(&PageProgress) + Send>;
type Shutdown = Pin<Box<dyn Future<Output = ()> + Send>>;

/// What a finished (or interrupted) run produced
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// One entry per category walked, in order
    pub outcomes: Vec<CategoryOutcome>,
    /// Records in the saved output, including resumed ones
    pub total_records: usize,
    /// Records discovered during this run
    pub new_records: usize,
    pub output: PathBuf,
    /// Whether a shutdown request cut the crawl short
    pub interrupted: bool,
}

/// Main builder for crawling one site's catalog
pub struct Catalog {
    config: SiteConfig,
    fetcher: Option<Box<dyn Fetcher>>,
    sleeper: Box<dyn Sleeper>,
    progress: Option<ProgressHook>,
    shutdown: Option<Shutdown>,
    category_filter: Option<Vec<String>>,
    started: DateTime<Local>,
}

impl Catalog {
    /// Create a new Catalog builder for the given site
    pub fn new(config: SiteConfig) -> Self {
        Self {
            config,
            fetcher: None,
            sleeper: Box::new(TokioSleeper),
            progress: None,
            shutdown: None,
            category_filter: None,
            started: Local::now(),
        }
    }

    /// Load the site configuration from a file
    pub fn from_config_file(path: impl AsRef<std::path::Path>) -> Result<Self, Error> {
        Ok(Self::new(SiteConfig::from_file(path)?))
    }

    /// Replace the HTTP fetcher built from the site's `http` settings
    pub fn with_fetcher(mut self, fetcher: Box<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn with_sleeper(mut self, sleeper: Box<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Called once per successfully extracted page
    pub fn with_progress(mut self, hook: impl FnMut(&PageProgress) + Send + 'static) -> Self {
        self.progress = Some(Box::new(hook));
        self
    }

    /// Stop at the next await point on Ctrl-C and save what was gathered
    pub fn with_signal_handling(self, enabled: bool) -> Self {
        if !enabled {
            return self;
        }
        self.with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                ::log::warn!("Ctrl-C handling unavailable: {}", e);
                std::future::pending::<()>().await;
            }
        })
    }

    /// Stop at the next await point once `shutdown` completes, then save
    pub fn with_shutdown(mut self, shutdown: impl Future<Output = ()> + Send + 'static) -> Self {
        self.shutdown = Some(Box::pin(shutdown));
        self
    }

    /// Only walk the named categories
    pub fn with_categories(mut self, names: Vec<String>) -> Self {
        self.category_filter = if names.is_empty() { None } else { Some(names) };
        self
    }

    /// Timestamp used for timestamped output names
    pub fn with_start_time(mut self, started: DateTime<Local>) -> Self {
        self.started = started;
        self
    }

    fn selected_categories(&self) -> Vec<CategoryConfig> {
        let Some(filter) = &self.category_filter else {
            return self.config.categories.clone();
        };

        for name in filter {
            if !self.config.categories.iter().any(|c| &c.name == name) {
                ::log::warn!("Unknown category {:?} for site {}", name, self.config.name);
            }
        }
        self.config
            .categories
            .iter()
            .filter(|c| filter.contains(&c.name))
            .cloned()
            .collect()
    }

    /// Walk every selected category in order and persist the result
    pub async fn run(mut self) -> Result<RunSummary, Error> {
        let base_url = self.config.base()?;
        let extractor = Extractor::from_config(&self.config.extractor)?;
        let fetcher: Box<dyn Fetcher> = match self.fetcher.take() {
            Some(fetcher) => fetcher,
            None => Box::new(HttpFetcher::new(&self.config.http)?),
        };
        let mut on_page: ProgressHook = match self.progress.take() {
            Some(hook) => hook,
            None => Box::new(ignore_progress),
        };

        let categories = self.selected_categories();
        let store = Store::new(&self.config.output, self.started);
        let mut state = store.load()?;
        let resumed = state.len();

        let backoff = BackoffPolicy::from(&self.config.retry);
        let paginator = Paginator::new(
            fetcher.as_ref(),
            self.sleeper.as_ref(),
            &extractor,
            &self.config.pagination,
            &backoff,
            &base_url,
        )
        .with_raw_capture(self.config.output.raw_path.is_some());

        ::log::info!(
            "Starting {} with {} categories ({} products already known)",
            self.config.name,
            categories.len(),
            resumed
        );

        let mut outcomes = Vec::new();
        let crawl = crawl_categories(
            &paginator,
            &categories,
            &mut state,
            &mut outcomes,
            &mut *on_page,
            self.config.output.save_each_category.then_some(&store),
            self.sleeper.as_ref(),
        );

        let interrupted = match self.shutdown.take() {
            Some(shutdown) => tokio::select! {
                result = crawl => {
                    result?;
                    false
                }
                _ = shutdown => {
                    ::log::warn!("Interrupted, saving progress before exit");
                    true
                }
            },
            None => {
                crawl.await?;
                false
            }
        };

        let output = store.save(&state, self.sleeper.as_ref()).await?;

        Ok(RunSummary {
            outcomes,
            total_records: state.len(),
            new_records: state.len() - resumed,
            output,
            interrupted,
        })
    }
}

fn ignore_progress(_: &PageProgress) {}

async fn crawl_categories(
    paginator: &Paginator<'_>,
    categories: &[CategoryConfig],
    state: &mut ScrapeState,
    outcomes: &mut Vec<CategoryOutcome>,
    on_page: &mut (dyn FnMut(&PageProgress) + Send),
    checkpoint: Option<&Store>,
    sleeper: &dyn Sleeper,
) -> Result<(), Error> {
    for category in categories {
        let outcome = paginator.run(category, state, on_page).await;
        ::log::info!(
            "Category {} finished after {} pages: {} ({} new)",
            outcome.category,
            outcome.pages,
            outcome.reason,
            outcome.new_records
        );
        outcomes.push(outcome);

        if let Some(store) = checkpoint {
            store.save(state, sleeper).await?;
        }
    }
    Ok(())
}
