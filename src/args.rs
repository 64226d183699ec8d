use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "catalog-crawl")]
#[command(about = "Crawls retail product catalogs into a deduplicated JSON file")]
#[command(version)]
pub struct Args {
    /// Site configuration file (JSON)
    pub config: PathBuf,

    /// Write results here instead of the configured output path
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Delay between page requests in milliseconds
    #[arg(short, long)]
    pub delay_ms: Option<u64>,

    /// Ignore previously saved output and start from scratch
    #[arg(long)]
    pub no_resume: bool,

    /// Only crawl these categories (repeatable)
    #[arg(short, long = "category")]
    pub categories: Vec<String>,
}

impl Args {
    /// Apply command-line overrides on top of the file configuration
    pub fn apply(&self, config: &mut catalog_crawl::SiteConfig) {
        if let Some(output) = &self.output {
            config.output.path = output.clone();
        }
        if let Some(delay_ms) = self.delay_ms {
            config.pagination.page_delay_ms = delay_ms;
        }
        if self.no_resume {
            config.output.resume = false;
        }
    }
}
