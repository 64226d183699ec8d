use catalog_crawl::{Catalog, PageProgress, SiteConfig};
use clap::Parser;
use std::error::Error;

mod args;
use args::Args;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize logging
    env_logger::init();

    let args = Args::parse();
    let mut config = SiteConfig::from_file(&args.config)?;
    args.apply(&mut config);

    ::log::info!(
        "Crawling {} into {}",
        config.name,
        config.output.path.display()
    );

    let start_time = std::time::Instant::now();
    let summary = Catalog::new(config)
        .with_categories(args.categories.clone())
        .with_signal_handling(true)
        .with_progress(log_progress)
        .run()
        .await?;

    for outcome in &summary.outcomes {
        ::log::info!(
            "{}: {} new products over {} pages ({})",
            outcome.category,
            outcome.new_records,
            outcome.pages,
            outcome.reason
        );
    }
    ::log::info!(
        "Saved {} products ({} new) to {} in {:.2} seconds{}",
        summary.total_records,
        summary.new_records,
        summary.output.display(),
        start_time.elapsed().as_secs_f64(),
        if summary.interrupted { " (interrupted)" } else { "" }
    );

    Ok(())
}

fn log_progress(progress: &PageProgress) {
    ::log::info!(
        "[{}] page {}: {} new, {} total",
        progress.category,
        progress.page_index,
        progress.new_count,
        progress.total_so_far
    );
}
