use catalog_crawl::config::ExtractorConfig;
use catalog_crawl::{Catalog, SiteConfig};
use clap::Parser;
use std::error::Error;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a site configuration file, e.g. demos/rest_page_site.json
    #[arg(short, long)]
    config: PathBuf,

    /// Override the output file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Crawl a single category
    #[arg(long)]
    category: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize logger
    env_logger::init();

    let args = Args::parse();
    let mut config = SiteConfig::from_file(&args.config)?;
    if let Some(output) = args.output {
        config.output.path = output;
    }

    println!("Loaded site configuration for {}:", config.name);
    println!("  Base URL: {}", config.base_url);
    println!("  Extractor: {}", extractor_name(&config.extractor));
    println!("  Categories: {}", config.categories.len());
    println!("  Output: {}", config.output.path.display());

    let summary = Catalog::new(config)
        .with_categories(args.category.into_iter().collect())
        .with_signal_handling(true)
        .with_progress(|progress| {
            println!(
                "[{}] page {} -> {} new ({} total)",
                progress.category, progress.page_index, progress.new_count, progress.total_so_far
            );
        })
        .run()
        .await?;

    for outcome in &summary.outcomes {
        println!("{}: {} ({} new)", outcome.category, outcome.reason, outcome.new_records);
    }
    println!(
        "Saved {} products to {}",
        summary.total_records,
        summary.output.display()
    );

    Ok(())
}

fn extractor_name(extractor: &ExtractorConfig) -> &'static str {
    match extractor {
        ExtractorConfig::EmbeddedScript(_) => "embedded script",
        ExtractorConfig::StructuredData(_) => "structured data",
        ExtractorConfig::RestPage(_) => "REST page",
        ExtractorConfig::ProductGroups(_) => "product groups",
    }
}
