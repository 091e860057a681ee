use clap::Parser;
use menu_harvest::{KeyScope, MenuHarvest};
use std::error::Error;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to harvest configuration file
    #[arg(short, long, default_value = "demos/harvest_config.json")]
    config: String,

    /// Override the store page
    #[arg(short, long)]
    store_url: Option<String>,

    /// Override total timeout in seconds
    #[arg(short, long)]
    total_timeout: Option<u64>,

    /// Capture an item once even when several sections list it
    #[arg(long)]
    once_per_page: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize logger
    env_logger::init();

    let args = Args::parse();

    let mut harvest = MenuHarvest::new("").with_config_file(&args.config)?;
    if let Some(url) = &args.store_url {
        harvest = harvest.with_store_url(url);
    }
    if let Some(seconds) = args.total_timeout {
        harvest = harvest.with_total_timeout(seconds);
    }
    if args.once_per_page {
        harvest = harvest.with_key_scope(KeyScope::Page);
    }

    let config = harvest.config();
    println!("Harvest configuration:");
    println!("  Store URL: {}", config.store_url);
    println!("  WebDriver URL: {}", config.webdriver_url);
    println!("  Key scope: {:?}", config.key_scope);
    println!("  Attempts per item: {}", config.retry.max_attempts);

    let output = harvest.run().await?;

    println!(
        "\nCaptured {} items ({} failed, {} pending) in {:.2} seconds",
        output.report.captured,
        output.report.failed,
        output.report.pending,
        output.report.elapsed_ms as f64 / 1000.0
    );
    for item in output.items.items().iter().take(10) {
        println!(
            "  [{}] {} {}",
            item.segment,
            item.name,
            item.price.as_deref().unwrap_or("-")
        );
    }
    if output.items.len() > 10 {
        println!("  ... and {} more", output.items.len() - 10);
    }
    for failed in &output.report.failed_keys {
        println!("  failed: {} ({})", failed.key, failed.reason);
    }

    Ok(())
}
