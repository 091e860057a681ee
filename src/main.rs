use clap::Parser;
use menu_harvest::{HarvestError, HarvestOutput, MenuHarvest};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

mod args;
use args::{Args, convert_key_scope};

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::init();

    // Parse command-line arguments
    let args = Args::parse();

    let harvest = match build(&args) {
        Ok(harvest) => harvest,
        Err(e) => {
            ::log::error!("{}", e);
            std::process::exit(2);
        }
    };

    ::log::info!("Starting harvest for: {}", harvest.config().store_url);
    println!("Note: harvesting requires a WebDriver server (e.g., ChromeDriver).");
    println!(
        "Set WEBDRIVER_URL environment variable if not using the default http://localhost:4444"
    );

    let output = match harvest.run().await {
        Ok(output) => output,
        Err(e) => {
            ::log::error!("Harvest failed: {}", e);
            std::process::exit(1);
        }
    };

    summarize(&output);

    if output.items.is_empty() {
        ::log::warn!("No item data captured.");
    }
    match write_output(&args.output, &output) {
        Ok(()) => ::log::info!("{} has been saved.", args.output.display()),
        Err(e) => {
            ::log::error!("Failed to write {}: {}", args.output.display(), e);
            std::process::exit(1);
        }
    }
}

/// Assemble the builder from the config file and CLI overrides
fn build(args: &Args) -> Result<MenuHarvest, HarvestError> {
    let mut harvest = match (&args.config, &args.store_url) {
        (Some(path), _) => MenuHarvest::new("").with_config_file(path)?,
        (None, Some(url)) => MenuHarvest::new(url),
        (None, None) => {
            return Err(HarvestError::Config(
                "a store URL or --config file is required".to_string(),
            ));
        }
    };

    if let (Some(_), Some(url)) = (&args.config, &args.store_url) {
        harvest = harvest.with_store_url(url);
    }
    if let Some(attempts) = args.max_attempts {
        harvest = harvest.with_max_attempts(attempts);
    }
    if let Some(millis) = args.wait_window {
        harvest = harvest.with_wait_window(millis);
    }
    if let Some(seconds) = args.total_timeout {
        harvest = harvest.with_total_timeout(seconds);
    }
    if let Some(scope) = args.key_scope {
        harvest = harvest.with_key_scope(convert_key_scope(scope));
    }
    Ok(harvest)
}

fn summarize(output: &HarvestOutput) {
    let report = &output.report;
    ::log::info!(
        "Harvest complete - {} captured, {} failed, {} pending in {:.2} seconds",
        report.captured,
        report.failed,
        report.pending,
        report.elapsed_ms as f64 / 1000.0
    );
    for failed in &report.failed_keys {
        ::log::warn!(
            "Failed: {} ({} attempts): {}",
            failed.key,
            failed.attempts,
            failed.reason
        );
    }
}

fn write_output(path: &Path, output: &HarvestOutput) -> Result<(), HarvestError> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, output)?;
    Ok(())
}
