use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fetchr::config::{Config, FailureMode};
use fetchr::crawler::Crawler;
use fetchr::error::FetchrErrorTrait;
use fetchr::utils::redact;

#[derive(Parser)]
#[command(
    name = "fetchr",
    version,
    about = "Save metadata for a Flickr user's whole public photostream as JSON",
    long_about = None
)]
struct Cli {
    /// Flickr API key
    #[arg(long)]
    api_key: Option<String>,

    /// Flickr user ID
    #[arg(long)]
    user_id: Option<String>,

    /// File to save photo JSON into
    #[arg(long)]
    output_file: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of concurrent detail workers
    #[arg(long)]
    workers: Option<usize>,

    /// Capacity of the summary queue
    #[arg(long)]
    intake_capacity: Option<usize>,

    /// Capacity of the save queue
    #[arg(long)]
    output_capacity: Option<usize>,

    /// What a failed detail lookup does (abort, collect)
    #[arg(long)]
    failure_mode: Option<FailureMode>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long)]
    log_format: Option<String>,
}

impl Cli {
    /// Build the effective configuration: defaults, file, environment, flags
    fn into_config(self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        config.apply_env()?;

        if let Some(v) = self.api_key {
            config.flickr.api_key = v;
        }
        if let Some(v) = self.user_id {
            config.flickr.user_id = v;
        }
        if let Some(v) = self.output_file {
            config.output.path = v;
        }
        if let Some(v) = self.workers {
            config.pipeline.workers = v;
        }
        if let Some(v) = self.intake_capacity {
            config.pipeline.intake_capacity = v;
        }
        if let Some(v) = self.output_capacity {
            config.pipeline.output_capacity = v;
        }
        if let Some(v) = self.failure_mode {
            config.pipeline.failure_mode = v;
        }
        if let Some(v) = self.log_format {
            config.logging.format = v;
        }
        if self.verbose {
            config.logging.level = String::from("debug");
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.into_config()?;

    setup_tracing(&config.logging.format, &config.logging.level)?;

    config.validate().context("Invalid configuration")?;

    tracing::info!(
        api_key = %redact(&config.flickr.api_key),
        user_id = %config.flickr.user_id,
        output = %config.output.path.display(),
        workers = config.pipeline.workers,
        failure_mode = %config.pipeline.failure_mode,
        "fetchr starting"
    );

    let crawler = Crawler::new(config)?;

    let abort = crawler.abort_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping workers");
            abort.abort();
        }
    });

    let summary = match crawler.run().await {
        Ok(summary) => summary,
        Err(e) => {
            tracing::error!(category = %e.category(), error = %e, "Run failed");
            return Err(e.into());
        }
    };

    for failure in &summary.failed {
        tracing::warn!(photo_id = %failure.photo_id, error = %failure.error, "Photo not saved");
    }

    match &summary.output {
        Some(path) => println!(
            "Saved details for {} photos to {}",
            summary.saved,
            path.display()
        ),
        None => println!("Got no photos"),
    }
    if !summary.failed.is_empty() {
        println!("Failed to fetch details for {} photos", summary.failed.len());
    }

    Ok(())
}

fn setup_tracing(format: &str, level: &str) -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(format!("fetchr={level},warn")))
        .context("Invalid log level")?;

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().compact())
                .init();
        }
    }

    Ok(())
}
