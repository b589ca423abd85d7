use anyhow::{Context, Result};
use clap::Parser;
use hnskim::app::{App, Event};
use hnskim::command::Dispatcher;
use hnskim::config::Config;
use hnskim::hn::{Category, HnClient};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Parser, Debug)]
#[command(name = "hnskim", about = "Terminal Hacker News reader")]
struct Args {
    /// Listing to open (new, top, best, job)
    #[arg(long, short)]
    category: Option<Category>,

    /// API root (overrides config file)
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Config file (default: ~/.config/hnskim/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,
}

/// Logs go to a file when requested; otherwise to stderr, and only when
/// `RUST_LOG` is set, so nothing scribbles over the TUI by default.
fn init_tracing(log_file: Option<&PathBuf>) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env();

    if let Some(path) = log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file '{}'", path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Arc::new(file))
            .init();
    } else if std::env::var_os("RUST_LOG").is_some() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_file.as_ref())?;

    let config_path = match args.config {
        Some(path) => path,
        None => Config::default_path().context("Failed to locate config directory")?,
    };
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from '{}'", config_path.display()))?;

    let base_url = args.base_url.unwrap_or_else(|| config.base_url.clone());
    let category = args.category.unwrap_or(config.default_category);

    let client = HnClient::new(&base_url, config.request_timeout())
        .context("Failed to create HTTP client")?;
    tracing::info!(base_url = %client.base_url(), category = %category, "Starting hnskim");

    // Bounded by the index fetch plus at most MAX_STORIES story fetches in flight
    let (event_tx, event_rx) = mpsc::channel::<Event>(32);
    let mut app = App::new(category, Arc::new(client), Dispatcher::new(event_tx));

    hnskim::ui::run(&mut app, event_rx).await?;

    Ok(())
}
