use std::panic::AssertUnwindSafe;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Parser;
use futures::FutureExt;
use tracing::{error, info, warn, Instrument};
use tracing_subscriber::EnvFilter;

use airtable_client::AirtableClient;
use channel_scout::config::{load_config, Secrets};
use channel_scout::infra::{AirtableTable, WebDriverAgent};
use channel_scout::scout::Scout;
use channel_scout::traits::RenderingAgent;

#[derive(Parser)]
#[command(name = "channel-scout", about = "Discover channels by topic and sync them to Airtable")]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, default_value = "./config/channel-scout.toml")]
    config: PathBuf,

    /// Topic to search (repeatable); replaces the configured topic list
    #[arg(long = "topic")]
    topics: Vec<String>,

    /// Emit logs as JSON
    #[arg(long)]
    json: bool,

    /// Extract and log records without uploading them
    #[arg(long)]
    dry_run: bool,

    /// Run the browser headless
    #[arg(long)]
    headless: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("channel_scout=info,airtable_client=info,webdriver_client=info"));
    if cli.json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let run_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("scout_run", %run_id);
    run(cli).instrument(span).await
}

async fn run(cli: Cli) -> Result<()> {
    info!("Channel Scout starting...");

    // Load config
    let mut config = load_config(&cli.config)?;
    if !cli.topics.is_empty() {
        config.scout.topics = cli.topics;
        config.normalize();
    }
    if cli.headless {
        config.browser.headless = true;
    }
    let secrets = Secrets::from_env()?;
    info!(topics = ?config.scout.topics, table = %config.sync.table, "Config loaded");

    let airtable = AirtableClient::new(&secrets.airtable_api_key, &secrets.airtable_base_id)?;
    let store = AirtableTable::new(airtable, &config.sync.table);

    // The only failure allowed to end the process before any work starts.
    let agent = WebDriverAgent::connect(&config.browser, secrets.webdriver_url.as_deref()).await?;

    let scout = Scout::new(&agent, &store, &config).with_dry_run(cli.dry_run);

    // `Scout::run` releases the browser itself; the interrupt and panic paths
    // never reach that point, so they release it here.
    let outcome = tokio::select! {
        result = AssertUnwindSafe(scout.run()).catch_unwind() => match result {
            Ok(result) => result,
            Err(_) => {
                error!("Scout run panicked");
                release(&agent).await;
                Err(anyhow!("scout run panicked"))
            }
        },
        _ = interrupted() => {
            warn!("Interrupted, closing browser");
            release(&agent).await;
            Err(anyhow!("interrupted"))
        }
    };

    let stats = outcome?;
    info!("Scout run complete. {stats}");
    Ok(())
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Interrupt handler unavailable, running without it: {e}");
        std::future::pending::<()>().await;
    }
}

async fn release(agent: &dyn RenderingAgent) {
    if let Err(e) = agent.quit().await {
        error!("Failed to close rendering agent: {e}");
    }
}
