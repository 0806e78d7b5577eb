//! MeshCore Monitor CLI
//!
//! One binary for both sides of the bridge: `serve` runs the monitoring
//! server, `ingest` runs the repeater forwarder next to the repeater.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

use meshmon_repeater::{MonitorClient, RepeaterClient};
use meshmon_runtime::{wait_for_signal, Forwarder, IngestorConfig, Shutdown};
use meshmon_server::ServerConfig;

#[derive(Parser)]
#[command(name = "meshmon")]
#[command(author, version, about = "MeshCore repeater bridge and monitoring server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level (0-3); RUST_LOG takes precedence when set
    #[arg(short, long, default_value = "1")]
    verbose: u8,
}

/// Settings shared by the bridge commands
#[derive(clap::Args)]
struct BridgeArgs {
    /// Forwarder config file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Repeater API base URL (overrides the config file)
    #[arg(long, env = "MESHMON_REPEATER_URL")]
    repeater_url: Option<String>,

    /// Repeater bearer key (overrides the config file)
    #[arg(long, env = "MESHMON_REPEATER_KEY")]
    repeater_key: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the monitoring server
    Serve {
        /// Path to .env file (optional)
        #[arg(long, env = "DOTENV_PATH", default_value = ".env")]
        dotenv: PathBuf,
    },

    /// Poll the repeater and forward to the monitor
    Ingest {
        #[command(flatten)]
        bridge: BridgeArgs,

        /// Monitor server base URL (overrides the config file)
        #[arg(long, env = "MESHMON_MONITOR_URL")]
        monitor_url: Option<String>,

        /// Monitor ingest key (overrides the config file)
        #[arg(long, env = "MESHMON_MONITOR_KEY")]
        monitor_key: Option<String>,

        /// Seconds between poll cycles (overrides the config file)
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// Check that the repeater API answers
    Status {
        #[command(flatten)]
        bridge: BridgeArgs,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::ERROR,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Serve { dotenv } = &cli.command {
        if dotenv.exists() {
            dotenvy::from_path(dotenv)
                .with_context(|| format!("loading {}", dotenv.display()))?;
        }
    }

    init_logging(cli.verbose);

    match cli.command {
        Commands::Serve { .. } => {
            meshmon_server::serve(ServerConfig::from_env()).await?;
        }
        Commands::Ingest {
            bridge,
            monitor_url,
            monitor_key,
            interval,
        } => {
            let mut config = load_bridge_config(&bridge)?;
            if let Some(url) = monitor_url {
                config.monitor.url = url;
            }
            if let Some(key) = monitor_key {
                config.monitor.api_key = key;
            }
            if let Some(secs) = interval {
                config.poll_interval_seconds = secs;
            }
            run_ingest(config).await?;
        }
        Commands::Status { bridge } => {
            check_status(load_bridge_config(&bridge)?).await?;
        }
    }

    Ok(())
}

fn load_file_or_default(path: &Path) -> Result<IngestorConfig> {
    if path.exists() {
        let config = IngestorConfig::load(path)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    } else {
        warn!("{} not found, using defaults", path.display());
        Ok(IngestorConfig::default())
    }
}

fn load_bridge_config(args: &BridgeArgs) -> Result<IngestorConfig> {
    let mut config = load_file_or_default(&args.config)?;
    if let Some(url) = &args.repeater_url {
        config.repeater.url = url.clone();
    }
    if let Some(key) = &args.repeater_key {
        config.repeater.api_key = Some(key.clone());
    }
    Ok(config)
}

async fn run_ingest(config: IngestorConfig) -> Result<()> {
    let repeater = RepeaterClient::new(&config.repeater_config())?;
    let monitor = MonitorClient::new(&config.monitor_config())?;
    let forwarder = Forwarder::new(repeater, monitor, config.poll_interval());

    let shutdown = Shutdown::new();
    let handle = tokio::spawn(forwarder.run(shutdown.subscribe()));

    wait_for_signal().await;
    shutdown.trigger();
    handle.await.context("forwarder task failed")?;
    Ok(())
}

async fn check_status(config: IngestorConfig) -> Result<()> {
    println!("Checking repeater connection...\n");

    let client = RepeaterClient::new(&config.repeater_config())?;
    if client.check_connection().await {
        println!("Repeater API is reachable");
        println!("   URL: {}", client.base_url());
    } else {
        println!("Repeater API is not reachable");
        println!("   Expected at: {}", client.base_url());
        println!("\n   Check that the repeater is running and that [repeater].url");
        println!("   in the config file points at its HTTP API.");
    }

    Ok(())
}
