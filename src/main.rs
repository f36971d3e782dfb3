//! Point-in-polygon host process.
//!
//! Opens one spatial database, registers the lookup entry point and serves
//! requests from stdin, one JSON request per line. Replies go to stdout and
//! logs to stderr.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::BufReader;
use tokio::runtime::Handle;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use pip_bridge::config::{Config, ConfigLayer};
use pip_bridge::host::serve_lines;
use pip_bridge::{open_database, EntryPoint, Host, PipBridge};

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "pip-bridge")]
#[command(about = "Point-in-polygon query function for an embedding host")]
struct Args {
    /// Spatial database URI, e.g. rtree:///data/whosonfirst.geojson
    #[arg(long, env = "PIP_SPATIAL_DATABASE_URI")]
    spatial_database_uri: Option<String>,

    /// Name to register the entry point under
    #[arg(long, env = "PIP_ENTRY_POINT")]
    entry_point: Option<String>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, env = "PIP_LOG_LEVEL")]
    log_level: Option<String>,

    /// Optional TOML config file
    #[arg(short, long, env = "PIP_CONFIG")]
    config: Option<PathBuf>,
}

impl Args {
    fn layer(&self) -> ConfigLayer {
        ConfigLayer {
            spatial_database_uri: self.spatial_database_uri.clone(),
            entry_point: self.entry_point.clone(),
            log_level: self.log_level.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut layers = Vec::new();
    if let Some(path) = &args.config {
        layers.push(ConfigLayer::load_from_file(path)?);
    }
    layers.push(args.layer());
    let config = Config::from_layers(layers)?;

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Opening spatial database {}", config.spatial_database_uri);

    let database = open_database(&config.spatial_database_uri)
        .await
        .with_context(|| {
            format!(
                "Failed to create database for '{}'",
                config.spatial_database_uri
            )
        })?;

    let bridge = Arc::new(PipBridge::new(database, Handle::current()));

    let mut host = Host::new();
    host.register(&config.entry_point, EntryPoint::new(bridge))?;

    info!(
        "Point-in-polygon function '{}' initialized",
        config.entry_point
    );

    let entry = host.entry_point(&config.entry_point)?;
    let stdin = BufReader::new(tokio::io::stdin());
    match serve_lines(entry, stdin, tokio::io::stdout()).await {
        Ok(served) => info!("Host input closed after {} requests", served),
        Err(e) => error!("Host loop stopped: {}", e),
    }

    // The host may still hold the entry point; stay alive until killed.
    std::future::pending::<()>().await;

    Ok(())
}
