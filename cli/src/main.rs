// SPDX-License-Identifier: MIT OR Apache-2.0

//! goboard server - hosts shared Go boards over framed JSON sockets
//!
//! Rooms are created on first join, snapshotted on an interval and once
//! more on shutdown.

use anyhow::{Context, Result};
use clap::Parser;
use goboard_network::config::{self, ServerConfig, StorageConfig};
use goboard_network::{FileLoader, HttpFetcher, Loader, MemoryLoader, RoomRegistry};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::EnvFilter;

/// Command-line arguments
#[derive(Parser, Debug)]
#[clap(name = "goboard-server", about = "Shared Go board server", version)]
struct Args {
    /// Config file (defaults to the per-user config directory)
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Address to bind, overriding the config
    #[clap(long)]
    host: Option<String>,

    /// Port to bind, overriding the config
    #[clap(short, long)]
    port: Option<u16>,

    /// Store room snapshots in this directory instead of memory
    #[clap(long)]
    data_dir: Option<PathBuf>,

    /// Enable debug logging
    #[clap(long)]
    debug: bool,
}

fn init_logging(debug: bool) {
    // RUST_LOG wins over --debug
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if debug { "debug" } else { "info" }));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_config(args: &Args) -> Result<ServerConfig> {
    let mut cfg = match &args.config {
        Some(path) => config::load_config_from(path)?,
        None => config::load_config()?,
    };
    if let Some(host) = &args.host {
        cfg.host = host.clone();
    }
    if let Some(port) = args.port {
        cfg.port = port;
    }
    if let Some(dir) = &args.data_dir {
        cfg.storage = StorageConfig::File { dir: dir.clone() };
    }
    Ok(cfg)
}

fn build_loader(storage: &StorageConfig) -> Result<Arc<dyn Loader>> {
    Ok(match storage {
        StorageConfig::Memory => Arc::new(MemoryLoader::new()),
        StorageConfig::File { dir } => Arc::new(
            FileLoader::new(dir.clone())
                .with_context(|| format!("Failed to open storage at {}", dir.display()))?,
        ),
    })
}

/// Main entry point
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    let cfg = load_config(&args)?;
    let loader = build_loader(&cfg.storage)?;
    let fetcher = Arc::new(HttpFetcher::new(cfg.fetch_allow_list.clone())?);
    let snapshot_every = Duration::from_secs(cfg.snapshot_secs.max(1));
    let addr = cfg.bind_addr();
    let registry = RoomRegistry::new(cfg, loader, fetcher);

    if let Err(e) = registry.load_all().await {
        tracing::warn!("Failed to restore rooms: {e:#}");
    }
    registry.spawn_announcements();

    let snapshots = {
        let registry = registry.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(snapshot_every);
            interval.tick().await;
            loop {
                interval.tick().await;
                if let Err(e) = registry.save_all().await {
                    tracing::error!("Snapshot failed: {e:#}");
                }
            }
        })
    };

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!(%addr, "goboard server listening");

    tokio::select! {
        res = goboard_network::server::serve(listener, registry.clone()) => {
            if let Err(e) = res {
                tracing::error!("Server stopped: {e:#}");
            }
        }
        _ = signal::ctrl_c() => {
            tracing::info!("Shutting down");
        }
    }

    snapshots.abort();
    let saved = registry.save_all().await?;
    tracing::info!(saved, "final snapshot written");
    Ok(())
}
