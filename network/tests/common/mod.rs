// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common utilities for goboard network integration tests

#![allow(dead_code)]

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use goboard_network::codec::{read_event, write_event};
use goboard_network::{Event, Fetcher, Loader, MemoryLoader, RoomRegistry, ServerConfig};
use once_cell::sync::Lazy;
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};

// Initialize logging for tests
static INIT_LOGGING: Lazy<()> = Lazy::new(|| {
    // Only show warnings and errors unless RUST_LOG is explicitly set
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "warn");
    }
    let _ = env_logger::try_init();
});

pub fn init_logging() {
    Lazy::force(&INIT_LOGGING);
}

/// Config with no debounce so tests can act back to back
pub fn quiet_config() -> ServerConfig {
    ServerConfig {
        input_buffer_ms: 0,
        user_buffer_ms: 0,
        ..ServerConfig::default()
    }
}

/// Serves canned bodies keyed by URL
#[derive(Debug, Default)]
pub struct StaticFetcher {
    pages: HashMap<String, String>,
}

impl StaticFetcher {
    pub fn with(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(url.to_string(), body.to_string());
        self
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        match self.pages.get(url) {
            Some(body) => Ok(body.clone()),
            None => bail!("unapproved URL"),
        }
    }
}

pub fn registry(config: ServerConfig) -> Arc<RoomRegistry> {
    registry_with(config, Arc::new(MemoryLoader::new()), Arc::new(StaticFetcher::default()))
}

pub fn registry_with(
    config: ServerConfig,
    loader: Arc<dyn Loader>,
    fetcher: Arc<dyn Fetcher>,
) -> Arc<RoomRegistry> {
    init_logging();
    RoomRegistry::new(config, loader, fetcher)
}

/// Serve `registry` on an ephemeral local port
pub async fn start_server(registry: Arc<RoomRegistry>) -> Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(goboard_network::server::serve(listener, registry));
    Ok(addr)
}

/// A socket client speaking the framed protocol
pub struct TestClient {
    reader: OwnedReadHalf,
    writer: OwnedWriteHalf,
}

impl TestClient {
    pub async fn join(addr: SocketAddr, room: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        let (reader, writer) = stream.into_split();
        let mut client = Self { reader, writer };
        client.send(Event::new("join", json!(room))).await?;
        Ok(client)
    }

    pub async fn send(&mut self, evt: Event) -> Result<()> {
        write_event(&mut self.writer, &evt).await?;
        Ok(())
    }

    /// Next event, or an error after two seconds of silence
    pub async fn recv(&mut self) -> Result<Event> {
        let read = tokio::time::timeout(Duration::from_secs(2), read_event(&mut self.reader, 1 << 24))
            .await
            .context("timed out waiting for an event")??;
        read.context("server closed the connection")
    }

    /// Skip events until one named `name` arrives
    pub async fn recv_named(&mut self, name: &str) -> Result<Event> {
        loop {
            let evt = self.recv().await?;
            if evt.event == name {
                return Ok(evt);
            }
        }
    }

    /// True if nothing arrives within `wait`
    pub async fn is_silent(&mut self, wait: Duration) -> bool {
        tokio::time::timeout(wait, read_event(&mut self.reader, 1 << 24))
            .await
            .is_err()
    }

    /// True once the server hangs up
    pub async fn is_closed(&mut self) -> bool {
        loop {
            match tokio::time::timeout(Duration::from_secs(2), read_event(&mut self.reader, 1 << 24)).await {
                Ok(Ok(Some(_))) => continue,
                Ok(Ok(None)) | Ok(Err(_)) => return true,
                Err(_) => return false,
            }
        }
    }
}
