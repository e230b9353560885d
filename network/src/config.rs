// SPDX-License-Identifier: MIT OR Apache-2.0

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Largest accepted frame body, in bytes
    #[serde(default = "default_max_frame_len")]
    pub max_frame_len: usize,
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,
    #[serde(default = "default_room_timeout_secs")]
    pub room_timeout_secs: u64,
    #[serde(default = "default_input_buffer_ms")]
    pub input_buffer_ms: u64,
    #[serde(default = "default_user_buffer_ms")]
    pub user_buffer_ms: u64,
    #[serde(default = "default_announcement_poll_secs")]
    pub announcement_poll_secs: u64,
    #[serde(default = "default_snapshot_secs")]
    pub snapshot_secs: u64,
    #[serde(default = "default_fetch_allow_list")]
    pub fetch_allow_list: Vec<String>,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum StorageConfig {
    #[default]
    Memory,
    File { dir: PathBuf },
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    9009
}

fn default_max_frame_len() -> usize {
    8 * 1024 * 1024
}

fn default_heartbeat_secs() -> u64 {
    3600
}

fn default_room_timeout_secs() -> u64 {
    86_400
}

fn default_input_buffer_ms() -> u64 {
    250
}

fn default_user_buffer_ms() -> u64 {
    50
}

fn default_announcement_poll_secs() -> u64 {
    5
}

fn default_snapshot_secs() -> u64 {
    300
}

fn default_fetch_allow_list() -> Vec<String> {
    ["online-go.com", "gokifu.com", "eidogo.com"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_frame_len: default_max_frame_len(),
            heartbeat_secs: default_heartbeat_secs(),
            room_timeout_secs: default_room_timeout_secs(),
            input_buffer_ms: default_input_buffer_ms(),
            user_buffer_ms: default_user_buffer_ms(),
            announcement_poll_secs: default_announcement_poll_secs(),
            snapshot_secs: default_snapshot_secs(),
            fetch_allow_list: default_fetch_allow_list(),
            storage: StorageConfig::default(),
        }
    }
}

impl ServerConfig {
    /// `host:port` for binding
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

pub fn get_config_path() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("io", "goboard", "goboard")
        .context("Failed to determine config directory")?;
    Ok(proj_dirs.config_dir().join("config.toml"))
}

pub fn load_config() -> Result<ServerConfig> {
    let config_path = get_config_path().context("Failed to determine config path")?;
    load_config_from(&config_path)
}

/// Read the config at `path`, writing the defaults there first if it does
/// not exist yet
pub fn load_config_from(config_path: &Path) -> Result<ServerConfig> {
    if !config_path.exists() {
        tracing::info!("Config file not found, creating default at: {}", config_path.display());

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let default_config = ServerConfig::default();
        save_config_to(config_path, &default_config)?;
        return Ok(default_config);
    }

    let content = fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

    toml::from_str::<ServerConfig>(&content)
        .with_context(|| format!("Failed to parse config file: {}", config_path.display()))
}

pub fn save_config(config: &ServerConfig) -> Result<()> {
    let config_path = get_config_path().context("Failed to determine config path")?;
    save_config_to(&config_path, config)
}

pub fn save_config_to(config_path: &Path, config: &ServerConfig) -> Result<()> {
    let toml_content = toml::to_string_pretty(config).context("Failed to serialize config")?;

    fs::write(config_path, toml_content)
        .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

    tracing::info!("Saved config to: {}", config_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr(), "127.0.0.1:9009");
        assert_eq!(config.input_buffer_ms, 250);
        assert_eq!(config.user_buffer_ms, 50);
        assert_eq!(config.storage, StorageConfig::Memory);
        assert!(config.fetch_allow_list.contains(&"online-go.com".to_string()));
    }

    #[test]
    fn test_config_serialization() {
        let config = ServerConfig {
            storage: StorageConfig::File {
                dir: PathBuf::from("/var/lib/goboard"),
            },
            ..ServerConfig::default()
        };
        let toml_str = toml::to_string_pretty(&config).unwrap();

        let deserialized: ServerConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(deserialized, config);
    }

    #[test]
    fn test_missing_keys_use_defaults() {
        let config: ServerConfig = toml::from_str("port = 7000\n").unwrap();
        assert_eq!(config.port, 7000);
        assert_eq!(config.heartbeat_secs, 3600);
        assert_eq!(config.max_frame_len, 8 * 1024 * 1024);
    }

    #[test]
    fn test_load_save_config() -> Result<()> {
        let temp_dir = tempdir()?;
        let config_path = temp_dir.path().join("nested").join("config.toml");

        // first load writes the defaults
        let created = load_config_from(&config_path)?;
        assert!(config_path.exists());
        assert_eq!(created, ServerConfig::default());

        let changed = ServerConfig {
            port: 9100,
            ..created
        };
        save_config_to(&config_path, &changed)?;
        assert_eq!(load_config_from(&config_path)?, changed);

        Ok(())
    }
}
