//! Configuration system for Ferry.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $FERRY_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/ferry/config.toml
//!   3. ~/.config/ferry/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration. Shared by all three binaries; each reads only
/// the sections it needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FerryConfig {
    pub transfer: TransferConfig,
    pub channel: ChannelConfig,
    pub relay: RelayConfig,
    pub registrar: RegistrarConfig,
    pub requester: RequesterConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Chunk size in bytes for pull transfers.
    /// The historical default is 256 KiB (262144), not the "256 MB" some
    /// old deployment notes claim.
    pub chunk_size: usize,
    /// Pipeline depth — maximum fetch requests in flight.
    pub pipeline: usize,
    /// Handshake budget — `connect` sends before giving up.
    pub handshake_attempts: u32,
    /// Wait per handshake attempt before resending, in milliseconds.
    pub handshake_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Address the registrar binds and the requester connects to.
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Address the relay binds and both roles reach it at.
    pub host: String,
    pub port: u16,
    /// Where the relay stores uploaded files.
    pub store_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrarConfig {
    /// Watched directory — files appearing here are announced and served.
    pub send_dir: PathBuf,
    /// Where artifacts downloaded from the relay are saved.
    pub save_dir: PathBuf,
    /// Directory poll interval, in milliseconds.
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RequesterConfig {
    /// Where pulled files (and derived conversions) are written.
    pub save_dir: PathBuf,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for FerryConfig {
    fn default() -> Self {
        Self {
            transfer: TransferConfig::default(),
            channel: ChannelConfig::default(),
            relay: RelayConfig::default(),
            registrar: RegistrarConfig::default(),
            requester: RequesterConfig::default(),
        }
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            chunk_size: 256 * 1024,
            pipeline: 10,
            handshake_attempts: 10,
            handshake_interval_ms: 1000,
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9555,
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9556,
            store_dir: data_dir().join("relay"),
        }
    }
}

impl Default for RegistrarConfig {
    fn default() -> Self {
        Self {
            send_dir: data_dir().join("outbound"),
            save_dir: data_dir().join("inbound"),
            poll_interval_ms: 500,
        }
    }
}

impl Default for RequesterConfig {
    fn default() -> Self {
        Self {
            save_dir: data_dir().join("received"),
        }
    }
}

impl ChannelConfig {
    /// Socket address string for bind/connect.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl RelayConfig {
    /// Base URL both roles use to reach the relay.
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("ferry")
}

pub fn data_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".local").join("share"))
        .join("ferry")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl FerryConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.clone(), e))?
        } else {
            FerryConfig::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("FERRY_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&FerryConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text)
                .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply FERRY_* env var overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("FERRY_TRANSFER__CHUNK_SIZE") {
            if let Ok(n) = v.parse() {
                self.transfer.chunk_size = n;
            }
        }
        if let Ok(v) = std::env::var("FERRY_TRANSFER__PIPELINE") {
            if let Ok(n) = v.parse() {
                self.transfer.pipeline = n;
            }
        }
        if let Ok(v) = std::env::var("FERRY_TRANSFER__HANDSHAKE_ATTEMPTS") {
            if let Ok(n) = v.parse() {
                self.transfer.handshake_attempts = n;
            }
        }
        if let Ok(v) = std::env::var("FERRY_TRANSFER__HANDSHAKE_INTERVAL_MS") {
            if let Ok(n) = v.parse() {
                self.transfer.handshake_interval_ms = n;
            }
        }
        if let Ok(v) = std::env::var("FERRY_CHANNEL__HOST") {
            self.channel.host = v;
        }
        if let Ok(v) = std::env::var("FERRY_CHANNEL__PORT") {
            if let Ok(p) = v.parse() {
                self.channel.port = p;
            }
        }
        if let Ok(v) = std::env::var("FERRY_RELAY__HOST") {
            self.relay.host = v;
        }
        if let Ok(v) = std::env::var("FERRY_RELAY__PORT") {
            if let Ok(p) = v.parse() {
                self.relay.port = p;
            }
        }
        if let Ok(v) = std::env::var("FERRY_RELAY__STORE_DIR") {
            self.relay.store_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("FERRY_REGISTRAR__SEND_DIR") {
            self.registrar.send_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("FERRY_REGISTRAR__SAVE_DIR") {
            self.registrar.save_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("FERRY_REGISTRAR__POLL_INTERVAL_MS") {
            if let Ok(n) = v.parse() {
                self.registrar.poll_interval_ms = n;
            }
        }
        if let Ok(v) = std::env::var("FERRY_REQUESTER__SAVE_DIR") {
            self.requester.save_dir = PathBuf::from(v);
        }
    }
}
