//! Configuration system for cairn.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $CAIRN_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/cairn/config.toml
//!   3. ~/.config/cairn/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CairnConfig {
    pub network: NetworkConfig,
    pub signaling: SignalingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Address the hub binds. Use "0.0.0.0" to accept LAN clients.
    pub listen_addr: String,
    /// TCP port of the HTTP listener. 0 = OS-assigned.
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalingConfig {
    /// URL path that accepts WebSocket upgrades. Everything else 404s.
    pub path: String,
    /// Inbound frames larger than this are refused with an error frame.
    pub max_frame_bytes: usize,
    /// Display names are truncated to this many characters.
    pub max_name_chars: usize,
    /// Depth of each session's outbound queue. A peer that lets its
    /// queue fill is torn down.
    pub outbound_queue_depth: usize,
    /// A single outbound write slower than this fails the session.
    pub write_timeout_ms: u64,
    /// Tear down a session with no inbound frame for this long. 0 = never.
    pub read_idle_timeout_ms: u64,
    /// Origin header values accepted on upgrade. Empty = accept any.
    pub allowed_origins: Vec<String>,
}

impl SignalingConfig {
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    /// The idle timeout, or `None` when disabled.
    pub fn read_idle_timeout(&self) -> Option<Duration> {
        (self.read_idle_timeout_ms > 0).then(|| Duration::from_millis(self.read_idle_timeout_ms))
    }
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for CairnConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            signaling: SignalingConfig::default(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1".to_string(),
            port: 9440,
        }
    }
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            path: "/api/signaling".to_string(),
            max_frame_bytes: 16 * 1024,
            max_name_chars: 32,
            outbound_queue_depth: 64,
            write_timeout_ms: 10_000,
            read_idle_timeout_ms: 0,
            allowed_origins: Vec::new(),
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("cairn")
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

impl CairnConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.clone(), e))?
        } else {
            CairnConfig::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("CAIRN_CONFIG")
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
            let text = toml::to_string_pretty(&CairnConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text)
                .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply CAIRN_* env var overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("CAIRN_NETWORK__LISTEN_ADDR") {
            self.network.listen_addr = v;
        }
        if let Ok(v) = std::env::var("CAIRN_NETWORK__PORT") {
            if let Ok(p) = v.parse() {
                self.network.port = p;
            }
        }
        if let Ok(v) = std::env::var("CAIRN_SIGNALING__PATH") {
            self.signaling.path = v;
        }
        if let Ok(v) = std::env::var("CAIRN_SIGNALING__MAX_FRAME_BYTES") {
            if let Ok(n) = v.parse() {
                self.signaling.max_frame_bytes = n;
            }
        }
        if let Ok(v) = std::env::var("CAIRN_SIGNALING__MAX_NAME_CHARS") {
            if let Ok(n) = v.parse() {
                self.signaling.max_name_chars = n;
            }
        }
        if let Ok(v) = std::env::var("CAIRN_SIGNALING__OUTBOUND_QUEUE_DEPTH") {
            if let Ok(n) = v.parse() {
                self.signaling.outbound_queue_depth = n;
            }
        }
        if let Ok(v) = std::env::var("CAIRN_SIGNALING__WRITE_TIMEOUT_MS") {
            if let Ok(n) = v.parse() {
                self.signaling.write_timeout_ms = n;
            }
        }
        if let Ok(v) = std::env::var("CAIRN_SIGNALING__READ_IDLE_TIMEOUT_MS") {
            if let Ok(n) = v.parse() {
                self.signaling.read_idle_timeout_ms = n;
            }
        }
        if let Ok(v) = std::env::var("CAIRN_SIGNALING__ALLOWED_ORIGINS") {
            self.signaling.allowed_origins = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
    }
}
