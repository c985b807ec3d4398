// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Configuration module

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Longest accepted poll interval, one week
pub const MAX_UPDATE_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;

/// Reasons a configuration is rejected
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("worker {0} has a zero update interval")]
    ZeroInterval(String),

    #[error("worker {0} has an update interval longer than {max}s", max = MAX_UPDATE_INTERVAL_SECS)]
    IntervalTooLong(String),

    #[error("MQTT is enabled but no server is set")]
    MissingMqttServer,

    #[error("device name must not be empty")]
    EmptyDeviceName,
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Name the device is published under
    pub device_name: String,

    /// Log level, used when no command line override is given
    pub log_level: String,

    /// MQTT broker connection
    pub mqtt: MqttConfig,

    /// Per-worker preferences
    pub workers: WorkersConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device_name: sysinfo::System::host_name().unwrap_or_else(|| "hostwatch".to_string()),
            log_level: "info".to_string(),
            mqtt: MqttConfig::default(),
            workers: WorkersConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Load or create default configuration
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            let config = Self::default();

            // Create parent directories
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            config.save(path)?;
            Ok(config)
        }
    }

    /// Get configuration directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("hostwatch"))
            .unwrap_or_else(|| PathBuf::from("./config"))
    }

    /// Get default configuration path
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Check the configuration for values the agent cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device_name.trim().is_empty() {
            return Err(ConfigError::EmptyDeviceName);
        }

        if self.mqtt.enabled && self.mqtt.server.trim().is_empty() {
            return Err(ConfigError::MissingMqttServer);
        }

        for (id, prefs) in self.workers.polling() {
            if prefs.disabled {
                continue;
            }
            if prefs.update_interval_secs == 0 {
                return Err(ConfigError::ZeroInterval(id.to_string()));
            }
            if prefs.update_interval_secs > MAX_UPDATE_INTERVAL_SECS {
                return Err(ConfigError::IntervalTooLong(id.to_string()));
            }
        }

        Ok(())
    }
}

/// MQTT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    pub enabled: bool,
    pub server: String,
    pub port: u16,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,

    /// Prefix for every published topic
    pub topic_prefix: String,
    pub keep_alive_secs: u64,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            server: "localhost".to_string(),
            port: 1883,
            client_id: "hostwatch".to_string(),
            username: None,
            password: None,
            topic_prefix: "homeassistant".to_string(),
            keep_alive_secs: 30,
        }
    }
}

/// Preferences every worker understands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerPrefs {
    /// Do not start the worker at all
    pub disabled: bool,

    /// Poll interval in seconds, ignored by non-polling workers
    pub update_interval_secs: u64,

    /// Standard deviation of the poll jitter in milliseconds
    pub jitter_ms: u64,
}

impl WorkerPrefs {
    pub fn new(update_interval_secs: u64, jitter_ms: u64) -> Self {
        Self {
            disabled: false,
            update_interval_secs,
            jitter_ms,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_secs)
    }

    pub fn jitter(&self) -> Duration {
        Duration::from_millis(self.jitter_ms)
    }
}

impl Default for WorkerPrefs {
    fn default() -> Self {
        Self::new(60, 5000)
    }
}

/// Preferences of the built-in workers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkersConfig {
    pub uptime: WorkerPrefs,
    pub load_average: WorkerPrefs,
    pub memory: WorkerPrefs,
    pub network: WorkerPrefs,
    pub system_info: WorkerPrefs,
    pub heartbeat: WorkerPrefs,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            uptime: WorkerPrefs::new(15 * 60, 60_000),
            load_average: WorkerPrefs::new(60, 5000),
            memory: WorkerPrefs::new(60, 5000),
            network: WorkerPrefs::new(5, 500),
            system_info: WorkerPrefs::default(),
            heartbeat: WorkerPrefs::new(60, 5000),
        }
    }
}

impl WorkersConfig {
    /// Preferences of the workers that poll
    fn polling(&self) -> [(&'static str, &WorkerPrefs); 5] {
        [
            ("uptime", &self.uptime),
            ("load_average", &self.load_average),
            ("memory", &self.memory),
            ("network", &self.network),
            ("heartbeat", &self.heartbeat),
        ]
    }
}
