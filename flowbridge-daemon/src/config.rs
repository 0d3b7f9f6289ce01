//! Configuration management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use flowbridge_device::DEFAULT_BAUD_RATE;

/// Daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Path this configuration was loaded from
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Serial port to open (None = prompt at startup)
    pub serial_port: Option<String>,

    /// Serial baud rate
    pub baud_rate: u32,

    /// WebSocket listen address
    pub listen_addr: String,

    /// Live telemetry broadcast period in milliseconds. Also bounds how
    /// late an automatic calibration stop can fire.
    pub live_interval_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            config_path: Self::default_config_path(),
            serial_port: None,
            baud_rate: DEFAULT_BAUD_RATE,
            listen_addr: "127.0.0.1:8765".to_string(),
            live_interval_ms: 200,
        }
    }
}

impl BridgeConfig {
    /// Load configuration from the default location, or create it.
    pub fn load() -> Result<Self> {
        Self::load_from(Self::default_config_path())
    }

    /// Load configuration from `path`, writing a default file there when
    /// none exists yet.
    pub fn load_from(path: PathBuf) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(&path).context("Failed to read config file")?;

            let mut config: BridgeConfig =
                toml::from_str(&contents).context("Failed to parse config file")?;

            config.config_path = path;
            Ok(config)
        } else {
            let config = Self {
                config_path: path,
                ..Self::default()
            };
            config.save().context("Failed to save default config")?;
            Ok(config)
        }
    }

    /// Save configuration to its file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&self.config_path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get default config path
    fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("flowbridge")
            .join("config.toml")
    }
}
