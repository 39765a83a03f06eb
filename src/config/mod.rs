//! Configuration module
//!
//! Handles loading and saving blackjack-net configuration.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::protocol::DISCOVERY_PORT;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,

    /// Network settings
    #[serde(default)]
    pub network: NetworkConfig,

    /// Client settings
    #[serde(default)]
    pub client: ClientConfig,
}

/// General configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Team name advertised by a server or sent by a client
    #[serde(default = "default_name")]
    pub name: String,
    /// Enable verbose logging
    #[serde(default)]
    pub verbose: bool,
}

fn default_name() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string())
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            verbose: false,
        }
    }
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Well-known UDP port offers are sent to
    #[serde(default = "default_udp_port")]
    pub udp_port: u16,
    /// TCP port to accept sessions on (0 = ephemeral)
    #[serde(default)]
    pub tcp_port: u16,
    /// Destination address of offer broadcasts
    #[serde(default = "default_broadcast_address")]
    pub broadcast_address: IpAddr,
    /// Interval between offers in ms
    #[serde(default = "default_offer_interval")]
    pub offer_interval_ms: u64,
    /// Bound on every session read and write in ms
    #[serde(default = "default_io_timeout")]
    pub io_timeout_ms: u64,
    /// Connection timeout in ms
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
    /// How long a client waits for an offer before listening again, in ms
    #[serde(default = "default_discovery_timeout")]
    pub discovery_timeout_ms: u64,
}

fn default_udp_port() -> u16 {
    DISCOVERY_PORT
}

fn default_broadcast_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::BROADCAST)
}

fn default_offer_interval() -> u64 {
    1000
}

fn default_io_timeout() -> u64 {
    // Covers a human thinking about hit or stand
    120_000
}

fn default_connect_timeout() -> u64 {
    5000
}

fn default_discovery_timeout() -> u64 {
    5000
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            udp_port: default_udp_port(),
            tcp_port: 0,
            broadcast_address: default_broadcast_address(),
            offer_interval_ms: default_offer_interval(),
            io_timeout_ms: default_io_timeout(),
            connect_timeout_ms: default_connect_timeout(),
            discovery_timeout_ms: default_discovery_timeout(),
        }
    }
}

impl NetworkConfig {
    pub fn offer_interval(&self) -> Duration {
        Duration::from_millis(self.offer_interval_ms)
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_millis(self.discovery_timeout_ms)
    }
}

/// Client configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Rounds to request (prompted if not set)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rounds: Option<u8>,
    /// Play automatically, standing once the total reaches this value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_stand_on: Option<u8>,
}

impl Config {
    /// Sample configuration with every section filled in
    pub fn sample() -> Self {
        Self {
            general: GeneralConfig {
                name: "Lucky Sevens".to_string(),
                verbose: false,
            },
            client: ClientConfig {
                rounds: Some(3),
                auto_stand_on: None,
            },
            ..Default::default()
        }
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the default location
    pub fn load_default() -> ConfigResult<Self> {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("blackjack-net/config.toml")),
            Some(PathBuf::from("./blackjack-net.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                return Self::load(path);
            }
        }

        // Return default config if no file found
        Ok(Self::default())
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let contents = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Reject values the protocol cannot carry
    pub fn validate(&self) -> ConfigResult<()> {
        if self.client.rounds == Some(0) {
            return Err(ConfigError::Invalid {
                field: "client.rounds",
                reason: "must be between 1 and 255".to_string(),
            });
        }
        if self.network.offer_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "network.offer_interval_ms",
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Generate a sample configuration file
pub fn generate_sample_config() -> ConfigResult<String> {
    Ok(toml::to_string_pretty(&Config::sample())?)
}
