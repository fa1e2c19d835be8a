// all settings in one place. session sizing, solvency policy, bus endpoint.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete configuration for one exchange session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    // Initial cash granted to every registered participant
    pub starting_capital: Decimal,
    // Number of participants that must report in before trading starts
    pub expected_clients: usize,
    // When false, sellers must hold the inventory they sell
    pub shorts_allowed: bool,
    pub transport: TransportConfig,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            starting_capital: dec!(100000),
            expected_clients: 0,
            shorts_allowed: false,
            transport: TransportConfig::default(),
        }
    }
}

impl ExchangeConfig {
    /// Load configuration overrides from a JSON file. Absent keys keep
    /// their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path.as_ref()).map_err(|source| ConfigError::Read {
            path: path.as_ref().display().to_string(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.as_ref().display().to_string(),
            source,
        })
    }
}

/// Connection settings for the external message bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5672,
            user: "guest".to_string(),
            pass: "guest".to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}
