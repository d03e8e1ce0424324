//! Client configuration.
//!
//! Loaded from YAML and validated once; the binary layers CLI/environment
//! overrides on top before validation.
//!
//! ```yaml
//! id: "1"
//! server:
//!   address: "server:12345"
//! log:
//!   level: "info"
//! batch:
//!   max_amount: 100
//! bets_file: "/data/agency-1.csv"
//! send_metadata: true
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{BetwireError, Result};

/// Default records per batch when the file does not set one.
pub const DEFAULT_BATCH_MAX_AMOUNT: usize = 100;

/// Top-level client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientConfig {
    /// Agency id, sent as the house id of every bet.
    pub id: String,
    pub server: ServerConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    /// CSV file with this agency's bets.
    pub bets_file: PathBuf,
    /// Send the batch metadata preamble before the first batch.
    #[serde(default = "default_send_metadata")]
    pub send_metadata: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    /// `host:port` of the lottery server.
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BatchConfig {
    /// Records per batch before clamping to the protocol ceiling.
    #[serde(default = "default_batch_max_amount")]
    pub max_amount: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_amount: default_batch_max_amount(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_batch_max_amount() -> usize {
    DEFAULT_BATCH_MAX_AMOUNT
}

fn default_send_metadata() -> bool {
    true
}

impl ClientConfig {
    /// Load configuration from YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Load configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: ClientConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML file, let `overrides` adjust it, then validate.
    pub fn from_file_with<P, F>(path: P, overrides: F) -> Result<Self>
    where
        P: AsRef<Path>,
        F: FnOnce(&mut Self),
    {
        let content = std::fs::read_to_string(path.as_ref())?;
        let mut config: ClientConfig = serde_yaml::from_str(&content)?;
        overrides(&mut config);
        config.validate()?;
        Ok(config)
    }

    /// Check every field that the file format alone cannot constrain.
    pub fn validate(&self) -> Result<()> {
        self.house_id()?;

        if self.server.address.trim().is_empty() {
            return Err(BetwireError::Config(
                "server.address must not be empty".to_string(),
            ));
        }
        if self.batch.max_amount == 0 {
            return Err(BetwireError::Config(
                "batch.max_amount must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Agency id as the one-byte house id carried in each bet.
    pub fn house_id(&self) -> Result<u8> {
        self.id.trim().parse::<u8>().map_err(|_| {
            BetwireError::Config(format!("id {:?} is not a number in 0..=255", self.id))
        })
    }
}
