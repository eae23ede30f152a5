//! Configuration loading for Geoblock.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::fetcher::DEFAULT_ZONE_URL;
use crate::rules::RemovalPolicy;

/// Main configuration. Every field has a default, so the tool works with no
/// config file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Zone URL template; `{country}` is replaced by the lowercase code.
    pub zone_url_template: String,

    /// Default ports to block when the caller supplies none.
    pub ports: Vec<u16>,

    /// Rule removal retry policy.
    pub removal: RemovalConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemovalConfig {
    pub max_attempts: u32,
    pub delay_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            zone_url_template: DEFAULT_ZONE_URL.to_string(),
            ports: vec![22],
            removal: RemovalConfig::default(),
        }
    }
}

impl Default for RemovalConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_secs: 1,
        }
    }
}

impl Config {
    /// Load from a YAML file; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    pub fn removal_policy(&self) -> RemovalPolicy {
        RemovalPolicy {
            max_attempts: self.removal.max_attempts,
            delay: Duration::from_secs(self.removal.delay_secs),
        }
    }
}
