//! beacon.toml configuration parser.
//!
//! Every table and key is optional; a missing file section falls back to
//! the defaults below (5s startup delay, 1s tick, 500ms remote-call timeout).

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::identity::{Eligibility, NodeIdentity, generate_node_name, is_valid_node_name};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BeaconConfig {
    pub node: NodeConfig,
    pub timing: TimingConfig,
    pub directory: DirectoryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Randomly generated when absent.
    pub name: Option<String>,
    pub host: String,
    pub port: u16,
    pub eligibility: Eligibility,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            name: None,
            host: "127.0.0.1".to_string(),
            port: 7100,
            eligibility: Eligibility::Eligible,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub startup_delay: String,
    pub tick_interval: String,
    pub rpc_timeout: String,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            startup_delay: "5s".to_string(),
            tick_interval: "1s".to_string(),
            rpc_timeout: "500ms".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// `host:port` of the directory service.
    pub address: String,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:7000".to_string(),
        }
    }
}

/// Parsed scheduler timings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Delay before the first tick.
    pub startup_delay: Duration,
    /// Time between tick starts.
    pub tick_interval: Duration,
    /// Upper bound for any single remote call.
    pub rpc_timeout: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            startup_delay: Duration::from_millis(5000),
            tick_interval: Duration::from_millis(1000),
            rpc_timeout: Duration::from_millis(500),
        }
    }
}

impl BeaconConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Address peers use to reach this node.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.node.host, self.node.port)
    }

    /// Resolve the node's fixed identity.
    ///
    /// With `eligibility = "random"` every call flips a new coin, so call
    /// this once at startup.
    pub fn identity(&self) -> NodeIdentity {
        let name = self.node.name.clone().unwrap_or_else(generate_node_name);
        NodeIdentity::new(name, self.endpoint(), self.node.eligibility.resolve())
    }

    /// Parse the timing table. Only the startup delay may be zero.
    pub fn timing(&self) -> Result<Timing, ConfigError> {
        Ok(Timing {
            startup_delay: parse_field("timing.startup_delay", &self.timing.startup_delay)?,
            tick_interval: non_zero(
                "timing.tick_interval",
                parse_field("timing.tick_interval", &self.timing.tick_interval)?,
            )?,
            rpc_timeout: non_zero(
                "timing.rpc_timeout",
                parse_field("timing.rpc_timeout", &self.timing.rpc_timeout)?,
            )?,
        })
    }

    /// Check everything a node needs before it starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(name) = &self.node.name {
            if !is_valid_node_name(name) {
                return Err(ConfigError::InvalidName(name.clone()));
            }
        }
        self.timing()?;
        Ok(())
    }
}

fn non_zero(field: &'static str, value: Duration) -> Result<Duration, ConfigError> {
    if value.is_zero() {
        return Err(ConfigError::ZeroDuration { field });
    }
    Ok(value)
}

fn parse_field(field: &'static str, value: &str) -> Result<Duration, ConfigError> {
    parse_duration(value).ok_or_else(|| ConfigError::InvalidDuration {
        field,
        value: value.to_string(),
    })
}

/// Parse a duration string like "5s", "500ms", "1m".
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(secs) = s.strip_suffix('s') {
        if let Some(ms) = secs.strip_suffix('m') {
            ms.parse::<u64>().ok().map(Duration::from_millis)
        } else {
            secs.parse::<u64>().ok().map(Duration::from_secs)
        }
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>().ok().map(|m| Duration::from_secs(m * 60))
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}
