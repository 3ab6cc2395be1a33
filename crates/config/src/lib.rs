//! Configuration schema and loader for gossipkv nodes.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Top-level node configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Listen address for push/pull exchanges. Doubles as the node id
    /// ("host:port") unless `name` is set.
    pub listen: SocketAddr,

    /// Optional explicit node name.
    #[serde(default)]
    pub name: Option<String>,

    /// Port advertised for discovery in the node metadata broadcast.
    #[serde(default)]
    pub discovery_port: Option<u16>,

    /// Seed addresses to join through.
    #[serde(default)]
    pub seeds: Vec<String>,

    /// Anti-entropy settings.
    #[serde(default)]
    pub sync: SyncConfig,

    /// Expiry/tombstone sweep settings.
    #[serde(default)]
    pub janitor: JanitorConfig,

    /// Shared cookie peers must present on push/pull.
    #[serde(default)]
    pub cookie: String,

    /// Reserved for transport encryption. The plain TCP host accepts and
    /// ignores them.
    #[serde(default)]
    pub secret_keys: Vec<String>,

    /// Optional Prometheus metrics HTTP port.
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Interval between push/pull rounds in milliseconds. Lower values
    /// reduce staleness at the cost of network traffic.
    #[serde(default = "default_sync_interval_ms")]
    pub interval_ms: u64,

    /// Deadline for one full push/pull exchange in milliseconds.
    #[serde(default = "default_exchange_timeout_ms")]
    pub exchange_timeout_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_sync_interval_ms(),
            exchange_timeout_ms: default_exchange_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JanitorConfig {
    /// Interval between sweeps in milliseconds. Must be at least the sync
    /// interval so tombstones have a chance to propagate before eviction
    /// work begins.
    #[serde(default = "default_janitor_interval_ms")]
    pub interval_ms: u64,

    /// Age in seconds past which locally-owned tombstones are evicted.
    #[serde(default = "default_tombstone_max_age_secs")]
    pub tombstone_max_age_secs: u64,
}

impl Default for JanitorConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_janitor_interval_ms(),
            tombstone_max_age_secs: default_tombstone_max_age_secs(),
        }
    }
}

// --- Defaults ---

fn default_sync_interval_ms() -> u64 {
    1_000
}
fn default_exchange_timeout_ms() -> u64 {
    5_000
}
fn default_janitor_interval_ms() -> u64 {
    5_000
}
fn default_tombstone_max_age_secs() -> u64 {
    3_600
}

// --- Loading ---

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl NodeConfig {
    /// Validate that configuration values are consistent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sync.interval_ms == 0 {
            return Err(ConfigError::Invalid("sync.interval_ms must be > 0".into()));
        }
        if self.sync.exchange_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "sync.exchange_timeout_ms must be > 0".into(),
            ));
        }
        if self.janitor.interval_ms < self.sync.interval_ms {
            return Err(ConfigError::Invalid(format!(
                "janitor.interval_ms ({}) must be >= sync.interval_ms ({})",
                self.janitor.interval_ms, self.sync.interval_ms
            )));
        }
        if let Some(name) = &self.name {
            if name.is_empty() {
                return Err(ConfigError::Invalid("name must not be empty".into()));
            }
        }
        Ok(())
    }
}

/// Load a `NodeConfig` from a YAML file path.
pub fn load_from_file(path: &std::path::Path) -> Result<NodeConfig, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    let config: NodeConfig = serde_yaml::from_str(&contents)?;
    config.validate()?;
    Ok(config)
}

/// Load a `NodeConfig` from a YAML string.
pub fn load_from_str(yaml: &str) -> Result<NodeConfig, ConfigError> {
    let config: NodeConfig = serde_yaml::from_str(yaml)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let yaml = r#"
listen: "127.0.0.1:4400"
seeds:
  - "127.0.0.1:4401"
  - "127.0.0.1:4402"
"#;
        let config = load_from_str(yaml).unwrap();
        assert_eq!(config.listen.port(), 4400);
        assert_eq!(config.seeds.len(), 2);
        assert_eq!(config.sync.interval_ms, 1_000);
        assert_eq!(config.janitor.interval_ms, 5_000);
        assert_eq!(config.janitor.tombstone_max_age_secs, 3_600);
        assert_eq!(config.cookie, "");
        assert!(config.secret_keys.is_empty());
        assert_eq!(config.name, None);
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
listen: "0.0.0.0:4500"
name: "node-a"
discovery_port: 4501
seeds: []
sync:
  interval_ms: 250
  exchange_timeout_ms: 2000
janitor:
  interval_ms: 500
  tombstone_max_age_secs: 600
cookie: "swordfish"
secret_keys:
  - "AAAA"
metrics_port: 9102
"#;
        let config = load_from_str(yaml).unwrap();
        assert_eq!(config.name.as_deref(), Some("node-a"));
        assert_eq!(config.discovery_port, Some(4501));
        assert_eq!(config.sync.interval_ms, 250);
        assert_eq!(config.janitor.tombstone_max_age_secs, 600);
        assert_eq!(config.cookie, "swordfish");
        assert_eq!(config.secret_keys.len(), 1);
        assert_eq!(config.metrics_port, Some(9102));
    }

    #[test]
    fn test_roundtrip_yaml() {
        let yaml = r#"
listen: "127.0.0.1:4400"
seeds: []
"#;
        let config = load_from_str(yaml).unwrap();
        let serialized = serde_yaml::to_string(&config).unwrap();
        let config2 = load_from_str(&serialized).unwrap();
        assert_eq!(config.listen, config2.listen);
        assert_eq!(config.sync.interval_ms, config2.sync.interval_ms);
    }

    #[test]
    fn test_rejects_zero_sync_interval() {
        let yaml = r#"
listen: "127.0.0.1:4400"
sync:
  interval_ms: 0
"#;
        let err = load_from_str(yaml).unwrap_err().to_string();
        assert!(err.contains("sync.interval_ms"), "got: {}", err);
    }

    #[test]
    fn test_rejects_janitor_faster_than_sync() {
        let yaml = r#"
listen: "127.0.0.1:4400"
sync:
  interval_ms: 1000
janitor:
  interval_ms: 100
"#;
        let err = load_from_str(yaml).unwrap_err().to_string();
        assert!(err.contains("janitor.interval_ms"), "got: {}", err);
    }

    #[test]
    fn test_rejects_empty_name() {
        let yaml = r#"
listen: "127.0.0.1:4400"
name: ""
"#;
        let err = load_from_str(yaml).unwrap_err().to_string();
        assert!(err.contains("name"), "got: {}", err);
    }
}
