//! # Configuration
//!
//! One YAML document configures every command. `${VAR}` and `$VAR`
//! references are substituted from the environment before parsing, and
//! every field falls back to a default so a partial file is valid.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::utils::envsubst;
use crate::utils::numeric::RawNumber;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub discovery: DiscoveryConfig,
    pub storage: StorageConfig,
    pub validator_ranges: RangesConfig,
    pub inventory: InventoryConfig,
    /// Run a single discovery cycle and exit.
    pub run_once: bool,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&raw)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        let expanded = envsubst::substitute(raw);
        if expanded.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(&expanded)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingConfig {
    /// `trace`, `debug`, `info`, `warn` or `error`. `RUST_LOG` wins when set.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ─── Discovery ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiscoveryConfig {
    pub interval_secs: u64,
    /// Repositories whose networks are summarized in the result metadata.
    pub repositories: Vec<RepositoryConfig>,
    #[serde(rename = "static")]
    pub static_networks: StaticConfig,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3600,
            repositories: Vec::new(),
            static_networks: StaticConfig::default(),
        }
    }
}

impl DiscoveryConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RepositoryConfig {
    /// `owner/name`.
    pub name: String,
    pub name_prefix: Option<String>,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticConfig {
    pub networks: Vec<StaticNetworkConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StaticNetworkConfig {
    pub name: String,
    pub description: Option<String>,
    pub repository: Option<String>,
    pub chain_id: Option<RawNumber>,
    pub genesis_time: Option<RawNumber>,
    pub genesis_delay: Option<RawNumber>,
    #[serde(rename = "configURL", alias = "configUrl")]
    pub config_url: Option<String>,
    #[serde(rename = "serviceURLs", alias = "serviceUrls")]
    pub service_urls: BTreeMap<String, String>,
    pub self_hosted_dns: bool,
}

// ─── Storage ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Local,
    Http,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Root directory of the `local` backend.
    pub path: PathBuf,
    /// Base URL of the `http` backend.
    pub endpoint: Option<String>,
    pub bucket: String,
    /// Bearer token sent by the `http` backend.
    pub token: Option<String>,
    /// Key of the network snapshot.
    pub key: String,
    pub retry_delay_ms: u64,
    pub max_attempts: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Local,
            path: PathBuf::from("./data"),
            endpoint: None,
            bucket: String::new(),
            token: None,
            key: crate::storage::keys::NETWORKS.to_string(),
            retry_delay_ms: 5000,
            max_attempts: 3,
        }
    }
}

impl StorageConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

// ─── Validator ranges ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RangesConfig {
    /// Used when a network record names no repository.
    pub default_repository: String,
    /// Candidate document URLs, `{repo}` and `{network}` are substituted.
    pub inventory_url_templates: Vec<String>,
    /// Leading fork prefixes removed from network names before lookup.
    pub strip_prefixes: Vec<String>,
    /// Name recorded on nodes parsed from the repository documents.
    pub source_name: String,
    pub max_concurrent_networks: usize,
    pub http_timeout_secs: u64,
    /// Extra documents per network, merged after the repository documents.
    pub additional_sources: BTreeMap<String, Vec<SourceConfig>>,
}

impl Default for RangesConfig {
    fn default() -> Self {
        let base = "https://raw.githubusercontent.com/{repo}/master/ansible/inventories/{network}";
        Self {
            default_repository: "ethpandaops/ansible".to_string(),
            inventory_url_templates: vec![
                format!("{base}/inventory.ini"),
                format!("{base}/hetzner_inventory.ini"),
            ],
            strip_prefixes: ["fusaka-", "pectra-", "dencun-", "eof-", "verkle-"]
                .iter()
                .map(|p| p.to_string())
                .collect(),
            source_name: "ethpandaops".to_string(),
            max_concurrent_networks: 5,
            http_timeout_secs: 30,
            additional_sources: BTreeMap::new(),
        }
    }
}

impl RangesConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SourceConfig {
    pub url: String,
    pub name: String,
    /// Added to every validator index parsed from this source.
    pub range_offset: u64,
}

// ─── Inventory ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InventoryConfig {
    pub max_concurrent_networks: usize,
    pub health_timeout_secs: u64,
    pub fetch_attempts: usize,
    pub validation: ValidationConfig,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            max_concurrent_networks: 5,
            health_timeout_secs: 5,
            fetch_attempts: 3,
            validation: ValidationConfig::default(),
        }
    }
}

impl InventoryConfig {
    pub fn health_timeout(&self) -> Duration {
        Duration::from_secs(self.health_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidationConfig {
    pub enabled: bool,
    /// Per-lookup DNS timeout. HTTP probes get twice this.
    pub dns_timeout_ms: u64,
    /// Slots shared by every lookup and probe.
    pub max_concurrent_validations: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dns_timeout_ms: 3000,
            max_concurrent_validations: 100,
        }
    }
}

impl ValidationConfig {
    pub fn dns_timeout(&self) -> Duration {
        Duration::from_millis(self.dns_timeout_ms)
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let cfg = Config::from_yaml("").unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.discovery.interval(), Duration::from_secs(3600));
        assert_eq!(cfg.storage.key, "networks.json");
        assert_eq!(cfg.validator_ranges.inventory_url_templates.len(), 2);
        assert_eq!(cfg.inventory.validation.max_concurrent_validations, 100);
    }

    #[test]
    fn partial_document_keeps_other_defaults() {
        let raw = r#"
logging:
  level: debug
discovery:
  intervalSecs: 60
  static:
    networks:
      - name: mainnet
        chainId: 1
        genesisTime: "1606824023"
        serviceURLs:
          Dora: https://dora.mainnet.example
validatorRanges:
  additionalSources:
    hoodi:
      - url: https://example.com/extra.ini
        name: partner
        rangeOffset: 51312
"#;
        let cfg = Config::from_yaml(raw).unwrap();

        assert_eq!(cfg.logging.level, "debug");
        assert_eq!(cfg.discovery.interval_secs, 60);
        let mainnet = &cfg.discovery.static_networks.networks[0];
        assert_eq!(mainnet.chain_id.as_ref().and_then(RawNumber::normalize), Some(1));
        assert_eq!(
            mainnet.genesis_time.as_ref().and_then(RawNumber::normalize),
            Some(1606824023)
        );
        assert_eq!(cfg.validator_ranges.additional_sources["hoodi"][0].range_offset, 51312);
        assert_eq!(cfg.validator_ranges.max_concurrent_networks, 5);
        assert_eq!(cfg.storage.max_attempts, 3);
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let err = Config::from_yaml("storage:\n  backend: ftp\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
