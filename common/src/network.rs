//! # Network Model
//!
//! Records produced by source adapters and the snapshot that the discovery
//! orchestrator publishes once per cycle.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state reported for a network.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkStatus {
    Active,
    Inactive,
    #[default]
    Unknown,
}

impl fmt::Display for NetworkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NetworkStatus::Active => "active",
            NetworkStatus::Inactive => "inactive",
            NetworkStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// A configuration file published for a network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub path: String,
    pub url: String,
}

/// Genesis and fork metadata of a network.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenesisConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genesis_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genesis_delay: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub consensus_layer: Vec<ConfigFile>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub execution_layer: Vec<ConfigFile>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metadata: Vec<ConfigFile>,
}

/// One network as reported by a source adapter.
///
/// Records are rebuilt from scratch every cycle and never mutated after
/// they are placed into a [`DiscoveryResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkRecord {
    pub name: String,
    #[serde(default)]
    pub status: NetworkStatus,
    /// `owner/name` of the repository describing this network.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    /// Canonical service name (see [`canonical_service`]) to URL.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub service_urls: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genesis_config: Option<GenesisConfig>,
    /// Hosts live under the `srv.` subdomain of the network.
    #[serde(default)]
    pub self_hosted_dns: bool,
    pub last_updated: DateTime<Utc>,
}

impl NetworkRecord {
    pub fn new(name: impl Into<String>, status: NetworkStatus) -> Self {
        Self {
            name: name.into(),
            status,
            repository: None,
            path: None,
            url: None,
            description: None,
            chain_id: None,
            service_urls: BTreeMap::new(),
            genesis_config: None,
            self_hosted_dns: false,
            last_updated: Utc::now(),
        }
    }

    pub fn service(&self, name: &str) -> Option<&str> {
        self.service_urls.get(name).map(String::as_str)
    }
}

const SERVICES: &[(&str, &str)] = &[
    ("faucet", "faucet"),
    ("jsonrpc", "jsonRpc"),
    ("beaconrpc", "beaconRpc"),
    ("explorer", "explorer"),
    ("etherscan", "explorer"),
    ("beaconexplorer", "beaconExplorer"),
    ("forkmon", "forkmon"),
    ("assertoor", "assertoor"),
    ("dora", "dora"),
    ("checkpointsync", "checkpointSync"),
    ("blobscan", "blobscan"),
    ("ethstats", "ethstats"),
    ("devnetspec", "devnetSpec"),
    ("blobarchive", "blobArchive"),
    ("forky", "forky"),
    ("tracoor", "tracoor"),
    ("syncoor", "syncoor"),
];

/// Maps a service key, matched case-insensitively, to its canonical name.
pub fn canonical_service(key: &str) -> Option<&'static str> {
    let lower = key.to_ascii_lowercase();
    SERVICES
        .iter()
        .find(|(alias, _)| *alias == lower)
        .map(|(_, canonical)| *canonical)
}

/// Statistics for the networks that share a repository.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryStats {
    pub total_networks: usize,
    pub active_networks: usize,
    pub inactive_networks: usize,
    pub network_names: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub stats: RepositoryStats,
}

/// Static profile of a well-known client implementation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientProfile {
    pub name: String,
    pub display_name: String,
    pub repository: String,
    pub branch: String,
    #[serde(rename = "type")]
    pub layer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docs_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub name: String,
}

/// The immutable outcome of one discovery cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryResult {
    pub networks: BTreeMap<String, NetworkRecord>,
    #[serde(default)]
    pub network_metadata: BTreeMap<String, RepositoryMetadata>,
    #[serde(default)]
    pub clients: BTreeMap<String, ClientProfile>,
    pub last_update: DateTime<Utc>,
    /// Wall time of the cycle in seconds.
    pub duration: f64,
    pub providers: Vec<ProviderInfo>,
}

impl Default for DiscoveryResult {
    fn default() -> Self {
        Self {
            networks: BTreeMap::new(),
            network_metadata: BTreeMap::new(),
            clients: BTreeMap::new(),
            last_update: Utc::now(),
            duration: 0.0,
            providers: Vec::new(),
        }
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
    fn service_keys_are_case_insensitive() {
        assert_eq!(canonical_service("JSONRPC"), Some("jsonRpc"));
        assert_eq!(canonical_service("beaconExplorer"), Some("beaconExplorer"));
        assert_eq!(canonical_service("etherscan"), Some("explorer"));
        assert_eq!(canonical_service("grafana"), None);
    }

    #[test]
    fn record_serializes_camel_case() {
        let mut record = NetworkRecord::new("devnet-1", NetworkStatus::Active);
        record.chain_id = Some(7);
        record
            .service_urls
            .insert("dora".to_string(), "https://dora.devnet-1.example".to_string());

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["status"], "active");
        assert_eq!(json["chainId"], 7);
        assert_eq!(json["serviceUrls"]["dora"], "https://dora.devnet-1.example");
        assert!(json.get("repository").is_none());

        let back: NetworkRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
