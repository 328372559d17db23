//! # Client Inventory Model

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a probeable endpoint is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    /// `user@host`, checked by resolving `host`.
    Ssh,
    /// Bare host, checked with an HTTPS request.
    Api,
}

/// A populated endpoint field of a [`ClientRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint<'a> {
    /// Short name used in diagnostics (`ssh`, `beacon-api`, `rpc`).
    pub label: &'static str,
    pub kind: EndpointKind,
    pub value: &'a str,
}

/// Outcome of the liveness check for a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Validation {
    Passed,
    /// Liveness checks were disabled for the run.
    Skipped,
}

/// A running client instance reported by a network's client API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRecord {
    pub client_name: String,
    pub client_type: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enode: Option<String>,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peers_inbound: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peers_outbound: Option<u64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ssh: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub beacon_api: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub rpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<Validation>,
}

impl ClientRecord {
    /// The endpoint fields that carry a value, in check order.
    pub fn endpoints(&self) -> Vec<Endpoint<'_>> {
        [
            ("ssh", EndpointKind::Ssh, self.ssh.as_str()),
            ("beacon-api", EndpointKind::Api, self.beacon_api.as_str()),
            ("rpc", EndpointKind::Api, self.rpc.as_str()),
        ]
        .into_iter()
        .filter(|(_, _, value)| !value.trim().is_empty())
        .map(|(label, kind, value)| Endpoint { label, kind, value })
        .collect()
    }
}

/// Per-network artifact published by the inventory pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryData {
    pub network: String,
    pub repository: String,
    pub last_updated: DateTime<Utc>,
    pub consensus_clients: Vec<ClientRecord>,
    pub execution_clients: Vec<ClientRecord>,
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
