//! Payloads of the client-listing API exposed by a network explorer.
//!
//! The API answers with snake_case JSON. Numeric fields are kept as raw
//! [`serde_json::Value`]s so callers can run them through one normalization
//! routine instead of trusting whatever type the server chose.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

pub const CONSENSUS_CLIENTS_PATH: &str = "api/v1/clients/consensus";
pub const EXECUTION_CLIENTS_PATH: &str = "api/v1/clients/execution";

/// Joins an API base URL and a relative path with exactly one slash.
pub fn endpoint(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConsensusClient {
    pub client_name: String,
    pub client_type: String,
    pub version: String,
    pub peer_id: String,
    pub node_id: String,
    pub enr: String,
    pub status: String,
    pub peer_count: Value,
    pub peers_inbound: Value,
    pub peers_outbound: Value,
    pub metadata: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExecutionClient {
    pub client_name: String,
    pub client_type: String,
    pub version: String,
    pub peer_id: String,
    pub node_id: String,
    pub enode: String,
    pub status: String,
    pub peer_count: Value,
    pub peers_inbound: Value,
    pub peers_outbound: Value,
}

#[derive(Debug, Deserialize)]
struct Listing<T> {
    #[serde(default = "Vec::new")]
    clients: Vec<T>,
}

pub fn decode_consensus(body: &[u8]) -> Result<Vec<ConsensusClient>, serde_json::Error> {
    serde_json::from_slice::<Listing<ConsensusClient>>(body).map(|l| l.clients)
}

pub fn decode_execution(body: &[u8]) -> Result<Vec<ExecutionClient>, serde_json::Error> {
    serde_json::from_slice::<Listing<ExecutionClient>>(body).map(|l| l.clients)
}

/// Flattens arbitrary metadata values into strings.
///
/// Strings are kept verbatim, `null` entries are dropped and every other
/// value is rendered as compact JSON.
pub fn stringify_metadata(metadata: &BTreeMap<String, Value>) -> BTreeMap<String, String> {
    metadata
        .iter()
        .filter_map(|(key, value)| {
            let rendered = match value {
                Value::Null => return None,
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            Some((key.clone(), rendered))
        })
        .collect()
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
