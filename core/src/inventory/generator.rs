//! Maps client-listing entries onto [`ClientRecord`]s.

use carto_common::clients::ClientRecord;
use carto_common::registry::ClientRegistry;
use carto_common::utils::numeric;
use carto_protocols::dora::{self, ConsensusClient, ExecutionClient};
use tracing::debug;

const DOMAIN: &str = "ethpandaops.io";

/// Hostnames derived for one client instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hostnames {
    pub ssh: String,
    pub beacon_api: String,
    pub rpc: String,
}

impl Hostnames {
    pub fn new(client: &str, network: &str, self_hosted_dns: bool) -> Self {
        if self_hosted_dns {
            Self {
                ssh: format!("devops@{client}.srv.{network}.{DOMAIN}"),
                beacon_api: format!("bn-{client}.srv.{network}.{DOMAIN}"),
                rpc: format!("rpc-{client}.srv.{network}.{DOMAIN}"),
            }
        } else {
            Self {
                ssh: format!("devops@{client}.{network}.{DOMAIN}"),
                beacon_api: format!("bn.{client}.{network}.{DOMAIN}"),
                rpc: format!("rpc.{client}.{network}.{DOMAIN}"),
            }
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

pub fn consensus_record(
    registry: &ClientRegistry,
    client: &ConsensusClient,
    network: &str,
    self_hosted_dns: bool,
) -> ClientRecord {
    let client_type = client.client_type.trim().to_ascii_lowercase();
    if !client_type.is_empty() && registry.get(&client_type).is_none() {
        debug!(client = %client.client_name, client_type = %client_type, "unknown consensus client type");
    }

    let hosts = Hostnames::new(&client.client_name, network, self_hosted_dns);
    ClientRecord {
        client_name: client.client_name.clone(),
        client_type,
        version: client.version.clone(),
        peer_id: non_empty(&client.peer_id),
        node_id: non_empty(&client.node_id),
        enr: non_empty(&client.enr),
        status: client.status.clone(),
        peer_count: numeric::normalize(&client.peer_count),
        peers_inbound: numeric::normalize(&client.peers_inbound),
        peers_outbound: numeric::normalize(&client.peers_outbound),
        metadata: dora::stringify_metadata(&client.metadata),
        ssh: hosts.ssh,
        beacon_api: hosts.beacon_api,
        ..ClientRecord::default()
    }
}

pub fn execution_record(
    registry: &ClientRegistry,
    client: &ExecutionClient,
    network: &str,
    self_hosted_dns: bool,
) -> ClientRecord {
    let client_type = registry.normalize_type(&client.client_type, &client.version);
    let hosts = Hostnames::new(&client.client_name, network, self_hosted_dns);

    ClientRecord {
        client_name: client.client_name.clone(),
        client_type,
        version: client.version.clone(),
        peer_id: non_empty(&client.peer_id),
        node_id: non_empty(&client.node_id),
        enode: non_empty(&client.enode),
        status: client.status.clone(),
        peer_count: numeric::normalize(&client.peer_count),
        peers_inbound: numeric::normalize(&client.peers_inbound),
        peers_outbound: numeric::normalize(&client.peers_outbound),
        ssh: hosts.ssh,
        rpc: hosts.rpc,
        ..ClientRecord::default()
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
