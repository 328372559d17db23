//! # Known Client Registry
//!
//! An immutable table of the client implementations the system recognizes.
//! It is built once and handed by reference to the components that classify
//! nodes or describe clients, instead of being consulted as global state.

use std::collections::BTreeMap;
use std::fmt;

use crate::network::ClientProfile;

/// Which half of the node stack a client implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    Execution,
    Consensus,
}

impl Layer {
    /// Short prefix used in classification tags.
    pub fn tag_prefix(&self) -> &'static str {
        match self {
            Layer::Execution => "el",
            Layer::Consensus => "cl",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Layer::Execution => "execution",
            Layer::Consensus => "consensus",
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownClient {
    pub name: &'static str,
    pub layer: Layer,
    pub display_name: &'static str,
    pub repository: &'static str,
    pub branch: &'static str,
    pub website_url: &'static str,
    pub docs_url: &'static str,
    /// Whether a group name containing `name` tags its nodes.
    pub tags_groups: bool,
}

pub const VALIDATOR_FRAGMENT: &str = "validator";
pub const VALIDATOR_TAG: &str = "vc:validator";

#[derive(Debug, Clone)]
pub struct ClientRegistry {
    clients: Vec<KnownClient>,
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new(default_clients())
    }
}

impl ClientRegistry {
    pub fn new(clients: Vec<KnownClient>) -> Self {
        Self { clients }
    }

    pub fn clients(&self) -> &[KnownClient] {
        &self.clients
    }

    pub fn get(&self, name: &str) -> Option<&KnownClient> {
        let lower = name.to_ascii_lowercase();
        self.clients.iter().find(|c| c.name == lower)
    }

    /// Classification tags implied by a deployment group name.
    ///
    /// Every tagging client whose name occurs in `group` contributes
    /// `<layer>:<name>`, execution clients first. A group mentioning the
    /// validator role also yields [`VALIDATOR_TAG`].
    pub fn tags_for_group(&self, group: &str) -> Vec<String> {
        let lower = group.to_ascii_lowercase();
        let mut tags = Vec::new();

        for layer in [Layer::Execution, Layer::Consensus] {
            for client in self
                .clients
                .iter()
                .filter(|c| c.layer == layer && c.tags_groups)
            {
                if lower.contains(client.name) {
                    tags.push(format!("{}:{}", layer.tag_prefix(), client.name));
                }
            }
        }

        if lower.contains(VALIDATOR_FRAGMENT) {
            tags.push(VALIDATOR_TAG.to_string());
        }

        tags
    }

    /// Normalizes a reported client type, falling back to the leading
    /// segment of the version string (`Geth/v1.14.0-stable` is `geth`).
    pub fn normalize_type(&self, reported: &str, version: &str) -> String {
        let reported = reported.trim().to_ascii_lowercase();
        if !reported.is_empty() {
            return reported;
        }

        let leading = version
            .split('/')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match self.get(&leading) {
            Some(client) => client.name.to_string(),
            None => leading,
        }
    }

    /// Static profiles of every known client, keyed by name.
    pub fn profiles(&self) -> BTreeMap<String, ClientProfile> {
        self.clients
            .iter()
            .map(|c| {
                let profile = ClientProfile {
                    name: c.name.to_string(),
                    display_name: c.display_name.to_string(),
                    repository: c.repository.to_string(),
                    branch: c.branch.to_string(),
                    layer: c.layer.to_string(),
                    website_url: Some(c.website_url.to_string()),
                    docs_url: Some(c.docs_url.to_string()),
                };
                (c.name.to_string(), profile)
            })
            .collect()
    }
}

#[rustfmt::skip]
fn default_clients() -> Vec<KnownClient> {
    use Layer::{Consensus, Execution};

    let table: [(&str, Layer, &str, &str, &str, &str, &str, bool); 13] = [
        ("lighthouse", Consensus, "Lighthouse", "sigp/lighthouse", "stable", "https://lighthouse.sigmaprime.io/", "https://lighthouse-book.sigmaprime.io/", true),
        ("prysm", Consensus, "Prysm", "OffchainLabs/prysm", "develop", "https://www.offchainlabs.com/prysm", "https://www.offchainlabs.com/prysm/docs", true),
        ("teku", Consensus, "Teku", "ConsenSys/teku", "master", "https://consensys.io/teku", "https://docs.teku.consensys.io/", true),
        ("nimbus", Consensus, "Nimbus", "status-im/nimbus-eth2", "stable", "https://nimbus.team/", "https://nimbus.guide/index.html", true),
        ("lodestar", Consensus, "Lodestar", "chainsafe/lodestar", "unstable", "https://lodestar.chainsafe.io/", "https://chainsafe.github.io/lodestar/", true),
        ("grandine", Consensus, "Grandine", "grandinetech/grandine", "develop", "https://grandine.io/", "https://docs.grandine.io/", true),
        ("besu", Execution, "Besu", "hyperledger/besu", "main", "https://hyperledger.org/", "https://besu.hyperledger.org/", true),
        ("geth", Execution, "Geth", "ethereum/go-ethereum", "master", "https://geth.ethereum.org/", "https://geth.ethereum.org/docs", true),
        ("nethermind", Execution, "Nethermind", "NethermindEth/nethermind", "master", "https://nethermind.io/", "https://docs.nethermind.io/", true),
        ("erigon", Execution, "Erigon", "erigontech/erigon", "main", "https://erigon.tech/", "https://docs.erigon.tech/", true),
        ("reth", Execution, "Reth", "paradigmxyz/reth", "main", "https://www.paradigm.xyz/", "https://reth.rs/", true),
        ("nimbusel", Execution, "NimbusEL", "status-im/nimbus-eth1", "master", "https://nimbus.team/", "https://nimbus.guide/index.html", false),
        ("ethereumjs", Execution, "EthereumJS", "ethereumjs/ethereumjs-monorepo", "master", "https://ethereumjs.github.io/", "https://ethereumjs.readthedocs.io/", false),
    ];

    table
        .into_iter()
        .map(|(name, layer, display_name, repository, branch, website_url, docs_url, tags_groups)| KnownClient {
            name,
            layer,
            display_name,
            repository,
            branch,
            website_url,
            docs_url,
            tags_groups,
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
