#![cfg(test)]
use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use carto_common::config::{
    Config, InventoryConfig, RangesConfig, SourceConfig, StaticConfig, StaticNetworkConfig,
};
use carto_common::network::DiscoveryResult;
use carto_common::registry::ClientRegistry;
use carto_core::discovery::{DiscoveryService, ResultHandler, SnapshotPublisher};
use carto_core::inventory::{ClientApi, InventoryService};
use carto_core::liveness::{EndpointProber, HostResolver, LivenessValidator};
use carto_core::ranges::{RangeParser, RangeService};
use carto_core::storage::MemoryStore;
use carto_integration_tests::CannedFetcher;
use carto_plugins::StaticSource;
use carto_protocols::dora::{ConsensusClient, ExecutionClient};
use tokio_util::sync::CancellationToken;

const INVENTORY: &str = r#"
# managed by ansible
localhost

[lighthouse_geth]
lighthouse-geth-1 ansible_host=10.0.0.1 validator_start=0 validator_end=128
lighthouse-geth-2 ansible_host=10.0.0.2 validator_start=128 validator_end=256

[bootnode]
bootnode-1 ansible_host=10.0.0.9
"#;

const CONFIG: &str = r#"
storage:
  backend: memory
discovery:
  static:
    networks:
      - name: devnet-7
        repository: ethpandaops/fusaka-devnets
        chainId: "7011893"
        serviceURLs:
          Dora: https://dora.devnet-7.ethpandaops.io
"#;

/// Runs one discovery cycle from `CONFIG` and publishes it to `store`.
async fn publish_snapshot(store: Arc<MemoryStore>) -> DiscoveryResult {
    let config: Config = Config::from_yaml(CONFIG).expect("test config must parse");

    let mut service = DiscoveryService::new(config.discovery, Arc::new(ClientRegistry::default()));
    service.register_source(Arc::new(StaticSource));
    let result: DiscoveryResult = service.run_once(&CancellationToken::new()).await.unwrap();

    SnapshotPublisher::new(store, "networks.json")
        .handle(&result)
        .await
        .unwrap();
    result
}

fn ranges_config(templates: &[&str]) -> RangesConfig {
    RangesConfig {
        inventory_url_templates: templates.iter().map(|t| t.to_string()).collect(),
        ..RangesConfig::default()
    }
}

#[tokio::test]
async fn ranges_keep_only_reachable_documents() {
    let store: Arc<MemoryStore> = Arc::new(MemoryStore::default());
    let snapshot: DiscoveryResult = publish_snapshot(store.clone()).await;

    let fetcher = CannedFetcher::default()
        .with("https://inv.test/ethpandaops/fusaka-devnets/devnet-7/inventory.ini", INVENTORY);
    let service = RangeService::new(
        RangeParser::new(Arc::new(ClientRegistry::default())),
        Arc::new(fetcher),
        store.clone(),
        ranges_config(&[
            "https://inv.test/{repo}/{network}/inventory.ini",
            "https://inv.test/{repo}/{network}/hetzner_inventory.ini",
        ]),
    );

    let report = service
        .run(&CancellationToken::new(), &snapshot.networks)
        .await
        .unwrap();
    assert_eq!(report.published, vec!["devnet-7".to_string()]);

    let ranges = store
        .json("validator-ranges/devnet-7.json")
        .expect("validator ranges must be published");
    assert_eq!(
        ranges["metadata"]["sources"],
        serde_json::json!(["https://inv.test/ethpandaops/fusaka-devnets/devnet-7/inventory.ini"])
    );
    assert_eq!(ranges["validators"]["totalCount"], 256);
    assert!(ranges["nodes"].get("bootnode-1").is_none(), "range-less node must be dropped");
    assert!(ranges["nodes"].get("localhost").is_none());
    assert_eq!(ranges["nodes"]["lighthouse-geth-1"]["attributes"]["ansibleHost"], "10.0.0.1");
    assert_eq!(
        ranges["tags"]["cl:lighthouse"],
        serde_json::json!(["lighthouse-geth-1", "lighthouse-geth-2"])
    );
}

#[tokio::test]
async fn ranges_are_not_published_without_documents() {
    let store: Arc<MemoryStore> = Arc::new(MemoryStore::default());
    let snapshot: DiscoveryResult = publish_snapshot(store.clone()).await;

    let service = RangeService::new(
        RangeParser::new(Arc::new(ClientRegistry::default())),
        Arc::new(CannedFetcher::default()),
        store.clone(),
        ranges_config(&["https://inv.test/{repo}/{network}/inventory.ini"]),
    );

    let report = service
        .run(&CancellationToken::new(), &snapshot.networks)
        .await
        .unwrap();

    assert_eq!(report.skipped, vec!["devnet-7".to_string()]);
    assert_eq!(store.keys(), vec!["networks.json".to_string()]);
}

#[tokio::test]
async fn partner_ranges_follow_repository_ranges() {
    let store: Arc<MemoryStore> = Arc::new(MemoryStore::default());
    let snapshot: DiscoveryResult = publish_snapshot(store.clone()).await;

    let partner = "[prysm_nethermind_validator]\nprysm-nethermind-1 validator_start=0 validator_end=32\n";
    let fetcher = CannedFetcher::default()
        .with("https://inv.test/ethpandaops/fusaka-devnets/devnet-7/inventory.ini", INVENTORY)
        .with("https://partner.test/devnet-7.ini", partner);

    let mut config: RangesConfig = ranges_config(&["https://inv.test/{repo}/{network}/inventory.ini"]);
    config.additional_sources = BTreeMap::from([(
        "devnet-7".to_string(),
        vec![SourceConfig {
            url: "https://partner.test/devnet-7.ini".to_string(),
            name: "partner".to_string(),
            range_offset: 256,
        }],
    )]);

    let service = RangeService::new(
        RangeParser::new(Arc::new(ClientRegistry::default())),
        Arc::new(fetcher),
        store.clone(),
        config,
    );
    service
        .run(&CancellationToken::new(), &snapshot.networks)
        .await
        .unwrap();

    let ranges = store.json("validator-ranges/devnet-7.json").unwrap();
    let partner_node = &ranges["nodes"]["prysm-nethermind-1"];
    assert_eq!(partner_node["source"], "partner");
    assert_eq!(partner_node["validatorRanges"][0]["start"], 256);
    assert_eq!(ranges["validators"]["totalCount"], 288);
    assert_eq!(
        ranges["tags"]["vc:validator"],
        serde_json::json!(["prysm-nethermind-1"])
    );
}

struct FakeApi;

#[async_trait]
impl ClientApi for FakeApi {
    async fn check_health(&self, _: &CancellationToken, _: &str) -> anyhow::Result<()> {
        Ok(())
    }

    async fn consensus_clients(
        &self,
        _: &CancellationToken,
        _: &str,
    ) -> anyhow::Result<Vec<ConsensusClient>> {
        Ok(["lighthouse-geth-1", "retired-node-1"]
            .iter()
            .map(|name| ConsensusClient {
                client_name: name.to_string(),
                client_type: "Lighthouse".to_string(),
                peer_count: serde_json::json!("48"),
                ..ConsensusClient::default()
            })
            .collect())
    }

    async fn execution_clients(
        &self,
        _: &CancellationToken,
        _: &str,
    ) -> anyhow::Result<Vec<ExecutionClient>> {
        Ok(vec![ExecutionClient {
            client_name: "lighthouse-geth-1".to_string(),
            version: "Geth/v1.15.0-stable".to_string(),
            ..ExecutionClient::default()
        }])
    }
}

/// Knows every host except the ones of retired nodes.
struct FleetResolver;

#[async_trait]
impl HostResolver for FleetResolver {
    async fn resolve(&self, host: &str) -> anyhow::Result<Vec<IpAddr>> {
        anyhow::ensure!(!host.contains("retired"), "NXDOMAIN {host}");
        Ok(vec![IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))])
    }
}

struct FleetProber;

#[async_trait]
impl EndpointProber for FleetProber {
    async fn head(&self, url: &str) -> anyhow::Result<u16> {
        Ok(if url.contains("retired") { 502 } else { 401 })
    }
}

#[tokio::test]
async fn inventory_drops_clients_failing_liveness() {
    let store: Arc<MemoryStore> = Arc::new(MemoryStore::default());
    publish_snapshot(store.clone()).await;

    let validator = LivenessValidator::new(Duration::from_millis(500), 8)
        .unwrap()
        .with_resolver(Arc::new(FleetResolver))
        .with_prober(Arc::new(FleetProber));
    let service = InventoryService::new(
        Arc::new(FakeApi),
        store.clone(),
        Arc::new(ClientRegistry::default()),
        &InventoryConfig::default(),
    )
    .unwrap()
    .with_validator(Some(validator));

    let published: Vec<String> = service.run(&CancellationToken::new()).await.unwrap();
    assert_eq!(published, vec!["devnet-7".to_string()]);

    let inventory = store
        .json("inventory/devnet-7.json")
        .expect("inventory must be published");
    let consensus = inventory["consensusClients"].as_array().unwrap();
    assert_eq!(consensus.len(), 1, "retired node must be dropped");
    assert_eq!(consensus[0]["clientName"], "lighthouse-geth-1");
    assert_eq!(consensus[0]["peerCount"], 48);
    assert_eq!(
        consensus[0]["beaconApi"],
        "bn.lighthouse-geth-1.devnet-7.ethpandaops.io"
    );
    assert_eq!(inventory["executionClients"][0]["clientType"], "geth");
}

#[tokio::test]
async fn static_networks_without_repository_get_no_inventory() {
    let store: Arc<MemoryStore> = Arc::new(MemoryStore::default());

    let mut discovery = Config::default().discovery;
    discovery.static_networks = StaticConfig {
        networks: vec![StaticNetworkConfig {
            name: "mainnet-shadow".to_string(),
            service_urls: BTreeMap::from([(
                "dora".to_string(),
                "https://dora.shadow.test".to_string(),
            )]),
            ..StaticNetworkConfig::default()
        }],
    };
    let mut service = DiscoveryService::new(discovery, Arc::new(ClientRegistry::default()));
    service.register_source(Arc::new(StaticSource));
    let result: DiscoveryResult = service.run_once(&CancellationToken::new()).await.unwrap();
    SnapshotPublisher::new(store.clone(), "networks.json")
        .handle(&result)
        .await
        .unwrap();

    let published: Vec<String> = InventoryService::new(
        Arc::new(FakeApi),
        store.clone(),
        Arc::new(ClientRegistry::default()),
        &InventoryConfig::default(),
    )
    .unwrap()
    .with_validator(None)
    .run(&CancellationToken::new())
    .await
    .unwrap();

    assert!(published.is_empty());
}
