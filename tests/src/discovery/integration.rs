#![cfg(test)]
use std::sync::Arc;
use std::time::Duration;

use carto_common::config::{DiscoveryConfig, RepositoryConfig};
use carto_common::network::DiscoveryResult;
use carto_common::registry::ClientRegistry;
use carto_core::discovery::{DiscoveryService, ResultHandler, SnapshotPublisher};
use carto_core::storage::MemoryStore;
use carto_integration_tests::{FailingSource, FixedSource};
use tokio_util::sync::CancellationToken;

fn new_service(config: DiscoveryConfig) -> DiscoveryService {
    DiscoveryService::new(config, Arc::new(ClientRegistry::default()))
}

/// A failing source only loses its own contribution.
#[tokio::test]
async fn partial_source_failure_keeps_other_records() {
    let mut service: DiscoveryService = new_service(DiscoveryConfig::default());
    service.register_source(Arc::new(FailingSource));
    service.register_source(Arc::new(FixedSource::new("static", &["hoodi", "sepolia"])));

    let result: DiscoveryResult = service
        .run_once(&CancellationToken::new())
        .await
        .expect("a failing source must not fail the cycle");

    let names: Vec<&String> = result.networks.keys().collect();
    assert_eq!(names, vec!["hoodi", "sepolia"]);
    assert_eq!(result.providers.len(), 2);
}

/// The first registered source owns a network even when it finishes last.
#[tokio::test]
async fn collisions_resolve_by_registration_order() {
    let mut service: DiscoveryService = new_service(DiscoveryConfig::default());
    service.register_source(Arc::new(
        FixedSource::new("primary", &["devnet-1"]).delayed(Duration::from_millis(50)),
    ));
    service.register_source(Arc::new(FixedSource::new("secondary", &["devnet-1"])));

    for _ in 0..3 {
        let result: DiscoveryResult = service.run_once(&CancellationToken::new()).await.unwrap();
        assert_eq!(
            result.networks["devnet-1"].description.as_deref(),
            Some("from primary"),
            "later registered source must never win a collision"
        );
    }
}

#[tokio::test]
async fn no_sources_produce_an_empty_result() {
    let result: DiscoveryResult = new_service(DiscoveryConfig::default())
        .run_once(&CancellationToken::new())
        .await
        .unwrap();

    assert!(result.networks.is_empty());
    assert!(result.providers.is_empty());
}

/// An empty cycle never replaces a published snapshot.
#[tokio::test]
async fn empty_result_does_not_overwrite_snapshot() {
    let store: Arc<MemoryStore> = Arc::new(MemoryStore::default());
    let publisher = SnapshotPublisher::new(store.clone(), "networks.json");

    let mut service: DiscoveryService = new_service(DiscoveryConfig::default());
    service.register_source(Arc::new(FixedSource::new("static", &["hoodi"])));
    let full: DiscoveryResult = service.run_once(&CancellationToken::new()).await.unwrap();
    publisher.handle(&full).await.unwrap();

    let empty: DiscoveryResult = new_service(DiscoveryConfig::default())
        .run_once(&CancellationToken::new())
        .await
        .unwrap();
    publisher.handle(&empty).await.unwrap();

    let snapshot = store.json("networks.json").expect("snapshot must survive");
    assert!(snapshot["networks"]["hoodi"].is_object());
}

#[tokio::test]
async fn repository_statistics_are_attached() {
    let config = DiscoveryConfig {
        repositories: vec![RepositoryConfig {
            name: "ethpandaops/fusaka-devnets".to_string(),
            name_prefix: Some("fusaka-".to_string()),
            ..RepositoryConfig::default()
        }],
        ..DiscoveryConfig::default()
    };

    let mut source = FixedSource::new("github", &["fusaka-devnet-1", "fusaka-devnet-2"]);
    for record in &mut source.networks {
        record.repository = Some("ethpandaops/fusaka-devnets".to_string());
    }

    let mut service: DiscoveryService = new_service(config);
    service.register_source(Arc::new(source));
    let result: DiscoveryResult = service.run_once(&CancellationToken::new()).await.unwrap();

    let stats = &result.network_metadata["fusaka"].stats;
    assert_eq!(stats.total_networks, 2);
    assert_eq!(stats.active_networks, 2);
}
