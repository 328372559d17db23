//! Networks declared directly in the configuration file.

use std::collections::BTreeMap;

use async_trait::async_trait;
use carto_common::config::{DiscoveryConfig, StaticNetworkConfig};
use carto_common::network::{self, ConfigFile, GenesisConfig, NetworkRecord, NetworkStatus};
use carto_common::sources::SourceAdapter;
use carto_common::{debug, error, info};
use reqwest::Url;
use tokio_util::sync::CancellationToken;

/// Turns `discovery.static.networks` into active network records.
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticSource;

impl StaticSource {
    fn record(&self, net: &StaticNetworkConfig) -> anyhow::Result<NetworkRecord> {
        let mut record = NetworkRecord::new(&net.name, NetworkStatus::Active);
        record.description = net.description.clone();
        record.repository = net.repository.clone().filter(|r| !r.is_empty());
        record.chain_id = net.chain_id.as_ref().and_then(|n| n.normalize());
        record.self_hosted_dns = net.self_hosted_dns;

        for (key, url) in &net.service_urls {
            match network::canonical_service(key) {
                Some(canonical) => {
                    record.service_urls.insert(canonical.to_string(), url.clone());
                }
                None => debug!(network = %net.name, service = %key, "ignoring unknown service"),
            }
        }

        let genesis_time = net.genesis_time.as_ref().and_then(|n| n.normalize());
        let config_url = net.config_url.as_deref().filter(|u| !u.is_empty());

        if genesis_time.is_some_and(|t| t > 0) || config_url.is_some() {
            let metadata = match config_url {
                Some(raw) => {
                    let parsed = Url::parse(raw)
                        .map_err(|e| anyhow::anyhow!("invalid config url '{raw}': {e}"))?;
                    vec![ConfigFile {
                        path: parsed.path().to_string(),
                        url: raw.to_string(),
                    }]
                }
                None => Vec::new(),
            };

            record.genesis_config = Some(GenesisConfig {
                genesis_time,
                genesis_delay: net.genesis_delay.as_ref().and_then(|n| n.normalize()),
                metadata,
                ..GenesisConfig::default()
            });
        }

        Ok(record)
    }
}

#[async_trait]
impl SourceAdapter for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn discover(
        &self,
        cancel: &CancellationToken,
        config: &DiscoveryConfig,
    ) -> anyhow::Result<BTreeMap<String, NetworkRecord>> {
        anyhow::ensure!(!cancel.is_cancelled(), "static discovery cancelled");

        let mut networks = BTreeMap::new();
        for net in &config.static_networks.networks {
            match self.record(net) {
                Ok(record) => {
                    debug!(network = %net.name, "discovered static network");
                    networks.insert(net.name.clone(), record);
                }
                Err(e) => error!(network = %net.name, error = %e, "skipping static network"),
            }
        }

        info!(count = networks.len(), "static network discovery complete");
        Ok(networks)
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
    use carto_common::config::StaticConfig;
    use carto_common::utils::numeric::RawNumber;

    fn config(networks: Vec<StaticNetworkConfig>) -> DiscoveryConfig {
        DiscoveryConfig {
            static_networks: StaticConfig { networks },
            ..DiscoveryConfig::default()
        }
    }

    fn hoodi() -> StaticNetworkConfig {
        StaticNetworkConfig {
            name: "hoodi".to_string(),
            chain_id: Some(RawNumber::Text("560048".to_string())),
            genesis_time: Some(RawNumber::Unsigned(1742213400)),
            config_url: Some("https://github.com/eth-clients/hoodi/raw/main/metadata/config.yaml".to_string()),
            service_urls: BTreeMap::from([
                ("Dora".to_string(), "https://dora.hoodi.ethpandaops.io".to_string()),
                ("etherscan".to_string(), "https://hoodi.etherscan.io".to_string()),
                ("mystery".to_string(), "https://example.invalid".to_string()),
            ]),
            ..StaticNetworkConfig::default()
        }
    }

    #[tokio::test]
    async fn builds_active_records() {
        let networks = StaticSource
            .discover(&CancellationToken::new(), &config(vec![hoodi()]))
            .await
            .unwrap();

        let hoodi = &networks["hoodi"];
        assert_eq!(hoodi.status, NetworkStatus::Active);
        assert_eq!(hoodi.chain_id, Some(560048));
        assert_eq!(hoodi.service("dora"), Some("https://dora.hoodi.ethpandaops.io"));
        assert_eq!(hoodi.service("explorer"), Some("https://hoodi.etherscan.io"));
        assert_eq!(hoodi.service_urls.len(), 2);

        let genesis = hoodi.genesis_config.as_ref().unwrap();
        assert_eq!(genesis.genesis_time, Some(1742213400));
        assert_eq!(genesis.metadata[0].path, "/eth-clients/hoodi/raw/main/metadata/config.yaml");
    }

    #[tokio::test]
    async fn invalid_config_url_skips_network() {
        let mut broken = hoodi();
        broken.name = "broken".to_string();
        broken.config_url = Some("::not a url::".to_string());

        let networks = StaticSource
            .discover(&CancellationToken::new(), &config(vec![hoodi(), broken]))
            .await
            .unwrap();

        assert!(networks.contains_key("hoodi"));
        assert!(!networks.contains_key("broken"));
    }

    #[tokio::test]
    async fn negative_numbers_are_dropped() {
        let mut net = hoodi();
        net.chain_id = Some(RawNumber::Signed(-1));
        net.genesis_time = None;
        net.config_url = None;

        let networks = StaticSource
            .discover(&CancellationToken::new(), &config(vec![net]))
            .await
            .unwrap();

        assert_eq!(networks["hoodi"].chain_id, None);
        assert!(networks["hoodi"].genesis_config.is_none());
    }
}
