use std::collections::BTreeMap;

use carto_common::config::RepositoryConfig;
use carto_common::network::{NetworkRecord, NetworkStatus, RepositoryMetadata};

/// Key under which a repository's metadata is published.
///
/// The name prefix without its trailing dash when one is configured,
/// otherwise the last segment of `owner/name`.
fn metadata_key(repo: &RepositoryConfig) -> String {
    match repo.name_prefix.as_deref().filter(|p| !p.is_empty()) {
        Some(prefix) => prefix.trim_end_matches('-').to_string(),
        None => match repo.name.split_once('/') {
            Some((_, name)) if !name.contains('/') => name.to_string(),
            _ => repo.name.clone(),
        },
    }
}

/// Finds the configured repository a network belongs to.
///
/// Repositories are checked in configuration order and a name prefix match
/// is tried before the repository reference of the record.
fn owner<'a>(
    repos: &'a [RepositoryConfig],
    name: &str,
    record: &NetworkRecord,
) -> Option<&'a RepositoryConfig> {
    let repository = record.repository.as_deref()?;
    if repository.is_empty() {
        return None;
    }

    repos.iter().find(|repo| {
        let by_prefix = repo
            .name_prefix
            .as_deref()
            .is_some_and(|p| !p.is_empty() && name.starts_with(p));
        by_prefix || repo.name == repository
    })
}

/// Builds the per-repository metadata of a merged network map.
pub(super) fn repository_metadata(
    repos: &[RepositoryConfig],
    networks: &BTreeMap<String, NetworkRecord>,
) -> BTreeMap<String, RepositoryMetadata> {
    let mut metadata: BTreeMap<String, RepositoryMetadata> = repos
        .iter()
        .map(|repo| {
            let meta = RepositoryMetadata {
                display_name: repo.display_name.clone(),
                description: repo.description.clone(),
                image: repo.image.clone(),
                ..RepositoryMetadata::default()
            };
            (metadata_key(repo), meta)
        })
        .collect();

    for (name, record) in networks {
        let Some(repo) = owner(repos, name, record) else {
            continue;
        };
        let Some(meta) = metadata.get_mut(&metadata_key(repo)) else {
            continue;
        };

        let stats = &mut meta.stats;
        stats.total_networks += 1;
        stats.network_names.push(record.name.clone());
        if record.status == NetworkStatus::Active {
            stats.active_networks += 1;
        } else {
            stats.inactive_networks += 1;
        }
    }

    metadata
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

    fn repo(name: &str, prefix: Option<&str>) -> RepositoryConfig {
        RepositoryConfig {
            name: name.to_string(),
            name_prefix: prefix.map(str::to_string),
            display_name: Some(name.to_string()),
            ..RepositoryConfig::default()
        }
    }

    fn record(name: &str, repository: &str, status: NetworkStatus) -> (String, NetworkRecord) {
        let mut record = NetworkRecord::new(name, status);
        record.repository = Some(repository.to_string());
        (name.to_string(), record)
    }

    #[test]
    fn counts_networks_per_repository() {
        let repos = vec![
            repo("ethpandaops/fusaka-devnets", Some("fusaka-")),
            repo("ethpandaops/dencun-devnets", None),
        ];
        let networks = BTreeMap::from([
            record("fusaka-devnet-1", "ethpandaops/fusaka-devnets", NetworkStatus::Active),
            record("fusaka-devnet-0", "ethpandaops/fusaka-devnets", NetworkStatus::Inactive),
            record("devnet-12", "ethpandaops/dencun-devnets", NetworkStatus::Active),
            record("stray", "someone/else", NetworkStatus::Active),
        ]);

        let metadata = repository_metadata(&repos, &networks);

        let fusaka = &metadata["fusaka"].stats;
        assert_eq!(fusaka.total_networks, 2);
        assert_eq!(fusaka.active_networks, 1);
        assert_eq!(fusaka.inactive_networks, 1);
        assert_eq!(fusaka.network_names, vec!["fusaka-devnet-0", "fusaka-devnet-1"]);

        let dencun = &metadata["dencun-devnets"];
        assert_eq!(dencun.stats.network_names, vec!["devnet-12"]);
        assert_eq!(dencun.display_name.as_deref(), Some("ethpandaops/dencun-devnets"));
        assert_eq!(metadata.len(), 2);
    }

    #[test]
    fn records_without_repository_are_not_counted() {
        let repos = vec![repo("ethpandaops/fusaka-devnets", Some("fusaka-"))];
        let networks = BTreeMap::from([(
            "fusaka-devnet-1".to_string(),
            NetworkRecord::new("fusaka-devnet-1", NetworkStatus::Active),
        )]);

        let metadata = repository_metadata(&repos, &networks);
        assert_eq!(metadata["fusaka"].stats.total_networks, 0);
    }
}
