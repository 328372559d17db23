use std::collections::BTreeMap;

use carto_common::ranges::{Node, RangeSet};
use tracing::warn;

/// Merges range sets in priority order.
///
/// The first set to contain a node id owns it. A later node with the same
/// id is discarded as a whole, its groups, tags and ranges included. Group
/// and tag indices and the validator total are rebuilt from the surviving
/// nodes, and source URLs are concatenated without duplicates.
pub fn aggregate(sets: &[RangeSet]) -> RangeSet {
    let mut nodes: BTreeMap<String, Node> = BTreeMap::new();
    let mut sources: Vec<String> = Vec::new();
    let mut network_name = String::new();

    for set in sets {
        for (id, node) in &set.nodes {
            match nodes.get(id) {
                Some(existing) => {
                    warn!(
                        node = %id,
                        kept_source = %existing.source,
                        discarded_source = %node.source,
                        "duplicate node across sources, keeping first"
                    );
                }
                None => {
                    nodes.insert(id.clone(), node.clone());
                }
            }
        }

        sources.extend(set.metadata.sources.iter().cloned());
        if network_name.is_empty() {
            network_name.clone_from(&set.metadata.network_name);
        }
    }

    let mut merged = RangeSet::from_nodes(nodes, sources);
    merged.metadata.network_name = network_name;
    merged
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
    use carto_common::ranges::ValidatorRange;

    /// Builds a set from `(id, comma separated groups, range)` triples.
    fn set(source: &str, url: &str, nodes: &[(&str, &str, (u64, u64))]) -> RangeSet {
        let nodes = nodes
            .iter()
            .map(|(id, groups, (start, end))| {
                let mut node = Node::new(source);
                for g in groups.split(',') {
                    node.add_group(g);
                }
                node.validator_ranges.push(ValidatorRange { start: *start, end: *end });
                (id.to_string(), node)
            })
            .collect();
        RangeSet::from_nodes(nodes, [url.to_string()])
    }

    #[test]
    fn disjoint_sources_are_merged() {
        let a = set("ethpandaops", "https://a/inventory.ini", &[("lighthouse-geth-1", "lighthouse_geth", (0, 8))]);
        let b = set("partner", "https://b/inventory.ini", &[("prysm-besu-1", "prysm_besu", (100, 108))]);

        let merged = aggregate(&[a, b]);

        assert_eq!(merged.nodes.len(), 2);
        assert_eq!(merged.validators.total_count, 16);
        assert_eq!(
            merged.metadata.sources,
            vec!["https://a/inventory.ini".to_string(), "https://b/inventory.ini".to_string()]
        );
    }

    #[test]
    fn duplicate_is_discarded_whole() {
        let a = set("ethpandaops", "https://a/inventory.ini", &[("x", "g1", (0, 8))]);
        let b = set("partner", "https://b/inventory.ini", &[("x", "g1,g2", (8, 16))]);
        let original = a.nodes["x"].clone();

        let merged = aggregate(&[a, b]);

        assert_eq!(merged.nodes["x"], original);
        assert!(!merged.groups.contains_key("g2"));
        assert_eq!(merged.groups["g1"], vec!["x".to_string()]);
        assert_eq!(merged.validators.total_count, 8);
    }

    #[test]
    fn sources_are_deduplicated_in_order() {
        let a = set("s", "u1", &[("a", "g", (0, 1))]);
        let b = set("s", "u2", &[("b", "g", (1, 2))]);
        let c = set("s", "u1", &[("c", "g", (2, 3))]);

        let merged = aggregate(&[a, b, c]);

        assert_eq!(merged.metadata.sources, vec!["u1".to_string(), "u2".to_string()]);
        assert_eq!(merged.groups["g"], vec!["a", "b", "c"]);
    }

    #[test]
    fn empty_input_yields_empty_set() {
        let merged = aggregate(&[]);
        assert!(merged.nodes.is_empty());
        assert!(merged.groups.is_empty());
        assert!(merged.metadata.sources.is_empty());
        assert_eq!(merged.validators.total_count, 0);
    }
}
