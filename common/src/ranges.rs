//! # Validator Range Model
//!
//! A [`RangeSet`] describes which deployed node owns which validator indices
//! on one network. The group index, the tag index and the summary total are
//! derived data: they are always recomputed from the node map with
//! [`RangeSet::from_nodes`] and never patched in place.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Half-open interval of validator indices, `start` inclusive, `end` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorRange {
    pub start: u64,
    pub end: u64,
}

impl ValidatorRange {
    /// Returns `None` unless `end >= start`.
    pub fn new(start: u64, end: u64) -> Option<Self> {
        (end >= start).then_some(Self { start, end })
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Attribute values are kept either as booleans or as raw text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Text(String),
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        if value.eq_ignore_ascii_case("true") {
            AttributeValue::Bool(true)
        } else if value.eq_ignore_ascii_case("false") {
            AttributeValue::Bool(false)
        } else {
            AttributeValue::Text(value.to_string())
        }
    }
}

/// One deployed host and the validator indices it runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub groups: Vec<String>,
    pub tags: Vec<String>,
    pub attributes: BTreeMap<String, AttributeValue>,
    pub validator_ranges: Vec<ValidatorRange>,
    /// Name of the source the node was parsed from.
    pub source: String,
}

impl Node {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    /// Saturates at `u64::MAX` instead of overflowing.
    pub fn validator_count(&self) -> u64 {
        self.validator_ranges
            .iter()
            .fold(0, |total: u64, range| total.saturating_add(range.len()))
    }

    pub fn add_group(&mut self, group: &str) {
        if !self.groups.iter().any(|g| g == group) {
            self.groups.push(group.to_string());
        }
    }

    pub fn add_tag(&mut self, tag: &str) {
        if !self.tags.iter().any(|t| t == tag) {
            self.tags.push(tag.to_string());
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatorSummary {
    pub total_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeMetadata {
    #[serde(default)]
    pub network_name: String,
    /// Contributing document URLs, first occurrence order, no duplicates.
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeSet {
    pub nodes: BTreeMap<String, Node>,
    pub validators: ValidatorSummary,
    pub groups: BTreeMap<String, Vec<String>>,
    pub tags: BTreeMap<String, Vec<String>>,
    pub metadata: RangeMetadata,
}

impl RangeSet {
    /// Builds a set from a node map, deriving every index from it.
    ///
    /// Nodes without a single validator range are dropped first, so the
    /// indices only ever reference nodes that are present in `nodes`.
    pub fn from_nodes<I>(nodes: BTreeMap<String, Node>, sources: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let nodes: BTreeMap<String, Node> = nodes
            .into_iter()
            .filter(|(_, node)| !node.validator_ranges.is_empty())
            .collect();

        let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut tags: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut total_count = 0;

        for (id, node) in &nodes {
            for group in &node.groups {
                groups.entry(group.clone()).or_default().push(id.clone());
            }
            for tag in &node.tags {
                tags.entry(tag.clone()).or_default().push(id.clone());
            }
            total_count = node.validator_count().saturating_add(total_count);
        }

        let mut unique: Vec<String> = Vec::new();
        for source in sources {
            if !unique.contains(&source) {
                unique.push(source);
            }
        }

        Self {
            nodes,
            validators: ValidatorSummary { total_count },
            groups,
            tags,
            metadata: RangeMetadata {
                network_name: String::new(),
                sources: unique,
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
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

    fn node(groups: &[&str], ranges: &[(u64, u64)]) -> Node {
        let mut n = Node::new("test");
        for g in groups {
            n.add_group(g);
        }
        n.validator_ranges = ranges
            .iter()
            .filter_map(|(s, e)| ValidatorRange::new(*s, *e))
            .collect();
        n
    }

    #[test]
    fn inverted_range_is_rejected() {
        assert!(ValidatorRange::new(10, 5).is_none());
        assert_eq!(ValidatorRange::new(5, 5).map(|r| r.len()), Some(0));
    }

    #[test]
    fn indices_only_reference_surviving_nodes() {
        let mut nodes = BTreeMap::new();
        nodes.insert("a".to_string(), node(&["g1"], &[(0, 8), (16, 20)]));
        nodes.insert("b".to_string(), node(&["g1", "g2"], &[]));

        let set = RangeSet::from_nodes(nodes, ["u1".to_string(), "u1".to_string()]);

        assert_eq!(set.nodes.len(), 1);
        assert_eq!(set.validators.total_count, 12);
        assert_eq!(set.groups.get("g1"), Some(&vec!["a".to_string()]));
        assert!(!set.groups.contains_key("g2"));
        assert_eq!(set.metadata.sources, vec!["u1".to_string()]);
    }

    #[test]
    fn extreme_ranges_saturate_the_total() {
        let mut nodes = BTreeMap::new();
        nodes.insert("a".to_string(), node(&["g1"], &[(0, u64::MAX), (0, 10)]));
        nodes.insert("b".to_string(), node(&["g1"], &[(0, 10)]));

        let set = RangeSet::from_nodes(nodes, ["u1".to_string()]);

        assert_eq!(set.nodes["a"].validator_count(), u64::MAX);
        assert_eq!(set.validators.total_count, u64::MAX);
        assert_eq!(set.nodes.len(), 2);
    }

    #[test]
    fn attribute_booleans_ignore_case() {
        assert_eq!(AttributeValue::from("True"), AttributeValue::Bool(true));
        assert_eq!(AttributeValue::from("FALSE"), AttributeValue::Bool(false));
        assert_eq!(
            AttributeValue::from("aws"),
            AttributeValue::Text("aws".to_string())
        );
    }
}
