use std::collections::BTreeMap;
use std::sync::Arc;

use carto_common::ranges::{AttributeValue, Node, RangeSet, ValidatorRange};
use carto_common::registry::ClientRegistry;
use carto_protocols::inventory::{self, SectionError};
use thiserror::Error;
use tracing::debug;

const RANGE_START: &str = "validator_start";
const RANGE_END: &str = "validator_end";

/// Attribute names that are published under a different key.
const RENAMED_ATTRIBUTES: &[(&str, &str)] = &[("ethereumNodeClSupernodeEnabled", "isClSupernode")];

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid inventory document: {0}")]
    Section(#[from] SectionError),
}

/// Parses inventory documents into [`RangeSet`]s.
#[derive(Debug, Clone)]
pub struct RangeParser {
    registry: Arc<ClientRegistry>,
}

impl RangeParser {
    pub fn new(registry: Arc<ClientRegistry>) -> Self {
        Self { registry }
    }

    /// Parses one document.
    ///
    /// Each section is a deployment group and each entry a node. Every node
    /// takes the classification tags implied by its groups, one validator
    /// range per entry carrying both bounds (shifted by `index_offset`), and
    /// all other `name=value` tokens as camelCase attributes. Nodes that end
    /// up without any range are left out of the result.
    pub fn parse(
        &self,
        document: &str,
        source_url: &str,
        source_name: &str,
        index_offset: u64,
    ) -> Result<RangeSet, ParseError> {
        let sections = inventory::parse(document)?;
        let mut nodes: BTreeMap<String, Node> = BTreeMap::new();

        for section in &sections {
            let tags = self.registry.tags_for_group(section.name);

            for entry in &section.entries {
                let node = nodes
                    .entry(entry.key.to_string())
                    .or_insert_with(|| Node::new(source_name));

                node.add_group(section.name);
                for tag in &tags {
                    node.add_tag(tag);
                }

                let mut start = None;
                let mut end = None;

                for (name, value) in entry.assignments() {
                    match name {
                        RANGE_START => start = range_bound(value),
                        RANGE_END => end = range_bound(value),
                        _ => {
                            node.attributes
                                .insert(attribute_key(name), AttributeValue::from(value));
                        }
                    }
                }

                match shifted_range(start, end, index_offset) {
                    Some(range) => node.validator_ranges.push(range),
                    None if start.is_some() || end.is_some() => {
                        debug!(node = entry.key, line = entry.line, "ignoring incomplete validator range");
                    }
                    None => {}
                }
            }
        }

        Ok(RangeSet::from_nodes(nodes, [source_url.to_string()]))
    }
}

/// Range bounds are plain decimal integers.
fn range_bound(value: &str) -> Option<u64> {
    value.parse::<u64>().ok()
}

fn shifted_range(start: Option<u64>, end: Option<u64>, offset: u64) -> Option<ValidatorRange> {
    let start = start?.checked_add(offset)?;
    let end = end?.checked_add(offset)?;
    ValidatorRange::new(start, end)
}

/// `cloud_region` becomes `cloudRegion`, then well-known renames apply.
fn attribute_key(name: &str) -> String {
    let mut parts = name.split('_');
    let mut key = parts.next().unwrap_or_default().to_string();

    for part in parts {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            key.extend(first.to_uppercase());
            key.push_str(chars.as_str());
        }
    }

    RENAMED_ATTRIBUTES
        .iter()
        .find(|(from, _)| *from == key)
        .map(|(_, to)| to.to_string())
        .unwrap_or(key)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
