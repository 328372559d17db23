//! # Sectioned Inventory Tokenizer
//!
//! Splits a host inventory document into sections and entries:
//!
//! ```text
//! [lighthouse_geth]
//! lighthouse-geth-1 ansible_host=10.0.0.1 validator_start=0 validator_end=8
//! ```
//!
//! The format is lenient on purpose. Blank lines, comments (`#`, `;`) and
//! any line that is neither a section header nor contains `=` are dropped.
//! Entries before the first header belong to no section and are dropped too.
//! Only a malformed section header is an error, because everything that
//! follows it would be attributed to the wrong group.

use thiserror::Error;
use tracing::trace;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SectionError {
    #[error("line {line}: malformed section header '{header}'")]
    Malformed { line: usize, header: String },

    #[error("line {line}: empty section name")]
    EmptyName { line: usize },
}

/// One assignment-shaped line inside a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry<'a> {
    /// First token of the line, up to whitespace or `=`.
    pub key: &'a str,
    /// Everything after the key, trimmed.
    pub rest: &'a str,
    /// 1-based line number.
    pub line: usize,
}

impl<'a> Entry<'a> {
    /// Iterates the `name=value` tokens of the remainder.
    ///
    /// Tokens without `=` or with an empty name are skipped.
    pub fn assignments(self) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.rest
            .split_whitespace()
            .filter_map(|token| token.split_once('='))
            .filter(|(name, _)| !name.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section<'a> {
    pub name: &'a str,
    pub entries: Vec<Entry<'a>>,
}

pub fn parse(document: &str) -> Result<Vec<Section<'_>>, SectionError> {
    let mut sections: Vec<Section<'_>> = Vec::new();

    for (idx, raw) in document.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();

        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if line.starts_with('[') {
            let name = section_name(line, line_no)?;
            sections.push(Section {
                name,
                entries: Vec::new(),
            });
            continue;
        }

        if !line.contains('=') {
            trace!(line = line_no, "skipping stray inventory line");
            continue;
        }

        let Some(section) = sections.last_mut() else {
            trace!(line = line_no, "skipping entry outside of any section");
            continue;
        };

        let split_at = line
            .find(|c: char| c.is_whitespace() || c == '=')
            .unwrap_or(line.len());
        let key = &line[..split_at];
        let rest = line[split_at..].trim_start();
        let rest = rest.strip_prefix('=').unwrap_or(rest).trim();

        if key.is_empty() {
            continue;
        }

        section.entries.push(Entry {
            key,
            rest,
            line: line_no,
        });
    }

    Ok(sections)
}

fn section_name(line: &str, line_no: usize) -> Result<&str, SectionError> {
    let malformed = || SectionError::Malformed {
        line: line_no,
        header: line.to_string(),
    };

    let close = line.find(']').ok_or_else(malformed)?;
    let trailing = line[close + 1..].trim();
    if !(trailing.is_empty() || trailing.starts_with('#') || trailing.starts_with(';')) {
        return Err(malformed());
    }

    let name = line[1..close].trim();
    if name.contains('[') {
        return Err(malformed());
    }
    if name.is_empty() {
        return Err(SectionError::EmptyName { line: line_no });
    }

    Ok(name)
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

    #[test]
    fn splits_sections_and_entries() {
        let doc = "\
localhost
[lighthouse_geth]
# comment
lighthouse-geth-1 ansible_host=10.0.0.1 validator_start=0 validator_end=8

[all:vars]
ansible_user = devops
";
        let sections = parse(doc).unwrap();

        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].name, "lighthouse_geth");
        assert_eq!(sections[0].entries.len(), 1);

        let entry = sections[0].entries[0];
        assert_eq!(entry.key, "lighthouse-geth-1");
        assert_eq!(entry.line, 4);
        let pairs: Vec<(&str, &str)> = entry.assignments().collect();
        assert_eq!(
            pairs,
            vec![
                ("ansible_host", "10.0.0.1"),
                ("validator_start", "0"),
                ("validator_end", "8")
            ]
        );

        let vars = sections[1].entries[0];
        assert_eq!(vars.key, "ansible_user");
        assert_eq!(vars.rest, "devops");
    }

    #[test]
    fn entries_before_first_section_are_dropped() {
        let sections = parse("orphan validator_start=0 validator_end=8\n[g]\n").unwrap();
        assert_eq!(sections.len(), 1);
        assert!(sections[0].entries.is_empty());
    }

    #[test]
    fn malformed_headers_are_errors() {
        assert_eq!(
            parse("[ok]\n[broken\n"),
            Err(SectionError::Malformed {
                line: 2,
                header: "[broken".to_string()
            })
        );
        assert!(matches!(
            parse("[group] junk"),
            Err(SectionError::Malformed { line: 1, .. })
        ));
        assert_eq!(parse("[  ]"), Err(SectionError::EmptyName { line: 1 }));
        assert!(parse("[group] ; note").is_ok());
    }
}
