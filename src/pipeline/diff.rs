//! Diff calculation between two record sets.
//!
//! Records are matched by identity key. Fallback `GeneralContent` records
//! never take part; their presence only moves the fingerprint. Records
//! present on both sides count as unchanged whatever their other fields.

use std::collections::{HashMap, HashSet};

use crate::models::Record;

/// Records that appeared or disappeared between two snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// In current but not in previous
    pub added: Vec<Record>,
    /// In previous but not in current
    pub removed: Vec<Record>,
}

impl ChangeSet {
    /// Check if there are any reportable changes.
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty()
    }

    /// Get the total number of changes.
    pub fn change_count(&self) -> usize {
        self.added.len() + self.removed.len()
    }

    /// One `+ title` / `- title` line per change, added first.
    ///
    /// Records without a title are shown as `untitled`.
    pub fn summary_lines(&self, untitled: &str) -> Vec<String> {
        let label = |r: &Record| r.title().unwrap_or(untitled).to_string();
        self.added
            .iter()
            .map(|r| format!("+ {}", label(r)))
            .chain(self.removed.iter().map(|r| format!("- {}", label(r))))
            .collect()
    }
}

/// Identity-keyed view of one side of a diff.
///
/// Duplicate keys are last-write-wins: the slot keeps the position of the
/// first occurrence but holds the last record seen with that key.
struct KeyedRecords<'a> {
    order: Vec<String>,
    by_key: HashMap<String, &'a Record>,
}

impl<'a> KeyedRecords<'a> {
    fn build(records: &'a [Record]) -> Self {
        let mut order = Vec::new();
        let mut by_key = HashMap::new();

        for record in records.iter().filter(|r| r.is_diffable()) {
            let key = record.identity_key();
            if key.is_empty() {
                continue;
            }
            if by_key.insert(key.clone(), record).is_some() {
                log::debug!("Duplicate identity key shadowed: {}", key);
            } else {
                order.push(key);
            }
        }

        Self { order, by_key }
    }

    fn keys(&self) -> HashSet<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    /// Records whose key is absent from `other`, in first-seen order.
    fn missing_from(&self, other: &HashSet<&str>) -> Vec<Record> {
        self.order
            .iter()
            .filter(|key| !other.contains(key.as_str()))
            .filter_map(|key| self.by_key.get(key).map(|r| (*r).clone()))
            .collect()
    }
}

/// Compute the change set from `previous` to `current`.
pub fn calculate_diff(current: &[Record], previous: &[Record]) -> ChangeSet {
    let current = KeyedRecords::build(current);
    let previous = KeyedRecords::build(previous);

    ChangeSet {
        added: current.missing_from(&previous.keys()),
        removed: previous.missing_from(&current.keys()),
    }
}
