//! Diff reporter: what changed between two persisted mappings.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// A headword whose rendered definition differs between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Change {
    pub headword: String,
    pub old: String,
    pub new: String,
}

/// Additions, removals and changes, each sorted by headword.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MappingDiff {
    pub added: Vec<(String, String)>,
    pub removed: Vec<(String, String)>,
    pub changed: Vec<Change>,
}

impl MappingDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

impl fmt::Display for MappingDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} added, {} removed, {} changed",
            self.added.len(),
            self.removed.len(),
            self.changed.len()
        )
    }
}

/// Compare two flat mappings. Both are walked in key order, so the result
/// is deterministic.
pub fn diff_mappings(
    old: &BTreeMap<String, String>,
    new: &BTreeMap<String, String>,
) -> MappingDiff {
    let mut diff = MappingDiff::default();

    for (headword, old_def) in old {
        match new.get(headword) {
            None => diff.removed.push((headword.clone(), old_def.clone())),
            Some(new_def) if new_def != old_def => diff.changed.push(Change {
                headword: headword.clone(),
                old: old_def.clone(),
                new: new_def.clone(),
            }),
            Some(_) => {}
        }
    }
    for (headword, new_def) in new {
        if !old.contains_key(headword) {
            diff.added.push((headword.clone(), new_def.clone()));
        }
    }

    diff
}
