//! Merger/deduplicator: per-volume entries → one [`CanonicalMapping`].
//!
//! Entries are folded into a [`MergeAccumulator`] keyed by headword, then
//! alias chains are resolved once every volume is in.

use std::collections::{BTreeMap, HashSet};

use schedario_core::markup::escape_html;
use schedario_core::{CanonicalMapping, Diagnostic, Diagnostics, Entry};
use tracing::{debug, warn};

use crate::config::ParsingConfig;

/// Fold `incoming` into `existing` (same headword).
///
/// Two definitions are concatenated; a definition beats an alias, whose
/// target is kept as a cross-reference; of two aliases the first target
/// stays and the other becomes a cross-reference.
fn combine(existing: &mut Entry, incoming: Entry, separator: &str) {
    existing
        .source_volumes
        .extend(incoming.source_volumes.iter().copied());
    existing
        .variant_headwords
        .extend(incoming.variant_headwords.iter().cloned());
    existing
        .cross_references
        .extend(incoming.cross_references.iter().cloned());

    match (existing.is_alias, incoming.is_alias) {
        (false, false) => {
            let already = existing
                .definition
                .split(separator)
                .any(|d| d == incoming.definition);
            if !already {
                if existing.html.is_some() || incoming.html.is_some() {
                    let left = existing
                        .html
                        .take()
                        .unwrap_or_else(|| escape_html(&existing.definition));
                    let right = incoming
                        .html
                        .unwrap_or_else(|| escape_html(&incoming.definition));
                    existing.html = Some(format!("{left}{}{right}", escape_html(separator)));
                }
                existing.definition.push_str(separator);
                existing.definition.push_str(&incoming.definition);
            }
            if existing.qualifier.is_none() {
                existing.qualifier = incoming.qualifier;
            }
            if existing.derived_from.is_none() {
                existing.derived_from = incoming.derived_from;
            }
        }
        (false, true) => {
            existing.cross_references.extend(incoming.alias_target);
        }
        (true, false) => {
            let target = existing.alias_target.take();
            existing.is_alias = false;
            existing.definition = incoming.definition;
            existing.html = incoming.html;
            existing.qualifier = incoming.qualifier;
            existing.derived_from = incoming.derived_from;
            existing.cross_references.extend(target);
        }
        (true, true) => {
            if incoming.alias_target != existing.alias_target {
                existing.cross_references.extend(incoming.alias_target);
            }
        }
    }

    let headword = existing.headword.clone();
    existing.variant_headwords.remove(&headword);
    existing.cross_references.remove(&headword);
}

/// How one alias chain ended.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Resolution {
    /// A non-alias headword.
    Target(String),
    /// The chain reached a name that is nowhere in the mapping.
    Unresolved(String),
    /// The chain looped; resolved to the last entry reached before the loop.
    Cycle { chain: Vec<String>, resolved_to: String },
}

/// Headword → entry state built across volumes.
#[derive(Debug, Clone, Default)]
pub struct MergeAccumulator {
    separator: String,
    entries: BTreeMap<String, Entry>,
}

impl MergeAccumulator {
    pub fn new(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
            entries: BTreeMap::new(),
        }
    }

    pub fn from_config(config: &ParsingConfig) -> Self {
        Self::new(config.definition_separator.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add one entry, combining it with any entry of the same headword.
    pub fn add(&mut self, entry: Entry) {
        match self.entries.get_mut(&entry.headword) {
            Some(existing) => {
                debug!(headword = %entry.headword, "merging duplicate headword");
                combine(existing, entry, &self.separator);
            }
            None => {
                self.entries.insert(entry.headword.clone(), entry);
            }
        }
    }

    pub fn add_volume(&mut self, entries: impl IntoIterator<Item = Entry>) {
        for entry in entries {
            self.add(entry);
        }
    }

    /// Resolve alias chains and hand over the finished mapping.
    ///
    /// Unknown targets and cycles are recorded in `diagnostics`; the affected
    /// aliases keep a best-effort target.
    pub fn finish(self, diagnostics: &mut Diagnostics) -> CanonicalMapping {
        let mut entries = self.entries;

        // Variant spelling → headword; only consulted when a target is not a
        // headword itself.
        let mut variants: BTreeMap<String, String> = BTreeMap::new();
        for (headword, entry) in &entries {
            for variant in &entry.variant_headwords {
                if !entries.contains_key(variant) {
                    variants
                        .entry(variant.clone())
                        .or_insert_with(|| headword.clone());
                }
            }
        }

        let resolutions: Vec<(String, Resolution)> = entries
            .iter()
            .filter(|(_, e)| e.is_alias)
            .map(|(headword, _)| (headword.clone(), resolve(&entries, &variants, headword)))
            .collect();

        for (headword, resolution) in resolutions {
            let target = match resolution {
                Resolution::Target(target) => target,
                Resolution::Unresolved(target) => {
                    warn!(%headword, %target, "unresolved alias");
                    diagnostics.push(Diagnostic::UnresolvedAlias {
                        headword: headword.clone(),
                        target: target.clone(),
                    });
                    target
                }
                Resolution::Cycle { chain, resolved_to } => {
                    warn!(%headword, chain = %chain.join(" → "), "alias cycle");
                    diagnostics.push(Diagnostic::AliasCycle {
                        headword: headword.clone(),
                        chain,
                        resolved_to: resolved_to.clone(),
                    });
                    resolved_to
                }
            };
            if let Some(entry) = entries.get_mut(&headword) {
                entry.alias_target = Some(target);
            }
        }

        CanonicalMapping::new(entries)
    }
}

fn lookup<'a>(
    entries: &'a BTreeMap<String, Entry>,
    variants: &'a BTreeMap<String, String>,
    name: &str,
) -> Option<&'a str> {
    entries
        .get_key_value(name)
        .map(|(k, _)| k.as_str())
        .or_else(|| variants.get(name).map(String::as_str))
}

/// Follow an alias chain from `start` with a visited guard.
fn resolve(
    entries: &BTreeMap<String, Entry>,
    variants: &BTreeMap<String, String>,
    start: &str,
) -> Resolution {
    let mut chain = vec![start.to_string()];
    let mut visited: HashSet<&str> = HashSet::from([start]);
    let mut current = start;

    loop {
        let Some(literal) = entries.get(current).and_then(|e| e.alias_target.as_deref()) else {
            return Resolution::Target(current.to_string());
        };
        let Some(next) = lookup(entries, variants, literal) else {
            return Resolution::Unresolved(literal.to_string());
        };
        chain.push(next.to_string());
        if !visited.insert(next) {
            return Resolution::Cycle {
                chain,
                resolved_to: current.to_string(),
            };
        }
        if entries.get(next).is_some_and(|e| !e.is_alias) {
            return Resolution::Target(next.to_string());
        }
        current = next;
    }
}

/// Merge per-volume entry lists in one go.
pub fn merge_entries(
    volumes: Vec<Vec<Entry>>,
    config: &ParsingConfig,
    diagnostics: &mut Diagnostics,
) -> CanonicalMapping {
    let mut acc = MergeAccumulator::from_config(config);
    for entries in volumes {
        acc.add_volume(entries);
    }
    acc.finish(diagnostics)
}
