//! Non-fatal anomalies collected over a run.
//!
//! Every stage isolates problems to the smallest unit it can (a page, a
//! block, an alias) and records them here instead of failing. The CLI
//! prints the summary; the full list can be exported as JSON.

use std::fmt;

use serde::Serialize;

use crate::VolumeId;

/// Why a block could not be turned into an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseFailure {
    /// The first line holds nothing usable as a headword.
    NoHeadword,
    /// Something was found, but it is too long or has no letters.
    ImplausibleHeadword,
    /// A headword with neither a definition nor an alias target.
    EmptyDefinition,
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NoHeadword => "no headword",
            Self::ImplausibleHeadword => "implausible headword",
            Self::EmptyDefinition => "empty definition",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A page with no extractable text.
    SkippedPage {
        volume: VolumeId,
        page: usize,
        reason: String,
    },
    /// A hyphen join that had to reach across too many dropped lines.
    HyphenJoinAnomaly {
        volume: VolumeId,
        page: usize,
        text: String,
        gap: usize,
    },
    /// A whole page of lines without a single entry boundary.
    MissingBoundary {
        volume: VolumeId,
        page: usize,
        lines: usize,
    },
    /// A line that looked like both a headword and a continuation.
    AmbiguousBoundary {
        volume: VolumeId,
        page: usize,
        text: String,
        /// Whether the tie-break started a new block.
        split: bool,
    },
    UnparseableBlock {
        volume: VolumeId,
        page: usize,
        reason: ParseFailure,
        text: String,
    },
    /// An alias whose target is not a headword of either volume.
    UnresolvedAlias { headword: String, target: String },
    /// An alias chain that loops back on itself.
    AliasCycle {
        headword: String,
        chain: Vec<String>,
        resolved_to: String,
    },
}

impl Diagnostic {
    /// Stable snake_case tag, the same one used in the JSON export.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SkippedPage { .. } => "skipped_page",
            Self::HyphenJoinAnomaly { .. } => "hyphen_join_anomaly",
            Self::MissingBoundary { .. } => "missing_boundary",
            Self::AmbiguousBoundary { .. } => "ambiguous_boundary",
            Self::UnparseableBlock { .. } => "unparseable_block",
            Self::UnresolvedAlias { .. } => "unresolved_alias",
            Self::AliasCycle { .. } => "alias_cycle",
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SkippedPage {
                volume,
                page,
                reason,
            } => write!(f, "{} p.{}: page skipped ({})", volume, page, reason),
            Self::HyphenJoinAnomaly {
                volume,
                page,
                text,
                gap,
            } => write!(
                f,
                "{} p.{}: hyphen joined across {} dropped lines: {:?}",
                volume, page, gap, text
            ),
            Self::MissingBoundary {
                volume,
                page,
                lines,
            } => write!(
                f,
                "{} p.{}: no entry boundary in {} lines",
                volume, page, lines
            ),
            Self::AmbiguousBoundary {
                volume,
                page,
                text,
                split,
            } => write!(
                f,
                "{} p.{}: ambiguous boundary ({}): {:?}",
                volume,
                page,
                if *split { "split" } else { "continued" },
                text
            ),
            Self::UnparseableBlock {
                volume,
                page,
                reason,
                text,
            } => write!(f, "{} p.{}: unparseable ({}): {:?}", volume, page, reason, text),
            Self::UnresolvedAlias { headword, target } => {
                write!(f, "{} → {}: target not found", headword, target)
            }
            Self::AliasCycle {
                headword,
                chain,
                resolved_to,
            } => write!(
                f,
                "{}: alias cycle {} (resolved to {})",
                headword,
                chain.join(" → "),
                resolved_to
            ),
        }
    }
}

/// Counts per diagnostic kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiagnosticSummary {
    pub skipped_pages: usize,
    pub hyphen_anomalies: usize,
    pub missing_boundaries: usize,
    pub ambiguous_boundaries: usize,
    pub unparseable_entries: usize,
    pub unresolved_aliases: usize,
    pub alias_cycles: usize,
}

impl DiagnosticSummary {
    pub fn total(&self) -> usize {
        self.skipped_pages
            + self.hyphen_anomalies
            + self.missing_boundaries
            + self.ambiguous_boundaries
            + self.unparseable_entries
            + self.unresolved_aliases
            + self.alias_cycles
    }
}

impl fmt::Display for DiagnosticSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} skipped pages, {} unparseable entries, {} unresolved aliases, {} alias cycles",
            self.skipped_pages, self.unparseable_entries, self.unresolved_aliases, self.alias_cycles
        )
    }
}

/// Ordered list of the anomalies recorded during a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.items.iter()
    }

    /// Diagnostics of one kind, e.g. `"unresolved_alias"`.
    pub fn of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Diagnostic> {
        self.items.iter().filter(move |d| d.kind() == kind)
    }

    pub fn summary(&self) -> DiagnosticSummary {
        let mut s = DiagnosticSummary::default();
        for d in &self.items {
            match d {
                Diagnostic::SkippedPage { .. } => s.skipped_pages += 1,
                Diagnostic::HyphenJoinAnomaly { .. } => s.hyphen_anomalies += 1,
                Diagnostic::MissingBoundary { .. } => s.missing_boundaries += 1,
                Diagnostic::AmbiguousBoundary { .. } => s.ambiguous_boundaries += 1,
                Diagnostic::UnparseableBlock { .. } => s.unparseable_entries += 1,
                Diagnostic::UnresolvedAlias { .. } => s.unresolved_aliases += 1,
                Diagnostic::AliasCycle { .. } => s.alias_cycles += 1,
            }
        }
        s
    }
}

impl Extend<Diagnostic> for Diagnostics {
    fn extend<I: IntoIterator<Item = Diagnostic>>(&mut self, iter: I) {
        self.items.extend(iter);
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
