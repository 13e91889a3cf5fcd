use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod config_file;
pub mod diagnostics;
pub mod markup;

pub use diagnostics::{Diagnostic, DiagnosticSummary, Diagnostics, ParseFailure};
pub use markup::TextRun;

/// Identifies one of the source volumes (1-based, as numbered in print).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VolumeId(pub u8);

impl fmt::Display for VolumeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vol. {}", self.0)
    }
}

/// A run of text in one style, placed somewhere on a printed page.
///
/// Positions are fractions of the page size (0.0–1.0): `x` is the left edge
/// and `y` the baseline, both measured from the top-left corner. Fragments
/// sharing a baseline within one column form a single line. Sources that
/// cannot report layout leave them `None`, in which case every fragment
/// starts a new line and fragments are read in the order supplied.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PageFragment {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f32>,
    /// Set in bold (headwords are).
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub bold: bool,
    /// Set in italics (grammatical qualifiers are).
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub italic: bool,
}

impl PageFragment {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn at(text: impl Into<String>, x: f32, y: f32) -> Self {
        Self {
            text: text.into(),
            x: Some(x),
            y: Some(y),
            ..Default::default()
        }
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }
}

/// The extracted text of one page of one volume.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPage {
    pub volume: VolumeId,
    /// 1-based page number within the source document.
    pub number: usize,
    pub fragments: Vec<PageFragment>,
}

impl RawPage {
    /// A page whose text came without any layout information.
    pub fn from_text(volume: VolumeId, number: usize, text: impl Into<String>) -> Self {
        Self {
            volume,
            number,
            fragments: vec![PageFragment::plain(text)],
        }
    }

    pub fn is_blank(&self) -> bool {
        self.fragments.iter().all(|f| f.text.trim().is_empty())
    }
}

/// Where two hyphen-broken fragments were glued back together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HyphenJoin {
    /// Byte offset in the joined line where the continuation starts.
    pub offset: usize,
    /// Page the continuation fragment came from.
    pub continuation_page: usize,
    /// Lines dropped (furniture, blanks) between the two fragments.
    pub gap: usize,
}

/// One logical line of dictionary text after clean-up.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedLine {
    pub volume: VolumeId,
    /// Page the line starts on.
    pub page: usize,
    pub text: String,
    /// Styled runs whose joined text is `text`; empty for unstyled lines.
    pub runs: Vec<TextRun>,
    /// The line opens with a bold run in the source.
    pub emphasized: bool,
    /// Offset of the line start from the left edge of its column, as a
    /// fraction of the page width. `None` when the layout says nothing.
    pub indent: Option<f32>,
    pub joins: Vec<HyphenJoin>,
}

impl NormalizedLine {
    pub fn new(volume: VolumeId, page: usize, text: impl Into<String>) -> Self {
        Self {
            volume,
            page,
            text: text.into(),
            runs: Vec::new(),
            emphasized: false,
            indent: None,
            joins: Vec::new(),
        }
    }

    /// A line built from styled runs; it is emphasized when its first
    /// visible run is bold.
    pub fn from_runs(volume: VolumeId, page: usize, runs: Vec<TextRun>) -> Self {
        let emphasized = runs.iter().find(|r| !r.is_blank()).is_some_and(|r| r.bold);
        let text = markup::runs_text(&runs);
        let runs = if runs.iter().any(TextRun::is_styled) {
            runs
        } else {
            Vec::new()
        };
        Self {
            text,
            runs,
            emphasized,
            ..Self::new(volume, page, "")
        }
    }

    pub fn emphasized(mut self) -> Self {
        self.emphasized = true;
        self
    }

    pub fn with_indent(mut self, indent: f32) -> Self {
        self.indent = Some(indent);
        self
    }

    /// The line as runs, a single plain run when it carries no styling.
    pub fn text_runs(&self) -> Cow<'_, [TextRun]> {
        if self.runs.is_empty() {
            Cow::Owned(vec![TextRun::plain(self.text.as_str())])
        } else {
            Cow::Borrowed(&self.runs)
        }
    }

    pub fn is_styled(&self) -> bool {
        self.runs.iter().any(TextRun::is_styled)
    }
}

/// A contiguous run of lines believed to form one dictionary entry.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEntryBlock {
    pub volume: VolumeId,
    pub start_page: usize,
    pub lines: Vec<NormalizedLine>,
}

impl RawEntryBlock {
    pub fn new(first: NormalizedLine) -> Self {
        Self {
            volume: first.volume,
            start_page: first.page,
            lines: vec![first],
        }
    }

    pub fn first_line(&self) -> &NormalizedLine {
        &self.lines[0]
    }

    pub fn body_lines(&self) -> &[NormalizedLine] {
        &self.lines[1..]
    }

    /// All lines joined with single spaces, for display.
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A parsed dictionary entry: the unit of the final mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub headword: String,
    /// Empty only for alias entries.
    pub definition: String,
    pub is_alias: bool,
    /// Present iff `is_alias`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias_target: Option<String>,
    pub source_volumes: BTreeSet<VolumeId>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub variant_headwords: BTreeSet<String>,
    /// Expanded grammatical qualifier (e.g. "sostantivo maschile").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualifier: Option<String>,
    /// Base word for derivative forms ("dim. di casa").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derived_from: Option<String>,
    /// Alias targets folded into this entry during merging.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub cross_references: BTreeSet<String>,
    /// The definition with its bold and italic runs as HTML, when the
    /// source carried any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
}

impl Entry {
    pub fn definition(
        volume: VolumeId,
        headword: impl Into<String>,
        definition: impl Into<String>,
    ) -> Self {
        Self {
            headword: headword.into(),
            definition: definition.into(),
            is_alias: false,
            alias_target: None,
            source_volumes: BTreeSet::from([volume]),
            variant_headwords: BTreeSet::new(),
            qualifier: None,
            derived_from: None,
            cross_references: BTreeSet::new(),
            html: None,
        }
    }

    pub fn alias(volume: VolumeId, headword: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            headword: headword.into(),
            definition: String::new(),
            is_alias: true,
            alias_target: Some(target.into()),
            source_volumes: BTreeSet::from([volume]),
            variant_headwords: BTreeSet::new(),
            qualifier: None,
            derived_from: None,
            cross_references: BTreeSet::new(),
            html: None,
        }
    }

    /// The persisted form: the definition, or `v. <target>` for aliases.
    pub fn rendered(&self) -> String {
        match (&self.alias_target, self.is_alias) {
            (Some(target), true) => format!("v. {}", target),
            _ => self.definition.clone(),
        }
    }
}

/// The deduplicated, alias-resolved headword → entry mapping.
///
/// Built once by the merger and never mutated afterwards. Iteration is in
/// lexicographic headword order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CanonicalMapping {
    entries: BTreeMap<String, Entry>,
}

impl CanonicalMapping {
    pub fn new(entries: BTreeMap<String, Entry>) -> Self {
        Self { entries }
    }

    pub fn get(&self, headword: &str) -> Option<&Entry> {
        self.entries.get(headword)
    }

    pub fn contains(&self, headword: &str) -> bool {
        self.entries.contains_key(headword)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Entry)> {
        self.entries.iter()
    }

    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    /// Headword → rendered definition, the shape written to disk.
    pub fn to_flat(&self) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .map(|(k, e)| (k.clone(), e.rendered()))
            .collect()
    }

    pub fn into_inner(self) -> BTreeMap<String, Entry> {
        self.entries
    }
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("failed to open source document: {0}")]
    OpenError(String),
    #[error("failed to extract page text: {0}")]
    ExtractionError(String),
    #[error("malformed source at line {line}: {message}")]
    Format { line: usize, message: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Supplies the ordered per-page text of one volume.
///
/// Implementors only do the low-level text extraction; everything from
/// furniture stripping onward lives in the parsing crate.
pub trait PageSource: Send + Sync {
    fn pages(&self, path: &Path, volume: VolumeId) -> Result<Vec<RawPage>, SourceError>;
}
