use regex::Regex;
use schedario_core::config_file::ParsingSection;

use crate::classify::{CueStrength, LineRule};
use crate::qualifier::QualifierTable;

/// Controls how a list of patterns/values is overridden from its defaults.
#[derive(Debug, Clone, Default)]
pub enum ListOverride<T> {
    /// Use the built-in defaults.
    #[default]
    Default,
    /// Completely replace the defaults with these values.
    Replace(Vec<T>),
    /// Append these values to the defaults.
    Extend(Vec<T>),
}

impl<T: Clone> ListOverride<T> {
    /// Resolve this override against the given defaults.
    pub fn resolve(&self, defaults: &[T]) -> Vec<T> {
        match self {
            ListOverride::Default => defaults.to_vec(),
            ListOverride::Replace(v) => v.clone(),
            ListOverride::Extend(v) => {
                let mut result = defaults.to_vec();
                result.extend(v.iter().cloned());
                result
            }
        }
    }
}

impl<T> ListOverride<T> {
    fn push(&mut self, value: T) {
        match self {
            ListOverride::Default => *self = ListOverride::Extend(vec![value]),
            ListOverride::Replace(v) | ListOverride::Extend(v) => v.push(value),
        }
    }

    fn try_map<U, E>(self, f: impl Fn(T) -> Result<U, E>) -> Result<ListOverride<U>, E> {
        let convert = |v: Vec<T>| v.into_iter().map(&f).collect::<Result<Vec<_>, _>>();
        Ok(match self {
            ListOverride::Default => ListOverride::Default,
            ListOverride::Replace(v) => ListOverride::Replace(convert(v)?),
            ListOverride::Extend(v) => ListOverride::Extend(convert(v)?),
        })
    }
}

/// A headword rule before it is compiled.
#[derive(Debug, Clone)]
pub enum RuleSpec {
    /// The line opens with a bold run.
    Emphasis(CueStrength),
    /// The line starts at the left edge of its column.
    FlushLeft(CueStrength),
    /// The line text matches `pattern`.
    Pattern {
        name: String,
        pattern: String,
        strength: CueStrength,
    },
}

impl RuleSpec {
    fn compile(self, indent_tolerance: f32) -> Result<LineRule, regex::Error> {
        Ok(match self {
            RuleSpec::Emphasis(strength) => LineRule::emphasis(strength),
            RuleSpec::FlushLeft(strength) => LineRule::flush_left(indent_tolerance, strength),
            RuleSpec::Pattern {
                name,
                pattern,
                strength,
            } => LineRule::pattern(&name, Regex::new(&pattern)?, strength),
        })
    }
}

/// Configuration for the dictionary extraction pipeline.
///
/// Every heuristic that decides what is furniture, where an entry starts and
/// what counts as a cross-reference is tunable here, so the rules can follow
/// the quirks of a particular scan without touching the pipeline itself.
/// Use [`ParsingConfigBuilder`] to construct with string patterns.
#[derive(Debug, Clone)]
pub struct ParsingConfig {
    // ── normalize.rs ──
    /// Lines matching any of these are dropped wherever they appear.
    pub(crate) boilerplate_patterns: ListOverride<Regex>,
    /// Column split points as fractions of the page width, ascending.
    pub(crate) column_bounds: Vec<f32>,
    /// Baselines closer than this (fraction of page height) share a line.
    pub(crate) line_tolerance: f32,
    /// Lines starting within this distance (fraction of page width) of the
    /// column's left edge are flush left.
    pub(crate) indent_tolerance: f32,
    /// How many lines at the top and bottom of a page are furniture candidates.
    pub(crate) edge_depth: usize,
    /// Pages an edge line must repeat on before it is treated as furniture.
    pub(crate) min_repeat_pages: usize,
    /// Dropped lines a hyphen join may span before it is flagged.
    pub(crate) max_hyphen_gap: usize,

    // ── classify.rs / segment.rs ──
    /// Rules that mark a line as the start of a new entry.
    pub(crate) headword_rules: ListOverride<LineRule>,
    /// Lines on one page without a boundary before a warning is raised.
    pub(crate) missing_boundary_lines: usize,

    // ── entry.rs ──
    /// Cross-reference markers meaning "see" (matched case-insensitively).
    pub(crate) alias_markers: ListOverride<String>,
    /// Separators between alternate spellings on a headword line.
    pub(crate) variant_separators: ListOverride<String>,
    pub(crate) max_headword_words: usize,
    pub(crate) max_headword_chars: usize,
    /// Abbreviation → qualifier expansions, built-in plus any added.
    pub(crate) qualifiers: QualifierTable,

    // ── merge.rs ──
    /// Placed between definitions of the same headword from different sources.
    pub(crate) definition_separator: String,
}

impl Default for ParsingConfig {
    fn default() -> Self {
        Self {
            boilerplate_patterns: ListOverride::Default,
            column_bounds: vec![0.365, 0.645],
            line_tolerance: 0.004,
            indent_tolerance: 0.002,
            edge_depth: 2,
            min_repeat_pages: 3,
            max_hyphen_gap: 3,
            headword_rules: ListOverride::Default,
            missing_boundary_lines: 12,
            alias_markers: ListOverride::Default,
            variant_separators: ListOverride::Default,
            max_headword_words: 5,
            max_headword_chars: 48,
            qualifiers: QualifierTable::default(),
            definition_separator: " | ".to_string(),
        }
    }
}

impl ParsingConfig {
    pub fn max_headword_words(&self) -> usize {
        self.max_headword_words
    }

    pub fn definition_separator(&self) -> &str {
        &self.definition_separator
    }

    pub fn indent_tolerance(&self) -> f32 {
        self.indent_tolerance
    }

    /// Whether `indent` puts a line at its column's left edge.
    pub(crate) fn is_flush(&self, indent: Option<f32>) -> bool {
        indent.is_some_and(|i| i <= self.indent_tolerance)
    }
}

/// Builder for [`ParsingConfig`].
///
/// Accepts string patterns that are compiled to `Regex` in [`build()`](Self::build).
/// Fails fast with `regex::Error` if any pattern is invalid.
#[derive(Debug, Clone, Default)]
pub struct ParsingConfigBuilder {
    boilerplate_patterns: ListOverride<String>,
    column_bounds: Option<Vec<f32>>,
    line_tolerance: Option<f32>,
    indent_tolerance: Option<f32>,
    edge_depth: Option<usize>,
    min_repeat_pages: Option<usize>,
    max_hyphen_gap: Option<usize>,
    headword_rules: ListOverride<RuleSpec>,
    missing_boundary_lines: Option<usize>,
    alias_markers: ListOverride<String>,
    variant_separators: ListOverride<String>,
    max_headword_words: Option<usize>,
    max_headword_chars: Option<usize>,
    extra_abbreviations: Vec<(String, String)>,
    definition_separator: Option<String>,
}

impl ParsingConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Page furniture ──

    pub fn add_boilerplate_pattern(mut self, pattern: &str) -> Self {
        self.boilerplate_patterns.push(pattern.to_string());
        self
    }

    pub fn set_boilerplate_patterns(mut self, patterns: Vec<String>) -> Self {
        self.boilerplate_patterns = ListOverride::Replace(patterns);
        self
    }

    pub fn column_bounds(mut self, bounds: Vec<f32>) -> Self {
        self.column_bounds = Some(bounds);
        self
    }

    pub fn line_tolerance(mut self, tolerance: f32) -> Self {
        self.line_tolerance = Some(tolerance);
        self
    }

    pub fn indent_tolerance(mut self, tolerance: f32) -> Self {
        self.indent_tolerance = Some(tolerance);
        self
    }

    pub fn edge_depth(mut self, n: usize) -> Self {
        self.edge_depth = Some(n);
        self
    }

    pub fn min_repeat_pages(mut self, n: usize) -> Self {
        self.min_repeat_pages = Some(n);
        self
    }

    pub fn max_hyphen_gap(mut self, n: usize) -> Self {
        self.max_hyphen_gap = Some(n);
        self
    }

    // ── Headword rules ──

    /// Append a pattern rule; a line whose text matches starts a new entry
    /// (`Strong`) or is a candidate resolved by the tie-break (`Weak`).
    pub fn add_headword_pattern(
        mut self,
        name: &str,
        pattern: &str,
        strength: CueStrength,
    ) -> Self {
        self.headword_rules.push(RuleSpec::Pattern {
            name: name.to_string(),
            pattern: pattern.to_string(),
            strength,
        });
        self
    }

    /// Replace the built-in rules.
    pub fn set_headword_rules(mut self, rules: Vec<RuleSpec>) -> Self {
        self.headword_rules = ListOverride::Replace(rules);
        self
    }

    pub fn missing_boundary_lines(mut self, n: usize) -> Self {
        self.missing_boundary_lines = Some(n);
        self
    }

    // ── Entry parsing ──

    pub fn set_alias_markers(mut self, markers: Vec<String>) -> Self {
        self.alias_markers = ListOverride::Replace(markers);
        self
    }

    pub fn add_alias_marker(mut self, marker: &str) -> Self {
        self.alias_markers.push(marker.to_string());
        self
    }

    pub fn set_variant_separators(mut self, separators: Vec<String>) -> Self {
        self.variant_separators = ListOverride::Replace(separators);
        self
    }

    pub fn add_variant_separator(mut self, separator: &str) -> Self {
        self.variant_separators.push(separator.to_string());
        self
    }

    pub fn max_headword_words(mut self, n: usize) -> Self {
        self.max_headword_words = Some(n);
        self
    }

    pub fn max_headword_chars(mut self, n: usize) -> Self {
        self.max_headword_chars = Some(n);
        self
    }

    pub fn add_abbreviation(mut self, abbreviation: &str, expansion: &str) -> Self {
        self.extra_abbreviations
            .push((abbreviation.to_string(), expansion.to_string()));
        self
    }

    // ── Merging ──

    pub fn definition_separator(mut self, separator: &str) -> Self {
        self.definition_separator = Some(separator.to_string());
        self
    }

    /// Compile all string patterns into regexes and produce a [`ParsingConfig`].
    pub fn build(self) -> Result<ParsingConfig, regex::Error> {
        let defaults = ParsingConfig::default();

        let indent_tolerance = self.indent_tolerance.unwrap_or(defaults.indent_tolerance);
        let boilerplate_patterns = self.boilerplate_patterns.try_map(|p| Regex::new(&p))?;
        let headword_rules = self
            .headword_rules
            .try_map(|rule| rule.compile(indent_tolerance))?;

        let mut column_bounds = self.column_bounds.unwrap_or(defaults.column_bounds);
        column_bounds.sort_by(f32::total_cmp);

        Ok(ParsingConfig {
            boilerplate_patterns,
            column_bounds,
            line_tolerance: self.line_tolerance.unwrap_or(defaults.line_tolerance),
            indent_tolerance,
            edge_depth: self.edge_depth.unwrap_or(defaults.edge_depth),
            min_repeat_pages: self.min_repeat_pages.unwrap_or(defaults.min_repeat_pages),
            max_hyphen_gap: self.max_hyphen_gap.unwrap_or(defaults.max_hyphen_gap),
            headword_rules,
            missing_boundary_lines: self
                .missing_boundary_lines
                .unwrap_or(defaults.missing_boundary_lines),
            alias_markers: self.alias_markers,
            variant_separators: self.variant_separators,
            max_headword_words: self.max_headword_words.unwrap_or(defaults.max_headword_words),
            max_headword_chars: self.max_headword_chars.unwrap_or(defaults.max_headword_chars),
            qualifiers: QualifierTable::with_extra(&self.extra_abbreviations)?,
            definition_separator: self
                .definition_separator
                .unwrap_or(defaults.definition_separator),
        })
    }
}

impl ParsingConfigBuilder {
    /// Apply the `[parsing]` table of a config file on top of this builder.
    pub fn with_config_file(mut self, section: &ParsingSection) -> Self {
        for pattern in section.boilerplate_patterns.iter().flatten() {
            self = self.add_boilerplate_pattern(pattern);
        }
        for (i, pattern) in section.headword_patterns.iter().flatten().enumerate() {
            let name = format!("config-{}", i + 1);
            self = self.add_headword_pattern(&name, pattern, CueStrength::Strong);
        }
        if let Some(markers) = &section.alias_markers {
            self = self.set_alias_markers(markers.clone());
        }
        if let Some(separators) = &section.variant_separators {
            self = self.set_variant_separators(separators.clone());
        }
        if let Some(bounds) = &section.column_bounds {
            self = self.column_bounds(bounds.clone());
        }
        if let Some(t) = section.line_tolerance {
            self = self.line_tolerance(t);
        }
        if let Some(t) = section.indent_tolerance {
            self = self.indent_tolerance(t);
        }
        if let Some(n) = section.edge_depth {
            self = self.edge_depth(n);
        }
        if let Some(n) = section.min_repeat_pages {
            self = self.min_repeat_pages(n);
        }
        if let Some(n) = section.max_hyphen_gap {
            self = self.max_hyphen_gap(n);
        }
        if let Some(n) = section.max_headword_words {
            self = self.max_headword_words(n);
        }
        if let Some(n) = section.missing_boundary_lines {
            self = self.missing_boundary_lines(n);
        }
        if let Some(sep) = &section.definition_separator {
            self = self.definition_separator(sep);
        }
        for (abbreviation, expansion) in section.abbreviations.iter().flatten() {
            self = self.add_abbreviation(abbreviation, expansion);
        }
        self
    }
}
