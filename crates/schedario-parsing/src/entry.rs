//! Entry parser: one raw block → one [`Entry`], a section letter, or a
//! reason the block could not be read.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use schedario_core::markup::{runs_from, runs_text, runs_to_html, tidy_runs};
use schedario_core::{Entry, ParseFailure, RawEntryBlock, TextRun};
use unicode_normalization::UnicodeNormalization;

use crate::config::ParsingConfig;
use crate::qualifier::QualifierTable;
use crate::segment::is_section_letter;

/// "see" markers: `v. pomodoro`, `vedi pomodoro`.
pub(crate) static DEFAULT_ALIAS_MARKERS: Lazy<Vec<String>> =
    Lazy::new(|| vec!["v.".to_string(), "vedi".to_string()]);

/// Alternate spellings on one headword line: `sciù-sciù / sciusciù`.
pub(crate) static DEFAULT_VARIANT_SEPARATORS: Lazy<Vec<String>> =
    Lazy::new(|| vec!["/".to_string(), " o ".to_string()]);

static LEADING_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*[■●◆♦•*]\s*").unwrap());

const SUPERSCRIPT_DIGITS: &str = "⁰¹²³⁴⁵⁶⁷⁸⁹";

/// Canonical form of a headword or alias target.
///
/// NFC, lowercase, single spaces, no typesetting markers, no trailing
/// `: = , ; .` and no homograph number (`pane²` → `pane`).
pub fn normalize_headword(raw: &str) -> String {
    let composed: String = raw.nfc().collect::<String>().to_lowercase();
    let collapsed = composed.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_start_matches(|c: char| {
            matches!(c, '■' | '●' | '◆' | '♦' | '•' | '*') || c.is_whitespace()
        })
        .trim_end_matches(|c: char| {
            matches!(c, ':' | '=' | ',' | ';' | '.')
                || c.is_whitespace()
                || c.is_ascii_digit()
                || SUPERSCRIPT_DIGITS.contains(c)
        })
        .to_string()
}

/// Result of parsing one block.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedBlock {
    Entry(Entry),
    /// The big letter opening an alphabet section.
    SectionLetter(char),
    Unparseable(ParseFailure),
}

/// Strip `marker` from the start of `text`, case-insensitively. A marker
/// ending in a letter must end on a word boundary.
fn strip_marker<'a>(text: &'a str, marker: &str) -> Option<&'a str> {
    let prefix = text.get(..marker.len())?;
    if prefix.to_lowercase() != marker.to_lowercase() {
        return None;
    }
    let rest = &text[marker.len()..];
    let needs_boundary = marker.chars().last().is_some_and(char::is_alphanumeric);
    if needs_boundary && rest.chars().next().is_some_and(char::is_alphanumeric) {
        return None;
    }
    Some(rest)
}

fn is_capitalized_line(text: &str) -> bool {
    let mut letters = text.chars().filter(|c| c.is_alphabetic()).peekable();
    letters.peek().is_some() && letters.all(char::is_uppercase)
}

fn has_letter(text: &str) -> bool {
    text.chars().any(char::is_alphabetic)
}

/// What follows an alias marker.
struct AliasTarget {
    target: String,
    /// Nothing but punctuation after the target.
    pure: bool,
}

/// Turns raw entry blocks into entries.
#[derive(Debug, Clone)]
pub struct EntryParser {
    alias_markers: Vec<String>,
    variant_separators: Vec<String>,
    max_words: usize,
    max_chars: usize,
    qualifiers: QualifierTable,
}

impl Default for EntryParser {
    fn default() -> Self {
        Self::from_config(&ParsingConfig::default())
    }
}

impl EntryParser {
    pub fn from_config(config: &ParsingConfig) -> Self {
        Self {
            alias_markers: config.alias_markers.resolve(&DEFAULT_ALIAS_MARKERS),
            variant_separators: config
                .variant_separators
                .resolve(&DEFAULT_VARIANT_SEPARATORS),
            max_words: config.max_headword_words,
            max_chars: config.max_headword_chars,
            qualifiers: config.qualifiers.clone(),
        }
    }

    pub fn parse(&self, block: &RawEntryBlock) -> ParsedBlock {
        let first = block.first_line();
        let marker_len = LEADING_MARKER.find(&first.text).map_or(0, |m| m.end());
        let text = &first.text[marker_len..];

        if is_section_letter(text) {
            if let Some(letter) = text.trim().chars().next() {
                return ParsedBlock::SectionLetter(letter);
            }
        }

        let Some((head_end, rest_start)) = self.split_headword(text, first.emphasized) else {
            return ParsedBlock::Unparseable(ParseFailure::NoHeadword);
        };
        let (headword, variants) = match self.headword_forms(&text[..head_end]) {
            Ok(forms) => forms,
            Err(failure) => return ParsedBlock::Unparseable(failure),
        };

        let styled = block.lines.iter().any(|l| l.is_styled());
        let mut runs = runs_from(&first.text_runs(), marker_len + rest_start);
        for line in block.body_lines() {
            runs.push(TextRun::plain(" "));
            runs.extend(line.text_runs().iter().cloned());
        }
        let runs = tidy_runs(runs);
        let body = runs_text(&runs);

        let alias = self.alias_target(&body);
        let mut entry = match alias {
            Some(AliasTarget { target, pure: true }) => {
                Entry::alias(block.volume, headword, target)
            }
            other => {
                if body.is_empty() {
                    return ParsedBlock::Unparseable(ParseFailure::EmptyDefinition);
                }
                let mut entry = Entry::definition(block.volume, headword, body);
                if styled {
                    entry.html = Some(runs_to_html(&runs));
                }
                match other {
                    // "v. mare, e anche fiume": a definition that points elsewhere.
                    Some(AliasTarget { target, .. }) => {
                        entry.cross_references.insert(target);
                    }
                    None => {
                        let qualifier = if styled {
                            self.qualifiers.parse_styled(&runs, &entry.headword)
                        } else {
                            self.qualifiers.parse(&entry.definition, &entry.headword)
                        };
                        if let Some(q) = qualifier {
                            entry.qualifier = q.expansion;
                            entry.derived_from = q.derived_from;
                        }
                    }
                }
                entry
            }
        };
        entry.variant_headwords = variants;
        ParsedBlock::Entry(entry)
    }

    /// Split the first line into headword and the rest of the line, as the
    /// end of the headword and the start of the rest.
    ///
    /// `word: def`, `word= def`, `word v. target.`, `word, v. target.`; a
    /// line with none of these is a headword only when it is set in bold or
    /// in capitals.
    fn split_headword(&self, text: &str, emphasized: bool) -> Option<(usize, usize)> {
        if let Some(idx) = text.find([':', '=']) {
            return Some((idx, idx + 1));
        }

        let starts = text
            .char_indices()
            .zip(text.chars().skip(1))
            .filter(|((_, c), _)| c.is_whitespace())
            .map(|((i, c), _)| i + c.len_utf8());
        for start in starts {
            let candidate = &text[start..];
            if self
                .alias_markers
                .iter()
                .any(|m| strip_marker(candidate, m).is_some())
            {
                let head = text[..start].trim_end().trim_end_matches(',');
                if !head.trim().is_empty() {
                    return Some((head.len(), start));
                }
            }
        }

        if emphasized || is_capitalized_line(text) {
            return Some((text.len(), text.len()));
        }
        None
    }

    fn plausible(&self, form: &str) -> bool {
        has_letter(form)
            && form.split_whitespace().count() <= self.max_words
            && form.chars().count() <= self.max_chars
    }

    /// Primary headword and variant spellings.
    fn headword_forms(&self, head: &str) -> Result<(String, BTreeSet<String>), ParseFailure> {
        let normalized = normalize_headword(head);
        if normalized.is_empty() {
            return Err(ParseFailure::NoHeadword);
        }

        let mut forms = vec![normalized];
        for sep in &self.variant_separators {
            forms = forms
                .iter()
                .flat_map(|f| f.split(sep.as_str()))
                .map(normalize_headword)
                .filter(|f| !f.is_empty())
                .collect();
        }
        if forms.is_empty() || !forms.iter().all(|f| self.plausible(f)) {
            return Err(ParseFailure::ImplausibleHeadword);
        }

        let primary = forms.remove(0);
        let variants = forms.into_iter().filter(|f| *f != primary).collect();
        Ok((primary, variants))
    }

    fn alias_target(&self, body: &str) -> Option<AliasTarget> {
        for marker in &self.alias_markers {
            let Some(rest) = strip_marker(body, marker) else {
                continue;
            };
            let rest = rest.trim();
            let cut = rest
                .find([',', ';'])
                .or_else(|| rest.find(". "))
                .unwrap_or(rest.len());
            let target = normalize_headword(&rest[..cut]);
            if !self.plausible(&target) {
                continue;
            }
            return Some(AliasTarget {
                target,
                pure: !has_letter(&rest[cut..]),
            });
        }
        None
    }
}

/// Parse a block with the built-in rules.
pub fn parse_block(block: &RawEntryBlock) -> ParsedBlock {
    static DEFAULT: Lazy<EntryParser> = Lazy::new(EntryParser::default);
    DEFAULT.parse(block)
}
