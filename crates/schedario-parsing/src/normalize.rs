//! Stream normalizer: raw pages of one volume → a clean line stream.
//!
//! Order of operations per volume:
//! 1. Pages with no text are skipped (diagnostic).
//! 2. Fragments are grouped into lines (same column, same baseline) and put
//!    into reading order: column, then top to bottom. Ligatures are expanded
//!    and spacing is compressed without losing the bold/italic runs.
//! 3. Boilerplate lines (page numbers, the spaced running title) are dropped.
//! 4. Lines repeating at the same edge position on enough pages are dropped.
//! 5. Each remaining line gets its indent from the left edge of its column.
//! 6. Hyphen-broken words are rejoined across line and page breaks, unless
//!    the continuation carries a headword cue.

use std::collections::{BTreeMap, HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;
use schedario_core::markup::{push_space, push_styled, runs_text, truncate_runs};
use schedario_core::{
    Diagnostic, Diagnostics, HyphenJoin, NormalizedLine, PageFragment, RawPage, TextRun,
};
use tracing::{debug, info, warn};
use unicode_normalization::UnicodeNormalization;

use crate::config::ParsingConfig;

pub(crate) static DEFAULT_BOILERPLATE: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        // Bare page number
        Regex::new(r"^\d{1,4}$").unwrap(),
        // "- 12 -", "— 12 —"
        Regex::new(r"^[-–—]\s*\d{1,4}\s*[-–—]$").unwrap(),
        // Letter-spaced running title
        Regex::new(r"(?i)^S\s+C\s+H\s+E\s+D\s+A\s+R\s+I\s+O$").unwrap(),
    ]
});

/// Expand common typographic ligatures found in PDFs.
pub fn expand_ligatures(text: &str) -> String {
    text.replace('\u{FB00}', "ff")
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace('\u{FB03}', "ffi")
        .replace('\u{FB04}', "ffl")
        .replace(['\u{FB05}', '\u{FB06}'], "st")
}

/// Collapse whitespace and fix the spacing around punctuation across styled
/// runs: no space before `.` or `:`, one space after `,` or `;`.
pub fn compress_runs(runs: &[TextRun]) -> Vec<TextRun> {
    let mut out: Vec<TextRun> = Vec::new();
    let mut pending_space = false;
    for run in runs {
        for c in run.text.chars() {
            if c.is_whitespace() {
                pending_space = !out.is_empty();
                continue;
            }
            let after_separator = out
                .last()
                .and_then(|r| r.text.chars().last())
                .is_some_and(|p| matches!(p, ',' | ';'));
            if pending_space {
                if !matches!(c, '.' | ':') {
                    push_space(&mut out, run);
                }
            } else if after_separator && (c.is_alphanumeric() || c == '_') {
                push_space(&mut out, run);
            }
            pending_space = false;
            push_styled(&mut out, c, run);
        }
    }
    out
}

/// [`compress_runs`] on unstyled text.
///
/// - `"acqua  :  water ."` → `"acqua: water."`
/// - `"sale,pepe"` → `"sale, pepe"`
pub fn compress_spacing(text: &str) -> String {
    runs_text(&compress_runs(&[TextRun::plain(text)]))
}

/// Index of the column a horizontal position falls in.
fn column_of(x: f32, bounds: &[f32]) -> usize {
    bounds.iter().filter(|b| x >= **b).count()
}

/// Fragments forming one printed line, with the line's column and left
/// edge when the page carries layout.
struct FragmentGroup {
    place: Option<(usize, f32)>,
    fragments: Vec<PageFragment>,
}

/// Group fragments into printed lines in reading order: left column fully
/// before the next one, top to bottom within each, left to right along a
/// baseline. Without a position on every fragment, each fragment is a line
/// of its own and the supplied order stands.
fn group_lines(
    fragments: Vec<PageFragment>,
    bounds: &[f32],
    tolerance: f32,
) -> Vec<FragmentGroup> {
    let positioned = fragments.iter().all(|f| f.x.is_some() && f.y.is_some());
    if !positioned {
        return fragments
            .into_iter()
            .map(|f| FragmentGroup {
                place: None,
                fragments: vec![f],
            })
            .collect();
    }

    let mut keyed: Vec<(usize, f32, f32, PageFragment)> = fragments
        .into_iter()
        .map(|f| {
            let x = f.x.unwrap_or_default();
            let y = f.y.unwrap_or_default();
            (column_of(x, bounds), y, x, f)
        })
        .collect();
    // Stable, so fragments on the same baseline keep their order.
    keyed.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)));

    // (column, baseline of the first member, members by x)
    let mut lines: Vec<(usize, f32, Vec<(f32, PageFragment)>)> = Vec::new();
    for (column, y, x, fragment) in keyed {
        match lines.last_mut() {
            Some((c, top, members)) if *c == column && y - *top <= tolerance => {
                members.push((x, fragment));
            }
            _ => lines.push((column, y, vec![(x, fragment)])),
        }
    }

    lines
        .into_iter()
        .map(|(column, _, mut members)| {
            members.sort_by(|a, b| a.0.total_cmp(&b.0));
            let left = members.first().map(|(x, _)| *x).unwrap_or_default();
            FragmentGroup {
                place: Some((column, left)),
                fragments: members.into_iter().map(|(_, f)| f).collect(),
            }
        })
        .collect()
}

#[derive(Debug, Clone)]
struct PageLine {
    runs: Vec<TextRun>,
    text: String,
    column: usize,
    /// Left edge as a fraction of the page width.
    x: Option<f32>,
}

fn clean_text(raw: &str) -> String {
    let composed: String = raw.nfc().collect();
    expand_ligatures(&composed)
}

fn page_lines(page: RawPage, config: &ParsingConfig) -> Vec<PageLine> {
    let mut lines = Vec::new();
    for group in group_lines(page.fragments, &config.column_bounds, config.line_tolerance) {
        // A fragment holding line breaks spans several lines; only the first
        // of them starts at the group's left edge.
        let mut pieces: Vec<Vec<TextRun>> = vec![Vec::new()];
        for fragment in &group.fragments {
            for (i, piece) in fragment.text.split('\n').enumerate() {
                if i > 0 {
                    pieces.push(Vec::new());
                }
                if let Some(current) = pieces.last_mut() {
                    current.push(TextRun {
                        text: clean_text(piece),
                        bold: fragment.bold,
                        italic: fragment.italic,
                    });
                }
            }
        }
        for (i, raw) in pieces.into_iter().enumerate() {
            let runs = compress_runs(&raw);
            if runs.is_empty() {
                continue;
            }
            let (column, x) = match group.place {
                Some((column, x)) if i == 0 => (column, Some(x)),
                Some((column, _)) => (column, None),
                None => (0, None),
            };
            lines.push(PageLine {
                text: runs_text(&runs),
                runs,
                column,
                x,
            });
        }
    }
    lines
}

/// Offset of each line from the left edge of its column.
///
/// A column whose lines all start at the same place shows no indentation,
/// so its lines get no indent at all rather than all counting as flush.
fn indents(lines: &[PageLine], tolerance: f32) -> Vec<Option<f32>> {
    let mut edges: BTreeMap<usize, (f32, f32)> = BTreeMap::new();
    for line in lines {
        if let Some(x) = line.x {
            let edge = edges.entry(line.column).or_insert((x, x));
            edge.0 = edge.0.min(x);
            edge.1 = edge.1.max(x);
        }
    }
    lines
        .iter()
        .map(|line| {
            let x = line.x?;
            let (left, right) = edges.get(&line.column)?;
            (right - left > tolerance).then_some(x - left)
        })
        .collect()
}

/// Comparison key for edge lines: case, spacing and digits (page numbers in
/// running heads) are ignored.
fn edge_key(text: &str) -> Option<String> {
    let key: String = text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_digit() { '#' } else { c })
        .collect();
    // Short keys ("m.", "f.") are as likely to be entry text as furniture.
    let letters = key.chars().filter(|c| c.is_alphabetic()).count();
    if letters < 3 || key.len() > 120 {
        return None;
    }
    Some(key)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Edge {
    Top(usize),
    Bottom(usize),
}

fn edge_positions(len: usize, depth: usize) -> impl Iterator<Item = (usize, Edge)> {
    let depth = depth.min(len);
    let top = (0..depth).map(|i| (i, Edge::Top(i)));
    let bottom = (0..depth).map(move |i| (len - 1 - i, Edge::Bottom(i)));
    top.chain(bottom)
}

/// Edge lines (by position and key) that repeat on at least `min_pages` pages.
fn repeated_edge_lines(
    pages: &[(usize, Vec<PageLine>)],
    depth: usize,
    min_pages: usize,
) -> HashSet<(Edge, String)> {
    let mut counts: HashMap<(Edge, String), usize> = HashMap::new();
    for (_, lines) in pages {
        for (idx, edge) in edge_positions(lines.len(), depth) {
            if let Some(key) = edge_key(&lines[idx].text) {
                *counts.entry((edge, key)).or_insert(0) += 1;
            }
        }
    }
    counts
        .into_iter()
        .filter(|(_, n)| *n >= min_pages)
        .map(|(k, _)| k)
        .collect()
}

/// `"pomo-"` → `Some("pomo")`. A hyphen after a digit or a space is kept.
fn broken_prefix(text: &str) -> Option<&str> {
    let prefix = text.trim_end().strip_suffix('-')?;
    prefix
        .chars()
        .last()
        .is_some_and(char::is_alphabetic)
        .then_some(prefix)
}

fn starts_lowercase(text: &str) -> bool {
    text.chars().next().is_some_and(char::is_lowercase)
}

/// Counters for one normalized volume.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeStats {
    pub pages: usize,
    pub skipped_pages: usize,
    pub boilerplate_lines: usize,
    pub furniture_lines: usize,
    pub hyphen_joins: usize,
    pub lines: usize,
}

/// Output of [`normalize_pages`].
#[derive(Debug, Clone, Default)]
pub struct NormalizedVolume {
    pub lines: Vec<NormalizedLine>,
    pub diagnostics: Diagnostics,
    pub stats: NormalizeStats,
}

/// Normalize the ordered pages of one volume into a single line stream.
///
/// Never fails: empty pages and suspicious joins become diagnostics.
pub fn normalize_pages(pages: Vec<RawPage>, config: &ParsingConfig) -> NormalizedVolume {
    let boilerplate = config.boilerplate_patterns.resolve(&DEFAULT_BOILERPLATE);
    let mut out = NormalizedVolume::default();
    let Some(volume) = pages.first().map(|p| p.volume) else {
        return out;
    };
    out.stats.pages = pages.len();

    let mut cleaned: Vec<(usize, Vec<PageLine>)> = Vec::with_capacity(pages.len());
    for page in pages {
        if page.is_blank() {
            warn!(%volume, page = page.number, "skipping page with no text");
            out.diagnostics.push(Diagnostic::SkippedPage {
                volume,
                page: page.number,
                reason: "no extractable text".to_string(),
            });
            out.stats.skipped_pages += 1;
            continue;
        }
        let number = page.number;
        let mut lines = page_lines(page, config);
        let before = lines.len();
        lines.retain(|l| !boilerplate.iter().any(|re| re.is_match(&l.text)));
        out.stats.boilerplate_lines += before - lines.len();
        cleaned.push((number, lines));
    }

    let furniture = repeated_edge_lines(&cleaned, config.edge_depth, config.min_repeat_pages);
    if !furniture.is_empty() {
        debug!(%volume, count = furniture.len(), "repeated edge lines detected");
    }

    // Lines dropped since the last emitted line; a hyphen join spanning more
    // than `max_hyphen_gap` of them is flagged.
    let mut gap = 0usize;
    for (number, lines) in cleaned {
        let mut dropped: HashSet<usize> = HashSet::new();
        for (idx, edge) in edge_positions(lines.len(), config.edge_depth) {
            if let Some(key) = edge_key(&lines[idx].text) {
                if furniture.contains(&(edge, key)) {
                    dropped.insert(idx);
                }
            }
        }
        out.stats.furniture_lines += dropped.len();
        gap += dropped.len();
        let kept: Vec<PageLine> = lines
            .into_iter()
            .enumerate()
            .filter(|(idx, _)| !dropped.contains(idx))
            .map(|(_, line)| line)
            .collect();
        let indents = indents(&kept, config.indent_tolerance);

        for (line, indent) in kept.into_iter().zip(indents) {
            let mut normalized = NormalizedLine::from_runs(volume, number, line.runs);
            normalized.indent = indent;
            let opens_entry = normalized.emphasized || config.is_flush(indent);

            let joined = out.lines.last_mut().and_then(|prev| {
                let offset = broken_prefix(&prev.text)?.len();
                if !starts_lowercase(&normalized.text) {
                    return None;
                }
                if opens_entry {
                    debug!(
                        %volume,
                        page = number,
                        text = %normalized.text,
                        "hyphen kept before a headword line"
                    );
                    return None;
                }
                Some((prev, offset))
            });
            match joined {
                Some((prev, offset)) => {
                    if prev.is_styled() || normalized.is_styled() {
                        let mut runs = prev.text_runs().into_owned();
                        truncate_runs(&mut runs, offset);
                        runs.extend(normalized.text_runs().iter().cloned());
                        prev.runs = runs;
                    }
                    prev.text.truncate(offset);
                    prev.text.push_str(&normalized.text);
                    prev.joins.push(HyphenJoin {
                        offset,
                        continuation_page: number,
                        gap,
                    });
                    out.stats.hyphen_joins += 1;
                    if gap > config.max_hyphen_gap {
                        warn!(%volume, page = number, gap, "hyphen join across large gap");
                        out.diagnostics.push(Diagnostic::HyphenJoinAnomaly {
                            volume,
                            page: number,
                            text: prev.text.clone(),
                            gap,
                        });
                    }
                }
                None => out.lines.push(normalized),
            }
            gap = 0;
        }
    }

    out.stats.lines = out.lines.len();
    info!(
        %volume,
        pages = out.stats.pages,
        skipped = out.stats.skipped_pages,
        lines = out.stats.lines,
        furniture = out.stats.furniture_lines + out.stats.boilerplate_lines,
        joins = out.stats.hyphen_joins,
        "normalized volume"
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ParsingConfigBuilder;
    use schedario_core::VolumeId;

    fn texts(volume: &NormalizedVolume) -> Vec<&str> {
        volume.lines.iter().map(|l| l.text.as_str()).collect()
    }

    #[test]
    fn test_expand_ligatures() {
        assert_eq!(expand_ligatures("ﬁnestra ﬂauto"), "finestra flauto");
        assert_eq!(expand_ligatures("nessuna legatura"), "nessuna legatura");
    }

    #[test]
    fn test_compress_spacing() {
        assert_eq!(compress_spacing("acqua  :  water ."), "acqua: water.");
        assert_eq!(compress_spacing("sale,pepe;olio"), "sale, pepe; olio");
        assert_eq!(compress_spacing("  \t "), "");
    }

    #[test]
    fn test_hyphen_rejoin() {
        let pages = vec![RawPage::from_text(VolumeId(1), 1, "pomo-\ndoro: tomato.")];
        let out = normalize_pages(pages, &ParsingConfig::default());
        assert_eq!(texts(&out), vec!["pomodoro: tomato."]);
        let join = &out.lines[0].joins[0];
        assert_eq!(join.offset, 4);
        assert_eq!(join.gap, 0);
        assert_eq!(out.stats.hyphen_joins, 1);
    }

    #[test]
    fn test_hyphen_kept_after_digit_or_before_capital() {
        let pages = vec![RawPage::from_text(
            VolumeId(1),
            1,
            "anno 19-\nesimo\nsciù-\nCiù: x.",
        )];
        let out = normalize_pages(pages, &ParsingConfig::default());
        assert_eq!(texts(&out), vec!["anno 19-", "esimo", "sciù-", "Ciù: x."]);
    }

    #[test]
    fn test_hyphen_rejoin_across_pages() {
        let pages = vec![
            RawPage::from_text(VolumeId(1), 1, "ACQUA: acqua sa-"),
            RawPage::from_text(VolumeId(1), 2, "lata."),
        ];
        let out = normalize_pages(pages, &ParsingConfig::default());
        assert_eq!(texts(&out), vec!["ACQUA: acqua salata."]);
        assert_eq!(out.lines[0].page, 1);
        assert_eq!(out.lines[0].joins[0].continuation_page, 2);
    }

    #[test]
    fn test_large_gap_join_is_flagged() {
        let config = ParsingConfigBuilder::new()
            .max_hyphen_gap(0)
            .build()
            .unwrap();
        // The repeated header between the two halves is furniture and counts
        // towards the gap.
        let header = "dizionario napoletano";
        let pages = vec![
            RawPage::from_text(VolumeId(1), 1, format!("{header}\nuno: a.\npomo-")),
            RawPage::from_text(VolumeId(1), 2, format!("{header}\ndoro: b.\nz: c.")),
            RawPage::from_text(VolumeId(1), 3, format!("{header}\ntre: d.\nq: e.")),
        ];
        let out = normalize_pages(pages, &config);
        assert!(texts(&out).contains(&"pomodoro: b."));
        assert_eq!(out.diagnostics.of_kind("hyphen_join_anomaly").count(), 1);
    }

    #[test]
    fn test_blank_page_skipped_with_diagnostic() {
        let pages = vec![
            RawPage::from_text(VolumeId(2), 1, "   "),
            RawPage::from_text(VolumeId(2), 2, "acqua: water."),
        ];
        let out = normalize_pages(pages, &ParsingConfig::default());
        assert_eq!(out.stats.skipped_pages, 1);
        assert_eq!(out.diagnostics.of_kind("skipped_page").count(), 1);
        assert_eq!(texts(&out), vec!["acqua: water."]);
    }

    #[test]
    fn test_page_numbers_and_running_title_dropped() {
        let pages = vec![RawPage::from_text(
            VolumeId(1),
            7,
            "S C H E D A R I O\nACQUA: water.\n— 7 —\n12",
        )];
        let out = normalize_pages(pages, &ParsingConfig::default());
        assert_eq!(texts(&out), vec!["ACQUA: water."]);
        assert_eq!(out.stats.boilerplate_lines, 3);
    }

    #[test]
    fn test_repeated_header_dropped() {
        let pages: Vec<RawPage> = ["ACQUA", "MARE", "SOLE"]
            .iter()
            .zip(1..)
            .map(|(word, n)| {
                RawPage::from_text(
                    VolumeId(1),
                    n,
                    format!("Vocabolario {n}\n{word}: def.\nfooter note line"),
                )
            })
            .collect();
        let out = normalize_pages(pages, &ParsingConfig::default());
        assert_eq!(texts(&out), vec!["ACQUA: def.", "MARE: def.", "SOLE: def."]);
        assert_eq!(out.stats.furniture_lines, 6);
    }

    #[test]
    fn test_header_below_threshold_is_kept() {
        let pages: Vec<RawPage> = (1..=2)
            .map(|n| RawPage::from_text(VolumeId(1), n, format!("Vocabolario\nA{n}: x.")))
            .collect();
        let out = normalize_pages(pages, &ParsingConfig::default());
        assert_eq!(out.lines.len(), 4);
    }

    #[test]
    fn test_column_reading_order() {
        let page = RawPage {
            volume: VolumeId(1),
            number: 1,
            fragments: vec![
                PageFragment::at("destra alta", 0.70, 0.10),
                PageFragment::at("sinistra bassa", 0.05, 0.60),
                PageFragment::at("centro", 0.40, 0.20),
                PageFragment::at("sinistra alta", 0.05, 0.10),
            ],
        };
        let out = normalize_pages(vec![page], &ParsingConfig::default());
        assert_eq!(
            texts(&out),
            vec!["sinistra alta", "sinistra bassa", "centro", "destra alta"]
        );
    }

    #[test]
    fn test_unpositioned_fragments_keep_order() {
        let page = RawPage {
            volume: VolumeId(1),
            number: 1,
            fragments: vec![
                PageFragment::plain("secondo"),
                PageFragment::at("primo", 0.0, 0.0),
            ],
        };
        let out = normalize_pages(vec![page], &ParsingConfig::default());
        assert_eq!(texts(&out), vec!["secondo", "primo"]);
    }

    #[test]
    fn test_bold_marks_first_line_only() {
        let page = RawPage {
            volume: VolumeId(1),
            number: 1,
            fragments: vec![
                PageFragment::plain("abbaglio:").bold(),
                PageFragment::plain("m. errore."),
            ],
        };
        let out = normalize_pages(vec![page], &ParsingConfig::default());
        assert!(out.lines[0].emphasized);
        assert!(!out.lines[1].emphasized);
    }

    #[test]
    fn test_spans_on_one_baseline_form_a_line() {
        let page = RawPage {
            volume: VolumeId(1),
            number: 1,
            fragments: vec![
                PageFragment::at("abbacchià: ", 0.08, 0.200).bold(),
                PageFragment::at("tr.", 0.164, 0.2003).italic(),
                PageFragment::at(" ", 0.177, 0.200).bold(),
                PageFragment::at("abbacchiare.", 0.181, 0.200),
                PageFragment::at("abbacchiarse:", 0.08, 0.215).bold(),
            ],
        };
        let out = normalize_pages(vec![page], &ParsingConfig::default());
        assert_eq!(texts(&out), vec!["abbacchià: tr. abbacchiare.", "abbacchiarse:"]);
        assert_eq!(
            out.lines[0].runs,
            vec![
                TextRun::plain("abbacchià:").bold(),
                TextRun::plain(" "),
                TextRun::plain("tr.").italic(),
                TextRun::plain(" abbacchiare."),
            ]
        );
        assert!(out.lines[0].emphasized);
        // Every line starts at the same x: no indentation to speak of.
        assert_eq!(out.lines[0].indent, None);
    }

    #[test]
    fn test_indent_measured_per_column() {
        let page = RawPage {
            volume: VolumeId(1),
            number: 1,
            fragments: vec![
                PageFragment::at("abbaccarse: intr. pron. colludere,", 0.08, 0.10).bold(),
                PageFragment::at("accordarsi.", 0.085, 0.12),
                PageFragment::at("acciso: agg. ucciso.", 0.52, 0.10).bold(),
            ],
        };
        let out = normalize_pages(vec![page], &ParsingConfig::default());
        assert_eq!(out.lines[0].indent, Some(0.0));
        assert!(out.lines[1].indent.is_some_and(|i| i > 0.004 && i < 0.006));
        // Alone in its column
        assert_eq!(out.lines[2].indent, None);
    }

    #[test]
    fn test_hyphen_not_joined_into_bold_line() {
        let page = RawPage {
            volume: VolumeId(1),
            number: 1,
            fragments: vec![
                PageFragment::plain("acqua: water, see also sciù-"),
                PageFragment::plain("sciulillo: m. a small bird.").bold(),
            ],
        };
        let out = normalize_pages(vec![page], &ParsingConfig::default());
        assert_eq!(
            texts(&out),
            vec!["acqua: water, see also sciù-", "sciulillo: m. a small bird."]
        );
        assert!(out.lines[1].emphasized);
        assert_eq!(out.stats.hyphen_joins, 0);
    }

    #[test]
    fn test_hyphen_not_joined_into_flush_line() {
        let page = RawPage {
            volume: VolumeId(1),
            number: 1,
            fragments: vec![
                PageFragment::at("ammore: m. amore, vedi sciù-", 0.08, 0.10),
                PageFragment::at("sciulillo: m. uccellino", 0.08, 0.12),
                PageFragment::at("piccolo.", 0.085, 0.14),
            ],
        };
        let out = normalize_pages(vec![page], &ParsingConfig::default());
        assert_eq!(out.lines.len(), 3);
        assert_eq!(out.lines[1].indent, Some(0.0));
        assert_eq!(out.stats.hyphen_joins, 0);
    }

    #[test]
    fn test_styled_hyphen_join_keeps_runs() {
        let page = RawPage {
            volume: VolumeId(1),
            number: 1,
            fragments: vec![
                PageFragment::plain("abbaccamiento:").bold(),
                PageFragment::plain("accordo se-"),
                PageFragment::plain("greto."),
            ],
        };
        let out = normalize_pages(vec![page], &ParsingConfig::default());
        assert_eq!(texts(&out), vec!["abbaccamiento:", "accordo segreto."]);
        // Both halves are plain, so the joined line stays unstyled.
        assert!(out.lines[1].runs.is_empty());

        let page = RawPage {
            volume: VolumeId(1),
            number: 1,
            fragments: vec![
                PageFragment::plain("vedi ab-").italic(),
                PageFragment::plain("baccà."),
            ],
        };
        let out = normalize_pages(vec![page], &ParsingConfig::default());
        assert_eq!(
            out.lines[0].runs,
            vec![TextRun::plain("vedi ab").italic(), TextRun::plain("baccà.")]
        );
    }

    #[test]
    fn test_deterministic() {
        let make = || {
            (1..=4)
                .map(|n| RawPage::from_text(VolumeId(1), n, format!("Testata\nvoce{n}: a-\nb.")))
                .collect::<Vec<_>>()
        };
        let a = normalize_pages(make(), &ParsingConfig::default());
        let b = normalize_pages(make(), &ParsingConfig::default());
        assert_eq!(a.lines, b.lines);
    }
}
