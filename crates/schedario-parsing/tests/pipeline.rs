//! End-to-end checks of the extraction pipeline on small synthetic volumes.
//!
//! Pages are served by an in-memory [`PageSource`], so every test runs the
//! same path as a real build: normalize → segment → parse → merge.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use schedario_parsing::{
    build_dictionary, DictionaryBuild, DictionaryExtractor, Entry, PageFragment, PageSource,
    ParsingError, RawPage, SourceError, VolumeId,
};

struct MemorySource {
    volumes: HashMap<PathBuf, Vec<&'static str>>,
}

impl MemorySource {
    fn new(volumes: &[(&str, Vec<&'static str>)]) -> Self {
        Self {
            volumes: volumes
                .iter()
                .map(|(path, pages)| (PathBuf::from(path), pages.clone()))
                .collect(),
        }
    }
}

impl PageSource for MemorySource {
    fn pages(&self, path: &Path, volume: VolumeId) -> Result<Vec<RawPage>, SourceError> {
        let pages = self
            .volumes
            .get(path)
            .ok_or_else(|| SourceError::OpenError(path.display().to_string()))?;
        Ok(pages
            .iter()
            .enumerate()
            .map(|(i, text)| RawPage::from_text(volume, i + 1, *text))
            .collect())
    }
}

fn two_volumes() -> Vec<(VolumeId, PathBuf)> {
    vec![
        (VolumeId(1), PathBuf::from("1.pdf")),
        (VolumeId(2), PathBuf::from("2.pdf")),
    ]
}

fn sample_source() -> MemorySource {
    MemorySource::new(&[
        (
            "1.pdf",
            vec![
                "S C H E D A R I O\nA\nACQUA: water.\nsalata: salty.\nPUMMAROLA: tomato\n1",
                "S C H E D A R I O\nSCUGLIZZO: v. scuoglio.\nCASARELLA: dim. di casa.\n2",
                "",
                "S C H E D A R I O\nB\nBABBÀ: dolce na-\npoletano.\n4",
            ],
        ),
        (
            "2.pdf",
            vec![
                "PUMMAROLA: V. pomodoro\nPOMODORO: tomato (fruit)\nAC: v. acqua.",
                "FELARIÉLLO v. filariéllo.\nFILARIÉLLO: filare.\nCICCIO: v. ciccio.",
            ],
        ),
    ])
}

#[test]
fn pummarola_keeps_definition_and_records_alias() {
    let build = build_dictionary(&two_volumes(), &sample_source()).unwrap();

    let e = build.mapping.get("pummarola").unwrap();
    assert!(!e.is_alias);
    assert_eq!(e.definition, "tomato");
    assert!(e.cross_references.contains("pomodoro"));
    assert_eq!(
        e.source_volumes,
        BTreeSet::from([VolumeId(1), VolumeId(2)])
    );
    assert_eq!(
        build.mapping.get("pomodoro").unwrap().definition,
        "tomato (fruit)"
    );
}

#[test]
fn unresolved_alias_is_emitted_and_flagged() {
    let build = build_dictionary(&two_volumes(), &sample_source()).unwrap();

    let e = build.mapping.get("scuglizzo").unwrap();
    assert!(e.is_alias);
    assert_eq!(e.alias_target.as_deref(), Some("scuoglio"));
    let flagged: Vec<_> = build
        .diagnostics
        .of_kind("unresolved_alias")
        .map(|d| d.to_string())
        .collect();
    assert_eq!(flagged, vec!["scuglizzo → scuoglio: target not found"]);
    assert_eq!(build.mapping.to_flat()["scuglizzo"], "v. scuoglio");
}

#[test]
fn lowercase_line_stays_in_acqua() {
    let build = build_dictionary(&two_volumes(), &sample_source()).unwrap();
    assert_eq!(
        build.mapping.get("acqua").unwrap().definition,
        "water. salata: salty."
    );
    assert!(!build.mapping.contains("salata"));
}

#[test]
fn hyphen_rejoined_across_lines() {
    let extractor = DictionaryExtractor::new();
    let normalized = extractor.normalize(vec![RawPage::from_text(
        VolumeId(1),
        1,
        "pomo-\ndoro: tomato.",
    )]);
    let texts: Vec<&str> = normalized.lines.iter().map(|l| l.text.as_str()).collect();
    assert_eq!(texts, vec!["pomodoro: tomato."]);

    let build = build_dictionary(&two_volumes(), &sample_source()).unwrap();
    assert_eq!(
        build.mapping.get("babbà").unwrap().definition,
        "dolce napoletano."
    );
}

#[test]
fn diagnostics_cover_skipped_pages_and_cycles() {
    let build = build_dictionary(&two_volumes(), &sample_source()).unwrap();
    let summary = build.diagnostics.summary();
    assert_eq!(summary.skipped_pages, 1);
    assert_eq!(summary.unresolved_aliases, 1);
    assert_eq!(summary.alias_cycles, 1, "ciccio points at itself");
    assert_eq!(summary.unparseable_entries, 0);
    assert_eq!(build.stats.volumes[0].section_letters, 2);
}

#[test]
fn idempotent_build() {
    let first = build_dictionary(&two_volumes(), &sample_source()).unwrap();
    let second = build_dictionary(&two_volumes(), &sample_source()).unwrap();
    assert_eq!(first.mapping, second.mapping);
    assert_eq!(first.diagnostics, second.diagnostics);
    assert_eq!(
        format!("{:?}", first.mapping.to_flat()),
        format!("{:?}", second.mapping.to_flat())
    );
}

#[test]
fn segmentation_is_a_partition() {
    let extractor = DictionaryExtractor::new();
    let source = sample_source();
    for (volume, path) in two_volumes() {
        let pages = source.pages(&path, volume).unwrap();
        let lines = extractor.normalize(pages).lines;
        let segmentation = extractor.segment(lines.clone());
        let rebuilt: Vec<_> = segmentation.lines().cloned().collect();
        assert_eq!(rebuilt, lines, "{}", volume);
        assert!(segmentation.blocks.iter().all(|b| !b.lines.is_empty()));
    }
}

#[test]
fn alias_chains_terminate() {
    let build = build_dictionary(&two_volumes(), &sample_source()).unwrap();
    let flagged: BTreeSet<String> = build
        .diagnostics
        .iter()
        .filter_map(|d| match d {
            schedario_parsing::Diagnostic::UnresolvedAlias { headword, .. }
            | schedario_parsing::Diagnostic::AliasCycle { headword, .. } => Some(headword.clone()),
            _ => None,
        })
        .collect();

    for alias in build.mapping.entries().filter(|e| e.is_alias) {
        let target = alias.alias_target.as_deref().unwrap();
        match build.mapping.get(target) {
            Some(Entry { is_alias: false, .. }) => {}
            _ => assert!(
                flagged.contains(&alias.headword),
                "{} → {} neither resolved nor flagged",
                alias.headword,
                target
            ),
        }
    }
    assert_eq!(
        build.mapping.get("ac").unwrap().alias_target.as_deref(),
        Some("acqua")
    );
    assert_eq!(
        build.mapping.get("felariéllo").unwrap().alias_target.as_deref(),
        Some("filariéllo")
    );
}

#[test]
fn headwords_are_unique_and_sorted() {
    let build = build_dictionary(&two_volumes(), &sample_source()).unwrap();
    let keys: Vec<&String> = build.mapping.iter().map(|(k, _)| k).collect();
    let mut sorted = keys.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(keys, sorted);
    for (key, entry) in build.mapping.iter() {
        assert_eq!(key, &entry.headword);
    }
}

#[test]
fn missing_volume_aborts() {
    let source = MemorySource::new(&[("1.pdf", vec!["ACQUA: water."])]);
    let err = build_dictionary(&two_volumes(), &source).unwrap_err();
    assert!(matches!(err, ParsingError::Source(SourceError::OpenError(_))));
}

#[test]
fn derivative_recorded() {
    let build = build_dictionary(&two_volumes(), &sample_source()).unwrap();
    let e = build.mapping.get("casarella").unwrap();
    assert!(!e.is_alias);
    assert_eq!(e.derived_from.as_deref(), Some("casa"));
}

/// Opening lines of the A section as the PDF reports them: one row per
/// printed line, each span as (offset from the column edge in points, text,
/// bold, italic). Continuation lines are indented by about 2.9pt.
const ABBACCAMIENTO: &[&[(f32, &str, bool, bool)]] = &[
    &[
        (0.00044, "abbaccamiento: ", true, false),
        (83.22, "m", false, true),
        (89.70, ". ", true, false),
    ],
    &[(2.88, "accordo segreto.", false, false)],
    &[
        (0.00096, "abbaccarse:", true, false),
        (51.30, " ", false, true),
        (59.82, "intr. ", false, true),
        (83.58, "pron. ", false, true),
        (111.30, "colludere, ", false, false),
    ],
    &[(2.88, "accordarsi.", false, false)],
    &[
        (0.00098, "abbacchià: ", true, false),
        (49.38, "tr.", false, true),
        (57.66, " ", true, false),
        (60.18, "abbacchiare. ", false, false),
    ],
    &[
        (0.00055, "abbacchiarse:", true, false),
        (59.64, " ", false, false),
        (62.16, "rifl", false, true),
        (73.20, ". abbattersi.", false, false),
    ],
];

struct LayoutSource {
    styled: bool,
}

impl PageSource for LayoutSource {
    fn pages(&self, _path: &Path, volume: VolumeId) -> Result<Vec<RawPage>, SourceError> {
        const PAGE_WIDTH: f32 = 595.0;
        const PAGE_HEIGHT: f32 = 842.0;
        const COLUMN_EDGE: f32 = 57.0;
        let styled = self.styled;
        let fragments = ABBACCAMIENTO
            .iter()
            .enumerate()
            .flat_map(|(row, spans)| {
                let baseline = (100.0 + 11.0 * row as f32) / PAGE_HEIGHT;
                spans.iter().map(move |&(offset, text, bold, italic)| PageFragment {
                    text: text.to_string(),
                    x: Some((COLUMN_EDGE + offset) / PAGE_WIDTH),
                    y: Some(baseline),
                    bold: bold && styled,
                    italic: italic && styled,
                })
            })
            .collect();
        Ok(vec![RawPage {
            volume,
            number: 1,
            fragments,
        }])
    }
}

fn layout_build(styled: bool) -> DictionaryBuild {
    let volumes = vec![(VolumeId(1), PathBuf::from("1.pdf"))];
    build_dictionary(&volumes, &LayoutSource { styled }).unwrap()
}

const ABBACCAMIENTO_HEADWORDS: [&str; 4] =
    ["abbaccamiento", "abbaccarse", "abbacchiarse", "abbacchià"];

#[test]
fn bold_and_flush_spans_split_every_entry() {
    let build = layout_build(true);
    let headwords: Vec<&str> = build.mapping.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(headwords, ABBACCAMIENTO_HEADWORDS);
    assert_eq!(build.diagnostics.summary().unparseable_entries, 0);

    let e = build.mapping.get("abbaccamiento").unwrap();
    assert_eq!(e.definition, "m. accordo segreto.");
    assert_eq!(e.qualifier.as_deref(), Some("sostantivo maschile"));
    assert_eq!(e.html.as_deref(), Some("<i>m</i><b>.</b> accordo segreto."));

    let e = build.mapping.get("abbaccarse").unwrap();
    assert_eq!(e.definition, "intr. pron. colludere, accordarsi.");
    assert_eq!(e.qualifier.as_deref(), Some("verbo intransitivo pronominale"));

    let e = build.mapping.get("abbacchià").unwrap();
    assert_eq!(e.definition, "tr. abbacchiare.");
    assert_eq!(e.qualifier.as_deref(), Some("verbo transitivo"));
    assert_eq!(e.derived_from, None);

    let e = build.mapping.get("abbacchiarse").unwrap();
    assert_eq!(e.definition, "rifl. abbattersi.");
    assert_eq!(e.qualifier.as_deref(), Some("verbo riflessivo"));
}

#[test]
fn indentation_alone_splits_entries() {
    let build = layout_build(false);
    let headwords: Vec<&str> = build.mapping.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(headwords, ABBACCAMIENTO_HEADWORDS);
    let e = build.mapping.get("abbaccarse").unwrap();
    assert_eq!(e.definition, "intr. pron. colludere, accordarsi.");
    assert_eq!(e.html, None);
}
