use std::path::PathBuf;

use rayon::prelude::*;
use schedario_core::{
    CanonicalMapping, Diagnostic, Diagnostics, Entry, NormalizedLine, PageSource, RawEntryBlock,
    RawPage, VolumeId,
};
use tracing::{debug, info};

use crate::config::ParsingConfig;
use crate::entry::{EntryParser, ParsedBlock};
use crate::merge::MergeAccumulator;
use crate::normalize::{normalize_pages, NormalizeStats, NormalizedVolume};
use crate::segment::{Segmentation, Segmenter};
use crate::ParsingError;

/// Counters for one volume.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VolumeStats {
    pub volume: Option<VolumeId>,
    pub normalize: NormalizeStats,
    pub blocks: usize,
    pub entries: usize,
    pub aliases: usize,
    pub section_letters: usize,
    pub unparseable: usize,
}

/// Counters for a whole build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub volumes: Vec<VolumeStats>,
    /// Headwords in the final mapping.
    pub headwords: usize,
    pub aliases: usize,
}

/// Parsed entries of one volume, before merging.
#[derive(Debug, Clone)]
pub struct VolumeExtraction {
    pub volume: VolumeId,
    pub entries: Vec<Entry>,
    pub diagnostics: Diagnostics,
    pub stats: VolumeStats,
}

/// Result of a full run: the mapping plus everything worth reporting.
#[derive(Debug, Clone)]
pub struct DictionaryBuild {
    pub mapping: CanonicalMapping,
    pub diagnostics: Diagnostics,
    pub stats: BuildStats,
}

/// A configurable dictionary extraction pipeline.
///
/// Holds a [`ParsingConfig`] and exposes each pipeline step as a method.
/// The default constructor uses built-in defaults; use
/// [`DictionaryExtractor::with_config`] to tune the heuristics.
#[derive(Debug, Clone)]
pub struct DictionaryExtractor {
    config: ParsingConfig,
    segmenter: Segmenter,
    parser: EntryParser,
}

impl Default for DictionaryExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl DictionaryExtractor {
    /// Create an extractor with default configuration.
    pub fn new() -> Self {
        Self::with_config(ParsingConfig::default())
    }

    /// Create an extractor with a custom configuration.
    pub fn with_config(config: ParsingConfig) -> Self {
        Self {
            segmenter: Segmenter::from_config(&config),
            parser: EntryParser::from_config(&config),
            config,
        }
    }

    /// Get a reference to the current config.
    pub fn config(&self) -> &ParsingConfig {
        &self.config
    }

    /// Clean raw pages into a line stream (step 1).
    pub fn normalize(&self, pages: Vec<RawPage>) -> NormalizedVolume {
        normalize_pages(pages, &self.config)
    }

    /// Split lines into entry blocks (step 2).
    pub fn segment(&self, lines: Vec<NormalizedLine>) -> Segmentation {
        self.segmenter.segment(lines)
    }

    /// Parse one block (step 3).
    pub fn parse_block(&self, block: &RawEntryBlock) -> ParsedBlock {
        self.parser.parse(block)
    }

    /// Run steps 1–3 on one volume.
    ///
    /// Only a volume with no pages at all is an error; everything else that
    /// goes wrong is recorded in the returned diagnostics.
    pub fn extract_volume(
        &self,
        volume: VolumeId,
        pages: Vec<RawPage>,
    ) -> Result<VolumeExtraction, ParsingError> {
        if pages.is_empty() {
            return Err(ParsingError::EmptyVolume(volume));
        }

        let normalized = self.normalize(pages);
        let mut diagnostics = normalized.diagnostics;
        let mut stats = VolumeStats {
            volume: Some(volume),
            normalize: normalized.stats,
            ..Default::default()
        };

        let segmentation = self.segment(normalized.lines);
        diagnostics.extend(segmentation.diagnostics);
        stats.blocks = segmentation.blocks.len();

        let mut entries = Vec::new();
        for block in &segmentation.blocks {
            match self.parse_block(block) {
                ParsedBlock::Entry(entry) => {
                    if entry.is_alias {
                        stats.aliases += 1;
                    }
                    entries.push(entry);
                }
                ParsedBlock::SectionLetter(letter) => {
                    debug!(%volume, page = block.start_page, %letter, "section letter");
                    stats.section_letters += 1;
                }
                ParsedBlock::Unparseable(reason) => {
                    debug!(
                        %volume,
                        page = block.start_page,
                        %reason,
                        text = %block.text(),
                        "unparseable block"
                    );
                    stats.unparseable += 1;
                    diagnostics.push(Diagnostic::UnparseableBlock {
                        volume,
                        page: block.start_page,
                        reason,
                        text: block.text(),
                    });
                }
            }
        }
        stats.entries = entries.len();

        info!(
            %volume,
            blocks = stats.blocks,
            entries = stats.entries,
            aliases = stats.aliases,
            unparseable = stats.unparseable,
            "parsed volume"
        );

        Ok(VolumeExtraction {
            volume,
            entries,
            diagnostics,
            stats,
        })
    }

    /// Merge per-volume results into the canonical mapping (step 4).
    pub fn merge(&self, volumes: Vec<VolumeExtraction>) -> DictionaryBuild {
        let mut acc = MergeAccumulator::from_config(&self.config);
        let mut diagnostics = Diagnostics::new();
        let mut stats = BuildStats::default();

        for extraction in volumes {
            diagnostics.extend(extraction.diagnostics);
            stats.volumes.push(extraction.stats);
            acc.add_volume(extraction.entries);
        }
        let mapping = acc.finish(&mut diagnostics);

        stats.headwords = mapping.len();
        stats.aliases = mapping.entries().filter(|e| e.is_alias).count();
        info!(
            headwords = stats.headwords,
            aliases = stats.aliases,
            diagnostics = diagnostics.len(),
            "merged dictionary"
        );

        DictionaryBuild {
            mapping,
            diagnostics,
            stats,
        }
    }

    /// Run the full pipeline on already-extracted pages.
    ///
    /// Volumes are normalized, segmented and parsed in parallel; they only
    /// meet in the merge, which sees them in the order given.
    pub fn build(
        &self,
        volumes: Vec<(VolumeId, Vec<RawPage>)>,
    ) -> Result<DictionaryBuild, ParsingError> {
        let extractions = volumes
            .into_par_iter()
            .map(|(volume, pages)| self.extract_volume(volume, pages))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.merge(extractions))
    }

    /// Run the full pipeline, reading each volume through `source`.
    pub fn build_from_source(
        &self,
        volumes: &[(VolumeId, PathBuf)],
        source: &dyn PageSource,
    ) -> Result<DictionaryBuild, ParsingError> {
        let extractions = volumes
            .par_iter()
            .map(|(volume, path)| {
                let pages = source.pages(path, *volume)?;
                info!(%volume, path = %path.display(), pages = pages.len(), "loaded volume");
                self.extract_volume(*volume, pages)
            })
            .collect::<Result<Vec<_>, ParsingError>>()?;
        Ok(self.merge(extractions))
    }
}
