use std::path::PathBuf;

use thiserror::Error;

pub mod classify;
pub mod config;
pub mod entry;
pub mod extractor;
pub mod merge;
pub mod normalize;
pub mod qualifier;
pub mod segment;

pub use classify::{classify, CueStrength, LineClass, LineClassifier, LineRule};
pub use config::{ListOverride, ParsingConfig, ParsingConfigBuilder, RuleSpec};
pub use entry::{normalize_headword, parse_block, EntryParser, ParsedBlock};
pub use extractor::{
    BuildStats, DictionaryBuild, DictionaryExtractor, VolumeExtraction, VolumeStats,
};
pub use merge::{merge_entries, MergeAccumulator};
pub use normalize::{normalize_pages, NormalizeStats, NormalizedVolume};
pub use qualifier::{parse_qualifier, Qualifier, QualifierTable};
pub use segment::{Segmentation, Segmenter};
// Re-export domain types from core (canonical definitions live there)
pub use schedario_core::{
    CanonicalMapping, Diagnostic, Diagnostics, Entry, NormalizedLine, PageFragment, PageSource,
    RawEntryBlock, RawPage, SourceError, TextRun, VolumeId,
};

#[derive(Error, Debug)]
pub enum ParsingError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("{0} has no pages")]
    EmptyVolume(VolumeId),
}

/// Build the canonical mapping from source documents.
///
/// Pipeline, per volume (volumes run in parallel):
/// 1. Read the pages through `source`
/// 2. Normalize: drop furniture, rejoin hyphenated words, fix reading order
/// 3. Segment the line stream into entry blocks
/// 4. Parse each block into an entry
///
/// then merge all volumes and resolve alias chains.
pub fn build_dictionary(
    volumes: &[(VolumeId, PathBuf)],
    source: &dyn PageSource,
) -> Result<DictionaryBuild, ParsingError> {
    DictionaryExtractor::new().build_from_source(volumes, source)
}
