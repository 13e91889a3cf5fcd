//! Entry segmenter: normalized lines → raw entry blocks.
//!
//! The partition is total: every input line lands in exactly one block, in
//! order. Lines before the first headword still form a block of their own so
//! nothing is lost; the parser reports it if it makes no sense.

use schedario_core::{Diagnostic, Diagnostics, NormalizedLine, RawEntryBlock, VolumeId};
use tracing::{debug, warn};

use crate::classify::{LineClass, LineClassifier};
use crate::config::ParsingConfig;

/// Output of [`Segmenter::segment`].
#[derive(Debug, Clone, Default)]
pub struct Segmentation {
    pub blocks: Vec<RawEntryBlock>,
    pub diagnostics: Diagnostics,
}

impl Segmentation {
    /// All lines of all blocks, in order.
    pub fn lines(&self) -> impl Iterator<Item = &NormalizedLine> {
        self.blocks.iter().flat_map(|b| b.lines.iter())
    }
}

/// Whether a block's definition already looks finished, so an ambiguous
/// line after it may start a new entry.
fn is_closed(block: &RawEntryBlock) -> bool {
    if block.lines.len() == 1 && is_section_letter(&block.first_line().text) {
        return true;
    }
    block
        .lines
        .last()
        .map(|l| l.text.trim_end())
        .is_some_and(|t| t.ends_with(['.', '!', '?', '…']))
}

pub(crate) fn is_section_letter(text: &str) -> bool {
    let mut chars = text.trim().chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if c.is_uppercase())
}

/// Line and boundary counts of the page being segmented.
struct PageTally {
    volume: VolumeId,
    page: usize,
    lines: usize,
    boundaries: usize,
}

impl PageTally {
    fn flush(&self, threshold: usize, diagnostics: &mut Diagnostics) {
        if self.boundaries == 0 && self.lines >= threshold {
            warn!(
                volume = %self.volume,
                page = self.page,
                lines = self.lines,
                "no entry boundary on page"
            );
            diagnostics.push(Diagnostic::MissingBoundary {
                volume: self.volume,
                page: self.page,
                lines: self.lines,
            });
        }
    }
}

/// Splits a volume's line stream into entry blocks.
#[derive(Debug, Clone)]
pub struct Segmenter {
    classifier: LineClassifier,
    missing_boundary_lines: usize,
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::from_config(&ParsingConfig::default())
    }
}

impl Segmenter {
    pub fn new(classifier: LineClassifier, missing_boundary_lines: usize) -> Self {
        Self {
            classifier,
            missing_boundary_lines,
        }
    }

    pub fn from_config(config: &ParsingConfig) -> Self {
        Self::new(
            LineClassifier::from_config(config),
            config.missing_boundary_lines,
        )
    }

    pub fn classifier(&self) -> &LineClassifier {
        &self.classifier
    }

    pub fn segment(&self, lines: Vec<NormalizedLine>) -> Segmentation {
        let mut out = Segmentation::default();
        let mut current: Option<RawEntryBlock> = None;
        let mut tally: Option<PageTally> = None;

        for line in lines {
            let starts = match self.classifier.classify(&line) {
                LineClass::Headword => true,
                LineClass::Continuation => false,
                LineClass::Ambiguous => {
                    // Prefer continuation unless the open block is finished.
                    let split = current.as_ref().is_none_or(is_closed);
                    debug!(text = %line.text, split, "ambiguous boundary");
                    out.diagnostics.push(Diagnostic::AmbiguousBoundary {
                        volume: line.volume,
                        page: line.page,
                        text: line.text.clone(),
                        split,
                    });
                    split
                }
            };
            // A section letter never takes continuation lines.
            let starts = starts
                || current
                    .as_ref()
                    .is_some_and(|b| b.lines.len() == 1 && is_section_letter(&b.first_line().text));

            let same_page = tally
                .as_ref()
                .is_some_and(|t| t.page == line.page && t.volume == line.volume);
            if !same_page {
                if let Some(t) = tally.take() {
                    t.flush(self.missing_boundary_lines, &mut out.diagnostics);
                }
                tally = Some(PageTally {
                    volume: line.volume,
                    page: line.page,
                    lines: 0,
                    boundaries: 0,
                });
            }
            if let Some(t) = tally.as_mut() {
                t.lines += 1;
                if starts {
                    t.boundaries += 1;
                }
            }

            if starts || current.is_none() {
                if let Some(done) = current.replace(RawEntryBlock::new(line)) {
                    out.blocks.push(done);
                }
            } else if let Some(block) = current.as_mut() {
                block.lines.push(line);
            }
        }

        if let Some(t) = &tally {
            t.flush(self.missing_boundary_lines, &mut out.diagnostics);
        }
        out.blocks.extend(current);
        out
    }
}
