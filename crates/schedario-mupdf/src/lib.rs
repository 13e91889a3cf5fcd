use std::path::Path;

use mupdf::{Document, Rect, TextPageFlags};
use serde::Deserialize;
use tracing::debug;

use schedario_core::{PageFragment, PageSource, RawPage, SourceError, VolumeId};

/// Coordinates in the structured-text JSON are integers scaled by this.
const JSON_SCALE: f32 = 100.0;

/// MuPDF-based implementation of [`PageSource`].
///
/// This crate is the sole AGPL island: it isolates the mupdf dependency
/// (which is AGPL-3.0) so that text and cache inputs do not transitively
/// depend on it.
///
/// Text is extracted span by span: each run of one font becomes a
/// [`PageFragment`] carrying its bold and italic flags, its left edge and
/// its baseline, relative to the page. The normalizer rebuilds lines,
/// column order and indentation from those. Running heads are normally
/// left to the normalizer's repeated-line detection; header and footer
/// bands can additionally be cut here for scans where they bleed into the
/// text columns.
pub struct MupdfPageSource {
    /// 1-based number of the first page to read.
    first_page: usize,
    /// Fraction of page height from bottom to exclude as footer (0.0–1.0).
    /// `None` disables footer exclusion.
    footer_exclusion_ratio: Option<f32>,
    /// Fraction of page height from top to exclude as header (0.0–1.0).
    /// `None` disables header exclusion.
    header_exclusion_ratio: Option<f32>,
}

impl Default for MupdfPageSource {
    fn default() -> Self {
        Self {
            first_page: 1,
            footer_exclusion_ratio: None,
            header_exclusion_ratio: None,
        }
    }
}

impl MupdfPageSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip front matter: pages before `page` (1-based) are not read.
    pub fn with_first_page(mut self, page: usize) -> Self {
        self.first_page = page.max(1);
        self
    }

    /// Set the footer exclusion ratio. Pass `0.0` to disable.
    pub fn with_footer_exclusion(mut self, ratio: f32) -> Self {
        self.footer_exclusion_ratio = if ratio > 0.0 { Some(ratio) } else { None };
        self
    }

    /// Set the header exclusion ratio. Pass `0.0` to disable.
    pub fn with_header_exclusion(mut self, ratio: f32) -> Self {
        self.header_exclusion_ratio = if ratio > 0.0 { Some(ratio) } else { None };
        self
    }

    /// Fragments of one page from MuPDF's structured-text JSON.
    fn fragments(&self, json: &str, page: &Rect) -> Result<Vec<PageFragment>, SourceError> {
        let stext: StextPage = serde_json::from_str(json)
            .map_err(|e| SourceError::ExtractionError(format!("structured text: {e}")))?;

        let page_height = page.y1 - page.y0;
        let header_threshold = self
            .header_exclusion_ratio
            .map(|r| page.y0 + page_height * r);
        let footer_threshold = self
            .footer_exclusion_ratio
            .map(|r| page.y1 - page_height * r);

        let mut fragments = Vec::new();
        for block in stext.blocks.iter().filter(|b| b.kind == "text") {
            for line in &block.lines {
                if line.text.is_empty() {
                    continue;
                }
                let top = line.bbox.y / JSON_SCALE;
                let bottom = (line.bbox.y + line.bbox.h) / JSON_SCALE;

                // Skip spans entirely within the header region
                if header_threshold.is_some_and(|t| bottom <= t) {
                    continue;
                }
                // Skip spans whose top edge is in the footer region
                if footer_threshold.is_some_and(|t| top >= t) {
                    continue;
                }

                let left = line.x.unwrap_or(line.bbox.x) / JSON_SCALE;
                let baseline = line.y.map_or(bottom, |y| y / JSON_SCALE);
                let (x, y) = relative_position(left, baseline, page);
                let font = line.font.as_ref();
                fragments.push(PageFragment {
                    text: line.text.clone(),
                    x: Some(x),
                    y: Some(y),
                    bold: font.is_some_and(StextFont::is_bold),
                    italic: font.is_some_and(StextFont::is_italic),
                });
            }
        }
        Ok(fragments)
    }
}

#[derive(Debug, Deserialize)]
struct StextPage {
    blocks: Vec<StextBlock>,
}

#[derive(Debug, Deserialize)]
struct StextBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    lines: Vec<StextLine>,
}

/// With spans preserved, one "line" of the JSON is a single-font span.
#[derive(Debug, Deserialize)]
struct StextLine {
    bbox: StextBox,
    #[serde(default)]
    font: Option<StextFont>,
    /// Origin of the first character; `y` is its baseline.
    #[serde(default)]
    x: Option<f32>,
    #[serde(default)]
    y: Option<f32>,
    text: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct StextBox {
    x: f32,
    y: f32,
    h: f32,
}

#[derive(Debug, Default, Deserialize)]
struct StextFont {
    #[serde(default)]
    name: String,
    #[serde(default)]
    weight: String,
    #[serde(default)]
    style: String,
}

impl StextFont {
    // Embedded subset fonts often only say it in the name: "ABCDEF+Garamond-Bold".
    fn is_bold(&self) -> bool {
        self.weight == "bold" || self.name.contains("Bold")
    }

    fn is_italic(&self) -> bool {
        self.style == "italic" || self.name.contains("Italic") || self.name.contains("Oblique")
    }
}

/// Position of a point as fractions of `page`, measured from its top-left.
fn relative_position(x: f32, y: f32, page: &Rect) -> (f32, f32) {
    let width = (page.x1 - page.x0).max(f32::EPSILON);
    let height = (page.y1 - page.y0).max(f32::EPSILON);
    ((x - page.x0) / width, (y - page.y0) / height)
}

impl PageSource for MupdfPageSource {
    fn pages(&self, path: &Path, volume: VolumeId) -> Result<Vec<RawPage>, SourceError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| SourceError::OpenError("invalid path encoding".into()))?;

        let document =
            Document::open(path_str).map_err(|e| SourceError::OpenError(e.to_string()))?;

        let mut pages = Vec::new();

        for (index, page_result) in document
            .pages()
            .map_err(|e| SourceError::ExtractionError(e.to_string()))?
            .enumerate()
        {
            let number = index + 1;
            if number < self.first_page {
                continue;
            }
            let page = page_result.map_err(|e| SourceError::ExtractionError(e.to_string()))?;
            let json = page
                .to_text_page(TextPageFlags::PRESERVE_SPANS)
                .and_then(|text_page| text_page.to_json(JSON_SCALE))
                .map_err(|e| SourceError::ExtractionError(e.to_string()))?;
            let page_bounds = page
                .bounds()
                .map_err(|e| SourceError::ExtractionError(e.to_string()))?;

            let fragments = self.fragments(&json, &page_bounds)?;
            debug!(%volume, page = number, spans = fragments.len(), "extracted page");
            pages.push(RawPage {
                volume,
                number,
                fragments,
            });
        }

        Ok(pages)
    }
}
