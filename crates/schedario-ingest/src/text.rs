use std::path::Path;

use schedario_core::{PageSource, RawPage, SourceError, VolumeId};

/// Page separator written by `pdftotext` and most OCR exports.
pub const FORM_FEED: char = '\u{000C}';

/// Reads a volume from plain text with one form feed between pages.
///
/// The text carries no layout, so each page becomes a single unpositioned
/// fragment.
#[derive(Debug, Clone)]
pub struct TextPageSource {
    first_page: usize,
}

impl Default for TextPageSource {
    fn default() -> Self {
        Self { first_page: 1 }
    }
}

impl TextPageSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pages before `page` (1-based) are front matter and are dropped.
    pub fn with_first_page(mut self, page: usize) -> Self {
        self.first_page = page.max(1);
        self
    }

    /// Split already-loaded text into pages.
    pub fn split_pages(&self, text: &str, volume: VolumeId) -> Vec<RawPage> {
        // A trailing form feed closes the last page rather than opening a new one.
        let text = text.strip_suffix(FORM_FEED).unwrap_or(text);
        text.split(FORM_FEED)
            .enumerate()
            .map(|(i, page)| (i + 1, page))
            .filter(|(number, _)| *number >= self.first_page)
            .map(|(number, page)| RawPage::from_text(volume, number, page))
            .collect()
    }
}

impl PageSource for TextPageSource {
    fn pages(&self, path: &Path, volume: VolumeId) -> Result<Vec<RawPage>, SourceError> {
        let text = std::fs::read_to_string(path)?;
        Ok(self.split_pages(&text, volume))
    }
}
