//! JSON-lines fragment cache.
//!
//! One fragment per line:
//! `{"volume":1,"page":5,"text":"…","bold":true,"x":0.1,"y":0.2}`.
//! Position, `bold` and `italic` are omitted when absent. Blank pages are written as a
//! single empty fragment so that page numbering survives the round trip.

use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use schedario_core::{PageFragment, PageSource, RawPage, SourceError, VolumeId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::IngestError;

#[derive(Debug, Serialize, Deserialize)]
struct CacheLine {
    volume: VolumeId,
    page: usize,
    #[serde(flatten)]
    fragment: PageFragment,
}

/// Write `pages` as a fragment cache.
pub fn write_fragment_cache<W: Write>(mut writer: W, pages: &[RawPage]) -> Result<usize, IngestError> {
    let mut written = 0;
    for page in pages {
        let blank = [PageFragment::default()];
        let fragments = if page.fragments.is_empty() {
            &blank[..]
        } else {
            &page.fragments[..]
        };
        for fragment in fragments {
            let line = CacheLine {
                volume: page.volume,
                page: page.number,
                fragment: fragment.clone(),
            };
            serde_json::to_writer(&mut writer, &line)?;
            writer.write_all(b"\n")?;
            written += 1;
        }
    }
    writer.flush()?;
    Ok(written)
}

/// Reads pages back from a fragment cache.
///
/// A cache may hold several volumes; only lines of the requested volume are
/// used. Pages come back sorted by number.
#[derive(Debug, Clone)]
pub struct FragmentCacheSource {
    first_page: usize,
}

impl Default for FragmentCacheSource {
    fn default() -> Self {
        Self { first_page: 1 }
    }
}

impl FragmentCacheSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_first_page(mut self, page: usize) -> Self {
        self.first_page = page.max(1);
        self
    }

    pub fn read<R: BufRead>(&self, reader: R, volume: VolumeId) -> Result<Vec<RawPage>, SourceError> {
        let mut pages: BTreeMap<usize, Vec<PageFragment>> = BTreeMap::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let cached: CacheLine =
                serde_json::from_str(&line).map_err(|e| SourceError::Format {
                    line: index + 1,
                    message: e.to_string(),
                })?;
            if cached.volume != volume || cached.page < self.first_page {
                continue;
            }
            pages.entry(cached.page).or_default().push(cached.fragment);
        }
        debug!(%volume, pages = pages.len(), "read fragment cache");

        Ok(pages
            .into_iter()
            .map(|(number, fragments)| RawPage {
                volume,
                number,
                fragments: fragments
                    .into_iter()
                    .filter(|f| !f.text.is_empty())
                    .collect(),
            })
            .collect())
    }
}

impl PageSource for FragmentCacheSource {
    fn pages(&self, path: &Path, volume: VolumeId) -> Result<Vec<RawPage>, SourceError> {
        let file = std::fs::File::open(path)?;
        self.read(BufReader::new(file), volume)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_shape() {
        let page = RawPage {
            volume: VolumeId(1),
            number: 5,
            fragments: vec![PageFragment::at("ACQUA: water.", 0.5, 0.25).bold()],
        };
        let mut out = Vec::new();
        write_fragment_cache(&mut out, &[page]).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["volume"], 1);
        assert_eq!(value["page"], 5);
        assert_eq!(value["text"], "ACQUA: water.");
        assert_eq!(value["bold"], true);
        assert_eq!(value["x"], 0.5);
        assert_eq!(value["y"], 0.25);
        assert!(value.get("italic").is_none());
    }

    #[test]
    fn test_italic_written_and_read() {
        let page = RawPage {
            volume: VolumeId(1),
            number: 3,
            fragments: vec![
                PageFragment::at("abbacchià: ", 0.08, 0.2).bold(),
                PageFragment::at("tr.", 0.16, 0.2).italic(),
            ],
        };
        let mut out = Vec::new();
        write_fragment_cache(&mut out, std::slice::from_ref(&page)).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.lines().nth(1).unwrap().contains("\"italic\":true"));

        let pages = FragmentCacheSource::new()
            .read(text.as_bytes(), VolumeId(1))
            .unwrap();
        assert_eq!(pages, vec![page]);
    }

    #[test]
    fn test_plain_fragment_omits_layout() {
        let mut out = Vec::new();
        write_fragment_cache(&mut out, &[RawPage::from_text(VolumeId(2), 1, "MARE")]).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "{\"volume\":2,\"page\":1,\"text\":\"MARE\"}\n");
    }

    #[test]
    fn test_filters_volume_and_groups_pages() {
        let cache = concat!(
            "{\"volume\":1,\"page\":2,\"text\":\"b\"}\n",
            "{\"volume\":2,\"page\":1,\"text\":\"other\"}\n",
            "\n",
            "{\"volume\":1,\"page\":1,\"text\":\"a1\"}\n",
            "{\"volume\":1,\"page\":1,\"text\":\"a2\",\"bold\":true}\n",
        );
        let pages = FragmentCacheSource::new()
            .read(cache.as_bytes(), VolumeId(1))
            .unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].number, 1);
        assert_eq!(pages[0].fragments.len(), 2);
        assert!(pages[0].fragments[1].bold);
        assert_eq!(pages[1].fragments[0].text, "b");
    }

    #[test]
    fn test_malformed_line_reports_position() {
        let cache = "{\"volume\":1,\"page\":1,\"text\":\"a\"}\nnot json\n";
        let err = FragmentCacheSource::new()
            .read(cache.as_bytes(), VolumeId(1))
            .unwrap_err();
        assert!(matches!(err, SourceError::Format { line: 2, .. }));
    }
}
