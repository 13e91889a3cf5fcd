use std::collections::BTreeMap;
use std::path::Path;

use thiserror::Error;

pub mod cache;
pub mod text;

pub use cache::{write_fragment_cache, FragmentCacheSource};
pub use text::TextPageSource;
// Re-export domain types for convenience
pub use schedario_core::{PageSource, RawPage, SourceError, VolumeId};

#[derive(Error, Debug)]
pub enum IngestError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("unsupported volume format: {0}")]
    UnsupportedFormat(String),
    #[error("fragment cache error: {0}")]
    Cache(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[cfg(not(feature = "pdf"))]
    #[error("PDF support not compiled in (enable the `pdf` feature of schedario-ingest)")]
    NoPdfSupport,
}

/// How a volume file is read, picked from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeFormat {
    Pdf,
    Text,
    FragmentCache,
}

impl VolumeFormat {
    /// Dispatch on extension:
    /// - `.pdf` → MuPDF (requires `pdf` feature / mupdf)
    /// - `.txt` → form-feed separated text
    /// - `.jsonl` → fragment cache
    pub fn detect(path: &Path) -> Result<Self, IngestError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "pdf" => Ok(Self::Pdf),
            "txt" => Ok(Self::Text),
            "jsonl" => Ok(Self::FragmentCache),
            _ => Err(IngestError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Read every page of one volume, skipping pages before `first_page`.
pub fn read_volume(
    path: &Path,
    volume: VolumeId,
    first_page: usize,
) -> Result<Vec<RawPage>, IngestError> {
    let pages = match VolumeFormat::detect(path)? {
        VolumeFormat::Pdf => read_pdf(path, volume, first_page)?,
        VolumeFormat::Text => TextPageSource::new()
            .with_first_page(first_page)
            .pages(path, volume)?,
        VolumeFormat::FragmentCache => FragmentCacheSource::new()
            .with_first_page(first_page)
            .pages(path, volume)?,
    };
    tracing::debug!(%volume, path = %path.display(), pages = pages.len(), "read volume");
    Ok(pages)
}

#[cfg(feature = "pdf")]
fn read_pdf(path: &Path, volume: VolumeId, first_page: usize) -> Result<Vec<RawPage>, IngestError> {
    let source = schedario_mupdf::MupdfPageSource::new().with_first_page(first_page);
    Ok(source.pages(path, volume)?)
}

#[cfg(not(feature = "pdf"))]
fn read_pdf(_path: &Path, _volume: VolumeId, _first_page: usize) -> Result<Vec<RawPage>, IngestError> {
    Err(IngestError::NoPdfSupport)
}

/// A [`PageSource`] that accepts any supported volume format.
///
/// Front-matter offsets are kept per volume, so one source serves a whole
/// build.
#[derive(Debug, Clone, Default)]
pub struct VolumeSource {
    first_pages: BTreeMap<VolumeId, usize>,
}

impl VolumeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_first_page(mut self, volume: VolumeId, page: usize) -> Self {
        self.first_pages.insert(volume, page);
        self
    }

    pub fn first_page(&self, volume: VolumeId) -> usize {
        self.first_pages.get(&volume).copied().unwrap_or(1)
    }
}

impl PageSource for VolumeSource {
    fn pages(&self, path: &Path, volume: VolumeId) -> Result<Vec<RawPage>, SourceError> {
        read_volume(path, volume, self.first_page(volume)).map_err(|e| match e {
            IngestError::Source(inner) => inner,
            IngestError::Io(inner) => SourceError::Io(inner),
            other => SourceError::OpenError(other.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_by_extension() {
        assert_eq!(VolumeFormat::detect(Path::new("v1.PDF")).unwrap(), VolumeFormat::Pdf);
        assert_eq!(VolumeFormat::detect(Path::new("v1.txt")).unwrap(), VolumeFormat::Text);
        assert_eq!(
            VolumeFormat::detect(Path::new("cache/v1.jsonl")).unwrap(),
            VolumeFormat::FragmentCache
        );
        assert!(matches!(
            VolumeFormat::detect(Path::new("v1.docx")),
            Err(IngestError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_first_page_defaults_to_one() {
        let source = VolumeSource::new().with_first_page(VolumeId(2), 7);
        assert_eq!(source.first_page(VolumeId(1)), 1);
        assert_eq!(source.first_page(VolumeId(2)), 7);
    }
}
