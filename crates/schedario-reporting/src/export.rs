use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use schedario_core::{CanonicalMapping, Diagnostics, DiagnosticSummary, Entry};
use serde::Serialize;
use tracing::info;

use crate::ReportError;

/// Shape of the persisted mapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportFormat {
    /// `{"headword": "definition" | "v. target"}`
    #[default]
    Flat,
    /// Every entry field, keyed by headword.
    Detailed,
}

/// Serialize the mapping. Keys come out in lexicographic order and the
/// document ends with a newline, so two runs over the same input produce
/// byte-identical files.
pub fn export_json(mapping: &CanonicalMapping, format: ExportFormat) -> Result<String, ReportError> {
    let mut out = match format {
        ExportFormat::Flat => serde_json::to_string_pretty(&mapping.to_flat())?,
        ExportFormat::Detailed => serde_json::to_string_pretty(mapping)?,
    };
    out.push('\n');
    Ok(out)
}

/// Write the mapping to `path`, replacing any existing file.
pub fn write_mapping(
    mapping: &CanonicalMapping,
    format: ExportFormat,
    path: &Path,
) -> Result<(), ReportError> {
    let content = export_json(mapping, format)?;
    let mut file = std::fs::File::create(path)?;
    file.write_all(content.as_bytes())?;
    info!(path = %path.display(), headwords = mapping.len(), "wrote mapping");
    Ok(())
}

/// Load a persisted mapping back into its flat form.
///
/// Accepts both export formats: detailed entries are rendered the same way
/// the flat export renders them.
pub fn read_flat_mapping(path: &Path) -> Result<BTreeMap<String, String>, ReportError> {
    let content = std::fs::read_to_string(path)?;
    parse_flat_mapping(&content)
}

pub fn parse_flat_mapping(content: &str) -> Result<BTreeMap<String, String>, ReportError> {
    let raw: BTreeMap<String, serde_json::Value> = serde_json::from_str(content)?;
    raw.into_iter()
        .map(|(headword, value)| {
            let rendered = match value {
                serde_json::Value::String(s) => s,
                other => serde_json::from_value::<Entry>(other)?.rendered(),
            };
            Ok::<_, ReportError>((headword, rendered))
        })
        .collect()
}

#[derive(Serialize)]
struct DiagnosticsReport<'a> {
    summary: DiagnosticSummary,
    diagnostics: &'a Diagnostics,
}

/// Serialize the run's diagnostics with their per-kind counts.
pub fn export_diagnostics(diagnostics: &Diagnostics) -> Result<String, ReportError> {
    let report = DiagnosticsReport {
        summary: diagnostics.summary(),
        diagnostics,
    };
    let mut out = serde_json::to_string_pretty(&report)?;
    out.push('\n');
    Ok(out)
}

pub fn write_diagnostics(diagnostics: &Diagnostics, path: &Path) -> Result<(), ReportError> {
    std::fs::write(path, export_diagnostics(diagnostics)?)?;
    Ok(())
}
