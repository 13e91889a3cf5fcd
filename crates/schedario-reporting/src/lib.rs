use thiserror::Error;

pub mod diff;
pub mod export;

pub use diff::{diff_mappings, Change, MappingDiff};
pub use export::{
    export_diagnostics, export_json, parse_flat_mapping, read_flat_mapping, write_diagnostics,
    write_mapping, ExportFormat,
};

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
