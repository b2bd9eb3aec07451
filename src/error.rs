//! Error types for the exporter.

use crate::types::Format;
use thiserror::Error;

/// Result type alias using ExportError.
pub type Result<T> = std::result::Result<T, ExportError>;

/// Main error type for export operations.
///
/// Authoring calls never produce these — they follow the silent
/// `bool`/`Option` contract instead. Errors surface from the export task,
/// through [`ExportContext::wait`](crate::ExportContext::wait) or a direct
/// [`write_scene`](crate::export::write_scene) call.
#[derive(Error, Debug)]
pub enum ExportError {
    /// I/O error while writing the output file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse JSON export options.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The requested format has no writer capability.
    #[error("unsupported output format: {0:?}")]
    UnsupportedFormat(Format),

    /// The background export task panicked.
    #[error("export task panicked")]
    TaskPanicked,
}
