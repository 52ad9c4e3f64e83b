use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, SplitError>;

/// Error type covering the different failure cases that can occur when the
/// tool validates, splits, or persists workbooks.
#[derive(Debug, Error)]
pub enum SplitError {
    /// Wrapper for IO failures such as reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when the source workbook cannot be opened or parsed.
    #[error("source workbook could not be read: {0}")]
    InvalidFormat(#[from] calamine::XlsxError),

    /// Raised when a workbook does not follow the expected conventions.
    #[error("invalid workbook structure: {0}")]
    InvalidWorkbook(String),

    /// Raised when the source holds fewer sheets than the fixed schema.
    #[error("source workbook has {found} sheet(s), at least {required} required")]
    Schema { found: usize, required: usize },

    /// Errors bubbled up from the Excel writer implementation.
    #[error("Excel write error: {0}")]
    ExcelWrite(#[from] rust_xlsxwriter::XlsxError),

    /// Raised when one row's output workbook cannot be persisted.
    #[error("failed to persist '{}': {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: Box<SplitError>,
    },

    /// Raised when the collision policy forbids reusing an output name.
    #[error("output file already exists: {}", .0.display())]
    OutputExists(PathBuf),

    /// Raised when the behaviour tables are internally inconsistent.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Raised when JSON parsing or serialization fails.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Raised when the user provides a path that does not exist.
    #[error("input file not found: {}", .0.display())]
    MissingInput(PathBuf),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}
