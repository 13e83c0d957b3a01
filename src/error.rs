//! Error types for ncert-extract.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while extracting a textbook.
///
/// Only the opening and argument errors abort a run. The `Page*` kinds and
/// `NormalizationBackendUnavailable` are recovered by the pipeline and show
/// up in the run report instead.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The input document does not exist.
    #[error("Source not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// The file format is not recognized as PDF.
    #[error("Unknown file format: not a valid PDF")]
    UnknownFormat,

    /// The PDF version is not supported.
    #[error("Unsupported PDF version: {0}")]
    UnsupportedVersion(String),

    /// Error parsing PDF structure.
    #[error("PDF parsing error: {0}")]
    PdfParse(String),

    /// The PDF document is encrypted.
    #[error("Document is encrypted")]
    Encrypted,

    /// Table detection failed on one page.
    #[error("Table detection failed on page {page}: {reason}")]
    PageTableDetection {
        /// 1-based page number
        page: usize,
        /// Backend message
        reason: String,
    },

    /// Reading-order text extraction failed on one page.
    #[error("Text extraction failed on page {page}: {reason}")]
    PageTextExtraction {
        /// 1-based page number
        page: usize,
        /// Backend message
        reason: String,
    },

    /// The Devanagari normalization backend cannot be used.
    #[error("Normalization backend unavailable: {0}")]
    NormalizationBackendUnavailable(String),

    /// Language tag other than `en` / `hi`.
    #[error("Unsupported language: {0} (expected 'en' or 'hi')")]
    UnsupportedLanguage(String),

    /// A configured boilerplate pattern is not a valid regex.
    #[error("Invalid boilerplate pattern: {0}")]
    InvalidPattern(String),

    /// Invalid page range specification.
    #[error("Invalid page range: {0}")]
    InvalidPageRange(String),
}

impl Error {
    /// Whether the pipeline recovers from this error instead of aborting.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::PageTableDetection { .. }
                | Error::PageTextExtraction { .. }
                | Error::NormalizationBackendUnavailable(_)
        )
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::PdfParse(err.to_string()),
        }
    }
}
