//! # ncert-extract
//!
//! Turns bilingual (English/Hindi) textbook PDFs into clean, line-oriented
//! text for sentence alignment and translation corpora.
//!
//! Each page is read twice: once as reading-order prose and once for
//! tables. The two views are merged so every table lands where it sits on
//! the page, as a Markdown table between `[TABLE START]` and `[TABLE END]`.
//! The whole document is then de-hyphenated, stripped of page numbers and
//! running heads, and, for Hindi, normalized to Devanagari conventions.
//!
//! ## Quick Start
//!
//! ```no_run
//! use ncert_extract::{extract_file, Language};
//!
//! fn main() -> ncert_extract::Result<()> {
//!     let report = extract_file("science_ch1.pdf", "science_ch1.txt", Language::Hindi)?;
//!     println!("{report}");
//!     Ok(())
//! }
//! ```
//!
//! ## Custom sources
//!
//! The [`Pipeline`] only needs a [`TextSource`] and a [`TableSource`], so
//! other extraction backends can be plugged in:
//!
//! ```no_run
//! use ncert_extract::{ExtractOptions, Pipeline, PdfDocument};
//!
//! # fn main() -> ncert_extract::Result<()> {
//! let pdf = PdfDocument::open("book.pdf")?;
//! let pipeline = Pipeline::new(ExtractOptions::default())?;
//! let output = pipeline.run(&pdf, &pdf);
//! print!("{}", output.artifact());
//! # Ok(())
//! # }
//! ```

pub mod detect;
pub mod error;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod render;

pub use detect::{is_pdf, probe_source};
pub use error::{Error, Result};
pub use model::{BoundingBox, Language, Metadata, Page, SegmentAnchor, TableRegion};
pub use parser::{PageText, PdfDocument, TableDetectorConfig, TableSource, TextSource};
pub use pipeline::{ExtractOptions, ExtractionOutput, Pipeline};
pub use render::{
    CleanupOptions, ExtractionReport, MergeOptions, PageSelection, ScriptNormalizer,
    StreamMerger, TableSerializer, TextCleaner,
};

use std::path::Path;

/// Extract `input` to `output` with default options for `language`.
///
/// # Example
///
/// ```no_run
/// use ncert_extract::{extract_file, Language};
///
/// let report = extract_file("chapter.pdf", "chapter.txt", Language::English).unwrap();
/// assert!(report.pages_processed > 0);
/// ```
pub fn extract_file<P, Q>(input: P, output: Q, language: Language) -> Result<ExtractionReport>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let options = ExtractOptions::new().with_language(language);
    Pipeline::new(options)?.extract_file(input, output)
}

/// Extract a PDF and return the cleaned text without writing a file.
///
/// # Example
///
/// ```no_run
/// use ncert_extract::{extract_text, Language};
///
/// let text = extract_text("chapter.pdf", Language::English).unwrap();
/// println!("{text}");
/// ```
pub fn extract_text<P: AsRef<Path>>(path: P, language: Language) -> Result<String> {
    let pdf = PdfDocument::open(path)?;
    let pipeline = Pipeline::new(ExtractOptions::new().with_language(language))?;
    Ok(pipeline.extract_pdf(&pdf, |_, _| {}).artifact())
}

/// Extract a PDF held in memory.
pub fn extract_bytes(data: &[u8], options: ExtractOptions) -> Result<ExtractionOutput> {
    let pdf = PdfDocument::from_bytes(data)?.with_table_config(options.table.clone());
    let pipeline = Pipeline::new(options)?;
    Ok(pipeline.extract_pdf(&pdf, |_, _| {}))
}
