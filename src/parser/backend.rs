//! Capability contracts the pipeline depends on.
//!
//! The pipeline never touches a PDF library directly. It asks a
//! [`TextSource`] for reading-order text and a [`TableSource`] for table
//! regions, page by page. [`PdfDocument`](super::PdfDocument) implements
//! both on top of lopdf; tests plug in their own.

use crate::error::Result;
use crate::model::{SegmentAnchor, TableRegion};

/// Lazy sequence of tables on one page, in top-to-bottom detection order.
pub type TableIter<'a> = Box<dyn Iterator<Item = TableRegion> + 'a>;

/// Reading-order text for one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageText {
    /// Text with segments separated by blank lines
    pub text: String,

    /// Vertical extent of each segment; empty when positions are unknown
    pub anchors: Vec<SegmentAnchor>,

    /// Page height in points
    pub height: Option<f32>,
}

impl PageText {
    /// Text without position information.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// "Page → reading-order string".
pub trait TextSource {
    /// Number of pages in the document.
    fn page_count(&self) -> usize;

    /// Text of the page at `index` (0-based), top-to-bottom and
    /// left-to-right within columns.
    ///
    /// Fails with [`Error::PageTextExtraction`](crate::Error::PageTextExtraction)
    /// when the page content cannot be read.
    fn reading_order_text(&self, index: usize) -> Result<PageText>;
}

/// "Find tables on page → rows of cells".
pub trait TableSource {
    /// Tables on the page at `index` (0-based).
    ///
    /// A page without tables yields an empty iterator. Malformed content
    /// fails with [`Error::PageTableDetection`](crate::Error::PageTableDetection).
    fn find_tables(&self, index: usize) -> Result<TableIter<'_>>;
}
