//! PDF access: the two capability contracts and their lopdf implementation.

mod backend;
mod layout;
mod pdf_parser;
mod table_detector;

pub use backend::{PageText, TableIter, TableSource, TextSource};
pub use layout::{Column, LayoutAnalyzer, TextBlock, TextLine, TextSpan};
pub use pdf_parser::PdfDocument;
pub use table_detector::{DetectedTable, TableDetector, TableDetectorConfig, TableRowData};
