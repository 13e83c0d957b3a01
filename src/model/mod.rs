//! Data model shared by the extraction stages.
//!
//! A [`Page`] is built by the pipeline from the two capability sources,
//! consumed by the merger, and discarded. [`TableRegion`]s are owned by
//! their page until serialized.

mod language;
mod metadata;
mod page;
mod table;

pub use language::Language;
pub use metadata::Metadata;
pub use page::{Page, SegmentAnchor};
pub use table::{BoundingBox, TableRegion};

pub(crate) use metadata::parse_pdf_date;
