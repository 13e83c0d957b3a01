//! Stages that turn per-page text and tables into the final stream.
//!
//! Per page: [`TableSerializer`] and [`StreamMerger`]. Once per document:
//! [`TextCleaner`] then [`ScriptNormalizer`].

mod cleanup;
mod merge;
mod options;
mod result;
mod script;
mod stream;
mod table;

pub use cleanup::{CleanupOptions, TextCleaner, DEFAULT_BOILERPLATE_PATTERNS};
pub use merge::{MergeOptions, MergedStream, StreamMerger};
pub use options::PageSelection;
pub use result::{DegradedCapability, ExtractionReport, PageWarning, WarningStage};
#[cfg(feature = "script-backend")]
pub use script::UnicodeScriptBackend;
pub use script::{ScriptBackend, ScriptNormalizer};
pub use stream::{map_prose_lines, split_blocks, Block, PAGE_BREAK, TABLE_END, TABLE_START};
pub use table::{SerializedTable, TableSerializer, PIPE_SUBSTITUTE};
