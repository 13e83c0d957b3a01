//! Table serialization to sentinel-fenced Markdown.

use std::fmt;

use super::stream::{TABLE_END, TABLE_START};
use crate::model::TableRegion;

/// Stand-in for `|` inside cells, so rows still split into the right
/// number of cells.
pub const PIPE_SUBSTITUTE: char = '¦';

/// A table rendered as one text block, sentinels included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedTable {
    block: String,
    columns: usize,
}

impl SerializedTable {
    /// The block text, without a trailing newline.
    pub fn as_str(&self) -> &str {
        &self.block
    }

    /// Number of cells in every Markdown row.
    pub fn column_count(&self) -> usize {
        self.columns
    }

    /// Markdown rows between the sentinels.
    pub fn table_lines(&self) -> impl Iterator<Item = &str> {
        self.block
            .lines()
            .filter(|line| *line != TABLE_START && *line != TABLE_END)
    }

    /// Consume into the block text.
    pub fn into_string(self) -> String {
        self.block
    }
}

impl fmt::Display for SerializedTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.block)
    }
}

/// Renders [`TableRegion`]s as Markdown tables between `[TABLE START]` and
/// `[TABLE END]`.
///
/// Row 0 is the header. Cell text is kept as detected apart from pipe
/// escaping and flattening line breaks to spaces.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableSerializer;

impl TableSerializer {
    /// Create a serializer.
    pub fn new() -> Self {
        Self
    }

    /// Serialize one region.
    ///
    /// A region without rows still yields a header and separator row (one
    /// blank column when the width is unknown).
    pub fn serialize(&self, region: &TableRegion) -> SerializedTable {
        let columns = region.column_count().max(1);
        let mut lines = vec![TABLE_START.to_string()];

        let mut rows = region.rows().iter();
        let header = rows.next().cloned().unwrap_or_else(|| vec![String::new(); columns]);
        lines.push(markdown_row(&header));
        lines.push(markdown_row(&vec!["---".to_string(); columns]));
        lines.extend(rows.map(|row| markdown_row(row)));

        lines.push(TABLE_END.to_string());

        SerializedTable {
            block: lines.join("\n"),
            columns,
        }
    }
}

fn markdown_row(cells: &[String]) -> String {
    let cells: Vec<String> = cells.iter().map(|cell| escape_cell(cell)).collect();
    format!("| {} |", cells.join(" | "))
}

fn escape_cell(cell: &str) -> String {
    cell.chars()
        .map(|c| match c {
            '|' => PIPE_SUBSTITUTE,
            '\n' | '\r' => ' ',
            other => other,
        })
        .collect()
}
