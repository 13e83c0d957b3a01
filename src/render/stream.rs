//! Conventions of the merged text stream.
//!
//! Tables travel through the stream as blocks bounded by sentinel lines and
//! must reach the output untouched. Every stage that rewrites prose splits
//! the stream into [`Block`]s first and leaves table blocks alone.

/// First line of an embedded table block.
pub const TABLE_START: &str = "[TABLE START]";

/// Last line of an embedded table block.
pub const TABLE_END: &str = "[TABLE END]";

/// Separates pages in the accumulated stream before cleaning.
pub const PAGE_BREAK: char = '\x0C';

/// A run of lines that is either prose or one table block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block<'a> {
    /// Consecutive non-table lines, blank lines included
    Prose(Vec<&'a str>),
    /// Lines from `[TABLE START]` through `[TABLE END]`
    Table(Vec<&'a str>),
}

impl<'a> Block<'a> {
    /// Lines of the block.
    pub fn lines(&self) -> &[&'a str] {
        match self {
            Block::Prose(lines) | Block::Table(lines) => lines,
        }
    }

    /// Check if this is a table block.
    pub fn is_table(&self) -> bool {
        matches!(self, Block::Table(_))
    }
}

/// Split text into prose and table blocks.
///
/// Joining all block lines with `\n` gives back the input exactly. A table
/// block without an end sentinel runs to the end of the text.
pub fn split_blocks(text: &str) -> Vec<Block<'_>> {
    let mut blocks = Vec::new();
    let mut prose: Vec<&str> = Vec::new();
    let mut table: Option<Vec<&str>> = None;

    for line in text.split('\n') {
        match table.as_mut() {
            Some(lines) => {
                lines.push(line);
                if line.trim() == TABLE_END {
                    blocks.push(Block::Table(table.take().unwrap_or_default()));
                }
            }
            None if line.trim() == TABLE_START => {
                if !prose.is_empty() {
                    blocks.push(Block::Prose(std::mem::take(&mut prose)));
                }
                table = Some(vec![line]);
            }
            None => prose.push(line),
        }
    }

    if let Some(lines) = table {
        blocks.push(Block::Table(lines));
    }
    if !prose.is_empty() {
        blocks.push(Block::Prose(prose));
    }

    blocks
}

/// Apply `f` to every prose line, leaving table blocks untouched.
pub fn map_prose_lines<F>(text: &str, mut f: F) -> String
where
    F: FnMut(&str) -> String,
{
    let mut out: Vec<String> = Vec::new();
    for block in split_blocks(text) {
        match block {
            Block::Prose(lines) => out.extend(lines.into_iter().map(&mut f)),
            Block::Table(lines) => out.extend(lines.into_iter().map(str::to_string)),
        }
    }
    out.join("\n")
}
