//! Text cleanup for the merged document stream.
//!
//! Stages, in order, on prose only (table blocks pass through verbatim):
//! character fixes, de-hyphenation, boilerplate removal, then whitespace
//! normalization and paragraph assembly.

use std::collections::{HashMap, HashSet};

use regex::Regex;

use super::stream::{split_blocks, Block, PAGE_BREAK, TABLE_START};
use crate::error::{Error, Result};

/// Boilerplate line patterns used unless configured otherwise.
///
/// Matched against whole trimmed lines. `\d` covers Devanagari digits.
pub const DEFAULT_BOILERPLATE_PATTERNS: &[&str] = &[
    // standalone page numbers, optionally dash-wrapped
    r"^[-–—\s]*\d{1,4}[-–—\s]*$",
    // chapter running heads
    r"^(?:Chapter|CHAPTER|अध्याय)\s+\d+",
    // subject running heads, alone or with a page number
    r"^[\d\s\p{P}]*(?:Science|SCIENCE|Mathematics|MATHEMATICS|Biology|BIOLOGY|विज्ञान|गणित)[\d\s\p{P}]*$",
];

const LIGATURES: &[(char, &str)] = &[
    ('\u{FB00}', "ff"),
    ('\u{FB01}', "fi"),
    ('\u{FB02}', "fl"),
    ('\u{FB03}', "ffi"),
    ('\u{FB04}', "ffl"),
    ('\u{FB05}', "st"),
    ('\u{FB06}', "st"),
];

/// Options for [`TextCleaner`].
#[derive(Debug, Clone)]
pub struct CleanupOptions {
    /// Join `knowl-` / `edge` line pairs
    pub fix_hyphenation: bool,

    /// Remove lines matching `boilerplate_patterns`
    pub remove_page_numbers: bool,

    /// Remove header/footer lines repeated across pages
    pub remove_repeated_edges: bool,

    /// Pages a header/footer line must appear on to be removed (at least 2)
    pub min_edge_repeats: usize,

    /// Non-blank lines at the top and bottom of each page checked for
    /// repeated headers/footers
    pub edge_window: usize,

    /// Regexes for boilerplate lines
    pub boilerplate_patterns: Vec<String>,

    /// Replace Latin ligatures (ﬁ, ﬂ, ...) with their letters
    pub fix_ligatures: bool,

    /// Remove soft hyphens (U+00AD)
    pub remove_soft_hyphens: bool,

    /// Remove the replacement character (U+FFFD)
    pub remove_replacement_char: bool,
}

impl Default for CleanupOptions {
    fn default() -> Self {
        Self {
            fix_hyphenation: true,
            remove_page_numbers: true,
            remove_repeated_edges: true,
            min_edge_repeats: 2,
            edge_window: 2,
            boilerplate_patterns: DEFAULT_BOILERPLATE_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
            fix_ligatures: true,
            remove_soft_hyphens: true,
            remove_replacement_char: true,
        }
    }
}

impl CleanupOptions {
    /// Whitespace and paragraph normalization only.
    pub fn minimal() -> Self {
        Self {
            fix_hyphenation: false,
            remove_page_numbers: false,
            remove_repeated_edges: false,
            fix_ligatures: false,
            remove_soft_hyphens: false,
            remove_replacement_char: false,
            ..Self::default()
        }
    }

    /// Enable or disable de-hyphenation.
    pub fn with_hyphenation(mut self, fix: bool) -> Self {
        self.fix_hyphenation = fix;
        self
    }

    /// Enable or disable all boilerplate removal.
    pub fn with_boilerplate_removal(mut self, remove: bool) -> Self {
        self.remove_page_numbers = remove;
        self.remove_repeated_edges = remove;
        self
    }

    /// Add a boilerplate pattern.
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.boilerplate_patterns.push(pattern.into());
        self
    }

    /// Set the minimum number of pages a repeated edge line must appear on.
    pub fn with_min_edge_repeats(mut self, repeats: usize) -> Self {
        self.min_edge_repeats = repeats.max(2);
        self
    }
}

/// Cleans the merged stream into one paragraph per line.
///
/// Output paragraphs are separated by one blank line; tables keep their
/// lines. Cleaning already cleaned text returns it unchanged.
#[derive(Debug, Clone)]
pub struct TextCleaner {
    options: CleanupOptions,
    patterns: Vec<Regex>,
}

impl TextCleaner {
    /// Build a cleaner, compiling the boilerplate patterns.
    pub fn new(options: CleanupOptions) -> Result<Self> {
        let patterns = options
            .boilerplate_patterns
            .iter()
            .map(|p| Regex::new(p).map_err(|e| Error::InvalidPattern(format!("{p}: {e}"))))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { options, patterns })
    }

    /// Options in use.
    pub fn options(&self) -> &CleanupOptions {
        &self.options
    }

    /// Clean a stream whose pages are separated by form feeds.
    pub fn clean(&self, text: &str) -> String {
        let mut pages: Vec<Vec<Piece>> = text
            .split(PAGE_BREAK)
            .map(|page| self.clean_page(page))
            .collect();

        if self.options.remove_repeated_edges && pages.len() >= self.options.min_edge_repeats {
            self.remove_repeated_edges(&mut pages);
        }

        let mut paragraphs = Vec::new();
        for page in pages {
            assemble_paragraphs(page, &mut paragraphs);
        }
        // A head broken over two lines only matches once joined.
        paragraphs.retain(|p| p.starts_with(TABLE_START) || !self.is_boilerplate(p));
        paragraphs.join("\n\n")
    }

    /// Character fixes, de-hyphenation and pattern removal for one page.
    fn clean_page(&self, page: &str) -> Vec<Piece> {
        let mut pieces = Vec::new();
        for block in split_blocks(page) {
            match block {
                Block::Table(lines) => pieces.push(Piece::Table(lines.join("\n"))),
                Block::Prose(lines) => {
                    let lines: Vec<String> = lines.into_iter().map(|l| self.fix_chars(l)).collect();
                    let lines = if self.options.fix_hyphenation {
                        dehyphenate(lines)
                    } else {
                        lines
                    };
                    pieces.extend(
                        lines
                            .into_iter()
                            .filter(|line| !self.is_boilerplate(line))
                            .map(Piece::Line),
                    );
                }
            }
        }
        pieces
    }

    fn fix_chars(&self, line: &str) -> String {
        let opts = &self.options;
        let mut out = String::with_capacity(line.len());
        for c in line.chars() {
            match c {
                '\u{00AD}' if opts.remove_soft_hyphens => {}
                '\u{FFFD}' if opts.remove_replacement_char => {}
                _ if opts.fix_ligatures => match LIGATURES.iter().find(|(lig, _)| *lig == c) {
                    Some((_, letters)) => out.push_str(letters),
                    None => out.push(c),
                },
                _ => out.push(c),
            }
        }
        out
    }

    fn is_boilerplate(&self, line: &str) -> bool {
        let line = line.trim();
        self.options.remove_page_numbers
            && !line.is_empty()
            && self.patterns.iter().any(|re| re.is_match(line))
    }

    /// Drop lines near the top or bottom of a page that recur in the same
    /// position band on enough pages.
    fn remove_repeated_edges(&self, pages: &mut [Vec<Piece>]) {
        let window = self.options.edge_window;
        let edges: Vec<Vec<usize>> = pages.iter().map(|p| edge_positions(p, window)).collect();

        let mut counts: HashMap<String, usize> = HashMap::new();
        for (page, positions) in pages.iter().zip(&edges) {
            let keys: HashSet<String> = positions
                .iter()
                .filter_map(|&i| page[i].line().map(edge_key))
                .collect();
            for key in keys {
                *counts.entry(key).or_insert(0) += 1;
            }
        }

        let repeated: HashSet<&String> = counts
            .iter()
            .filter(|&(_, &n)| n >= self.options.min_edge_repeats)
            .map(|(key, _)| key)
            .collect();
        if repeated.is_empty() {
            return;
        }
        log::debug!("Removing {} repeated header/footer line(s)", repeated.len());

        for (page, positions) in pages.iter_mut().zip(&edges) {
            for &i in positions {
                let is_repeated = page[i]
                    .line()
                    .map(|line| repeated.contains(&edge_key(line)))
                    .unwrap_or(false);
                if is_repeated {
                    page[i] = Piece::Line(String::new());
                }
            }
        }
    }
}

impl Default for TextCleaner {
    fn default() -> Self {
        Self {
            options: CleanupOptions::default(),
            patterns: DEFAULT_BOILERPLATE_PATTERNS
                .iter()
                .map(|p| Regex::new(p).unwrap())
                .collect(),
        }
    }
}

/// A prose line or a whole table block.
#[derive(Debug, Clone, PartialEq)]
enum Piece {
    Line(String),
    Table(String),
}

impl Piece {
    fn line(&self) -> Option<&str> {
        match self {
            Piece::Line(line) => Some(line),
            Piece::Table(_) => None,
        }
    }
}

/// Join a line ending in `letter-` with a following line that starts with a
/// lowercase letter. Blank lines stop the join.
fn dehyphenate(lines: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    for line in lines {
        if let Some(prev) = out.last_mut() {
            if ends_with_break_hyphen(prev) && starts_lowercase(&line) {
                let stem_len = prev.trim_end().len() - 1;
                prev.truncate(stem_len);
                prev.push_str(line.trim_start());
                continue;
            }
        }
        out.push(line);
    }
    out
}

fn ends_with_break_hyphen(line: &str) -> bool {
    let mut chars = line.trim_end().chars().rev();
    chars.next() == Some('-') && chars.next().is_some_and(char::is_alphabetic)
}

fn starts_lowercase(line: &str) -> bool {
    line.trim_start().chars().next().is_some_and(char::is_lowercase)
}

/// Indices of the first and last `window` non-blank lines of a page.
fn edge_positions(page: &[Piece], window: usize) -> Vec<usize> {
    let lines: Vec<usize> = page
        .iter()
        .enumerate()
        .filter(|(_, p)| p.line().is_some_and(|l| !l.trim().is_empty()))
        .map(|(i, _)| i)
        .collect();

    let head = lines.iter().take(window);
    let tail = lines.iter().rev().take(window);
    let mut positions: Vec<usize> = head.chain(tail).copied().collect();
    positions.sort_unstable();
    positions.dedup();
    positions
}

/// Comparison key for header/footer lines: case, spacing and page numbers
/// do not matter.
fn edge_key(line: &str) -> String {
    let mut key = String::new();
    let mut in_digits = false;
    for word in line.split_whitespace() {
        if !key.is_empty() {
            key.push(' ');
        }
        for c in word.chars().flat_map(char::to_lowercase) {
            if c.is_numeric() {
                if !in_digits {
                    key.push('#');
                }
                in_digits = true;
            } else {
                key.push(c);
                in_digits = false;
            }
        }
        in_digits = false;
    }
    key
}

/// Collapse a page's pieces into paragraphs: whitespace runs become one
/// space, consecutive lines are joined, blank lines and tables end a
/// paragraph.
fn assemble_paragraphs(pieces: Vec<Piece>, out: &mut Vec<String>) {
    fn flush(current: &mut Vec<&str>, out: &mut Vec<String>) {
        if !current.is_empty() {
            out.push(current.join(" "));
            current.clear();
        }
    }

    let mut current: Vec<&str> = Vec::new();

    for piece in &pieces {
        match piece {
            Piece::Table(block) => {
                flush(&mut current, out);
                out.push(block.clone());
            }
            Piece::Line(line) if line.trim().is_empty() => flush(&mut current, out),
            Piece::Line(line) => current.extend(line.split_whitespace()),
        }
    }
    flush(&mut current, out);
}
