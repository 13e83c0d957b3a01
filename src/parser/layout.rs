//! Layout analysis for PDF pages.
//!
//! Text is pulled out of the content stream as positioned spans, grouped into
//! lines (column-aware), and the lines into blocks. Blocks become the
//! blank-line separated segments of a page's reading-order text, each with a
//! vertical anchor so tables can be slotted in at the right place.

use std::collections::BTreeMap;

use lopdf::content::Content;
use lopdf::{Dictionary, Document as LopdfDocument, Encoding, Object, ObjectId};

use super::backend::PageText;
use crate::error::{Error, Result};
use crate::model::SegmentAnchor;

/// Glyph width estimate as a fraction of the font size.
const CHAR_WIDTH_RATIO: f32 = 0.5;

/// Widest text area searched for a column gutter, in points (A0 is 2384).
const MAX_TEXT_WIDTH: f32 = 14_400.0;

/// TJ adjustment (thousandths of an em) treated as a word space.
const TJ_SPACE_THRESHOLD: f32 = 200.0;

/// A run of text drawn at one position with one font.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    /// The text content
    pub text: String,
    /// X position (left edge)
    pub x: f32,
    /// Y position (baseline, PDF space: grows upward)
    pub y: f32,
    /// Estimated advance width
    pub width: f32,
    /// Font size in points
    pub font_size: f32,
}

impl TextSpan {
    /// Create a span; the width is estimated from the character count.
    pub fn new(text: impl Into<String>, x: f32, y: f32, font_size: f32) -> Self {
        let text = text.into();
        let width = text.chars().count() as f32 * font_size * CHAR_WIDTH_RATIO;
        Self {
            text,
            x,
            y,
            width,
            font_size,
        }
    }

    /// Right edge.
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Approximate descender line, PDF space.
    pub fn bottom(&self) -> f32 {
        self.y - self.font_size * 0.2
    }

    /// Approximate ascender line, PDF space.
    pub fn top(&self) -> f32 {
        self.y + self.font_size * 0.8
    }
}

/// Spans sharing a baseline.
#[derive(Debug, Clone)]
pub struct TextLine {
    /// Spans sorted by X
    pub spans: Vec<TextSpan>,
    /// Baseline
    pub y: f32,
    /// Leftmost X
    pub x: f32,
    /// Character-weighted font size
    pub font_size: f32,
}

impl TextLine {
    /// Build a line; `spans` must not be empty.
    pub fn from_spans(mut spans: Vec<TextSpan>) -> Self {
        spans.sort_by(|a, b| a.x.total_cmp(&b.x));

        let total_chars: usize = spans.iter().map(|s| s.text.chars().count()).sum();
        let weighted: f32 = spans
            .iter()
            .map(|s| s.font_size * s.text.chars().count() as f32)
            .sum();
        let font_size = match (total_chars, spans.first()) {
            (0, Some(first)) => first.font_size,
            (0, None) => 0.0,
            (n, _) => weighted / n as f32,
        };

        let (x, y) = spans.first().map(|s| (s.x, s.y)).unwrap_or_default();
        Self {
            spans,
            y,
            x,
            font_size,
        }
    }

    /// Line text, with a space wherever the gap between spans is wider than
    /// a fraction of a glyph.
    pub fn text(&self) -> String {
        let mut result = String::new();
        let mut prev: Option<&TextSpan> = None;

        for span in &self.spans {
            if let Some(prev) = prev {
                let gap = span.x - prev.right();
                let threshold = span.font_size * CHAR_WIDTH_RATIO * 0.2;
                let spaced = result.ends_with(char::is_whitespace)
                    || span.text.starts_with(char::is_whitespace);
                if gap > threshold && !spaced {
                    result.push(' ');
                }
            }
            result.push_str(&span.text);
            prev = Some(span);
        }

        result
    }

    fn top(&self) -> f32 {
        self.spans
            .iter()
            .map(TextSpan::top)
            .fold(self.y, f32::max)
    }

    fn bottom(&self) -> f32 {
        self.spans
            .iter()
            .map(TextSpan::bottom)
            .fold(self.y, f32::min)
    }
}

/// Consecutive lines forming one paragraph-like segment.
#[derive(Debug, Clone)]
pub struct TextBlock {
    /// Lines, top to bottom
    pub lines: Vec<TextLine>,
}

impl TextBlock {
    /// Block text with one line per output line.
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(TextLine::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Vertical extent measured from the top of a page of `page_height`.
    pub fn anchor(&self, page_height: f32) -> SegmentAnchor {
        let top = self.lines.iter().map(TextLine::top).fold(f32::MIN, f32::max);
        let bottom = self
            .lines
            .iter()
            .map(TextLine::bottom)
            .fold(f32::MAX, f32::min);
        SegmentAnchor {
            top: page_height - top,
            bottom: page_height - bottom,
        }
    }
}

/// A detected text column.
#[derive(Debug, Clone)]
pub struct Column {
    /// Left boundary
    pub left: f32,
    /// Right boundary
    pub right: f32,
    /// Column index (0 = leftmost)
    pub index: usize,
}

impl Column {
    /// Check if an X coordinate falls within this column.
    pub fn contains(&self, x: f32) -> bool {
        x >= self.left && x <= self.right
    }

    /// A span belongs to a column if its left edge or its center does.
    pub fn contains_span(&self, span: &TextSpan) -> bool {
        self.contains(span.x) || self.contains(span.x + span.width / 2.0)
    }
}

/// Turns page content into positioned spans and reading-order text.
pub struct LayoutAnalyzer<'a> {
    doc: &'a LopdfDocument,
}

impl<'a> LayoutAnalyzer<'a> {
    /// Create an analyzer over a loaded document.
    pub fn new(doc: &'a LopdfDocument) -> Self {
        Self { doc }
    }

    /// Extract positioned spans from one page.
    pub fn page_spans(&self, page_id: ObjectId) -> Result<Vec<TextSpan>> {
        let fonts = self.doc.get_page_fonts(page_id)?;
        let content = self.doc.get_page_content(page_id)?;
        let content = Content::decode(&content).map_err(|e| Error::PdfParse(e.to_string()))?;

        let mut collector = SpanCollector::new(self.doc, &fonts);
        for op in &content.operations {
            collector.apply(&op.operator, &op.operands);
        }
        Ok(collector.spans)
    }

    /// Arrange spans into reading-order text for a page of `page_height`.
    pub fn reading_order(&self, spans: Vec<TextSpan>, page_height: f32) -> PageText {
        let blocks = group_lines_into_blocks(group_spans_into_lines(spans));

        let text = blocks
            .iter()
            .map(TextBlock::text)
            .collect::<Vec<_>>()
            .join("\n\n");
        let anchors = blocks.iter().map(|b| b.anchor(page_height)).collect();

        PageText {
            text,
            anchors,
            height: Some(page_height),
        }
    }
}

/// Content-stream interpreter state for text operators.
struct SpanCollector<'a> {
    doc: &'a LopdfDocument,
    fonts: &'a BTreeMap<Vec<u8>, &'a Dictionary>,
    font: Vec<u8>,
    font_size: f32,
    leading: f32,
    matrix: TextMatrix,
    in_text: bool,
    spans: Vec<TextSpan>,
}

impl<'a> SpanCollector<'a> {
    fn new(doc: &'a LopdfDocument, fonts: &'a BTreeMap<Vec<u8>, &'a Dictionary>) -> Self {
        Self {
            doc,
            fonts,
            font: Vec::new(),
            font_size: 12.0,
            leading: 0.0,
            matrix: TextMatrix::default(),
            in_text: false,
            spans: Vec::new(),
        }
    }

    fn apply(&mut self, operator: &str, operands: &[Object]) {
        let num = |i: usize, default: f32| operands.get(i).and_then(get_number).unwrap_or(default);

        match operator {
            "BT" => {
                self.in_text = true;
                self.matrix = TextMatrix::default();
            }
            "ET" => self.in_text = false,
            "Tf" => {
                if let Some(Object::Name(name)) = operands.first() {
                    self.font = name.clone();
                }
                self.font_size = num(1, 12.0);
            }
            "TL" => self.leading = num(0, 0.0),
            "Td" => self.matrix.translate(num(0, 0.0), num(1, 0.0)),
            "TD" => {
                let ty = num(1, 0.0);
                self.leading = -ty;
                self.matrix.translate(num(0, 0.0), ty);
            }
            "Tm" => {
                self.matrix = TextMatrix::new(
                    num(0, 1.0),
                    num(1, 0.0),
                    num(2, 0.0),
                    num(3, 1.0),
                    num(4, 0.0),
                    num(5, 0.0),
                );
            }
            "T*" => self.next_line(),
            "Tj" => {
                if let Some(Object::String(bytes, _)) = operands.first() {
                    let text = self.decode(bytes);
                    self.push(text);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = operands.first() {
                    let text = self.decode_array(items);
                    self.push(text);
                }
            }
            "'" | "\"" => {
                self.next_line();
                let index = if operator == "\"" { 2 } else { 0 };
                if let Some(Object::String(bytes, _)) = operands.get(index) {
                    let text = self.decode(bytes);
                    self.push(text);
                }
            }
            _ => {}
        }
    }

    fn next_line(&mut self) {
        let leading = if self.leading > 0.0 {
            self.leading
        } else {
            self.font_size * 1.2
        };
        self.matrix.translate(0.0, -leading);
    }

    fn decode(&self, bytes: &[u8]) -> String {
        let encoding = self
            .fonts
            .get(&self.font)
            .and_then(|font| font.get_font_encoding(self.doc).ok());
        let Some(enc) = encoding else {
            return decode_text_simple(bytes);
        };
        match LopdfDocument::decode_text(&enc, bytes) {
            Ok(text) => text,
            Err(e) => {
                log::debug!(
                    "Font {}: {:?} not decodable ({}), using fallback",
                    String::from_utf8_lossy(&self.font),
                    enc,
                    e
                );
                match enc {
                    Encoding::SimpleEncoding(name) if is_unicode_cmap(name) => {
                        decode_utf16_be(bytes)
                    }
                    _ => decode_text_simple(bytes),
                }
            }
        }
    }

    fn decode_array(&self, items: &[Object]) -> String {
        let mut combined = String::new();
        for item in items {
            match item {
                Object::String(bytes, _) => combined.push_str(&self.decode(bytes)),
                other => {
                    let adjustment = get_number(other).map(|n| -n).unwrap_or(0.0);
                    if adjustment > TJ_SPACE_THRESHOLD
                        && !combined.is_empty()
                        && !combined.ends_with(char::is_whitespace)
                    {
                        combined.push(' ');
                    }
                }
            }
        }
        combined
    }

    fn push(&mut self, text: String) {
        if !self.in_text || text.trim().is_empty() {
            return;
        }
        let (x, y) = self.matrix.position();
        let size = self.font_size * self.matrix.scale();
        self.spans.push(TextSpan::new(text, x, y, size));
    }
}

/// Text matrix; the line matrix is implicit because shown text does not
/// advance it here.
#[derive(Debug, Clone)]
struct TextMatrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Default for TextMatrix {
    fn default() -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    }
}

impl TextMatrix {
    fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    fn translate(&mut self, tx: f32, ty: f32) {
        self.e += tx * self.a + ty * self.c;
        self.f += tx * self.b + ty * self.d;
    }

    fn position(&self) -> (f32, f32) {
        (self.e, self.f)
    }

    fn scale(&self) -> f32 {
        let scale = (self.b * self.b + self.d * self.d).sqrt();
        if scale > 0.0 {
            scale
        } else {
            1.0
        }
    }
}

/// Find at most two columns by looking for a vertical gutter of empty space
/// near the middle of the text area.
pub(crate) fn detect_columns(spans: &[TextSpan]) -> Vec<Column> {
    let min_x = spans.iter().map(|s| s.x).fold(f32::MAX, f32::min);
    let max_x = spans.iter().map(TextSpan::right).fold(f32::MIN, f32::max);
    let single = || {
        vec![Column {
            left: min_x - 10.0,
            right: max_x + 10.0,
            index: 0,
        }]
    };

    if spans.is_empty() {
        return vec![];
    }
    let text_width = max_x - min_x;
    if !(250.0..=MAX_TEXT_WIDTH).contains(&text_width) {
        return single();
    }

    const SLICE: f32 = 3.0;
    let slices = (text_width / SLICE) as usize + 1;
    let mut occupancy = vec![0usize; slices];
    for span in spans {
        let first = ((span.x - min_x) / SLICE) as usize;
        let last = ((span.right() - min_x) / SLICE) as usize;
        for slot in occupancy.iter_mut().take(last.min(slices - 1) + 1).skip(first) {
            *slot += 1;
        }
    }

    // Empty runs inside the central 70% of the text area.
    let window = slices * 15 / 100..slices * 85 / 100;
    let mut gaps: Vec<(usize, usize)> = Vec::new();
    let mut run: Option<usize> = None;
    for i in window.clone() {
        match (occupancy[i] == 0, run) {
            (true, None) => run = Some(i),
            (false, Some(start)) => {
                gaps.push((start, i - start));
                run = None;
            }
            _ => {}
        }
    }
    if let Some(start) = run {
        gaps.push((start, window.end - start));
    }

    let center = slices as f32 / 2.0;
    let mut best: Option<(usize, usize)> = None;
    for (start, len) in gaps.into_iter().filter(|&(_, len)| len as f32 * SLICE >= 10.0) {
        let dist = (start as f32 + len as f32 / 2.0 - center).abs();
        let better = match best {
            None => true,
            Some((b_start, b_len)) => {
                let b_dist = (b_start as f32 + b_len as f32 / 2.0 - center).abs();
                len as f32 > b_len as f32 * 1.5 || (len as f32 >= b_len as f32 * 0.7 && dist < b_dist)
            }
        };
        if better {
            best = Some((start, len));
        }
    }

    let Some((start, len)) = best.filter(|&(_, len)| len as f32 * SLICE >= 12.0) else {
        return single();
    };
    let gutter = min_x + (start as f32 + len as f32 / 2.0) * SLICE;
    log::debug!("Column gutter at x={:.1} ({:.1}pt wide)", gutter, len as f32 * SLICE);

    if gutter - min_x < 80.0 || max_x - gutter < 80.0 {
        return single();
    }

    let left = spans
        .iter()
        .filter(|s| s.x + s.width / 2.0 < gutter)
        .count();
    let right = spans.len() - left;
    let min_spans = (spans.len() / 10).max(2);
    if left < min_spans || right < min_spans {
        log::debug!("Column spans imbalanced ({} / {}), single column", left, right);
        return single();
    }

    vec![
        Column {
            left: min_x - 10.0,
            right: gutter,
            index: 0,
        },
        Column {
            left: gutter,
            right: max_x + 10.0,
            index: 1,
        },
    ]
}

/// Group spans into lines. In a two-column layout the left column is read
/// completely before the right one.
pub(crate) fn group_spans_into_lines(spans: Vec<TextSpan>) -> Vec<TextLine> {
    let columns = detect_columns(&spans);
    if columns.len() <= 1 {
        return group_column(spans);
    }

    let mut per_column: Vec<Vec<TextSpan>> = vec![Vec::new(); columns.len()];
    for span in spans {
        let index = columns
            .iter()
            .position(|c| c.contains_span(&span))
            .unwrap_or(0);
        per_column[index].push(span);
    }

    per_column.into_iter().flat_map(group_column).collect()
}

/// Y-based line grouping within one column.
fn group_column(mut spans: Vec<TextSpan>) -> Vec<TextLine> {
    spans.sort_by(|a, b| b.y.total_cmp(&a.y).then(a.x.total_cmp(&b.x)));

    let mut lines = Vec::new();
    let mut current: Vec<TextSpan> = Vec::new();
    let mut baseline = f32::NAN;

    for span in spans {
        if !current.is_empty() && (span.y - baseline).abs() > span.font_size * 0.3 {
            lines.push(TextLine::from_spans(std::mem::take(&mut current)));
        }
        if current.is_empty() {
            baseline = span.y;
        }
        current.push(span);
    }
    if !current.is_empty() {
        lines.push(TextLine::from_spans(current));
    }

    lines
}

/// Split lines into blocks at paragraph gaps, font changes, indentation
/// changes and column jumps.
pub(crate) fn group_lines_into_blocks(lines: Vec<TextLine>) -> Vec<TextBlock> {
    let avg_spacing = average_line_spacing(&lines);
    let mut blocks = Vec::new();
    let mut current: Vec<TextLine> = Vec::new();

    for line in lines {
        if let Some(prev) = current.last() {
            if should_break_block(prev, &line, avg_spacing) {
                blocks.push(TextBlock {
                    lines: std::mem::take(&mut current),
                });
            }
        }
        current.push(line);
    }
    if !current.is_empty() {
        blocks.push(TextBlock { lines: current });
    }

    blocks
}

fn average_line_spacing(lines: &[TextLine]) -> f32 {
    let spacings: Vec<f32> = lines
        .windows(2)
        .map(|w| w[0].y - w[1].y)
        .filter(|s| *s > 0.1)
        .collect();
    if spacings.is_empty() {
        return 12.0;
    }
    spacings.iter().sum::<f32>() / spacings.len() as f32
}

fn should_break_block(prev: &TextLine, curr: &TextLine, avg_spacing: f32) -> bool {
    let spacing = prev.y - curr.y;
    // Moving up the page means a new column started.
    spacing < 0.0
        || spacing > avg_spacing * 1.5
        || spacing > prev.font_size.max(curr.font_size) * 2.0
        || (prev.font_size - curr.font_size).abs() > 1.0
        || (prev.x - curr.x).abs() > 20.0
}

pub(crate) fn get_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Decoding fallback for fonts without a usable encoding.
pub(crate) fn decode_text_simple(bytes: &[u8]) -> String {
    if let [0xFE, 0xFF, rest @ ..] = bytes {
        return decode_utf16_be(rest);
    }

    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// Predefined CMaps whose codes are UCS-2 / UTF-16BE (`UniKS-UCS2-H`,
/// `UniJIS-UTF16-V`, ...).
fn is_unicode_cmap(name: &str) -> bool {
    name.starts_with("Uni") && (name.contains("UCS2") || name.contains("UTF16"))
}

fn decode_utf16_be(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_be_bytes([c[0], c[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}
