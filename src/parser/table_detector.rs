//! Table detection from text positions (stream mode).
//!
//! Tables are found without ruling lines: spans are grouped into rows, left
//! edges that recur across rows become column boundaries, and runs of rows
//! whose spans sit on those boundaries become table regions.

use std::collections::{HashMap, HashSet};

use super::layout::TextSpan;
use crate::model::{BoundingBox, TableRegion};

/// Bucket width (points) for clustering left edges.
const EDGE_BUCKET: f32 = 5.0;

/// Distance (points) within which a span counts as sitting on a column edge.
const ALIGN_TOLERANCE: f32 = 5.0;

/// A table region found on a page, still in span form.
#[derive(Debug, Clone)]
pub struct DetectedTable {
    /// Left X boundary
    pub left_x: f32,
    /// Right X boundary
    pub right_x: f32,
    /// Column left edges
    pub columns: Vec<f32>,
    /// Rows, top to bottom
    pub rows: Vec<TableRowData>,
}

/// A row of spans sharing a baseline.
#[derive(Debug, Clone)]
pub struct TableRowData {
    /// Average baseline of the row
    pub y: f32,
    /// Spans in this row, sorted by X
    pub spans: Vec<TextSpan>,
}

impl DetectedTable {
    /// Cell texts, one `Vec` per row. Spans falling into the same column are
    /// joined with a space.
    pub fn cells(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| {
                let mut cells: Vec<Vec<&str>> = vec![Vec::new(); self.columns.len()];
                for span in &row.spans {
                    let index = find_column_for_span(span.x, &self.columns, self.right_x);
                    if let Some(cell) = cells.get_mut(index) {
                        cell.push(span.text.trim());
                    }
                }
                cells.into_iter().map(|parts| parts.join(" ")).collect()
            })
            .collect()
    }

    /// Convert into a [`TableRegion`] with a top-down bounding box on a page
    /// of `page_height`.
    pub fn to_region(&self, order: usize, page_height: f32) -> TableRegion {
        let spans = || self.rows.iter().flat_map(|r| r.spans.iter());
        let top = spans().map(TextSpan::top).fold(f32::MIN, f32::max);
        let bottom = spans().map(TextSpan::bottom).fold(f32::MAX, f32::min);

        TableRegion::from_rows(order, self.cells()).with_bbox(BoundingBox::new(
            self.left_x,
            page_height - top,
            self.right_x,
            page_height - bottom,
        ))
    }
}

/// Table detector configuration.
#[derive(Debug, Clone)]
pub struct TableDetectorConfig {
    /// Minimum number of rows to consider as table
    pub min_rows: usize,
    /// Minimum number of columns; also the number of aligned spans a row
    /// needs to count as a table row
    pub min_columns: usize,
    /// Maximum number of columns (above this, likely word-level splitting)
    pub max_columns: usize,
    /// Y tolerance for grouping spans into rows (fraction of font size)
    pub y_tolerance_factor: f32,
    /// Minimum share of a row's spans that must sit on column edges
    pub min_alignment_ratio: f32,
    /// Minimum gap between columns (points)
    pub min_column_gap: f32,
}

impl Default for TableDetectorConfig {
    fn default() -> Self {
        Self {
            min_rows: 2,
            min_columns: 2,
            max_columns: 8,
            y_tolerance_factor: 0.4,
            min_alignment_ratio: 0.5,
            min_column_gap: 15.0,
        }
    }
}

impl TableDetectorConfig {
    /// Set the minimum number of rows.
    pub fn with_min_rows(mut self, rows: usize) -> Self {
        self.min_rows = rows.max(1);
        self
    }

    /// Set the column bounds.
    pub fn with_columns(mut self, min: usize, max: usize) -> Self {
        self.min_columns = min.max(1);
        self.max_columns = max.max(self.min_columns);
        self
    }
}

/// Detects tables in a page's spans.
#[derive(Debug, Clone, Default)]
pub struct TableDetector {
    config: TableDetectorConfig,
}

impl TableDetector {
    /// Create a new table detector with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new table detector with custom configuration.
    pub fn with_config(config: TableDetectorConfig) -> Self {
        Self { config }
    }

    /// Detect tables, top to bottom.
    pub fn detect(&self, spans: &[TextSpan]) -> Vec<DetectedTable> {
        if spans.len() < self.config.min_rows * self.config.min_columns {
            return vec![];
        }

        let rows = self.group_into_rows(spans);
        let columns = self.detect_columns(&rows);
        log::debug!(
            "TableDetector: {} rows, column edges {:?}",
            rows.len(),
            columns
        );
        if columns.len() < self.config.min_columns {
            return vec![];
        }

        let mut tables = Vec::new();
        for (start, end) in self.find_table_regions(&rows, &columns) {
            let table_rows = rows[start..=end].to_vec();

            // Columns of this region alone; the page-wide edges may include
            // edges that only other regions use.
            let table_columns = self.detect_columns(&table_rows);
            if table_columns.len() < self.config.min_columns {
                continue;
            }
            if table_columns.len() > self.config.max_columns {
                log::debug!(
                    "TableDetector: skipping region with {} columns",
                    table_columns.len()
                );
                continue;
            }
            if is_list_pattern(&table_rows, &table_columns) {
                log::debug!("TableDetector: skipping list-like region");
                continue;
            }

            let all = || table_rows.iter().flat_map(|r| r.spans.iter());
            let left_x = all().map(|s| s.x).fold(f32::MAX, f32::min);
            let right_x = all().map(TextSpan::right).fold(f32::MIN, f32::max);

            tables.push(DetectedTable {
                left_x,
                right_x,
                columns: table_columns,
                rows: table_rows,
            });
        }

        tables
    }

    /// Group spans into rows by baseline.
    fn group_into_rows(&self, spans: &[TextSpan]) -> Vec<TableRowData> {
        let mut sorted = spans.to_vec();
        sorted.sort_by(|a, b| b.y.total_cmp(&a.y).then(a.x.total_cmp(&b.x)));

        let mut rows = Vec::new();
        let mut current: Vec<TextSpan> = Vec::new();
        let mut row_y = f32::NAN;

        let flush = |current: &mut Vec<TextSpan>, rows: &mut Vec<TableRowData>| {
            if !current.is_empty() {
                let y = current.iter().map(|s| s.y).sum::<f32>() / current.len() as f32;
                let mut spans = std::mem::take(current);
                spans.sort_by(|a, b| a.x.total_cmp(&b.x));
                rows.push(TableRowData { y, spans });
            }
        };

        for span in sorted {
            let tolerance = span.font_size * self.config.y_tolerance_factor;
            if current.is_empty() || (span.y - row_y).abs() > tolerance {
                flush(&mut current, &mut rows);
                row_y = span.y;
            }
            current.push(span);
        }
        flush(&mut current, &mut rows);

        rows
    }

    /// Left edges shared by enough multi-span rows, merged when closer than
    /// the minimum column gap.
    fn detect_columns(&self, rows: &[TableRowData]) -> Vec<f32> {
        let multi: Vec<&TableRowData> = rows.iter().filter(|r| r.spans.len() >= 2).collect();
        if multi.len() < self.config.min_rows {
            return vec![];
        }

        let mut counts: HashMap<i32, usize> = HashMap::new();
        for row in &multi {
            let buckets: HashSet<i32> = row
                .spans
                .iter()
                .map(|s| (s.x / EDGE_BUCKET).round() as i32)
                .collect();
            for bucket in buckets {
                *counts.entry(bucket).or_insert(0) += 1;
            }
        }

        let min_occurrences =
            ((multi.len() as f32 * self.config.min_alignment_ratio) as usize).max(2);
        let mut edges: Vec<f32> = counts
            .into_iter()
            .filter(|&(_, count)| count >= min_occurrences)
            .map(|(bucket, _)| bucket as f32 * EDGE_BUCKET)
            .collect();
        edges.sort_by(f32::total_cmp);

        let mut merged: Vec<f32> = Vec::with_capacity(edges.len());
        for edge in edges {
            match merged.last() {
                Some(&last) if edge - last < self.config.min_column_gap => {}
                _ => merged.push(edge),
            }
        }
        merged
    }

    /// Runs of consecutive table rows at least `min_rows` long, as inclusive
    /// index ranges.
    fn find_table_regions(&self, rows: &[TableRowData], columns: &[f32]) -> Vec<(usize, usize)> {
        let mut regions = Vec::new();
        let mut start: Option<usize> = None;

        for (i, row) in rows.iter().enumerate() {
            if self.is_table_row(row, columns) {
                start.get_or_insert(i);
                continue;
            }
            if let Some(s) = start.take() {
                if i - s >= self.config.min_rows {
                    regions.push((s, i - 1));
                }
            }
        }
        if let Some(s) = start {
            if rows.len() - s >= self.config.min_rows {
                regions.push((s, rows.len() - 1));
            }
        }

        regions
    }

    /// A row belongs to a table when at least `min_columns` of its spans sit
    /// on column edges and they make up enough of the row. A single line of
    /// prose starting at the first column edge is not a table row.
    fn is_table_row(&self, row: &TableRowData, columns: &[f32]) -> bool {
        if row.spans.is_empty() {
            return false;
        }
        let aligned = row
            .spans
            .iter()
            .filter(|span| columns.iter().any(|col| (span.x - col).abs() <= ALIGN_TOLERANCE))
            .count();
        aligned >= self.config.min_columns
            && aligned as f32 / row.spans.len() as f32 >= self.config.min_alignment_ratio
    }
}

/// Column index for a span starting at `span_x`.
fn find_column_for_span(span_x: f32, columns: &[f32], right_x: f32) -> usize {
    let within = columns.iter().enumerate().position(|(i, &start)| {
        let end = columns.get(i + 1).copied().unwrap_or(right_x + 100.0);
        span_x >= start - 10.0 && span_x < end - 10.0
    });

    within.unwrap_or_else(|| {
        columns
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| (span_x - **a).abs().total_cmp(&(span_x - **b).abs()))
            .map(|(i, _)| i)
            .unwrap_or(0)
    })
}

/// Numbered or bulleted lists put the marker and the item in separate spans,
/// which looks like a two-column table.
fn is_list_pattern(rows: &[TableRowData], columns: &[f32]) -> bool {
    if columns.len() < 2 || rows.is_empty() {
        return false;
    }

    let mut bullets = 0;
    let mut numbers = 0;
    for row in rows {
        let Some(first) = row.spans.first() else {
            continue;
        };
        let text = first.text.trim();
        if is_bullet_marker(text) {
            bullets += 1;
        } else if is_number_marker(text) {
            numbers += 1;
        }
    }

    let bullet_ratio = bullets as f32 / rows.len() as f32;
    let marker_ratio = (bullets + numbers) as f32 / rows.len() as f32;

    // Numbered first columns are common in real tables, so numbers only
    // disqualify two-column regions.
    bullet_ratio >= 0.5 || (columns.len() == 2 && marker_ratio >= 0.5)
}

fn is_bullet_marker(text: &str) -> bool {
    matches!(
        text.trim(),
        "-" | "–" | "—" | "•" | "·" | "*" | "○" | "▪" | "◦" | "►" | "■" | "●" | "□" | "◆" | "➤"
    )
}

/// Markers such as `1.`, `12)`, `३.`, `a.`, `(ii)` or a bare number.
fn is_number_marker(text: &str) -> bool {
    let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let body = cleaned
        .strip_prefix('(')
        .unwrap_or(&cleaned)
        .trim_end_matches(|c| c == '.' || c == ')');
    if body.is_empty() || (body.len() == cleaned.len() && !body.chars().all(is_digit)) {
        return false;
    }

    let chars: Vec<char> = body.chars().collect();
    chars.iter().all(|&c| is_digit(c))
        || (chars.len() == 1 && chars[0].is_alphabetic())
        || chars.iter().all(|c| matches!(c, 'i' | 'v' | 'x'))
}

/// ASCII or Devanagari digit.
fn is_digit(c: char) -> bool {
    c.is_ascii_digit() || ('\u{0966}'..='\u{096F}').contains(&c)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_span(text: &str, x: f32, y: f32) -> TextSpan {
        TextSpan::new(text, x, y, 12.0)
    }

    #[test]
    fn test_group_into_rows() {
        let detector = TableDetector::new();
        let spans = vec![
            make_span("B1", 60.0, 100.0),
            make_span("A1", 10.0, 100.0),
            make_span("A2", 10.0, 85.0),
            make_span("B2", 60.0, 85.0),
        ];

        let rows = detector.group_into_rows(&spans);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].spans[0].text, "A1");
        assert_eq!(rows[1].spans.len(), 2);
    }

    #[test]
    fn test_detect_simple_table() {
        let detector = TableDetector::new();
        let spans = vec![
            make_span("Name", 10.0, 100.0),
            make_span("Age", 60.0, 100.0),
            make_span("Alice", 10.0, 85.0),
            make_span("30", 60.0, 85.0),
            make_span("Bob", 10.0, 70.0),
            make_span("25", 60.0, 70.0),
        ];

        let tables = detector.detect(&spans);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].rows.len(), 3);
        assert_eq!(tables[0].columns, vec![10.0, 60.0]);
        assert_eq!(
            tables[0].cells(),
            vec![
                vec!["Name".to_string(), "Age".to_string()],
                vec!["Alice".to_string(), "30".to_string()],
                vec!["Bob".to_string(), "25".to_string()],
            ]
        );
    }

    #[test]
    fn test_prose_rows_are_not_table_rows() {
        let detector = TableDetector::new();
        let spans = vec![
            make_span("A paragraph before the table.", 10.0, 130.0),
            make_span("Name", 10.0, 100.0),
            make_span("Age", 200.0, 100.0),
            make_span("Alice", 10.0, 85.0),
            make_span("30", 200.0, 85.0),
            make_span("A paragraph after the table.", 10.0, 55.0),
        ];

        let tables = detector.detect(&spans);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].rows.len(), 2);
        assert_eq!(tables[0].rows[0].spans[0].text, "Name");
    }

    #[test]
    fn test_no_table_single_column() {
        let detector = TableDetector::new();
        let spans = vec![
            make_span("Line 1", 10.0, 100.0),
            make_span("Line 2", 10.0, 85.0),
            make_span("Line 3", 10.0, 70.0),
            make_span("Line 4", 10.0, 55.0),
        ];
        assert!(detector.detect(&spans).is_empty());
    }

    #[test]
    fn test_region_bbox_is_top_down() {
        let detector = TableDetector::new();
        let spans = vec![
            make_span("Name", 72.0, 600.0),
            make_span("Age", 250.0, 600.0),
            make_span("Water", 72.0, 580.0),
            make_span("H2O", 250.0, 580.0),
        ];
        let tables = detector.detect(&spans);
        let region = tables[0].to_region(0, 792.0);
        let bbox = region.bbox.unwrap();

        assert!((bbox.top - 182.4).abs() < 0.01);
        assert!((bbox.bottom - 214.4).abs() < 0.01);
        assert_eq!(bbox.x0, 72.0);
        assert_eq!(region.rows()[1], vec!["Water".to_string(), "H2O".to_string()]);
    }

    #[test]
    fn test_spans_in_same_column_are_joined() {
        let detected = DetectedTable {
            left_x: 10.0,
            right_x: 100.0,
            columns: vec![10.0, 60.0],
            rows: vec![TableRowData {
                y: 100.0,
                spans: vec![
                    make_span("Sodium", 10.0, 100.0),
                    make_span("chloride", 30.0, 100.0),
                    make_span("NaCl", 60.0, 100.0),
                ],
            }],
        };
        assert_eq!(
            detected.cells(),
            vec![vec!["Sodium chloride".to_string(), "NaCl".to_string()]]
        );
    }

    #[test]
    fn test_numbered_list_not_detected_as_table() {
        let detector = TableDetector::new();
        let spans = vec![
            make_span("1.", 50.0, 400.0),
            make_span("रासायनिक अभिक्रियाएँ", 80.0, 400.0),
            make_span("2.", 50.0, 370.0),
            make_span("अम्ल, क्षारक एवं लवण", 80.0, 370.0),
            make_span("3.", 50.0, 340.0),
            make_span("धातु एवं अधातु", 80.0, 340.0),
        ];
        assert!(detector.detect(&spans).is_empty());
    }

    #[test]
    fn test_bullet_list_not_detected_as_table() {
        let detector = TableDetector::new();
        let spans = vec![
            make_span("•", 50.0, 400.0),
            make_span("Management", 80.0, 400.0),
            make_span("•", 50.0, 370.0),
            make_span("Interface options", 80.0, 370.0),
            make_span("•", 50.0, 340.0),
            make_span("Firmware", 80.0, 340.0),
        ];
        assert!(detector.detect(&spans).is_empty());
    }

    #[test]
    fn test_list_markers() {
        for marker in ["1.", "12.", "1)", "1 .", "3", "a.", "B)", "३.", "(ii)", "iv."] {
            assert!(is_number_marker(marker), "{marker} should be a marker");
        }
        for bullet in ["-", "•", "*", "–"] {
            assert!(is_bullet_marker(bullet));
        }
        for text in ["Name", "Hello World", "Alice", "", "पानी"] {
            assert!(!is_number_marker(text) && !is_bullet_marker(text), "{text}");
        }
    }

    #[test]
    fn test_config_builders() {
        let config = TableDetectorConfig::default().with_min_rows(0).with_columns(3, 2);
        assert_eq!(config.min_rows, 1);
        assert_eq!(config.min_columns, 3);
        assert_eq!(config.max_columns, 3);
    }
}
