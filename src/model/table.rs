//! Detected table regions.

use serde::{Deserialize, Serialize};

/// Rectangle in page space, measured in points from the top-left corner.
///
/// `top < bottom` for any non-degenerate box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge
    pub x0: f32,
    /// Top edge (distance from the top of the page)
    pub top: f32,
    /// Right edge
    pub x1: f32,
    /// Bottom edge (distance from the top of the page)
    pub bottom: f32,
}

impl BoundingBox {
    /// Create a box, normalizing swapped edges.
    pub fn new(x0: f32, top: f32, x1: f32, bottom: f32) -> Self {
        Self {
            x0: x0.min(x1),
            top: top.min(bottom),
            x1: x0.max(x1),
            bottom: top.max(bottom),
        }
    }

    /// Height of the box.
    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    /// Whether a vertical span lies inside this box, with `tolerance` slack.
    pub fn spans_vertically(&self, top: f32, bottom: f32, tolerance: f32) -> bool {
        top >= self.top - tolerance && bottom <= self.bottom + tolerance
    }
}

/// A table found on a page.
///
/// The cell grid is rectangular: every row has the same number of columns,
/// and missing cells are empty strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRegion {
    /// Position in top-to-bottom detection order on its page
    pub order: usize,

    /// Geometry, when the detection backend provides it
    pub bbox: Option<BoundingBox>,

    rows: Vec<Vec<String>>,
}

impl TableRegion {
    /// Build a region from backend cells, where `None` marks a blank cell.
    ///
    /// Cells are trimmed, blank cells become `""`, and short rows are padded
    /// so the grid is rectangular.
    pub fn from_cells<S: AsRef<str>>(order: usize, rows: Vec<Vec<Option<S>>>) -> Self {
        let rows = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| {
                        cell.map(|c| c.as_ref().trim().to_string())
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .collect();
        Self::from_rows(order, rows)
    }

    /// Build a region from text rows.
    pub fn from_rows(order: usize, mut rows: Vec<Vec<String>>) -> Self {
        let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut rows {
            row.resize(columns, String::new());
        }
        Self {
            order,
            bbox: None,
            rows,
        }
    }

    /// Attach geometry and return self.
    pub fn with_bbox(mut self, bbox: BoundingBox) -> Self {
        self.bbox = Some(bbox);
        self
    }

    /// The cell grid, row-major.
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Get the number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Get the number of columns.
    pub fn column_count(&self) -> usize {
        self.rows.first().map(Vec::len).unwrap_or(0)
    }

    /// Check if the table has no rows or only blank cells.
    pub fn is_empty(&self) -> bool {
        self.rows.iter().flatten().all(|cell| cell.is_empty())
    }

    /// All whitespace-separated words found in the cells.
    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .flatten()
            .flat_map(|cell| cell.split_whitespace())
    }
}
