//! Page-level types.

use serde::{Deserialize, Serialize};

use super::TableRegion;

/// Vertical extent of one reading-order text segment, in points from the
/// top of the page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentAnchor {
    /// Top of the segment's first line
    pub top: f32,
    /// Bottom of the segment's last line
    pub bottom: f32,
}

/// One page, as seen by the merger.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Page {
    /// Page index (0-based)
    pub index: usize,

    /// Page height in points, when known
    pub height: Option<f32>,

    /// Reading-order text; segments are separated by blank lines
    pub text: String,

    /// One anchor per text segment, or empty when positions are unknown
    pub anchors: Vec<SegmentAnchor>,

    /// Detected tables in detection order
    pub tables: Vec<TableRegion>,
}

impl Page {
    /// Create an empty page.
    pub fn new(index: usize) -> Self {
        Self {
            index,
            ..Default::default()
        }
    }

    /// Human page number (1-based).
    pub fn number(&self) -> usize {
        self.index + 1
    }

    /// Paragraph-like segments of the reading-order text.
    pub fn segments(&self) -> Vec<&str> {
        split_segments(&self.text)
    }

    /// Segment anchors, if they line up one-to-one with [`Page::segments`].
    pub fn aligned_anchors(&self) -> Option<&[SegmentAnchor]> {
        if !self.anchors.is_empty() && self.anchors.len() == self.segments().len() {
            Some(&self.anchors)
        } else {
            None
        }
    }
}

/// Split text on blank-line boundaries, dropping empty segments.
pub(crate) fn split_segments(text: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start: Option<usize> = None;
    let mut end = 0;
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();
        if line.trim().is_empty() {
            if let Some(s) = start.take() {
                segments.push(&text[s..end]);
            }
        } else {
            if start.is_none() {
                start = Some(line_start);
            }
            end = line_start + line.trim_end_matches(|c: char| c == '\n' || c == '\r').len();
        }
    }
    if let Some(s) = start {
        segments.push(&text[s..end]);
    }

    segments
}
