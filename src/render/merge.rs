//! Reconciliation of reading-order text with detected tables.
//!
//! The two come from independent passes over a page, so the merger decides
//! where each table goes among the text segments and which segments are the
//! table's own cells read as prose.
//!
//! Placement, per table in detection order:
//! 1. With segment anchors and a table box: after every segment that starts
//!    above the table, and after any overlapping segment that is kept.
//! 2. With a table box and a page height only: at the table's relative
//!    vertical position within the segment count.
//! 3. Otherwise: spread evenly, table `i` of `k` after `(i + 1) * S / (k + 1)`
//!    segments.
//!
//! Insertion points never move backwards, so detection order is kept.
//!
//! A segment is dropped as a duplicate only when it lies inside the table's
//! box and every word of it appears in the table's cells. Anything less
//! certain is kept, so a garbled inline copy of a table can appear just
//! before the clean one. That duplication is accepted over losing prose.

use std::collections::HashSet;

use super::table::TableSerializer;
use crate::model::{Page, SegmentAnchor, TableRegion};

/// Options for [`StreamMerger`].
#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Drop prose segments that duplicate a table's cells
    pub suppress_covered_prose: bool,

    /// Slack (points) when comparing segment and table positions
    pub anchor_tolerance: f32,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            suppress_covered_prose: true,
            anchor_tolerance: 2.0,
        }
    }
}

impl MergeOptions {
    /// Enable or disable covered-prose suppression.
    pub fn with_suppression(mut self, suppress: bool) -> Self {
        self.suppress_covered_prose = suppress;
        self
    }

    /// Set the position tolerance.
    pub fn with_tolerance(mut self, tolerance: f32) -> Self {
        self.anchor_tolerance = tolerance.max(0.0);
        self
    }
}

/// One page's merged output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedStream {
    /// Segments and table blocks, separated by blank lines
    pub text: String,

    /// Number of tables inserted
    pub tables: usize,

    /// Number of prose segments dropped as table duplicates
    pub suppressed: usize,
}

/// Merges a page's reading-order segments with its serialized tables.
#[derive(Debug, Clone, Default)]
pub struct StreamMerger {
    options: MergeOptions,
    serializer: TableSerializer,
}

impl StreamMerger {
    /// Create a merger.
    pub fn new(options: MergeOptions) -> Self {
        Self {
            options,
            serializer: TableSerializer::new(),
        }
    }

    /// Merge one page. Never fails; the worst case is an imperfect order.
    pub fn merge(&self, page: &Page) -> MergedStream {
        let segments = page.segments();
        if page.tables.is_empty() {
            return MergedStream {
                text: segments.join("\n\n"),
                ..Default::default()
            };
        }

        let anchors = page.aligned_anchors();
        let suppressed = self.covered_segments(&segments, anchors, &page.tables);
        let slots = self.insertion_points(&segments, anchors, page.height, &page.tables, &suppressed);

        let mut blocks: Vec<String> = Vec::with_capacity(segments.len() + page.tables.len());
        let mut tables = page.tables.iter().zip(&slots).peekable();
        for index in 0..=segments.len() {
            while let Some((table, _)) = tables.next_if(|(_, &slot)| slot == index) {
                blocks.push(self.serializer.serialize(table).into_string());
            }
            if let Some(segment) = segments.get(index) {
                if !suppressed[index] {
                    blocks.push(segment.to_string());
                }
            }
        }

        let suppressed = suppressed.iter().filter(|&&s| s).count();
        log::debug!(
            "Page {}: merged {} table(s) at {:?}, {} segment(s) suppressed",
            page.number(),
            page.tables.len(),
            slots,
            suppressed
        );

        MergedStream {
            text: blocks.join("\n\n"),
            tables: page.tables.len(),
            suppressed,
        }
    }

    /// Segments that are a table's own content read as prose.
    fn covered_segments(
        &self,
        segments: &[&str],
        anchors: Option<&[SegmentAnchor]>,
        tables: &[TableRegion],
    ) -> Vec<bool> {
        let mut covered = vec![false; segments.len()];
        let Some(anchors) = anchors.filter(|_| self.options.suppress_covered_prose) else {
            return covered;
        };

        for table in tables {
            let Some(bbox) = table.bbox else {
                continue;
            };
            let words: HashSet<&str> = table.words().collect();
            for (i, (segment, anchor)) in segments.iter().zip(anchors).enumerate() {
                let inside =
                    bbox.spans_vertically(anchor.top, anchor.bottom, self.options.anchor_tolerance);
                let mut segment_words = segment.split_whitespace().peekable();
                if inside
                    && segment_words.peek().is_some()
                    && segment_words.all(|w| words.contains(w))
                {
                    covered[i] = true;
                }
            }
        }

        covered
    }

    /// Segment index before which each table goes.
    fn insertion_points(
        &self,
        segments: &[&str],
        anchors: Option<&[SegmentAnchor]>,
        height: Option<f32>,
        tables: &[TableRegion],
        suppressed: &[bool],
    ) -> Vec<usize> {
        let count = segments.len();
        let tolerance = self.options.anchor_tolerance;
        let mut last = 0;

        tables
            .iter()
            .enumerate()
            .map(|(i, table)| {
                let slot = match (table.bbox, anchors, height) {
                    (Some(bbox), Some(anchors), _) => anchors
                        .iter()
                        .zip(suppressed)
                        .filter(|(anchor, &dropped)| {
                            anchor.top < bbox.top - tolerance
                                || (!dropped
                                    && bbox.spans_vertically(anchor.top, anchor.bottom, tolerance))
                        })
                        .count(),
                    (Some(bbox), None, Some(height)) if height > 0.0 => {
                        (bbox.top / height * count as f32).round() as usize
                    }
                    _ => ((i + 1) as f32 * count as f32 / (tables.len() + 1) as f32).round()
                        as usize,
                };
                last = slot.clamp(last, count);
                last
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BoundingBox;

    fn grid(order: usize, rows: &[&[&str]]) -> TableRegion {
        TableRegion::from_rows(
            order,
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    fn anchor(top: f32, bottom: f32) -> SegmentAnchor {
        SegmentAnchor { top, bottom }
    }

    #[test]
    fn test_no_tables_is_plain_text() {
        let mut page = Page::new(0);
        page.text = "First paragraph\ncontinues.\n\n\nSecond.".to_string();
        let merged = StreamMerger::default().merge(&page);
        assert_eq!(merged.text, "First paragraph\ncontinues.\n\nSecond.");
        assert!(!merged.text.contains("[TABLE"));
        assert_eq!(merged.tables, 0);
    }

    #[test]
    fn test_table_between_intro_and_outro_by_geometry() {
        let mut page = Page::new(0);
        page.height = Some(792.0);
        page.text = "Intro paragraph.\n\nOutro paragraph.".to_string();
        page.anchors = vec![anchor(70.0, 90.0), anchor(400.0, 420.0)];
        page.tables = vec![grid(0, &[&["A", "B"], &["1", "2"]])
            .with_bbox(BoundingBox::new(72.0, 200.0, 300.0, 260.0))];

        let merged = StreamMerger::default().merge(&page);
        let lines: Vec<&str> = merged.text.lines().filter(|l| !l.is_empty()).collect();
        assert_eq!(lines.first(), Some(&"Intro paragraph."));
        assert_eq!(lines[1], "[TABLE START]");
        assert_eq!(lines[lines.len() - 2], "[TABLE END]");
        assert_eq!(lines.last(), Some(&"Outro paragraph."));
    }

    #[test]
    fn test_interleave_without_geometry() {
        let mut page = Page::new(0);
        page.text = "Intro paragraph.\n\nOutro paragraph.".to_string();
        page.tables = vec![grid(0, &[&["A"]])];

        let merged = StreamMerger::default().merge(&page);
        let intro = merged.text.find("Intro").unwrap();
        let table = merged.text.find("[TABLE START]").unwrap();
        let outro = merged.text.find("Outro").unwrap();
        assert!(intro < table && table < outro);
    }

    #[test]
    fn test_proportional_position_without_anchors() {
        let mut page = Page::new(0);
        page.height = Some(800.0);
        page.text = "s1\n\ns2\n\ns3\n\ns4".to_string();
        page.tables = vec![grid(0, &[&["T"]]).with_bbox(BoundingBox::new(0.0, 600.0, 100.0, 700.0))];

        let merged = StreamMerger::default().merge(&page);
        let blocks: Vec<&str> = merged.text.split("\n\n").collect();
        assert_eq!(blocks[2], "s3");
        assert!(blocks[3].starts_with("[TABLE START]"));
        assert_eq!(blocks[4], "s4");
    }

    #[test]
    fn test_detection_order_is_kept() {
        let mut page = Page::new(0);
        page.text = "a\n\nb".to_string();
        page.height = Some(100.0);
        // Second table claims a higher position than the first.
        page.tables = vec![
            grid(0, &[&["first"]]).with_bbox(BoundingBox::new(0.0, 90.0, 10.0, 95.0)),
            grid(1, &[&["second"]]).with_bbox(BoundingBox::new(0.0, 5.0, 10.0, 10.0)),
        ];

        let merged = StreamMerger::default().merge(&page);
        let first = merged.text.find("first").unwrap();
        let second = merged.text.find("second").unwrap();
        assert!(first < second);
        assert_eq!(merged.tables, 2);
    }

    #[test]
    fn test_covered_prose_is_suppressed() {
        let mut page = Page::new(0);
        page.height = Some(792.0);
        page.text = "Intro.\n\nName Age\nWater 18\n\nOutro.".to_string();
        page.anchors = vec![
            anchor(70.0, 90.0),
            anchor(182.4, 234.4),
            anchor(350.0, 370.0),
        ];
        page.tables = vec![grid(0, &[&["Name", "Age"], &["Water", "18"]])
            .with_bbox(BoundingBox::new(72.0, 182.4, 300.0, 234.4))];

        let merged = StreamMerger::default().merge(&page);
        assert_eq!(merged.suppressed, 1);
        assert_eq!(merged.text.matches("Water").count(), 1);
        let blocks: Vec<&str> = merged.text.split("\n\n").collect();
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0], "Intro.");
        assert!(blocks[1].starts_with("[TABLE START]"));
        assert_eq!(blocks[2], "Outro.");
    }

    #[test]
    fn test_uncertain_overlap_keeps_prose_before_table() {
        let mut page = Page::new(0);
        page.text = "Intro.\n\nName Age plus a caption\n\nOutro.".to_string();
        page.anchors = vec![
            anchor(70.0, 90.0),
            anchor(182.4, 234.4),
            anchor(350.0, 370.0),
        ];
        page.tables = vec![grid(0, &[&["Name", "Age"]])
            .with_bbox(BoundingBox::new(72.0, 182.4, 300.0, 234.4))];

        let merged = StreamMerger::default().merge(&page);
        assert_eq!(merged.suppressed, 0);
        let caption = merged.text.find("caption").unwrap();
        let table = merged.text.find("[TABLE START]").unwrap();
        assert!(caption < table);

        let kept = StreamMerger::new(MergeOptions::default().with_suppression(false));
        assert_eq!(kept.merge(&page).suppressed, 0);
    }

    #[test]
    fn test_page_without_text_still_gets_tables() {
        let mut page = Page::new(2);
        page.tables = vec![grid(0, &[&["A"]]), grid(1, &[&["B"]])];
        let merged = StreamMerger::default().merge(&page);
        assert_eq!(merged.text.matches("[TABLE START]").count(), 2);
        assert!(merged.text.find("| A |").unwrap() < merged.text.find("| B |").unwrap());
    }
}
