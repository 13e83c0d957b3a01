//! Run report with metadata, counts and recovered failures.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::model::{Language, Metadata};

/// Stage in which a page-level failure was recovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningStage {
    /// Table detection failed; the page contributed no tables
    TableDetection,
    /// Text extraction failed; the page contributed no prose
    TextExtraction,
}

impl fmt::Display for WarningStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WarningStage::TableDetection => "table detection",
            WarningStage::TextExtraction => "text extraction",
        })
    }
}

/// A recovered failure on one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageWarning {
    /// 1-based page number
    pub page: usize,

    /// Failing stage
    pub stage: WarningStage,

    /// Error message
    pub message: String,
}

/// A capability that ran in reduced mode for the whole run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegradedCapability {
    /// Capability name
    pub capability: String,

    /// Why it is degraded
    pub reason: String,
}

impl DegradedCapability {
    /// Create a degraded capability entry.
    pub fn new(capability: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            capability: capability.into(),
            reason: reason.into(),
        }
    }
}

/// Summary of one extraction run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionReport {
    /// Source document, when extracted from a file
    pub source: Option<PathBuf>,

    /// Target language
    pub language: Language,

    /// Document metadata
    pub metadata: Metadata,

    /// Pages in the document
    pub pages_total: usize,

    /// Pages selected and processed
    pub pages_processed: usize,

    /// Tables written to the output
    pub tables_found: usize,

    /// Empty table regions dropped
    pub tables_dropped: usize,

    /// Prose segments dropped as duplicates of table cells
    pub segments_suppressed: usize,

    /// Recovered page failures, in page order
    pub warnings: Vec<PageWarning>,

    /// Capabilities that ran in reduced mode
    pub degraded: Vec<DegradedCapability>,
}

impl ExtractionReport {
    /// Create an empty report.
    pub fn new(language: Language) -> Self {
        Self {
            language,
            ..Default::default()
        }
    }

    /// Record a recovered page failure (page is 1-based).
    pub fn warn(&mut self, page: usize, stage: WarningStage, message: impl Into<String>) {
        self.warnings.push(PageWarning {
            page,
            stage,
            message: message.into(),
        });
    }

    /// Whether every page was processed without a recovered failure and no
    /// capability was degraded.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty() && self.degraded.is_empty()
    }

    /// 1-based numbers of pages with warnings, ascending and deduplicated.
    pub fn failed_pages(&self) -> Vec<usize> {
        let mut pages: Vec<usize> = self.warnings.iter().map(|w| w.page).collect();
        pages.sort_unstable();
        pages.dedup();
        pages
    }
}

impl fmt::Display for ExtractionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(source) = &self.source {
            writeln!(f, "Source: {}", source.display())?;
        }
        writeln!(f, "Language: {}", self.language)?;
        writeln!(
            f,
            "Pages processed: {}/{}",
            self.pages_processed, self.pages_total
        )?;
        write!(f, "Tables found: {}", self.tables_found)?;
        if self.tables_dropped > 0 {
            write!(f, " ({} empty dropped)", self.tables_dropped)?;
        }
        writeln!(f)?;
        if self.segments_suppressed > 0 {
            writeln!(f, "Duplicate segments suppressed: {}", self.segments_suppressed)?;
        }

        if self.degraded.is_empty() {
            writeln!(f, "Degraded capabilities: none")?;
        } else {
            writeln!(f, "Degraded capabilities:")?;
            for d in &self.degraded {
                writeln!(f, "  - {}: {}", d.capability, d.reason)?;
            }
        }

        if !self.warnings.is_empty() {
            writeln!(f, "Warnings:")?;
            for w in &self.warnings {
                writeln!(f, "  - page {} ({}): {}", w.page, w.stage, w.message)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_display() {
        let mut report = ExtractionReport::new(Language::Hindi);
        report.pages_total = 4;
        report.pages_processed = 4;
        report.tables_found = 2;
        report.warn(3, WarningStage::TableDetection, "bad stream");
        report
            .degraded
            .push(DegradedCapability::new("script-normalization", "no backend"));

        let text = report.to_string();
        assert!(text.contains("Language: hi"));
        assert!(text.contains("Pages processed: 4/4"));
        assert!(text.contains("Tables found: 2\n"));
        assert!(text.contains("script-normalization: no backend"));
        assert!(text.contains("page 3 (table detection): bad stream"));
        assert!(!report.is_clean());
        assert_eq!(report.failed_pages(), vec![3]);
    }

    #[test]
    fn test_report_json() {
        let mut report = ExtractionReport::new(Language::English);
        report.warn(2, WarningStage::TextExtraction, "oops");
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"language\":\"english\""));
        assert!(json.contains("\"stage\":\"text_extraction\""));

        let back: ExtractionReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.warnings, report.warnings);
    }

    #[test]
    fn test_failed_pages_unordered_warnings() {
        let mut report = ExtractionReport::new(Language::English);
        report.warn(5, WarningStage::TextExtraction, "a");
        report.warn(2, WarningStage::TableDetection, "b");
        report.warn(5, WarningStage::TableDetection, "c");
        assert_eq!(report.failed_pages(), vec![2, 5]);
    }

    #[test]
    fn test_clean_report() {
        let report = ExtractionReport::new(Language::English);
        assert!(report.is_clean());
        assert!(report.to_string().contains("Degraded capabilities: none"));
    }
}
