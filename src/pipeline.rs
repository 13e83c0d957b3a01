//! The extraction run: page loop, document-level cleanup, output artifact.
//!
//! Per selected page the pipeline asks the text source for reading-order
//! text and the table source for tables, then merges them. Failures in
//! either source are recovered on that page only: the page contributes no
//! text (or no tables) and the report records a warning. After the last
//! page the accumulated stream is cleaned and normalized once.

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::model::{Language, Page};
use crate::parser::{PdfDocument, TableDetectorConfig, TableSource, TextSource};
use crate::render::{
    CleanupOptions, ExtractionReport, MergeOptions, PageSelection, ScriptNormalizer,
    StreamMerger, TextCleaner, WarningStage, PAGE_BREAK,
};

/// Options for an extraction run.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Target language; Hindi enables Devanagari normalization
    pub language: Language,

    /// Pages to process
    pub pages: PageSelection,

    /// Run table detection
    pub detect_tables: bool,

    /// Drop detected regions whose cells are all blank
    pub drop_empty_tables: bool,

    /// Table detector configuration
    pub table: TableDetectorConfig,

    /// Merge options
    pub merge: MergeOptions,

    /// Cleanup options
    pub cleanup: CleanupOptions,

    /// Use the nukta canonicalization backend when compiled in
    pub script_backend: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            language: Language::English,
            pages: PageSelection::All,
            detect_tables: true,
            drop_empty_tables: true,
            table: TableDetectorConfig::default(),
            merge: MergeOptions::default(),
            cleanup: CleanupOptions::default(),
            script_backend: true,
        }
    }
}

impl ExtractOptions {
    /// Create options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the target language.
    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    /// Set page selection.
    pub fn with_pages(mut self, pages: PageSelection) -> Self {
        self.pages = pages;
        self
    }

    /// Enable or disable table detection.
    pub fn with_tables(mut self, detect: bool) -> Self {
        self.detect_tables = detect;
        self
    }

    /// Keep or drop empty table regions.
    pub fn with_drop_empty_tables(mut self, drop: bool) -> Self {
        self.drop_empty_tables = drop;
        self
    }

    /// Set the table detector configuration.
    pub fn with_table_config(mut self, config: TableDetectorConfig) -> Self {
        self.table = config;
        self
    }

    /// Set merge options.
    pub fn with_merge(mut self, merge: MergeOptions) -> Self {
        self.merge = merge;
        self
    }

    /// Set cleanup options.
    pub fn with_cleanup(mut self, cleanup: CleanupOptions) -> Self {
        self.cleanup = cleanup;
        self
    }

    /// Enable or disable the script normalization backend.
    pub fn with_script_backend(mut self, enabled: bool) -> Self {
        self.script_backend = enabled;
        self
    }
}

/// Cleaned text and the report of the run that produced it.
#[derive(Debug, Clone)]
pub struct ExtractionOutput {
    /// Cleaned stream: paragraphs separated by blank lines, tables verbatim
    pub text: String,

    /// Run report
    pub report: ExtractionReport,
}

impl ExtractionOutput {
    /// Output file content: one paragraph or table row per line, with a
    /// trailing newline.
    pub fn artifact(&self) -> String {
        let mut out = self
            .text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        if !out.is_empty() {
            out.push('\n');
        }
        out
    }
}

/// Runs the extraction stages over a document.
#[derive(Debug)]
pub struct Pipeline {
    options: ExtractOptions,
    merger: StreamMerger,
    cleaner: TextCleaner,
    normalizer: ScriptNormalizer,
}

impl Pipeline {
    /// Build a pipeline. Fails only on invalid cleanup patterns.
    pub fn new(options: ExtractOptions) -> Result<Self> {
        let cleaner = TextCleaner::new(options.cleanup.clone())?;
        let merger = StreamMerger::new(options.merge.clone());
        let normalizer = build_normalizer(&options);

        Ok(Self {
            options,
            merger,
            cleaner,
            normalizer,
        })
    }

    /// Options in use.
    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Run over a pair of capability sources.
    pub fn run(&self, text: &dyn TextSource, tables: &dyn TableSource) -> ExtractionOutput {
        self.run_with_progress(text, tables, |_, _| {})
    }

    /// Run, calling `progress(page_number, selected_pages)` after each page.
    pub fn run_with_progress<F>(
        &self,
        text: &dyn TextSource,
        tables: &dyn TableSource,
        mut progress: F,
    ) -> ExtractionOutput
    where
        F: FnMut(usize, usize),
    {
        let mut report = ExtractionReport::new(self.options.language);
        report.pages_total = text.page_count();
        if let Some(degraded) = self.normalizer.degraded_capability() {
            log::warn!("{}: {}", degraded.capability, degraded.reason);
            report.degraded.push(degraded);
        }

        let indices = self.options.pages.indices(report.pages_total);
        let page_break = format!("\n{PAGE_BREAK}\n");
        let mut stream = String::new();

        for (n, &index) in indices.iter().enumerate() {
            let page = self.build_page(index, text, tables, &mut report);
            let merged = self.merger.merge(&page);
            report.tables_found += merged.tables;
            report.segments_suppressed += merged.suppressed;
            report.pages_processed += 1;

            if n > 0 {
                stream.push_str(&page_break);
            }
            stream.push_str(&merged.text.replace(PAGE_BREAK, "\n"));
            progress(page.number(), indices.len());
        }

        let cleaned = self.cleaner.clean(&stream);
        let text = self.normalizer.normalize(&cleaned);

        log::info!(
            "Processed {}/{} page(s), {} table(s), {} warning(s)",
            report.pages_processed,
            report.pages_total,
            report.tables_found,
            report.warnings.len()
        );

        ExtractionOutput { text, report }
    }

    /// Run over an opened PDF, filling in its metadata.
    pub fn extract_pdf<F>(&self, pdf: &PdfDocument, progress: F) -> ExtractionOutput
    where
        F: FnMut(usize, usize),
    {
        let mut output = self.run_with_progress(pdf, pdf, progress);
        output.report.metadata = pdf.metadata().clone();
        output
    }

    /// Extract `input` and write the cleaned text to `output`.
    pub fn extract_file<P, Q>(&self, input: P, output: Q) -> Result<ExtractionReport>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        self.extract_file_with_progress(input, output, |_, _| {})
    }

    /// [`Pipeline::extract_file`] with a progress callback.
    pub fn extract_file_with_progress<P, Q, F>(
        &self,
        input: P,
        output: Q,
        progress: F,
    ) -> Result<ExtractionReport>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
        F: FnMut(usize, usize),
    {
        let (input, output) = (input.as_ref(), output.as_ref());
        let pdf = PdfDocument::open(input)?.with_table_config(self.options.table.clone());
        log::info!(
            "Extracting {} ({} pages, {})",
            input.display(),
            pdf.page_count(),
            self.options.language
        );

        let mut result = self.extract_pdf(&pdf, progress);
        drop(pdf);
        result.report.source = Some(input.to_path_buf());

        fs::write(output, result.artifact())?;
        log::info!("Wrote {}", output.display());
        Ok(result.report)
    }

    /// Gather one page's text and tables, recovering source failures.
    fn build_page(
        &self,
        index: usize,
        text: &dyn TextSource,
        tables: &dyn TableSource,
        report: &mut ExtractionReport,
    ) -> Page {
        let mut page = Page::new(index);

        match text.reading_order_text(index) {
            Ok(page_text) => {
                page.text = page_text.text;
                page.anchors = page_text.anchors;
                page.height = page_text.height;
            }
            Err(e) => {
                log::warn!("Page {}: {}; continuing without text", page.number(), e);
                report.warn(page.number(), WarningStage::TextExtraction, e.to_string());
            }
        }

        if !self.options.detect_tables {
            return page;
        }
        match tables.find_tables(index) {
            Ok(found) => {
                for table in found {
                    if self.options.drop_empty_tables && table.is_empty() {
                        report.tables_dropped += 1;
                    } else {
                        page.tables.push(table);
                    }
                }
            }
            Err(e) => {
                log::warn!("Page {}: {}; continuing without tables", page.number(), e);
                report.warn(page.number(), WarningStage::TableDetection, e.to_string());
            }
        }

        page
    }
}

fn build_normalizer(options: &ExtractOptions) -> ScriptNormalizer {
    if !options.script_backend {
        return ScriptNormalizer::reduced(options.language);
    }
    ScriptNormalizer::try_full(options.language).unwrap_or_else(|e: Error| {
        log::debug!("{e}; using reduced script normalization");
        ScriptNormalizer::reduced(options.language)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{PageText, TableIter};

    struct Pages(Vec<&'static str>);

    impl TextSource for Pages {
        fn page_count(&self) -> usize {
            self.0.len()
        }

        fn reading_order_text(&self, index: usize) -> Result<PageText> {
            Ok(PageText::plain(self.0[index]))
        }
    }

    impl TableSource for Pages {
        fn find_tables(&self, _index: usize) -> Result<TableIter<'_>> {
            Ok(Box::new(std::iter::empty()))
        }
    }

    #[test]
    fn test_options_builder() {
        let options = ExtractOptions::new()
            .with_language(Language::Hindi)
            .with_tables(false)
            .with_pages(PageSelection::Range(2..=3))
            .with_script_backend(false);
        assert_eq!(options.language, Language::Hindi);
        assert!(!options.detect_tables);
        assert!(options.drop_empty_tables);
        assert_eq!(options.pages, PageSelection::Range(2..=3));
    }

    #[test]
    fn test_invalid_cleanup_pattern_fails_early() {
        let options = ExtractOptions::new()
            .with_cleanup(CleanupOptions::default().with_pattern("[unclosed"));
        assert!(matches!(
            Pipeline::new(options),
            Err(Error::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_pages_joined_and_cleaned() {
        let pipeline = Pipeline::new(ExtractOptions::default()).unwrap();
        let output = pipeline.run(&Pages(vec!["One\ntwo.", "Three."]), &Pages(vec![]));
        assert_eq!(output.text, "One two.\n\nThree.");
        assert_eq!(output.artifact(), "One two.\nThree.\n");
        assert_eq!(output.report.pages_processed, 2);
        assert!(output.report.is_clean());
    }

    #[test]
    fn test_reduced_hindi_is_reported() {
        let options = ExtractOptions::new()
            .with_language(Language::Hindi)
            .with_script_backend(false);
        let pipeline = Pipeline::new(options).unwrap();
        let output = pipeline.run(&Pages(vec!["यह घर है|"]), &Pages(vec![]));
        assert_eq!(output.text, "यह घर है।");
        assert_eq!(output.report.degraded.len(), 1);

        let english = Pipeline::new(ExtractOptions::new().with_script_backend(false)).unwrap();
        let output = english.run(&Pages(vec!["a|"]), &Pages(vec![]));
        assert!(output.report.degraded.is_empty());
    }

    #[test]
    fn test_empty_document() {
        let pipeline = Pipeline::new(ExtractOptions::default()).unwrap();
        let output = pipeline.run(&Pages(vec![]), &Pages(vec![]));
        assert_eq!(output.text, "");
        assert_eq!(output.artifact(), "");
    }
}
