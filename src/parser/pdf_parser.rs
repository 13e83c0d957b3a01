//! PDF document access using lopdf.

use std::path::Path;

use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId};

use super::backend::{PageText, TableIter, TableSource, TextSource};
use super::layout::{decode_text_simple, get_number, LayoutAnalyzer, TextSpan};
use super::table_detector::{TableDetector, TableDetectorConfig};
use crate::detect::{pdf_version_from_bytes, probe_source};
use crate::error::{Error, Result};
use crate::model::{parse_pdf_date, Metadata};

/// US Letter, used when a page has no readable MediaBox.
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// How far outside the MediaBox a span may start and still count as page
/// content, in points.
const OFF_PAGE_MARGIN: f32 = 72.0;

/// A loaded PDF that serves reading-order text and tables page by page.
pub struct PdfDocument {
    doc: LopdfDocument,
    page_ids: Vec<ObjectId>,
    metadata: Metadata,
    detector: TableDetector,
}

impl PdfDocument {
    /// Open a PDF file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        probe_source(path)?;
        let doc = LopdfDocument::load(path)?;
        Ok(Self::from_lopdf(doc))
    }

    /// Parse a PDF from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        pdf_version_from_bytes(data)?;
        let doc = LopdfDocument::load_mem(data)?;
        Ok(Self::from_lopdf(doc))
    }

    fn from_lopdf(doc: LopdfDocument) -> Self {
        let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
        let metadata = read_metadata(&doc, page_ids.len());
        log::debug!(
            "Opened PDF {} with {} pages",
            metadata.pdf_version,
            metadata.page_count
        );

        Self {
            doc,
            page_ids,
            metadata,
            detector: TableDetector::new(),
        }
    }

    /// Use a custom table detector configuration.
    pub fn with_table_config(mut self, config: TableDetectorConfig) -> Self {
        self.detector = TableDetector::with_config(config);
        self
    }

    /// Document metadata.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn page_id(&self, index: usize) -> Option<ObjectId> {
        self.page_ids.get(index).copied()
    }

    /// Positioned spans of a page, minus those that are not finite or lie
    /// off the page.
    fn spans(&self, page_id: ObjectId) -> Result<Vec<TextSpan>> {
        let [x0, y0, x1, y1] = self.media_box(page_id).unwrap_or(DEFAULT_MEDIA_BOX);
        let x_range = x0.min(x1) - OFF_PAGE_MARGIN..=x0.max(x1) + OFF_PAGE_MARGIN;
        let y_range = y0.min(y1) - OFF_PAGE_MARGIN..=y0.max(y1) + OFF_PAGE_MARGIN;

        let mut spans = LayoutAnalyzer::new(&self.doc).page_spans(page_id)?;
        let total = spans.len();
        spans.retain(|span| {
            span.font_size.is_finite()
                && span.width.is_finite()
                && x_range.contains(&span.x)
                && y_range.contains(&span.y)
        });
        if spans.len() < total {
            log::debug!("Dropped {} off-page span(s)", total - spans.len());
        }
        Ok(spans)
    }

    /// Top edge and height of a page, from its (possibly inherited) MediaBox.
    fn page_box(&self, page_id: ObjectId) -> (f32, f32) {
        let [_, y0, _, y1] = self.media_box(page_id).unwrap_or(DEFAULT_MEDIA_BOX);
        (y0.max(y1), (y1 - y0).abs())
    }

    fn media_box(&self, page_id: ObjectId) -> Option<[f32; 4]> {
        let mut dict = self.doc.get_dictionary(page_id).ok()?;
        // Bounded walk up the page tree; MediaBox is inheritable.
        for _ in 0..32 {
            if let Ok(media_box) = dict.get(b"MediaBox") {
                return read_rect(&self.doc, media_box);
            }
            let parent = dict.get(b"Parent").and_then(Object::as_reference).ok()?;
            dict = self.doc.get_dictionary(parent).ok()?;
        }
        None
    }
}

impl TextSource for PdfDocument {
    fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    fn reading_order_text(&self, index: usize) -> Result<PageText> {
        let page_error = |reason: String| Error::PageTextExtraction {
            page: index + 1,
            reason,
        };
        let page_id = self
            .page_id(index)
            .ok_or_else(|| page_error("page out of range".to_string()))?;

        let (top, height) = self.page_box(page_id);
        let spans = self.spans(page_id).map_err(|e| page_error(e.to_string()))?;
        let mut text = LayoutAnalyzer::new(&self.doc).reading_order(spans, top);
        text.height = Some(height);

        if text.text.trim().is_empty() {
            // lopdf's own extractor sometimes reads streams the span pass
            // cannot position; the text is kept without anchors.
            let page_number = index as u32 + 1;
            if let Ok(plain) = self.doc.extract_text(&[page_number]) {
                if !plain.trim().is_empty() {
                    log::debug!("Page {}: using unpositioned text", page_number);
                    text = PageText {
                        text: plain,
                        anchors: Vec::new(),
                        height: Some(height),
                    };
                }
            }
        }

        Ok(text)
    }
}

impl TableSource for PdfDocument {
    fn find_tables(&self, index: usize) -> Result<TableIter<'_>> {
        let page_error = |reason: String| Error::PageTableDetection {
            page: index + 1,
            reason,
        };
        let page_id = self
            .page_id(index)
            .ok_or_else(|| page_error("page out of range".to_string()))?;

        let (top, _) = self.page_box(page_id);
        let spans = self.spans(page_id).map_err(|e| page_error(e.to_string()))?;
        let tables = self.detector.detect(&spans);
        log::debug!("Page {}: {} table(s) detected", index + 1, tables.len());

        Ok(Box::new(
            tables
                .into_iter()
                .enumerate()
                .map(move |(order, table)| table.to_region(order, top)),
        ))
    }
}

fn read_metadata(doc: &LopdfDocument, page_count: usize) -> Metadata {
    let mut metadata = Metadata::with_version(doc.version.to_string());
    metadata.page_count = page_count;

    let info = doc
        .trailer
        .get(b"Info")
        .and_then(Object::as_reference)
        .and_then(|id| doc.get_dictionary(id));
    if let Ok(info) = info {
        metadata.title = get_string(info, b"Title").filter(|t| !t.trim().is_empty());
        metadata.created = get_string(info, b"CreationDate").and_then(|d| parse_pdf_date(&d));
    }

    metadata
}

fn get_string(dict: &Dictionary, key: &[u8]) -> Option<String> {
    match dict.get(key).ok()? {
        Object::String(bytes, _) => Some(decode_text_simple(bytes)),
        Object::Name(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        _ => None,
    }
}

fn read_rect(doc: &LopdfDocument, obj: &Object) -> Option<[f32; 4]> {
    let obj = match obj {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };
    let values: Vec<f32> = obj.as_array().ok()?.iter().filter_map(get_number).collect();
    values.try_into().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Stream};

    fn one_page_pdf(lines: &[(&str, i64, i64)], media_box: Option<[i64; 4]>) -> Vec<u8> {
        let mut doc = LopdfDocument::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut operations = Vec::new();
        for &(text, x, y) in lines {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), 12.into()]));
            operations.push(Operation::new("Td", vec![x.into(), y.into()]));
            operations.push(Operation::new("Tj", vec![Object::string_literal(text)]));
            operations.push(Operation::new("ET", vec![]));
        }
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });

        let mut pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
        };
        if let Some(rect) = media_box {
            pages.set("MediaBox", rect.iter().map(|&v| v.into()).collect::<Vec<Object>>());
        }
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_reading_order_text_and_anchors() {
        let data = one_page_pdf(
            &[("First block", 72, 700), ("Second block", 72, 500)],
            Some([0, 0, 612, 792]),
        );
        let pdf = PdfDocument::from_bytes(&data).unwrap();
        assert_eq!(pdf.page_count(), 1);
        assert_eq!(pdf.metadata().page_count, 1);

        let page = pdf.reading_order_text(0).unwrap();
        assert_eq!(page.text, "First block\n\nSecond block");
        assert_eq!(page.anchors.len(), 2);
        assert!(page.anchors[0].top < page.anchors[1].top);
        assert_eq!(page.height, Some(792.0));
    }

    #[test]
    fn test_inherited_and_default_media_box() {
        let data = one_page_pdf(&[("Text", 72, 300)], Some([0, 0, 420, 595]));
        let pdf = PdfDocument::from_bytes(&data).unwrap();
        assert_eq!(pdf.reading_order_text(0).unwrap().height, Some(595.0));

        let data = one_page_pdf(&[("Text", 72, 300)], None);
        let pdf = PdfDocument::from_bytes(&data).unwrap();
        assert_eq!(pdf.reading_order_text(0).unwrap().height, Some(792.0));
    }

    #[test]
    fn test_off_page_spans_dropped() {
        let data = one_page_pdf(
            &[("Real prose here.", 72, 700), ("stray", 1_000_000_000_000, 700)],
            Some([0, 0, 612, 792]),
        );
        let pdf = PdfDocument::from_bytes(&data).unwrap();

        let page = pdf.reading_order_text(0).unwrap();
        assert_eq!(page.text, "Real prose here.");
        assert_eq!(pdf.find_tables(0).unwrap().count(), 0);
    }

    #[test]
    fn test_find_tables() {
        let data = one_page_pdf(
            &[
                ("Substance", 72, 600),
                ("Formula", 250, 600),
                ("Water", 72, 580),
                ("H2O", 250, 580),
            ],
            Some([0, 0, 612, 792]),
        );
        let pdf = PdfDocument::from_bytes(&data).unwrap();
        let tables: Vec<_> = pdf.find_tables(0).unwrap().collect();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].rows()[0], vec!["Substance".to_string(), "Formula".to_string()]);
        assert!(tables[0].bbox.is_some());
    }

    #[test]
    fn test_out_of_range_page() {
        let data = one_page_pdf(&[("Text", 72, 300)], None);
        let pdf = PdfDocument::from_bytes(&data).unwrap();
        assert!(matches!(
            pdf.reading_order_text(5),
            Err(Error::PageTextExtraction { page: 6, .. })
        ));
        assert!(matches!(
            pdf.find_tables(5),
            Err(Error::PageTableDetection { page: 6, .. })
        ));
    }

    #[test]
    fn test_rejects_non_pdf_bytes() {
        assert!(matches!(
            PdfDocument::from_bytes(b"<html></html>"),
            Err(Error::UnknownFormat)
        ));
    }
}
