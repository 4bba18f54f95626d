//! Read back documents produced by [`PdfWriter`](super::PdfWriter).
//!
//! Parsing goes through `lopdf`: the page tree gives the page count and
//! order, each page's content stream is decoded into operations, and the
//! string operand of every `Tj` is collected as one text run.

use lopdf::content::Content;
use lopdf::{Document as LoDocument, Object as LoObject};
use serde::Serialize;

use super::decode_winansi;
use crate::error::TaxFormError;

/// What a generated document contains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PdfReport {
    pub version: String,
    pub page_count: usize,
    pub title: Option<String>,
    /// Text runs per page, in drawing order.
    pub pages: Vec<Vec<String>>,
    pub file_size_bytes: usize,
}

impl PdfReport {
    /// All text runs joined by newlines, pages in order.
    pub fn text(&self) -> String {
        self.pages
            .iter()
            .flat_map(|p| p.iter())
            .cloned()
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn contains_text(&self, needle: &str) -> bool {
        self.pages.iter().flatten().any(|run| run.contains(needle))
    }
}

fn lopdf_err(err: lopdf::Error) -> TaxFormError {
    TaxFormError::Inspect(err.to_string())
}

pub fn inspect(bytes: &[u8]) -> Result<PdfReport, TaxFormError> {
    let pdf = LoDocument::load_mem(bytes).map_err(lopdf_err)?;

    let page_ids = pdf.get_pages();
    let mut pages = Vec::with_capacity(page_ids.len());
    for (page_no, page_id) in &page_ids {
        let raw = pdf.get_page_content(*page_id).map_err(lopdf_err)?;
        let content = Content::decode(&raw).map_err(|e| {
            TaxFormError::Inspect(format!("page {}: {}", page_no, e))
        })?;
        pages.push(text_runs(&content));
    }

    Ok(PdfReport {
        version: pdf.version.clone(),
        page_count: page_ids.len(),
        title: info_title(&pdf),
        pages,
        file_size_bytes: bytes.len(),
    })
}

/// The string operand of every `Tj`, in order.
fn text_runs(content: &Content) -> Vec<String> {
    content
        .operations
        .iter()
        .filter(|op| op.operator == "Tj")
        .filter_map(|op| match op.operands.first() {
            Some(LoObject::String(bytes, _)) => Some(decode_winansi(bytes)),
            _ => None,
        })
        .collect()
}

fn info_title(pdf: &LoDocument) -> Option<String> {
    let info = match pdf.trailer.get(b"Info").ok()? {
        LoObject::Reference(id) => pdf.get_object(*id).ok()?,
        direct => direct,
    };
    match info.as_dict().ok()?.get(b"Title").ok()? {
        LoObject::String(bytes, _) => Some(decode_winansi(bytes)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::StandardFont;
    use crate::layout::{DrawOp, LayoutPage, TextRun};
    use crate::model::Metadata;
    use crate::pdf::PdfWriter;

    fn page(lines: &[&str]) -> LayoutPage {
        LayoutPage {
            width: 612.0,
            height: 792.0,
            elements: lines
                .iter()
                .enumerate()
                .map(|(i, s)| {
                    DrawOp::Text(TextRun {
                        x: 72.0,
                        y: 700.0 - 20.0 * i as f64,
                        font: StandardFont::Helvetica,
                        size: 12.0,
                        text: s.to_string(),
                    })
                })
                .collect(),
        }
    }

    #[test]
    fn reads_back_text_per_page() {
        let pages = vec![page(&["Wages: $1,000.00", "Name (legal)"]), page(&["Second"])];
        let metadata = Metadata {
            title: Some("Tax Form 1040".to_string()),
            ..Default::default()
        };
        let bytes = PdfWriter::new().write(&pages, &metadata);
        let report = inspect(&bytes).unwrap();

        assert_eq!(report.version, "1.7");
        assert_eq!(report.page_count, 2);
        assert_eq!(report.title.as_deref(), Some("Tax Form 1040"));
        assert_eq!(report.pages[0], vec!["Wages: $1,000.00", "Name (legal)"]);
        assert_eq!(report.pages[1], vec!["Second"]);
        assert!(report.contains_text("Second"));
    }

    #[test]
    fn decodes_octal_escapes() {
        let bytes = PdfWriter::new().write(&[page(&["Jos\u{e9}"])], &Metadata::default());
        let report = inspect(&bytes).unwrap();
        assert_eq!(report.pages[0], vec!["Jos\u{e9}"]);
    }

    #[test]
    fn page_tokens_in_metadata_do_not_confuse_page_count() {
        let metadata = Metadata {
            title: Some("Form /Type /Page".to_string()),
            author: Some("/Type /Page".to_string()),
            ..Default::default()
        };
        let bytes = PdfWriter::new().write(&[page(&["Only"])], &metadata);
        let report = inspect(&bytes).unwrap();
        assert_eq!(report.page_count, 1);
        assert_eq!(report.title.as_deref(), Some("Form /Type /Page"));
        assert_eq!(report.pages[0], vec!["Only"]);
    }

    #[test]
    fn forged_stream_length_does_not_panic() {
        let bytes = PdfWriter::new().write(&[page(&["Body"])], &Metadata::default());
        let text = String::from_utf8_lossy(&bytes).into_owned();
        let start = text.find("/Length ").unwrap() + "/Length ".len();
        let end = start + text[start..].find(' ').unwrap();
        let mut forged = bytes[..start].to_vec();
        forged.extend_from_slice(u64::MAX.to_string().as_bytes());
        forged.extend_from_slice(&bytes[end..]);
        // Either rejected or recovered from the stream delimiters.
        if let Ok(report) = inspect(&forged) {
            assert_eq!(report.page_count, 1);
        }
    }

    #[test]
    fn rejects_non_pdf() {
        assert!(inspect(b"PK\x03\x04").is_err());
    }
}
