//! # Form Document Composer
//!
//! Turns validated records into finished PDF documents. Two shapes are
//! supported: a single form on one page, or the fixed three-page composite
//! (1040, Schedule 1, Schedule 2) with each form starting a new page.
//!
//! The composer is the only place that consults [`Capability`]. If the
//! drawing backend is missing, composition fails before any drawing
//! happens and no bytes are returned.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::{Capability, GeneratorConfig};
use crate::context::RequestContext;
use crate::error::TaxFormError;
use crate::layout::{self, Canvas, LayoutPage};
use crate::manifest::single_document_name;
use crate::model::{DocumentKind, FieldRecord, FormKind, GeneratedDocument, Metadata};

/// What to compose.
#[derive(Debug, Clone, Copy)]
pub enum Composition<'a> {
    /// One form on one page. The record's kind selects the layout.
    Single(&'a FieldRecord),
    /// Three pages in declared kind order; records must be 1040,
    /// Schedule 1 and Schedule 2, in that order.
    Composite([&'a FieldRecord; 3]),
}

impl Composition<'_> {
    pub fn document_kind(&self) -> DocumentKind {
        match self {
            Composition::Single(record) => DocumentKind::Form(record.kind),
            Composition::Composite(_) => DocumentKind::Composite,
        }
    }

    fn records(&self) -> &[&FieldRecord] {
        match self {
            Composition::Single(record) => std::slice::from_ref(record),
            Composition::Composite(records) => records,
        }
    }
}

/// Per-document values that aren't part of the record itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stamp {
    pub tax_year: Option<i32>,
    /// Written as the PDF creation date. `None` leaves it out, which makes
    /// the output a pure function of the records.
    pub created: Option<DateTime<Utc>>,
}

pub struct Composer {
    config: GeneratorConfig,
}

impl Composer {
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Header text for one page: `"<prefix> <kind>"`, plus `" (<year>)"`
    /// when a tax year is set.
    pub fn header_text(&self, kind: FormKind, tax_year: Option<i32>) -> String {
        match tax_year {
            Some(year) => format!("{} {} ({})", self.config.title_prefix, kind.display_name(), year),
            None => format!("{} {}", self.config.title_prefix, kind.display_name()),
        }
    }

    /// Compose one or three forms into a complete PDF.
    pub fn compose(&self, composition: Composition<'_>, stamp: &Stamp) -> Result<Vec<u8>, TaxFormError> {
        if self.config.capability != Capability::Available {
            return Err(TaxFormError::MissingCapability);
        }

        if let Composition::Composite(records) = &composition {
            for (record, expected) in records.iter().zip(FormKind::ALL) {
                if record.kind != expected {
                    return Err(TaxFormError::invalid_record(
                        record.kind,
                        "kind",
                        format!("composite expects {} in this position", expected),
                    ));
                }
            }
        }
        for record in composition.records() {
            record.validate()?;
        }

        let pages = self.draw(&composition, stamp.tax_year);
        let metadata = self.metadata(&composition, stamp);
        let bytes = write_pdf(&pages, &metadata, self.config.compression_level)?;

        debug!(
            kind = %composition.document_kind(),
            pages = pages.len(),
            bytes = bytes.len(),
            "composed document"
        );
        Ok(bytes)
    }

    /// Compose a single form with no year or timestamp.
    pub fn compose_form(&self, record: &FieldRecord) -> Result<Vec<u8>, TaxFormError> {
        self.compose(Composition::Single(record), &Stamp::default())
    }

    /// The single-document path: compose once and name the result
    /// `{kind}_{timestamp}.pdf`.
    pub fn generate(
        &self,
        composition: Composition<'_>,
        tax_year: Option<i32>,
        ctx: &RequestContext,
    ) -> Result<GeneratedDocument, TaxFormError> {
        let timestamp = ctx.now();
        let stamp = Stamp {
            tax_year,
            created: Some(timestamp),
        };
        let bytes = self.compose(composition, &stamp)?;
        let kind = composition.document_kind();
        Ok(GeneratedDocument::new(
            kind,
            tax_year,
            1,
            timestamp,
            single_document_name(kind, &timestamp),
            bytes,
        ))
    }

    /// Lay out every page of a composition.
    pub fn draw(&self, composition: &Composition<'_>, tax_year: Option<i32>) -> Vec<LayoutPage> {
        let mut canvas = Canvas::new(&self.config);
        for record in composition.records() {
            canvas.begin_page(&self.header_text(record.kind, tax_year));
            layout::render(record.kind, record, &mut canvas);
        }
        canvas.into_pages()
    }

    fn metadata(&self, composition: &Composition<'_>, stamp: &Stamp) -> Metadata {
        let title = match composition {
            Composition::Single(record) => self.header_text(record.kind, stamp.tax_year),
            Composition::Composite(_) => {
                let names: Vec<&str> = FormKind::ALL.iter().map(|k| k.display_name()).collect();
                match stamp.tax_year {
                    Some(year) => format!("{} {} ({})", self.config.title_prefix, names.join(", "), year),
                    None => format!("{} {}", self.config.title_prefix, names.join(", ")),
                }
            }
        };
        Metadata {
            title: Some(title),
            author: self.config.author.clone(),
            subject: None,
            creator: None,
            creation_date: stamp.created,
        }
    }
}

#[cfg(feature = "pdf")]
fn write_pdf(pages: &[LayoutPage], metadata: &Metadata, level: u8) -> Result<Vec<u8>, TaxFormError> {
    Ok(crate::pdf::PdfWriter::with_compression(level).write(pages, metadata))
}

#[cfg(not(feature = "pdf"))]
fn write_pdf(_pages: &[LayoutPage], _metadata: &Metadata, _level: u8) -> Result<Vec<u8>, TaxFormError> {
    Err(TaxFormError::MissingCapability)
}
