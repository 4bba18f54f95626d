//! # PDF Serializer
//!
//! Takes the pages drawn by the layout renderer and writes a valid PDF file.
//!
//! This is a from-scratch PDF 1.7 writer covering the small subset a
//! fixed-layout form needs: standard Type1 fonts, text runs and stroked
//! rules. Writing the bytes ourselves keeps the output deterministic: the
//! same pages and metadata always produce the same file.
//!
//! ## PDF Structure (simplified)
//!
//! ```text
//! %PDF-1.7            <- header
//! 1 0 obj ... endobj  <- objects (fonts, pages, content streams, etc.)
//! 2 0 obj ... endobj
//! ...
//! xref                <- cross-reference table (byte offsets of each object)
//! trailer             <- points to the root object
//! %%EOF
//! ```

pub mod inspect;

use std::fmt::Write as FmtWrite; // for write! on String
use std::io::Write as IoWrite; // for write! on Vec<u8>

use chrono::{DateTime, Utc};
use miniz_oxide::deflate::compress_to_vec_zlib;

use crate::font::StandardFont;
use crate::layout::{DrawOp, LayoutPage};
use crate::model::Metadata;

pub struct PdfWriter {
    compression_level: u8,
}

/// Tracks allocated PDF objects during writing.
struct PdfBuilder {
    objects: Vec<PdfObject>,
    /// Fonts in resource order: `/F0`, `/F1`, ... -> object id.
    font_objects: Vec<(StandardFont, usize)>,
}

struct PdfObject {
    data: Vec<u8>,
}

impl Default for PdfWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfWriter {
    pub fn new() -> Self {
        Self {
            compression_level: 6,
        }
    }

    pub fn with_compression(compression_level: u8) -> Self {
        Self {
            compression_level: compression_level.min(10),
        }
    }

    /// Write drawn pages to a PDF byte vector.
    pub fn write(&self, pages: &[LayoutPage], metadata: &Metadata) -> Vec<u8> {
        let mut builder = PdfBuilder {
            objects: Vec::new(),
            font_objects: Vec::new(),
        };

        // Reserve object IDs:
        // 0 = placeholder (PDF objects are 1-indexed)
        // 1 = Catalog
        // 2 = Pages (page tree root)
        // 3+ = fonts, then content streams and page objects
        builder.objects.push(PdfObject { data: vec![] });
        builder.objects.push(PdfObject { data: vec![] });
        builder.objects.push(PdfObject { data: vec![] });

        self.register_fonts(&mut builder, pages);

        let mut page_obj_ids: Vec<usize> = Vec::new();
        let font_resources = self.build_font_resource_dict(&builder.font_objects);

        for page in pages {
            let content = self.build_content_stream(page, &builder.font_objects);
            let compressed = compress_to_vec_zlib(content.as_bytes(), self.compression_level);

            let content_obj_id = builder.objects.len();
            let mut content_data: Vec<u8> = Vec::new();
            let _ = write!(
                content_data,
                "<< /Length {} /Filter /FlateDecode >>\nstream\n",
                compressed.len()
            );
            content_data.extend_from_slice(&compressed);
            content_data.extend_from_slice(b"\nendstream");
            builder.objects.push(PdfObject { data: content_data });

            let page_obj_id = builder.objects.len();
            let page_dict = format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
                 /Contents {} 0 R /Resources << /Font << {} >> >> >>",
                page.width, page.height, content_obj_id, font_resources
            );
            builder.objects.push(PdfObject {
                data: page_dict.into_bytes(),
            });
            page_obj_ids.push(page_obj_id);
        }

        builder.objects[1].data = b"<< /Type /Catalog /Pages 2 0 R >>".to_vec();

        let kids: String = page_obj_ids
            .iter()
            .map(|id| format!("{} 0 R", id))
            .collect::<Vec<_>>()
            .join(" ");
        builder.objects[2].data = format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids,
            page_obj_ids.len()
        )
        .into_bytes();

        let info_obj_id = builder.objects.len();
        builder.objects.push(PdfObject {
            data: Self::build_info_dict(metadata).into_bytes(),
        });

        self.serialize(&builder, info_obj_id)
    }

    fn build_info_dict(metadata: &Metadata) -> String {
        let mut info = String::from("<< ");
        if let Some(ref title) = metadata.title {
            let _ = write!(info, "/Title ({}) ", Self::encode_text(title));
        }
        if let Some(ref author) = metadata.author {
            let _ = write!(info, "/Author ({}) ", Self::encode_text(author));
        }
        if let Some(ref subject) = metadata.subject {
            let _ = write!(info, "/Subject ({}) ", Self::encode_text(subject));
        }
        if let Some(ref date) = metadata.creation_date {
            let _ = write!(info, "/CreationDate ({}) ", Self::pdf_date(date));
        }
        let creator = metadata.creator.as_deref().unwrap_or("taxforme");
        let _ = write!(
            info,
            "/Creator ({}) /Producer (taxforme {}) >>",
            Self::encode_text(creator),
            env!("CARGO_PKG_VERSION")
        );
        info
    }

    /// PDF date string, e.g. `D:20240115093000Z`.
    fn pdf_date(date: &DateTime<Utc>) -> String {
        format!("D:{}Z", date.format("%Y%m%d%H%M%S"))
    }

    /// Build the PDF content stream for a single page.
    fn build_content_stream(&self, page: &LayoutPage, font_objects: &[(StandardFont, usize)]) -> String {
        let mut stream = String::new();

        for element in &page.elements {
            match element {
                DrawOp::Text(run) => {
                    let idx = Self::font_index(run.font, font_objects);
                    let _ = write!(
                        stream,
                        "BT\n0 0 0 rg\n/F{} {:.1} Tf\n{:.2} {:.2} Td\n({}) Tj\nET\n",
                        idx,
                        run.size,
                        run.x,
                        run.y,
                        Self::encode_text(&run.text)
                    );
                }
                DrawOp::Rule { x1, x2, y, width } => {
                    let _ = write!(
                        stream,
                        "q\n0 0 0 RG\n{:.2} w\n{:.2} {:.2} m\n{:.2} {:.2} l\nS\nQ\n",
                        width, x1, y, x2, y
                    );
                }
            }
        }

        stream
    }

    /// Register each distinct font used across all pages as its own PDF
    /// font object, in a deterministic order.
    fn register_fonts(&self, builder: &mut PdfBuilder, pages: &[LayoutPage]) {
        let mut fonts: Vec<StandardFont> = pages
            .iter()
            .flat_map(|p| p.elements.iter())
            .filter_map(|e| match e {
                DrawOp::Text(run) => Some(run.font),
                _ => None,
            })
            .collect();
        fonts.sort();
        fonts.dedup();

        // Always have at least Helvetica
        if fonts.is_empty() {
            fonts.push(StandardFont::Helvetica);
        }

        for font in fonts {
            let obj_id = builder.objects.len();
            let font_dict = format!(
                "<< /Type /Font /Subtype /Type1 /BaseFont /{} \
                 /Encoding /WinAnsiEncoding >>",
                font.pdf_name()
            );
            builder.objects.push(PdfObject {
                data: font_dict.into_bytes(),
            });
            builder.font_objects.push((font, obj_id));
        }
    }

    fn build_font_resource_dict(&self, font_objects: &[(StandardFont, usize)]) -> String {
        font_objects
            .iter()
            .enumerate()
            .map(|(i, (_, obj_id))| format!("/F{} {} 0 R", i, obj_id))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Look up the font index (/F0, /F1, etc.) for a font.
    fn font_index(font: StandardFont, font_objects: &[(StandardFont, usize)]) -> usize {
        font_objects
            .iter()
            .position(|(f, _)| *f == font)
            .unwrap_or(0)
    }

    /// Encode text as the body of a PDF literal string in WinAnsi.
    ///
    /// Parentheses and backslashes are escaped, bytes outside printable
    /// ASCII become octal escapes, and characters WinAnsi can't represent
    /// become `?`.
    pub(crate) fn encode_text(s: &str) -> String {
        let mut out = String::with_capacity(s.len());
        for byte in s.chars().map(|ch| winansi_byte(ch).unwrap_or(b'?')) {
            match byte {
                b'\\' | b'(' | b')' => {
                    out.push('\\');
                    out.push(byte as char);
                }
                0x20..=0x7E => out.push(byte as char),
                _ => {
                    let _ = write!(out, "\\{:03o}", byte);
                }
            }
        }
        out
    }

    /// Lay out the header, numbered objects, xref table and trailer.
    fn serialize(&self, builder: &PdfBuilder, info_obj_id: usize) -> Vec<u8> {
        let mut output: Vec<u8> = Vec::new();
        output.extend_from_slice(b"%PDF-1.7\n%\xe2\xe3\xcf\xd3\n");

        let offsets: Vec<usize> = builder
            .objects
            .iter()
            .enumerate()
            .skip(1)
            .map(|(id, obj)| {
                let offset = output.len();
                let _ = write!(output, "{} 0 obj\n", id);
                output.extend_from_slice(&obj.data);
                output.extend_from_slice(b"\nendobj\n\n");
                offset
            })
            .collect();

        let xref_offset = output.len();
        let size = offsets.len() + 1;
        let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", size);
        for offset in &offsets {
            // Each xref entry is exactly 20 bytes including the EOL.
            let _ = write!(xref, "{:010} 00000 n \n", offset);
        }
        output.extend_from_slice(xref.as_bytes());

        let _ = write!(
            output,
            "trailer\n<< /Size {} /Root 1 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
            size, info_obj_id, xref_offset
        );
        output
    }
}

/// Windows-1252 code points 0x80-0x9F that differ from Latin-1. The five
/// undefined slots (0x81, 0x8D, 0x8F, 0x90, 0x9D) are absent.
const WINANSI_HIGH: [(u8, char); 27] = [
    (0x80, '\u{20AC}'),
    (0x82, '\u{201A}'),
    (0x83, '\u{0192}'),
    (0x84, '\u{201E}'),
    (0x85, '\u{2026}'),
    (0x86, '\u{2020}'),
    (0x87, '\u{2021}'),
    (0x88, '\u{02C6}'),
    (0x89, '\u{2030}'),
    (0x8A, '\u{0160}'),
    (0x8B, '\u{2039}'),
    (0x8C, '\u{0152}'),
    (0x8E, '\u{017D}'),
    (0x91, '\u{2018}'),
    (0x92, '\u{2019}'),
    (0x93, '\u{201C}'),
    (0x94, '\u{201D}'),
    (0x95, '\u{2022}'),
    (0x96, '\u{2013}'),
    (0x97, '\u{2014}'),
    (0x98, '\u{02DC}'),
    (0x99, '\u{2122}'),
    (0x9A, '\u{0161}'),
    (0x9B, '\u{203A}'),
    (0x9C, '\u{0153}'),
    (0x9E, '\u{017E}'),
    (0x9F, '\u{0178}'),
];

/// The WinAnsi byte for a character, if it has one.
fn winansi_byte(ch: char) -> Option<u8> {
    match ch as u32 {
        cp @ (0x20..=0x7E | 0xA0..=0xFF) => Some(cp as u8),
        _ => WINANSI_HIGH.iter().find(|(_, c)| *c == ch).map(|(b, _)| *b),
    }
}

/// Decode WinAnsi bytes back to text. Undefined bytes become U+FFFD.
pub(crate) fn decode_winansi(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| match b {
            0x80..=0x9F => WINANSI_HIGH
                .iter()
                .find(|(byte, _)| *byte == b)
                .map(|(_, c)| *c)
                .unwrap_or(char::REPLACEMENT_CHARACTER),
            _ => b as char,
        })
        .collect()
}
