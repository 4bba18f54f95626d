//! # Archive Packager
//!
//! Bundles a batch's documents (and optionally its manifest) into one ZIP
//! file. Like the PDF writer, the ZIP container is written by hand: the
//! subset needed here (deflated or stored entries, no encryption, no
//! ZIP64) is small, and owning the bytes keeps archives reproducible.
//!
//! ## ZIP Structure (simplified)
//!
//! ```text
//! [local header 1][data 1]
//! [local header 2][data 2]
//! ...
//! [central directory: one record per entry, with local header offsets]
//! [end of central directory]
//! ```
//!
//! Every name is checked for uniqueness and every document for non-zero
//! length before a single byte is written.

pub mod crc;

use std::collections::HashSet;

use chrono::{DateTime, Datelike, Timelike, Utc};
use miniz_oxide::deflate::compress_to_vec;
use miniz_oxide::inflate::decompress_to_vec;
use tracing::info;

use crate::batch::BatchOutput;
use crate::config::GeneratorConfig;
use crate::error::TaxFormError;
use crate::manifest::{archive_name, default_entry_name, manifest_as_table};
use crate::model::{GeneratedDocument, ManifestEntry};

use crc::crc32;

/// Name of the embedded manifest entry.
pub const MANIFEST_ENTRY_NAME: &str = "manifest.csv";

const LOCAL_HEADER_SIG: u32 = 0x0403_4b50;
const CENTRAL_HEADER_SIG: u32 = 0x0201_4b50;
const END_OF_CENTRAL_DIR_SIG: u32 = 0x0605_4b50;
const VERSION: u16 = 20;
const METHOD_STORED: u16 = 0;
const METHOD_DEFLATE: u16 = 8;

/// A finished archive ready for download.
#[derive(Debug, Clone)]
pub struct Archive {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// One entry read back from an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub data: Vec<u8>,
}

/// Central directory bookkeeping for one written entry.
struct CentralRecord {
    name: String,
    method: u16,
    dos_time: u16,
    dos_date: u16,
    crc: u32,
    compressed_size: u32,
    size: u32,
    offset: u32,
}

/// Streaming ZIP builder over an in-memory buffer.
pub struct ZipWriter {
    output: Vec<u8>,
    records: Vec<CentralRecord>,
    level: u8,
}

impl ZipWriter {
    pub fn new(level: u8) -> Self {
        Self {
            output: Vec::new(),
            records: Vec::new(),
            level: level.min(10),
        }
    }

    /// Append one file. Data that doesn't shrink under deflate is stored.
    pub fn add(&mut self, name: &str, data: &[u8], modified: &DateTime<Utc>) -> Result<(), TaxFormError> {
        let too_large = |what: &str| {
            TaxFormError::InvalidRequest(format!("{} exceeds the 4 GiB ZIP limit", what))
        };
        if self.records.len() >= u16::MAX as usize {
            return Err(TaxFormError::InvalidRequest(
                "archive exceeds 65535 entries".to_string(),
            ));
        }
        let name_len = u16::try_from(name.len())
            .map_err(|_| TaxFormError::InvalidRequest(format!("entry name too long: {}", name)))?;

        let deflated = compress_to_vec(data, self.level);
        let (method, payload) = if deflated.len() < data.len() {
            (METHOD_DEFLATE, deflated)
        } else {
            (METHOD_STORED, data.to_vec())
        };
        let (dos_time, dos_date) = dos_datetime(modified);
        let record = CentralRecord {
            name: name.to_string(),
            method,
            dos_time,
            dos_date,
            crc: crc32(data),
            compressed_size: u32::try_from(payload.len()).map_err(|_| too_large(name))?,
            size: u32::try_from(data.len()).map_err(|_| too_large(name))?,
            offset: u32::try_from(self.output.len()).map_err(|_| too_large("archive"))?,
        };

        let out = &mut self.output;
        put_u32(out, LOCAL_HEADER_SIG);
        put_u16(out, VERSION);
        put_u16(out, 0); // flags
        put_u16(out, record.method);
        put_u16(out, record.dos_time);
        put_u16(out, record.dos_date);
        put_u32(out, record.crc);
        put_u32(out, record.compressed_size);
        put_u32(out, record.size);
        put_u16(out, name_len);
        put_u16(out, 0); // extra field length
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(&payload);

        self.records.push(record);
        Ok(())
    }

    /// Write the central directory and return the archive bytes.
    pub fn finish(mut self) -> Result<Vec<u8>, TaxFormError> {
        let too_large = || TaxFormError::InvalidRequest("archive exceeds the 4 GiB ZIP limit".to_string());
        let cd_offset = u32::try_from(self.output.len()).map_err(|_| too_large())?;

        for record in &self.records {
            let out = &mut self.output;
            put_u32(out, CENTRAL_HEADER_SIG);
            put_u16(out, VERSION); // made by
            put_u16(out, VERSION); // needed
            put_u16(out, 0); // flags
            put_u16(out, record.method);
            put_u16(out, record.dos_time);
            put_u16(out, record.dos_date);
            put_u32(out, record.crc);
            put_u32(out, record.compressed_size);
            put_u32(out, record.size);
            put_u16(out, record.name.len() as u16);
            put_u16(out, 0); // extra
            put_u16(out, 0); // comment
            put_u16(out, 0); // disk number start
            put_u16(out, 0); // internal attributes
            put_u32(out, 0); // external attributes
            put_u32(out, record.offset);
            out.extend_from_slice(record.name.as_bytes());
        }

        let cd_size = u32::try_from(self.output.len()).map_err(|_| too_large())? - cd_offset;
        let count = self.records.len() as u16;
        let out = &mut self.output;
        put_u32(out, END_OF_CENTRAL_DIR_SIG);
        put_u16(out, 0); // this disk
        put_u16(out, 0); // disk with central directory
        put_u16(out, count);
        put_u16(out, count);
        put_u32(out, cd_size);
        put_u32(out, cd_offset);
        put_u16(out, 0); // comment length

        Ok(self.output)
    }
}

fn put_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

/// MS-DOS (time, date). Dates before 1980 clamp to 1980-01-01 00:00.
fn dos_datetime(ts: &DateTime<Utc>) -> (u16, u16) {
    if ts.year() < 1980 {
        return (0, (1 << 5) | 1);
    }
    let time = ((ts.hour() as u16) << 11) | ((ts.minute() as u16) << 5) | (ts.second() as u16 / 2);
    let date = (((ts.year() - 1980).min(127) as u16) << 9) | ((ts.month() as u16) << 5) | ts.day() as u16;
    (time, date)
}

/// Packages batches using the generator config's compression and
/// manifest settings.
pub struct Packager {
    level: u8,
    embed_manifest: bool,
    prefix: String,
}

impl Packager {
    pub fn new(config: &GeneratorConfig) -> Self {
        Self {
            level: config.compression_level,
            embed_manifest: config.embed_manifest,
            prefix: config.archive_prefix.clone(),
        }
    }

    /// Write every document into one ZIP under `naming_fn(entry)`.
    ///
    /// `documents` and `manifest` must be index-aligned. Fails without
    /// writing anything if two entries share a name or a document is empty.
    pub fn package<F>(
        &self,
        documents: &[GeneratedDocument],
        manifest: &[ManifestEntry],
        naming_fn: F,
    ) -> Result<Vec<u8>, TaxFormError>
    where
        F: Fn(&ManifestEntry) -> String,
    {
        if documents.len() != manifest.len() {
            return Err(TaxFormError::InvalidRequest(format!(
                "{} documents but {} manifest entries",
                documents.len(),
                manifest.len()
            )));
        }

        let names: Vec<String> = manifest.iter().map(&naming_fn).collect();
        let mut seen = HashSet::with_capacity(names.len() + 1);
        if self.embed_manifest {
            seen.insert(MANIFEST_ENTRY_NAME);
        }
        for (name, document) in names.iter().zip(documents) {
            if !seen.insert(name.as_str()) {
                return Err(TaxFormError::NamingCollision(name.clone()));
            }
            if document.bytes().is_empty() {
                return Err(TaxFormError::EmptyDocument(name.clone()));
            }
        }

        let mut zip = ZipWriter::new(self.level);
        for ((name, document), entry) in names.iter().zip(documents).zip(manifest) {
            zip.add(name, document.bytes(), &entry.generation_timestamp)?;
        }
        if self.embed_manifest {
            let modified = manifest
                .last()
                .map(|e| e.generation_timestamp)
                .unwrap_or_default();
            zip.add(MANIFEST_ENTRY_NAME, &manifest_as_table(manifest), &modified)?;
        }
        let bytes = zip.finish()?;

        info!(
            entries = documents.len(),
            manifest = self.embed_manifest,
            bytes = bytes.len(),
            "packaged archive"
        );
        Ok(bytes)
    }

    /// Package a batch with default entry names, naming the archive after
    /// `timestamp`.
    pub fn package_batch(&self, output: &BatchOutput, timestamp: &DateTime<Utc>) -> Result<Archive, TaxFormError> {
        let bytes = self.package(&output.documents, &output.manifest, default_entry_name)?;
        Ok(Archive {
            file_name: archive_name(&self.prefix, timestamp),
            bytes,
        })
    }
}

/// Read every entry of an archive written by [`ZipWriter`].
pub fn read_entries(bytes: &[u8]) -> Result<Vec<ArchiveEntry>, TaxFormError> {
    let bad = |msg: &str| TaxFormError::Inspect(format!("zip: {}", msg));

    if bytes.len() < 22 {
        return Err(bad("too short"));
    }
    let eocd = bytes.len() - 22;
    if read_u32(bytes, eocd) != Some(END_OF_CENTRAL_DIR_SIG) {
        return Err(bad("end of central directory not found"));
    }
    let count = read_u16(bytes, eocd + 10).ok_or_else(|| bad("truncated"))? as usize;
    let mut pos = read_u32(bytes, eocd + 16).ok_or_else(|| bad("truncated"))? as usize;

    let mut entries = Vec::with_capacity(count);
    for _ in 0..count {
        if read_u32(bytes, pos) != Some(CENTRAL_HEADER_SIG) {
            return Err(bad("bad central directory record"));
        }
        let field = |off: usize| read_u16(bytes, pos + off).ok_or_else(|| bad("truncated"));
        let method = field(10)?;
        let crc = read_u32(bytes, pos + 16).ok_or_else(|| bad("truncated"))?;
        let compressed = read_u32(bytes, pos + 20).ok_or_else(|| bad("truncated"))? as usize;
        let name_len = field(28)? as usize;
        let extra_len = field(30)? as usize;
        let comment_len = field(32)? as usize;
        let offset = read_u32(bytes, pos + 42).ok_or_else(|| bad("truncated"))? as usize;
        let name_bytes = bytes
            .get(pos + 46..pos + 46 + name_len)
            .ok_or_else(|| bad("truncated name"))?;
        let name = String::from_utf8_lossy(name_bytes).into_owned();

        let local_name_len = read_u16(bytes, offset + 26).ok_or_else(|| bad("truncated"))? as usize;
        let local_extra_len = read_u16(bytes, offset + 28).ok_or_else(|| bad("truncated"))? as usize;
        let data_start = offset + 30 + local_name_len + local_extra_len;
        let payload = bytes
            .get(data_start..data_start + compressed)
            .ok_or_else(|| bad("truncated data"))?;

        let data = match method {
            METHOD_STORED => payload.to_vec(),
            METHOD_DEFLATE => decompress_to_vec(payload).map_err(|_| bad("inflate failed"))?,
            other => return Err(bad(&format!("unsupported method {}", other))),
        };
        if crc32(&data) != crc {
            return Err(bad(&format!("crc mismatch in {}", name)));
        }
        entries.push(ArchiveEntry { name, data });
        pos += 46 + name_len + extra_len + comment_len;
    }
    Ok(entries)
}

fn read_u16(bytes: &[u8], at: usize) -> Option<u16> {
    let b = bytes.get(at..at + 2)?;
    Some(u16::from_le_bytes([b[0], b[1]]))
}

fn read_u32(bytes: &[u8], at: usize) -> Option<u32> {
    let b = bytes.get(at..at + 4)?;
    Some(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DocumentKind, FormKind};
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 29, 13, 45, 58).unwrap()
    }

    fn doc(seq: u32, bytes: &[u8]) -> (GeneratedDocument, ManifestEntry) {
        let entry = ManifestEntry {
            sequence_id: seq,
            form_kind: DocumentKind::Form(FormKind::Primary),
            tax_year: Some(2023),
            generation_timestamp: ts(),
        };
        let document = GeneratedDocument::new(
            entry.form_kind,
            entry.tax_year,
            seq,
            ts(),
            default_entry_name(&entry),
            bytes.to_vec(),
        );
        (document, entry)
    }

    fn split(items: Vec<(GeneratedDocument, ManifestEntry)>) -> (Vec<GeneratedDocument>, Vec<ManifestEntry>) {
        items.into_iter().unzip()
    }

    #[test]
    fn dos_datetime_packs_fields() {
        let (time, date) = dos_datetime(&ts());
        assert_eq!(time, (13 << 11) | (45 << 5) | 29);
        assert_eq!(date, (44 << 9) | (2 << 5) | 29);
    }

    #[test]
    fn writer_round_trips_entries() {
        let mut zip = ZipWriter::new(6);
        let repetitive = vec![b'a'; 4096];
        zip.add("a.txt", &repetitive, &ts()).unwrap();
        zip.add("b.bin", &[1, 2, 3], &ts()).unwrap();
        let bytes = zip.finish().unwrap();
        assert!(bytes.starts_with(b"PK\x03\x04"));

        let entries = read_entries(&bytes).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "a.txt");
        assert_eq!(entries[0].data, repetitive);
        assert_eq!(entries[1].data, vec![1, 2, 3]);
    }

    #[test]
    fn package_uses_naming_fn_and_embeds_manifest() {
        let packager = Packager::new(&GeneratorConfig::default());
        let (docs, manifest) = split(vec![doc(1, b"%PDF-one"), doc(2, b"%PDF-two")]);
        let bytes = packager.package(&docs, &manifest, default_entry_name).unwrap();
        let names: Vec<String> = read_entries(&bytes).unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["1040_2023_0001.pdf", "1040_2023_0002.pdf", "manifest.csv"]);
    }

    #[test]
    fn package_without_manifest() {
        let config = GeneratorConfig {
            embed_manifest: false,
            ..Default::default()
        };
        let packager = Packager::new(&config);
        let (docs, manifest) = split(vec![doc(1, b"%PDF-one")]);
        let entries = read_entries(&packager.package(&docs, &manifest, default_entry_name).unwrap()).unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn colliding_names_abort() {
        let packager = Packager::new(&GeneratorConfig::default());
        let (docs, manifest) = split(vec![doc(1, b"x"), doc(2, b"y")]);
        let result = packager.package(&docs, &manifest, |_| "same.pdf".to_string());
        assert!(matches!(result, Err(TaxFormError::NamingCollision(name)) if name == "same.pdf"));
    }

    #[test]
    fn name_clashing_with_manifest_aborts() {
        let packager = Packager::new(&GeneratorConfig::default());
        let (docs, manifest) = split(vec![doc(1, b"x")]);
        let result = packager.package(&docs, &manifest, |_| MANIFEST_ENTRY_NAME.to_string());
        assert!(matches!(result, Err(TaxFormError::NamingCollision(_))));
    }

    #[test]
    fn empty_document_aborts() {
        let packager = Packager::new(&GeneratorConfig::default());
        let (docs, manifest) = split(vec![doc(1, b"x"), doc(2, b"")]);
        let result = packager.package(&docs, &manifest, default_entry_name);
        assert!(matches!(result, Err(TaxFormError::EmptyDocument(_))));
    }

    #[test]
    fn misaligned_inputs_abort() {
        let packager = Packager::new(&GeneratorConfig::default());
        let (docs, _) = split(vec![doc(1, b"x")]);
        assert!(packager.package(&docs, &[], default_entry_name).is_err());
    }

    #[test]
    fn corrupt_archive_is_rejected() {
        let mut zip = ZipWriter::new(6);
        zip.add("a.txt", b"hello hello hello hello", &ts()).unwrap();
        let mut bytes = zip.finish().unwrap();
        // first byte of entry data: 30-byte header + 5-byte name
        bytes[35] ^= 0xFF;
        assert!(read_entries(&bytes).is_err());
    }
}
