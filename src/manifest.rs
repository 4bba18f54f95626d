//! Manifest tables and file naming.
//!
//! Names are pure functions of their inputs, so an archive rebuilt from the
//! same manifest always has the same entry names.

use std::fmt::Write as FmtWrite;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TaxFormError;
use crate::model::{DocumentKind, ManifestEntry};

/// Timestamp layout used in single-document and archive file names.
pub const FILE_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Column order of the manifest table.
pub const MANIFEST_COLUMNS: [&str; 4] = [
    "sequence_id",
    "form_kind",
    "tax_year",
    "generation_timestamp",
];

/// Archive entry name for a manifest entry:
/// `{kind}_{year}_{sequence:04}.pdf`, or `{kind}_{sequence:04}.pdf` without
/// a year.
pub fn default_entry_name(entry: &ManifestEntry) -> String {
    match entry.tax_year {
        Some(year) => format!("{}_{}_{:04}.pdf", entry.form_kind.slug(), year, entry.sequence_id),
        None => format!("{}_{:04}.pdf", entry.form_kind.slug(), entry.sequence_id),
    }
}

/// File name for a single downloaded document: `{kind}_{timestamp}.pdf`.
pub fn single_document_name(kind: DocumentKind, timestamp: &DateTime<Utc>) -> String {
    format!("{}_{}.pdf", kind.slug(), timestamp.format(FILE_TIMESTAMP_FORMAT))
}

/// File name for a batch archive: `{prefix}_{timestamp}.zip`.
pub fn archive_name(prefix: &str, timestamp: &DateTime<Utc>) -> String {
    format!("{}_{}.zip", prefix, timestamp.format(FILE_TIMESTAMP_FORMAT))
}

/// Output format for a standalone manifest download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestFormat {
    #[default]
    Csv,
    Json,
}

impl ManifestFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ManifestFormat::Csv => "csv",
            ManifestFormat::Json => "json",
        }
    }
}

/// Render the manifest as a CSV table with a header row.
pub fn manifest_as_table(manifest: &[ManifestEntry]) -> Vec<u8> {
    let mut out = String::new();
    out.push_str(&MANIFEST_COLUMNS.join(","));
    out.push('\n');
    for entry in manifest {
        let year = entry.tax_year.map(|y| y.to_string()).unwrap_or_default();
        let _ = writeln!(
            out,
            "{},{},{},{}",
            entry.sequence_id,
            csv_field(entry.form_kind.slug()),
            year,
            entry.generation_timestamp.to_rfc3339(),
        );
    }
    out.into_bytes()
}

/// Render the manifest as a pretty-printed JSON array.
pub fn manifest_as_json(manifest: &[ManifestEntry]) -> Result<Vec<u8>, TaxFormError> {
    Ok(serde_json::to_vec_pretty(manifest)?)
}

pub fn render_manifest(
    manifest: &[ManifestEntry],
    format: ManifestFormat,
) -> Result<Vec<u8>, TaxFormError> {
    match format {
        ManifestFormat::Csv => Ok(manifest_as_table(manifest)),
        ManifestFormat::Json => manifest_as_json(manifest),
    }
}

/// Quote a CSV cell if it contains a delimiter, quote or newline.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FormKind;
    use chrono::TimeZone;

    fn entry(seq: u32, year: Option<i32>) -> ManifestEntry {
        ManifestEntry {
            sequence_id: seq,
            form_kind: DocumentKind::Form(FormKind::Primary),
            tax_year: year,
            generation_timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 8, 15, 30).unwrap(),
        }
    }

    #[test]
    fn entry_names() {
        assert_eq!(default_entry_name(&entry(7, Some(2022))), "1040_2022_0007.pdf");
        assert_eq!(default_entry_name(&entry(12, None)), "1040_0012.pdf");
        let composite = ManifestEntry {
            form_kind: DocumentKind::Composite,
            ..entry(1, Some(2021))
        };
        assert_eq!(default_entry_name(&composite), "composite_2021_0001.pdf");
    }

    #[test]
    fn timestamped_names() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 8, 15, 30).unwrap();
        assert_eq!(
            single_document_name(DocumentKind::Form(FormKind::ScheduleA), &ts),
            "schedule1_20240301_081530.pdf"
        );
        assert_eq!(archive_name("tax_forms", &ts), "tax_forms_20240301_081530.zip");
    }

    #[test]
    fn csv_table() {
        let table = manifest_as_table(&[entry(1, Some(2023)), entry(2, None)]);
        let text = String::from_utf8(table).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "sequence_id,form_kind,tax_year,generation_timestamp");
        assert_eq!(lines[1], "1,1040,2023,2024-03-01T08:15:30+00:00");
        assert_eq!(lines[2], "2,1040,,2024-03-01T08:15:30+00:00");
    }

    #[test]
    fn json_round_trips() {
        let manifest = vec![entry(1, Some(2023))];
        let bytes = manifest_as_json(&manifest).unwrap();
        let back: Vec<ManifestEntry> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back, manifest);
    }

    #[test]
    fn csv_quotes_delimiters() {
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_field("plain"), "plain");
    }
}
