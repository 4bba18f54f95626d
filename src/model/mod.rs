//! # Data Model
//!
//! The input and output representations of the generator. A [`FieldRecord`]
//! is the structured data for one form instance; each [`FormKind`] owns a
//! fixed schema of fields that the record is validated against.
//!
//! Records are deliberately loose maps rather than one struct per kind:
//! missing fields are allowed and render as empty, so a partially filled
//! record still produces a document. Only values that are *present* are
//! checked against the schema.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TaxFormError;

/// A category of form template with its own field set and layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FormKind {
    #[serde(rename = "1040", alias = "primary")]
    Primary,
    #[serde(rename = "schedule1", alias = "schedule_a")]
    ScheduleA,
    #[serde(rename = "schedule2", alias = "schedule_b")]
    ScheduleB,
}

impl FormKind {
    /// All kinds in declared order. Composite documents use this order.
    pub const ALL: [FormKind; 3] = [FormKind::Primary, FormKind::ScheduleA, FormKind::ScheduleB];

    /// Short identifier used in file names.
    pub fn slug(&self) -> &'static str {
        match self {
            FormKind::Primary => "1040",
            FormKind::ScheduleA => "schedule1",
            FormKind::ScheduleB => "schedule2",
        }
    }

    /// Human-readable name used in page headers.
    pub fn display_name(&self) -> &'static str {
        match self {
            FormKind::Primary => "1040",
            FormKind::ScheduleA => "Schedule 1",
            FormKind::ScheduleB => "Schedule 2",
        }
    }

    /// The fixed field schema for this kind.
    pub fn schema(&self) -> &'static [FieldSpec] {
        match self {
            FormKind::Primary => PRIMARY_SCHEMA,
            FormKind::ScheduleA => SCHEDULE_A_SCHEMA,
            FormKind::ScheduleB => SCHEDULE_B_SCHEMA,
        }
    }
}

impl fmt::Display for FormKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for FormKind {
    type Err = TaxFormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "1040" | "primary" => Ok(FormKind::Primary),
            "schedule1" | "schedule_a" | "schedulea" => Ok(FormKind::ScheduleA),
            "schedule2" | "schedule_b" | "scheduleb" => Ok(FormKind::ScheduleB),
            other => Err(TaxFormError::InvalidRequest(format!(
                "unknown form kind '{}'",
                other
            ))),
        }
    }
}

/// Largest accepted currency amount, in dollars. Below this an `f64`
/// still resolves every cent.
pub const MAX_AMOUNT: f64 = 1.0e13;

/// The value type a schema field expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    /// Non-negative amount in dollars.
    Currency,
    /// Exactly four ASCII digits; only ever rendered masked.
    IdSuffix,
}

/// One required field of a form kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: FieldType,
}

const fn field(name: &'static str, ty: FieldType) -> FieldSpec {
    FieldSpec { name, ty }
}

const PRIMARY_SCHEMA: &[FieldSpec] = &[
    field("first_name", FieldType::Text),
    field("last_name", FieldType::Text),
    field("id_suffix", FieldType::IdSuffix),
    field("wages", FieldType::Currency),
    field("interest", FieldType::Currency),
];

const SCHEDULE_A_SCHEMA: &[FieldSpec] = &[
    field("business_income", FieldType::Currency),
    field("rental_income", FieldType::Currency),
];

const SCHEDULE_B_SCHEMA: &[FieldSpec] = &[
    field("self_employment_tax", FieldType::Currency),
    field("medicare_tax", FieldType::Currency),
];

/// A single field value. Numbers deserialize as amounts, strings as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Amount(f64),
    Text(String),
}

/// Structured data for one instance of a form kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRecord {
    pub kind: FormKind,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
}

impl FieldRecord {
    pub fn new(kind: FormKind) -> Self {
        Self {
            kind,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_text(mut self, name: &str, value: impl Into<String>) -> Self {
        self.fields
            .insert(name.to_string(), FieldValue::Text(value.into()));
        self
    }

    pub fn with_amount(mut self, name: &str, value: f64) -> Self {
        self.fields.insert(name.to_string(), FieldValue::Amount(value));
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.fields.get(name) {
            Some(FieldValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn amount(&self, name: &str) -> Option<f64> {
        match self.fields.get(name) {
            Some(FieldValue::Amount(v)) => Some(*v),
            _ => None,
        }
    }

    /// Parse a record from JSON, then validate it.
    pub fn from_json(json: &str) -> Result<Self, TaxFormError> {
        let record: FieldRecord = serde_json::from_str(json)?;
        record.validate()?;
        Ok(record)
    }

    /// Check every present schema field against its type.
    ///
    /// Missing fields pass: they render as their empty default. Fields that
    /// aren't part of the kind's schema are ignored.
    pub fn validate(&self) -> Result<(), TaxFormError> {
        for spec in self.kind.schema() {
            let Some(value) = self.fields.get(spec.name) else {
                continue;
            };
            match (spec.ty, value) {
                (FieldType::Currency, FieldValue::Amount(v)) => {
                    if !v.is_finite() {
                        return Err(TaxFormError::invalid_record(
                            self.kind,
                            spec.name,
                            "is not a finite amount",
                        ));
                    }
                    if *v < 0.0 {
                        return Err(TaxFormError::invalid_record(
                            self.kind,
                            spec.name,
                            format!("must be non-negative, got {}", v),
                        ));
                    }
                    if *v > MAX_AMOUNT {
                        return Err(TaxFormError::invalid_record(
                            self.kind,
                            spec.name,
                            format!("exceeds the maximum amount of {}", MAX_AMOUNT),
                        ));
                    }
                }
                (FieldType::Currency, FieldValue::Text(_)) => {
                    return Err(TaxFormError::invalid_record(
                        self.kind,
                        spec.name,
                        "expected an amount, got text",
                    ));
                }
                (FieldType::IdSuffix, FieldValue::Text(s)) => {
                    if s.len() != 4 || !s.bytes().all(|b| b.is_ascii_digit()) {
                        return Err(TaxFormError::invalid_record(
                            self.kind,
                            spec.name,
                            "must be exactly 4 digits",
                        ));
                    }
                }
                (FieldType::IdSuffix, FieldValue::Amount(_)) => {
                    return Err(TaxFormError::invalid_record(
                        self.kind,
                        spec.name,
                        "must be a 4-digit string",
                    ));
                }
                (FieldType::Text, FieldValue::Text(_)) => {}
                (FieldType::Text, FieldValue::Amount(_)) => {
                    return Err(TaxFormError::invalid_record(
                        self.kind,
                        spec.name,
                        "expected text, got an amount",
                    ));
                }
            }
        }
        Ok(())
    }
}

/// What a generated document contains: one form, or the fixed three-page
/// composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum DocumentKind {
    Form(FormKind),
    Composite,
}

impl DocumentKind {
    pub fn slug(&self) -> &'static str {
        match self {
            DocumentKind::Form(kind) => kind.slug(),
            DocumentKind::Composite => "composite",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl From<DocumentKind> for String {
    fn from(kind: DocumentKind) -> Self {
        kind.slug().to_string()
    }
}

impl TryFrom<String> for DocumentKind {
    type Error = TaxFormError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value == "composite" {
            return Ok(DocumentKind::Composite);
        }
        value.parse().map(DocumentKind::Form)
    }
}

/// A rendered document. Immutable once composed.
#[derive(Debug, Clone)]
pub struct GeneratedDocument {
    kind: DocumentKind,
    tax_year: Option<i32>,
    sequence_id: u32,
    timestamp: DateTime<Utc>,
    file_name: String,
    bytes: Vec<u8>,
}

impl GeneratedDocument {
    pub(crate) fn new(
        kind: DocumentKind,
        tax_year: Option<i32>,
        sequence_id: u32,
        timestamp: DateTime<Utc>,
        file_name: String,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            kind,
            tax_year,
            sequence_id,
            timestamp,
            file_name,
            bytes,
        }
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn tax_year(&self) -> Option<i32> {
        self.tax_year
    }

    pub fn sequence_id(&self) -> u32 {
        self.sequence_id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Metadata describing one document of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub sequence_id: u32,
    pub form_kind: DocumentKind,
    pub tax_year: Option<i32>,
    pub generation_timestamp: DateTime<Utc>,
}

/// Document metadata embedded in the PDF.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<DateTime<Utc>>,
}

/// Standard page sizes in points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum PageSize {
    #[default]
    Letter,
    Legal,
    A4,
    Custom {
        width: f64,
        height: f64,
    },
}

impl PageSize {
    /// Returns (width, height) in points.
    pub fn dimensions(&self) -> (f64, f64) {
        match self {
            PageSize::Letter => (612.0, 792.0),
            PageSize::Legal => (612.0, 1008.0),
            PageSize::A4 => (595.28, 841.89),
            PageSize::Custom { width, height } => (*width, *height),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn primary() -> FieldRecord {
        FieldRecord::new(FormKind::Primary)
            .with_text("first_name", "Jane")
            .with_text("last_name", "Doe")
            .with_text("id_suffix", "1234")
            .with_amount("wages", 55000.0)
            .with_amount("interest", 120.5)
    }

    #[test]
    fn valid_record_passes() {
        assert!(primary().validate().is_ok());
    }

    #[test]
    fn missing_fields_are_allowed() {
        assert!(FieldRecord::new(FormKind::ScheduleB).validate().is_ok());
    }

    #[test]
    fn negative_currency_is_rejected() {
        let err = primary().with_amount("wages", -1.0).validate().unwrap_err();
        match err {
            TaxFormError::InvalidRecord { kind, field, .. } => {
                assert_eq!(kind, FormKind::Primary);
                assert_eq!(field, "wages");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn amounts_above_the_maximum_are_rejected() {
        assert!(primary().with_amount("wages", MAX_AMOUNT).validate().is_ok());
        let err = primary().with_amount("wages", 1.0e20).validate().unwrap_err();
        assert!(matches!(err, TaxFormError::InvalidRecord { ref field, .. } if field == "wages"));
    }

    #[test]
    fn malformed_id_suffix_is_rejected() {
        for bad in ["123", "12345", "12a4", ""] {
            let rec = primary().with_text("id_suffix", bad);
            assert!(rec.validate().is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn text_in_currency_field_is_rejected() {
        let rec = FieldRecord::new(FormKind::ScheduleA).with_text("rental_income", "lots");
        assert!(rec.validate().is_err());
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let rec = primary().with_amount("bonus", -5.0);
        assert!(rec.validate().is_ok());
    }

    #[test]
    fn record_from_json() {
        let rec = FieldRecord::from_json(
            r#"{"kind": "1040", "fields": {"first_name": "Ann", "wages": 1000.25}}"#,
        )
        .unwrap();
        assert_eq!(rec.kind, FormKind::Primary);
        assert_eq!(rec.text("first_name"), Some("Ann"));
        assert_eq!(rec.amount("wages"), Some(1000.25));
    }

    #[test]
    fn record_from_json_rejects_negative() {
        let result = FieldRecord::from_json(
            r#"{"kind": "schedule2", "fields": {"medicare_tax": -3}}"#,
        );
        assert!(matches!(result, Err(TaxFormError::InvalidRecord { .. })));
    }

    #[test]
    fn kind_parsing() {
        assert_eq!("1040".parse::<FormKind>().unwrap(), FormKind::Primary);
        assert_eq!("Schedule1".parse::<FormKind>().unwrap(), FormKind::ScheduleA);
        assert!("w2".parse::<FormKind>().is_err());
    }

    #[test]
    fn document_kind_serializes_as_slug() {
        let json = serde_json::to_string(&DocumentKind::Form(FormKind::ScheduleB)).unwrap();
        assert_eq!(json, "\"schedule2\"");
        let back: DocumentKind = serde_json::from_str("\"composite\"").unwrap();
        assert_eq!(back, DocumentKind::Composite);
    }
}
