//! # Field Layout
//!
//! Each form kind is described by a static table of field descriptors:
//! label, record field, and how to format the value. The renderer is an
//! interpreter over that table. It draws one line per descriptor, in
//! order, starting at the canvas cursor.
//!
//! ```text
//! FormKind ──> FormLayout { [ (label, field, format), ... ] }
//!                   │
//!   FieldRecord ────┼──> "Label: value" lines ──> Canvas
//! ```
//!
//! Missing or unreadable values render as the empty string. Rendering
//! never fails; validation happens before a record reaches this point.

pub mod canvas;
pub mod format;

use crate::model::{FieldRecord, FieldValue, FormKind};

pub use canvas::{Canvas, DrawOp, LayoutPage, TextRun};
pub use format::{format_currency, mask_identifier};

/// How a field's value is turned into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldFormat {
    Text,
    Currency,
    MaskedId,
}

/// One line of a form: `"<label>: <formatted value of field>"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub label: &'static str,
    pub field: &'static str,
    pub format: FieldFormat,
}

/// The fixed layout of one form kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormLayout {
    pub kind: FormKind,
    pub fields: &'static [FieldDescriptor],
}

const fn line(label: &'static str, field: &'static str, format: FieldFormat) -> FieldDescriptor {
    FieldDescriptor {
        label,
        field,
        format,
    }
}

static PRIMARY: FormLayout = FormLayout {
    kind: FormKind::Primary,
    fields: &[
        line("First Name", "first_name", FieldFormat::Text),
        line("Last Name", "last_name", FieldFormat::Text),
        line("SSN", "id_suffix", FieldFormat::MaskedId),
        line("Wages", "wages", FieldFormat::Currency),
        line("Interest", "interest", FieldFormat::Currency),
    ],
};

static SCHEDULE_A: FormLayout = FormLayout {
    kind: FormKind::ScheduleA,
    fields: &[
        line("Business Income", "business_income", FieldFormat::Currency),
        line("Rental Income", "rental_income", FieldFormat::Currency),
    ],
};

static SCHEDULE_B: FormLayout = FormLayout {
    kind: FormKind::ScheduleB,
    fields: &[
        line("Self-Employment Tax", "self_employment_tax", FieldFormat::Currency),
        line("Medicare Tax", "medicare_tax", FieldFormat::Currency),
    ],
};

/// The layout table for a kind.
pub fn layout_for(kind: FormKind) -> &'static FormLayout {
    match kind {
        FormKind::Primary => &PRIMARY,
        FormKind::ScheduleA => &SCHEDULE_A,
        FormKind::ScheduleB => &SCHEDULE_B,
    }
}

/// Format a single descriptor's line against a record.
pub fn format_line(descriptor: &FieldDescriptor, record: &FieldRecord) -> String {
    let value = match (descriptor.format, record.get(descriptor.field)) {
        (_, None) => match descriptor.format {
            FieldFormat::MaskedId => mask_identifier(""),
            _ => String::new(),
        },
        (FieldFormat::Currency, Some(FieldValue::Amount(v))) => format_currency(*v),
        (FieldFormat::MaskedId, Some(FieldValue::Text(s))) => mask_identifier(s),
        (FieldFormat::Text, Some(FieldValue::Text(s))) => s.clone(),
        // Type mismatches are rejected by validation; render nothing.
        _ => String::new(),
    };
    format!("{}: {}", descriptor.label, value)
}

/// The lines a record renders to, in layout order.
pub fn render_lines(kind: FormKind, record: &FieldRecord) -> Vec<String> {
    layout_for(kind)
        .fields
        .iter()
        .map(|d| format_line(d, record))
        .collect()
}

/// Draw a record's fields onto the canvas at the current cursor.
pub fn render(kind: FormKind, record: &FieldRecord, canvas: &mut Canvas) {
    for text in render_lines(kind, record) {
        canvas.draw_line(&text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeneratorConfig;

    fn primary() -> FieldRecord {
        FieldRecord::new(FormKind::Primary)
            .with_text("first_name", "Jane")
            .with_text("last_name", "Doe")
            .with_text("id_suffix", "4821")
            .with_amount("wages", 55000.0)
            .with_amount("interest", 12.5)
    }

    #[test]
    fn layout_covers_schema_in_order() {
        for kind in FormKind::ALL {
            let layout_fields: Vec<&str> =
                layout_for(kind).fields.iter().map(|d| d.field).collect();
            let schema_fields: Vec<&str> = kind.schema().iter().map(|s| s.name).collect();
            assert_eq!(layout_fields, schema_fields, "{kind}");
        }
    }

    #[test]
    fn primary_lines() {
        assert_eq!(
            render_lines(FormKind::Primary, &primary()),
            vec![
                "First Name: Jane",
                "Last Name: Doe",
                "SSN: XXX-XX-4821",
                "Wages: $55,000.00",
                "Interest: $12.50",
            ]
        );
    }

    #[test]
    fn missing_fields_render_empty() {
        let rec = FieldRecord::new(FormKind::ScheduleA).with_amount("business_income", 10.0);
        assert_eq!(
            render_lines(FormKind::ScheduleA, &rec),
            vec!["Business Income: $10.00", "Rental Income: "]
        );
    }

    #[test]
    fn render_draws_one_line_per_field() {
        let config = GeneratorConfig::default();
        let mut canvas = Canvas::new(&config);
        canvas.begin_page("Tax Form 1040");
        render(FormKind::Primary, &primary(), &mut canvas);
        assert_eq!(canvas.cursor_y(), 700.0 - 5.0 * 20.0);

        let texts: Vec<String> = canvas.pages()[0]
            .elements
            .iter()
            .filter_map(|e| match e {
                DrawOp::Text(run) => Some(run.text.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(texts.len(), 6);
        assert_eq!(texts[4], "Wages: $55,000.00");
    }
}
