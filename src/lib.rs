//! # taxforme
//!
//! Fixed-layout tax form documents, generated one at a time or in batches,
//! and packaged into a single archive with a manifest.
//!
//! Every form kind has a declarative layout: an ordered table of
//! `(label, field, format)` lines drawn at fixed positions. Rendering is an
//! interpreter over that table, so a record's document is a pure function
//! of the record (plus an optional creation timestamp).
//!
//! ## Architecture
//!
//! ```text
//!   [synth]       RecordStrategy: incremental or seeded random records
//!       ↓
//!   [model]       FieldRecord, validated against the kind's schema
//!       ↓
//!   [layout]      Layout tables drawn onto a Canvas
//!       ↓
//!   [compose]     One page or the three-page composite
//!       ↓
//!   [pdf]         Serialize to PDF bytes
//!       ↓
//!   [batch]       Ordered, all-or-nothing runs with progress
//!       ↓
//!   [archive]     ZIP of documents + manifest
//! ```

pub mod archive;
pub mod batch;
pub mod collab;
pub mod compose;
pub mod config;
pub mod context;
pub mod error;
pub mod font;
pub mod layout;
pub mod manifest;
pub mod model;
pub mod pdf;
pub mod synth;

pub use batch::{run_batch, BatchMode, BatchOutput, BatchRequest, ProgressSink};
pub use compose::{Composer, Composition, Stamp};
pub use config::{Capability, GeneratorConfig};
pub use context::{CancellationToken, RequestContext};
pub use error::TaxFormError;
pub use model::{DocumentKind, FieldRecord, FormKind, GeneratedDocument, ManifestEntry};

/// Render a single form with the default configuration.
///
/// This is the shortest path from a record to PDF bytes.
pub fn render(record: &FieldRecord) -> Result<Vec<u8>, TaxFormError> {
    Composer::new(GeneratorConfig::default()).compose_form(record)
}

/// Parse a record from JSON and render it.
pub fn render_json(json: &str) -> Result<Vec<u8>, TaxFormError> {
    let record = FieldRecord::from_json(json)?;
    render(&record)
}

/// Synthesize one record for `kind` with a strategy.
pub fn synthesize(
    strategy: &dyn synth::RecordStrategy,
    kind: FormKind,
    seed_index: u64,
) -> FieldRecord {
    strategy.synthesize(kind, seed_index)
}
