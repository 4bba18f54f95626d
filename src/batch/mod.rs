//! # Batch Orchestration
//!
//! Runs synthesis and composition over a whole request and collects the
//! documents and their manifest.
//!
//! The iteration space is `years × count × kinds`, visited year ascending,
//! then sequence ascending, then kind in declared order. A batch either
//! completes in full or returns an error and nothing else: any single
//! failure aborts the run and the documents built so far are dropped.
//!
//! Cancellation is cooperative. The token is checked before each
//! iteration, never in the middle of composing a document.

use tracing::{info, warn};

use crate::compose::{Composer, Composition, Stamp};
use crate::context::RequestContext;
use crate::error::TaxFormError;
use crate::manifest::default_entry_name;
use crate::model::{DocumentKind, FormKind, GeneratedDocument, ManifestEntry};
use crate::synth::RecordStrategy;

/// What each (year, sequence) slot of a batch produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchMode {
    /// One document of the given kind.
    Single(FormKind),
    /// One document per kind, three in total.
    Triplet,
    /// One three-page composite document.
    Composite,
}

impl BatchMode {
    fn kinds(&self) -> &'static [DocumentKind] {
        match self {
            BatchMode::Single(FormKind::Primary) => &[DocumentKind::Form(FormKind::Primary)],
            BatchMode::Single(FormKind::ScheduleA) => &[DocumentKind::Form(FormKind::ScheduleA)],
            BatchMode::Single(FormKind::ScheduleB) => &[DocumentKind::Form(FormKind::ScheduleB)],
            BatchMode::Triplet => &[
                DocumentKind::Form(FormKind::Primary),
                DocumentKind::Form(FormKind::ScheduleA),
                DocumentKind::Form(FormKind::ScheduleB),
            ],
            BatchMode::Composite => &[DocumentKind::Composite],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    /// Documents per year pass (per kind in triplet mode). Must be at least 1.
    pub count: u32,
    /// Tax years to generate for. Empty means one pass with no year.
    pub years: Vec<i32>,
    pub mode: BatchMode,
}

/// One planned unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Iteration {
    pub tax_year: Option<i32>,
    pub sequence_id: u32,
    pub kind: DocumentKind,
    /// Index handed to the record strategy; shared by all kinds of the
    /// same (year, sequence) slot.
    pub seed_index: u64,
}

impl BatchRequest {
    pub fn new(count: u32, mode: BatchMode) -> Self {
        Self {
            count,
            years: Vec::new(),
            mode,
        }
    }

    pub fn with_years(mut self, years: impl IntoIterator<Item = i32>) -> Self {
        self.years = years.into_iter().collect();
        self
    }

    /// Check the request and return the year passes in ascending order.
    pub fn passes(&self) -> Result<Vec<Option<i32>>, TaxFormError> {
        if self.count == 0 {
            return Err(TaxFormError::InvalidRequest(
                "count must be at least 1".to_string(),
            ));
        }
        if self.years.is_empty() {
            return Ok(vec![None]);
        }
        let mut years = self.years.clone();
        years.sort_unstable();
        if let Some(pair) = years.windows(2).find(|w| w[0] == w[1]) {
            return Err(TaxFormError::InvalidRequest(format!(
                "year {} is listed more than once",
                pair[0]
            )));
        }
        Ok(years.into_iter().map(Some).collect())
    }

    /// The full ordered iteration space, produced lazily.
    pub fn plan(&self) -> Result<impl Iterator<Item = Iteration>, TaxFormError> {
        let passes = self.passes()?;
        let count = self.count;
        let kinds = self.mode.kinds();
        Ok(passes.into_iter().enumerate().flat_map(move |(pass_index, tax_year)| {
            (1..=count).flat_map(move |sequence_id| {
                let seed_index = pass_index as u64 * count as u64 + sequence_id as u64;
                kinds.iter().map(move |&kind| Iteration {
                    tax_year,
                    sequence_id,
                    kind,
                    seed_index,
                })
            })
        }))
    }

    pub fn total_iterations(&self) -> Result<usize, TaxFormError> {
        self.passes()?
            .len()
            .checked_mul(self.count as usize)
            .and_then(|n| n.checked_mul(self.mode.kinds().len()))
            .ok_or_else(|| TaxFormError::InvalidRequest("batch is too large".to_string()))
    }
}

/// Receives a monotonically increasing completion fraction in `(0, 1]`.
pub trait ProgressSink {
    fn report(&mut self, fraction: f64);
}

impl<F: FnMut(f64)> ProgressSink for F {
    fn report(&mut self, fraction: f64) {
        self(fraction)
    }
}

/// Discards progress.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _fraction: f64) {}
}

/// A completed batch. Documents and manifest are index-aligned.
#[derive(Debug, Clone)]
pub struct BatchOutput {
    pub documents: Vec<GeneratedDocument>,
    pub manifest: Vec<ManifestEntry>,
}

impl BatchOutput {
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Run a whole batch with one record strategy.
pub fn run_batch(
    composer: &Composer,
    request: &BatchRequest,
    strategy: &dyn RecordStrategy,
    ctx: &RequestContext,
    progress: &mut dyn ProgressSink,
) -> Result<BatchOutput, TaxFormError> {
    let total = request.total_iterations()?;
    let plan = request.plan()?;
    info!(
        total,
        count = request.count,
        years = request.years.len(),
        mode = ?request.mode,
        strategy = strategy.name(),
        "starting batch"
    );

    let mut documents = Vec::new();
    let mut manifest = Vec::new();

    for (index, iteration) in plan.enumerate() {
        if ctx.cancel.is_cancelled() {
            warn!(completed = index, total, "batch cancelled");
            return Err(TaxFormError::Cancelled { completed: index });
        }

        let (document, entry) = run_iteration(composer, &iteration, strategy, ctx).map_err(|e| {
            warn!(position = index + 1, total, error = %e, "batch aborted");
            TaxFormError::BatchAborted {
                position: index + 1,
                source: Box::new(e),
            }
        })?;
        documents.push(document);
        manifest.push(entry);

        progress.report((index + 1) as f64 / total as f64);
    }

    info!(documents = documents.len(), "batch complete");
    Ok(BatchOutput {
        documents,
        manifest,
    })
}

fn run_iteration(
    composer: &Composer,
    iteration: &Iteration,
    strategy: &dyn RecordStrategy,
    ctx: &RequestContext,
) -> Result<(GeneratedDocument, ManifestEntry), TaxFormError> {
    let timestamp = ctx.now();
    let stamp = Stamp {
        tax_year: iteration.tax_year,
        created: Some(timestamp),
    };

    let bytes = match iteration.kind {
        DocumentKind::Form(kind) => {
            let record = strategy.synthesize(kind, iteration.seed_index);
            composer.compose(Composition::Single(&record), &stamp)?
        }
        DocumentKind::Composite => {
            let [a, b, c] = FormKind::ALL.map(|kind| strategy.synthesize(kind, iteration.seed_index));
            composer.compose(Composition::Composite([&a, &b, &c]), &stamp)?
        }
    };

    let entry = ManifestEntry {
        sequence_id: iteration.sequence_id,
        form_kind: iteration.kind,
        tax_year: iteration.tax_year,
        generation_timestamp: timestamp,
    };
    let document = GeneratedDocument::new(
        iteration.kind,
        iteration.tax_year,
        iteration.sequence_id,
        timestamp,
        default_entry_name(&entry),
        bytes,
    );
    Ok((document, entry))
}
