//! # Record Synthesis
//!
//! Produces plausible [`FieldRecord`]s for batch generation. Two strategies
//! implement [`RecordStrategy`]:
//!
//! - [`IncrementalStrategy`]: every currency field is `base + index × step`,
//!   so a batch is diverse but trivially inspectable.
//! - [`RandomStrategy`]: every currency field is drawn from a fixed closed
//!   interval, names come from small pools. Each record is seeded from
//!   `(seed, index)`, so the same batch seed always yields the same records
//!   regardless of the order they're requested in.
//!
//! A batch holds one strategy for its whole run; the two are never mixed.

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::model::{FieldRecord, FieldType, FormKind};

pub const FIRST_NAMES: [&str; 6] = ["John", "Jane", "Michael", "Sarah", "David", "Emily"];
pub const LAST_NAMES: [&str; 6] = ["Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia"];

/// A source of synthetic records. Implementations must only produce
/// records that pass [`FieldRecord::validate`].
pub trait RecordStrategy {
    fn name(&self) -> &'static str;

    fn synthesize(&self, kind: FormKind, seed_index: u64) -> FieldRecord;
}

/// Linear ramp for one currency field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ramp {
    pub base: f64,
    pub step: f64,
}

/// Deterministic generation: values are a function of the index alone.
#[derive(Debug, Clone)]
pub struct IncrementalStrategy {
    ramps: Vec<(&'static str, Ramp)>,
}

impl Default for IncrementalStrategy {
    fn default() -> Self {
        let ramp = |base, step| Ramp { base, step };
        Self {
            ramps: vec![
                ("wages", ramp(50_000.0, 1_000.0)),
                ("interest", ramp(500.0, 25.0)),
                ("business_income", ramp(20_000.0, 500.0)),
                ("rental_income", ramp(8_000.0, 250.0)),
                ("self_employment_tax", ramp(3_000.0, 50.0)),
                ("medicare_tax", ramp(800.0, 10.0)),
            ],
        }
    }
}

impl IncrementalStrategy {
    /// Override the ramp of one field. Negative bases or steps are clamped
    /// to zero so every generated amount stays non-negative.
    pub fn with_ramp(mut self, field: &'static str, base: f64, step: f64) -> Self {
        let ramp = Ramp {
            base: base.max(0.0),
            step: step.max(0.0),
        };
        match self.ramps.iter_mut().find(|(name, _)| *name == field) {
            Some((_, existing)) => *existing = ramp,
            None => self.ramps.push((field, ramp)),
        }
        self
    }

    fn ramp(&self, field: &str) -> Ramp {
        self.ramps
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, r)| *r)
            .unwrap_or(Ramp { base: 0.0, step: 0.0 })
    }
}

impl RecordStrategy for IncrementalStrategy {
    fn name(&self) -> &'static str {
        "incremental"
    }

    fn synthesize(&self, kind: FormKind, seed_index: u64) -> FieldRecord {
        let mut record = FieldRecord::new(kind);
        let i = seed_index as usize;
        for spec in kind.schema() {
            record = match (spec.ty, spec.name) {
                (FieldType::Currency, name) => {
                    let r = self.ramp(name);
                    record.with_amount(name, r.base + seed_index as f64 * r.step)
                }
                (FieldType::IdSuffix, name) => {
                    record.with_text(name, format!("{:04}", seed_index % 10_000))
                }
                (FieldType::Text, "first_name") => {
                    record.with_text("first_name", FIRST_NAMES[i % FIRST_NAMES.len()])
                }
                (FieldType::Text, "last_name") => record.with_text(
                    "last_name",
                    LAST_NAMES[(i / FIRST_NAMES.len()) % LAST_NAMES.len()],
                ),
                (FieldType::Text, name) => record.with_text(name, format!("{} {}", name, i)),
            };
        }
        record
    }
}

/// Closed interval for one currency field, in dollars.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldRange {
    pub min: f64,
    pub max: f64,
}

/// Randomized generation within realistic per-field ranges.
#[derive(Debug, Clone)]
pub struct RandomStrategy {
    seed: u64,
    ranges: Vec<(&'static str, FieldRange)>,
}

impl RandomStrategy {
    pub fn seeded(seed: u64) -> Self {
        let range = |min, max| FieldRange { min, max };
        Self {
            seed,
            ranges: vec![
                ("wages", range(25_000.0, 150_000.0)),
                ("interest", range(0.0, 5_000.0)),
                ("business_income", range(0.0, 80_000.0)),
                ("rental_income", range(0.0, 40_000.0)),
                ("self_employment_tax", range(0.0, 15_000.0)),
                ("medicare_tax", range(0.0, 5_000.0)),
            ],
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn range(&self, field: &str) -> FieldRange {
        self.ranges
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, r)| *r)
            .unwrap_or(FieldRange { min: 0.0, max: 0.0 })
    }

    /// One independent RNG per record, derived from the batch seed.
    fn rng_for(&self, seed_index: u64) -> StdRng {
        StdRng::seed_from_u64(self.seed ^ seed_index.wrapping_mul(0x9E37_79B9_7F4A_7C15))
    }
}

impl RecordStrategy for RandomStrategy {
    fn name(&self) -> &'static str {
        "random"
    }

    fn synthesize(&self, kind: FormKind, seed_index: u64) -> FieldRecord {
        let mut rng = self.rng_for(seed_index);
        let mut record = FieldRecord::new(kind);
        for spec in kind.schema() {
            record = match (spec.ty, spec.name) {
                (FieldType::Currency, name) => {
                    let r = self.range(name);
                    let lo = (r.min.max(0.0) * 100.0).round() as u64;
                    let hi = ((r.max * 100.0).round() as u64).max(lo);
                    let cents = rng.random_range(lo..=hi);
                    record.with_amount(name, cents as f64 / 100.0)
                }
                (FieldType::IdSuffix, name) => {
                    record.with_text(name, format!("{:04}", rng.random_range(0..10_000u32)))
                }
                (FieldType::Text, "last_name") => {
                    let last = LAST_NAMES.choose(&mut rng).copied().unwrap_or("Smith");
                    record.with_text("last_name", last)
                }
                (FieldType::Text, name) => {
                    let first = FIRST_NAMES.choose(&mut rng).copied().unwrap_or("John");
                    record.with_text(name, first)
                }
            };
        }
        record
    }
}

/// Strategy selection for requests and the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "strategy")]
pub enum StrategyChoice {
    Incremental,
    Random { seed: u64 },
}

impl StrategyChoice {
    pub fn build(&self) -> Box<dyn RecordStrategy> {
        match self {
            StrategyChoice::Incremental => Box::new(IncrementalStrategy::default()),
            StrategyChoice::Random { seed } => Box::new(RandomStrategy::seeded(*seed)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incremental_wages_at_index_five() {
        let record = IncrementalStrategy::default().synthesize(FormKind::Primary, 5);
        assert_eq!(record.amount("wages"), Some(55_000.0));
        assert_eq!(record.text("id_suffix"), Some("0005"));
        assert!(record.validate().is_ok());
    }

    #[test]
    fn incremental_is_deterministic() {
        let s = IncrementalStrategy::default();
        for kind in FormKind::ALL {
            assert_eq!(s.synthesize(kind, 42), s.synthesize(kind, 42));
        }
    }

    #[test]
    fn incremental_override_clamps_negative() {
        let s = IncrementalStrategy::default().with_ramp("wages", -100.0, -5.0);
        let record = s.synthesize(FormKind::Primary, 3);
        assert_eq!(record.amount("wages"), Some(0.0));
    }

    #[test]
    fn random_records_stay_in_range() {
        let s = RandomStrategy::seeded(7);
        for i in 0..200 {
            for kind in FormKind::ALL {
                let record = s.synthesize(kind, i);
                assert!(record.validate().is_ok(), "{:?}", record);
                for spec in kind.schema() {
                    if spec.ty == FieldType::Currency {
                        let v = record.amount(spec.name).unwrap();
                        let r = s.range(spec.name);
                        assert!(v >= r.min && v <= r.max, "{} = {}", spec.name, v);
                    }
                }
            }
        }
    }

    #[test]
    fn random_names_come_from_pools() {
        let s = RandomStrategy::seeded(99);
        let record = s.synthesize(FormKind::Primary, 11);
        assert!(FIRST_NAMES.contains(&record.text("first_name").unwrap()));
        assert!(LAST_NAMES.contains(&record.text("last_name").unwrap()));
    }

    #[test]
    fn random_is_reproducible_per_seed_and_index() {
        let a = RandomStrategy::seeded(1234);
        let b = RandomStrategy::seeded(1234);
        assert_eq!(a.synthesize(FormKind::Primary, 3), b.synthesize(FormKind::Primary, 3));
        let c = RandomStrategy::seeded(4321);
        let differs = (0..20).any(|i| {
            a.synthesize(FormKind::Primary, i) != c.synthesize(FormKind::Primary, i)
        });
        assert!(differs);
    }

    #[test]
    fn strategy_choice_builds() {
        assert_eq!(StrategyChoice::Incremental.build().name(), "incremental");
        assert_eq!(StrategyChoice::Random { seed: 1 }.build().name(), "random");
    }
}
