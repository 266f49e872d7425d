//! Weighted random variant selection
//!
//! Eligible variants (weight > 0) partition `[0, total)` into contiguous
//! buckets in document order. A draw `r` in that range lands in exactly one
//! bucket; an `r` equal to a bucket's upper edge belongs to the next bucket.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::entity::VariantDescriptor;

/// Source of uniform draws in `[0, 1)`
pub trait RandomSource: Send {
    fn next_unit(&mut self) -> f64;
}

/// Draws from the thread-local generator
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_unit(&mut self) -> f64 {
        rand::thread_rng().r#gen::<f64>()
    }
}

/// Reproducible draws from a seeded generator
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_unit(&mut self) -> f64 {
        self.rng.r#gen::<f64>()
    }
}

/// Replays a fixed sequence of draws, cycling when exhausted
#[derive(Debug, Clone)]
pub struct SequenceRandom {
    values: Vec<f64>,
    position: usize,
    draws: usize,
}

impl SequenceRandom {
    pub fn new(values: Vec<f64>) -> Self {
        Self {
            values,
            position: 0,
            draws: 0,
        }
    }

    /// Always return `value`
    pub fn constant(value: f64) -> Self {
        Self::new(vec![value])
    }

    /// Number of draws taken so far
    pub fn draws(&self) -> usize {
        self.draws
    }
}

impl RandomSource for SequenceRandom {
    fn next_unit(&mut self) -> f64 {
        self.draws += 1;

        if self.values.is_empty() {
            return 0.0;
        }

        let value = self.values[self.position % self.values.len()];
        self.position += 1;
        value.clamp(0.0, 1.0 - f64::EPSILON)
    }
}

/// A completed weighted draw
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedPick<'a> {
    pub variant: &'a VariantDescriptor,
    /// The point drawn in `[0, total)`
    pub point: f64,
    pub total: f64,
}

/// Sum of weights over the eligible variants
pub fn total_weight(variants: &[VariantDescriptor]) -> f64 {
    variants
        .iter()
        .filter(|v| v.is_eligible())
        .map(VariantDescriptor::weight)
        .sum()
}

/// Locate the bucket containing `point`.
///
/// Returns `None` when no variant is eligible. A `point` at or beyond the
/// total (possible through float rounding) resolves to the last eligible
/// variant.
pub fn bucket_for(variants: &[VariantDescriptor], point: f64) -> Option<&VariantDescriptor> {
    let mut cumulative = 0.0;
    let mut last = None;

    for variant in variants.iter().filter(|v| v.is_eligible()) {
        cumulative += variant.weight();
        if cumulative > point {
            return Some(variant);
        }
        last = Some(variant);
    }

    last
}

/// Draw one variant, weighting eligible variants by their share of the total
pub fn select_weighted<'a>(
    variants: &'a [VariantDescriptor],
    random: &mut dyn RandomSource,
) -> Option<WeightedPick<'a>> {
    let total = total_weight(variants);

    if total <= 0.0 {
        return None;
    }

    let point = random.next_unit() * total;

    bucket_for(variants, point).map(|variant| WeightedPick {
        variant,
        point,
        total,
    })
}
