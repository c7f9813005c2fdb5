//! Test data generators for coordinate records.
//!
//! Generators are deterministic: the same seed always yields the same
//! records, so failures are reproducible without a random crate.

use serde_json::{json, Value};

/// Minimal linear congruential generator (Numerical Recipes constants).
#[derive(Debug, Clone)]
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed.wrapping_mul(6364136223846793005).wrapping_add(1))
    }

    pub fn next_u32(&mut self) -> u32 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (self.0 >> 33) as u32
    }

    /// Uniform integer in `0..n`.
    pub fn below(&mut self, n: u32) -> u32 {
        self.next_u32() % n.max(1)
    }
}

/// Convert `(x, y)` pairs into JSON coordinate records.
///
/// # Example
///
/// ```
/// use test_utils::coordinate_records;
///
/// let records = coordinate_records(&[(10.0, 20.0)]);
/// assert_eq!(records[0]["x"], 10.0);
/// ```
pub fn coordinate_records(points: &[(f64, f64)]) -> Vec<Value> {
    points.iter().map(|&(x, y)| json!({"x": x, "y": y})).collect()
}

/// The canonical scenario: two kills at (10, 20) and one at (500, 500).
pub fn dust2_kill_records() -> Vec<Value> {
    coordinate_records(&[(10.0, 20.0), (10.0, 20.0), (500.0, 500.0)])
}

/// Creates `count` integer-valued records inside `[0, bound)`.
///
/// Only `distinct` different positions are used so that duplicates are
/// guaranteed when `count > distinct`.
pub fn clustered_records(count: usize, distinct: usize, bound: u32, seed: u64) -> Vec<Value> {
    let mut rng = Lcg::new(seed);
    let positions: Vec<(f64, f64)> = (0..distinct.max(1))
        .map(|_| (rng.below(bound) as f64, rng.below(bound) as f64))
        .collect();

    (0..count)
        .map(|_| {
            let (x, y) = positions[rng.below(positions.len() as u32) as usize];
            json!({"x": x, "y": y})
        })
        .collect()
}

/// Returns a Fisher-Yates shuffled copy of `records`.
pub fn shuffled(records: &[Value], seed: u64) -> Vec<Value> {
    let mut rng = Lcg::new(seed);
    let mut out = records.to_vec();
    for i in (1..out.len()).rev() {
        let j = rng.below(i as u32 + 1) as usize;
        out.swap(i, j);
    }
    out
}
