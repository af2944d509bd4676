//! Cosine distance implementation.
//!
//! Cosine distance = 1 - cos(a, b). Zero vectors are treated as maximally
//! distant from everything (distance 1).

use super::DistanceFunction;
use crate::types::VectorElement;
use std::marker::PhantomData;

/// Cosine distance calculator.
pub struct CosineDistance<T: VectorElement> {
    _phantom: PhantomData<T>,
}

impl<T: VectorElement> CosineDistance<T> {
    pub fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<T: VectorElement> Default for CosineDistance<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: VectorElement> DistanceFunction<T> for CosineDistance<T> {
    #[inline]
    fn compute(&self, a: &[T], b: &[T]) -> f32 {
        cosine_distance_scalar(a, b)
    }

    fn name(&self) -> &'static str {
        "Cosine"
    }
}

/// Compute the L2 norm of a vector.
pub fn compute_norm<T: VectorElement>(vector: &[T]) -> f64 {
    vector
        .iter()
        .map(|&x| {
            let v = x.to_f32() as f64;
            v * v
        })
        .sum::<f64>()
        .sqrt()
}

/// Scalar cosine distance.
pub fn cosine_distance_scalar<T: VectorElement>(a: &[T], b: &[T]) -> f32 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b) {
        let x = x.to_f32() as f64;
        let y = y.to_f32() as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-30 {
        return 1.0;
    }

    // Clamp so rounding never produces a negative distance.
    let cosine = (dot / denom).clamp(-1.0, 1.0);
    (1.0 - cosine) as f32
}
