//! Inner product (dot product) distance implementation.
//!
//! For use as a distance metric (lower is better), we return the negative
//! inner product: -sum(a[i] * b[i]). This metric is only meaningful for
//! normalized vectors, where it orders neighbors like cosine similarity.

use super::DistanceFunction;
use crate::types::VectorElement;
use std::marker::PhantomData;

/// Inner product distance calculator.
pub struct InnerProductDistance<T: VectorElement> {
    _phantom: PhantomData<T>,
}

impl<T: VectorElement> InnerProductDistance<T> {
    pub fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<T: VectorElement> Default for InnerProductDistance<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: VectorElement> DistanceFunction<T> for InnerProductDistance<T> {
    #[inline]
    fn compute(&self, a: &[T], b: &[T]) -> f32 {
        -inner_product_scalar(a, b)
    }

    fn name(&self) -> &'static str {
        "IP"
    }
}

/// Scalar inner product, accumulated in f64.
#[inline]
pub fn inner_product_scalar<T: VectorElement>(a: &[T], b: &[T]) -> f32 {
    let mut sum = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        sum += x.to_f32() as f64 * y.to_f32() as f64;
    }
    sum as f32
}
