//! L2 (Euclidean) distance implementations.
//!
//! `L2Distance` computes the squared distance, which preserves ordering and
//! skips the square root. `EuclideanDistance` returns the true metric; robust
//! pruning compares scaled distances (`alpha * d`), so the two are not
//! interchangeable during construction.

use super::DistanceFunction;
use crate::types::VectorElement;
use std::marker::PhantomData;

/// L2 (Euclidean) squared distance calculator.
pub struct L2Distance<T: VectorElement> {
    _phantom: PhantomData<T>,
}

impl<T: VectorElement> L2Distance<T> {
    pub fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<T: VectorElement> Default for L2Distance<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: VectorElement> DistanceFunction<T> for L2Distance<T> {
    #[inline]
    fn compute(&self, a: &[T], b: &[T]) -> f32 {
        debug_assert_eq!(a.len(), b.len());
        l2_squared_scalar(a, b)
    }

    fn name(&self) -> &'static str {
        "L2"
    }
}

/// Euclidean distance calculator.
pub struct EuclideanDistance<T: VectorElement> {
    _phantom: PhantomData<T>,
}

impl<T: VectorElement> EuclideanDistance<T> {
    pub fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<T: VectorElement> Default for EuclideanDistance<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: VectorElement> DistanceFunction<T> for EuclideanDistance<T> {
    #[inline]
    fn compute(&self, a: &[T], b: &[T]) -> f32 {
        debug_assert_eq!(a.len(), b.len());
        l2_squared_scalar(a, b).sqrt()
    }

    fn name(&self) -> &'static str {
        "Euclidean"
    }
}

/// Scalar implementation of L2 squared distance, accumulated in f64.
#[inline]
pub fn l2_squared_scalar<T: VectorElement>(a: &[T], b: &[T]) -> f32 {
    let mut sum = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let diff = x.to_f32() as f64 - y.to_f32() as f64;
        sum += diff * diff;
    }
    sum as f32
}

/// Optimized scalar with loop unrolling for f32.
#[inline]
pub fn l2_squared_scalar_f32(a: &[f32], b: &[f32]) -> f32 {
    let dim = a.len().min(b.len());
    let mut sum0 = 0.0f32;
    let mut sum1 = 0.0f32;
    let mut sum2 = 0.0f32;
    let mut sum3 = 0.0f32;

    let unroll = dim / 4 * 4;
    let mut i = 0;

    while i < unroll {
        let d0 = a[i] - b[i];
        let d1 = a[i + 1] - b[i + 1];
        let d2 = a[i + 2] - b[i + 2];
        let d3 = a[i + 3] - b[i + 3];

        sum0 += d0 * d0;
        sum1 += d1 * d1;
        sum2 += d2 * d2;
        sum3 += d3 * d3;

        i += 4;
    }

    while i < dim {
        let d = a[i] - b[i];
        sum0 += d * d;
        i += 1;
    }

    sum0 + sum1 + sum2 + sum3
}
