//! Distance metric implementations for vector similarity.
//!
//! This module provides various distance/similarity metrics:
//! - L2 (squared Euclidean) and Euclidean distance
//! - Inner product (dot product) similarity
//! - Cosine similarity/distance
//!
//! The graph treats its distance function as pluggable: any type implementing
//! [`DistanceFunction`] can be supplied, including closures wrapped in
//! [`CustomDistance`]. The distance function also owns the emptiness predicate
//! that marks a vector as the "no such node" sentinel.

pub mod cosine;
pub mod ip;
pub mod l2;

use crate::types::VectorElement;
use std::marker::PhantomData;
use thiserror::Error;

/// Errors raised by the checked [`distance`] contract.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DistanceError {
    #[error("Vector dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Both input vectors are empty")]
    EmptyInput,
}

/// Distance/similarity metric types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    /// L2 (Euclidean) squared distance.
    L2,
    /// Euclidean distance (square root of L2).
    Euclidean,
    /// Negative inner product, so that lower values are more similar.
    InnerProduct,
    /// 1 - cosine similarity.
    Cosine,
}

impl Metric {
    /// Get a human-readable name for the metric.
    pub fn name(&self) -> &'static str {
        match self {
            Metric::L2 => "L2",
            Metric::Euclidean => "Euclidean",
            Metric::InnerProduct => "IP",
            Metric::Cosine => "Cosine",
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Trait for distance computation functions.
///
/// Implementations must be symmetric and non-negative for the graph
/// algorithms to hold their guarantees (the inner product metric is the
/// usual exception and is only meaningful on normalized data).
pub trait DistanceFunction<T: VectorElement>: Send + Sync {
    /// Compute the distance between two vectors of equal length.
    ///
    /// Callers validate dimensions beforehand; see [`distance`] for the
    /// checked variant.
    fn compute(&self, a: &[T], b: &[T]) -> f32;

    /// Whether `vector` is the empty sentinel.
    fn is_empty_vector(&self, vector: &[T]) -> bool {
        vector.is_empty()
    }

    /// Human readable name used in logs and `Debug` output.
    fn name(&self) -> &'static str {
        "custom"
    }
}

/// Checked distance between two vectors.
///
/// Fails with `EmptyInput` when both vectors are empty and with
/// `DimensionMismatch` when their lengths differ.
pub fn distance<T: VectorElement>(
    dist_fn: &dyn DistanceFunction<T>,
    a: &[T],
    b: &[T],
) -> Result<f32, DistanceError> {
    if a.is_empty() && b.is_empty() {
        return Err(DistanceError::EmptyInput);
    }
    if a.len() != b.len() {
        return Err(DistanceError::DimensionMismatch {
            expected: a.len(),
            got: b.len(),
        });
    }
    Ok(dist_fn.compute(a, b))
}

/// Create a distance function for the given metric and element type.
pub fn create_distance_function<T: VectorElement>(metric: Metric) -> Box<dyn DistanceFunction<T>> {
    match metric {
        Metric::L2 => Box::new(l2::L2Distance::<T>::new()),
        Metric::Euclidean => Box::new(l2::EuclideanDistance::<T>::new()),
        Metric::InnerProduct => Box::new(ip::InnerProductDistance::<T>::new()),
        Metric::Cosine => Box::new(cosine::CosineDistance::<T>::new()),
    }
}

/// Caller-supplied distance function with an optional emptiness predicate.
pub struct CustomDistance<T, F> {
    compute: F,
    empty: Option<fn(&[T]) -> bool>,
    _phantom: PhantomData<fn(&T)>,
}

impl<T, F> CustomDistance<T, F>
where
    T: VectorElement,
    F: Fn(&[T], &[T]) -> f32 + Send + Sync,
{
    /// Wrap a closure computing the distance between two vectors.
    pub fn new(compute: F) -> Self {
        Self {
            compute,
            empty: None,
            _phantom: PhantomData,
        }
    }

    /// Replace the default emptiness predicate (`vector.is_empty()`).
    pub fn with_empty_predicate(mut self, predicate: fn(&[T]) -> bool) -> Self {
        self.empty = Some(predicate);
        self
    }
}

impl<T, F> DistanceFunction<T> for CustomDistance<T, F>
where
    T: VectorElement,
    F: Fn(&[T], &[T]) -> f32 + Send + Sync,
{
    #[inline]
    fn compute(&self, a: &[T], b: &[T]) -> f32 {
        (self.compute)(a, b)
    }

    fn is_empty_vector(&self, vector: &[T]) -> bool {
        match self.empty {
            Some(predicate) => predicate(vector),
            None => vector.is_empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_distance_functions() {
        let l2 = create_distance_function::<f32>(Metric::L2);
        assert_eq!(l2.name(), "L2");
        assert!((l2.compute(&[0.0, 0.0], &[3.0, 4.0]) - 25.0).abs() < 1e-6);

        let eu = create_distance_function::<f32>(Metric::Euclidean);
        assert!((eu.compute(&[0.0, 0.0], &[3.0, 4.0]) - 5.0).abs() < 1e-6);

        let ip = create_distance_function::<f32>(Metric::InnerProduct);
        assert_eq!(ip.name(), "IP");

        let cos = create_distance_function::<f32>(Metric::Cosine);
        assert_eq!(cos.name(), "Cosine");
    }

    #[test]
    fn test_checked_distance_errors() {
        let eu = create_distance_function::<f32>(Metric::Euclidean);
        assert_eq!(
            distance(eu.as_ref(), &[], &[]),
            Err(DistanceError::EmptyInput)
        );
        assert_eq!(
            distance(eu.as_ref(), &[1.0, 2.0], &[1.0]),
            Err(DistanceError::DimensionMismatch { expected: 2, got: 1 })
        );
        assert_eq!(distance(eu.as_ref(), &[1.0], &[4.0]), Ok(3.0));
    }

    #[test]
    fn test_checked_distance_symmetric() {
        let eu = create_distance_function::<f32>(Metric::Euclidean);
        let a = [1.0f32, -2.0, 0.5];
        let b = [0.0f32, 3.0, 1.5];
        assert_eq!(
            distance(eu.as_ref(), &a, &b).unwrap(),
            distance(eu.as_ref(), &b, &a).unwrap()
        );
    }

    #[test]
    fn test_custom_distance() {
        let manhattan = CustomDistance::new(|a: &[f32], b: &[f32]| {
            a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum()
        });
        assert_eq!(manhattan.compute(&[0.0, 0.0], &[1.0, 2.0]), 3.0);
        assert!(manhattan.is_empty_vector(&[]));
        assert!(!manhattan.is_empty_vector(&[0.0]));

        let zero_is_empty = CustomDistance::new(|a: &[f32], b: &[f32]| {
            a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum()
        })
        .with_empty_predicate(|v| v.iter().all(|&x| x == 0.0));
        assert!(zero_is_empty.is_empty_vector(&[0.0, 0.0]));
        assert!(!zero_is_empty.is_empty_vector(&[0.0, 1.0]));
    }
}
