//! Sampling and set algebra over node IDs.

use crate::distance::DistanceFunction;
use crate::index::traits::{GraphError, GraphResult};
use crate::types::{IdType, VectorElement};
use rand::seq::SliceRandom;
use rand::Rng;
use std::cmp::Ordering;
use std::collections::HashSet;

/// Draw one element uniformly at random.
pub fn sample_uniform<R, X>(rng: &mut R, items: &[X]) -> GraphResult<X>
where
    R: Rng + ?Sized,
    X: Copy,
{
    items.choose(rng).copied().ok_or(GraphError::EmptyCollection)
}

/// Uniformly random ordering of `ids`. Each call draws fresh randomness
/// from `rng`.
pub fn random_permutation<R: Rng + ?Sized>(rng: &mut R, ids: &[IdType]) -> Vec<IdType> {
    let mut order = ids.to_vec();
    if order.len() > 1 {
        order.shuffle(rng);
    }
    order
}

/// Elements of `a` that are not in `b`.
pub fn set_difference(a: &HashSet<IdType>, b: &HashSet<IdType>) -> HashSet<IdType> {
    a.difference(b).copied().collect()
}

/// Elements of either `a` or `b`.
pub fn set_union(a: &HashSet<IdType>, b: &HashSet<IdType>) -> HashSet<IdType> {
    a.union(b).copied().collect()
}

/// Keep the `n` entries with the smallest distance.
///
/// Uses a partition-select, so the order among the kept entries is
/// unspecified. `scored` is returned untouched when `n >= scored.len()`.
pub(crate) fn closest_n_scored(n: usize, mut scored: Vec<(IdType, f32)>) -> Vec<(IdType, f32)> {
    if n >= scored.len() {
        return scored;
    }
    if n == 0 {
        return Vec::new();
    }
    scored.select_nth_unstable_by(n - 1, cmp_scored);
    scored.truncate(n);
    scored
}

/// Order `(id, distance)` pairs by distance, ties broken by id.
#[inline]
pub(crate) fn cmp_scored(a: &(IdType, f32), b: &(IdType, f32)) -> Ordering {
    a.1.partial_cmp(&b.1)
        .unwrap_or(Ordering::Equal)
        .then(a.0.cmp(&b.0))
}

/// Return the `n` candidates closest to `target`.
///
/// | condition | behavior |
/// |---|---|
/// | `candidates` empty | empty result, warning |
/// | `target` empty | `EmptyQuery` |
/// | `n == 0` | empty result, warning |
/// | `n >= candidates.len()` | candidates unchanged |
pub fn closest_n<'a, T, F>(
    n: usize,
    candidates: &[IdType],
    target: &[T],
    value_of: F,
    dist_fn: &dyn DistanceFunction<T>,
) -> GraphResult<Vec<IdType>>
where
    T: VectorElement,
    F: Fn(IdType) -> &'a [T],
{
    if candidates.is_empty() {
        tracing::warn!("closest_n called with an empty candidate set");
        return Ok(Vec::new());
    }
    if dist_fn.is_empty_vector(target) {
        return Err(GraphError::EmptyQuery);
    }
    if n == 0 {
        tracing::warn!("closest_n called with n = 0");
        return Ok(Vec::new());
    }
    if n >= candidates.len() {
        return Ok(candidates.to_vec());
    }

    let scored = candidates
        .iter()
        .map(|&id| (id, dist_fn.compute(value_of(id), target)))
        .collect();
    Ok(closest_n_scored(n, scored)
        .into_iter()
        .map(|(id, _)| id)
        .collect())
}
