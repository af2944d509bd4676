//! Medoid selection.
//!
//! The medoid of a set is the member with the smallest sum of distances to
//! all other members. It is the entry point of unfiltered search.

use super::graph::{GraphView, VamanaGraph};
use crate::index::traits::{GraphError, GraphResult};
use crate::types::{IdType, VectorElement, INVALID_ID};
use crate::utils::{chunk_bounds, WorkerPool};
use rayon::prelude::*;
use std::ops::Range;
use std::sync::atomic::Ordering;
use tracing::debug;

/// Best `(sum, id)` over the candidates at `positions`. Ties keep the
/// earliest candidate.
fn local_medoid<T: VectorElement>(
    view: &GraphView<'_, T>,
    ids: &[IdType],
    positions: Range<usize>,
) -> Option<(f64, IdType)> {
    let mut best: Option<(f64, IdType)> = None;
    for &candidate in &ids[positions] {
        let sum: f64 = ids
            .iter()
            .filter(|&&other| other != candidate)
            .map(|&other| view.dist(candidate, other) as f64)
            .sum();
        if best.map_or(true, |(best_sum, _)| sum < best_sum) {
            best = Some((sum, candidate));
        }
    }
    best
}

impl<T: VectorElement> VamanaGraph<T> {
    /// Medoid of the full node set.
    ///
    /// Computed once and cached until the node set changes.
    pub fn medoid(&self) -> GraphResult<IdType> {
        if let Some(id) = self.cached_medoid() {
            debug!(medoid = id, "medoid cache hit");
            return Ok(id);
        }
        let ids = self.all_ids();
        self.medoid_of(&ids, true)
    }

    /// Medoid of `ids`.
    ///
    /// Sets of one or two members return the first member. With `persist`
    /// and `ids` naming every node exactly once, the result is cached for
    /// [`medoid`](Self::medoid).
    pub fn medoid_of(&self, ids: &[IdType], persist: bool) -> GraphResult<IdType> {
        if ids.is_empty() {
            return Err(GraphError::EmptyInput);
        }
        if let Some(&bad) = ids.iter().find(|&&id| id as usize >= self.n_nodes()) {
            return Err(GraphError::InvalidArgument(format!("unknown node id {bad}")));
        }

        let medoid = if ids.len() <= 2 {
            ids[0]
        } else if self.n_threads() > 1 {
            self.medoid_parallel(ids)?
        } else {
            local_medoid(&self.view(), ids, 0..ids.len()).map_or(ids[0], |(_, id)| id)
        };

        if persist && self.covers_all_nodes(ids) {
            self.medoid.store(medoid, Ordering::Release);
        }
        debug!(medoid, set_size = ids.len(), "medoid computed");
        Ok(medoid)
    }

    /// Whether `ids` (already range-checked) names every node exactly once.
    fn covers_all_nodes(&self, ids: &[IdType]) -> bool {
        if ids.len() != self.n_nodes() {
            return false;
        }
        let mut seen = vec![false; ids.len()];
        ids.iter()
            .all(|&id| !std::mem::replace(&mut seen[id as usize], true))
    }

    /// Split `ids` into one contiguous chunk per worker, reduce each chunk
    /// locally, then keep the best chunk result. Chunk results are compared
    /// in chunk order so the answer matches the serial scan.
    fn medoid_parallel(&self, ids: &[IdType]) -> GraphResult<IdType> {
        let pool = WorkerPool::new(self.n_threads())?;
        let view = self.view();
        let bounds = chunk_bounds(ids.len(), pool.n_threads());

        let locals: Vec<Option<(f64, IdType)>> = pool.install(|| {
            bounds
                .into_par_iter()
                .map(|range| local_medoid(&view, ids, range))
                .collect()
        });

        let mut best: Option<(f64, IdType)> = None;
        for (sum, id) in locals.into_iter().flatten() {
            if best.map_or(true, |(best_sum, _)| sum < best_sum) {
                best = Some((sum, id));
            }
        }
        Ok(best.map_or(ids[0], |(_, id)| id))
    }

    /// Forget the cached medoid.
    pub fn invalidate_medoid(&self) {
        self.medoid.store(INVALID_ID, Ordering::Release);
    }
}
