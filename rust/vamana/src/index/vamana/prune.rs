//! Robust prune.
//!
//! Replaces a node's out-edges with a diverse subset of candidates: the
//! closest candidate is always kept, and every remaining candidate it
//! dominates (`alpha * d(kept, n) <= d(p, n)`) is discarded. Repeats until
//! `r` neighbors are kept or no candidates remain.

use super::check_alpha;
use super::graph::{EdgeTable, GraphView, VamanaGraph};
use crate::index::traits::{GraphError, GraphResult};
use crate::types::{IdType, VectorElement};
use crate::utils::sampling::cmp_scored;
use std::collections::HashSet;

/// Which candidates a kept neighbor may discard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PruneMode {
    /// Any dominated candidate.
    Plain,
    /// A dominated candidate sharing `p`'s category is only discarded when
    /// the kept neighbor shares that category too, so every category keeps
    /// its own path out of `p`.
    Filtered,
}

/// Prune kernel shared by the public prunes and the builders.
///
/// Runs entirely under the caller's exclusive access to `edges`. Returns the
/// kept neighbors, closest first.
pub(crate) fn prune_in<T, I>(
    view: &GraphView<'_, T>,
    edges: &mut EdgeTable,
    p: IdType,
    candidates: I,
    alpha: f32,
    r: usize,
    mode: PruneMode,
) -> Vec<IdType>
where
    T: VectorElement,
    I: IntoIterator<Item = IdType>,
{
    let mut pool: HashSet<IdType> = candidates.into_iter().collect();
    pool.extend(edges.take_neighbors(p));
    pool.remove(&p);

    let mut scored: Vec<(IdType, f32)> = pool.into_iter().map(|n| (n, view.dist(p, n))).collect();
    // Farthest first, so the closest remaining candidate is popped from the back.
    scored.sort_unstable_by(|a, b| cmp_scored(b, a));

    let category_p = view.category(p);
    let mut kept = Vec::with_capacity(r);
    while kept.len() < r {
        let Some((best, _)) = scored.pop() else {
            break;
        };
        kept.push(best);

        let best_shares = category_p.is_some() && view.category(best) == category_p;
        scored.retain(|&(n, d_pn)| {
            if mode == PruneMode::Filtered {
                let n_shares = category_p.is_some() && view.category(n) == category_p;
                if n_shares && !best_shares {
                    return true;
                }
            }
            alpha * view.dist(best, n) > d_pn
        });
    }

    edges.add_batch(p, kept.iter().copied());
    kept
}

impl<T: VectorElement> VamanaGraph<T> {
    fn check_prune(&self, p: IdType, candidates: &[IdType], alpha: f32, r: usize) -> GraphResult<()> {
        if self.is_empty_node(p) {
            return Err(GraphError::InvalidStart(p));
        }
        check_alpha(alpha)?;
        if r == 0 {
            return Err(GraphError::InvalidR(r));
        }
        if let Some(&bad) = candidates.iter().find(|&&c| c as usize >= self.n_nodes()) {
            return Err(GraphError::InvalidArgument(format!("unknown candidate {bad}")));
        }
        Ok(())
    }

    /// Replace the out-edges of `p` with at most `r` neighbors chosen from
    /// `candidates` and its current out-neighbors.
    ///
    /// Holds the edge write lock for the whole call.
    pub fn robust_prune(&self, p: IdType, candidates: &[IdType], alpha: f32, r: usize) -> GraphResult<()> {
        self.prune_with(PruneMode::Plain, p, candidates, alpha, r)
    }

    /// Filter-aware variant of [`robust_prune`](Self::robust_prune).
    pub fn filtered_robust_prune(
        &self,
        p: IdType,
        candidates: &[IdType],
        alpha: f32,
        r: usize,
    ) -> GraphResult<()> {
        self.prune_with(PruneMode::Filtered, p, candidates, alpha, r)
    }

    fn prune_with(
        &self,
        mode: PruneMode,
        p: IdType,
        candidates: &[IdType],
        alpha: f32,
        r: usize,
    ) -> GraphResult<()> {
        self.check_prune(p, candidates, alpha, r)?;
        let mut edges = self.edges.write();
        prune_in(&self.view(), &mut edges, p, candidates.iter().copied(), alpha, r, mode);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::Metric;
    use crate::index::vamana::GraphConfig;
    use crate::types::Category;

    fn graph_with(points: &[([f32; 2], Option<Category>)]) -> VamanaGraph<f32> {
        let mut graph = VamanaGraph::with_metric(Metric::L2, GraphConfig::default());
        for (p, c) in points {
            graph.create_node(p.to_vec(), *c).unwrap();
        }
        graph
    }

    #[test]
    fn test_prune_drops_dominated_candidates() {
        // 1 and 2 lie in the same direction from 0; 3 lies the other way.
        let graph = graph_with(&[
            ([0.0, 0.0], None),
            ([1.0, 0.0], None),
            ([2.0, 0.0], None),
            ([-1.5, 0.0], None),
        ]);
        graph.robust_prune(0, &[1, 2, 3], 1.2, 8).unwrap();
        assert_eq!(graph.neighbors(0), vec![1, 3]);
    }

    #[test]
    fn test_prune_respects_degree_bound() {
        let points: Vec<([f32; 2], Option<Category>)> = (0..10)
            .map(|i| {
                let angle = i as f32 * std::f32::consts::TAU / 10.0;
                ([angle.cos(), angle.sin()], None)
            })
            .chain(std::iter::once(([0.0, 0.0], None)))
            .collect();
        let graph = graph_with(&points);
        let candidates: Vec<IdType> = (0..10).collect();
        graph.robust_prune(10, &candidates, 1.0, 3).unwrap();
        assert_eq!(graph.degree(10), 3);
    }

    #[test]
    fn test_prune_merges_existing_neighbors() {
        let graph = graph_with(&[
            ([0.0, 0.0], None),
            ([1.0, 0.0], None),
            ([0.0, 1.0], None),
        ]);
        graph.add_edge(0, 2);
        graph.robust_prune(0, &[1, 0], 1.0, 4).unwrap();
        assert_eq!(graph.neighbors(0), vec![1, 2]);
        assert_eq!(graph.n_edges(), 2);
    }

    #[test]
    fn test_prune_validation() {
        let graph = graph_with(&[([0.0, 0.0], None), ([1.0, 0.0], None)]);
        assert_eq!(graph.robust_prune(5, &[1], 1.2, 2), Err(GraphError::InvalidStart(5)));
        assert!(matches!(
            graph.robust_prune(0, &[1], 0.8, 2),
            Err(GraphError::InvalidAlpha(_))
        ));
        assert_eq!(graph.robust_prune(0, &[1], 1.2, 0), Err(GraphError::InvalidR(0)));
        assert!(matches!(
            graph.robust_prune(0, &[7], 1.2, 2),
            Err(GraphError::InvalidArgument(_))
        ));
        assert_eq!(graph.n_edges(), 0);
    }

    #[test]
    fn test_filtered_prune_keeps_category_path() {
        // From 0 (category 1): 1 is category 2 and dominates 2 (category 1).
        let graph = graph_with(&[
            ([0.0, 0.0], Some(1)),
            ([1.0, 0.0], Some(2)),
            ([2.0, 0.0], Some(1)),
        ]);
        graph.robust_prune(0, &[1, 2], 1.2, 4).unwrap();
        assert_eq!(graph.neighbors(0), vec![1]);

        graph.filtered_robust_prune(0, &[1, 2], 1.2, 4).unwrap();
        assert_eq!(graph.neighbors(0), vec![1, 2]);
    }
}
