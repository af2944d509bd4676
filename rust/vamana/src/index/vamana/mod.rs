//! Vamana proximity graph.
//!
//! A flat directed graph over a fixed set of nodes, built so that greedy
//! search from a medoid reaches the nearest neighbors of a query in few hops.
//!
//! ## Key Parameters
//!
//! - `r`: maximum out-degree kept by robust prune (default: 32)
//! - `l`: beam width of the candidate list during search (default: 100)
//! - `alpha`: pruning slack, `>= 1.0` (default: 1.2)
//! - `threshold`: fraction of each category sampled for its medoid (filtered build)
//!
//! ## Builders
//!
//! | Builder | Entry point | Pruning |
//! |---------|-------------|---------|
//! | [`VamanaGraph::vamana`] | global medoid | robust prune |
//! | [`VamanaGraph::filtered_vamana`] | per-category medoid | filter-aware robust prune |
//! | [`VamanaGraph::stitched_vamana`] | per-category subgraphs | filter-aware stitch pass |
//!
//! All builders honour [`GraphConfig::n_threads`]. With one thread the edge
//! table is mutated in place without locking; with more, workers claim nodes
//! from a shared cursor and take the edge lock for each search and prune.
//!
//! ## Robust Prune
//!
//! A candidate `n` is dropped once a kept neighbor `p*` satisfies
//! `alpha * d(p*, n) <= d(p, n)`.

pub mod build;
pub mod filtered;
pub mod graph;
pub mod medoid;
pub mod node;
pub mod persist;
pub mod prune;
pub mod search;
pub mod stitched;

pub use graph::{EdgeReader, EdgeTable, EdgeWriter, GraphStats, VamanaGraph};
pub use node::{Node, Query};
pub use prune::PruneMode;
pub use search::SearchOutcome;

use crate::index::traits::{GraphError, GraphResult};

/// Default maximum out-degree (R).
pub const DEFAULT_R: usize = 32;

/// Default beam width (L).
pub const DEFAULT_L: usize = 100;

/// Default alpha for robust pruning.
pub const DEFAULT_ALPHA: f32 = 1.2;

/// Default sampling threshold for per-category medoids.
pub const DEFAULT_THRESHOLD: f32 = 1.0;

/// Default out-degree of the per-category subgraphs in a stitched build.
pub const DEFAULT_R_SMALL: usize = 16;

/// Default beam width of the per-category subgraphs in a stitched build.
pub const DEFAULT_L_SMALL: usize = 50;

/// Candidate-list implementation used by greedy search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchStrategy {
    /// Hash set with a linear scan for the closest unvisited candidate.
    #[default]
    HashSet,
    /// Bounded max-heap for the list plus a min-heap frontier.
    PriorityQueue,
}

/// Graph-wide configuration, fixed at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphConfig {
    /// Worker threads used by builders and medoid computation.
    pub n_threads: usize,
    /// Candidate-list implementation for greedy search.
    pub search_strategy: SearchStrategy,
    /// Start the unfiltered build from an R-regular random graph.
    pub random_init: bool,
    /// Random out-edges added to every node after a build.
    pub extra_random_edges: usize,
    /// Default beam width for [`VamanaGraph::search`] and friends.
    pub search_l: usize,
    /// Seed for all randomness. `None` draws from OS entropy.
    pub seed: Option<u64>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            n_threads: 1,
            search_strategy: SearchStrategy::HashSet,
            random_init: true,
            extra_random_edges: 0,
            search_l: DEFAULT_L,
            seed: None,
        }
    }
}

impl GraphConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of worker threads.
    pub fn with_threads(mut self, n_threads: usize) -> Self {
        self.n_threads = n_threads;
        self
    }

    /// Set the greedy search strategy.
    pub fn with_strategy(mut self, strategy: SearchStrategy) -> Self {
        self.search_strategy = strategy;
        self
    }

    /// Enable/disable random graph initialization.
    pub fn with_random_init(mut self, enable: bool) -> Self {
        self.random_init = enable;
        self
    }

    /// Set the number of random edges added per node after a build.
    pub fn with_extra_random_edges(mut self, n: usize) -> Self {
        self.extra_random_edges = n;
        self
    }

    /// Set the default search beam width.
    pub fn with_search_l(mut self, l: usize) -> Self {
        self.search_l = l;
        self
    }

    /// Make all randomness reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

fn check_r(r: usize) -> GraphResult<()> {
    if r == 0 {
        return Err(GraphError::InvalidR(r));
    }
    Ok(())
}

fn check_l(l: usize) -> GraphResult<()> {
    if l == 0 {
        return Err(GraphError::InvalidL { l, k: 1 });
    }
    Ok(())
}

pub(crate) fn check_alpha(alpha: f32) -> GraphResult<()> {
    // Written negated so NaN is rejected too.
    if !(alpha >= 1.0) {
        return Err(GraphError::InvalidAlpha(alpha));
    }
    Ok(())
}

/// Parameters for [`VamanaGraph::vamana`].
#[derive(Debug, Clone, PartialEq)]
pub struct VamanaParams {
    pub l: usize,
    pub r: usize,
    pub alpha: f32,
}

impl Default for VamanaParams {
    fn default() -> Self {
        Self {
            l: DEFAULT_L,
            r: DEFAULT_R,
            alpha: DEFAULT_ALPHA,
        }
    }
}

impl VamanaParams {
    pub fn new(l: usize, r: usize, alpha: f32) -> Self {
        Self { l, r, alpha }
    }

    pub fn validate(&self) -> GraphResult<()> {
        check_r(self.r)?;
        check_l(self.l)?;
        check_alpha(self.alpha)
    }
}

/// Parameters for [`VamanaGraph::filtered_vamana`].
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredVamanaParams {
    pub l: usize,
    pub r: usize,
    pub alpha: f32,
    /// Fraction of each category, in `(0, 1]`, sampled to pick its medoid.
    pub threshold: f32,
}

impl Default for FilteredVamanaParams {
    fn default() -> Self {
        Self {
            l: DEFAULT_L,
            r: DEFAULT_R,
            alpha: DEFAULT_ALPHA,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl FilteredVamanaParams {
    pub fn new(l: usize, r: usize, alpha: f32, threshold: f32) -> Self {
        Self {
            l,
            r,
            alpha,
            threshold,
        }
    }

    pub fn validate(&self) -> GraphResult<()> {
        check_r(self.r)?;
        check_l(self.l)?;
        check_alpha(self.alpha)?;
        if !(self.threshold > 0.0 && self.threshold <= 1.0) {
            return Err(GraphError::InvalidThreshold(self.threshold));
        }
        Ok(())
    }
}

/// Parameters for [`VamanaGraph::stitched_vamana`].
#[derive(Debug, Clone, PartialEq)]
pub struct StitchedVamanaParams {
    /// Default search beam width recorded on the stitched graph.
    pub l_stitched: usize,
    /// Out-degree bound of the final stitch pass.
    pub r_stitched: usize,
    /// Beam width of the per-category builds.
    pub l_small: usize,
    /// Out-degree bound of the per-category builds.
    pub r_small: usize,
    pub alpha: f32,
}

impl Default for StitchedVamanaParams {
    fn default() -> Self {
        Self {
            l_stitched: DEFAULT_L,
            r_stitched: DEFAULT_R,
            l_small: DEFAULT_L_SMALL,
            r_small: DEFAULT_R_SMALL,
            alpha: DEFAULT_ALPHA,
        }
    }
}

impl StitchedVamanaParams {
    pub fn new(
        l_stitched: usize,
        r_stitched: usize,
        l_small: usize,
        r_small: usize,
        alpha: f32,
    ) -> Self {
        Self {
            l_stitched,
            r_stitched,
            l_small,
            r_small,
            alpha,
        }
    }

    pub fn validate(&self) -> GraphResult<()> {
        check_r(self.r_stitched)?;
        check_r(self.r_small)?;
        check_l(self.l_stitched)?;
        check_l(self.l_small)?;
        check_alpha(self.alpha)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = GraphConfig::new()
            .with_threads(4)
            .with_strategy(SearchStrategy::PriorityQueue)
            .with_random_init(false)
            .with_extra_random_edges(2)
            .with_search_l(40)
            .with_seed(9);

        assert_eq!(config.n_threads, 4);
        assert_eq!(config.search_strategy, SearchStrategy::PriorityQueue);
        assert!(!config.random_init);
        assert_eq!(config.extra_random_edges, 2);
        assert_eq!(config.search_l, 40);
        assert_eq!(config.seed, Some(9));
    }

    #[test]
    fn test_vamana_params_validation() {
        assert!(VamanaParams::default().validate().is_ok());
        assert_eq!(
            VamanaParams::new(10, 0, 1.2).validate(),
            Err(GraphError::InvalidR(0))
        );
        assert!(matches!(
            VamanaParams::new(0, 4, 1.2).validate(),
            Err(GraphError::InvalidL { l: 0, .. })
        ));
        assert!(matches!(
            VamanaParams::new(10, 4, 0.5).validate(),
            Err(GraphError::InvalidAlpha(_))
        ));
        assert!(matches!(
            VamanaParams::new(10, 4, f32::NAN).validate(),
            Err(GraphError::InvalidAlpha(_))
        ));
    }

    #[test]
    fn test_filtered_params_threshold() {
        assert!(FilteredVamanaParams::new(10, 4, 1.2, 1.0).validate().is_ok());
        assert!(FilteredVamanaParams::new(10, 4, 1.2, 0.1).validate().is_ok());
        for t in [0.0, -0.5, 1.5] {
            assert!(matches!(
                FilteredVamanaParams::new(10, 4, 1.2, t).validate(),
                Err(GraphError::InvalidThreshold(_))
            ));
        }
    }

    #[test]
    fn test_stitched_params_validation() {
        assert!(StitchedVamanaParams::default().validate().is_ok());
        assert!(StitchedVamanaParams::new(10, 0, 10, 4, 1.2).validate().is_err());
        assert!(StitchedVamanaParams::new(10, 4, 10, 0, 1.2).validate().is_err());
        assert!(StitchedVamanaParams::new(0, 4, 10, 4, 1.2).validate().is_err());
        assert!(StitchedVamanaParams::new(10, 4, 0, 4, 1.2).validate().is_err());
        assert!(StitchedVamanaParams::new(10, 4, 10, 4, 0.9).validate().is_err());
    }
}
