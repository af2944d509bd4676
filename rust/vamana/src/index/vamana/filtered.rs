//! Filtered Vamana.
//!
//! Each node is inserted by a search that starts at its category's medoid
//! and only walks nodes of that category, and pruning is filter-aware, so
//! every category keeps a navigable subgraph of its own.

use super::build::{BuildStep, PERMUTATION_STREAM, SAMPLING_STREAM};
use super::graph::VamanaGraph;
use super::prune::PruneMode;
use super::FilteredVamanaParams;
use crate::index::traits::{GraphError, GraphResult};
use crate::types::{Category, IdType, VectorElement};
use crate::utils::random_permutation;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info};

impl<T: VectorElement> VamanaGraph<T> {
    /// Compute a start node for every category.
    ///
    /// Each category's medoid is taken over a random sample of
    /// `ceil(threshold * size)` of its members; `threshold = 1.0` gives the
    /// exact medoid.
    pub fn compute_filtered_medoids(&mut self, threshold: f32) -> GraphResult<()> {
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(GraphError::InvalidThreshold(threshold));
        }

        let mut medoids = HashMap::with_capacity(self.categories.len());
        for c in self.categories() {
            let mut members: Vec<IdType> = self.categories[&c].iter().copied().collect();
            members.sort_unstable();

            let sample_size = ((threshold as f64 * members.len() as f64).ceil() as usize)
                .clamp(1, members.len());
            let sample = if sample_size < members.len() {
                let mut rng = self.rng_for(SAMPLING_STREAM + c as u64);
                let mut shuffled = random_permutation(&mut rng, &members);
                shuffled.truncate(sample_size);
                shuffled
            } else {
                members
            };

            let medoid = self.medoid_of(&sample, false)?;
            debug!(category = c, medoid, sample_size, "category medoid");
            medoids.insert(c, medoid);
        }
        self.filtered_medoids = medoids;
        Ok(())
    }

    /// Build the graph with the Filtered Vamana algorithm.
    ///
    /// Existing edges are dropped and the build starts from an empty edge
    /// set. Uncategorized nodes are searched for from the global medoid
    /// without a filter.
    pub fn filtered_vamana(&mut self, params: &FilteredVamanaParams) -> GraphResult<()> {
        params.validate()?;
        let n = self.n_nodes();
        if n == 0 {
            return Err(GraphError::EmptyInput);
        }
        self.search_l = params.l;
        self.clear_edges();
        self.compute_filtered_medoids(params.threshold)?;
        if n == 1 {
            return Ok(());
        }

        let start = Instant::now();
        let global = self.medoid()?;
        let medoids = self.filtered_medoids.clone();
        let order = random_permutation(&mut self.rng_for(PERMUTATION_STREAM), &self.all_ids());

        let step = BuildStep {
            l: params.l,
            r: params.r,
            alpha: params.alpha,
            strategy: self.config.search_strategy,
            prune: PruneMode::Filtered,
            filtered: true,
        };
        self.insert_all(&order, &step, |_, category: Option<Category>| {
            category
                .and_then(|c| medoids.get(&c).copied())
                .unwrap_or(global)
        })?;

        if self.config.extra_random_edges > 0 {
            self.add_random_edges(self.config.extra_random_edges)?;
        }

        info!(
            n_nodes = n,
            n_edges = self.n_edges(),
            n_categories = medoids.len(),
            l = params.l,
            r = params.r,
            alpha = params.alpha,
            threshold = params.threshold,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "filtered vamana graph built"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::Metric;
    use crate::index::vamana::{GraphConfig, Query};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Two interleaved categories sharing one region of space.
    fn mixed_graph(n: usize, config: GraphConfig) -> VamanaGraph<f32> {
        let mut rng = StdRng::seed_from_u64(17);
        let mut graph = VamanaGraph::with_metric(Metric::L2, config);
        for i in 0..n {
            let v: Vec<f32> = (0..4).map(|_| rng.gen::<f32>()).collect();
            graph.create_node(v, Some((i % 2 + 1) as Category)).unwrap();
        }
        graph
    }

    #[test]
    fn test_filtered_medoids_exact() {
        let mut graph = mixed_graph(40, GraphConfig::new().with_seed(1));
        graph.compute_filtered_medoids(1.0).unwrap();
        for c in [1, 2] {
            let mut members: Vec<IdType> = graph.category_nodes(c).unwrap().iter().copied().collect();
            members.sort_unstable();
            assert_eq!(
                graph.filtered_medoids()[&c],
                graph.medoid_of(&members, false).unwrap()
            );
        }
    }

    #[test]
    fn test_filtered_medoids_sampled_in_category() {
        let mut graph = mixed_graph(40, GraphConfig::new().with_seed(1));
        graph.compute_filtered_medoids(0.25).unwrap();
        for (c, id) in graph.filtered_medoids() {
            assert_eq!(graph.node(*id).unwrap().category(), Some(*c));
        }
        assert!(matches!(
            graph.compute_filtered_medoids(0.0),
            Err(GraphError::InvalidThreshold(_))
        ));
    }

    #[test]
    fn test_filtered_vamana_isolates_categories() {
        let mut graph = mixed_graph(120, GraphConfig::new().with_seed(4));
        graph
            .filtered_vamana(&FilteredVamanaParams::new(20, 6, 1.2, 1.0))
            .unwrap();
        assert!(graph.stats().max_degree <= 6);
        assert!(graph.check_invariants().is_ok());

        let query = Query::filtered(0, vec![0.5; 4], 1);
        let start = graph.filtered_medoids()[&1];
        let outcome = graph.filtered_greedy_search(&[start], &query, 5, 20).unwrap();
        assert_eq!(outcome.closest.len(), 5);
        for id in outcome.ids().iter().chain(outcome.visited.iter()) {
            assert_eq!(graph.node(*id).unwrap().category(), Some(1));
        }
    }

    #[test]
    fn test_filtered_vamana_parallel() {
        let mut graph = mixed_graph(120, GraphConfig::new().with_seed(4).with_threads(4));
        graph
            .filtered_vamana(&FilteredVamanaParams::new(20, 6, 1.2, 0.5))
            .unwrap();
        assert!(graph.stats().max_degree <= 6);
        assert!(graph.check_invariants().is_ok());
    }

    #[test]
    fn test_filtered_vamana_validation() {
        let mut graph = mixed_graph(10, GraphConfig::default());
        assert_eq!(
            graph.filtered_vamana(&FilteredVamanaParams::new(20, 0, 1.2, 1.0)),
            Err(GraphError::InvalidR(0))
        );
        assert!(matches!(
            graph.filtered_vamana(&FilteredVamanaParams::new(20, 4, 1.2, 2.0)),
            Err(GraphError::InvalidThreshold(_))
        ));
    }
}
