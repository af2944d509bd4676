//! Stitched Vamana.
//!
//! Builds one small Vamana graph per category, then merges them into one
//! graph with a filter-aware prune of every node.

use super::build::{BuildStep, PERMUTATION_STREAM};
use super::graph::VamanaGraph;
use super::prune::{prune_in, PruneMode};
use super::StitchedVamanaParams;
use crate::index::traits::{GraphError, GraphResult};
use crate::types::{Category, IdType, VectorElement};
use crate::utils::{random_permutation, WorkerPool};
use std::time::Instant;
use tracing::{debug, info};

impl<T: VectorElement> VamanaGraph<T> {
    /// Build the graph with the Stitched Vamana algorithm.
    ///
    /// Every category gets its own subgraph built with `l_small` and
    /// `r_small`, rooted at the category's exact medoid. Uncategorized nodes
    /// form one more subgraph. Every node is then pruned once more with
    /// `r_stitched`. `l_stitched` becomes the graph's default search beam.
    pub fn stitched_vamana(&mut self, params: &StitchedVamanaParams) -> GraphResult<()> {
        params.validate()?;
        let n = self.n_nodes();
        if n == 0 {
            return Err(GraphError::EmptyInput);
        }
        self.search_l = params.l_stitched;
        self.clear_edges();
        self.compute_filtered_medoids(1.0)?;
        if n == 1 {
            return Ok(());
        }

        let start = Instant::now();
        let step = BuildStep {
            l: params.l_small,
            r: params.r_small,
            alpha: params.alpha,
            strategy: self.config.search_strategy,
            prune: PruneMode::Plain,
            filtered: true,
        };

        let mut groups: Vec<(Option<Category>, Vec<IdType>)> = self
            .categories()
            .into_iter()
            .map(|c| {
                let mut ids: Vec<IdType> = self.categories[&c].iter().copied().collect();
                ids.sort_unstable();
                (Some(c), ids)
            })
            .collect();
        let uncategorized: Vec<IdType> = self
            .nodes
            .iter()
            .filter(|node| node.category().is_none())
            .map(|node| node.id())
            .collect();
        if !uncategorized.is_empty() {
            groups.push((None, uncategorized));
        }

        for (category, ids) in groups {
            if ids.len() < 2 {
                continue;
            }
            let root = match category.and_then(|c| self.filtered_medoids.get(&c).copied()) {
                Some(id) => id,
                None => self.medoid_of(&ids, false)?,
            };
            let mut rng = self.rng_for(PERMUTATION_STREAM + root as u64);
            let order = random_permutation(&mut rng, &ids);
            self.insert_all(&order, &step, |_, _| root)?;
            debug!(?category, size = ids.len(), root, "category subgraph built");
        }

        self.stitch(params)?;

        info!(
            n_nodes = n,
            n_edges = self.n_edges(),
            n_categories = self.filtered_medoids.len(),
            r_small = params.r_small,
            r_stitched = params.r_stitched,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "stitched vamana graph built"
        );
        Ok(())
    }

    /// Filter-aware prune of every node with the stitched degree bound.
    fn stitch(&mut self, params: &StitchedVamanaParams) -> GraphResult<()> {
        let n = self.n_nodes();
        let n_threads = self.n_threads();
        if n_threads == 1 {
            let (view, table) = self.split_mut();
            for p in 0..n as IdType {
                let current = table.neighbor_vec(p);
                prune_in(&view, table, p, current, params.alpha, params.r_stitched, PruneMode::Filtered);
            }
            return Ok(());
        }

        let pool = WorkerPool::new(n_threads)?;
        let view = self.view();
        let lock = &self.edges;
        pool.for_each_claimed(n, |i| {
            let p = i as IdType;
            let mut table = lock.write();
            let current = table.neighbor_vec(p);
            prune_in(&view, &mut table, p, current, params.alpha, params.r_stitched, PruneMode::Filtered);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::Metric;
    use crate::index::vamana::{GraphConfig, Query};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn clustered_graph(per_category: usize, config: GraphConfig) -> VamanaGraph<f32> {
        let mut rng = StdRng::seed_from_u64(23);
        let mut graph = VamanaGraph::with_metric(Metric::L2, config);
        for c in 1..=3 {
            for _ in 0..per_category {
                let v: Vec<f32> = (0..3).map(|_| rng.gen::<f32>() + c as f32).collect();
                graph.create_node(v, Some(c as Category)).unwrap();
            }
        }
        graph
    }

    #[test]
    fn test_stitched_degree_bound() {
        let mut graph = clustered_graph(30, GraphConfig::new().with_seed(8));
        graph
            .stitched_vamana(&StitchedVamanaParams::new(40, 5, 20, 8, 1.2))
            .unwrap();
        assert!(graph.stats().max_degree <= 5);
        assert!(graph.check_invariants().is_ok());
        assert_eq!(graph.search_l(), 40);
        assert_eq!(graph.filtered_medoids().len(), 3);
    }

    #[test]
    fn test_stitched_edges_stay_in_category() {
        let mut graph = clustered_graph(30, GraphConfig::new().with_seed(8));
        graph.stitched_vamana(&StitchedVamanaParams::default()).unwrap();
        for node in graph.nodes() {
            for j in graph.neighbors(node.id()) {
                assert_eq!(graph.node(j).unwrap().category(), node.category());
            }
        }

        let query = Query::filtered(0, vec![2.5; 3], 2);
        let results = graph.filtered_search(&query, 3, None).unwrap();
        assert_eq!(results.len(), 3);
        for (id, _) in results {
            assert_eq!(graph.node(id).unwrap().category(), Some(2));
        }
    }

    #[test]
    fn test_stitched_parallel() {
        let mut graph = clustered_graph(40, GraphConfig::new().with_seed(8).with_threads(3));
        graph
            .stitched_vamana(&StitchedVamanaParams::new(30, 6, 20, 8, 1.2))
            .unwrap();
        assert!(graph.stats().max_degree <= 6);
        assert!(graph.check_invariants().is_ok());
    }

    #[test]
    fn test_stitched_validation() {
        let mut graph = clustered_graph(5, GraphConfig::default());
        assert!(graph
            .stitched_vamana(&StitchedVamanaParams::new(10, 4, 10, 4, 0.9))
            .is_err());
        assert_eq!(graph.n_edges(), 0);
    }
}
