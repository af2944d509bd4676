//! Vamana - proximity graph construction and search for approximate
//! nearest neighbor queries.
//!
//! The library builds a directed graph over a fixed set of vectors so that
//! greedy search from a well-chosen entry point reaches a query's nearest
//! neighbors in few hops. Nodes may carry a category; filtered builds keep
//! every category navigable on its own.
//!
//! # Builders
//!
//! - **Vamana**: robust-pruned graph searched from the global medoid.
//! - **Filtered Vamana**: per-category entry points and filter-aware pruning.
//! - **Stitched Vamana**: one small graph per category, merged by a final
//!   filter-aware prune.
//!
//! All builders run serially or on a worker pool, see
//! [`GraphConfig::n_threads`](index::GraphConfig::n_threads).
//!
//! # Distance Metrics
//!
//! - **L2**: Squared Euclidean distance. Lower values = more similar.
//! - **Inner Product**: Dot product (negated for distance).
//! - **Cosine**: 1 - cosine similarity.
//! - Any caller-supplied function via [`distance::CustomDistance`].
//!
//! # Data Types
//!
//! - `f32`: Single precision float (default)
//! - `f64`: Double precision float
//! - `Float16`: Half precision float (IEEE 754-2008)
//! - `BFloat16`: Brain float (same exponent range as f32)
//!
//! # Examples
//!
//! ```rust
//! use vamana::prelude::*;
//!
//! let config = GraphConfig::new().with_seed(7);
//! let mut graph = VamanaGraph::<f32>::with_metric(Metric::L2, config);
//!
//! for i in 0..100 {
//!     let x = i as f32;
//!     graph.create_node(vec![x.sin(), x.cos()], None).unwrap();
//! }
//! graph.vamana(&VamanaParams::new(32, 8, 1.2)).unwrap();
//!
//! let results = graph.search(&[0.0, 1.0], 5, None).unwrap();
//! assert_eq!(results.len(), 5);
//! ```
//!
//! ## Filtered Search
//!
//! ```rust
//! use vamana::prelude::*;
//!
//! let mut graph = VamanaGraph::<f32>::with_metric(Metric::L2, GraphConfig::new().with_seed(1));
//! for i in 0..60u32 {
//!     graph.create_node(vec![i as f32, (i % 7) as f32], Some(i % 3)).unwrap();
//! }
//! graph.filtered_vamana(&FilteredVamanaParams::new(20, 6, 1.2, 1.0)).unwrap();
//!
//! let query = Query::filtered(0, vec![30.0, 2.0], 1);
//! for (id, _) in graph.filtered_search(&query, 3, None).unwrap() {
//!     assert_eq!(graph.node(id).unwrap().category(), Some(1));
//! }
//! ```

pub mod distance;
pub mod index;
pub mod serialization;
pub mod types;
pub mod utils;


/// Prelude module for convenient imports.
///
/// Use `use vamana::prelude::*;` to import commonly used types.
pub mod prelude {
    // Types
    pub use crate::types::{BFloat16, Category, Float16, IdType, VectorElement, INVALID_ID};

    // Distance
    pub use crate::distance::{create_distance_function, CustomDistance, DistanceFunction, Metric};

    // Graph, parameters and errors
    pub use crate::index::{
        FilteredVamanaParams, GraphConfig, GraphError, GraphResult, GraphStats, Node, PruneMode,
        Query, SearchOutcome, SearchStrategy, StitchedVamanaParams, VamanaGraph, VamanaParams,
    };

    // Serialization
    pub use crate::serialization::SerializationError;
}

/// Create an empty graph with the default configuration.
pub fn create_graph<T: types::VectorElement>(metric: distance::Metric) -> index::VamanaGraph<T> {
    index::VamanaGraph::with_metric(metric, index::GraphConfig::default())
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_prelude_imports() {
        let mut graph = VamanaGraph::<f32>::with_metric(Metric::L2, GraphConfig::default());
        graph.create_node(vec![1.0, 0.0], None).unwrap();
        graph.create_node(vec![0.0, 1.0], None).unwrap();
        graph.add_edge(0, 1);

        let outcome = graph.greedy_search(0, &[0.0, 1.0], 1, 2).unwrap();
        assert_eq!(outcome.ids(), vec![1]);
    }

    #[test]
    fn test_convenience_functions() {
        let mut graph = super::create_graph::<Float16>(Metric::Cosine);
        graph
            .create_node(vec![Float16::from_f32(1.0), Float16::from_f32(0.5)], Some(2))
            .unwrap();
        assert_eq!(graph.n_nodes(), 1);
        assert_eq!(graph.categories(), vec![2]);
    }
}
