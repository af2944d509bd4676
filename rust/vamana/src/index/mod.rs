//! Graph index.
//!
//! - `traits`: error types shared by the graph and its algorithms
//! - `vamana`: the Vamana proximity graph, its builders and persistence

pub mod traits;
pub mod vamana;

pub use traits::{GraphError, GraphResult};

pub use vamana::{
    FilteredVamanaParams, GraphConfig, GraphStats, Node, PruneMode, Query, SearchOutcome,
    SearchStrategy, StitchedVamanaParams, VamanaGraph, VamanaParams,
};
