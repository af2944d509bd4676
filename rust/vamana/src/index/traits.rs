//! Error types shared by the graph store and its algorithms.
//!
//! Argument errors are returned before any mutation takes place. Refused
//! edge mutations (duplicate edge, missing edge, self-loop) are not errors:
//! those operations report `false` and log at debug level.

use crate::types::IdType;
use thiserror::Error;

/// Errors that can occur during graph operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Invalid start node {0}: out of range or empty")]
    InvalidStart(IdType),

    #[error("Query vector is empty")]
    EmptyQuery,

    #[error("Invalid search list size L = {l}: must be positive and at least k = {k}")]
    InvalidL { l: usize, k: usize },

    #[error("Invalid alpha {0}: must be >= 1")]
    InvalidAlpha(f32),

    #[error("Invalid degree bound R = {0}: must be > 0")]
    InvalidR(usize),

    #[error("Invalid threshold {0}: must be in (0, 1]")]
    InvalidThreshold(f32),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Input set is empty")]
    EmptyInput,

    #[error("Cannot sample from an empty collection")]
    EmptyCollection,

    #[error("Vector dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Failed to start worker pool: {0}")]
    ThreadPool(String),

    #[error("Graph corruption: {0}")]
    Corruption(String),
}

/// Result type for graph operations.
pub type GraphResult<T> = Result<T, GraphError>;
