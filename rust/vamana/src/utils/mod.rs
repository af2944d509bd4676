//! Utility types and functions.
//!
//! - Priority queues (max-heap and min-heap) for beam search
//! - Sampling and set algebra over node IDs
//! - Worker pool helpers for the parallel build phases

pub mod heap;
pub mod parallel;
pub mod sampling;

pub use heap::{Admission, HeapEntry, MaxHeap, MinHeap};
pub use parallel::{chunk_bounds, WorkerPool};
pub use sampling::{closest_n, random_permutation, sample_uniform, set_difference, set_union};
