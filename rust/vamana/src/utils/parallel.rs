//! Worker pool helpers for the parallel build phases.
//!
//! Two distribution schemes are used:
//! - static contiguous chunks ([`chunk_bounds`]) for the medoid reduction
//! - a shared cursor that workers advance to claim the next unit of work
//!   ([`WorkerPool::for_each_claimed`]) for R-graph and Vamana construction

use crate::index::traits::{GraphError, GraphResult};
use parking_lot::Mutex;
use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Split `0..n_items` into `n_chunks` contiguous ranges.
///
/// Chunk sizes differ by at most one; the first `n_items % n_chunks` chunks
/// get the extra item. Empty chunks are dropped.
pub fn chunk_bounds(n_items: usize, n_chunks: usize) -> Vec<Range<usize>> {
    let n_chunks = n_chunks.max(1);
    let base = n_items / n_chunks;
    let extra = n_items % n_chunks;

    let mut bounds = Vec::with_capacity(n_chunks);
    let mut start = 0;
    for chunk in 0..n_chunks {
        let len = base + usize::from(chunk < extra);
        if len == 0 {
            break;
        }
        bounds.push(start..start + len);
        start += len;
    }
    bounds
}

/// A fixed-size pool of worker threads.
pub struct WorkerPool {
    pool: rayon::ThreadPool,
    n_threads: usize,
}

impl WorkerPool {
    /// Create a pool with `n_threads` workers.
    pub fn new(n_threads: usize) -> GraphResult<Self> {
        let n_threads = n_threads.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(n_threads)
            .thread_name(|i| format!("vamana-worker-{i}"))
            .build()
            .map_err(|e| GraphError::ThreadPool(e.to_string()))?;
        Ok(Self { pool, n_threads })
    }

    #[inline]
    pub fn n_threads(&self) -> usize {
        self.n_threads
    }

    /// Run `op` inside the pool so that rayon parallel iterators use its
    /// workers.
    pub fn install<R, OP>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(op)
    }

    /// Process items `0..n_items`, each worker claiming the next unclaimed
    /// index from a shared cursor.
    ///
    /// A failing item does not stop its worker. Failures are collected and,
    /// once every worker has joined, the first one is returned. Work already
    /// done by other items is kept.
    pub fn for_each_claimed<F>(&self, n_items: usize, work: F) -> GraphResult<()>
    where
        F: Fn(usize) -> GraphResult<()> + Sync,
    {
        let cursor = AtomicUsize::new(0);
        let failures: Mutex<Vec<(usize, GraphError)>> = Mutex::new(Vec::new());

        self.pool.scope(|scope| {
            for worker in 0..self.n_threads {
                let cursor = &cursor;
                let failures = &failures;
                let work = &work;
                scope.spawn(move |_| loop {
                    let item = cursor.fetch_add(1, Ordering::Relaxed);
                    if item >= n_items {
                        break;
                    }
                    if let Err(e) = work(item) {
                        failures.lock().push((worker, e));
                    }
                });
            }
        });

        let mut failures = failures.into_inner();
        if failures.is_empty() {
            return Ok(());
        }
        tracing::warn!(
            failed = failures.len(),
            total = n_items,
            "parallel work items reported failures"
        );
        let (worker, first) = failures.swap_remove(0);
        tracing::debug!(worker, error = %first, "first recorded failure");
        Err(first)
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("n_threads", &self.n_threads)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_bounds_even() {
        assert_eq!(chunk_bounds(8, 4), vec![0..2, 2..4, 4..6, 6..8]);
    }

    #[test]
    fn test_chunk_bounds_extra_goes_first() {
        assert_eq!(chunk_bounds(10, 4), vec![0..3, 3..6, 6..8, 8..10]);
    }

    #[test]
    fn test_chunk_bounds_more_chunks_than_items() {
        assert_eq!(chunk_bounds(2, 4), vec![0..1, 1..2]);
        assert!(chunk_bounds(0, 4).is_empty());
    }

    #[test]
    fn test_for_each_claimed_visits_every_item_once() {
        let pool = WorkerPool::new(4).unwrap();
        let seen: Vec<AtomicUsize> = (0..100).map(|_| AtomicUsize::new(0)).collect();
        pool.for_each_claimed(100, |i| {
            seen[i].fetch_add(1, Ordering::Relaxed);
            Ok(())
        })
        .unwrap();
        assert!(seen.iter().all(|c| c.load(Ordering::Relaxed) == 1));
    }

    #[test]
    fn test_for_each_claimed_aggregates_failures() {
        let pool = WorkerPool::new(3).unwrap();
        let done = AtomicUsize::new(0);
        let result = pool.for_each_claimed(30, |i| {
            done.fetch_add(1, Ordering::Relaxed);
            if i % 10 == 0 {
                Err(GraphError::InvalidArgument(format!("item {i}")))
            } else {
                Ok(())
            }
        });
        assert!(matches!(result, Err(GraphError::InvalidArgument(_))));
        // Failures do not cancel the remaining work.
        assert_eq!(done.load(Ordering::Relaxed), 30);
    }
}
