//! Graph construction: random R-regular initialization and the Vamana
//! builder.
//!
//! Every builder runs serially when `n_threads == 1`, mutating the edge
//! table in place. Otherwise a worker pool is created for the build and
//! each worker claims the next node from a shared cursor; searches take
//! the edge read lock and prunes the write lock.

use super::graph::{EdgeAccess, EdgeTable, GraphView, VamanaGraph};
use super::prune::{prune_in, PruneMode};
use super::search::search_in;
use super::{SearchStrategy, VamanaParams};
use crate::index::traits::{GraphError, GraphResult};
use crate::types::{Category, IdType, VectorElement};
use crate::utils::{random_permutation, sample_uniform, WorkerPool};
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, info, warn};

/// RNG stream ids. Per-node streams are offset by the node id.
pub(crate) const PERMUTATION_STREAM: u64 = 1;
pub(crate) const SAMPLING_STREAM: u64 = 2;
const RGRAPH_STREAM: u64 = 1 << 32;
const EXTRA_EDGES_STREAM: u64 = 2 << 32;

/// Parameters of one insertion pass.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BuildStep {
    pub l: usize,
    pub r: usize,
    pub alpha: f32,
    pub strategy: SearchStrategy,
    pub prune: PruneMode,
    /// Restrict each node's search to its own category.
    pub filtered: bool,
}

/// Insert `s`: search towards it from `start`, prune its out-edges from the
/// visited nodes, then add back-edges and re-prune any neighbor that went
/// over the degree bound.
fn insert_node<T, E>(view: &GraphView<'_, T>, edges: &mut E, s: IdType, start: IdType, step: &BuildStep)
where
    T: VectorElement,
    E: EdgeAccess,
{
    if view.is_empty_node(s) {
        debug!(node = s, "skipping empty node");
        return;
    }
    let filter = if step.filtered { view.category(s) } else { None };
    let query = view.value(s);

    let visited = edges.with_read(|table| {
        search_in(view, table, &[start], query, 0, step.l, step.strategy, filter).visited
    });
    let kept = edges.with_write(|table| prune_in(view, table, s, visited, step.alpha, step.r, step.prune));

    for j in kept {
        edges.with_write(|table| {
            table.add_edge(j, s);
            if table.degree(j) > step.r {
                let current = table.neighbor_vec(j);
                prune_in(view, table, j, current, step.alpha, step.r, step.prune);
            }
        });
    }
}

/// Add `r` random out-edges to `node`, giving up on an edge after
/// `2 * n` rejected draws. Returns `false` on a timeout.
fn random_out_edges<R, E>(rng: &mut R, edges: &mut E, node: IdType, ids: &[IdType], r: usize) -> bool
where
    R: Rng,
    E: EdgeAccess,
{
    let budget = 2 * ids.len();
    for _ in 0..r {
        let mut attempts = 0;
        loop {
            if attempts == budget {
                warn!(node, budget, "random edge timed out");
                return false;
            }
            attempts += 1;
            let Ok(to) = sample_uniform(rng, ids) else {
                return false;
            };
            if edges.with_write(|table| table.add_edge(node, to)) {
                break;
            }
        }
    }
    true
}

impl<T: VectorElement> VamanaGraph<T> {
    /// Run `step` for every node of `order`, starting each search at
    /// `start_of(node, category)`.
    pub(crate) fn insert_all<S>(&mut self, order: &[IdType], step: &BuildStep, start_of: S) -> GraphResult<()>
    where
        S: Fn(IdType, Option<Category>) -> IdType + Sync,
    {
        let n_threads = self.n_threads();
        if n_threads == 1 || order.len() < 2 {
            let (view, table) = self.split_mut();
            let mut access: &mut EdgeTable = table;
            for &s in order {
                insert_node(&view, &mut access, s, start_of(s, view.category(s)), step);
            }
            return Ok(());
        }

        let pool = WorkerPool::new(n_threads)?;
        let view = self.view();
        let lock = &self.edges;
        pool.for_each_claimed(order.len(), |i| {
            let s = order[i];
            let mut access = lock;
            insert_node(&view, &mut access, s, start_of(s, view.category(s)), step);
            Ok(())
        })
    }

    /// Add `r` uniformly random out-edges to every node.
    ///
    /// Existing edges are kept. Returns `Ok(false)` when some node could not
    /// find a free target within its retry budget; the edges placed so far
    /// stay in the graph.
    pub fn rgraph(&mut self, r: usize) -> GraphResult<bool> {
        let n = self.n_nodes();
        if n < 2 {
            if r > 0 {
                return Err(GraphError::InvalidArgument(format!(
                    "cannot place {r} out-edges per node in a graph of {n} nodes"
                )));
            }
            return Ok(true);
        }
        if r > n - 1 {
            return Err(GraphError::InvalidArgument(format!(
                "R = {r} exceeds n_nodes - 1 = {}",
                n - 1
            )));
        }
        let capacity = n.checked_mul(n - 1);
        if n.checked_mul(r).zip(capacity).map_or(true, |(need, cap)| need > cap) {
            return Err(GraphError::InvalidArgument(format!(
                "{n} x {r} edges exceed the graph capacity"
            )));
        }
        if (r as f64) <= (n as f64).ln() {
            warn!(r, n, "R <= ln(n): the random graph may be disconnected");
        }

        let start = Instant::now();
        let ids = self.all_ids();
        let n_threads = self.n_threads();
        let complete = if n_threads == 1 {
            let mut complete = true;
            for &node in &ids {
                let mut rng = self.rng_for(RGRAPH_STREAM + node as u64);
                let mut access: &mut EdgeTable = self.edges.get_mut();
                complete &= random_out_edges(&mut rng, &mut access, node, &ids, r);
            }
            complete
        } else {
            let pool = WorkerPool::new(n_threads)?;
            let timed_out = AtomicBool::new(false);
            let this = &*self;
            pool.for_each_claimed(n, |i| {
                let node = ids[i];
                let mut rng = this.rng_for(RGRAPH_STREAM + node as u64);
                let mut access = &this.edges;
                if !random_out_edges(&mut rng, &mut access, node, &ids, r) {
                    timed_out.store(true, Ordering::Relaxed);
                }
                Ok(())
            })?;
            !timed_out.load(Ordering::Relaxed)
        };

        info!(
            n_nodes = n,
            r,
            n_edges = self.n_edges(),
            complete,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "random graph built"
        );
        Ok(complete)
    }

    /// Add `per_node` random out-edges to every node after a build.
    ///
    /// `per_node` is clamped to the number of free targets.
    pub fn add_random_edges(&mut self, per_node: usize) -> GraphResult<bool> {
        let n = self.n_nodes();
        if n < 2 || per_node == 0 {
            return Ok(true);
        }
        let ids = self.all_ids();
        let mut complete = true;
        for &node in &ids {
            let free = n - 1 - self.edges.get_mut().degree(node);
            let mut rng = self.rng_for(EXTRA_EDGES_STREAM + node as u64);
            let mut access: &mut EdgeTable = self.edges.get_mut();
            complete &= random_out_edges(&mut rng, &mut access, node, &ids, per_node.min(free));
        }
        debug!(per_node, complete, "extra random edges added");
        Ok(complete)
    }

    /// Build the graph with the Vamana algorithm.
    ///
    /// Existing edges are dropped. With `random_init` the build starts from
    /// an R-regular random graph; nodes are then inserted in random order,
    /// each searched for from the medoid with beam width `l` and pruned to
    /// at most `r` out-edges.
    pub fn vamana(&mut self, params: &VamanaParams) -> GraphResult<()> {
        params.validate()?;
        let n = self.n_nodes();
        if n == 0 {
            return Err(GraphError::EmptyInput);
        }
        self.search_l = params.l;
        self.clear_edges();
        if n == 1 {
            return Ok(());
        }

        let start = Instant::now();
        if self.config.random_init && !self.rgraph(params.r.min(n - 1))? {
            warn!("random initialization incomplete, continuing");
        }
        let medoid = self.medoid()?;
        let order = random_permutation(&mut self.rng_for(PERMUTATION_STREAM), &self.all_ids());

        let step = BuildStep {
            l: params.l,
            r: params.r,
            alpha: params.alpha,
            strategy: self.config.search_strategy,
            prune: PruneMode::Plain,
            filtered: false,
        };
        self.insert_all(&order, &step, |_, _| medoid)?;

        if self.config.extra_random_edges > 0 {
            self.add_random_edges(self.config.extra_random_edges)?;
        }

        info!(
            n_nodes = n,
            n_edges = self.n_edges(),
            medoid,
            l = params.l,
            r = params.r,
            alpha = params.alpha,
            n_threads = self.n_threads(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "vamana graph built"
        );
        Ok(())
    }
}
