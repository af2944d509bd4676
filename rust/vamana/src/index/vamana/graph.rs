//! Graph store: nodes, category index, and the directed edge table.
//!
//! Nodes and categories are written only through `&mut self` and are read
//! freely afterwards. The edge table sits behind a single `RwLock` so that
//! searches (readers) and prunes (writers) can run on shared references
//! from several workers. A prune holds the write guard for its whole call,
//! so a search never observes a half-pruned neighbor list.

use super::node::Node;
use super::GraphConfig;
use crate::distance::{create_distance_function, DistanceFunction, Metric};
use crate::index::traits::{GraphError, GraphResult};
use crate::types::{Category, IdType, VectorElement, INVALID_ID};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{debug, warn};

/// Shared access to the edge table.
pub type EdgeReader<'a> = RwLockReadGuard<'a, EdgeTable>;

/// Exclusive access to the edge table.
///
/// Holding a writer lets a caller chain several edge mutations without
/// anyone observing the intermediate state.
pub type EdgeWriter<'a> = RwLockWriteGuard<'a, EdgeTable>;

/// Directed out-edges of every node.
///
/// Invariants: no self-loops, no duplicate edges, both endpoints are valid
/// node ids, and `n_edges` equals the sum of all out-degrees.
#[derive(Debug, Default, Clone)]
pub struct EdgeTable {
    out: Vec<HashSet<IdType>>,
    n_edges: usize,
}

impl EdgeTable {
    #[inline]
    pub fn n_nodes(&self) -> usize {
        self.out.len()
    }

    #[inline]
    pub fn n_edges(&self) -> usize {
        self.n_edges
    }

    #[inline]
    fn in_range(&self, id: IdType) -> bool {
        (id as usize) < self.out.len()
    }

    pub(crate) fn push_node(&mut self) {
        self.out.push(HashSet::new());
    }

    pub(crate) fn reset(&mut self) {
        self.out.clear();
        self.n_edges = 0;
    }

    /// Whether the edge `from -> to` exists.
    pub fn contains(&self, from: IdType, to: IdType) -> bool {
        self.out
            .get(from as usize)
            .is_some_and(|set| set.contains(&to))
    }

    /// Out-degree of `id`, 0 for unknown ids.
    #[inline]
    pub fn degree(&self, id: IdType) -> usize {
        self.out.get(id as usize).map_or(0, HashSet::len)
    }

    /// Out-neighbors of `id` in no particular order.
    pub fn neighbors(&self, id: IdType) -> impl Iterator<Item = IdType> + '_ {
        self.out.get(id as usize).into_iter().flatten().copied()
    }

    /// Out-neighbors of `id`, sorted ascending.
    pub fn neighbor_vec(&self, id: IdType) -> Vec<IdType> {
        let mut ids: Vec<IdType> = self.neighbors(id).collect();
        ids.sort_unstable();
        ids
    }

    /// Add `from -> to`. Returns `false`, without mutating, for unknown
    /// endpoints, self-loops and duplicates.
    pub fn add_edge(&mut self, from: IdType, to: IdType) -> bool {
        if !self.in_range(from) || !self.in_range(to) {
            debug!(from, to, "edge refused: endpoint out of range");
            return false;
        }
        if from == to {
            debug!(node = from, "edge refused: self-loop");
            return false;
        }
        if !self.out[from as usize].insert(to) {
            debug!(from, to, "edge refused: already present");
            return false;
        }
        self.n_edges += 1;
        true
    }

    /// Remove `from -> to`. Returns `false` when the edge does not exist.
    pub fn remove_edge(&mut self, from: IdType, to: IdType) -> bool {
        match self.out.get_mut(from as usize).map(|set| set.remove(&to)) {
            Some(true) => {
                self.n_edges -= 1;
                true
            }
            _ => {
                debug!(from, to, "edge removal refused: not present");
                false
            }
        }
    }

    /// Drop every out-edge of `id`. Returns `false` for unknown ids.
    pub fn clear_neighbors(&mut self, id: IdType) -> bool {
        if !self.in_range(id) {
            debug!(node = id, "clear refused: unknown node");
            return false;
        }
        self.take_neighbors(id);
        true
    }

    /// Remove and return the out-edges of `id`.
    pub(crate) fn take_neighbors(&mut self, id: IdType) -> HashSet<IdType> {
        match self.out.get_mut(id as usize) {
            Some(set) => {
                let taken = std::mem::take(set);
                self.n_edges -= taken.len();
                taken
            }
            None => HashSet::new(),
        }
    }

    /// Add `from -> to` for every `to` in `batch`, skipping refused
    /// targets. Returns `false` when `from` is unknown or any target is out
    /// of range or `from` itself; targets already present do not count as
    /// failures.
    pub fn add_batch<I>(&mut self, from: IdType, batch: I) -> bool
    where
        I: IntoIterator<Item = IdType>,
    {
        if !self.in_range(from) {
            debug!(node = from, "batch refused: unknown node");
            return false;
        }
        let mut all_added = true;
        for to in batch {
            if !self.add_edge(from, to) && (to == from || !self.in_range(to)) {
                all_added = false;
            }
        }
        all_added
    }

    /// Drop every edge, keeping the node slots.
    pub fn clear(&mut self) {
        for set in &mut self.out {
            set.clear();
        }
        self.n_edges = 0;
    }
}

/// Read-only view of the node data used by the search and prune kernels.
#[derive(Clone, Copy)]
pub(crate) struct GraphView<'a, T: VectorElement> {
    nodes: &'a [Node<T>],
    dist_fn: &'a dyn DistanceFunction<T>,
}

impl<'a, T: VectorElement> GraphView<'a, T> {
    #[inline]
    pub fn value(&self, id: IdType) -> &'a [T] {
        self.nodes[id as usize].value()
    }

    #[inline]
    pub fn category(&self, id: IdType) -> Option<Category> {
        self.nodes[id as usize].category()
    }

    /// Out-of-range ids count as empty.
    pub fn is_empty_node(&self, id: IdType) -> bool {
        match self.nodes.get(id as usize) {
            Some(node) => self.dist_fn.is_empty_vector(node.value()),
            None => true,
        }
    }

    #[inline]
    pub fn dist(&self, a: IdType, b: IdType) -> f32 {
        self.dist_fn.compute(self.value(a), self.value(b))
    }

    #[inline]
    pub fn dist_to(&self, id: IdType, query: &[T]) -> f32 {
        self.dist_fn.compute(self.value(id), query)
    }
}

/// Lock discipline for the edge table.
///
/// Implemented for `&mut EdgeTable` (exclusive, no locking) and for
/// `&RwLock<EdgeTable>` (shared, lock per call), so one construction kernel
/// serves both the serial and the parallel builders.
pub(crate) trait EdgeAccess {
    fn with_read<R>(&mut self, f: impl FnOnce(&EdgeTable) -> R) -> R;
    fn with_write<R>(&mut self, f: impl FnOnce(&mut EdgeTable) -> R) -> R;
}

impl EdgeAccess for &mut EdgeTable {
    #[inline]
    fn with_read<R>(&mut self, f: impl FnOnce(&EdgeTable) -> R) -> R {
        f(&**self)
    }

    #[inline]
    fn with_write<R>(&mut self, f: impl FnOnce(&mut EdgeTable) -> R) -> R {
        f(&mut **self)
    }
}

impl EdgeAccess for &RwLock<EdgeTable> {
    #[inline]
    fn with_read<R>(&mut self, f: impl FnOnce(&EdgeTable) -> R) -> R {
        f(&self.read())
    }

    #[inline]
    fn with_write<R>(&mut self, f: impl FnOnce(&mut EdgeTable) -> R) -> R {
        f(&mut self.write())
    }
}

/// Degree statistics of a graph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraphStats {
    pub n_nodes: usize,
    pub n_edges: usize,
    pub average_degree: f64,
    pub max_degree: usize,
    pub min_degree: usize,
}

/// A Vamana proximity graph over vectors of `T`.
pub struct VamanaGraph<T: VectorElement> {
    pub(crate) nodes: Vec<Node<T>>,
    pub(crate) categories: HashMap<Category, HashSet<IdType>>,
    pub(crate) edges: RwLock<EdgeTable>,
    /// Cached medoid of the full node set, `INVALID_ID` when stale.
    pub(crate) medoid: AtomicU32,
    pub(crate) filtered_medoids: HashMap<Category, IdType>,
    pub(crate) search_l: usize,
    dim: Option<usize>,
    dist_fn: Box<dyn DistanceFunction<T>>,
    pub(crate) config: GraphConfig,
}

impl<T: VectorElement> VamanaGraph<T> {
    /// Create an empty graph with a caller-supplied distance function.
    pub fn new(dist_fn: Box<dyn DistanceFunction<T>>, config: GraphConfig) -> Self {
        if config.n_threads == 0 {
            warn!("n_threads = 0 requested, using a single thread");
        }
        let search_l = config.search_l;
        Self {
            nodes: Vec::new(),
            categories: HashMap::new(),
            edges: RwLock::new(EdgeTable::default()),
            medoid: AtomicU32::new(INVALID_ID),
            filtered_medoids: HashMap::new(),
            search_l,
            dim: None,
            dist_fn,
            config,
        }
    }

    /// Create an empty graph using one of the built-in metrics.
    pub fn with_metric(metric: Metric, config: GraphConfig) -> Self {
        Self::new(create_distance_function(metric), config)
    }

    /// Reset to the empty graph. The distance function and configuration
    /// are kept.
    pub fn init(&mut self) {
        self.nodes.clear();
        self.categories.clear();
        self.edges.get_mut().reset();
        self.medoid.store(INVALID_ID, Ordering::Release);
        self.filtered_medoids.clear();
        self.search_l = self.config.search_l;
        self.dim = None;
    }

    /// Append a node and return its id.
    ///
    /// All nodes share one dimension, fixed by the first node.
    pub fn create_node(&mut self, value: Vec<T>, category: Option<Category>) -> GraphResult<IdType> {
        if value.is_empty() {
            return Err(GraphError::EmptyInput);
        }
        match self.dim {
            Some(dim) if dim != value.len() => {
                return Err(GraphError::DimensionMismatch {
                    expected: dim,
                    got: value.len(),
                });
            }
            Some(_) => {}
            None => self.dim = Some(value.len()),
        }
        if self.nodes.len() >= INVALID_ID as usize {
            return Err(GraphError::InvalidArgument("node id space exhausted".into()));
        }

        let id = self.nodes.len() as IdType;
        self.nodes.push(Node::new(id, category, value));
        if let Some(c) = category {
            self.categories.entry(c).or_default().insert(id);
        }
        self.edges.get_mut().push_node();
        // The medoid of the old node set no longer applies.
        self.medoid.store(INVALID_ID, Ordering::Release);
        Ok(id)
    }

    #[inline]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn n_edges(&self) -> usize {
        self.edges.read().n_edges()
    }

    /// Vector dimension, `None` before the first node.
    #[inline]
    pub fn dim(&self) -> Option<usize> {
        self.dim
    }

    #[inline]
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    #[inline]
    pub fn dist_fn(&self) -> &dyn DistanceFunction<T> {
        self.dist_fn.as_ref()
    }

    /// Default beam width of [`search`](Self::search). Builders overwrite
    /// it with the beam width they were run with.
    #[inline]
    pub fn search_l(&self) -> usize {
        self.search_l
    }

    pub fn node(&self, id: IdType) -> Option<&Node<T>> {
        self.nodes.get(id as usize)
    }

    pub fn nodes(&self) -> &[Node<T>] {
        &self.nodes
    }

    /// Whether `id` is out of range or its value is empty under the
    /// distance function's emptiness predicate.
    pub fn is_empty_node(&self, id: IdType) -> bool {
        self.view().is_empty_node(id)
    }

    /// Members of category `c`.
    pub fn category_nodes(&self, c: Category) -> Option<&HashSet<IdType>> {
        self.categories.get(&c)
    }

    /// All categories, sorted ascending.
    pub fn categories(&self) -> Vec<Category> {
        let mut cats: Vec<Category> = self.categories.keys().copied().collect();
        cats.sort_unstable();
        cats
    }

    /// Per-category start nodes computed by the last filtered or stitched
    /// build.
    pub fn filtered_medoids(&self) -> &HashMap<Category, IdType> {
        &self.filtered_medoids
    }

    /// Cached medoid, if one is current.
    pub fn cached_medoid(&self) -> Option<IdType> {
        match self.medoid.load(Ordering::Acquire) {
            INVALID_ID => None,
            id => Some(id),
        }
    }

    pub fn add_edge(&self, from: IdType, to: IdType) -> bool {
        self.edges.write().add_edge(from, to)
    }

    pub fn remove_edge(&self, from: IdType, to: IdType) -> bool {
        self.edges.write().remove_edge(from, to)
    }

    pub fn clear_neighbors(&self, id: IdType) -> bool {
        self.edges.write().clear_neighbors(id)
    }

    /// Add an out-edge from `from` to each id of `batch`.
    pub fn add_batch_neighbors(&self, from: IdType, batch: &[IdType]) -> bool {
        if batch.is_empty() {
            warn!(node = from, "empty neighbor batch");
        }
        self.edges.write().add_batch(from, batch.iter().copied())
    }

    /// Drop every edge of the graph. Always succeeds.
    pub fn clear_edges(&self) -> bool {
        self.edges.write().clear();
        true
    }

    /// Shared access to the edge table.
    pub fn edges(&self) -> EdgeReader<'_> {
        self.edges.read()
    }

    /// Exclusive access to the edge table.
    pub fn edges_mut(&self) -> EdgeWriter<'_> {
        self.edges.write()
    }

    /// Sorted snapshot of the out-neighbors of `id`.
    pub fn neighbors(&self, id: IdType) -> Vec<IdType> {
        self.edges.read().neighbor_vec(id)
    }

    pub fn degree(&self, id: IdType) -> usize {
        self.edges.read().degree(id)
    }

    pub fn stats(&self) -> GraphStats {
        let edges = self.edges.read();
        let n_nodes = self.nodes.len();
        let degrees = (0..n_nodes as IdType).map(|id| edges.degree(id));
        let (max_degree, min_degree) = degrees.fold((0, usize::MAX), |(hi, lo), d| {
            (hi.max(d), lo.min(d))
        });
        GraphStats {
            n_nodes,
            n_edges: edges.n_edges(),
            average_degree: if n_nodes == 0 {
                0.0
            } else {
                edges.n_edges() as f64 / n_nodes as f64
            },
            max_degree,
            min_degree: if n_nodes == 0 { 0 } else { min_degree },
        }
    }

    /// Verify the structural invariants of the store.
    pub fn check_invariants(&self) -> GraphResult<()> {
        let edges = self.edges.read();
        let n = self.nodes.len();
        if edges.n_nodes() != n {
            return Err(GraphError::Corruption(format!(
                "edge table has {} slots for {} nodes",
                edges.n_nodes(),
                n
            )));
        }

        let mut total = 0;
        for from in 0..n as IdType {
            for to in edges.neighbors(from) {
                if to == from {
                    return Err(GraphError::Corruption(format!("self-loop on {from}")));
                }
                if to as usize >= n {
                    return Err(GraphError::Corruption(format!(
                        "edge {from} -> {to} leaves the node range"
                    )));
                }
                total += 1;
            }
        }
        if total != edges.n_edges() {
            return Err(GraphError::Corruption(format!(
                "edge count {} does not match {} stored edges",
                edges.n_edges(),
                total
            )));
        }

        for (id, node) in self.nodes.iter().enumerate() {
            if node.id() as usize != id {
                return Err(GraphError::Corruption(format!(
                    "node at slot {id} carries id {}",
                    node.id()
                )));
            }
            if let Some(c) = node.category() {
                if !self.categories.get(&c).is_some_and(|m| m.contains(&node.id())) {
                    return Err(GraphError::Corruption(format!(
                        "node {id} missing from category {c}"
                    )));
                }
            }
        }
        for (c, members) in &self.categories {
            for &id in members {
                if self.node(id).and_then(Node::category) != Some(*c) {
                    return Err(GraphError::Corruption(format!(
                        "category {c} lists node {id} of another category"
                    )));
                }
            }
        }
        Ok(())
    }

    pub(crate) fn view(&self) -> GraphView<'_, T> {
        GraphView {
            nodes: &self.nodes,
            dist_fn: self.dist_fn.as_ref(),
        }
    }

    /// Node view plus unlocked edge table, for single-threaded builders.
    pub(crate) fn split_mut(&mut self) -> (GraphView<'_, T>, &mut EdgeTable) {
        (
            GraphView {
                nodes: &self.nodes,
                dist_fn: self.dist_fn.as_ref(),
            },
            self.edges.get_mut(),
        )
    }

    /// Worker count with `0` treated as `1`.
    #[inline]
    pub(crate) fn n_threads(&self) -> usize {
        self.config.n_threads.max(1)
    }

    /// RNG for one independent stream of randomness.
    ///
    /// With a configured seed, the same stream id always yields the same
    /// sequence, whichever worker draws from it.
    pub(crate) fn rng_for(&self, stream: u64) -> StdRng {
        match self.config.seed {
            Some(seed) => {
                StdRng::seed_from_u64(seed ^ stream.wrapping_mul(0x9E37_79B9_7F4A_7C15))
            }
            None => StdRng::from_entropy(),
        }
    }

    /// All node ids in ascending order.
    pub(crate) fn all_ids(&self) -> Vec<IdType> {
        (0..self.nodes.len() as IdType).collect()
    }
}

impl<T: VectorElement> std::fmt::Debug for VamanaGraph<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VamanaGraph")
            .field("n_nodes", &self.n_nodes())
            .field("n_edges", &self.n_edges())
            .field("dim", &self.dim)
            .field("metric", &self.dist_fn.name())
            .field("medoid", &self.cached_medoid())
            .field("config", &self.config)
            .finish()
    }
}
