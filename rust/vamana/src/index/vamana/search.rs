//! Greedy search.
//!
//! Starting from one or more seeds, repeatedly expand the closest candidate
//! not yet visited, keeping at most `l` candidates. Two interchangeable
//! candidate-list implementations are provided, see [`SearchStrategy`].

use super::graph::{EdgeTable, GraphView, VamanaGraph};
use super::node::Query;
use super::SearchStrategy;
use crate::index::traits::{GraphError, GraphResult};
use crate::types::{Category, IdType, VectorElement};
use crate::utils::sampling::{closest_n_scored, cmp_scored};
use crate::utils::{Admission, MaxHeap, MinHeap};
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// Result of a greedy search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchOutcome {
    /// Up to `k` `(id, distance)` pairs, closest first.
    pub closest: Vec<(IdType, f32)>,
    /// Every expanded node, in expansion order.
    pub visited: Vec<IdType>,
}

impl SearchOutcome {
    /// Ids of `closest`, closest first.
    pub fn ids(&self) -> Vec<IdType> {
        self.closest.iter().map(|&(id, _)| id).collect()
    }
}

#[inline]
fn admits<T: VectorElement>(view: &GraphView<'_, T>, id: IdType, filter: Option<Category>) -> bool {
    match filter {
        Some(c) => view.category(id) == Some(c),
        None => true,
    }
}

/// Search kernel shared by the public searches and the builders.
///
/// Arguments are assumed valid, `l >= 1` included. With a `filter`, seeds
/// and expansions are restricted to nodes of that category.
#[allow(clippy::too_many_arguments)]
pub(crate) fn search_in<T: VectorElement>(
    view: &GraphView<'_, T>,
    edges: &EdgeTable,
    starts: &[IdType],
    query: &[T],
    k: usize,
    l: usize,
    strategy: SearchStrategy,
    filter: Option<Category>,
) -> SearchOutcome {
    let (mut list, visited) = match strategy {
        SearchStrategy::HashSet => set_search(view, edges, starts, query, l, filter),
        SearchStrategy::PriorityQueue => queue_search(view, edges, starts, query, l, filter),
    };
    list.sort_unstable_by(cmp_scored);
    list.truncate(k);
    SearchOutcome {
        closest: list,
        visited,
    }
}

/// Candidate list as a hash map from id to distance; the next node to
/// expand is found by a linear scan.
fn set_search<T: VectorElement>(
    view: &GraphView<'_, T>,
    edges: &EdgeTable,
    starts: &[IdType],
    query: &[T],
    l: usize,
    filter: Option<Category>,
) -> (Vec<(IdType, f32)>, Vec<IdType>) {
    let mut list: HashMap<IdType, f32> = HashMap::with_capacity(2 * l);
    for &s in starts {
        if admits(view, s, filter) {
            list.entry(s).or_insert_with(|| view.dist_to(s, query));
        }
    }

    let mut visited = HashSet::new();
    let mut order = Vec::new();
    loop {
        let next = list
            .iter()
            .filter(|(id, _)| !visited.contains(*id))
            .map(|(&id, &d)| (id, d))
            .min_by(cmp_scored);
        let Some((p, _)) = next else {
            break;
        };
        visited.insert(p);
        order.push(p);

        for n in edges.neighbors(p) {
            if admits(view, n, filter) {
                list.entry(n).or_insert_with(|| view.dist_to(n, query));
            }
        }
        if list.len() > l {
            list = closest_n_scored(l, list.into_iter().collect())
                .into_iter()
                .collect();
        }
    }
    (list.into_iter().collect(), order)
}

/// Offer `id` to the bounded list, queueing it for expansion when admitted.
fn offer(
    id: IdType,
    distance: f32,
    list: &mut MaxHeap,
    members: &mut HashSet<IdType>,
    frontier: &mut MinHeap,
    visited: &HashSet<IdType>,
) {
    match list.admit(id, distance) {
        Admission::Inserted => {}
        Admission::Displaced(old) => {
            members.remove(&old.id);
        }
        Admission::Rejected => return,
    }
    members.insert(id);
    if !visited.contains(&id) {
        frontier.push(id, distance);
    }
}

/// Candidate list as a bounded max-heap; unvisited members wait in a
/// min-heap frontier. Frontier entries whose node was displaced from the
/// list or already expanded are skipped when popped.
fn queue_search<T: VectorElement>(
    view: &GraphView<'_, T>,
    edges: &EdgeTable,
    starts: &[IdType],
    query: &[T],
    l: usize,
    filter: Option<Category>,
) -> (Vec<(IdType, f32)>, Vec<IdType>) {
    let mut list = MaxHeap::new(l);
    let mut members: HashSet<IdType> = HashSet::with_capacity(2 * l);
    let mut frontier = MinHeap::with_capacity(2 * l);
    let mut visited = HashSet::new();
    let mut order = Vec::new();

    for &s in starts {
        if admits(view, s, filter) && !members.contains(&s) {
            let d = view.dist_to(s, query);
            offer(s, d, &mut list, &mut members, &mut frontier, &visited);
        }
    }

    while let Some(entry) = frontier.pop() {
        let p = entry.id;
        if visited.contains(&p) || !members.contains(&p) {
            continue;
        }
        visited.insert(p);
        order.push(p);

        for n in edges.neighbors(p) {
            if !admits(view, n, filter) || members.contains(&n) {
                continue;
            }
            let d = view.dist_to(n, query);
            offer(n, d, &mut list, &mut members, &mut frontier, &visited);
        }
    }

    let list = list
        .into_sorted_vec()
        .into_iter()
        .map(|e| (e.id, e.distance))
        .collect();
    (list, order)
}

impl<T: VectorElement> VamanaGraph<T> {
    fn check_query(&self, query: &[T], k: usize, l: usize) -> GraphResult<()> {
        if self.dist_fn().is_empty_vector(query) {
            return Err(GraphError::EmptyQuery);
        }
        if let Some(dim) = self.dim() {
            if query.len() != dim {
                return Err(GraphError::DimensionMismatch {
                    expected: dim,
                    got: query.len(),
                });
            }
        }
        if l == 0 || l < k {
            return Err(GraphError::InvalidL { l, k });
        }
        Ok(())
    }

    fn check_start(&self, start: IdType) -> GraphResult<()> {
        if self.is_empty_node(start) {
            return Err(GraphError::InvalidStart(start));
        }
        Ok(())
    }

    /// Greedy search from `start` using the configured strategy.
    ///
    /// Holds the edge read lock for the whole call. `k = 0` is allowed and
    /// yields only the visited list, which is what the builders use.
    pub fn greedy_search(
        &self,
        start: IdType,
        query: &[T],
        k: usize,
        l: usize,
    ) -> GraphResult<SearchOutcome> {
        self.greedy_search_with(self.config.search_strategy, start, query, k, l)
    }

    /// Greedy search with an explicit candidate-list strategy.
    pub fn greedy_search_with(
        &self,
        strategy: SearchStrategy,
        start: IdType,
        query: &[T],
        k: usize,
        l: usize,
    ) -> GraphResult<SearchOutcome> {
        self.check_start(start)?;
        self.check_query(query, k, l)?;
        let edges = self.edges.read();
        Ok(search_in(&self.view(), &edges, &[start], query, k, l, strategy, None))
    }

    /// Greedy search restricted to the query's category.
    ///
    /// Only seeds of that category are used; if none match the result is
    /// empty. A filtered query without a category is an `EmptyQuery`. An
    /// unfiltered query falls back to plain greedy search from the
    /// global medoid and ignores `starts`.
    pub fn filtered_greedy_search(
        &self,
        starts: &[IdType],
        query: &Query<T>,
        k: usize,
        l: usize,
    ) -> GraphResult<SearchOutcome> {
        if query.filtered && query.is_empty() {
            return Err(GraphError::EmptyQuery);
        }
        self.check_query(&query.value, k, l)?;
        for &s in starts {
            self.check_start(s)?;
        }

        let Some(c) = query.filter_category() else {
            let medoid = self.medoid()?;
            return self.greedy_search(medoid, &query.value, k, l);
        };

        let view = self.view();
        let seeds: Vec<IdType> = starts
            .iter()
            .copied()
            .filter(|&s| view.category(s) == Some(c))
            .collect();
        if seeds.is_empty() {
            warn!(category = c, "no start node matches the query category");
            return Ok(SearchOutcome::default());
        }

        let edges = self.edges.read();
        Ok(search_in(
            &view,
            &edges,
            &seeds,
            &query.value,
            k,
            l,
            self.config.search_strategy,
            Some(c),
        ))
    }

    /// `k` nearest neighbors of `query`, searching from the medoid.
    ///
    /// `l` defaults to [`search_l`](Self::search_l) and is raised to `k`
    /// when smaller.
    pub fn search(&self, query: &[T], k: usize, l: Option<usize>) -> GraphResult<Vec<(IdType, f32)>> {
        let l = l.unwrap_or(self.search_l).max(k);
        let medoid = self.medoid()?;
        Ok(self.greedy_search(medoid, query, k, l)?.closest)
    }

    /// `k` nearest neighbors of `query` within its category, searching from
    /// the category's start node.
    ///
    /// Unknown categories yield an empty result.
    pub fn filtered_search(
        &self,
        query: &Query<T>,
        k: usize,
        l: Option<usize>,
    ) -> GraphResult<Vec<(IdType, f32)>> {
        let l = l.unwrap_or(self.search_l).max(k);
        let Some(c) = query.filter_category() else {
            return self.search(&query.value, k, Some(l));
        };
        let start = match self.filtered_medoids.get(&c) {
            Some(&id) => id,
            None => match self.category_nodes(c) {
                Some(members) => {
                    let mut ids: Vec<IdType> = members.iter().copied().collect();
                    ids.sort_unstable();
                    self.medoid_of(&ids, false)?
                }
                None => return Ok(Vec::new()),
            },
        };
        Ok(self.filtered_greedy_search(&[start], query, k, l)?.closest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::Metric;
    use crate::index::vamana::GraphConfig;

    /// Ten points on a line, each linked to its neighbors on both sides.
    fn chain(strategy: SearchStrategy) -> VamanaGraph<f32> {
        let config = GraphConfig::new().with_strategy(strategy);
        let mut graph = VamanaGraph::with_metric(Metric::L2, config);
        for i in 0..10 {
            graph.create_node(vec![i as f32], Some(i % 2)).unwrap();
        }
        for i in 0..9 {
            graph.add_edge(i, i + 1);
            graph.add_edge(i + 1, i);
        }
        graph
    }

    #[test]
    fn test_greedy_search_walks_chain() {
        for strategy in [SearchStrategy::HashSet, SearchStrategy::PriorityQueue] {
            let graph = chain(strategy);
            let outcome = graph.greedy_search(0, &[8.2], 3, 4).unwrap();
            assert_eq!(outcome.ids(), vec![8, 9, 7], "{strategy:?}");
            assert_eq!(outcome.visited[0], 0);
            assert!(outcome.visited.contains(&8));
        }
    }

    #[test]
    fn test_greedy_search_validation() {
        let graph = chain(SearchStrategy::HashSet);
        assert_eq!(
            graph.greedy_search(42, &[1.0], 1, 2),
            Err(GraphError::InvalidStart(42))
        );
        assert_eq!(graph.greedy_search(0, &[], 1, 2), Err(GraphError::EmptyQuery));
        assert_eq!(
            graph.greedy_search(0, &[1.0], 5, 2),
            Err(GraphError::InvalidL { l: 2, k: 5 })
        );
        assert_eq!(
            graph.greedy_search(0, &[1.0], 0, 0),
            Err(GraphError::InvalidL { l: 0, k: 0 })
        );
        assert_eq!(
            graph.search(&[1.0], 0, Some(0)),
            Err(GraphError::InvalidL { l: 0, k: 0 })
        );
        assert!(matches!(
            graph.greedy_search(0, &[1.0, 2.0], 1, 2),
            Err(GraphError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_greedy_search_k_zero_still_visits() {
        let graph = chain(SearchStrategy::PriorityQueue);
        let outcome = graph.greedy_search(0, &[5.0], 0, 3).unwrap();
        assert!(outcome.closest.is_empty());
        assert!(outcome.visited.contains(&5));
    }

    #[test]
    fn test_result_count_bounded_by_reachable() {
        let mut graph = VamanaGraph::with_metric(Metric::L2, GraphConfig::default());
        for i in 0..3 {
            graph.create_node(vec![i as f32], None).unwrap();
        }
        graph.add_edge(0, 1);
        let outcome = graph.greedy_search(0, &[0.0], 5, 10).unwrap();
        assert_eq!(outcome.ids(), vec![0, 1]);
        assert_eq!(outcome.visited, vec![0, 1]);
    }

    #[test]
    fn test_filtered_search_stays_in_category() {
        let graph = chain(SearchStrategy::HashSet);
        // Give every odd node a shortcut to the next odd node.
        for i in (1..8).step_by(2) {
            graph.add_edge(i, i + 2);
        }
        let query = Query::filtered(0, vec![8.0], 1);
        let outcome = graph.filtered_greedy_search(&[0, 1], &query, 2, 4).unwrap();
        assert_eq!(outcome.ids(), vec![7, 9]);
        for id in outcome.visited.iter().chain(outcome.ids().iter()) {
            assert_eq!(id % 2, 1);
        }
    }

    #[test]
    fn test_filtered_search_without_matching_seed() {
        let graph = chain(SearchStrategy::HashSet);
        let query = Query::filtered(0, vec![3.0], 1);
        let outcome = graph.filtered_greedy_search(&[0, 2], &query, 1, 2).unwrap();
        assert_eq!(outcome, SearchOutcome::default());
    }

    #[test]
    fn test_filtered_query_needs_category() {
        let graph = chain(SearchStrategy::HashSet);
        let mut query = Query::filtered(0, vec![3.0], 1);
        query.category = None;
        assert_eq!(
            graph.filtered_greedy_search(&[1], &query, 1, 2),
            Err(GraphError::EmptyQuery)
        );

        // Unfiltered queries need no category.
        let plain = Query::new(0, vec![3.0]);
        assert_eq!(graph.filtered_greedy_search(&[], &plain, 1, 2).unwrap().ids(), vec![3]);
    }

    #[test]
    fn test_filtered_search_unknown_category() {
        let graph = chain(SearchStrategy::HashSet);
        let query = Query::filtered(0, vec![3.0], 99);
        assert!(graph.filtered_search(&query, 1, None).unwrap().is_empty());
    }

    #[test]
    fn test_search_from_medoid() {
        let graph = chain(SearchStrategy::HashSet);
        let results = graph.search(&[3.1], 2, Some(5)).unwrap();
        assert_eq!(results[0].0, 3);
        assert_eq!(results.len(), 2);
    }
}
