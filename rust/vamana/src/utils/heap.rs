//! Priority queues for the queue-based greedy search.
//!
//! - `MaxHeap`: bounded candidate list, worst candidate on top
//! - `MinHeap`: exploration frontier, closest candidate on top

use crate::types::IdType;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// A node id with its distance to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeapEntry {
    pub id: IdType,
    pub distance: f32,
}

impl HeapEntry {
    #[inline]
    pub fn new(id: IdType, distance: f32) -> Self {
        Self { id, distance }
    }
}

/// Total order on entries: distance, then id.
#[derive(Debug, Clone, Copy)]
struct Ranked(HeapEntry);

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .distance
            .partial_cmp(&other.0.distance)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.0.id.cmp(&other.0.id))
    }
}

/// Outcome of offering an entry to a bounded [`MaxHeap`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Admission {
    /// Heap was below capacity; the entry was pushed.
    Inserted,
    /// Heap was full and the entry replaced the returned worst entry.
    Displaced(HeapEntry),
    /// Heap was full and the entry was not strictly closer than the worst.
    Rejected,
}

/// Keeps the `capacity` closest entries offered to it.
#[derive(Debug)]
pub struct MaxHeap {
    heap: BinaryHeap<Ranked>,
    capacity: usize,
}

impl MaxHeap {
    pub fn new(capacity: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(capacity + 1),
            capacity,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.heap.len() >= self.capacity
    }

    /// Offer an entry. At capacity it replaces the current worst entry
    /// only when strictly closer.
    #[inline]
    pub fn admit(&mut self, id: IdType, distance: f32) -> Admission {
        if self.heap.len() < self.capacity {
            self.heap.push(Ranked(HeapEntry::new(id, distance)));
            return Admission::Inserted;
        }
        match self.heap.peek_mut() {
            Some(mut top) if distance < top.0.distance => {
                let displaced = top.0;
                *top = Ranked(HeapEntry::new(id, distance));
                Admission::Displaced(displaced)
            }
            _ => Admission::Rejected,
        }
    }

    /// Entries, closest first.
    pub fn into_sorted_vec(self) -> Vec<HeapEntry> {
        self.heap.into_sorted_vec().into_iter().map(|e| e.0).collect()
    }
}

/// Pops entries in order of increasing distance.
#[derive(Debug, Default)]
pub struct MinHeap {
    heap: BinaryHeap<Reverse<Ranked>>,
}

impl MinHeap {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    #[inline]
    pub fn push(&mut self, id: IdType, distance: f32) {
        self.heap.push(Reverse(Ranked(HeapEntry::new(id, distance))));
    }

    #[inline]
    pub fn pop(&mut self) -> Option<HeapEntry> {
        self.heap.pop().map(|Reverse(e)| e.0)
    }
}
