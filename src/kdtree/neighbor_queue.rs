//! Bounded result set for kd-tree k-NN search, with a total order over f32 distances.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::index::Neighbor;

/// A candidate found during search, keyed by squared distance.
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    pub dist_sq: f32,
    pub position: usize,
}

impl Candidate {
    pub fn new(position: usize, dist_sq: f32) -> Self {
        Self { dist_sq, position }
    }

    pub fn into_neighbor(self) -> Neighbor {
        Neighbor {
            position: self.position,
            distance: self.dist_sq.sqrt(),
        }
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Larger distance is "greater"; among equal distances the higher position is
// greater, so it is the first to be evicted.
impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dist_sq
            .total_cmp(&other.dist_sq)
            .then_with(|| self.position.cmp(&other.position))
    }
}

/// Max-heap holding the `limit` best candidates seen so far (worst on top).
pub struct BoundedMaxHeap {
    heap: BinaryHeap<Candidate>,
    limit: usize,
}

impl BoundedMaxHeap {
    pub fn new(limit: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(limit + 1),
            limit,
        }
    }

    /// Push and pop the max if size exceeds the limit, keeping only the best `limit`.
    pub fn push(&mut self, c: Candidate) {
        if self.limit == 0 {
            return;
        }
        if self.is_full() {
            match self.heap.peek() {
                Some(worst) if c < *worst => {}
                _ => return,
            }
        }
        self.heap.push(c);
        if self.heap.len() > self.limit {
            self.heap.pop();
        }
    }

    /// Squared distance a region must be within to possibly improve the set.
    ///
    /// Infinite until the set is full.
    pub fn bound(&self) -> f32 {
        if self.is_full() {
            self.heap.peek().map(|c| c.dist_sq).unwrap_or(f32::INFINITY)
        } else {
            f32::INFINITY
        }
    }

    pub fn is_full(&self) -> bool {
        self.heap.len() >= self.limit
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Drain into a sorted Vec (ascending by distance, then position).
    pub fn into_sorted_vec(self) -> Vec<Candidate> {
        self.heap.into_sorted_vec()
    }
}
