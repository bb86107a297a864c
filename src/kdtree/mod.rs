//! Balanced kd-tree index for exact nearest-neighbor search.
//!
//! The tree is built in one pass by recursive median partitioning: every
//! split node cuts its points on the axis with the widest spread, at the
//! median found with an O(n) selection. Leaves hold up to [`LEAF_SIZE`]
//! positions and are scanned linearly.
//!
//! Search descends to the query's side of each split first and only visits
//! the other side when the gap along the split axis could still beat the
//! current k-th best. The gap test uses `<=`, so a far-side point at exactly
//! the current best distance but with a lower position is still found.

mod neighbor_queue;

use crate::distance::squared_euclidean;
use crate::embedding::Embedding;
use crate::error::Result;
use crate::index::{common_dimension, NearestNeighborIndex, Neighbor};

use neighbor_queue::{BoundedMaxHeap, Candidate};

/// Maximum number of positions stored in a leaf.
pub const LEAF_SIZE: usize = 16;

#[derive(Debug, Clone, Copy)]
enum Node {
    /// Range into `KdTree::order`.
    Leaf { start: usize, end: usize },
    /// Points in `left` have `coord <= value` on `axis`, points in `right` have `coord >= value`.
    Split {
        axis: usize,
        value: f32,
        left: usize,
        right: usize,
    },
}

/// A kd-tree over a fixed set of embeddings.
#[derive(Debug, Clone)]
pub struct KdTree {
    /// Row-major copy of the embeddings, `len * dimension` values.
    points: Vec<f32>,
    dimension: usize,
    len: usize,
    /// Positions permuted so that every leaf covers a contiguous range.
    order: Vec<usize>,
    nodes: Vec<Node>,
    root: usize,
}

impl KdTree {
    fn point(&self, position: usize) -> &[f32] {
        let start = position * self.dimension;
        &self.points[start..start + self.dimension]
    }

    /// Number of levels from the root to the deepest leaf (a single leaf has depth 1).
    pub fn depth(&self) -> usize {
        let mut stack = vec![(self.root, 1usize)];
        let mut deepest = 0;
        while let Some((node, level)) = stack.pop() {
            match self.nodes[node] {
                Node::Leaf { .. } => deepest = deepest.max(level),
                Node::Split { left, right, .. } => {
                    stack.push((left, level + 1));
                    stack.push((right, level + 1));
                }
            }
        }
        deepest
    }

    fn search(&self, node: usize, query: &[f32], best: &mut BoundedMaxHeap) {
        match self.nodes[node] {
            Node::Leaf { start, end } => {
                for &position in &self.order[start..end] {
                    let dist_sq = squared_euclidean(query, self.point(position));
                    best.push(Candidate::new(position, dist_sq));
                }
            }
            Node::Split {
                axis,
                value,
                left,
                right,
            } => {
                let gap = query[axis] - value;
                let (near, far) = if gap < 0.0 {
                    (left, right)
                } else {
                    (right, left)
                };
                self.search(near, query, best);
                if gap * gap <= best.bound() {
                    self.search(far, query, best);
                }
            }
        }
    }
}

struct Builder<'a> {
    points: &'a [f32],
    dimension: usize,
    nodes: Vec<Node>,
}

impl Builder<'_> {
    fn coord(&self, position: usize, axis: usize) -> f32 {
        self.points[position * self.dimension + axis]
    }

    /// The axis with the largest max-min spread over `positions`.
    fn widest_axis(&self, positions: &[usize]) -> (usize, f32) {
        let mut lo = vec![f32::INFINITY; self.dimension];
        let mut hi = vec![f32::NEG_INFINITY; self.dimension];
        for &position in positions {
            for axis in 0..self.dimension {
                let c = self.coord(position, axis);
                lo[axis] = lo[axis].min(c);
                hi[axis] = hi[axis].max(c);
            }
        }
        (0..self.dimension)
            .map(|axis| (axis, hi[axis] - lo[axis]))
            .fold((0, 0.0), |acc, cur| if cur.1 > acc.1 { cur } else { acc })
    }

    fn push(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Build the subtree over `positions`, which sits at `offset` in the full order.
    fn build(&mut self, positions: &mut [usize], offset: usize) -> usize {
        let len = positions.len();
        if len <= LEAF_SIZE {
            return self.push(Node::Leaf {
                start: offset,
                end: offset + len,
            });
        }

        let (axis, spread) = self.widest_axis(positions);
        // All points identical: nothing left to split on.
        if spread <= 0.0 {
            return self.push(Node::Leaf {
                start: offset,
                end: offset + len,
            });
        }

        let mid = len / 2;
        positions.select_nth_unstable_by(mid, |&a, &b| {
            self.coord(a, axis)
                .total_cmp(&self.coord(b, axis))
                .then_with(|| a.cmp(&b))
        });
        let value = self.coord(positions[mid], axis);

        let (lower, upper) = positions.split_at_mut(mid);
        let left = self.build(lower, offset);
        let right = self.build(upper, offset + mid);
        self.push(Node::Split {
            axis,
            value,
            left,
            right,
        })
    }
}

impl NearestNeighborIndex for KdTree {
    fn build(embeddings: &[Embedding]) -> Result<Self> {
        let dimension = common_dimension(embeddings)?;
        let len = embeddings.len();
        let points: Vec<f32> = embeddings
            .iter()
            .flat_map(|e| e.as_slice().iter().copied())
            .collect();

        let mut order: Vec<usize> = (0..len).collect();
        let mut builder = Builder {
            points: &points,
            dimension,
            nodes: Vec::with_capacity(2 * len / LEAF_SIZE + 1),
        };
        let root = builder.build(&mut order, 0);
        let nodes = builder.nodes;

        Ok(Self {
            points,
            dimension,
            len,
            order,
            nodes,
            root,
        })
    }

    fn nearest(&self, query: &Embedding) -> Result<Neighbor> {
        let mut hits = self.nearest_k(query, 1)?;
        hits.pop().ok_or(crate::error::MatchError::EmptyIndex)
    }

    fn nearest_k(&self, query: &Embedding, k: usize) -> Result<Vec<Neighbor>> {
        query.check_dimension(self.dimension)?;
        if k == 0 {
            return Ok(Vec::new());
        }
        let mut best = BoundedMaxHeap::new(k);
        self.search(self.root, query.as_slice(), &mut best);
        Ok(best
            .into_sorted_vec()
            .into_iter()
            .map(Candidate::into_neighbor)
            .collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        self.len
    }
}
