//! Brute-force flat index: O(n) nearest-neighbor search

use std::cmp::Ordering;

use rayon::prelude::*;

use crate::distance::squared_euclidean;
use crate::embedding::Embedding;
use crate::error::Result;
use crate::index::{common_dimension, NearestNeighborIndex, Neighbor};

/// A flat (brute-force) index that computes distance to every stored embedding.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    embeddings: Vec<Embedding>,
    dimension: usize,
}

impl FlatIndex {
    /// Get an embedding by position.
    pub fn get(&self, position: usize) -> Option<&Embedding> {
        self.embeddings.get(position)
    }

    fn scored(&self, query: &Embedding) -> impl ParallelIterator<Item = (f32, usize)> + '_ {
        let q = query.as_slice().to_vec();
        self.embeddings
            .par_iter()
            .enumerate()
            .map(move |(pos, e)| (squared_euclidean(&q, e.as_slice()), pos))
    }
}

fn by_distance_then_position(a: &(f32, usize), b: &(f32, usize)) -> Ordering {
    a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1))
}

impl NearestNeighborIndex for FlatIndex {
    fn build(embeddings: &[Embedding]) -> Result<Self> {
        let dimension = common_dimension(embeddings)?;
        Ok(Self {
            embeddings: embeddings.to_vec(),
            dimension,
        })
    }

    fn nearest(&self, query: &Embedding) -> Result<Neighbor> {
        query.check_dimension(self.dimension)?;
        // (distance, position) is a total order, so the parallel reduction is deterministic.
        let (dist_sq, position) = self
            .scored(query)
            .min_by(by_distance_then_position)
            .ok_or(crate::error::MatchError::EmptyIndex)?;
        Ok(Neighbor {
            position,
            distance: dist_sq.sqrt(),
        })
    }

    fn nearest_k(&self, query: &Embedding, k: usize) -> Result<Vec<Neighbor>> {
        query.check_dimension(self.dimension)?;
        let mut results: Vec<(f32, usize)> = self.scored(query).collect();
        results.sort_by(by_distance_then_position);
        results.truncate(k);
        Ok(results
            .into_iter()
            .map(|(dist_sq, position)| Neighbor {
                position,
                distance: dist_sq.sqrt(),
            })
            .collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        self.embeddings.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MatchError;

    fn emb(data: Vec<f32>) -> Embedding {
        Embedding::new(data).unwrap()
    }

    #[test]
    fn test_flat_index_basic() {
        let index = FlatIndex::build(&[
            emb(vec![1.0, 0.0, 0.0]),
            emb(vec![0.0, 1.0, 0.0]),
            emb(vec![1.0, 1.0, 0.0]),
        ])
        .unwrap();

        let results = index.nearest_k(&emb(vec![1.0, 0.0, 0.0]), 2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].position, 0); // exact match
        assert!(results[0].distance < 1e-6);
        assert_eq!(results[1].position, 2);
    }

    #[test]
    fn test_flat_index_ties_prefer_lowest_position() {
        let index = FlatIndex::build(&[
            emb(vec![2.0, 0.0]),
            emb(vec![0.0, 1.0]),
            emb(vec![0.0, -1.0]),
            emb(vec![0.0, 1.0]),
        ])
        .unwrap();

        let hit = index.nearest(&emb(vec![0.0, 0.0])).unwrap();
        assert_eq!(hit.position, 1);
        assert_eq!(hit.distance, 1.0);
    }

    #[test]
    fn test_flat_index_get() {
        let v = emb(vec![1.0, 2.0, 3.0]);
        let index = FlatIndex::build(&[v.clone()]).unwrap();

        assert_eq!(index.get(0), Some(&v));
        assert_eq!(index.get(99), None);
    }

    #[test]
    fn test_flat_index_errors() {
        assert!(matches!(FlatIndex::build(&[]), Err(MatchError::EmptyIndex)));

        let index = FlatIndex::build(&[emb(vec![1.0, 0.0])]).unwrap();
        assert!(matches!(
            index.nearest(&emb(vec![1.0, 0.0, 0.0])),
            Err(MatchError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_flat_index_k_larger_than_len() {
        let index = FlatIndex::build(&[emb(vec![1.0]), emb(vec![2.0])]).unwrap();
        assert_eq!(index.nearest_k(&emb(vec![0.0]), 10).unwrap().len(), 2);
        assert!(index.nearest_k(&emb(vec![0.0]), 0).unwrap().is_empty());
    }
}
