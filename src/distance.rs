//! Euclidean distance between embeddings
//!
//! Indexes compare candidates on squared distance and take the square root
//! only when reporting, so every index orders ties identically.

use crate::embedding::Embedding;
use crate::error::{MatchError, Result};

/// Compute the Euclidean (L2) distance between two embeddings
pub fn euclidean(e1: &Embedding, e2: &Embedding) -> Result<f32> {
    if !e1.has_same_dimension(e2) {
        return Err(MatchError::DimensionMismatch {
            expected: e1.dimension(),
            actual: e2.dimension(),
        });
    }
    Ok(squared_euclidean(e1.as_slice(), e2.as_slice()).sqrt())
}

/// Squared L2 distance over two equal-length slices.
///
/// Callers are responsible for checking dimensions first.
pub fn squared_euclidean(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn emb(data: Vec<f32>) -> Embedding {
        Embedding::new(data).unwrap()
    }

    #[test]
    fn test_euclidean_distance() {
        let dist = euclidean(&emb(vec![1.0, 2.0, 3.0]), &emb(vec![4.0, 5.0, 6.0])).unwrap();
        assert_relative_eq!(dist, 5.196152, epsilon = 1e-5);
    }

    #[test]
    fn test_euclidean_same_embedding() {
        let e = emb(vec![1.0, 2.0, 3.0]);
        assert_eq!(euclidean(&e, &e).unwrap(), 0.0);
    }

    #[test]
    fn test_squared_euclidean() {
        assert_eq!(squared_euclidean(&[0.0, 0.0], &[3.0, 4.0]), 25.0);
    }

    #[test]
    fn test_dimension_mismatch() {
        assert!(matches!(
            euclidean(&emb(vec![1.0, 2.0]), &emb(vec![1.0, 2.0, 3.0])),
            Err(MatchError::DimensionMismatch { .. })
        ));
    }
}
