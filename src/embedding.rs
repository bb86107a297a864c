//! Embedding type: an immutable face feature vector

use crate::error::{MatchError, Result};
use serde::{Deserialize, Serialize};

/// A face embedding in n-dimensional space.
///
/// Embeddings are validated on construction (non-empty, every component
/// finite) and cannot be mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f32>", into = "Vec<f32>")]
pub struct Embedding {
    data: Vec<f32>,
}

impl Embedding {
    /// Create a new embedding from a Vec<f32>
    pub fn new(data: Vec<f32>) -> Result<Self> {
        if data.is_empty() {
            return Err(MatchError::InvalidEmbedding {
                reason: "Embedding has no components".to_string(),
            });
        }
        if let Some(pos) = data.iter().position(|x| !x.is_finite()) {
            return Err(MatchError::InvalidEmbedding {
                reason: format!("Component {} is not finite", pos),
            });
        }
        Ok(Self { data })
    }

    /// Get the dimension of the embedding
    pub fn dimension(&self) -> usize {
        self.data.len()
    }

    /// Get the underlying data as a slice
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Check if this embedding has the same dimension as another
    pub fn has_same_dimension(&self, other: &Embedding) -> bool {
        self.dimension() == other.dimension()
    }

    /// Fail with `DimensionMismatch` unless this embedding has `expected` components.
    pub fn check_dimension(&self, expected: usize) -> Result<()> {
        if self.dimension() != expected {
            return Err(MatchError::DimensionMismatch {
                expected,
                actual: self.dimension(),
            });
        }
        Ok(())
    }

    /// Parse an embedding from a comma-separated string
    pub fn from_str(s: &str) -> Result<Self> {
        let data: Result<Vec<f32>> = s
            .split(',')
            .map(|x| {
                x.trim()
                    .parse::<f32>()
                    .map_err(|_| MatchError::InvalidEmbedding {
                        reason: format!("Invalid float: {}", x),
                    })
            })
            .collect();
        Embedding::new(data?)
    }
}

impl TryFrom<Vec<f32>> for Embedding {
    type Error = MatchError;

    fn try_from(data: Vec<f32>) -> Result<Self> {
        Embedding::new(data)
    }
}

impl From<Embedding> for Vec<f32> {
    fn from(embedding: Embedding) -> Vec<f32> {
        embedding.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_creation() {
        let e = Embedding::new(vec![1.0, 2.0, 3.0]).unwrap();
        assert_eq!(e.dimension(), 3);
        assert_eq!(e.as_slice(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_empty_rejected() {
        assert!(matches!(
            Embedding::new(vec![]),
            Err(MatchError::InvalidEmbedding { .. })
        ));
    }

    #[test]
    fn test_non_finite_rejected() {
        assert!(Embedding::new(vec![1.0, f32::NAN]).is_err());
        assert!(Embedding::new(vec![f32::INFINITY]).is_err());
    }

    #[test]
    fn test_from_str() {
        let e = Embedding::from_str("1.0, 2.0, 3.0").unwrap();
        assert_eq!(e.dimension(), 3);
        assert_eq!(e.as_slice(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_from_str_invalid() {
        assert!(Embedding::from_str("1.0, abc").is_err());
        assert!(Embedding::from_str("1.0, NaN").is_err());
    }

    #[test]
    fn test_check_dimension() {
        let e = Embedding::new(vec![1.0, 2.0]).unwrap();
        assert!(e.check_dimension(2).is_ok());
        assert!(matches!(
            e.check_dimension(3),
            Err(MatchError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: Embedding = serde_json::from_str("[0.5, 1.5]").unwrap();
        assert_eq!(ok.dimension(), 2);
        assert!(serde_json::from_str::<Embedding>("[]").is_err());
    }
}
