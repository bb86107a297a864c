//! The ordered set of enrolled (embedding, label) pairs

use crate::embedding::Embedding;
use crate::error::{MatchError, Result};

/// Enrolled faces: `embeddings[i]` belongs to `labels[i]`.
///
/// The two sequences only grow together through [`KnownSet::with_appended`],
/// and [`KnownSet::from_parts`] checks the pairing and dimensionality of
/// anything read back from storage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KnownSet {
    embeddings: Vec<Embedding>,
    labels: Vec<String>,
}

/// Trim a label and reject it if nothing is left.
pub fn normalize_label(label: &str) -> Result<String> {
    let trimmed = label.trim();
    if trimmed.is_empty() {
        return Err(MatchError::InvalidLabel {
            reason: "Label must not be empty".to_string(),
        });
    }
    Ok(trimmed.to_string())
}

impl KnownSet {
    /// An empty set with no dimension yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assemble a set from parallel sequences, validating the pairing.
    pub fn from_parts(embeddings: Vec<Embedding>, labels: Vec<String>) -> Result<Self> {
        if embeddings.len() != labels.len() {
            return Err(MatchError::CorruptStore(format!(
                "{} embeddings but {} labels",
                embeddings.len(),
                labels.len()
            )));
        }
        if let Some(first) = embeddings.first() {
            let dimension = first.dimension();
            for e in &embeddings {
                e.check_dimension(dimension)?;
            }
        }
        for label in &labels {
            if label.trim().is_empty() || label.trim() != label {
                return Err(MatchError::InvalidLabel {
                    reason: format!("Stored label {:?} is not normalized", label),
                });
            }
        }
        Ok(Self { embeddings, labels })
    }

    /// Return a copy of this set with one more pair at the end.
    pub fn with_appended(&self, embedding: Embedding, label: &str) -> Result<Self> {
        let label = normalize_label(label)?;
        if let Some(dimension) = self.dimension() {
            embedding.check_dimension(dimension)?;
        }
        let mut next = self.clone();
        next.embeddings.push(embedding);
        next.labels.push(label);
        Ok(next)
    }

    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }

    /// Dimensionality of the enrolled embeddings, if any are enrolled.
    pub fn dimension(&self) -> Option<usize> {
        self.embeddings.first().map(Embedding::dimension)
    }

    pub fn embeddings(&self) -> &[Embedding] {
        &self.embeddings
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn label(&self, position: usize) -> Option<&str> {
        self.labels.get(position).map(String::as_str)
    }

    pub fn get(&self, position: usize) -> Option<(&Embedding, &str)> {
        Some((self.embeddings.get(position)?, self.label(position)?))
    }

    pub fn contains_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    /// Iterate over (embedding, label) pairs in enrollment order.
    pub fn iter(&self) -> impl Iterator<Item = (&Embedding, &str)> {
        self.embeddings
            .iter()
            .zip(self.labels.iter().map(String::as_str))
    }
}
