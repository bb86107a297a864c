//! Index trait for pluggable nearest-neighbor backends

use serde::Serialize;

use crate::embedding::Embedding;
use crate::error::Result;

/// A search hit: the position of an indexed embedding and its distance to the query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Neighbor {
    /// Position of the embedding in the sequence the index was built from.
    pub position: usize,
    /// Euclidean distance to the query.
    pub distance: f32,
}

/// An immutable nearest-neighbor index over a sequence of embeddings.
///
/// Indexes are built in one shot and never mutated; a changed embedding set
/// means a new index. Positions refer to the slice passed to `build`.
///
/// Results are ordered by (distance, position): equal distances resolve to
/// the lowest position, so two builds from the same input always agree.
pub trait NearestNeighborIndex: Sized + Send + Sync {
    /// Build an index over `embeddings`.
    ///
    /// Fails with `EmptyIndex` when `embeddings` is empty and with
    /// `DimensionMismatch` when they disagree in dimensionality.
    fn build(embeddings: &[Embedding]) -> Result<Self>;

    /// The closest indexed embedding to `query`.
    fn nearest(&self, query: &Embedding) -> Result<Neighbor>;

    /// The `k` closest indexed embeddings, sorted ascending.
    fn nearest_k(&self, query: &Embedding, k: usize) -> Result<Vec<Neighbor>>;

    /// Dimensionality shared by all indexed embeddings.
    fn dimension(&self) -> usize;

    /// The number of embeddings in this index.
    fn len(&self) -> usize;

    /// Whether the index is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Shared validation for `build`: returns the common dimension.
pub(crate) fn common_dimension(embeddings: &[Embedding]) -> Result<usize> {
    let first = embeddings
        .first()
        .ok_or(crate::error::MatchError::EmptyIndex)?;
    let dimension = first.dimension();
    for e in &embeddings[1..] {
        e.check_dimension(dimension)?;
    }
    Ok(dimension)
}
