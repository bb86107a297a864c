//! Embedding extraction boundary.
//!
//! Turning pixels into embeddings is the job of an external face model. The
//! engine only sees this trait; [`JsonEmbeddingExtractor`] covers pipelines
//! where a model has already run and written its output as JSON.

use serde::Deserialize;

use crate::embedding::Embedding;
use crate::error::{MatchError, Result};

/// Produces one embedding per face found in an image.
///
/// Zero faces is a valid answer (an empty vector); `NoFaceDetected` may also
/// be returned by implementations that treat it as an error.
pub trait EmbeddingExtractor: Send + Sync {
    fn extract(&self, image: &[u8]) -> Result<Vec<Embedding>>;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Document {
    Faces(Vec<Vec<f32>>),
    Single(Vec<f32>),
    Wrapped { embeddings: Vec<Vec<f32>> },
}

/// Reads precomputed embeddings from a JSON document.
///
/// Accepted shapes: `[[...], [...]]` (one vector per face), `[...]` (a single
/// face), or `{"embeddings": [[...], ...]}`. An empty list means no face.
#[derive(Debug, Clone, Default)]
pub struct JsonEmbeddingExtractor {
    expected_dimension: Option<usize>,
}

impl JsonEmbeddingExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject any face whose dimensionality is not `dimension`.
    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            expected_dimension: Some(dimension),
        }
    }
}

impl EmbeddingExtractor for JsonEmbeddingExtractor {
    fn extract(&self, image: &[u8]) -> Result<Vec<Embedding>> {
        let document: Document = serde_json::from_slice(image)
            .map_err(|e| MatchError::ExtractionError(format!("Invalid embedding JSON: {}", e)))?;

        let raw = match document {
            Document::Faces(faces) | Document::Wrapped { embeddings: faces } => faces,
            Document::Single(face) => vec![face],
        };

        let faces = raw
            .into_iter()
            .map(Embedding::new)
            .collect::<Result<Vec<_>>>()
            .map_err(|e| MatchError::ExtractionError(e.to_string()))?;

        if let Some(dimension) = self.expected_dimension {
            for face in &faces {
                face.check_dimension(dimension)?;
            }
        }
        Ok(faces)
    }
}
