//! Match engine: classify faces and enroll new identities.
//!
//! The engine owns the store and an immutable [`Snapshot`] of the known set
//! together with the index built from it. Readers clone the current
//! `Arc<Snapshot>` and query it without holding any lock. Enrollments are
//! serialized by a writer mutex, persist and build the next snapshot off to
//! the side, and only take the write lock to swap the `Arc`. A classify call
//! therefore sees either the snapshot before an enrollment or the one after,
//! never a mixture.

use std::sync::{Arc, Mutex, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::embedding::Embedding;
use crate::error::{MatchError, Result};
use crate::extractor::EmbeddingExtractor;
use crate::index::NearestNeighborIndex;
use crate::kdtree::KdTree;
use crate::known_set::{normalize_label, KnownSet};
use crate::persistence::EmbeddingStore;

/// Default match threshold, in embedding-space distance units.
pub const DEFAULT_THRESHOLD: f32 = 0.6;

/// Status string for an unrecognized face.
pub const WILD: &str = "wild";
/// Status string for a recognized face.
pub const NOT_WILD: &str = "not wild";

/// What to do when enrolling a label that is already known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// Fail with `DuplicateLabel`.
    #[default]
    Reject,
    /// Add another embedding for the same label.
    Allow,
}

/// Matching parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchConfig {
    /// Distances strictly below this are a match.
    pub threshold: f32,
    pub duplicate_policy: DuplicatePolicy,
    /// Expected embedding dimension, enforced on enroll when set.
    pub dimension: Option<usize>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            duplicate_policy: DuplicatePolicy::Reject,
            dimension: None,
        }
    }
}

impl MatchConfig {
    pub fn with_threshold(threshold: f32) -> Self {
        Self {
            threshold,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.threshold.is_finite() || self.threshold <= 0.0 {
            return Err(MatchError::Config(format!(
                "threshold must be a positive finite number, got {}",
                self.threshold
            )));
        }
        if self.dimension == Some(0) {
            return Err(MatchError::Config("dimension must be positive".to_string()));
        }
        Ok(())
    }
}

/// Why a classification came out `wild`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WildReason {
    /// The image contained no face.
    NoFaceDetected,
    /// Nothing is enrolled yet.
    NoKnownFaces,
    /// No face was within the threshold of a known face.
    NoMatch,
}

/// Outcome of [`MatchEngine::classify`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ClassificationResult {
    NotWild {
        identity: String,
        distance: f32,
        /// Position of the matched embedding in the known set.
        position: usize,
        /// Which input face matched.
        face: usize,
    },
    Wild {
        reason: WildReason,
        /// Closest distance seen over all faces, when any were compared.
        nearest_distance: Option<f32>,
    },
}

impl ClassificationResult {
    fn wild(reason: WildReason) -> Self {
        ClassificationResult::Wild {
            reason,
            nearest_distance: None,
        }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, ClassificationResult::NotWild { .. })
    }

    pub fn status(&self) -> &'static str {
        if self.is_match() {
            NOT_WILD
        } else {
            WILD
        }
    }

    pub fn identity(&self) -> Option<&str> {
        match self {
            ClassificationResult::NotWild { identity, .. } => Some(identity),
            ClassificationResult::Wild { .. } => None,
        }
    }

    pub fn message(&self) -> String {
        match self {
            ClassificationResult::NotWild { identity, .. } => {
                format!("Face recognized as {}.", identity)
            }
            ClassificationResult::Wild { reason, .. } => match reason {
                WildReason::NoFaceDetected => "No face detected in the image.".to_string(),
                WildReason::NoKnownFaces => "No known faces enrolled.".to_string(),
                WildReason::NoMatch => "Face is not recognized.".to_string(),
            },
        }
    }
}

/// Outcome of a successful enrollment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrollResult {
    pub label: String,
    /// Position of the new embedding in the known set.
    pub position: usize,
    /// Number of enrolled embeddings after this one.
    pub known_count: usize,
}

impl EnrollResult {
    pub fn message(&self) -> String {
        format!("Face for {} added successfully.", self.label)
    }
}

/// A ranked candidate from [`MatchEngine::search`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub identity: String,
    pub distance: f32,
    pub position: usize,
    /// Whether this candidate is within the threshold.
    pub is_match: bool,
}

/// A known set and the index built from it. Immutable once published.
#[derive(Debug)]
pub struct Snapshot<I> {
    known: KnownSet,
    index: Option<I>,
}

impl<I: NearestNeighborIndex> Snapshot<I> {
    fn build(known: KnownSet) -> Result<Self> {
        let index = match I::build(known.embeddings()) {
            Ok(index) => Some(index),
            Err(MatchError::EmptyIndex) => None,
            Err(e) => return Err(e),
        };
        Ok(Self { known, index })
    }

    pub fn known(&self) -> &KnownSet {
        &self.known
    }

    /// The index, or `None` while nothing is enrolled.
    pub fn index(&self) -> Option<&I> {
        self.index.as_ref()
    }

    pub fn indexed_len(&self) -> usize {
        self.index.as_ref().map_or(0, |i| i.len())
    }

    fn label_at(&self, position: usize) -> Result<&str> {
        self.known.label(position).ok_or_else(|| {
            MatchError::CorruptStore(format!("Index position {} has no label", position))
        })
    }
}

/// Classifies faces against the enrolled identities and enrolls new ones.
pub struct MatchEngine<S, I = KdTree> {
    store: S,
    config: MatchConfig,
    current: RwLock<Arc<Snapshot<I>>>,
    /// Serializes writers. Holds `true` while the published snapshot is
    /// behind the store because a rebuild failed after a successful write.
    writer: Mutex<bool>,
}

impl<S: EmbeddingStore, I: NearestNeighborIndex> MatchEngine<S, I> {
    /// Load the known set from `store` and build the index.
    ///
    /// A store that cannot be loaded is fatal: the engine never starts with
    /// an implicit empty set.
    pub fn open(store: S, config: MatchConfig) -> Result<Self> {
        config.validate()?;
        let known = store.load()?;
        if let (Some(expected), Some(actual)) = (config.dimension, known.dimension()) {
            if expected != actual {
                return Err(MatchError::Config(format!(
                    "configured dimension {} does not match stored embeddings ({})",
                    expected, actual
                )));
            }
        }

        let snapshot = Snapshot::build(known)?;
        info!(
            known = snapshot.known.len(),
            threshold = config.threshold,
            "match engine ready"
        );
        Ok(Self {
            store,
            config,
            current: RwLock::new(Arc::new(snapshot)),
            writer: Mutex::new(false),
        })
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// The currently published snapshot.
    pub fn snapshot(&self) -> Result<Arc<Snapshot<I>>> {
        let guard = self
            .current
            .read()
            .map_err(|e| MatchError::LockPoisoned(e.to_string()))?;
        Ok(Arc::clone(&guard))
    }

    fn publish(&self, snapshot: Snapshot<I>) -> Result<()> {
        let mut guard = self
            .current
            .write()
            .map_err(|e| MatchError::LockPoisoned(e.to_string()))?;
        *guard = Arc::new(snapshot);
        Ok(())
    }

    pub fn known_count(&self) -> Result<usize> {
        Ok(self.snapshot()?.known.len())
    }

    /// Enrolled labels in position order.
    pub fn labels(&self) -> Result<Vec<String>> {
        Ok(self.snapshot()?.known.labels().to_vec())
    }

    /// Decide whether any of `faces` belongs to an enrolled identity.
    ///
    /// Faces are tried in order and the first one within the threshold wins.
    pub fn classify(&self, faces: &[Embedding]) -> Result<ClassificationResult> {
        if faces.is_empty() {
            debug!("classify: no face in input");
            return Ok(ClassificationResult::wild(WildReason::NoFaceDetected));
        }

        let snapshot = self.snapshot()?;
        let index = match snapshot.index() {
            Some(index) => index,
            None => {
                debug!(faces = faces.len(), "classify: nothing enrolled");
                return Ok(ClassificationResult::wild(WildReason::NoKnownFaces));
            }
        };

        let mut nearest: Option<f32> = None;
        for (face, embedding) in faces.iter().enumerate() {
            let hit = index.nearest(embedding)?;
            if hit.distance < self.config.threshold {
                let identity = snapshot.label_at(hit.position)?.to_string();
                debug!(face, %identity, distance = hit.distance, "classify: match");
                return Ok(ClassificationResult::NotWild {
                    identity,
                    distance: hit.distance,
                    position: hit.position,
                    face,
                });
            }
            nearest = Some(nearest.map_or(hit.distance, |d| d.min(hit.distance)));
        }

        debug!(faces = faces.len(), ?nearest, "classify: no match");
        Ok(ClassificationResult::Wild {
            reason: WildReason::NoMatch,
            nearest_distance: nearest,
        })
    }

    /// Run `extractor` on an image and classify the faces it finds.
    pub fn classify_image(
        &self,
        extractor: &dyn EmbeddingExtractor,
        image: &[u8],
    ) -> Result<ClassificationResult> {
        let faces = match extractor.extract(image) {
            Ok(faces) => faces,
            Err(MatchError::NoFaceDetected) => Vec::new(),
            Err(e) => return Err(e),
        };
        self.classify(&faces)
    }

    /// Enroll `embedding` under `label`.
    ///
    /// The store is written first; the in-memory snapshot only advances once
    /// the write succeeded. If the rebuild fails after a successful write,
    /// the error is returned and the next `enroll` (or [`MatchEngine::reload`])
    /// first republishes the committed set, so the write is never lost.
    pub fn enroll(&self, label: &str, embedding: Embedding) -> Result<EnrollResult> {
        let label = normalize_label(label)?;
        if let Some(dimension) = self.config.dimension {
            embedding.check_dimension(dimension)?;
        }

        let mut behind = self
            .writer
            .lock()
            .map_err(|e| MatchError::LockPoisoned(e.to_string()))?;
        if *behind {
            // Appending to the stale set would drop what the store already holds.
            self.rebuild_from_store()?;
            *behind = false;
        }
        let current = self.snapshot()?;

        if let Some(dimension) = current.known.dimension() {
            embedding.check_dimension(dimension)?;
        }
        if self.config.duplicate_policy == DuplicatePolicy::Reject
            && current.known.contains_label(&label)
        {
            return Err(MatchError::DuplicateLabel { label });
        }

        let next = self.store.append(&current.known, embedding, &label)?;
        let position = next.len() - 1;

        let snapshot = match Snapshot::build(next) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "index rebuild failed after enrollment was persisted");
                *behind = true;
                return Err(e);
            }
        };
        let known_count = snapshot.known.len();
        if let Err(e) = self.publish(snapshot) {
            *behind = true;
            return Err(e);
        }

        info!(%label, position, known = known_count, "enrolled face");
        Ok(EnrollResult {
            label,
            position,
            known_count,
        })
    }

    /// Enroll the first of `faces`; an empty slice is `NoFaceDetected`.
    pub fn enroll_faces(&self, label: &str, faces: &[Embedding]) -> Result<EnrollResult> {
        let label = normalize_label(label)?;
        let first = faces.first().ok_or(MatchError::NoFaceDetected)?;
        if faces.len() > 1 {
            debug!(faces = faces.len(), "enroll: using the first face");
        }
        self.enroll(&label, first.clone())
    }

    /// Run `extractor` on an image and enroll its first face.
    pub fn enroll_image(
        &self,
        extractor: &dyn EmbeddingExtractor,
        image: &[u8],
        label: &str,
    ) -> Result<EnrollResult> {
        let label = normalize_label(label)?;
        let faces = extractor.extract(image)?;
        self.enroll_faces(&label, &faces)
    }

    /// Reload the known set from the store and publish a fresh index.
    pub fn reload(&self) -> Result<usize> {
        let mut behind = self
            .writer
            .lock()
            .map_err(|e| MatchError::LockPoisoned(e.to_string()))?;
        let count = self.rebuild_from_store()?;
        *behind = false;
        info!(known = count, "reloaded known set");
        Ok(count)
    }

    /// Publish a snapshot built from the store's committed set. Callers hold the writer lock.
    fn rebuild_from_store(&self) -> Result<usize> {
        let snapshot = Snapshot::build(self.store.load()?)?;
        let count = snapshot.known.len();
        self.publish(snapshot)?;
        Ok(count)
    }

    /// The `k` closest enrolled embeddings to `query`, regardless of threshold.
    pub fn search(&self, query: &Embedding, k: usize) -> Result<Vec<SearchHit>> {
        let snapshot = self.snapshot()?;
        let index = match snapshot.index() {
            Some(index) => index,
            None => return Ok(Vec::new()),
        };

        index
            .nearest_k(query, k)?
            .into_iter()
            .map(|n| {
                Ok(SearchHit {
                    identity: snapshot.label_at(n.position)?.to_string(),
                    distance: n.distance,
                    position: n.position,
                    is_match: n.distance < self.config.threshold,
                })
            })
            .collect()
    }
}
