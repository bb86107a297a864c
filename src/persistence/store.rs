//! The durable store abstraction and an in-process implementation

use std::sync::Mutex;

use crate::embedding::Embedding;
use crate::error::{MatchError, Result};
use crate::known_set::KnownSet;

/// Durable home of the known set.
///
/// `save` must be atomic: a reader never observes embeddings without their
/// labels or a half-written set. `load` fails with `StorageUnavailable` when
/// nothing has ever been saved; an empty set that was saved is a valid state.
pub trait EmbeddingStore: Send + Sync {
    /// Read the committed known set.
    fn load(&self) -> Result<KnownSet>;

    /// Replace the committed known set.
    fn save(&self, known: &KnownSet) -> Result<()>;

    /// Persist `known` plus one pair and return the new set.
    ///
    /// Input errors (bad label, wrong dimension) are returned as-is; any
    /// failure to persist is reported as `PersistenceWriteFailed`.
    fn append(&self, known: &KnownSet, embedding: Embedding, label: &str) -> Result<KnownSet> {
        let next = known.with_appended(embedding, label)?;
        self.save(&next).map_err(into_write_failure)?;
        Ok(next)
    }
}

fn into_write_failure(err: MatchError) -> MatchError {
    match err {
        MatchError::PersistenceWriteFailed(_) => err,
        other => MatchError::PersistenceWriteFailed(other.to_string()),
    }
}

/// An in-memory store. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryEmbeddingStore {
    state: Mutex<Option<KnownSet>>,
}

impl MemoryEmbeddingStore {
    /// A store that has never been saved to; `load` fails.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A store holding `known` as its committed state.
    pub fn with_known(known: KnownSet) -> Self {
        Self {
            state: Mutex::new(Some(known)),
        }
    }
}

impl EmbeddingStore for MemoryEmbeddingStore {
    fn load(&self) -> Result<KnownSet> {
        let state = self
            .state
            .lock()
            .map_err(|e| MatchError::LockPoisoned(e.to_string()))?;
        state.clone().ok_or_else(|| {
            MatchError::StorageUnavailable("Memory store was never initialized".to_string())
        })
    }

    fn save(&self, known: &KnownSet) -> Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| MatchError::LockPoisoned(e.to_string()))?;
        *state = Some(known.clone());
        Ok(())
    }
}
