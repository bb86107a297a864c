//! # facematch
//!
//! Face embedding index and match engine.
//!
//! This library provides:
//! - An append-only set of labeled face embeddings with atomic persistence
//! - Exact nearest-neighbor search (balanced kd-tree, or a brute-force scan)
//! - A match engine that classifies faces as known ("not wild") or unknown
//!   ("wild") against a distance threshold and enrolls new identities
//!
//! ## Example
//!
//! ```rust
//! use facematch::{Embedding, KnownSet, MatchConfig, MatchEngine, MemoryEmbeddingStore};
//!
//! let store = MemoryEmbeddingStore::with_known(KnownSet::new());
//! let engine: MatchEngine<_> = MatchEngine::open(store, MatchConfig::default()).unwrap();
//!
//! engine.enroll("alice", Embedding::new(vec![0.1, 0.2, 0.3]).unwrap()).unwrap();
//!
//! let face = Embedding::new(vec![0.1, 0.25, 0.3]).unwrap();
//! let result = engine.classify(&[face]).unwrap();
//! assert_eq!(result.status(), "not wild");
//! assert_eq!(result.identity(), Some("alice"));
//! ```

pub mod config;
pub mod distance;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod extractor;
pub mod flat_index;
pub mod import;
pub mod index;
pub mod kdtree;
pub mod known_set;
pub mod persistence;

pub use config::{load_config, Config, IndexKind};
pub use embedding::Embedding;
pub use engine::{
    ClassificationResult, DuplicatePolicy, EnrollResult, MatchConfig, MatchEngine, SearchHit,
    WildReason,
};
pub use error::{MatchError, Result};
pub use extractor::{EmbeddingExtractor, JsonEmbeddingExtractor};
pub use flat_index::FlatIndex;
pub use import::{import_directory, ImportReport};
pub use index::{NearestNeighborIndex, Neighbor};
pub use kdtree::KdTree;
pub use known_set::KnownSet;
pub use persistence::{EmbeddingStore, FileEmbeddingStore, MemoryEmbeddingStore};
