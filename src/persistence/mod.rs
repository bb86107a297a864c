//! Persistence layer: the known set's durable store.

pub mod file_store;
pub mod serialization;
pub mod store;

pub use file_store::FileEmbeddingStore;
pub use store::{EmbeddingStore, MemoryEmbeddingStore};
