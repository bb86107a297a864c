//! File-backed store: the known set lives in one checksummed file per directory.

use crate::error::{MatchError, Result};
use crate::known_set::KnownSet;
use crate::persistence::serialization;
use crate::persistence::store::EmbeddingStore;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Name of the committed store file inside the data directory.
pub const STORE_FILE: &str = "known_faces.bin";
const TEMP_FILE: &str = "known_faces.bin.tmp";
const MANIFEST_FILE: &str = "manifest.json";

/// Saves and loads the known set under a data directory.
///
/// Saves write a temp file, fsync it and rename it over [`STORE_FILE`], so
/// the committed file is always either the old or the new set.
#[derive(Debug, Clone)]
pub struct FileEmbeddingStore {
    dir: PathBuf,
}

impl FileEmbeddingStore {
    /// Create a store rooted at `dir`. Nothing is touched until the first save.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn store_path(&self) -> PathBuf {
        self.dir.join(STORE_FILE)
    }

    fn temp_path(&self) -> PathBuf {
        self.dir.join(TEMP_FILE)
    }

    fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }

    /// Check if a committed store file exists.
    pub fn exists(&self) -> bool {
        self.store_path().exists()
    }

    fn write_atomically(&self, bytes: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.dir)?;

        let temp = self.temp_path();
        {
            let mut file = File::create(&temp)?;
            file.write_all(bytes)?;
            file.sync_all()?;
        }
        fs::rename(&temp, self.store_path())?;

        // The rename is already visible; a failed directory sync only weakens durability.
        if let Err(e) = sync_dir(&self.dir) {
            warn!(dir = %self.dir.display(), error = %e, "failed to sync data directory");
        }
        Ok(())
    }

    /// Write manifest (JSON) for human-readable metadata. Never read back.
    fn write_manifest(&self, known: &KnownSet) -> Result<()> {
        let manifest = serde_json::json!({
            "count": known.len(),
            "dimension": known.dimension(),
            "labels": known.labels(),
        });
        fs::write(self.manifest_path(), serialization::to_json_pretty(&manifest)?)?;
        Ok(())
    }
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> std::io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}

impl EmbeddingStore for FileEmbeddingStore {
    fn load(&self) -> Result<KnownSet> {
        let path = self.store_path();
        if !path.exists() {
            return Err(MatchError::StorageUnavailable(format!(
                "No embedding store at {}",
                path.display()
            )));
        }

        let bytes = fs::read(&path).map_err(|e| {
            MatchError::StorageUnavailable(format!("Reading {}: {}", path.display(), e))
        })?;
        let known = serialization::decode_known_set(&bytes)?;
        debug!(path = %path.display(), count = known.len(), "loaded known set");
        Ok(known)
    }

    fn save(&self, known: &KnownSet) -> Result<()> {
        let bytes = serialization::encode_known_set(known)?;
        self.write_atomically(&bytes)
            .map_err(|e| MatchError::PersistenceWriteFailed(e.to_string()))?;

        if let Err(e) = self.write_manifest(known) {
            warn!(error = %e, "failed to write manifest");
        }
        debug!(dir = %self.dir.display(), count = known.len(), "saved known set");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::Embedding;
    use tempfile::TempDir;

    fn sample() -> KnownSet {
        KnownSet::new()
            .with_appended(Embedding::new(vec![1.0, 2.0, 3.0]).unwrap(), "v1")
            .unwrap()
            .with_appended(Embedding::new(vec![4.0, 5.0, 6.0]).unwrap(), "v2")
            .unwrap()
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let store = FileEmbeddingStore::new(dir.path().join("db"));

        store.save(&sample()).unwrap();
        assert!(store.exists());

        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.dimension(), Some(3));
        assert_eq!(loaded.label(0), Some("v1"));
        assert_eq!(loaded.embeddings()[1].as_slice(), &[4.0, 5.0, 6.0]);
        assert!(!store.temp_path().exists());
    }

    #[test]
    fn test_load_nonexistent() {
        let dir = TempDir::new().unwrap();
        let store = FileEmbeddingStore::new(dir.path().join("empty"));
        assert!(!store.exists());
        assert!(matches!(
            store.load(),
            Err(MatchError::StorageUnavailable(_))
        ));
    }

    #[test]
    fn test_empty_set_is_a_valid_store() {
        let dir = TempDir::new().unwrap();
        let store = FileEmbeddingStore::new(dir.path());
        store.save(&KnownSet::new()).unwrap();
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_stale_temp_file_is_ignored() {
        let dir = TempDir::new().unwrap();
        let store = FileEmbeddingStore::new(dir.path());
        store.save(&sample()).unwrap();

        // Simulates a crash after the temp write but before the rename.
        fs::write(store.temp_path(), b"half-written garbage").unwrap();
        assert_eq!(store.load().unwrap(), sample());

        store.save(&KnownSet::new()).unwrap();
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let store = FileEmbeddingStore::new(dir.path());
        fs::write(store.store_path(), b"FMKS not really").unwrap();
        assert!(matches!(store.load(), Err(MatchError::CorruptStore(_))));
    }

    #[test]
    fn test_append_persists() {
        let dir = TempDir::new().unwrap();
        let store = FileEmbeddingStore::new(dir.path());
        store.save(&sample()).unwrap();

        let known = store.load().unwrap();
        let next = store
            .append(&known, Embedding::new(vec![7.0, 8.0, 9.0]).unwrap(), "v3")
            .unwrap();
        assert_eq!(next.len(), 3);

        let reopened = FileEmbeddingStore::new(dir.path());
        assert_eq!(reopened.load().unwrap(), next);
    }

    #[test]
    fn test_manifest_written() {
        let dir = TempDir::new().unwrap();
        let store = FileEmbeddingStore::new(dir.path());
        store.save(&sample()).unwrap();

        let manifest: serde_json::Value =
            serde_json::from_slice(&fs::read(store.manifest_path()).unwrap()).unwrap();
        assert_eq!(manifest["count"], 2);
        assert_eq!(manifest["dimension"], 3);
        assert_eq!(manifest["labels"][1], "v2");
    }

    #[test]
    fn test_save_into_unwritable_location_fails() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, b"file").unwrap();

        let store = FileEmbeddingStore::new(&blocker);
        assert!(matches!(
            store.save(&sample()),
            Err(MatchError::PersistenceWriteFailed(_))
        ));
    }
}
