//! Seed a known set from a directory with one file per identity.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::engine::DuplicatePolicy;
use crate::error::{MatchError, Result};
use crate::extractor::EmbeddingExtractor;
use crate::known_set::KnownSet;

/// Result of [`import_directory`].
#[derive(Debug)]
pub struct ImportReport {
    pub known: KnownSet,
    /// Files that contributed nothing, with the reason.
    pub skipped: Vec<(PathBuf, String)>,
}

/// Build a known set from every file in `dir`.
///
/// Files are read in file-name order. The label is the file stem and the
/// first face in the file is enrolled. Files without a face, or whose label
/// is already taken under [`DuplicatePolicy::Reject`], are skipped with a
/// warning; any other failure aborts the import.
pub fn import_directory(
    dir: &Path,
    extractor: &dyn EmbeddingExtractor,
    policy: DuplicatePolicy,
) -> Result<ImportReport> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            paths.push(entry.path());
        }
    }
    paths.sort();

    let mut known = KnownSet::new();
    let mut skipped = Vec::new();

    for path in paths {
        let label = match path.file_stem().and_then(|s| s.to_str()) {
            Some(stem) if !stem.trim().is_empty() => stem.trim().to_string(),
            _ => {
                warn!(path = %path.display(), "skipping file without a usable name");
                skipped.push((path, "no usable label".to_string()));
                continue;
            }
        };

        if policy == DuplicatePolicy::Reject && known.contains_label(&label) {
            warn!(path = %path.display(), %label, "skipping duplicate label");
            skipped.push((path, format!("duplicate label {}", label)));
            continue;
        }

        let bytes = fs::read(&path)?;
        let faces = match extractor.extract(&bytes) {
            Ok(faces) => faces,
            Err(MatchError::NoFaceDetected) => Vec::new(),
            Err(e) => {
                return Err(MatchError::ExtractionError(format!(
                    "{}: {}",
                    path.display(),
                    e
                )))
            }
        };

        match faces.into_iter().next() {
            Some(face) => known = known.with_appended(face, &label)?,
            None => {
                warn!(path = %path.display(), "no face found, skipping");
                skipped.push((path, "no face found".to_string()));
            }
        }
    }

    info!(
        dir = %dir.display(),
        imported = known.len(),
        skipped = skipped.len(),
        "imported known faces"
    );
    Ok(ImportReport { known, skipped })
}
