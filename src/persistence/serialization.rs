//! Serialization utilities: bincode for the known set, JSON for the manifest.
//!
//! A store file is laid out as:
//! `[magic: "FMKS"][version: u32][length: u32][crc32: u32][payload: bincode(KnownSetRecord)]`
//! with all integers little-endian.

use crate::embedding::Embedding;
use crate::error::{MatchError, Result};
use crate::known_set::KnownSet;
use serde::{Deserialize, Serialize};

/// File magic for store files.
pub const MAGIC: [u8; 4] = *b"FMKS";

/// Current store file format version.
pub const FORMAT_VERSION: u32 = 1;

const HEADER_SIZE: usize = 16;

/// Serializable representation of a known set: two parallel sequences.
#[derive(Debug, Serialize, Deserialize)]
pub struct KnownSetRecord {
    pub dimension: Option<usize>,
    pub embeddings: Vec<Vec<f32>>,
    pub labels: Vec<String>,
}

impl From<&KnownSet> for KnownSetRecord {
    fn from(known: &KnownSet) -> Self {
        Self {
            dimension: known.dimension(),
            embeddings: known
                .embeddings()
                .iter()
                .map(|e| e.as_slice().to_vec())
                .collect(),
            labels: known.labels().to_vec(),
        }
    }
}

impl KnownSetRecord {
    /// Validate the record and turn it back into a known set.
    pub fn into_known_set(self) -> Result<KnownSet> {
        let embeddings = self
            .embeddings
            .into_iter()
            .map(Embedding::new)
            .collect::<Result<Vec<_>>>()
            .map_err(|e| MatchError::CorruptStore(e.to_string()))?;
        let known = KnownSet::from_parts(embeddings, self.labels)
            .map_err(|e| MatchError::CorruptStore(e.to_string()))?;
        if known.dimension().is_some() && known.dimension() != self.dimension {
            return Err(MatchError::CorruptStore(format!(
                "Header dimension {:?} disagrees with stored embeddings ({:?})",
                self.dimension,
                known.dimension()
            )));
        }
        Ok(known)
    }
}

/// Encode data to bincode bytes.
pub fn to_bincode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(bincode::serialize(value)?)
}

/// Decode data from bincode bytes.
pub fn from_bincode<'a, T: Deserialize<'a>>(bytes: &'a [u8]) -> Result<T> {
    Ok(bincode::deserialize(bytes)?)
}

/// Encode data to pretty-printed JSON bytes.
pub fn to_json_pretty<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(value)?)
}

/// Encode a known set into a framed, checksummed store file.
pub fn encode_known_set(known: &KnownSet) -> Result<Vec<u8>> {
    let payload = to_bincode(&KnownSetRecord::from(known))?;
    let len = u32::try_from(payload.len()).map_err(|_| {
        MatchError::SerializationError(format!("Payload too large: {} bytes", payload.len()))
    })?;
    let crc = crc32fast::hash(&payload);

    let mut bytes = Vec::with_capacity(HEADER_SIZE + payload.len());
    bytes.extend_from_slice(&MAGIC);
    bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    bytes.extend_from_slice(&len.to_le_bytes());
    bytes.extend_from_slice(&crc.to_le_bytes());
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[at..at + 4]);
    u32::from_le_bytes(buf)
}

/// Decode a store file produced by [`encode_known_set`].
pub fn decode_known_set(bytes: &[u8]) -> Result<KnownSet> {
    if bytes.len() < HEADER_SIZE {
        return Err(MatchError::CorruptStore(
            "File too small for header".to_string(),
        ));
    }
    if bytes[0..4] != MAGIC {
        return Err(MatchError::CorruptStore("Bad magic".to_string()));
    }
    let version = read_u32(bytes, 4);
    if version != FORMAT_VERSION {
        return Err(MatchError::CorruptStore(format!(
            "Unsupported format version {}",
            version
        )));
    }
    let len = read_u32(bytes, 8) as usize;
    let expected_crc = read_u32(bytes, 12);

    let payload = &bytes[HEADER_SIZE..];
    if payload.len() != len {
        return Err(MatchError::CorruptStore(format!(
            "Payload is {} bytes, header says {}",
            payload.len(),
            len
        )));
    }
    if crc32fast::hash(payload) != expected_crc {
        return Err(MatchError::CorruptStore("Checksum mismatch".to_string()));
    }

    let record: KnownSetRecord =
        from_bincode(payload).map_err(|e| MatchError::CorruptStore(e.to_string()))?;
    record.into_known_set()
}
