//! Durable storage abstraction for the vector index.
//!
//! An index is persisted as two paired artifacts, bundled here as an
//! [`IndexSnapshot`]:
//!
//! - the structural vector file: magic `RGIX`, format version, `dims`,
//!   `count` (all `u32` little-endian) followed by `count × dims`
//!   little-endian `f32`s in index order;
//! - the [`IndexMetadata`] record mapping each ordinal position to its
//!   [`Chunk`], plus the counts and a SHA-256 of the vector file that tie the
//!   two together.
//!
//! The [`IndexStorage`] trait lets the application pick where snapshots live
//! (a directory on disk in the app crate, [`MemoryStorage`] in tests).

use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::embedding::{blob_to_vec, vec_to_blob};
use crate::error::{RagError, Result};
use crate::models::Chunk;

/// Leading bytes of every vector file.
pub const MAGIC: &[u8; 4] = b"RGIX";
/// Current on-disk format version.
pub const FORMAT_VERSION: u32 = 1;

const HEADER_LEN: usize = 16;

/// Chunk metadata and consistency fields for a persisted index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub version: u32,
    pub dims: usize,
    pub count: usize,
    pub embedding_model: String,
    /// Hex SHA-256 of the vector file bytes.
    pub vectors_sha256: String,
    pub built_at: DateTime<Utc>,
    /// Chunks in index order; position `i` belongs to vector `i`.
    pub chunks: Vec<Chunk>,
}

/// Both persisted artifacts of one index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSnapshot {
    /// Encoded vector file (see [`encode_vectors`]).
    pub vectors: Vec<u8>,
    pub metadata: IndexMetadata,
}

/// Where index snapshots are written to and read from.
///
/// `write` failures must be reported as [`RagError::IndexBuild`]; `read`
/// failures (including a missing artifact) as [`RagError::IndexLoad`].
pub trait IndexStorage: Send + Sync {
    /// True when both artifacts are present.
    fn exists(&self) -> bool;
    fn write(&self, snapshot: &IndexSnapshot) -> Result<()>;
    fn read(&self) -> Result<IndexSnapshot>;
}

/// In-memory [`IndexStorage`] for tests and embedding applications that do
/// not need durability.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    snapshot: RwLock<Option<IndexSnapshot>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IndexStorage for MemoryStorage {
    fn exists(&self) -> bool {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn write(&self, snapshot: &IndexSnapshot) -> Result<()> {
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = Some(snapshot.clone());
        Ok(())
    }

    fn read(&self) -> Result<IndexSnapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| RagError::IndexLoad("no persisted index".to_string()))
    }
}

/// Encode vectors of dimension `dims` into the vector-file format.
pub fn encode_vectors(dims: usize, vectors: &[Vec<f32>]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(HEADER_LEN + vectors.len() * dims * 4);
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    bytes.extend_from_slice(&(dims as u32).to_le_bytes());
    bytes.extend_from_slice(&(vectors.len() as u32).to_le_bytes());
    for v in vectors {
        bytes.extend_from_slice(&vec_to_blob(v));
    }
    bytes
}

/// Decode a vector file, returning `(dims, vectors)`.
///
/// Rejects bad magic, unknown versions, and payloads that are shorter or
/// longer than the header promises.
pub fn decode_vectors(bytes: &[u8]) -> Result<(usize, Vec<Vec<f32>>)> {
    if bytes.len() < HEADER_LEN {
        return Err(RagError::IndexLoad(format!(
            "vector file truncated: {} bytes, header needs {}",
            bytes.len(),
            HEADER_LEN
        )));
    }
    if &bytes[0..4] != MAGIC {
        return Err(RagError::IndexLoad("vector file has bad magic".to_string()));
    }
    let version = read_u32(bytes, 4);
    if version != FORMAT_VERSION {
        return Err(RagError::IndexLoad(format!(
            "unsupported vector file version {} (expected {})",
            version, FORMAT_VERSION
        )));
    }
    let dims = read_u32(bytes, 8) as usize;
    let count = read_u32(bytes, 12) as usize;

    let expected = count
        .checked_mul(dims)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| RagError::IndexLoad("vector file header overflows".to_string()))?;
    let payload = &bytes[HEADER_LEN..];
    if payload.len() != expected {
        return Err(RagError::IndexLoad(format!(
            "vector file holds {} payload bytes, header promises {} ({} × {} dims)",
            payload.len(),
            expected,
            count,
            dims
        )));
    }

    if dims == 0 {
        return Ok((0, vec![Vec::new(); count]));
    }
    let vectors = payload.chunks_exact(dims * 4).map(blob_to_vec).collect();
    Ok((dims, vectors))
}

/// Hex SHA-256 of an encoded vector file.
pub fn checksum(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_layout() {
        let bytes = encode_vectors(2, &[vec![1.0, 2.0], vec![3.0, 4.0]]);
        assert_eq!(&bytes[0..4], MAGIC);
        assert_eq!(bytes.len(), HEADER_LEN + 2 * 2 * 4);
        let (dims, vectors) = decode_vectors(&bytes).unwrap();
        assert_eq!(dims, 2);
        assert_eq!(vectors, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
    }

    #[test]
    fn test_decode_rejects_truncated_payload() {
        let mut bytes = encode_vectors(3, &[vec![1.0, 2.0, 3.0]]);
        bytes.pop();
        let err = decode_vectors(&bytes).unwrap_err();
        assert!(matches!(err, RagError::IndexLoad(_)));
    }

    #[test]
    fn test_decode_rejects_short_header() {
        assert!(matches!(
            decode_vectors(b"RGIX"),
            Err(RagError::IndexLoad(_))
        ));
    }

    #[test]
    fn test_decode_rejects_bad_magic() {
        let mut bytes = encode_vectors(1, &[vec![1.0]]);
        bytes[0] = b'X';
        assert!(matches!(decode_vectors(&bytes), Err(RagError::IndexLoad(_))));
    }

    #[test]
    fn test_decode_rejects_unknown_version() {
        let mut bytes = encode_vectors(1, &[vec![1.0]]);
        bytes[4..8].copy_from_slice(&99u32.to_le_bytes());
        let err = decode_vectors(&bytes).unwrap_err();
        assert!(err.to_string().contains("version 99"));
    }

    #[test]
    fn test_memory_storage_read_before_write() {
        let storage = MemoryStorage::new();
        assert!(!storage.exists());
        assert!(matches!(storage.read(), Err(RagError::IndexLoad(_))));
    }

    #[test]
    fn test_checksum_changes_with_content() {
        let a = encode_vectors(1, &[vec![1.0]]);
        let b = encode_vectors(1, &[vec![2.0]]);
        assert_ne!(checksum(&a), checksum(&b));
        assert_eq!(checksum(&a).len(), 64);
    }
}
