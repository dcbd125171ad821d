//! On-disk layout of a saved store.
//!
//! ```text
//! magic     8 bytes   "PMBRAG\0\x01"
//! u32 LE    header length H
//! H bytes   JSON header: version, model, dimensions, metric, documents
//! N*D f32   little-endian vectors in document order
//! 32 bytes  SHA-256 of everything above
//! ```
//!
//! Vectors are stored as raw bits so a reload ranks exactly as before the save.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::FlatIndex;
use crate::domain::{DistanceMetric, Document, DomainError};

pub const INDEX_FILE_NAME: &str = "index.bin";

const MAGIC: &[u8; 8] = b"PMBRAG\0\x01";
const FORMAT_VERSION: u32 = 1;
const LEN_PREFIX: usize = 4;
const CHECKSUM_LEN: usize = 32;

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Serialize)]
struct HeaderRef<'a> {
    version: u32,
    model: &'a str,
    dimensions: usize,
    metric: DistanceMetric,
    documents: &'a [Document],
}

#[derive(Deserialize)]
struct Header {
    version: u32,
    model: String,
    dimensions: usize,
    metric: DistanceMetric,
    documents: Vec<Document>,
}

/// Contents of a decoded index file.
#[derive(Debug)]
pub struct IndexSnapshot {
    pub model: String,
    pub documents: Vec<Document>,
    pub index: FlatIndex,
}

pub fn encode(model: &str, documents: &[Document], index: &FlatIndex) -> Result<Vec<u8>, DomainError> {
    if documents.len() != index.len() {
        return Err(DomainError::internal(format!(
            "{} documents but {} vectors",
            documents.len(),
            index.len()
        )));
    }

    let header = HeaderRef {
        version: FORMAT_VERSION,
        model,
        dimensions: index.dimension(),
        metric: index.metric(),
        documents,
    };
    let header_bytes = serde_json::to_vec(&header)
        .map_err(|e| DomainError::storage(format!("Failed to serialize index header: {}", e)))?;
    let header_len = u32::try_from(header_bytes.len())
        .map_err(|_| DomainError::storage("Index header exceeds 4 GiB"))?;

    let vectors = index.as_flat();
    let mut buf = Vec::with_capacity(
        MAGIC.len() + LEN_PREFIX + header_bytes.len() + vectors.len() * 4 + CHECKSUM_LEN,
    );
    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&header_len.to_le_bytes());
    buf.extend_from_slice(&header_bytes);
    for value in vectors {
        buf.extend_from_slice(&value.to_le_bytes());
    }

    let checksum = Sha256::digest(&buf);
    buf.extend_from_slice(&checksum);

    Ok(buf)
}

pub fn decode(bytes: &[u8]) -> Result<IndexSnapshot, DomainError> {
    if bytes.len() < MAGIC.len() + LEN_PREFIX + CHECKSUM_LEN {
        return Err(DomainError::corrupted(format!(
            "index file is truncated ({} bytes)",
            bytes.len()
        )));
    }
    if &bytes[..MAGIC.len()] != MAGIC {
        return Err(DomainError::corrupted("index file has an unknown signature"));
    }

    let (body, checksum) = bytes.split_at(bytes.len() - CHECKSUM_LEN);
    if Sha256::digest(body).as_slice() != checksum {
        return Err(DomainError::corrupted("index file checksum mismatch"));
    }

    let len_bytes = &body[MAGIC.len()..MAGIC.len() + LEN_PREFIX];
    let header_len =
        u32::from_le_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]]) as usize;
    let header_start = MAGIC.len() + LEN_PREFIX;
    let header_end = header_start
        .checked_add(header_len)
        .filter(|end| *end <= body.len())
        .ok_or_else(|| DomainError::corrupted("index header length exceeds file size"))?;

    let header: Header = serde_json::from_slice(&body[header_start..header_end])
        .map_err(|e| DomainError::corrupted(format!("unreadable index header: {}", e)))?;

    if header.version != FORMAT_VERSION {
        return Err(DomainError::corrupted(format!(
            "unsupported index format version {}",
            header.version
        )));
    }
    if header.documents.iter().any(|d| d.content().is_empty()) {
        return Err(DomainError::corrupted("index contains an empty document"));
    }

    let vector_bytes = &body[header_end..];
    let expected = header
        .documents
        .len()
        .checked_mul(header.dimensions)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| DomainError::corrupted("index header declares an impossible size"))?;
    if vector_bytes.len() != expected {
        return Err(DomainError::corrupted(format!(
            "expected {} bytes of vectors for {} documents of dimension {}, found {}",
            expected,
            header.documents.len(),
            header.dimensions,
            vector_bytes.len()
        )));
    }

    let data: Vec<f32> = vector_bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    let index = FlatIndex::from_flat(header.dimensions, header.metric, data)
        .map_err(|e| DomainError::corrupted(e.to_string()))?;

    Ok(IndexSnapshot {
        model: header.model,
        documents: header.documents,
        index,
    })
}

/// Reads the index file, or `None` when nothing has been saved yet.
pub async fn read_index_file(path: &Path) -> Result<Option<Vec<u8>>, DomainError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(DomainError::storage(format!(
            "Failed to read index file {}: {}",
            path.display(),
            e
        ))),
    }
}

/// Replaces `path` so that readers see either the old file or the new one, never a mix.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), DomainError> {
    let tmp = temp_path(path)?;

    let written = async {
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&tmp, path).await
    }
    .await;

    if let Err(e) = written {
        if let Err(cleanup) = tokio::fs::remove_file(&tmp).await {
            if cleanup.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove temporary file {}: {}", tmp.display(), cleanup);
            }
        }
        return Err(DomainError::storage(format!(
            "Failed to write {}: {}",
            path.display(),
            e
        )));
    }

    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

fn temp_path(path: &Path) -> Result<PathBuf, DomainError> {
    let parent = path
        .parent()
        .ok_or_else(|| DomainError::storage(format!("{} has no parent", path.display())))?;
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(INDEX_FILE_NAME);
    let seq = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    Ok(parent.join(format!(".{}.tmp-{}-{}", name, std::process::id(), seq)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DocumentMetadata;
    use tempfile::tempdir;

    fn sample() -> (Vec<Document>, FlatIndex) {
        let documents = vec![
            Document::new("first", DocumentMetadata::summary("s1").with_timestamp(10)),
            Document::new("second", DocumentMetadata::feedback("s1").with_extra("seed", true)),
        ];
        let mut index = FlatIndex::new(3, DistanceMetric::SquaredEuclidean).unwrap();
        index.add(&[0.1, -0.2, 0.3]).unwrap();
        index.add(&[f32::MIN_POSITIVE, 1.0e-7, -4.5]).unwrap();
        (documents, index)
    }

    #[test]
    fn test_decode_restores_exact_bits() {
        let (documents, index) = sample();
        let bytes = encode("mock-embedding", &documents, &index).unwrap();

        let snapshot = decode(&bytes).unwrap();

        assert_eq!(snapshot.model, "mock-embedding");
        assert_eq!(snapshot.documents, documents);
        assert_eq!(snapshot.index.metric(), DistanceMetric::SquaredEuclidean);
        let original: Vec<u32> = index.as_flat().iter().map(|v| v.to_bits()).collect();
        let restored: Vec<u32> = snapshot.index.as_flat().iter().map(|v| v.to_bits()).collect();
        assert_eq!(original, restored);
    }

    #[test]
    fn test_empty_store_encodes() {
        let index = FlatIndex::new(8, DistanceMetric::Cosine).unwrap();
        let bytes = encode("m", &[], &index).unwrap();

        let snapshot = decode(&bytes).unwrap();

        assert!(snapshot.documents.is_empty());
        assert_eq!(snapshot.index.dimension(), 8);
    }

    #[test]
    fn test_flipped_byte_is_detected() {
        let (documents, index) = sample();
        let mut bytes = encode("m", &documents, &index).unwrap();
        let middle = bytes.len() / 2;
        bytes[middle] ^= 0xFF;

        let err = decode(&bytes).unwrap_err();
        assert!(err.is_corruption());
    }

    #[test]
    fn test_truncated_and_foreign_files_are_rejected() {
        assert!(decode(b"PMB").unwrap_err().is_corruption());
        assert!(decode(&[0u8; 64]).unwrap_err().is_corruption());
    }

    #[test]
    fn test_mismatched_counts_refuse_to_encode() {
        let (documents, _) = sample();
        let index = FlatIndex::new(3, DistanceMetric::Cosine).unwrap();
        assert!(encode("m", &documents, &index).is_err());
    }

    #[tokio::test]
    async fn test_write_atomic_replaces_file() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join(INDEX_FILE_NAME);

        write_atomic(&path, b"old").await.unwrap();
        write_atomic(&path, b"new contents").await.unwrap();

        let bytes = read_index_file(&path).await.unwrap();
        assert_eq!(bytes.as_deref(), Some(&b"new contents"[..]));

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".tmp-"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_missing_file_reads_as_none() {
        let dir = tempdir().expect("tempdir");
        let bytes = read_index_file(&dir.path().join(INDEX_FILE_NAME)).await.unwrap();
        assert!(bytes.is_none());
    }
}
