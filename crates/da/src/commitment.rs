//! Blob commitments, reconstruction, and the block-level DA root.

use crate::chunk::chunk_blob;
use crate::nmt::{self, PADDING_NAMESPACE};
use animica_types::app::BlobCommitment;
use animica_types::error::DAError;
use animica_types::hash::{sha3_256, Hash32, DOMAIN_DA_ROOT};
use serde::{Deserialize, Serialize};

/// Parameters for committing blobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaParams {
    /// Fixed chunk size blobs are split into.
    pub chunk_size: usize,
    /// Maximum blob size accepted.
    pub max_blob_bytes: usize,
}

impl Default for DaParams {
    fn default() -> Self {
        Self {
            chunk_size: 4_096,
            max_blob_bytes: 8 * 1024 * 1024,
        }
    }
}

/// Builds the commitment for `blob` under `namespace`.
///
/// The commitment is deterministic: same bytes, namespace, and parameters
/// always produce the same root, independent of how the caller held the
/// bytes.
pub fn commit_blob(
    namespace: u64,
    blob: &[u8],
    params: &DaParams,
) -> Result<BlobCommitment, DAError> {
    if namespace == PADDING_NAMESPACE {
        return Err(DAError::NamespaceRange(namespace));
    }
    if blob.len() > params.max_blob_bytes {
        return Err(DAError::BlobTooLarge {
            size: blob.len(),
            max: params.max_blob_bytes,
        });
    }
    let chunks = chunk_blob(blob, params.chunk_size)?;
    let leaves: Vec<(u64, Vec<u8>)> = chunks.iter().map(|c| (namespace, c.clone())).collect();
    let root = nmt::root(&leaves);
    Ok(BlobCommitment {
        namespace,
        size: blob.len() as u64,
        root: root.digest,
        chunk_count: chunks.len() as u64,
    })
}

/// Reconstructs the original blob from a commitment and its chunks.
///
/// The chunks are re-committed and compared against the stored root before
/// any bytes are returned; concatenation is trimmed to the committed size.
pub fn reconstruct_blob(
    commitment: &BlobCommitment,
    chunks: &[Vec<u8>],
) -> Result<Vec<u8>, DAError> {
    let leaves: Vec<(u64, Vec<u8>)> = chunks
        .iter()
        .map(|c| (commitment.namespace, c.clone()))
        .collect();
    let root = nmt::root(&leaves);
    if root.digest != commitment.root {
        return Err(DAError::CommitmentMismatch);
    }
    let joined: Vec<u8> = chunks.concat();
    let need = commitment.size as usize;
    if joined.len() < need {
        return Err(DAError::Insufficient {
            have: joined.len(),
            need,
        });
    }
    Ok(joined[..need].to_vec())
}

/// Aggregates ordered blob commitments into the header's DA root:
///
/// `SHA3-256("animica:daRoot:v1|" || u32be(n) || ⋃ u32be(len(cᵢ)) || cᵢ)`
///
/// over each commitment's canonical wire bytes. The empty list has a
/// well-defined, stable root.
pub fn da_root(commitments: &[BlobCommitment]) -> Hash32 {
    let mut buf = Vec::new();
    buf.extend_from_slice(&(commitments.len() as u32).to_be_bytes());
    for c in commitments {
        let wire = c.wire_bytes();
        buf.extend_from_slice(&(wire.len() as u32).to_be_bytes());
        buf.extend_from_slice(&wire);
    }
    sha3_256(DOMAIN_DA_ROOT, &buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use animica_test_utils::seeded_bytes;

    fn params() -> DaParams {
        DaParams {
            chunk_size: 64,
            max_blob_bytes: 4_096,
        }
    }

    #[test]
    fn commitment_is_deterministic() {
        let blob = seeded_bytes(1, 500);
        let a = commit_blob(7, &blob, &params()).unwrap();
        let b = commit_blob(7, &blob, &params()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.size, 500);
        assert_eq!(a.chunk_count, 8);
    }

    #[test]
    fn namespace_participates_in_the_root() {
        let blob = seeded_bytes(2, 200);
        let a = commit_blob(1, &blob, &params()).unwrap();
        let b = commit_blob(2, &blob, &params()).unwrap();
        assert_ne!(a.root, b.root);
    }

    #[test]
    fn padding_namespace_is_reserved() {
        let err = commit_blob(u64::MAX, b"data", &params()).unwrap_err();
        assert!(matches!(err, DAError::NamespaceRange(_)));
    }

    #[test]
    fn oversize_blob_is_rejected() {
        let blob = seeded_bytes(3, 5_000);
        let err = commit_blob(1, &blob, &params()).unwrap_err();
        assert!(matches!(err, DAError::BlobTooLarge { .. }));
    }

    #[test]
    fn reconstruction_roundtrips() {
        let blob = seeded_bytes(4, 777);
        let commitment = commit_blob(9, &blob, &params()).unwrap();
        let chunks = chunk_blob(&blob, params().chunk_size).unwrap();
        let back = reconstruct_blob(&commitment, &chunks).unwrap();
        assert_eq!(back, blob);
    }

    #[test]
    fn corrupted_chunk_fails_reconstruction() {
        let blob = seeded_bytes(5, 300);
        let commitment = commit_blob(9, &blob, &params()).unwrap();
        let mut chunks = chunk_blob(&blob, params().chunk_size).unwrap();
        chunks[1][0] ^= 0x01;
        let err = reconstruct_blob(&commitment, &chunks).unwrap_err();
        assert!(matches!(err, DAError::CommitmentMismatch));
    }

    #[test]
    fn missing_chunks_fail_reconstruction() {
        let blob = seeded_bytes(6, 300);
        let commitment = commit_blob(9, &blob, &params()).unwrap();
        let mut chunks = chunk_blob(&blob, params().chunk_size).unwrap();
        chunks.pop();
        // The recomputed root cannot match with a chunk missing.
        let err = reconstruct_blob(&commitment, &chunks).unwrap_err();
        assert!(matches!(err, DAError::CommitmentMismatch));
    }

    #[test]
    fn empty_blob_commits_and_reconstructs() {
        let commitment = commit_blob(3, &[], &params()).unwrap();
        assert_eq!(commitment.chunk_count, 0);
        let back = reconstruct_blob(&commitment, &[]).unwrap();
        assert!(back.is_empty());
    }

    #[test]
    fn da_root_is_stable_for_the_empty_list() {
        let a = da_root(&[]);
        let b = da_root(&[]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn da_root_is_order_and_content_sensitive() {
        let c1 = commit_blob(1, &seeded_bytes(7, 100), &params()).unwrap();
        let c2 = commit_blob(2, &seeded_bytes(8, 100), &params()).unwrap();
        let c3 = commit_blob(3, &seeded_bytes(9, 100), &params()).unwrap();

        let base = da_root(&[c1.clone(), c2.clone(), c3.clone()]);
        let reordered = da_root(&[c2.clone(), c1.clone(), c3.clone()]);
        assert_ne!(base, reordered);

        let mut mutated = c1.clone();
        mutated.root[0] ^= 0x01;
        let changed = da_root(&[mutated, c2, c3]);
        assert_ne!(base, changed);
    }

    #[test]
    fn da_root_recomputes_from_listed_commitments() {
        let commitments: Vec<BlobCommitment> = (0..5)
            .map(|i| commit_blob(i + 1, &seeded_bytes(20 + i, 150), &params()).unwrap())
            .collect();
        let root = da_root(&commitments);
        assert_eq!(root, da_root(&commitments));
    }
}
