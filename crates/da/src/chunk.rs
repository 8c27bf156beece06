//! Deterministic blob chunking.

use animica_types::error::DAError;

/// Splits `blob` into fixed-size chunks.
///
/// Rules:
/// - `chunk_size` must be positive.
/// - An empty blob yields no chunks (not one empty chunk).
/// - Chunks are non-empty, at most `chunk_size` long, and concatenate back
///   to the original blob.
pub fn chunk_blob(blob: &[u8], chunk_size: usize) -> Result<Vec<Vec<u8>>, DAError> {
    if chunk_size == 0 {
        return Err(DAError::InvalidParameter(
            "chunk_size must be positive".into(),
        ));
    }
    Ok(blob.chunks(chunk_size).map(|c| c.to_vec()).collect())
}
