//! Content-addressed filesystem blob store.
//!
//! Blobs are stored under `<root>/<algo>/<b1>/<b2>/<hex>` where `algo` is the
//! hash algorithm name, `b1`/`b2` are the first two digest-byte hex pairs,
//! and `hex` is the full digest. Writes go through a temp file in the final
//! directory and rename into place, so a crash never leaves a partial blob
//! under its content address.

use animica_types::error::DAError;
use animica_types::hash::{sha3_256, Hash32};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Domain tag for blob content addresses.
const BLOB_DOMAIN: &[u8] = b"animica:blob:v1\x00";
/// Directory name of the one supported hash algorithm.
const ALGO: &str = "sha3-256";

/// A content-addressed blob store rooted at a directory.
#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    /// Opens (and creates, if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, DAError> {
        let root = root.into();
        fs::create_dir_all(root.join(ALGO))?;
        Ok(Self { root })
    }

    /// The content address of `data`.
    pub fn address(data: &[u8]) -> Hash32 {
        sha3_256(BLOB_DOMAIN, data)
    }

    fn path_for(&self, digest: &Hash32) -> PathBuf {
        let hex = hex::encode(digest);
        self.root
            .join(ALGO)
            .join(&hex[0..2])
            .join(&hex[2..4])
            .join(&hex)
    }

    /// Stores `data`, returning its digest. Idempotent: re-putting existing
    /// content is a no-op.
    pub fn put(&self, data: &[u8]) -> Result<Hash32, DAError> {
        let digest = Self::address(data);
        let path = self.path_for(&digest);
        if path.exists() {
            return Ok(digest);
        }
        let dir = path.parent().ok_or_else(|| {
            DAError::InvalidParameter("blob path has no parent directory".into())
        })?;
        fs::create_dir_all(dir)?;

        let tmp = dir.join(format!(".tmp-{}", hex::encode(&digest[..8])));
        {
            let mut f = fs::File::create(&tmp)?;
            f.write_all(data)?;
            f.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        debug!(digest = %hex::encode(digest), bytes = data.len(), "blob stored");
        Ok(digest)
    }

    /// Fetches a blob by digest, verifying the content address on read.
    pub fn get(&self, digest: &Hash32) -> Result<Vec<u8>, DAError> {
        let path = self.path_for(digest);
        if !path.exists() {
            return Err(DAError::NotFound(hex::encode(digest)));
        }
        let data = fs::read(&path)?;
        if Self::address(&data) != *digest {
            return Err(DAError::CommitmentMismatch);
        }
        Ok(data)
    }

    /// Whether a blob with this digest is present.
    pub fn has(&self, digest: &Hash32) -> bool {
        self.path_for(digest).exists()
    }

    /// The store's root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }
}
