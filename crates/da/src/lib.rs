#![forbid(unsafe_code)]

//! # Animica Data Availability
//!
//! The DA commitment engine: deterministic blob chunking, a namespaced
//! merkle tree (NMT) with RS-style redundancy modeling, blob commitments and
//! the block-level DA root, the light-client sampling probability calculator,
//! and the content-addressed blob store.
//!
//! Everything except the store is pure functions over inputs, so commitment
//! building parallelizes freely across independent blobs.

/// Deterministic blob chunking.
pub mod chunk;
/// Blob commitments, reconstruction, and the block DA root.
pub mod commitment;
/// The RS `(n, k)` redundancy model.
pub mod erasure;
/// The namespaced merkle tree.
pub mod nmt;
/// Light-client sampling probability math.
pub mod sampling;
/// The content-addressed filesystem blob store.
pub mod store;

pub use chunk::chunk_blob;
pub use commitment::{commit_blob, da_root, reconstruct_blob, DaParams};
pub use erasure::RsParams;
pub use nmt::{NmtBuilder, NmtNode};
pub use sampling::{p_fail_approx, p_fail_hypergeometric, samples_for_target};
pub use store::BlobStore;
