//! Core application-level data structures: transactions, blocks, proofs.

/// Block, header, and blob-commitment structures.
pub mod block;
/// PoIES proof candidate structures.
pub mod proof;
/// Transaction structures and the opaque signature seam.
pub mod transaction;

pub use block::{Block, BlockHeader, BlobCommitment};
pub use proof::{ProofCandidate, ProofKind, ProofMetrics};
pub use transaction::{
    Signature, SignatureVerifier, Transaction, TxKind, ALG_DILITHIUM3, ALG_SPHINCS_PLUS,
};

/// A fixed-size, 32-byte transaction hash.
pub type TxHash = [u8; 32];
