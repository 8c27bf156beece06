//! Core error types for the Animica node.
//!
//! Errors are structured values and never cross component boundaries as
//! panics. Each domain enum implements [`ErrorCode`] so RPC surfaces and
//! logs can attach a stable machine-readable code to every failure.

use serde_json::{json, Value as Json};
use thiserror::Error;

/// A trait for assigning a stable, machine-readable string code to an error.
pub trait ErrorCode {
    /// Returns the unique, stable string identifier for this error variant.
    fn code(&self) -> &'static str;
}

/// A decoding failure with the byte position where it was detected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("decode error at byte {position}: {reason}")]
pub struct DecodeError {
    /// Offset into the input where decoding failed.
    pub position: usize,
    /// Human-readable description of the failure.
    pub reason: String,
}

impl ErrorCode for DecodeError {
    fn code(&self) -> &'static str {
        "DECODE_ERROR"
    }
}

/// Errors from bech32m address encoding and decoding.
#[derive(Debug, Error)]
pub enum AddressError {
    /// The payload length is not one of the supported address sizes.
    #[error("invalid address payload length {got} (expected 20 or 33 bytes)")]
    InvalidLength {
        /// The offending payload length.
        got: usize,
    },
    /// The human-readable prefix did not match the configured chain HRP.
    #[error("address HRP mismatch: expected '{expected}', got '{got}'")]
    HrpMismatch {
        /// The HRP this chain requires.
        expected: String,
        /// The HRP found in the string.
        got: String,
    },
    /// The string failed bech32m parsing (checksum, charset, or case).
    #[error("invalid bech32m string: {0}")]
    Encoding(String),
}

impl ErrorCode for AddressError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidLength { .. } => "ADDRESS_INVALID_LENGTH",
            Self::HrpMismatch { .. } => "ADDRESS_HRP_MISMATCH",
            Self::Encoding(_) => "ADDRESS_ENCODING",
        }
    }
}

/// Errors from mempool admission, replacement, and capacity handling.
///
/// These serialize to the `{code, reason, message, context}` payload carried
/// in RPC error data, with the context keys admission clients rely on.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MempoolError {
    /// The offered fee is below the current dynamic admission floor.
    #[error("gas price too low: offered {offered_gas_price_wei} wei against a floor of {min_required_wei} wei ({} gwei)", .min_required_wei / 1_000_000_000)]
    FeeTooLow {
        /// The fee the transaction offered, in wei.
        offered_gas_price_wei: u128,
        /// The floor the watermark currently requires, in wei.
        min_required_wei: u128,
    },
    /// The encoded transaction exceeds the configured size limit.
    #[error("transaction too large: {size_bytes} bytes exceeds the {max_bytes} byte limit")]
    Oversize {
        /// Encoded size of the rejected transaction.
        size_bytes: usize,
        /// Maximum size the pool accepts.
        max_bytes: usize,
    },
    /// The transaction nonce does not match the account's expected nonce.
    #[error("nonce gap: expected {expected_nonce}, got {got_nonce}")]
    NonceGap {
        /// The next nonce the account state expects.
        expected_nonce: u64,
        /// The nonce carried by the transaction.
        got_nonce: u64,
    },
    /// The transaction targets a different chain id.
    #[error("wrong chain id: expected {expected}, got {got}")]
    WrongChain {
        /// The chain id this node is configured for.
        expected: u64,
        /// The chain id in the transaction.
        got: u64,
    },
    /// A replacement did not meet the required fee bump over the incumbent.
    #[error("replacement underpriced: offered {offered_effective_gas_price_wei} wei against {current_effective_gas_price_wei} wei requires a {required_bump}x bump")]
    Replacement {
        /// The bump ratio the replacement must reach.
        required_bump: f64,
        /// Effective fee of the incumbent entry, in wei.
        current_effective_gas_price_wei: u128,
        /// Effective fee the replacement offered, in wei.
        offered_effective_gas_price_wei: u128,
    },
    /// The exact transaction is already present in the pool.
    #[error("duplicate transaction {tx_hash}")]
    DuplicateTx {
        /// Hex hash of the duplicate.
        tx_hash: String,
    },
    /// The pool is at hard capacity and nothing is evictable.
    #[error("mempool full at capacity {capacity}")]
    PoolFull {
        /// The configured hard capacity.
        capacity: usize,
    },
    /// The sender is banned or rate limited at ingress.
    #[error("rejected at ingress: {detail}")]
    Dos {
        /// What triggered the rejection (e.g. "sender banned").
        detail: String,
    },
}

impl ErrorCode for MempoolError {
    fn code(&self) -> &'static str {
        match self {
            Self::FeeTooLow { .. } => "FEE_TOO_LOW",
            Self::Oversize { .. } => "OVERSIZE",
            Self::NonceGap { .. } => "NONCE_GAP",
            Self::WrongChain { .. } => "WRONG_CHAIN",
            Self::Replacement { .. } => "REPLACEMENT",
            Self::DuplicateTx { .. } => "DUPLICATE_TX",
            Self::PoolFull { .. } => "POOL_FULL",
            Self::Dos { .. } => "DOS",
        }
    }
}

impl MempoolError {
    /// Stable lowercase reason string for the RPC payload.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::FeeTooLow { .. } => "fee_too_low",
            Self::Oversize { .. } => "tx_too_large",
            Self::NonceGap { .. } => "nonce_gap",
            Self::WrongChain { .. } => "wrong_chain",
            Self::Replacement { .. } => "replacement_underpriced",
            Self::DuplicateTx { .. } => "duplicate_tx",
            Self::PoolFull { .. } => "pool_full",
            Self::Dos { .. } => "dos_violation",
        }
    }

    /// Structured context carried in the RPC payload.
    pub fn context(&self) -> Json {
        match self {
            Self::FeeTooLow {
                offered_gas_price_wei,
                min_required_wei,
            } => json!({
                "offered_gas_price_wei": offered_gas_price_wei,
                "min_required_wei": min_required_wei,
            }),
            Self::Oversize {
                size_bytes,
                max_bytes,
            } => json!({
                "size_bytes": size_bytes,
                "max_bytes": max_bytes,
            }),
            Self::NonceGap {
                expected_nonce,
                got_nonce,
            } => json!({
                "expected_nonce": expected_nonce,
                "got_nonce": got_nonce,
            }),
            Self::WrongChain { expected, got } => json!({
                "expected_chain_id": expected,
                "got_chain_id": got,
            }),
            Self::Replacement {
                required_bump,
                current_effective_gas_price_wei,
                offered_effective_gas_price_wei,
            } => json!({
                "required_bump": required_bump,
                "current_effective_gas_price_wei": current_effective_gas_price_wei,
                "offered_effective_gas_price_wei": offered_effective_gas_price_wei,
            }),
            Self::DuplicateTx { tx_hash } => json!({ "tx_hash": tx_hash }),
            Self::PoolFull { capacity } => json!({ "capacity": capacity }),
            Self::Dos { detail } => json!({ "detail": detail }),
        }
    }

    /// The full `{code, reason, message, context}` payload embedded in RPC
    /// error data.
    pub fn payload(&self) -> Json {
        json!({
            "code": self.code(),
            "reason": self.reason(),
            "message": self.to_string(),
            "context": self.context(),
        })
    }
}

/// Errors raised when loading or validating a PoIES policy.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PolicyError {
    /// A per-kind weight is outside `[0, 1]`.
    #[error("weight for {kind} out of range: {value}")]
    WeightOutOfRange {
        /// The offending proof kind name.
        kind: &'static str,
        /// The rejected weight.
        value: f64,
    },
    /// The weights sum to more than 1.
    #[error("weights sum to {sum}, must be ≤ 1")]
    WeightSumExceeded {
        /// The actual sum of weights.
        sum: f64,
    },
    /// A per-kind cap is negative or non-finite.
    #[error("cap for {kind} invalid: {value}")]
    CapInvalid {
        /// The offending proof kind name.
        kind: &'static str,
        /// The rejected cap.
        value: f64,
    },
    /// The total Γ cap is non-positive or non-finite.
    #[error("gamma cap invalid: {0}")]
    GammaCapInvalid(f64),
    /// The escort parameter is outside `(0, 1]`.
    #[error("escort_q {0} outside (0, 1]")]
    EscortOutOfRange(f64),
}

impl ErrorCode for PolicyError {
    fn code(&self) -> &'static str {
        match self {
            Self::WeightOutOfRange { .. } => "POLICY_WEIGHT_OUT_OF_RANGE",
            Self::WeightSumExceeded { .. } => "POLICY_WEIGHT_SUM_EXCEEDED",
            Self::CapInvalid { .. } => "POLICY_CAP_INVALID",
            Self::GammaCapInvalid(_) => "POLICY_GAMMA_CAP_INVALID",
            Self::EscortOutOfRange(_) => "POLICY_ESCORT_OUT_OF_RANGE",
        }
    }
}

/// Errors from the data-availability engine.
#[derive(Debug, Error)]
pub enum DAError {
    /// Recomputed commitment root does not match the stored root.
    #[error("commitment root mismatch")]
    CommitmentMismatch,
    /// Not enough shard data to reconstruct the committed length.
    #[error("insufficient shard data: have {have} bytes, need {need}")]
    Insufficient {
        /// Bytes recovered from the provided shards.
        have: usize,
        /// Bytes the commitment requires.
        need: usize,
    },
    /// The namespace collides with the reserved padding namespace.
    #[error("namespace {0:#x} out of the committable range")]
    NamespaceRange(u64),
    /// The blob exceeds the configured maximum size.
    #[error("blob of {size} bytes exceeds the {max} byte limit")]
    BlobTooLarge {
        /// The offending blob size.
        size: usize,
        /// The configured maximum.
        max: usize,
    },
    /// Invalid chunking or sampling parameter.
    #[error("invalid DA parameter: {0}")]
    InvalidParameter(String),
    /// An I/O failure in the blob store.
    #[error("blob store I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The requested blob is not present in the store.
    #[error("blob {0} not found in store")]
    NotFound(String),
}

impl ErrorCode for DAError {
    fn code(&self) -> &'static str {
        match self {
            Self::CommitmentMismatch => "DA_COMMITMENT_MISMATCH",
            Self::Insufficient { .. } => "DA_INSUFFICIENT_SHARDS",
            Self::NamespaceRange(_) => "DA_NAMESPACE_RANGE",
            Self::BlobTooLarge { .. } => "DA_BLOB_TOO_LARGE",
            Self::InvalidParameter(_) => "DA_INVALID_PARAMETER",
            Self::Io(_) => "DA_IO_ERROR",
            Self::NotFound(_) => "DA_BLOB_NOT_FOUND",
        }
    }
}

/// Errors from the randomness round state machine and VDF.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RandomnessError {
    /// A commit was malformed or the sender already committed this round.
    #[error("invalid commit: {0}")]
    Commit(String),
    /// The revealed (salt, payload) does not hash to the stored commitment.
    #[error("reveal does not match the stored commitment")]
    RevealMismatch,
    /// The operation arrived after its phase deadline.
    #[error("phase expired: {0}")]
    PhaseExpired(String),
    /// VDF proof verification failed.
    #[error("VDF proof invalid")]
    VdfInvalid,
    /// The requested round is unknown or not yet finalized.
    #[error("round {0} has no finalized beacon")]
    NotFinalized(u64),
}

impl ErrorCode for RandomnessError {
    fn code(&self) -> &'static str {
        match self {
            Self::Commit(_) => "RAND_COMMIT_INVALID",
            Self::RevealMismatch => "RAND_REVEAL_MISMATCH",
            Self::PhaseExpired(_) => "RAND_PHASE_EXPIRED",
            Self::VdfInvalid => "RAND_VDF_INVALID",
            Self::NotFinalized(_) => "RAND_NOT_FINALIZED",
        }
    }
}

/// Errors from header assembly and block verification.
#[derive(Debug, Error)]
pub enum BlockError {
    /// The header's tx root does not match the listed transactions.
    #[error("tx root mismatch: expected {expected}, got {got}")]
    TxRootMismatch {
        /// Hex of the recomputed root.
        expected: String,
        /// Hex of the root in the header.
        got: String,
    },
    /// The header's DA root does not match the listed blob commitments.
    #[error("DA root mismatch: expected {expected}, got {got}")]
    DaRootMismatch {
        /// Hex of the recomputed root.
        expected: String,
        /// Hex of the root in the header.
        got: String,
    },
    /// The aggregate Γ exceeds the policy cap.
    #[error("gamma {gamma_micro}µ exceeds the cap {cap_micro}µ")]
    GammaExceedsCap {
        /// The block's Γ in micro-units.
        gamma_micro: i64,
        /// The policy cap in micro-units.
        cap_micro: i64,
    },
    /// A proof kind's selected ψ sum exceeds its per-type cap.
    #[error("proof kind {kind} ψ sum {sum} exceeds cap {cap}")]
    PerTypeCapExceeded {
        /// The offending proof kind name.
        kind: &'static str,
        /// The selected ψ sum.
        sum: f64,
        /// The per-type cap.
        cap: f64,
    },
    /// The beacon for the round covering this height is not finalized.
    #[error("beacon not finalized for round {round_id} covering height {height}")]
    BeaconNotReady {
        /// The round mapped from the block height.
        round_id: u64,
        /// The block height being assembled.
        height: u64,
    },
    /// The proposer signature failed verification.
    #[error("invalid proposer signature")]
    InvalidSignature,
    /// A generic invariant violation during assembly.
    #[error("invalid block: {0}")]
    Invalid(String),
}

impl ErrorCode for BlockError {
    fn code(&self) -> &'static str {
        match self {
            Self::TxRootMismatch { .. } => "BLOCK_TX_ROOT_MISMATCH",
            Self::DaRootMismatch { .. } => "BLOCK_DA_ROOT_MISMATCH",
            Self::GammaExceedsCap { .. } => "BLOCK_GAMMA_EXCEEDS_CAP",
            Self::PerTypeCapExceeded { .. } => "BLOCK_PER_TYPE_CAP_EXCEEDED",
            Self::BeaconNotReady { .. } => "BLOCK_BEACON_NOT_READY",
            Self::InvalidSignature => "BLOCK_INVALID_SIGNATURE",
            Self::Invalid(_) => "BLOCK_INVALID",
        }
    }
}

/// Errors surfaced by RPC method handlers.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The parameters provided in the request were invalid.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),
    /// A mempool rejection, carrying the structured admission payload.
    #[error("transaction rejected: {0}")]
    Mempool(#[from] MempoolError),
    /// A data-availability failure.
    #[error("DA error: {0}")]
    Da(#[from] DAError),
    /// A randomness round failure.
    #[error("randomness error: {0}")]
    Randomness(#[from] RandomnessError),
    /// The requested object does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// An internal error while processing the request.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ErrorCode for RpcError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidParams(_) => "RPC_INVALID_PARAMS",
            Self::Mempool(e) => e.code(),
            Self::Da(e) => e.code(),
            Self::Randomness(e) => e.code(),
            Self::NotFound(_) => "RPC_NOT_FOUND",
            Self::Internal(_) => "RPC_INTERNAL_ERROR",
        }
    }
}

/// General errors for top-level node services.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A decoding failure.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
    /// An address failure.
    #[error("address error: {0}")]
    Address(#[from] AddressError),
    /// A configuration problem detected at boot.
    #[error("configuration error: {0}")]
    Config(String),
    /// A custom, unspecified error.
    #[error("{0}")]
    Custom(String),
}

impl ErrorCode for CoreError {
    fn code(&self) -> &'static str {
        match self {
            Self::Decode(_) => "CORE_DECODE_ERROR",
            Self::Address(_) => "CORE_ADDRESS_ERROR",
            Self::Config(_) => "CORE_CONFIG_ERROR",
            Self::Custom(_) => "CORE_CUSTOM_ERROR",
        }
    }
}
