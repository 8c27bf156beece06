//! Header assembly and block invariant verification.
//!
//! The assembler recomputes every root it binds rather than trusting caller
//! inputs: a header leaves this module only if its tx root matches the listed
//! transactions, its DA root matches the listed commitments, Γ fits the
//! active policy, and the beacon for the covering round is finalized.

use animica_da::commitment::da_root;
use animica_poies::{PoiesPolicy, Selection};
use animica_randomness::RandomnessService;
use animica_telemetry::ScopeTimer;
use animica_types::address::Address;
use animica_types::app::{
    Block, BlockHeader, BlobCommitment, ProofKind, Signature, SignatureVerifier, Transaction,
};
use animica_types::error::{BlockError, RandomnessError};
use animica_types::hash::{tx_merkle_root, Hash32};
use tracing::info;

/// Proposer signing seam; concrete PQ signers live outside the core.
pub trait HeaderSigner: Send + Sync {
    /// The signature algorithm id this signer produces.
    fn alg_id(&self) -> u16;
    /// The proposer's address.
    fn address(&self) -> Address;
    /// Signs the canonical header bytes.
    fn sign(&self, message: &[u8]) -> Vec<u8>;
}

/// Source of finalized beacons for the height→round mapping.
pub trait BeaconSource: Send + Sync {
    /// The finalized beacon covering `height`.
    fn beacon_for_height(&self, height: u64) -> Result<Hash32, RandomnessError>;
    /// The round id covering `height`.
    fn round_for_height(&self, height: u64) -> u64;
}

impl BeaconSource for RandomnessService {
    fn beacon_for_height(&self, height: u64) -> Result<Hash32, RandomnessError> {
        RandomnessService::beacon_for_height(self, height)
    }

    fn round_for_height(&self, height: u64) -> u64 {
        animica_randomness::round_for_height(height, self.blocks_per_round())
    }
}

/// Everything the assembler binds into a header.
#[derive(Debug, Clone)]
pub struct HeaderInputs {
    /// Header schema version.
    pub version: u64,
    /// The height being produced.
    pub height: u64,
    /// Parent header hash.
    pub parent: Hash32,
    /// Block timestamp, UNIX seconds.
    pub timestamp: u64,
    /// State root after executing the block.
    pub state_root: Hash32,
    /// Transactions in execution order.
    pub transactions: Vec<Transaction>,
    /// The PoIES selection for this block.
    pub selection: Selection,
    /// Blob commitments carried by the block.
    pub blob_commitments: Vec<BlobCommitment>,
}

/// Assembles canonical headers under one policy.
pub struct HeaderAssembler {
    policy: PoiesPolicy,
}

impl HeaderAssembler {
    /// Creates an assembler bound to the active policy.
    pub fn new(policy: PoiesPolicy) -> Self {
        Self { policy }
    }

    /// Builds and signs a block from component outputs.
    pub fn assemble(
        &self,
        inputs: HeaderInputs,
        beacons: &dyn BeaconSource,
        signer: &dyn HeaderSigner,
    ) -> Result<Block, BlockError> {
        let _timer = ScopeTimer::new("assemble_header");
        let gamma_micro = inputs.selection.gamma_micro();
        let cap_micro = (self.policy.gamma_cap * 1_000_000.0).round() as i64;
        if gamma_micro > cap_micro {
            return Err(BlockError::GammaExceedsCap {
                gamma_micro,
                cap_micro,
            });
        }
        for (&kind, &sum) in &inputs.selection.psi_by_kind {
            let cap = self.policy.cap(kind);
            if sum > cap + 1e-9 {
                return Err(BlockError::PerTypeCapExceeded {
                    kind: kind.as_str(),
                    sum,
                    cap,
                });
            }
        }

        let beacon_root = beacons.beacon_for_height(inputs.height).map_err(|_| {
            BlockError::BeaconNotReady {
                round_id: beacons.round_for_height(inputs.height),
                height: inputs.height,
            }
        })?;

        let tx_hashes: Vec<Hash32> = inputs.transactions.iter().map(|tx| tx.hash()).collect();
        let mut header = BlockHeader {
            version: inputs.version,
            height: inputs.height,
            parent: inputs.parent,
            timestamp: inputs.timestamp,
            tx_root: tx_merkle_root(&tx_hashes),
            state_root: inputs.state_root,
            da_root: da_root(&inputs.blob_commitments),
            beacon_root,
            poies_gamma_micro: gamma_micro,
            policy_root: self.policy.root(),
            proposer: signer.address(),
            signature: Signature {
                alg_id: signer.alg_id(),
                bytes: Vec::new(),
            },
        };
        header.signature.bytes = signer.sign(&header.sign_bytes());

        info!(
            height = header.height,
            gamma_micro,
            txs = inputs.transactions.len(),
            blobs = inputs.blob_commitments.len(),
            "header assembled"
        );

        Ok(Block {
            header,
            transactions: inputs.transactions,
            proofs: inputs.selection.selected,
            blob_commitments: inputs.blob_commitments,
        })
    }
}

/// Re-checks a block's structural invariants against a policy.
pub fn verify_block(block: &Block, policy: &PoiesPolicy) -> Result<(), BlockError> {
    let recomputed_tx = block.compute_tx_root();
    if recomputed_tx != block.header.tx_root {
        return Err(BlockError::TxRootMismatch {
            expected: hex::encode(recomputed_tx),
            got: hex::encode(block.header.tx_root),
        });
    }

    let recomputed_da = da_root(&block.blob_commitments);
    if recomputed_da != block.header.da_root {
        return Err(BlockError::DaRootMismatch {
            expected: hex::encode(recomputed_da),
            got: hex::encode(block.header.da_root),
        });
    }

    let mut psi_by_kind: std::collections::BTreeMap<ProofKind, f64> = Default::default();
    let mut gamma = 0.0;
    for proof in &block.proofs {
        *psi_by_kind.entry(proof.kind).or_default() += proof.psi;
        gamma += policy.weight(proof.kind) * proof.psi;
    }
    for (&kind, &sum) in &psi_by_kind {
        let cap = policy.cap(kind);
        if sum > cap + 1e-9 {
            return Err(BlockError::PerTypeCapExceeded {
                kind: kind.as_str(),
                sum,
                cap,
            });
        }
    }
    let gamma_micro = (gamma * 1_000_000.0).round() as i64;
    let cap_micro = (policy.gamma_cap * 1_000_000.0).round() as i64;
    if gamma_micro > cap_micro {
        return Err(BlockError::GammaExceedsCap {
            gamma_micro,
            cap_micro,
        });
    }
    if gamma_micro != block.header.poies_gamma_micro {
        return Err(BlockError::Invalid(format!(
            "header gamma {}µ does not match proofs ({gamma_micro}µ)",
            block.header.poies_gamma_micro
        )));
    }
    if block.header.policy_root != policy.root() {
        return Err(BlockError::Invalid("policy root mismatch".into()));
    }
    Ok(())
}

/// Verifies the proposer's signature over the canonical header bytes.
///
/// Kept separate from [`verify_block`] so structural validation stays usable
/// where no signature backend is wired (tests, explorers).
pub fn verify_proposer_signature(
    header: &BlockHeader,
    verifier: &dyn SignatureVerifier,
) -> Result<(), BlockError> {
    let ok = verifier.verify(
        header.signature.alg_id,
        &header.proposer,
        &header.sign_bytes(),
        &header.signature.bytes,
    );
    if ok {
        Ok(())
    } else {
        Err(BlockError::InvalidSignature)
    }
}
