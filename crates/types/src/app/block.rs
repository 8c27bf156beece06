//! Blocks, headers, and blob commitments.

use crate::address::Address;
use crate::app::proof::ProofCandidate;
use crate::app::transaction::{Signature, Transaction};
use crate::codec::{self, FromCanonical, ToCanonical, Value};
use crate::error::DecodeError;
use crate::hash::{self, Hash32, DOMAIN_HEADER};
use serde::{Deserialize, Serialize};

/// A commitment to one namespaced blob: the NMT root plus the metadata a
/// light client needs to sample it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobCommitment {
    /// The blob's namespace.
    pub namespace: u64,
    /// The original blob length in bytes.
    pub size: u64,
    /// The NMT root over the blob's chunks.
    pub root: Hash32,
    /// How many chunks the blob split into.
    pub chunk_count: u64,
}

impl BlobCommitment {
    /// The length-delimited wire bytes aggregated into the block DA root.
    pub fn wire_bytes(&self) -> Vec<u8> {
        self.canonical_bytes()
    }
}

impl ToCanonical for BlobCommitment {
    fn to_value(&self) -> Value {
        Value::map([
            ("ns", Value::Unsigned(self.namespace as u128)),
            ("size", Value::Unsigned(self.size as u128)),
            ("root", Value::Bytes(self.root.to_vec())),
            ("chunks", Value::Unsigned(self.chunk_count as u128)),
        ])
    }
}

impl FromCanonical for BlobCommitment {
    fn from_value(v: &Value) -> Result<Self, DecodeError> {
        Ok(BlobCommitment {
            namespace: codec::require_u64(v, "ns")?,
            size: codec::require_u64(v, "size")?,
            root: codec::require_hash32(v, "root")?,
            chunk_count: codec::require_u64(v, "chunks")?,
        })
    }
}

/// The canonical block header binding every subsystem's output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Header schema version.
    pub version: u64,
    /// Block height.
    pub height: u64,
    /// Hash of the parent header.
    pub parent: Hash32,
    /// UNIX timestamp in seconds.
    pub timestamp: u64,
    /// Merkle root over the block's transaction hashes.
    pub tx_root: Hash32,
    /// State root after executing this block.
    pub state_root: Hash32,
    /// Aggregated DA root over the block's blob commitments.
    pub da_root: Hash32,
    /// Beacon output of the randomness round covering this height.
    pub beacon_root: Hash32,
    /// The block's aggregate useful-work score Γ, in micro-units.
    pub poies_gamma_micro: i64,
    /// Root of the PoIES policy active for this block.
    pub policy_root: Hash32,
    /// The proposing account.
    pub proposer: Address,
    /// Proposer signature over `sign_bytes`.
    pub signature: Signature,
}

impl BlockHeader {
    fn body_value(&self) -> Value {
        let gamma = if self.poies_gamma_micro >= 0 {
            Value::Unsigned(self.poies_gamma_micro as u128)
        } else {
            Value::Negative((-(self.poies_gamma_micro as i128) - 1) as u128)
        };
        Value::map([
            ("version", Value::Unsigned(self.version as u128)),
            ("height", Value::Unsigned(self.height as u128)),
            ("parent", Value::Bytes(self.parent.to_vec())),
            ("timestamp", Value::Unsigned(self.timestamp as u128)),
            (
                "roots",
                Value::map([
                    ("tx", Value::Bytes(self.tx_root.to_vec())),
                    ("state", Value::Bytes(self.state_root.to_vec())),
                    ("da", Value::Bytes(self.da_root.to_vec())),
                    ("beacon", Value::Bytes(self.beacon_root.to_vec())),
                    ("policy", Value::Bytes(self.policy_root.to_vec())),
                ]),
            ),
            ("gammaMicro", gamma),
            ("proposer", self.proposer.to_value()),
        ])
    }

    /// The canonical bytes the proposer signs.
    pub fn sign_bytes(&self) -> Vec<u8> {
        codec::encode(&self.body_value())
    }

    /// The header hash: `SHA3-256("hdr" || sign_bytes)`.
    pub fn hash(&self) -> Hash32 {
        hash::sha3_256(DOMAIN_HEADER, &self.sign_bytes())
    }
}

impl ToCanonical for BlockHeader {
    fn to_value(&self) -> Value {
        let mut v = self.body_value();
        if let Value::Map(m) = &mut v {
            m.insert(
                "sig".to_string(),
                Value::map([
                    ("alg", Value::Unsigned(self.signature.alg_id as u128)),
                    ("bytes", Value::Bytes(self.signature.bytes.clone())),
                ]),
            );
        }
        v
    }
}

impl FromCanonical for BlockHeader {
    fn from_value(v: &Value) -> Result<Self, DecodeError> {
        let roots = codec::require(v, "roots")?;
        let gamma = match codec::require(v, "gammaMicro")? {
            Value::Unsigned(n) => i64::try_from(*n).map_err(|_| DecodeError {
                position: 0,
                reason: "gammaMicro out of range".into(),
            })?,
            Value::Negative(n) => {
                let mag = i128::try_from(*n).map_err(|_| DecodeError {
                    position: 0,
                    reason: "gammaMicro out of range".into(),
                })?;
                i64::try_from(-1 - mag).map_err(|_| DecodeError {
                    position: 0,
                    reason: "gammaMicro out of range".into(),
                })?
            }
            _ => {
                return Err(DecodeError {
                    position: 0,
                    reason: "gammaMicro must be an integer".into(),
                })
            }
        };
        let sig = codec::require(v, "sig")?;
        Ok(BlockHeader {
            version: codec::require_u64(v, "version")?,
            height: codec::require_u64(v, "height")?,
            parent: codec::require_hash32(v, "parent")?,
            timestamp: codec::require_u64(v, "timestamp")?,
            tx_root: codec::require_hash32(roots, "tx")?,
            state_root: codec::require_hash32(roots, "state")?,
            da_root: codec::require_hash32(roots, "da")?,
            beacon_root: codec::require_hash32(roots, "beacon")?,
            poies_gamma_micro: gamma,
            policy_root: codec::require_hash32(roots, "policy")?,
            proposer: Address::from_value(codec::require(v, "proposer")?)?,
            signature: Signature {
                alg_id: codec::require_u64(sig, "alg")? as u16,
                bytes: codec::require_bytes(sig, "bytes")?.to_vec(),
            },
        })
    }
}

/// A full block: header plus its transaction, proof, and blob payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// The canonical header.
    pub header: BlockHeader,
    /// Included transactions, in execution order.
    pub transactions: Vec<Transaction>,
    /// Selected PoIES proofs.
    pub proofs: Vec<ProofCandidate>,
    /// Blob commitments aggregated into `header.da_root`.
    pub blob_commitments: Vec<BlobCommitment>,
}

impl Block {
    /// Recomputes the tx merkle root over this block's transactions.
    pub fn compute_tx_root(&self) -> Hash32 {
        let hashes: Vec<Hash32> = self.transactions.iter().map(|tx| tx.hash()).collect();
        hash::tx_merkle_root(&hashes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::transaction::{Signature, TxKind};

    fn sample_header() -> BlockHeader {
        BlockHeader {
            version: 1,
            height: 12_345,
            parent: [0x01; 32],
            timestamp: 1_700_000_000,
            tx_root: [0x02; 32],
            state_root: [0x03; 32],
            da_root: [0x04; 32],
            beacon_root: [0x05; 32],
            poies_gamma_micro: 655_000,
            policy_root: [0x06; 32],
            proposer: Address::from_bytes(vec![0x33; 33]).unwrap(),
            signature: Signature {
                alg_id: 1,
                bytes: vec![0xEE; 48],
            },
        }
    }

    #[test]
    fn header_roundtrip_and_stable_hash() {
        let h = sample_header();
        let bytes = h.canonical_bytes();
        let back = BlockHeader::from_canonical_bytes(&bytes).unwrap();
        assert_eq!(back, h);
        assert_eq!(back.hash(), h.hash());
    }

    #[test]
    fn header_hash_ignores_signature_but_binds_roots() {
        let h = sample_header();
        let mut resigned = h.clone();
        resigned.signature.bytes = vec![0xFF; 48];
        assert_eq!(h.hash(), resigned.hash());

        let mut other_da = h.clone();
        other_da.da_root = [0xAA; 32];
        assert_ne!(h.hash(), other_da.hash());

        let mut other_beacon = h.clone();
        other_beacon.beacon_root = [0xBB; 32];
        assert_ne!(h.hash(), other_beacon.hash());
    }

    #[test]
    fn blob_commitment_roundtrip() {
        let c = BlobCommitment {
            namespace: 0xAA,
            size: 4096,
            root: [0x07; 32],
            chunk_count: 16,
        };
        let back = BlobCommitment::from_canonical_bytes(&c.wire_bytes()).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn block_tx_root_tracks_transactions() {
        let tx = Transaction {
            chain_id: 1,
            sender: Address::from_bytes(vec![0x11; 33]).unwrap(),
            nonce: 0,
            to: None,
            value: 0,
            kind: TxKind::Deploy,
            gas_limit: 100_000,
            max_fee_wei: 5,
            data: vec![1, 2, 3],
            signature: Signature {
                alg_id: 1,
                bytes: vec![],
            },
        };
        let mut block = Block {
            header: sample_header(),
            transactions: vec![tx.clone()],
            proofs: vec![],
            blob_commitments: vec![],
        };
        let one = block.compute_tx_root();
        block.transactions.push(tx);
        assert_ne!(one, block.compute_tx_root());
    }
}
