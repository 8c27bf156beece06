//! The canonical transaction model.

use crate::address::Address;
use crate::codec::{self, FromCanonical, ToCanonical, Value};
use crate::error::DecodeError;
use crate::hash::{self, Hash32, DOMAIN_TX};
use serde::{Deserialize, Serialize};

/// Stable algorithm id for Dilithium3 signatures.
pub const ALG_DILITHIUM3: u16 = 1;
/// Stable algorithm id for SPHINCS+ signatures.
pub const ALG_SPHINCS_PLUS: u16 = 2;

/// What a transaction does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxKind {
    /// Moves value between accounts.
    Transfer,
    /// Deploys contract code carried in `data`.
    Deploy,
    /// Calls an existing contract.
    Call,
}

impl TxKind {
    /// Stable wire name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            TxKind::Transfer => "transfer",
            TxKind::Deploy => "deploy",
            TxKind::Call => "call",
        }
    }

    fn from_str(s: &str) -> Option<Self> {
        match s {
            "transfer" => Some(TxKind::Transfer),
            "deploy" => Some(TxKind::Deploy),
            "call" => Some(TxKind::Call),
            _ => None,
        }
    }
}

/// An opaque post-quantum signature with its algorithm id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// The signature scheme identifier (`ALG_DILITHIUM3`, `ALG_SPHINCS_PLUS`).
    pub alg_id: u16,
    /// Raw signature bytes, opaque to the core.
    pub bytes: Vec<u8>,
}

/// Verifier seam for post-quantum signatures.
///
/// The core never inspects signature internals; a node wires in a concrete
/// verifier per algorithm id, and tests use an always-accept fake.
pub trait SignatureVerifier: Send + Sync {
    /// Verifies `signature` over `message` for `signer` under `alg_id`.
    fn verify(&self, alg_id: u16, signer: &Address, message: &[u8], signature: &[u8]) -> bool;
}

/// A canonical transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// The chain this transaction is bound to.
    pub chain_id: u64,
    /// The sending account.
    pub sender: Address,
    /// The sender's account nonce.
    pub nonce: u64,
    /// The destination, absent for deployments.
    pub to: Option<Address>,
    /// Value transferred, in wei.
    pub value: u128,
    /// What the transaction does.
    pub kind: TxKind,
    /// Gas limit for execution.
    pub gas_limit: u64,
    /// Maximum fee per gas the sender will pay, in wei.
    pub max_fee_wei: u128,
    /// Call data or contract code.
    pub data: Vec<u8>,
    /// The sender's signature over `sign_bytes`.
    pub signature: Signature,
}

impl Transaction {
    fn body_value(&self) -> Value {
        Value::map([
            ("chainId", Value::Unsigned(self.chain_id as u128)),
            ("from", self.sender.to_value()),
            ("nonce", Value::Unsigned(self.nonce as u128)),
            (
                "to",
                match &self.to {
                    Some(addr) => addr.to_value(),
                    None => Value::Null,
                },
            ),
            ("value", Value::Unsigned(self.value)),
            ("type", Value::Text(self.kind.as_str().to_string())),
            ("gas", Value::Unsigned(self.gas_limit as u128)),
            ("maxFee", Value::Unsigned(self.max_fee_wei)),
            ("data", Value::Bytes(self.data.clone())),
        ])
    }

    /// The canonical bytes the sender signs: the encoded transaction without
    /// its signature field.
    pub fn sign_bytes(&self) -> Vec<u8> {
        codec::encode(&self.body_value())
    }

    /// The transaction hash: `SHA3-256("tx" || sign_bytes)`.
    pub fn hash(&self) -> Hash32 {
        hash::sha3_256(DOMAIN_TX, &self.sign_bytes())
    }

    /// Encoded wire size of the full transaction, signature included.
    pub fn encoded_size(&self) -> usize {
        self.canonical_bytes().len()
    }
}

impl ToCanonical for Transaction {
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

impl FromCanonical for Transaction {
    fn from_value(v: &Value) -> Result<Self, DecodeError> {
        let to = match codec::require(v, "to")? {
            Value::Null => None,
            other => Some(Address::from_value(other)?),
        };
        let kind_str = codec::require_text(v, "type")?;
        let kind = TxKind::from_str(kind_str).ok_or_else(|| DecodeError {
            position: 0,
            reason: format!("unknown transaction type '{kind_str}'"),
        })?;
        let sig = codec::require(v, "sig")?;
        let alg_id = codec::require_u64(sig, "alg")?;
        let alg_id = u16::try_from(alg_id).map_err(|_| DecodeError {
            position: 0,
            reason: "signature algorithm id out of range".into(),
        })?;
        Ok(Transaction {
            chain_id: codec::require_u64(v, "chainId")?,
            sender: Address::from_value(codec::require(v, "from")?)?,
            nonce: codec::require_u64(v, "nonce")?,
            to,
            value: codec::require_u128(v, "value")?,
            kind,
            gas_limit: codec::require_u64(v, "gas")?,
            max_fee_wei: codec::require_u128(v, "maxFee")?,
            data: codec::require_bytes(v, "data")?.to_vec(),
            signature: Signature {
                alg_id,
                bytes: codec::require_bytes(sig, "bytes")?.to_vec(),
            },
        })
    }
}
