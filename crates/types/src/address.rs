//! Bech32m addresses with a chain-scoped human-readable prefix.
//!
//! An address is an opaque 20- or 33-byte payload (depending on the
//! signature algorithm) whose canonical string form is lowercase bech32m.
//! Decoding accepts an all-uppercase string and normalizes it; mixed case
//! is rejected by the checksum layer. The HRP is validated against the
//! configured chain prefix when one is supplied.

use crate::codec::{FromCanonical, ToCanonical, Value};
use crate::error::{AddressError, DecodeError};
use bech32::primitives::decode::CheckedHrpstring;
use bech32::{Bech32m, Hrp};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Payload length of hash-based (Dilithium3-derived) addresses.
pub const ADDRESS_LEN_HASH: usize = 20;
/// Payload length of key-embedding (SPHINCS+-derived) addresses.
pub const ADDRESS_LEN_KEY: usize = 33;

/// An opaque account address.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(Vec<u8>);

impl Address {
    /// Wraps raw payload bytes, validating the length.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self, AddressError> {
        let bytes = bytes.into();
        match bytes.len() {
            ADDRESS_LEN_HASH | ADDRESS_LEN_KEY => Ok(Self(bytes)),
            got => Err(AddressError::InvalidLength { got }),
        }
    }

    /// The raw payload bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Encodes the address as lowercase bech32m under `hrp`.
    pub fn encode(&self, hrp: &str) -> Result<String, AddressError> {
        let hrp = Hrp::parse(hrp).map_err(|e| AddressError::Encoding(e.to_string()))?;
        bech32::encode::<Bech32m>(hrp, &self.0).map_err(|e| AddressError::Encoding(e.to_string()))
    }

    /// Decodes a bech32m string, optionally enforcing an expected HRP.
    ///
    /// Returns the decoded HRP (normalized to lowercase) alongside the
    /// address so callers without an expectation can still inspect it.
    pub fn decode(s: &str, expected_hrp: Option<&str>) -> Result<(String, Self), AddressError> {
        let checked = CheckedHrpstring::new::<Bech32m>(s)
            .map_err(|e| AddressError::Encoding(e.to_string()))?;
        let hrp = checked.hrp().to_string().to_lowercase();
        if let Some(expected) = expected_hrp {
            if hrp != expected {
                return Err(AddressError::HrpMismatch {
                    expected: expected.to_string(),
                    got: hrp,
                });
            }
        }
        let payload: Vec<u8> = checked.byte_iter().collect();
        Ok((hrp, Self::from_bytes(payload)?))
    }

    /// Returns `true` if `s` is a valid address under the expected HRP.
    pub fn validate(s: &str, expected_hrp: Option<&str>) -> bool {
        Self::decode(s, expected_hrp).is_ok()
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address(0x{})", hex::encode(&self.0))
    }
}

impl ToCanonical for Address {
    fn to_value(&self) -> Value {
        Value::Bytes(self.0.clone())
    }
}

impl FromCanonical for Address {
    fn from_value(v: &Value) -> Result<Self, DecodeError> {
        let bytes = v.as_bytes().ok_or_else(|| DecodeError {
            position: 0,
            reason: "address must be a byte string".into(),
        })?;
        Self::from_bytes(bytes.to_vec()).map_err(|e| DecodeError {
            position: 0,
            reason: e.to_string(),
        })
    }
}
