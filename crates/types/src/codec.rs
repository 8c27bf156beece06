//! Canonical, deterministic CBOR codec for all consensus-critical objects.
//!
//! Every object that is hashed, signed, or carried in a block goes through
//! this module. The encoding is the deterministic CBOR profile: definite
//! lengths only, minimal-length integer heads, and map keys sorted by their
//! encoded bytes. There is no floating point on the wire. Centralizing the
//! codec in the base `types` crate ensures every component serializes state
//! identically, preventing consensus failures from divergent encodings.
//!
//! Decoding comes in two flavors: [`decode`] accepts non-canonical input
//! (unsorted or duplicate map keys) and re-encodes canonically, while
//! [`decode_strict`] rejects any deviation from the canonical form. Consensus
//! paths use strict decoding; RPC ingress uses the lenient form.

use crate::error::DecodeError;
use std::collections::BTreeMap;

/// Tag number for unsigned bignums (integers above `u64::MAX`).
const TAG_POS_BIGNUM: u64 = 2;
/// Tag number for negative bignums.
const TAG_NEG_BIGNUM: u64 = 3;

/// The wire value model. Maps carry text keys only; ordering is structural
/// (`BTreeMap`), so two semantically equal values encode identically no
/// matter the insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// CBOR null.
    Null,
    /// Boolean.
    Bool(bool),
    /// Non-negative integer. Values above `u64::MAX` encode as tagged bignums.
    Unsigned(u128),
    /// Negative integer, stored as `n` where the value is `-1 - n`.
    Negative(u128),
    /// Raw byte string.
    Bytes(Vec<u8>),
    /// UTF-8 text string.
    Text(String),
    /// Definite-length array.
    Array(Vec<Value>),
    /// String-keyed map with structural ordering.
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Builds a map value from an iterator of entries.
    pub fn map<I: IntoIterator<Item = (&'static str, Value)>>(entries: I) -> Value {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }

    /// Returns the value as `u64`, if it is an unsigned integer in range.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Unsigned(n) => u64::try_from(*n).ok(),
            _ => None,
        }
    }

    /// Returns the value as `u128`, if it is an unsigned integer.
    pub fn as_u128(&self) -> Option<u128> {
        match self {
            Value::Unsigned(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the value as a byte slice, if it is a byte string.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the value as a string slice, if it is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the value as an array slice, if it is an array.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Returns the value as a map reference, if it is a map.
    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Looks up `key` in a map value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map().and_then(|m| m.get(key))
    }
}

/// Objects with a canonical wire representation.
pub trait ToCanonical {
    /// Converts the object to its wire value.
    fn to_value(&self) -> Value;

    /// Encodes the object to canonical bytes.
    fn canonical_bytes(&self) -> Vec<u8> {
        encode(&self.to_value())
    }
}

/// Objects decodable from the canonical wire representation.
pub trait FromCanonical: Sized {
    /// Reconstructs the object from a wire value.
    fn from_value(v: &Value) -> Result<Self, DecodeError>;

    /// Decodes the object from canonical bytes (strict).
    fn from_canonical_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        let v = decode_strict(bytes)?;
        Self::from_value(&v)
    }
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Encodes a value into canonical CBOR bytes.
pub fn encode(v: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    write_value(&mut out, v);
    out
}

fn write_head(out: &mut Vec<u8>, major: u8, arg: u64) {
    let m = major << 5;
    if arg < 24 {
        out.push(m | arg as u8);
    } else if arg <= 0xff {
        out.push(m | 24);
        out.push(arg as u8);
    } else if arg <= 0xffff {
        out.push(m | 25);
        out.extend_from_slice(&(arg as u16).to_be_bytes());
    } else if arg <= 0xffff_ffff {
        out.push(m | 26);
        out.extend_from_slice(&(arg as u32).to_be_bytes());
    } else {
        out.push(m | 27);
        out.extend_from_slice(&arg.to_be_bytes());
    }
}

fn bignum_magnitude(n: u128) -> Vec<u8> {
    let be = n.to_be_bytes();
    let first = be.iter().position(|&b| b != 0).unwrap_or(be.len() - 1);
    be[first..].to_vec()
}

fn write_value(out: &mut Vec<u8>, v: &Value) {
    match v {
        Value::Null => out.push(0xf6),
        Value::Bool(false) => out.push(0xf4),
        Value::Bool(true) => out.push(0xf5),
        Value::Unsigned(n) => {
            if let Ok(small) = u64::try_from(*n) {
                write_head(out, 0, small);
            } else {
                write_head(out, 6, TAG_POS_BIGNUM);
                let mag = bignum_magnitude(*n);
                write_head(out, 2, mag.len() as u64);
                out.extend_from_slice(&mag);
            }
        }
        Value::Negative(n) => {
            if let Ok(small) = u64::try_from(*n) {
                write_head(out, 1, small);
            } else {
                write_head(out, 6, TAG_NEG_BIGNUM);
                let mag = bignum_magnitude(*n);
                write_head(out, 2, mag.len() as u64);
                out.extend_from_slice(&mag);
            }
        }
        Value::Bytes(b) => {
            write_head(out, 2, b.len() as u64);
            out.extend_from_slice(b);
        }
        Value::Text(s) => {
            write_head(out, 3, s.len() as u64);
            out.extend_from_slice(s.as_bytes());
        }
        Value::Array(items) => {
            write_head(out, 4, items.len() as u64);
            for item in items {
                write_value(out, item);
            }
        }
        Value::Map(entries) => {
            // Canonical map ordering sorts by the *encoded* key bytes, which
            // groups keys by length before comparing content. `BTreeMap`
            // iteration alone is not sufficient.
            let mut encoded: Vec<(Vec<u8>, &Value)> = entries
                .iter()
                .map(|(k, val)| {
                    let mut kb = Vec::with_capacity(k.len() + 2);
                    write_head(&mut kb, 3, k.len() as u64);
                    kb.extend_from_slice(k.as_bytes());
                    (kb, val)
                })
                .collect();
            encoded.sort_by(|a, b| a.0.cmp(&b.0));
            write_head(out, 5, encoded.len() as u64);
            for (kb, val) in encoded {
                out.extend_from_slice(&kb);
                write_value(out, val);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
    strict: bool,
}

impl<'a> Reader<'a> {
    fn err<T>(&self, reason: impl Into<String>) -> Result<T, DecodeError> {
        Err(DecodeError {
            position: self.pos,
            reason: reason.into(),
        })
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        if self.pos + n > self.buf.len() {
            return self.err("unexpected end of input");
        }
        let s = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(s)
    }

    fn byte(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    fn head(&mut self) -> Result<(u8, u64), DecodeError> {
        let start = self.pos;
        let b = self.byte()?;
        let major = b >> 5;
        let info = b & 0x1f;
        let arg = match info {
            0..=23 => info as u64,
            24 => {
                let v = self.byte()? as u64;
                if self.strict && v < 24 {
                    self.pos = start;
                    return self.err("non-minimal integer head");
                }
                v
            }
            25 => {
                let v = u16::from_be_bytes(self.take(2)?.try_into().unwrap()) as u64;
                if self.strict && v <= 0xff {
                    self.pos = start;
                    return self.err("non-minimal integer head");
                }
                v
            }
            26 => {
                let v = u32::from_be_bytes(self.take(4)?.try_into().unwrap()) as u64;
                if self.strict && v <= 0xffff {
                    self.pos = start;
                    return self.err("non-minimal integer head");
                }
                v
            }
            27 => {
                let v = u64::from_be_bytes(self.take(8)?.try_into().unwrap());
                if self.strict && v <= 0xffff_ffff {
                    self.pos = start;
                    return self.err("non-minimal integer head");
                }
                v
            }
            31 => return self.err("indefinite lengths are not canonical"),
            _ => return self.err(format!("reserved additional info {info}")),
        };
        Ok((major, arg))
    }

    fn bignum(&mut self, negative: bool) -> Result<Value, DecodeError> {
        let (major, len) = self.head()?;
        if major != 2 {
            return self.err("bignum tag must carry a byte string");
        }
        let raw = self.take(len as usize)?;
        if raw.len() > 16 {
            return self.err("bignum exceeds 128 bits");
        }
        if self.strict && raw.first() == Some(&0) {
            return self.err("bignum has leading zero byte");
        }
        let mut mag = [0u8; 16];
        mag[16 - raw.len()..].copy_from_slice(raw);
        let n = u128::from_be_bytes(mag);
        if self.strict && u64::try_from(n).is_ok() {
            return self.err("bignum encodable as a plain integer");
        }
        Ok(if negative {
            Value::Negative(n)
        } else {
            Value::Unsigned(n)
        })
    }

    fn value(&mut self, depth: usize) -> Result<Value, DecodeError> {
        if depth > 64 {
            return self.err("nesting depth exceeded");
        }
        let (major, arg) = self.head()?;
        match major {
            0 => Ok(Value::Unsigned(arg as u128)),
            1 => Ok(Value::Negative(arg as u128)),
            2 => Ok(Value::Bytes(self.take(arg as usize)?.to_vec())),
            3 => {
                let raw = self.take(arg as usize)?;
                let s = std::str::from_utf8(raw).map_err(|_| DecodeError {
                    position: self.pos,
                    reason: "invalid utf-8 in text string".into(),
                })?;
                Ok(Value::Text(s.to_string()))
            }
            4 => {
                let mut items = Vec::with_capacity((arg as usize).min(1024));
                for _ in 0..arg {
                    items.push(self.value(depth + 1)?);
                }
                Ok(Value::Array(items))
            }
            5 => {
                let mut map = BTreeMap::new();
                let mut prev_key: Option<Vec<u8>> = None;
                for _ in 0..arg {
                    let key_start = self.pos;
                    let key = match self.value(depth + 1)? {
                        Value::Text(s) => s,
                        _ => {
                            return Err(DecodeError {
                                position: key_start,
                                reason: "map keys must be text strings".into(),
                            })
                        }
                    };
                    let encoded_key = self.buf[key_start..self.pos].to_vec();
                    if self.strict {
                        if let Some(prev) = &prev_key {
                            if encoded_key <= *prev {
                                return Err(DecodeError {
                                    position: key_start,
                                    reason: "map keys not in canonical order".into(),
                                });
                            }
                        }
                        prev_key = Some(encoded_key);
                    }
                    let val = self.value(depth + 1)?;
                    if map.insert(key, val).is_some() && self.strict {
                        return Err(DecodeError {
                            position: key_start,
                            reason: "duplicate map key".into(),
                        });
                    }
                }
                Ok(Value::Map(map))
            }
            6 => match arg {
                TAG_POS_BIGNUM => self.bignum(false),
                TAG_NEG_BIGNUM => self.bignum(true),
                other => self.err(format!("unsupported tag {other}")),
            },
            7 => match arg {
                20 => Ok(Value::Bool(false)),
                21 => Ok(Value::Bool(true)),
                22 => Ok(Value::Null),
                _ => self.err(format!("unsupported simple value {arg}")),
            },
            _ => unreachable!("major type is 3 bits"),
        }
    }
}

fn decode_inner(bytes: &[u8], strict: bool) -> Result<Value, DecodeError> {
    let mut r = Reader {
        buf: bytes,
        pos: 0,
        strict,
    };
    let v = r.value(0)?;
    if r.pos != bytes.len() {
        return r.err("trailing bytes after value");
    }
    Ok(v)
}

/// Decodes CBOR bytes, accepting non-canonical input (duplicate or unsorted
/// map keys, non-minimal heads). Re-encoding the result yields canonical
/// bytes.
pub fn decode(bytes: &[u8]) -> Result<Value, DecodeError> {
    decode_inner(bytes, false)
}

/// Decodes CBOR bytes, rejecting any deviation from the canonical form.
pub fn decode_strict(bytes: &[u8]) -> Result<Value, DecodeError> {
    decode_inner(bytes, true)
}

// ---------------------------------------------------------------------------
// Value extraction helpers used by FromCanonical impls
// ---------------------------------------------------------------------------

/// Fetches a required map field, reporting the missing key by name.
pub fn require<'a>(v: &'a Value, key: &str) -> Result<&'a Value, DecodeError> {
    v.get(key).ok_or_else(|| DecodeError {
        position: 0,
        reason: format!("missing field '{key}'"),
    })
}

/// Fetches a required `u64` field.
pub fn require_u64(v: &Value, key: &str) -> Result<u64, DecodeError> {
    require(v, key)?.as_u64().ok_or_else(|| DecodeError {
        position: 0,
        reason: format!("field '{key}' is not a u64"),
    })
}

/// Fetches a required `u128` field.
pub fn require_u128(v: &Value, key: &str) -> Result<u128, DecodeError> {
    require(v, key)?.as_u128().ok_or_else(|| DecodeError {
        position: 0,
        reason: format!("field '{key}' is not a u128"),
    })
}

/// Fetches a required byte-string field.
pub fn require_bytes<'a>(v: &'a Value, key: &str) -> Result<&'a [u8], DecodeError> {
    require(v, key)?.as_bytes().ok_or_else(|| DecodeError {
        position: 0,
        reason: format!("field '{key}' is not a byte string"),
    })
}

/// Fetches a required text field.
pub fn require_text<'a>(v: &'a Value, key: &str) -> Result<&'a str, DecodeError> {
    require(v, key)?.as_text().ok_or_else(|| DecodeError {
        position: 0,
        reason: format!("field '{key}' is not text"),
    })
}

/// Fetches a required 32-byte field.
pub fn require_hash32(v: &Value, key: &str) -> Result<[u8; 32], DecodeError> {
    let raw = require_bytes(v, key)?;
    raw.try_into().map_err(|_| DecodeError {
        position: 0,
        reason: format!("field '{key}' is not 32 bytes"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Value {
        Value::map([
            ("chainId", Value::Unsigned(31337)),
            ("nonce", Value::Unsigned(7)),
            ("from", Value::Bytes(vec![0x11; 33])),
            ("data", Value::Bytes(b"hello, animica".to_vec())),
            (
                "roots",
                Value::map([
                    ("tx", Value::Bytes(vec![0x02; 32])),
                    ("state", Value::Bytes(vec![0x03; 32])),
                    ("da", Value::Bytes(vec![0x04; 32])),
                ]),
            ),
            (
                "parts",
                Value::Array(vec![Value::Unsigned(1), Value::Unsigned(2)]),
            ),
        ])
    }

    #[test]
    fn roundtrip_is_identity() {
        let v = sample();
        let bytes = encode(&v);
        let back = decode_strict(&bytes).unwrap();
        assert_eq!(v, back);
        assert_eq!(encode(&back), bytes, "decode→encode must be a fixed point");
    }

    #[test]
    fn insertion_order_does_not_matter() {
        let mut a = BTreeMap::new();
        a.insert("foo".to_string(), Value::Unsigned(1));
        a.insert("bar".to_string(), Value::Unsigned(2));
        a.insert("baz".to_string(), Value::Unsigned(3));
        let mut b = BTreeMap::new();
        b.insert("baz".to_string(), Value::Unsigned(3));
        b.insert("foo".to_string(), Value::Unsigned(1));
        b.insert("bar".to_string(), Value::Unsigned(2));
        assert_eq!(encode(&Value::Map(a)), encode(&Value::Map(b)));
    }

    #[test]
    fn integers_use_minimal_heads() {
        assert_eq!(encode(&Value::Unsigned(0)), vec![0x00]);
        assert_eq!(encode(&Value::Unsigned(23)), vec![0x17]);
        assert_eq!(encode(&Value::Unsigned(24)), vec![0x18, 24]);
        assert_eq!(encode(&Value::Unsigned(255)), vec![0x18, 0xff]);
        assert_eq!(encode(&Value::Unsigned(256)), vec![0x19, 0x01, 0x00]);
        assert_eq!(
            encode(&Value::Unsigned(u64::MAX as u128)),
            vec![0x1b, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]
        );
    }

    #[test]
    fn u128_values_encode_as_bignums() {
        let big = u64::MAX as u128 + 1;
        let bytes = encode(&Value::Unsigned(big));
        assert_eq!(bytes[0], 0xc2, "positive bignum tag");
        let back = decode_strict(&bytes).unwrap();
        assert_eq!(back, Value::Unsigned(big));
    }

    #[test]
    fn map_keys_sort_by_encoded_bytes() {
        // "b" is shorter than "ab" and must sort first in canonical CBOR.
        let v = Value::map([("ab", Value::Unsigned(1)), ("b", Value::Unsigned(2))]);
        let bytes = encode(&v);
        // head: map(2), then 0x61 'b', 0x02, then 0x62 'a' 'b', 0x01
        assert_eq!(bytes, vec![0xa2, 0x61, b'b', 0x02, 0x62, b'a', b'b', 0x01]);
        decode_strict(&bytes).unwrap();
    }

    #[test]
    fn strict_mode_rejects_unsorted_keys() {
        // map { "b": 1, "a": 2 } with keys out of canonical order.
        let raw = vec![0xa2, 0x61, b'b', 0x01, 0x61, b'a', 0x02];
        let err = decode_strict(&raw).unwrap_err();
        assert!(err.reason.contains("canonical order"), "{err:?}");
        // Lenient decode accepts it and canonicalizes on re-encode.
        let v = decode(&raw).unwrap();
        let reencoded = encode(&v);
        assert_eq!(reencoded, vec![0xa2, 0x61, b'a', 0x02, 0x61, b'b', 0x01]);
    }

    #[test]
    fn strict_mode_rejects_duplicate_keys() {
        let raw = vec![0xa2, 0x61, b'a', 0x01, 0x61, b'a', 0x02];
        assert!(decode_strict(&raw).is_err());
        // Lenient: last value wins, object still decodes.
        let v = decode(&raw).unwrap();
        assert_eq!(v.get("a"), Some(&Value::Unsigned(2)));
    }

    #[test]
    fn strict_mode_rejects_non_minimal_heads() {
        // 10 encoded with a one-byte argument instead of the immediate form.
        let raw = vec![0x18, 0x0a];
        assert!(decode_strict(&raw).is_err());
        assert_eq!(decode(&raw).unwrap(), Value::Unsigned(10));
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut raw = encode(&Value::Unsigned(1));
        raw.push(0x00);
        let err = decode(&raw).unwrap_err();
        assert!(err.reason.contains("trailing"));
    }

    #[test]
    fn decode_error_reports_position() {
        let raw = vec![0x62, b'a']; // text of length 2 with only 1 byte present
        let err = decode(&raw).unwrap_err();
        assert_eq!(err.position, 1);
    }
}
