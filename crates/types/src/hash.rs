//! Domain-separated SHA3-256 hashing.
//!
//! Every hashed object kind carries a fixed ASCII domain tag so digests from
//! different contexts can never collide. The tags are consensus constants;
//! changing one is a hard fork.

use sha3::{Digest, Sha3_256};

/// A 32-byte SHA3-256 digest.
pub type Hash32 = [u8; 32];

/// Domain tag for transaction hashes.
pub const DOMAIN_TX: &[u8] = b"tx";
/// Domain tag for block header hashes.
pub const DOMAIN_HEADER: &[u8] = b"hdr";
/// Domain tag for full block hashes.
pub const DOMAIN_BLOCK: &[u8] = b"block";
/// Domain tag for NMT leaf nodes.
pub const DOMAIN_NMT_LEAF: &[u8] = b"NMT:leaf:v1\x00";
/// Domain tag for NMT inner nodes.
pub const DOMAIN_NMT_NODE: &[u8] = b"NMT:node:v1\x00";
/// Domain tag for the block-level DA root aggregation.
pub const DOMAIN_DA_ROOT: &[u8] = b"animica:daRoot:v1|";
/// Domain tag for randomness commitments.
pub const DOMAIN_RAND_COMMIT: &[u8] = b"animica:rand:commit|";
/// Domain tag for the randomness round aggregate.
pub const DOMAIN_RAND_AGG: &[u8] = b"rand:agg|";
/// Domain tag for the beacon output.
pub const DOMAIN_RAND_BEACON: &[u8] = b"rand:beacon|";
/// Domain tag for the PoIES policy root.
pub const DOMAIN_POIES_POLICY: &[u8] = b"animica:poies:policy:v1|";
/// Domain tag for the transaction merkle root.
pub const DOMAIN_TX_ROOT: &[u8] = b"animica:txRoot:v1\x00";

/// Computes `SHA3-256(domain || bytes)`.
pub fn sha3_256(domain: &[u8], bytes: &[u8]) -> Hash32 {
    let mut h = Sha3_256::new();
    h.update(domain);
    h.update(bytes);
    h.finalize().into()
}

/// Computes `SHA3-256` over multiple segments under one domain tag.
pub fn sha3_256_multi(domain: &[u8], parts: &[&[u8]]) -> Hash32 {
    let mut h = Sha3_256::new();
    h.update(domain);
    for p in parts {
        h.update(p);
    }
    h.finalize().into()
}

/// Computes the binary merkle root over an ordered list of transaction
/// hashes.
///
/// Leaves hash as `SHA3-256(domain || 0x00 || leaf)` and inner nodes as
/// `SHA3-256(domain || 0x01 || left || right)`; an odd node at any level is
/// promoted unchanged. The empty list hashes to `SHA3-256(domain)`.
pub fn tx_merkle_root(tx_hashes: &[Hash32]) -> Hash32 {
    if tx_hashes.is_empty() {
        return sha3_256(DOMAIN_TX_ROOT, &[]);
    }
    let mut level: Vec<Hash32> = tx_hashes
        .iter()
        .map(|h| sha3_256_multi(DOMAIN_TX_ROOT, &[&[0x00], h]))
        .collect();
    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len().div_ceil(2));
        for pair in level.chunks(2) {
            if pair.len() == 2 {
                next.push(sha3_256_multi(DOMAIN_TX_ROOT, &[&[0x01], &pair[0], &pair[1]]));
            } else {
                next.push(pair[0]);
            }
        }
        level = next;
    }
    level[0]
}
