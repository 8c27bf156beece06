//! Aggregate and beacon derivations, and the height→round mapping.

use animica_types::hash::{
    sha3_256_multi, Hash32, DOMAIN_RAND_AGG, DOMAIN_RAND_BEACON, DOMAIN_RAND_COMMIT,
};

/// The 32-bit wire tag of a round id, as fixed by the aggregation layout.
fn round_tag(round_id: u64) -> [u8; 4] {
    (round_id as u32).to_be_bytes()
}

/// A participant's commitment:
/// `SHA3-256("animica:rand:commit|" || addr || salt || payload)`.
pub fn commitment_digest(addr: &[u8], salt: &[u8], payload: &[u8]) -> Hash32 {
    sha3_256_multi(DOMAIN_RAND_COMMIT, &[addr, salt, payload])
}

/// Aggregates a round's committed set:
/// `SHA3-256("rand:agg|" || u32be(round_id) || commitments sorted ascending)`.
///
/// Sorting by commitment hex equals sorting by commitment bytes, so the
/// aggregate is independent of commit arrival order.
pub fn aggregate_commitments<'a, I>(round_id: u64, commitments: I) -> Hash32
where
    I: IntoIterator<Item = &'a Hash32>,
{
    let mut sorted: Vec<&Hash32> = commitments.into_iter().collect();
    sorted.sort();
    let tag = round_tag(round_id);
    let mut parts: Vec<&[u8]> = Vec::with_capacity(sorted.len() + 1);
    parts.push(&tag);
    for c in &sorted {
        parts.push(c.as_slice());
    }
    sha3_256_multi(DOMAIN_RAND_AGG, &parts)
}

/// The beacon output:
/// `SHA3-256("rand:beacon|" || u32be(round_id) || y || qrng_mix?)`.
pub fn beacon_output(round_id: u64, vdf_output: &[u8], qrng_mix: Option<&[u8]>) -> Hash32 {
    let tag = round_tag(round_id);
    match qrng_mix {
        Some(mix) => sha3_256_multi(DOMAIN_RAND_BEACON, &[&tag, vdf_output, mix]),
        None => sha3_256_multi(DOMAIN_RAND_BEACON, &[&tag, vdf_output]),
    }
}

/// Maps a block height to the randomness round whose beacon it references.
pub fn round_for_height(height: u64, blocks_per_round: u64) -> u64 {
    height / blocks_per_round.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commitment_binds_every_input() {
        let base = commitment_digest(b"addr", &[0xAA; 32], b"hi");
        assert_ne!(base, commitment_digest(b"adds", &[0xAA; 32], b"hi"));
        assert_ne!(base, commitment_digest(b"addr", &[0xAB; 32], b"hi"));
        assert_ne!(base, commitment_digest(b"addr", &[0xAA; 32], b"ho"));
        assert_eq!(base, commitment_digest(b"addr", &[0xAA; 32], b"hi"));
    }

    #[test]
    fn aggregate_is_order_independent_over_the_committed_set() {
        let a = commitment_digest(b"a", &[1; 32], b"x");
        let b = commitment_digest(b"b", &[2; 32], b"y");
        let c = commitment_digest(b"c", &[3; 32], b"z");

        let fwd = aggregate_commitments(7, [&a, &b, &c]);
        let rev = aggregate_commitments(7, [&c, &b, &a]);
        assert_eq!(fwd, rev);

        // Round id and set membership both bind.
        assert_ne!(fwd, aggregate_commitments(8, [&a, &b, &c]));
        assert_ne!(fwd, aggregate_commitments(7, [&a, &b]));
    }

    #[test]
    fn beacon_binds_round_output_and_mix() {
        let base = beacon_output(1, b"vdf-y", None);
        assert_ne!(base, beacon_output(2, b"vdf-y", None));
        assert_ne!(base, beacon_output(1, b"vdf-z", None));
        assert_ne!(base, beacon_output(1, b"vdf-y", Some(b"qrng")));
    }

    #[test]
    fn height_round_mapping() {
        assert_eq!(round_for_height(0, 32), 0);
        assert_eq!(round_for_height(31, 32), 0);
        assert_eq!(round_for_height(32, 32), 1);
        assert_eq!(round_for_height(1_000, 32), 31);
        // A degenerate zero divisor clamps to one block per round.
        assert_eq!(round_for_height(5, 0), 5);
    }
}
