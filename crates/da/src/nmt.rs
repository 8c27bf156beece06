//! The namespaced merkle tree.
//!
//! Leaves carry their namespace duplicated as `(ns_min, ns_max)`; parents
//! aggregate their children's ranges. Before hashing, leaves are stable-sorted
//! by `(namespace, original index)` so blobs of distinct namespaces commit
//! order-independently while order within a namespace is preserved. The leaf
//! level is padded to the next power of two with empty leaves carrying the
//! max sibling namespace, which leaves the commitment of the underlying set
//! unchanged.

use animica_types::hash::{sha3_256_multi, Hash32, DOMAIN_NMT_LEAF, DOMAIN_NMT_NODE};

/// The namespace reserved for padding leaves.
pub const PADDING_NAMESPACE: u64 = u64::MAX;

/// A node of the tree: digest plus the namespace range it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NmtNode {
    /// Smallest namespace under this node.
    pub ns_min: u64,
    /// Largest namespace under this node.
    pub ns_max: u64,
    /// The node digest.
    pub digest: Hash32,
}

/// Hashes a leaf: `SHA3-256("NMT:leaf:v1\0" || u64be(ns) || u64be(ns) || payload)`.
pub fn leaf(ns: u64, payload: &[u8]) -> NmtNode {
    let ns_be = ns.to_be_bytes();
    NmtNode {
        ns_min: ns,
        ns_max: ns,
        digest: sha3_256_multi(DOMAIN_NMT_LEAF, &[&ns_be, &ns_be, payload]),
    }
}

/// Hashes a parent over two children, aggregating their namespace ranges.
pub fn parent(left: &NmtNode, right: &NmtNode) -> NmtNode {
    let ns_min = left.ns_min.min(right.ns_min);
    let ns_max = left.ns_max.max(right.ns_max);
    NmtNode {
        ns_min,
        ns_max,
        digest: sha3_256_multi(
            DOMAIN_NMT_NODE,
            &[
                &ns_min.to_be_bytes(),
                &ns_max.to_be_bytes(),
                &left.digest,
                &right.digest,
            ],
        ),
    }
}

fn pad_to_pow2(mut nodes: Vec<NmtNode>) -> Vec<NmtNode> {
    let target = nodes.len().next_power_of_two();
    if nodes.is_empty() {
        return nodes;
    }
    let pad_ns = nodes
        .iter()
        .map(|n| n.ns_max)
        .max()
        .unwrap_or(PADDING_NAMESPACE);
    let empty = leaf(pad_ns, &[]);
    nodes.resize(target, empty);
    nodes
}

/// Builds the root over `(namespace, payload)` leaves.
///
/// The empty tree commits to a single padding leaf with the reserved
/// namespace, so an empty blob set still has a well-defined 32-byte root.
pub fn root(leaves: &[(u64, Vec<u8>)]) -> NmtNode {
    if leaves.is_empty() {
        return leaf(PADDING_NAMESPACE, &[]);
    }
    // Stable sort by namespace keeps the original relative order within one
    // namespace, which is part of the commitment.
    let mut indexed: Vec<(usize, &(u64, Vec<u8>))> = leaves.iter().enumerate().collect();
    indexed.sort_by_key(|(i, (ns, _))| (*ns, *i));

    let mut level: Vec<NmtNode> = indexed
        .into_iter()
        .map(|(_, (ns, payload))| leaf(*ns, payload))
        .collect();
    level = pad_to_pow2(level);

    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len() / 2);
        for pair in level.chunks(2) {
            next.push(parent(&pair[0], &pair[1]));
        }
        level = next;
    }
    level[0]
}

/// Incremental builder that agrees with the bottom-up [`root`] constructor.
///
/// Pushed leaves are retained and finalized through the same sort/pad path,
/// so streaming producers and batch producers commit identically.
#[derive(Debug, Default)]
pub struct NmtBuilder {
    leaves: Vec<(u64, Vec<u8>)>,
}

impl NmtBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a leaf.
    pub fn push(&mut self, ns: u64, payload: impl Into<Vec<u8>>) {
        self.leaves.push((ns, payload.into()));
    }

    /// Number of leaves pushed so far.
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    /// Returns `true` if nothing was pushed.
    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Finalizes into the root node.
    pub fn finalize(self) -> NmtNode {
        root(&self.leaves)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use animica_types::hash::sha3_256_multi;

    fn leaves(spec: &[(u64, &[u8])]) -> Vec<(u64, Vec<u8>)> {
        spec.iter().map(|(ns, p)| (*ns, p.to_vec())).collect()
    }

    #[test]
    fn single_leaf_root_equals_leaf_hash() {
        let ns: u64 = 0xAA;
        let payload = [0x01, 0xFF];
        let expected = sha3_256_multi(
            DOMAIN_NMT_LEAF,
            &[&ns.to_be_bytes(), &ns.to_be_bytes(), &payload],
        );
        let r = root(&leaves(&[(0xAA, &payload)]));
        assert_eq!(r.digest, expected);
        assert_eq!((r.ns_min, r.ns_max), (0xAA, 0xAA));
    }

    #[test]
    fn distinct_namespaces_commit_order_independently() {
        let a = (0x01u64, b"hello".as_slice());
        let b = (0xFFu64, b"world".as_slice());
        let r1 = root(&leaves(&[a, b]));
        let r2 = root(&leaves(&[b, a]));
        assert_eq!(r1.digest, r2.digest);
    }

    #[test]
    fn order_within_a_namespace_is_part_of_the_commitment() {
        let r1 = root(&leaves(&[(1, b"a"), (1, b"b"), (1, b"c")]));
        let r2 = root(&leaves(&[(1, b"a"), (1, b"c"), (1, b"b")]));
        assert_ne!(r1.digest, r2.digest);
    }

    #[test]
    fn mixed_namespaces_behave_like_a_stable_sort() {
        let unsorted = leaves(&[(5, b"x"), (1, b"a"), (3, b"q"), (1, b"b"), (3, b"r")]);
        let mut order: Vec<usize> = (0..unsorted.len()).collect();
        order.sort_by_key(|&i| (unsorted[i].0, i));
        let sorted: Vec<(u64, Vec<u8>)> = order.iter().map(|&i| unsorted[i].clone()).collect();
        assert_eq!(root(&unsorted).digest, root(&sorted).digest);
    }

    #[test]
    fn root_aggregates_the_namespace_range() {
        let r = root(&leaves(&[(3, b"q"), (9, b"x"), (5, b"m")]));
        assert_eq!((r.ns_min, r.ns_max), (3, 9));
    }

    #[test]
    fn payload_mutation_changes_the_root() {
        let base = leaves(&[(1, b"aa"), (2, b"bb"), (3, b"cc"), (3, b"dd")]);
        let mut mutated = base.clone();
        mutated[2].1.push(b'!');
        assert_ne!(root(&base).digest, root(&mutated).digest);
    }

    #[test]
    fn explicit_padding_matches_implicit_padding() {
        // 6 leaves pad to 8; appending the padding leaves by hand must not
        // change the commitment.
        let base = leaves(&[
            (1, b"alpha"),
            (1, b"beta"),
            (2, b"gamma"),
            (2, b"delta"),
            (3, b"epsilon"),
            (3, b"zeta"),
        ]);
        let implicit = root(&base);

        let mut padded = base.clone();
        let pad_ns = base.iter().map(|(ns, _)| *ns).max().unwrap();
        padded.push((pad_ns, Vec::new()));
        padded.push((pad_ns, Vec::new()));
        let explicit = root(&padded);

        assert_eq!(implicit.digest, explicit.digest);
        assert_eq!(
            (implicit.ns_min, implicit.ns_max),
            (explicit.ns_min, explicit.ns_max)
        );
    }

    #[test]
    fn streaming_builder_matches_bottom_up() {
        let base = leaves(&[
            (1, b"alpha"),
            (2, b"gamma"),
            (1, b"beta"),
            (3, b"zeta"),
            (2, b"delta"),
        ]);
        let bottom_up = root(&base);

        let mut builder = NmtBuilder::new();
        for (ns, payload) in &base {
            builder.push(*ns, payload.clone());
        }
        let streamed = builder.finalize();
        assert_eq!(bottom_up.digest, streamed.digest);
        assert_eq!(
            (bottom_up.ns_min, bottom_up.ns_max),
            (streamed.ns_min, streamed.ns_max)
        );
    }

    #[test]
    fn empty_tree_has_a_stable_padding_root() {
        let r1 = root(&[]);
        let r2 = root(&[]);
        assert_eq!(r1.digest, r2.digest);
        assert_eq!(r1.ns_min, PADDING_NAMESPACE);
    }

    #[test]
    fn leaf_and_parent_domains_are_separated() {
        let a = leaf(1, b"payload");
        let p = parent(&a, &a);
        assert_ne!(a.digest, p.digest);
    }
}
