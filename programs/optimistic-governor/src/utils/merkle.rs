//! Merkle vote-proof verification.
//!
//! One canonical scheme is used for building trees off-chain and verifying
//! proofs on-chain:
//!
//! - leaf: `sha256(0x00 || sha256(voter || for_le || against_le || abstain_le))`
//! - node: `sha256(0x01 || min(a, b) || max(a, b))`
//!
//! Pairs are ordered lexicographically, so proofs carry only sibling hashes.

use anchor_lang::prelude::*;
use solana_sha256_hasher::hashv;

const LEAF_PREFIX: &[u8] = &[0x00];
const NODE_PREFIX: &[u8] = &[0x01];

/// Canonical leaf for a voter's `(for, against, abstain)` record.
pub fn vote_leaf(voter: &Pubkey, for_amount: u64, against_amount: u64, abstain_amount: u64) -> [u8; 32] {
    let inner = hashv(&[
        voter.as_ref(),
        &for_amount.to_le_bytes(),
        &against_amount.to_le_bytes(),
        &abstain_amount.to_le_bytes(),
    ]);
    hashv(&[LEAF_PREFIX, inner.as_ref()]).to_bytes()
}

pub fn hash_pair(a: &[u8; 32], b: &[u8; 32]) -> [u8; 32] {
    let (low, high) = if a <= b { (a, b) } else { (b, a) };
    hashv(&[NODE_PREFIX, low.as_ref(), high.as_ref()]).to_bytes()
}

/// Fold `leaf` with each sibling in order, returning the implied root.
pub fn process_proof(leaf: [u8; 32], proof: &[[u8; 32]]) -> [u8; 32] {
    proof
        .iter()
        .fold(leaf, |computed, sibling| hash_pair(&computed, sibling))
}

pub fn verify(root: &[u8; 32], leaf: [u8; 32], proof: &[[u8; 32]]) -> bool {
    process_proof(leaf, proof) == *root
}

/// Off-chain tree builder producing roots and proofs the program accepts.
///
/// Leaves are sorted before building so the root is independent of input
/// order. An odd node at the end of a level is promoted unchanged.
#[derive(Debug, Clone)]
pub struct VoteTree {
    levels: Vec<Vec<[u8; 32]>>,
}

impl VoteTree {
    pub fn from_leaves(mut leaves: Vec<[u8; 32]>) -> Option<Self> {
        if leaves.is_empty() {
            return None;
        }
        leaves.sort_unstable();

        let mut levels = vec![leaves];
        while levels.last().map_or(false, |level| level.len() > 1) {
            let next = levels
                .last()
                .map(|level| {
                    level
                        .chunks(2)
                        .map(|pair| match pair.get(1) {
                            Some(right) => hash_pair(&pair[0], right),
                            None => pair[0],
                        })
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default();
            levels.push(next);
        }
        Some(Self { levels })
    }

    pub fn root(&self) -> [u8; 32] {
        self.levels
            .last()
            .and_then(|level| level.first().copied())
            .unwrap_or_default()
    }

    pub fn leaves(&self) -> &[[u8; 32]] {
        &self.levels[0]
    }

    /// Proof for `leaf`, or `None` if it is not in the tree.
    pub fn proof(&self, leaf: &[u8; 32]) -> Option<Vec<[u8; 32]>> {
        let mut index = self.levels[0].binary_search(leaf).ok()?;
        let mut proof = Vec::new();
        for level in &self.levels[..self.levels.len() - 1] {
            let sibling = index ^ 1;
            if let Some(hash) = level.get(sibling) {
                proof.push(*hash);
            }
            index /= 2;
        }
        Some(proof)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voter(n: u8) -> Pubkey {
        Pubkey::new_from_array([n; 32])
    }

    fn sample_tree() -> (VoteTree, Vec<[u8; 32]>) {
        let leaves = vec![
            vote_leaf(&voter(1), 5, 0, 0),
            vote_leaf(&voter(2), 0, 3, 0),
            vote_leaf(&voter(3), 0, 0, 9),
            vote_leaf(&voter(4), 2, 2, 2),
            vote_leaf(&voter(5), 1, 0, 0),
        ];
        (VoteTree::from_leaves(leaves.clone()).unwrap(), leaves)
    }

    #[test]
    fn test_every_leaf_proves_membership() {
        let (tree, leaves) = sample_tree();
        let root = tree.root();
        for leaf in leaves {
            let proof = tree.proof(&leaf).unwrap();
            assert!(verify(&root, leaf, &proof));
        }
    }

    #[test]
    fn test_proof_rejects_altered_amount() {
        let (tree, _) = sample_tree();
        let genuine = vote_leaf(&voter(1), 5, 0, 0);
        let proof = tree.proof(&genuine).unwrap();

        assert!(verify(&tree.root(), genuine, &proof));
        assert!(!verify(&tree.root(), vote_leaf(&voter(1), 4, 0, 0), &proof));
    }

    #[test]
    fn test_proof_rejects_other_voter() {
        let (tree, _) = sample_tree();
        let proof = tree.proof(&vote_leaf(&voter(1), 5, 0, 0)).unwrap();
        assert!(!verify(&tree.root(), vote_leaf(&voter(9), 5, 0, 0), &proof));
    }

    #[test]
    fn test_single_leaf_tree_has_empty_proof() {
        let leaf = vote_leaf(&voter(7), 1, 1, 1);
        let tree = VoteTree::from_leaves(vec![leaf]).unwrap();
        assert_eq!(tree.root(), leaf);
        assert!(tree.proof(&leaf).unwrap().is_empty());
        assert!(verify(&tree.root(), leaf, &[]));
    }

    #[test]
    fn test_root_independent_of_leaf_order() {
        let (tree, mut leaves) = sample_tree();
        leaves.reverse();
        assert_eq!(VoteTree::from_leaves(leaves).unwrap().root(), tree.root());
    }

    #[test]
    fn test_empty_tree_is_none() {
        assert!(VoteTree::from_leaves(Vec::new()).is_none());
    }

    #[test]
    fn test_hash_pair_is_order_independent() {
        let a = [1u8; 32];
        let b = [2u8; 32];
        assert_eq!(hash_pair(&a, &b), hash_pair(&b, &a));
    }

    #[test]
    fn test_leaf_is_not_a_node() {
        // A leaf can never be confused with an inner node of the same bytes
        let a = [1u8; 32];
        let b = [2u8; 32];
        let node = hash_pair(&a, &b);
        assert_ne!(node, hashv(&[LEAF_PREFIX, hashv(&[&a, &b]).as_ref()]).to_bytes());
    }

    #[test]
    fn test_missing_leaf_has_no_proof() {
        let (tree, _) = sample_tree();
        assert!(tree.proof(&[0xAB; 32]).is_none());
    }
}
