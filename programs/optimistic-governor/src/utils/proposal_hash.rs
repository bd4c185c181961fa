//! Canonical proposal hashing and oracle claim construction.
//!
//! The transaction batch is hashed over its borsh encoding, the same bytes
//! carried by the `TransactionsProposed` event.

use anchor_lang::error::ErrorCode;
use anchor_lang::prelude::*;
use solana_sha256_hasher::hashv;

use crate::state::GovernanceTransaction;

/// Domain tag mixed into every proposal hash
pub const PROPOSAL_HASH_DOMAIN: &[u8] = b"optimistic-governor:proposal";

pub fn encode_transactions(transactions: &[GovernanceTransaction]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(4 + transactions.len() * 96);
    transactions
        .serialize(&mut out)
        .map_err(|_| error!(ErrorCode::InstructionDidNotSerialize))?;
    Ok(out)
}

pub fn hash_transactions(transactions: &[GovernanceTransaction]) -> Result<[u8; 32]> {
    Ok(hashv(&[&encode_transactions(transactions)?]).to_bytes())
}

pub fn hash_explanation(explanation: &[u8]) -> [u8; 32] {
    hashv(&[explanation]).to_bytes()
}

pub fn combine_proposal_hash(transactions_hash: &[u8; 32], explanation_hash: &[u8; 32]) -> [u8; 32] {
    hashv(&[
        PROPOSAL_HASH_DOMAIN,
        transactions_hash.as_ref(),
        explanation_hash.as_ref(),
    ])
    .to_bytes()
}

/// Deterministic proposal identity: two submissions with the same batch and
/// explanation always collide.
pub fn compute_proposal_hash(
    transactions: &[GovernanceTransaction],
    explanation: &[u8],
) -> Result<[u8; 32]> {
    Ok(combine_proposal_hash(
        &hash_transactions(transactions)?,
        &hash_explanation(explanation),
    ))
}

/// Claim text submitted to the oracle:
/// `proposalHash:<hex>,explanation:<explanation>,rules:<rules>`
pub fn construct_claim(proposal_hash: &[u8; 32], explanation: &[u8], rules: &str) -> Vec<u8> {
    let hex_hash = hex::encode(proposal_hash);
    let mut claim = Vec::with_capacity(40 + hex_hash.len() + explanation.len() + rules.len());
    claim.extend_from_slice(b"proposalHash:");
    claim.extend_from_slice(hex_hash.as_bytes());
    claim.extend_from_slice(b",explanation:");
    claim.extend_from_slice(explanation);
    claim.extend_from_slice(b",rules:");
    claim.extend_from_slice(rules.as_bytes());
    claim
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Operation, TransactionAccount};

    fn transfer(to: u8, value: u64) -> GovernanceTransaction {
        GovernanceTransaction {
            to: Pubkey::new_from_array([to; 32]),
            value,
            data: vec![3, 1, 4, 1, 5],
            operation: Operation::Call,
            accounts: vec![TransactionAccount {
                pubkey: Pubkey::new_from_array([to.wrapping_add(1); 32]),
                is_signer: false,
                is_writable: true,
            }],
        }
    }

    #[test]
    fn test_encoding_layout() {
        let batch = vec![transfer(1, 10), transfer(2, 0)];
        let encoded = encode_transactions(&batch).unwrap();

        // u32 count, then `to`, `value`, u32-prefixed data, operation tag
        assert_eq!(encoded[..4], 2u32.to_le_bytes());
        assert_eq!(encoded[4..36], [1u8; 32]);
        assert_eq!(encoded[36..44], 10u64.to_le_bytes());
        assert_eq!(encoded[44..48], 5u32.to_le_bytes());
        assert_eq!(encoded[48..53], [3, 1, 4, 1, 5]);
        assert_eq!(encoded[53], Operation::Call as u8);

        let decoded = Vec::<GovernanceTransaction>::try_from_slice(&encoded).unwrap();
        assert_eq!(decoded, batch);
    }

    #[test]
    fn test_explanation_hash_is_sha256() {
        assert_eq!(
            hex::encode(hash_explanation(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_proposal_hash_is_deterministic() {
        let batch = vec![transfer(1, 10), transfer(2, 20)];
        assert_eq!(
            compute_proposal_hash(&batch, b"pay contributors").unwrap(),
            compute_proposal_hash(&batch.clone(), b"pay contributors").unwrap()
        );
    }

    #[test]
    fn test_proposal_hash_depends_on_order() {
        let forward = vec![transfer(1, 10), transfer(2, 20)];
        let reversed = vec![transfer(2, 20), transfer(1, 10)];
        assert_ne!(
            compute_proposal_hash(&forward, b"x").unwrap(),
            compute_proposal_hash(&reversed, b"x").unwrap()
        );
    }

    #[test]
    fn test_proposal_hash_depends_on_explanation() {
        let batch = vec![transfer(1, 10)];
        assert_ne!(
            compute_proposal_hash(&batch, b"a").unwrap(),
            compute_proposal_hash(&batch, b"b").unwrap()
        );
    }

    #[test]
    fn test_operation_changes_hash() {
        let call = vec![transfer(1, 10)];
        let mut delegate = call.clone();
        delegate[0].operation = Operation::DelegateCall;
        assert_ne!(
            hash_transactions(&call).unwrap(),
            hash_transactions(&delegate).unwrap()
        );
    }

    #[test]
    fn test_claim_format() {
        let hash = [0xabu8; 32];
        let claim = construct_claim(&hash, b"send 1 token", "be nice");
        let expected = format!(
            "proposalHash:{},explanation:send 1 token,rules:be nice",
            "ab".repeat(32)
        );
        assert_eq!(claim, expected.into_bytes());
    }

    #[test]
    fn test_claim_keeps_raw_explanation_bytes() {
        let claim = construct_claim(&[0u8; 32], &[0xff, 0x00], "r");
        assert!(claim.windows(2).any(|w| w == [0xff, 0x00]));
    }
}
