//! Fuzz target for attest_vote
//!
//! Tests invariants:
//! - Every voter in the tree can attest with their proof
//! - A record that differs from the tree's leaf is rejected
//! - Each voter attests at most once
//! - Attesting never changes proposal status
//!
//! Run with: cargo test --release -p optimistic-governor-fuzz vote_attestation

use crate::*;
use anchor_lang::prelude::Pubkey;
use optimistic_governor::errors::GovernorError;
use optimistic_governor::state::{GovernanceTransaction, Operation, ProposalStatus};
use optimistic_governor::utils::merkle;
use proptest::prelude::*;

fn batch() -> Vec<GovernanceTransaction> {
    vec![GovernanceTransaction {
        to: Pubkey::new_from_array([5u8; 32]),
        value: 0,
        data: b"ratify".to_vec(),
        operation: Operation::Call,
        accounts: vec![],
    }]
}

fn proposed_with_votes(input: &VoteInput) -> (SimulatedLedger, Pubkey, merkle::VoteTree) {
    let mut ledger = SimulatedLedger::new(SimulatedConfig::default(), 1_700_000_000);
    let proposer = Pubkey::new_from_array([6u8; 32]);
    ledger.fund_proposer(proposer);
    let (resolution, tree) = build_vote_resolution(&input.voters).unwrap();
    let key = ledger
        .propose(proposer, batch(), b"vote".to_vec(), Some(resolution))
        .unwrap();
    (ledger, key, tree)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    /// Every genuine record attests exactly once
    #[test]
    fn fuzz_genuine_proofs_attest(input in any::<VoteInput>()) {
        let (mut ledger, key, tree) = proposed_with_votes(&input);

        for (voter, record) in &input.voters {
            let leaf = merkle::vote_leaf(voter, record.0, record.1, record.2);
            let proof = tree.proof(&leaf).unwrap();
            ledger.attest(key, *voter, *record, &proof).unwrap();

            let err = ledger.attest(key, *voter, *record, &proof).unwrap_err();
            prop_assert_eq!(err, governor_error(GovernorError::AlreadyAttested));
        }

        let proposal = &ledger.proposals[&key];
        prop_assert_eq!(proposal.attestations, input.voters.len() as u32);
        prop_assert_eq!(proposal.status, ProposalStatus::Proposed);
        prop_assert_eq!(ledger.attestations.len(), input.voters.len());
    }

    /// Changing any amount invalidates the proof
    #[test]
    fn fuzz_tampered_record_rejected(input in any::<VoteInput>(), field in 0usize..3) {
        let (mut ledger, key, tree) = proposed_with_votes(&input);
        let (voter, record) = input.voters[input.tampered % input.voters.len()];
        let proof = tree
            .proof(&merkle::vote_leaf(&voter, record.0, record.1, record.2))
            .unwrap();

        let mut forged = record;
        match field {
            0 => forged.0 = forged.0.wrapping_add(1),
            1 => forged.1 = forged.1.wrapping_add(1),
            _ => forged.2 = forged.2.wrapping_add(1),
        }

        let err = ledger.attest(key, voter, forged, &proof).unwrap_err();
        prop_assert_eq!(err, governor_error(GovernorError::InvalidVoteProof));
        prop_assert!(ledger.attestations.is_empty());
        prop_assert_eq!(ledger.proposals[&key].attestations, 0);

        // The genuine record still attests afterwards
        ledger.attest(key, voter, record, &proof).unwrap();
    }

    /// A proof for one voter does not carry over to another voter
    #[test]
    fn fuzz_proof_bound_to_voter(input in any::<VoteInput>(), impostor in arb_pubkey()) {
        prop_assume!(input.voters.iter().all(|(voter, _)| *voter != impostor));
        let (mut ledger, key, tree) = proposed_with_votes(&input);
        let (voter, record) = input.voters[input.tampered % input.voters.len()];
        let proof = tree
            .proof(&merkle::vote_leaf(&voter, record.0, record.1, record.2))
            .unwrap();

        let err = ledger.attest(key, impostor, record, &proof).unwrap_err();
        prop_assert_eq!(err, governor_error(GovernorError::InvalidVoteProof));
    }

    /// Proposals without a vote resolution refuse every attestation, and
    /// attestations survive settlement
    #[test]
    fn fuzz_attestation_requires_resolution(input in any::<VoteInput>(), approved in any::<bool>()) {
        let mut ledger = SimulatedLedger::new(SimulatedConfig::default(), 1_700_000_000);
        let proposer = Pubkey::new_from_array([6u8; 32]);
        ledger.fund_proposer(proposer);
        let bare = ledger.propose(proposer, batch(), vec![], None).unwrap();

        let (voter, record) = input.voters[0];
        let err = ledger.attest(bare, voter, record, &[]).unwrap_err();
        prop_assert_eq!(err, governor_error(GovernorError::NoVoteResolution));

        let (mut ledger, key, tree) = proposed_with_votes(&input);
        ledger.oracle_settles(&key, approved);
        let status = ledger.settle(key).unwrap();

        let leaf = merkle::vote_leaf(&voter, record.0, record.1, record.2);
        let proof = tree.proof(&leaf).unwrap();
        ledger.attest(key, voter, record, &proof).unwrap();
        prop_assert_eq!(ledger.proposals[&key].status, status);
    }
}
