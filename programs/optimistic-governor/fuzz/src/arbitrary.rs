//! Arbitrary input generators for fuzz testing
//!
//! Generates random but well-formed proposals, timings and vote sets.

use anchor_lang::prelude::Pubkey;
use optimistic_governor::instructions::constants::{
    MAX_EXPLANATION_LEN, MAX_TRANSACTIONS, MAX_TRANSACTION_ACCOUNTS,
};
use optimistic_governor::state::{GovernanceTransaction, GovernorConfig, Operation, TransactionAccount};
use proptest::prelude::*;

/// Arbitrary 32-byte identifier (hash, root, assertion id)
pub fn arb_id() -> impl Strategy<Value = [u8; 32]> {
    prop::array::uniform32(any::<u8>())
}

/// Arbitrary non-default pubkey
pub fn arb_pubkey() -> impl Strategy<Value = Pubkey> {
    arb_id()
        .prop_filter("default pubkey is not a valid target", |bytes| *bytes != [0u8; 32])
        .prop_map(Pubkey::new_from_array)
}

pub fn arb_operation() -> impl Strategy<Value = Operation> {
    prop_oneof![
        // Plain calls dominate in practice
        4 => Just(Operation::Call),
        1 => Just(Operation::DelegateCall),
    ]
}

pub fn arb_transaction_account() -> impl Strategy<Value = TransactionAccount> {
    (arb_pubkey(), any::<bool>(), any::<bool>()).prop_map(|(pubkey, is_signer, is_writable)| {
        TransactionAccount {
            pubkey,
            is_signer,
            is_writable,
        }
    })
}

/// Arbitrary lamport value forwarded by the avatar
pub fn arb_value() -> impl Strategy<Value = u64> {
    prop_oneof![
        Just(0u64),
        Just(1u64),
        1_000u64..1_000_000u64,
        1_000_000u64..1_000_000_000u64,
    ]
}

pub fn arb_transaction() -> impl Strategy<Value = GovernanceTransaction> {
    (
        arb_pubkey(),
        arb_value(),
        prop::collection::vec(any::<u8>(), 0..64),
        arb_operation(),
        prop::collection::vec(arb_transaction_account(), 0..=MAX_TRANSACTION_ACCOUNTS.min(4)),
    )
        .prop_map(|(to, value, data, operation, accounts)| GovernanceTransaction {
            to,
            value,
            data,
            operation,
            accounts,
        })
}

/// Non-empty batch within the program's limits
pub fn arb_batch() -> impl Strategy<Value = Vec<GovernanceTransaction>> {
    prop::collection::vec(arb_transaction(), 1..=MAX_TRANSACTIONS.min(6))
}

pub fn arb_explanation() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        Just(Vec::new()),
        prop::collection::vec(any::<u8>(), 1..=MAX_EXPLANATION_LEN),
    ]
}

/// Arbitrary challenge window in seconds
pub fn arb_liveness() -> impl Strategy<Value = i64> {
    prop_oneof![
        Just(1i64),
        Just(GovernorConfig::DEFAULT_LIVENESS),
        Just(7 * 24 * 60 * 60),
        1i64..1_000_000i64,
    ]
}

/// Arbitrary timestamp (seconds since Unix epoch)
pub fn arb_timestamp() -> impl Strategy<Value = i64> {
    prop_oneof![
        Just(1_000_000_000i64),
        1_700_000_000i64..1_800_000_000i64,
    ]
}

/// Arbitrary bond amount
pub fn arb_bond() -> impl Strategy<Value = u64> {
    prop_oneof![
        Just(1u64),
        Just(1_000_000u64),
        1u64..1_000_000_000u64,
    ]
}

/// Arbitrary `(for, against, abstain)` vote record
pub fn arb_vote_record() -> impl Strategy<Value = (u64, u64, u64)> {
    (0u64..1_000_000, 0u64..1_000_000, 0u64..1_000_000)
}

/// Input for propose/duplicate fuzz testing
#[derive(Debug, Clone)]
pub struct ProposeInput {
    pub transactions: Vec<GovernanceTransaction>,
    pub explanation: Vec<u8>,
    pub bond_amount: u64,
    pub liveness: i64,
    pub start_time: i64,
}

impl Arbitrary for ProposeInput {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            arb_batch(),
            arb_explanation(),
            arb_bond(),
            arb_liveness(),
            arb_timestamp(),
        )
            .prop_map(
                |(transactions, explanation, bond_amount, liveness, start_time)| ProposeInput {
                    transactions,
                    explanation,
                    bond_amount,
                    liveness,
                    start_time,
                },
            )
            .boxed()
    }
}

/// Input for execution timing fuzz testing
#[derive(Debug, Clone)]
pub struct ExecutionTimingInput {
    pub proposal: ProposeInput,
    /// Oracle settlement result
    pub approved: bool,
    /// Seconds after proposal time the execution is attempted (may be negative
    /// relative to the window end)
    pub execute_after: i64,
    /// Whether settlement is applied before execution is attempted
    pub settle_first: bool,
}

impl Arbitrary for ExecutionTimingInput {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            any::<ProposeInput>(),
            any::<bool>(),
            prop_oneof![Just(0i64), 0i64..2_000_000i64],
            prop_oneof![4 => Just(true), 1 => Just(false)],
        )
            .prop_map(|(proposal, approved, execute_after, settle_first)| ExecutionTimingInput {
                proposal,
                approved,
                execute_after,
                settle_first,
            })
            .boxed()
    }
}

/// Input for batch atomicity fuzz testing
#[derive(Debug, Clone)]
pub struct AtomicityInput {
    pub proposal: ProposeInput,
    /// Index of the transaction whose target fails (clamped to the batch)
    pub failing_index: usize,
    /// Whether any transaction fails at all
    pub inject_failure: bool,
}

impl Arbitrary for AtomicityInput {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (any::<ProposeInput>(), 0usize..MAX_TRANSACTIONS, any::<bool>())
            .prop_map(|(proposal, failing_index, inject_failure)| AtomicityInput {
                proposal,
                failing_index,
                inject_failure,
            })
            .boxed()
    }
}

/// Input for vote attestation fuzz testing
#[derive(Debug, Clone)]
pub struct VoteInput {
    pub voters: Vec<(Pubkey, (u64, u64, u64))>,
    /// Voter index whose record is tampered with (clamped)
    pub tampered: usize,
}

impl Arbitrary for VoteInput {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            prop::collection::vec((arb_pubkey(), arb_vote_record()), 1..24),
            any::<usize>(),
        )
            .prop_map(|(mut voters, tampered)| {
                // One record per voter
                voters.sort_by_key(|(voter, _)| *voter);
                voters.dedup_by_key(|(voter, _)| *voter);
                VoteInput { voters, tampered }
            })
            .boxed()
    }
}
