//! Events emitted by the Optimistic Governor
//!
//! The program keeps only compact current state on-chain. These events are the
//! audit trail: every state transition emits exactly one record, and
//! `TransactionsProposed` carries the full batch so observers can rebuild a
//! proposal without re-deriving it.

use anchor_lang::prelude::*;

use crate::state::GovernanceTransaction;

/// Emitted when a governor is created
#[event]
pub struct GovernorInitialized {
    pub governor: Pubkey,
    pub owner: Pubkey,
    pub avatar: Pubkey,
    pub oracle_program: Pubkey,
    pub collateral_mint: Pubkey,
    pub bond_amount: u64,
    pub liveness: i64,
    pub identifier: [u8; 32],
    pub rules: String,
    pub timestamp: i64,
}

/// Emitted whenever the owner changes a governor parameter
#[event]
pub struct GovernorParamsUpdated {
    pub governor: Pubkey,
    pub collateral_mint: Pubkey,
    pub bond_amount: u64,
    pub liveness: i64,
    pub identifier: [u8; 32],
    pub rules: String,
    pub timestamp: i64,
}

/// Emitted when a transaction batch is proposed
#[event]
pub struct TransactionsProposed {
    pub governor: Pubkey,
    pub proposal: Pubkey,
    pub proposer: Pubkey,
    pub proposal_time: i64,
    pub assertion_id: [u8; 32],
    pub proposal_hash: [u8; 32],
    pub round: u64,
    pub transactions: Vec<GovernanceTransaction>,
    pub explanation: Vec<u8>,
    pub rules: String,
    pub challenge_window_ends: i64,
}

/// Emitted alongside `TransactionsProposed` when a vote resolution is attached
#[event]
pub struct VoteResolved {
    pub proposal: Pubkey,
    pub proposal_hash: [u8; 32],
    pub assertion_id: [u8; 32],
    pub for_votes: u64,
    pub against_votes: u64,
    pub abstain_votes: u64,
    pub vote_merkle_root: [u8; 32],
    pub data: String,
}

/// Emitted when the oracle's settlement is applied to a proposal
#[event]
pub struct ProposalResolved {
    pub proposal: Pubkey,
    pub proposal_hash: [u8; 32],
    pub assertion_id: [u8; 32],
    /// Oracle settlement result (true = Resolved, false = Rejected)
    pub approved: bool,
    pub status: u8,
    pub timestamp: i64,
}

/// Emitted when a voter proves their entry in the vote tree
#[event]
pub struct VoteAttested {
    pub proposal: Pubkey,
    pub proposal_hash: [u8; 32],
    pub assertion_id: [u8; 32],
    pub voter: Pubkey,
    pub for_amount: u64,
    pub against_amount: u64,
    pub abstain_amount: u64,
    pub timestamp: i64,
}

/// Emitted once per executed transaction
#[event]
pub struct TransactionExecuted {
    pub proposal_hash: [u8; 32],
    pub assertion_id: [u8; 32],
    pub transaction_index: u16,
}

/// Emitted once a whole batch has executed
#[event]
pub struct ProposalExecuted {
    pub proposal: Pubkey,
    pub proposal_hash: [u8; 32],
    pub assertion_id: [u8; 32],
    pub executor: Pubkey,
    pub timestamp: i64,
}
