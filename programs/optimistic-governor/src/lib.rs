#![allow(unexpected_cfgs)]
//! Optimistic Governor
//!
//! Lets anyone propose a batch of transactions for a DAO-controlled avatar.
//! Each proposal is backed by a bonded claim asserted with an external
//! optimistic oracle; once the oracle settles the claim as true and the
//! challenge window has passed, anyone can execute the batch through the
//! avatar. Proposals may carry a vote resolution whose Merkle root lets
//! individual voters attest their records.

use anchor_lang::prelude::*;

declare_id!("48mMjmwqSxTwwDfaofwtPPocgjFqJR8ne2ELdPxAVCsH");

pub mod avatar;
pub mod errors;
pub mod events;
pub mod instructions;
pub mod oracle;
pub mod state;
pub mod utils;

use instructions::*;
use state::{GovernanceTransaction, VoteResolution};

#[program]
pub mod optimistic_governor {
    use super::*;

    /// Create the governor for an avatar, with its bond vault.
    ///
    /// # Arguments
    /// * `owner` - Authority allowed to change governor parameters
    /// * `bond_amount` - Collateral bonded per proposal
    /// * `rules` - Rules every proposal is asserted against
    /// * `identifier` - Oracle identifier for the claims
    /// * `liveness` - Challenge window in seconds
    pub fn initialize_governor(
        ctx: Context<InitializeGovernor>,
        owner: Pubkey,
        bond_amount: u64,
        rules: String,
        identifier: [u8; 32],
        liveness: i64,
    ) -> Result<()> {
        instructions::initialize_governor::handler(
            ctx,
            owner,
            bond_amount,
            rules,
            identifier,
            liveness,
        )
    }

    /// Change the bond collateral and amount (owner only).
    pub fn set_collateral_and_bond(
        ctx: Context<SetCollateralAndBond>,
        bond_amount: u64,
    ) -> Result<()> {
        instructions::update_governor::set_collateral_and_bond_handler(ctx, bond_amount)
    }

    /// Replace the rules text (owner only).
    pub fn set_rules(ctx: Context<UpdateGovernor>, rules: String) -> Result<()> {
        instructions::update_governor::set_rules_handler(ctx, rules)
    }

    /// Change the challenge window (owner only).
    pub fn set_liveness(ctx: Context<UpdateGovernor>, liveness: i64) -> Result<()> {
        instructions::update_governor::set_liveness_handler(ctx, liveness)
    }

    /// Change the oracle identifier (owner only).
    pub fn set_identifier(ctx: Context<UpdateGovernor>, identifier: [u8; 32]) -> Result<()> {
        instructions::update_governor::set_identifier_handler(ctx, identifier)
    }

    /// Propose a transaction batch. Pulls the bond from the proposer and
    /// asserts the proposal with the oracle.
    ///
    /// # Arguments
    /// * `proposal_hash` - Canonical hash of (transactions, explanation); must
    ///   match the recomputed value
    /// * `transactions` - Ordered batch executed by the avatar
    /// * `explanation` - Free-form bytes included in the oracle claim
    /// * `vote_resolution` - Optional off-chain vote summary
    pub fn propose_transactions(
        ctx: Context<ProposeTransactions>,
        proposal_hash: [u8; 32],
        transactions: Vec<GovernanceTransaction>,
        explanation: Vec<u8>,
        vote_resolution: Option<VoteResolution>,
    ) -> Result<[u8; 32]> {
        instructions::propose_transactions::handler(
            ctx,
            proposal_hash,
            transactions,
            explanation,
            vote_resolution,
        )
    }

    /// Apply the oracle's settlement to a proposal. Anyone can call.
    pub fn settle_proposal(ctx: Context<SettleProposal>) -> Result<()> {
        instructions::settle_proposal::handler(ctx)
    }

    /// Prove a vote record against the proposal's vote Merkle root.
    pub fn attest_vote(
        ctx: Context<AttestVote>,
        for_amount: u64,
        against_amount: u64,
        abstain_amount: u64,
        proof: Vec<[u8; 32]>,
    ) -> Result<()> {
        instructions::attest_vote::handler(ctx, for_amount, against_amount, abstain_amount, proof)
    }

    /// Execute a resolved proposal once its challenge window has elapsed.
    /// Target programs and accounts are passed as remaining accounts.
    pub fn execute_proposal<'info>(
        ctx: Context<'_, '_, 'info, 'info, ExecuteProposal<'info>>,
        transactions: Vec<GovernanceTransaction>,
    ) -> Result<()> {
        instructions::execute_proposal::handler(ctx, transactions)
    }
}
