//! Propose a transaction batch backed by a bonded oracle assertion
//!
//! Flow:
//! 1. Validate the batch and explanation, and check the supplied hash
//! 2. Take the per-hash lock (one live proposal per hash)
//! 3. Pull the bond from the proposer (pre-approved to the governor PDA)
//! 4. Assert the claim with the oracle, which pulls the bond from the vault
//! 5. Record the proposal and emit the full batch

use crate::errors::GovernorError;
use crate::events::{TransactionsProposed, VoteResolved};
use crate::instructions::constants::NO_DOMAIN;
use crate::oracle::{self, AssertTruthAccounts, AssertTruthArgs};
use crate::state::{
    GovernanceTransaction, GovernorConfig, Proposal, ProposalHashLock, ProposalStatus,
    VoteResolution,
};
use crate::utils::proposal_hash::{
    combine_proposal_hash, construct_claim, hash_explanation, hash_transactions,
};
use crate::utils::validation::{
    validate_explanation, validate_transactions, validate_vote_resolution,
};
use anchor_lang::prelude::*;
use anchor_lang::solana_program::program_option::COption;
use anchor_spl::token::{self, Mint, Token, TokenAccount, Transfer};

#[derive(Accounts)]
#[instruction(proposal_hash: [u8; 32])]
pub struct ProposeTransactions<'info> {
    #[account(
        mut,
        seeds = [b"governor", governor.avatar.as_ref()],
        bump = governor.bump
    )]
    pub governor: Box<Account<'info, GovernorConfig>>,

    /// Created on the first proposal with this hash, reused afterwards
    #[account(
        init_if_needed,
        payer = proposer,
        space = ProposalHashLock::SIZE,
        seeds = [b"proposal_lock", governor.key().as_ref(), proposal_hash.as_ref()],
        bump
    )]
    pub proposal_lock: Box<Account<'info, ProposalHashLock>>,

    #[account(
        init,
        payer = proposer,
        space = Proposal::SIZE,
        seeds = [
            b"proposal",
            governor.key().as_ref(),
            proposal_hash.as_ref(),
            proposal_lock.rounds.to_le_bytes().as_ref()
        ],
        bump
    )]
    pub proposal: Box<Account<'info, Proposal>>,

    #[account(mut)]
    pub proposer: Signer<'info>,

    #[account(
        address = governor.collateral_mint @ GovernorError::InvalidCollateral
    )]
    pub collateral_mint: Box<Account<'info, Mint>>,

    /// Proposer's collateral account, delegated to the governor for the bond
    #[account(
        mut,
        token::mint = collateral_mint,
        token::authority = proposer,
    )]
    pub proposer_token_account: Box<Account<'info, TokenAccount>>,

    #[account(
        mut,
        seeds = [b"bond_vault", governor.key().as_ref(), collateral_mint.key().as_ref()],
        bump,
    )]
    pub bond_vault: Box<Account<'info, TokenAccount>>,

    /// CHECK: Must be the configured oracle program.
    #[account(
        executable,
        address = governor.oracle_program @ GovernorError::InvalidOracle
    )]
    pub oracle_program: UncheckedAccount<'info>,

    /// CHECK: Created by the oracle during the CPI; checked against the
    /// returned assertion id in the handler.
    #[account(mut)]
    pub assertion: UncheckedAccount<'info>,

    /// CHECK: Oracle-side bond escrow, validated by the oracle.
    #[account(mut)]
    pub oracle_bond_escrow: UncheckedAccount<'info>,

    pub token_program: Program<'info, Token>,
    pub system_program: Program<'info, System>,
}

pub fn handler(
    ctx: Context<ProposeTransactions>,
    proposal_hash: [u8; 32],
    transactions: Vec<GovernanceTransaction>,
    explanation: Vec<u8>,
    vote_resolution: Option<VoteResolution>,
) -> Result<[u8; 32]> {
    validate_transactions(&transactions)?;
    validate_explanation(&explanation)?;
    if let Some(resolution) = vote_resolution.as_ref() {
        validate_vote_resolution(resolution)?;
    }

    let transactions_hash = hash_transactions(&transactions)?;
    let explanation_hash = hash_explanation(&explanation);
    require!(
        combine_proposal_hash(&transactions_hash, &explanation_hash) == proposal_hash,
        GovernorError::ProposalHashMismatch
    );

    // Per-hash lock. A fresh lock account is initialized here.
    let governor_key = ctx.accounts.governor.key();
    let proposal_key = ctx.accounts.proposal.key();
    let lock = &mut ctx.accounts.proposal_lock;
    if lock.governor == Pubkey::default() {
        lock.governor = governor_key;
        lock.proposal_hash = proposal_hash;
        lock.bump = ctx.bumps.proposal_lock;
    }
    let round = lock.acquire(proposal_key)?;

    let governor = &ctx.accounts.governor;
    let bond_amount = governor.bond_amount;
    let clock = Clock::get()?;
    let challenge_window_ends = clock
        .unix_timestamp
        .checked_add(governor.liveness)
        .ok_or(GovernorError::ArithmeticOverflow)?;

    // Bond: proposer must have approved the governor PDA as delegate.
    let source = &ctx.accounts.proposer_token_account;
    require!(
        source.delegate == COption::Some(governor_key) && source.delegated_amount >= bond_amount,
        GovernorError::BondNotApproved
    );

    let seeds = governor.signer_seeds();
    let signer_seeds: &[&[&[u8]]] = &[&seeds];

    token::transfer(
        CpiContext::new_with_signer(
            ctx.accounts.token_program.to_account_info(),
            Transfer {
                from: source.to_account_info(),
                to: ctx.accounts.bond_vault.to_account_info(),
                authority: governor.to_account_info(),
            },
            signer_seeds,
        ),
        bond_amount,
    )
    .map_err(|_| GovernorError::BondTransferFailed)?;

    // Oracle assertion
    let claim = construct_claim(&proposal_hash, &explanation, &governor.rules);
    let args = AssertTruthArgs {
        claim,
        asserter: ctx.accounts.proposer.key(),
        liveness: governor.liveness,
        currency: governor.collateral_mint,
        bond: bond_amount,
        identifier: governor.identifier,
        domain_id: NO_DOMAIN,
    };

    let governor_info = governor.to_account_info();
    let oracle_accounts = AssertTruthAccounts {
        oracle_program: &ctx.accounts.oracle_program.to_account_info(),
        assertion: &ctx.accounts.assertion.to_account_info(),
        payer: &ctx.accounts.proposer.to_account_info(),
        bond_authority: &governor_info,
        bond_source: &ctx.accounts.bond_vault.to_account_info(),
        bond_escrow: &ctx.accounts.oracle_bond_escrow.to_account_info(),
        currency: &ctx.accounts.collateral_mint.to_account_info(),
        token_program: &ctx.accounts.token_program.to_account_info(),
        system_program: &ctx.accounts.system_program.to_account_info(),
    };
    let assertion_id = oracle::assert_truth(&oracle_accounts, &args, &seeds)?;

    let assertion_key = ctx.accounts.assertion.key();
    require_keys_eq!(
        assertion_key,
        oracle::assertion_address(&governor.oracle_program, &assertion_id),
        GovernorError::UnknownAssertion
    );

    let rules = governor.rules.clone();

    // Record the proposal
    let proposal = &mut ctx.accounts.proposal;
    proposal.governor = governor_key;
    proposal.proposal_hash = proposal_hash;
    proposal.transactions_hash = transactions_hash;
    proposal.explanation_hash = explanation_hash;
    proposal.round = round;
    proposal.proposer = ctx.accounts.proposer.key();
    proposal.proposal_time = clock.unix_timestamp;
    proposal.challenge_window_ends = challenge_window_ends;
    proposal.assertion_id = assertion_id;
    proposal.assertion = assertion_key;
    proposal.bond_amount = bond_amount;
    proposal.transaction_count = transactions.len() as u16;
    proposal.status = ProposalStatus::Proposed;
    if let Some(resolution) = vote_resolution.as_ref() {
        proposal.attach_vote_resolution(resolution);
    }
    proposal.bump = ctx.bumps.proposal;
    proposal._reserved = [0u8; 32];

    let governor = &mut ctx.accounts.governor;
    governor.total_proposals = governor
        .total_proposals
        .checked_add(1)
        .ok_or(GovernorError::ArithmeticOverflow)?;

    msg!(
        "Proposal {} submitted with {} transactions, round {}",
        proposal_key,
        transactions.len(),
        round
    );

    emit!(TransactionsProposed {
        governor: governor_key,
        proposal: proposal_key,
        proposer: ctx.accounts.proposer.key(),
        proposal_time: clock.unix_timestamp,
        assertion_id,
        proposal_hash,
        round,
        transactions,
        explanation,
        rules,
        challenge_window_ends,
    });

    if let Some(resolution) = vote_resolution {
        emit!(VoteResolved {
            proposal: proposal_key,
            proposal_hash,
            assertion_id,
            for_votes: resolution.for_votes,
            against_votes: resolution.against_votes,
            abstain_votes: resolution.abstain_votes,
            vote_merkle_root: resolution.vote_merkle_root,
            data: resolution.data,
        });
    }

    Ok(proposal_hash)
}
