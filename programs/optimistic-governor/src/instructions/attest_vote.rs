//! Attest a vote record against a proposal's vote Merkle root
//!
//! Attestations are an audit trail only. They never change the proposal's
//! status and never gate execution.

use crate::errors::GovernorError;
use crate::events::VoteAttested;
use crate::state::{GovernorConfig, Proposal, VoteAttestation};
use crate::utils::merkle::{verify, vote_leaf};
use anchor_lang::prelude::*;

#[derive(Accounts)]
pub struct AttestVote<'info> {
    #[account(
        seeds = [b"governor", governor.avatar.as_ref()],
        bump = governor.bump
    )]
    pub governor: Box<Account<'info, GovernorConfig>>,

    #[account(
        mut,
        seeds = [
            b"proposal",
            governor.key().as_ref(),
            proposal.proposal_hash.as_ref(),
            proposal.round.to_le_bytes().as_ref()
        ],
        bump = proposal.bump
    )]
    pub proposal: Box<Account<'info, Proposal>>,

    /// One record per (proposal, voter); a second attestation is rejected
    #[account(
        init_if_needed,
        payer = voter,
        space = VoteAttestation::SIZE,
        seeds = [b"attestation", proposal.key().as_ref(), voter.key().as_ref()],
        bump
    )]
    pub attestation: Account<'info, VoteAttestation>,

    #[account(mut)]
    pub voter: Signer<'info>,

    pub system_program: Program<'info, System>,
}

pub fn handler(
    ctx: Context<AttestVote>,
    for_amount: u64,
    against_amount: u64,
    abstain_amount: u64,
    proof: Vec<[u8; 32]>,
) -> Result<()> {
    let proposal = &mut ctx.accounts.proposal;
    let attestation = &mut ctx.accounts.attestation;
    let voter = ctx.accounts.voter.key();

    require!(proposal.has_vote_resolution, GovernorError::NoVoteResolution);

    let leaf = vote_leaf(&voter, for_amount, against_amount, abstain_amount);
    require!(
        verify(&proposal.vote_merkle_root, leaf, &proof),
        GovernorError::InvalidVoteProof
    );

    require!(!attestation.is_attested(), GovernorError::AlreadyAttested);

    let clock = Clock::get()?;
    attestation.proposal = proposal.key();
    attestation.voter = voter;
    attestation.for_amount = for_amount;
    attestation.against_amount = against_amount;
    attestation.abstain_amount = abstain_amount;
    attestation.attested_at = clock.unix_timestamp;
    attestation.bump = ctx.bumps.attestation;

    proposal.attestations = proposal
        .attestations
        .checked_add(1)
        .ok_or(GovernorError::ArithmeticOverflow)?;

    emit!(VoteAttested {
        proposal: proposal.key(),
        proposal_hash: proposal.proposal_hash,
        assertion_id: proposal.assertion_id,
        voter,
        for_amount,
        against_amount,
        abstain_amount,
        timestamp: clock.unix_timestamp,
    });

    Ok(())
}
