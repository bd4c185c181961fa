//! Apply the oracle's settlement to a proposal (permissionless)

use crate::errors::GovernorError;
use crate::events::ProposalResolved;
use crate::oracle;
use crate::state::{GovernorConfig, Proposal, ProposalHashLock, ProposalStatus};
use anchor_lang::prelude::*;

#[derive(Accounts)]
pub struct SettleProposal<'info> {
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

    #[account(
        mut,
        seeds = [b"proposal_lock", governor.key().as_ref(), proposal.proposal_hash.as_ref()],
        bump = proposal_lock.bump
    )]
    pub proposal_lock: Box<Account<'info, ProposalHashLock>>,

    /// CHECK: Oracle-owned assertion account, verified in `oracle::get_result`.
    #[account(
        address = proposal.assertion @ GovernorError::UnknownAssertion
    )]
    pub assertion: UncheckedAccount<'info>,

    pub caller: Signer<'info>,
}

pub fn handler(ctx: Context<SettleProposal>) -> Result<()> {
    let oracle_program = ctx.accounts.governor.oracle_program;
    let proposal = &mut ctx.accounts.proposal;

    require!(
        proposal.status == ProposalStatus::Proposed,
        GovernorError::ProposalNotPending
    );

    let result = oracle::get_result(
        &ctx.accounts.assertion.to_account_info(),
        &oracle_program,
        &proposal.assertion_id,
    )?;
    require!(result.settled, GovernorError::AssertionNotSettled);

    let clock = Clock::get()?;
    let status = proposal.record_settlement(result.result, clock.unix_timestamp)?;

    // A rejected hash may be proposed again.
    if status == ProposalStatus::Rejected {
        let lock = &mut ctx.accounts.proposal_lock;
        if lock.live_proposal == proposal.key() {
            lock.release();
        }
    }

    msg!(
        "Proposal {} settled: {}",
        proposal.key(),
        if result.result { "approved" } else { "rejected" }
    );

    emit!(ProposalResolved {
        proposal: proposal.key(),
        proposal_hash: proposal.proposal_hash,
        assertion_id: proposal.assertion_id,
        approved: result.result,
        status: status as u8,
        timestamp: clock.unix_timestamp,
    });

    Ok(())
}
