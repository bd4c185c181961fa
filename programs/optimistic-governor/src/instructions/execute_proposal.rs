//! Execute a resolved proposal through the avatar after its challenge window
//!
//! The caller re-supplies the batch, which must hash to the stored
//! `transactions_hash`. Each transaction's target program and accounts are
//! passed as remaining accounts. Any failing transaction aborts the whole
//! instruction, so either every transaction runs or none does and the proposal
//! stays Resolved.

use crate::avatar::{build_exec_instruction, collect_account_infos, exec_transaction_from_module};
use crate::errors::GovernorError;
use crate::events::{ProposalExecuted, TransactionExecuted};
use crate::state::{GovernanceTransaction, GovernorConfig, Proposal, ProposalHashLock};
use crate::utils::proposal_hash::hash_transactions;
use anchor_lang::prelude::*;

#[derive(Accounts)]
pub struct ExecuteProposal<'info> {
    #[account(
        mut,
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

    /// CHECK: Must be the governor's avatar.
    #[account(
        mut,
        address = governor.avatar @ GovernorError::InvalidAvatar
    )]
    pub avatar: UncheckedAccount<'info>,

    /// CHECK: Must be the governor's avatar program.
    #[account(
        executable,
        address = governor.avatar_program @ GovernorError::InvalidAvatar
    )]
    pub avatar_program: UncheckedAccount<'info>,

    /// Executor can be anyone
    pub executor: Signer<'info>,
}

pub fn handler<'info>(
    ctx: Context<'_, '_, 'info, 'info, ExecuteProposal<'info>>,
    transactions: Vec<GovernanceTransaction>,
) -> Result<()> {
    let clock = Clock::get()?;
    let proposal = &ctx.accounts.proposal;

    proposal.check_executable(clock.unix_timestamp)?;
    require!(
        hash_transactions(&transactions)? == proposal.transactions_hash,
        GovernorError::TransactionsMismatch
    );

    let governor = &ctx.accounts.governor;
    let seeds = governor.signer_seeds();
    let fixed = [
        ctx.accounts.avatar.to_account_info(),
        governor.to_account_info(),
        ctx.accounts.avatar_program.to_account_info(),
    ];

    for (index, tx) in transactions.iter().enumerate() {
        let ix = build_exec_instruction(
            &governor.avatar_program,
            &governor.avatar,
            &governor.key(),
            tx,
        )?;
        let infos = collect_account_infos(tx, &fixed, ctx.remaining_accounts)?;
        exec_transaction_from_module(&ix, &infos, &seeds)?;

        emit!(TransactionExecuted {
            proposal_hash: proposal.proposal_hash,
            assertion_id: proposal.assertion_id,
            transaction_index: index as u16,
        });
    }

    let proposal = &mut ctx.accounts.proposal;
    proposal.mark_executed(clock.unix_timestamp)?;

    let lock = &mut ctx.accounts.proposal_lock;
    if lock.live_proposal == proposal.key() {
        lock.release();
    }

    let governor = &mut ctx.accounts.governor;
    governor.executed_proposals = governor
        .executed_proposals
        .checked_add(1)
        .ok_or(GovernorError::ArithmeticOverflow)?;

    msg!(
        "Proposal {} executed {} transactions",
        proposal.key(),
        transactions.len()
    );

    emit!(ProposalExecuted {
        proposal: proposal.key(),
        proposal_hash: proposal.proposal_hash,
        assertion_id: proposal.assertion_id,
        executor: ctx.accounts.executor.key(),
        timestamp: clock.unix_timestamp,
    });

    Ok(())
}
