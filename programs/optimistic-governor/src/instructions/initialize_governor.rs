//! Initialize a governor for an avatar
//!
//! Creates the GovernorConfig PDA and the bond vault that holds proposer bonds
//! until the oracle pulls them. One governor exists per avatar.

use crate::errors::GovernorError;
use crate::events::GovernorInitialized;
use crate::state::GovernorConfig;
use crate::utils::validation::{
    validate_bond_amount, validate_identifier, validate_liveness, validate_rules,
};
use anchor_lang::prelude::*;
use anchor_spl::token::{Mint, Token, TokenAccount};

#[derive(Accounts)]
pub struct InitializeGovernor<'info> {
    #[account(
        init,
        payer = payer,
        space = GovernorConfig::SIZE,
        seeds = [b"governor", avatar.key().as_ref()],
        bump
    )]
    pub governor: Box<Account<'info, GovernorConfig>>,

    /// CHECK: Controlled account; only its owner program is checked here.
    #[account(
        constraint = avatar.owner == avatar_program.key @ GovernorError::InvalidAvatar
    )]
    pub avatar: UncheckedAccount<'info>,

    /// CHECK: Program that owns the avatar and accepts module calls.
    #[account(executable)]
    pub avatar_program: UncheckedAccount<'info>,

    /// CHECK: Assertion oracle program, invoked by CPI.
    #[account(executable)]
    pub oracle_program: UncheckedAccount<'info>,

    pub collateral_mint: Box<Account<'info, Mint>>,

    #[account(
        init,
        payer = payer,
        seeds = [b"bond_vault", governor.key().as_ref(), collateral_mint.key().as_ref()],
        bump,
        token::mint = collateral_mint,
        token::authority = governor,
    )]
    pub bond_vault: Box<Account<'info, TokenAccount>>,

    #[account(mut)]
    pub payer: Signer<'info>,

    pub token_program: Program<'info, Token>,
    pub system_program: Program<'info, System>,
}

pub fn handler(
    ctx: Context<InitializeGovernor>,
    owner: Pubkey,
    bond_amount: u64,
    rules: String,
    identifier: [u8; 32],
    liveness: i64,
) -> Result<()> {
    require!(owner != Pubkey::default(), GovernorError::UnauthorizedOwner);
    validate_bond_amount(bond_amount)?;
    validate_rules(&rules)?;
    validate_identifier(&identifier)?;
    validate_liveness(liveness)?;

    let governor = &mut ctx.accounts.governor;
    governor.owner = owner;
    governor.avatar = ctx.accounts.avatar.key();
    governor.avatar_program = ctx.accounts.avatar_program.key();
    governor.oracle_program = ctx.accounts.oracle_program.key();
    governor.collateral_mint = ctx.accounts.collateral_mint.key();
    governor.bond_amount = bond_amount;
    governor.liveness = liveness;
    governor.identifier = identifier;
    governor.rules = rules;
    governor.total_proposals = 0;
    governor.executed_proposals = 0;
    governor.bump = ctx.bumps.governor;
    governor._reserved = [0u8; 32];

    msg!("Governor initialized for avatar {}", governor.avatar);

    let clock = Clock::get()?;
    emit!(GovernorInitialized {
        governor: governor.key(),
        owner,
        avatar: governor.avatar,
        oracle_program: governor.oracle_program,
        collateral_mint: governor.collateral_mint,
        bond_amount,
        liveness,
        identifier,
        rules: governor.rules.clone(),
        timestamp: clock.unix_timestamp,
    });

    Ok(())
}
