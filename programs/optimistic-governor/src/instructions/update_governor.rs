//! Owner-gated governor parameter updates
//!
//! Changes apply to proposals submitted afterwards. Each proposal snapshots
//! its bond and challenge window at submission, and the rules it was asserted
//! under are part of its oracle claim.

use crate::errors::GovernorError;
use crate::events::GovernorParamsUpdated;
use crate::state::GovernorConfig;
use crate::utils::validation::{
    validate_bond_amount, validate_identifier, validate_liveness, validate_rules,
};
use anchor_lang::prelude::*;
use anchor_spl::token::{Mint, Token, TokenAccount};

#[derive(Accounts)]
pub struct UpdateGovernor<'info> {
    #[account(
        mut,
        seeds = [b"governor", governor.avatar.as_ref()],
        bump = governor.bump,
        has_one = owner @ GovernorError::UnauthorizedOwner
    )]
    pub governor: Box<Account<'info, GovernorConfig>>,

    pub owner: Signer<'info>,
}

#[derive(Accounts)]
pub struct SetCollateralAndBond<'info> {
    #[account(
        mut,
        seeds = [b"governor", governor.avatar.as_ref()],
        bump = governor.bump,
        has_one = owner @ GovernorError::UnauthorizedOwner
    )]
    pub governor: Box<Account<'info, GovernorConfig>>,

    pub owner: Signer<'info>,

    pub collateral_mint: Box<Account<'info, Mint>>,

    /// Vault for the new collateral; created on first use of a mint
    #[account(
        init_if_needed,
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

fn emit_params_updated(governor: &Account<GovernorConfig>) -> Result<()> {
    let clock = Clock::get()?;
    emit!(GovernorParamsUpdated {
        governor: governor.key(),
        collateral_mint: governor.collateral_mint,
        bond_amount: governor.bond_amount,
        liveness: governor.liveness,
        identifier: governor.identifier,
        rules: governor.rules.clone(),
        timestamp: clock.unix_timestamp,
    });
    Ok(())
}

pub fn set_collateral_and_bond_handler(
    ctx: Context<SetCollateralAndBond>,
    bond_amount: u64,
) -> Result<()> {
    validate_bond_amount(bond_amount)?;

    let governor = &mut ctx.accounts.governor;
    governor.collateral_mint = ctx.accounts.collateral_mint.key();
    governor.bond_amount = bond_amount;

    msg!(
        "Collateral set to {} with bond {}",
        governor.collateral_mint,
        bond_amount
    );
    emit_params_updated(governor)
}

pub fn set_rules_handler(ctx: Context<UpdateGovernor>, rules: String) -> Result<()> {
    validate_rules(&rules)?;

    let governor = &mut ctx.accounts.governor;
    governor.rules = rules;

    msg!("Rules updated");
    emit_params_updated(governor)
}

pub fn set_liveness_handler(ctx: Context<UpdateGovernor>, liveness: i64) -> Result<()> {
    validate_liveness(liveness)?;

    let governor = &mut ctx.accounts.governor;
    governor.liveness = liveness;

    msg!("Liveness set to {}s", liveness);
    emit_params_updated(governor)
}

pub fn set_identifier_handler(ctx: Context<UpdateGovernor>, identifier: [u8; 32]) -> Result<()> {
    validate_identifier(&identifier)?;

    let governor = &mut ctx.accounts.governor;
    governor.identifier = identifier;

    msg!("Identifier updated");
    emit_params_updated(governor)
}
