//! Bridge to the external assertion oracle.
//!
//! The oracle is a separate program. The governor talks to it in two ways:
//! an `assert_truth` CPI at proposal time, with the governor PDA signing as
//! bond authority, and direct reads of the oracle-owned assertion account at
//! settlement time. Dispute handling and bond payouts stay inside the oracle.

use anchor_lang::prelude::*;
use anchor_lang::solana_program::instruction::{AccountMeta, Instruction};
use anchor_lang::solana_program::program::{get_return_data, invoke_signed};

use crate::errors::GovernorError;

/// `sha256("global:assert_truth")[..8]`
pub const ASSERT_TRUTH_DISCRIMINATOR: [u8; 8] = [67, 39, 174, 32, 32, 148, 82, 231];

/// `sha256("account:Assertion")[..8]`
pub const ASSERTION_ACCOUNT_DISCRIMINATOR: [u8; 8] = [146, 138, 144, 0, 47, 3, 13, 130];

/// Seed prefix of the oracle's assertion PDAs
pub const ASSERTION_SEED: &[u8] = b"assertion";

/// Arguments of the oracle's `assert_truth` instruction.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct AssertTruthArgs {
    /// Claim text asserted as true
    pub claim: Vec<u8>,
    /// Account credited with the bond if the claim holds
    pub asserter: Pubkey,
    /// Challenge window in seconds
    pub liveness: i64,
    /// Bond currency mint
    pub currency: Pubkey,
    pub bond: u64,
    pub identifier: [u8; 32],
    pub domain_id: [u8; 32],
}

impl AssertTruthArgs {
    pub fn instruction_data(&self) -> Result<Vec<u8>> {
        let mut data = ASSERT_TRUTH_DISCRIMINATOR.to_vec();
        self.serialize(&mut data)
            .map_err(|_| error!(GovernorError::OracleAssertionFailed))?;
        Ok(data)
    }
}

/// Mirror of the oracle's assertion account, after its 8-byte discriminator.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct OracleAssertion {
    pub assertion_id: [u8; 32],
    pub asserter: Pubkey,
    pub currency: Pubkey,
    pub bond: u64,
    pub identifier: [u8; 32],
    pub domain_id: [u8; 32],
    pub assertion_time: i64,
    pub expiration_time: i64,
    /// Default pubkey while undisputed
    pub disputer: Pubkey,
    pub settled: bool,
    pub settlement_resolution: bool,
}

impl OracleAssertion {
    /// Decode raw account data, rejecting anything that is not an assertion
    /// account for `assertion_id`.
    pub fn try_from_account_data(data: &[u8], assertion_id: &[u8; 32]) -> Result<Self> {
        require!(
            data.len() > 8 && data[..8] == ASSERTION_ACCOUNT_DISCRIMINATOR,
            GovernorError::UnknownAssertion
        );
        let mut body = &data[8..];
        let assertion = Self::deserialize(&mut body)
            .map_err(|_| error!(GovernorError::UnknownAssertion))?;
        require!(
            assertion.assertion_id == *assertion_id,
            GovernorError::UnknownAssertion
        );
        Ok(assertion)
    }
}

/// Settlement state of an assertion as seen by the governor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AssertionResult {
    pub settled: bool,
    /// Meaningful only when `settled`
    pub result: bool,
}

impl From<&OracleAssertion> for AssertionResult {
    fn from(assertion: &OracleAssertion) -> Self {
        Self {
            settled: assertion.settled,
            result: assertion.settled && assertion.settlement_resolution,
        }
    }
}

/// Oracle PDA holding the assertion `assertion_id`.
pub fn assertion_address(oracle_program: &Pubkey, assertion_id: &[u8; 32]) -> Pubkey {
    Pubkey::find_program_address(&[ASSERTION_SEED, assertion_id.as_ref()], oracle_program).0
}

/// Read-only settlement lookup.
pub fn get_result(
    assertion_account: &AccountInfo,
    oracle_program: &Pubkey,
    assertion_id: &[u8; 32],
) -> Result<AssertionResult> {
    require!(
        assertion_account.owner == oracle_program,
        GovernorError::UnknownAssertion
    );
    require!(
        assertion_account.key() == assertion_address(oracle_program, assertion_id),
        GovernorError::UnknownAssertion
    );
    let data = assertion_account.try_borrow_data()?;
    let assertion = OracleAssertion::try_from_account_data(&data, assertion_id)?;
    Ok(AssertionResult::from(&assertion))
}

/// Accounts the oracle needs to record an assertion and pull its bond.
pub struct AssertTruthAccounts<'a, 'info> {
    pub oracle_program: &'a AccountInfo<'info>,
    /// Assertion PDA the oracle creates
    pub assertion: &'a AccountInfo<'info>,
    /// Pays rent for the assertion account
    pub payer: &'a AccountInfo<'info>,
    /// Governor PDA, delegate authority over `bond_source`
    pub bond_authority: &'a AccountInfo<'info>,
    pub bond_source: &'a AccountInfo<'info>,
    /// Oracle-side escrow receiving the bond
    pub bond_escrow: &'a AccountInfo<'info>,
    pub currency: &'a AccountInfo<'info>,
    pub token_program: &'a AccountInfo<'info>,
    pub system_program: &'a AccountInfo<'info>,
}

impl<'a, 'info> AssertTruthAccounts<'a, 'info> {
    fn metas(&self) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new(self.assertion.key(), false),
            AccountMeta::new(self.payer.key(), true),
            AccountMeta::new_readonly(self.bond_authority.key(), true),
            AccountMeta::new(self.bond_source.key(), false),
            AccountMeta::new(self.bond_escrow.key(), false),
            AccountMeta::new_readonly(self.currency.key(), false),
            AccountMeta::new_readonly(self.token_program.key(), false),
            AccountMeta::new_readonly(self.system_program.key(), false),
        ]
    }

    fn infos(&self) -> Vec<AccountInfo<'info>> {
        vec![
            self.assertion.clone(),
            self.payer.clone(),
            self.bond_authority.clone(),
            self.bond_source.clone(),
            self.bond_escrow.clone(),
            self.currency.clone(),
            self.token_program.clone(),
            self.system_program.clone(),
            self.oracle_program.clone(),
        ]
    }
}

/// Submit a claim to the oracle and return the assertion id it assigned.
///
/// The id is read from the oracle's CPI return data. No retries: any oracle
/// failure aborts the enclosing transaction.
pub fn assert_truth(
    accounts: &AssertTruthAccounts,
    args: &AssertTruthArgs,
    signer_seeds: &[&[u8]],
) -> Result<[u8; 32]> {
    let ix = Instruction {
        program_id: accounts.oracle_program.key(),
        accounts: accounts.metas(),
        data: args.instruction_data()?,
    };

    invoke_signed(&ix, &accounts.infos(), &[signer_seeds]).map_err(|e| {
        msg!("Oracle assert_truth failed: {:?}", e);
        GovernorError::OracleAssertionFailed
    })?;

    parse_assertion_id(get_return_data(), &accounts.oracle_program.key())
}

/// Extract a 32-byte assertion id from CPI return data set by `oracle_program`.
pub fn parse_assertion_id(
    return_data: Option<(Pubkey, Vec<u8>)>,
    oracle_program: &Pubkey,
) -> Result<[u8; 32]> {
    let (program_id, data) = return_data.ok_or(GovernorError::MissingAssertionId)?;
    require_keys_eq!(program_id, *oracle_program, GovernorError::MissingAssertionId);
    let assertion_id: [u8; 32] = data
        .as_slice()
        .try_into()
        .map_err(|_| error!(GovernorError::MissingAssertionId))?;
    require!(assertion_id != [0u8; 32], GovernorError::MissingAssertionId);
    Ok(assertion_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oracle() -> Pubkey {
        Pubkey::new_from_array([42u8; 32])
    }

    fn account_data(assertion: &OracleAssertion) -> Vec<u8> {
        let mut data = ASSERTION_ACCOUNT_DISCRIMINATOR.to_vec();
        assertion.serialize(&mut data).unwrap();
        // oracle accounts may carry trailing space
        data.extend_from_slice(&[0u8; 16]);
        data
    }

    fn settled(result: bool) -> OracleAssertion {
        OracleAssertion {
            assertion_id: [7u8; 32],
            bond: 100,
            settled: true,
            settlement_resolution: result,
            ..OracleAssertion::default()
        }
    }

    #[test]
    fn test_assert_truth_data_starts_with_discriminator() {
        let args = AssertTruthArgs {
            claim: b"claim".to_vec(),
            asserter: Pubkey::new_from_array([1u8; 32]),
            liveness: 7200,
            currency: Pubkey::new_from_array([2u8; 32]),
            bond: 10,
            identifier: [3u8; 32],
            domain_id: [0u8; 32],
        };
        let data = args.instruction_data().unwrap();
        assert_eq!(data[..8], ASSERT_TRUTH_DISCRIMINATOR);
        assert_eq!(AssertTruthArgs::try_from_slice(&data[8..]).unwrap(), args);
    }

    #[test]
    fn test_decode_settled_assertion() {
        let data = account_data(&settled(true));
        let assertion = OracleAssertion::try_from_account_data(&data, &[7u8; 32]).unwrap();
        assert_eq!(
            AssertionResult::from(&assertion),
            AssertionResult {
                settled: true,
                result: true
            }
        );
    }

    #[test]
    fn test_unsettled_assertion_has_no_result() {
        let mut assertion = settled(true);
        assertion.settled = false;
        let result = AssertionResult::from(&assertion);
        assert!(!result.settled);
        assert!(!result.result);
    }

    #[test]
    fn test_decode_rejects_other_id() {
        let data = account_data(&settled(false));
        assert_eq!(
            OracleAssertion::try_from_account_data(&data, &[8u8; 32]).unwrap_err(),
            GovernorError::UnknownAssertion.into()
        );
    }

    #[test]
    fn test_decode_rejects_wrong_discriminator() {
        let mut data = account_data(&settled(false));
        data[0] ^= 0xff;
        assert_eq!(
            OracleAssertion::try_from_account_data(&data, &[7u8; 32]).unwrap_err(),
            GovernorError::UnknownAssertion.into()
        );
        assert_eq!(
            OracleAssertion::try_from_account_data(&[], &[7u8; 32]).unwrap_err(),
            GovernorError::UnknownAssertion.into()
        );
    }

    #[test]
    fn test_parse_assertion_id() {
        let id = [9u8; 32];
        assert_eq!(
            parse_assertion_id(Some((oracle(), id.to_vec())), &oracle()).unwrap(),
            id
        );
        assert_eq!(
            parse_assertion_id(None, &oracle()).unwrap_err(),
            GovernorError::MissingAssertionId.into()
        );
        assert_eq!(
            parse_assertion_id(Some((oracle(), vec![1, 2, 3])), &oracle()).unwrap_err(),
            GovernorError::MissingAssertionId.into()
        );
    }

    #[test]
    fn test_parse_assertion_id_rejects_foreign_return_data() {
        let other = Pubkey::new_from_array([43u8; 32]);
        assert!(parse_assertion_id(Some((other, vec![9u8; 32])), &oracle()).is_err());
    }

    #[test]
    fn test_assertion_address_is_per_id() {
        assert_ne!(
            assertion_address(&oracle(), &[1u8; 32]),
            assertion_address(&oracle(), &[2u8; 32])
        );
    }
}
