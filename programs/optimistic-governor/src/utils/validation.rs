//! Input validation for proposals and governor parameters
//!
//! Every check here runs before the governor touches the token program or the
//! oracle, so a rejected input never leaves a partial side effect.

use anchor_lang::prelude::*;

use crate::errors::GovernorError;
use crate::instructions::constants::{
    MAX_EXPLANATION_LEN, MAX_TRANSACTIONS, MAX_TRANSACTION_ACCOUNTS, MAX_TRANSACTION_DATA_LEN,
    MAX_VOTE_DATA_LEN,
};
use crate::state::{GovernanceTransaction, GovernorConfig, VoteResolution, MAX_RULES_LEN};

pub fn validate_transactions(transactions: &[GovernanceTransaction]) -> Result<()> {
    require!(!transactions.is_empty(), GovernorError::EmptyProposal);
    require!(
        transactions.len() <= MAX_TRANSACTIONS,
        GovernorError::TooManyTransactions
    );
    for tx in transactions {
        require!(
            tx.to != Pubkey::default(),
            GovernorError::InvalidTransactionTarget
        );
        require!(
            tx.data.len() <= MAX_TRANSACTION_DATA_LEN,
            GovernorError::TransactionDataTooLong
        );
        require!(
            tx.accounts.len() <= MAX_TRANSACTION_ACCOUNTS,
            GovernorError::TooManyTransactionAccounts
        );
    }
    Ok(())
}

pub fn validate_explanation(explanation: &[u8]) -> Result<()> {
    require!(
        explanation.len() <= MAX_EXPLANATION_LEN,
        GovernorError::ExplanationTooLong
    );
    Ok(())
}

/// A resolution must commit to a real tree; the tallies themselves are
/// informational and not checked against the root.
pub fn validate_vote_resolution(resolution: &VoteResolution) -> Result<()> {
    require!(
        resolution.vote_merkle_root != [0u8; 32],
        GovernorError::InvalidVoteResolution
    );
    require!(
        resolution.data.len() <= MAX_VOTE_DATA_LEN,
        GovernorError::VoteDataTooLong
    );
    Ok(())
}

pub fn validate_rules(rules: &str) -> Result<()> {
    require!(
        !rules.is_empty() && rules.len() <= MAX_RULES_LEN,
        GovernorError::InvalidRules
    );
    Ok(())
}

pub fn validate_liveness(liveness: i64) -> Result<()> {
    require!(
        liveness > 0 && liveness <= GovernorConfig::MAX_LIVENESS,
        GovernorError::InvalidLiveness
    );
    Ok(())
}

pub fn validate_identifier(identifier: &[u8; 32]) -> Result<()> {
    require!(*identifier != [0u8; 32], GovernorError::InvalidIdentifier);
    Ok(())
}

pub fn validate_bond_amount(bond_amount: u64) -> Result<()> {
    require!(bond_amount > 0, GovernorError::InvalidBondAmount);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Operation, TransactionAccount};

    fn tx() -> GovernanceTransaction {
        GovernanceTransaction {
            to: Pubkey::new_from_array([1u8; 32]),
            value: 0,
            data: vec![0u8; 8],
            operation: Operation::Call,
            accounts: vec![],
        }
    }

    #[test]
    fn test_valid_batch() {
        assert!(validate_transactions(&[tx(), tx()]).is_ok());
    }

    #[test]
    fn test_empty_batch() {
        assert_eq!(
            validate_transactions(&[]).unwrap_err(),
            GovernorError::EmptyProposal.into()
        );
    }

    #[test]
    fn test_batch_too_long() {
        let batch = vec![tx(); MAX_TRANSACTIONS + 1];
        assert_eq!(
            validate_transactions(&batch).unwrap_err(),
            GovernorError::TooManyTransactions.into()
        );
        assert!(validate_transactions(&batch[..MAX_TRANSACTIONS]).is_ok());
    }

    #[test]
    fn test_default_target_rejected() {
        let mut bad = tx();
        bad.to = Pubkey::default();
        assert_eq!(
            validate_transactions(&[tx(), bad]).unwrap_err(),
            GovernorError::InvalidTransactionTarget.into()
        );
    }

    #[test]
    fn test_transaction_size_limits() {
        let mut big_data = tx();
        big_data.data = vec![0u8; MAX_TRANSACTION_DATA_LEN + 1];
        assert_eq!(
            validate_transactions(&[big_data]).unwrap_err(),
            GovernorError::TransactionDataTooLong.into()
        );

        let mut many_accounts = tx();
        many_accounts.accounts = vec![
            TransactionAccount {
                pubkey: Pubkey::new_from_array([2u8; 32]),
                is_signer: false,
                is_writable: false,
            };
            MAX_TRANSACTION_ACCOUNTS + 1
        ];
        assert_eq!(
            validate_transactions(&[many_accounts]).unwrap_err(),
            GovernorError::TooManyTransactionAccounts.into()
        );
    }

    #[test]
    fn test_explanation_bounds() {
        assert!(validate_explanation(b"").is_ok());
        assert!(validate_explanation(&[b'a'; MAX_EXPLANATION_LEN]).is_ok());
        assert_eq!(
            validate_explanation(&[b'a'; MAX_EXPLANATION_LEN + 1]).unwrap_err(),
            GovernorError::ExplanationTooLong.into()
        );
    }

    #[test]
    fn test_vote_resolution_needs_root() {
        let mut resolution = VoteResolution::default();
        assert_eq!(
            validate_vote_resolution(&resolution).unwrap_err(),
            GovernorError::InvalidVoteResolution.into()
        );
        resolution.vote_merkle_root = [5u8; 32];
        assert!(validate_vote_resolution(&resolution).is_ok());
        resolution.data = "x".repeat(MAX_VOTE_DATA_LEN + 1);
        assert_eq!(
            validate_vote_resolution(&resolution).unwrap_err(),
            GovernorError::VoteDataTooLong.into()
        );
    }

    #[test]
    fn test_config_parameters() {
        assert!(validate_rules("no rug pulls").is_ok());
        assert!(validate_rules("").is_err());
        assert!(validate_rules(&"r".repeat(MAX_RULES_LEN + 1)).is_err());

        assert!(validate_liveness(GovernorConfig::DEFAULT_LIVENESS).is_ok());
        assert!(validate_liveness(GovernorConfig::MAX_LIVENESS).is_ok());
        assert!(validate_liveness(0).is_err());
        assert!(validate_liveness(GovernorConfig::MAX_LIVENESS + 1).is_err());

        assert!(validate_identifier(&[1u8; 32]).is_ok());
        assert!(validate_identifier(&[0u8; 32]).is_err());

        assert!(validate_bond_amount(1).is_ok());
        assert_eq!(
            validate_bond_amount(0).unwrap_err(),
            GovernorError::InvalidBondAmount.into()
        );
    }
}
