//! Bridge to the avatar program.
//!
//! The avatar owns the funds and permissions the DAO controls. The governor
//! is enabled on it as a module and asks it to run each approved transaction
//! through `exec_transaction_from_module`, signing as the governor PDA.

use anchor_lang::prelude::*;
use anchor_lang::solana_program::instruction::{AccountMeta, Instruction};
use anchor_lang::solana_program::program::{get_return_data, invoke_signed};

use crate::errors::GovernorError;
use crate::state::{GovernanceTransaction, Operation};

/// `sha256("global:exec_transaction_from_module")[..8]`
pub const EXEC_TRANSACTION_DISCRIMINATOR: [u8; 8] = [38, 116, 178, 95, 218, 216, 202, 160];

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct ExecTransactionArgs {
    pub to: Pubkey,
    pub value: u64,
    pub data: Vec<u8>,
    pub operation: Operation,
}

impl From<&GovernanceTransaction> for ExecTransactionArgs {
    fn from(tx: &GovernanceTransaction) -> Self {
        Self {
            to: tx.to,
            value: tx.value,
            data: tx.data.clone(),
            operation: tx.operation,
        }
    }
}

/// Build the avatar instruction for one proposed transaction.
///
/// Fixed accounts are `[avatar, module, target]`, followed by the
/// transaction's own accounts. Signer flags are dropped on the forwarded
/// accounts: the avatar grants its own signature inside its program.
pub fn build_exec_instruction(
    avatar_program: &Pubkey,
    avatar: &Pubkey,
    module: &Pubkey,
    tx: &GovernanceTransaction,
) -> Result<Instruction> {
    let mut data = EXEC_TRANSACTION_DISCRIMINATOR.to_vec();
    ExecTransactionArgs::from(tx)
        .serialize(&mut data)
        .map_err(|_| error!(GovernorError::TransactionExecutionFailed))?;

    let mut accounts = Vec::with_capacity(3 + tx.accounts.len());
    accounts.push(AccountMeta::new(*avatar, false));
    accounts.push(AccountMeta::new_readonly(*module, true));
    accounts.push(AccountMeta::new_readonly(tx.to, false));
    accounts.extend(tx.accounts.iter().map(|account| {
        if account.is_writable {
            AccountMeta::new(account.pubkey, false)
        } else {
            AccountMeta::new_readonly(account.pubkey, false)
        }
    }));

    Ok(Instruction {
        program_id: *avatar_program,
        accounts,
        data,
    })
}

/// Collect the account infos a transaction needs out of the accounts passed
/// to the instruction.
pub fn collect_account_infos<'info>(
    tx: &GovernanceTransaction,
    fixed: &[AccountInfo<'info>],
    remaining: &[AccountInfo<'info>],
) -> Result<Vec<AccountInfo<'info>>> {
    let mut infos = fixed.to_vec();
    for key in std::iter::once(&tx.to).chain(tx.accounts.iter().map(|a| &a.pubkey)) {
        let info = fixed
            .iter()
            .chain(remaining.iter())
            .find(|info| info.key == key)
            .ok_or(GovernorError::MissingTransactionAccount)?;
        infos.push(info.clone());
    }
    Ok(infos)
}

/// Interpret the avatar's return data as its success flag.
pub fn parse_success(return_data: Option<(Pubkey, Vec<u8>)>, avatar_program: &Pubkey) -> bool {
    matches!(
        return_data,
        Some((program_id, data)) if program_id == *avatar_program && data == [1u8]
    )
}

/// Run one transaction through the avatar. A failed CPI or a `false` success
/// flag both abort with `TransactionExecutionFailed`.
pub fn exec_transaction_from_module<'info>(
    ix: &Instruction,
    account_infos: &[AccountInfo<'info>],
    signer_seeds: &[&[u8]],
) -> Result<()> {
    invoke_signed(ix, account_infos, &[signer_seeds]).map_err(|e| {
        msg!("Avatar execution failed: {:?}", e);
        GovernorError::TransactionExecutionFailed
    })?;

    require!(
        parse_success(get_return_data(), &ix.program_id),
        GovernorError::TransactionExecutionFailed
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::TransactionAccount;

    fn key(n: u8) -> Pubkey {
        Pubkey::new_from_array([n; 32])
    }

    fn sample_tx() -> GovernanceTransaction {
        GovernanceTransaction {
            to: key(10),
            value: 5,
            data: vec![1, 2, 3],
            operation: Operation::Call,
            accounts: vec![
                TransactionAccount {
                    pubkey: key(11),
                    is_signer: true,
                    is_writable: true,
                },
                TransactionAccount {
                    pubkey: key(12),
                    is_signer: false,
                    is_writable: false,
                },
            ],
        }
    }

    #[test]
    fn test_exec_instruction_layout() {
        let tx = sample_tx();
        let ix = build_exec_instruction(&key(1), &key(2), &key(3), &tx).unwrap();

        assert_eq!(ix.program_id, key(1));
        assert_eq!(ix.data[..8], EXEC_TRANSACTION_DISCRIMINATOR);
        assert_eq!(
            ExecTransactionArgs::try_from_slice(&ix.data[8..]).unwrap(),
            ExecTransactionArgs::from(&tx)
        );

        let keys: Vec<Pubkey> = ix.accounts.iter().map(|m| m.pubkey).collect();
        assert_eq!(keys, vec![key(2), key(3), key(10), key(11), key(12)]);
        assert!(ix.accounts[1].is_signer);
        assert!(!ix.accounts[3].is_signer);
        assert!(ix.accounts[3].is_writable);
        assert!(!ix.accounts[4].is_writable);
    }

    #[test]
    fn test_success_flag() {
        assert!(parse_success(Some((key(1), vec![1])), &key(1)));
        assert!(!parse_success(Some((key(1), vec![0])), &key(1)));
        assert!(!parse_success(Some((key(2), vec![1])), &key(1)));
        assert!(!parse_success(None, &key(1)));
    }
}
