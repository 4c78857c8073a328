//! Solana's system program and typed builders for the instructions the lifecycle helpers use.
//!
//! System instructions are encoded as a little-endian `u32` index followed by the borsh encoding
//! of their arguments.

use crate::{
    account_view::AccountView,
    cpi::{CpiAccount, CpiBuilder},
    program::SlotFrameProgram,
    Result,
};
use borsh::{BorshDeserialize, BorshSerialize};
use solana_address::Address;

/// Solana's system program.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Ord, PartialOrd)]
pub struct System;

impl SlotFrameProgram for System {
    type InstructionSet = ();
    /// The system program ID is all zeroes.
    const ID: Address = Address::new_from_array([0; 32]);
}

/// A system instruction and its index in the system program's instruction enum.
pub trait SystemInstruction: BorshSerialize + BorshDeserialize {
    const INDEX: u32;

    /// Starts an invocation of this instruction carrying `self` as its payload.
    fn cpi(&self) -> Result<CpiBuilder> {
        CpiBuilder::new(System::ID).data_with(&Self::INDEX.to_le_bytes(), self)
    }
}

/// Creates `new_account` with `space` bytes owned by `owner`, funded by `funder`.
///
/// Accounts: `[writable, signer] funder`, `[writable, signer] new_account`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, BorshDeserialize, BorshSerialize)]
pub struct CreateAccount {
    pub lamports: u64,
    pub space: u64,
    pub owner: Address,
}

/// Reassigns an account to `owner`.
///
/// Accounts: `[writable, signer] account`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, BorshDeserialize, BorshSerialize)]
pub struct Assign {
    pub owner: Address,
}

/// Moves `lamports` between two system accounts.
///
/// Accounts: `[writable, signer] from`, `[writable] to`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, BorshDeserialize, BorshSerialize)]
pub struct Transfer {
    pub lamports: u64,
}

/// Sets the data length of an empty system account.
///
/// Accounts: `[writable, signer] account`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, BorshDeserialize, BorshSerialize)]
pub struct Allocate {
    pub space: u64,
}

impl SystemInstruction for CreateAccount {
    const INDEX: u32 = 0;
}
impl SystemInstruction for Assign {
    const INDEX: u32 = 1;
}
impl SystemInstruction for Transfer {
    const INDEX: u32 = 2;
}
impl SystemInstruction for Allocate {
    const INDEX: u32 = 8;
}

impl CreateAccount {
    pub fn accounts(&self, funder: AccountView, new_account: AccountView) -> Result<CpiBuilder> {
        Ok(self
            .cpi()?
            .account(CpiAccount::writable_signer(funder))
            .account(CpiAccount::writable_signer(new_account)))
    }
}

impl Assign {
    pub fn accounts(&self, account: AccountView) -> Result<CpiBuilder> {
        Ok(self.cpi()?.account(CpiAccount::writable_signer(account)))
    }
}

impl Transfer {
    pub fn accounts(&self, from: AccountView, to: AccountView) -> Result<CpiBuilder> {
        Ok(self
            .cpi()?
            .account(CpiAccount::writable_signer(from))
            .account(CpiAccount::writable(to)))
    }
}

impl Allocate {
    pub fn accounts(&self, account: AccountView) -> Result<CpiBuilder> {
        Ok(self.cpi()?.account(CpiAccount::writable_signer(account)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{InputBuilder, TestAccount};

    #[test]
    fn transfer_encodes_index_then_args() -> Result<()> {
        let mut input = InputBuilder::new(Address::default())
            .account(TestAccount::new(Address::new_from_array([1; 32]), System::ID).signer())
            .account(TestAccount::new(Address::new_from_array([2; 32]), System::ID))
            .build();
        let views = input.views();
        let instruction = Transfer { lamports: 7 }
            .accounts(views[0], views[1])?
            .build()?;
        assert_eq!(instruction.program_id, System::ID);
        assert_eq!(&instruction.data[..4], &2u32.to_le_bytes());
        assert_eq!(&instruction.data[4..], &7u64.to_le_bytes());
        assert!(instruction.accounts[0].is_signer && instruction.accounts[0].is_writable);
        assert!(!instruction.accounts[1].is_signer && instruction.accounts[1].is_writable);
        Ok(())
    }

    #[test]
    fn create_account_payload_layout() -> Result<()> {
        let owner = Address::new_from_array([4; 32]);
        let instruction = CreateAccount {
            lamports: 1,
            space: 48,
            owner,
        }
        .cpi()?
        .build()?;
        assert_eq!(instruction.data.len(), 4 + 8 + 8 + 32);
        assert_eq!(&instruction.data[..4], &0u32.to_le_bytes());
        assert_eq!(&instruction.data[20..], AsRef::<[u8]>::as_ref(&owner));
        Ok(())
    }
}
