//! Cross program invocation (CPI) builders.
//!
//! A [`CpiBuilder`] collects account references from anything that exposes an [`AccountView`],
//! normalizes them into `(view, signer, writable)` triples, optionally collapses duplicate
//! addresses and issues the invocation through the context's [`Runtime`](crate::runtime::Runtime).

use crate::{
    account_view::{AccountView, AsAccountView},
    context::Context,
    errors::ErrorCode,
    instruction::InstructionArgs,
    Result,
};
use alloc::vec::Vec;
use borsh::BorshSerialize;
use solana_address::Address;

/// One account reference of an invocation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CpiAccount {
    pub view: AccountView,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl CpiAccount {
    /// Uses the flags the account was passed to this program with.
    #[must_use]
    pub fn new(view: AccountView) -> Self {
        Self {
            view,
            is_signer: view.is_signer(),
            is_writable: view.is_writable(),
        }
    }

    #[must_use]
    pub fn readonly(view: AccountView) -> Self {
        Self {
            view,
            is_signer: false,
            is_writable: false,
        }
    }

    #[must_use]
    pub fn writable(view: AccountView) -> Self {
        Self {
            view,
            is_signer: false,
            is_writable: true,
        }
    }

    #[must_use]
    pub fn signer(view: AccountView) -> Self {
        Self {
            view,
            is_signer: true,
            is_writable: false,
        }
    }

    #[must_use]
    pub fn writable_signer(view: AccountView) -> Self {
        Self {
            view,
            is_signer: true,
            is_writable: true,
        }
    }

    #[must_use]
    pub fn address(&self) -> &Address {
        self.view.address()
    }
}

/// Anything that can be passed as an invocation account.
pub trait IntoCpiAccount {
    fn into_cpi_account(self) -> CpiAccount;
}

impl IntoCpiAccount for CpiAccount {
    fn into_cpi_account(self) -> CpiAccount {
        self
    }
}

impl IntoCpiAccount for AccountView {
    fn into_cpi_account(self) -> CpiAccount {
        CpiAccount::new(self)
    }
}

impl<T: AsAccountView> IntoCpiAccount for &T {
    fn into_cpi_account(self) -> CpiAccount {
        CpiAccount::new(*self.account_view())
    }
}

/// What [`CpiBuilder::build`] does with several references to the same address.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum DuplicateStrategy {
    /// Pass every reference through unchanged.
    #[default]
    KeepAll,
    /// Collapse references into the first one, OR-ing their flags.
    Merge,
    /// Collapse identical references and fail if the flags differ.
    Reject,
}

/// A fully assembled invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CpiInstruction {
    pub program_id: Address,
    pub accounts: Vec<CpiAccount>,
    pub data: Vec<u8>,
}

/// Builder for a [`CpiInstruction`].
///
/// ```ignore
/// CpiBuilder::new(System::ID)
///     .account(CpiAccount::writable_signer(*payer.account_view()))
///     .account(&recipient)
///     .data_with(&2u32.to_le_bytes(), &500u64)?
///     .invoke(ctx)?;
/// ```
#[must_use = "Did you forget to invoke the builder?"]
#[derive(derive_more::Debug, Clone)]
pub struct CpiBuilder {
    program_id: Address,
    #[debug("{} accounts", self.accounts.len())]
    accounts: Vec<CpiAccount>,
    #[debug("{} bytes", self.data.len())]
    data: Vec<u8>,
    duplicates: DuplicateStrategy,
}

impl CpiBuilder {
    pub fn new(program_id: Address) -> Self {
        Self {
            program_id,
            accounts: Vec::new(),
            data: Vec::new(),
            duplicates: DuplicateStrategy::default(),
        }
    }

    pub fn account(mut self, account: impl IntoCpiAccount) -> Self {
        self.accounts.push(account.into_cpi_account());
        self
    }

    pub fn accounts<A: IntoCpiAccount>(mut self, accounts: impl IntoIterator<Item = A>) -> Self {
        self.accounts
            .extend(accounts.into_iter().map(IntoCpiAccount::into_cpi_account));
        self
    }

    /// Uses `data` as the raw payload.
    pub fn data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.data = data.into();
        self
    }

    /// Uses `discriminant` followed by the borsh encoding of `args` as the payload.
    pub fn data_with<T: BorshSerialize + ?Sized>(
        mut self,
        discriminant: &[u8],
        args: &T,
    ) -> Result<Self> {
        let mut data = Vec::from(discriminant);
        borsh::to_writer(&mut data, args)?;
        self.data = data;
        Ok(self)
    }

    /// Uses the payload a program built on this framework expects for instruction `I`.
    pub fn instruction<I: InstructionArgs + BorshSerialize>(self, args: &I) -> Result<Self> {
        self.data_with(&I::TAG.to_bytes(), args)
    }

    pub fn duplicates(mut self, strategy: DuplicateStrategy) -> Self {
        self.duplicates = strategy;
        self
    }

    /// Applies the duplicate strategy and returns the finished invocation.
    pub fn build(self) -> Result<CpiInstruction> {
        let accounts = match self.duplicates {
            DuplicateStrategy::KeepAll => self.accounts,
            strategy => collapse_duplicates(self.accounts, strategy == DuplicateStrategy::Reject)?,
        };
        Ok(CpiInstruction {
            program_id: self.program_id,
            accounts,
            data: self.data,
        })
    }

    /// Invokes with no derived-address signers.
    pub fn invoke(self, ctx: &Context<'_>) -> Result<()> {
        self.invoke_signed(ctx, &[])
    }

    /// Invokes, signing for each derived address whose seeds (bump last) are in `signer_seeds`.
    pub fn invoke_signed(self, ctx: &Context<'_>, signer_seeds: &[&[&[u8]]]) -> Result<()> {
        let instruction = self.build()?;
        ctx.runtime().invoke_signed(&instruction, signer_seeds)
    }
}

fn collapse_duplicates(accounts: Vec<CpiAccount>, reject_conflicts: bool) -> Result<Vec<CpiAccount>> {
    let mut collapsed: Vec<CpiAccount> = Vec::with_capacity(accounts.len());
    for account in accounts {
        let Some(existing) = collapsed
            .iter_mut()
            .find(|existing| existing.address() == account.address())
        else {
            collapsed.push(account);
            continue;
        };
        if reject_conflicts {
            crate::ensure!(
                existing.is_signer == account.is_signer
                    && existing.is_writable == account.is_writable,
                ErrorCode::ConflictingDuplicateAccount,
                "{:?} is referenced with different flags",
                account.address()
            );
        }
        existing.is_signer |= account.is_signer;
        existing.is_writable |= account.is_writable;
    }
    Ok(collapsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{InputBuilder, TestAccount};
    use pretty_assertions::assert_eq;

    fn views() -> (crate::testing::InputBuffer, [AccountView; 2]) {
        let mut input = InputBuilder::new(Address::new_from_array([1; 32]))
            .account(TestAccount::new(Address::new_from_array([2; 32]), Address::default()).signer())
            .account(TestAccount::new(Address::new_from_array([3; 32]), Address::default()).writable())
            .build();
        let views = input.views();
        (input, [views[0], views[1]])
    }

    #[test]
    fn keep_all_preserves_order_and_duplicates() -> Result<()> {
        let (_input, [a, b]) = views();
        let instruction = CpiBuilder::new(Address::new_from_array([9; 32]))
            .account(a)
            .account(CpiAccount::readonly(b))
            .account(CpiAccount::writable(a))
            .data(vec![1, 2])
            .build()?;
        assert_eq!(instruction.accounts.len(), 3);
        assert_eq!(instruction.accounts[0], CpiAccount::signer(a));
        assert_eq!(instruction.accounts[2], CpiAccount::writable(a));
        assert_eq!(instruction.data, vec![1, 2]);
        Ok(())
    }

    #[test]
    fn merge_ors_flags_into_first_reference() -> Result<()> {
        let (_input, [a, b]) = views();
        let instruction = CpiBuilder::new(Address::default())
            .accounts([CpiAccount::signer(a), CpiAccount::readonly(b), CpiAccount::writable(a)])
            .duplicates(DuplicateStrategy::Merge)
            .build()?;
        assert_eq!(
            instruction.accounts,
            vec![CpiAccount::writable_signer(a), CpiAccount::readonly(b)]
        );
        Ok(())
    }

    #[test]
    fn reject_fails_on_conflicting_flags() {
        let (_input, [a, _]) = views();
        let identical = CpiBuilder::new(Address::default())
            .accounts([CpiAccount::signer(a), CpiAccount::signer(a)])
            .duplicates(DuplicateStrategy::Reject)
            .build();
        assert_eq!(identical.map(|ix| ix.accounts.len()).ok(), Some(1));

        let err = CpiBuilder::new(Address::default())
            .accounts([CpiAccount::signer(a), CpiAccount::writable(a)])
            .duplicates(DuplicateStrategy::Reject)
            .build()
            .unwrap_err();
        assert!(err.is(ErrorCode::ConflictingDuplicateAccount));
    }

    #[test]
    fn data_with_prefixes_discriminant() -> Result<()> {
        let instruction = CpiBuilder::new(Address::default())
            .data_with(&2u32.to_le_bytes(), &500u64)?
            .build()?;
        let mut expected = 2u32.to_le_bytes().to_vec();
        expected.extend_from_slice(&500u64.to_le_bytes());
        assert_eq!(instruction.data, expected);
        Ok(())
    }
}
