//! Off-chain helpers for driving programs without a validator.
//!
//! [`InputBuilder`] serializes accounts and a payload exactly the way the runtime does, so the
//! dispatcher under test walks the same bytes it would see on chain. [`MockRuntime`] stands in
//! for the host: it records every invocation, log and return value, and executes the handful of
//! system program instructions the lifecycle helpers issue directly on the input buffer.

use crate::{
    account_view::AccountView,
    cpi::CpiInstruction,
    errors::ErrorCode,
    instruction::InstructionArgs,
    layout::{align_up, ACCOUNT_HEADER_SIZE, MAX_PERMITTED_DATA_INCREASE, NON_DUP_MARKER},
    program::{
        system::{Allocate, Assign, CreateAccount, System, Transfer},
        SlotFrameProgram,
    },
    runtime::{Rent, Runtime},
    Result,
};
use alloc::vec::Vec;
use borsh::{BorshDeserialize, BorshSerialize};
use core::cell::RefCell;
use pinocchio::program_error::ProgramError;
use solana_address::Address;

/// One account to serialize into a test input.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TestAccount {
    pub address: Address,
    pub owner: Address,
    pub lamports: u64,
    pub data: Vec<u8>,
    pub is_signer: bool,
    pub is_writable: bool,
    pub executable: bool,
}

impl TestAccount {
    #[must_use]
    pub fn new(address: Address, owner: Address) -> Self {
        Self {
            address,
            owner,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn lamports(mut self, lamports: u64) -> Self {
        self.lamports = lamports;
        self
    }

    #[must_use]
    pub fn data(mut self, data: Vec<u8>) -> Self {
        self.data = data;
        self
    }

    #[must_use]
    pub fn signer(mut self) -> Self {
        self.is_signer = true;
        self
    }

    #[must_use]
    pub fn writable(mut self) -> Self {
        self.is_writable = true;
        self
    }

    #[must_use]
    pub fn executable(mut self) -> Self {
        self.executable = true;
        self
    }
}

#[derive(Clone, Debug)]
enum Entry {
    Account(TestAccount),
    Duplicate(usize),
}

/// Serializes accounts and a payload into a runtime input buffer.
#[derive(Clone, Debug)]
#[must_use]
pub struct InputBuilder {
    program_id: Address,
    entries: Vec<Entry>,
    payload: Vec<u8>,
}

impl InputBuilder {
    pub fn new(program_id: Address) -> Self {
        Self {
            program_id,
            entries: Vec::new(),
            payload: Vec::new(),
        }
    }

    pub fn account(mut self, account: TestAccount) -> Self {
        self.entries.push(Entry::Account(account));
        self
    }

    /// Adds a duplicate entry referencing the entry at `index`.
    pub fn duplicate(mut self, index: usize) -> Self {
        self.entries.push(Entry::Duplicate(index));
        self
    }

    pub fn payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    /// Uses `I`'s tag followed by the borsh encoding of `args` as the payload.
    pub fn instruction<I: InstructionArgs + BorshSerialize>(mut self, args: &I) -> Result<Self> {
        let mut payload = I::TAG.to_bytes().to_vec();
        borsh::to_writer(&mut payload, args)?;
        self.payload = payload;
        Ok(self)
    }

    pub fn build(self) -> InputBuffer {
        let mut bytes = Vec::new();
        let mut offsets = Vec::with_capacity(self.entries.len());
        bytes.extend_from_slice(&(self.entries.len() as u64).to_le_bytes());
        for entry in &self.entries {
            match entry {
                Entry::Account(account) => {
                    offsets.push(bytes.len());
                    write_account(&mut bytes, account);
                }
                Entry::Duplicate(index) => {
                    // Out of range markers are kept so the parser's rejection can be tested.
                    offsets.push(offsets.get(*index).copied().unwrap_or(usize::MAX));
                    let marker = u8::try_from(*index).unwrap_or(NON_DUP_MARKER - 1);
                    bytes.push(marker);
                    bytes.extend_from_slice(&[0; 7]);
                }
            }
        }
        bytes.extend_from_slice(&(self.payload.len() as u64).to_le_bytes());
        bytes.extend_from_slice(&self.payload);
        bytes.extend_from_slice(&self.program_id.to_bytes());

        let mut words = vec![0u64; bytes.len().div_ceil(8)];
        bytemuck::cast_slice_mut::<u64, u8>(&mut words)[..bytes.len()].copy_from_slice(&bytes);
        InputBuffer { words, offsets }
    }
}

fn write_account(bytes: &mut Vec<u8>, account: &TestAccount) {
    let start = bytes.len();
    bytes.push(NON_DUP_MARKER);
    bytes.push(u8::from(account.is_signer));
    bytes.push(u8::from(account.is_writable));
    bytes.push(u8::from(account.executable));
    bytes.extend_from_slice(&0i32.to_le_bytes());
    bytes.extend_from_slice(&account.address.to_bytes());
    bytes.extend_from_slice(&account.owner.to_bytes());
    bytes.extend_from_slice(&account.lamports.to_le_bytes());
    bytes.extend_from_slice(&(account.data.len() as u64).to_le_bytes());
    debug_assert_eq!(bytes.len() - start, ACCOUNT_HEADER_SIZE);
    bytes.extend_from_slice(&account.data);
    let padded = align_up(account.data.len() + MAX_PERMITTED_DATA_INCREASE);
    bytes.resize(bytes.len() + padded - account.data.len(), 0);
    bytes.extend_from_slice(&u64::MAX.to_le_bytes());
}

/// An 8-byte aligned runtime input buffer.
#[derive(Clone, Debug)]
pub struct InputBuffer {
    words: Vec<u64>,
    offsets: Vec<usize>,
}

impl InputBuffer {
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.words.as_mut_ptr().cast()
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.words)
    }

    /// A view of every entry, duplicates resolved to the view of their original.
    pub fn views(&mut self) -> Vec<AccountView> {
        let base = self.as_mut_ptr();
        self.offsets
            .iter()
            // SAFETY: every recorded offset is the start of a header inside `words`.
            .map(|offset| unsafe { AccountView::new_unchecked(base.add(*offset)) })
            .collect()
    }

    /// The current state of the entry at `index`.
    #[must_use]
    pub fn read_account(&self, index: usize) -> TestAccount {
        let offset = self.offsets[index];
        let bytes = self.as_bytes();
        let header = &bytes[offset..offset + ACCOUNT_HEADER_SIZE];
        let word = |start: usize| {
            u64::from_le_bytes(header[start..start + 8].try_into().unwrap_or_default())
        };
        let address = |start: usize| {
            Address::new_from_array(header[start..start + 32].try_into().unwrap_or_default())
        };
        let data_len = word(80) as usize;
        let data_start = offset + ACCOUNT_HEADER_SIZE;
        TestAccount {
            address: address(8),
            owner: address(40),
            lamports: word(72),
            data: bytes[data_start..data_start + data_len].to_vec(),
            is_signer: header[1] != 0,
            is_writable: header[2] != 0,
            executable: header[3] != 0,
        }
    }

    /// Runs `P` against this buffer.
    pub fn dispatch<P: SlotFrameProgram>(&mut self, runtime: &dyn Runtime) -> Result<()> {
        // SAFETY: the buffer was laid out by `InputBuilder` and is exclusively borrowed.
        unsafe { P::process(self.as_mut_ptr(), runtime) }
    }
}

/// A host double that records side effects and runs system program instructions in memory.
#[derive(Debug)]
pub struct MockRuntime {
    program_id: Address,
    rent: Rent,
    fail_foreign: bool,
    invocations: RefCell<Vec<CpiInstruction>>,
    logs: RefCell<Vec<Vec<Vec<u8>>>>,
    return_data: RefCell<Option<Vec<u8>>>,
}

impl MockRuntime {
    /// `program_id` is the invoking program, used to derive the addresses its seeds sign for.
    #[must_use]
    pub fn new(program_id: Address) -> Self {
        Self {
            program_id,
            rent: Rent::default(),
            fail_foreign: false,
            invocations: RefCell::default(),
            logs: RefCell::default(),
            return_data: RefCell::default(),
        }
    }

    #[must_use]
    pub fn with_rent(mut self, rent: Rent) -> Self {
        self.rent = rent;
        self
    }

    /// Makes every invocation of a program other than the system program fail.
    #[must_use]
    pub fn fail_foreign(mut self) -> Self {
        self.fail_foreign = true;
        self
    }

    #[must_use]
    pub fn invocations(&self) -> Vec<CpiInstruction> {
        self.invocations.borrow().clone()
    }

    /// Every `log_data` call, one entry per call holding its fields.
    #[must_use]
    pub fn logs(&self) -> Vec<Vec<Vec<u8>>> {
        self.logs.borrow().clone()
    }

    #[must_use]
    pub fn return_data(&self) -> Option<Vec<u8>> {
        self.return_data.borrow().clone()
    }

    fn check_privileges(&self, instruction: &CpiInstruction, signers: &[&[&[u8]]]) -> Result<()> {
        let signed = signers
            .iter()
            .map(|seeds| Address::create_program_address(seeds, &self.program_id))
            .collect::<Result<Vec<_>, _>>()?;
        for account in &instruction.accounts {
            crate::ensure!(
                !account.is_signer || account.view.is_signer() || signed.contains(account.address()),
                ErrorCode::ExpectedSigner,
                "{:?} did not sign",
                account.address()
            );
            crate::ensure!(
                !account.is_writable || account.view.is_writable(),
                ErrorCode::ExpectedWritable,
                "{:?} is not writable",
                account.address()
            );
        }
        Ok(())
    }
}

impl Runtime for MockRuntime {
    fn invoke_signed(&self, instruction: &CpiInstruction, signers: &[&[&[u8]]]) -> Result<()> {
        self.check_privileges(instruction, signers)?;
        self.invocations.borrow_mut().push(instruction.clone());
        if instruction.program_id == System::ID {
            execute_system(instruction)?;
        } else if self.fail_foreign {
            crate::bail!(
                ErrorCode::InvocationFailed,
                "{:?} failed",
                instruction.program_id
            );
        }
        Ok(())
    }

    fn get_rent(&self) -> Result<Rent> {
        Ok(self.rent)
    }

    fn log_data(&self, data: &[&[u8]]) {
        self.logs
            .borrow_mut()
            .push(data.iter().map(|field| field.to_vec()).collect());
    }

    fn set_return_data(&self, data: &[u8]) {
        *self.return_data.borrow_mut() = Some(data.to_vec());
    }
}

fn execute_system(instruction: &CpiInstruction) -> Result<()> {
    let (index, mut args) = instruction
        .data
        .split_first_chunk::<4>()
        .ok_or_else(|| crate::error!(ProgramError::InvalidInstructionData))?;
    let account = |index: usize| {
        instruction
            .accounts
            .get(index)
            .map(|account| account.view)
            .ok_or_else(|| crate::error!(ProgramError::NotEnoughAccountKeys))
    };
    match u32::from_le_bytes(*index) {
        0 => {
            let CreateAccount {
                lamports,
                space,
                owner,
            } = CreateAccount::deserialize(&mut args)?;
            let (funder, target) = (account(0)?, account(1)?);
            crate::ensure!(
                target.lamports() == 0 && target.is_data_empty(),
                ErrorCode::AccountAlreadyInitialized
            );
            debit(funder, lamports)?;
            target.set_lamports(lamports);
            // SAFETY: no references into the target's data are live during the invocation.
            unsafe {
                target.resize(space as usize)?;
                target.assign(&owner);
            }
        }
        1 => {
            let Assign { owner } = Assign::deserialize(&mut args)?;
            let target = account(0)?;
            crate::ensure!(target.is_owned_by(&System::ID), ErrorCode::OwnerMismatch);
            // SAFETY: as above.
            unsafe { target.assign(&owner) };
        }
        2 => {
            let Transfer { lamports } = Transfer::deserialize(&mut args)?;
            let (from, to) = (account(0)?, account(1)?);
            crate::ensure!(
                from.is_owned_by(&System::ID) && from.is_data_empty(),
                ErrorCode::OwnerMismatch,
                "transfer source must be a plain system account"
            );
            debit(from, lamports)?;
            let credited = to
                .lamports()
                .checked_add(lamports)
                .ok_or_else(|| crate::error!(ErrorCode::ArithmeticOverflow))?;
            to.set_lamports(credited);
        }
        8 => {
            let Allocate { space } = Allocate::deserialize(&mut args)?;
            let target = account(0)?;
            crate::ensure!(
                target.is_owned_by(&System::ID) && target.is_data_empty(),
                ErrorCode::AccountAlreadyInitialized
            );
            // SAFETY: as above.
            unsafe { target.resize(space as usize)? };
        }
        other => crate::bail!(
            ProgramError::InvalidInstructionData,
            "unsupported system instruction {}",
            other
        ),
    }
    Ok(())
}

fn debit(account: AccountView, lamports: u64) -> Result<()> {
    let remaining = account
        .lamports()
        .checked_sub(lamports)
        .ok_or_else(|| crate::error!(ProgramError::InsufficientFunds))?;
    account.set_lamports(remaining);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cpi::CpiBuilder, layout::account_span};

    const PROGRAM: Address = Address::new_from_array([5; 32]);

    #[test]
    fn builder_matches_runtime_layout() {
        let input = InputBuilder::new(PROGRAM)
            .account(TestAccount::new(Address::new_from_array([1; 32]), PROGRAM).data(vec![7; 3]))
            .duplicate(0)
            .payload(vec![1, 2])
            .build();
        let bytes = input.as_bytes();
        assert_eq!(bytes[..8], 2u64.to_le_bytes());
        let dup = 8 + account_span(3);
        assert_eq!(bytes[dup], 0);
        let payload_len = dup + 8;
        assert_eq!(bytes[payload_len..payload_len + 8], 2u64.to_le_bytes());
        assert_eq!(bytes[payload_len + 8..payload_len + 10], [1, 2]);
        assert_eq!(bytes[payload_len + 10..payload_len + 42], PROGRAM.to_bytes());
        assert_eq!(input.read_account(1).data, vec![7; 3]);
    }

    #[test]
    fn unsigned_derived_address_is_refused() -> Result<()> {
        let mut input = InputBuilder::new(PROGRAM)
            .account(TestAccount::new(Address::new_from_array([1; 32]), System::ID).lamports(10))
            .account(TestAccount::new(Address::new_from_array([2; 32]), System::ID))
            .build();
        let views = input.views();
        let runtime = MockRuntime::new(PROGRAM);
        let instruction = Transfer { lamports: 1 }.accounts(views[0], views[1])?.build()?;
        let err = runtime.invoke_signed(&instruction, &[]).unwrap_err();
        assert!(err.is(ErrorCode::ExpectedSigner));
        assert!(runtime.invocations().is_empty());
        Ok(())
    }

    #[test]
    fn foreign_invocations_are_recorded() -> Result<()> {
        let runtime = MockRuntime::new(PROGRAM);
        let instruction = CpiBuilder::new(Address::new_from_array([3; 32]))
            .data(vec![4])
            .build()?;
        runtime.invoke_signed(&instruction, &[])?;
        assert_eq!(runtime.invocations(), vec![instruction.clone()]);

        let failing = MockRuntime::new(PROGRAM).fail_foreign();
        let err = failing.invoke_signed(&instruction, &[]).unwrap_err();
        assert!(err.is(ErrorCode::InvocationFailed));
        Ok(())
    }
}
