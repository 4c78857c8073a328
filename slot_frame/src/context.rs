use crate::{
    account_view::AccountView,
    events::Event,
    runtime::{Rent, Runtime},
    Result,
};
use alloc::vec::Vec;
use core::cell::Cell;
use solana_address::Address;

/// Additional context given to [`crate::instruction::Instruction`]s: the executing program, the raw
/// instruction payload, accounts past the schema and the host services.
#[derive(derive_more::Debug)]
pub struct Context<'a> {
    program_id: &'a Address,
    payload: &'a [u8],
    remaining: &'a [AccountView],
    #[debug(skip)]
    runtime: &'a dyn Runtime,
    // Rent cache to avoid repeated sysvar calls
    rent_cache: Cell<Option<Rent>>,
}

impl<'a> Context<'a> {
    #[must_use]
    pub fn new(
        program_id: &'a Address,
        payload: &'a [u8],
        remaining: &'a [AccountView],
        runtime: &'a dyn Runtime,
    ) -> Self {
        Self {
            program_id,
            payload,
            remaining,
            runtime,
            rent_cache: Cell::new(None),
        }
    }

    /// The program id of the currently executing program.
    #[must_use]
    pub fn program_id(&self) -> &'a Address {
        self.program_id
    }

    /// The full instruction payload, tag included.
    #[must_use]
    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }

    /// Accounts supplied after the last slot of the instruction's schema.
    #[must_use]
    pub fn remaining_accounts(&self) -> &'a [AccountView] {
        self.remaining
    }

    #[must_use]
    pub fn runtime(&self) -> &'a dyn Runtime {
        self.runtime
    }

    /// Gets the rent sysvar from the cache, populating the cache from the runtime if empty.
    pub fn get_rent(&self) -> Result<Rent> {
        match self.rent_cache.get() {
            None => {
                let rent = self.runtime.get_rent()?;
                self.rent_cache.set(Some(rent));
                Ok(rent)
            }
            Some(rent) => Ok(rent),
        }
    }

    /// Emits `event` as a data log: its tag followed by its borsh encoding.
    pub fn emit<E: Event>(&self, event: &E) -> Result<()> {
        let mut data = Vec::from(E::TAG.to_bytes());
        borsh::to_writer(&mut data, event)?;
        self.runtime.log_data(&[&data]);
        Ok(())
    }

    pub fn set_return_data(&self, data: &[u8]) {
        self.runtime.set_return_data(data);
    }
}
