//! The host services a program calls into: cross-program invocation, sysvars, logs and return
//! data.
//!
//! Handlers never call syscalls directly. They go through a [`Runtime`], which is
//! [`SolanaRuntime`] on chain and a recording mock in tests.

use crate::{cpi::CpiInstruction, Result};

/// Per-account bookkeeping the runtime charges rent against.
pub const ACCOUNT_STORAGE_OVERHEAD: u64 = 128;

/// The rent sysvar.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Rent {
    pub lamports_per_byte_year: u64,
    pub exemption_threshold: f64,
    pub burn_percent: u8,
}

impl Default for Rent {
    fn default() -> Self {
        Self {
            lamports_per_byte_year: 3_480,
            exemption_threshold: 2.0,
            burn_percent: 50,
        }
    }
}

impl Rent {
    /// Lamports an account with `data_len` bytes of data needs to be exempt from rent.
    #[must_use]
    pub fn minimum_balance(&self, data_len: usize) -> u64 {
        let bytes = ACCOUNT_STORAGE_OVERHEAD + data_len as u64;
        if self.exemption_threshold.to_bits() == 2.0_f64.to_bits() {
            bytes * self.lamports_per_byte_year * 2
        } else {
            #[allow(clippy::cast_precision_loss, clippy::cast_sign_loss)]
            let balance =
                ((bytes * self.lamports_per_byte_year) as f64 * self.exemption_threshold) as u64;
            balance
        }
    }

    #[must_use]
    pub fn is_exempt(&self, lamports: u64, data_len: usize) -> bool {
        lamports >= self.minimum_balance(data_len)
    }
}

/// Services the host provides to an executing program.
pub trait Runtime {
    /// Invokes another program. `signers` holds one seed list per program address the invoking
    /// program signs for. A failed invocation is never retried.
    fn invoke_signed(&self, instruction: &CpiInstruction, signers: &[&[&[u8]]]) -> Result<()>;

    fn get_rent(&self) -> Result<Rent>;

    /// Emits a structured log line made of `data`.
    fn log_data(&self, data: &[&[u8]]);

    fn set_return_data(&self, data: &[u8]);
}

/// The runtime provided by the validator's syscalls.
#[derive(Copy, Clone, Debug, Default)]
pub struct SolanaRuntime;

#[cfg(target_os = "solana")]
mod abi {
    use solana_address::Address;

    #[repr(C)]
    pub struct SolInstruction {
        pub program_id: *const Address,
        pub accounts: *const SolAccountMeta,
        pub accounts_len: u64,
        pub data: *const u8,
        pub data_len: u64,
    }

    #[repr(C)]
    pub struct SolAccountMeta {
        pub address: *const Address,
        pub is_writable: bool,
        pub is_signer: bool,
    }

    #[repr(C)]
    pub struct SolAccountInfo {
        pub address: *const Address,
        pub lamports: *mut u64,
        pub data_len: u64,
        pub data: *mut u8,
        pub owner: *mut Address,
        pub rent_epoch: u64,
        pub is_signer: bool,
        pub is_writable: bool,
        pub executable: bool,
    }

    #[repr(C)]
    pub struct SolSignerSeed {
        pub addr: *const u8,
        pub len: u64,
    }

    #[repr(C)]
    pub struct SolSignerSeeds {
        pub addr: *const SolSignerSeed,
        pub len: u64,
    }
}

#[cfg(target_os = "solana")]
impl Runtime for SolanaRuntime {
    fn invoke_signed(&self, instruction: &CpiInstruction, signers: &[&[&[u8]]]) -> Result<()> {
        use crate::{account_view::AccountHeader, errors::ErrorCode};
        use abi::*;
        use alloc::vec::Vec;
        use core::mem::offset_of;

        let metas: Vec<SolAccountMeta> = instruction
            .accounts
            .iter()
            .map(|account| SolAccountMeta {
                address: account.view.address(),
                is_writable: account.is_writable,
                is_signer: account.is_signer,
            })
            .collect();
        let infos: Vec<SolAccountInfo> = instruction
            .accounts
            .iter()
            .map(|account| {
                let header = account.view.as_ptr();
                // SAFETY: the offsets are inside the view's header.
                unsafe {
                    SolAccountInfo {
                        address: account.view.address(),
                        lamports: header.add(offset_of!(AccountHeader, lamports)).cast(),
                        data_len: account.view.data_len() as u64,
                        data: account.view.data_ptr(),
                        owner: header.add(offset_of!(AccountHeader, owner)).cast(),
                        rent_epoch: 0,
                        is_signer: account.view.is_signer(),
                        is_writable: account.view.is_writable(),
                        executable: account.view.executable(),
                    }
                }
            })
            .collect();
        let seeds: Vec<Vec<SolSignerSeed>> = signers
            .iter()
            .map(|signer| {
                signer
                    .iter()
                    .map(|seed| SolSignerSeed {
                        addr: seed.as_ptr(),
                        len: seed.len() as u64,
                    })
                    .collect()
            })
            .collect();
        let signer_seeds: Vec<SolSignerSeeds> = seeds
            .iter()
            .map(|seeds| SolSignerSeeds {
                addr: seeds.as_ptr(),
                len: seeds.len() as u64,
            })
            .collect();
        let sol_instruction = SolInstruction {
            program_id: &instruction.program_id,
            accounts: metas.as_ptr(),
            accounts_len: metas.len() as u64,
            data: instruction.data.as_ptr(),
            data_len: instruction.data.len() as u64,
        };

        // SAFETY: every pointer above outlives the call.
        let status = unsafe {
            pinocchio::syscalls::sol_invoke_signed_c(
                (&raw const sol_instruction).cast(),
                infos.as_ptr().cast(),
                infos.len() as u64,
                signer_seeds.as_ptr().cast(),
                signer_seeds.len() as u64,
            )
        };
        crate::ensure_eq!(
            status,
            0,
            ErrorCode::InvocationFailed,
            "invocation of {:?} returned status {}",
            instruction.program_id,
            status
        );
        Ok(())
    }

    fn get_rent(&self) -> Result<Rent> {
        let mut rent = core::mem::MaybeUninit::<Rent>::uninit();
        // SAFETY: the syscall writes a full `Rent`.
        let status = unsafe { pinocchio::syscalls::sol_get_rent_sysvar(rent.as_mut_ptr().cast()) };
        crate::ensure_eq!(
            status,
            0,
            pinocchio::program_error::ProgramError::UnsupportedSysvar,
            "rent sysvar unavailable"
        );
        // SAFETY: initialized by the successful syscall.
        Ok(unsafe { rent.assume_init() })
    }

    fn log_data(&self, data: &[&[u8]]) {
        // SAFETY: a slice of slices has the layout the syscall expects.
        unsafe { pinocchio::syscalls::sol_log_data(data.as_ptr().cast(), data.len() as u64) }
    }

    fn set_return_data(&self, data: &[u8]) {
        // SAFETY: the syscall copies `data`.
        unsafe { pinocchio::syscalls::sol_set_return_data(data.as_ptr(), data.len() as u64) }
    }
}

#[cfg(not(target_os = "solana"))]
impl Runtime for SolanaRuntime {
    fn invoke_signed(&self, instruction: &CpiInstruction, _signers: &[&[&[u8]]]) -> Result<()> {
        crate::bail!(
            crate::errors::ErrorCode::SyscallUnavailable,
            "cannot invoke {:?} off chain",
            instruction.program_id
        )
    }

    fn get_rent(&self) -> Result<Rent> {
        Ok(Rent::default())
    }

    fn log_data(&self, data: &[&[u8]]) {
        pinocchio_log::log!("Program data: {} fields", data.len());
    }

    fn set_return_data(&self, _data: &[u8]) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rent_matches_cluster() {
        let rent = Rent::default();
        assert_eq!(rent.minimum_balance(0), 890_880);
        assert_eq!(rent.minimum_balance(48), (128 + 48) * 3_480 * 2);
        assert!(rent.is_exempt(890_880, 0));
        assert!(!rent.is_exempt(890_879, 0));
    }

    #[test]
    fn fractional_threshold_uses_float_path() {
        let rent = Rent {
            exemption_threshold: 1.5,
            ..Rent::default()
        };
        assert_eq!(rent.minimum_balance(0), 128 * 3_480 * 3 / 2);
    }
}
