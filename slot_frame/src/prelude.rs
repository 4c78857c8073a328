pub use crate::{
    account_view::{AccountView, AsAccountView},
    context::Context,
    cpi::{CpiAccount, CpiBuilder, DuplicateStrategy, IntoCpiAccount},
    dispatch::InstructionSet,
    errors::{frame_error, Error, ErrorCode, ErrorInfo, FrameError},
    events::Event,
    instruction::{Instruction, InstructionArgs},
    lifecycle::{close_account, create_account, reallocate, stamp_tag, transfer_lamports},
    program::{system::System, SlotFrameProgram},
    schema::{AccountSchema, Accounts},
    slot::{Account, Data, Mut, Program, Record, Signer, SystemAccount, Unchecked},
    tag::Tag,
};

pub use crate::{address, bail, ensure, ensure_eq, ensure_ne, error, sighash};

pub use crate::Result;

pub use pinocchio::program_error::ProgramError;
pub use pinocchio_log::log;

pub use solana_address::Address;

pub use borsh::{BorshDeserialize, BorshSerialize};

// bytemuck
pub use bytemuck::{NoUninit, Pod, Zeroable};

#[cfg(all(feature = "idl", not(target_os = "solana")))]
pub use crate::idl::{
    AccountSchemaToIdl, AccountToIdl, EventToIdl, InstructionSetToIdl, InstructionToIdl,
    ProgramToIdl, TypeToIdl,
};

#[cfg(all(feature = "idl", not(target_os = "solana")))]
pub use slot_frame_idl::IdlDefinition;

pub use slot_frame_proc::TypeToIdl;
