//! A zero-copy framework for Solana programs.
//!
//! Every instruction declares an ordered account schema. From that schema the framework computes,
//! at compile time, the exact byte offset of each account inside the buffer the runtime hands to the
//! program, so the common case never scans the buffer. Declarative constraints attached to each
//! slot are checked before the handler runs, instructions are routed by an 8-byte tag, and the same
//! declarations compile into an IDL document for client generators.
//!
//! ```ignore
//! use slot_frame::prelude::*;
//!
//! #[derive(SlotFrameProgram)]
//! #[program(instruction_set = CounterInstructionSet, id = "Coux9zxTFKZpRdFpE4F7Fs5RZ6FdaURdckwS61BUTMG")]
//! pub struct CounterProgram;
//!
//! #[derive(InstructionSet)]
//! pub enum CounterInstructionSet {
//!     Increment(Increment),
//! }
//!
//! #[derive(Accounts)]
//! pub struct IncrementAccounts {
//!     pub authority: Signer,
//!     #[slot(has_one = authority)]
//!     pub counter: Mut<Account<Counter>>,
//! }
//! ```
#![warn(
    clippy::pedantic,
    missing_copy_implementations,
    missing_debug_implementations,
    unsafe_op_in_unsafe_fn
)]
#![allow(
    unexpected_cfgs,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::wildcard_imports,
    clippy::cast_possible_truncation
)]

pub extern crate alloc;
pub extern crate borsh;
pub extern crate bytemuck;
pub extern crate derive_more;
pub extern crate itertools;
pub extern crate pinocchio;
pub extern crate pinocchio_log;
pub extern crate self as slot_frame;
#[cfg(all(feature = "idl", not(target_os = "solana")))]
pub extern crate serde_json;
#[cfg(all(feature = "idl", not(target_os = "solana")))]
pub extern crate slot_frame_idl;
pub extern crate solana_address;
pub extern crate static_assertions;

pub mod account_view;
pub mod context;
pub mod cpi;
pub mod dispatch;
pub mod entrypoint;
pub mod errors;
pub mod events;
#[cfg(all(feature = "idl", not(target_os = "solana")))]
pub mod idl;
pub mod instruction;
pub mod layout;
pub mod lifecycle;
pub mod prelude;
pub mod program;
pub mod runtime;
pub mod schema;
pub mod slot;
pub mod tag;
#[cfg(any(test, feature = "test_helpers"))]
pub mod testing;
pub mod validate;

/// Internal paths mainly for use in macros. DO NOT USE MANUALLY. NOT PART OF THE PUBLIC API.
#[doc(hidden)]
pub mod __private;

pub use slot_frame_proc::{address, sighash};

pub type Result<T, E = errors::Error> = core::result::Result<T, E>;

#[cfg(all(feature = "idl", not(target_os = "solana")))]
pub type IdlResult<T> = Result<T, slot_frame_idl::Error>;
