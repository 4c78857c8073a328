#![allow(clippy::let_and_return)]
mod accounts;
mod address;
mod event;
mod frame_error;
mod hash;
mod instruction_args;
mod instruction_set;
mod program;
mod record;
mod type_to_idl;
mod util;

use proc_macro_error2::proc_macro_error;
use syn::{parse_macro_input, punctuated::Punctuated, token::Comma, DeriveInput, ItemEnum, LitStr};

/// Derives `AccountSchema` and `AccountSchemaToIdl` for a struct of slots.
///
/// Each field is one slot, in declaration order, and its type must implement `SlotType`. The
/// generated `SLOTS` table is a constant, so the offset of every fixed-size slot in the input
/// buffer is known at compile time.
///
/// # Field Attributes
///
/// ## `#[slot(...)]`
/// - `has_one = <slot>` - The record field named like `<slot>` must hold the address of `<slot>`.
/// - `has_one(<field> = <slot>)` - The record field `<field>` must hold the address of `<slot>`.
/// - `seeds = [<seed>, ...]` - The slot's address must be derived from these seeds under the
///   invoked program. A seed is a byte string or string literal, an `UPPER_CASE` constant of type
///   `&'static [u8]`, or the name of another slot whose address is used.
/// - `bump = <field>` - Reads the bump from a `u8` record field instead of searching for the
///   canonical one. Requires `seeds`.
/// - `init(payer = <slot>, space = <expr>)` - Creates the account before the handler runs.
///   `space` defaults to the fixed size of the slot type.
/// - `close = <slot>` - Closes the account after the handler returns, sending its lamports to
///   `<slot>`.
/// - `address = <expr>` - The slot must hold this exact address.
/// - `owner = <expr>` - The slot's account must be owned by this program.
///
/// # Example
/// ```ignore
/// use slot_frame::prelude::*;
///
/// #[derive(Accounts)]
/// pub struct IncrementAccounts {
///     pub authority: Signer,
///     #[slot(has_one = authority, seeds = [b"counter", authority], bump = bump)]
///     pub counter: Mut<Account<Counter>>,
/// }
/// ```
#[proc_macro_error]
#[proc_macro_derive(Accounts, attributes(slot))]
pub fn derive_accounts(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let out = accounts::derive_accounts_impl(parse_macro_input!(input as DeriveInput));
    out.into()
}

/// Derives `InstructionArgs` for the borsh-encoded argument struct of an instruction.
///
/// The instruction is named after the struct in snake case and its tag is
/// `sighash!("global", <name>)`. `TypeToIdl` is derived as well unless `skip_idl` is given.
///
/// # Arguments
/// ```ignore
/// #[ix(accounts = <ty>, name = "<name>", skip_validation, skip_idl)]
/// ```
/// - `accounts` - The `AccountSchema` of the instruction. Required.
/// - `name` - Overrides the instruction name, and with it the tag.
/// - `skip_validation` - The dispatcher does not check the schema's constraints before the handler.
/// - `skip_idl` - Skips the `TypeToIdl` implementation.
#[proc_macro_error]
#[proc_macro_derive(InstructionArgs, attributes(ix))]
pub fn derive_instruction_args(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let out =
        instruction_args::derive_instruction_args_impl(parse_macro_input!(input as DeriveInput));
    out.into()
}

/// Derives `InstructionSet` (and `InstructionSetToIdl`) for an enum of instructions.
///
/// Each variant holds exactly one instruction type. The derive builds the routing table and
/// fails to compile if two instructions share a tag.
///
/// # Example
/// ```ignore
/// use slot_frame::prelude::*;
///
/// #[derive(InstructionSet)]
/// pub enum CounterInstructionSet {
///     Initialize(Initialize),
///     Increment(Increment),
/// }
/// ```
#[proc_macro_error]
#[proc_macro_derive(InstructionSet, attributes(ix_set))]
pub fn derive_instruction_set(item: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let out = instruction_set::instruction_set_impl(parse_macro_input!(item as ItemEnum));
    out.into()
}

/// Derives `Record` for a plain-old-data struct stored in program accounts.
///
/// The account tag is `sighash!("account", <StructName>)`. Every field is listed with its offset,
/// so constraints can refer to record fields by name. The struct should be `#[repr(C)]` and
/// `Pod`.
///
/// # Arguments
/// ```ignore
/// #[record(program = <ty>, skip_idl)]
/// ```
/// - `program` - The owning program. Defaults to `crate::SlotFrameDeclaredProgram`.
/// - `skip_idl` - Skips the `TypeToIdl` implementation.
#[proc_macro_error]
#[proc_macro_derive(Record, attributes(record))]
pub fn derive_record(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let out = record::derive_record_impl(parse_macro_input!(input as DeriveInput));
    out.into()
}

/// Derives `Event` for a borsh-serializable struct, tagged with `sighash!("event", <StructName>)`.
#[proc_macro_error]
#[proc_macro_derive(Event, attributes(event))]
pub fn derive_event(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let out = event::derive_event_impl(parse_macro_input!(input as DeriveInput));
    out.into()
}

/// Derives `TypeToIdl` for a struct or enum.
///
/// The type is registered in the IDL under its short name. Registering a different type with the
/// same short name is an error.
///
/// # Example
/// ```ignore
/// use slot_frame::prelude::*;
///
/// #[derive(TypeToIdl)]
/// pub struct Params {
///     pub step: u64,
///     pub label: String,
/// }
/// ```
#[proc_macro_error]
#[proc_macro_derive(TypeToIdl)]
pub fn derive_type_to_idl(item: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let out = type_to_idl::derive_type_to_idl_impl(parse_macro_input!(item as DeriveInput));
    out.into()
}

/// Derives `SlotFrameProgram` and sets up the entrypoint and useful items for a program. This
/// should be placed at the root of the crate.
///
/// ## Additional code generated:
/// - Solana entrypoint - Calls `slot_frame_entrypoint!` with the program struct.
/// - `SlotFrameDeclaredProgram` - A type alias for the struct, used as the default owner of records.
/// - `ID`, `id()` and `check_id()` for the program address.
///
/// # Arguments
/// ```ignore
/// #[program(
///     instruction_set = <ty>,
///     id = <expr>,
///     errors = <ty>,
///     events = [<ty>, ...],
///     no_entrypoint,
///     no_setup,
///     skip_idl
/// )]
/// ```
/// - `instruction_set` - The enum deriving `InstructionSet`.
/// - `id` - The program address, as a base58 string literal or an expression.
/// - `errors` - The `frame_error` enum listed in the IDL. Defaults to `()`.
/// - `events` - The events listed in the IDL.
/// - `no_entrypoint` - Skips the entrypoint. The generated one is already feature gated.
/// - `no_setup` - Skips `program_setup!`, for crates containing several programs.
/// - `skip_idl` - Skips the `ProgramToIdl` implementation.
///
/// The arguments can be split up into multiple attributes for conditional compilation.
#[proc_macro_error]
#[proc_macro_derive(SlotFrameProgram, attributes(program))]
pub fn derive_program(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let out = program::program_impl(parse_macro_input!(input as DeriveInput));
    out.into()
}

/// Turns a unit-variant enum into program errors.
///
/// Every variant needs a `#[msg("...")]` attribute. Codes are `(offset << 16) + discriminant`,
/// where `offset` defaults to a hash of the crate name.
///
/// # Example
/// ```ignore
/// use slot_frame::prelude::*;
///
/// #[frame_error(offset = 7)]
/// pub enum CounterError {
///     #[msg("The counter would overflow")]
///     Overflow,
/// }
/// ```
#[proc_macro_error]
#[proc_macro_attribute]
pub fn frame_error(
    args: proc_macro::TokenStream,
    item: proc_macro::TokenStream,
) -> proc_macro::TokenStream {
    frame_error::frame_error_impl(parse_macro_input!(item as ItemEnum), args.into()).into()
}

/// Compile time hashing of string literals.
///
/// Takes in multiple string literals and returns the first 8 bytes of their sha256 hash. The
/// strings are joined with a `:` separator before hashing.
///
/// # Example
/// ```
/// use slot_frame_proc::sighash;
/// assert_eq!(
///     sighash!("global", "initialize"),
///     [175, 175, 109, 31, 13, 152, 155, 237]
/// );
/// ```
#[proc_macro_error]
#[proc_macro]
pub fn sighash(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    hash::sighash_impl(parse_macro_input!(input with Punctuated::<LitStr, Comma>::parse_terminated))
        .into()
}

/// Compile time generation of an `Address` from a base58 string literal, or passthrough of an
/// expression.
#[proc_macro]
pub fn address(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let out = parse_macro_input!(input as address::AddressInput);
    quote::quote!(#out).into()
}
