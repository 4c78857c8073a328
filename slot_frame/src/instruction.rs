//! Instruction declarations: argument types, their account schema and their handler.

use crate::{context::Context, schema::AccountSchema, tag::Tag, Result};
use borsh::BorshDeserialize;
use bytemuck::NoUninit;

pub use slot_frame_proc::InstructionArgs;

/// The argument struct of an instruction, borsh-decoded from the payload bytes after its tag.
///
/// Derivable with [`derive@InstructionArgs`], which names the instruction after the struct in
/// snake case and sets [`Self::TAG`] to `sighash!("global", <name>)`.
pub trait InstructionArgs: BorshDeserialize {
    const NAME: &'static str;
    const TAG: Tag;
    /// Whether the dispatcher runs the schema's constraint checks before the handler.
    const VALIDATE: bool = true;
    type Accounts: AccountSchema;
}

/// An instruction handler.
///
/// The dispatcher runs these steps:
/// 1. Decode `Self` from the payload after the tag using [`BorshDeserialize`].
/// 2. Check the schema's constraints, unless [`InstructionArgs::VALIDATE`] is false.
/// 3. Create the accounts of `init` slots.
/// 4. Wrap the views in [`InstructionArgs::Accounts`] and call [`Self::process`].
/// 5. Close the accounts of `close` slots.
/// 6. Set the return data to [`bytemuck::bytes_of`] the result if it is not empty.
pub trait Instruction: InstructionArgs {
    /// The return type of this instruction.
    type ReturnType: NoUninit;

    fn process(
        accounts: &mut Self::Accounts,
        args: Self,
        ctx: &mut Context<'_>,
    ) -> Result<Self::ReturnType>;
}
