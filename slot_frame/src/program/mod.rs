//! Program definitions and the entrypoint glue between the host and the dispatcher.

pub mod system;

use crate::{
    dispatch::{dispatch, InstructionSet},
    errors::handle_error,
    runtime::{Runtime, SolanaRuntime},
    Result,
};
use solana_address::Address;

pub use slot_frame_proc::SlotFrameProgram;

/// Status returned to the host when an instruction succeeds.
pub const SUCCESS: u64 = 0;

/// A Solana program's definition and the main entrypoint into a `slot_frame` program. This should
/// be derived using the [`SlotFrameProgram`](derive@SlotFrameProgram) macro, since it does more
/// than just implement this trait.
pub trait SlotFrameProgram {
    /// The instructions this program routes to.
    type InstructionSet: InstructionSet;

    const ID: Address;

    /// Routes the runtime input to the matching instruction.
    ///
    /// # Safety
    /// `input` must point to a runtime input buffer that stays valid and unaliased for the call.
    #[inline]
    unsafe fn process(input: *mut u8, runtime: &dyn Runtime) -> Result<()> {
        // SAFETY: upheld by the caller.
        unsafe { dispatch(<Self::InstructionSet as InstructionSet>::ROUTES, input, runtime) }
    }

    /// The entrypoint called by [`slot_frame_entrypoint`](crate::slot_frame_entrypoint). Any
    /// error is logged and mapped to a single non-zero status.
    ///
    /// # Safety
    /// Same as [`Self::process`].
    #[inline]
    unsafe fn entrypoint(input: *mut u8) -> u64 {
        // SAFETY: upheld by the caller.
        match unsafe { Self::process(input, &SolanaRuntime) } {
            Ok(()) => SUCCESS,
            Err(error) => handle_error(&error),
        }
    }
}

/// Defines useful top level items for a `slot_frame` program.
///
/// This is called by the [`SlotFrameProgram`](slot_frame_proc::SlotFrameProgram) derive macro.
#[macro_export]
macro_rules! program_setup {
    ($program:ty) => {
        #[allow(dead_code)]
        pub type SlotFrameDeclaredProgram = $program;

        #[doc = r" The const program ID."]
        pub const ID: $crate::solana_address::Address =
            <$program as $crate::program::SlotFrameProgram>::ID;

        #[doc = r" Returns `true` if given address is the program ID."]
        pub fn check_id(id: &$crate::solana_address::Address) -> bool {
            id == &ID
        }

        #[doc = r" Returns the program ID."]
        pub const fn id() -> $crate::solana_address::Address {
            ID
        }

        #[test]
        fn test_id() {
            assert!(check_id(&id()));
        }
    };
}
