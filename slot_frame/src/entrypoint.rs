/// Macro to define the entrypoint for a `slot_frame` program. It only needs the
/// [`SlotFrameProgram`](crate::program::SlotFrameProgram) type and is called by the
/// [`SlotFrameProgram`](slot_frame_proc::SlotFrameProgram) derive unless `no_entrypoint` is given.
///
/// The exported symbol hands the raw input pointer straight to the dispatcher, so no account is
/// deserialized before an instruction is selected.
///
/// # Example
/// ```ignore
/// use slot_frame::prelude::*;
///
/// #[derive(SlotFrameProgram)]
/// #[program(id = System::ID, instruction_set = (), no_entrypoint)]
/// pub struct MyProgram;
///
/// slot_frame_entrypoint!(MyProgram);
/// ```
#[macro_export]
macro_rules! slot_frame_entrypoint (
    ($program:ty) => {
        #[doc(hidden)]
        #[allow(unexpected_cfgs)]
        pub mod _entrypoint {
            use super::*;

            /// # Safety
            /// Called only by the runtime with a valid input buffer.
            #[cfg(all(target_os = "solana", not(any(feature = "no-entrypoint", feature = "no_entrypoint"))))]
            #[no_mangle]
            pub unsafe extern "C" fn entrypoint(input: *mut u8) -> u64 {
                // SAFETY: the runtime passes a serialized input buffer it owns for the call.
                unsafe { <$program as $crate::program::SlotFrameProgram>::entrypoint(input) }
            }

            #[cfg(all(target_os = "solana", not(any(feature = "no-entrypoint", feature = "no_entrypoint"))))]
            $crate::pinocchio::default_allocator!();
            #[cfg(all(target_os = "solana", not(any(feature = "no-entrypoint", feature = "no_entrypoint"))))]
            $crate::pinocchio::default_panic_handler!();
        }
    };
);
