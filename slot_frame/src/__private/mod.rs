pub mod macro_prelude {
    pub use crate::account_view::AccountView;
    pub use crate::dispatch::{tags_unique, InstructionSet, Route};
    pub use crate::errors::FrameError;
    pub use crate::events::Event;
    pub use crate::instruction::InstructionArgs;
    pub use crate::program::SlotFrameProgram;
    pub use crate::schema::{AccountSchema, Bump, HasOne, Seed, Seeds, SlotDef};
    pub use crate::slot::{Record, RecordField, SlotType};
    pub use crate::tag::Tag;
    pub use crate::Result;
    pub use slot_frame_proc::sighash;
    pub use solana_address::Address;

    #[cfg(all(feature = "idl", not(target_os = "solana")))]
    pub use crate::{
        idl::{
            slot_to_idl, AccountSchemaToIdl, ErrorsToIdl, EventToIdl, InstructionSetToIdl,
            InstructionToIdl, ProgramToIdl, SlotToIdl, TypeToIdl,
        },
        IdlResult,
    };

    #[cfg(all(feature = "idl", not(target_os = "solana")))]
    pub use slot_frame_idl::{
        instruction::IdlSlot,
        item_source,
        ty::{IdlEnumVariant, IdlStructField, IdlType, IdlTypeDef},
        CrateMetadata, ErrorNode, IdlDefinition,
    };
}
