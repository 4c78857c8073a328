//! IDL generation for `slot_frame` programs using [`slot_frame_idl`].
//!
//! The derives implement these traits next to the on-chain impls, so the document always
//! describes exactly the schemas, tags and records the dispatcher uses.
use crate::{
    dispatch::InstructionSet,
    errors::ErrorCode,
    events::Event,
    instruction::InstructionArgs,
    layout::SlotSize,
    program::SlotFrameProgram,
    schema::{Bump, Seed, SlotDef},
    slot::{Account, Data, Mut, Program, Record, Signer, SystemAccount, Unchecked},
    tag::Tag,
    IdlResult,
};
use core::mem::size_of;
use slot_frame_idl::{
    account::{IdlAccount, IdlEvent},
    instruction::{IdlHasOne, IdlInit, IdlInstruction, IdlSlot},
    seeds::{IdlBump, IdlSeed, IdlSeeds},
    ty::IdlTypeDef,
    CrateMetadata, Error, IdlDefinition, IdlMetadata, ItemDescription,
};

mod ty;

/// Derivable via [`derive@TypeToIdl`](slot_frame_proc::TypeToIdl).
pub trait TypeToIdl {
    /// The structural definition of this type, registering any nested composite types.
    fn type_def(idl_definition: &mut IdlDefinition) -> IdlResult<IdlTypeDef>;

    /// How other definitions refer to this type. Composite types register themselves in the type
    /// table and return a reference by short name.
    fn type_to_idl(idl_definition: &mut IdlDefinition) -> IdlResult<IdlTypeDef> {
        Self::type_def(idl_definition)
    }
}

/// Records stored in program owned accounts.
pub trait AccountToIdl: Record + TypeToIdl {
    /// Adds the account and its record type, returning the account's name.
    fn account_to_idl(idl_definition: &mut IdlDefinition) -> IdlResult<String> {
        let type_def = Self::type_to_idl(idl_definition)?;
        idl_definition.add_account(IdlAccount {
            name: Self::NAME.to_string(),
            discriminator: Self::TAG.to_bytes().to_vec(),
            size: Tag::LEN + size_of::<Self>(),
            type_def,
        })?;
        Ok(Self::NAME.to_string())
    }
}

impl<T: Record + TypeToIdl> AccountToIdl for T {}

pub trait EventToIdl: Event + TypeToIdl {
    fn event_to_idl(idl_definition: &mut IdlDefinition) -> IdlResult<()> {
        let type_def = Self::type_to_idl(idl_definition)?;
        idl_definition.add_event(IdlEvent {
            name: Self::NAME.to_string(),
            discriminator: Self::TAG.to_bytes().to_vec(),
            type_def,
        })?;
        Ok(())
    }
}

impl<T: Event + TypeToIdl> EventToIdl for T {}

/// The IDL side of a slot type: the record it holds, if any.
pub trait SlotToIdl {
    fn record_to_idl(_idl_definition: &mut IdlDefinition) -> IdlResult<Option<String>> {
        Ok(None)
    }
}

impl SlotToIdl for SystemAccount {}
impl<const N: usize> SlotToIdl for Data<N> {}
impl SlotToIdl for Unchecked {}
impl<P: SlotFrameProgram> SlotToIdl for Program<P> {}

impl<T: AccountToIdl> SlotToIdl for Account<T> {
    fn record_to_idl(idl_definition: &mut IdlDefinition) -> IdlResult<Option<String>> {
        T::account_to_idl(idl_definition).map(Some)
    }
}

impl<T: SlotToIdl> SlotToIdl for Signer<T> {
    fn record_to_idl(idl_definition: &mut IdlDefinition) -> IdlResult<Option<String>> {
        T::record_to_idl(idl_definition)
    }
}

impl<T: SlotToIdl> SlotToIdl for Mut<T> {
    fn record_to_idl(idl_definition: &mut IdlDefinition) -> IdlResult<Option<String>> {
        T::record_to_idl(idl_definition)
    }
}

/// Derivable via [`derive@Accounts`](slot_frame_proc::Accounts).
pub trait AccountSchemaToIdl {
    fn account_schema_to_idl(idl_definition: &mut IdlDefinition) -> IdlResult<Vec<IdlSlot>>;
}

impl AccountSchemaToIdl for () {
    fn account_schema_to_idl(_idl_definition: &mut IdlDefinition) -> IdlResult<Vec<IdlSlot>> {
        Ok(vec![])
    }
}

fn slot_name(slots: &[SlotDef], slot: &SlotDef, index: usize) -> IdlResult<String> {
    slots
        .get(index)
        .map(|target| target.name.to_string())
        .ok_or_else(|| Error::UnknownSlot {
            slot: slot.name.to_string(),
            index,
        })
}

/// Describes `slot` of `slots`, naming every slot it references.
pub fn slot_to_idl(
    slots: &[SlotDef],
    slot: &SlotDef,
    record: Option<String>,
    docs: ItemDescription,
) -> IdlResult<IdlSlot> {
    let seeds = slot
        .seeds
        .map(|seeds| -> IdlResult<IdlSeeds> {
            Ok(IdlSeeds {
                seeds: seeds
                    .seeds
                    .iter()
                    .map(|seed| match seed {
                        Seed::Const(bytes) => Ok(IdlSeed::Const(bytes.to_vec())),
                        Seed::Slot(index) => slot_name(slots, slot, *index).map(IdlSeed::Slot),
                    })
                    .collect::<IdlResult<_>>()?,
                bump: match seeds.bump {
                    Bump::Canonical => IdlBump::Canonical,
                    Bump::Field { name, .. } => IdlBump::Field(name.to_string()),
                },
            })
        })
        .transpose()?;
    let has_one = slot
        .has_one
        .iter()
        .map(|has_one| {
            Ok(IdlHasOne {
                field: has_one.field.to_string(),
                slot: slot_name(slots, slot, has_one.target)?,
            })
        })
        .collect::<IdlResult<_>>()?;
    let init = slot
        .init
        .map(|init| -> IdlResult<IdlInit> {
            Ok(IdlInit {
                payer: slot_name(slots, slot, init.payer)?,
                space: init.space,
            })
        })
        .transpose()?;
    let close = slot
        .close
        .map(|index| slot_name(slots, slot, index))
        .transpose()?;
    Ok(IdlSlot {
        name: slot.name.to_string(),
        docs,
        writable: slot.writable,
        signer: slot.signer,
        executable: slot.executable,
        size: match slot.size {
            SlotSize::Fixed(len) => Some(len),
            SlotSize::Dynamic => None,
        },
        address: slot.address,
        owner: slot.owner,
        record,
        seeds,
        has_one,
        init,
        close,
    })
}

/// Implemented for every instruction whose arguments and schema have IDL impls.
pub trait InstructionToIdl: InstructionArgs + TypeToIdl
where
    Self::Accounts: AccountSchemaToIdl,
{
    fn instruction_to_idl(idl_definition: &mut IdlDefinition) -> IdlResult<()> {
        let args = Self::type_def(idl_definition)?;
        let accounts =
            <Self::Accounts as AccountSchemaToIdl>::account_schema_to_idl(idl_definition)?;
        idl_definition.add_instruction(IdlInstruction {
            name: Self::NAME.to_string(),
            docs: vec![],
            discriminator: Self::TAG.to_bytes().to_vec(),
            validated: Self::VALIDATE,
            accounts,
            args,
        })?;
        Ok(())
    }
}

impl<T> InstructionToIdl for T
where
    T: InstructionArgs + TypeToIdl,
    T::Accounts: AccountSchemaToIdl,
{
}

/// Derivable via [`derive@InstructionSet`](slot_frame_proc::InstructionSet).
pub trait InstructionSetToIdl: InstructionSet {
    /// Adds each instruction in an instruction set to the idl definition.
    fn instruction_set_to_idl(idl_definition: &mut IdlDefinition) -> IdlResult<()>;
}

impl InstructionSetToIdl for () {
    fn instruction_set_to_idl(_idl_definition: &mut IdlDefinition) -> IdlResult<()> {
        Ok(())
    }
}

/// Derivable via [`frame_error`](crate::errors::frame_error).
pub trait ErrorsToIdl {
    /// Adds the errors to the idl definition.
    fn errors_to_idl(idl_definition: &mut IdlDefinition) -> IdlResult<()>;
}

impl ErrorsToIdl for () {
    fn errors_to_idl(_idl_definition: &mut IdlDefinition) -> IdlResult<()> {
        Ok(())
    }
}

#[doc(hidden)]
#[must_use]
pub fn empty_env_option(env: &str) -> Option<String> {
    if env.is_empty() {
        None
    } else {
        Some(env.to_string())
    }
}

/// The [`CrateMetadata`] of the crate this is expanded in.
#[doc(hidden)]
#[macro_export]
macro_rules! crate_metadata {
    () => {
        $crate::slot_frame_idl::CrateMetadata {
            version: $crate::slot_frame_idl::Version::parse(env!("CARGO_PKG_VERSION"))
                .unwrap_or_else(|_| $crate::slot_frame_idl::Version::new(0, 0, 0)),
            name: env!("CARGO_PKG_NAME").to_string(),
            description: $crate::idl::empty_env_option(env!("CARGO_PKG_DESCRIPTION")),
            docs: vec![],
            homepage: $crate::idl::empty_env_option(env!("CARGO_PKG_HOMEPAGE")),
            license: $crate::idl::empty_env_option(env!("CARGO_PKG_LICENSE")),
            repository: $crate::idl::empty_env_option(env!("CARGO_PKG_REPOSITORY")),
        }
    };
}

/// The root IDL generation trait to generate an [`IdlDefinition`] for a program.
///
/// This should be derived via [`derive@SlotFrameProgram`](slot_frame_proc::SlotFrameProgram).
pub trait ProgramToIdl: SlotFrameProgram
where
    Self::InstructionSet: InstructionSetToIdl,
{
    type Errors: ErrorsToIdl;

    fn crate_metadata() -> CrateMetadata;

    /// Adds the program's events.
    fn events_to_idl(_idl_definition: &mut IdlDefinition) -> IdlResult<()> {
        Ok(())
    }

    fn modify_idl(_idl_definition: &mut IdlDefinition) -> IdlResult<()> {
        Ok(())
    }

    fn program_to_idl() -> IdlResult<IdlDefinition> {
        let mut out = IdlDefinition {
            address: Self::ID,
            metadata: IdlMetadata {
                crate_metadata: Self::crate_metadata(),
                ..Default::default()
            },
            ..Default::default()
        };
        <Self::InstructionSet as InstructionSetToIdl>::instruction_set_to_idl(&mut out)?;
        Self::events_to_idl(&mut out)?;
        ErrorCode::errors_to_idl(&mut out)?;
        Self::Errors::errors_to_idl(&mut out)?;
        Self::modify_idl(&mut out)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{HasOne, InitSpec, Seeds};
    use pretty_assertions::assert_eq;

    const SEEDS: &[Seed] = &[Seed::Const(b"counter"), Seed::Slot(0)];

    #[test]
    fn slot_references_resolve_to_names() -> IdlResult<()> {
        let payer = SlotDef::of::<Signer<Mut<SystemAccount>>>("payer");
        let mut counter = SlotDef::of::<Mut<Data<16>>>("counter");
        counter.seeds = Some(Seeds {
            seeds: SEEDS,
            bump: Bump::Canonical,
        });
        counter.init = Some(InitSpec { payer: 0, space: 16 });
        counter.close = Some(0);
        let slots = [payer, counter];

        let idl = slot_to_idl(&slots, &slots[1], None, vec![])?;
        assert_eq!(
            idl.seeds,
            Some(IdlSeeds {
                seeds: vec![IdlSeed::Const(b"counter".to_vec()), IdlSeed::Slot("payer".into())],
                bump: IdlBump::Canonical,
            })
        );
        assert_eq!(idl.init, Some(IdlInit { payer: "payer".into(), space: 16 }));
        assert_eq!(idl.close.as_deref(), Some("payer"));
        assert_eq!(idl.size, Some(16));
        assert!(idl.writable && !idl.signer);
        Ok(())
    }

    #[test]
    fn dangling_slot_reference_is_an_error() {
        const DANGLING: &[HasOne] = &[HasOne {
            field: "authority",
            offset: 8,
            target: 5,
        }];
        let mut slot = SlotDef::of::<Unchecked>("record");
        slot.has_one = DANGLING;
        let err = slot_to_idl(&[slot], &slot, None, vec![]).unwrap_err();
        assert!(matches!(err, Error::UnknownSlot { index: 5, .. }));
    }
}
