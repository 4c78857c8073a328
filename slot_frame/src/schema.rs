//! Ordered account schemas and the constraint directives attached to each slot.
//!
//! A schema is a `&'static [SlotDef]` emitted by `#[derive(Accounts)]`. Everything in it is a
//! constant, so the [`Layout`] of a schema and every field offset referenced by a constraint are
//! resolved during compilation.

use crate::{
    account_view::AccountView,
    layout::{Layout, SlotSize},
    slot::{RecordField, SlotType},
    tag::Tag,
};
use solana_address::Address;

pub use slot_frame_proc::Accounts;

/// One slot of a schema: its name, expected size, flags and constraints.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SlotDef {
    pub name: &'static str,
    pub size: SlotSize,
    pub signer: bool,
    pub writable: bool,
    pub executable: bool,
    pub owner: Option<Address>,
    pub address: Option<Address>,
    pub tag: Option<Tag>,
    pub record_offset: usize,
    pub fields: &'static [RecordField],
    pub has_one: &'static [HasOne],
    pub seeds: Option<Seeds>,
    pub init: Option<InitSpec>,
    /// Index of the slot receiving this account's lamports once the handler returns.
    pub close: Option<usize>,
}

/// Requires the 32-byte record field at `offset` to equal the address of slot `target`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct HasOne {
    pub field: &'static str,
    /// Offset of the field inside the account data.
    pub offset: usize,
    pub target: usize,
}

/// Requires the slot's address to be derived from these seeds under the invoked program.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Seeds {
    pub seeds: &'static [Seed],
    pub bump: Bump,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Seed {
    Const(&'static [u8]),
    /// The address of the slot at this index.
    Slot(usize),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Bump {
    /// The canonical bump found by searching downwards from 255.
    Canonical,
    /// A bump stored in a one-byte record field at `offset` of the account data.
    Field { name: &'static str, offset: usize },
}

/// Creates the slot's account before the handler runs, funded by slot `payer`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct InitSpec {
    pub payer: usize,
    pub space: usize,
}

const fn str_eq(left: &str, right: &str) -> bool {
    let (left, right) = (left.as_bytes(), right.as_bytes());
    if left.len() != right.len() {
        return false;
    }
    let mut index = 0;
    while index < left.len() {
        if left[index] != right[index] {
            return false;
        }
        index += 1;
    }
    true
}

const fn find_field(fields: &[RecordField], name: &str) -> Option<RecordField> {
    let mut index = 0;
    while index < fields.len() {
        if str_eq(fields[index].name, name) {
            return Some(fields[index]);
        }
        index += 1;
    }
    None
}

impl HasOne {
    /// Resolves `field` against the record held by slot type `S`.
    ///
    /// # Panics
    /// At compile time if `S` has no such field or the field is not an address.
    #[must_use]
    pub const fn new<S: SlotType>(field: &'static str, target: usize) -> Self {
        let Some(found) = find_field(S::FIELDS, field) else {
            panic!("has_one field not found in record");
        };
        assert!(found.size == 32, "has_one field must be an address");
        Self {
            field,
            offset: S::RECORD_OFFSET + found.offset,
            target,
        }
    }
}

impl Bump {
    /// Resolves a bump stored in `field` of the record held by slot type `S`.
    ///
    /// # Panics
    /// At compile time if `S` has no such field or the field is not a single byte.
    #[must_use]
    pub const fn field<S: SlotType>(field: &'static str) -> Self {
        let Some(found) = find_field(S::FIELDS, field) else {
            panic!("bump field not found in record");
        };
        assert!(found.size == 1, "bump field must be a u8");
        Self::Field {
            name: field,
            offset: S::RECORD_OFFSET + found.offset,
        }
    }
}

impl SlotDef {
    /// The definition implied by slot type `S` alone, with no extra constraints.
    #[must_use]
    pub const fn of<S: SlotType>(name: &'static str) -> Self {
        Self {
            name,
            size: S::SIZE,
            signer: S::SIGNER,
            writable: S::WRITABLE,
            executable: S::EXECUTABLE,
            owner: S::OWNER,
            address: S::ADDRESS,
            tag: S::TAG,
            record_offset: S::RECORD_OFFSET,
            fields: S::FIELDS,
            has_one: &[],
            seeds: None,
            init: None,
            close: None,
        }
    }

    #[must_use]
    pub const fn with_has_one(mut self, has_one: &'static [HasOne]) -> Self {
        self.has_one = has_one;
        self
    }

    #[must_use]
    pub const fn with_seeds(mut self, seeds: Seeds) -> Self {
        self.seeds = Some(seeds);
        self
    }

    /// Marks the slot for creation. The account arrives empty, so its expected size becomes zero
    /// and `space` defaults to the size the slot type declares.
    ///
    /// # Panics
    /// At compile time if no `space` is given for a slot of dynamic size.
    #[must_use]
    pub const fn with_init(mut self, payer: usize, space: Option<usize>) -> Self {
        let space = match (space, self.size) {
            (Some(space), _) => space,
            (None, SlotSize::Fixed(len)) => len,
            (None, SlotSize::Dynamic) => panic!("init on a dynamically sized slot needs a space"),
        };
        assert!(self.writable, "init slots must be writable");
        self.size = SlotSize::Fixed(0);
        self.init = Some(InitSpec { payer, space });
        self
    }

    #[must_use]
    pub const fn with_close(mut self, destination: usize) -> Self {
        assert!(self.writable, "closed slots must be writable");
        self.close = Some(destination);
        self
    }

    #[must_use]
    pub const fn with_address(mut self, address: Address) -> Self {
        self.address = Some(address);
        self
    }

    #[must_use]
    pub const fn with_owner(mut self, owner: Address) -> Self {
        self.owner = Some(owner);
        self
    }

    #[must_use]
    pub const fn is_init(&self) -> bool {
        self.init.is_some()
    }
}

/// An ordered set of account slots, decoded from the views the dispatcher resolved.
///
/// Derivable with [`Accounts`](crate::prelude::Accounts).
pub trait AccountSchema: Sized {
    const SLOTS: &'static [SlotDef];
    const LAYOUT: Layout = Layout::new(Self::SLOTS);

    /// Wraps one view per slot, in order.
    ///
    /// # Panics
    /// If fewer views than slots are supplied. The dispatcher never does this.
    fn from_views(views: &[AccountView]) -> Self;
}

impl AccountSchema for () {
    const SLOTS: &'static [SlotDef] = &[];

    fn from_views(_views: &[AccountView]) -> Self {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slot::{Data, Mut, Signer};
    use pretty_assertions::assert_eq;

    struct FakeRecordSlot;

    impl crate::account_view::AsAccountView for FakeRecordSlot {
        fn account_view(&self) -> &AccountView {
            unreachable!()
        }
    }

    impl SlotType for FakeRecordSlot {
        const SIZE: SlotSize = SlotSize::Fixed(8 + 41);
        const FIELDS: &'static [RecordField] = &[
            RecordField {
                name: "authority",
                offset: 0,
                size: 32,
            },
            RecordField {
                name: "count",
                offset: 32,
                size: 8,
            },
            RecordField {
                name: "bump",
                offset: 40,
                size: 1,
            },
        ];
        const RECORD_OFFSET: usize = 8;

        fn from_view(_view: AccountView) -> Self {
            Self
        }
    }

    #[test]
    fn has_one_resolves_offset() {
        const HAS_ONE: HasOne = HasOne::new::<FakeRecordSlot>("authority", 0);
        assert_eq!(
            HAS_ONE,
            HasOne {
                field: "authority",
                offset: 8,
                target: 0
            }
        );
        const BUMP: Bump = Bump::field::<FakeRecordSlot>("bump");
        assert_eq!(
            BUMP,
            Bump::Field {
                name: "bump",
                offset: 48
            }
        );
    }

    #[test]
    fn init_replaces_size_with_space() {
        const SLOT: SlotDef = SlotDef::of::<Mut<Data<48>>>("counter").with_init(0, None);
        assert_eq!(SLOT.size, SlotSize::Fixed(0));
        assert_eq!(SLOT.init, Some(InitSpec { payer: 0, space: 48 }));
        const SIZED: SlotDef = SlotDef::of::<Mut<Data<0>>>("other").with_init(1, Some(100));
        assert_eq!(SIZED.init, Some(InitSpec { payer: 1, space: 100 }));
    }

    #[test]
    fn flags_follow_slot_type() {
        let slot = SlotDef::of::<Signer<Mut<Data<2>>>>("payer");
        assert!(slot.signer && slot.writable && !slot.executable);
        assert_eq!(slot.size, SlotSize::Fixed(2));
        assert!(slot.has_one.is_empty() && slot.seeds.is_none() && !slot.is_init());
    }
}
