//! Typed views over a single slot of an instruction's account schema.
//!
//! Each slot type states, as associated constants, what the framework may assume about the account
//! it wraps: its data size, its required flags, its owner and, for program records, the tag stored
//! in its first 8 bytes. Those constants feed both the compile-time [`Layout`](crate::layout::Layout)
//! and the constraint checks in [`validate`](crate::validate).

use crate::{
    account_view::{AccountView, AsAccountView},
    layout::SlotSize,
    program::{system::System, SlotFrameProgram},
    tag::Tag,
    Result,
};
use bytemuck::Pod;
use core::{
    marker::PhantomData,
    mem::{align_of, size_of},
};
use derive_more::{Deref, DerefMut};
use solana_address::Address;

pub use slot_frame_proc::Record;

/// A named field of a record, used to resolve `has_one` and bump references at compile time.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RecordField {
    pub name: &'static str,
    /// Offset from the start of the record, after the tag.
    pub offset: usize,
    pub size: usize,
}

/// A plain-old-data struct stored in an account owned by [`Self::OwnerProgram`], behind an 8-byte
/// [`Tag`].
///
/// Derivable with [`Record`](crate::prelude::Record).
pub trait Record: Pod {
    const NAME: &'static str;
    const TAG: Tag;
    const FIELDS: &'static [RecordField];
    type OwnerProgram: SlotFrameProgram;
}

/// The compile-time description of an account slot.
pub trait SlotType: AsAccountView + Sized {
    const SIZE: SlotSize;
    const SIGNER: bool = false;
    const WRITABLE: bool = false;
    const EXECUTABLE: bool = false;
    const OWNER: Option<Address> = None;
    const ADDRESS: Option<Address> = None;
    const TAG: Option<Tag> = None;
    /// Fields of the record this slot holds, if any.
    const FIELDS: &'static [RecordField] = &[];
    /// Offset of the record inside the account data.
    const RECORD_OFFSET: usize = 0;

    /// Wraps a view. Only the dispatcher calls this with views that passed validation; anything
    /// else sees unchecked data.
    fn from_view(view: AccountView) -> Self;
}

/// An account owned by the system program with no data, typically a wallet.
#[derive(Copy, Clone, Debug)]
pub struct SystemAccount(AccountView);

/// An account of exactly `N` data bytes with no further requirements.
#[derive(Copy, Clone, Debug)]
pub struct Data<const N: usize>(AccountView);

/// An account the framework makes no assumption about. Its size is unknown until the buffer is
/// scanned, so a schema containing one always dispatches dynamically.
#[derive(Copy, Clone, Debug)]
pub struct Unchecked(AccountView);

/// An account holding a `T` record, prefixed with `T`'s tag and owned by `T`'s program.
#[derive(Debug)]
pub struct Account<T> {
    view: AccountView,
    phantom: PhantomData<fn() -> T>,
}

/// The executable account of program `P`.
#[derive(Debug)]
pub struct Program<P> {
    view: AccountView,
    phantom: PhantomData<fn() -> P>,
}

/// Requires the wrapped slot to have signed the transaction.
#[derive(Copy, Clone, Debug, Deref, DerefMut)]
pub struct Signer<T = SystemAccount>(T);

/// Requires the wrapped slot to be writable.
#[derive(Copy, Clone, Debug, Deref, DerefMut)]
pub struct Mut<T = SystemAccount>(T);

macro_rules! view_newtype {
    ($($ty:ty),* $(,)?) => {
        $(
            impl AsAccountView for $ty {
                fn account_view(&self) -> &AccountView {
                    &self.0
                }
            }
        )*
    };
}

view_newtype!(SystemAccount, Unchecked);

impl<const N: usize> AsAccountView for Data<N> {
    fn account_view(&self) -> &AccountView {
        &self.0
    }
}

impl<T> AsAccountView for Account<T> {
    fn account_view(&self) -> &AccountView {
        &self.view
    }
}

impl<P> AsAccountView for Program<P> {
    fn account_view(&self) -> &AccountView {
        &self.view
    }
}

impl<T: AsAccountView> AsAccountView for Signer<T> {
    fn account_view(&self) -> &AccountView {
        self.0.account_view()
    }
}

impl<T: AsAccountView> AsAccountView for Mut<T> {
    fn account_view(&self) -> &AccountView {
        self.0.account_view()
    }
}

impl SlotType for SystemAccount {
    const SIZE: SlotSize = SlotSize::Fixed(0);
    const OWNER: Option<Address> = Some(System::ID);

    fn from_view(view: AccountView) -> Self {
        Self(view)
    }
}

impl<const N: usize> SlotType for Data<N> {
    const SIZE: SlotSize = SlotSize::Fixed(N);

    fn from_view(view: AccountView) -> Self {
        Self(view)
    }
}

impl SlotType for Unchecked {
    const SIZE: SlotSize = SlotSize::Dynamic;

    fn from_view(view: AccountView) -> Self {
        Self(view)
    }
}

impl<T: Record> SlotType for Account<T> {
    const SIZE: SlotSize = {
        assert!(
            align_of::<T>() <= 8,
            "Records must not require more than 8 byte alignment"
        );
        SlotSize::Fixed(Tag::LEN + size_of::<T>())
    };
    const OWNER: Option<Address> = Some(<T::OwnerProgram as SlotFrameProgram>::ID);
    const TAG: Option<Tag> = Some(T::TAG);
    const FIELDS: &'static [RecordField] = T::FIELDS;
    const RECORD_OFFSET: usize = Tag::LEN;

    fn from_view(view: AccountView) -> Self {
        Self {
            view,
            phantom: PhantomData,
        }
    }
}

impl<P: SlotFrameProgram> SlotType for Program<P> {
    const SIZE: SlotSize = SlotSize::Dynamic;
    const EXECUTABLE: bool = true;
    const ADDRESS: Option<Address> = Some(P::ID);

    fn from_view(view: AccountView) -> Self {
        Self {
            view,
            phantom: PhantomData,
        }
    }
}

impl<T: SlotType> SlotType for Signer<T> {
    const SIZE: SlotSize = T::SIZE;
    const SIGNER: bool = true;
    const WRITABLE: bool = T::WRITABLE;
    const EXECUTABLE: bool = T::EXECUTABLE;
    const OWNER: Option<Address> = T::OWNER;
    const ADDRESS: Option<Address> = T::ADDRESS;
    const TAG: Option<Tag> = T::TAG;
    const FIELDS: &'static [RecordField] = T::FIELDS;
    const RECORD_OFFSET: usize = T::RECORD_OFFSET;

    fn from_view(view: AccountView) -> Self {
        Self(T::from_view(view))
    }
}

impl<T: SlotType> SlotType for Mut<T> {
    const SIZE: SlotSize = T::SIZE;
    const SIGNER: bool = T::SIGNER;
    const WRITABLE: bool = true;
    const EXECUTABLE: bool = T::EXECUTABLE;
    const OWNER: Option<Address> = T::OWNER;
    const ADDRESS: Option<Address> = T::ADDRESS;
    const TAG: Option<Tag> = T::TAG;
    const FIELDS: &'static [RecordField] = T::FIELDS;
    const RECORD_OFFSET: usize = T::RECORD_OFFSET;

    fn from_view(view: AccountView) -> Self {
        Self(T::from_view(view))
    }
}

impl<T: Record> Account<T> {
    fn record_bytes(&self) -> Result<&[u8]> {
        // SAFETY: the returned borrow is tied to `&self`, and mutation requires `&mut self`.
        let data = unsafe { self.view.borrow_data_unchecked() };
        let end = Tag::LEN + size_of::<T>();
        crate::ensure!(
            data.len() >= end,
            crate::errors::ErrorCode::DataLenMismatch,
            "record needs {} bytes, account holds {}",
            end,
            data.len()
        );
        Ok(&data[Tag::LEN..end])
    }

    /// The record, read in place.
    pub fn data(&self) -> Result<&T> {
        Ok(bytemuck::try_from_bytes(self.record_bytes()?)?)
    }

    /// The record, mutated in place. Writes land directly in the runtime's buffer.
    pub fn data_mut(&mut self) -> Result<&mut T> {
        self.record_bytes()?;
        // SAFETY: the length was checked above and `&mut self` excludes other borrows.
        let data = unsafe { self.view.borrow_mut_data_unchecked() };
        Ok(bytemuck::try_from_bytes_mut(
            &mut data[Tag::LEN..Tag::LEN + size_of::<T>()],
        )?)
    }
}

impl<T: SlotType> Signer<T> {
    /// The wrapped slot.
    pub fn inner(&self) -> &T {
        &self.0
    }
}

impl<T: SlotType> Mut<T> {
    /// The wrapped slot.
    pub fn inner_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

impl<T> Clone for Account<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Account<T> {}

impl<P> Clone for Program<P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P> Copy for Program<P> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        errors::ErrorCode,
        testing::{InputBuilder, TestAccount},
    };
    use bytemuck::Zeroable;

    #[derive(Pod, Zeroable, Copy, Clone, Debug, PartialEq, Eq)]
    #[repr(C)]
    struct Tally {
        owner: Address,
        value: u64,
    }

    impl Record for Tally {
        const NAME: &'static str = "Tally";
        const TAG: Tag = Tag([9; 8]);
        const FIELDS: &'static [RecordField] = &[];
        type OwnerProgram = System;
    }

    fn tally_input(data: Vec<u8>) -> crate::testing::InputBuffer {
        InputBuilder::new(System::ID)
            .account(
                TestAccount::new(Address::new_from_array([4; 32]), System::ID)
                    .writable()
                    .data(data),
            )
            .build()
    }

    #[test]
    fn wrappers_stack_flags() {
        type Slot = Signer<Mut<SystemAccount>>;
        assert!(Slot::SIGNER);
        assert!(Slot::WRITABLE);
        assert_eq!(Slot::SIZE, SlotSize::Fixed(0));
        assert_eq!(Slot::OWNER, Some(System::ID));
        assert!(!Mut::<Data<4>>::SIGNER);
        assert_eq!(Mut::<Data<4>>::SIZE, SlotSize::Fixed(4));
        assert_eq!(Mut::<Data<4>>::OWNER, None);
        assert_eq!(Unchecked::SIZE, SlotSize::Dynamic);
    }

    #[test]
    fn program_slot_pins_address() {
        assert_eq!(Program::<System>::ADDRESS, Some(System::ID));
        assert!(Program::<System>::EXECUTABLE);
        assert_eq!(Program::<System>::SIZE, SlotSize::Dynamic);
    }

    #[test]
    fn record_round_trips_in_place() -> Result<()> {
        let mut data = Tally::TAG.to_bytes().to_vec();
        data.extend_from_slice(bytemuck::bytes_of(&Tally::zeroed()));
        let mut input = tally_input(data);
        let view = input.views()[0];

        let written = Tally {
            owner: Address::new_from_array([3; 32]),
            value: 42,
        };
        let mut account = Account::<Tally>::from_view(view);
        *account.data_mut()? = written;
        assert_eq!(*account.data()?, written);
        assert_eq!(*Account::<Tally>::from_view(view).data()?, written);

        let raw = input.read_account(0).data;
        assert_eq!(raw[..Tag::LEN], Tally::TAG.to_bytes());
        assert_eq!(&raw[Tag::LEN..], bytemuck::bytes_of(&written));
        Ok(())
    }

    #[test]
    fn short_record_is_rejected() {
        let mut input = tally_input(Tally::TAG.to_bytes().to_vec());
        let account = Account::<Tally>::from_view(input.views()[0]);
        assert!(account.data().unwrap_err().is(ErrorCode::DataLenMismatch));
    }
}
