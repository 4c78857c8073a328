//! Zero-copy access to a single account entry of the runtime's input buffer.

use crate::{
    errors::ErrorCode,
    layout::{ACCOUNT_HEADER_SIZE, MAX_PERMITTED_DATA_INCREASE},
    Result,
};
use bytemuck::{Pod, Zeroable};
use core::fmt::{Debug, Formatter};
use solana_address::Address;

/// The fixed header the runtime writes in front of every non-duplicate account's data.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct AccountHeader {
    pub dup_marker: u8,
    pub is_signer: u8,
    pub is_writable: u8,
    pub executable: u8,
    /// Bytes the data region has grown during this invocation.
    pub resize_delta: i32,
    pub address: Address,
    pub owner: Address,
    pub lamports: u64,
    pub data_len: u64,
}

/// A view of one account inside the input buffer.
///
/// The view is a pointer into host memory: writes through it are visible to every other view of
/// the same account, and it stays valid for the whole invocation.
#[derive(Copy, Clone, PartialEq, Eq)]
#[repr(transparent)]
pub struct AccountView {
    raw: *mut AccountHeader,
}

impl AccountView {
    /// # Safety
    /// `raw` must point to an 8-byte aligned account header inside a runtime input buffer (or a
    /// buffer laid out identically) that outlives every use of the view.
    #[must_use]
    pub unsafe fn new_unchecked(raw: *mut u8) -> Self {
        debug_assert_eq!(raw.align_offset(align_of::<AccountHeader>()), 0);
        Self { raw: raw.cast() }
    }

    /// Pointer to the start of the header.
    #[must_use]
    pub fn as_ptr(&self) -> *mut u8 {
        self.raw.cast()
    }

    #[must_use]
    pub fn address(&self) -> &Address {
        // SAFETY: construction guarantees a valid header; the address is never written.
        unsafe { &(*self.raw).address }
    }

    #[must_use]
    pub fn owner(&self) -> &Address {
        // SAFETY: the owner is only written by `assign`, whose contract forbids live references.
        unsafe { &(*self.raw).owner }
    }

    #[must_use]
    pub fn is_owned_by(&self, program_id: &Address) -> bool {
        self.owner() == program_id
    }

    #[must_use]
    pub fn lamports(&self) -> u64 {
        // SAFETY: valid header.
        unsafe { (*self.raw).lamports }
    }

    pub fn set_lamports(&self, lamports: u64) {
        // SAFETY: valid header; lamports are never handed out by reference.
        unsafe { (*self.raw).lamports = lamports }
    }

    #[must_use]
    pub fn is_signer(&self) -> bool {
        // SAFETY: valid header.
        unsafe { (*self.raw).is_signer != 0 }
    }

    #[must_use]
    pub fn is_writable(&self) -> bool {
        // SAFETY: valid header.
        unsafe { (*self.raw).is_writable != 0 }
    }

    #[must_use]
    pub fn executable(&self) -> bool {
        // SAFETY: valid header.
        unsafe { (*self.raw).executable != 0 }
    }

    #[must_use]
    pub fn data_len(&self) -> usize {
        // SAFETY: valid header.
        unsafe { (*self.raw).data_len as usize }
    }

    #[must_use]
    pub fn is_data_empty(&self) -> bool {
        self.data_len() == 0
    }

    #[must_use]
    pub fn resize_delta(&self) -> i32 {
        // SAFETY: valid header.
        unsafe { (*self.raw).resize_delta }
    }

    /// Pointer to the first data byte. Always 8-byte aligned.
    #[must_use]
    pub fn data_ptr(&self) -> *mut u8 {
        // SAFETY: the data region directly follows the header.
        unsafe { self.raw.cast::<u8>().add(ACCOUNT_HEADER_SIZE) }
    }

    /// # Safety
    /// No mutable reference to this account's data may be live.
    #[must_use]
    pub unsafe fn borrow_data_unchecked(&self) -> &[u8] {
        // SAFETY: the data region holds `data_len` bytes.
        unsafe { core::slice::from_raw_parts(self.data_ptr(), self.data_len()) }
    }

    /// # Safety
    /// No other reference to this account's data may be live.
    #[allow(clippy::mut_from_ref)]
    #[must_use]
    pub unsafe fn borrow_mut_data_unchecked(&self) -> &mut [u8] {
        // SAFETY: the data region holds `data_len` bytes.
        unsafe { core::slice::from_raw_parts_mut(self.data_ptr(), self.data_len()) }
    }

    /// Reinterprets the data at `offset` as a `T`.
    ///
    /// # Safety
    /// `offset + size_of::<T>()` must not exceed the data length, `offset` must keep `T` aligned
    /// and no mutable reference to the bytes may be live.
    #[must_use]
    pub unsafe fn cast_unchecked<T: Pod>(&self, offset: usize) -> &T {
        // SAFETY: upheld by the caller.
        unsafe { &*self.data_ptr().add(offset).cast::<T>() }
    }

    /// Mutable version of [`Self::cast_unchecked`].
    ///
    /// # Safety
    /// Same as [`Self::cast_unchecked`], and no other reference to the bytes may be live.
    #[allow(clippy::mut_from_ref)]
    #[must_use]
    pub unsafe fn cast_mut_unchecked<T: Pod>(&self, offset: usize) -> &mut T {
        // SAFETY: upheld by the caller.
        unsafe { &mut *self.data_ptr().add(offset).cast::<T>() }
    }

    /// Reassigns the owner program.
    ///
    /// # Safety
    /// No reference returned from [`Self::owner`] may be live.
    pub unsafe fn assign(&self, new_owner: &Address) {
        // SAFETY: valid header.
        unsafe { (*self.raw).owner = *new_owner }
    }

    /// Overwrites the stored data length without touching the data or the resize bookkeeping.
    ///
    /// # Safety
    /// `len` must not exceed the capacity the runtime reserved for this account, and no reference
    /// to the data may be live.
    pub unsafe fn set_data_len(&self, len: usize) {
        // SAFETY: valid header.
        unsafe { (*self.raw).data_len = len as u64 }
    }

    /// Changes the data length, zeroing any newly exposed bytes. Growth is bounded by the
    /// runtime's per-invocation limit.
    ///
    /// # Safety
    /// No reference to the data may be live.
    pub unsafe fn resize(&self, new_len: usize) -> Result<()> {
        let old_len = self.data_len();
        let delta = i64::from(self.resize_delta()) + new_len as i64 - old_len as i64;
        crate::ensure!(
            delta <= MAX_PERMITTED_DATA_INCREASE as i64,
            ErrorCode::InvalidRealloc,
            "cannot grow by {} bytes in one invocation",
            delta
        );
        if new_len > old_len {
            // SAFETY: the grown bytes are inside the reserved padding.
            unsafe {
                core::ptr::write_bytes(self.data_ptr().add(old_len), 0, new_len - old_len);
            }
        }
        // SAFETY: valid header, delta fits the padding.
        unsafe {
            (*self.raw).resize_delta = i32::try_from(delta)?;
            self.set_data_len(new_len);
        }
        Ok(())
    }
}

impl Debug for AccountView {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AccountView")
            .field("address", self.address())
            .field("owner", self.owner())
            .field("lamports", &self.lamports())
            .field("data_len", &self.data_len())
            .field("is_signer", &self.is_signer())
            .field("is_writable", &self.is_writable())
            .field("executable", &self.executable())
            .finish()
    }
}

/// Anything that wraps an [`AccountView`], such as the slot types.
pub trait AsAccountView {
    fn account_view(&self) -> &AccountView;

    fn address(&self) -> &Address {
        self.account_view().address()
    }
}

impl AsAccountView for AccountView {
    fn account_view(&self) -> &AccountView {
        self
    }
}
