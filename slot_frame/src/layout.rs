//! The runtime's input buffer layout and the compile-time offset engine built on it.
//!
//! The runtime serializes each invocation's input as:
//!
//! ```text
//! u64                        account count
//! per account, either
//!   u8                       duplicate marker (index of an earlier account)
//!   [u8; 7]                  padding
//! or
//!   u8                       NON_DUP_MARKER
//!   u8, u8, u8               signer, writable, executable
//!   [u8; 4]                  resize delta
//!   [u8; 32], [u8; 32]       address, owner
//!   u64, u64                 lamports, data length
//!   [u8; len + 10_240]       data plus realloc padding, aligned to 8
//!   u64                      rent epoch
//! u64                        payload length
//! [u8; payload length]       payload
//! [u8; 32]                   invoked program id
//! ```
//!
//! The constants below are the runtime's contract and must not drift.

use crate::{account_view::AccountHeader, schema::SlotDef};
use core::mem::size_of;

/// Marks an account entry that is not a duplicate.
pub const NON_DUP_MARKER: u8 = u8::MAX;
/// Size of the fixed account header preceding the data region.
pub const ACCOUNT_HEADER_SIZE: usize = 88;
/// Padding the runtime reserves after each data region so it can grow during the invocation.
pub const MAX_PERMITTED_DATA_INCREASE: usize = 10 * 1024;
/// Trailing rent epoch field of each account entry.
pub const RENT_EPOCH_SIZE: usize = size_of::<u64>();
/// Size of an entry that only references an earlier account.
pub const DUPLICATE_ENTRY_SIZE: usize = size_of::<u64>();
/// Leading account count.
pub const ACCOUNT_COUNT_SIZE: usize = size_of::<u64>();
/// Payload length preceding the payload bytes.
pub const PAYLOAD_LEN_SIZE: usize = size_of::<u64>();
/// Alignment of every account entry and data region.
pub const BUFFER_ALIGN: usize = 8;
/// Most slots a single schema may declare.
pub const MAX_SLOTS: usize = 64;

static_assertions::const_assert_eq!(size_of::<AccountHeader>(), ACCOUNT_HEADER_SIZE);

#[must_use]
pub const fn align_up(len: usize) -> usize {
    (len + (BUFFER_ALIGN - 1)) & !(BUFFER_ALIGN - 1)
}

/// Bytes a non-duplicate account entry with `data_len` bytes of data occupies in the buffer.
#[must_use]
pub const fn account_span(data_len: usize) -> usize {
    ACCOUNT_HEADER_SIZE + align_up(data_len + MAX_PERMITTED_DATA_INCREASE) + RENT_EPOCH_SIZE
}

/// The data size a slot declares.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SlotSize {
    /// The account's data length must be exactly this many bytes.
    Fixed(usize),
    /// Unknown until the buffer is scanned, e.g. a foreign program account.
    Dynamic,
}

impl SlotSize {
    #[must_use]
    pub const fn fixed(self) -> Option<usize> {
        match self {
            SlotSize::Fixed(len) => Some(len),
            SlotSize::Dynamic => None,
        }
    }
}

/// Byte offsets of every slot's header and of the payload, computed from a schema at compile time.
///
/// Offsets are only known for the prefix of slots with a [`SlotSize::Fixed`] size. A layout is
/// static when every slot is fixed, in which case the payload offset is known too.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Layout {
    len: usize,
    fixed: usize,
    headers: [usize; MAX_SLOTS],
    payload: usize,
}

impl Layout {
    /// Computes the layout of a schema.
    ///
    /// # Panics
    /// At compile time if the schema declares more than [`MAX_SLOTS`] slots.
    #[must_use]
    pub const fn new(slots: &[SlotDef]) -> Self {
        assert!(slots.len() <= MAX_SLOTS, "Too many slots in schema");
        let mut headers = [0; MAX_SLOTS];
        let mut offset = ACCOUNT_COUNT_SIZE;
        let mut index = 0;
        while index < slots.len() {
            headers[index] = offset;
            let SlotSize::Fixed(len) = slots[index].size else {
                break;
            };
            offset += account_span(len);
            index += 1;
        }
        Self {
            len: slots.len(),
            fixed: index,
            headers,
            payload: offset + PAYLOAD_LEN_SIZE,
        }
    }

    /// Number of slots in the schema.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether every slot has a fixed size, so the payload can be located without scanning.
    #[must_use]
    pub const fn is_static(&self) -> bool {
        self.fixed == self.len
    }

    /// Offset of slot `index`'s header, if every slot before it has a fixed size.
    #[must_use]
    pub const fn header_offset(&self, index: usize) -> Option<usize> {
        if index < self.len && index <= self.fixed {
            Some(self.headers[index])
        } else {
            None
        }
    }

    /// Offset of slot `index`'s data region.
    #[must_use]
    pub const fn data_offset(&self, index: usize) -> Option<usize> {
        match self.header_offset(index) {
            Some(offset) => Some(offset + ACCOUNT_HEADER_SIZE),
            None => None,
        }
    }

    /// Offset of the first payload byte (after the payload length).
    #[must_use]
    pub const fn payload_offset(&self) -> Option<usize> {
        if self.is_static() {
            Some(self.payload)
        } else {
            None
        }
    }

    /// Checks that `input` was serialized from exactly this layout: the account count matches, no
    /// entry is a duplicate and every data length equals the declared size.
    ///
    /// # Safety
    /// `input` must point to a runtime input buffer. Only entries this layout places inside the
    /// buffer are read, each after the previous one has been confirmed.
    #[must_use]
    pub unsafe fn matches(&self, slots: &[SlotDef], input: *const u8) -> bool {
        if !self.is_static() || slots.len() != self.len {
            return false;
        }
        // SAFETY: the account count is always present.
        let count = unsafe { input.cast::<u64>().read() };
        if count != self.len as u64 {
            return false;
        }
        for (index, slot) in slots.iter().enumerate() {
            // SAFETY: every previous entry matched its declared size, so this entry starts inside
            // the buffer. Only the marker byte is read until the entry is known to be a full
            // account, since a duplicate entry is just 8 bytes.
            let entry = unsafe { input.add(self.headers[index]) };
            // SAFETY: as above.
            if unsafe { entry.read() } != NON_DUP_MARKER {
                return false;
            }
            // SAFETY: a non-duplicate entry starts with a full header.
            let header = unsafe { &*entry.cast::<AccountHeader>() };
            match slot.size {
                SlotSize::Fixed(len) if header.data_len == len as u64 => {}
                _ => return false,
            }
        }
        true
    }
}
