//! 8-byte content derived identifiers for instructions, records and events.
//!
//! A tag is the first 8 bytes of `sha256("<namespace>:<name>")`, the convention existing client
//! tooling expects. The [`sighash!`](crate::sighash) macro computes the same bytes at compile time.

use bytemuck::{Pod, Zeroable};
use derive_more::{Deref, From, Into};

/// Namespace of instruction tags.
pub const INSTRUCTION_NAMESPACE: &str = "global";
/// Namespace of record tags.
pub const ACCOUNT_NAMESPACE: &str = "account";
/// Namespace of event tags.
pub const EVENT_NAMESPACE: &str = "event";

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable, Deref, From, Into)]
#[repr(transparent)]
pub struct Tag(pub [u8; 8]);

impl Tag {
    pub const LEN: usize = 8;

    #[must_use]
    pub const fn new(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub const fn to_bytes(self) -> [u8; 8] {
        self.0
    }

    /// Derives the tag of `name` in `namespace` at run time.
    #[must_use]
    pub fn derive(namespace: &str, name: &str) -> Self {
        let hash = sha256(&[namespace.as_bytes(), b":", name.as_bytes()]);
        let mut tag = [0; 8];
        tag.copy_from_slice(&hash[..Self::LEN]);
        Self(tag)
    }

    /// Reads a tag from the start of `data`.
    #[must_use]
    pub fn read(data: &[u8]) -> Option<Self> {
        data.first_chunk::<8>().copied().map(Self)
    }

    /// Equality usable in const contexts.
    #[must_use]
    pub const fn const_eq(&self, other: &Self) -> bool {
        let mut index = 0;
        while index < Self::LEN {
            if self.0[index] != other.0[index] {
                return false;
            }
            index += 1;
        }
        true
    }
}

#[cfg(not(target_os = "solana"))]
fn sha256(parts: &[&[u8]]) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

#[cfg(target_os = "solana")]
fn sha256(parts: &[&[u8]]) -> [u8; 32] {
    let mut hash = [0; 32];
    // SAFETY: the syscall reads `parts.len()` slices and writes 32 bytes.
    unsafe {
        pinocchio::syscalls::sol_sha256(
            parts.as_ptr().cast::<u8>(),
            parts.len() as u64,
            hash.as_mut_ptr(),
        );
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sighash;

    #[test]
    fn derivation_is_deterministic() {
        let first = Tag::derive(INSTRUCTION_NAMESPACE, "initialize");
        let second = Tag::derive(INSTRUCTION_NAMESPACE, "initialize");
        assert_eq!(first, second);
        assert_ne!(first, Tag::derive(INSTRUCTION_NAMESPACE, "increment"));
        assert_ne!(first, Tag::derive(ACCOUNT_NAMESPACE, "initialize"));
    }

    #[test]
    fn matches_published_convention() {
        // sha256("global:initialize")[..8]
        assert_eq!(
            Tag::derive(INSTRUCTION_NAMESPACE, "initialize").to_bytes(),
            [175, 175, 109, 31, 13, 152, 155, 237]
        );
        assert_eq!(
            Tag::derive(INSTRUCTION_NAMESPACE, "initialize").to_bytes(),
            sighash!("global", "initialize")
        );
        assert_eq!(
            Tag::derive(ACCOUNT_NAMESPACE, "Counter").to_bytes(),
            sighash!("account", "Counter")
        );
    }

    #[test]
    fn read_requires_eight_bytes() {
        assert_eq!(Tag::read(&[1; 7]), None);
        assert_eq!(Tag::read(&[1; 9]), Some(Tag([1; 8])));
        assert!(Tag([1; 8]).const_eq(&Tag([1; 8])));
        assert!(!Tag([1; 8]).const_eq(&Tag([2; 8])));
    }
}
