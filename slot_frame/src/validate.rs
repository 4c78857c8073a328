//! Declarative constraint checks, run against the resolved views before a handler executes.
//!
//! Checks never mutate the buffer. The first failing check aborts validation and the error carries
//! the failing slot's name in its account path.

use crate::{
    account_view::AccountView,
    errors::{ErrorCode, ErrorInfo},
    schema::{Bump, Seed, Seeds, SlotDef},
    tag::Tag,
    Result,
};
use alloc::vec::Vec;
use core::mem::size_of;
use solana_address::Address;

/// Checks every slot of `slots` against the view at the same index.
///
/// Per slot, in order: signer, writable, owner, address, tag, `has_one` relations, seeds and the
/// executable flag. Slots marked for creation skip everything that depends on the account
/// existing; their seeds are checked when the account is created.
pub fn validate_slots(slots: &[SlotDef], views: &[AccountView], program_id: &Address) -> Result<()> {
    crate::ensure!(
        views.len() >= slots.len(),
        ErrorCode::NotEnoughAccounts,
        "expected {} accounts, found {}",
        slots.len(),
        views.len()
    );
    for (slot, view) in slots.iter().zip(views) {
        validate_slot(slot, view, views, program_id).account_path(slot.name)?;
    }
    Ok(())
}

fn validate_slot(
    slot: &SlotDef,
    view: &AccountView,
    views: &[AccountView],
    program_id: &Address,
) -> Result<()> {
    if slot.signer {
        crate::ensure!(view.is_signer(), ErrorCode::ExpectedSigner);
    }
    if slot.writable {
        crate::ensure!(view.is_writable(), ErrorCode::ExpectedWritable);
    }
    let init = slot.is_init();
    if let (false, Some(owner)) = (init, &slot.owner) {
        crate::ensure_eq!(view.owner(), owner, ErrorCode::OwnerMismatch);
    }
    if let Some(address) = &slot.address {
        crate::ensure_eq!(view.address(), address, ErrorCode::AddressMismatch);
    }
    if init {
        if slot.executable {
            crate::ensure!(view.executable(), ErrorCode::ExpectedExecutable);
        }
        return Ok(());
    }

    // SAFETY: validation holds no other borrows of account data.
    let data = unsafe { view.borrow_data_unchecked() };
    if let Some(tag) = slot.tag {
        crate::ensure_eq!(Tag::read(data), Some(tag), ErrorCode::TagMismatch);
    }
    for has_one in slot.has_one {
        let stored = data.get(has_one.offset..has_one.offset + size_of::<Address>());
        let target = views
            .get(has_one.target)
            .ok_or_else(|| crate::error!(ErrorCode::NotEnoughAccounts))?;
        crate::ensure!(
            stored == Some(AsRef::<[u8]>::as_ref(target.address())),
            ErrorCode::HasOneMismatch,
            "field `{}` does not hold the related account's address",
            has_one.field
        );
    }
    if let Some(seeds) = &slot.seeds {
        let bump = match seeds.bump {
            Bump::Canonical => None,
            Bump::Field { name, offset } => Some(data.get(offset).copied().ok_or_else(|| {
                crate::error!(
                    ErrorCode::DataLenMismatch,
                    "bump field `{}` lies outside the account data",
                    name
                )
            })?),
        };
        let (expected, _) = resolve_seeds(seeds, views, program_id, bump)?;
        crate::ensure_eq!(view.address(), &expected, ErrorCode::SeedsMismatch);
    }
    if slot.executable {
        crate::ensure!(view.executable(), ErrorCode::ExpectedExecutable);
    }
    Ok(())
}

/// The seed bytes of `seeds`, with slot seeds replaced by the addresses in `views`.
pub fn seed_bytes<'a>(seeds: &Seeds, views: &'a [AccountView]) -> Result<Vec<&'a [u8]>> {
    let mut bytes = Vec::with_capacity(seeds.seeds.len() + 1);
    for seed in seeds.seeds {
        match seed {
            Seed::Const(value) => bytes.push(*value),
            Seed::Slot(index) => {
                let view = views
                    .get(*index)
                    .ok_or_else(|| crate::error!(ErrorCode::NotEnoughAccounts))?;
                bytes.push(AsRef::<[u8]>::as_ref(view.address()));
            }
        }
    }
    Ok(bytes)
}

/// Derives the address `seeds` produce under `program_id`.
///
/// With a known `bump` the address is computed directly, otherwise the canonical bump is searched.
pub fn resolve_seeds(
    seeds: &Seeds,
    views: &[AccountView],
    program_id: &Address,
    bump: Option<u8>,
) -> Result<(Address, u8)> {
    let mut bytes = seed_bytes(seeds, views)?;
    match bump {
        None => Ok(Address::find_program_address(&bytes, program_id)),
        Some(bump) => {
            let bump_seed = [bump];
            bytes.push(&bump_seed);
            match Address::create_program_address(&bytes, program_id) {
                Ok(address) => Ok((address, bump)),
                Err(_) => crate::bail!(
                    ErrorCode::SeedsMismatch,
                    "bump {} does not produce a program address",
                    bump
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        layout::SlotSize,
        schema::HasOne,
        testing::{InputBuilder, TestAccount},
    };

    const PROGRAM: Address = Address::new_from_array([5; 32]);
    const AUTHORITY: Address = Address::new_from_array([6; 32]);
    const TAG: Tag = Tag([1, 2, 3, 4, 5, 6, 7, 8]);

    const HAS_ONE: &[HasOne] = &[HasOne {
        field: "authority",
        offset: 8,
        target: 0,
    }];

    const fn record_slot(name: &'static str) -> SlotDef {
        SlotDef {
            name,
            size: SlotSize::Fixed(40),
            signer: false,
            writable: true,
            executable: false,
            owner: Some(PROGRAM),
            address: None,
            tag: Some(TAG),
            record_offset: 8,
            fields: &[],
            has_one: HAS_ONE,
            seeds: None,
            init: None,
            close: None,
        }
    }

    const SIGNER: SlotDef = SlotDef {
        name: "authority",
        size: SlotSize::Fixed(0),
        signer: true,
        writable: false,
        executable: false,
        owner: None,
        address: None,
        tag: None,
        record_offset: 0,
        fields: &[],
        has_one: &[],
        seeds: None,
        init: None,
        close: None,
    };

    fn record_data(authority: &Address) -> Vec<u8> {
        let mut data = TAG.to_bytes().to_vec();
        data.extend_from_slice(authority.as_array());
        data
    }

    fn build(signer: bool, record: TestAccount) -> crate::testing::InputBuffer {
        let mut authority = TestAccount::new(AUTHORITY, Address::default());
        if signer {
            authority = authority.signer();
        }
        InputBuilder::new(PROGRAM)
            .account(authority)
            .account(record)
            .build()
    }

    #[test]
    fn valid_accounts_pass() -> Result<()> {
        let mut input = build(
            true,
            TestAccount::new(Address::new_from_array([7; 32]), PROGRAM)
                .writable()
                .data(record_data(&AUTHORITY)),
        );
        validate_slots(&[SIGNER, record_slot("counter")], &input.views(), &PROGRAM)
    }

    #[test]
    fn failures_name_the_slot() {
        let mut input = build(
            false,
            TestAccount::new(Address::new_from_array([7; 32]), PROGRAM)
                .writable()
                .data(record_data(&AUTHORITY)),
        );
        let err = validate_slots(&[SIGNER, record_slot("counter")], &input.views(), &PROGRAM)
            .unwrap_err();
        assert!(err.is(ErrorCode::ExpectedSigner));
        assert_eq!(err.account_path().collect::<Vec<_>>(), vec!["authority"]);

        let mut input = build(
            true,
            TestAccount::new(Address::new_from_array([7; 32]), PROGRAM)
                .writable()
                .data(record_data(&Address::new_from_array([9; 32]))),
        );
        let err = validate_slots(&[SIGNER, record_slot("counter")], &input.views(), &PROGRAM)
            .unwrap_err();
        assert!(err.is(ErrorCode::HasOneMismatch));
        assert_eq!(err.account_path().collect::<Vec<_>>(), vec!["counter"]);
    }

    #[test]
    fn owner_checked_before_tag() {
        let mut data = record_data(&AUTHORITY);
        data[0] ^= 0xFF;
        let mut input = build(
            true,
            TestAccount::new(Address::new_from_array([7; 32]), Address::default())
                .writable()
                .data(data.clone()),
        );
        let err = validate_slots(&[SIGNER, record_slot("counter")], &input.views(), &PROGRAM)
            .unwrap_err();
        assert!(err.is(ErrorCode::OwnerMismatch));

        let mut input = build(
            true,
            TestAccount::new(Address::new_from_array([7; 32]), PROGRAM)
                .writable()
                .data(data),
        );
        let err = validate_slots(&[SIGNER, record_slot("counter")], &input.views(), &PROGRAM)
            .unwrap_err();
        assert!(err.is(ErrorCode::TagMismatch));
    }

    #[test]
    fn canonical_seeds_match_derived_address() -> Result<()> {
        const SEEDS: Seeds = Seeds {
            seeds: &[Seed::Const(b"counter"), Seed::Slot(0)],
            bump: Bump::Canonical,
        };
        let (pda, bump) =
            Address::find_program_address(&[b"counter", AUTHORITY.as_array()], &PROGRAM);
        let mut slot = record_slot("counter");
        slot.has_one = &[];
        slot.seeds = Some(SEEDS);

        let mut input = build(
            true,
            TestAccount::new(pda, PROGRAM)
                .writable()
                .data(record_data(&AUTHORITY)),
        );
        validate_slots(&[SIGNER, slot], &input.views(), &PROGRAM)?;
        assert_eq!(resolve_seeds(&SEEDS, &input.views(), &PROGRAM, Some(bump))?, (pda, bump));

        let mut input = build(
            true,
            TestAccount::new(Address::new_from_array([7; 32]), PROGRAM)
                .writable()
                .data(record_data(&AUTHORITY)),
        );
        let err = validate_slots(&[SIGNER, slot], &input.views(), &PROGRAM).unwrap_err();
        assert!(err.is(ErrorCode::SeedsMismatch));
        Ok(())
    }

    #[test]
    fn too_few_views_is_rejected() {
        let mut input = InputBuilder::new(PROGRAM)
            .account(TestAccount::new(AUTHORITY, Address::default()).signer())
            .build();
        let err = validate_slots(&[SIGNER, record_slot("counter")], &input.views(), &PROGRAM)
            .unwrap_err();
        assert!(err.is(ErrorCode::NotEnoughAccounts));
    }

    #[test]
    fn validate_is_idempotent() -> Result<()> {
        let slots = [SIGNER, record_slot("counter")];
        let mut input = build(
            true,
            TestAccount::new(Address::new_from_array([7; 32]), PROGRAM)
                .writable()
                .data(record_data(&AUTHORITY)),
        );
        let views = input.views();
        validate_slots(&slots, &views, &PROGRAM)?;
        validate_slots(&slots, &views, &PROGRAM)?;

        let mut input = build(
            true,
            TestAccount::new(Address::new_from_array([7; 32]), PROGRAM)
                .data(record_data(&Address::new_from_array([9; 32]))),
        );
        let views = input.views();
        let before = input.as_bytes().to_vec();
        let first = validate_slots(&slots, &views, &PROGRAM).unwrap_err();
        let second = validate_slots(&slots, &views, &PROGRAM).unwrap_err();
        assert!(first.is(ErrorCode::ExpectedWritable));
        assert!(second.is(ErrorCode::ExpectedWritable));
        assert_eq!(
            first.account_path().collect::<Vec<_>>(),
            second.account_path().collect::<Vec<_>>()
        );
        assert_eq!(input.as_bytes(), before.as_slice());
        Ok(())
    }
}
