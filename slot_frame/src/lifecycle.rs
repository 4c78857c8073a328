//! Account lifecycle operations: create, close, reallocate, transfer and allocate.
//!
//! Each operation that touches an account this program does not own goes through a system program
//! invocation. Balances of accounts this program owns are moved directly.

use crate::{
    account_view::AccountView,
    context::Context,
    errors::{ErrorCode, ErrorInfo},
    program::{
        system::{Allocate, Assign, CreateAccount, System, Transfer},
        SlotFrameProgram,
    },
    schema::{Bump, SlotDef},
    tag::Tag,
    validate::{resolve_seeds, seed_bytes},
    Result,
};
use pinocchio::program_error::ProgramError;
use solana_address::Address;

/// Creates `target` with `space` zeroed bytes, owned by `owner` and funded to rent exemption by
/// `payer`.
///
/// An empty target is created in one invocation. A target that already holds lamports (someone
/// may pre-fund a derived address) is topped up, allocated and assigned instead, since the system
/// program refuses to create over an existing balance. `signer_seeds` sign for `target` when it is
/// a derived address.
pub fn create_account(
    ctx: &Context<'_>,
    payer: AccountView,
    target: AccountView,
    space: usize,
    owner: &Address,
    signer_seeds: &[&[&[u8]]],
) -> Result<()> {
    let required = ctx.get_rent()?.minimum_balance(space);
    let current = target.lamports();
    if current == 0 {
        return CreateAccount {
            lamports: required,
            space: space as u64,
            owner: *owner,
        }
        .accounts(payer, target)?
        .invoke_signed(ctx, signer_seeds)
        .ctx("Failed to create account");
    }
    let shortfall = required.saturating_sub(current);
    if shortfall > 0 {
        Transfer {
            lamports: shortfall,
        }
        .accounts(payer, target)?
        .invoke(ctx)
        .ctx("Failed to fund account")?;
    }
    Allocate {
        space: space as u64,
    }
    .accounts(target)?
    .invoke_signed(ctx, signer_seeds)
    .ctx("Failed to allocate account")?;
    Assign { owner: *owner }
        .accounts(target)?
        .invoke_signed(ctx, signer_seeds)
        .ctx("Failed to assign account")
}

/// Writes `tag` into the first 8 bytes of `target`'s data.
pub fn stamp_tag(target: AccountView, tag: Tag) -> Result<()> {
    // SAFETY: no data borrows are live while lifecycle operations run.
    let data = unsafe { target.borrow_mut_data_unchecked() };
    let Some(prefix) = data.first_chunk_mut::<{ Tag::LEN }>() else {
        crate::bail!(
            ErrorCode::DataLenMismatch,
            "account holds {} bytes, too few for a tag",
            data.len()
        );
    };
    *prefix = tag.to_bytes();
    Ok(())
}

/// Moves all of `target`'s lamports to `destination`, zeroes and truncates its data and hands it
/// back to the system program.
pub fn close_account(target: AccountView, destination: AccountView) -> Result<()> {
    crate::ensure_ne!(
        target.address(),
        destination.address(),
        ErrorCode::DuplicateAccount,
        "cannot close an account into itself"
    );
    let balance = destination
        .lamports()
        .checked_add(target.lamports())
        .ok_or_else(|| crate::error!(ErrorCode::ArithmeticOverflow, "destination balance"))?;
    destination.set_lamports(balance);
    target.set_lamports(0);
    // SAFETY: no data or owner borrows are live while lifecycle operations run.
    unsafe {
        target.borrow_mut_data_unchecked().fill(0);
        target.resize(0)?;
        target.assign(&System::ID);
    }
    Ok(())
}

/// Changes `target`'s data length to `new_len`. When growing, `payer` tops up the balance so the
/// account stays rent exempt.
pub fn reallocate(
    ctx: &Context<'_>,
    target: AccountView,
    payer: AccountView,
    new_len: usize,
) -> Result<()> {
    let required = ctx.get_rent()?.minimum_balance(new_len);
    let shortfall = required.saturating_sub(target.lamports());
    if shortfall > 0 {
        transfer(ctx, payer, target, shortfall, &[]).ctx("Failed to fund reallocation")?;
    }
    // SAFETY: no data borrows are live while lifecycle operations run.
    unsafe { target.resize(new_len) }
}

/// Moves `lamports` from the system account `from` to `to` through the system program.
pub fn transfer(
    ctx: &Context<'_>,
    from: AccountView,
    to: AccountView,
    lamports: u64,
    signer_seeds: &[&[&[u8]]],
) -> Result<()> {
    Transfer { lamports }
        .accounts(from, to)?
        .invoke_signed(ctx, signer_seeds)
}

/// Moves `lamports` from `from`, which the executing program must own, directly to `to`.
pub fn transfer_lamports(
    ctx: &Context<'_>,
    from: AccountView,
    to: AccountView,
    lamports: u64,
) -> Result<()> {
    crate::ensure_eq!(from.owner(), ctx.program_id(), ErrorCode::OwnerMismatch);
    let remaining = from
        .lamports()
        .checked_sub(lamports)
        .ok_or_else(|| crate::error!(ProgramError::InsufficientFunds))?;
    let received = to
        .lamports()
        .checked_add(lamports)
        .ok_or_else(|| crate::error!(ErrorCode::ArithmeticOverflow, "recipient balance"))?;
    from.set_lamports(remaining);
    to.set_lamports(received);
    Ok(())
}

/// Sets the data length of the empty, already funded system account `target` to `space`, signing
/// for it with `signer_seeds` when it is a derived address.
pub fn allocate(
    ctx: &Context<'_>,
    target: AccountView,
    space: usize,
    signer_seeds: &[&[&[u8]]],
) -> Result<()> {
    crate::ensure!(
        target.is_data_empty(),
        ErrorCode::AccountAlreadyInitialized,
        "account already holds {} bytes",
        target.data_len()
    );
    let rent = ctx.get_rent()?;
    crate::ensure!(
        rent.is_exempt(target.lamports(), space),
        ErrorCode::NotRentExempt,
        "{} bytes need {} lamports",
        space,
        rent.minimum_balance(space)
    );
    Allocate {
        space: space as u64,
    }
    .accounts(target)?
    .invoke_signed(ctx, signer_seeds)
}

/// Creates the account of every `init` slot, owned by the executing program and stamped with the
/// slot's tag. Derived-address slots are checked against their seeds here and signed for with the
/// canonical bump, which is also stored when the bump lives in a record field.
pub fn init_slots(slots: &[SlotDef], views: &[AccountView], ctx: &Context<'_>) -> Result<()> {
    for (slot, target) in slots.iter().zip(views) {
        let Some(init) = slot.init else {
            continue;
        };
        init_slot(slot, init.payer, init.space, *target, views, ctx).account_path(slot.name)?;
    }
    Ok(())
}

fn init_slot(
    slot: &SlotDef,
    payer: usize,
    space: usize,
    target: AccountView,
    views: &[AccountView],
    ctx: &Context<'_>,
) -> Result<()> {
    crate::ensure!(
        target.is_data_empty() && target.is_owned_by(&System::ID),
        ErrorCode::AccountAlreadyInitialized
    );
    let payer = *views
        .get(payer)
        .ok_or_else(|| crate::error!(ErrorCode::NotEnoughAccounts, "missing payer"))?;
    let program_id = ctx.program_id();
    match &slot.seeds {
        None => create_account(ctx, payer, target, space, program_id, &[])?,
        Some(seeds) => {
            let (expected, bump) = resolve_seeds(seeds, views, program_id, None)?;
            crate::ensure_eq!(target.address(), &expected, ErrorCode::SeedsMismatch);
            let mut signer = seed_bytes(seeds, views)?;
            let bump_seed = [bump];
            signer.push(&bump_seed);
            create_account(ctx, payer, target, space, program_id, &[&signer])?;
            if let Bump::Field { offset, .. } = seeds.bump {
                // SAFETY: the account was just created and nothing borrows its data.
                let data = unsafe { target.borrow_mut_data_unchecked() };
                *data.get_mut(offset).ok_or_else(|| {
                    crate::error!(ErrorCode::DataLenMismatch, "bump field outside the account")
                })? = bump;
            }
        }
    }
    if let Some(tag) = slot.tag {
        stamp_tag(target, tag)?;
    }
    Ok(())
}

/// Closes the account of every `close` slot into its destination slot.
pub fn close_slots(slots: &[SlotDef], views: &[AccountView]) -> Result<()> {
    for (slot, target) in slots.iter().zip(views) {
        let Some(destination) = slot.close else {
            continue;
        };
        let destination = *views
            .get(destination)
            .ok_or_else(|| crate::error!(ErrorCode::NotEnoughAccounts))?;
        close_account(*target, destination).account_path(slot.name)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        runtime::Rent,
        testing::{InputBuilder, MockRuntime, TestAccount},
    };

    const PROGRAM: Address = Address::new_from_array([3; 32]);

    #[test]
    fn close_moves_balance_and_truncates() -> Result<()> {
        let mut input = InputBuilder::new(PROGRAM)
            .account(
                TestAccount::new(Address::new_from_array([1; 32]), PROGRAM)
                    .writable()
                    .lamports(1_000)
                    .data(vec![7; 48]),
            )
            .account(TestAccount::new(Address::new_from_array([2; 32]), System::ID).writable())
            .build();
        let views = input.views();
        close_account(views[0], views[1])?;
        assert_eq!(views[1].lamports(), 1_000);
        assert_eq!(views[0].lamports(), 0);
        assert_eq!(views[0].data_len(), 0);
        assert!(views[0].is_owned_by(&System::ID));
        Ok(())
    }

    #[test]
    fn close_into_itself_keeps_balance() {
        let mut input = InputBuilder::new(PROGRAM)
            .account(
                TestAccount::new(Address::new_from_array([1; 32]), PROGRAM)
                    .writable()
                    .lamports(1_000)
                    .data(vec![7; 48]),
            )
            .duplicate(0)
            .build();
        let views = input.views();
        let err = close_account(views[0], views[1]).unwrap_err();
        assert!(err.is(ErrorCode::DuplicateAccount));
        assert_eq!(views[0].lamports(), 1_000);
        assert_eq!(views[0].data_len(), 48);
        assert!(views[0].is_owned_by(&PROGRAM));
    }

    #[test]
    fn close_reports_overflow() {
        let mut input = InputBuilder::new(PROGRAM)
            .account(TestAccount::new(Address::new_from_array([1; 32]), PROGRAM).lamports(2))
            .account(
                TestAccount::new(Address::new_from_array([2; 32]), System::ID).lamports(u64::MAX),
            )
            .build();
        let views = input.views();
        let err = close_account(views[0], views[1]).unwrap_err();
        assert!(err.is(ErrorCode::ArithmeticOverflow));
        assert_eq!(views[0].lamports(), 2);
    }

    #[test]
    fn create_funds_to_rent_exemption() -> Result<()> {
        let mut input = InputBuilder::new(PROGRAM)
            .account(
                TestAccount::new(Address::new_from_array([1; 32]), System::ID)
                    .signer()
                    .writable()
                    .lamports(10_000_000),
            )
            .account(
                TestAccount::new(Address::new_from_array([2; 32]), System::ID)
                    .signer()
                    .writable(),
            )
            .build();
        let views = input.views();
        let runtime = MockRuntime::new(PROGRAM);
        let ctx = Context::new(&PROGRAM, &[], &[], &runtime);
        create_account(&ctx, views[0], views[1], 48, &PROGRAM, &[])?;

        let required = Rent::default().minimum_balance(48);
        assert_eq!(views[1].lamports(), required);
        assert_eq!(views[0].lamports(), 10_000_000 - required);
        assert_eq!(views[1].data_len(), 48);
        assert!(views[1].is_owned_by(&PROGRAM));
        assert_eq!(runtime.invocations().len(), 1);
        Ok(())
    }

    #[test]
    fn create_over_prefunded_account_tops_up() -> Result<()> {
        let mut input = InputBuilder::new(PROGRAM)
            .account(
                TestAccount::new(Address::new_from_array([1; 32]), System::ID)
                    .signer()
                    .writable()
                    .lamports(10_000_000),
            )
            .account(
                TestAccount::new(Address::new_from_array([2; 32]), System::ID)
                    .signer()
                    .writable()
                    .lamports(100),
            )
            .build();
        let views = input.views();
        let runtime = MockRuntime::new(PROGRAM);
        let ctx = Context::new(&PROGRAM, &[], &[], &runtime);
        create_account(&ctx, views[0], views[1], 16, &PROGRAM, &[])?;

        assert_eq!(views[1].lamports(), Rent::default().minimum_balance(16));
        assert_eq!(views[1].data_len(), 16);
        assert!(views[1].is_owned_by(&PROGRAM));
        // transfer, allocate, assign
        assert_eq!(runtime.invocations().len(), 3);
        Ok(())
    }

    #[test]
    fn reallocate_tops_up_when_growing() -> Result<()> {
        let start = Rent::default().minimum_balance(8);
        let mut input = InputBuilder::new(PROGRAM)
            .account(
                TestAccount::new(Address::new_from_array([1; 32]), PROGRAM)
                    .writable()
                    .lamports(start)
                    .data(vec![1; 8]),
            )
            .account(
                TestAccount::new(Address::new_from_array([2; 32]), System::ID)
                    .signer()
                    .writable()
                    .lamports(10_000_000),
            )
            .build();
        let views = input.views();
        let runtime = MockRuntime::new(PROGRAM);
        let ctx = Context::new(&PROGRAM, &[], &[], &runtime);
        reallocate(&ctx, views[0], views[1], 100)?;
        assert_eq!(views[0].data_len(), 100);
        assert_eq!(views[0].lamports(), Rent::default().minimum_balance(100));
        assert_eq!(unsafe { &views[0].borrow_data_unchecked()[..9] }, &[1, 1, 1, 1, 1, 1, 1, 1, 0]);

        reallocate(&ctx, views[0], views[1], 4)?;
        assert_eq!(views[0].data_len(), 4);
        assert_eq!(runtime.invocations().len(), 1);
        Ok(())
    }

    #[test]
    fn allocate_requires_empty_funded_account() -> Result<()> {
        let funded = Rent::default().minimum_balance(32);
        let mut input = InputBuilder::new(PROGRAM)
            .account(
                TestAccount::new(Address::new_from_array([1; 32]), System::ID)
                    .signer()
                    .writable()
                    .lamports(funded),
            )
            .account(
                TestAccount::new(Address::new_from_array([2; 32]), System::ID)
                    .signer()
                    .writable()
                    .lamports(1),
            )
            .build();
        let views = input.views();
        let runtime = MockRuntime::new(PROGRAM);
        let ctx = Context::new(&PROGRAM, &[], &[], &runtime);

        let err = allocate(&ctx, views[1], 32, &[]).unwrap_err();
        assert!(err.is(ErrorCode::NotRentExempt));

        allocate(&ctx, views[0], 32, &[])?;
        assert_eq!(views[0].data_len(), 32);
        let err = allocate(&ctx, views[0], 64, &[]).unwrap_err();
        assert!(err.is(ErrorCode::AccountAlreadyInitialized));
        Ok(())
    }

    #[test]
    fn direct_transfer_requires_ownership() -> Result<()> {
        let mut input = InputBuilder::new(PROGRAM)
            .account(TestAccount::new(Address::new_from_array([1; 32]), PROGRAM).lamports(500))
            .account(TestAccount::new(Address::new_from_array([2; 32]), System::ID).lamports(5))
            .build();
        let views = input.views();
        let runtime = MockRuntime::new(PROGRAM);
        let ctx = Context::new(&PROGRAM, &[], &[], &runtime);

        transfer_lamports(&ctx, views[0], views[1], 200)?;
        assert_eq!((views[0].lamports(), views[1].lamports()), (300, 205));
        let err = transfer_lamports(&ctx, views[1], views[0], 1).unwrap_err();
        assert!(err.is(ErrorCode::OwnerMismatch));
        let err = transfer_lamports(&ctx, views[0], views[1], 301).unwrap_err();
        assert_eq!(
            err.kind(),
            &crate::errors::ErrorKind::ProgramError(ProgramError::InsufficientFunds)
        );
        Ok(())
    }

    #[test]
    fn stamp_tag_needs_room() {
        let mut input = InputBuilder::new(PROGRAM)
            .account(TestAccount::new(Address::new_from_array([1; 32]), PROGRAM).data(vec![0; 4]))
            .build();
        let views = input.views();
        assert!(stamp_tag(views[0], Tag([1; 8])).is_err());
    }
}
