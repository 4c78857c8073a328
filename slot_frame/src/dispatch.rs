//! Instruction routing from the raw runtime input to a handler.
//!
//! Every program has a static table of [`Route`]s, one per instruction, each carrying the
//! instruction's tag, its schema and the [`Layout`] computed from that schema at compile time.
//!
//! Dispatch first tries the static path: for a route whose layout is fully fixed, the account
//! count, duplicate markers and data lengths in the buffer are compared against the layout. On a
//! match the payload sits at a known offset, so the tag is read without scanning a single account
//! entry. The static path only commits to a route whose own layout also matches the buffer.
//! Anything else falls back to the dynamic path, which walks every account entry, resolves
//! duplicate markers and exposes accounts past the schema as remaining accounts.

use crate::{
    account_view::AccountView,
    context::Context,
    errors::{ErrorCode, ErrorInfo},
    instruction::Instruction,
    layout::{account_span, Layout, SlotSize, DUPLICATE_ENTRY_SIZE, NON_DUP_MARKER, PAYLOAD_LEN_SIZE},
    lifecycle::{close_slots, init_slots},
    runtime::Runtime,
    schema::{AccountSchema, SlotDef},
    tag::Tag,
    validate::validate_slots,
    Result,
};
use alloc::vec::Vec;
use borsh::BorshDeserialize;
use core::{mem::size_of, slice};
use solana_address::Address;

pub use slot_frame_proc::InstructionSet;

/// Everything a route needs from the input besides the slot views.
#[derive(derive_more::Debug, Copy, Clone)]
pub struct Invocation<'a> {
    pub program_id: &'a Address,
    pub payload: &'a [u8],
    #[debug(skip)]
    pub runtime: &'a dyn Runtime,
}

/// Runs one instruction against its resolved slot views and remaining accounts.
pub type RunFn = fn(&[AccountView], &[AccountView], &Invocation<'_>) -> Result<()>;

/// One entry of a program's routing table.
#[derive(Copy, Clone, Debug)]
pub struct Route {
    pub name: &'static str,
    pub tag: Tag,
    pub slots: &'static [SlotDef],
    pub layout: Layout,
    pub validate: bool,
    pub run: RunFn,
}

impl Route {
    #[must_use]
    pub const fn new<I: Instruction>() -> Self {
        Self {
            name: I::NAME,
            tag: I::TAG,
            slots: <I::Accounts as AccountSchema>::SLOTS,
            layout: <I::Accounts as AccountSchema>::LAYOUT,
            validate: I::VALIDATE,
            run: run_route::<I>,
        }
    }
}

/// Whether every route of a table has a distinct tag.
#[must_use]
pub const fn tags_unique(routes: &[Route]) -> bool {
    let mut left = 0;
    while left < routes.len() {
        let mut right = left + 1;
        while right < routes.len() {
            if routes[left].tag.const_eq(&routes[right].tag) {
                return false;
            }
            right += 1;
        }
        left += 1;
    }
    true
}

/// A program's set of instructions.
///
/// Derivable with [`derive@InstructionSet`] on an enum with one single-field tuple variant
/// per instruction. The derive also asserts at compile time that all tags are unique.
pub trait InstructionSet {
    const ROUTES: &'static [Route];
}

impl InstructionSet for () {
    const ROUTES: &'static [Route] = &[];
}

/// Routes the runtime input to the instruction whose tag leads the payload.
///
/// # Safety
/// `input` must point to a runtime input buffer that stays valid and unaliased for the call.
pub unsafe fn dispatch(routes: &[Route], input: *mut u8, runtime: &dyn Runtime) -> Result<()> {
    // SAFETY: upheld by the caller.
    if let Some(result) = unsafe { dispatch_static(routes, input, runtime) } {
        return result;
    }
    // SAFETY: upheld by the caller.
    unsafe { dispatch_dynamic(routes, input, runtime) }
}

/// Returns `None` when no route can be selected from compile-time offsets alone.
pub(crate) unsafe fn dispatch_static(
    routes: &[Route],
    input: *mut u8,
    runtime: &dyn Runtime,
) -> Option<Result<()>> {
    for candidate in routes.iter().filter(|route| route.layout.is_static()) {
        // SAFETY: `matches` only reads entries it has confirmed to be in bounds.
        if !unsafe { candidate.layout.matches(candidate.slots, input) } {
            continue;
        }
        let payload_offset = candidate.layout.payload_offset()?;
        // SAFETY: the buffer matched the layout, so the payload length and payload follow the
        // last account entry, with the program id right after the payload.
        let (payload, program_id) = unsafe {
            let len = input
                .add(payload_offset - PAYLOAD_LEN_SIZE)
                .cast::<u64>()
                .read() as usize;
            let payload = slice::from_raw_parts(input.add(payload_offset), len);
            let program_id = &*input.add(payload_offset + len).cast::<Address>();
            (payload, program_id)
        };
        let tag = Tag::read(payload)?;
        let route = routes.iter().find(|route| route.tag == tag)?;
        // SAFETY: as above.
        if !core::ptr::eq(route, candidate) && !unsafe { route.layout.matches(route.slots, input) }
        {
            return None;
        }
        let views: Vec<AccountView> = (0..route.layout.len())
            .filter_map(|index| route.layout.header_offset(index))
            // SAFETY: every header offset of a matching layout points at an account header.
            .map(|offset| unsafe { AccountView::new_unchecked(input.add(offset)) })
            .collect();
        return Some(run(route, &views, &[], program_id, payload, runtime));
    }
    None
}

/// One account entry of the input, after duplicate markers are resolved.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ParsedAccount {
    pub view: AccountView,
    /// Index of the earlier entry this one duplicates.
    pub duplicate_of: Option<usize>,
}

/// The runtime input, fully scanned.
#[derive(Debug)]
pub struct ParsedInput<'a> {
    pub accounts: Vec<ParsedAccount>,
    pub payload: &'a [u8],
    pub program_id: &'a Address,
}

/// Scans every account entry of the runtime input.
///
/// # Safety
/// `input` must point to a runtime input buffer that outlives `'a`.
pub unsafe fn parse_input<'a>(input: *mut u8) -> Result<ParsedInput<'a>> {
    // SAFETY: the account count is always present.
    let count = unsafe { input.cast::<u64>().read() } as usize;
    let mut accounts = Vec::with_capacity(count);
    let mut offset = size_of::<u64>();
    for index in 0..count {
        // SAFETY: `offset` points at the next entry, whose first byte is the duplicate marker.
        let marker = unsafe { input.add(offset).read() };
        if marker == NON_DUP_MARKER {
            // SAFETY: a non-duplicate entry starts with a full header.
            let view = unsafe { AccountView::new_unchecked(input.add(offset)) };
            offset += account_span(view.data_len());
            accounts.push(ParsedAccount {
                view,
                duplicate_of: None,
            });
        } else {
            let original = usize::from(marker);
            crate::ensure!(
                original < index,
                ErrorCode::InvalidDuplicateMarker,
                "entry {} references entry {}",
                index,
                original
            );
            let view = accounts[original].view;
            offset += DUPLICATE_ENTRY_SIZE;
            accounts.push(ParsedAccount {
                view,
                duplicate_of: Some(original),
            });
        }
    }
    // SAFETY: the payload length, payload and program id follow the last entry.
    let (payload, program_id) = unsafe {
        let len = input.add(offset).cast::<u64>().read() as usize;
        offset += PAYLOAD_LEN_SIZE;
        let payload = slice::from_raw_parts(input.add(offset), len);
        let program_id = &*input.add(offset + len).cast::<Address>();
        (payload, program_id)
    };
    Ok(ParsedInput {
        accounts,
        payload,
        program_id,
    })
}

unsafe fn dispatch_dynamic(routes: &[Route], input: *mut u8, runtime: &dyn Runtime) -> Result<()> {
    // SAFETY: upheld by the caller.
    let parsed = unsafe { parse_input(input)? };
    let tag = Tag::read(parsed.payload).ok_or_else(|| {
        crate::error!(
            ErrorCode::InstructionNotFound,
            "payload of {} bytes is too short for a tag",
            parsed.payload.len()
        )
    })?;
    let route = routes
        .iter()
        .find(|route| route.tag == tag)
        .ok_or_else(|| crate::error!(ErrorCode::InstructionNotFound, "unknown tag {:?}", tag.0))?;

    let slots = route.slots;
    crate::ensure!(
        parsed.accounts.len() >= slots.len(),
        ErrorCode::NotEnoughAccounts,
        "`{}` needs {} accounts, found {}",
        route.name,
        slots.len(),
        parsed.accounts.len()
    );
    for (slot, account) in slots.iter().zip(&parsed.accounts) {
        check_entry(slots, slot, account).account_path(slot.name)?;
    }

    let views: Vec<AccountView> = parsed.accounts.iter().map(|account| account.view).collect();
    let (views, remaining) = views.split_at(slots.len());
    run(
        route,
        views,
        remaining,
        parsed.program_id,
        parsed.payload,
        runtime,
    )
}

fn check_entry(slots: &[SlotDef], slot: &SlotDef, account: &ParsedAccount) -> Result<()> {
    if let Some(original) = account.duplicate_of {
        let aliases_writable = slot.writable || slots.get(original).is_some_and(|slot| slot.writable);
        crate::ensure!(
            !aliases_writable,
            ErrorCode::DuplicateAccount,
            "duplicates account {}",
            original
        );
    }
    if let SlotSize::Fixed(len) = slot.size {
        crate::ensure_eq!(account.view.data_len(), len, ErrorCode::DataLenMismatch);
    }
    Ok(())
}

fn run(
    route: &Route,
    views: &[AccountView],
    remaining: &[AccountView],
    program_id: &Address,
    payload: &[u8],
    runtime: &dyn Runtime,
) -> Result<()> {
    let invocation = Invocation {
        program_id,
        payload,
        runtime,
    };
    (route.run)(views, remaining, &invocation)
}

fn run_route<I: Instruction>(
    views: &[AccountView],
    remaining: &[AccountView],
    invocation: &Invocation<'_>,
) -> Result<()> {
    let slots = <I::Accounts as AccountSchema>::SLOTS;
    let mut bytes = invocation.payload.get(Tag::LEN..).unwrap_or_default();
    let args = <I as BorshDeserialize>::deserialize(&mut bytes)
        .ctx("Failed to deserialize instruction data")?;
    if I::VALIDATE {
        validate_slots(slots, views, invocation.program_id).ctx("Failed to validate accounts")?;
    }
    let mut ctx = Context::new(
        invocation.program_id,
        invocation.payload,
        remaining,
        invocation.runtime,
    );
    init_slots(slots, views, &ctx).ctx("Failed to initialize accounts")?;
    let mut accounts = <I::Accounts as AccountSchema>::from_views(views);
    let ret = I::process(&mut accounts, args, &mut ctx).ctx("Failed to run instruction")?;
    close_slots(slots, views).ctx("Failed to close accounts")?;
    if size_of::<I::ReturnType>() > 0 {
        ctx.set_return_data(bytemuck::bytes_of(&ret));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        account_view::AsAccountView,
        instruction::InstructionArgs,
        sighash,
        slot::{Data, Mut, Signer, SlotType, Unchecked},
        testing::{InputBuilder, MockRuntime, TestAccount},
    };
    use borsh::BorshSerialize;

    const PROGRAM: Address = Address::new_from_array([8; 32]);

    struct TouchAccounts {
        target: Mut<Data<16>>,
    }

    impl AccountSchema for TouchAccounts {
        const SLOTS: &'static [SlotDef] = &[
            SlotDef::of::<Signer>("authority"),
            SlotDef::of::<Mut<Data<16>>>("target"),
        ];

        fn from_views(views: &[AccountView]) -> Self {
            Self {
                target: Mut::from_view(views[1]),
            }
        }
    }

    #[derive(BorshSerialize, BorshDeserialize)]
    struct Touch {
        amount: u64,
    }

    impl InstructionArgs for Touch {
        const NAME: &'static str = "touch";
        const TAG: Tag = Tag::new(sighash!("global", "touch"));
        type Accounts = TouchAccounts;
    }

    impl Instruction for Touch {
        type ReturnType = u64;

        fn process(
            accounts: &mut TouchAccounts,
            args: Self,
            _ctx: &mut Context<'_>,
        ) -> Result<u64> {
            // SAFETY: no other borrow of the target's data is live.
            let data = unsafe { accounts.target.account_view().borrow_mut_data_unchecked() };
            let counter: &mut u64 = bytemuck::from_bytes_mut(&mut data[..8]);
            *counter += args.amount;
            Ok(*counter)
        }
    }

    struct PokeAccounts;

    impl AccountSchema for PokeAccounts {
        const SLOTS: &'static [SlotDef] = &[SlotDef::of::<Unchecked>("anything")];

        fn from_views(_views: &[AccountView]) -> Self {
            Self
        }
    }

    #[derive(BorshSerialize, BorshDeserialize)]
    struct Poke;

    impl InstructionArgs for Poke {
        const NAME: &'static str = "poke";
        const TAG: Tag = Tag::new(sighash!("global", "poke"));
        type Accounts = PokeAccounts;
    }

    impl Instruction for Poke {
        type ReturnType = ();

        fn process(_accounts: &mut PokeAccounts, _args: Self, ctx: &mut Context<'_>) -> Result<()> {
            ctx.set_return_data(&[ctx.remaining_accounts().len() as u8]);
            Ok(())
        }
    }

    const ROUTES: &[Route] = &[Route::new::<Touch>(), Route::new::<Poke>()];
    static_assertions::const_assert!(tags_unique(ROUTES));

    fn touch_input(signer: bool) -> InputBuilder {
        let mut authority = TestAccount::new(Address::new_from_array([1; 32]), Address::default());
        if signer {
            authority = authority.signer();
        }
        let mut data = vec![0; 16];
        data[..8].copy_from_slice(&5u64.to_le_bytes());
        InputBuilder::new(PROGRAM)
            .account(authority)
            .account(
                TestAccount::new(Address::new_from_array([2; 32]), PROGRAM)
                    .writable()
                    .data(data),
            )
    }

    #[test]
    fn tag_routes_to_registered_handler() -> Result<()> {
        let mut input = touch_input(true)
            .instruction(&Touch { amount: 1 })?
            .build();
        let runtime = MockRuntime::new(PROGRAM);
        unsafe { dispatch(ROUTES, input.as_mut_ptr(), &runtime)? };
        assert_eq!(input.read_account(1).data[..8], 6u64.to_le_bytes());
        assert_eq!(runtime.return_data(), Some(6u64.to_le_bytes().to_vec()));
        Ok(())
    }

    #[test]
    fn exact_static_buffer_takes_static_path() -> Result<()> {
        let mut input = touch_input(true)
            .instruction(&Touch { amount: 2 })?
            .build();
        let runtime = MockRuntime::new(PROGRAM);
        let result = unsafe { dispatch_static(ROUTES, input.as_mut_ptr(), &runtime) };
        assert!(matches!(result, Some(Ok(()))));
        assert_eq!(input.read_account(1).data[..8], 7u64.to_le_bytes());
        Ok(())
    }

    #[test]
    fn extra_accounts_fall_back_to_dynamic_path() -> Result<()> {
        let extra = TestAccount::new(Address::new_from_array([3; 32]), Address::default());
        let mut input = touch_input(true)
            .account(extra)
            .instruction(&Touch { amount: 1 })?
            .build();
        let runtime = MockRuntime::new(PROGRAM);
        assert!(unsafe { dispatch_static(ROUTES, input.as_mut_ptr(), &runtime) }.is_none());
        unsafe { dispatch(ROUTES, input.as_mut_ptr(), &runtime)? };
        assert_eq!(input.read_account(1).data[..8], 6u64.to_le_bytes());
        Ok(())
    }

    #[test]
    fn dynamic_schema_exposes_remaining_accounts() -> Result<()> {
        let mut input = InputBuilder::new(PROGRAM)
            .account(TestAccount::new(Address::new_from_array([1; 32]), PROGRAM).data(vec![1; 3]))
            .account(TestAccount::new(Address::new_from_array([2; 32]), PROGRAM))
            .duplicate(0)
            .instruction(&Poke)?
            .build();
        let runtime = MockRuntime::new(PROGRAM);
        unsafe { dispatch(ROUTES, input.as_mut_ptr(), &runtime)? };
        assert_eq!(runtime.return_data(), Some(vec![2]));
        Ok(())
    }

    #[test]
    fn failed_constraint_leaves_record_untouched() -> Result<()> {
        let mut input = touch_input(false)
            .instruction(&Touch { amount: 1 })?
            .build();
        let runtime = MockRuntime::new(PROGRAM);
        let err = unsafe { dispatch(ROUTES, input.as_mut_ptr(), &runtime) }.unwrap_err();
        assert!(err.is(ErrorCode::ExpectedSigner));
        assert_eq!(input.read_account(1).data[..8], 5u64.to_le_bytes());
        Ok(())
    }

    #[test]
    fn too_few_accounts_rejected_before_handler() -> Result<()> {
        let mut input = InputBuilder::new(PROGRAM)
            .account(TestAccount::new(Address::new_from_array([1; 32]), Address::default()).signer())
            .instruction(&Touch { amount: 1 })?
            .build();
        let runtime = MockRuntime::new(PROGRAM);
        let err = unsafe { dispatch(ROUTES, input.as_mut_ptr(), &runtime) }.unwrap_err();
        assert!(err.is(ErrorCode::NotEnoughAccounts));
        Ok(())
    }

    #[test]
    fn unknown_or_short_tag_is_not_found() {
        for payload in [vec![0; 8], vec![1, 2, 3]] {
            let mut input = touch_input(true).payload(payload).build();
            let runtime = MockRuntime::new(PROGRAM);
            let err = unsafe { dispatch(ROUTES, input.as_mut_ptr(), &runtime) }.unwrap_err();
            assert!(err.is(ErrorCode::InstructionNotFound));
        }
    }

    #[test]
    fn wrong_data_len_is_rejected() -> Result<()> {
        let mut input = InputBuilder::new(PROGRAM)
            .account(TestAccount::new(Address::new_from_array([1; 32]), Address::default()).signer())
            .account(
                TestAccount::new(Address::new_from_array([2; 32]), PROGRAM)
                    .writable()
                    .data(vec![0; 15]),
            )
            .instruction(&Touch { amount: 1 })?
            .build();
        let runtime = MockRuntime::new(PROGRAM);
        let err = unsafe { dispatch(ROUTES, input.as_mut_ptr(), &runtime) }.unwrap_err();
        assert!(err.is(ErrorCode::DataLenMismatch));
        assert_eq!(err.account_path().collect::<Vec<_>>(), vec!["target"]);
        Ok(())
    }

    #[test]
    fn duplicate_of_writable_slot_is_rejected() -> Result<()> {
        let mut input = InputBuilder::new(PROGRAM)
            .account(
                TestAccount::new(Address::new_from_array([2; 32]), PROGRAM)
                    .writable()
                    .signer(),
            )
            .duplicate(0)
            .instruction(&Touch { amount: 1 })?
            .build();
        let runtime = MockRuntime::new(PROGRAM);
        let err = unsafe { dispatch(ROUTES, input.as_mut_ptr(), &runtime) }.unwrap_err();
        assert!(err.is(ErrorCode::DuplicateAccount));
        Ok(())
    }

    #[test]
    fn duplicate_marker_must_point_backwards() {
        let mut input = InputBuilder::new(PROGRAM).duplicate(0).payload(vec![0; 8]).build();
        let err = unsafe { parse_input(input.as_mut_ptr()) }.unwrap_err();
        assert!(err.is(ErrorCode::InvalidDuplicateMarker));
    }

    #[test]
    fn parse_input_reads_payload_and_program_id() -> Result<()> {
        let mut input = touch_input(true).payload(vec![9, 9, 9]).build();
        let parsed = unsafe { parse_input(input.as_mut_ptr())? };
        assert_eq!(parsed.accounts.len(), 2);
        assert_eq!(parsed.payload, &[9, 9, 9]);
        assert_eq!(parsed.program_id, &PROGRAM);
        assert_eq!(
            *parsed.accounts[1].view.address(),
            Address::new_from_array([2; 32])
        );
        Ok(())
    }
}
