//! A counter kept in a program-derived account, one per authority.
use slot_frame::prelude::*;
use slot_frame::program::system::Transfer;

#[derive(SlotFrameProgram)]
#[program(
    instruction_set = CounterInstructionSet,
    id = "Coux9zxTFKZpRdFpE4F7Fs5RZ6FdaURdckwS61BUTMG",
    errors = CounterError,
    events = [CountChanged]
)]
pub struct CounterProgram;

#[derive(InstructionSet)]
pub enum CounterInstructionSet {
    Initialize(Initialize),
    Increment(Increment),
    Decrement(Decrement),
    Fund(Fund),
    Close(Close),
}

pub const COUNTER_SEED: &[u8] = b"counter";

#[derive(Record, Pod, Zeroable, Copy, Clone, Debug, Eq, PartialEq)]
#[repr(C)]
pub struct Counter {
    pub authority: Address,
    pub count: u64,
    pub bump: u8,
    pub _padding: [u8; 7],
}

/// How far a counter moves in one call.
#[derive(BorshSerialize, BorshDeserialize, TypeToIdl, Copy, Clone, Debug, Eq, PartialEq)]
pub struct Step {
    pub amount: u64,
    /// Wrap around instead of failing at the bounds of `u64`.
    pub wrapping: bool,
}

#[frame_error]
pub enum CounterError {
    #[msg("The counter would overflow")]
    Overflow,
    #[msg("The counter would underflow")]
    Underflow,
}

/// Emitted every time a counter moves.
#[derive(Event, BorshSerialize, Debug, Eq, PartialEq)]
pub struct CountChanged {
    pub authority: Address,
    pub count: u64,
}

/// The address of the counter owned by `authority` and its bump.
pub fn find_counter(authority: &Address) -> (Address, u8) {
    Address::find_program_address(&[COUNTER_SEED, authority.as_array()], &ID)
}

#[derive(Accounts)]
pub struct InitializeAccounts {
    pub payer: Signer<Mut<SystemAccount>>,
    pub authority: Signer,
    #[slot(init(payer = payer), seeds = [COUNTER_SEED, authority], bump = bump)]
    pub counter: Mut<Account<Counter>>,
    pub system_program: Program<System>,
}

/// Creates the counter of `authority`.
#[derive(InstructionArgs, BorshSerialize, BorshDeserialize, Debug)]
#[ix(accounts = InitializeAccounts)]
pub struct Initialize {
    pub start: u64,
}

impl Instruction for Initialize {
    type ReturnType = ();

    fn process(
        accounts: &mut InitializeAccounts,
        args: Self,
        _ctx: &mut Context<'_>,
    ) -> Result<()> {
        let authority = *accounts.authority.account_view().address();
        let counter = accounts.counter.data_mut()?;
        counter.authority = authority;
        counter.count = args.start;
        log!("Counter initialized at {}", args.start);
        Ok(())
    }
}

#[derive(Accounts)]
pub struct UpdateAccounts {
    pub authority: Signer,
    #[slot(has_one = authority, seeds = [COUNTER_SEED, authority], bump = bump)]
    pub counter: Mut<Account<Counter>>,
}

fn apply(
    accounts: &mut UpdateAccounts,
    ctx: &Context<'_>,
    update: impl FnOnce(u64) -> Result<u64>,
) -> Result<u64> {
    let counter = accounts.counter.data_mut()?;
    counter.count = update(counter.count)?;
    let event = CountChanged {
        authority: counter.authority,
        count: counter.count,
    };
    ctx.emit(&event)?;
    Ok(event.count)
}

/// Adds to the counter and returns the new count.
#[derive(InstructionArgs, BorshSerialize, BorshDeserialize, Debug)]
#[ix(accounts = UpdateAccounts)]
pub struct Increment {
    pub step: Step,
}

impl Instruction for Increment {
    type ReturnType = u64;

    fn process(accounts: &mut UpdateAccounts, args: Self, ctx: &mut Context<'_>) -> Result<u64> {
        let Step { amount, wrapping } = args.step;
        apply(accounts, ctx, |count| {
            if wrapping {
                Ok(count.wrapping_add(amount))
            } else {
                count
                    .checked_add(amount)
                    .ok_or_else(|| error!(CounterError::Overflow, "{} + {}", count, amount))
            }
        })
    }
}

/// Subtracts from the counter and returns the new count.
#[derive(InstructionArgs, BorshSerialize, BorshDeserialize, Debug)]
#[ix(accounts = UpdateAccounts)]
pub struct Decrement {
    pub step: Step,
}

impl Instruction for Decrement {
    type ReturnType = u64;

    fn process(accounts: &mut UpdateAccounts, args: Self, ctx: &mut Context<'_>) -> Result<u64> {
        let Step { amount, wrapping } = args.step;
        apply(accounts, ctx, |count| {
            if wrapping {
                Ok(count.wrapping_sub(amount))
            } else {
                count
                    .checked_sub(amount)
                    .ok_or_else(|| error!(CounterError::Underflow, "{} - {}", count, amount))
            }
        })
    }
}

#[derive(Accounts)]
pub struct FundAccounts {
    pub funder: Signer<Mut<SystemAccount>>,
    pub counter: Mut<Account<Counter>>,
    pub system_program: Program<System>,
}

/// Tops up a counter's balance through the system program.
#[derive(InstructionArgs, BorshSerialize, BorshDeserialize, Debug)]
#[ix(accounts = FundAccounts)]
pub struct Fund {
    pub lamports: u64,
}

impl Instruction for Fund {
    type ReturnType = ();

    fn process(accounts: &mut FundAccounts, args: Self, ctx: &mut Context<'_>) -> Result<()> {
        Transfer {
            lamports: args.lamports,
        }
        .accounts(
            *accounts.funder.account_view(),
            *accounts.counter.account_view(),
        )?
        .invoke(ctx)
    }
}

#[derive(Accounts)]
pub struct CloseAccounts {
    pub authority: Signer,
    #[slot(has_one = authority, close = destination)]
    pub counter: Mut<Account<Counter>>,
    pub destination: Mut<SystemAccount>,
}

/// Closes a counter, refunding its balance to `destination`.
#[derive(InstructionArgs, BorshSerialize, BorshDeserialize, Debug)]
#[ix(accounts = CloseAccounts)]
pub struct Close;

impl Instruction for Close {
    type ReturnType = ();

    fn process(accounts: &mut CloseAccounts, _args: Self, _ctx: &mut Context<'_>) -> Result<()> {
        log!("Closing counter at {}", accounts.counter.data()?.count);
        Ok(())
    }
}
