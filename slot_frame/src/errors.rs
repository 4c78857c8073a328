use alloc::{borrow::Cow, boxed::Box, string::ToString, vec, vec::Vec};
use core::{
    fmt::{Debug, Formatter},
    panic::Location,
};

use derive_more::{Deref, DerefMut, Display, Error as DeriveError};
use itertools::Itertools;
use pinocchio::program_error::ProgramError;
use pinocchio_log::{log, logger::Logger};
pub use slot_frame_proc::frame_error;

/// Error codes for errors emitted by `slot_frame`
#[frame_error(offset = 0)]
pub enum ErrorCode {
    // Protocol violations: the declared schema disagrees with the supplied buffer
    #[msg("Account data length does not match the declared slot size")]
    DataLenMismatch = 1_000,
    #[msg("Not enough accounts supplied for the instruction's schema")]
    NotEnoughAccounts,
    #[msg("Duplicate account reference aliases a writable slot")]
    DuplicateAccount,
    #[msg("Malformed duplicate account marker")]
    InvalidDuplicateMarker,
    #[msg("No instruction registered for the supplied tag")]
    InstructionNotFound,

    // Constraint violations
    #[msg("Account is not a signer")]
    ExpectedSigner = 2_000,
    #[msg("Account is not writable")]
    ExpectedWritable,
    #[msg("Account is not owned by the expected program")]
    OwnerMismatch,
    #[msg("Account's address does not match expected address")]
    AddressMismatch,
    #[msg("Account record tag does not match")]
    TagMismatch,
    #[msg("Record field does not match the related account's address")]
    HasOneMismatch,
    #[msg("Account address is not derived from the declared seeds")]
    SeedsMismatch,
    #[msg("Account is not executable")]
    ExpectedExecutable,

    // Lifecycle and invocation failures
    #[msg("Cross program invocation failed")]
    InvocationFailed = 3_000,
    #[msg("Conflicting signer or writable flags for a duplicated invocation account")]
    ConflictingDuplicateAccount,
    #[msg("Account is already initialized")]
    AccountAlreadyInitialized,
    #[msg("Account does not hold enough lamports to be rent exempt")]
    NotRentExempt,
    #[msg("Account data can not grow past the permitted increase")]
    InvalidRealloc,
    #[msg("Syscall is only available on chain")]
    SyscallUnavailable,

    // Arithmetic
    #[msg("Arithmetic overflow")]
    ArithmeticOverflow = 4_000,

    // Conversion from other errors
    #[msg("std::io::Error")]
    IoError = 9_000, // Conversion errors should be the last category
    #[msg("bytemuck::PodCastError")]
    PodCastError,
    #[msg("core::num::TryFromIntError")]
    TryFromIntError,
    #[msg("core::array::TryFromSliceError")]
    TryFromSliceError,
    #[msg("serde_json::Error")]
    SerdeJsonError,
    #[msg("slot_frame_idl::Error")]
    IdlError,
}

/// Fails with `$err` unless `$found == $expected`. Without a message, both values are logged.
#[macro_export]
macro_rules! ensure_eq {
    ($found:expr, $expected:expr, $err:expr $(,)?) => {
        match (&$found, &$expected) {
            (found, expected) => {
                if *found != *expected {
                    return Err($crate::error!($err, "expected {:?}, found {:?}", expected, found).into());
                }
            }
        }
    };
    ($found:expr, $expected:expr, $err:expr, $($msg:tt)+) => {
        if $found != $expected {
            return Err($crate::error!($err, $($msg)+).into());
        }
    };
}

/// Fails with `$err` if `$found == $unexpected`.
#[macro_export]
macro_rules! ensure_ne {
    ($found:expr, $unexpected:expr, $err:expr $(,)?) => {
        match (&$found, &$unexpected) {
            (found, unexpected) => {
                if *found == *unexpected {
                    return Err($crate::error!($err, "did not expect {:?}", unexpected).into());
                }
            }
        }
    };
    ($found:expr, $unexpected:expr, $err:expr, $($msg:tt)+) => {
        if $found == $unexpected {
            return Err($crate::error!($err, $($msg)+).into());
        }
    };
}

/// Fails with `$err` and an optional formatted message unless `$cond` holds.
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr $(, $($msg:tt)*)?) => {
        if !$cond {
            $crate::bail!($err $(, $($msg)*)?);
        }
    };
}

/// Returns early with `$err` and an optional formatted message.
#[macro_export]
macro_rules! bail {
    ($err:expr $(, $($msg:tt)*)?) => {
        return Err($crate::error!($err $(, $($msg)*)?).into())
    };
}

/// Builds an [`Error`] at the call site, optionally with a formatted message.
#[macro_export]
macro_rules! error {
    ($err:expr $(,)?) => {
        $crate::errors::Error::new($err)
    };
    ($err:expr, $($msg:tt)+) => {
        $crate::errors::Error::with_message($err, $crate::alloc::format!($($msg)+))
    };
}

/// A program specific error code.
///
/// Derive it on a fieldless enum with [`macro@frame_error`]; any implementor converts into an
/// [`Error`].
pub trait FrameError: 'static + Debug + Send + Sync {
    fn code(&self) -> u32;
    fn name(&self) -> Cow<'static, str>;
}

/// What went wrong: a host [`ProgramError`] or a [`FrameError`] code.
#[derive(Debug)]
pub enum ErrorKind {
    ProgramError(ProgramError),
    Custom(Box<dyn FrameError>),
}

impl ErrorKind {
    fn to_program_error(&self) -> ProgramError {
        match self {
            ErrorKind::ProgramError(program_error) => program_error.clone(),
            ErrorKind::Custom(custom) => ProgramError::Custom(custom.code()),
        }
    }
}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            ErrorKind::ProgramError(program_error) => write!(f, "ProgramError: {program_error:?}"),
            ErrorKind::Custom(custom) => write!(f, "FrameError: {}", custom.name()),
        }
    }
}

impl PartialEq for ErrorKind {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Custom(left), Self::Custom(right)) => left.code() == right.code(),
            (Self::ProgramError(left), Self::ProgramError(right)) => left == right,
            _ => false,
        }
    }
}

/// A file and line inside the program's source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[display("{file}:{line}")]
pub struct ErrorSource {
    file: &'static str,
    line: u32,
}

impl From<&'static Location<'static>> for ErrorSource {
    fn from(location: &'static Location<'static>) -> Self {
        Self {
            file: location.file(),
            line: location.line(),
        }
    }
}

impl ErrorSource {
    #[track_caller]
    #[must_use]
    pub fn caller() -> Self {
        Location::caller().into()
    }
}

/// Boxed payload of [`Error`].
#[derive(Debug, DeriveError)]
pub struct ErrorInner {
    kind: ErrorKind,
    message: Option<Cow<'static, str>>,
    origin: ErrorSource,
    /// Slot names, innermost first.
    path: Vec<&'static str>,
    /// Context added while the error travelled up, oldest first.
    trail: Vec<(ErrorSource, Cow<'static, str>)>,
}

/// The error type returned from `slot_frame` traits and functions.
///
/// One pointer wide.
#[derive(Debug, DeriveError, Display, Deref, DerefMut)]
pub struct Error(#[error(source)] Box<ErrorInner>);
static_assertions::assert_impl_all!(Error: Send, Sync);
static_assertions::assert_eq_size!(Error, usize);

impl core::fmt::Display for ErrorInner {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(message) = &self.message {
            write!(f, " - {message}")?;
        }
        writeln!(f, "\nOccurred at: {}", self.origin)?;
        if !self.path.is_empty() {
            writeln!(f, "For account: {}", self.path.iter().rev().join("."))?;
        }
        self.trail
            .iter()
            .try_for_each(|(source, ctx)| writeln!(f, "{source}: {ctx}"))
    }
}

impl From<Error> for ProgramError {
    fn from(error: Error) -> Self {
        error.kind.to_program_error()
    }
}

mod private {
    #[doc(hidden)]
    pub trait Sealed {}
    impl<T, E: Into<super::Error>> Sealed for Result<T, E> {}
}

/// Context helpers for any result whose error converts into [`Error`].
pub trait ErrorInfo<T>: private::Sealed {
    /// Attaches a static message at the caller's location.
    #[track_caller]
    fn ctx(self, ctx: &'static str) -> Result<T, Error>;

    /// Attaches a message built only on the error path.
    #[track_caller]
    fn with_ctx<C>(self, with_ctx: impl FnOnce() -> C) -> Result<T, Error>
    where
        C: Into<Cow<'static, str>>;

    /// Records that the error happened inside the slot named `account_path`. Call from the
    /// innermost slot outwards.
    fn account_path(self, account_path: &'static str) -> Result<T, Error>;
}

impl<T, E> ErrorInfo<T> for Result<T, E>
where
    E: Into<Error>,
{
    #[track_caller]
    fn ctx(self, ctx: &'static str) -> Result<T, Error> {
        let source = ErrorSource::caller();
        self.map_err(|error| error.into().push_ctx(source, ctx))
    }

    #[track_caller]
    fn with_ctx<C>(self, with_ctx: impl FnOnce() -> C) -> Result<T, Error>
    where
        C: Into<Cow<'static, str>>,
    {
        let source = ErrorSource::caller();
        self.map_err(|error| error.into().push_ctx(source, with_ctx()))
    }

    fn account_path(self, account_path: &'static str) -> Result<T, Error> {
        self.map_err(|error| {
            let mut error = error.into();
            error.path.push(account_path);
            error
        })
    }
}

#[doc(hidden)]
#[diagnostic::on_unimplemented(
    message = "Errors in slot_frame can only be made from types that implement FrameError or Into<ErrorKind>",
    note = "FrameError can be derived on enums with the #[frame_error] macro"
)]
pub trait CanMakeError: Into<ErrorKind> {}
impl<T: Into<ErrorKind>> CanMakeError for T {}

impl Error {
    /// An error of `kind` raised at the caller's location.
    #[cold]
    #[must_use]
    #[track_caller]
    pub fn new(kind: impl CanMakeError) -> Self {
        Self::raise(kind.into(), None, ErrorSource::caller())
    }

    /// An error of `kind` raised at the caller's location, with a message.
    #[cold]
    #[must_use]
    #[track_caller]
    pub fn with_message(kind: impl CanMakeError, message: impl Into<Cow<'static, str>>) -> Self {
        Self::raise(kind.into(), Some(message.into()), ErrorSource::caller())
    }

    #[cold]
    fn raise(kind: ErrorKind, message: Option<Cow<'static, str>>, origin: ErrorSource) -> Self {
        Error(Box::new(ErrorInner {
            kind,
            message,
            origin,
            path: vec![],
            trail: vec![],
        }))
    }

    #[cold]
    #[must_use]
    fn push_ctx(mut self, source: ErrorSource, ctx: impl Into<Cow<'static, str>>) -> Self {
        self.trail.push((source, ctx.into()));
        self
    }

    /// The kind of this error.
    #[must_use]
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// The slot names leading to the failing account, outermost first.
    pub fn account_path(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.path.iter().rev().copied()
    }

    /// Returns `true` if this error was created from the given custom error.
    #[must_use]
    pub fn is(&self, error: impl FrameError) -> bool {
        matches!(&self.kind, ErrorKind::Custom(custom) if custom.code() == error.code())
    }

    /// The non-zero status returned to the runtime for this error.
    #[must_use]
    pub fn status(&self) -> u64 {
        self.kind.to_program_error().into()
    }

    /// Writes the error to the program log through [`pinocchio_log`].
    pub fn log(&self) {
        let mut headline = Logger::<1000>::default();
        match &self.kind {
            ErrorKind::ProgramError(program_error) => {
                headline.append("ProgramError: ");
                headline.append(alloc::format!("{program_error:?}").as_str());
            }
            ErrorKind::Custom(custom) => {
                headline.append("FrameError: ");
                headline.append(custom.name().as_ref());
            }
        }
        if let Some(message) = &self.message {
            headline.append(" - ");
            headline.append(message.as_ref());
        }
        headline.log();

        log!("Occurred at: {}:{}", self.origin.file, self.origin.line);

        if !self.path.is_empty() {
            let mut path = Logger::<200>::default();
            path.append("For account: ");
            for (index, slot) in self.path.iter().rev().enumerate() {
                if index > 0 {
                    path.append(".");
                }
                path.append(*slot);
            }
            path.log();
        }

        for (source, ctx) in &self.trail {
            log!(1000, "{}:{}: {}", source.file, source.line, ctx.as_ref());
        }
    }
}

/// Logs the error and maps it to the status returned to the runtime.
#[cold]
#[must_use]
pub fn handle_error(error: &Error) -> u64 {
    error.log();
    error.status()
}

impl<T> From<T> for ErrorKind
where
    T: FrameError,
{
    fn from(error: T) -> Self {
        ErrorKind::Custom(Box::new(error))
    }
}

impl From<ProgramError> for ErrorKind {
    fn from(error: ProgramError) -> Self {
        ErrorKind::ProgramError(error)
    }
}

impl From<core::num::TryFromIntError> for ErrorKind {
    fn from(_error: core::num::TryFromIntError) -> Self {
        ErrorCode::TryFromIntError.into()
    }
}

impl From<solana_address::error::AddressError> for ErrorKind {
    fn from(error: solana_address::error::AddressError) -> Self {
        use solana_address::error::AddressError;
        ErrorKind::ProgramError(match error {
            AddressError::MaxSeedLengthExceeded => ProgramError::MaxSeedLengthExceeded,
            AddressError::InvalidSeeds => ProgramError::InvalidSeeds,
            AddressError::IllegalOwner => ProgramError::IllegalOwner,
        })
    }
}

impl<T> From<T> for Error
where
    T: Into<ErrorKind>,
{
    #[track_caller]
    fn from(value: T) -> Self {
        Error::raise(value.into(), None, ErrorSource::caller())
    }
}

/// Converts foreign errors into an [`ErrorCode`], keeping their rendering as the message.
macro_rules! convert_with_message {
    ($($(#[$meta:meta])* $ty:ty => $code:ident, |$error:ident| $message:expr;)*) => {
        $(
            $(#[$meta])*
            impl From<$ty> for Error {
                #[track_caller]
                fn from($error: $ty) -> Self {
                    Error::raise(
                        ErrorCode::$code.into(),
                        Some(Cow::Owned($message)),
                        ErrorSource::caller(),
                    )
                }
            }
        )*
    };
}

convert_with_message! {
    borsh::io::Error => IoError, |error| error.to_string();
    bytemuck::PodCastError => PodCastError, |error| alloc::format!("{error:?}");
    core::array::TryFromSliceError => TryFromSliceError, |error| error.to_string();
    #[cfg(all(feature = "idl", not(target_os = "solana")))]
    slot_frame_idl::Error => IdlError, |error| error.to_string();
    #[cfg(all(feature = "idl", not(target_os = "solana")))]
    serde_json::Error => SerdeJsonError, |error| error.to_string();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure() -> Result<(), Error> {
        ensure!(0 == 0, ProgramError::IllegalOwner, "Static str");
        ensure!(true, ProgramError::IllegalOwner);
        ensure!(true, ErrorCode::TagMismatch, "Hello {}!", "world");
        let res: Result<(), Error> = (|| {
            ensure_eq!(0, 1, ProgramError::IllegalOwner, "Test {:?}", "aaa");
            Ok(())
        })();

        let res = res.ctx("AAA").account_path("counter").unwrap_err();
        assert_eq!(res.kind(), &ErrorKind::ProgramError(ProgramError::IllegalOwner));
        assert_eq!(res.account_path().collect::<Vec<_>>(), vec!["counter"]);

        res.log();
        std::println!("{res}");
        Ok(())
    }

    #[test]
    fn test_bail() {
        let _: fn() -> Result<(), Error> = || bail!(ProgramError::IllegalOwner, "Static str");
        let _: fn() -> Result<(), Error> = || bail!(ProgramError::IllegalOwner);
        let _: fn() -> Result<(), Error> = || bail!(ErrorCode::TagMismatch, "Hello {}!", "world");
    }

    #[test]
    fn custom_errors_map_to_their_code() {
        let error = error!(ErrorCode::ExpectedSigner, "missing signature");
        assert!(error.is(ErrorCode::ExpectedSigner));
        assert!(!error.is(ErrorCode::ExpectedWritable));
        assert_eq!(error.status(), 2_000);
        assert_eq!(ProgramError::from(error), ProgramError::Custom(2_000));
    }

    #[test]
    fn account_path_nests_outward() {
        let res: Result<(), Error> = Err(Error::new(ErrorCode::OwnerMismatch));
        let err = res.account_path("inner").account_path("outer").unwrap_err();
        assert_eq!(err.account_path().collect::<Vec<_>>(), vec!["outer", "inner"]);
    }
}
