//! Error taxonomy and flow-control codes.

use std::fmt::{self, Display};

use strum::{Display as StrumDisplay, IntoStaticStr};

/// Result type alias for operations that can produce an interpreter error.
///
/// The default `T` is [`Flow`], the shape every command handler returns.
pub type SzlResult<T = Flow> = Result<T, SzlError>;

/// Classification of interpreter failures.
///
/// The kind is programmatic metadata; the human-readable diagnostic lives in
/// [`SzlError::message`] and is what scripts observe through `$_` and `try`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, StrumDisplay, IntoStaticStr)]
pub enum ErrorKind {
    /// A value cannot be converted to the requested representation.
    BadValue,
    /// A variable, command, or member name was not found.
    BadName,
    /// A list or dict index is out of range or has the wrong sign.
    BadIndex,
    /// Arity or option mismatch for a command.
    Usage,
    /// Mutation of a read-only value.
    ReadOnly,
    /// Unbalanced `{`/`}` in a script or statement.
    UnbalancedBrace,
    /// Unbalanced `[`/`]` in a script or statement.
    UnbalancedBracket,
    /// Recursion depth exceeded.
    NestingLimit,
    /// Operation not supported by a stream backend.
    Unsupported,
    /// Operation on a closed stream.
    Closed,
    /// Wrapped I/O error.
    Io,
    /// Wrapped operating system error.
    Os,
    /// Error raised by script code via `throw`.
    User,
}

/// An interpreter error: a kind plus the diagnostic message.
///
/// The evaluator writes the message into `interp.last` before an `Error`
/// status becomes visible to callers, so `try` blocks and the shell always
/// see a human-readable value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SzlError {
    kind: ErrorKind,
    message: String,
}

impl SzlError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    pub(crate) fn bad_int(s: &str) -> Self {
        Self::new(ErrorKind::BadValue, format!("bad int: {s}"))
    }

    pub(crate) fn bad_float(s: &str) -> Self {
        Self::new(ErrorKind::BadValue, format!("bad float: {s}"))
    }

    pub(crate) fn bad_dict() -> Self {
        Self::new(ErrorKind::BadValue, "bad dict")
    }

    pub(crate) fn bad_name(name: &str) -> Self {
        Self::new(ErrorKind::BadName, format!("no such obj: {name}"))
    }

    pub(crate) fn not_a_proc(name: &str) -> Self {
        Self::new(ErrorKind::BadName, format!("not a proc: {name}"))
    }

    pub(crate) fn bad_index(index: i64) -> Self {
        Self::new(ErrorKind::BadIndex, format!("bad index: {index}"))
    }

    pub(crate) fn read_only(what: &str) -> Self {
        Self::new(ErrorKind::ReadOnly, what.to_owned())
    }

    pub(crate) fn unbalanced_braces(s: &str) -> Self {
        Self::new(ErrorKind::UnbalancedBrace, format!("unbalanced {{}}: {s}"))
    }

    pub(crate) fn unbalanced_brackets(s: &str) -> Self {
        Self::new(ErrorKind::UnbalancedBracket, format!("unbalanced []: {s}"))
    }

    pub(crate) fn nesting_limit() -> Self {
        Self::new(ErrorKind::NestingLimit, "reached nesting limit")
    }

    pub(crate) fn unsupported(op: &str) -> Self {
        Self::new(ErrorKind::Unsupported, format!("{op} on unsupported stream"))
    }

    pub(crate) fn closed(op: &str) -> Self {
        Self::new(ErrorKind::Closed, format!("{op} on closed stream"))
    }
}

impl Display for SzlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for SzlError {}

impl From<std::io::Error> for SzlError {
    fn from(err: std::io::Error) -> Self {
        Self::new(ErrorKind::Io, err.to_string())
    }
}

/// Success-side flow-control codes returned by command handlers.
///
/// `Error` is deliberately absent: failures travel as [`SzlError`] through
/// `Result`, and the two sides meet again in [`Status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Plain success; `interp.last` holds the return value.
    Ok,
    /// Abort the enclosing loop.
    Break,
    /// Skip to the next iteration of the enclosing loop.
    Continue,
    /// Stop executing the current user-defined procedure.
    Return,
    /// Stop the entire script.
    Exit,
}

/// The status of a completed statement or script, as observed by embedders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, StrumDisplay, IntoStaticStr)]
pub enum Status {
    Ok,
    Error,
    Break,
    Continue,
    Return,
    Exit,
}

impl Status {
    /// True for the two statuses a successful top-level run may end with.
    #[must_use]
    pub fn is_success(self) -> bool {
        matches!(self, Self::Ok | Self::Exit)
    }
}

impl From<Flow> for Status {
    fn from(flow: Flow) -> Self {
        match flow {
            Flow::Ok => Self::Ok,
            Flow::Break => Self::Break,
            Flow::Continue => Self::Continue,
            Flow::Return => Self::Return,
            Flow::Exit => Self::Exit,
        }
    }
}
