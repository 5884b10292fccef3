//! Error kinds, control-flow signals and compile errors.
//!
//! Runtime evaluation returns [`Flow`], a `Result` whose error side is a
//! [`Halt`]: either a user-visible [`ScriptError`] or a [`Signal`] that an
//! enclosing construct is expected to consume.  Keeping the two apart means
//! a stray `break()` can never be mistaken for an error, and a stray error
//! can never be swallowed by a loop.

use std::fmt;

use thiserror::Error;

use super::construct::Construct;
use super::registry::Arity;
use super::target::Target;

// ── ExceptionKind ─────────────────────────────────────────────────────────────

/// The catchable error kinds a builtin may declare in its `thrown()` set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExceptionKind {
    Cast,
    Format,
    InsufficientArguments,
    Security,
    PluginInternal,
    Range,
    IndexOverflow,
    NullPointer,
    InvalidProcedure,
    /// A control-flow signal used where nothing can consume it, or a write
    /// to a final variable.
    Misuse,
}

impl ExceptionKind {
    pub const ALL: &'static [ExceptionKind] = &[
        ExceptionKind::Cast,
        ExceptionKind::Format,
        ExceptionKind::InsufficientArguments,
        ExceptionKind::Security,
        ExceptionKind::PluginInternal,
        ExceptionKind::Range,
        ExceptionKind::IndexOverflow,
        ExceptionKind::NullPointer,
        ExceptionKind::InvalidProcedure,
        ExceptionKind::Misuse,
    ];

    /// Name shown to script authors.
    pub fn name(self) -> &'static str {
        match self {
            ExceptionKind::Cast => "CastException",
            ExceptionKind::Format => "FormatException",
            ExceptionKind::InsufficientArguments => "InsufficientArgumentsException",
            ExceptionKind::Security => "SecurityException",
            ExceptionKind::PluginInternal => "PluginInternalException",
            ExceptionKind::Range => "RangeException",
            ExceptionKind::IndexOverflow => "IndexOverflowException",
            ExceptionKind::NullPointer => "NullPointerException",
            ExceptionKind::InvalidProcedure => "InvalidProcedureException",
            ExceptionKind::Misuse => "MisuseException",
        }
    }
}

impl fmt::Display for ExceptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── ScriptError ───────────────────────────────────────────────────────────────

/// A runtime error raised by a builtin or by the engine itself.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}: {message} ({target})")]
pub struct ScriptError {
    pub kind: ExceptionKind,
    pub message: String,
    pub target: Target,
}

impl ScriptError {
    pub fn new(kind: ExceptionKind, message: impl Into<String>, target: Target) -> Self {
        ScriptError { kind, message: message.into(), target }
    }

    pub fn cast(message: impl Into<String>, target: Target) -> Self {
        Self::new(ExceptionKind::Cast, message, target)
    }

    pub fn format(message: impl Into<String>, target: Target) -> Self {
        Self::new(ExceptionKind::Format, message, target)
    }

    pub fn range(message: impl Into<String>, target: Target) -> Self {
        Self::new(ExceptionKind::Range, message, target)
    }

    pub fn misuse(message: impl Into<String>, target: Target) -> Self {
        Self::new(ExceptionKind::Misuse, message, target)
    }
}

// ── Signals ───────────────────────────────────────────────────────────────────

/// Which signal a builtin may legitimately raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    Break,
    Continue,
    Return,
    Cancel,
}

/// A non-local control transfer.
#[derive(Debug, Clone)]
pub enum Signal {
    /// Leave the innermost `n` loops (always at least 1).
    Break(u32),
    Continue,
    Return(Construct),
    /// Stop the whole script; the runner treats this as a normal exit.
    Cancel,
}

impl Signal {
    pub fn kind(&self) -> SignalKind {
        match self {
            Signal::Break(_) => SignalKind::Break,
            Signal::Continue => SignalKind::Continue,
            Signal::Return(_) => SignalKind::Return,
            Signal::Cancel => SignalKind::Cancel,
        }
    }

    /// Name of the builtin that raises this signal, for diagnostics.
    pub fn origin(&self) -> &'static str {
        match self {
            Signal::Break(_) => "break()",
            Signal::Continue => "continue()",
            Signal::Return(_) => "return()",
            Signal::Cancel => "die()",
        }
    }

    /// Convert a signal nothing consumed into the error reported for it.
    pub fn into_misuse(self, target: Target) -> ScriptError {
        let place = match self.kind() {
            SignalKind::Break | SignalKind::Continue => "outside of a loop",
            SignalKind::Return => "outside of a procedure",
            SignalKind::Cancel => "where it cannot be handled",
        };
        ScriptError::misuse(format!("{} used {place}", self.origin()), target)
    }
}

// ── Halt / Flow ───────────────────────────────────────────────────────────────

/// Why evaluation of a node stopped without producing a value.
#[derive(Debug, Clone)]
pub enum Halt {
    Signal(Signal),
    Error(ScriptError),
}

impl From<ScriptError> for Halt {
    fn from(e: ScriptError) -> Self {
        Halt::Error(e)
    }
}

impl From<Signal> for Halt {
    fn from(s: Signal) -> Self {
        Halt::Signal(s)
    }
}

/// Result of evaluating one node (or invoking one builtin).
pub type Flow<T = Construct> = Result<T, Halt>;

// ── CompileError ──────────────────────────────────────────────────────────────

/// An error that aborts compilation before anything runs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("unknown function {name}() ({target})")]
    UnknownFunction { name: String, target: Target },

    #[error("{name}() does not accept {got} argument(s); expected {expected} ({target})")]
    Arity { name: String, got: usize, expected: Arity, target: Target },

    #[error("unterminated string literal starting at {target}")]
    UnterminatedString { target: Target },

    #[error("unterminated block comment starting at {target}")]
    UnterminatedComment { target: Target },

    #[error("unclosed '{open}' opened at {target}")]
    Unclosed { open: char, target: Target },

    #[error("unexpected {found} ({target})")]
    Unexpected { found: String, target: Target },

    #[error("expressions nested deeper than {limit} levels ({target})")]
    TooDeep { limit: usize, target: Target },

    #[error("unexpected end of script; {context}")]
    UnexpectedEof { context: String },

    #[error("could not fold {name}(): {source}")]
    Fold { name: String, source: ScriptError },
}

impl CompileError {
    /// Location of the error, when it has one.
    pub fn target(&self) -> Option<&Target> {
        match self {
            CompileError::UnknownFunction { target, .. }
            | CompileError::Arity { target, .. }
            | CompileError::UnterminatedString { target }
            | CompileError::UnterminatedComment { target }
            | CompileError::Unclosed { target, .. }
            | CompileError::Unexpected { target, .. }
            | CompileError::TooDeep { target, .. } => Some(target),
            CompileError::Fold { source, .. } => Some(&source.target),
            CompileError::UnexpectedEof { .. } => None,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
