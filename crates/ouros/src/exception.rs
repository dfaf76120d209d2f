//! Python exception taxonomy and the internal error type threaded through evaluation.
//!
//! Exceptions are represented stringly, per spec: an [`ExcType`] names the
//! class, and `except` matches by comparing the clause's type-prefix against
//! the raised exception's class name (walking a fixed ancestor chain for the
//! handful of built-in types that have one). This keeps matching a flat,
//! testable operation instead of a virtual dispatch table, at the cost of not
//! supporting arbitrary custom hierarchies — user classes that subclass
//! `Exception` are tracked by name only, with `Exception` as their sole
//! ancestor.
//!
//! A cleaner re-architecture (noted in spec.md's design notes) would give
//! exceptions `{class, args, cause}` identity resolved along the MRO instead
//! of a string prefix; that redesign is logged as an open question in
//! DESIGN.md rather than implemented, since the spec pins the stringly-typed
//! behavior as the one under test.

use std::fmt;

use strum::{Display, EnumString, IntoStaticStr};

use crate::value::Value;

/// Built-in Python exception classes this interpreter can raise.
///
/// `Display`/`FromStr`/`Into<&'static str>` are derived so the variant name
/// *is* the string used both for message prefixes and `except` matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
pub enum ExcType {
    /// Matches every exception in `except Exception` clauses.
    Exception,
    SyntaxError,
    NameError,
    UnboundLocalError,
    TypeError,
    ValueError,
    IndexError,
    KeyError,
    AttributeError,
    ZeroDivisionError,
    ImportError,
    ModuleNotFoundError,
    RecursionError,
    TimeoutError,
    IOError,
    FileNotFoundError,
    PermissionError,
    NetworkError,
    AssertionError,
    StopIteration,
    NotImplementedError,
    /// A user-defined exception class. The actual class name is carried
    /// alongside this tag on [`Exception`] (see `class_name`), since `strum`
    /// can only enumerate the built-in variants.
    UserDefined,
}

impl ExcType {
    /// Ancestor chain used for `except` matching, most specific first,
    /// always terminating in `Exception`.
    fn ancestors(self) -> &'static [ExcType] {
        match self {
            ExcType::UnboundLocalError => &[ExcType::UnboundLocalError, ExcType::NameError, ExcType::Exception],
            ExcType::FileNotFoundError => &[ExcType::FileNotFoundError, ExcType::IOError, ExcType::Exception],
            ExcType::ModuleNotFoundError => &[ExcType::ModuleNotFoundError, ExcType::ImportError, ExcType::Exception],
            ExcType::Exception => &[ExcType::Exception],
            _ => &[ExcType::Exception],
        }
    }
}

/// A single frame of the Python call stack at the point an exception was
/// raised, used to build a traceback-like description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    pub function_name: String,
    pub line: u32,
}

/// Source location attached to an exception for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CodeLoc {
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for CodeLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// A raised Python exception: a class name (built-in or user-defined), a
/// message, an optional chained cause (`raise X from Y`), and the call stack
/// at the point of the raise.
///
/// `except X as e:` binds `e` to this value; `str(e)` returns `message`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exception {
    pub exc_type: ExcType,
    /// The exact class name, which for user-defined exceptions is the
    /// subclass name rather than `"UserDefined"`.
    pub class_name: String,
    pub message: String,
    pub cause: Option<Box<Exception>>,
    pub stack: Vec<StackFrame>,
}

impl Exception {
    #[must_use]
    pub fn new(exc_type: ExcType, message: impl Into<String>) -> Self {
        let message = message.into();
        let class_name = <&'static str>::from(exc_type).to_owned();
        Self {
            exc_type,
            class_name,
            message,
            cause: None,
            stack: Vec::new(),
        }
    }

    #[must_use]
    pub fn user_defined(class_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            exc_type: ExcType::UserDefined,
            class_name: class_name.into(),
            message: message.into(),
            cause: None,
            stack: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_cause(mut self, cause: Exception) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    #[must_use]
    pub fn with_frame(mut self, frame: StackFrame) -> Self {
        self.stack.push(frame);
        self
    }

    /// Whether an `except <prefix>` clause naming `prefix` should catch this
    /// exception: exact class-name match, or `prefix` appears in the
    /// built-in ancestor chain (which always includes `"Exception"`).
    #[must_use]
    pub fn matches(&self, prefix: &str) -> bool {
        if prefix == self.class_name {
            return true;
        }
        self.exc_type.ancestors().iter().any(|a| <&'static str>::from(*a) == prefix)
    }

    /// `str(exception)`, the form recorded in the Core API's error message.
    #[must_use]
    pub fn full_message(&self) -> String {
        format!("{}: {}", self.class_name, self.message)
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_message())
    }
}

impl std::error::Error for Exception {}

/// Internal control-flow error threaded through `Result` during evaluation.
///
/// Distinguishes a raised Python exception from the control escapes that must
/// bypass user `except` clauses entirely: compute-budget exceedance and
/// unbounded recursion becoming a hard stop rather than a catchable
/// `TimeoutError`/`RecursionError` value at the point they originate (they
/// are still surfaced to user code as those exception types if re-raised by
/// the Core API boundary, but cannot be intercepted mid-propagation), and a
/// `suspend()` call handing a value back to the host.
#[derive(Debug, Clone)]
pub enum RunError {
    Raised(Exception),
    /// Compute deadline exceeded; propagates past every `except`.
    Timeout(Exception),
    /// `suspend(value)` was called; propagates past every `except` up to the
    /// top-level statement driver in `run.rs`, which snapshots and hands
    /// `value` to the host.
    Suspended(Value),
}

impl RunError {
    /// The exception carried by `Raised`/`Timeout`; panics on `Suspended`,
    /// which carries a plain value instead (callers that might see a
    /// suspension check for it first).
    #[must_use]
    pub fn exception(&self) -> &Exception {
        match self {
            RunError::Raised(e) | RunError::Timeout(e) => e,
            RunError::Suspended(_) => panic!("RunError::Suspended has no exception"),
        }
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::Suspended(_) => write!(f, "suspended"),
            other => write!(f, "{}", other.exception()),
        }
    }
}

impl std::error::Error for RunError {}

pub type RunResult<T> = Result<T, RunError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_class_name() {
        let exc = Exception::new(ExcType::ZeroDivisionError, "division by zero");
        assert_eq!(exc.full_message(), "ZeroDivisionError: division by zero");
    }

    #[test]
    fn except_exception_catches_everything() {
        let exc = Exception::new(ExcType::KeyError, "'x'");
        assert!(exc.matches("Exception"));
        assert!(exc.matches("KeyError"));
        assert!(!exc.matches("ValueError"));
    }

    #[test]
    fn ancestor_chain_catches_intermediate_class() {
        let exc = Exception::new(ExcType::FileNotFoundError, "no such file");
        assert!(exc.matches("IOError"));
    }

    #[test]
    fn user_defined_only_matches_own_name_and_exception() {
        let exc = Exception::user_defined("MyError", "boom");
        assert!(exc.matches("MyError"));
        assert!(exc.matches("Exception"));
        assert!(!exc.matches("ValueError"));
    }
}
