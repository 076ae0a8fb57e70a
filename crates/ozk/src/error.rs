//! Error taxonomy.
//!
//! Internally the executor raises [`RunError`]; the scheduler consumes the
//! `Unbound` variant as dataflow suspension and converts everything else
//! into the host-facing [`Exception`]. Any non-suspension error in any
//! thread halts the whole run.

use std::fmt;

use strum::Display;

use crate::{resource::ResourceError, schedule::ThreadId, store::Slot};

pub(crate) type RunResult<T> = Result<T, RunError>;

/// Runtime error raised while reducing a statement.
#[derive(Debug)]
pub(crate) enum RunError {
    /// Dataflow suspension: the statement needs this slot bound. Caught by
    /// the scheduler, never surfaced to the user.
    Unbound(Slot),
    /// Two values cannot be made to denote the same thing.
    Unify(String),
    /// A value has the wrong kind for the operation.
    Type(String),
    /// A configured resource limit was exceeded.
    Resource(ResourceError),
}

impl RunError {
    pub fn unify(message: impl Into<String>) -> Self {
        Self::Unify(message.into())
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::Type(message.into())
    }

    /// Attributes the error to the thread it halted.
    pub fn into_exception(self, thread: ThreadId) -> Exception {
        match self {
            Self::Unbound(_) => unreachable!("dataflow suspension is consumed by the scheduler"),
            Self::Unify(message) => Exception::new(ExceptionKind::Unification, format!("thread {thread}: {message}")),
            Self::Type(message) => Exception::new(ExceptionKind::Type, format!("thread {thread}: {message}")),
            Self::Resource(err) => Exception::new(ExceptionKind::Resource, format!("thread {thread}: {err}")),
        }
    }
}

impl From<ResourceError> for RunError {
    fn from(err: ResourceError) -> Self {
        Self::Resource(err)
    }
}

/// What went wrong, coarsely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ExceptionKind {
    /// The program failed validation before execution started.
    #[strum(serialize = "prepare error")]
    Prepare,
    #[strum(serialize = "unification failure")]
    Unification,
    #[strum(serialize = "type error")]
    Type,
    /// Every remaining thread is suspended on a slot no thread will bind.
    #[strum(serialize = "deadlock")]
    Deadlock,
    #[strum(serialize = "resource limit exceeded")]
    Resource,
}

/// Host-facing error for a failed preparation or run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exception {
    kind: ExceptionKind,
    message: String,
}

impl Exception {
    pub(crate) fn new(kind: ExceptionKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub(crate) fn prepare(message: impl Into<String>) -> Self {
        Self::new(ExceptionKind::Prepare, message)
    }

    pub(crate) fn deadlock(message: impl Into<String>) -> Self {
        Self::new(ExceptionKind::Deadlock, message)
    }

    #[must_use]
    pub fn kind(&self) -> ExceptionKind {
        self.kind
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn is_deadlock(&self) -> bool {
        self.kind == ExceptionKind::Deadlock
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for Exception {}
