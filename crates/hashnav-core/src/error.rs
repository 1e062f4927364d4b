#![forbid(unsafe_code)]

//! Error taxonomy for navigation cycles.
//!
//! # Failure Modes
//!
//! | Error | Cause | Behavior |
//! |-------|-------|----------|
//! | `UnregisteredElement` | fragment names an id without a registry entry | warn, skip entry |
//! | `MissingHandlerFunction` | handler name not bound to a callable | warn, skip entry |
//! | `HandlerThrew` | handler returned `Err` or panicked | error, dispatch fails, cycle continues |
//! | `MalformedNavConfig` | config attribute is not a JSON object | all-default config |
//! | `UnauthorizedAccess` | protected element without authentication | handler skipped, fallback redirect |
//! | `PrimaryTargetNotFound` | first fragment entry absent from the document | cycle aborted, nothing committed |
//!
//! Only `PrimaryTargetNotFound` stops a cycle; everything else is recovered
//! locally and listed in the cycle report.

use std::fmt;

/// Recoverable (and one non-recoverable) navigation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavError {
    /// The element id has no registry entry.
    UnregisteredElement { element: String },
    /// The element is registered under a handler name with no callable.
    MissingHandlerFunction { element: String, handler: String },
    /// The handler failed while applying a state.
    HandlerThrew {
        element: String,
        handler: String,
        message: String,
    },
    /// The element's configuration blob could not be parsed.
    MalformedNavConfig { element: String, reason: String },
    /// A protected element was targeted without authentication.
    UnauthorizedAccess { element: String },
    /// The primary fragment target does not exist in the document.
    PrimaryTargetNotFound { element: String },
}

impl NavError {
    /// The element the error is about.
    #[must_use]
    pub fn element(&self) -> &str {
        match self {
            Self::UnregisteredElement { element }
            | Self::MissingHandlerFunction { element, .. }
            | Self::HandlerThrew { element, .. }
            | Self::MalformedNavConfig { element, .. }
            | Self::UnauthorizedAccess { element }
            | Self::PrimaryTargetNotFound { element } => element,
        }
    }

    /// Whether this error aborts the whole navigation cycle.
    #[must_use]
    pub fn aborts_cycle(&self) -> bool {
        matches!(self, Self::PrimaryTargetNotFound { .. })
    }
}

impl fmt::Display for NavError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnregisteredElement { element } => {
                write!(f, "no handler registered for element `{element}`")
            }
            Self::MissingHandlerFunction { element, handler } => {
                write!(f, "handler `{handler}` for element `{element}` is not registered")
            }
            Self::HandlerThrew {
                element,
                handler,
                message,
            } => write!(f, "handler `{handler}` failed for `{element}`: {message}"),
            Self::MalformedNavConfig { element, reason } => {
                write!(f, "invalid nav config for `{element}`: {reason}")
            }
            Self::UnauthorizedAccess { element } => {
                write!(f, "protected element `{element}` requires authentication")
            }
            Self::PrimaryTargetNotFound { element } => {
                write!(f, "navigation target `{element}` not found in document")
            }
        }
    }
}

impl std::error::Error for NavError {}

/// Error returned by a handler that could not apply a state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for HandlerError {}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}
