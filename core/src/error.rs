//! Status codes shared by every hub operation.
//!
//! Structural failures (`NotFound`, `Duplicate`, `NoMemory`, ...) are
//! returned to the caller as values. Client-contract violations are not:
//! the offending session is killed through the `ClientControl` collaborator
//! and the `Fatal` variant is produced only so the call chain can unwind.
//! The transport layer drops it instead of delivering it.

use thiserror::Error;

/// User-visible status of a hub operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HubError {
    /// The path does not resolve to an entry.
    #[error("not found")]
    NotFound,
    /// An entry already exists with a conflicting role, type, or units.
    #[error("duplicate")]
    Duplicate,
    /// The resource exists but has no current value and no default.
    #[error("unavailable")]
    Unavailable,
    /// The path resolves to a namespace, which carries no data.
    #[error("unsupported")]
    Unsupported,
    /// The resource holds a different data type than requested.
    #[error("format error")]
    FormatError,
    /// The value does not fit in the caller-declared buffer capacity.
    #[error("overflow")]
    Overflow,
    /// A per-client resource cap was exceeded.
    #[error("no memory")]
    NoMemory,
    /// The calling session has been killed for a contract violation.
    /// Never delivered to the offender.
    #[error("fatal")]
    Fatal,
}

impl HubError {
    /// Stable short code used on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            HubError::NotFound => "not_found",
            HubError::Duplicate => "duplicate",
            HubError::Unavailable => "unavailable",
            HubError::Unsupported => "unsupported",
            HubError::FormatError => "format_error",
            HubError::Overflow => "overflow",
            HubError::NoMemory => "no_memory",
            HubError::Fatal => "fatal",
        }
    }
}

/// Result alias used throughout the crate.
pub type HubResult<T> = Result<T, HubError>;
