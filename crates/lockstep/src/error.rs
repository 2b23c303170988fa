// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use thiserror::Error;

/// A specialized `Result` type for [`Ticker`][crate::Ticker] operations
/// that return a lockstep [`Error`][enum@Error] on failure.
pub type Result<T> = std::result::Result<T, Error>;

/// An error returned by the operations of a [`Ticker`][crate::Ticker] or a
/// [`Participant`][crate::Participant].
///
/// Errors are reported directly to the caller. The ticker never retries an
/// operation on its own, and a failed operation never leaves the shared state
/// half-updated.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// A reservation was requested with a negative tick budget.
    ///
    /// Nothing was registered or removed before the check failed.
    #[error("tick budget must not be negative, got {ticks}")]
    InvalidArgument {
        /// The rejected budget.
        ticks: i64,
    },

    /// The calling thread was interrupted through an [`Interrupt`][crate::Interrupt]
    /// while it was blocked.
    ///
    /// The interruption is consumed by this error. Any record the participant
    /// still owns stays registered until the participant is relaxed or dropped.
    #[error("the blocked operation was cancelled by an interrupt")]
    Cancelled,
}
