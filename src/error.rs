//! Error definitions for the channel manager and its collaborators.
//!
//! A single `Error` enum covers both: the manager itself never surfaces
//! errors to its caller (ingress methods return `()`), but the collaborator
//! traits do, so that failures can be logged and turned into a retry
//! instead of a panic.

use thiserror::Error;

/// Errors that can occur while reconciling channel state or talking to a
/// collaborator.
#[derive(Debug, Error)]
pub enum Error {
    /// `BoardStates::reinitialise` was asked to anchor a proof whose signed
    /// initial state does not match the initial state supplied alongside it.
    #[error("initial state does not match the state proof's signed initial state")]
    InitialStateMismatch,

    /// The wallet failed to produce a signature for a local or automatic
    /// move.
    #[error("failed to sign message for address {address}: {reason}")]
    SigningFailed {
        /// The address the signature was requested for.
        address: String,
        /// The collaborator-supplied failure reason.
        reason: String,
    },

    /// The move sender failed to submit an on-chain transaction.
    #[error("on-chain submission failed: {0}")]
    SubmissionFailed(String),

    /// The manager's internal mutex was found poisoned, meaning an earlier
    /// call panicked while holding it.
    #[error("channel manager mutex is poisoned")]
    Poisoned,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(_err: std::sync::PoisonError<T>) -> Self {
        Error::Poisoned
    }
}
