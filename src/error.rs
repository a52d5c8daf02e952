//! Crate-wide error taxonomy.
//!
//! Validation failures (`InvalidAction`, `NotFound`) are local: they are
//! reported to the caller and no state is mutated. `Conflict` means an
//! optimistic-concurrency write lost a race and the whole action should be
//! retried against refreshed state. Infrastructure failures abort the action
//! where it stands; non-idempotent calls are never blindly retried.

use crate::db::StoreError;
use crate::deck::DeckError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Action not legal for the current stage, out of turn, insufficient
    /// balance, or an unmet split/double/surrender precondition.
    #[error("invalid action: {0}")]
    InvalidAction(String),

    /// A room, player, or hand reference did not resolve.
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    /// A persistence write lost an optimistic-concurrency race.
    #[error("state changed since read; retry the action")]
    Conflict,

    /// An invariant the engine relies on was violated. Fatal for the action.
    #[error("inconsistent room state: {0}")]
    Inconsistency(String),

    /// A deck-provider or persistence call failed. `retryable` marks
    /// failures that are safe to retry (idempotent reads, timeouts before
    /// any effect); draws and deductions are never blindly retried.
    #[error("external provider failure: {message}")]
    Provider { message: String, retryable: bool },
}

impl Error {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidAction(message.into())
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict => Self::Conflict,
            StoreError::NotFound { kind, id } => Self::NotFound { kind, id },
            StoreError::BalanceBelowZero => Self::InvalidAction("insufficient balance".into()),
            StoreError::Corrupt(msg) => Self::Inconsistency(msg),
            StoreError::Database(e) => Self::Provider {
                message: e.to_string(),
                retryable: false,
            },
        }
    }
}

impl From<DeckError> for Error {
    fn from(err: DeckError) -> Self {
        let retryable = err.is_retryable();
        Self::Provider {
            message: err.to_string(),
            retryable,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
