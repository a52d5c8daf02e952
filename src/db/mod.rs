//! Durable storage for room, player, and hand records.
//!
//! Stage writes carry an optimistic-concurrency token: a write against a
//! stale version fails with [`StoreError::Conflict`] instead of silently
//! overwriting. This is the backstop for when per-room serialization is
//! bypassed or crosses process boundaries.

pub mod memory;
pub mod repository;

pub use memory::MemoryStore;
pub use repository::{HandStore, PgStore, PlayerStore, RoomStore};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The record changed since it was read; retry against fresh state.
    #[error("record changed since read")]
    Conflict,

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    /// The adjustment would drive a balance negative.
    #[error("balance cannot go negative")]
    BalanceBelowZero,

    /// A stored record failed to decode.
    #[error("corrupt stored record: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
