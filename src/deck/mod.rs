//! External card-shuffling/dealing provider.
//!
//! The deck is network-backed and authoritative: hands are piles inside it,
//! named after [`Hand::pile_name`](crate::game::entities::Hand::pile_name),
//! and this crate never duplicates the card lists locally.

pub mod client;
pub mod scripted;

pub use client::CardDeckClient;
pub use scripted::ScriptedDeck;

use crate::game::entities::Card;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeckError {
    #[error("deck api request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unknown deck or pile: {0}")]
    UnknownPile(String),

    #[error("deck has no cards left to draw")]
    Exhausted,

    #[error("unexpected deck api response: {0}")]
    Malformed(String),
}

impl DeckError {
    /// Transport failures may be retried; semantic failures may not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Http(e) if e.is_timeout() || e.is_connect())
    }
}

pub type DeckResult<T> = Result<T, DeckError>;

/// Narrow draw/list/add/remove/return contract over the external deck.
/// All calls are fallible; callers decide retry per [`DeckError::is_retryable`].
#[async_trait]
pub trait DeckProvider: Send + Sync {
    /// Create a fresh shuffled deck and return its identifier.
    async fn create_deck(&self) -> DeckResult<String>;

    /// Draw `count` cards from the deck into the named pile, returning the
    /// drawn cards in draw order.
    async fn draw_cards(&self, deck_id: &str, pile: &str, count: usize) -> DeckResult<Vec<Card>>;

    /// List the cards currently in a pile, in insertion order.
    async fn list_pile(&self, deck_id: &str, pile: &str) -> DeckResult<Vec<Card>>;

    /// Move a specific card into a pile.
    async fn add_to_pile(&self, deck_id: &str, pile: &str, card_code: &str) -> DeckResult<()>;

    /// Take a specific card out of a pile.
    async fn remove_from_pile(&self, deck_id: &str, pile: &str, card_code: &str) -> DeckResult<()>;

    /// Return every card (piles included) to the deck and reshuffle.
    async fn return_all(&self, deck_id: &str) -> DeckResult<()>;
}
