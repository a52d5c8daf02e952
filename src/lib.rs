//! # Blackjack Rooms
//!
//! A live multiplayer blackjack room engine: a deterministic per-room state
//! machine driving betting, dealing, turn-taking, and settlement, plus a
//! concurrent event hub that fans room events out to subscribers.
//!
//! ## Architecture
//!
//! Every room runs as its own actor task, so all mutations for one room are
//! serialized through an inbox. The actor delegates to [`game::GameSession`],
//! which validates each action against the current stage, persists the
//! result with an optimistic-concurrency version, and broadcasts events
//! describing what changed.
//!
//! A round moves through five stages:
//!
//! - **Betting**: players place bets until the deadline passes
//! - **Dealing**: bets are deducted, hands created, two cards dealt to each
//! - **PlayerAction**: each hand acts in turn (hit, stand, double, split,
//!   surrender)
//! - **FinishRound**: the dealer draws to 17 and every hand is settled
//! - **Teardown**: the room is closed and its cards returned
//!
//! Deadlines are reactive: nothing fires when one expires. Instead any
//! player may send `hurry_up`, which the engine honors only once the
//! deadline has actually passed.
//!
//! ## Core Modules
//!
//! - [`game`]: blackjack rules, hand scoring, turn order, and the session
//!   state machine
//! - [`room`]: per-room actors and the manager that spawns them
//! - [`events`]: typed room events and the broadcast hub
//! - [`deck`]: the external deck-of-cards service client and a scripted
//!   in-memory deck
//! - [`db`]: storage traits with Postgres and in-memory implementations
//!
//! ## Example
//!
//! ```no_run
//! use blackjack_rooms::{
//!     db::MemoryStore, deck::ScriptedDeck, events::EventHub, game::RoomConfig,
//!     room::RoomManager,
//! };
//! use std::sync::Arc;
//! use uuid::Uuid;
//!
//! # async fn demo() -> Result<(), blackjack_rooms::Error> {
//! let store = Arc::new(MemoryStore::new());
//! let manager = RoomManager::new(
//!     store.clone(),
//!     store.clone(),
//!     store,
//!     Arc::new(ScriptedDeck::new()),
//!     Arc::new(EventHub::new()),
//! );
//!
//! let host = Uuid::new_v4();
//! let room_id = manager.create_room(host, RoomConfig::default()).await?;
//! manager.join_room(room_id, host, "host").await?;
//! manager.setup_game(room_id).await?;
//! # Ok(())
//! # }
//! ```

pub mod db;
pub mod deck;
pub mod error;
pub mod events;
pub mod game;
pub mod room;

pub use error::{Error, Result};
pub use events::{EventHub, RoomEvent, Subscription};
pub use game::{Action, GameSession, RoomConfig, Stage};
pub use room::{RoomManager, RoomMessage};
