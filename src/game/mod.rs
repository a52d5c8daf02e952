//! Blackjack rules and the per-room state machine.

pub mod entities;
pub mod score;
pub mod session;
pub mod turns;

pub use entities::{
    Action, Card, Chips, Hand, HandId, Player, PlayerId, PlayerRole, PlayerStatus, Room,
    RoomConfig, RoomId, Stage,
};
pub use score::Outcome;
pub use session::GameSession;
