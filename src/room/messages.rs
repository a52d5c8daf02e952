//! Room actor message types.

use crate::error::Result;
use crate::game::entities::{Action, PlayerId};
use tokio::sync::oneshot;

/// Messages that can be sent to a `RoomActor`.
///
/// Every variant carries a oneshot responder; the actor always answers, even
/// with an error, so callers never hang on a dropped request.
#[derive(Debug)]
pub enum RoomMessage {
    /// Create the external deck and open the first betting stage.
    SetupGame {
        response: oneshot::Sender<Result<()>>,
    },

    /// A player action (bet, hit, stand, double, split, surrender, hurry_up).
    PerformAction {
        player_id: PlayerId,
        action: Action,
        response: oneshot::Sender<Result<()>>,
    },

    /// Add a player to the room.
    Join {
        player_id: PlayerId,
        name: String,
        response: oneshot::Sender<Result<()>>,
    },

    /// Remove a player from the room.
    Leave {
        player_id: PlayerId,
        response: oneshot::Sender<Result<()>>,
    },

    /// Relay a chat message to subscribers.
    Chat {
        sender: String,
        content: String,
        response: oneshot::Sender<Result<()>>,
    },

    /// Tear the room down and stop the actor.
    Teardown {
        response: oneshot::Sender<Result<()>>,
    },
}
