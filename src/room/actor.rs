//! Room actor: one task per room, serializing all game mutations.
//!
//! The actor owns nothing but its inbox; state lives in the stores and all
//! game logic lives in [`GameSession`]. Deadlines are reactive, so there is
//! no tick: a stalled room stays idle until someone sends `hurry_up`.

use super::messages::RoomMessage;
use crate::error::{Error, Result};
use crate::game::entities::RoomId;
use crate::game::session::GameSession;
use std::sync::Arc;
use tokio::sync::mpsc;

const INBOX_BUFFER: usize = 100;

/// Handle for sending messages to a room actor.
#[derive(Clone)]
pub struct RoomHandle {
    sender: mpsc::Sender<RoomMessage>,
    room_id: RoomId,
}

impl RoomHandle {
    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    /// Send a message to the room. Fails if the actor has stopped.
    pub async fn send(&self, message: RoomMessage) -> Result<()> {
        self.sender
            .send(message)
            .await
            .map_err(|_| Error::not_found("room", self.room_id))
    }
}

/// Actor managing a single room.
pub struct RoomActor {
    room_id: RoomId,
    session: Arc<GameSession>,
    inbox: mpsc::Receiver<RoomMessage>,
    is_closed: bool,
}

impl RoomActor {
    pub fn new(room_id: RoomId, session: Arc<GameSession>) -> (Self, RoomHandle) {
        let (sender, inbox) = mpsc::channel(INBOX_BUFFER);
        let actor = Self {
            room_id,
            session,
            inbox,
            is_closed: false,
        };
        let handle = RoomHandle { sender, room_id };
        (actor, handle)
    }

    /// Run the actor event loop until the inbox closes or the room is torn
    /// down.
    pub async fn run(mut self) {
        log::info!("room {} actor starting", self.room_id);

        while let Some(message) = self.inbox.recv().await {
            self.handle_message(message).await;
            if self.is_closed {
                break;
            }
        }

        log::info!("room {} actor stopped", self.room_id);
    }

    async fn handle_message(&mut self, message: RoomMessage) {
        match message {
            RoomMessage::SetupGame { response } => {
                let result = self.session.setup_game(self.room_id).await;
                let _ = response.send(result);
            }

            RoomMessage::PerformAction {
                player_id,
                action,
                response,
            } => {
                let result = self
                    .session
                    .perform_action(self.room_id, player_id, action)
                    .await;
                if let Err(e) = &result {
                    log::debug!("room {}: action rejected: {e}", self.room_id);
                }
                let _ = response.send(result);
            }

            RoomMessage::Join {
                player_id,
                name,
                response,
            } => {
                let result = self.session.join_room(self.room_id, player_id, &name).await;
                let _ = response.send(result);
            }

            RoomMessage::Leave {
                player_id,
                response,
            } => {
                let result = self.session.leave_room(self.room_id, player_id).await;
                let _ = response.send(result);
            }

            RoomMessage::Chat {
                sender,
                content,
                response,
            } => {
                let result = self
                    .session
                    .send_message(self.room_id, &sender, &content)
                    .await;
                let _ = response.send(result);
            }

            RoomMessage::Teardown { response } => {
                let result = self.session.teardown(self.room_id).await;
                if result.is_ok() {
                    self.is_closed = true;
                }
                let _ = response.send(result);
            }
        }
    }
}
