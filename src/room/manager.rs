//! Room manager for spawning and addressing room actors.

use super::actor::{RoomActor, RoomHandle};
use super::messages::RoomMessage;
use crate::db::{HandStore, PlayerStore, RoomStore};
use crate::deck::DeckProvider;
use crate::error::{Error, Result};
use crate::events::hub::{EventHub, Subscription};
use crate::game::entities::{Action, PlayerId, Room, RoomConfig, RoomId};
use crate::game::session::GameSession;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, oneshot};

/// Spawns one actor per room and routes requests to it.
pub struct RoomManager {
    rooms: Arc<dyn RoomStore>,
    session: Arc<GameSession>,
    hub: Arc<EventHub>,
    actors: RwLock<HashMap<RoomId, RoomHandle>>,
}

impl RoomManager {
    pub fn new(
        rooms: Arc<dyn RoomStore>,
        players: Arc<dyn PlayerStore>,
        hands: Arc<dyn HandStore>,
        deck: Arc<dyn DeckProvider>,
        hub: Arc<EventHub>,
    ) -> Self {
        let session = Arc::new(GameSession::new(
            rooms.clone(),
            players,
            hands,
            deck,
            hub.clone(),
        ));
        Self {
            rooms,
            session,
            hub,
            actors: RwLock::new(HashMap::new()),
        }
    }

    /// Create and persist a room, then spawn its actor.
    pub async fn create_room(&self, host_id: PlayerId, config: RoomConfig) -> Result<RoomId> {
        let room = Room::new(host_id, config);
        self.rooms.create_room(&room).await?;
        let handle = self.spawn(room.id).await;
        log::info!("room {} created by {host_id}", room.id);
        Ok(handle.room_id())
    }

    pub async fn setup_game(&self, room_id: RoomId) -> Result<()> {
        let (response, rx) = oneshot::channel();
        self.handle(room_id)
            .await?
            .send(RoomMessage::SetupGame { response })
            .await?;
        Self::settle(room_id, rx).await
    }

    pub async fn perform_action(
        &self,
        room_id: RoomId,
        player_id: PlayerId,
        action: Action,
    ) -> Result<()> {
        let (response, rx) = oneshot::channel();
        self.handle(room_id)
            .await?
            .send(RoomMessage::PerformAction {
                player_id,
                action,
                response,
            })
            .await?;
        Self::settle(room_id, rx).await
    }

    pub async fn join_room(&self, room_id: RoomId, player_id: PlayerId, name: &str) -> Result<()> {
        let (response, rx) = oneshot::channel();
        self.handle(room_id)
            .await?
            .send(RoomMessage::Join {
                player_id,
                name: name.to_string(),
                response,
            })
            .await?;
        Self::settle(room_id, rx).await
    }

    pub async fn leave_room(&self, room_id: RoomId, player_id: PlayerId) -> Result<()> {
        let (response, rx) = oneshot::channel();
        self.handle(room_id)
            .await?
            .send(RoomMessage::Leave {
                player_id,
                response,
            })
            .await?;
        Self::settle(room_id, rx).await
    }

    pub async fn send_message(&self, room_id: RoomId, sender: &str, content: &str) -> Result<()> {
        let (response, rx) = oneshot::channel();
        self.handle(room_id)
            .await?
            .send(RoomMessage::Chat {
                sender: sender.to_string(),
                content: content.to_string(),
                response,
            })
            .await?;
        Self::settle(room_id, rx).await
    }

    /// Tear the room down and drop its actor handle.
    pub async fn close_room(&self, room_id: RoomId) -> Result<()> {
        let (response, rx) = oneshot::channel();
        self.handle(room_id)
            .await?
            .send(RoomMessage::Teardown { response })
            .await?;
        let result = Self::settle(room_id, rx).await;
        if result.is_ok() {
            self.actors.write().await.remove(&room_id);
        }
        result
    }

    /// Subscribe to the room's event stream.
    pub fn subscribe(&self, room_id: RoomId) -> Subscription {
        self.hub.subscribe(room_id)
    }

    pub fn hub(&self) -> &Arc<EventHub> {
        &self.hub
    }

    /// Resolve the actor handle for a room, spawning one if the room exists
    /// in the store but has no running actor (e.g. after a restart).
    async fn handle(&self, room_id: RoomId) -> Result<RoomHandle> {
        if let Some(handle) = self.actors.read().await.get(&room_id) {
            return Ok(handle.clone());
        }
        self.rooms.get_room(room_id).await?;
        Ok(self.spawn(room_id).await)
    }

    async fn spawn(&self, room_id: RoomId) -> RoomHandle {
        let mut actors = self.actors.write().await;
        if let Some(handle) = actors.get(&room_id) {
            return handle.clone();
        }
        let (actor, handle) = RoomActor::new(room_id, self.session.clone());
        tokio::spawn(actor.run());
        actors.insert(room_id, handle.clone());
        handle
    }

    async fn settle(room_id: RoomId, rx: oneshot::Receiver<Result<()>>) -> Result<()> {
        rx.await
            .map_err(|_| Error::Inconsistency(format!("room {room_id} dropped the request")))?
    }
}
