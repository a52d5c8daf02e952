//! Per-room event fan-out.
//!
//! Broadcasts arrive from the room's actor already serialized with respect to
//! each other, so pushing them through per-subscriber FIFO channels preserves
//! commit order for every observer. Delivery uses `try_send`: a subscriber
//! that cannot keep up loses events, never the room.

use super::messages::{EventFrame, RoomEvent};
use crate::game::entities::RoomId;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

pub type SubscriberId = u64;

/// Events buffered per subscriber before the hub starts dropping for them.
const SUBSCRIBER_BUFFER: usize = 64;

/// One open subscriber connection. Dropping the receiver is how a client
/// disconnects; the hub notices on the next broadcast and removes it.
pub struct Subscription {
    pub id: SubscriberId,
    pub room_id: RoomId,
    pub receiver: mpsc::Receiver<EventFrame>,
}

/// Registry of open one-way subscriber connections, keyed by room.
#[derive(Default)]
pub struct EventHub {
    next_id: AtomicU64,
    rooms: Mutex<HashMap<RoomId, HashMap<SubscriberId, mpsc::Sender<EventFrame>>>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a subscriber connection to a room. The connection stays
    /// registered until [`unsubscribe`](Self::unsubscribe) or until the
    /// receiver is dropped.
    pub fn subscribe(&self, room_id: RoomId) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(SUBSCRIBER_BUFFER);
        let mut rooms = self.rooms.lock().unwrap();
        rooms.entry(room_id).or_default().insert(id, sender);
        log::debug!("subscriber {id} joined room {room_id}");
        Subscription {
            id,
            room_id,
            receiver,
        }
    }

    pub fn unsubscribe(&self, room_id: RoomId, id: SubscriberId) {
        let mut rooms = self.rooms.lock().unwrap();
        if let Some(subscribers) = rooms.get_mut(&room_id) {
            subscribers.remove(&id);
            if subscribers.is_empty() {
                rooms.remove(&room_id);
            }
        }
        log::debug!("subscriber {id} left room {room_id}");
    }

    /// Deliver an event to every subscriber of a room, in call order.
    pub fn broadcast(&self, room_id: RoomId, event: &RoomEvent) {
        let frame = event.frame();
        let mut rooms = self.rooms.lock().unwrap();
        let Some(subscribers) = rooms.get_mut(&room_id) else {
            return;
        };
        subscribers.retain(|id, sender| match sender.try_send(frame.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                log::warn!("subscriber {id} in room {room_id} is behind, dropping event");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                log::debug!("subscriber {id} in room {room_id} disconnected");
                false
            }
        });
        if subscribers.is_empty() {
            rooms.remove(&room_id);
        }
    }

    pub fn subscriber_count(&self, room_id: RoomId) -> usize {
        self.rooms
            .lock()
            .unwrap()
            .get(&room_id)
            .map_or(0, HashMap::len)
    }
}
