//! Room event fan-out: typed events, wire frames, and the broadcast hub.

pub mod hub;
pub mod messages;

pub use hub::{EventHub, Subscription};
pub use messages::{DealtCard, EventFrame, RoomEvent};
