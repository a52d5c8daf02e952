//! Room actors and the manager that spawns and addresses them.

pub mod actor;
pub mod manager;
pub mod messages;

pub use actor::{RoomActor, RoomHandle};
pub use manager::RoomManager;
pub use messages::RoomMessage;
