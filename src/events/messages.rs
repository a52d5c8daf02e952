//! Domain events broadcast to room subscribers.

use crate::game::entities::{Card, Chips, PlayerId, Stage};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A dealt card as spectators see it. The dealer's hole card stays face down
/// until the reveal at settlement.
#[derive(Clone, Debug, Serialize)]
pub struct DealtCard {
    pub code: String,
    pub value: String,
    pub suit: String,
    pub face_down: bool,
}

impl DealtCard {
    pub fn face_up(card: &Card) -> Self {
        Self {
            code: card.code.clone(),
            value: card.value.clone(),
            suit: card.suit.clone(),
            face_down: false,
        }
    }

    /// Redacted card; spectators learn only that a card exists.
    pub fn face_down() -> Self {
        Self {
            code: "XX".to_string(),
            value: String::new(),
            suit: String::new(),
            face_down: true,
        }
    }
}

/// Everything a room broadcasts. Serialized untagged: the frame carries the
/// kind, the payload is just the variant's fields.
#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum RoomEvent {
    Message {
        sender: String,
        content: String,
        timestamp: DateTime<Utc>,
    },
    GameStateUpdate {
        stage: Stage,
        version: i64,
    },
    PlayerAction {
        player_id: PlayerId,
        action: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        amount: Option<Chips>,
    },
    PlayerJoined {
        player_id: PlayerId,
        name: String,
    },
    PlayerLeft {
        player_id: PlayerId,
        name: String,
    },
    DealerReveal {
        cards: Vec<DealtCard>,
        score: u32,
    },
    PlayerReveal {
        player_id: PlayerId,
        cards: Vec<Card>,
        score: u32,
    },
}

impl RoomEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Message { .. } => "message",
            Self::GameStateUpdate { .. } => "game-state-update",
            Self::PlayerAction { .. } => "player-action",
            Self::PlayerJoined { .. } => "player-joined",
            Self::PlayerLeft { .. } => "player-left",
            Self::DealerReveal { .. } => "dealer-reveal",
            Self::PlayerReveal { .. } => "player-reveal",
        }
    }

    pub fn frame(&self) -> EventFrame {
        let data = serde_json::to_value(self).unwrap_or_else(|e| {
            log::error!("failed to serialize {} event: {e}", self.kind());
            serde_json::Value::Null
        });
        EventFrame {
            kind: self.kind(),
            data,
        }
    }
}

/// A serialized event as delivered to subscribers: a named type plus a JSON
/// payload.
#[derive(Clone, Debug, Serialize)]
pub struct EventFrame {
    #[serde(rename = "event")]
    pub kind: &'static str,
    pub data: serde_json::Value,
}

impl EventFrame {
    /// Render as one server-sent-events block.
    pub fn to_sse(&self) -> String {
        format!("event: {}\ndata: {}\n\n", self.kind, self.data)
    }
}
