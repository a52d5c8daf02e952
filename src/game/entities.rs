//! Shared data model for blackjack rooms.
//!
//! Cards keep the shape the external deck provider uses (code/value/suit
//! strings) because the provider, not this crate, is the authority on which
//! cards sit in which pile. Hands are the local index into those piles.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

pub type RoomId = Uuid;
pub type PlayerId = Uuid;
pub type HandId = Uuid;

/// Chip amount. Balances never go negative once a bet is confirmed.
pub type Chips = i64;

/// A playing card as the deck provider represents it, e.g.
/// `{ "code": "AS", "value": "ACE", "suit": "SPADES" }`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Card {
    pub code: String,
    pub value: String,
    pub suit: String,
}

impl Card {
    pub fn new(code: &str, value: &str, suit: &str) -> Self {
        Self {
            code: code.to_string(),
            value: value.to_string(),
            suit: suit.to_string(),
        }
    }

    /// Point contribution of this card, counting an ace as 11. The second
    /// element flags aces so the evaluator can demote them later.
    pub fn points(&self) -> (u32, bool) {
        match self.value.to_uppercase().as_str() {
            "ACE" => (11, true),
            "KING" | "QUEEN" | "JACK" => (10, false),
            v => (v.parse().unwrap_or(0), false),
        }
    }

    /// Whether two cards form a splittable pair. Rank equality is on the
    /// provider's value string, so a king and a queen are not a pair even
    /// though both score 10.
    pub fn same_rank(&self, other: &Card) -> bool {
        self.value.eq_ignore_ascii_case(&other.value)
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code)
    }
}

/// Role of a player within a room.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerRole {
    Host,
    Player,
}

/// Participation status. Sitting-out players are skipped when deciding
/// whether everyone has bet.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerStatus {
    Active,
    Inactive,
    SittingOut,
}

/// A player's membership in one room.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Player {
    pub id: PlayerId,
    pub room_id: RoomId,
    pub name: String,
    pub role: PlayerRole,
    pub status: PlayerStatus,
    pub balance: Chips,
    /// Ordinal seat used for turn order.
    pub seat: u32,
}

/// One bettable unit of cards. The cards themselves live in the external
/// deck provider under [`Hand::pile_name`]; this record is the index.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Hand {
    pub id: HandId,
    pub room_id: RoomId,
    pub player_id: PlayerId,
    /// Turn slot, assigned at deal time from seat order.
    pub order: u32,
    /// 0 for the original hand, incremented on each split of the slot.
    pub hand_number: u32,
    pub bet: Chips,
}

impl Hand {
    pub fn new(
        room_id: RoomId,
        player_id: PlayerId,
        order: u32,
        hand_number: u32,
        bet: Chips,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            room_id,
            player_id,
            order,
            hand_number,
            bet,
        }
    }

    /// Name of this hand's pile in the external deck.
    pub fn pile_name(&self) -> String {
        format!("hand{}", self.id.simple())
    }
}

/// Name of the dealer's pile for a room.
pub fn dealer_pile(room_id: RoomId) -> String {
    format!("dealer{}", room_id.simple())
}

/// Current phase of a round. Exactly one stage is active per room.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum Stage {
    /// Room exists but no round has started.
    Init,
    /// Collecting bets until the deadline or until everyone has bet.
    Betting {
        deadline: DateTime<Utc>,
        bets: BTreeMap<PlayerId, Chips>,
    },
    /// Transient: cards are being distributed.
    Dealing,
    /// Waiting on one `(player_index, hand_index)` to act.
    PlayerAction {
        deadline: DateTime<Utc>,
        player_index: u32,
        hand_index: u32,
    },
    /// Transient: dealer draw and settlement.
    FinishRound,
    /// Room has been shut down.
    Teardown,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Betting { .. } => "betting",
            Self::Dealing => "dealing",
            Self::PlayerAction { .. } => "player_action",
            Self::FinishRound => "finish_round",
            Self::Teardown => "teardown",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A player action, decoded once at the boundary from
/// `{ "action": "...", "data": { ... } }`.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "action", content = "data", rename_all = "snake_case")]
pub enum Action {
    Bet { amount: Chips },
    Hit,
    Stand,
    Double,
    Split { amount: Chips },
    Surrender,
    HurryUp,
}

impl Action {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bet { .. } => "bet",
            Self::Hit => "hit",
            Self::Stand => "stand",
            Self::Double => "double",
            Self::Split { .. } => "split",
            Self::Surrender => "surrender",
            Self::HurryUp => "hurry_up",
        }
    }

    pub fn amount(&self) -> Option<Chips> {
        match self {
            Self::Bet { amount } | Self::Split { amount } => Some(*amount),
            _ => None,
        }
    }

    /// Action legality is a pure function of the action kind and the
    /// current stage variant.
    pub fn is_legal_for(&self, stage: &Stage) -> bool {
        match self {
            Self::Bet { .. } => matches!(stage, Stage::Betting { .. }),
            Self::Hit | Self::Stand | Self::Double | Self::Split { .. } | Self::Surrender => {
                matches!(stage, Stage::PlayerAction { .. })
            }
            Self::HurryUp => {
                matches!(stage, Stage::Betting { .. } | Stage::PlayerAction { .. })
            }
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind())
    }
}

/// Per-room table configuration, passed into each operation rather than
/// stored on a long-lived service instance.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RoomConfig {
    /// Seconds players have to place bets each round.
    pub betting_secs: i64,
    /// Seconds each turn may take before `hurry_up` can force it.
    pub turn_secs: i64,
    pub starting_balance: Chips,
    pub min_players: u32,
    pub max_players: u32,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            betting_secs: 30,
            turn_secs: 30,
            starting_balance: 1000,
            min_players: 1,
            max_players: 6,
        }
    }
}

impl RoomConfig {
    pub fn betting_deadline(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::seconds(self.betting_secs)
    }

    pub fn turn_deadline(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::seconds(self.turn_secs)
    }
}

/// A room record. The stage carries the whole round state; `version` is the
/// optimistic-concurrency token checked on every stage write.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Room {
    pub id: RoomId,
    pub host_id: PlayerId,
    /// External deck identifier, set by `setup_game`.
    pub deck_id: Option<String>,
    pub stage: Stage,
    pub version: i64,
    pub config: RoomConfig,
}

impl Room {
    pub fn new(host_id: PlayerId, config: RoomConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            host_id,
            deck_id: None,
            stage: Stage::Init,
            version: 0,
            config,
        }
    }

    /// The external deck id, or an inconsistency if the room was never set up.
    pub fn deck_id(&self) -> Result<&str, crate::error::Error> {
        self.deck_id.as_deref().ok_or_else(|| {
            crate::error::Error::Inconsistency(format!("room {} has no deck", self.id))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_points() {
        assert_eq!(Card::new("AS", "ACE", "SPADES").points(), (11, true));
        assert_eq!(Card::new("KH", "KING", "HEARTS").points(), (10, false));
        assert_eq!(Card::new("0D", "10", "DIAMONDS").points(), (10, false));
        assert_eq!(Card::new("7C", "7", "CLUBS").points(), (7, false));
    }

    #[test]
    fn rank_equality_is_by_value_string() {
        let king = Card::new("KH", "KING", "HEARTS");
        let queen = Card::new("QH", "QUEEN", "HEARTS");
        let king2 = Card::new("KS", "KING", "SPADES");
        assert!(king.same_rank(&king2));
        assert!(!king.same_rank(&queen));
    }

    #[test]
    fn action_legality_table() {
        let betting = Stage::Betting {
            deadline: Utc::now(),
            bets: BTreeMap::new(),
        };
        let acting = Stage::PlayerAction {
            deadline: Utc::now(),
            player_index: 0,
            hand_index: 0,
        };

        assert!(Action::Bet { amount: 10 }.is_legal_for(&betting));
        assert!(!Action::Bet { amount: 10 }.is_legal_for(&acting));
        assert!(Action::Hit.is_legal_for(&acting));
        assert!(!Action::Hit.is_legal_for(&betting));
        assert!(Action::HurryUp.is_legal_for(&betting));
        assert!(Action::HurryUp.is_legal_for(&acting));
        assert!(!Action::Stand.is_legal_for(&Stage::Dealing));
        assert!(!Action::HurryUp.is_legal_for(&Stage::Init));
    }

    #[test]
    fn action_decodes_from_tagged_json() {
        let bet: Action =
            serde_json::from_str(r#"{"action":"bet","data":{"amount":100}}"#).unwrap();
        assert_eq!(bet, Action::Bet { amount: 100 });

        let hit: Action = serde_json::from_str(r#"{"action":"hit"}"#).unwrap();
        assert_eq!(hit, Action::Hit);

        let hurry: Action = serde_json::from_str(r#"{"action":"hurry_up"}"#).unwrap();
        assert_eq!(hurry, Action::HurryUp);
    }

    #[test]
    fn stage_round_trips_through_json() {
        let mut bets = BTreeMap::new();
        bets.insert(Uuid::new_v4(), 100);
        let stage = Stage::Betting {
            deadline: Utc::now(),
            bets,
        };
        let json = serde_json::to_string(&stage).unwrap();
        let back: Stage = serde_json::from_str(&json).unwrap();
        assert_eq!(stage, back);
    }
}
