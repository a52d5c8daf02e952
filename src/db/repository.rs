//! Store trait definitions and the Postgres implementation.
//!
//! Traits keep the state machine testable against an in-memory double; the
//! `PgStore` is the production implementation.

use super::{StoreError, StoreResult};
use crate::game::entities::{
    Chips, Hand, HandId, Player, PlayerId, PlayerRole, PlayerStatus, Room, RoomConfig, RoomId,
    Stage,
};
use async_trait::async_trait;
use sqlx::{PgPool, Row};

/// Room records and their stage, guarded by the version token.
#[async_trait]
pub trait RoomStore: Send + Sync {
    async fn create_room(&self, room: &Room) -> StoreResult<()>;

    async fn get_room(&self, room_id: RoomId) -> StoreResult<Room>;

    async fn set_deck(&self, room_id: RoomId, deck_id: &str) -> StoreResult<()>;

    /// Write the stage if `expected_version` still matches, returning the
    /// new version. A stale expectation fails with [`StoreError::Conflict`].
    async fn update_stage(
        &self,
        room_id: RoomId,
        stage: &Stage,
        expected_version: i64,
    ) -> StoreResult<i64>;
}

/// Per-room player memberships.
#[async_trait]
pub trait PlayerStore: Send + Sync {
    async fn add_player(&self, player: &Player) -> StoreResult<()>;

    async fn remove_player(&self, room_id: RoomId, player_id: PlayerId) -> StoreResult<()>;

    async fn get_player(&self, room_id: RoomId, player_id: PlayerId)
    -> StoreResult<Option<Player>>;

    /// All players in the room, in seat order.
    async fn list_players(&self, room_id: RoomId) -> StoreResult<Vec<Player>>;

    async fn set_status(
        &self,
        room_id: RoomId,
        player_id: PlayerId,
        status: PlayerStatus,
    ) -> StoreResult<()>;

    /// Atomically apply `delta` to the balance, returning the new balance.
    /// The write is guarded so the balance can never go negative.
    async fn adjust_balance(
        &self,
        room_id: RoomId,
        player_id: PlayerId,
        delta: Chips,
    ) -> StoreResult<Chips>;
}

/// Hand records: the local index into the external deck's piles.
#[async_trait]
pub trait HandStore: Send + Sync {
    async fn create_hand(&self, hand: &Hand) -> StoreResult<()>;

    async fn update_bet(&self, hand_id: HandId, bet: Chips) -> StoreResult<()>;

    /// All hands in the room, ordered by `(order, hand_number)`.
    async fn list_hands(&self, room_id: RoomId) -> StoreResult<Vec<Hand>>;

    async fn hands_for_player(
        &self,
        room_id: RoomId,
        player_id: PlayerId,
    ) -> StoreResult<Vec<Hand>>;

    async fn delete_hand(&self, hand_id: HandId) -> StoreResult<()>;

    /// Remove every hand in the room at settlement.
    async fn delete_hands(&self, room_id: RoomId) -> StoreResult<()>;
}

fn role_to_str(role: PlayerRole) -> &'static str {
    match role {
        PlayerRole::Host => "host",
        PlayerRole::Player => "player",
    }
}

fn role_from_str(s: &str) -> StoreResult<PlayerRole> {
    match s {
        "host" => Ok(PlayerRole::Host),
        "player" => Ok(PlayerRole::Player),
        other => Err(StoreError::Corrupt(format!("unknown role {other:?}"))),
    }
}

fn status_to_str(status: PlayerStatus) -> &'static str {
    match status {
        PlayerStatus::Active => "active",
        PlayerStatus::Inactive => "inactive",
        PlayerStatus::SittingOut => "sitting_out",
    }
}

fn status_from_str(s: &str) -> StoreResult<PlayerStatus> {
    match s {
        "active" => Ok(PlayerStatus::Active),
        "inactive" => Ok(PlayerStatus::Inactive),
        "sitting_out" => Ok(PlayerStatus::SittingOut),
        other => Err(StoreError::Corrupt(format!("unknown status {other:?}"))),
    }
}

/// Postgres-backed implementation of all three stores. Stage and config are
/// stored as JSON text; the stage column is versioned.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_player(row: &sqlx::postgres::PgRow) -> StoreResult<Player> {
        Ok(Player {
            id: row.get("user_id"),
            room_id: row.get("room_id"),
            name: row.get("name"),
            role: role_from_str(row.get("role"))?,
            status: status_from_str(row.get("status"))?,
            balance: row.get("balance"),
            seat: row.get::<i32, _>("seat") as u32,
        })
    }

    fn row_to_hand(row: &sqlx::postgres::PgRow) -> Hand {
        Hand {
            id: row.get("id"),
            room_id: row.get("room_id"),
            player_id: row.get("player_id"),
            order: row.get::<i32, _>("turn_order") as u32,
            hand_number: row.get::<i32, _>("hand_number") as u32,
            bet: row.get("bet"),
        }
    }
}

#[async_trait]
impl RoomStore for PgStore {
    async fn create_room(&self, room: &Room) -> StoreResult<()> {
        let stage = serde_json::to_string(&room.stage)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let config = serde_json::to_string(&room.config)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        sqlx::query(
            "INSERT INTO rooms (id, host_id, deck_id, stage, version, config)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(room.id)
        .bind(room.host_id)
        .bind(&room.deck_id)
        .bind(stage)
        .bind(room.version)
        .bind(config)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_room(&self, room_id: RoomId) -> StoreResult<Room> {
        let row = sqlx::query("SELECT id, host_id, deck_id, stage, version, config FROM rooms WHERE id = $1")
            .bind(room_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found("room", room_id))?;

        let stage: Stage = serde_json::from_str(row.get("stage"))
            .map_err(|e| StoreError::Corrupt(format!("room {room_id} stage: {e}")))?;
        let config: RoomConfig = serde_json::from_str(row.get("config"))
            .map_err(|e| StoreError::Corrupt(format!("room {room_id} config: {e}")))?;

        Ok(Room {
            id: row.get("id"),
            host_id: row.get("host_id"),
            deck_id: row.get("deck_id"),
            stage,
            version: row.get("version"),
            config,
        })
    }

    async fn set_deck(&self, room_id: RoomId, deck_id: &str) -> StoreResult<()> {
        let result = sqlx::query("UPDATE rooms SET deck_id = $2 WHERE id = $1")
            .bind(room_id)
            .bind(deck_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("room", room_id));
        }
        Ok(())
    }

    async fn update_stage(
        &self,
        room_id: RoomId,
        stage: &Stage,
        expected_version: i64,
    ) -> StoreResult<i64> {
        let stage_json =
            serde_json::to_string(stage).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let row = sqlx::query(
            "UPDATE rooms SET stage = $2, version = version + 1
             WHERE id = $1 AND version = $3
             RETURNING version",
        )
        .bind(room_id)
        .bind(stage_json)
        .bind(expected_version)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(row.get("version")),
            None => {
                let exists = sqlx::query("SELECT 1 FROM rooms WHERE id = $1")
                    .bind(room_id)
                    .fetch_optional(&self.pool)
                    .await?
                    .is_some();
                if exists {
                    Err(StoreError::Conflict)
                } else {
                    Err(StoreError::not_found("room", room_id))
                }
            }
        }
    }
}

#[async_trait]
impl PlayerStore for PgStore {
    async fn add_player(&self, player: &Player) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO room_players (room_id, user_id, name, role, status, balance, seat)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(player.room_id)
        .bind(player.id)
        .bind(&player.name)
        .bind(role_to_str(player.role))
        .bind(status_to_str(player.status))
        .bind(player.balance)
        .bind(player.seat as i32)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove_player(&self, room_id: RoomId, player_id: PlayerId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM room_players WHERE room_id = $1 AND user_id = $2")
            .bind(room_id)
            .bind(player_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("player", player_id));
        }
        Ok(())
    }

    async fn get_player(
        &self,
        room_id: RoomId,
        player_id: PlayerId,
    ) -> StoreResult<Option<Player>> {
        let row = sqlx::query(
            "SELECT room_id, user_id, name, role, status, balance, seat
             FROM room_players WHERE room_id = $1 AND user_id = $2",
        )
        .bind(room_id)
        .bind(player_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::row_to_player).transpose()
    }

    async fn list_players(&self, room_id: RoomId) -> StoreResult<Vec<Player>> {
        let rows = sqlx::query(
            "SELECT room_id, user_id, name, role, status, balance, seat
             FROM room_players WHERE room_id = $1 ORDER BY seat ASC",
        )
        .bind(room_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_player).collect()
    }

    async fn set_status(
        &self,
        room_id: RoomId,
        player_id: PlayerId,
        status: PlayerStatus,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE room_players SET status = $3 WHERE room_id = $1 AND user_id = $2",
        )
        .bind(room_id)
        .bind(player_id)
        .bind(status_to_str(status))
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("player", player_id));
        }
        Ok(())
    }

    async fn adjust_balance(
        &self,
        room_id: RoomId,
        player_id: PlayerId,
        delta: Chips,
    ) -> StoreResult<Chips> {
        let row = sqlx::query(
            "UPDATE room_players SET balance = balance + $3
             WHERE room_id = $1 AND user_id = $2 AND balance + $3 >= 0
             RETURNING balance",
        )
        .bind(room_id)
        .bind(player_id)
        .bind(delta)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(row.get("balance")),
            None => {
                let exists =
                    sqlx::query("SELECT 1 FROM room_players WHERE room_id = $1 AND user_id = $2")
                        .bind(room_id)
                        .bind(player_id)
                        .fetch_optional(&self.pool)
                        .await?
                        .is_some();
                if exists {
                    Err(StoreError::BalanceBelowZero)
                } else {
                    Err(StoreError::not_found("player", player_id))
                }
            }
        }
    }
}

#[async_trait]
impl HandStore for PgStore {
    async fn create_hand(&self, hand: &Hand) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO hands (id, room_id, player_id, turn_order, hand_number, bet)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(hand.id)
        .bind(hand.room_id)
        .bind(hand.player_id)
        .bind(hand.order as i32)
        .bind(hand.hand_number as i32)
        .bind(hand.bet)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_bet(&self, hand_id: HandId, bet: Chips) -> StoreResult<()> {
        let result = sqlx::query("UPDATE hands SET bet = $2 WHERE id = $1")
            .bind(hand_id)
            .bind(bet)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("hand", hand_id));
        }
        Ok(())
    }

    async fn list_hands(&self, room_id: RoomId) -> StoreResult<Vec<Hand>> {
        let rows = sqlx::query(
            "SELECT id, room_id, player_id, turn_order, hand_number, bet
             FROM hands WHERE room_id = $1 ORDER BY turn_order ASC, hand_number ASC",
        )
        .bind(room_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(Self::row_to_hand).collect())
    }

    async fn hands_for_player(
        &self,
        room_id: RoomId,
        player_id: PlayerId,
    ) -> StoreResult<Vec<Hand>> {
        let rows = sqlx::query(
            "SELECT id, room_id, player_id, turn_order, hand_number, bet
             FROM hands WHERE room_id = $1 AND player_id = $2
             ORDER BY turn_order ASC, hand_number ASC",
        )
        .bind(room_id)
        .bind(player_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(Self::row_to_hand).collect())
    }

    async fn delete_hand(&self, hand_id: HandId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM hands WHERE id = $1")
            .bind(hand_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("hand", hand_id));
        }
        Ok(())
    }

    async fn delete_hands(&self, room_id: RoomId) -> StoreResult<()> {
        sqlx::query("DELETE FROM hands WHERE room_id = $1")
            .bind(room_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
