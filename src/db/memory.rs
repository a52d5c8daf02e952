//! In-memory store with the same version/conflict semantics as Postgres.
//!
//! Used by the test suites; also enough to run a room without a database.

use super::{StoreError, StoreResult};
use super::repository::{HandStore, PlayerStore, RoomStore};
use crate::game::entities::{Chips, Hand, HandId, Player, PlayerId, Room, RoomId, Stage};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Default)]
struct MemoryState {
    rooms: HashMap<RoomId, Room>,
    players: HashMap<RoomId, Vec<Player>>,
    hands: HashMap<RoomId, Vec<Hand>>,
}

/// In-memory implementation of all three store traits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoomStore for MemoryStore {
    async fn create_room(&self, room: &Room) -> StoreResult<()> {
        let mut state = self.state.lock().unwrap();
        state.rooms.insert(room.id, room.clone());
        Ok(())
    }

    async fn get_room(&self, room_id: RoomId) -> StoreResult<Room> {
        let state = self.state.lock().unwrap();
        state
            .rooms
            .get(&room_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("room", room_id))
    }

    async fn set_deck(&self, room_id: RoomId, deck_id: &str) -> StoreResult<()> {
        let mut state = self.state.lock().unwrap();
        let room = state
            .rooms
            .get_mut(&room_id)
            .ok_or_else(|| StoreError::not_found("room", room_id))?;
        room.deck_id = Some(deck_id.to_string());
        Ok(())
    }

    async fn update_stage(
        &self,
        room_id: RoomId,
        stage: &Stage,
        expected_version: i64,
    ) -> StoreResult<i64> {
        let mut state = self.state.lock().unwrap();
        let room = state
            .rooms
            .get_mut(&room_id)
            .ok_or_else(|| StoreError::not_found("room", room_id))?;
        if room.version != expected_version {
            return Err(StoreError::Conflict);
        }
        room.stage = stage.clone();
        room.version += 1;
        Ok(room.version)
    }
}

#[async_trait]
impl PlayerStore for MemoryStore {
    async fn add_player(&self, player: &Player) -> StoreResult<()> {
        let mut state = self.state.lock().unwrap();
        let players = state.players.entry(player.room_id).or_default();
        players.push(player.clone());
        players.sort_by_key(|p| p.seat);
        Ok(())
    }

    async fn remove_player(&self, room_id: RoomId, player_id: PlayerId) -> StoreResult<()> {
        let mut state = self.state.lock().unwrap();
        let players = state
            .players
            .get_mut(&room_id)
            .ok_or_else(|| StoreError::not_found("player", player_id))?;
        let before = players.len();
        players.retain(|p| p.id != player_id);
        if players.len() == before {
            return Err(StoreError::not_found("player", player_id));
        }
        Ok(())
    }

    async fn get_player(
        &self,
        room_id: RoomId,
        player_id: PlayerId,
    ) -> StoreResult<Option<Player>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .players
            .get(&room_id)
            .and_then(|ps| ps.iter().find(|p| p.id == player_id))
            .cloned())
    }

    async fn list_players(&self, room_id: RoomId) -> StoreResult<Vec<Player>> {
        let state = self.state.lock().unwrap();
        Ok(state.players.get(&room_id).cloned().unwrap_or_default())
    }

    async fn set_status(
        &self,
        room_id: RoomId,
        player_id: PlayerId,
        status: crate::game::entities::PlayerStatus,
    ) -> StoreResult<()> {
        let mut state = self.state.lock().unwrap();
        let player = state
            .players
            .get_mut(&room_id)
            .and_then(|ps| ps.iter_mut().find(|p| p.id == player_id))
            .ok_or_else(|| StoreError::not_found("player", player_id))?;
        player.status = status;
        Ok(())
    }

    async fn adjust_balance(
        &self,
        room_id: RoomId,
        player_id: PlayerId,
        delta: Chips,
    ) -> StoreResult<Chips> {
        let mut state = self.state.lock().unwrap();
        let player = state
            .players
            .get_mut(&room_id)
            .and_then(|ps| ps.iter_mut().find(|p| p.id == player_id))
            .ok_or_else(|| StoreError::not_found("player", player_id))?;
        let next = player.balance + delta;
        if next < 0 {
            return Err(StoreError::BalanceBelowZero);
        }
        player.balance = next;
        Ok(next)
    }
}

#[async_trait]
impl HandStore for MemoryStore {
    async fn create_hand(&self, hand: &Hand) -> StoreResult<()> {
        let mut state = self.state.lock().unwrap();
        let hands = state.hands.entry(hand.room_id).or_default();
        hands.push(hand.clone());
        hands.sort_by_key(|h| (h.order, h.hand_number));
        Ok(())
    }

    async fn update_bet(&self, hand_id: HandId, bet: Chips) -> StoreResult<()> {
        let mut state = self.state.lock().unwrap();
        let hand = state
            .hands
            .values_mut()
            .flatten()
            .find(|h| h.id == hand_id)
            .ok_or_else(|| StoreError::not_found("hand", hand_id))?;
        hand.bet = bet;
        Ok(())
    }

    async fn list_hands(&self, room_id: RoomId) -> StoreResult<Vec<Hand>> {
        let state = self.state.lock().unwrap();
        Ok(state.hands.get(&room_id).cloned().unwrap_or_default())
    }

    async fn hands_for_player(
        &self,
        room_id: RoomId,
        player_id: PlayerId,
    ) -> StoreResult<Vec<Hand>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .hands
            .get(&room_id)
            .map(|hs| {
                hs.iter()
                    .filter(|h| h.player_id == player_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn delete_hand(&self, hand_id: HandId) -> StoreResult<()> {
        let mut state = self.state.lock().unwrap();
        for hands in state.hands.values_mut() {
            let before = hands.len();
            hands.retain(|h| h.id != hand_id);
            if hands.len() != before {
                return Ok(());
            }
        }
        Err(StoreError::not_found("hand", hand_id))
    }

    async fn delete_hands(&self, room_id: RoomId) -> StoreResult<()> {
        let mut state = self.state.lock().unwrap();
        state.hands.remove(&room_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::{PlayerRole, PlayerStatus, RoomConfig};
    use uuid::Uuid;

    fn player(room_id: RoomId, seat: u32, balance: Chips) -> Player {
        Player {
            id: Uuid::new_v4(),
            room_id,
            name: format!("p{seat}"),
            role: PlayerRole::Player,
            status: PlayerStatus::Active,
            balance,
            seat,
        }
    }

    #[tokio::test]
    async fn stage_write_with_stale_version_conflicts() {
        let store = MemoryStore::new();
        let room = Room::new(Uuid::new_v4(), RoomConfig::default());
        store.create_room(&room).await.unwrap();

        let v1 = store
            .update_stage(room.id, &Stage::Dealing, room.version)
            .await
            .unwrap();
        assert_eq!(v1, room.version + 1);

        // Replaying the same write against the old version must fail.
        assert!(matches!(
            store.update_stage(room.id, &Stage::Dealing, room.version).await,
            Err(StoreError::Conflict)
        ));
    }

    #[tokio::test]
    async fn balance_cannot_go_negative() {
        let store = MemoryStore::new();
        let room_id = Uuid::new_v4();
        let p = player(room_id, 0, 100);
        store.add_player(&p).await.unwrap();

        assert!(matches!(
            store.adjust_balance(room_id, p.id, -150).await,
            Err(StoreError::BalanceBelowZero)
        ));
        assert_eq!(store.adjust_balance(room_id, p.id, -100).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn players_listed_in_seat_order() {
        let store = MemoryStore::new();
        let room_id = Uuid::new_v4();
        store.add_player(&player(room_id, 2, 100)).await.unwrap();
        store.add_player(&player(room_id, 0, 100)).await.unwrap();
        store.add_player(&player(room_id, 1, 100)).await.unwrap();

        let seats: Vec<u32> = store
            .list_players(room_id)
            .await
            .unwrap()
            .iter()
            .map(|p| p.seat)
            .collect();
        assert_eq!(seats, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn hands_listed_in_turn_order() {
        let store = MemoryStore::new();
        let room_id = Uuid::new_v4();
        let p = Uuid::new_v4();
        store.create_hand(&Hand::new(room_id, p, 1, 0, 50)).await.unwrap();
        store.create_hand(&Hand::new(room_id, p, 0, 1, 50)).await.unwrap();
        store.create_hand(&Hand::new(room_id, p, 0, 0, 50)).await.unwrap();

        let order: Vec<(u32, u32)> = store
            .list_hands(room_id)
            .await
            .unwrap()
            .iter()
            .map(|h| (h.order, h.hand_number))
            .collect();
        assert_eq!(order, vec![(0, 0), (0, 1), (1, 0)]);
    }
}
