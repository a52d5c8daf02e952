//! End-to-end round flow through the room manager, the actor, the session,
//! the scripted deck, and the in-memory store.

use blackjack_rooms::db::{HandStore, MemoryStore, PlayerStore, RoomStore};
use blackjack_rooms::deck::ScriptedDeck;
use blackjack_rooms::events::EventHub;
use blackjack_rooms::game::{Action, Card, Chips, PlayerId, RoomConfig, RoomId, Stage};
use blackjack_rooms::room::RoomManager;
use std::sync::Arc;
use uuid::Uuid;

struct Harness {
    manager: RoomManager,
    store: Arc<MemoryStore>,
    deck: Arc<ScriptedDeck>,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let deck = Arc::new(ScriptedDeck::new());
    let hub = Arc::new(EventHub::new());
    let manager = RoomManager::new(store.clone(), store.clone(), store.clone(), deck.clone(), hub);
    Harness {
        manager,
        store,
        deck,
    }
}

fn card(code: &str, value: &str) -> Card {
    Card::new(code, value, "SPADES")
}

async fn balance(store: &MemoryStore, room_id: RoomId, player_id: PlayerId) -> Chips {
    store
        .get_player(room_id, player_id)
        .await
        .unwrap()
        .unwrap()
        .balance
}

#[tokio::test]
async fn full_round_with_hit_double_and_surrender() {
    let h = harness();

    // Deal order is one card per hand then the dealer, twice over:
    //   p0: 5H 6S (11)   p1: 10D 6C (16)   p2: 4H 5S (9)   dealer: 10H 8D (18)
    // then p0 hits 8C for 19 and p1 doubles into 3H for 19.
    h.deck.load([
        card("5H", "5"),
        card("10D", "10"),
        card("4H", "4"),
        card("10H", "10"),
        card("6S", "6"),
        card("6C", "6"),
        card("5S", "5"),
        card("8D", "8"),
        card("8C", "8"),
        card("3H", "3"),
    ]);

    let config = RoomConfig {
        betting_secs: 3600,
        ..RoomConfig::default()
    };
    let players: Vec<PlayerId> = (0..3).map(|_| Uuid::new_v4()).collect();
    let room_id = h.manager.create_room(players[0], config).await.unwrap();

    let mut events = h.manager.subscribe(room_id);
    for (i, id) in players.iter().enumerate() {
        h.manager
            .join_room(room_id, *id, &format!("p{i}"))
            .await
            .unwrap();
    }
    h.manager.setup_game(room_id).await.unwrap();

    for id in &players {
        h.manager
            .perform_action(room_id, *id, Action::Bet { amount: 100 })
            .await
            .unwrap();
    }
    // Deadline is an hour out, but everyone has bet.
    h.manager
        .perform_action(room_id, players[0], Action::HurryUp)
        .await
        .unwrap();

    h.manager
        .perform_action(room_id, players[0], Action::Hit)
        .await
        .unwrap();
    h.manager
        .perform_action(room_id, players[0], Action::Stand)
        .await
        .unwrap();
    h.manager
        .perform_action(room_id, players[1], Action::Double)
        .await
        .unwrap();
    h.manager
        .perform_action(room_id, players[2], Action::Surrender)
        .await
        .unwrap();

    // p0: 19 beats the dealer's 18 at even money.
    assert_eq!(balance(&h.store, room_id, players[0]).await, 1100);
    // p1: doubled to 200, 19 beats 18, paid 400.
    assert_eq!(balance(&h.store, room_id, players[1]).await, 1200);
    // p2: surrendered, half the 100 bet back.
    assert_eq!(balance(&h.store, room_id, players[2]).await, 950);

    // The round is fully reset: no hands, fresh empty betting stage.
    assert!(h.store.list_hands(room_id).await.unwrap().is_empty());
    let room = h.store.get_room(room_id).await.unwrap();
    assert!(matches!(room.stage, Stage::Betting { ref bets, .. } if bets.is_empty()));

    let mut kinds = Vec::new();
    while let Ok(frame) = events.receiver.try_recv() {
        kinds.push(frame.kind);
    }
    assert_eq!(
        kinds,
        vec![
            // joins and setup
            "player-joined",
            "player-joined",
            "player-joined",
            "game-state-update",
            // three bets
            "player-action",
            "game-state-update",
            "player-action",
            "game-state-update",
            "player-action",
            "game-state-update",
            // hurry_up starts the deal
            "player-action",
            "game-state-update",
            "player-reveal",
            "player-reveal",
            "player-reveal",
            "dealer-reveal",
            "game-state-update",
            // p0 hits then stands
            "player-action",
            "player-reveal",
            "game-state-update",
            "player-action",
            "game-state-update",
            // p1 doubles
            "player-action",
            "player-reveal",
            "game-state-update",
            // p2 surrenders, which closes the round
            "player-action",
            "game-state-update",
            "dealer-reveal",
            "player-reveal",
            "player-reveal",
            "game-state-update",
        ]
    );
}

#[tokio::test]
async fn split_pair_plays_and_settles_both_hands() {
    let h = harness();

    // p0 is dealt a pair of eights against a dealer 17. The split moves the
    // second eight into the sibling pile and deals one fresh card to each:
    // original 8H 2H (10), sibling 8S 3C (11). The original then hits to 20,
    // the sibling to 21.
    h.deck.load([
        card("8H", "8"),
        card("10H", "10"),
        card("8S", "8"),
        card("7S", "7"),
        card("2H", "2"),
        card("3C", "3"),
        card("KD", "KING"),
        card("10C", "10"),
    ]);

    let config = RoomConfig {
        betting_secs: -1,
        ..RoomConfig::default()
    };
    let host = Uuid::new_v4();
    let room_id = h.manager.create_room(host, config).await.unwrap();
    h.manager.join_room(room_id, host, "solo").await.unwrap();
    h.manager.setup_game(room_id).await.unwrap();

    h.manager
        .perform_action(room_id, host, Action::Bet { amount: 100 })
        .await
        .unwrap();
    h.manager
        .perform_action(room_id, host, Action::Split { amount: 100 })
        .await
        .unwrap();

    // Two hands in the slot, and the turn stays on the original.
    let slots: Vec<(u32, u32)> = h
        .store
        .list_hands(room_id)
        .await
        .unwrap()
        .iter()
        .map(|hand| (hand.order, hand.hand_number))
        .collect();
    assert_eq!(slots, vec![(0, 0), (0, 1)]);
    let room = h.store.get_room(room_id).await.unwrap();
    assert!(matches!(
        room.stage,
        Stage::PlayerAction {
            player_index: 0,
            hand_index: 0,
            ..
        }
    ));

    h.manager
        .perform_action(room_id, host, Action::Hit)
        .await
        .unwrap();
    h.manager
        .perform_action(room_id, host, Action::Stand)
        .await
        .unwrap();

    // Standing on the original moves play to the sibling hand.
    let room = h.store.get_room(room_id).await.unwrap();
    assert!(matches!(
        room.stage,
        Stage::PlayerAction {
            player_index: 0,
            hand_index: 1,
            ..
        }
    ));

    h.manager
        .perform_action(room_id, host, Action::Hit)
        .await
        .unwrap();
    h.manager
        .perform_action(room_id, host, Action::Stand)
        .await
        .unwrap();

    // 20 and 21 both beat the dealer's 17 at even money: two bets of 100
    // deducted, two payouts of 200 credited.
    assert_eq!(balance(&h.store, room_id, host).await, 1200);
    assert!(h.store.list_hands(room_id).await.unwrap().is_empty());
    let room = h.store.get_room(room_id).await.unwrap();
    assert!(matches!(room.stage, Stage::Betting { ref bets, .. } if bets.is_empty()));
}

#[tokio::test]
async fn dealer_bust_pays_every_standing_hand() {
    let h = harness();

    // Single player stands on 19; the dealer's 16 forces a draw that busts.
    h.deck.load([
        card("10H", "10"),
        card("10D", "10"),
        card("9S", "9"),
        card("6C", "6"),
        card("10S", "10"),
    ]);

    let config = RoomConfig {
        betting_secs: -1,
        ..RoomConfig::default()
    };
    let host = Uuid::new_v4();
    let room_id = h.manager.create_room(host, config).await.unwrap();
    h.manager.join_room(room_id, host, "solo").await.unwrap();
    h.manager.setup_game(room_id).await.unwrap();

    // The betting deadline is already past, so the bet deals immediately.
    h.manager
        .perform_action(room_id, host, Action::Bet { amount: 100 })
        .await
        .unwrap();
    h.manager
        .perform_action(room_id, host, Action::Stand)
        .await
        .unwrap();

    assert_eq!(balance(&h.store, room_id, host).await, 1100);
}

#[tokio::test]
async fn stalled_turn_is_forced_by_hurry_up() {
    let h = harness();
    h.deck.load([
        card("10H", "10"),
        card("5D", "5"),
        card("9S", "9"),
        card("2C", "2"),
        card("7H", "7"),
        card("KC", "KING"),
    ]);

    // Betting starts the round immediately and every turn deadline is
    // already expired.
    let config = RoomConfig {
        betting_secs: -1,
        turn_secs: -1,
        ..RoomConfig::default()
    };
    let players: Vec<PlayerId> = (0..2).map(|_| Uuid::new_v4()).collect();
    let room_id = h.manager.create_room(players[0], config).await.unwrap();
    for (i, id) in players.iter().enumerate() {
        h.manager
            .join_room(room_id, *id, &format!("p{i}"))
            .await
            .unwrap();
    }
    h.manager.setup_game(room_id).await.unwrap();

    h.manager
        .perform_action(room_id, players[0], Action::Bet { amount: 100 })
        .await
        .unwrap();
    // Only p0 bet before the deadline, so the round has one hand. p1 forces
    // the stalled turn; p0 is treated as standing on 19 while the dealer
    // draws from 7 to 14 to a bust on the king.
    h.manager
        .perform_action(room_id, players[1], Action::HurryUp)
        .await
        .unwrap();

    assert_eq!(balance(&h.store, room_id, players[0]).await, 1100);
    let room = h.store.get_room(room_id).await.unwrap();
    assert!(matches!(room.stage, Stage::Betting { .. }));
}
