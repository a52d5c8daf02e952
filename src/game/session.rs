//! The per-room game state machine.
//!
//! `GameSession` validates an action against the current stage, mutates
//! state, persists it, and broadcasts events describing every change. It is
//! designed to run behind a room actor, so calls for one room never overlap;
//! the versioned stage write is the backstop if that discipline is ever
//! bypassed.

use super::entities::{
    Action, Card, Chips, Hand, Player, PlayerId, PlayerRole, PlayerStatus, Room, RoomId, Stage,
    dealer_pile,
};
use super::{score, turns};
use crate::db::{HandStore, PlayerStore, RoomStore};
use crate::deck::DeckProvider;
use crate::error::{Error, Result};
use crate::events::hub::EventHub;
use crate::events::messages::{DealtCard, RoomEvent};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;

pub struct GameSession {
    rooms: Arc<dyn RoomStore>,
    players: Arc<dyn PlayerStore>,
    hands: Arc<dyn HandStore>,
    deck: Arc<dyn DeckProvider>,
    hub: Arc<EventHub>,
}

impl GameSession {
    pub fn new(
        rooms: Arc<dyn RoomStore>,
        players: Arc<dyn PlayerStore>,
        hands: Arc<dyn HandStore>,
        deck: Arc<dyn DeckProvider>,
        hub: Arc<EventHub>,
    ) -> Self {
        Self {
            rooms,
            players,
            hands,
            deck,
            hub,
        }
    }

    /// Create the external deck and open the first betting stage.
    pub async fn setup_game(&self, room_id: RoomId) -> Result<()> {
        let room = self.rooms.get_room(room_id).await?;
        if room.stage != Stage::Init {
            return Err(Error::invalid(format!(
                "game already set up (stage is {})",
                room.stage
            )));
        }

        let deck_id = self.deck.create_deck().await?;
        self.rooms.set_deck(room_id, &deck_id).await?;

        let stage = Stage::Betting {
            deadline: room.config.betting_deadline(Utc::now()),
            bets: BTreeMap::new(),
        };
        let version = self.rooms.update_stage(room_id, &stage, room.version).await?;
        log::info!("room {room_id}: game set up with deck {deck_id}");
        self.hub
            .broadcast(room_id, &RoomEvent::GameStateUpdate { stage, version });
        Ok(())
    }

    /// Validate and apply one player action.
    pub async fn perform_action(
        &self,
        room_id: RoomId,
        player_id: PlayerId,
        action: Action,
    ) -> Result<()> {
        let room = self.rooms.get_room(room_id).await?;
        if !action.is_legal_for(&room.stage) {
            return Err(Error::invalid(format!(
                "{action} is not a valid action during {}",
                room.stage
            )));
        }

        let player = self
            .players
            .get_player(room_id, player_id)
            .await?
            .ok_or_else(|| Error::not_found("player", player_id))?;

        log::debug!("room {room_id}: {} from player {player_id}", action.kind());
        match action {
            Action::Bet { amount } => self.bet(&room, &player, amount).await,
            Action::Hit => self.hit(&room, &player).await,
            Action::Stand => self.stand(&room, &player).await,
            Action::Double => self.double(&room, &player).await,
            Action::Split { amount } => self.split(&room, &player, amount).await,
            Action::Surrender => self.surrender(&room, &player).await,
            Action::HurryUp => self.hurry_up(&room, &player).await,
        }
    }

    /// Tear the room down: delete hands, return cards, park the stage.
    pub async fn teardown(&self, room_id: RoomId) -> Result<()> {
        let room = self.rooms.get_room(room_id).await?;
        self.hands.delete_hands(room_id).await?;
        if let Some(deck_id) = room.deck_id.as_deref()
            && let Err(e) = self.deck.return_all(deck_id).await
        {
            log::warn!("room {room_id}: failed to return cards on teardown: {e}");
        }
        let version = self
            .rooms
            .update_stage(room_id, &Stage::Teardown, room.version)
            .await?;
        log::info!("room {room_id}: torn down");
        self.hub.broadcast(
            room_id,
            &RoomEvent::GameStateUpdate {
                stage: Stage::Teardown,
                version,
            },
        );
        Ok(())
    }

    /// Add a player to the room and announce them.
    pub async fn join_room(&self, room_id: RoomId, player_id: PlayerId, name: &str) -> Result<()> {
        let room = self.rooms.get_room(room_id).await?;
        let members = self.players.list_players(room_id).await?;
        if members.iter().any(|p| p.id == player_id) {
            return Err(Error::invalid("already in this room"));
        }
        if members.len() as u32 >= room.config.max_players {
            return Err(Error::invalid("room is full"));
        }

        let seat = members.iter().map(|p| p.seat + 1).max().unwrap_or(0);
        let role = if room.host_id == player_id {
            PlayerRole::Host
        } else {
            PlayerRole::Player
        };
        let player = Player {
            id: player_id,
            room_id,
            name: name.to_string(),
            role,
            status: PlayerStatus::Active,
            balance: room.config.starting_balance,
            seat,
        };
        self.players.add_player(&player).await?;
        log::info!("room {room_id}: player {player_id} ({name}) joined at seat {seat}");
        self.hub.broadcast(
            room_id,
            &RoomEvent::PlayerJoined {
                player_id,
                name: name.to_string(),
            },
        );
        Ok(())
    }

    /// Remove a player from the room and announce it. A bet they recorded
    /// in the current betting stage leaves with them, so the next round
    /// never references a missing player.
    pub async fn leave_room(&self, room_id: RoomId, player_id: PlayerId) -> Result<()> {
        let room = self.rooms.get_room(room_id).await?;
        let player = self
            .players
            .get_player(room_id, player_id)
            .await?
            .ok_or_else(|| Error::not_found("player", player_id))?;
        self.players.remove_player(room_id, player_id).await?;

        if let Stage::Betting { deadline, bets } = &room.stage
            && bets.contains_key(&player_id)
        {
            let mut bets = bets.clone();
            bets.remove(&player_id);
            let stage = Stage::Betting {
                deadline: *deadline,
                bets,
            };
            let version = self.rooms.update_stage(room_id, &stage, room.version).await?;
            self.hub
                .broadcast(room_id, &RoomEvent::GameStateUpdate { stage, version });
        }

        log::info!("room {room_id}: player {player_id} left");
        self.hub.broadcast(
            room_id,
            &RoomEvent::PlayerLeft {
                player_id,
                name: player.name,
            },
        );
        Ok(())
    }

    /// Relay a chat message to the room's subscribers.
    pub async fn send_message(&self, room_id: RoomId, sender: &str, content: &str) -> Result<()> {
        // Only checks the room resolves; chat does not touch game state.
        self.rooms.get_room(room_id).await?;
        self.hub.broadcast(
            room_id,
            &RoomEvent::Message {
                sender: sender.to_string(),
                content: content.to_string(),
                timestamp: Utc::now(),
            },
        );
        Ok(())
    }

    async fn bet(&self, room: &Room, player: &Player, amount: Chips) -> Result<()> {
        let Stage::Betting { deadline, bets } = &room.stage else {
            return Err(Error::invalid("bets are only accepted during betting"));
        };
        if amount <= 0 {
            return Err(Error::invalid("bet must be positive"));
        }
        if player.balance < amount {
            return Err(Error::invalid(format!(
                "balance {} cannot cover bet {amount}",
                player.balance
            )));
        }

        let mut bets = bets.clone();
        bets.insert(player.id, amount);
        self.players
            .set_status(room.id, player.id, PlayerStatus::Active)
            .await?;

        let stage = Stage::Betting {
            deadline: *deadline,
            bets: bets.clone(),
        };
        let version = self.rooms.update_stage(room.id, &stage, room.version).await?;
        self.hub.broadcast(
            room.id,
            &RoomEvent::PlayerAction {
                player_id: player.id,
                action: "bet".to_string(),
                amount: Some(amount),
            },
        );
        self.hub
            .broadcast(room.id, &RoomEvent::GameStateUpdate { stage, version });

        if Utc::now() < *deadline {
            return Ok(());
        }
        self.start_round(room, bets, version).await
    }

    /// Deduct every recorded bet, create the hands, deal, and hand the turn
    /// to the first slot.
    async fn start_round(
        &self,
        room: &Room,
        bets: BTreeMap<PlayerId, Chips>,
        version: i64,
    ) -> Result<()> {
        let members = self.players.list_players(room.id).await?;

        // A recorded bet must reference a current member; anything else means
        // the room state is corrupt, not that the caller erred.
        for player_id in bets.keys() {
            if !members.iter().any(|p| p.id == *player_id) {
                return Err(Error::Inconsistency(format!(
                    "recorded bet references missing player {player_id}"
                )));
            }
        }

        let mut round_hands = Vec::new();
        for member in &members {
            let Some(&bet) = bets.get(&member.id) else {
                continue;
            };
            self.players
                .adjust_balance(room.id, member.id, -bet)
                .await?;
            let hand = Hand::new(room.id, member.id, round_hands.len() as u32, 0, bet);
            self.hands.create_hand(&hand).await?;
            round_hands.push(hand);
        }

        let version = self
            .rooms
            .update_stage(room.id, &Stage::Dealing, version)
            .await?;
        log::info!(
            "room {}: round started with {} hands",
            room.id,
            round_hands.len()
        );
        self.hub.broadcast(
            room.id,
            &RoomEvent::GameStateUpdate {
                stage: Stage::Dealing,
                version,
            },
        );

        // Two full passes: one card to each hand in player order, then one to
        // the dealer.
        let deck_id = room.deck_id()?;
        let dealer = dealer_pile(room.id);
        for _ in 0..2 {
            for hand in &round_hands {
                self.deck
                    .draw_cards(deck_id, &hand.pile_name(), 1)
                    .await?;
            }
            self.deck.draw_cards(deck_id, &dealer, 1).await?;
        }

        for hand in &round_hands {
            let cards = self.deck.list_pile(deck_id, &hand.pile_name()).await?;
            self.broadcast_hand(room.id, hand.player_id, &cards);
        }
        let dealer_cards = self.deck.list_pile(deck_id, &dealer).await?;
        self.broadcast_dealer_partial(room.id, &dealer_cards);

        let stage = Stage::PlayerAction {
            deadline: room.config.turn_deadline(Utc::now()),
            player_index: 0,
            hand_index: 0,
        };
        let version = self.rooms.update_stage(room.id, &stage, version).await?;
        self.hub
            .broadcast(room.id, &RoomEvent::GameStateUpdate { stage, version });
        Ok(())
    }

    async fn hit(&self, room: &Room, player: &Player) -> Result<()> {
        let pointer = self.action_pointer(room)?;
        let all_hands = self.hands.list_hands(room.id).await?;
        let hand = self.resolve_acting_hand(&all_hands, pointer, player)?;

        let deck_id = room.deck_id()?;
        self.deck.draw_cards(deck_id, &hand.pile_name(), 1).await?;
        let cards = self.deck.list_pile(deck_id, &hand.pile_name()).await?;

        self.broadcast_action(room.id, player.id, "hit", None);
        self.broadcast_hand(room.id, player.id, &cards);

        if score::is_bust(&cards) {
            log::debug!("room {}: player {} busts at {}", room.id, player.id, score::hand_value(&cards));
            return self.advance_turn(room, room.version, &all_hands, pointer).await;
        }

        // Stay on the same hand with a fresh deadline.
        let stage = Stage::PlayerAction {
            deadline: room.config.turn_deadline(Utc::now()),
            player_index: pointer.0,
            hand_index: pointer.1,
        };
        let version = self.rooms.update_stage(room.id, &stage, room.version).await?;
        self.hub
            .broadcast(room.id, &RoomEvent::GameStateUpdate { stage, version });
        Ok(())
    }

    async fn stand(&self, room: &Room, player: &Player) -> Result<()> {
        let pointer = self.action_pointer(room)?;
        let all_hands = self.hands.list_hands(room.id).await?;
        self.resolve_acting_hand(&all_hands, pointer, player)?;

        self.broadcast_action(room.id, player.id, "stand", None);
        self.advance_turn(room, room.version, &all_hands, pointer).await
    }

    async fn double(&self, room: &Room, player: &Player) -> Result<()> {
        let pointer = self.action_pointer(room)?;
        let all_hands = self.hands.list_hands(room.id).await?;
        let hand = self.resolve_acting_hand(&all_hands, pointer, player)?;

        let deck_id = room.deck_id()?;
        let cards = self.deck.list_pile(deck_id, &hand.pile_name()).await?;
        if cards.len() != 2 {
            return Err(Error::invalid(
                "double is only legal as the first action on a two-card hand",
            ));
        }
        if player.balance < hand.bet {
            return Err(Error::invalid(format!(
                "balance {} cannot cover doubling the {} bet",
                player.balance, hand.bet
            )));
        }

        self.players
            .adjust_balance(room.id, player.id, -hand.bet)
            .await?;
        self.hands.update_bet(hand.id, hand.bet * 2).await?;

        self.deck.draw_cards(deck_id, &hand.pile_name(), 1).await?;
        let cards = self.deck.list_pile(deck_id, &hand.pile_name()).await?;

        self.broadcast_action(room.id, player.id, "double", Some(hand.bet * 2));
        self.broadcast_hand(room.id, player.id, &cards);

        // A doubled hand never acts again this round, bust or not.
        self.advance_turn(room, room.version, &all_hands, pointer).await
    }

    async fn split(&self, room: &Room, player: &Player, amount: Chips) -> Result<()> {
        let pointer = self.action_pointer(room)?;
        let all_hands = self.hands.list_hands(room.id).await?;
        let hand = self.resolve_acting_hand(&all_hands, pointer, player)?;

        let deck_id = room.deck_id()?;
        let cards = self.deck.list_pile(deck_id, &hand.pile_name()).await?;
        if cards.len() != 2 {
            return Err(Error::invalid(
                "split is only legal as the first action on a two-card hand",
            ));
        }
        if !cards[0].same_rank(&cards[1]) {
            return Err(Error::invalid("split requires two cards of equal rank"));
        }
        if amount <= 0 {
            return Err(Error::invalid("split bet must be positive"));
        }
        if player.balance < amount {
            return Err(Error::invalid(format!(
                "balance {} cannot cover the {amount} split bet",
                player.balance
            )));
        }

        self.players
            .adjust_balance(room.id, player.id, -amount)
            .await?;
        // The slot may already hold earlier split siblings; the new hand
        // takes the next free number so every hand keeps a distinct turn.
        let next_number = all_hands
            .iter()
            .filter(|h| h.order == hand.order)
            .map(|h| h.hand_number + 1)
            .max()
            .unwrap_or(1);
        let sibling = Hand::new(room.id, player.id, hand.order, next_number, amount);
        self.hands.create_hand(&sibling).await?;

        // Move the second original card into the sibling's pile, then deal
        // one fresh card to each half.
        self.deck
            .remove_from_pile(deck_id, &hand.pile_name(), &cards[1].code)
            .await?;
        self.deck
            .add_to_pile(deck_id, &sibling.pile_name(), &cards[1].code)
            .await?;
        self.deck.draw_cards(deck_id, &hand.pile_name(), 1).await?;
        self.deck
            .draw_cards(deck_id, &sibling.pile_name(), 1)
            .await?;

        self.broadcast_action(room.id, player.id, "split", Some(amount));
        let original_cards = self.deck.list_pile(deck_id, &hand.pile_name()).await?;
        self.broadcast_hand(room.id, player.id, &original_cards);
        let sibling_cards = self.deck.list_pile(deck_id, &sibling.pile_name()).await?;
        self.broadcast_hand(room.id, player.id, &sibling_cards);

        // The turn stays on the original hand; it addresses first.
        let stage = Stage::PlayerAction {
            deadline: room.config.turn_deadline(Utc::now()),
            player_index: pointer.0,
            hand_index: pointer.1,
        };
        let version = self.rooms.update_stage(room.id, &stage, room.version).await?;
        self.hub
            .broadcast(room.id, &RoomEvent::GameStateUpdate { stage, version });
        Ok(())
    }

    async fn surrender(&self, room: &Room, player: &Player) -> Result<()> {
        let pointer = self.action_pointer(room)?;
        let all_hands = self.hands.list_hands(room.id).await?;
        let hand = self.resolve_acting_hand(&all_hands, pointer, player)?;

        let owned = self
            .hands
            .hands_for_player(room.id, player.id)
            .await?
            .len();
        if owned != 1 {
            return Err(Error::invalid("surrender is not allowed after splitting"));
        }

        self.players
            .adjust_balance(room.id, player.id, hand.bet / 2)
            .await?;
        self.hands.delete_hand(hand.id).await?;
        log::debug!(
            "room {}: player {} surrendered for {}",
            room.id,
            player.id,
            hand.bet / 2
        );
        self.broadcast_action(room.id, player.id, "surrender", None);

        let remaining: Vec<Hand> = all_hands
            .iter()
            .filter(|h| h.id != hand.id)
            .cloned()
            .collect();
        self.advance_turn(room, room.version, &remaining, pointer).await
    }

    async fn hurry_up(&self, room: &Room, caller: &Player) -> Result<()> {
        match &room.stage {
            Stage::Betting { deadline, bets } => {
                let members = self.players.list_players(room.id).await?;
                let everyone_bet = !bets.is_empty()
                    && members
                        .iter()
                        .filter(|p| p.status == PlayerStatus::Active)
                        .all(|p| bets.contains_key(&p.id));
                if Utc::now() < *deadline && !everyone_bet {
                    return Err(Error::invalid("the betting deadline has not passed"));
                }

                self.broadcast_action(room.id, caller.id, "hurry_up", None);
                if bets.is_empty() {
                    // Nothing to deal; just restart the betting clock.
                    let stage = Stage::Betting {
                        deadline: room.config.betting_deadline(Utc::now()),
                        bets: BTreeMap::new(),
                    };
                    let version =
                        self.rooms.update_stage(room.id, &stage, room.version).await?;
                    self.hub
                        .broadcast(room.id, &RoomEvent::GameStateUpdate { stage, version });
                    return Ok(());
                }
                self.start_round(room, bets.clone(), room.version).await
            }
            Stage::PlayerAction { deadline, .. } => {
                if Utc::now() < *deadline {
                    return Err(Error::invalid("the turn deadline has not passed"));
                }
                let pointer = self.action_pointer(room)?;
                let all_hands = self.hands.list_hands(room.id).await?;
                let hand = turns::acting_hand(&all_hands, pointer.0, pointer.1)
                    .ok_or_else(|| {
                        Error::Inconsistency(format!(
                            "turn points at missing hand ({}, {})",
                            pointer.0, pointer.1
                        ))
                    })?;

                // The stalled player sits out as if they had stood.
                self.players
                    .set_status(room.id, hand.player_id, PlayerStatus::Inactive)
                    .await?;
                self.broadcast_action(room.id, caller.id, "hurry_up", None);
                self.advance_turn(room, room.version, &all_hands, pointer).await
            }
            _ => Err(Error::invalid("nothing to hurry along")),
        }
    }

    /// Move the turn pointer, or settle the round when no hands remain.
    async fn advance_turn(
        &self,
        room: &Room,
        version: i64,
        hands: &[Hand],
        pointer: (u32, u32),
    ) -> Result<()> {
        match turns::advance(hands, pointer.0, pointer.1) {
            turns::NextTurn::Hand(player_index, hand_index) => {
                let stage = Stage::PlayerAction {
                    deadline: room.config.turn_deadline(Utc::now()),
                    player_index,
                    hand_index,
                };
                let version = self.rooms.update_stage(room.id, &stage, version).await?;
                self.hub
                    .broadcast(room.id, &RoomEvent::GameStateUpdate { stage, version });
                Ok(())
            }
            turns::NextTurn::FinishRound => self.finish_round(room, version).await,
        }
    }

    /// Reveal the dealer, draw to 17, settle every hand, reset for the next
    /// round.
    async fn finish_round(&self, room: &Room, version: i64) -> Result<()> {
        let version = self
            .rooms
            .update_stage(room.id, &Stage::FinishRound, version)
            .await?;
        self.hub.broadcast(
            room.id,
            &RoomEvent::GameStateUpdate {
                stage: Stage::FinishRound,
                version,
            },
        );

        let deck_id = room.deck_id()?;
        let dealer = dealer_pile(room.id);
        let mut dealer_cards = self.deck.list_pile(deck_id, &dealer).await?;
        while score::dealer_must_hit(&dealer_cards) {
            self.deck.draw_cards(deck_id, &dealer, 1).await?;
            dealer_cards = self.deck.list_pile(deck_id, &dealer).await?;
        }
        let dealer_score = score::hand_value(&dealer_cards);
        log::info!("room {}: dealer stands at {dealer_score}", room.id);
        self.hub.broadcast(
            room.id,
            &RoomEvent::DealerReveal {
                cards: dealer_cards.iter().map(DealtCard::face_up).collect(),
                score: dealer_score,
            },
        );

        for hand in self.hands.list_hands(room.id).await? {
            let cards = self.deck.list_pile(deck_id, &hand.pile_name()).await?;
            let outcome = score::round_outcome(&cards, &dealer_cards);
            let payout = outcome.payout(hand.bet);
            if payout > 0 {
                self.players
                    .adjust_balance(room.id, hand.player_id, payout)
                    .await?;
            }
            log::debug!(
                "room {}: hand ({}, {}) {:?}, payout {payout}",
                room.id,
                hand.order,
                hand.hand_number,
                outcome
            );
            self.broadcast_hand(room.id, hand.player_id, &cards);
        }

        self.hands.delete_hands(room.id).await?;
        self.deck.return_all(deck_id).await?;

        let stage = Stage::Betting {
            deadline: room.config.betting_deadline(Utc::now()),
            bets: BTreeMap::new(),
        };
        let version = self.rooms.update_stage(room.id, &stage, version).await?;
        self.hub
            .broadcast(room.id, &RoomEvent::GameStateUpdate { stage, version });
        Ok(())
    }

    /// The `(player_index, hand_index)` pointer of the current stage.
    fn action_pointer(&self, room: &Room) -> Result<(u32, u32)> {
        match room.stage {
            Stage::PlayerAction {
                player_index,
                hand_index,
                ..
            } => Ok((player_index, hand_index)),
            _ => Err(Error::invalid("no player turn in progress")),
        }
    }

    /// Resolve the hand the turn pointer addresses and check it belongs to
    /// the caller.
    fn resolve_acting_hand<'h>(
        &self,
        hands: &'h [Hand],
        pointer: (u32, u32),
        player: &Player,
    ) -> Result<&'h Hand> {
        let hand = turns::acting_hand(hands, pointer.0, pointer.1).ok_or_else(|| {
            Error::Inconsistency(format!(
                "turn points at missing hand ({}, {})",
                pointer.0, pointer.1
            ))
        })?;
        if hand.player_id != player.id {
            return Err(Error::invalid("not your turn"));
        }
        Ok(hand)
    }

    fn broadcast_action(
        &self,
        room_id: RoomId,
        player_id: PlayerId,
        action: &str,
        amount: Option<Chips>,
    ) {
        self.hub.broadcast(
            room_id,
            &RoomEvent::PlayerAction {
                player_id,
                action: action.to_string(),
                amount,
            },
        );
    }

    fn broadcast_hand(&self, room_id: RoomId, player_id: PlayerId, cards: &[Card]) {
        self.hub.broadcast(
            room_id,
            &RoomEvent::PlayerReveal {
                player_id,
                cards: cards.to_vec(),
                score: score::hand_value(cards),
            },
        );
    }

    /// Dealer reveal during the deal: the hole card stays face down and the
    /// advertised score covers only the up card.
    fn broadcast_dealer_partial(&self, room_id: RoomId, cards: &[Card]) {
        let mut shown: Vec<DealtCard> = Vec::with_capacity(cards.len());
        let mut visible = Vec::new();
        for (i, card) in cards.iter().enumerate() {
            if i == cards.len() - 1 {
                shown.push(DealtCard::face_down());
            } else {
                shown.push(DealtCard::face_up(card));
                visible.push(card.clone());
            }
        }
        self.hub.broadcast(
            room_id,
            &RoomEvent::DealerReveal {
                cards: shown,
                score: score::hand_value(&visible),
            },
        );
    }
}
