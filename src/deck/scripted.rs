//! Deterministic in-memory deck for tests and local play.
//!
//! Cards come off a preloaded shoe in order, so a test can script the exact
//! deal it wants to exercise.

use super::{DeckError, DeckProvider, DeckResult};
use crate::game::entities::Card;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

#[derive(Debug, Default)]
struct ScriptedState {
    shoe: VecDeque<Card>,
    piles: HashMap<String, Vec<Card>>,
    /// Cards drawn out of a pile but not yet placed in another, matching the
    /// wire contract where a pile "draw" precedes a pile "add".
    loose: Vec<Card>,
}

/// In-memory [`DeckProvider`] with a scripted draw order.
#[derive(Debug, Default)]
pub struct ScriptedDeck {
    state: Mutex<ScriptedState>,
}

impl ScriptedDeck {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append cards to the shoe in draw order.
    pub fn load(&self, cards: impl IntoIterator<Item = Card>) {
        let mut state = self.state.lock().unwrap();
        state.shoe.extend(cards);
    }

    /// Cards still waiting to be drawn.
    pub fn remaining(&self) -> usize {
        self.state.lock().unwrap().shoe.len()
    }
}

#[async_trait]
impl DeckProvider for ScriptedDeck {
    async fn create_deck(&self) -> DeckResult<String> {
        Ok("scripted".to_string())
    }

    async fn draw_cards(&self, _deck_id: &str, pile: &str, count: usize) -> DeckResult<Vec<Card>> {
        let mut state = self.state.lock().unwrap();
        if state.shoe.len() < count {
            return Err(DeckError::Exhausted);
        }
        let drawn: Vec<Card> = state.shoe.drain(..count).collect();
        state
            .piles
            .entry(pile.to_string())
            .or_default()
            .extend(drawn.iter().cloned());
        Ok(drawn)
    }

    async fn list_pile(&self, _deck_id: &str, pile: &str) -> DeckResult<Vec<Card>> {
        let state = self.state.lock().unwrap();
        Ok(state.piles.get(pile).cloned().unwrap_or_default())
    }

    async fn add_to_pile(&self, _deck_id: &str, pile: &str, card_code: &str) -> DeckResult<()> {
        let mut state = self.state.lock().unwrap();
        let idx = state
            .loose
            .iter()
            .position(|c| c.code == card_code)
            .ok_or_else(|| DeckError::UnknownPile(format!("card {card_code} not drawn")))?;
        let card = state.loose.remove(idx);
        state.piles.entry(pile.to_string()).or_default().push(card);
        Ok(())
    }

    async fn remove_from_pile(&self, _deck_id: &str, pile: &str, card_code: &str) -> DeckResult<()> {
        let mut state = self.state.lock().unwrap();
        let cards = state
            .piles
            .get_mut(pile)
            .ok_or_else(|| DeckError::UnknownPile(pile.to_string()))?;
        let idx = cards
            .iter()
            .position(|c| c.code == card_code)
            .ok_or_else(|| DeckError::UnknownPile(format!("card {card_code} not in {pile}")))?;
        let card = cards.remove(idx);
        state.loose.push(card);
        Ok(())
    }

    async fn return_all(&self, _deck_id: &str) -> DeckResult<()> {
        let mut state = self.state.lock().unwrap();
        state.piles.clear();
        state.loose.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(code: &str, value: &str) -> Card {
        Card::new(code, value, "SPADES")
    }

    #[tokio::test]
    async fn draws_in_scripted_order() {
        let deck = ScriptedDeck::new();
        deck.load([card("5H", "5"), card("6S", "6"), card("KD", "KING")]);

        let drawn = deck.draw_cards("scripted", "p1", 2).await.unwrap();
        assert_eq!(drawn[0].code, "5H");
        assert_eq!(drawn[1].code, "6S");
        assert_eq!(deck.list_pile("scripted", "p1").await.unwrap().len(), 2);
        assert_eq!(deck.remaining(), 1);
    }

    #[tokio::test]
    async fn exhausted_shoe_is_an_error() {
        let deck = ScriptedDeck::new();
        deck.load([card("5H", "5")]);
        assert!(matches!(
            deck.draw_cards("scripted", "p1", 2).await,
            Err(DeckError::Exhausted)
        ));
    }

    #[tokio::test]
    async fn remove_then_add_moves_a_card_between_piles() {
        let deck = ScriptedDeck::new();
        deck.load([card("8H", "8"), card("8S", "8")]);
        deck.draw_cards("scripted", "orig", 2).await.unwrap();

        deck.remove_from_pile("scripted", "orig", "8S").await.unwrap();
        deck.add_to_pile("scripted", "new", "8S").await.unwrap();

        let orig = deck.list_pile("scripted", "orig").await.unwrap();
        let new = deck.list_pile("scripted", "new").await.unwrap();
        assert_eq!(orig.len(), 1);
        assert_eq!(orig[0].code, "8H");
        assert_eq!(new.len(), 1);
        assert_eq!(new[0].code, "8S");
    }

    #[tokio::test]
    async fn adding_an_undrawn_card_fails() {
        let deck = ScriptedDeck::new();
        assert!(deck.add_to_pile("scripted", "new", "8S").await.is_err());
    }

    #[tokio::test]
    async fn return_all_clears_piles() {
        let deck = ScriptedDeck::new();
        deck.load([card("5H", "5"), card("6S", "6")]);
        deck.draw_cards("scripted", "p1", 2).await.unwrap();
        deck.return_all("scripted").await.unwrap();
        assert!(deck.list_pile("scripted", "p1").await.unwrap().is_empty());
    }
}
