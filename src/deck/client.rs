//! HTTP client for the deckofcardsapi.com wire contract.

use super::{DeckError, DeckProvider, DeckResult};
use crate::game::entities::Card;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;

const DEFAULT_BASE_URL: &str = "https://deckofcardsapi.com/api/deck";

/// Number of standard decks shuffled into one shoe.
const DECK_COUNT: u32 = 6;

#[derive(Debug, Deserialize)]
struct NewDeckResponse {
    success: bool,
    deck_id: String,
}

#[derive(Debug, Deserialize)]
struct DrawResponse {
    success: bool,
    #[serde(default)]
    cards: Vec<Card>,
}

#[derive(Debug, Deserialize)]
struct Pile {
    #[serde(default)]
    cards: Vec<Card>,
}

#[derive(Debug, Deserialize)]
struct PileListResponse {
    success: bool,
    #[serde(default)]
    piles: HashMap<String, Pile>,
}

#[derive(Debug, Deserialize)]
struct AckResponse {
    success: bool,
}

/// [`DeckProvider`] backed by the public deck-of-cards HTTP API.
#[derive(Clone, Debug)]
pub struct CardDeckClient {
    http: reqwest::Client,
    base_url: String,
}

impl Default for CardDeckClient {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

impl CardDeckClient {
    pub fn new(http: reqwest::Client) -> Self {
        Self::with_base_url(http, DEFAULT_BASE_URL)
    }

    /// Point the client at a different server, e.g. a local stub.
    pub fn with_base_url(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, url: &str) -> DeckResult<T> {
        let response = self.http.get(url).send().await?.error_for_status()?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl DeckProvider for CardDeckClient {
    async fn create_deck(&self) -> DeckResult<String> {
        let url = format!("{}/new/shuffle/?deck_count={DECK_COUNT}", self.base_url);
        let body: NewDeckResponse = self.get(&url).await?;
        if !body.success {
            return Err(DeckError::Malformed("deck creation refused".into()));
        }
        Ok(body.deck_id)
    }

    async fn draw_cards(&self, deck_id: &str, pile: &str, count: usize) -> DeckResult<Vec<Card>> {
        let url = format!("{}/{deck_id}/draw/?count={count}", self.base_url);
        let body: DrawResponse = self.get(&url).await?;
        if !body.success || body.cards.len() < count {
            return Err(DeckError::Exhausted);
        }

        let codes: Vec<&str> = body.cards.iter().map(|c| c.code.as_str()).collect();
        let url = format!(
            "{}/{deck_id}/pile/{pile}/add/?cards={}",
            self.base_url,
            codes.join(",")
        );
        let ack: AckResponse = self.get(&url).await?;
        if !ack.success {
            return Err(DeckError::UnknownPile(pile.to_string()));
        }

        Ok(body.cards)
    }

    async fn list_pile(&self, deck_id: &str, pile: &str) -> DeckResult<Vec<Card>> {
        let url = format!("{}/{deck_id}/pile/{pile}/list/", self.base_url);
        let mut body: PileListResponse = self.get(&url).await?;
        if !body.success {
            return Err(DeckError::UnknownPile(pile.to_string()));
        }
        Ok(body.piles.remove(pile).map(|p| p.cards).unwrap_or_default())
    }

    async fn add_to_pile(&self, deck_id: &str, pile: &str, card_code: &str) -> DeckResult<()> {
        let url = format!(
            "{}/{deck_id}/pile/{pile}/add/?cards={card_code}",
            self.base_url
        );
        let ack: AckResponse = self.get(&url).await?;
        if !ack.success {
            return Err(DeckError::UnknownPile(pile.to_string()));
        }
        Ok(())
    }

    async fn remove_from_pile(&self, deck_id: &str, pile: &str, card_code: &str) -> DeckResult<()> {
        // The wire contract removes a card from a pile by "drawing" it.
        let url = format!(
            "{}/{deck_id}/pile/{pile}/draw/?cards={card_code}",
            self.base_url
        );
        let ack: AckResponse = self.get(&url).await?;
        if !ack.success {
            return Err(DeckError::UnknownPile(pile.to_string()));
        }
        Ok(())
    }

    async fn return_all(&self, deck_id: &str) -> DeckResult<()> {
        let url = format!("{}/{deck_id}/return/", self.base_url);
        let ack: AckResponse = self.get(&url).await?;
        if !ack.success {
            return Err(DeckError::Malformed("return refused".into()));
        }
        Ok(())
    }
}
