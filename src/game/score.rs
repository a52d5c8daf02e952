//! Hand scoring and round settlement rules.
//!
//! Pure functions over card slices; no side effects. House rules fixed here:
//! a natural (two-card 21) pays 3:2, an ordinary win pays 1:1, a push returns
//! the stake, and the dealer stands on any 17, soft or hard.

use super::entities::{Card, Chips};

/// Dealer draws while below this total.
pub const DEALER_STAND: u32 = 17;

/// Best blackjack value of a hand. Each ace starts at 11 and is demoted to 1
/// while the total is over 21. A result above 21 is a bust.
pub fn hand_value(cards: &[Card]) -> u32 {
    let mut total = 0;
    let mut aces = 0;
    for card in cards {
        let (points, is_ace) = card.points();
        total += points;
        if is_ace {
            aces += 1;
        }
    }
    while total > 21 && aces > 0 {
        total -= 10;
        aces -= 1;
    }
    total
}

pub fn is_bust(cards: &[Card]) -> bool {
    hand_value(cards) > 21
}

/// A natural: exactly two cards totalling 21. Beats any multi-card 21.
pub fn is_natural(cards: &[Card]) -> bool {
    cards.len() == 2 && hand_value(cards) == 21
}

/// Whether the dealer must keep drawing.
pub fn dealer_must_hit(cards: &[Card]) -> bool {
    hand_value(cards) < DEALER_STAND
}

/// Outcome of one hand against the dealer at settlement.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// Two-card 21, paid 3:2.
    Blackjack,
    /// Paid 1:1.
    Win,
    /// Stake returned.
    Push,
    /// Stake already deducted; nothing returned.
    Lose,
}

impl Outcome {
    /// Chips credited back to the player for a hand with the given bet.
    /// The bet was deducted when the hand was created, so a push credits
    /// exactly the stake and a loss credits nothing.
    pub fn payout(self, bet: Chips) -> Chips {
        match self {
            Self::Blackjack => bet + bet * 3 / 2,
            Self::Win => bet * 2,
            Self::Push => bet,
            Self::Lose => 0,
        }
    }
}

/// Compare a player hand against the dealer's final hand.
pub fn round_outcome(hand: &[Card], dealer: &[Card]) -> Outcome {
    let hand_total = hand_value(hand);
    if hand_total > 21 {
        return Outcome::Lose;
    }

    let dealer_total = hand_value(dealer);
    let hand_natural = is_natural(hand);
    let dealer_natural = is_natural(dealer);

    if dealer_total > 21 {
        return if hand_natural {
            Outcome::Blackjack
        } else {
            Outcome::Win
        };
    }

    // A natural beats any non-natural hand, including a multi-card 21.
    match (hand_natural, dealer_natural) {
        (true, true) => return Outcome::Push,
        (true, false) => return Outcome::Blackjack,
        (false, true) => return Outcome::Lose,
        (false, false) => {}
    }

    match hand_total.cmp(&dealer_total) {
        std::cmp::Ordering::Greater => Outcome::Win,
        std::cmp::Ordering::Equal => Outcome::Push,
        std::cmp::Ordering::Less => Outcome::Lose,
    }
}
