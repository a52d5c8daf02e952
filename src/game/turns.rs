//! Turn sequencing across players and their split hands.

use super::entities::Hand;

/// Where play moves after the hand at `(player_index, hand_index)` finishes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NextTurn {
    /// Move to this `(player_index, hand_index)` with a fresh deadline.
    Hand(u32, u32),
    /// No hands left to act; settle the round.
    FinishRound,
}

/// Compute the turn after `(player_index, hand_index)`.
///
/// The same player's next split hand goes first, then the next occupied turn
/// slot's first hand. Slots emptied mid-round (a surrendered hand is deleted)
/// are skipped rather than ending the round early.
pub fn advance(hands: &[Hand], player_index: u32, hand_index: u32) -> NextTurn {
    hands
        .iter()
        .map(|h| (h.order, h.hand_number))
        .filter(|&pos| pos > (player_index, hand_index))
        .min()
        .map_or(NextTurn::FinishRound, |(order, number)| {
            NextTurn::Hand(order, number)
        })
}

/// Find the hand a `PlayerAction` pointer refers to.
pub fn acting_hand(hands: &[Hand], player_index: u32, hand_index: u32) -> Option<&Hand> {
    hands
        .iter()
        .find(|h| h.order == player_index && h.hand_number == hand_index)
}
