//! Property tests for the hand evaluator and the dealer drawing rule.

use blackjack_rooms::game::Card;
use blackjack_rooms::game::score::{
    DEALER_STAND, dealer_must_hit, hand_value, is_bust, is_natural, round_outcome, Outcome,
};
use proptest::prelude::*;

const VALUES: &[&str] = &[
    "2", "3", "4", "5", "6", "7", "8", "9", "10", "JACK", "QUEEN", "KING", "ACE",
];

fn arb_card() -> impl Strategy<Value = Card> {
    (0..VALUES.len()).prop_map(|i| Card::new("XX", VALUES[i], "SPADES"))
}

fn arb_hand(max: usize) -> impl Strategy<Value = Vec<Card>> {
    proptest::collection::vec(arb_card(), 1..=max)
}

/// Sum with every ace counted low.
fn low_total(cards: &[Card]) -> u32 {
    cards
        .iter()
        .map(|c| {
            let (points, is_ace) = c.points();
            if is_ace { 1 } else { points }
        })
        .sum()
}

/// Sum with every ace counted high.
fn high_total(cards: &[Card]) -> u32 {
    cards.iter().map(|c| c.points().0).sum()
}

proptest! {
    #[test]
    fn value_is_bounded_by_ace_extremes(cards in arb_hand(12)) {
        let value = hand_value(&cards);
        prop_assert!(value >= low_total(&cards));
        prop_assert!(value <= high_total(&cards));
    }

    #[test]
    fn value_never_busts_when_a_low_count_fits(cards in arb_hand(12)) {
        // Ace demotion must find any total at or under 21 that exists.
        prop_assert_eq!(hand_value(&cards) <= 21, low_total(&cards) <= 21);
    }

    #[test]
    fn aceless_hands_sum_plainly(cards in arb_hand(12)) {
        prop_assume!(cards.iter().all(|c| !c.points().1));
        prop_assert_eq!(hand_value(&cards), high_total(&cards));
    }

    #[test]
    fn busting_is_permanent(cards in arb_hand(11), extra in arb_card()) {
        let before = hand_value(&cards);
        let mut grown = cards.clone();
        grown.push(extra);
        // Busting is monotone: once the low total passes 21 it stays there.
        if before > 21 {
            prop_assert!(hand_value(&grown) > 21);
        }
    }

    #[test]
    fn naturals_are_two_card_21s_only(cards in arb_hand(6)) {
        if is_natural(&cards) {
            prop_assert_eq!(cards.len(), 2);
            prop_assert_eq!(hand_value(&cards), 21);
        }
    }

    #[test]
    fn dealer_play_always_terminates_at_or_above_17(shoe in proptest::collection::vec(arb_card(), 21)) {
        // 21 cards of minimum value 2 always cross 17, so the draw loop
        // terminates within the shoe.
        let mut dealer: Vec<Card> = Vec::new();
        let mut rest = shoe.into_iter();
        while dealer_must_hit(&dealer) {
            dealer.push(rest.next().unwrap());
        }
        prop_assert!(hand_value(&dealer) >= DEALER_STAND);
    }

    #[test]
    fn bust_hands_never_win(cards in arb_hand(12), dealer in arb_hand(12)) {
        prop_assume!(is_bust(&cards));
        prop_assert_eq!(round_outcome(&cards, &dealer), Outcome::Lose);
    }

    #[test]
    fn mirrored_hands_push(cards in arb_hand(6)) {
        // A hand settled against itself pushes unless it busts.
        prop_assume!(!is_bust(&cards));
        prop_assert_eq!(round_outcome(&cards, &cards), Outcome::Push);
    }
}
