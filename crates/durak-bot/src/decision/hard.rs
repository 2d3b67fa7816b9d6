use super::{DecisionContext, DecisionParams, keep_value};
use durak_core::model::card::Card;
use durak_core::model::hand::Hand;
use durak_core::model::table::Board;

pub(super) fn attack(hand: &Hand, board: &Board, ctx: &DecisionContext<'_>) -> (Option<Card>, &'static str) {
    (
        ctx.estimator
            .optimal_attack(hand, board, ctx.opponent_hand_size),
        "hard_estimator_attack",
    )
}

pub(super) fn defense(
    params: &DecisionParams,
    hand: &Hand,
    attack: Card,
    legal: &[Card],
    ctx: &DecisionContext<'_>,
) -> (Option<Card>, &'static str) {
    if hand.len() > params.hard_overspend_min_hand {
        let attack_value = keep_value(attack, ctx.trump, &Hand::new(), params);
        let cheapest = legal
            .iter()
            .map(|&card| keep_value(card, ctx.trump, hand, params))
            .fold(f64::INFINITY, f64::min);
        if cheapest > attack_value + params.hard_overspend_margin {
            return (None, "hard_refuse_overspend");
        }
    }
    (
        ctx.estimator
            .optimal_defense(attack, hand, ctx.opponent_hand_size),
        "hard_estimator_defense",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use durak_core::model::rank::Rank;
    use durak_core::model::suit::Suit;

    fn card(rank: Rank, suit: Suit) -> Card {
        Card::new(rank, suit)
    }

    fn trump_only_hand(extra: usize) -> Hand {
        let mut cards = vec![card(Rank::Six, Suit::Hearts)];
        let fillers = [
            card(Rank::Seven, Suit::Diamonds),
            card(Rank::Eight, Suit::Diamonds),
            card(Rank::Nine, Suit::Diamonds),
            card(Rank::Ten, Suit::Diamonds),
        ];
        cards.extend(fillers.iter().take(extra));
        Hand::with_cards(cards)
    }

    #[test]
    fn large_hand_takes_rather_than_spend_trump_on_a_six() {
        let hand = trump_only_hand(4);
        let attack = card(Rank::Six, Suit::Clubs);
        let legal = [card(Rank::Six, Suit::Hearts)];
        let ctx = DecisionContext::detached(Suit::Hearts, 12, 5, hand.cards());
        let (choice, reason) = defense(&DecisionParams::default(), &hand, attack, &legal, &ctx);
        assert_eq!(choice, None);
        assert_eq!(reason, "hard_refuse_overspend");
    }

    #[test]
    fn small_hand_covers_with_trump() {
        let hand = trump_only_hand(3);
        let attack = card(Rank::Six, Suit::Clubs);
        let legal = [card(Rank::Six, Suit::Hearts)];
        let ctx = DecisionContext::detached(Suit::Hearts, 12, 5, hand.cards());
        let (choice, _) = defense(&DecisionParams::default(), &hand, attack, &legal, &ctx);
        assert_eq!(choice, Some(card(Rank::Six, Suit::Hearts)));
    }

    #[test]
    fn attack_delegates_to_estimator() {
        let hand = Hand::with_cards(vec![card(Rank::Seven, Suit::Clubs)]);
        let ctx = DecisionContext::detached(Suit::Hearts, 12, 5, hand.cards());
        let (choice, _) = attack(&hand, &Board::new(), &ctx);
        assert_eq!(choice, Some(card(Rank::Seven, Suit::Clubs)));
    }
}
