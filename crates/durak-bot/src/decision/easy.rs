use super::{DecisionParams, keep_value};
use durak_core::model::card::Card;
use durak_core::model::hand::Hand;
use durak_core::model::suit::Suit;
use rand::Rng;
use rand::seq::SliceRandom;

pub(super) fn attack<R: Rng + ?Sized>(
    rng: &mut R,
    params: &DecisionParams,
    hand: &Hand,
    legal: &[Card],
    trump: Suit,
) -> (Option<Card>, &'static str) {
    if rng.gen_bool(params.easy_worst_pick) {
        let worst = legal.iter().copied().max_by(|a, b| {
            keep_value(*a, trump, hand, params).total_cmp(&keep_value(*b, trump, hand, params))
        });
        return (worst, "easy_worst_card");
    }
    (legal.choose(rng).copied(), "easy_random_attack")
}

pub(super) fn defense<R: Rng + ?Sized>(
    rng: &mut R,
    params: &DecisionParams,
    legal: &[Card],
) -> (Option<Card>, &'static str) {
    if rng.gen_bool(params.easy_take) {
        return (None, "easy_random_take");
    }
    (legal.choose(rng).copied(), "easy_random_defense")
}
