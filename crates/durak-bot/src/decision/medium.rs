use super::DecisionParams;
use durak_core::model::card::Card;
use durak_core::model::suit::Suit;
use rand::Rng;
use rand::seq::SliceRandom;

fn attack_cost(card: Card, trump: Suit) -> u8 {
    card.rank.value() + if card.suit == trump { 20 } else { 0 }
}

pub(super) fn attack<R: Rng + ?Sized>(
    rng: &mut R,
    params: &DecisionParams,
    legal: &[Card],
    trump: Suit,
) -> (Option<Card>, &'static str) {
    let mut ranked = legal.to_vec();
    ranked.sort_by_key(|&card| attack_cost(card, trump));

    if rng.gen_bool(params.medium_best_pick) {
        return (ranked.first().copied(), "medium_cheapest");
    }
    let top_half = &ranked[..ranked.len().div_ceil(2)];
    (top_half.choose(rng).copied(), "medium_top_half")
}

pub(super) fn defense<R: Rng + ?Sized>(
    rng: &mut R,
    params: &DecisionParams,
    legal: &[Card],
    trump: Suit,
) -> (Option<Card>, &'static str) {
    if rng.gen_bool(params.medium_take) {
        return (None, "medium_random_take");
    }
    (
        legal.iter().copied().min_by_key(|card| card.strength(trump)),
        "medium_weakest_cover",
    )
}
