use durak_core::game::match_state::MatchState;
use durak_core::game::rules::{can_beat, valid_attack_cards};
use durak_core::model::card::Card;
use durak_core::model::deck::Deck;
use durak_core::model::hand::Hand;
use durak_core::model::suit::Suit;
use durak_core::model::table::Board;
use std::collections::HashSet;

/// Card-counting view over everything the acting seat has not seen.
///
/// Rebuilt every turn; holds no references into the match.
#[derive(Debug, Clone)]
pub struct ProbabilityEstimator {
    trump: Suit,
    deck_remaining: usize,
    unknown: Vec<Card>,
}

impl ProbabilityEstimator {
    pub fn new(trump: Suit, deck_remaining: usize, visible: &[Card]) -> Self {
        let seen: HashSet<Card> = visible.iter().copied().collect();
        let unknown = Deck::standard()
            .cards()
            .iter()
            .copied()
            .filter(|card| !seen.contains(card))
            .collect();
        Self {
            trump,
            deck_remaining,
            unknown,
        }
    }

    pub fn from_state(state: &MatchState, seat: usize) -> Self {
        Self::new(
            state.trump_suit(),
            state.deck().len(),
            &state.visible_cards_for(seat),
        )
    }

    pub fn trump(&self) -> Suit {
        self.trump
    }

    pub fn deck_remaining(&self) -> usize {
        self.deck_remaining
    }

    pub fn unknown(&self) -> &[Card] {
        &self.unknown
    }

    /// Chance that a hand of `opponent_hand_size` unseen cards holds at least
    /// one card covering `card`, treating each slot as an independent draw.
    pub fn probability_opponent_can_beat(&self, card: Card, opponent_hand_size: usize) -> f64 {
        if opponent_hand_size == 0 || self.unknown.is_empty() {
            return 0.0;
        }
        let beaters = self
            .unknown
            .iter()
            .filter(|&&other| can_beat(card, other, self.trump))
            .count();
        let p = beaters as f64 / self.unknown.len() as f64;
        1.0 - (1.0 - p).powi(opponent_hand_size as i32)
    }

    /// Share of strong cards (queen and up, or trump) in the unseen pool,
    /// scaled by hand size against a full hand of six.
    pub fn estimate_opponent_strength(&self, opponent_hand_size: usize) -> f64 {
        if self.unknown.is_empty() {
            return 0.5;
        }
        let strong = self
            .unknown
            .iter()
            .filter(|card| card.rank.is_high() || card.suit == self.trump)
            .count();
        let ratio = strong as f64 / self.unknown.len() as f64;
        (ratio * opponent_hand_size as f64 / 6.0).clamp(0.0, 1.0)
    }

    pub fn card_value(&self, card: Card) -> f64 {
        f64::from(card.strength(self.trump))
    }

    fn expected_value(
        &self,
        card: Card,
        own_hand_size: usize,
        opponent_hand_size: usize,
        opening: bool,
    ) -> f64 {
        let value = self.card_value(card);
        let mut ev = (15.0 - value) * 0.1;

        if card.suit == self.trump {
            ev -= 0.3;
            if self.deck_remaining < 5 {
                ev += 0.2;
            }
        }

        if own_hand_size <= 3 {
            ev += 0.4;
            if value >= 12.0 {
                ev += 0.3;
            }
        }

        if opening {
            if value <= 8.0 {
                ev += 0.5;
            }
            if value >= 12.0 {
                ev -= 0.4;
            }
        }

        ev + (1.0 - self.probability_opponent_can_beat(card, opponent_hand_size)) * 0.6
    }

    /// Best card to lead or pile on with. Ties keep hand order.
    pub fn optimal_attack(&self, hand: &Hand, board: &Board, opponent_hand_size: usize) -> Option<Card> {
        let candidates = valid_attack_cards(hand, board);
        best_by(&candidates, |card| {
            let mut score =
                self.expected_value(card, hand.len(), opponent_hand_size, board.is_empty());
            score += (1.0 - self.probability_opponent_can_beat(card, opponent_hand_size)) * 0.8;
            if hand.count_rank(card.rank) > 1 {
                score += 0.3;
            }
            if card.rank.is_low() && opponent_hand_size <= 3 {
                score += 0.5;
            }
            score
        })
    }

    /// Cheapest sensible cover for `attack`; `None` when nothing in hand beats it.
    pub fn optimal_defense(&self, attack: Card, hand: &Hand, opponent_hand_size: usize) -> Option<Card> {
        let candidates: Vec<Card> = hand
            .iter()
            .copied()
            .filter(|&card| can_beat(attack, card, self.trump))
            .collect();
        best_by(&candidates, |card| {
            let overkill = self.card_value(card) - self.card_value(attack);
            let mut score = -overkill * 0.3;
            if card.suit == self.trump {
                score -= 0.8;
                if self.deck_remaining > 10 {
                    score -= 0.5;
                }
                if self.deck_remaining < 5 {
                    score += 0.7;
                }
            }
            if card.rank.value() >= 13 {
                score -= 0.6;
            }
            score + self.probability_opponent_can_beat(card, opponent_hand_size) * 0.4
        })
    }
}

fn best_by<F>(candidates: &[Card], mut score: F) -> Option<Card>
where
    F: FnMut(Card) -> f64,
{
    let mut best: Option<(Card, f64)> = None;
    for &card in candidates {
        let value = score(card);
        if best.is_none_or(|(_, top)| value > top) {
            best = Some((card, value));
        }
    }
    best.map(|(card, _)| card)
}
