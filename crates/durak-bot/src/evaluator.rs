use durak_core::model::hand::Hand;
use durak_core::model::rank::Rank;
use durak_core::model::suit::Suit;

/// Weights for the static position score.
#[derive(Debug, Clone, Copy)]
pub struct EvaluatorWeights {
    /// Per card the opponent holds more than us (default: 2.0)
    pub card_advantage: f64,
    /// Per trump held (default: 1.5)
    pub trump_held: f64,
    /// Per card ranked eight or lower (default: 0.5)
    pub low_card: f64,
    /// Per card ranked queen or higher (default: 1.0)
    pub high_card: f64,
    /// Per rank held at least twice (default: 1.5)
    pub duplicate_rank: f64,
    /// Multiplier once the pile is empty and our hand is small (default: 1.5)
    pub endgame_amplifier: f64,
    /// Hand size at or below which the amplifier applies (default: 3)
    pub endgame_hand_size: usize,
}

impl Default for EvaluatorWeights {
    fn default() -> Self {
        Self {
            card_advantage: 2.0,
            trump_held: 1.5,
            low_card: 0.5,
            high_card: 1.0,
            duplicate_rank: 1.5,
            endgame_amplifier: 1.5,
            endgame_hand_size: 3,
        }
    }
}

/// Material/structure score of a hand. Only meaningful relative to other
/// scores produced with the same weights.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionEvaluator {
    weights: EvaluatorWeights,
}

impl PositionEvaluator {
    pub fn new(weights: EvaluatorWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &EvaluatorWeights {
        &self.weights
    }

    pub fn evaluate(
        &self,
        hand: &Hand,
        opponent_hand_size: usize,
        trump: Suit,
        deck_remaining: usize,
    ) -> f64 {
        let w = &self.weights;
        let advantage = opponent_hand_size as f64 - hand.len() as f64;
        let trumps = hand.count_suit(trump) as f64;
        let low = hand.iter().filter(|card| card.rank.is_low()).count() as f64;
        let high = hand.iter().filter(|card| card.rank.is_high()).count() as f64;
        let duplicates = Rank::ORDERED
            .iter()
            .filter(|&&rank| hand.count_rank(rank) > 1)
            .count() as f64;

        let score = advantage * w.card_advantage
            + trumps * w.trump_held
            + low * w.low_card
            + high * w.high_card
            + duplicates * w.duplicate_rank;

        if deck_remaining == 0 && hand.len() <= w.endgame_hand_size {
            score * w.endgame_amplifier
        } else {
            score
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{EvaluatorWeights, PositionEvaluator};
    use durak_core::model::card::Card;
    use durak_core::model::hand::Hand;
    use durak_core::model::rank::Rank;
    use durak_core::model::suit::Suit;

    #[test]
    fn sums_each_term() {
        let hand = Hand::with_cards(vec![
            Card::new(Rank::Six, Suit::Clubs),
            Card::new(Rank::Six, Suit::Spades),
            Card::new(Rank::Queen, Suit::Hearts),
        ]);
        let score = PositionEvaluator::default().evaluate(&hand, 5, Suit::Hearts, 10);
        // advantage 2*2 + trump 1.5 + low 2*0.5 + high 1.0 + duplicate 1.5
        assert!((score - 9.0).abs() < 1e-9);
    }

    #[test]
    fn endgame_amplifies_small_hands() {
        let hand = Hand::with_cards(vec![Card::new(Rank::Ace, Suit::Hearts)]);
        let evaluator = PositionEvaluator::default();
        let midgame = evaluator.evaluate(&hand, 3, Suit::Hearts, 4);
        let endgame = evaluator.evaluate(&hand, 3, Suit::Hearts, 0);
        assert!((endgame - midgame * 1.5).abs() < 1e-9);
    }

    #[test]
    fn fewer_cards_than_opponent_scores_higher() {
        let evaluator = PositionEvaluator::new(EvaluatorWeights {
            trump_held: 0.0,
            ..EvaluatorWeights::default()
        });
        let small = Hand::with_cards(vec![Card::new(Rank::Ten, Suit::Clubs)]);
        let large = Hand::with_cards(vec![
            Card::new(Rank::Ten, Suit::Clubs),
            Card::new(Rank::Nine, Suit::Diamonds),
            Card::new(Rank::Jack, Suit::Spades),
        ]);
        assert!(
            evaluator.evaluate(&small, 4, Suit::Hearts, 10)
                > evaluator.evaluate(&large, 4, Suit::Hearts, 10)
        );
    }
}
