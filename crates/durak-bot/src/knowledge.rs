use durak_core::game::serialization::BoardSnapshot;
use durak_core::model::card::Card;
use durak_core::model::table::Phase;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    Attack,
    Defense,
    Take,
}

/// One logged move with its outcome. Append-only on the store side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeRecord {
    pub game_id: String,
    pub move_number: u32,
    pub phase: Phase,
    #[serde(default)]
    pub card_played: Option<Card>,
    pub hand_size: usize,
    pub decision: DecisionKind,
    pub was_successful: bool,
    pub reward: f64,
    #[serde(default)]
    pub board: BoardSnapshot,
}

const SIMILAR_HAND_WINDOW: usize = 2;
const SIMILAR_LIMIT: usize = 10;
const LEARNED_RANK_WINDOW: u8 = 2;
const LEARNED_SCALE: f64 = 5.0;

/// Read-only evidence consulted by the expert heuristic.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeView {
    records: Vec<KnowledgeRecord>,
}

impl KnowledgeView {
    pub fn new(records: Vec<KnowledgeRecord>) -> Self {
        Self { records }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[KnowledgeRecord] {
        &self.records
    }

    /// Successful records from hands within two cards of `hand_size`, oldest first.
    pub fn similar(&self, hand_size: usize) -> Vec<&KnowledgeRecord> {
        self.records
            .iter()
            .filter(|record| {
                record.was_successful && record.hand_size.abs_diff(hand_size) <= SIMILAR_HAND_WINDOW
            })
            .take(SIMILAR_LIMIT)
            .collect()
    }

    /// Average reward of `decision` records whose card sits within two ranks
    /// of `card`, scaled up. Zero without evidence.
    pub fn learned_card_score(
        &self,
        card: Card,
        situations: &[&KnowledgeRecord],
        decision: DecisionKind,
    ) -> f64 {
        let rewards: Vec<f64> = situations
            .iter()
            .filter(|record| record.decision == decision)
            .filter_map(|record| {
                record.card_played.and_then(|played| {
                    (played.rank.value().abs_diff(card.rank.value()) <= LEARNED_RANK_WINDOW)
                        .then_some(record.reward)
                })
            })
            .collect();
        if rewards.is_empty() {
            return 0.0;
        }
        rewards.iter().sum::<f64>() / rewards.len() as f64 * LEARNED_SCALE
    }
}

#[cfg(test)]
mod tests {
    use super::{DecisionKind, KnowledgeRecord, KnowledgeView};
    use durak_core::game::serialization::BoardSnapshot;
    use durak_core::model::card::Card;
    use durak_core::model::rank::Rank;
    use durak_core::model::suit::Suit;
    use durak_core::model::table::Phase;

    fn record(hand_size: usize, rank: Rank, decision: DecisionKind, ok: bool, reward: f64) -> KnowledgeRecord {
        KnowledgeRecord {
            game_id: "g".to_string(),
            move_number: 1,
            phase: Phase::Attack,
            card_played: Some(Card::new(rank, Suit::Clubs)),
            hand_size,
            decision,
            was_successful: ok,
            reward,
            board: BoardSnapshot::default(),
        }
    }

    #[test]
    fn similar_filters_by_hand_and_success() {
        let view = KnowledgeView::new(vec![
            record(6, Rank::Six, DecisionKind::Attack, true, 1.0),
            record(3, Rank::Six, DecisionKind::Attack, true, 1.0),
            record(5, Rank::Six, DecisionKind::Attack, false, 1.0),
            record(8, Rank::Six, DecisionKind::Attack, true, 1.0),
        ]);
        let similar = view.similar(6);
        assert_eq!(similar.len(), 2);
        assert!(similar.iter().all(|r| r.was_successful));
    }

    #[test]
    fn similar_is_capped_at_ten() {
        let view = KnowledgeView::new(
            (0..15)
                .map(|_| record(4, Rank::Nine, DecisionKind::Defense, true, 0.5))
                .collect(),
        );
        assert_eq!(view.similar(4).len(), 10);
    }

    #[test]
    fn learned_score_averages_nearby_ranks() {
        let view = KnowledgeView::new(vec![
            record(6, Rank::Seven, DecisionKind::Attack, true, 0.4),
            record(6, Rank::Eight, DecisionKind::Attack, true, 0.8),
            record(6, Rank::Ace, DecisionKind::Attack, true, 0.0),
            record(6, Rank::Seven, DecisionKind::Defense, true, 1.0),
        ]);
        let situations = view.similar(6);
        let score = view.learned_card_score(
            Card::new(Rank::Six, Suit::Hearts),
            &situations,
            DecisionKind::Attack,
        );
        assert!((score - 3.0).abs() < 1e-9);
        assert_eq!(
            view.learned_card_score(Card::new(Rank::Six, Suit::Hearts), &[], DecisionKind::Attack),
            0.0
        );
    }

    #[test]
    fn records_round_trip_through_json() {
        let original = record(5, Rank::Ten, DecisionKind::Take, false, 0.0);
        let json = serde_json::to_string(&original).unwrap();
        assert!(json.contains("\"decision\":\"take\""));
        let back: KnowledgeRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, original);
    }
}
