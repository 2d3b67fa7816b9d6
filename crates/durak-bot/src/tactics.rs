use crate::decision::{DecisionParams, keep_value};
use durak_core::model::card::Card;
use durak_core::model::hand::Hand;
use durak_core::model::suit::Suit;
use durak_core::model::table::Phase;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    AggressiveStart,
    DefensiveStart,
    MultiAttack,
    Conservative,
    TrumpFinish,
    DesperateDefense,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardPreference {
    LowestNonTrump,
    LowCards,
    MediumCards,
    HighTrumps,
    Duplicates,
    Singles,
    AnyValid,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub hand_size: usize,
    #[serde(default)]
    pub opponent_hand_size: usize,
    pub deck_remaining: usize,
    pub phase: Phase,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TacticAction {
    pub kind: ActionKind,
    pub card_preference: CardPreference,
    pub aggression_level: f64,
}

/// Learned scenario -> action preference. Never mutated at decision time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tactic {
    #[serde(default)]
    pub id: u64,
    pub name: String,
    pub scenario: Scenario,
    pub action: TacticAction,
    pub success_rate: f64,
    pub confidence: f64,
    #[serde(default)]
    pub times_used: u32,
    #[serde(default)]
    pub times_won: u32,
}

impl Tactic {
    pub fn quality(&self) -> f64 {
        self.success_rate * self.confidence
    }
}

/// How alike two tactics are, in [0, 1]. Identical names count as identical.
pub fn similarity(a: &Tactic, b: &Tactic) -> f64 {
    if a.name == b.name {
        return 1.0;
    }
    let mut score = 0.0;
    if a.scenario.phase == b.scenario.phase {
        score += 0.3;
    }
    if a.action.kind == b.action.kind {
        score += 0.3;
    }
    if a.scenario.hand_size.abs_diff(b.scenario.hand_size) <= 1 {
        score += 0.2;
    }
    if a.scenario.deck_remaining.abs_diff(b.scenario.deck_remaining) <= 5 {
        score += 0.2;
    }
    score
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TacticDirective {
    Play(Card),
    Take,
    /// No applicable tactic, or the tactic declined; fall through to heuristics.
    Abstain,
}

#[derive(Debug, Clone, Copy)]
pub struct TacticRequest<'a> {
    pub phase: Phase,
    pub hand: &'a Hand,
    pub legal: &'a [Card],
    pub deck_remaining: usize,
    pub trump: Suit,
}

const HAND_WINDOW: usize = 2;
const DECK_WINDOW: usize = 10;
const MIN_SUCCESS_RATE: f64 = 0.5;

#[derive(Debug, Clone, Default)]
pub struct TacticAdapter {
    tactics: Vec<Tactic>,
}

impl TacticAdapter {
    pub fn new(tactics: Vec<Tactic>) -> Self {
        Self { tactics }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn tactics(&self) -> &[Tactic] {
        &self.tactics
    }

    pub fn len(&self) -> usize {
        self.tactics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tactics.is_empty()
    }

    /// Highest-quality tactic whose scenario is close to the current one.
    pub fn best_match(
        &self,
        phase: Phase,
        hand_size: usize,
        deck_remaining: usize,
        confidence_floor: f64,
    ) -> Option<&Tactic> {
        self.tactics
            .iter()
            .filter(|tactic| {
                tactic.scenario.phase == phase
                    && tactic.scenario.hand_size.abs_diff(hand_size) <= HAND_WINDOW
                    && tactic.scenario.deck_remaining.abs_diff(deck_remaining) <= DECK_WINDOW
                    && tactic.success_rate > MIN_SUCCESS_RATE
                    && tactic.confidence >= confidence_floor
            })
            .fold(None, |best: Option<&Tactic>, tactic| match best {
                Some(current) if current.quality() >= tactic.quality() => Some(current),
                _ => Some(tactic),
            })
    }

    pub fn apply<R: Rng + ?Sized>(
        &self,
        request: &TacticRequest<'_>,
        params: &DecisionParams,
        rng: &mut R,
    ) -> TacticDirective {
        if request.legal.is_empty() {
            return TacticDirective::Abstain;
        }
        let Some(tactic) = self.best_match(
            request.phase,
            request.hand.len(),
            request.deck_remaining,
            params.tactic_confidence_floor,
        ) else {
            return TacticDirective::Abstain;
        };

        let chance = (tactic.quality() / params.tactic_quality_cap).clamp(0.0, 1.0);
        if !rng.gen_bool(chance) {
            return TacticDirective::Abstain;
        }

        match request.phase {
            Phase::Attack => attack_directive(tactic, request),
            Phase::Defend => defense_directive(tactic, request, params),
        }
    }
}

fn attack_directive(tactic: &Tactic, request: &TacticRequest<'_>) -> TacticDirective {
    let legal = request.legal;
    let trump = request.trump;
    let by_rank_low = |cards: Vec<Card>| cards.into_iter().min_by_key(|card| card.rank);

    let preferred = match tactic.action.card_preference {
        CardPreference::LowestNonTrump => {
            by_rank_low(legal.iter().copied().filter(|c| c.suit != trump).collect())
        }
        CardPreference::LowCards => {
            by_rank_low(legal.iter().copied().filter(|c| c.rank.is_low()).collect())
        }
        CardPreference::MediumCards => by_rank_low(
            legal
                .iter()
                .copied()
                .filter(|c| (9..=11).contains(&c.rank.value()))
                .collect(),
        ),
        CardPreference::HighTrumps => legal
            .iter()
            .copied()
            .filter(|c| c.suit == trump && c.rank.value() >= 11)
            .max_by_key(|card| card.rank),
        CardPreference::Duplicates => legal
            .iter()
            .copied()
            .find(|c| legal.iter().filter(|o| o.rank == c.rank).count() > 1),
        CardPreference::Singles => by_rank_low(
            legal
                .iter()
                .copied()
                .filter(|c| request.hand.count_rank(c.rank) == 1)
                .collect(),
        ),
        CardPreference::AnyValid => None,
    };
    if let Some(card) = preferred {
        return TacticDirective::Play(card);
    }

    let aggression = tactic.action.aggression_level;
    if aggression > 0.7 {
        legal
            .iter()
            .copied()
            .max_by_key(|card| card.rank)
            .map_or(TacticDirective::Abstain, TacticDirective::Play)
    } else if aggression < 0.4 {
        legal
            .iter()
            .copied()
            .min_by_key(|card| card.rank)
            .map_or(TacticDirective::Abstain, TacticDirective::Play)
    } else {
        TacticDirective::Abstain
    }
}

fn defense_directive(
    tactic: &Tactic,
    request: &TacticRequest<'_>,
    params: &DecisionParams,
) -> TacticDirective {
    let legal = request.legal;
    match tactic.action.kind {
        ActionKind::DesperateDefense => legal
            .iter()
            .copied()
            .min_by(|a, b| {
                keep_value(*a, request.trump, request.hand, params)
                    .total_cmp(&keep_value(*b, request.trump, request.hand, params))
            })
            .map_or(TacticDirective::Abstain, TacticDirective::Play),
        ActionKind::Conservative => legal
            .iter()
            .copied()
            .filter(|card| card.rank.value() <= 10)
            .min_by_key(|card| card.rank)
            .map_or(TacticDirective::Take, TacticDirective::Play),
        ActionKind::TrumpFinish if request.deck_remaining == 0 => legal
            .iter()
            .copied()
            .filter(|card| card.suit == request.trump)
            .min_by_key(|card| card.rank)
            .map_or(TacticDirective::Abstain, TacticDirective::Play),
        _ => TacticDirective::Abstain,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use durak_core::model::rank::Rank;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn tactic(name: &str, phase: Phase, kind: ActionKind, pref: CardPreference, aggression: f64) -> Tactic {
        Tactic {
            id: 0,
            name: name.to_string(),
            scenario: Scenario {
                hand_size: 6,
                opponent_hand_size: 6,
                deck_remaining: 24,
                phase,
            },
            action: TacticAction {
                kind,
                card_preference: pref,
                aggression_level: aggression,
            },
            success_rate: 0.9,
            confidence: 0.9,
            times_used: 10,
            times_won: 9,
        }
    }

    fn card(rank: Rank, suit: Suit) -> Card {
        Card::new(rank, suit)
    }

    #[test]
    fn best_match_respects_windows_and_quality() {
        let mut weak = tactic("weak", Phase::Attack, ActionKind::MultiAttack, CardPreference::Duplicates, 0.5);
        weak.confidence = 0.3;
        let strong = tactic("strong", Phase::Attack, ActionKind::AggressiveStart, CardPreference::LowCards, 0.8);
        let mut far = tactic("far", Phase::Attack, ActionKind::AggressiveStart, CardPreference::LowCards, 0.8);
        far.scenario.deck_remaining = 0;
        let mut losing = tactic("losing", Phase::Attack, ActionKind::AggressiveStart, CardPreference::LowCards, 0.8);
        losing.success_rate = 0.5;

        let adapter = TacticAdapter::new(vec![weak, far, losing, strong]);
        let found = adapter.best_match(Phase::Attack, 5, 20, 0.2).unwrap();
        assert_eq!(found.name, "strong");
        assert!(adapter.best_match(Phase::Defend, 5, 20, 0.2).is_none());
        assert!(adapter.best_match(Phase::Attack, 9, 20, 0.2).is_none());
    }

    #[test]
    fn low_card_preference_plays_lowest_low_card() {
        let adapter = TacticAdapter::new(vec![tactic(
            "opening",
            Phase::Attack,
            ActionKind::AggressiveStart,
            CardPreference::LowCards,
            0.8,
        )]);
        let hand = Hand::with_cards(vec![
            card(Rank::Eight, Suit::Clubs),
            card(Rank::Seven, Suit::Spades),
            card(Rank::King, Suit::Diamonds),
        ]);
        let legal = hand.cards().to_vec();
        let request = TacticRequest {
            phase: Phase::Attack,
            hand: &hand,
            legal: &legal,
            deck_remaining: 24,
            trump: Suit::Hearts,
        };
        let params = DecisionParams {
            tactic_quality_cap: 0.5,
            ..DecisionParams::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            adapter.apply(&request, &params, &mut rng),
            TacticDirective::Play(card(Rank::Seven, Suit::Spades))
        );
    }

    #[test]
    fn aggression_breaks_ties_when_preference_finds_nothing() {
        let adapter = TacticAdapter::new(vec![tactic(
            "finish",
            Phase::Attack,
            ActionKind::TrumpFinish,
            CardPreference::HighTrumps,
            1.0,
        )]);
        let hand = Hand::with_cards(vec![card(Rank::Nine, Suit::Clubs), card(Rank::Queen, Suit::Spades)]);
        let legal = hand.cards().to_vec();
        let request = TacticRequest {
            phase: Phase::Attack,
            hand: &hand,
            legal: &legal,
            deck_remaining: 24,
            trump: Suit::Hearts,
        };
        let mut rng = StdRng::seed_from_u64(2);
        assert_eq!(
            adapter.apply(&request, &DecisionParams::default(), &mut rng),
            TacticDirective::Play(card(Rank::Queen, Suit::Spades))
        );
    }

    #[test]
    fn conservative_defense_takes_without_low_cover() {
        let adapter = TacticAdapter::new(vec![tactic(
            "careful",
            Phase::Defend,
            ActionKind::Conservative,
            CardPreference::AnyValid,
            0.3,
        )]);
        let hand = Hand::with_cards(vec![card(Rank::King, Suit::Clubs)]);
        let legal = hand.cards().to_vec();
        let request = TacticRequest {
            phase: Phase::Defend,
            hand: &hand,
            legal: &legal,
            deck_remaining: 24,
            trump: Suit::Hearts,
        };
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(
            adapter.apply(&request, &DecisionParams::default(), &mut rng),
            TacticDirective::Take
        );
    }

    #[test]
    fn empty_library_abstains() {
        let hand = Hand::with_cards(vec![card(Rank::King, Suit::Clubs)]);
        let legal = hand.cards().to_vec();
        let request = TacticRequest {
            phase: Phase::Attack,
            hand: &hand,
            legal: &legal,
            deck_remaining: 10,
            trump: Suit::Hearts,
        };
        let mut rng = StdRng::seed_from_u64(4);
        assert_eq!(
            TacticAdapter::empty().apply(&request, &DecisionParams::default(), &mut rng),
            TacticDirective::Abstain
        );
    }

    #[test]
    fn similarity_scores_components() {
        let a = tactic("a", Phase::Attack, ActionKind::MultiAttack, CardPreference::Duplicates, 0.9);
        let mut b = tactic("b", Phase::Attack, ActionKind::MultiAttack, CardPreference::Duplicates, 0.9);
        assert!((similarity(&a, &b) - 1.0).abs() < 1e-9);
        b.scenario.deck_remaining = 0;
        assert!((similarity(&a, &b) - 0.8).abs() < 1e-9);
        b.action.kind = ActionKind::Conservative;
        b.scenario.phase = Phase::Defend;
        assert!((similarity(&a, &b) - 0.2).abs() < 1e-9);
        let same_name = tactic("a", Phase::Defend, ActionKind::Conservative, CardPreference::Singles, 0.1);
        assert_eq!(similarity(&a, &same_name), 1.0);
    }
}
