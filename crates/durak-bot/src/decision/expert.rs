use super::{DecisionContext, ExpertInputs};
use crate::knowledge::DecisionKind;
use crate::tactics::{TacticDirective, TacticRequest};
use durak_core::model::card::Card;
use durak_core::model::hand::Hand;
use durak_core::model::suit::Suit;
use durak_core::model::table::{Board, Phase};
use rand::Rng;

const OPENING_DECK: usize = 20;
const EARLY_TRUMP_DECK: usize = 10;
const ENDGAME_HAND: usize = 3;

/// `solved` carries the endgame solver's verdict when it ran for this
/// position.
pub(super) fn attack<R: Rng + ?Sized>(
    inputs: &ExpertInputs<'_>,
    rng: &mut R,
    solved: Option<Option<Card>>,
    hand: &Hand,
    board: &Board,
    legal: &[Card],
    ctx: &DecisionContext<'_>,
) -> (Option<Card>, &'static str) {
    // An empty table must be led; a pass from the solver there is ignored.
    if let Some(choice) = solved {
        if choice.is_some() || !board.is_empty() {
            return (choice, "expert_endgame_solver");
        }
    }

    let request = TacticRequest {
        phase: Phase::Attack,
        hand,
        legal,
        deck_remaining: ctx.deck_remaining,
        trump: ctx.trump,
    };
    if let TacticDirective::Play(card) = inputs.tactics.apply(&request, inputs.params, rng) {
        if legal.contains(&card) {
            return (Some(card), "expert_tactic");
        }
    }

    (heuristic_attack(inputs, hand, board, legal, ctx), "expert_heuristic_attack")
}

pub(super) fn defense<R: Rng + ?Sized>(
    inputs: &ExpertInputs<'_>,
    rng: &mut R,
    solved: Option<Option<Card>>,
    hand: &Hand,
    attack: Card,
    legal: &[Card],
    ctx: &DecisionContext<'_>,
) -> (Option<Card>, &'static str) {
    if let Some(choice) = solved {
        return (choice, "expert_endgame_solver");
    }

    let request = TacticRequest {
        phase: Phase::Defend,
        hand,
        legal,
        deck_remaining: ctx.deck_remaining,
        trump: ctx.trump,
    };
    match inputs.tactics.apply(&request, inputs.params, rng) {
        TacticDirective::Play(card) if legal.contains(&card) => {
            return (Some(card), "expert_tactic");
        }
        TacticDirective::Take => return (None, "expert_tactic_take"),
        _ => {}
    }

    match heuristic_defense(inputs, hand, attack, legal, ctx) {
        Some(card) => (Some(card), "expert_heuristic_defense"),
        None => (None, "expert_too_valuable"),
    }
}

fn heuristic_attack(
    inputs: &ExpertInputs<'_>,
    hand: &Hand,
    board: &Board,
    legal: &[Card],
    ctx: &DecisionContext<'_>,
) -> Option<Card> {
    let p = inputs.params;
    let trump = ctx.trump;
    let opponent = ctx.opponent_hand_size;
    let situations = inputs.knowledge.similar(hand.len());

    let mut best: Option<(Card, f64)> = None;
    for &card in legal {
        let strength = f64::from(card.strength(trump));
        let p_beat = ctx.estimator.probability_opponent_can_beat(card, opponent);
        let learned = inputs
            .knowledge
            .learned_card_score(card, &situations, DecisionKind::Attack);
        let duplicates = hand.count_rank(card.rank).saturating_sub(1) as f64;

        let mut score = -strength * p.attack_strength_weight
            + (1.0 - p_beat) * p.attack_unbeatable_weight
            + learned * p.attack_learned_weight
            + duplicates * p.attack_duplicate_weight;

        if ctx.deck_remaining == 0 && hand.len() <= ENDGAME_HAND {
            score += endgame_attack_term(card, hand, opponent, trump);
        }
        if board.is_empty()
            && ctx.deck_remaining > OPENING_DECK
            && card.rank.is_low()
            && card.suit != trump
        {
            score += p.attack_opening_bonus;
        }
        if card.suit == trump && ctx.deck_remaining > EARLY_TRUMP_DECK {
            score -= p.attack_early_trump_penalty;
        }

        if best.is_none_or(|(_, top)| score > top) {
            best = Some((card, score));
        }
    }
    best.map(|(card, _)| card)
}

fn endgame_attack_term(card: Card, hand: &Hand, opponent: usize, trump: Suit) -> f64 {
    let over_seven = f64::from(card.rank.value()) - 7.0;
    let mut score = 0.0;
    if hand.len() < opponent {
        score += over_seven * 0.5;
    }
    if hand.len() > opponent {
        score -= over_seven * 0.3;
    }
    if card.suit == trump && hand.len() > 2 {
        score -= 8.0;
    }
    score
}

/// Lowest-cost cover, or `None` when every cover is judged too valuable.
fn heuristic_defense(
    inputs: &ExpertInputs<'_>,
    hand: &Hand,
    attack: Card,
    legal: &[Card],
    ctx: &DecisionContext<'_>,
) -> Option<Card> {
    let p = inputs.params;
    let trump = ctx.trump;
    let attack_value = f64::from(attack.strength(trump));
    let situations = inputs.knowledge.similar(hand.len());

    let mut best: Option<(Card, f64)> = None;
    for &card in legal {
        let spent = f64::from(card.strength(trump));
        let mut cost = spent + (spent - attack_value) * p.defense_waste_weight;
        if card.suit == trump && ctx.deck_remaining > EARLY_TRUMP_DECK {
            cost += p.defense_early_trump_cost;
        }
        cost -= inputs
            .knowledge
            .learned_card_score(card, &situations, DecisionKind::Defense)
            * p.defense_learned_weight;

        if ctx.deck_remaining == 0 {
            if hand.len() > ctx.opponent_hand_size {
                cost -= p.defense_endgame_push;
            } else if cost > attack_value + p.defense_overspend_margin {
                continue;
            }
        }

        if best.is_none_or(|(_, top)| cost < top) {
            best = Some((card, cost));
        }
    }
    best.map(|(card, _)| card)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::DecisionParams;
    use crate::knowledge::{KnowledgeRecord, KnowledgeView};
    use crate::tactics::{ActionKind, CardPreference, Scenario, Tactic, TacticAction, TacticAdapter};
    use durak_core::game::serialization::BoardSnapshot;
    use durak_core::model::rank::Rank;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn card(rank: Rank, suit: Suit) -> Card {
        Card::new(rank, suit)
    }

    struct Sources {
        params: DecisionParams,
        tactics: TacticAdapter,
        knowledge: KnowledgeView,
    }

    impl Sources {
        fn new(knowledge: KnowledgeView) -> Self {
            Self {
                params: DecisionParams::default(),
                tactics: TacticAdapter::empty(),
                knowledge,
            }
        }

        fn with_tactic(tactic: Tactic) -> Self {
            Self {
                tactics: TacticAdapter::new(vec![tactic]),
                ..Self::new(KnowledgeView::empty())
            }
        }

        fn inputs(&self) -> ExpertInputs<'_> {
            ExpertInputs {
                params: &self.params,
                tactics: &self.tactics,
                knowledge: &self.knowledge,
            }
        }
    }

    /// Quality 0.81, above the default cap of 0.5, so it always fires.
    fn proven_tactic(phase: Phase, hand_size: usize, kind: ActionKind, preference: CardPreference) -> Tactic {
        Tactic {
            id: 1,
            name: "proven".to_string(),
            scenario: Scenario {
                hand_size,
                opponent_hand_size: 6,
                deck_remaining: 24,
                phase,
            },
            action: TacticAction {
                kind,
                card_preference: preference,
                aggression_level: 0.5,
            },
            success_rate: 0.9,
            confidence: 0.9,
            times_used: 20,
            times_won: 18,
        }
    }

    #[test]
    fn opening_prefers_low_non_trump() {
        let sources = Sources::new(KnowledgeView::empty());
        let hand = Hand::with_cards(vec![
            card(Rank::Seven, Suit::Clubs),
            card(Rank::Ace, Suit::Hearts),
            card(Rank::King, Suit::Spades),
        ]);
        let ctx = DecisionContext::detached(Suit::Hearts, 24, 6, hand.cards());
        let legal = hand.cards().to_vec();
        let mut rng = StdRng::seed_from_u64(1);
        let (choice, reason) = attack(&sources.inputs(), &mut rng, None, &hand, &Board::new(), &legal, &ctx);
        assert_eq!(choice, Some(card(Rank::Seven, Suit::Clubs)));
        assert_eq!(reason, "expert_heuristic_attack");
    }

    #[test]
    fn defense_saves_trump_while_pile_is_deep() {
        let sources = Sources::new(KnowledgeView::empty());
        let hand = Hand::with_cards(vec![card(Rank::Six, Suit::Hearts), card(Rank::Ace, Suit::Clubs)]);
        let legal = hand.cards().to_vec();
        let ctx = DecisionContext::detached(Suit::Hearts, 18, 6, hand.cards());
        let mut rng = StdRng::seed_from_u64(2);
        let (choice, _) = defense(
            &sources.inputs(),
            &mut rng,
            None,
            &hand,
            card(Rank::Ten, Suit::Clubs),
            &legal,
            &ctx,
        );
        assert_eq!(choice, Some(card(Rank::Ace, Suit::Clubs)));
    }

    #[test]
    fn winning_endgame_takes_instead_of_burning_a_trump() {
        let sources = Sources::new(KnowledgeView::empty());
        let hand = Hand::with_cards(vec![card(Rank::Ace, Suit::Hearts)]);
        let legal = hand.cards().to_vec();
        let ctx = DecisionContext::detached(Suit::Hearts, 0, 3, hand.cards());
        let mut rng = StdRng::seed_from_u64(3);
        let (choice, reason) = defense(
            &sources.inputs(),
            &mut rng,
            None,
            &hand,
            card(Rank::Six, Suit::Clubs),
            &legal,
            &ctx,
        );
        assert_eq!(choice, None);
        assert_eq!(reason, "expert_too_valuable");
    }

    #[test]
    fn learned_rewards_tilt_the_attack() {
        let record = |rank| KnowledgeRecord {
            game_id: "g".to_string(),
            move_number: 1,
            phase: Phase::Attack,
            card_played: Some(card(rank, Suit::Diamonds)),
            hand_size: 2,
            decision: DecisionKind::Attack,
            was_successful: true,
            reward: 1.0,
            board: BoardSnapshot::default(),
        };
        let sources = Sources::new(KnowledgeView::new(vec![record(Rank::King), record(Rank::Ace)]));
        let hand = Hand::with_cards(vec![card(Rank::Nine, Suit::Clubs), card(Rank::King, Suit::Spades)]);
        let legal = hand.cards().to_vec();
        let ctx = DecisionContext::detached(Suit::Hearts, 8, 6, hand.cards());
        let mut rng = StdRng::seed_from_u64(4);
        let (choice, _) = attack(&sources.inputs(), &mut rng, None, &hand, &Board::new(), &legal, &ctx);
        assert_eq!(choice, Some(card(Rank::King, Suit::Spades)));
    }

    #[test]
    fn qualifying_tactic_overrides_the_heuristic_attack() {
        let hand = Hand::with_cards(vec![
            card(Rank::Seven, Suit::Clubs),
            card(Rank::Jack, Suit::Spades),
            card(Rank::King, Suit::Diamonds),
        ]);
        let legal = hand.cards().to_vec();
        let ctx = DecisionContext::detached(Suit::Hearts, 24, 6, hand.cards());

        let plain = Sources::new(KnowledgeView::empty());
        let mut rng = StdRng::seed_from_u64(6);
        let (choice, reason) = attack(&plain.inputs(), &mut rng, None, &hand, &Board::new(), &legal, &ctx);
        assert_eq!(choice, Some(card(Rank::Seven, Suit::Clubs)));
        assert_eq!(reason, "expert_heuristic_attack");

        let taught = Sources::with_tactic(proven_tactic(
            Phase::Attack,
            3,
            ActionKind::MultiAttack,
            CardPreference::MediumCards,
        ));
        let mut rng = StdRng::seed_from_u64(6);
        let (choice, reason) = attack(&taught.inputs(), &mut rng, None, &hand, &Board::new(), &legal, &ctx);
        assert_eq!(choice, Some(card(Rank::Jack, Suit::Spades)));
        assert_eq!(reason, "expert_tactic");
    }

    #[test]
    fn conservative_tactic_forces_a_take() {
        let hand = Hand::with_cards(vec![card(Rank::King, Suit::Clubs)]);
        let legal = hand.cards().to_vec();
        let ctx = DecisionContext::detached(Suit::Hearts, 24, 6, hand.cards());
        let attack_card = card(Rank::Ten, Suit::Clubs);

        let plain = Sources::new(KnowledgeView::empty());
        let mut rng = StdRng::seed_from_u64(7);
        let (choice, _) = defense(&plain.inputs(), &mut rng, None, &hand, attack_card, &legal, &ctx);
        assert_eq!(choice, Some(card(Rank::King, Suit::Clubs)));

        let taught = Sources::with_tactic(proven_tactic(
            Phase::Defend,
            1,
            ActionKind::Conservative,
            CardPreference::AnyValid,
        ));
        let mut rng = StdRng::seed_from_u64(7);
        let (choice, reason) = defense(&taught.inputs(), &mut rng, None, &hand, attack_card, &legal, &ctx);
        assert_eq!(choice, None);
        assert_eq!(reason, "expert_tactic_take");
    }

    #[test]
    fn solver_verdict_outranks_tactics() {
        let hand = Hand::with_cards(vec![card(Rank::King, Suit::Clubs)]);
        let legal = hand.cards().to_vec();
        let ctx = DecisionContext::detached(Suit::Hearts, 24, 6, hand.cards());
        let taught = Sources::with_tactic(proven_tactic(
            Phase::Defend,
            1,
            ActionKind::Conservative,
            CardPreference::AnyValid,
        ));
        let mut rng = StdRng::seed_from_u64(8);
        let (choice, reason) = defense(
            &taught.inputs(),
            &mut rng,
            Some(Some(card(Rank::King, Suit::Clubs))),
            &hand,
            card(Rank::Ten, Suit::Clubs),
            &legal,
            &ctx,
        );
        assert_eq!(choice, Some(card(Rank::King, Suit::Clubs)));
        assert_eq!(reason, "expert_endgame_solver");
    }
}
