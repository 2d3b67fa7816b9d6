mod easy;
mod endgame;
mod expert;
mod hard;
mod medium;
mod params;

pub use endgame::EndgameSolver;
pub use params::DecisionParams;

use crate::evaluator::PositionEvaluator;
use crate::knowledge::KnowledgeView;
use crate::probability::ProbabilityEstimator;
use crate::tactics::TacticAdapter;
use core::fmt;
use durak_core::game::match_state::MatchState;
use durak_core::game::rules::{valid_attack_cards, valid_defense_cards};
use durak_core::model::card::Card;
use durak_core::model::hand::Hand;
use durak_core::model::suit::Suit;
use durak_core::model::table::{Board, Phase};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{Level, event};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    #[serde(alias = "normal")]
    Medium,
    Hard,
    #[serde(alias = "aha")]
    Expert,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown difficulty `{0}`")]
pub struct ParseDifficultyError(String);

impl FromStr for Difficulty {
    type Err = ParseDifficultyError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" | "normal" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            "expert" | "aha" => Ok(Difficulty::Expert),
            _ => Err(ParseDifficultyError(raw.to_string())),
        }
    }
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Easy,
        Difficulty::Medium,
        Difficulty::Hard,
        Difficulty::Expert,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
            Difficulty::Expert => "expert",
        }
    }

    /// Reads `DURAK_BOT_DIFFICULTY` once per process.
    pub fn from_env() -> Self {
        static CACHED: OnceLock<Difficulty> = OnceLock::new();
        *CACHED.get_or_init(|| Self::from_reader(|key| std::env::var(key).ok()))
    }

    fn from_reader<F>(mut read: F) -> Self
    where
        F: FnMut(&str) -> Option<String>,
    {
        read("DURAK_BOT_DIFFICULTY")
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default()
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a seat knows about the position beyond its own hand and the table.
#[derive(Debug, Clone)]
pub struct DecisionContext<'a> {
    pub seat: usize,
    pub trump: Suit,
    pub deck_remaining: usize,
    pub opponent_hand_size: usize,
    pub estimator: ProbabilityEstimator,
    /// Full position, when available. Only the endgame solver reads it.
    pub state: Option<&'a MatchState>,
}

impl<'a> DecisionContext<'a> {
    pub fn from_state(state: &'a MatchState, seat: usize) -> Self {
        Self {
            seat,
            trump: state.trump_suit(),
            deck_remaining: state.deck().len(),
            opponent_hand_size: state.opponent_hand_size(seat),
            estimator: ProbabilityEstimator::from_state(state, seat),
            state: Some(state),
        }
    }

    /// Context without a backing match, built from what the seat has seen.
    pub fn detached(
        trump: Suit,
        deck_remaining: usize,
        opponent_hand_size: usize,
        visible: &[Card],
    ) -> DecisionContext<'static> {
        DecisionContext {
            seat: 0,
            trump,
            deck_remaining,
            opponent_hand_size,
            estimator: ProbabilityEstimator::new(trump, deck_remaining, visible),
            state: None,
        }
    }
}

/// How much a card is worth keeping: rank, a trump premium, and a discount
/// for ranks held in pairs.
pub fn keep_value(card: Card, trump: Suit, hand: &Hand, params: &DecisionParams) -> f64 {
    let mut value = f64::from(card.rank.value());
    if card.suit == trump {
        value += 20.0 * params.trump_conservation;
    }
    if hand.count_rank(card.rank) > 1 {
        value -= 5.0 * params.aggressive_factor;
    }
    value
}

pub(crate) struct ExpertInputs<'e> {
    pub params: &'e DecisionParams,
    pub tactics: &'e TacticAdapter,
    pub knowledge: &'e KnowledgeView,
}

/// Picks moves for one seat. Owns its RNG and a read-only snapshot of the
/// tactic library and knowledge records.
pub struct DecisionEngine<R: Rng> {
    difficulty: Difficulty,
    params: DecisionParams,
    evaluator: PositionEvaluator,
    tactics: TacticAdapter,
    knowledge: KnowledgeView,
    rng: R,
    endgame_searches: usize,
}

/// Outcome of the endgame solver for one position: `None` when the solver
/// does not apply, `Some(None)` for a solved pass or take.
type Solved = Option<Option<Card>>;

impl<R: Rng> DecisionEngine<R> {
    pub fn new(difficulty: Difficulty, rng: R) -> Self {
        Self::with_sources(
            difficulty,
            DecisionParams::default(),
            rng,
            TacticAdapter::empty(),
            KnowledgeView::empty(),
        )
    }

    pub fn with_sources(
        difficulty: Difficulty,
        params: DecisionParams,
        rng: R,
        tactics: TacticAdapter,
        knowledge: KnowledgeView,
    ) -> Self {
        Self {
            difficulty,
            params,
            evaluator: PositionEvaluator::default(),
            tactics,
            knowledge,
            rng,
            endgame_searches: 0,
        }
    }

    pub fn with_evaluator(mut self, evaluator: PositionEvaluator) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn params(&self) -> &DecisionParams {
        &self.params
    }

    /// Endgame solver runs so far.
    pub fn endgame_searches(&self) -> usize {
        self.endgame_searches
    }

    /// Expert only; other tiers never consult the solver.
    fn solve_endgame(&mut self, ctx: &DecisionContext<'_>, phase: Phase) -> Solved {
        if self.difficulty != Difficulty::Expert {
            return None;
        }
        let state = ctx.state.filter(|state| state.phase() == phase)?;
        let mut solver = EndgameSolver::for_seat(state, ctx.seat, &self.params, &self.evaluator)?;
        self.endgame_searches += 1;
        Some(solver.best_move())
    }

    /// Card to lead or pile on with; `None` means pass.
    pub fn select_attack(&mut self, hand: &Hand, board: &Board, ctx: &DecisionContext<'_>) -> Option<Card> {
        let solved = self.solve_endgame(ctx, Phase::Attack);
        self.attack_with(hand, board, ctx, solved)
    }

    fn attack_with(
        &mut self,
        hand: &Hand,
        board: &Board,
        ctx: &DecisionContext<'_>,
        solved: Solved,
    ) -> Option<Card> {
        let legal = valid_attack_cards(hand, board);
        if legal.is_empty() {
            log_decision(self.difficulty, Phase::Attack, &legal, None, "no_legal_attack");
            return None;
        }

        let (choice, reason) = match self.difficulty {
            Difficulty::Easy => easy::attack(&mut self.rng, &self.params, hand, &legal, ctx.trump),
            Difficulty::Medium => medium::attack(&mut self.rng, &self.params, &legal, ctx.trump),
            Difficulty::Hard => hard::attack(hand, board, ctx),
            Difficulty::Expert => {
                let inputs = ExpertInputs {
                    params: &self.params,
                    tactics: &self.tactics,
                    knowledge: &self.knowledge,
                };
                expert::attack(&inputs, &mut self.rng, solved, hand, board, &legal, ctx)
            }
        };

        debug_assert!(choice.is_none_or(|card| legal.contains(&card)));
        log_decision(self.difficulty, Phase::Attack, &legal, choice, reason);
        choice
    }

    /// Card covering `attack`; `None` means take the table.
    pub fn select_defense(&mut self, hand: &Hand, attack: Card, ctx: &DecisionContext<'_>) -> Option<Card> {
        let legal = valid_defense_cards(hand, attack, ctx.trump);
        if legal.is_empty() {
            log_decision(self.difficulty, Phase::Defend, &legal, None, "no_legal_defense");
            return None;
        }
        let solved = self.solve_endgame(ctx, Phase::Defend);

        let (choice, reason) = match self.difficulty {
            Difficulty::Easy => easy::defense(&mut self.rng, &self.params, &legal),
            Difficulty::Medium => medium::defense(&mut self.rng, &self.params, &legal, ctx.trump),
            Difficulty::Hard => hard::defense(&self.params, hand, attack, &legal, ctx),
            Difficulty::Expert => {
                let inputs = ExpertInputs {
                    params: &self.params,
                    tactics: &self.tactics,
                    knowledge: &self.knowledge,
                };
                expert::defense(&inputs, &mut self.rng, solved, hand, attack, &legal, ctx)
            }
        };

        debug_assert!(choice.is_none_or(|card| legal.contains(&card)));
        log_decision(self.difficulty, Phase::Defend, &legal, choice, reason);
        choice
    }

    /// Gate plus tier-specific appetite for piling on another card.
    pub fn should_continue_attacking(
        &mut self,
        hand: &Hand,
        board: &Board,
        defender_hand_size: usize,
        ctx: &DecisionContext<'_>,
    ) -> bool {
        let solved = self.solve_endgame(ctx, Phase::Attack);
        self.continue_with(hand, board, defender_hand_size, ctx, solved)
    }

    fn continue_with(
        &mut self,
        hand: &Hand,
        board: &Board,
        defender_hand_size: usize,
        ctx: &DecisionContext<'_>,
        solved: Solved,
    ) -> bool {
        let legal = valid_attack_cards(hand, board);
        if legal.is_empty()
            || !board.all_defended()
            || board.undefended_count() >= defender_hand_size
        {
            return false;
        }

        let params = self.params;
        let has_cheap = |threshold: f64| {
            legal
                .iter()
                .any(|&card| keep_value(card, ctx.trump, hand, &params) < threshold)
        };

        match self.difficulty {
            Difficulty::Easy => self.rng.gen_bool(params.continue_easy),
            Difficulty::Medium => {
                has_cheap(params.medium_cheap_value) && self.rng.gen_bool(params.continue_medium)
            }
            Difficulty::Hard => {
                has_cheap(params.strong_cheap_value) && self.rng.gen_bool(params.continue_hard)
            }
            Difficulty::Expert => {
                if let Some(choice) = solved {
                    return choice.is_some();
                }
                if hand.len() <= 2 && defender_hand_size <= 2 {
                    return true;
                }
                if ctx.deck_remaining <= params.expert_pressure_deck {
                    return board.len() < defender_hand_size.min(5);
                }
                if !has_cheap(params.strong_cheap_value) {
                    return false;
                }
                let strength = ctx.estimator.estimate_opponent_strength(defender_hand_size);
                strength <= params.expert_weak_opponent || self.rng.gen_bool(params.continue_expert)
            }
        }
    }

    /// Move for whoever is to act in `state`. Always a member of
    /// `state.legal_moves()` or `None` (pass / take).
    pub fn decide(&mut self, state: &MatchState) -> Option<Card> {
        if state.is_over() {
            return None;
        }
        let seat = state.actor();
        let legal = state.legal_moves();
        let ctx = DecisionContext::from_state(state, seat);
        let hand = state.hand(seat);
        let board = state.board();

        let choice = match state.phase() {
            Phase::Attack if legal.is_empty() => None,
            Phase::Attack => {
                let solved = self.solve_endgame(&ctx, Phase::Attack);
                let defender_hand = state.hand(state.defender()).len();
                if board.is_empty() || self.continue_with(hand, board, defender_hand, &ctx, solved) {
                    self.attack_with(hand, board, &ctx, solved)
                } else {
                    None
                }
            }
            Phase::Defend => board
                .first_undefended()
                .and_then(|attack| self.select_defense(hand, attack, &ctx)),
        };

        debug_assert!(choice.is_none_or(|card| legal.contains(&card)));
        choice.filter(|card| legal.contains(card))
    }
}

fn log_decision(
    difficulty: Difficulty,
    phase: Phase,
    legal: &[Card],
    chosen: Option<Card>,
    reason: &str,
) {
    if !tracing::enabled!(Level::DEBUG) {
        return;
    }

    let legal_preview = if legal.len() <= 6 {
        legal
            .iter()
            .map(|card| card.to_string())
            .collect::<Vec<_>>()
            .join(",")
    } else {
        format!("{} moves", legal.len())
    };
    let chosen = chosen.map_or_else(|| "none".to_string(), |card| card.to_string());

    event!(
        target: "durak_bot::decision",
        Level::DEBUG,
        difficulty = difficulty.as_str(),
        phase = phase.as_str(),
        legal_count = legal.len(),
        legal_moves = %legal_preview,
        chosen = %chosen,
        reason,
    );
}
