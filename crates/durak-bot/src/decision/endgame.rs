// Endgame solver
//
// Once the pile is empty every unseen card sits in the single opponent's
// hand, so the position is fully known. Minimax over cloned match states
// with a memo on the table position; depth and node caps fall back to the
// static evaluator.

use super::DecisionParams;
use crate::evaluator::PositionEvaluator;
use durak_core::game::match_state::MatchState;
use durak_core::model::card::Card;
use durak_core::model::hand::Hand;
use durak_core::model::table::{Board, Phase};
use std::collections::HashMap;

const WIN: f64 = 1000.0;
const AHEAD_RANK_BONUS: f64 = 0.001;
const TRUMP_SPEND_PENALTY: f64 = 0.005;

#[derive(Hash, Eq, PartialEq, Clone, Debug)]
struct Position {
    hands: Vec<Hand>,
    board: Board,
    attacker: usize,
    defender: usize,
    phase: Phase,
}

impl Position {
    fn of(state: &MatchState) -> Self {
        Self {
            hands: state.hands().to_vec(),
            board: state.board().clone(),
            attacker: state.attacker(),
            defender: state.defender(),
            phase: state.phase(),
        }
    }
}

#[derive(Clone, Copy)]
struct Score {
    value: f64,
    exact: bool,
}

pub struct EndgameSolver<'a> {
    root: &'a MatchState,
    seat: usize,
    opponent: usize,
    params: &'a DecisionParams,
    evaluator: &'a PositionEvaluator,
    memo: HashMap<Position, f64>,
    nodes_evaluated: usize,
}

impl<'a> EndgameSolver<'a> {
    /// Solver for `seat`, if the position qualifies: pile exhausted, exactly
    /// two hands still holding cards, `seat` to move, few enough cards left.
    pub fn for_seat(
        state: &'a MatchState,
        seat: usize,
        params: &'a DecisionParams,
        evaluator: &'a PositionEvaluator,
    ) -> Option<Self> {
        if state.is_over() || !state.deck().is_empty() || state.actor() != seat {
            return None;
        }
        let active: Vec<usize> = state
            .hands()
            .iter()
            .enumerate()
            .filter(|(_, hand)| !hand.is_empty())
            .map(|(idx, _)| idx)
            .collect();
        if active.len() > 2 {
            return None;
        }
        let opponent = state.opponent_of(seat);
        let total = state.hand(seat).len() + state.hand(opponent).len();
        if total > params.endgame_card_threshold {
            return None;
        }
        Some(Self {
            root: state,
            seat,
            opponent,
            params,
            evaluator,
            memo: HashMap::new(),
            nodes_evaluated: 0,
        })
    }

    pub fn nodes_evaluated(&self) -> usize {
        self.nodes_evaluated
    }

    /// Best root move; `None` means pass or take.
    pub fn best_move(&mut self) -> Option<Card> {
        let root = self.root;
        let own = root.hand(self.seat).len();
        let theirs = root.hand(self.opponent).len();
        let trump = root.trump_suit();

        let mut best: Option<(Option<Card>, f64)> = None;
        for mv in candidates(root) {
            let mut child = root.clone();
            if child.apply_move(mv).is_err() {
                continue;
            }
            let mut value = self.search(&child, 1).value;
            if let Some(card) = mv {
                if own < theirs {
                    value += AHEAD_RANK_BONUS * f64::from(card.rank.value());
                }
                if card.suit == trump && own <= theirs {
                    value -= TRUMP_SPEND_PENALTY;
                }
            }
            if best.is_none_or(|(_, top)| value > top) {
                best = Some((mv, value));
            }
        }
        best.and_then(|(mv, _)| mv)
    }

    fn search(&mut self, state: &MatchState, depth: usize) -> Score {
        self.nodes_evaluated += 1;

        if state.is_over() {
            let value = match state.termination().loser() {
                Some(loser) if loser == self.seat => -WIN,
                Some(_) => WIN,
                None => 0.0,
            };
            return Score { value, exact: true };
        }

        let key = Position::of(state);
        if let Some(&value) = self.memo.get(&key) {
            return Score { value, exact: true };
        }

        if depth >= self.params.endgame_max_depth
            || self.nodes_evaluated >= self.params.endgame_node_budget
        {
            return Score {
                value: self.leaf(state),
                exact: false,
            };
        }

        let maximizing = state.actor() == self.seat;
        let mut best: Option<Score> = None;
        let mut exact = true;
        for mv in candidates(state) {
            let mut child = state.clone();
            if child.apply_move(mv).is_err() {
                continue;
            }
            let score = self.search(&child, depth + 1);
            exact &= score.exact;
            let better = best.is_none_or(|top| {
                if maximizing {
                    score.value > top.value
                } else {
                    score.value < top.value
                }
            });
            if better {
                best = Some(score);
            }
        }

        let Some(best) = best else {
            return Score {
                value: self.leaf(state),
                exact: false,
            };
        };
        if exact {
            self.memo.insert(key, best.value);
        }
        Score {
            value: best.value,
            exact,
        }
    }

    fn leaf(&self, state: &MatchState) -> f64 {
        let trump = state.trump_suit();
        let own = state.hand(self.seat);
        let theirs = state.hand(self.opponent);
        self.evaluator.evaluate(own, theirs.len(), trump, 0)
            - self.evaluator.evaluate(theirs, own.len(), trump, 0)
    }
}

/// Legal cards plus the pass/take option where it makes sense. An attacker
/// only passes once something is on the table.
fn candidates(state: &MatchState) -> Vec<Option<Card>> {
    let legal = state.legal_moves();
    let allow_none = match state.phase() {
        Phase::Defend => true,
        Phase::Attack => !state.board().is_empty() || legal.is_empty(),
    };
    let mut moves: Vec<Option<Card>> = legal.into_iter().map(Some).collect();
    if allow_none {
        moves.push(None);
    }
    moves
}
