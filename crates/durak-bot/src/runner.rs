use crate::decision::DecisionEngine;
use crate::knowledge::{DecisionKind, KnowledgeRecord};
use durak_core::game::match_state::{MatchState, MoveError};
use durak_core::game::serialization::BoardSnapshot;
use durak_core::model::card::Card;
use durak_core::model::table::Phase;
use rand::Rng;
use serde::Serialize;
use thiserror::Error;
use tracing::{Level, event};

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("match has {expected} seats but {actual} engines were supplied")]
    SeatCount { expected: usize, actual: usize },
    #[error(transparent)]
    Move(#[from] MoveError),
}

/// One move the runner asked an engine for. Passes are not recorded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionRecord {
    pub seat: usize,
    pub move_number: u32,
    pub phase: Phase,
    pub card: Option<Card>,
    pub hand_size: usize,
    pub deck_remaining: usize,
    pub decision: DecisionKind,
    pub board: BoardSnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchReport {
    pub seed: u64,
    pub player_count: usize,
    pub loser: Option<usize>,
    pub finished: bool,
    pub moves: u32,
    /// Stopped by the move cap rather than by the rules.
    pub capped: bool,
    pub decisions: Vec<DecisionRecord>,
}

const WIN_REWARD_BASE: f64 = 0.5;
const LOSS_REWARD: f64 = -0.5;

impl MatchReport {
    /// Whether `seat` got rid of its cards. Draws and capped matches count
    /// as neither.
    pub fn seat_won(&self, seat: usize) -> bool {
        self.finished && self.loser.is_some_and(|loser| loser != seat)
    }

    /// Decisions turned into knowledge records. Winners' moves are rewarded
    /// more the later they came; losers' moves carry a flat penalty.
    pub fn knowledge_records(&self, game_id: &str) -> Vec<KnowledgeRecord> {
        let total = f64::from(self.moves.max(1));
        self.decisions
            .iter()
            .map(|record| {
                let won = self.seat_won(record.seat);
                let reward = if won {
                    WIN_REWARD_BASE + WIN_REWARD_BASE * f64::from(record.move_number) / total
                } else {
                    LOSS_REWARD
                };
                KnowledgeRecord {
                    game_id: game_id.to_string(),
                    move_number: record.move_number,
                    phase: record.phase,
                    card_played: record.card,
                    hand_size: record.hand_size,
                    decision: record.decision,
                    was_successful: won,
                    reward,
                    board: record.board.clone(),
                }
            })
            .collect()
    }
}

pub struct MatchRunner;

impl MatchRunner {
    /// Plays `state` out with one engine per seat, or until `move_cap` moves
    /// have been applied.
    pub fn play<R: Rng>(
        mut state: MatchState,
        seats: &mut [DecisionEngine<R>],
        move_cap: u32,
    ) -> Result<MatchReport, RunnerError> {
        if seats.len() != state.player_count() {
            return Err(RunnerError::SeatCount {
                expected: state.player_count(),
                actual: seats.len(),
            });
        }

        let mut decisions = Vec::new();
        while !state.is_over() && state.move_count() < move_cap {
            let seat = state.actor();
            let phase = state.phase();
            let choice = seats[seat].decide(&state);

            let decision = match (phase, choice) {
                (Phase::Attack, Some(_)) => Some(DecisionKind::Attack),
                (Phase::Defend, Some(_)) => Some(DecisionKind::Defense),
                (Phase::Defend, None) => Some(DecisionKind::Take),
                (Phase::Attack, None) => None,
            };
            if let Some(decision) = decision {
                decisions.push(DecisionRecord {
                    seat,
                    move_number: state.move_count() + 1,
                    phase,
                    card: choice,
                    hand_size: state.hand(seat).len(),
                    deck_remaining: state.deck().len(),
                    decision,
                    board: BoardSnapshot::capture(state.board()),
                });
            }

            state.apply_move(choice)?;
        }

        let finished = state.is_over();
        let report = MatchReport {
            seed: state.seed(),
            player_count: state.player_count(),
            loser: state.termination().loser(),
            finished,
            moves: state.move_count(),
            capped: !finished,
            decisions,
        };

        if tracing::enabled!(Level::DEBUG) {
            event!(
                target: "durak_bot::runner",
                Level::DEBUG,
                seed = report.seed,
                players = report.player_count,
                loser = ?report.loser,
                moves = report.moves,
                capped = report.capped,
                "match finished"
            );
        }
        Ok(report)
    }
}
