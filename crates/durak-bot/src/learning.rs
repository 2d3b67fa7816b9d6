use crate::runner::MatchReport;
use crate::store::{RetryPolicy, TacticStore};
use crate::tactics::{ActionKind, CardPreference, Scenario, Tactic, TacticAction, similarity};
use durak_core::model::table::Phase;
use tracing::{Level, event};

/// Library size above which no new tactics are created.
pub const LIBRARY_CAP: usize = 50;
const SIMILARITY_THRESHOLD: f64 = 0.7;
const CONFIDENCE_GAIN: f64 = 0.12;
const CONFIDENCE_LOSS: f64 = 0.08;
const CONFIDENCE_MIN: f64 = 0.01;
const CONFIDENCE_MAX: f64 = 0.99;
const INITIAL_CONFIDENCE: f64 = 0.3;
const OPENING_MOVES: u32 = 3;
const MIDGAME_MOVES: u32 = 8;

/// Store writes derived from one finished match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LearningPlan {
    pub updates: Vec<Tactic>,
    pub created: Option<Tactic>,
}

impl LearningPlan {
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.created.is_none()
    }
}

/// Turns match outcomes into tactic library changes for one seat.
#[derive(Debug, Clone, Copy)]
pub struct TacticLearner {
    seat: usize,
}

impl TacticLearner {
    pub fn new(seat: usize) -> Self {
        Self { seat }
    }

    pub fn seat(&self) -> usize {
        self.seat
    }

    /// Opening, midgame and endgame tactics describing how the match went.
    /// Short matches only yield the phases they reached.
    pub fn candidates(won: bool, move_count: u32) -> Vec<Tactic> {
        let mut out = Vec::with_capacity(3);
        if move_count >= OPENING_MOVES {
            out.push(if won {
                fresh("Winning Opening", (6, 30, Phase::Attack), ActionKind::AggressiveStart, CardPreference::LowCards, 0.8, won)
            } else {
                fresh("Failed Opening", (6, 30, Phase::Attack), ActionKind::DefensiveStart, CardPreference::MediumCards, 0.4, won)
            });
        }
        if move_count >= MIDGAME_MOVES {
            out.push(if won {
                fresh("Midgame Pressure", (4, 15, Phase::Attack), ActionKind::MultiAttack, CardPreference::Duplicates, 0.9, won)
            } else {
                fresh("Midgame Defense", (4, 15, Phase::Attack), ActionKind::Conservative, CardPreference::Singles, 0.3, won)
            });
        }
        out.push(if won {
            fresh("Endgame Domination", (2, 0, Phase::Attack), ActionKind::TrumpFinish, CardPreference::HighTrumps, 1.0, won)
        } else {
            fresh("Endgame Struggle", (2, 0, Phase::Defend), ActionKind::DesperateDefense, CardPreference::AnyValid, 0.2, won)
        });
        out
    }

    /// `existing` after one more use with the given result.
    pub fn apply_outcome(existing: &Tactic, won: bool) -> Tactic {
        let times_used = existing.times_used + 1;
        let times_won = existing.times_won + u32::from(won);
        let delta = if won { CONFIDENCE_GAIN } else { -CONFIDENCE_LOSS };
        Tactic {
            times_used,
            times_won,
            success_rate: f64::from(times_won) / f64::from(times_used),
            confidence: (existing.confidence + delta).clamp(CONFIDENCE_MIN, CONFIDENCE_MAX),
            ..existing.clone()
        }
    }

    /// Each candidate updates the first sufficiently similar tactic. The
    /// first candidate without a match is created, at most one per match and
    /// only while the library is under [`LIBRARY_CAP`].
    pub fn observe_match(&self, report: &MatchReport, library: &[Tactic]) -> LearningPlan {
        let mut plan = LearningPlan::default();
        if !report.finished {
            return plan;
        }
        let won = report.seat_won(self.seat);

        for candidate in Self::candidates(won, report.moves) {
            let similar = library
                .iter()
                .find(|existing| similarity(existing, &candidate) > SIMILARITY_THRESHOLD);

            match similar {
                Some(existing) => {
                    let current = plan
                        .updates
                        .iter()
                        .position(|pending| pending.id == existing.id);
                    match current {
                        Some(idx) => {
                            plan.updates[idx] = Self::apply_outcome(&plan.updates[idx], won);
                        }
                        None => plan.updates.push(Self::apply_outcome(existing, won)),
                    }
                }
                None if library.len() < LIBRARY_CAP => {
                    plan.created = Some(candidate);
                    break;
                }
                None => {}
            }
        }
        plan
    }
}

fn fresh(
    name: &str,
    (hand_size, deck_remaining, phase): (usize, usize, Phase),
    kind: ActionKind,
    card_preference: CardPreference,
    aggression_level: f64,
    won: bool,
) -> Tactic {
    Tactic {
        id: 0,
        name: name.to_string(),
        scenario: Scenario {
            hand_size,
            opponent_hand_size: hand_size,
            deck_remaining,
            phase,
        },
        action: TacticAction {
            kind,
            card_preference,
            aggression_level,
        },
        success_rate: if won { 0.6 } else { 0.4 },
        confidence: INITIAL_CONFIDENCE,
        times_used: 1,
        times_won: u32::from(won),
    }
}

/// Writes `plan` through `store`, retrying each write. Returns how many
/// writes landed.
pub async fn commit_plan(plan: &LearningPlan, store: &dyn TacticStore, retry: &RetryPolicy) -> usize {
    let mut written = 0;
    for tactic in &plan.updates {
        if retry
            .with_retry("update_tactic", || store.update_tactic(tactic))
            .await
            .is_some()
        {
            written += 1;
        }
    }
    if let Some(tactic) = &plan.created {
        if let Some(id) = retry
            .with_retry("create_tactic", || store.create_tactic(tactic.clone()))
            .await
        {
            event!(target: "durak_bot::learning", Level::INFO, id, name = %tactic.name, "tactic created");
            written += 1;
        }
    }
    written
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    fn report(loser: Option<usize>, moves: u32) -> MatchReport {
        MatchReport {
            seed: 0,
            player_count: 2,
            loser,
            finished: true,
            moves,
            capped: false,
            decisions: Vec::new(),
        }
    }

    #[test]
    fn candidates_depend_on_match_length() {
        assert_eq!(TacticLearner::candidates(true, 2).len(), 1);
        assert_eq!(TacticLearner::candidates(true, 5).len(), 2);
        let long = TacticLearner::candidates(false, 12);
        assert_eq!(long.len(), 3);
        assert_eq!(long[2].name, "Endgame Struggle");
        assert_eq!(long[2].scenario.phase, Phase::Defend);
    }

    #[test]
    fn outcome_updates_rates_and_clamps_confidence() {
        let base = TacticLearner::candidates(true, 0).remove(0);
        let won = TacticLearner::apply_outcome(&base, true);
        assert_eq!(won.times_used, 2);
        assert_eq!(won.times_won, 2);
        assert!((won.success_rate - 1.0).abs() < 1e-9);
        assert!((won.confidence - 0.42).abs() < 1e-9);

        let lost = TacticLearner::apply_outcome(&won, false);
        assert!((lost.success_rate - 2.0 / 3.0).abs() < 1e-9);
        assert!((lost.confidence - 0.34).abs() < 1e-9);

        let mut sure = base.clone();
        sure.confidence = 0.95;
        assert_eq!(TacticLearner::apply_outcome(&sure, true).confidence, 0.99);
        sure.confidence = 0.05;
        assert_eq!(TacticLearner::apply_outcome(&sure, false).confidence, 0.01);
    }

    #[test]
    fn empty_library_gets_exactly_one_new_tactic() {
        let plan = TacticLearner::new(0).observe_match(&report(Some(1), 20), &[]);
        assert!(plan.updates.is_empty());
        assert_eq!(plan.created.map(|t| t.name), Some("Winning Opening".to_string()));
    }

    #[test]
    fn similar_tactics_are_updated_instead_of_duplicated() {
        let mut library = TacticLearner::candidates(true, 20);
        for (idx, tactic) in library.iter_mut().enumerate() {
            tactic.id = idx as u64 + 1;
        }
        let plan = TacticLearner::new(0).observe_match(&report(Some(1), 20), &library);
        assert!(plan.created.is_none());
        assert_eq!(plan.updates.len(), 3);
        assert!(plan.updates.iter().all(|t| t.times_used == 2));
    }

    #[test]
    fn full_library_blocks_creation() {
        let mut filler = TacticLearner::candidates(false, 0).remove(0);
        filler.name = "Filler".to_string();
        filler.scenario.phase = Phase::Defend;
        filler.action.kind = ActionKind::Conservative;
        filler.scenario.hand_size = 30;
        filler.scenario.deck_remaining = 100;
        let library = vec![filler; LIBRARY_CAP];
        let plan = TacticLearner::new(0).observe_match(&report(Some(1), 20), &library);
        assert!(plan.is_empty());
    }

    #[test]
    fn capped_matches_teach_nothing() {
        let mut capped = report(None, 500);
        capped.finished = false;
        capped.capped = true;
        assert!(TacticLearner::new(0).observe_match(&capped, &[]).is_empty());
    }

    #[tokio::test]
    async fn commit_writes_through_the_store() {
        let store = InMemoryStore::new();
        let plan = TacticLearner::new(0).observe_match(&report(Some(1), 20), &[]);
        assert_eq!(commit_plan(&plan, &store, &RetryPolicy::default()).await, 1);
        let listed = store.list_tactics().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, 1);
    }
}
