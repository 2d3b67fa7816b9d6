mod seating;

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use durak_bot::{
    DecisionEngine, KnowledgeStore, KnowledgeView, MatchReport, MatchRunner, RetryPolicy, Tactic,
    TacticAdapter, TacticLearner, TacticStore, commit_plan, load_sources,
};
use durak_core::game::match_state::{MatchError, MatchState};
use rand::{RngCore, SeedableRng, rngs::StdRng};
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::{Level, event, warn};

use crate::analytics::{AnalyticsCollector, AnalyticsError};
use crate::config::{BenchmarkConfig, ResolvedOutputs};
use crate::store::JsonFileStore;

use seating::SeatRotation;

/// Primary entry point for orchestrating tournaments.
pub struct TournamentRunner {
    config: BenchmarkConfig,
    outputs: ResolvedOutputs,
    seating: SeatRotation,
    store: Option<JsonFileStore>,
    logging_enabled: bool,
}

/// Summary details returned after a run.
#[derive(Debug)]
pub struct RunSummary {
    pub matches_played: usize,
    pub capped_matches: usize,
    pub rows_written: usize,
    pub jsonl_path: PathBuf,
    pub summary_path: PathBuf,
    pub learning: Option<LearningSummary>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LearningSummary {
    pub tactic_writes: usize,
    pub knowledge_records: usize,
}

/// One played match together with who sat where.
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    pub match_index: usize,
    pub match_seed: u64,
    /// Agent index per seat.
    pub seating: Vec<usize>,
    pub report: MatchReport,
}

impl MatchOutcome {
    pub fn match_id(&self) -> String {
        format!("M{:05}", self.match_index)
    }

    pub fn seat_of(&self, agent_index: usize) -> Option<usize> {
        self.seating.iter().position(|&agent| agent == agent_index)
    }
}

#[derive(Debug, Serialize)]
struct MatchLogRow {
    run_id: String,
    match_id: String,
    match_index: usize,
    match_seed: u64,
    seat: usize,
    agent: String,
    difficulty: &'static str,
    players: usize,
    loser: Option<usize>,
    won: bool,
    finished: bool,
    capped: bool,
    moves: u32,
    decisions: usize,
}

impl TournamentRunner {
    /// Build a runner from a validated configuration.
    pub fn new(config: BenchmarkConfig, outputs: ResolvedOutputs) -> Result<Self, RunnerError> {
        if config.agents.len() != config.matches.players {
            return Err(RunnerError::SeatCount {
                players: config.matches.players,
                agents: config.agents.len(),
            });
        }
        if config.learning.enabled && outputs.store_dir.is_none() {
            return Err(RunnerError::MissingStore);
        }

        let store = outputs.store_dir.clone().map(JsonFileStore::new);
        Ok(Self {
            seating: SeatRotation::new(config.agents.len(), config.matches.rotate_seats),
            logging_enabled: config.logging.enable_structured,
            config,
            outputs,
            store,
        })
    }

    /// Execute the tournament, streaming JSONL rows to disk. Matches are
    /// played in parallel; rows and statistics follow match order.
    pub async fn run(&self) -> Result<RunSummary, RunnerError> {
        ensure_parent(self.outputs.jsonl.parent())?;
        ensure_parent(self.outputs.summary_md.parent())?;

        let (tactics, knowledge) = match self.store.as_ref() {
            Some(store) => load_sources(store, store).await,
            None => (TacticAdapter::empty(), KnowledgeView::empty()),
        };

        let outcomes =
            tokio::task::block_in_place(|| self.play_all(&tactics, &knowledge))?;

        let mut writer = BufWriter::new(File::create(&self.outputs.jsonl)?);
        let mut rows_written = 0usize;
        let mut analytics = AnalyticsCollector::new(&self.config);
        for outcome in &outcomes {
            analytics.record_match(outcome)?;
            rows_written += write_match_rows(&mut writer, &self.config, outcome)?;
        }
        writer.flush()?;

        let summary = analytics.finalize();
        summary.write_markdown(&self.outputs.summary_md)?;

        let learning = match (self.config.learning.enabled, self.store.as_ref()) {
            (true, Some(store)) => Some(self.persist_learning(store, &outcomes).await),
            _ => None,
        };

        Ok(RunSummary {
            matches_played: outcomes.len(),
            capped_matches: outcomes.iter().filter(|o| o.report.capped).count(),
            rows_written,
            jsonl_path: self.outputs.jsonl.clone(),
            summary_path: self.outputs.summary_md.clone(),
            learning,
        })
    }

    fn play_all(
        &self,
        tactics: &TacticAdapter,
        knowledge: &KnowledgeView,
    ) -> Result<Vec<MatchOutcome>, RunnerError> {
        let mut rng = StdRng::seed_from_u64(self.config.matches.seed.unwrap_or(0));
        let seeds: Vec<u64> = (0..self.config.matches.count)
            .map(|_| rng.next_u64())
            .collect();

        seeds
            .par_iter()
            .enumerate()
            .map(|(match_index, &match_seed)| {
                self.play_match(match_index, match_seed, tactics, knowledge)
            })
            .collect()
    }

    fn play_match(
        &self,
        match_index: usize,
        match_seed: u64,
        tactics: &TacticAdapter,
        knowledge: &KnowledgeView,
    ) -> Result<MatchOutcome, RunnerError> {
        let seating = self.seating.for_match(match_index);
        let state = MatchState::with_seed(self.config.matches.players, match_seed)?;

        let mut engines: Vec<DecisionEngine<StdRng>> = seating
            .iter()
            .enumerate()
            .map(|(seat, &agent_index)| {
                let agent = &self.config.agents[agent_index];
                DecisionEngine::with_sources(
                    agent.difficulty,
                    agent.decision_params(),
                    StdRng::seed_from_u64(engine_seed(match_seed, seat)),
                    tactics.clone(),
                    knowledge.clone(),
                )
            })
            .collect();

        let report = MatchRunner::play(state, &mut engines, self.config.matches.move_cap)?;

        if self.logging_enabled && tracing::enabled!(Level::INFO) {
            let loser = report
                .loser
                .map(|seat| self.config.agents[seating[seat]].name.as_str());
            event!(
                target: "durak_bench::match",
                Level::INFO,
                run_id = %self.config.run_id,
                match_index = match_index as u32,
                match_seed,
                loser = loser.unwrap_or("-"),
                moves = report.moves,
                capped = report.capped,
                "match complete"
            );
        }

        Ok(MatchOutcome {
            match_index,
            match_seed,
            seating,
            report,
        })
    }

    /// Feeds the learner agent's results into the tactic library, then logs
    /// every recorded decision as knowledge. Store failures are logged and
    /// skipped.
    async fn persist_learning(
        &self,
        store: &JsonFileStore,
        outcomes: &[MatchOutcome],
    ) -> LearningSummary {
        let retry = self.config.learning.retry_policy();
        let learner_index = self
            .config
            .learning
            .learner
            .as_ref()
            .and_then(|name| self.config.agents.iter().position(|a| &a.name == name));

        let mut summary = LearningSummary::default();
        if let Some(agent_index) = learner_index {
            let mut library = list_library(store, &retry).await;
            for outcome in outcomes {
                let Some(seat) = outcome.seat_of(agent_index) else {
                    continue;
                };
                let plan = TacticLearner::new(seat).observe_match(&outcome.report, &library);
                if plan.is_empty() {
                    continue;
                }
                summary.tactic_writes += commit_plan(&plan, store, &retry).await;
                library = list_library(store, &retry).await;
            }
        }

        for outcome in outcomes {
            let game_id = format!("{}-{}", self.config.run_id, outcome.match_id());
            let records = outcome.report.knowledge_records(&game_id);
            if records.is_empty() {
                continue;
            }
            let appended = retry
                .with_retry("append_records", || store.append_records(&records))
                .await;
            if appended.is_some() {
                summary.knowledge_records += records.len();
            }
        }

        event!(
            target: "durak_bench::learning",
            Level::INFO,
            tactic_writes = summary.tactic_writes,
            knowledge_records = summary.knowledge_records,
            "learning persisted"
        );
        summary
    }
}

async fn list_library(store: &JsonFileStore, retry: &RetryPolicy) -> Vec<Tactic> {
    match retry
        .with_retry("list_tactics", || store.list_tactics())
        .await
    {
        Some(library) => library,
        None => {
            warn!(target: "durak_bench::learning", "tactic library unreadable; learning against an empty library");
            Vec::new()
        }
    }
}

fn engine_seed(match_seed: u64, seat: usize) -> u64 {
    match_seed ^ ((seat as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

fn ensure_parent(path: Option<&Path>) -> Result<(), RunnerError> {
    if let Some(dir) = path.filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

fn write_match_rows(
    writer: &mut BufWriter<File>,
    config: &BenchmarkConfig,
    outcome: &MatchOutcome,
) -> Result<usize, RunnerError> {
    let match_id = outcome.match_id();
    let report = &outcome.report;

    let mut rows_written = 0usize;
    for (seat, &agent_index) in outcome.seating.iter().enumerate() {
        let agent = &config.agents[agent_index];
        let row = MatchLogRow {
            run_id: config.run_id.clone(),
            match_id: match_id.clone(),
            match_index: outcome.match_index,
            match_seed: outcome.match_seed,
            seat,
            agent: agent.name.clone(),
            difficulty: agent.difficulty.as_str(),
            players: report.player_count,
            loser: report.loser,
            won: report.seat_won(seat),
            finished: report.finished,
            capped: report.capped,
            moves: report.moves,
            decisions: report.decisions.iter().filter(|d| d.seat == seat).count(),
        };

        serde_json::to_writer(&mut *writer, &row)?;
        writer.write_all(b"\n")?;
        rows_written += 1;
    }

    Ok(rows_written)
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
    #[error("failed to serialize log row: {source}")]
    Serialize {
        #[from]
        source: serde_json::Error,
    },
    #[error("match setup failed: {0}")]
    Setup(#[from] MatchError),
    #[error("match execution failed: {0}")]
    Match(#[from] durak_bot::RunnerError),
    #[error("{players} players configured but {agents} agents supplied")]
    SeatCount { players: usize, agents: usize },
    #[error("learning is enabled but outputs.store_dir is not set")]
    MissingStore,
    #[error("analytics error: {0}")]
    Analytics(#[from] AnalyticsError),
}
