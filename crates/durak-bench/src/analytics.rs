use std::fs;
use std::path::Path;

use durak_bot::Difficulty;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};
use thiserror::Error;

use crate::config::BenchmarkConfig;
use crate::tournament::MatchOutcome;

const CONFIDENCE_LEVEL: f64 = 0.95;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("match {match_id} seats agent index {agent_index}, which is not configured")]
    UnknownAgent { match_id: String, agent_index: usize },
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Per-agent win/loss tallies across a run.
pub struct AnalyticsCollector {
    agents: Vec<AgentAccumulator>,
    capped_matches: usize,
    total_moves: u64,
    matches: usize,
}

impl AnalyticsCollector {
    pub fn new(config: &BenchmarkConfig) -> Self {
        Self {
            agents: config
                .agents
                .iter()
                .map(|agent| AgentAccumulator::new(agent.name.clone(), agent.difficulty))
                .collect(),
            capped_matches: 0,
            total_moves: 0,
            matches: 0,
        }
    }

    pub fn record_match(&mut self, outcome: &MatchOutcome) -> Result<(), AnalyticsError> {
        let report = &outcome.report;
        for (seat, &agent_index) in outcome.seating.iter().enumerate() {
            let acc = self
                .agents
                .get_mut(agent_index)
                .ok_or_else(|| AnalyticsError::UnknownAgent {
                    match_id: outcome.match_id(),
                    agent_index,
                })?;
            acc.matches += 1;
            if report.capped {
                acc.capped += 1;
            } else if report.seat_won(seat) {
                acc.wins += 1;
            } else if report.loser == Some(seat) {
                acc.losses += 1;
            } else {
                acc.draws += 1;
            }
        }

        self.matches += 1;
        self.total_moves += u64::from(report.moves);
        if report.capped {
            self.capped_matches += 1;
        }
        Ok(())
    }

    pub fn finalize(self) -> AnalyticsSummary {
        let z = confidence_z(CONFIDENCE_LEVEL);
        let avg_moves = if self.matches == 0 {
            0.0
        } else {
            self.total_moves as f64 / self.matches as f64
        };
        AnalyticsSummary {
            agents: self
                .agents
                .into_iter()
                .map(|acc| acc.into_report(z))
                .collect(),
            matches: self.matches,
            capped_matches: self.capped_matches,
            avg_moves,
        }
    }
}

struct AgentAccumulator {
    name: String,
    difficulty: Difficulty,
    matches: usize,
    wins: usize,
    losses: usize,
    draws: usize,
    capped: usize,
}

impl AgentAccumulator {
    fn new(name: String, difficulty: Difficulty) -> Self {
        Self {
            name,
            difficulty,
            matches: 0,
            wins: 0,
            losses: 0,
            draws: 0,
            capped: 0,
        }
    }

    fn into_report(self, z: f64) -> AgentReport {
        // Capped matches have no result and stay out of the rate.
        let decided = self.matches - self.capped;
        let win_rate = if decided == 0 {
            0.0
        } else {
            self.wins as f64 / decided as f64
        };
        AgentReport {
            ci95: wilson_interval(self.wins, decided, z),
            name: self.name,
            difficulty: self.difficulty,
            matches: self.matches,
            wins: self.wins,
            losses: self.losses,
            draws: self.draws,
            capped: self.capped,
            win_rate,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AnalyticsSummary {
    pub agents: Vec<AgentReport>,
    pub matches: usize,
    pub capped_matches: usize,
    pub avg_moves: f64,
}

#[derive(Debug, Serialize)]
pub struct AgentReport {
    pub name: String,
    pub difficulty: Difficulty,
    pub matches: usize,
    pub wins: usize,
    pub losses: usize,
    pub draws: usize,
    pub capped: usize,
    pub win_rate: f64,
    pub ci95: (f64, f64),
}

impl AnalyticsSummary {
    pub fn write_markdown(&self, path: impl AsRef<Path>) -> Result<(), AnalyticsError> {
        let mut rows = String::new();
        rows.push_str("# Tournament Summary\n\n");
        rows.push_str(&format!(
            "Matches: {} ({} capped), average {:.1} moves per match\n\n",
            self.matches, self.capped_matches, self.avg_moves
        ));
        rows.push_str("| Agent | Difficulty | Matches | Wins | Losses | Draws | Capped | Win % | 95% CI |\n");
        rows.push_str("|-------|------------|---------|------|--------|-------|--------|-------|--------|\n");

        for agent in &self.agents {
            rows.push_str(&format!(
                "| {name} | {difficulty} | {matches} | {wins} | {losses} | {draws} | {capped} | {win:.1}% | [{ci_low:.1}%, {ci_high:.1}%] |\n",
                name = agent.name,
                difficulty = agent.difficulty,
                matches = agent.matches,
                wins = agent.wins,
                losses = agent.losses,
                draws = agent.draws,
                capped = agent.capped,
                win = agent.win_rate * 100.0,
                ci_low = agent.ci95.0 * 100.0,
                ci_high = agent.ci95.1 * 100.0,
            ));
        }

        fs::write(path.as_ref(), rows).map_err(|e| AnalyticsError::Io {
            context: "writing summary markdown",
            source: e,
        })?;
        Ok(())
    }
}

fn confidence_z(level: f64) -> f64 {
    Normal::new(0.0, 1.0)
        .map(|normal| normal.inverse_cdf(0.5 + level / 2.0))
        .unwrap_or(1.96)
}

/// Wilson score interval for `wins` out of `trials`.
fn wilson_interval(wins: usize, trials: usize, z: f64) -> (f64, f64) {
    if trials == 0 {
        return (0.0, 0.0);
    }
    let n = trials as f64;
    let p = wins as f64 / n;
    let z2 = z * z;
    let denom = 1.0 + z2 / n;
    let centre = (p + z2 / (2.0 * n)) / denom;
    let margin = z * (p * (1.0 - p) / n + z2 / (4.0 * n * n)).sqrt() / denom;
    ((centre - margin).max(0.0), (centre + margin).min(1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ninety_five_percent_z_matches_the_table() {
        assert!((confidence_z(0.95) - 1.959964).abs() < 1e-4);
    }

    #[test]
    fn wilson_interval_brackets_the_rate() {
        let (low, high) = wilson_interval(30, 50, 1.96);
        assert!(low < 0.6 && 0.6 < high);
        assert!(low > 0.45 && high < 0.75);
    }

    #[test]
    fn wilson_interval_stays_in_unit_range() {
        let (low, high) = wilson_interval(10, 10, 1.96);
        assert!(high <= 1.0);
        assert!(low > 0.6);
        assert_eq!(wilson_interval(0, 0, 1.96), (0.0, 0.0));
        assert_eq!(wilson_interval(0, 5, 1.96).0, 0.0);
    }

    #[test]
    fn capped_matches_are_excluded_from_the_rate() {
        let acc = AgentAccumulator {
            name: "a".to_string(),
            difficulty: Difficulty::Hard,
            matches: 4,
            wins: 2,
            losses: 1,
            draws: 0,
            capped: 1,
        };
        let report = acc.into_report(1.96);
        assert!((report.win_rate - 2.0 / 3.0).abs() < 1e-9);
    }
}
