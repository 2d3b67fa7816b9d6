use std::path::PathBuf;

use clap::Parser;

use durak_bench::config::{BenchmarkConfig, ResolvedOutputs};
use durak_bench::logging::init_logging;
use durak_bench::tournament::TournamentRunner;

/// Tournament benchmarking harness for Durak bots.
#[derive(Debug, Parser)]
#[command(
    name = "durak-bench",
    author,
    version,
    about = "Deterministic Durak tournament harness"
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "bench/bench.yaml")]
    config: PathBuf,

    /// Override the run identifier (substitutes {run_id} templates).
    #[arg(long, value_name = "RUN_ID")]
    run_id: Option<String>,

    /// Override the number of matches to play.
    #[arg(long, value_name = "MATCHES")]
    matches: Option<usize>,

    /// Override the RNG seed for match generation.
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Turn tactic learning on for this run (the config must name a learner).
    #[arg(long)]
    learn: bool,

    /// Exit after validating the configuration (no tournament is run).
    #[arg(long)]
    validate_only: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = BenchmarkConfig::from_path(&cli.config)?;

    if let Some(run_id) = cli.run_id {
        config.run_id = run_id;
    }

    if let Some(matches) = cli.matches {
        config.matches.count = matches;
    }

    if let Some(seed) = cli.seed {
        config.matches.seed = Some(seed);
    }

    if cli.learn {
        config.learning.enabled = true;
    }

    config.validate()?;

    let outputs: ResolvedOutputs = config.resolved_outputs();
    let agent_count = config.agents.len();
    let run_id = config.run_id.clone();
    let matches = config.matches.count;

    println!(
        "Loaded configuration '{run_id}' with {agent_count} agents ({matches} matches, {} players)",
        config.matches.players
    );

    let logging_guard = init_logging(&config.logging, &outputs)?;
    let runner = TournamentRunner::new(config, outputs)?;

    if cli.validate_only {
        println!("Validation-only mode: tournament execution skipped.");
        return Ok(());
    }

    let summary = runner.run().await?;
    println!(
        "Tournament complete for '{run_id}': {} matches ({} capped) → {} rows at {}",
        summary.matches_played,
        summary.capped_matches,
        summary.rows_written,
        summary.jsonl_path.display()
    );
    println!("Summary table: {}", summary.summary_path.display());
    if let Some(learning) = summary.learning {
        println!(
            "Learning: {} tactic writes, {} knowledge records",
            learning.tactic_writes, learning.knowledge_records
        );
    }
    if let Some(guard) = logging_guard.as_ref() {
        println!("Telemetry log: {}", guard.telemetry_path.display());
    }

    Ok(())
}
