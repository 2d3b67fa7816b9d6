use std::fs;
use std::path::Path;

use durak_bench::config::BenchmarkConfig;
use durak_bench::store::JsonFileStore;
use durak_bench::tournament::TournamentRunner;
use durak_bot::{KnowledgeStore, TacticStore};
use tempfile::tempdir;

fn load_config(output_dir: &Path, learning: bool) -> BenchmarkConfig {
    let yaml = format!(
        r#"
run_id: "test_smoke"
matches:
  seed: 4242
  count: 6
  players: 3
agents:
  - name: "expert"
    difficulty: "expert"
  - name: "easy"
    difficulty: "easy"
  - name: "normal"
    difficulty: "normal"
outputs:
  jsonl: "{jsonl}"
  summary_md: "{summary}"
  store_dir: "{store}"
learning:
  enabled: {learning}
  learner: "expert"
  retry_base_delay_ms: 1
logging:
  enable_structured: false
"#,
        jsonl = output_dir.join("matches.jsonl").display(),
        summary = output_dir.join("summary.md").display(),
        store = output_dir.join("store").display(),
    );

    let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("valid yaml");
    cfg.validate().expect("config validates");
    cfg
}

async fn run_once(dir: &Path, learning: bool) -> String {
    let config = load_config(dir, learning);
    let outputs = config.resolved_outputs();
    let runner = TournamentRunner::new(config, outputs).expect("runner created");
    let summary = runner.run().await.expect("tournament completes");

    assert_eq!(summary.matches_played, 6);
    assert_eq!(summary.rows_written, 18);
    assert!(summary.summary_path.exists());
    fs::read_to_string(&summary.jsonl_path).expect("read jsonl")
}

#[tokio::test(flavor = "multi_thread")]
async fn same_seed_produces_identical_jsonl() {
    let first_dir = tempdir().expect("temp dir");
    let second_dir = tempdir().expect("temp dir");

    let first = run_once(first_dir.path(), false).await;
    let second = run_once(second_dir.path(), false).await;
    assert_eq!(first, second);

    let rows: Vec<serde_json::Value> = first
        .lines()
        .map(|line| serde_json::from_str(line).expect("row parses"))
        .collect();
    assert_eq!(rows.len(), 18);
    assert_eq!(rows[0]["match_id"], "M00000");
    assert_eq!(rows[0]["agent"], "expert");
    // Seats rotate by one each match.
    assert_eq!(rows[3]["agent"], "easy");

    let summary = fs::read_to_string(first_dir.path().join("summary.md")).expect("summary");
    assert!(summary.contains("| expert | expert | 6 |"));
}

#[tokio::test(flavor = "multi_thread")]
async fn learning_run_fills_the_store() {
    let dir = tempdir().expect("temp dir");
    let config = load_config(dir.path(), true);
    let outputs = config.resolved_outputs();
    let runner = TournamentRunner::new(config, outputs).expect("runner created");
    let summary = runner.run().await.expect("tournament completes");

    let learning = summary.learning.expect("learning ran");
    let store = JsonFileStore::new(dir.path().join("store"));
    let tactics = store.list_tactics().await.expect("tactics readable");
    let records = store.list_records().await.expect("records readable");

    assert_eq!(records.len(), learning.knowledge_records);
    assert!(!records.is_empty());
    assert!(records.iter().all(|r| r.game_id.starts_with("test_smoke-M")));
    if summary.capped_matches < summary.matches_played {
        assert!(!tactics.is_empty());
    }
}
