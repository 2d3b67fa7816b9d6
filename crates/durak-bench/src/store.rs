use std::path::{Path, PathBuf};

use async_trait::async_trait;
use durak_bot::{KnowledgeRecord, KnowledgeStore, StoreError, Tactic, TacticStore};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

const TACTICS_FILE: &str = "tactics.json";
const KNOWLEDGE_FILE: &str = "knowledge.jsonl";

/// Tactic library as one pretty JSON array, knowledge as JSON lines.
/// Missing files read as empty.
pub struct JsonFileStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn tactics_path(&self) -> PathBuf {
        self.dir.join(TACTICS_FILE)
    }

    fn knowledge_path(&self) -> PathBuf {
        self.dir.join(KNOWLEDGE_FILE)
    }

    async fn read_tactics(&self) -> Result<Vec<Tactic>, StoreError> {
        match fs::read_to_string(self.tactics_path()).await {
            Ok(raw) if raw.trim().is_empty() => Ok(Vec::new()),
            Ok(raw) => serde_json::from_str(&raw).map_err(serialization),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(unavailable(err)),
        }
    }

    async fn write_tactics(&self, tactics: &[Tactic]) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).await.map_err(unavailable)?;
        let raw = serde_json::to_string_pretty(tactics).map_err(serialization)?;
        let staging = self.dir.join(format!("{TACTICS_FILE}.tmp"));
        fs::write(&staging, raw).await.map_err(unavailable)?;
        fs::rename(&staging, self.tactics_path())
            .await
            .map_err(unavailable)
    }
}

fn unavailable(err: std::io::Error) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

fn serialization(err: serde_json::Error) -> StoreError {
    StoreError::Serialization(err.to_string())
}

#[async_trait]
impl TacticStore for JsonFileStore {
    async fn list_tactics(&self) -> Result<Vec<Tactic>, StoreError> {
        self.read_tactics().await
    }

    async fn create_tactic(&self, mut tactic: Tactic) -> Result<u64, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut tactics = self.read_tactics().await?;
        let id = tactics.iter().map(|t| t.id).max().unwrap_or(0) + 1;
        tactic.id = id;
        tactics.push(tactic);
        self.write_tactics(&tactics).await?;
        Ok(id)
    }

    async fn update_tactic(&self, tactic: &Tactic) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut tactics = self.read_tactics().await?;
        let slot = tactics
            .iter_mut()
            .find(|existing| existing.id == tactic.id)
            .ok_or(StoreError::NotFound(tactic.id))?;
        *slot = tactic.clone();
        self.write_tactics(&tactics).await
    }
}

#[async_trait]
impl KnowledgeStore for JsonFileStore {
    async fn list_records(&self) -> Result<Vec<KnowledgeRecord>, StoreError> {
        let raw = match fs::read_to_string(self.knowledge_path()).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(unavailable(err)),
        };
        raw.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(serialization))
            .collect()
    }

    async fn append_records(&self, records: &[KnowledgeRecord]) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }
        let mut buffer = Vec::new();
        for record in records {
            serde_json::to_writer(&mut buffer, record).map_err(serialization)?;
            buffer.push(b'\n');
        }

        let _guard = self.write_lock.lock().await;
        fs::create_dir_all(&self.dir).await.map_err(unavailable)?;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.knowledge_path())
            .await
            .map_err(unavailable)?;
        file.write_all(&buffer).await.map_err(unavailable)?;
        file.flush().await.map_err(unavailable)
    }
}
