use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ProgressError;
use crate::time::unix_millis_now;

/// Storage key the progress record lives under.
pub const PROGRESS_KEY: &str = "mochi_progress";

/// Persisted player progress across sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProgressData {
    pub endless_unlocked: bool,
    pub unlock_cutin_shown: bool,
    pub normal_high_score: u32,
    /// Unix milliseconds at which endless mode was unlocked.
    pub unlocked_at: Option<u64>,
}

/// A string key-value medium the progress record is persisted in.
pub trait StorageBackend {
    fn get(&self, key: &str) -> Result<Option<String>, ProgressError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), ProgressError>;
    fn remove(&mut self, key: &str) -> Result<(), ProgressError>;
}

/// Volatile backend, used in tests and when no persistent medium exists.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, ProgressError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), ProgressError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), ProgressError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl StorageBackend for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, ProgressError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), ProgressError> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.path_for(key), value)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), ProgressError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Outcome of recording a finished classic round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreRecord {
    pub new_high_score: bool,
    pub newly_unlocked: bool,
}

/// Progress record bound to a storage backend.
///
/// Constructed explicitly and handed to whoever needs it; reads happen once at
/// construction and every mutation is written straight back.
#[derive(Debug)]
pub struct ProgressStore<B: StorageBackend> {
    backend: B,
    data: ProgressData,
}

impl<B: StorageBackend> ProgressStore<B> {
    pub fn new(backend: B) -> Self {
        let data = read_progress(&backend);
        Self { backend, data }
    }

    pub fn progress(&self) -> &ProgressData {
        &self.data
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Re-read the record from the backend, discarding in-memory state.
    pub fn reload(&mut self) {
        self.data = read_progress(&self.backend);
    }

    /// Record a finished classic round. A perfect round unlocks endless mode.
    pub fn record_normal_score(&mut self, score: u32, is_perfect: bool) -> ScoreRecord {
        let mut record = ScoreRecord::default();
        if score > self.data.normal_high_score {
            self.data.normal_high_score = score;
            record.new_high_score = true;
            tracing::info!(score, "New normal-mode high score");
        }
        if is_perfect && !self.data.endless_unlocked {
            self.data.endless_unlocked = true;
            self.data.unlocked_at = Some(unix_millis_now());
            record.newly_unlocked = true;
            tracing::info!("Endless mode unlocked");
        }
        if record.new_high_score || record.newly_unlocked {
            self.save();
        }
        record
    }

    /// Whether the one-time "endless unlocked" cut-in still has to be shown.
    pub fn should_show_unlock_cutin(&self) -> bool {
        self.data.endless_unlocked && !self.data.unlock_cutin_shown
    }

    pub fn mark_unlock_cutin_shown(&mut self) {
        if !self.data.unlock_cutin_shown {
            self.data.unlock_cutin_shown = true;
            self.save();
        }
    }

    /// Wipe all progress, both in memory and in the backend.
    pub fn reset(&mut self) {
        self.data = ProgressData::default();
        if let Err(e) = self.backend.remove(PROGRESS_KEY) {
            tracing::warn!(error = %e, "Failed to clear stored progress");
        }
    }

    fn save(&mut self) {
        let result = serde_json::to_string(&self.data)
            .map_err(ProgressError::Encode)
            .and_then(|json| self.backend.set(PROGRESS_KEY, &json));
        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to persist progress");
        }
    }
}

fn read_progress<B: StorageBackend>(backend: &B) -> ProgressData {
    let raw = match backend.get(PROGRESS_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return ProgressData::default(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read progress, using defaults");
            return ProgressData::default();
        },
    };
    match serde_json::from_str::<ProgressData>(&raw).map_err(ProgressError::Decode) {
        Ok(data) => data,
        Err(e) => {
            tracing::warn!(error = %e, "Discarding unreadable progress, using defaults");
            ProgressData::default()
        },
    }
}
