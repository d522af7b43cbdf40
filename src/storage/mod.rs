//! Snapshot persistence
//!
//! The engine never touches disk on the query path. A [`PersistenceWorker`]
//! thread loads the snapshot at startup and writes it back on an interval,
//! on request and at shutdown, through a [`SnapshotStore`].

mod worker;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{RankError, Result};
use crate::search::embeddings::Vector;
use crate::search::graph::RelationshipGraph;
use crate::search::history::{HistoryEntry, PerformanceMetrics, UserProfiles};
use crate::search::index::{Document, DocumentId};

pub use worker::{PersistenceHandle, PersistenceWorker, WorkerReport};

/// Everything the engine needs to resume after a restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    /// Vector dimension at save time
    pub dimensions: usize,
    #[serde(default)]
    pub documents: Vec<Document>,
    #[serde(default)]
    pub vectors: HashMap<DocumentId, Vector>,
    #[serde(default)]
    pub relationship_graph: RelationshipGraph,
    #[serde(default)]
    pub user_search_profiles: UserProfiles,
    #[serde(default)]
    pub search_history: Vec<HistoryEntry>,
    #[serde(default)]
    pub performance_metrics: PerformanceMetrics,
}

impl Snapshot {
    pub const VERSION: u32 = 1;
}

pub trait SnapshotStore: Send + Sync {
    /// `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<Snapshot>>;
    fn save(&self, snapshot: &Snapshot) -> Result<()>;
    fn describe(&self) -> String;
}

/// Pretty JSON on disk, replaced atomically on save.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStore for JsonFileStore {
    fn load(&self) -> Result<Option<Snapshot>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no snapshot on disk");
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path).map_err(|err| {
            RankError::Persistence(format!("read snapshot {}: {err}", self.path.display()))
        })?;
        let snapshot: Snapshot = serde_json::from_str(&contents).map_err(|err| {
            RankError::Persistence(format!("parse snapshot {}: {err}", self.path.display()))
        })?;
        if snapshot.version > Snapshot::VERSION {
            return Err(RankError::Persistence(format!(
                "snapshot {} has version {}, newest supported is {}",
                self.path.display(),
                snapshot.version,
                Snapshot::VERSION
            )));
        }
        info!(
            path = %self.path.display(),
            documents = snapshot.documents.len(),
            "snapshot loaded"
        );
        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(snapshot)?;
        let temp_path = self.path.with_extension("tmp");
        std::fs::write(&temp_path, json)?;

        match std::fs::rename(&temp_path, &self.path) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                std::fs::remove_file(&self.path)?;
                std::fs::rename(&temp_path, &self.path)?;
            }
            Err(err) => {
                let _ = std::fs::remove_file(&temp_path);
                return Err(RankError::Persistence(format!(
                    "replace snapshot {}: {err}",
                    self.path.display()
                )));
            }
        }

        info!(
            path = %self.path.display(),
            documents = snapshot.documents.len(),
            "snapshot saved"
        );
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Keeps the last saved snapshot in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshot: Mutex<Option<Snapshot>>,
    saves: Mutex<u64>,
    fail_saves: Mutex<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            snapshot: Mutex::new(Some(snapshot)),
            ..Self::default()
        }
    }

    pub fn latest(&self) -> Option<Snapshot> {
        self.snapshot.lock().clone()
    }

    pub fn save_count(&self) -> u64 {
        *self.saves.lock()
    }

    /// Make subsequent saves fail until reset.
    pub fn set_fail_saves(&self, fail: bool) {
        *self.fail_saves.lock() = fail;
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self) -> Result<Option<Snapshot>> {
        Ok(self.latest())
    }

    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        if *self.fail_saves.lock() {
            return Err(RankError::Persistence("memory store rejected save".to_string()));
        }
        *self.snapshot.lock() = Some(snapshot.clone());
        *self.saves.lock() += 1;
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
