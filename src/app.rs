//! Per-invocation application context
//!
//! Resolves the data directory and configuration, boots the engine and its
//! persistence worker, and writes the final checkpoint on [`AppContext::finish`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::cli::Cli;
use crate::config::Config;
use crate::error::Result;
use crate::search::{IndexState, SearchEngine};
use crate::storage::{JsonFileStore, PersistenceHandle, PersistenceWorker, WorkerReport};

const LOAD_TIMEOUT: Duration = Duration::from_secs(60);

pub struct AppContext {
    pub root: PathBuf,
    pub config: Config,
    pub json: bool,
    pub engine: Arc<SearchEngine>,
    persistence: PersistenceHandle,
}

impl AppContext {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let root = resolve_root(cli.root.as_deref());
        let config = Config::load(cli.config.as_deref(), &root)?;
        Self::boot(root, config, cli.json)
    }

    pub fn boot(root: PathBuf, config: Config, json: bool) -> Result<Self> {
        let snapshot_path = config.persistence.resolve_snapshot_path(&root);
        debug!(root = %root.display(), snapshot = %snapshot_path.display(), "booting engine");

        let engine = Arc::new(SearchEngine::new(config.clone())?);
        let persistence = PersistenceWorker::spawn(
            Arc::clone(&engine),
            Arc::new(JsonFileStore::new(snapshot_path)),
            config.persistence.checkpoint_interval,
        )?;
        let state = persistence.wait_ready(LOAD_TIMEOUT)?;
        if state != IndexState::Ready {
            debug!(%state, "engine not ready after load");
        }

        Ok(Self {
            root,
            config,
            json,
            engine,
            persistence,
        })
    }

    /// Write the final checkpoint and stop the worker.
    pub fn finish(self) -> Result<WorkerReport> {
        self.persistence.shutdown()
    }
}

/// `--root`/`SEMRANK_ROOT`, else the platform data directory.
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(root) = explicit {
        return root.to_path_buf();
    }
    dirs::data_dir()
        .map(|dir| dir.join("semrank"))
        .unwrap_or_else(|| PathBuf::from(".semrank"))
}
