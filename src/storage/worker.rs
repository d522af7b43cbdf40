//! Background persistence thread
//!
//! The worker and the engine exchange messages over `crossbeam-channel`:
//! the worker loads the startup snapshot, then saves on every tick, on
//! explicit checkpoint requests and once more at shutdown. A failed save is
//! logged and picked up again at the next tick.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded, never, select, tick, unbounded};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::SnapshotStore;
use crate::error::{RankError, Result};
use crate::search::{IndexState, SearchEngine};

enum Command {
    Checkpoint,
    Shutdown,
}

/// Counters returned when the worker exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WorkerReport {
    pub saves: u64,
    pub failed_saves: u64,
    pub skipped_saves: u64,
}

pub struct PersistenceWorker;

impl PersistenceWorker {
    /// Start the worker. The engine is `Loading` until the snapshot load
    /// finishes; use [`PersistenceHandle::wait_ready`] to block on it.
    pub fn spawn(
        engine: Arc<SearchEngine>,
        store: Arc<dyn SnapshotStore>,
        interval: Duration,
    ) -> Result<PersistenceHandle> {
        let fallback_to_empty = engine.config().persistence.fallback_to_empty;
        engine.set_state(IndexState::Loading);

        let (command_tx, command_rx) = unbounded();
        let (ready_tx, ready_rx) = bounded(1);

        let join = thread::Builder::new()
            .name("semrank-persistence".to_string())
            .spawn(move || {
                let mut worker = WorkerLoop {
                    engine,
                    store,
                    report: WorkerReport::default(),
                    last_saved: None,
                };
                let state = worker.load(fallback_to_empty);
                let _ = ready_tx.send(state);
                worker.run(&command_rx, interval);
                worker.report
            })
            .map_err(|err| RankError::Persistence(format!("spawn persistence worker: {err}")))?;

        Ok(PersistenceHandle {
            commands: command_tx,
            ready: ready_rx,
            join: Some(join),
        })
    }
}

pub struct PersistenceHandle {
    commands: Sender<Command>,
    ready: Receiver<IndexState>,
    join: Option<JoinHandle<WorkerReport>>,
}

impl PersistenceHandle {
    /// Block until the startup load completes.
    pub fn wait_ready(&self, timeout: Duration) -> Result<IndexState> {
        match self.ready.recv_timeout(timeout) {
            Ok(state) => Ok(state),
            Err(RecvTimeoutError::Timeout) => Err(RankError::Timeout(format!(
                "snapshot load did not finish within {timeout:?}"
            ))),
            Err(RecvTimeoutError::Disconnected) => Err(RankError::Persistence(
                "persistence worker exited before loading".to_string(),
            )),
        }
    }

    /// Ask for a save at the next opportunity; does not wait for it.
    pub fn checkpoint(&self) -> Result<()> {
        self.commands
            .send(Command::Checkpoint)
            .map_err(|_| RankError::Persistence("persistence worker is gone".to_string()))
    }

    /// Final save, then join the worker thread.
    pub fn shutdown(mut self) -> Result<WorkerReport> {
        self.stop()
    }

    fn stop(&mut self) -> Result<WorkerReport> {
        let Some(join) = self.join.take() else {
            return Ok(WorkerReport::default());
        };
        let _ = self.commands.send(Command::Shutdown);
        join.join()
            .map_err(|_| RankError::Persistence("persistence worker panicked".to_string()))
    }
}

impl Drop for PersistenceHandle {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            warn!(error = %err, "persistence worker did not shut down cleanly");
        }
    }
}

/// Marker of the state last written: index generation and search count.
type SavedMarker = (u64, u64);

struct WorkerLoop {
    engine: Arc<SearchEngine>,
    store: Arc<dyn SnapshotStore>,
    report: WorkerReport,
    last_saved: Option<SavedMarker>,
}

impl WorkerLoop {
    fn load(&mut self, fallback_to_empty: bool) -> IndexState {
        match self.store.load() {
            Ok(Some(snapshot)) => {
                let report = self.engine.restore(snapshot);
                info!(
                    store = %self.store.describe(),
                    documents = report.documents,
                    "engine restored from snapshot"
                );
                self.last_saved = Some(self.marker());
            }
            Ok(None) => {
                info!(store = %self.store.describe(), "no snapshot, starting empty");
                self.engine.set_state(IndexState::Ready);
            }
            Err(err) if fallback_to_empty => {
                error!(error = %err, "snapshot load failed, starting with an empty index");
                self.engine.set_state(IndexState::Ready);
            }
            Err(err) => {
                error!(error = %err, "snapshot load failed, search disabled");
                self.engine.set_state(IndexState::Disabled);
            }
        }
        self.engine.state()
    }

    fn run(&mut self, commands: &Receiver<Command>, interval: Duration) {
        let ticker = if interval.is_zero() { never() } else { tick(interval) };
        loop {
            select! {
                recv(ticker) -> _ => self.save("interval"),
                recv(commands) -> message => match message {
                    Ok(Command::Checkpoint) => self.save("checkpoint"),
                    Ok(Command::Shutdown) | Err(_) => {
                        self.save("shutdown");
                        break;
                    }
                },
            }
        }
        debug!(report = ?self.report, "persistence worker stopped");
    }

    fn marker(&self) -> SavedMarker {
        (
            self.engine.index().generation(),
            self.engine.health_status().total_searches,
        )
    }

    fn save(&mut self, reason: &str) {
        if self.engine.state() != IndexState::Ready {
            // Never overwrite a snapshot that failed to load.
            self.report.skipped_saves += 1;
            return;
        }
        let marker = self.marker();
        if self.last_saved == Some(marker) {
            self.report.skipped_saves += 1;
            debug!(reason, "snapshot unchanged, skipping save");
            return;
        }

        match self.store.save(&self.engine.snapshot()) {
            Ok(()) => {
                self.report.saves += 1;
                self.last_saved = Some(marker);
                debug!(reason, "checkpoint written");
            }
            Err(err) => {
                self.report.failed_saves += 1;
                warn!(reason, error = %err, "checkpoint failed, deferring to next interval");
            }
        }
    }
}
