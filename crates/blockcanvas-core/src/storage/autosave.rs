//! Debounced, coalesced two-tier persistence.
//!
//! [`AutoSave`] is a handle onto a worker task. Every document change restarts
//! a debounce timer; when it expires the latest document is written to the
//! local [`Storage`] (plus the last-document snapshot) and then, if a
//! credential is configured, to the [`RemoteStore`]. At most one save is in
//! flight. Requests arriving meanwhile collapse into a single pending save
//! that carries the newest document.

use super::{LAST_DOCUMENT_KEY, RemoteError, RemoteStore, Storage, StorageError, StorageResult};
use crate::document::CanvasDocument;
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Quiet period after the last change before a save starts.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1200);

/// Upper bound on a single remote write.
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(10);

/// Persistence status shown to the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveStatus {
    #[default]
    Saved,
    Unsaved,
    Saving,
    Error,
}

impl fmt::Display for SaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SaveStatus::Saved => "saved",
            SaveStatus::Unsaved => "unsaved",
            SaveStatus::Saving => "saving",
            SaveStatus::Error => "error",
        })
    }
}

/// Snapshot of the pipeline published on the watch channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SaveState {
    pub status: SaveStatus,
    pub last_saved_at: Option<DateTime<Utc>>,
    /// Message of the last failure, while `status` is `Error`.
    pub error: Option<String>,
}

impl SaveState {
    /// Local wall-clock time of the last successful save, e.g. `14:03:27`.
    pub fn last_saved_label(&self) -> Option<String> {
        self.last_saved_at
            .map(|at| at.with_timezone(&Local).format("%H:%M:%S").to_string())
    }
}

/// Why a save attempt failed.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("local save failed: {0}")]
    Local(#[from] StorageError),
    #[error("remote save failed: {0}")]
    Remote(#[from] RemoteError),
    #[error("save task stopped: {0}")]
    Task(String),
}

/// Settings for one document's pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct AutoSaveConfig {
    /// Persistence key of the document.
    pub document_id: String,
    pub debounce: Duration,
    /// Remote credential; without one the remote tier is skipped.
    pub credential: Option<String>,
    /// `None` waits on the remote indefinitely.
    pub remote_timeout: Option<Duration>,
}

impl AutoSaveConfig {
    pub fn new(document_id: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            debounce: DEFAULT_DEBOUNCE,
            credential: None,
            remote_timeout: Some(DEFAULT_REMOTE_TIMEOUT),
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }

    pub fn with_remote_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.remote_timeout = timeout;
        self
    }
}

/// Load a document from the local tier. A missing document is `None`.
pub async fn restore(storage: &dyn Storage, document_id: &str) -> StorageResult<Option<CanvasDocument>> {
    match storage.load(document_id).await {
        Ok(document) => Ok(Some(document)),
        Err(StorageError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Load the last locally known-good document, whatever its id.
pub async fn restore_last(storage: &dyn Storage) -> StorageResult<Option<CanvasDocument>> {
    restore(storage, LAST_DOCUMENT_KEY).await
}

enum Command {
    Changed { seq: u64, document: CanvasDocument },
    SaveNow { seq: u64, document: CanvasDocument },
    SetCredential(Option<String>),
    Flush(oneshot::Sender<SaveState>),
    Shutdown(oneshot::Sender<()>),
}

/// Handle onto a document's auto-save worker.
pub struct AutoSave {
    commands: mpsc::UnboundedSender<Command>,
    status: Arc<watch::Sender<SaveState>>,
    latest_seq: Arc<AtomicU64>,
    storage: Arc<dyn Storage>,
    document_id: String,
    worker: Option<JoinHandle<()>>,
}

impl fmt::Debug for AutoSave {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutoSave")
            .field("document_id", &self.document_id)
            .field("state", &*self.status.borrow())
            .finish_non_exhaustive()
    }
}

impl AutoSave {
    /// Spawn the worker. Must be called from within a Tokio runtime.
    pub fn spawn(
        config: AutoSaveConfig,
        storage: Arc<dyn Storage>,
        remote: Option<Arc<dyn RemoteStore>>,
    ) -> Self {
        let (commands, receiver) = mpsc::unbounded_channel();
        let status = Arc::new(watch::Sender::new(SaveState::default()));
        let latest_seq = Arc::new(AtomicU64::new(0));

        let worker = Worker {
            storage: storage.clone(),
            remote,
            document_id: config.document_id.clone(),
            credential: config.credential,
            debounce: config.debounce,
            remote_timeout: config.remote_timeout,
            status: status.clone(),
            latest_seq: latest_seq.clone(),
            dirty: None,
            deadline: None,
            queued: None,
            in_flight: None,
            flush_waiters: Vec::new(),
        };
        log::debug!("Starting auto-save for document {}", config.document_id);
        let worker = tokio::spawn(worker.run(receiver));

        Self {
            commands,
            status,
            latest_seq,
            storage,
            document_id: config.document_id,
            worker: Some(worker),
        }
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    /// Report a committed change. Status turns `unsaved` immediately and the
    /// debounce restarts.
    pub fn document_changed(&self, document: &CanvasDocument) {
        let seq = self.bump();
        self.status.send_modify(|state| {
            state.status = SaveStatus::Unsaved;
            state.error = None;
        });
        self.send(Command::Changed {
            seq,
            document: document.clone(),
        });
    }

    /// Save `document` without waiting for the debounce.
    pub fn save_now(&self, document: &CanvasDocument) {
        let seq = self.bump();
        self.send(Command::SaveNow {
            seq,
            document: document.clone(),
        });
    }

    /// Set or clear the remote credential for subsequent saves.
    pub fn set_credential(&self, credential: Option<String>) {
        self.send(Command::SetCredential(credential));
    }

    pub fn status(&self) -> SaveState {
        self.status.borrow().clone()
    }

    /// Watch status transitions.
    pub fn subscribe(&self) -> watch::Receiver<SaveState> {
        self.status.subscribe()
    }

    /// Save any outstanding change now and wait until the pipeline is idle.
    pub async fn flush(&self) -> SaveState {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Flush(tx));
        match rx.await {
            Ok(state) => state,
            Err(_) => self.status(),
        }
    }

    /// This document from the local tier, `None` if it was never saved.
    pub async fn restore(&self) -> StorageResult<Option<CanvasDocument>> {
        restore(self.storage.as_ref(), &self.document_id).await
    }

    /// The last-document snapshot from the local tier.
    pub async fn restore_last(&self) -> StorageResult<Option<CanvasDocument>> {
        restore_last(self.storage.as_ref()).await
    }

    /// Flush and stop the worker.
    pub async fn shutdown(mut self) -> SaveState {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Shutdown(tx));
        let _ = rx.await;
        if let Some(worker) = self.worker.take() {
            if let Err(e) = worker.await {
                log::error!("Auto-save worker for {} failed: {e}", self.document_id);
            }
        }
        self.status()
    }

    fn bump(&self) -> u64 {
        self.latest_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            log::warn!("Auto-save worker for {} is gone", self.document_id);
        }
    }
}

struct InFlight {
    seq: u64,
    task: JoinHandle<Result<(), SaveError>>,
}

struct Worker {
    storage: Arc<dyn Storage>,
    remote: Option<Arc<dyn RemoteStore>>,
    document_id: String,
    credential: Option<String>,
    debounce: Duration,
    remote_timeout: Option<Duration>,
    status: Arc<watch::Sender<SaveState>>,
    latest_seq: Arc<AtomicU64>,
    /// Latest reported change waiting for the debounce.
    dirty: Option<(u64, CanvasDocument)>,
    deadline: Option<Instant>,
    /// Single pending save behind the in-flight one.
    queued: Option<(u64, CanvasDocument)>,
    in_flight: Option<InFlight>,
    flush_waiters: Vec<oneshot::Sender<SaveState>>,
}

impl Worker {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        let mut open = true;
        let mut shutdown: Option<oneshot::Sender<()>> = None;

        loop {
            if (!open || shutdown.is_some()) && self.is_idle() {
                break;
            }
            tokio::select! {
                command = commands.recv(), if open && shutdown.is_none() => match command {
                    Some(Command::Shutdown(reply)) => {
                        self.flush_dirty();
                        shutdown = Some(reply);
                    }
                    Some(command) => self.handle(command),
                    None => {
                        open = false;
                        self.flush_dirty();
                    }
                },
                () = wait_until(self.deadline) => {
                    self.deadline = None;
                    if let Some((seq, document)) = self.dirty.take() {
                        self.request_save(seq, document);
                    }
                },
                (seq, result) = finish(&mut self.in_flight) => {
                    self.in_flight = None;
                    self.complete(seq, result);
                },
            }
            self.notify_if_idle();
        }

        log::debug!("Auto-save for document {} stopped", self.document_id);
        if let Some(reply) = shutdown {
            let _ = reply.send(());
        }
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Changed { seq, document } => {
                self.dirty = Some((seq, document));
                // A debounce past the clock's range only saves on flush.
                self.deadline = Instant::now().checked_add(self.debounce);
                if self.deadline.is_none() {
                    log::warn!("Debounce of {:?} is out of range; waiting for flush", self.debounce);
                }
            }
            Command::SaveNow { seq, document } => {
                self.dirty = None;
                self.deadline = None;
                self.request_save(seq, document);
            }
            Command::SetCredential(credential) => self.credential = credential,
            Command::Flush(reply) => {
                self.flush_dirty();
                self.flush_waiters.push(reply);
            }
            Command::Shutdown(_) => {}
        }
    }

    fn is_idle(&self) -> bool {
        self.dirty.is_none() && self.queued.is_none() && self.in_flight.is_none()
    }

    fn flush_dirty(&mut self) {
        self.deadline = None;
        if let Some((seq, document)) = self.dirty.take() {
            self.request_save(seq, document);
        }
    }

    fn notify_if_idle(&mut self) {
        if self.flush_waiters.is_empty() || !self.is_idle() {
            return;
        }
        let state = self.status.borrow().clone();
        for waiter in self.flush_waiters.drain(..) {
            let _ = waiter.send(state.clone());
        }
    }

    fn request_save(&mut self, seq: u64, document: CanvasDocument) {
        if self.in_flight.is_some() {
            log::debug!("Save in flight; queueing revision {seq}");
            self.queued = Some((seq, document));
        } else {
            self.launch(seq, document);
        }
    }

    fn launch(&mut self, seq: u64, document: CanvasDocument) {
        self.status.send_modify(|state| {
            state.status = SaveStatus::Saving;
            state.error = None;
        });

        let task = tokio::spawn(write_tiers(
            self.storage.clone(),
            self.remote.clone().zip(self.credential.clone()),
            self.document_id.clone(),
            document,
            self.remote_timeout,
        ));
        self.in_flight = Some(InFlight { seq, task });
    }

    fn complete(&mut self, seq: u64, result: Result<(), SaveError>) {
        match result {
            Ok(()) => {
                log::debug!("Saved document {} (revision {seq})", self.document_id);
                if let Some((next, document)) = self.queued.take() {
                    self.launch(next, document);
                    return;
                }
                let newer = self.latest_seq.load(Ordering::SeqCst) > seq;
                self.status.send_modify(|state| {
                    state.last_saved_at = Some(Utc::now());
                    state.error = None;
                    state.status = if newer {
                        SaveStatus::Unsaved
                    } else {
                        SaveStatus::Saved
                    };
                });
            }
            Err(e) => {
                log::error!("Failed to save document {}: {e}", self.document_id);
                let message = e.to_string();
                self.status.send_modify(|state| {
                    state.status = SaveStatus::Error;
                    state.error = Some(message);
                });
                // A newer request was already waiting; it is not a retry.
                if let Some((next, document)) = self.queued.take() {
                    self.launch(next, document);
                }
            }
        }
    }
}

/// Local tier first, then the remote when a credential is present.
async fn write_tiers(
    storage: Arc<dyn Storage>,
    remote: Option<(Arc<dyn RemoteStore>, String)>,
    document_id: String,
    document: CanvasDocument,
    timeout: Option<Duration>,
) -> Result<(), SaveError> {
    storage.save(&document_id, &document).await?;
    storage.save(LAST_DOCUMENT_KEY, &document).await?;

    if let Some((remote, credential)) = remote {
        let write = remote.write(&document_id, &credential, &document);
        match timeout {
            Some(limit) => tokio::time::timeout(limit, write)
                .await
                .map_err(|_| RemoteError::Timeout(limit))??,
            None => write.await?,
        }
    }
    Ok(())
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn finish(in_flight: &mut Option<InFlight>) -> (u64, Result<(), SaveError>) {
    match in_flight {
        Some(InFlight { seq, task }) => {
            let result = match task.await {
                Ok(result) => result,
                Err(e) => Err(SaveError::Task(e.to_string())),
            };
            (*seq, result)
        }
        None => std::future::pending().await,
    }
}
