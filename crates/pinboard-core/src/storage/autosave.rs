//! Deferred, periodic saving of the current document.
//!
//! Edits call [`AutoSaveManager::mark_dirty`]; the host polls
//! [`AutoSaveManager::maybe_save`] from its event loop. At most one save is
//! in flight at a time. An edit made while a save is running is not covered
//! by that save, so the manager stays dirty afterwards.

use crate::config::AutoSaveConfig;
use crate::session::{LoadReport, SessionDocument};
use crate::storage::{Storage, StorageResult};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Key for the "last opened" document.
pub const LAST_DOCUMENT_KEY: &str = "__last_document__";

/// Clears the in-flight flag when a save finishes or its future is dropped.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Manages automatic document persistence.
pub struct AutoSaveManager<S: Storage> {
    storage: Arc<S>,
    interval: Duration,
    last_save: Mutex<Option<Instant>>,
    /// Bumped by every modification.
    revision: AtomicU64,
    /// Revision covered by the last completed save.
    saved_revision: AtomicU64,
    in_flight: AtomicBool,
    document_id: String,
}

impl<S: Storage> AutoSaveManager<S> {
    /// Create a manager for a new, unsaved document.
    pub fn new(storage: Arc<S>) -> Self {
        Self::with_config(storage, AutoSaveConfig::default())
    }

    pub fn with_config(storage: Arc<S>, config: AutoSaveConfig) -> Self {
        Self {
            storage,
            interval: Duration::from_secs(config.interval_secs),
            last_save: Mutex::new(None),
            revision: AtomicU64::new(0),
            saved_revision: AtomicU64::new(0),
            in_flight: AtomicBool::new(false),
            document_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Record a modification. Safe to call while a save is running.
    pub fn mark_dirty(&self) {
        self.revision.fetch_add(1, Ordering::AcqRel);
    }

    /// Whether there are modifications not covered by a completed save.
    pub fn is_dirty(&self) -> bool {
        self.revision.load(Ordering::Acquire) != self.saved_revision.load(Ordering::Acquire)
    }

    pub fn is_saving(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn set_document_id(&mut self, id: impl Into<String>) {
        self.document_id = id.into();
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    fn last_save(&self) -> Option<Instant> {
        *self.last_save.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn mark_clean(&self, revision: u64) {
        self.saved_revision.fetch_max(revision, Ordering::AcqRel);
        *self.last_save.lock().unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
    }

    /// Dirty, idle, and the interval has passed since the last save.
    pub fn should_save(&self) -> bool {
        if !self.is_dirty() || self.is_saving() {
            return false;
        }
        match self.last_save() {
            Some(last) => last.elapsed() >= self.interval,
            None => true,
        }
    }

    /// Save the document if [`should_save`](Self::should_save) says so.
    /// Returns true if a save was performed.
    pub async fn maybe_save(&self, document: &SessionDocument) -> StorageResult<bool> {
        if !self.should_save() {
            return Ok(false);
        }
        self.save(document).await
    }

    /// Save now. Returns false without saving if another save is still in
    /// flight.
    pub async fn save(&self, document: &SessionDocument) -> StorageResult<bool> {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            log::debug!("Save already in progress; not starting another");
            return Ok(false);
        }
        let _in_flight = InFlight(&self.in_flight);
        let revision = self.revision.load(Ordering::Acquire);

        let mut document = document.clone();
        document.document_id = Some(self.document_id.clone());
        self.storage.save(&self.document_id, &document).await?;
        // Also keep a copy for restoring on the next start.
        self.storage.save(LAST_DOCUMENT_KEY, &document).await?;

        self.mark_clean(revision);
        if self.is_dirty() {
            log::debug!("Document {} changed during save; still dirty", self.document_id);
        } else {
            log::debug!("Auto-saved document {}", self.document_id);
        }
        Ok(true)
    }

    /// Load a document by id and make it the current one.
    pub async fn load(&mut self, id: &str) -> StorageResult<(SessionDocument, LoadReport)> {
        let loaded = self.storage.load(id).await?;
        self.document_id = id.to_string();
        self.mark_clean(self.revision.load(Ordering::Acquire));
        Ok(loaded)
    }

    /// Load the most recently saved document, if there is one.
    pub async fn load_last(&mut self) -> Option<(SessionDocument, LoadReport)> {
        match self.storage.load(LAST_DOCUMENT_KEY).await {
            Ok((document, report)) => {
                if let Some(id) = &document.document_id {
                    self.document_id = id.clone();
                }
                self.mark_clean(self.revision.load(Ordering::Acquire));
                Some((document, report))
            }
            Err(e) => {
                log::debug!("No last document to restore: {}", e);
                None
            }
        }
    }

    pub async fn delete(&self, id: &str) -> StorageResult<()> {
        self.storage.delete(id).await
    }

    /// List all saved document ids.
    pub async fn list_documents(&self) -> StorageResult<Vec<String>> {
        let mut docs = self.storage.list().await?;
        docs.retain(|id| id != LAST_DOCUMENT_KEY);
        Ok(docs)
    }

    pub async fn exists(&self, id: &str) -> StorageResult<bool> {
        self.storage.exists(id).await
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }
}
