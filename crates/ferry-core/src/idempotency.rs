//! At-most-once import execution per logical item within one job.
//!
//! Every item an importer writes goes through [`IdempotentImportTracker::run_once`].
//! The first outcome recorded for a key, success or failure, is final: later
//! calls with the same key return it without running the import again.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use crate::types::{DestinationId, IdempotencyKey, JobId};

/// A terminal import failure for one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorDetail {
    pub key: IdempotencyKey,
    /// Human-readable item name for reports.
    pub title: String,
    pub description: String,
    pub recorded_at: SystemTime,
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.title, self.key, self.description)
    }
}

impl std::error::Error for ErrorDetail {}

/// Outcome recorded for a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportRecord {
    Imported(DestinationId),
    Failed(ErrorDetail),
}

type Slot = Arc<tokio::sync::Mutex<Option<ImportRecord>>>;

#[derive(Default)]
struct TrackerState {
    slots: HashMap<IdempotencyKey, Slot>,
    errors: Vec<ErrorDetail>,
}

/// Per-job record of imported items.
///
/// One slot per key; the slot's async lock allows only one in-flight import
/// per key, so concurrent callers for the same key wait and then observe the
/// recorded outcome.
pub struct IdempotentImportTracker {
    job_id: JobId,
    state: Mutex<TrackerState>,
}

impl fmt::Debug for IdempotentImportTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdempotentImportTracker")
            .field("job_id", &self.job_id)
            .field("errors", &self.error_count())
            .finish()
    }
}

impl IdempotentImportTracker {
    pub fn new(job_id: JobId) -> Self {
        Self {
            job_id,
            state: Mutex::new(TrackerState::default()),
        }
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn slot(&self, key: &IdempotencyKey) -> Slot {
        let mut state = self.lock();
        Arc::clone(state.slots.entry(key.clone()).or_default())
    }

    /// Run `op` for `key` unless an outcome is already recorded.
    ///
    /// A failure of `op` is recorded as an [`ErrorDetail`] and is terminal for
    /// the key. Retrying the operation belongs inside `op` or around the
    /// importer call, never here.
    pub async fn run_once<F, Fut>(
        &self,
        key: impl Into<IdempotencyKey>,
        title: &str,
        op: F,
    ) -> Result<DestinationId, ErrorDetail>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<DestinationId>>,
    {
        let key = key.into();
        let slot = self.slot(&key);
        let mut guard = slot.lock().await;
        if let Some(record) = guard.as_ref() {
            tracing::trace!(job_id = %self.job_id, key = %key, "import already recorded");
            return match record {
                ImportRecord::Imported(id) => Ok(id.clone()),
                ImportRecord::Failed(detail) => Err(detail.clone()),
            };
        }

        match op().await {
            Ok(id) => {
                *guard = Some(ImportRecord::Imported(id.clone()));
                Ok(id)
            }
            Err(err) => {
                let detail = ErrorDetail {
                    key: key.clone(),
                    title: title.to_string(),
                    description: format!("{:#}", err),
                    recorded_at: SystemTime::now(),
                };
                tracing::warn!(
                    job_id = %self.job_id,
                    key = %key,
                    error = %detail.description,
                    "import failed, recorded"
                );
                *guard = Some(ImportRecord::Failed(detail.clone()));
                self.lock().errors.push(detail.clone());
                Err(detail)
            }
        }
    }

    /// Record a failure that did not come from a `run_once` operation
    /// (e.g. a whole page that could not be imported). No-op if `key` already
    /// has an outcome; returns the recorded detail either way.
    pub async fn record_failure(
        &self,
        key: impl Into<IdempotencyKey>,
        title: &str,
        description: &str,
    ) -> ImportRecord {
        let key = key.into();
        let slot = self.slot(&key);
        let mut guard = slot.lock().await;
        if let Some(record) = guard.as_ref() {
            return record.clone();
        }
        let detail = ErrorDetail {
            key,
            title: title.to_string(),
            description: description.to_string(),
            recorded_at: SystemTime::now(),
        };
        *guard = Some(ImportRecord::Failed(detail.clone()));
        self.lock().errors.push(detail.clone());
        ImportRecord::Failed(detail)
    }

    /// Whether `key` was imported successfully.
    pub fn is_key_cached(&self, key: &IdempotencyKey) -> bool {
        self.cached_value(key).is_some()
    }

    /// Destination id recorded for `key`, if it was imported successfully.
    ///
    /// Does not wait for an import of `key` that is still in flight.
    pub fn cached_value(&self, key: &IdempotencyKey) -> Option<DestinationId> {
        let slot = self.lock().slots.get(key).cloned()?;
        let record = slot.try_lock().ok()?;
        match record.as_ref()? {
            ImportRecord::Imported(id) => Some(id.clone()),
            ImportRecord::Failed(_) => None,
        }
    }

    /// Recorded outcome for `key`, if any (non-blocking).
    pub fn record(&self, key: &IdempotencyKey) -> Option<ImportRecord> {
        let slot = self.lock().slots.get(key).cloned()?;
        let record = slot.try_lock().ok()?;
        record.clone()
    }

    /// All recorded failures, in recording order.
    pub fn errors(&self) -> Vec<ErrorDetail> {
        self.lock().errors.clone()
    }

    pub fn error_count(&self) -> usize {
        self.lock().errors.len()
    }
}
