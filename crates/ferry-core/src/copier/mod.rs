//! Copy engine: walks the source resource tree and moves every page.
//!
//! For each node: one retried export, one retried best-effort import of the
//! exported page, then the node's continuation (next page first, children
//! after). Export failures end the job; import failures are recorded and the
//! walk goes on.

mod context;
mod error;
mod step;
mod task;

use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::{ExportFailureMode, FerryConfig};
use crate::idempotency::{ErrorDetail, IdempotentImportTracker};
use crate::metrics::{MetricRecorder, TracingRecorder};
use crate::progress::CopyProgress;
use crate::provider::{Exporter, ExporterFactory, Importer, ImporterFactory};
use crate::retry::{Clock, RetryError, RetryLibrary, RetryingInvoker, TokioClock};
use crate::types::{AuthData, ExportInformation, JobId, JobMetadata};

pub use context::JobContext;
pub use error::CopyError;

use step::ExportOutcome;
use task::{CopyTask, TaskQueue};

/// Copies one job from an exporter to an importer.
///
/// Owns the job's [`IdempotentImportTracker`]; the tracker's error list is
/// what [`copy`](Self::copy) returns and stays readable afterwards, including
/// after a cancelled or failed copy.
pub struct CopyEngine<E, I>
where
    E: Exporter,
    I: Importer<Data = E::Data>,
{
    context: JobContext,
    exporter: E,
    importer: I,
    library: Arc<RetryLibrary>,
    clock: Arc<dyn Clock>,
    cancel: CancellationToken,
    tracker: Arc<IdempotentImportTracker>,
    metrics: Arc<dyn MetricRecorder>,
    export_failure: ExportFailureMode,
    progress: Mutex<CopyProgress>,
    progress_tx: Option<mpsc::Sender<CopyProgress>>,
}

impl<E, I> CopyEngine<E, I>
where
    E: Exporter,
    I: Importer<Data = E::Data>,
{
    pub fn new(job_id: JobId, exporter: E, importer: I, library: Arc<RetryLibrary>) -> Self {
        Self {
            context: JobContext::new(job_id, JobMetadata::default()),
            exporter,
            importer,
            library,
            clock: Arc::new(TokioClock),
            cancel: CancellationToken::new(),
            tracker: Arc::new(IdempotentImportTracker::new(job_id)),
            metrics: Arc::new(TracingRecorder),
            export_failure: ExportFailureMode::default(),
            progress: Mutex::new(CopyProgress {
                job_id: Some(job_id),
                ..CopyProgress::default()
            }),
            progress_tx: None,
        }
    }

    /// Create the adapters through their factories once the job is known.
    pub fn for_job<EF, IF>(
        job_id: JobId,
        exporters: &EF,
        source_auth: &AuthData,
        importers: &IF,
        destination_auth: &AuthData,
        library: Arc<RetryLibrary>,
    ) -> anyhow::Result<Self>
    where
        EF: ExporterFactory<Exporter = E>,
        IF: ImporterFactory<Importer = I>,
    {
        let exporter = exporters.create(job_id, source_auth)?;
        let importer = importers.create(job_id, destination_auth)?;
        Ok(Self::new(job_id, exporter, importer, library))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricRecorder>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_metadata(mut self, metadata: JobMetadata) -> Self {
        self.context = JobContext::new(self.context.job_id(), metadata);
        self
    }

    pub fn with_export_failure(mut self, mode: ExportFailureMode) -> Self {
        self.export_failure = mode;
        self
    }

    /// Apply the settings of `cfg` that concern the engine.
    pub fn with_config(self, cfg: &FerryConfig) -> Self {
        self.with_export_failure(cfg.export_failure)
    }

    pub fn with_progress(mut self, tx: mpsc::Sender<CopyProgress>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    pub fn job_id(&self) -> JobId {
        self.context.job_id()
    }

    pub fn context(&self) -> &JobContext {
        &self.context
    }

    pub fn tracker(&self) -> &Arc<IdempotentImportTracker> {
        &self.tracker
    }

    /// Item failures recorded so far.
    pub fn errors(&self) -> Vec<ErrorDetail> {
        self.tracker.errors()
    }

    pub fn progress(&self) -> CopyProgress {
        self.progress.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn invoker(&self) -> RetryingInvoker {
        RetryingInvoker::new(
            Arc::clone(&self.library),
            Arc::clone(&self.clock),
            self.cancel.clone(),
        )
    }

    /// Copy everything reachable from `initial` (the root if `None`).
    ///
    /// Returns every recorded item failure on completion, possibly none.
    /// Fails only when an export gives up (or, with
    /// [`ExportFailureMode::SkipContainer`], when the job's first node does)
    /// or when the job is cancelled.
    pub async fn copy(
        &self,
        source_auth: &AuthData,
        destination_auth: &AuthData,
        initial: Option<ExportInformation>,
    ) -> Result<Vec<ErrorDetail>, CopyError> {
        let job_id = self.job_id();
        let invoker = self.invoker();
        let started = self.clock.now();
        let mut queue = TaskQueue::new(CopyTask::root(initial));

        tracing::info!(job_id = %job_id, "copy started");

        while let Some(task) = queue.pop() {
            if self.cancel.is_cancelled() {
                tracing::info!(job_id = %job_id, pending = queue.len() + 1, "copy cancelled");
                return Err(CopyError::Cancelled { job_id });
            }

            let iteration = self.context.next_iteration();
            let location = task.location();
            tracing::debug!(
                job_id = %job_id,
                iteration,
                depth = task.depth,
                location = %location,
                "copy iteration"
            );
            if task.info.as_ref().map_or(true, |i| i.pagination_data.is_none()) {
                self.update_progress(started, queue.len(), |p| p.containers_visited += 1);
            }

            let export = match self.export_step(&invoker, &task, source_auth).await {
                ExportOutcome::Exported(result) => result,
                ExportOutcome::Cancelled => return Err(CopyError::Cancelled { job_id }),
                ExportOutcome::Failed(source) => {
                    if task.root || self.export_failure == ExportFailureMode::AbortJob {
                        tracing::error!(
                            job_id = %job_id,
                            location = %location,
                            error = %source,
                            "export failed, aborting job"
                        );
                        return Err(CopyError::Export {
                            job_id,
                            location,
                            source,
                        });
                    }
                    self.skip_container(&task, &source).await;
                    self.update_progress(started, queue.len(), |_| {});
                    continue;
                }
            };
            self.update_progress(started, queue.len(), |p| p.pages_exported += 1);

            if let Some(data) = export.exported_data.as_ref() {
                let imported = self
                    .import_step(&invoker, &task, destination_auth, data)
                    .await?;
                if imported {
                    self.update_progress(started, queue.len(), |p| p.pages_imported += 1);
                }
            }

            if let Some(continuation) = export.continuation_data {
                if !continuation.is_empty() {
                    tracing::debug!(
                        job_id = %job_id,
                        next_page = continuation.pagination_data.is_some(),
                        children = continuation.container_resources.len(),
                        "queueing continuation"
                    );
                    queue.push_continuation(&task, continuation);
                }
            }
            self.update_progress(started, queue.len(), |_| {});
        }

        let errors = self.tracker.errors();
        tracing::info!(
            job_id = %job_id,
            iterations = self.context.iterations(),
            errors = errors.len(),
            "copy finished"
        );
        Ok(errors)
    }

    /// Record a container whose export gave up and move on to its siblings.
    async fn skip_container(&self, task: &CopyTask, source: &RetryError) {
        let location = task.location();
        tracing::warn!(
            job_id = %self.job_id(),
            location = %location,
            error = %source,
            "export failed, skipping container"
        );
        self.tracker
            .record_failure(
                task.failure_key("export"),
                &location,
                &source.to_string(),
            )
            .await;
    }

    fn update_progress(&self, started: Instant, pending: usize, f: impl FnOnce(&mut CopyProgress)) {
        let snapshot = {
            let mut p = self.progress.lock().unwrap_or_else(|e| e.into_inner());
            f(&mut p);
            p.pending = pending;
            p.import_errors = self.tracker.error_count();
            p.elapsed = self.clock.now().saturating_duration_since(started);
            p.clone()
        };
        if let Some(tx) = &self.progress_tx {
            // Dropped when the consumer lags; the next snapshot supersedes it.
            let _ = tx.try_send(snapshot);
        }
    }
}

/// Copy one job with default settings (wall clock, tracing metrics, abort on
/// export failure).
pub async fn copy<E, I>(
    exporter: E,
    importer: I,
    library: Arc<RetryLibrary>,
    source_auth: &AuthData,
    destination_auth: &AuthData,
    job_id: JobId,
    initial: Option<ExportInformation>,
) -> Result<Vec<ErrorDetail>, CopyError>
where
    E: Exporter,
    I: Importer<Data = E::Data>,
{
    CopyEngine::new(job_id, exporter, importer, library)
        .copy(source_auth, destination_auth, initial)
        .await
}
