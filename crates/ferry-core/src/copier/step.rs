//! The export and import halves of one copy iteration.

use crate::idempotency::ErrorDetail;
use crate::provider::{Exporter, Importer};
use crate::retry::{describe, RetryError, RetryingInvoker};
use crate::types::{AuthData, ExportResult, ImportResult, ResultType};

use super::error::CopyError;
use super::task::CopyTask;
use super::CopyEngine;

pub(super) enum ExportOutcome<D> {
    Exported(ExportResult<D>),
    Failed(RetryError),
    Cancelled,
}

/// What one import attempt produced, as seen by the retry loop.
enum PageImport {
    /// Importer finished the call; its own verdict.
    Finished(ImportResult),
    /// Importer propagated an item failure the tracker already holds.
    ItemRecorded(String),
}

fn recorded_item_failure(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| cause.is::<ErrorDetail>())
}

impl<E, I> CopyEngine<E, I>
where
    E: Exporter,
    I: Importer<Data = E::Data>,
{
    pub(super) async fn export_step(
        &self,
        invoker: &RetryingInvoker,
        task: &CopyTask,
        auth: &AuthData,
    ) -> ExportOutcome<E::Data> {
        let job_id = self.job_id();
        let info = task.info.as_ref();
        tracing::debug!(job_id = %job_id, "starting export");
        let started = self.clock.now();

        let result = invoker
            .invoke("export", || self.exporter.export(job_id, auth, info))
            .await;

        let success = matches!(&result, Ok(r) if r.result_type != ResultType::Error);
        let metadata = self.context.metadata();
        self.metrics.export_page_finished(
            &metadata.data_type,
            &metadata.export_service,
            success,
            self.clock.now().saturating_duration_since(started),
        );
        tracing::debug!(job_id = %job_id, success, "finished export");

        match result {
            Ok(export) => {
                if export.result_type == ResultType::Error {
                    tracing::warn!(
                        job_id = %job_id,
                        location = %task.location(),
                        "exporter reported an error result; continuing with what it returned"
                    );
                }
                ExportOutcome::Exported(export)
            }
            Err(RetryError::Cancelled) => ExportOutcome::Cancelled,
            Err(err) => ExportOutcome::Failed(err),
        }
    }

    /// Import one exported page. Returns whether the page imported cleanly.
    /// Only cancellation escapes; every other failure is recorded.
    pub(super) async fn import_step(
        &self,
        invoker: &RetryingInvoker,
        task: &CopyTask,
        auth: &AuthData,
        data: &E::Data,
    ) -> Result<bool, CopyError> {
        let job_id = self.job_id();
        let tracker = self.tracker.as_ref();
        let importer = &self.importer;
        tracing::debug!(job_id = %job_id, "starting import");
        let started = self.clock.now();

        let result = invoker
            .invoke("import", || async move {
                match importer.import(job_id, tracker, auth, data).await {
                    Ok(verdict) => Ok(PageImport::Finished(verdict)),
                    Err(err) if recorded_item_failure(&err) => {
                        Ok(PageImport::ItemRecorded(describe(&err)))
                    }
                    Err(err) => Err(err),
                }
            })
            .await;

        let location = task.location();
        let success = match result {
            Ok(PageImport::Finished(ImportResult::Ok)) => true,
            Ok(PageImport::Finished(ImportResult::Error(message))) => {
                tracing::warn!(job_id = %job_id, location = %location, error = %message, "importer reported an error");
                self.tracker
                    .record_failure(task.failure_key("import"), &location, &message)
                    .await;
                false
            }
            Ok(PageImport::ItemRecorded(message)) => {
                tracing::warn!(job_id = %job_id, location = %location, error = %message, "import stopped at a recorded item failure");
                false
            }
            Err(RetryError::Cancelled) => {
                self.record_import_page(false, started);
                return Err(CopyError::Cancelled { job_id });
            }
            Err(err) => {
                tracing::error!(job_id = %job_id, location = %location, error = %err, "got error importing data");
                self.tracker
                    .record_failure(task.failure_key("import"), &location, &err.to_string())
                    .await;
                false
            }
        };
        self.record_import_page(success, started);
        tracing::debug!(job_id = %job_id, success, "finished import");
        Ok(success)
    }

    fn record_import_page(&self, success: bool, started: std::time::Instant) {
        let metadata = self.context.metadata();
        self.metrics.import_page_finished(
            &metadata.data_type,
            &metadata.import_service,
            success,
            self.clock.now().saturating_duration_since(started),
        );
    }
}
