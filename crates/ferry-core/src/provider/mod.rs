//! Export/import adapter interfaces.
//!
//! One exporter per source service and one importer per destination service.
//! The engine only calls them through the retrying invoker.

pub mod local;

use anyhow::Result;
use async_trait::async_trait;

use crate::idempotency::IdempotentImportTracker;
use crate::types::{AuthData, ExportInformation, ExportResult, ImportResult, JobId};

#[async_trait]
pub trait Exporter: Send + Sync {
    /// Page of exported items handed to the importer.
    type Data: Send + Sync;

    /// Export the page described by `info`; `None` means the job's root.
    async fn export(
        &self,
        job_id: JobId,
        auth: &AuthData,
        info: Option<&ExportInformation>,
    ) -> Result<ExportResult<Self::Data>>;
}

#[async_trait]
pub trait Importer: Send + Sync {
    type Data: Send + Sync;

    /// Import one exported page. Each item should go through
    /// [`IdempotentImportTracker::run_once`], and the importer should carry on
    /// past an item that fails there: the failure is already recorded.
    ///
    /// Returning an item's [`ErrorDetail`](crate::idempotency::ErrorDetail)
    /// ends the page. The call is not retried and the failure is not recorded
    /// twice, but items after it on the page are neither imported nor
    /// reported.
    async fn import(
        &self,
        job_id: JobId,
        tracker: &IdempotentImportTracker,
        auth: &AuthData,
        data: &Self::Data,
    ) -> Result<ImportResult>;
}

/// Creates an exporter at job start, once the job's context is known.
pub trait ExporterFactory {
    type Exporter: Exporter;

    fn create(&self, job_id: JobId, auth: &AuthData) -> Result<Self::Exporter>;
}

/// Creates an importer at job start, once the job's context is known.
pub trait ImporterFactory {
    type Importer: Importer;

    fn create(&self, job_id: JobId, auth: &AuthData) -> Result<Self::Importer>;
}

impl<F, E> ExporterFactory for F
where
    F: Fn(JobId, &AuthData) -> Result<E>,
    E: Exporter,
{
    type Exporter = E;

    fn create(&self, job_id: JobId, auth: &AuthData) -> Result<E> {
        self(job_id, auth)
    }
}

impl<F, I> ImporterFactory for F
where
    F: Fn(JobId, &AuthData) -> Result<I>,
    I: Importer,
{
    type Importer = I;

    fn create(&self, job_id: JobId, auth: &AuthData) -> Result<I> {
        self(job_id, auth)
    }
}
