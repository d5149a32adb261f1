use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::{dir_key, file_key, parent_id, resolve, LocalFile, LocalPage};
use crate::checksum;
use crate::idempotency::{IdempotentImportTracker, ImportRecord};
use crate::provider::Importer;
use crate::types::{AuthData, DestinationId, ImportResult, JobId};

/// Imports directory pages into a destination directory.
///
/// A directory is created once per job through the tracker; its files are
/// placed under the destination id recorded for it, so a directory must be
/// imported before anything inside it.
#[derive(Debug, Clone)]
pub struct LocalImporter {
    root: PathBuf,
}

impl LocalImporter {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("create destination {}", root.display()))?;
        Ok(Self { root })
    }

    pub fn factory(root: impl Into<PathBuf>) -> impl Fn(JobId, &AuthData) -> Result<Self> {
        let root = root.into();
        move |_job_id: JobId, _auth: &AuthData| Self::new(root.clone())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn create_dir(
        &self,
        tracker: &IdempotentImportTracker,
        container_id: &str,
    ) -> Result<DestinationId> {
        let path = match parent_id(container_id) {
            None => self.root.clone(),
            Some(parent) => match tracker.record(&dir_key(parent)) {
                Some(ImportRecord::Imported(dest)) => {
                    let name = container_id.rsplit('/').next().unwrap_or(container_id);
                    PathBuf::from(dest.as_str()).join(name)
                }
                Some(ImportRecord::Failed(detail)) => {
                    anyhow::bail!("parent directory {} failed to import: {}", parent, detail.description)
                }
                // Job started below the root; nothing recorded for the parent.
                None => resolve(&self.root, container_id),
            },
        };
        tokio::fs::create_dir_all(&path)
            .await
            .with_context(|| format!("create directory {}", path.display()))?;
        Ok(DestinationId::new(path.to_string_lossy()))
    }
}

async fn copy_verified(file: &LocalFile, target: PathBuf) -> Result<DestinationId> {
    let already_there = tokio::fs::try_exists(&target).await.unwrap_or(false)
        && checksum::verify(&target, &file.sha256).await.is_ok();
    if !already_there {
        tokio::fs::copy(&file.source, &target)
            .await
            .with_context(|| format!("copy {} to {}", file.source.display(), target.display()))?;
        if let Err(e) = checksum::verify(&target, &file.sha256).await {
            let _ = tokio::fs::remove_file(&target).await;
            return Err(e);
        }
    }
    Ok(DestinationId::new(target.to_string_lossy()))
}

#[async_trait]
impl Importer for LocalImporter {
    type Data = LocalPage;

    async fn import(
        &self,
        job_id: JobId,
        tracker: &IdempotentImportTracker,
        _auth: &AuthData,
        page: &LocalPage,
    ) -> Result<ImportResult> {
        let container_id = page.container.id.as_str();
        let dest_dir = tracker
            .run_once(dir_key(container_id), &page.container.to_string(), || {
                self.create_dir(tracker, container_id)
            })
            .await?;
        let dest_dir = PathBuf::from(dest_dir.as_str());

        let mut failed = 0usize;
        for file in &page.files {
            let name = file.rel_path.rsplit('/').next().unwrap_or(&file.rel_path);
            let target = dest_dir.join(name);
            let outcome = tracker
                .run_once(file_key(&file.rel_path), &file.rel_path, || {
                    copy_verified(file, target)
                })
                .await;
            if outcome.is_err() {
                failed += 1;
            }
        }
        tracing::debug!(
            %job_id,
            container = %page.container,
            files = page.files.len(),
            failed,
            "imported directory page"
        );
        Ok(ImportResult::Ok)
    }
}
