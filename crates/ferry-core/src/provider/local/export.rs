use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::{join_id, resolve, root_container, LocalFile, LocalPage};
use crate::checksum;
use crate::provider::Exporter;
use crate::types::{
    AuthData, ContainerResource, ContinuationData, ExportInformation, ExportResult, JobId,
    PaginationData, ResultType,
};

/// Exports a directory tree page by page.
#[derive(Debug, Clone)]
pub struct LocalExporter {
    root: PathBuf,
    page_size: usize,
}

impl LocalExporter {
    pub fn new(root: impl Into<PathBuf>, page_size: usize) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            anyhow::bail!("source {} is not a directory", root.display());
        }
        Ok(Self {
            root,
            page_size: page_size.max(1),
        })
    }

    /// Factory for [`CopyEngine::for_job`](crate::copier::CopyEngine::for_job).
    pub fn factory(
        root: impl Into<PathBuf>,
        page_size: usize,
    ) -> impl Fn(JobId, &AuthData) -> Result<Self> {
        let root = root.into();
        move |_job_id: JobId, _auth: &AuthData| Self::new(root.clone(), page_size)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn parse_offset(token: Option<&PaginationData>) -> Result<usize> {
    match token {
        None => Ok(0),
        Some(p) => p
            .token()
            .parse::<usize>()
            .with_context(|| format!("invalid page token {:?}", p.token())),
    }
}

/// Files and subdirectory names of `dir`, each sorted by name.
async fn list_dir(dir: &Path) -> Result<(Vec<String>, Vec<String>)> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("read_dir {}", dir.display()))?;
    let mut files = Vec::new();
    let mut dirs = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .with_context(|| format!("read_dir {}", dir.display()))?
    {
        let file_type = entry.file_type().await?;
        let Ok(name) = entry.file_name().into_string() else {
            tracing::warn!(dir = %dir.display(), "skipping entry with non-UTF-8 name");
            continue;
        };
        if file_type.is_file() {
            files.push(name);
        } else if file_type.is_dir() {
            dirs.push(name);
        }
    }
    files.sort();
    dirs.sort();
    Ok((files, dirs))
}

#[async_trait]
impl Exporter for LocalExporter {
    type Data = LocalPage;

    async fn export(
        &self,
        job_id: JobId,
        _auth: &AuthData,
        info: Option<&ExportInformation>,
    ) -> Result<ExportResult<LocalPage>> {
        let container = info
            .and_then(|i| i.container_resource.clone())
            .unwrap_or_else(root_container);
        let offset = parse_offset(info.and_then(|i| i.pagination_data.as_ref()))?;
        let dir = resolve(&self.root, &container.id);
        let (names, subdirs) = list_dir(&dir).await?;

        let end = names.len().min(offset.saturating_add(self.page_size));
        let mut files = Vec::with_capacity(end.saturating_sub(offset));
        for name in names.get(offset..end).unwrap_or_default() {
            let source = dir.join(name);
            let size = tokio::fs::metadata(&source)
                .await
                .with_context(|| format!("stat {}", source.display()))?
                .len();
            let sha256 = checksum::sha256_path_async(source.clone()).await?;
            files.push(LocalFile {
                rel_path: join_id(&container.id, name),
                source,
                size,
                sha256,
            });
        }

        let next_page = (end < names.len()).then(|| PaginationData::new(end.to_string()));
        let children = if offset == 0 {
            subdirs
                .iter()
                .map(|name| ContainerResource::named(join_id(&container.id, name), name.clone()))
                .collect()
        } else {
            Vec::new()
        };
        tracing::debug!(
            %job_id,
            container = %container,
            offset,
            files = files.len(),
            children = children.len(),
            "exported directory page"
        );

        let continuation = ContinuationData::new(next_page).with_containers(children);
        let (result_type, continuation) = if continuation.is_empty() {
            (ResultType::Ok, None)
        } else {
            (ResultType::Continue, Some(continuation))
        };
        Ok(ExportResult::new(
            result_type,
            Some(LocalPage { container, files }),
            continuation,
        ))
    }
}
