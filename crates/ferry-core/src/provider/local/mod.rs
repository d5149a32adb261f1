//! Local directory source and destination.
//!
//! Containers are directories (id = path relative to the root, `.` for the
//! root itself), items are regular files. Pages hold up to `page_size` files
//! in name order; subdirectories are reported as children on a directory's
//! first page. Every file carries its SHA-256 so the importer can verify the copy.

mod export;
mod import;

pub use export::LocalExporter;
pub use import::LocalImporter;

use std::path::{Path, PathBuf};

use crate::types::{ContainerResource, IdempotencyKey};

/// Container id of the root directory.
pub const ROOT_ID: &str = ".";

/// One exported directory page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalPage {
    pub container: ContainerResource,
    pub files: Vec<LocalFile>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    /// Path relative to the source root, `/`-separated.
    pub rel_path: String,
    /// Absolute path to read from.
    pub source: PathBuf,
    pub size: u64,
    pub sha256: String,
}

pub fn root_container() -> ContainerResource {
    ContainerResource::named(ROOT_ID, "<root>")
}

/// Tracker key of a directory.
pub fn dir_key(container_id: &str) -> IdempotencyKey {
    IdempotencyKey::new(format!("dir:{}", container_id))
}

/// Tracker key of a file.
pub fn file_key(rel_path: &str) -> IdempotencyKey {
    IdempotencyKey::new(format!("file:{}", rel_path))
}

/// Container id of the directory holding `container_id`, `None` for the root.
pub fn parent_id(container_id: &str) -> Option<&str> {
    if container_id == ROOT_ID {
        return None;
    }
    match container_id.rsplit_once('/') {
        Some((parent, _)) => Some(parent),
        None => Some(ROOT_ID),
    }
}

fn join_id(parent_id: &str, name: &str) -> String {
    if parent_id == ROOT_ID {
        name.to_string()
    } else {
        format!("{}/{}", parent_id, name)
    }
}

fn resolve(root: &Path, container_id: &str) -> PathBuf {
    if container_id == ROOT_ID {
        root.to_path_buf()
    } else {
        container_id.split('/').fold(root.to_path_buf(), |p, seg| p.join(seg))
    }
}
