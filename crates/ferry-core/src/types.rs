//! Data model shared by the engine and the export/import adapters.
//!
//! Everything here is opaque to the copy engine beyond identity and equality:
//! adapters put whatever they need into tokens and container ids.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of one migration job. Constant for the whole copy tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub uuid::Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<uuid::Uuid> for JobId {
    fn from(id: uuid::Uuid) -> Self {
        Self(id)
    }
}

/// Credential blob for one side of a job. Passed through to adapters untouched.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthData(pub serde_json::Value);

impl fmt::Debug for AuthData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthData(<redacted>)")
    }
}

/// One node of the source resource tree (album, folder, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerResource {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ContainerResource {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }

    pub fn named(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
        }
    }
}

impl fmt::Display for ContainerResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} ({})", name, self.id),
            None => write!(f, "{}", self.id),
        }
    }
}

/// Continuation token for "more items at this node".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaginationData(pub String);

impl PaginationData {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn token(&self) -> &str {
        &self.0
    }
}

/// What to export next.
///
/// No token with a container means "start this container from the beginning";
/// neither (or no `ExportInformation` at all) means "start from the root".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportInformation {
    pub pagination_data: Option<PaginationData>,
    pub container_resource: Option<ContainerResource>,
}

impl ExportInformation {
    pub fn new(
        pagination_data: Option<PaginationData>,
        container_resource: Option<ContainerResource>,
    ) -> Self {
        Self {
            pagination_data,
            container_resource,
        }
    }

    /// Start of a container, no pagination.
    pub fn container(resource: ContainerResource) -> Self {
        Self::new(None, Some(resource))
    }
}

/// Work discovered by an export call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContinuationData {
    /// Next page at the same container.
    pub pagination_data: Option<PaginationData>,
    /// Children to visit once the current container is exhausted, in order.
    pub container_resources: Vec<ContainerResource>,
}

impl ContinuationData {
    pub fn new(pagination_data: Option<PaginationData>) -> Self {
        Self {
            pagination_data,
            container_resources: Vec::new(),
        }
    }

    pub fn with_containers(mut self, containers: Vec<ContainerResource>) -> Self {
        self.container_resources = containers;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.pagination_data.is_none() && self.container_resources.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultType {
    Ok,
    Continue,
    Error,
}

/// Outcome of one export call.
#[derive(Debug, Clone)]
pub struct ExportResult<D> {
    pub result_type: ResultType,
    pub exported_data: Option<D>,
    pub continuation_data: Option<ContinuationData>,
}

impl<D> ExportResult<D> {
    pub fn new(
        result_type: ResultType,
        exported_data: Option<D>,
        continuation_data: Option<ContinuationData>,
    ) -> Self {
        Self {
            result_type,
            exported_data,
            continuation_data,
        }
    }

    /// Nothing exported, nothing left to do.
    pub fn end_of_data() -> Self {
        Self::new(ResultType::Ok, None, None)
    }
}

/// Outcome of one import call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportResult {
    Ok,
    Error(String),
}

impl ImportResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, ImportResult::Ok)
    }
}

/// Stable identity of one exportable item within a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IdempotencyKey(pub String);

impl IdempotencyKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IdempotencyKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for IdempotencyKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Identifier the destination assigned to an imported item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DestinationId(pub String);

impl DestinationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DestinationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Descriptive tags for one job, used to label metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMetadata {
    pub data_type: String,
    pub export_service: String,
    pub import_service: String,
}
