//! Pending work for one job: a deque of (container, page) tasks.
//!
//! Continuations go to the front: children in reverse order, then the next
//! page on top. The next page of the current container is therefore always
//! taken first, then its children in their given order, which is the same
//! order a depth-first recursive walk would produce.

use std::collections::VecDeque;

use crate::types::{ContainerResource, ContinuationData, ExportInformation, IdempotencyKey};

/// One export call to make.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CopyTask {
    pub(crate) info: Option<ExportInformation>,
    /// The job's starting node or one of its pages. Export failures here are always fatal.
    pub(crate) root: bool,
    pub(crate) depth: usize,
}

impl CopyTask {
    pub(crate) fn root(info: Option<ExportInformation>) -> Self {
        Self {
            info,
            root: true,
            depth: 0,
        }
    }

    pub(crate) fn container(&self) -> Option<&ContainerResource> {
        self.info.as_ref().and_then(|i| i.container_resource.as_ref())
    }

    fn token(&self) -> Option<&str> {
        self.info
            .as_ref()
            .and_then(|i| i.pagination_data.as_ref())
            .map(|p| p.token())
    }

    /// Human-readable position, e.g. `Holiday (42) @ page-2`.
    pub(crate) fn location(&self) -> String {
        let container = self
            .container()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "<root>".to_string());
        match self.token() {
            Some(token) => format!("{} @ {}", container, token),
            None => container,
        }
    }

    /// Tracker key for failures that belong to this page rather than one item.
    pub(crate) fn failure_key(&self, stage: &str) -> IdempotencyKey {
        let container = self.container().map(|c| c.id.as_str()).unwrap_or("<root>");
        let token = self.token().unwrap_or("<start>");
        IdempotencyKey::new(format!("{}:{}:{}", stage, container, token))
    }
}

#[derive(Debug, Default)]
pub(crate) struct TaskQueue {
    tasks: VecDeque<CopyTask>,
}

impl TaskQueue {
    pub(crate) fn new(first: CopyTask) -> Self {
        Self {
            tasks: VecDeque::from([first]),
        }
    }

    pub(crate) fn pop(&mut self) -> Option<CopyTask> {
        self.tasks.pop_front()
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Schedule the work `continuation` describes for the node `parent` just exported.
    pub(crate) fn push_continuation(&mut self, parent: &CopyTask, continuation: ContinuationData) {
        for child in continuation.container_resources.into_iter().rev() {
            self.tasks.push_front(CopyTask {
                info: Some(ExportInformation::container(child)),
                root: false,
                depth: parent.depth + 1,
            });
        }
        if let Some(next_page) = continuation.pagination_data {
            self.tasks.push_front(CopyTask {
                info: Some(ExportInformation::new(
                    Some(next_page),
                    parent.container().cloned(),
                )),
                root: parent.root,
                depth: parent.depth,
            });
        }
    }
}
