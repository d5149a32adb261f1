//! In-memory exporter and importer driven by a per-page script.
//!
//! Both sides append to a shared event log (`export <loc>`, `import <loc>`,
//! `item <key>`) so tests can assert call order.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

use ferry_core::provider::{Exporter, Importer};
use ferry_core::types::{
    AuthData, ContainerResource, ContinuationData, DestinationId, ExportInformation,
    ExportResult, ImportResult, JobId, PaginationData, ResultType,
};
use ferry_core::IdempotentImportTracker;

/// (container id, page token); `None` container is the job root.
pub type PageKey = (Option<String>, Option<String>);

pub fn key(container: Option<&str>, token: Option<&str>) -> PageKey {
    (container.map(str::to_string), token.map(str::to_string))
}

pub fn loc(k: &PageKey) -> String {
    format!(
        "{}@{}",
        k.0.as_deref().unwrap_or("root"),
        k.1.as_deref().unwrap_or("start")
    )
}

#[derive(Debug, Clone)]
pub struct Page {
    pub key: PageKey,
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PageScript {
    pub items: Vec<String>,
    pub next: Option<String>,
    pub children: Vec<String>,
}

impl PageScript {
    pub fn items(items: &[&str]) -> Self {
        Self {
            items: items.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn next(mut self, token: &str) -> Self {
        self.next = Some(token.to_string());
        self
    }

    pub fn children(mut self, children: &[&str]) -> Self {
        self.children = children.iter().map(|s| s.to_string()).collect();
        self
    }
}

pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn events(log: &EventLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

pub fn position(log: &[String], event: &str) -> usize {
    log.iter()
        .position(|e| e == event)
        .unwrap_or_else(|| panic!("event {event:?} not in {log:?}"))
}

#[derive(Default)]
pub struct ScriptedExporter {
    pages: HashMap<PageKey, PageScript>,
    /// Remaining failures per page, with the message to fail with.
    failures: Mutex<HashMap<PageKey, (u32, String)>>,
    cancel_on: Option<(PageKey, CancellationToken)>,
    /// Pages returned with `ResultType::Error` (data and continuation kept).
    error_results: HashSet<PageKey>,
    pub log: EventLog,
}

impl ScriptedExporter {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            ..Self::default()
        }
    }

    pub fn page(mut self, k: PageKey, script: PageScript) -> Self {
        self.pages.insert(k, script);
        self
    }

    pub fn fail(self, k: PageKey, times: u32, message: &str) -> Self {
        self.failures
            .lock()
            .unwrap()
            .insert(k, (times, message.to_string()));
        self
    }

    pub fn error_result(mut self, k: PageKey) -> Self {
        self.error_results.insert(k);
        self
    }

    /// Cancel `token` when page `k` is exported.
    pub fn cancel_on(mut self, k: PageKey, token: CancellationToken) -> Self {
        self.cancel_on = Some((k, token));
        self
    }
}

#[async_trait]
impl Exporter for ScriptedExporter {
    type Data = Page;

    async fn export(
        &self,
        _job_id: JobId,
        _auth: &AuthData,
        info: Option<&ExportInformation>,
    ) -> Result<ExportResult<Page>> {
        let k: PageKey = (
            info.and_then(|i| i.container_resource.as_ref())
                .map(|c| c.id.clone()),
            info.and_then(|i| i.pagination_data.as_ref())
                .map(|p| p.token().to_string()),
        );
        {
            let mut failures = self.failures.lock().unwrap();
            if let Some((left, message)) = failures.get_mut(&k) {
                if *left > 0 {
                    *left -= 1;
                    self.log.lock().unwrap().push(format!("export-failed {}", loc(&k)));
                    anyhow::bail!("{}", message);
                }
            }
        }
        self.log.lock().unwrap().push(format!("export {}", loc(&k)));
        if let Some((at, token)) = &self.cancel_on {
            if *at == k {
                token.cancel();
            }
        }

        let script = self.pages.get(&k).cloned().unwrap_or_default();
        let continuation = ContinuationData::new(script.next.map(PaginationData::new))
            .with_containers(script.children.into_iter().map(ContainerResource::new).collect());
        let (mut result_type, continuation) = if continuation.is_empty() {
            (ResultType::Ok, None)
        } else {
            (ResultType::Continue, Some(continuation))
        };
        if self.error_results.contains(&k) {
            result_type = ResultType::Error;
        }
        Ok(ExportResult::new(
            result_type,
            Some(Page {
                key: k,
                items: script.items,
            }),
            continuation,
        ))
    }
}

#[derive(Default)]
pub struct ScriptedImporter {
    /// Items whose import fails with this message.
    failing_items: HashMap<String, String>,
    /// Pages whose import call fails outright with this message.
    failing_pages: HashMap<PageKey, String>,
    /// Pages for which the importer reports `ImportResult::Error`.
    error_pages: HashSet<PageKey>,
    /// Propagate item failures instead of continuing with the next item.
    propagate: bool,
    pub attempts: Arc<Mutex<u32>>,
    pub log: EventLog,
}

impl ScriptedImporter {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            ..Self::default()
        }
    }

    pub fn fail_item(mut self, item: &str, message: &str) -> Self {
        self.failing_items.insert(item.to_string(), message.to_string());
        self
    }

    pub fn fail_page(mut self, k: PageKey, message: &str) -> Self {
        self.failing_pages.insert(k, message.to_string());
        self
    }

    pub fn error_page(mut self, k: PageKey) -> Self {
        self.error_pages.insert(k);
        self
    }

    pub fn propagate_item_errors(mut self) -> Self {
        self.propagate = true;
        self
    }

    pub fn attempts(&self) -> Arc<Mutex<u32>> {
        Arc::clone(&self.attempts)
    }
}

#[async_trait]
impl Importer for ScriptedImporter {
    type Data = Page;

    async fn import(
        &self,
        _job_id: JobId,
        tracker: &IdempotentImportTracker,
        _auth: &AuthData,
        page: &Page,
    ) -> Result<ImportResult> {
        if let Some(message) = self.failing_pages.get(&page.key) {
            self.log.lock().unwrap().push(format!("import-failed {}", loc(&page.key)));
            anyhow::bail!("{}", message);
        }
        for item in &page.items {
            let outcome = tracker
                .run_once(item.as_str(), item, || async {
                    *self.attempts.lock().unwrap() += 1;
                    self.log.lock().unwrap().push(format!("item {item}"));
                    match self.failing_items.get(item) {
                        Some(message) => anyhow::bail!("{}", message),
                        None => Ok(DestinationId::new(format!("dst-{item}"))),
                    }
                })
                .await;
            if let Err(detail) = outcome {
                if self.propagate {
                    return Err(detail.into());
                }
            }
        }
        self.log.lock().unwrap().push(format!("import {}", loc(&page.key)));
        if self.error_pages.contains(&page.key) {
            return Ok(ImportResult::Error(format!("destination rejected {}", loc(&page.key))));
        }
        Ok(ImportResult::Ok)
    }
}
