#![allow(dead_code)]

pub mod scripted;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use ferry_core::metrics::MetricRecorder;
use ferry_core::retry::{RetryLibrary, RetryPolicy, RetryRule};

/// `404`/`not found` never retried, `503` retried three times one second
/// apart, anything else twice with a short delay. No jitter.
pub fn test_library() -> Arc<RetryLibrary> {
    let rules = vec![
        RetryRule::new([r"(?i).*(404|not found).*"], RetryPolicy::no_retry()).unwrap(),
        RetryRule::new([r".*503.*"], RetryPolicy::constant(3, Duration::from_secs(1))).unwrap(),
    ];
    Arc::new(RetryLibrary::new(
        rules,
        RetryPolicy::constant(2, Duration::from_millis(10)),
    ))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageMetric {
    pub stage: &'static str,
    pub data_type: String,
    pub service: String,
    pub success: bool,
}

/// Keeps every page metric in call order.
#[derive(Debug, Default)]
pub struct RecordingMetrics {
    events: Mutex<Vec<PageMetric>>,
}

impl RecordingMetrics {
    pub fn events(&self) -> Vec<PageMetric> {
        self.events.lock().unwrap().clone()
    }

    pub fn stage(&self, stage: &str) -> Vec<PageMetric> {
        self.events().into_iter().filter(|m| m.stage == stage).collect()
    }

    fn push(&self, stage: &'static str, data_type: &str, service: &str, success: bool) {
        self.events.lock().unwrap().push(PageMetric {
            stage,
            data_type: data_type.to_string(),
            service: service.to_string(),
            success,
        });
    }
}

impl MetricRecorder for RecordingMetrics {
    fn export_page_finished(&self, data_type: &str, service: &str, success: bool, _: Duration) {
        self.push("export", data_type, service, success);
    }

    fn import_page_finished(&self, data_type: &str, service: &str, success: bool, _: Duration) {
        self.push("import", data_type, service, success);
    }
}
