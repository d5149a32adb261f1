//! Page-level timing hooks. Fire-and-forget; never change copy outcomes.

use std::time::Duration;

pub trait MetricRecorder: Send + Sync {
    fn export_page_finished(&self, data_type: &str, service: &str, success: bool, duration: Duration);
    fn import_page_finished(&self, data_type: &str, service: &str, success: bool, duration: Duration);
}

/// Emits one `tracing` event per page under the `ferry::metrics` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRecorder;

impl MetricRecorder for TracingRecorder {
    fn export_page_finished(&self, data_type: &str, service: &str, success: bool, duration: Duration) {
        tracing::info!(
            target: "ferry::metrics",
            data_type,
            service,
            success,
            duration_ms = duration.as_millis() as u64,
            "export page finished"
        );
    }

    fn import_page_finished(&self, data_type: &str, service: &str, success: bool, duration: Duration) {
        tracing::info!(
            target: "ferry::metrics",
            data_type,
            service,
            success,
            duration_ms = duration.as_millis() as u64,
            "import page finished"
        );
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRecorder;

impl MetricRecorder for NoopRecorder {
    fn export_page_finished(&self, _: &str, _: &str, _: bool, _: Duration) {}
    fn import_page_finished(&self, _: &str, _: &str, _: bool, _: Duration) {}
}
