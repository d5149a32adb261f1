pub mod checksum;
pub mod config;
pub mod control;
pub mod copier;
pub mod idempotency;
pub mod logging;
pub mod metrics;
pub mod progress;
pub mod provider;
pub mod retry;
pub mod types;

pub use copier::{copy, CopyEngine, CopyError};
pub use idempotency::{ErrorDetail, IdempotentImportTracker};
pub use retry::{RetryLibrary, RetryPolicy, RetryingInvoker};
