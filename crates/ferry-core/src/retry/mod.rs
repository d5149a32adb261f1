//! Retry classification and backoff.
//!
//! Errors are classified by matching their rendered description against an
//! ordered rule list ([`RetryLibrary`]); the selected [`RetryPolicy`] decides
//! whether to try again and after how long. [`RetryingInvoker`] runs the loop
//! on an injected [`Clock`].

mod classify;
mod clock;
mod error;
mod policy;
mod run;

pub use classify::{describe, RetryLibrary, RetryRule};
pub use clock::{Clock, ManualClock, TokioClock};
pub use error::{RetryConfigError, RetryError};
pub use policy::{RetryDecision, RetryPolicy};
pub use run::RetryingInvoker;
