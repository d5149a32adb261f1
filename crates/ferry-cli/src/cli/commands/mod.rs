//! CLI command handlers, one file per command.

mod classify;
mod config;
mod copy;

pub use classify::run_classify;
pub use config::run_config;
pub use copy::run_copy;
#[cfg(test)]
pub use copy::check_destination;
