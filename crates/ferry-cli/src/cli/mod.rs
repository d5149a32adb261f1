//! CLI for the ferry data migration engine.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use ferry_core::config::{self, FerryConfig};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use commands::{run_classify, run_config, run_copy};

#[derive(Debug, Parser)]
#[command(name = "ferry")]
#[command(about = "ferry: copy data between services, page by page, with retries", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Copy a directory tree into another directory as one job.
    Copy {
        /// Source directory.
        source: PathBuf,
        /// Destination directory (created if missing).
        dest: PathBuf,
        /// Job identifier; a random one is generated if omitted.
        #[arg(long, value_name = "UUID")]
        job_id: Option<Uuid>,
        /// Files per exported page (overrides the config).
        #[arg(long, value_name = "N")]
        page_size: Option<usize>,
        /// Read configuration from this file instead of the default location.
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Show which retry policy an error message would get.
    Classify {
        /// Error message as an adapter would report it.
        message: String,
    },

    /// Print the config file location and the effective configuration.
    Config,
}

fn load_config(path: Option<&Path>) -> Result<FerryConfig> {
    let cfg = match path {
        Some(path) => config::load_from_path(path)?,
        None => config::load_or_init()?,
    };
    tracing::debug!("loaded config: {:?}", cfg);
    Ok(cfg)
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        cli.command.run().await
    }

    pub async fn run(self) -> Result<()> {
        match self {
            CliCommand::Copy {
                source,
                dest,
                job_id,
                page_size,
                config,
            } => {
                let mut cfg = load_config(config.as_deref())?;
                if let Some(n) = page_size {
                    cfg.page_size = n;
                }
                run_copy(&cfg, &source, &dest, job_id).await?;
            }
            CliCommand::Classify { message } => {
                let cfg = load_config(None)?;
                run_classify(&cfg, &message)?;
            }
            CliCommand::Config => {
                let cfg = load_config(None)?;
                run_config(&cfg)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
