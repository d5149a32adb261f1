//! `ferry config` – print where the config lives and what is in effect.

use anyhow::Result;
use ferry_core::config::{self, FerryConfig};

pub fn run_config(cfg: &FerryConfig) -> Result<()> {
    println!("# {}", config::config_path()?.display());
    print!("{}", toml::to_string_pretty(cfg)?);
    if cfg.retry.is_none() {
        println!("# no [retry] section: built-in retry rules apply");
    }
    Ok(())
}
