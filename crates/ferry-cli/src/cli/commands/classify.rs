//! `ferry classify` – show the retry policy selected for an error message.

use anyhow::Result;
use ferry_core::config::FerryConfig;
use ferry_core::RetryPolicy;

pub fn run_classify(cfg: &FerryConfig, message: &str) -> Result<()> {
    let library = cfg.retry_library()?;
    match library.rules().iter().position(|r| r.matches(message)) {
        Some(i) => println!("matched rule {}", i + 1),
        None => println!("no rule matched, using the default policy"),
    }
    print_policy(library.select(message));
    Ok(())
}

fn print_policy(policy: &RetryPolicy) {
    println!("max_attempts = {}", policy.max_attempts);
    if policy.max_attempts <= 1 {
        println!("not retried");
        return;
    }
    let delays: Vec<String> = (1..policy.max_attempts)
        .map(|attempt| format!("{:?}", policy.backoff(attempt)))
        .collect();
    println!("backoff      = {}", delays.join(", "));
    if let Some(jitter) = policy.jitter {
        println!("jitter       = up to {:?}", jitter);
    }
}
