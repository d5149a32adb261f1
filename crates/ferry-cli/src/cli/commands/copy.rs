//! `ferry copy` – copy one directory tree with the local adapters.

use anyhow::{bail, Context, Result};
use ferry_core::config::FerryConfig;
use ferry_core::control::JobControl;
use ferry_core::progress::CopyProgress;
use ferry_core::provider::local::{LocalExporter, LocalImporter};
use ferry_core::types::{AuthData, JobId, JobMetadata};
use ferry_core::{CopyEngine, ErrorDetail};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use uuid::Uuid;

const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

pub async fn run_copy(
    cfg: &FerryConfig,
    source: &Path,
    dest: &Path,
    job_id: Option<Uuid>,
) -> Result<()> {
    check_destination(source, dest)?;
    let job_id = job_id.map(JobId::from).unwrap_or_default();
    let library = Arc::new(cfg.retry_library()?);
    let auth = AuthData::default();

    let control = Arc::new(JobControl::new());
    let cancel = control.register(job_id);
    let interrupt = {
        let control = Arc::clone(&control);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let n = control.cancel_all();
                tracing::info!(jobs = n, "interrupt received, cancelling");
                eprintln!("\ninterrupted, stopping at the next step");
            }
        })
    };

    let (progress_tx, progress_rx) = mpsc::channel::<CopyProgress>(16);
    let printer = tokio::spawn(print_progress(progress_rx));

    let engine = CopyEngine::for_job(
        job_id,
        &LocalExporter::factory(source, cfg.page_size),
        &auth,
        &LocalImporter::factory(dest),
        &auth,
        library,
    )?
    .with_config(cfg)
    .with_metadata(JobMetadata {
        data_type: "files".to_string(),
        export_service: "local".to_string(),
        import_service: "local".to_string(),
    })
    .with_cancel_token(cancel)
    .with_progress(progress_tx);

    println!(
        "job {}: copying {} -> {}",
        job_id,
        source.display(),
        dest.display()
    );
    let result = engine.copy(&auth, &auth, None).await;
    let errors = engine.errors();
    control.unregister(job_id);
    interrupt.abort();
    // Closes the progress channel.
    drop(engine);
    let _ = printer.await;

    print_errors(job_id, &errors);
    result?;
    Ok(())
}

/// Refuse a destination that is the source directory or lies inside it; the
/// copy would otherwise walk into its own output.
pub fn check_destination(source: &Path, dest: &Path) -> Result<()> {
    let source = source
        .canonicalize()
        .with_context(|| format!("source {}", source.display()))?;
    let dest = resolve_lenient(dest)?;
    if dest.starts_with(&source) {
        bail!(
            "destination {} is inside source {}",
            dest.display(),
            source.display()
        );
    }
    Ok(())
}

/// Canonicalize the longest existing ancestor of `path` and re-append the
/// components that do not exist yet.
fn resolve_lenient(path: &Path) -> Result<PathBuf> {
    let mut existing = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    let mut missing = Vec::new();
    loop {
        match existing.canonicalize() {
            Ok(resolved) => {
                return Ok(missing.iter().rev().fold(resolved, |acc, c| acc.join(c)));
            }
            Err(_) => {
                let Some(name) = existing.file_name().map(|n| n.to_os_string()) else {
                    bail!("cannot resolve destination {}", path.display());
                };
                missing.push(name);
                existing.pop();
            }
        }
    }
}

async fn print_progress(mut rx: mpsc::Receiver<CopyProgress>) {
    let mut last_print: Option<Instant> = None;
    let mut unprinted = None;
    while let Some(p) = rx.recv().await {
        if last_print.map_or(true, |t| t.elapsed() >= PROGRESS_INTERVAL) {
            print_line(&p);
            last_print = Some(Instant::now());
            unprinted = None;
        } else {
            unprinted = Some(p);
        }
    }
    if let Some(p) = unprinted {
        print_line(&p);
    }
}

fn print_line(p: &CopyProgress) {
    println!(
        "  containers {}  pages {} exported / {} imported  errors {}  pending {}  {:.1} pages/s",
        p.containers_visited,
        p.pages_exported,
        p.pages_imported,
        p.import_errors,
        p.pending,
        p.pages_per_sec()
    );
}

fn print_errors(job_id: JobId, errors: &[ErrorDetail]) {
    if errors.is_empty() {
        println!("job {}: no import errors", job_id);
        return;
    }
    println!("job {}: {} import error(s)", job_id, errors.len());
    for e in errors {
        println!("  {}  {}: {}", e.key, e.title, e.description);
    }
}
