//! SHA-256 fingerprints used to verify copied items.
//!
//! Hashing runs on the blocking pool so it never stalls the copy task.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

const BUF_SIZE: usize = 64 * 1024;

/// Copied content does not match the source fingerprint.
#[derive(Debug, thiserror::Error)]
#[error("checksum mismatch for {path}: expected {expected}, got {actual}")]
pub struct ChecksumMismatch {
    pub path: PathBuf,
    pub expected: String,
    pub actual: String,
}

/// Hash everything `reader` yields; lowercase hex digest.
pub fn sha256_reader<R: Read>(mut reader: R) -> io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; BUF_SIZE];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

pub fn sha256_path(path: &Path) -> Result<String> {
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    sha256_reader(f).with_context(|| format!("read {}", path.display()))
}

/// [`sha256_path`] on the blocking pool.
pub async fn sha256_path_async(path: PathBuf) -> Result<String> {
    tokio::task::spawn_blocking(move || sha256_path(&path))
        .await
        .context("checksum task join")?
}

/// Fail with [`ChecksumMismatch`] unless `path` hashes to `expected`.
pub async fn verify(path: &Path, expected: &str) -> Result<()> {
    let actual = sha256_path_async(path.to_path_buf()).await?;
    if actual != expected {
        return Err(ChecksumMismatch {
            path: path.to_path_buf(),
            expected: expected.to_string(),
            actual,
        }
        .into());
    }
    Ok(())
}
