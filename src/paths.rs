//! Home-based storage paths for the ledger:
//! - `ledger.txt` - Default strategy log
//! - `config.yaml` - Optional settings file
//! - `journals/<file-hash>.jsonl` - Event journals (qualified by strategy log path)
//!
//! The home directory is `~/.focus-ledger/` unless `FOCUS_LEDGER_HOME` points elsewhere.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

const LEDGER_DIR: &str = ".focus-ledger";

/// Overrides the home directory when set.
pub const HOME_ENV: &str = "FOCUS_LEDGER_HOME";

/// Returns the ledger home directory, creating it if needed.
///
/// # Errors
///
/// Returns an error if:
/// - Home directory cannot be determined
/// - Directory creation fails
pub fn ledger_home_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os(HOME_ENV) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => dirs::home_dir()
            .context("Could not determine home directory for ledger storage")?
            .join(LEDGER_DIR),
    };
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create ledger directory: {}", dir.display()))?;
    Ok(dir)
}

pub fn default_data_path() -> Result<PathBuf> {
    Ok(ledger_home_dir()?.join("ledger.txt"))
}

pub fn default_config_path() -> Result<PathBuf> {
    Ok(ledger_home_dir()?.join("config.yaml"))
}

/// Returns the journals directory, creating it if needed.
pub fn journals_dir() -> Result<PathBuf> {
    let dir = ledger_home_dir()?.join("journals");
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create journals directory: {}", dir.display()))?;
    Ok(dir)
}

/// Journal file for a given strategy log: `journals/<file-hash>.jsonl`
pub fn journal_path(data_file: &Path) -> Result<PathBuf> {
    Ok(journals_dir()?.join(format!("{}.jsonl", data_file_hash(data_file))))
}

/// Stable 12-hex-character hash of a strategy log path.
pub fn data_file_hash(path: &Path) -> String {
    let bytes = match fs::canonicalize(path) {
        Ok(canonical) => canonical.to_string_lossy().into_owned().into_bytes(),
        // The log may not exist yet
        Err(_) => path.to_string_lossy().into_owned().into_bytes(),
    };

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let result = hasher.finalize();

    hex_encode(result.iter().take(6))
}

fn hex_encode<'a>(bytes: impl IntoIterator<Item = &'a u8>) -> String {
    bytes.into_iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;
