//! Strategy log backed by a text file, one (optionally encrypted) line per strategy.
//!
//! Readers take a shared lock and writers an exclusive one, so several processes
//! can point at the same file. Blank lines and lines starting with `#` are skipped.

use super::StrategyLog;
use crate::crypto::{Cryptograph, PlainCryptograph};
use crate::domain::LedgerError;
use crate::strategy::{codec, Strategy};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

pub struct FileLog {
    path: PathBuf,
    cryptograph: Box<dyn Cryptograph>,
}

impl FileLog {
    pub fn new(path: PathBuf, cryptograph: Box<dyn Cryptograph>) -> Self {
        Self { path, cryptograph }
    }

    /// Unencrypted log.
    pub fn plain(path: PathBuf) -> Self {
        Self::new(path, Box::new(PlainCryptograph))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn is_skipped(line: &str) -> bool {
        let trimmed = line.trim();
        trimmed.is_empty() || trimmed.starts_with('#')
    }

    fn read_all(&self, file: &File) -> Result<Vec<Strategy>, LedgerError> {
        let mut reader = BufReader::new(file.try_clone()?);
        reader.seek(SeekFrom::Start(0))?;

        let mut strategies = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if Self::is_skipped(&line) {
                continue;
            }
            let plain = self.cryptograph.decrypt(line.trim_end())?;
            if Self::is_skipped(&plain) {
                continue;
            }
            let strategy = codec::decode(&plain).map_err(|err| {
                LedgerError::codec(format!(
                    "{}:{}: {}",
                    self.path.display(),
                    index + 1,
                    err
                ))
            })?;
            strategies.push(strategy);
        }
        Ok(strategies)
    }
}

impl StrategyLog for FileLog {
    fn name(&self) -> &'static str {
        "File"
    }

    fn load(&mut self) -> Result<Vec<Strategy>, LedgerError> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        FileExt::lock_shared(&file)?;
        let strategies = self.read_all(&file);
        FileExt::unlock(&file)?;
        strategies
    }

    fn append(&mut self, strategies: &[Strategy]) -> Result<(), LedgerError> {
        let Some(first) = strategies.first() else {
            return Ok(());
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)?;
        FileExt::lock_exclusive(&file)?;

        // Another writer may have appended since this process last read the file
        let on_disk = self.read_all(&file)?.last().map_or(0, |s| s.sequence);
        if on_disk + 1 != first.sequence {
            FileExt::unlock(&file)?;
            return Err(LedgerError::Sequence {
                expected: on_disk + 1,
                received: first.sequence,
            });
        }

        let mut buffer = String::new();
        for strategy in strategies {
            buffer.push_str(&self.cryptograph.encrypt(&codec::encode(strategy))?);
            buffer.push('\n');
        }
        file.write_all(buffer.as_bytes())?;
        file.flush()?;
        file.sync_all()?;
        FileExt::unlock(&file)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/file_tests.rs"]
mod tests;
