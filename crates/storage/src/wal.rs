// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Write-ahead log for durable document storage

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use ab_adapters::Revision;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Errors that can occur in WAL operations
#[derive(Debug, Error)]
pub enum WalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("corrupt WAL entry at line {line}: {reason}")]
    Corrupt { line: usize, reason: String },
    #[error("WAL unusable after a failed append could not be rolled back")]
    Poisoned,
}

/// One committed document write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocWrite {
    pub key: String,
    pub revision: Revision,
    pub value: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct WalEntry {
    seq: u64,
    #[serde(flatten)]
    write: DocWrite,
}

/// Append-only JSON-lines log of document writes
pub struct Wal {
    file: File,
    sequence: u64,
    poisoned: bool,
}

impl Wal {
    /// Open or create a WAL at the given path.
    ///
    /// An unterminated final line is a write torn by a crash; it was never
    /// acknowledged, so it is cut off before new entries are appended.
    pub fn open(path: &Path) -> Result<Self, WalError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(path)?;

        let contents = std::fs::read(path)?;
        let valid = contents
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |i| i + 1);
        if valid < contents.len() {
            warn!(
                path = %path.display(),
                bytes = contents.len() - valid,
                "discarding torn WAL tail"
            );
            file.set_len(valid as u64)?;
        }

        let sequence = contents[..valid]
            .split(|&b| b == b'\n')
            .filter(|line| !line.iter().all(u8::is_ascii_whitespace))
            .count() as u64;

        Ok(Self {
            file,
            sequence,
            poisoned: false,
        })
    }

    /// Append a write and sync it to disk before returning.
    ///
    /// On failure the file is cut back to its previous length, so a write
    /// reported as failed never reappears on replay. If that cut fails too,
    /// every later append is refused.
    pub fn append(&mut self, write: &DocWrite) -> Result<u64, WalError> {
        self.append_with(write, |file, bytes| {
            file.write_all(bytes)?;
            file.sync_data()
        })
    }

    fn append_with(
        &mut self,
        write: &DocWrite,
        commit: impl FnOnce(&mut File, &[u8]) -> io::Result<()>,
    ) -> Result<u64, WalError> {
        if self.poisoned {
            return Err(WalError::Poisoned);
        }
        let entry = WalEntry {
            seq: self.sequence + 1,
            write: write.clone(),
        };
        let mut bytes = serde_json::to_vec(&entry)?;
        bytes.push(b'\n');

        let before = self.file.metadata()?.len();
        if let Err(e) = commit(&mut self.file, &bytes) {
            if let Err(undo) = self.file.set_len(before).and_then(|()| self.file.sync_data()) {
                warn!(error = %undo, "failed to roll back WAL append");
                self.poisoned = true;
            }
            return Err(e.into());
        }
        self.sequence += 1;
        Ok(self.sequence)
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Replay all writes from the log, in commit order
    pub fn replay(path: &Path) -> Result<Vec<DocWrite>, WalError> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut writes = Vec::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: WalEntry = serde_json::from_str(&line).map_err(|e| WalError::Corrupt {
                line: index + 1,
                reason: e.to_string(),
            })?;
            writes.push(entry.write);
        }

        Ok(writes)
    }
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
