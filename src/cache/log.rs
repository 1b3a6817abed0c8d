//! Append-only JSONL conversation log.
//!
//! One [`PromptRecord`] per line. Writers are serialized through a mutex and
//! each record is emitted with a single `write_all`, so concurrent appends
//! never interleave partial lines. An append returns only after the data
//! has been synced to the device. Loading is tolerant: a corrupt line is
//! skipped with a warning rather than aborting startup.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{BenderError, Result};

/// One persisted prompt/response pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptRecord {
    pub prompt: String,
    pub response: String,
    pub timestamp: DateTime<Utc>,
}

impl PromptRecord {
    /// Build a record stamped with the current time.
    pub fn now(prompt: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            response: response.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Records recovered by [`PersistentLog::load_all`].
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Valid records in file order.
    pub records: Vec<PromptRecord>,
    /// Corrupt or incomplete lines that were skipped. Blank lines are not counted.
    pub skipped: usize,
}

/// Append-only conversation log backed by a single file.
pub struct PersistentLog {
    path: PathBuf,
    writer: Mutex<()>,
}

impl PersistentLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Take the writer lock. Callers that must keep other state in step with
    /// the file (the response cache) hold this across append and update.
    pub(crate) fn lock(&self) -> MutexGuard<'_, ()> {
        // A poisoned lock only means another writer panicked mid-call; the
        // file itself is still line-consistent, so keep going.
        self.writer.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append one record as a JSON line.
    pub fn append(&self, record: &PromptRecord) -> Result<()> {
        let _guard = self.lock();
        self.append_locked(record)
    }

    /// Append while the caller already holds [`Self::lock`].
    pub(crate) fn append_locked(&self, record: &PromptRecord) -> Result<()> {
        let mut line = serde_json::to_string(record)
            .map_err(|e| BenderError::Persistence(format!("Failed to encode record: {e}")))?;
        line.push('\n');

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                BenderError::Persistence(format!(
                    "Failed to create log directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                BenderError::Persistence(format!("Failed to open {}: {e}", self.path.display()))
            })?;
        // A crash can leave a partial last line; never glue a record onto it.
        if !ends_with_newline(&mut file) {
            line.insert(0, '\n');
        }
        file.write_all(line.as_bytes())
            .and_then(|()| file.sync_data())
            .map_err(|e| {
                BenderError::Persistence(format!(
                    "Failed to append to {}: {e}",
                    self.path.display()
                ))
            })?;

        debug!(path = %self.path.display(), "Appended conversation record");
        Ok(())
    }

    /// Read every record in file order.
    ///
    /// A missing file is an empty log. Lines that are not valid UTF-8, not
    /// valid JSON, or lack `prompt`/`response`/`timestamp` are skipped and
    /// counted. Only a failure to open or read the file is an error.
    pub fn load_all(&self) -> Result<LoadReport> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(LoadReport::default()),
            Err(e) => {
                return Err(BenderError::Persistence(format!(
                    "Failed to open {}: {e}",
                    self.path.display()
                )))
            }
        };

        let mut report = LoadReport::default();
        for (index, chunk) in BufReader::new(file).split(b'\n').enumerate() {
            let bytes = chunk.map_err(|e| {
                BenderError::Persistence(format!("Failed to read {}: {e}", self.path.display()))
            })?;
            let line_no = index + 1;

            let Ok(line) = std::str::from_utf8(&bytes) else {
                warn!(line = line_no, "Skipping non-UTF-8 line in conversation log");
                report.skipped += 1;
                continue;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match serde_json::from_str::<PromptRecord>(line) {
                Ok(record) => report.records.push(record),
                Err(e) => {
                    warn!(line = line_no, error = %e, "Skipping invalid conversation log line");
                    report.skipped += 1;
                }
            }
        }

        Ok(report)
    }
}

/// True for an empty file or one whose last byte is `\n`.
fn ends_with_newline(file: &mut File) -> bool {
    if file.seek(SeekFrom::End(0)).unwrap_or(0) == 0 {
        return true;
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))
        .and_then(|_| file.read_exact(&mut last))
        .map_or(true, |()| last[0] == b'\n')
}
