//! Append-only JSON-lines event log.
//!
//! The log is the authoritative record of everything the tracer observed. Each
//! record is serialized to a single line and written with one `write_all` call
//! while holding the writer lock, so concurrent producers never interleave
//! mid-record. Reads skip lines that fail to parse instead of aborting.

use super::record::EventRecord;
use crate::error::{ObservatoryError, Result};
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Type alias for callbacks fired after a record has been durably appended
pub type RecordCallback = Arc<dyn Fn(&EventRecord) + Send + Sync>;

/// Records read back from the log, in write order.
#[derive(Debug, Clone, Default)]
pub struct LogSnapshot {
    pub records: Vec<EventRecord>,
    /// Lines that could not be parsed and were skipped.
    pub malformed: usize,
}

/// File-backed, append-only store for [`EventRecord`]s
pub struct EventLog {
    path: PathBuf,
    write_lock: Mutex<()>,
    on_append_callback: Option<RecordCallback>,
}

impl EventLog {
    /// Create a log writing to `path`.
    ///
    /// The file itself is created lazily on first append; missing parent
    /// directories are created here.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        Ok(Self {
            path,
            write_lock: Mutex::new(()),
            on_append_callback: None,
        })
    }

    /// Register a callback invoked with every successfully appended record.
    pub fn with_callback(mut self, callback: RecordCallback) -> Self {
        self.on_append_callback = Some(callback);
        self
    }

    /// Location of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record as a single line.
    ///
    /// Either the whole line is written or an error is returned; earlier records
    /// are never touched.
    pub fn append(&self, record: &EventRecord) -> Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        {
            let _guard = self.write_lock.lock();
            let mut file = OpenOptions::new()
                .create(true)
                .read(true)
                .append(true)
                .open(&self.path)?;

            let prev_len = file.metadata()?.len();
            if prev_len > 0 && !ends_with_newline(&mut file, prev_len)? {
                // A torn record from an earlier crash; start ours on a fresh line.
                line.insert(0, '\n');
            }

            if let Err(e) = file.write_all(line.as_bytes()).and_then(|()| file.flush()) {
                if let Err(trunc) = file.set_len(prev_len) {
                    warn!(error = %trunc, path = %self.path.display(), "Failed to roll back partial append");
                }
                return Err(e.into());
            }
        }

        if let Some(callback) = &self.on_append_callback {
            callback(record);
        }

        Ok(())
    }

    /// Read every well-formed record in write order.
    ///
    /// A missing file is an empty log, not an error.
    pub fn read_all(&self) -> Result<LogSnapshot> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(LogSnapshot::default()),
            Err(e) => return Err(e.into()),
        };

        let mut snapshot = LogSnapshot::default();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = match line {
                Ok(line) => line,
                Err(e) if e.kind() == ErrorKind::InvalidData => {
                    debug!(line = index + 1, "Skipping non UTF-8 log line");
                    snapshot.malformed += 1;
                    continue;
                }
                Err(e) => {
                    return Err(ObservatoryError::Storage(format!(
                        "Failed reading {}: {}",
                        self.path.display(),
                        e
                    )))
                }
            };

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            match serde_json::from_str::<EventRecord>(trimmed) {
                Ok(record) => snapshot.records.push(record),
                Err(e) => {
                    debug!(line = index + 1, error = %e, "Skipping malformed log record");
                    snapshot.malformed += 1;
                }
            }
        }

        Ok(snapshot)
    }

    /// Read records most-recent-first, optionally filtered by agent and level.
    ///
    /// # Arguments
    ///
    /// * `agent` - Keep records attributed to this agent (span owner or message sender)
    /// * `level` - Keep records with this level (`INFO` or `ERROR`, case-insensitive)
    /// * `limit` - Maximum number of records returned
    pub fn read(
        &self,
        agent: Option<&str>,
        level: Option<&str>,
        limit: usize,
    ) -> Result<Vec<EventRecord>> {
        let snapshot = self.read_all()?;

        Ok(snapshot
            .records
            .into_iter()
            .rev()
            .filter(|record| agent.map_or(true, |a| record.agent() == Some(a)))
            .filter(|record| level.map_or(true, |l| record.level().eq_ignore_ascii_case(l)))
            .take(limit)
            .collect())
    }
}

/// Whether the last byte of a `len`-byte file is a newline.
fn ends_with_newline(file: &mut File, len: u64) -> std::io::Result<bool> {
    let mut last = [0u8; 1];
    file.seek(SeekFrom::Start(len - 1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}
