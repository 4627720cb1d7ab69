//! Event log persistence.
//!
//! - [`EventLog`]: append-only JSON-lines file, the authoritative record
//! - [`SqliteMirror`]: optional indexed copy for filtered log queries
//! - [`EventRecord`]: the flattened line format shared by every writer and reader
//! - [`LogEntry`]: tabular projection of a record

pub mod event_log;
pub mod log_entry;
pub mod record;
pub mod sqlite_mirror;

pub use event_log::{EventLog, LogSnapshot, RecordCallback};
pub use log_entry::LogEntry;
pub use record::{EventRecord, MESSAGE_SENT};
pub use sqlite_mirror::{LogStats, SqliteMirror};
