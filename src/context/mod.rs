//! Process-wide observability context.
//!
//! [`Observatory`] owns the event log, tracer, message bus and query surface
//! for one process and is passed explicitly to whoever needs them.

pub mod observatory;

pub use observatory::Observatory;
