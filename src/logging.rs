//! Diagnostic log setup for entry points.
//!
//! Library code only emits `tracing` events. Binaries, demos and tests that want
//! to see them call [`init_logging`] once at startup.

use crate::error::{ObservatoryError, Result};
use tracing_subscriber::EnvFilter;

/// Install a formatted `tracing` subscriber filtered by `filter`.
///
/// # Arguments
///
/// * `filter` - An `EnvFilter` directive such as `"info"` or `"agent_observatory=debug"`
///
/// # Returns
///
/// `Ok(true)` when the subscriber was installed, `Ok(false)` when a global
/// subscriber was already set, or an error for an invalid directive.
pub fn init_logging(filter: &str) -> Result<bool> {
    let filter = EnvFilter::try_new(filter)
        .map_err(|e| ObservatoryError::Config(format!("Invalid log filter '{}': {}", filter, e)))?;

    Ok(tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok())
}
