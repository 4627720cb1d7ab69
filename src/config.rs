//! Runtime configuration for the observatory.

use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

pub const LOG_FILE_VAR: &str = "OBSERVATORY_LOG_FILE";
pub const DB_PATH_VAR: &str = "OBSERVATORY_DB_PATH";
pub const TRACING_VAR: &str = "OBSERVATORY_TRACING";
pub const SPAN_TTL_VAR: &str = "OBSERVATORY_SPAN_TTL_SECS";
pub const REAPER_INTERVAL_VAR: &str = "OBSERVATORY_REAPER_INTERVAL_SECS";
pub const LOG_FILTER_VAR: &str = "RUST_LOG";

pub const DEFAULT_LOG_FILE: &str = "agent_traces.jsonl";
pub const DEFAULT_REAPER_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Where events go and how the tracer behaves.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservabilityConfig {
    /// Authoritative JSON-lines event log.
    pub log_file: PathBuf,
    /// Optional SQLite mirror for indexed log queries.
    pub mirror_db: Option<PathBuf>,
    pub tracing_enabled: bool,
    /// Spans open longer than this are reaped. `None` disables the reaper.
    pub span_ttl: Option<Duration>,
    pub reaper_interval: Duration,
    /// `tracing_subscriber` filter directive used by [`crate::logging::init_logging`].
    pub log_filter: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

impl ObservabilityConfig {
    /// Build a configuration from an arbitrary key lookup.
    ///
    /// Unset keys take their defaults. Values that fail to parse are logged and
    /// also take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        Self {
            log_file: non_empty(LOG_FILE_VAR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE)),
            mirror_db: non_empty(DB_PATH_VAR).map(PathBuf::from),
            tracing_enabled: non_empty(TRACING_VAR).map_or(true, |value| parse_flag(&value)),
            span_ttl: non_empty(SPAN_TTL_VAR).and_then(|value| parse_secs(SPAN_TTL_VAR, &value)),
            reaper_interval: non_empty(REAPER_INTERVAL_VAR)
                .and_then(|value| parse_secs(REAPER_INTERVAL_VAR, &value))
                .unwrap_or(DEFAULT_REAPER_INTERVAL),
            log_filter: non_empty(LOG_FILTER_VAR).unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        }
    }

    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = path.into();
        self
    }

    pub fn with_mirror_db(mut self, path: impl Into<PathBuf>) -> Self {
        self.mirror_db = Some(path.into());
        self
    }

    pub fn with_tracing_enabled(mut self, enabled: bool) -> Self {
        self.tracing_enabled = enabled;
        self
    }

    pub fn with_span_ttl(mut self, ttl: Duration) -> Self {
        self.span_ttl = Some(ttl);
        self
    }

    pub fn with_reaper_interval(mut self, interval: Duration) -> Self {
        self.reaper_interval = interval;
        self
    }

    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }
}

fn parse_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "false" | "0" | "off" | "no"
    )
}

fn parse_secs(key: &str, value: &str) -> Option<Duration> {
    match value.trim().parse::<f64>() {
        Ok(secs) if secs.is_finite() && secs > 0.0 => Some(Duration::from_secs_f64(secs)),
        _ => {
            warn!(key, value, "Ignoring invalid duration, using default");
            None
        }
    }
}
