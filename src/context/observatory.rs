//! The explicit context object wiring storage, tracer, bus and queries.
//!
//! Build one [`Observatory`] at process start and hand clones of it (or of the
//! pieces it exposes) to every agent and collaborator. Nothing in the crate
//! reaches for a global instance.
//!
//! # Examples
//!
//! ```no_run
//! use agent_observatory::agents::{MemoryAgent, TracedAgent};
//! use agent_observatory::config::ObservabilityConfig;
//! use agent_observatory::context::Observatory;
//! use std::sync::Arc;
//!
//! let observatory = Observatory::new(
//!     ObservabilityConfig::default().with_log_file("agent_traces.jsonl"),
//! )?;
//!
//! let memory = TracedAgent::new(MemoryAgent::new("Memory"), observatory.tracer().clone());
//! observatory.bus().register(Arc::new(memory));
//! observatory.bus().send("User", "Memory", "remember this")?;
//!
//! let metrics = observatory.query().get_metrics();
//! assert_eq!(metrics.total_messages, 1);
//! # Ok::<(), agent_observatory::ObservatoryError>(())
//! ```

use crate::bus::MessageBus;
use crate::config::ObservabilityConfig;
use crate::error::Result;
use crate::query::QueryService;
use crate::store::{EventLog, SqliteMirror};
use crate::tracer::{SpanReaper, TracerSystem};
use std::sync::Arc;
use tracing::{info, warn};

/// Cheaply cloneable handle to one observability context.
#[derive(Clone)]
pub struct Observatory {
    config: ObservabilityConfig,
    tracer: Arc<TracerSystem>,
    bus: Arc<MessageBus>,
    query: QueryService,
}

impl Observatory {
    /// Open storage and build the tracer, bus and query surface.
    ///
    /// A mirror database that cannot be opened is logged and skipped; the
    /// JSON-lines log alone is enough to run.
    ///
    /// # Errors
    ///
    /// Returns an error when the event log location cannot be prepared.
    pub fn new(config: ObservabilityConfig) -> Result<Self> {
        let event_log = Arc::new(EventLog::new(&config.log_file)?);

        let mirror = match &config.mirror_db {
            Some(path) => match SqliteMirror::open(path) {
                Ok(mirror) => Some(Arc::new(mirror)),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Mirror database unavailable, continuing without it");
                    None
                }
            },
            None => None,
        };

        let mut tracer = TracerSystem::new(event_log.clone(), config.tracing_enabled);
        let mut query = QueryService::new(event_log);
        if let Some(mirror) = mirror {
            tracer = tracer.with_mirror(mirror.clone());
            query = query.with_mirror(mirror);
        }
        let tracer = Arc::new(tracer);
        let bus = Arc::new(MessageBus::new(tracer.clone()));

        info!(
            log_file = %config.log_file.display(),
            mirrored = tracer.mirror().is_some(),
            tracing_enabled = config.tracing_enabled,
            "Observatory ready"
        );

        Ok(Self {
            config,
            tracer,
            bus,
            query,
        })
    }

    /// Build from environment variables. Meant for entry points only.
    pub fn from_env() -> Result<Self> {
        Self::new(ObservabilityConfig::default())
    }

    pub fn config(&self) -> &ObservabilityConfig {
        &self.config
    }

    pub fn tracer(&self) -> &Arc<TracerSystem> {
        &self.tracer
    }

    pub fn bus(&self) -> &Arc<MessageBus> {
        &self.bus
    }

    pub fn query(&self) -> &QueryService {
        &self.query
    }

    /// Start a span reaper when a span TTL is configured.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Returns
    ///
    /// The running reaper, or `None` when no TTL is configured. The caller owns
    /// the reaper; dropping it stops the sweep.
    pub fn start_reaper(&self) -> Result<Option<SpanReaper>> {
        let Some(ttl) = self.config.span_ttl else {
            return Ok(None);
        };

        let mut reaper =
            SpanReaper::new(self.tracer.clone(), ttl).with_interval(self.config.reaper_interval);
        reaper.start()?;
        Ok(Some(reaper))
    }
}
