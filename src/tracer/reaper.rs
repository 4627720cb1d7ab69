//! Background sweep that force-closes abandoned spans.
//!
//! A handler that crashes between `start_trace` and `end_trace` leaves its span
//! open forever. [`SpanReaper`] periodically calls
//! [`TracerSystem::reap_stale`] on a tokio task so such spans eventually show up
//! in the log as errors.

use super::tracer_system::TracerSystem;
use crate::error::{ObservatoryError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Periodic reaper for spans older than a configured age.
///
/// # Examples
///
/// ```ignore
/// let mut reaper = SpanReaper::new(tracer, Duration::from_secs(300))
///     .with_interval(Duration::from_secs(30));
///
/// reaper.start()?;
/// // ...
/// reaper.stop().await?;
/// ```
pub struct SpanReaper {
    tracer: Arc<TracerSystem>,
    max_age: Duration,
    interval: Duration,
    stop_flag: Arc<AtomicBool>,
    task_handle: Option<JoinHandle<()>>,
}

impl SpanReaper {
    /// Create a new reaper.
    ///
    /// # Arguments
    ///
    /// * `tracer` - The tracer whose open spans are swept
    /// * `max_age` - Spans open longer than this are closed as errors
    pub fn new(tracer: Arc<TracerSystem>, max_age: Duration) -> Self {
        Self {
            tracer,
            max_age,
            interval: Duration::from_secs(30),
            stop_flag: Arc::new(AtomicBool::new(false)),
            task_handle: None,
        }
    }

    /// Set how often the sweep runs.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn is_running(&self) -> bool {
        self.task_handle.is_some()
    }

    /// Start the sweep task on the current tokio runtime.
    pub fn start(&mut self) -> Result<()> {
        if self.task_handle.is_some() {
            return Err(ObservatoryError::Reaper("Reaper already started".to_string()));
        }
        if self.interval.is_zero() {
            return Err(ObservatoryError::Config(
                "Reaper interval must be greater than zero".to_string(),
            ));
        }

        debug!("Starting span reaper");
        self.stop_flag.store(false, Ordering::Relaxed);

        let tracer = self.tracer.clone();
        let stop_flag = self.stop_flag.clone();
        let max_age = self.max_age;
        let interval = self.interval;

        let handle = tokio::spawn(async move {
            Self::sweep_loop(tracer, stop_flag, max_age, interval).await;
        });

        self.task_handle = Some(handle);
        info!(
            max_age_secs = max_age.as_secs_f64(),
            interval_secs = interval.as_secs_f64(),
            "Span reaper started"
        );

        Ok(())
    }

    /// Stop the sweep task and wait for it to finish.
    pub async fn stop(&mut self) -> Result<()> {
        if let Some(handle) = self.task_handle.take() {
            debug!("Stopping span reaper");
            self.stop_flag.store(true, Ordering::Relaxed);
            handle.abort();
            match handle.await {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => {}
                Err(e) => {
                    return Err(ObservatoryError::Reaper(format!("Failed to stop reaper: {}", e)))
                }
            }
            info!("Span reaper stopped");
        }

        Ok(())
    }

    async fn sweep_loop(
        tracer: Arc<TracerSystem>,
        stop_flag: Arc<AtomicBool>,
        max_age: Duration,
        interval: Duration,
    ) {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately.
        ticker.tick().await;

        while !stop_flag.load(Ordering::Relaxed) {
            ticker.tick().await;
            let reaped = tracer.reap_stale(max_age);
            if !reaped.is_empty() {
                debug!(count = reaped.len(), "Reaper closed abandoned spans");
            }
        }

        debug!("Reaper loop exiting");
    }
}

impl Drop for SpanReaper {
    fn drop(&mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        if let Some(handle) = self.task_handle.take() {
            handle.abort();
        }
    }
}
