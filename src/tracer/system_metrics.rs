//! Host resource sampling for `system_metrics` events.

use serde::{Deserialize, Serialize};
use sysinfo::System;

/// `event_type` of the host resource point event.
pub const SYSTEM_METRICS: &str = "system_metrics";

/// CPU and memory usage of the host at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SystemSnapshot {
    /// Global CPU usage, 0-100.
    pub cpu_percent: f64,
    /// Share of total memory in use, 0-100.
    pub memory_percent: f64,
    /// Memory available for new allocations, in MiB, rounded to 2 decimals.
    pub available_memory_mb: f64,
}

impl SystemSnapshot {
    /// Sample the host.
    ///
    /// Blocks for [`sysinfo::MINIMUM_CPU_UPDATE_INTERVAL`] because CPU usage is
    /// measured between two refreshes.
    pub fn sample() -> Self {
        let mut system = System::new();
        system.refresh_cpu();
        std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
        system.refresh_cpu();
        system.refresh_memory();

        Self::from_raw(
            system.global_cpu_info().cpu_usage() as f64,
            system.total_memory(),
            system.used_memory(),
            system.available_memory(),
        )
    }

    /// Build a snapshot from raw counters, memory in bytes.
    pub fn from_raw(cpu_usage: f64, total_bytes: u64, used_bytes: u64, available_bytes: u64) -> Self {
        let cpu_percent = if cpu_usage.is_finite() {
            round2(cpu_usage.clamp(0.0, 100.0))
        } else {
            0.0
        };
        let memory_percent = if total_bytes == 0 {
            0.0
        } else {
            round2(used_bytes as f64 / total_bytes as f64 * 100.0)
        };

        Self {
            cpu_percent,
            memory_percent,
            available_memory_mb: round2(available_bytes as f64 / (1024.0 * 1024.0)),
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
