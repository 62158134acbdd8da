//! Host and process resource record.
//!
//! [`SystemMetrics`] is a fixed record, not a series map. It is updated with
//! [`SystemMetricsUpdate`], whose `None` fields leave the stored value as it
//! was, so producers that only know some fields (the sampler cannot see the
//! renderer heap, the renderer cannot see host CPU) can share one record.

use serde::{Deserialize, Serialize};
use sysinfo::{Pid, System};
use tracing::{debug, trace};

use crate::error::SamplerError;

/// System resource record exposed in every snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemMetrics {
    pub cpu_percent: f64,
    pub memory_used_bytes: u64,
    pub memory_total_bytes: u64,
    pub heap_used_bytes: u64,
    pub app_memory_used_bytes: u64,
    pub event_loop_lag_ms: f64,
}

impl SystemMetrics {
    /// Merge an update into this record. Only provided fields are written.
    pub fn apply(&mut self, update: &SystemMetricsUpdate) {
        if let Some(v) = update.cpu_percent {
            self.cpu_percent = v;
        }
        if let Some(v) = update.memory_used_bytes {
            self.memory_used_bytes = v;
        }
        if let Some(v) = update.memory_total_bytes {
            self.memory_total_bytes = v;
        }
        if let Some(v) = update.heap_used_bytes {
            self.heap_used_bytes = v;
        }
        if let Some(v) = update.app_memory_used_bytes {
            self.app_memory_used_bytes = v;
        }
        if let Some(v) = update.event_loop_lag_ms {
            self.event_loop_lag_ms = v;
        }
    }

    /// Memory used as a percentage of total. Zero when total is unknown.
    pub fn memory_percent(&self) -> f64 {
        if self.memory_total_bytes == 0 {
            0.0
        } else {
            self.memory_used_bytes as f64 / self.memory_total_bytes as f64 * 100.0
        }
    }
}

/// Partial update for [`SystemMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemMetricsUpdate {
    pub cpu_percent: Option<f64>,
    pub memory_used_bytes: Option<u64>,
    pub memory_total_bytes: Option<u64>,
    pub heap_used_bytes: Option<u64>,
    pub app_memory_used_bytes: Option<u64>,
    pub event_loop_lag_ms: Option<f64>,
}

impl SystemMetricsUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cpu_percent(mut self, v: f64) -> Self {
        self.cpu_percent = Some(v);
        self
    }

    pub fn with_memory(mut self, used: u64, total: u64) -> Self {
        self.memory_used_bytes = Some(used);
        self.memory_total_bytes = Some(total);
        self
    }

    pub fn with_heap_used_bytes(mut self, v: u64) -> Self {
        self.heap_used_bytes = Some(v);
        self
    }

    pub fn with_app_memory_used_bytes(mut self, v: u64) -> Self {
        self.app_memory_used_bytes = Some(v);
        self
    }

    pub fn with_event_loop_lag_ms(mut self, v: f64) -> Self {
        self.event_loop_lag_ms = Some(v);
        self
    }
}

impl From<SystemMetrics> for SystemMetricsUpdate {
    fn from(m: SystemMetrics) -> Self {
        Self {
            cpu_percent: Some(m.cpu_percent),
            memory_used_bytes: Some(m.memory_used_bytes),
            memory_total_bytes: Some(m.memory_total_bytes),
            heap_used_bytes: Some(m.heap_used_bytes),
            app_memory_used_bytes: Some(m.app_memory_used_bytes),
            event_loop_lag_ms: Some(m.event_loop_lag_ms),
        }
    }
}

// ----------------------------------------------------------------------------
// System Probe - Host & Process Readings via sysinfo
// ----------------------------------------------------------------------------

/// Reads host CPU/memory and this process's resident memory.
///
/// CPU usage is a delta between refreshes, so the first sample after
/// construction reads as zero.
pub struct SystemProbe {
    system: System,
    pid: Pid,
}

impl SystemProbe {
    pub fn new() -> Result<Self, SamplerError> {
        let pid = sysinfo::get_current_pid().map_err(|e| SamplerError::SystemProbe {
            message: e.to_string(),
        })?;

        let mut system = System::new();
        system.refresh_cpu();
        system.refresh_memory();

        debug!(target: "metrics_collector::system", pid = %pid, "System probe initialized");
        Ok(Self { system, pid })
    }

    /// Refresh readings and build an update. Heap usage is not set; there is
    /// no portable allocator statistic to read it from.
    pub fn sample(&mut self, event_loop_lag_ms: f64) -> SystemMetricsUpdate {
        self.system.refresh_cpu();
        self.system.refresh_memory();

        let mut update = SystemMetricsUpdate::new()
            .with_cpu_percent(self.system.global_cpu_info().cpu_usage() as f64)
            .with_memory(self.system.used_memory(), self.system.total_memory())
            .with_event_loop_lag_ms(event_loop_lag_ms);

        if self.system.refresh_process(self.pid) {
            if let Some(process) = self.system.process(self.pid) {
                update = update.with_app_memory_used_bytes(process.memory());
            }
        }

        trace!(
            target: "metrics_collector::system",
            cpu_percent = ?update.cpu_percent,
            memory_used_bytes = ?update.memory_used_bytes,
            app_memory_used_bytes = ?update.app_memory_used_bytes,
            "System sample taken"
        );

        update
    }
}

impl std::fmt::Debug for SystemProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemProbe").field("pid", &self.pid).finish()
    }
}
