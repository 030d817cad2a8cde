//! Platform probe strategies and the per-tick orchestrator.
//!
//! Each probe produces one metric family or null; a probe never fails a
//! tick, and one probe's failure leaves its siblings untouched. The
//! strategy for the running host is chosen once at startup; the rest of
//! the agent only ever sees the [`HostProbes`] trait.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::time::{error::Elapsed, timeout};
use tracing::warn;

use crate::config;
use crate::types::{CpuIdentity, GpuReading, MemoryStats, ProcessSample, Snapshot};

mod exec;
pub mod linux;
pub mod macos;
pub mod parse;

/// One platform's sampling strategy. Implementations shell out to OS tools
/// or read pseudo-files; all of them degrade to `None` (or the all-Unknown
/// identity record) instead of surfacing errors.
#[async_trait]
pub trait HostProbes: Send + Sync {
    /// Instantaneous CPU utilization, 0..=100.
    async fn cpu_usage(&self) -> Option<f64>;

    /// Byte counts. The two platforms derive `used` differently; both are
    /// approximations of "in use" and must not be compared numerically.
    async fn memory(&self) -> Option<MemoryStats>;

    async fn gpu(&self) -> Option<GpuReading>;

    /// Never fails: unknown fields fall back to "Unknown"/null.
    async fn cpu_identity(&self) -> CpuIdentity;

    /// Top consumers by CPU, at most [`crate::types::MAX_PROCESSES`]. A
    /// tool failure yields `None`, never a partial list.
    async fn processes(&self) -> Option<Vec<ProcessSample>>;
}

/// Pick the probe strategy for the running host.
pub fn detect() -> Arc<dyn HostProbes> {
    match std::env::consts::OS {
        "linux" => Arc::new(linux::LinuxProbes),
        "macos" => Arc::new(macos::MacProbes),
        other => {
            warn!(os = other, "unsupported host, all probes will report null");
            Arc::new(UnsupportedProbes)
        }
    }
}

/// Strategy for hosts we do not sample: every family is null and identity
/// is all-Unknown, so the wire shape stays intact for clients.
pub struct UnsupportedProbes;

#[async_trait]
impl HostProbes for UnsupportedProbes {
    async fn cpu_usage(&self) -> Option<f64> {
        None
    }
    async fn memory(&self) -> Option<MemoryStats> {
        None
    }
    async fn gpu(&self) -> Option<GpuReading> {
        None
    }
    async fn cpu_identity(&self) -> CpuIdentity {
        CpuIdentity::unknown()
    }
    async fn processes(&self) -> Option<Vec<ProcessSample>> {
        None
    }
}

fn settle<T>(result: Result<Option<T>, Elapsed>, probe: &str) -> Option<T> {
    match result {
        Ok(v) => v,
        Err(_) => {
            warn!(probe, "probe exceeded timeout, dropping its sample");
            None
        }
    }
}

/// One sampling tick: run every probe concurrently, join once all settle.
/// Individual failures (including timeouts) surface as null fields; a
/// partial snapshot is never produced mid-join.
pub async fn sample_snapshot(probes: &dyn HostProbes) -> Snapshot {
    let budget = config::probe_timeout();
    let gpu_probe = async {
        if config::gpu_enabled() {
            probes.gpu().await
        } else {
            None
        }
    };

    let (cpu, memory, gpu, cpu_info, processes) = tokio::join!(
        timeout(budget, probes.cpu_usage()),
        timeout(budget, probes.memory()),
        timeout(budget, gpu_probe),
        timeout(budget, probes.cpu_identity()),
        timeout(budget, probes.processes()),
    );

    Snapshot {
        cpu_usage_percent: settle(cpu, "cpu_usage"),
        memory: settle(memory, "memory"),
        gpu: settle(gpu, "gpu"),
        cpu_info: cpu_info.unwrap_or_else(|_| {
            warn!(probe = "cpu_identity", "probe exceeded timeout, reporting Unknown");
            CpuIdentity::unknown()
        }),
        processes: settle(processes, "processes"),
    }
}
