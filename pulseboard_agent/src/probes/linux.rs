//! Linux probe strategy: procps tools plus /proc pseudo-files.

use async_trait::async_trait;
use tracing::debug;

use super::exec::try_tool;
use super::{parse, HostProbes};
use crate::types::{CpuIdentity, GpuReading, MemoryStats, ProcessSample, MAX_PROCESSES};

/// Candidate install locations for the NVIDIA query tool, probed in order.
/// The first one that runs and yields at least one device wins.
const NVIDIA_SMI_PATHS: [&str; 5] = [
    "nvidia-smi",
    "/usr/bin/nvidia-smi",
    "/usr/local/bin/nvidia-smi",
    "/opt/cuda/bin/nvidia-smi",
    "/usr/local/cuda/bin/nvidia-smi",
];

const NVIDIA_SMI_QUERY: &str =
    "--query-gpu=index,name,utilization.gpu,memory.used,memory.total,temperature.gpu";

pub struct LinuxProbes;

#[async_trait]
impl HostProbes for LinuxProbes {
    async fn cpu_usage(&self) -> Option<f64> {
        // Two samples 0.2s apart; the first is the since-boot average.
        let out = try_tool("top", &["-b", "-n", "2", "-d", "0.2"]).await?;
        parse::linux_top_cpu_usage(&out)
    }

    async fn memory(&self) -> Option<MemoryStats> {
        let data = tokio::fs::read_to_string("/proc/meminfo").await.ok()?;
        parse::linux_meminfo(&data)
    }

    async fn gpu(&self) -> Option<GpuReading> {
        for path in NVIDIA_SMI_PATHS {
            let Some(out) = try_tool(path, &[NVIDIA_SMI_QUERY, "--format=csv,noheader,nounits"]).await
            else {
                continue;
            };
            let devices = parse::nvidia_smi_devices(&out);
            if !devices.is_empty() {
                return Some(GpuReading::Devices(devices));
            }
        }
        // No speculative fallback on this platform: no tool, no data.
        debug!("no usable nvidia-smi, reporting no gpu");
        None
    }

    async fn cpu_identity(&self) -> CpuIdentity {
        match tokio::fs::read_to_string("/proc/cpuinfo").await {
            Ok(data) => parse::linux_cpuinfo(&data, std::env::consts::ARCH),
            Err(e) => {
                debug!(error = %e, "reading /proc/cpuinfo failed");
                CpuIdentity::unknown()
            }
        }
    }

    async fn processes(&self) -> Option<Vec<ProcessSample>> {
        let out = try_tool(
            "ps",
            &["-eo", "comm,pcpu,pmem", "--sort=-pcpu", "--no-headers"],
        )
        .await?;
        Some(parse::ps_process_lines(out.lines().take(MAX_PROCESSES)))
    }
}
