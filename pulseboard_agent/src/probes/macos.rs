//! macOS probe strategy: sysctl queries plus top, vm_stat, ps and
//! system_profiler.

use async_trait::async_trait;

use super::exec::try_tool;
use super::{parse, HostProbes};
use crate::types::{CpuIdentity, GpuReading, MemoryStats, ProcessSample, MAX_PROCESSES};

async fn sysctl(key: &str) -> Option<String> {
    let out = try_tool("sysctl", &["-n", key]).await?;
    let trimmed = out.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_string())
}

pub struct MacProbes;

#[async_trait]
impl HostProbes for MacProbes {
    async fn cpu_usage(&self) -> Option<f64> {
        // Two zero-delay samples; the first reports since-boot figures.
        let out = try_tool("top", &["-l", "2", "-n", "0"]).await?;
        parse::mac_top_cpu_usage(&out)
    }

    async fn memory(&self) -> Option<MemoryStats> {
        let total: u64 = sysctl("hw.memsize").await?.parse().ok()?;
        let out = try_tool("vm_stat", &[]).await?;
        Some(parse::mac_vm_stat_memory(total, &out))
    }

    async fn gpu(&self) -> Option<GpuReading> {
        // No device-level metrics tool is assumed on this platform; the
        // display profiler at least names the chipset.
        let out = try_tool("system_profiler", &["SPDisplaysDataType"]).await?;
        parse::mac_chipset_model(&out).map(GpuReading::Model)
    }

    async fn cpu_identity(&self) -> CpuIdentity {
        let cores = sysctl("hw.ncpu")
            .await
            .and_then(|v| v.parse().ok())
            .unwrap_or(1);
        let model = sysctl("machdep.cpu.brand_string")
            .await
            .unwrap_or_else(|| "Unknown".into());
        let freq_mhz = sysctl("hw.cpufrequency")
            .await
            .and_then(|v| v.parse::<f64>().ok())
            .map(|hz| hz / 1_000_000.0);
        // L3 size arrives in bytes; reported at the historical MB scaling
        // the dashboard expects for this platform.
        let cache_kb = sysctl("hw.l3cachesize")
            .await
            .and_then(|v| v.parse::<f64>().ok())
            .map(|bytes| bytes / 1024.0 / 1024.0);
        CpuIdentity {
            cores,
            model,
            arch: std::env::consts::ARCH.to_string(),
            freq_mhz,
            cache_kb,
            vendor: "Apple".into(),
        }
    }

    async fn processes(&self) -> Option<Vec<ProcessSample>> {
        let out = try_tool("ps", &["-eo", "comm,pcpu,pmem", "-r", "-m"]).await?;
        // BSD ps prints a header row; skip it before taking the top ten.
        Some(parse::ps_process_lines(
            out.lines().skip(1).take(MAX_PROCESSES),
        ))
    }
}
