//! Data types sent to the client over WebSocket and `/api/stats`.
//! Keep this module minimal and stable — it defines the wire format.
//!
//! Every metric family is independently nullable: `null` means "could not
//! be determined on this host, at this time" and is never an error by
//! itself. Fields are always serialized, so absent data shows up as an
//! explicit `null` rather than a missing key.

use serde::{Deserialize, Serialize};

/// Cap on entries in [`Snapshot::processes`].
pub const MAX_PROCESSES: usize = 10;
/// Process names are truncated to this many characters for display.
pub const MAX_PROCESS_NAME_LEN: usize = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub total: u64,
    pub free: u64,
    pub used: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpuInfo {
    pub id: u32,
    pub name: String,
    pub utilization: f64,
    pub memory_used_mb: f64,
    pub memory_total_mb: f64,
    pub temperature_c: Option<f64>,
}

/// What a host can tell us about its GPU varies wildly: nothing at all, a
/// bare utilization figure, only a marketing name, or full per-device
/// records. Serialized untagged so the wire shape stays
/// `number | string | array` and consumers discriminate at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GpuReading {
    Utilization(f64),
    Model(String),
    Devices(Vec<GpuInfo>),
}

/// Static-ish CPU identity. Always present with "Unknown" fallbacks per
/// field so display code never has to branch on a missing record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuIdentity {
    pub cores: u32,
    pub model: String,
    pub arch: String,
    pub freq_mhz: Option<f64>,
    pub cache_kb: Option<f64>,
    pub vendor: String,
}

impl CpuIdentity {
    pub fn unknown() -> Self {
        Self {
            cores: 1,
            model: "Unknown".into(),
            arch: "Unknown".into(),
            freq_mhz: None,
            cache_kb: None,
            vendor: "Unknown".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessSample {
    pub name: String,
    pub cpu_percent: f64,
    pub mem_percent: f64,
}

/// One complete metrics bundle for a single point in time. Constructed
/// fresh every tick, never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub cpu_usage_percent: Option<f64>,
    pub memory: Option<MemoryStats>,
    pub gpu: Option<GpuReading>,
    pub cpu_info: CpuIdentity,
    pub processes: Option<Vec<ProcessSample>>,
}

/// Sent in place of a snapshot when a tick fails; the session stays open.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorFrame {
    pub error: String,
}

/// Commands a client may send over the socket. Anything that fails to
/// parse into this enum is logged and dropped.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ClientCommand {
    #[serde(rename = "setRefreshInterval")]
    SetRefreshInterval { interval: f64 },
}
