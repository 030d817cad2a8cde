//! Wire types received from the agent. This is a deserializing mirror of
//! the agent's schema; the client keeps its own copy so the two binaries
//! stay independently buildable.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct MemoryStats {
    pub total: u64,
    pub free: u64,
    pub used: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GpuInfo {
    pub id: u32,
    pub name: String,
    pub utilization: f64,
    pub memory_used_mb: f64,
    pub memory_total_mb: f64,
    pub temperature_c: Option<f64>,
}

/// The agent's GPU field is shape-discriminated: a bare percentage, a
/// model name, or per-device records. Variant order matters for untagged
/// deserialization (number, then string, then array).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum GpuReading {
    Utilization(f64),
    Model(String),
    Devices(Vec<GpuInfo>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct CpuIdentity {
    pub cores: u32,
    pub model: String,
    pub arch: String,
    pub freq_mhz: Option<f64>,
    pub cache_kb: Option<f64>,
    pub vendor: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessSample {
    pub name: String,
    pub cpu_percent: f64,
    pub mem_percent: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Snapshot {
    pub cpu_usage_percent: Option<f64>,
    pub memory: Option<MemoryStats>,
    pub gpu: Option<GpuReading>,
    pub cpu_info: CpuIdentity,
    pub processes: Option<Vec<ProcessSample>>,
}

impl Snapshot {
    /// Derived memory-used percentage, the one scalar worth charting.
    pub fn memory_used_percent(&self) -> Option<f64> {
        let mem = self.memory.as_ref()?;
        if mem.total == 0 {
            return None;
        }
        Some(mem.used as f64 / mem.total as f64 * 100.0)
    }

    /// Display text for the GPU field, one rule per wire shape: scalar →
    /// percentage, model name → as-is, one device → its detail line, many
    /// devices → count plus averaged utilization.
    pub fn gpu_summary(&self) -> String {
        match &self.gpu {
            None => "n/a".into(),
            Some(GpuReading::Utilization(pct)) => format!("{pct:.1}%"),
            Some(GpuReading::Model(name)) => name.clone(),
            Some(GpuReading::Devices(devices)) => match devices.as_slice() {
                [] => "n/a".into(),
                [d] => format!("{} {:.1}%", d.name, d.utilization),
                many => {
                    let avg: f64 =
                        many.iter().map(|d| d.utilization).sum::<f64>() / many.len() as f64;
                    format!("{} gpus avg {avg:.1}%", many.len())
                }
            },
        }
    }
}

/// A server frame is either an in-band sampling error or a snapshot.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ServerFrame {
    Error { error: String },
    Snapshot(Box<Snapshot>),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot_json(gpu: &str) -> String {
        format!(
            r#"{{
                "cpu_usage_percent": 31.5,
                "memory": {{"total": 1000, "free": 250, "used": 750}},
                "gpu": {gpu},
                "cpu_info": {{"cores": 8, "model": "Test", "arch": "x86_64",
                              "freq_mhz": null, "cache_kb": null, "vendor": "Test"}},
                "processes": null
            }}"#
        )
    }

    #[test]
    fn frames_discriminate_between_error_and_snapshot() {
        let frame: ServerFrame = serde_json::from_str(r#"{"error":"sampling failed"}"#).unwrap();
        assert!(matches!(frame, ServerFrame::Error { .. }));

        let frame: ServerFrame = serde_json::from_str(&snapshot_json("null")).unwrap();
        assert!(matches!(frame, ServerFrame::Snapshot(_)));
    }

    #[test]
    fn gpu_shapes_deserialize_and_summarize() {
        let cases = [
            ("null", "n/a"),
            ("57.5", "57.5%"),
            (r#""Apple M2 Pro""#, "Apple M2 Pro"),
            (
                r#"[{"id":0,"name":"RTX 3080","utilization":40.0,
                    "memory_used_mb":1.0,"memory_total_mb":2.0,"temperature_c":null}]"#,
                "RTX 3080 40.0%",
            ),
            (
                r#"[{"id":0,"name":"A","utilization":40.0,
                    "memory_used_mb":1.0,"memory_total_mb":2.0,"temperature_c":null},
                   {"id":1,"name":"B","utilization":60.0,
                    "memory_used_mb":1.0,"memory_total_mb":2.0,"temperature_c":null}]"#,
                "2 gpus avg 50.0%",
            ),
        ];
        for (gpu, expected) in cases {
            let snap: Snapshot = serde_json::from_str(&snapshot_json(gpu)).unwrap();
            assert_eq!(snap.gpu_summary(), expected, "for gpu shape {gpu}");
        }
    }

    #[test]
    fn memory_used_percent_derives_and_guards_zero_total() {
        let snap: Snapshot = serde_json::from_str(&snapshot_json("null")).unwrap();
        assert_eq!(snap.memory_used_percent(), Some(75.0));

        let zero = r#"{
            "cpu_usage_percent": null,
            "memory": {"total": 0, "free": 0, "used": 0},
            "gpu": null,
            "cpu_info": {"cores": 1, "model": "Unknown", "arch": "Unknown",
                         "freq_mhz": null, "cache_kb": null, "vendor": "Unknown"},
            "processes": null
        }"#;
        let snap: Snapshot = serde_json::from_str(zero).unwrap();
        assert_eq!(snap.memory_used_percent(), None);
    }
}
