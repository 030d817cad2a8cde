//! Line grammars for the external tools the probes shell out to.
//!
//! Each tool's stdout is an untyped protocol; every grammar gets exactly
//! one parser here, kept out of the strategies' control flow so it can be
//! unit-tested against captured output. Field orders and separators are
//! documented per function.

use std::cmp::Ordering;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{
    CpuIdentity, GpuInfo, MemoryStats, ProcessSample, MAX_PROCESSES, MAX_PROCESS_NAME_LEN,
};

static LINUX_IDLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+\.\d+)\s*id").unwrap());
static MAC_IDLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"([\d.]+)% idle").unwrap());
static MEM_TOTAL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"MemTotal:\s+(\d+)").unwrap());
static MEM_AVAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"MemAvailable:\s+(\d+)").unwrap());
static PAGE_SIZE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"page size of (\d+) bytes").unwrap());
static CHIPSET_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Chipset Model: (.+)").unwrap());
static PROCESSOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^processor\s*:").unwrap());
static MODEL_NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"model name\s*:\s*(.+)").unwrap());
static CPU_MHZ_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"cpu MHz\s*:\s*([\d.]+)").unwrap());
static CACHE_SIZE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"cache size\s*:\s*(\d+)\s*KB").unwrap());
static VENDOR_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"vendor_id\s*:\s*(.+)").unwrap());

/// `top -b -n 2 -d 0.2` (procps): summary rows look like
/// `%Cpu(s):  5.9 us,  2.0 sy, ..., 91.2 id, ...`. The last `%Cpu` line is
/// the live sample (the first is the since-boot average); usage is
/// `100 - idle`. Pattern miss means null, not a guess.
pub fn linux_top_cpu_usage(out: &str) -> Option<f64> {
    let line = out.lines().filter(|l| l.contains("%Cpu")).next_back()?;
    let idle: f64 = LINUX_IDLE_RE.captures(line)?.get(1)?.as_str().parse().ok()?;
    Some(100.0 - idle)
}

/// `top -l 2 -n 0` (macOS): summary rows look like
/// `CPU usage: 7.89% user, 10.52% sys, 81.57% idle`. Same two-sample,
/// last-line, `100 - idle` treatment as the Linux grammar.
pub fn mac_top_cpu_usage(out: &str) -> Option<f64> {
    let line = out.lines().filter(|l| l.contains("CPU usage:")).next_back()?;
    let idle: f64 = MAC_IDLE_RE.captures(line)?.get(1)?.as_str().parse().ok()?;
    Some(100.0 - idle)
}

/// `/proc/meminfo`: `MemTotal:` and `MemAvailable:` rows carry kB counts.
/// `used` is derived as `total - available`. Either row missing nulls the
/// whole family rather than reporting zeros.
pub fn linux_meminfo(out: &str) -> Option<MemoryStats> {
    let total_kb: u64 = MEM_TOTAL_RE.captures(out)?.get(1)?.as_str().parse().ok()?;
    let avail_kb: u64 = MEM_AVAIL_RE.captures(out)?.get(1)?.as_str().parse().ok()?;
    let total = total_kb * 1024;
    let free = avail_kb * 1024;
    Some(MemoryStats {
        total,
        free,
        used: total.saturating_sub(free),
    })
}

fn vm_stat_pages(out: &str, key: &str) -> u64 {
    for line in out.lines() {
        if let Some(rest) = line.strip_prefix(key) {
            if let Some(v) = rest.strip_prefix(':') {
                return v.trim().trim_end_matches('.').parse().unwrap_or(0);
            }
        }
    }
    0
}

/// `vm_stat`: header carries the page size (`page size of N bytes`,
/// default 4096 if unparsed); `Pages <kind>: <count>.` rows follow.
/// `free = (free + speculative) * page_size`,
/// `used = (active + inactive + wired) * page_size`, a different
/// approximation of "in use" than the Linux derivation, by construction.
/// `total` comes from sysctl and is passed in.
pub fn mac_vm_stat_memory(total: u64, out: &str) -> MemoryStats {
    let page_size: u64 = PAGE_SIZE_RE
        .captures(out)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(4096);
    let free_pages = vm_stat_pages(out, "Pages free");
    let speculative = vm_stat_pages(out, "Pages speculative");
    let active = vm_stat_pages(out, "Pages active");
    let inactive = vm_stat_pages(out, "Pages inactive");
    let wired = vm_stat_pages(out, "Pages wired down");
    MemoryStats {
        total,
        free: (free_pages + speculative) * page_size,
        used: (active + inactive + wired) * page_size,
    }
}

/// `nvidia-smi --query-gpu=index,name,utilization.gpu,memory.used,
/// memory.total,temperature.gpu --format=csv,noheader,nounits`: one device
/// per line, comma-separated in that order. Lines with fewer than six
/// fields are skipped; an unparsable temperature (e.g. `[N/A]`) is null.
pub fn nvidia_smi_devices(out: &str) -> Vec<GpuInfo> {
    out.lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(|line| {
            let parts: Vec<&str> = line.split(',').map(str::trim).collect();
            if parts.len() < 6 {
                return None;
            }
            Some(GpuInfo {
                id: parts[0].parse().unwrap_or(0),
                name: if parts[1].is_empty() {
                    "Unknown GPU".into()
                } else {
                    parts[1].to_string()
                },
                utilization: parts[2].parse().unwrap_or(0.0),
                memory_used_mb: parts[3].parse().unwrap_or(0.0),
                memory_total_mb: parts[4].parse().unwrap_or(0.0),
                temperature_c: parts[5].parse().ok(),
            })
        })
        .collect()
}

/// `system_profiler SPDisplaysDataType`: the graphics section carries a
/// `Chipset Model: <name>` row. Only the model name is obtainable here;
/// there is no utilization figure to report on this platform.
pub fn mac_chipset_model(out: &str) -> Option<String> {
    CHIPSET_RE
        .captures(out)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// `/proc/cpuinfo`: core count is the number of `processor :` rows
/// (minimum 1); model name, MHz, cache (KB) and vendor each match
/// independently with Unknown/null fallbacks. `arch` is supplied by the
/// caller from the running target.
pub fn linux_cpuinfo(out: &str, arch: &str) -> CpuIdentity {
    let cores = PROCESSOR_RE.find_iter(out).count().max(1) as u32;
    let model = MODEL_NAME_RE
        .captures(out)
        .map(|c| c[1].trim().to_string())
        .unwrap_or_else(|| "Unknown".into());
    let freq_mhz = CPU_MHZ_RE
        .captures(out)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok());
    let cache_kb = CACHE_SIZE_RE
        .captures(out)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok());
    let vendor = VENDOR_ID_RE
        .captures(out)
        .map(|c| c[1].trim().to_string())
        .unwrap_or_else(|| "Unknown".into());
    CpuIdentity {
        cores,
        model,
        arch: arch.to_string(),
        freq_mhz,
        cache_kb,
        vendor,
    }
}

/// `ps -eo comm,pcpu,pmem` rows, whitespace-tokenized into exactly
/// `name cpu mem` (first token wins as the name; ps sorts for us). Rows
/// with fewer than three tokens are dropped, not defaulted. The result is
/// re-sorted descending by CPU and capped so the snapshot invariants hold
/// even against a misbehaving ps.
pub fn ps_process_lines<'a>(lines: impl Iterator<Item = &'a str>) -> Vec<ProcessSample> {
    let mut procs: Vec<ProcessSample> = lines
        .filter_map(|line| {
            let mut it = line.split_whitespace();
            let name = it.next()?;
            let cpu = it.next()?;
            let mem = it.next()?;
            Some(ProcessSample {
                name: name.chars().take(MAX_PROCESS_NAME_LEN).collect(),
                cpu_percent: cpu.parse().unwrap_or(0.0),
                mem_percent: mem.parse().unwrap_or(0.0),
            })
        })
        .collect();
    procs.sort_by(|a, b| {
        b.cpu_percent
            .partial_cmp(&a.cpu_percent)
            .unwrap_or(Ordering::Equal)
    });
    procs.truncate(MAX_PROCESSES);
    procs
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINUX_TOP: &str = "\
top - 10:42:01 up 12 days,  3:01,  1 user,  load average: 0.52, 0.58, 0.59
Tasks: 312 total,   1 running, 311 sleeping,   0 stopped,   0 zombie
%Cpu(s):  3.1 us,  1.2 sy,  0.0 ni, 95.4 id,  0.2 wa,  0.0 hi,  0.1 si,  0.0 st
MiB Mem :  15982.7 total,   1021.3 free,   9301.5 used,   5659.9 buff/cache

top - 10:42:01 up 12 days,  3:01,  1 user,  load average: 0.52, 0.58, 0.59
Tasks: 312 total,   2 running, 310 sleeping,   0 stopped,   0 zombie
%Cpu(s): 12.5 us,  4.1 sy,  0.0 ni, 82.2 id,  1.0 wa,  0.0 hi,  0.2 si,  0.0 st
MiB Mem :  15982.7 total,   1019.8 free,   9302.9 used,   5660.0 buff/cache
";

    const MAC_TOP: &str = "\
Processes: 611 total, 2 running, 609 sleeping, 3127 threads
Load Avg: 2.09, 2.57, 2.94
CPU usage: 33.33% user, 66.66% sys, 0.0% idle
CPU usage: 7.89% user, 10.52% sys, 81.57% idle
PhysMem: 15G used (2177M wired), 1017M unused.
";

    const MEMINFO: &str = "\
MemTotal:       16384256 kB
MemFree:          839120 kB
MemAvailable:    9145920 kB
Buffers:          612340 kB
Cached:          5120000 kB
";

    const VM_STAT: &str = "\
Mach Virtual Memory Statistics: (page size of 16384 bytes)
Pages free:                               34867.
Pages active:                            401181.
Pages inactive:                          398812.
Pages speculative:                         2220.
Pages throttled:                              0.
Pages wired down:                        112124.
Pages purgeable:                           4301.
\"Translation faults\":                1071862599.
";

    const CPUINFO: &str = "\
processor\t: 0
vendor_id\t: GenuineIntel
cpu family\t: 6
model\t\t: 142
model name\t: Intel(R) Core(TM) i7-8565U CPU @ 1.80GHz
cpu MHz\t\t: 1992.002
cache size\t: 8192 KB

processor\t: 1
vendor_id\t: GenuineIntel
model name\t: Intel(R) Core(TM) i7-8565U CPU @ 1.80GHz
cpu MHz\t\t: 1800.054
cache size\t: 8192 KB
";

    const SYSTEM_PROFILER: &str = "\
Graphics/Displays:

    Apple M2 Pro:

      Chipset Model: Apple M2 Pro
      Type: GPU
      Bus: Built-In
      Total Number of Cores: 19
";

    #[test]
    fn linux_top_uses_the_last_cpu_summary_line() {
        let usage = linux_top_cpu_usage(LINUX_TOP).unwrap();
        assert!((usage - (100.0 - 82.2)).abs() < 1e-9);
    }

    #[test]
    fn linux_top_without_summary_is_null() {
        assert_eq!(linux_top_cpu_usage("Tasks: 12 total\n"), None);
        assert_eq!(linux_top_cpu_usage("%Cpu(s): garbage\n"), None);
    }

    #[test]
    fn mac_top_uses_the_last_usage_line() {
        let usage = mac_top_cpu_usage(MAC_TOP).unwrap();
        assert!((usage - (100.0 - 81.57)).abs() < 1e-9);
    }

    #[test]
    fn meminfo_derives_used_from_available() {
        let mem = linux_meminfo(MEMINFO).unwrap();
        assert_eq!(mem.total, 16384256 * 1024);
        assert_eq!(mem.free, 9145920 * 1024);
        assert_eq!(mem.used, (16384256 - 9145920) * 1024);
    }

    #[test]
    fn meminfo_missing_rows_is_null_not_zero() {
        assert!(linux_meminfo("MemTotal:  1024 kB\n").is_none());
        assert!(linux_meminfo("").is_none());
    }

    #[test]
    fn vm_stat_accounts_pages_with_parsed_page_size() {
        let mem = mac_vm_stat_memory(17_179_869_184, VM_STAT);
        assert_eq!(mem.total, 17_179_869_184);
        assert_eq!(mem.free, (34867 + 2220) * 16384);
        assert_eq!(mem.used, (401181 + 398812 + 112124) * 16384);
    }

    #[test]
    fn vm_stat_defaults_page_size_to_4096() {
        let out = "Pages free: 100.\nPages active: 50.\n";
        let mem = mac_vm_stat_memory(1 << 30, out);
        assert_eq!(mem.free, 100 * 4096);
        assert_eq!(mem.used, 50 * 4096);
    }

    #[test]
    fn nvidia_smi_parses_one_device_per_line() {
        let out = "\
0, NVIDIA GeForce RTX 3080, 41, 2048, 10240, 62
1, NVIDIA GeForce GTX 1660, 7, 512, 6144, [N/A]
";
        let devices = nvidia_smi_devices(out);
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].id, 0);
        assert_eq!(devices[0].name, "NVIDIA GeForce RTX 3080");
        assert_eq!(devices[0].utilization, 41.0);
        assert_eq!(devices[0].temperature_c, Some(62.0));
        assert_eq!(devices[1].id, 1);
        assert_eq!(devices[1].temperature_c, None);
    }

    #[test]
    fn nvidia_smi_skips_short_and_blank_lines() {
        let out = "\
0, NVIDIA GeForce RTX 3080, 41, 2048, 10240, 62

garbage line without commas
1, only, three
";
        let devices = nvidia_smi_devices(out);
        assert_eq!(devices.len(), 1);
    }

    #[test]
    fn chipset_model_is_extracted() {
        assert_eq!(
            mac_chipset_model(SYSTEM_PROFILER).as_deref(),
            Some("Apple M2 Pro")
        );
        assert_eq!(mac_chipset_model("Graphics/Displays:\n"), None);
    }

    #[test]
    fn cpuinfo_counts_processors_and_extracts_fields() {
        let id = linux_cpuinfo(CPUINFO, "x86_64");
        assert_eq!(id.cores, 2);
        assert_eq!(id.model, "Intel(R) Core(TM) i7-8565U CPU @ 1.80GHz");
        assert_eq!(id.arch, "x86_64");
        assert_eq!(id.freq_mhz, Some(1992.002));
        assert_eq!(id.cache_kb, Some(8192.0));
        assert_eq!(id.vendor, "GenuineIntel");
    }

    #[test]
    fn cpuinfo_falls_back_per_field() {
        let id = linux_cpuinfo("processor\t: 0\n", "aarch64");
        assert_eq!(id.cores, 1);
        assert_eq!(id.model, "Unknown");
        assert_eq!(id.vendor, "Unknown");
        assert_eq!(id.freq_mhz, None);
        assert_eq!(id.cache_kb, None);

        // no processor rows still reports at least one core
        assert_eq!(linux_cpuinfo("", "x86_64").cores, 1);
    }

    #[test]
    fn ps_lines_tokenize_sort_and_cap() {
        let out = "\
firefox          12.3  5.4
chrome            8.1  3.2
a-process-with-an-extremely-long-command-name  2.0  1.0
broken-line
code              9.9  4.1
";
        let procs = ps_process_lines(out.lines());
        assert_eq!(procs.len(), 4); // broken line dropped
        let cpus: Vec<f64> = procs.iter().map(|p| p.cpu_percent).collect();
        assert_eq!(cpus, vec![12.3, 9.9, 8.1, 2.0]);
        assert!(procs.iter().all(|p| p.name.chars().count() <= 30));
        assert_eq!(procs[3].name, "a-process-with-an-extremely-lo");
    }

    #[test]
    fn ps_lines_cap_at_ten_entries() {
        let many: String = (0..25)
            .map(|i| format!("proc{i} {}.0 1.0\n", 25 - i))
            .collect();
        let procs = ps_process_lines(many.lines());
        assert_eq!(procs.len(), MAX_PROCESSES);
        assert!(procs.windows(2).all(|w| w[0].cpu_percent >= w[1].cpu_percent));
    }
}
