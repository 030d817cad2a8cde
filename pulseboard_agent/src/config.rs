//! Runtime configuration: argv flags plus `PULSEBOARD_*` environment
//! toggles. Env toggles are read once and cached for the process lifetime.

use std::net::IpAddr;
use std::time::Duration;

use once_cell::sync::OnceCell;

pub const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, PartialEq)]
pub struct ParsedArgs {
    pub port: u16,
    pub bind: IpAddr,
}

fn usage(prog: &str) -> String {
    format!("Usage: {prog} [--port PORT|-p PORT] [--bind ADDR|-b ADDR]")
}

pub fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<ParsedArgs, String> {
    let mut it = args.into_iter();
    let prog = it.next().unwrap_or_else(|| "pulseboard_agent".into());
    let mut port: Option<String> = None;
    let mut bind: Option<String> = None;

    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-h" | "--help" => return Err(usage(&prog)),
            "--port" | "-p" => port = it.next(),
            "--bind" | "-b" => bind = it.next(),
            _ if arg.starts_with("--port=") => {
                if let Some((_, v)) = arg.split_once('=') {
                    port = Some(v.to_string());
                }
            }
            _ if arg.starts_with("--bind=") => {
                if let Some((_, v)) = arg.split_once('=') {
                    bind = Some(v.to_string());
                }
            }
            _ => return Err(usage(&prog)),
        }
    }

    let port = match port {
        Some(v) => v
            .parse::<u16>()
            .map_err(|_| format!("invalid port '{v}'. {}", usage(&prog)))?,
        None => DEFAULT_PORT,
    };
    let bind = match bind {
        Some(v) => v
            .parse::<IpAddr>()
            .map_err(|_| format!("invalid bind address '{v}'. {}", usage(&prog)))?,
        None => IpAddr::from([0, 0, 0, 0]),
    };
    Ok(ParsedArgs { port, bind })
}

/// GPU probing can be skipped entirely on hosts where the query tools are
/// known to hang or misreport. Set PULSEBOARD_GPU=0 to disable.
pub fn gpu_enabled() -> bool {
    static ON: OnceCell<bool> = OnceCell::new();
    *ON.get_or_init(|| {
        std::env::var("PULSEBOARD_GPU")
            .map(|v| v != "0")
            .unwrap_or(true)
    })
}

/// Upper bound on a single probe run. A tool that hangs costs the tick at
/// most this much; the probe settles as null. PULSEBOARD_PROBE_TIMEOUT_MS
/// overrides, default 5000ms.
pub fn probe_timeout() -> Duration {
    static MS: OnceCell<u64> = OnceCell::new();
    Duration::from_millis(*MS.get_or_init(|| {
        std::env::var("PULSEBOARD_PROBE_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5_000)
    }))
}
