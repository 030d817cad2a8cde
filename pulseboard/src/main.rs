//! Entry point for the pulseboard terminal client: stream snapshots from a
//! running agent and print one line per tick, reconnecting as needed.

use pulseboard::history::MemoryHistory;
use pulseboard::types::{ServerFrame, Snapshot};
use pulseboard::ws::Connector;
use url::Url;

const DEFAULT_URL: &str = "ws://127.0.0.1:8000/ws";

struct ParsedArgs {
    url: Option<String>,
    interval_ms: Option<u64>,
}

fn usage(prog: &str) -> String {
    format!("Usage: {prog} [--interval MS|-i MS] [ws://HOST:PORT/ws]")
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<ParsedArgs, String> {
    let mut it = args.into_iter();
    let prog = it.next().unwrap_or_else(|| "pulseboard".into());
    let mut url: Option<String> = None;
    let mut interval: Option<String> = None;

    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-h" | "--help" => return Err(usage(&prog)),
            "--interval" | "-i" => interval = it.next(),
            _ if arg.starts_with("--interval=") => {
                if let Some((_, v)) = arg.split_once('=') {
                    interval = Some(v.to_string());
                }
            }
            _ => {
                if url.is_none() {
                    url = Some(arg);
                } else {
                    return Err(usage(&prog));
                }
            }
        }
    }

    let interval_ms = match interval {
        Some(v) => Some(
            v.parse::<u64>()
                .map_err(|_| format!("invalid interval '{v}'. {}", usage(&prog)))?,
        ),
        None => None,
    };
    Ok(ParsedArgs { url, interval_ms })
}

fn check_url(raw: &str) -> anyhow::Result<String> {
    let parsed = Url::parse(raw)?;
    match parsed.scheme() {
        "ws" | "wss" => Ok(raw.to_string()),
        other => anyhow::bail!("unsupported scheme '{other}', expected ws:// or wss://"),
    }
}

fn format_line(snap: &Snapshot, mem_pct: Option<f64>) -> String {
    let fmt_pct = |v: Option<f64>| v.map(|p| format!("{p:.1}%")).unwrap_or_else(|| "n/a".into());
    let procs = snap.processes.as_ref().map(Vec::len).unwrap_or(0);
    format!(
        "cpu {} | mem {} | gpu {} | {}x {} | top {} procs",
        fmt_pct(snap.cpu_usage_percent),
        fmt_pct(mem_pct),
        snap.gpu_summary(),
        snap.cpu_info.cores,
        snap.cpu_info.model,
        procs,
    )
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("pulseboard=warn")),
        )
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let parsed = match parse_args(std::env::args()) {
        Ok(v) => v,
        Err(msg) => {
            eprintln!("{msg}");
            return Ok(());
        }
    };
    let url = check_url(parsed.url.as_deref().unwrap_or(DEFAULT_URL))?;

    let mut history = MemoryHistory::new();
    let mut connector = Connector::new(url, parsed.interval_ms);
    connector
        .run(|frame| match frame {
            ServerFrame::Snapshot(snap) => {
                let pct = snap.memory_used_percent();
                if let Some(p) = pct {
                    history.record(p);
                }
                println!("{}", format_line(&snap, pct));
            }
            ServerFrame::Error { error } => eprintln!("agent error: {error}"),
        })
        .await
}
