//! Child-process plumbing shared by the probe strategies. Tools run as
//! short-lived children, one per probe per tick, with stderr discarded.

use std::io;
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

/// Why a tool run produced no usable output.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("failed to spawn: {0}")]
    Spawn(#[from] io::Error),
    #[error("exited with {0}")]
    Failed(std::process::ExitStatus),
}

/// Run a tool and capture stdout. A non-zero exit is an error like any
/// other; the caller decides what "no output" means for its metric family.
/// Children are killed if the future is dropped, so a probe timeout does
/// not leak a hung tool past its tick.
pub(crate) async fn run_tool(program: &str, args: &[&str]) -> Result<String, ToolError> {
    let output = Command::new(program)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await?;
    if !output.status.success() {
        return Err(ToolError::Failed(output.status));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// [`run_tool`], with failures logged and collapsed to `None`.
pub(crate) async fn try_tool(program: &str, args: &[&str]) -> Option<String> {
    match run_tool(program, args).await {
        Ok(out) => Some(out),
        Err(e) => {
            debug!(tool = program, error = %e, "tool run failed");
            None
        }
    }
}
