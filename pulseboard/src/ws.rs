//! Agent connection lifecycle: connect, stream frames to a handler, and
//! reconnect on abnormal closes with bounded exponential backoff.
//!
//! The connection is owned by a single driver loop, so a reconnect can
//! never race an in-flight connect or duplicate an open socket. Server-side
//! cadence is per-connection state; the last known preference is replayed
//! after every successful (re)connect.

use std::time::Duration;

use anyhow::bail;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{info, warn};
use tungstenite::protocol::frame::coding::CloseCode;
use tungstenite::Message;

use crate::types::ServerFrame;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub const INITIAL_BACKOFF_MS: u64 = 1000;
pub const MAX_BACKOFF_MS: u64 = 10_000;
pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Delay before reconnect attempt `attempt` (1-based): 1s, doubling per
/// attempt, capped at 10s.
pub fn backoff_delay(attempt: u32) -> Duration {
    let ms = INITIAL_BACKOFF_MS.saturating_mul(1u64 << attempt.saturating_sub(1).min(32));
    Duration::from_millis(ms.min(MAX_BACKOFF_MS))
}

/// How a connection went away.
#[derive(Debug, PartialEq)]
enum Disconnect {
    /// Deliberate goodbye (normal close code); the driver loop ends.
    Normal,
    /// Anything else; re-enters the backoff schedule.
    Abnormal,
}

pub struct Connector {
    url: String,
    /// Last cadence preference in ms; replayed on every (re)connect since
    /// the server keeps cadence per-connection and forgets it on close.
    cadence_ms: Option<u64>,
}

impl Connector {
    pub fn new(url: impl Into<String>, cadence_ms: Option<u64>) -> Self {
        Self {
            url: url.into(),
            cadence_ms,
        }
    }

    /// Drive the connection until the server says a deliberate goodbye,
    /// feeding every decoded frame to `on_frame`. Abnormal closes and
    /// failed connects consume reconnect attempts; once
    /// [`MAX_RECONNECT_ATTEMPTS`] are exhausted the error is terminal and
    /// the caller decides what "please reload" looks like.
    pub async fn run<F>(&mut self, mut on_frame: F) -> anyhow::Result<()>
    where
        F: FnMut(ServerFrame),
    {
        let mut attempts: u32 = 0;
        loop {
            match self.connect_once().await {
                Ok(mut ws) => {
                    info!(url = %self.url, "connected");
                    attempts = 0;
                    if stream_frames(&mut ws, &mut on_frame).await == Disconnect::Normal {
                        return Ok(());
                    }
                    warn!("connection lost");
                }
                Err(e) => warn!(error = %e, "connect failed"),
            }

            attempts += 1;
            if attempts > MAX_RECONNECT_ATTEMPTS {
                bail!("giving up after {MAX_RECONNECT_ATTEMPTS} reconnect attempts; reload to retry");
            }
            let delay = backoff_delay(attempts);
            info!(
                attempt = attempts,
                max = MAX_RECONNECT_ATTEMPTS,
                delay_ms = delay.as_millis() as u64,
                "reconnecting after backoff"
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn connect_once(&self) -> anyhow::Result<WsStream> {
        let (mut ws, _) = connect_async(self.url.as_str()).await?;
        if let Some(ms) = self.cadence_ms {
            let cmd = serde_json::json!({ "type": "setRefreshInterval", "interval": ms });
            ws.send(Message::Text(cmd.to_string())).await?;
        }
        Ok(ws)
    }
}

async fn stream_frames<F>(ws: &mut WsStream, on_frame: &mut F) -> Disconnect
where
    F: FnMut(ServerFrame),
{
    while let Some(msg) = ws.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<ServerFrame>(&text) {
                Ok(frame) => on_frame(frame),
                Err(e) => warn!(error = %e, "undecodable frame from agent"),
            },
            Ok(Message::Close(frame)) => {
                return match frame {
                    Some(f) if f.code == CloseCode::Normal => Disconnect::Normal,
                    _ => Disconnect::Abnormal,
                };
            }
            Ok(_) => {} // ping/pong/binary: nothing to do
            Err(e) => {
                warn!(error = %e, "websocket receive error");
                return Disconnect::Abnormal;
            }
        }
    }
    // Stream ended without a close frame: treat like a network drop.
    Disconnect::Abnormal
}
