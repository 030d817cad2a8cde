//! WebSocket upgrade and the per-connection streaming loop.
//!
//! Each connection gets its own task, its own session, and its own tick
//! timer; nothing is shared across connections. Plain HTTP requests to the
//! route are answered with 426 Upgrade Required.

use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, warn};

use crate::probes::sample_snapshot;
use crate::session::{Inbound, StreamSession};
use crate::state::AppState;
use crate::types::ErrorFrame;

pub async fn ws_handler(ws: Option<WebSocketUpgrade>, State(state): State<AppState>) -> Response {
    match ws {
        Some(upgrade) => upgrade.on_upgrade(move |socket| handle_socket(socket, state)),
        None => (StatusCode::UPGRADE_REQUIRED, "Expected WebSocket").into_response(),
    }
}

/// Build the periodic tick timer for a cadence. The first tick fires one
/// full period from now (the immediate first send happens before the timer
/// exists), and ticks restart on completion rather than bursting to catch
/// up after a slow sample, so one session's sends are never in flight
/// concurrently.
fn tick_timer(cadence: Duration) -> Interval {
    let mut timer = interval_at(Instant::now() + cadence, cadence);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    timer
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    debug!("websocket client connected");
    let mut session = StreamSession::new();

    // First snapshot goes out immediately; clients should not stare at an
    // empty dashboard for a full cadence interval.
    if send_tick(&mut socket, &state).await.is_err() {
        debug!("websocket closed before first snapshot");
        return;
    }
    let mut ticker = tick_timer(session.cadence());

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if send_tick(&mut socket, &state).await.is_err() {
                    break;
                }
            }
            inbound = socket.recv() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        if let Inbound::CadenceChanged(cadence) = session.handle_text(&text) {
                            ticker = tick_timer(cadence);
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {} // ping/pong/binary: nothing to do
                    Some(Err(e)) => {
                        debug!(error = %e, "websocket receive error");
                        break;
                    }
                }
            }
        }
    }
    // Dropping the timer and socket is the whole teardown; no state outlives
    // the connection.
    debug!("websocket client disconnected");
}

/// One tick: sample, serialize, send. A sampling or serialization failure
/// is reported to the client in-band; only a dead socket ends the session.
async fn send_tick(socket: &mut WebSocket, state: &AppState) -> Result<(), axum::Error> {
    let snapshot = sample_snapshot(state.probes.as_ref()).await;
    let frame = match serde_json::to_string(&snapshot) {
        Ok(json) => json,
        Err(e) => {
            warn!(error = %e, "failed to serialize snapshot");
            serde_json::to_string(&ErrorFrame {
                error: e.to_string(),
            })
            .unwrap_or_else(|_| r#"{"error":"snapshot serialization failed"}"#.into())
        }
    };
    socket.send(Message::Text(frame)).await
}
