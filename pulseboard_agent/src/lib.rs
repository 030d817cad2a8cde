//! Library surface of the pulseboard agent: platform probes, the per-tick
//! orchestrator, streaming sessions, and the two routes the binary (or any
//! other embedding) wires them to.

use axum::{routing::get, Router};

pub mod api;
pub mod config;
pub mod probes;
pub mod session;
pub mod state;
pub mod types;
pub mod ws;

use state::AppState;

/// Build the agent router: one-shot snapshots plus the streaming upgrade.
/// Static file serving and page routing are someone else's job.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/api/stats", get(api::stats_handler))
        .route("/ws", get(ws::ws_handler))
        .with_state(state)
}
