//! Shared agent state: the probe strategy selected at startup.
//!
//! Sessions are fully independent; nothing here is mutated after startup,
//! so many concurrent connections share it without coordination.

use std::sync::Arc;

use crate::probes::HostProbes;

#[derive(Clone)]
pub struct AppState {
    pub probes: Arc<dyn HostProbes>,
}

impl AppState {
    pub fn new(probes: Arc<dyn HostProbes>) -> Self {
        Self { probes }
    }
}
