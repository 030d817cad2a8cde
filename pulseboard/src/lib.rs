//! Client-side pieces for talking to a pulseboard agent: the wire-type
//! mirror, the reconnecting connection driver, and bounded history buffers
//! for chart-style consumers.

pub mod history;
pub mod types;
pub mod ws;
