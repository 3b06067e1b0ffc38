//! Telemetry for the C360 pipeline service: tracing setup, in-process
//! counters and health reporting.

pub mod health;
pub mod metrics;
pub mod tracing_setup;

pub use health::*;
pub use metrics::*;
pub use tracing_setup::*;
