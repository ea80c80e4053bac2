pub mod config;
pub mod context;
pub mod metrics;
pub(crate) mod shutdown;
pub mod telemetry;
pub mod time;
