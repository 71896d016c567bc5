//! MediaVault infrastructure

pub mod telemetry;

pub use telemetry::{init_telemetry, shutdown_telemetry, LogFormat};
