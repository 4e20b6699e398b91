pub mod config;
pub mod event_bus;
pub mod persistence;
pub mod telemetry;
