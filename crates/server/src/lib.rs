pub mod api;
pub mod config;
pub mod error;
pub mod storage_factory;
pub mod telemetry;
