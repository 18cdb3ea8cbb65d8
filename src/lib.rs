pub mod admissions;
pub mod collections;
pub mod config;
pub mod error;
pub mod scholarship;
pub mod telemetry;
