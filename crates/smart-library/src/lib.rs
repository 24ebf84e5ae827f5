pub mod clock;
pub mod config;
pub mod error;
pub mod library;
pub mod recommendations;
pub mod reports;
pub mod telemetry;
