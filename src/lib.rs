pub mod api;
pub mod config;
pub mod error;
pub mod readings;
pub mod recorder;
pub mod trend;
