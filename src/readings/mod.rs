pub mod log;
pub mod models;

pub use log::ReadingLog;
pub use models::{Reading, Status};
