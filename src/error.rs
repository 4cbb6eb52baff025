//! Error taxonomy for recording and rendering readings.
//!
//! Every variant aborts the operation in progress. None of them leave a
//! partially written row behind.

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The row could not be appended to the reading log.
    #[error("failed to append reading to {path:?}: {source}")]
    StorageWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The reading log exists but could not be read or parsed.
    #[error("failed to read reading log {path:?}: {reason}")]
    StorageRead { path: PathBuf, reason: String },

    /// Drawing or PNG encoding of a trend chart failed.
    #[error("failed to render trend chart: {0}")]
    Render(String),

    #[error("motor name must not be empty")]
    EmptyMotorName,

    #[error("current must be between 0 and {max} amperes, got {value}")]
    CurrentOutOfRange { value: f64, max: f64 },
}

impl Error {
    /// True for errors caused by the caller's input rather than storage or rendering.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::EmptyMotorName | Self::CurrentOutOfRange { .. })
    }
}
