use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::readings::{Reading, Status};

/// Request body for `POST /readings`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RecordReadingRequest {
    /// Must not be blank. Stored verbatim.
    #[schema(example = "DriveMotor")]
    pub motor_name: String,
    /// Between 0 and the configured ceiling (500 A by default).
    #[schema(example = 45.0)]
    pub current_amperes: f64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReadingDto {
    /// Civil time in the configured zone, `YYYY-MM-DD HH:MM:SS`.
    #[schema(example = "2025-01-01 12:00:00")]
    pub timestamp: String,
    pub motor_name: String,
    pub current_amperes: f64,
    /// `"Normal current."` or `"Warning: current too high!"`.
    pub status: String,
    /// True when `status` is the warning label.
    pub warning: bool,
}

/// Response for `POST /readings`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RecordReadingResponse {
    pub confirmation: String,
    pub reading: ReadingDto,
    /// PNG trend chart for `reading.motor_name`, base64-encoded.
    pub chart_png_base64: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReadingsQuery {
    /// Restrict to this motor (exact, case-sensitive) and order by time.
    pub motor_name: Option<String>,
}

impl From<Reading> for ReadingDto {
    fn from(r: Reading) -> Self {
        Self {
            timestamp: r.timestamp_string(),
            warning: r.status == Status::Warning,
            status: r.status.label().to_owned(),
            motor_name: r.motor_name,
            current_amperes: r.current_amperes,
        }
    }
}
