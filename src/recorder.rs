use chrono::{FixedOffset, NaiveDateTime, Timelike, Utc};
use tracing::{info, warn};

use crate::{
    error::{Error, Result},
    readings::{models::format_amperes, Reading, ReadingLog, Status},
};

/// Result of a successful `Recorder::append`.
#[derive(Debug, Clone)]
pub struct Recorded {
    /// Human-readable summary, one field per line.
    pub confirmation: String,
    pub reading: Reading,
}

/// Turns `(motor_name, current)` pairs into timestamped rows of the log.
#[derive(Debug, Clone)]
pub struct Recorder {
    log: ReadingLog,
    offset: FixedOffset,
    warning_threshold_amps: f64,
}

impl Recorder {
    pub fn new(log: ReadingLog, offset: FixedOffset, warning_threshold_amps: f64) -> Self {
        Self {
            log,
            offset,
            warning_threshold_amps,
        }
    }

    pub fn log(&self) -> &ReadingLog {
        &self.log
    }

    /// Record a reading stamped with the current civil time in the
    /// configured zone.
    pub fn append(&self, motor_name: &str, current_amperes: f64) -> Result<Recorded> {
        let now = Utc::now().with_timezone(&self.offset).naive_local();
        self.append_at(motor_name, current_amperes, now)
    }

    /// Record a reading with an explicit timestamp. Sub-second precision is
    /// dropped so the stored row and the returned `Reading` agree.
    ///
    /// Blank names (empty after trimming) are rejected before anything is
    /// written; accepted names are stored verbatim. The current is expected to
    /// be already bounded by the input surface.
    pub fn append_at(
        &self,
        motor_name: &str,
        current_amperes: f64,
        timestamp: NaiveDateTime,
    ) -> Result<Recorded> {
        if motor_name.trim().is_empty() {
            return Err(Error::EmptyMotorName);
        }

        let reading = Reading {
            timestamp: timestamp.with_nanosecond(0).unwrap_or(timestamp),
            motor_name: motor_name.to_owned(),
            current_amperes,
            status: Status::classify(current_amperes, self.warning_threshold_amps),
        };

        self.log.append(&reading)?;

        match reading.status {
            Status::Normal => info!(
                motor_name = %reading.motor_name,
                current_amperes = reading.current_amperes,
                status = %reading.status,
                "Reading recorded"
            ),
            Status::Warning => warn!(
                motor_name = %reading.motor_name,
                current_amperes = reading.current_amperes,
                threshold = self.warning_threshold_amps,
                "Reading recorded above warning threshold"
            ),
        }

        Ok(Recorded {
            confirmation: confirmation(&reading),
            reading,
        })
    }
}

fn confirmation(reading: &Reading) -> String {
    format!(
        "Data saved successfully!\nTime: {}\nMotor: {}\nCurrent: {} A\nStatus: {}",
        reading.timestamp_string(),
        reading.motor_name,
        format_amperes(reading.current_amperes),
        reading.status,
    )
}
