use std::{fmt, str::FromStr};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Civil date-time layout used in the log and in confirmations. Sorts
/// lexically in the same order as chronologically.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Outcome of comparing a reading against the warning threshold.
///
/// The threshold is exclusive on the warning side: a reading exactly at the
/// threshold is `Normal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Normal,
    Warning,
}

impl Status {
    pub const NORMAL_LABEL: &'static str = "Normal current.";
    pub const WARNING_LABEL: &'static str = "Warning: current too high!";

    pub fn classify(current_amperes: f64, warning_threshold_amps: f64) -> Self {
        if current_amperes > warning_threshold_amps {
            Self::Warning
        } else {
            Self::Normal
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Normal => Self::NORMAL_LABEL,
            Self::Warning => Self::WARNING_LABEL,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            Self::NORMAL_LABEL => Ok(Self::Normal),
            Self::WARNING_LABEL => Ok(Self::Warning),
            other => Err(format!("unknown status label: {other:?}")),
        }
    }
}

/// One row of the reading log.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub timestamp: NaiveDateTime,
    pub motor_name: String,
    pub current_amperes: f64,
    pub status: Status,
}

impl Reading {
    pub fn timestamp_string(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }
}

/// Format amperes the way the log stores them: whole numbers keep one
/// decimal place (`45` -> `45.0`), everything else uses the shortest
/// representation that round-trips.
pub fn format_amperes(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// On-disk CSV row. Field names are the fixed column headers.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct CsvRow {
    #[serde(rename = "Waktu")]
    pub timestamp: String,
    #[serde(rename = "Nama Motor")]
    pub motor_name: String,
    #[serde(rename = "Arus (Ampere)")]
    pub current_amperes: String,
    #[serde(rename = "Status")]
    pub status: String,
}

impl From<&Reading> for CsvRow {
    fn from(r: &Reading) -> Self {
        Self {
            timestamp: r.timestamp_string(),
            motor_name: r.motor_name.clone(),
            current_amperes: format_amperes(r.current_amperes),
            status: r.status.label().to_owned(),
        }
    }
}

impl TryFrom<CsvRow> for Reading {
    type Error = String;

    fn try_from(row: CsvRow) -> Result<Self, Self::Error> {
        let timestamp = NaiveDateTime::parse_from_str(&row.timestamp, TIMESTAMP_FORMAT)
            .map_err(|e| format!("invalid timestamp {:?}: {e}", row.timestamp))?;
        let current_amperes = row
            .current_amperes
            .trim()
            .parse::<f64>()
            .map_err(|e| format!("invalid current {:?}: {e}", row.current_amperes))?;
        let status = row.status.parse()?;
        Ok(Self {
            timestamp,
            motor_name: row.motor_name,
            current_amperes,
            status,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn threshold_is_exclusive_on_the_warning_side() {
        assert_eq!(Status::classify(0.0, 100.0), Status::Normal);
        assert_eq!(Status::classify(100.0, 100.0), Status::Normal);
        assert_eq!(Status::classify(100.1, 100.0), Status::Warning);
        assert_eq!(Status::classify(500.0, 100.0), Status::Warning);
    }

    #[test]
    fn status_labels_parse_back() {
        for status in [Status::Normal, Status::Warning] {
            assert_eq!(status.label().parse::<Status>().unwrap(), status);
        }
        assert!("Arus normal.".parse::<Status>().is_err());
    }

    #[test]
    fn whole_amperes_keep_one_decimal() {
        assert_eq!(format_amperes(45.0), "45.0");
        assert_eq!(format_amperes(0.0), "0.0");
        assert_eq!(format_amperes(12.5), "12.5");
        assert_eq!(format_amperes(99.95), "99.95");
    }

    #[test]
    fn csv_row_converts_back_to_reading() {
        let reading = Reading {
            timestamp: NaiveDate::from_ymd_opt(2025, 1, 1)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
            motor_name: "MotorA".to_owned(),
            current_amperes: 12.5,
            status: Status::Normal,
        };
        let row = CsvRow::from(&reading);
        assert_eq!(row.timestamp, "2025-01-01 12:00:00");
        assert_eq!(row.current_amperes, "12.5");
        assert_eq!(row.status, "Normal current.");
        assert_eq!(Reading::try_from(row).unwrap(), reading);
    }

    #[test]
    fn malformed_timestamp_is_rejected() {
        let row = CsvRow {
            timestamp: "yesterday".to_owned(),
            motor_name: "MotorA".to_owned(),
            current_amperes: "1.0".to_owned(),
            status: Status::NORMAL_LABEL.to_owned(),
        };
        let err = Reading::try_from(row).unwrap_err();
        assert!(err.contains("invalid timestamp"));
    }
}
