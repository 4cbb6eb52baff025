use std::path::PathBuf;

use anyhow::{ensure, Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    /// Location of the CSV reading log. Created on first append.
    pub readings_csv_path: PathBuf,
    /// Readings strictly above this value are flagged as a warning.
    pub warning_threshold_amps: f64,
    /// Upper bound accepted by `POST /readings`.
    pub max_current_amps: f64,
    /// Fixed civil time zone used for reading timestamps (no DST).
    pub utc_offset_hours: i32,
    pub chart_width: u32,
    pub chart_height: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. `from_env` passes the
    /// process environment; tests pass a map.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let optional = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_owned());

        let config = Self {
            server_host: optional("SERVER_HOST", "0.0.0.0"),
            server_port: optional("SERVER_PORT", "8080")
                .parse()
                .context("SERVER_PORT must be a valid port number")?,
            readings_csv_path: PathBuf::from(optional("READINGS_CSV_PATH", "data_motor.csv")),
            warning_threshold_amps: optional("WARNING_THRESHOLD_AMPS", "100")
                .parse()
                .context("WARNING_THRESHOLD_AMPS must be a number")?,
            max_current_amps: optional("MAX_CURRENT_AMPS", "500")
                .parse()
                .context("MAX_CURRENT_AMPS must be a number")?,
            utc_offset_hours: optional("UTC_OFFSET_HOURS", "8")
                .parse()
                .context("UTC_OFFSET_HOURS must be an integer")?,
            chart_width: optional("CHART_WIDTH", "800")
                .parse()
                .context("CHART_WIDTH must be a positive integer")?,
            chart_height: optional("CHART_HEIGHT", "480")
                .parse()
                .context("CHART_HEIGHT must be a positive integer")?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            self.max_current_amps.is_finite() && self.max_current_amps > 0.0,
            "MAX_CURRENT_AMPS must be a positive number, got {}",
            self.max_current_amps
        );
        ensure!(
            self.warning_threshold_amps.is_finite()
                && (0.0..=self.max_current_amps).contains(&self.warning_threshold_amps),
            "WARNING_THRESHOLD_AMPS must be between 0 and MAX_CURRENT_AMPS, got {}",
            self.warning_threshold_amps
        );
        ensure!(
            (-12..=14).contains(&self.utc_offset_hours),
            "UTC_OFFSET_HOURS must be between -12 and 14, got {}",
            self.utc_offset_hours
        );
        ensure!(
            self.chart_width >= 100 && self.chart_height >= 100,
            "CHART_WIDTH and CHART_HEIGHT must be at least 100 pixels"
        );
        Ok(())
    }
}
