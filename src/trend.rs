use std::sync::OnceLock;

use chrono::{DateTime, NaiveDateTime};
use image::{codecs::png::PngEncoder, ExtendedColorType, ImageEncoder};
use plotters::{
    prelude::*,
    style::{register_font, FontStyle},
};

use crate::{
    error::{Error, Result},
    readings::{Reading, ReadingLog},
};

static CHART_FONT: &[u8] = include_bytes!("../assets/fonts/DejaVuSans.ttf");
const FONT_FAMILY: &str = "sans-serif";
const SERIES_COLOR: RGBColor = RGBColor(255, 165, 0);
const SERIES_LABEL: &str = "Current (Ampere)";

/// Readings for `motor_name` only, oldest first.
///
/// Matching is exact and case-sensitive. The sort is stable, so readings that
/// share a timestamp keep their insertion order.
pub fn trend_for(readings: impl IntoIterator<Item = Reading>, motor_name: &str) -> Vec<Reading> {
    let mut trend: Vec<Reading> = readings
        .into_iter()
        .filter(|r| r.motor_name == motor_name)
        .collect();
    trend.sort_by_key(|r| r.timestamp);
    trend
}

/// Draws the current trend of a single motor as a PNG line chart.
#[derive(Debug, Clone)]
pub struct TrendRenderer {
    width: u32,
    height: u32,
}

impl TrendRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Re-read `log` and render the trend for `motor_name`. A motor with no
    /// readings yields an empty chart rather than an error.
    pub fn render(&self, motor_name: &str, log: &ReadingLog) -> Result<Vec<u8>> {
        let trend = trend_for(log.read_all()?, motor_name);
        self.render_trend(motor_name, &trend)
    }

    /// Render an already filtered and ordered trend.
    pub fn render_trend(&self, motor_name: &str, trend: &[Reading]) -> Result<Vec<u8>> {
        ensure_font()?;

        let (width, height) = (self.width, self.height);
        let mut rgb = vec![0u8; width as usize * height as usize * 3];
        let points: Vec<(f64, f64)> = trend
            .iter()
            .map(|r| (epoch_seconds(r.timestamp), r.current_amperes))
            .collect();
        let (x_range, y_range) = axis_ranges(&points);
        let has_points = !points.is_empty();

        {
            let root = BitMapBackend::with_buffer(&mut rgb, (width, height)).into_drawing_area();
            root.fill(&WHITE).map_err(render_error)?;

            let mut chart = ChartBuilder::on(&root)
                .caption(
                    format!("Current Trend for Motor: {motor_name}"),
                    (FONT_FAMILY, 22),
                )
                .margin(16)
                .x_label_area_size(48)
                .y_label_area_size(64)
                .build_cartesian_2d(x_range, y_range)
                .map_err(render_error)?;

            chart
                .configure_mesh()
                .x_desc("Time")
                .y_desc("Amperes (A)")
                .x_labels(5)
                .x_label_formatter(&|x: &f64| if has_points { axis_time(*x) } else { String::new() })
                .label_style((FONT_FAMILY, 13))
                .draw()
                .map_err(render_error)?;

            chart
                .draw_series(LineSeries::new(points.iter().copied(), SERIES_COLOR.stroke_width(2)))
                .map_err(render_error)?
                .label(SERIES_LABEL)
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], SERIES_COLOR.stroke_width(2)));

            chart
                .draw_series(points.iter().map(|&p| Circle::new(p, 4, SERIES_COLOR.filled())))
                .map_err(render_error)?;

            chart
                .configure_series_labels()
                .label_font((FONT_FAMILY, 13))
                .background_style(&WHITE.mix(0.8))
                .border_style(&BLACK)
                .draw()
                .map_err(render_error)?;

            root.present().map_err(render_error)?;
        }

        encode_png(&rgb, width, height)
    }
}

fn ensure_font() -> Result<()> {
    static REGISTERED: OnceLock<bool> = OnceLock::new();
    let ok = *REGISTERED
        .get_or_init(|| register_font(FONT_FAMILY, FontStyle::Normal, CHART_FONT).is_ok());
    if ok {
        Ok(())
    } else {
        Err(Error::Render("bundled chart font could not be loaded".to_owned()))
    }
}

/// Pads degenerate ranges so a single point (or none) still gets a drawable
/// plot area. Currents are never negative, so the y axis starts at zero.
fn axis_ranges(points: &[(f64, f64)]) -> (std::ops::Range<f64>, std::ops::Range<f64>) {
    let x_min = points.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
    let x_max = points.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
    let y_max = points.iter().map(|p| p.1).fold(0.0, f64::max);

    let x_range = if points.is_empty() {
        0.0..3600.0
    } else if x_max - x_min < 1.0 {
        x_min - 60.0..x_max + 60.0
    } else {
        let pad = (x_max - x_min) * 0.05;
        x_min - pad..x_max + pad
    };

    (x_range, 0.0..y_max.max(1.0) * 1.1)
}

fn epoch_seconds(ts: NaiveDateTime) -> f64 {
    ts.and_utc().timestamp() as f64
}

fn axis_time(seconds: f64) -> String {
    DateTime::from_timestamp(seconds.round() as i64, 0)
        .map(|dt| dt.naive_utc().format("%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

fn encode_png(rgb: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let mut png = Vec::new();
    PngEncoder::new(&mut png)
        .write_image(rgb, width, height, ExtendedColorType::Rgb8)
        .map_err(render_error)?;
    Ok(png)
}

fn render_error(e: impl std::fmt::Display) -> Error {
    Error::Render(e.to_string())
}
