use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::json;
use utoipa::OpenApi;

use super::{
    dto::{ReadingDto, ReadingsQuery, RecordReadingRequest, RecordReadingResponse},
    errors::AppError,
    AppState,
};
use crate::{error::Error, trend::trend_for};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Run synchronous log / chart work off the async executor.
async fn blocking<T, F>(f: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce() -> crate::error::Result<T> + Send + 'static,
{
    Ok(tokio::task::spawn_blocking(f).await??)
}

/// Input bound for submitted currents: finite and within `[0, max]`.
fn validate_current(value: f64, max: f64) -> crate::error::Result<()> {
    if value.is_finite() && (0.0..=max).contains(&value) {
        Ok(())
    } else {
        Err(Error::CurrentOutOfRange { value, max })
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Record one reading and return the confirmation together with the
/// refreshed trend chart for that motor.
#[utoipa::path(
    post,
    path = "/readings",
    request_body = RecordReadingRequest,
    responses(
        (status = 201, description = "Reading recorded", body = RecordReadingResponse),
        (status = 422, description = "Blank motor name or current out of range"),
        (status = 500, description = "Storage or rendering failure"),
    ),
    tag = "readings"
)]
pub async fn record_reading(
    State(state): State<AppState>,
    Json(req): Json<RecordReadingRequest>,
) -> Result<(StatusCode, Json<RecordReadingResponse>), AppError> {
    validate_current(req.current_amperes, state.max_current_amps)?;

    let (recorded, chart) = blocking(move || {
        let recorded = state
            .recorder
            .append(&req.motor_name, req.current_amperes)?;
        let chart = state
            .renderer
            .render(&recorded.reading.motor_name, state.recorder.log())?;
        Ok((recorded, chart))
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(RecordReadingResponse {
            confirmation: recorded.confirmation,
            reading: recorded.reading.into(),
            chart_png_base64: STANDARD.encode(chart),
        }),
    ))
}

/// List readings. With `motor_name`, only that motor's trend ordered by
/// time; otherwise the whole log in insertion order.
#[utoipa::path(
    get,
    path = "/readings",
    params(ReadingsQuery),
    responses(
        (status = 200, description = "Readings", body = Vec<ReadingDto>),
        (status = 500, description = "Reading log unreadable"),
    ),
    tag = "readings"
)]
pub async fn get_readings(
    State(state): State<AppState>,
    Query(params): Query<ReadingsQuery>,
) -> Result<Json<Vec<ReadingDto>>, AppError> {
    let log = state.recorder.log().clone();
    let readings = blocking(move || log.read_all()).await?;

    let readings = match params.motor_name {
        Some(name) => trend_for(readings, &name),
        None => readings,
    };

    Ok(Json(readings.into_iter().map(Into::into).collect()))
}

/// Distinct motor names in order of first appearance.
#[utoipa::path(
    get,
    path = "/motors",
    responses(
        (status = 200, description = "Known motor names", body = Vec<String>),
        (status = 500, description = "Reading log unreadable"),
    ),
    tag = "readings"
)]
pub async fn list_motors(State(state): State<AppState>) -> Result<Json<Vec<String>>, AppError> {
    let log = state.recorder.log().clone();
    Ok(Json(blocking(move || log.motor_names()).await?))
}

/// Trend chart for one motor. Unknown motors get an empty chart.
#[utoipa::path(
    get,
    path = "/motors/{motor_name}/trend.png",
    params(
        ("motor_name" = String, Path, description = "Exact motor name"),
    ),
    responses(
        (status = 200, description = "PNG line chart", content_type = "image/png", body = String),
        (status = 500, description = "Reading log unreadable or rendering failed"),
    ),
    tag = "readings"
)]
pub async fn get_trend_chart(
    State(state): State<AppState>,
    Path(motor_name): Path<String>,
) -> Result<Response, AppError> {
    let png = blocking(move || state.renderer.render(&motor_name, state.recorder.log())).await?;
    Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response())
}

/// Download the reading log exactly as stored.
#[utoipa::path(
    get,
    path = "/readings/export",
    responses(
        (status = 200, description = "CSV reading log", content_type = "text/csv", body = String),
        (status = 404, description = "Nothing recorded yet"),
        (status = 500, description = "Reading log unreadable"),
    ),
    tag = "readings"
)]
pub async fn export_readings(State(state): State<AppState>) -> Result<Response, AppError> {
    let log = state.recorder.log().clone();
    let file_name = log.file_name();

    match blocking(move || log.read_raw()).await? {
        Some(bytes) => Ok((
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_owned()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{file_name}\""),
                ),
            ],
            bytes,
        )
            .into_response()),
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "no readings recorded yet" })),
        )
            .into_response()),
    }
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Returns `200 OK` with `{"status":"ok"}` when the server is running.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
    ),
    tag = "system"
)]
pub async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}

// ---------------------------------------------------------------------------
// OpenAPI spec
// ---------------------------------------------------------------------------

#[derive(OpenApi)]
#[openapi(
    paths(record_reading, get_readings, list_motors, get_trend_chart, export_readings, health),
    components(schemas(RecordReadingRequest, RecordReadingResponse, ReadingDto)),
    tags(
        (name = "readings", description = "Motor current readings and trends"),
        (name = "system",   description = "System endpoints"),
    ),
    info(
        title = "Motor Current Service API",
        version = "0.1.0",
        description = "Records motor current readings and renders per-motor trends"
    )
)]
pub struct ApiDoc;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
