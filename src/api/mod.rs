pub mod dto;
pub mod errors;
pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;

use crate::{recorder::Recorder, trend::TrendRenderer};
use handlers::ApiDoc;

/// Shared by every handler. All members are cheap to clone.
#[derive(Debug, Clone)]
pub struct AppState {
    pub recorder: Recorder,
    pub renderer: TrendRenderer,
    /// Upper bound accepted by `POST /readings`.
    pub max_current_amps: f64,
}

pub fn router(state: AppState) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .route(
            "/readings",
            post(handlers::record_reading).get(handlers::get_readings),
        )
        .route("/readings/export", get(handlers::export_readings))
        .route("/motors", get(handlers::list_motors))
        .route("/motors/{motor_name}/trend.png", get(handlers::get_trend_chart))
        .with_state(state)
        .split_for_parts();

    router
        .route("/health", get(handlers::health))
        .route(
            "/api-docs/openapi.json",
            get(move || async move { axum::Json(api) }),
        )
}
