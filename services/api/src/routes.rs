use crate::infra::AppState;
use ago_diagnosis::workflows::diagnosis::{
    diagnosis_router, DiagnosisService, JudgmentBackend, PageFetcher,
};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde_json::json;
use std::sync::Arc;

pub(crate) const BANNER: &str = "AGO Diagnosis API is running. Use /diagnose?url=YOUR_URL";

pub(crate) fn with_diagnosis_routes<F, J>(service: Arc<DiagnosisService<F, J>>) -> Router
where
    F: PageFetcher + 'static,
    J: JudgmentBackend + 'static,
{
    diagnosis_router(service)
        .route("/", get(banner))
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn banner() -> Json<serde_json::Value> {
    Json(json!({ "message": BANNER }))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
