use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::fetcher::PageFetcher;
use super::judge::JudgmentBackend;
use super::service::{DiagnosisError, DiagnosisService};

pub const MISSING_URL_MESSAGE: &str = "Missing url parameter";

#[derive(Debug, Default, Deserialize)]
pub struct DiagnoseQuery {
    #[serde(default)]
    pub url: Option<String>,
}

/// Router exposing `GET /diagnose?url=<target>`.
pub fn diagnosis_router<F, J>(service: Arc<DiagnosisService<F, J>>) -> Router
where
    F: PageFetcher + 'static,
    J: JudgmentBackend + 'static,
{
    Router::new()
        .route("/diagnose", get(diagnose_handler::<F, J>))
        .with_state(service)
}

pub(crate) async fn diagnose_handler<F, J>(
    State(service): State<Arc<DiagnosisService<F, J>>>,
    Query(query): Query<DiagnoseQuery>,
) -> Response
where
    F: PageFetcher + 'static,
    J: JudgmentBackend + 'static,
{
    let Some(url) = query.url.filter(|url| !url.trim().is_empty()) else {
        let payload = json!({ "error": MISSING_URL_MESSAGE });
        return (StatusCode::BAD_REQUEST, Json(payload)).into_response();
    };

    match service.diagnose(&url).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(DiagnosisError::InvalidTarget(error)) => {
            let payload = json!({ "error": error.to_string() });
            (StatusCode::BAD_REQUEST, Json(payload)).into_response()
        }
        Err(DiagnosisError::Fetch { report, .. }) => {
            (StatusCode::BAD_GATEWAY, Json(*report)).into_response()
        }
    }
}
