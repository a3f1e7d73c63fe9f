use ago_diagnosis::config::AppConfig;
use ago_diagnosis::error::AppError;
use ago_diagnosis::workflows::diagnosis::{ConfiguredJudge, DiagnosisService, HttpPageFetcher};
use ago_diagnosis::workflows::rubric::load_configured;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type LiveDiagnosisService = DiagnosisService<HttpPageFetcher, ConfiguredJudge>;

/// Wires the rubric, HTTP fetcher and judgment backend described by `config`.
pub(crate) fn build_diagnosis_service(config: &AppConfig) -> Result<LiveDiagnosisService, AppError> {
    let rubric = load_configured(config.rubric.path.as_deref())?;
    let fetcher = HttpPageFetcher::new(&config.fetch)?;
    let judge = ConfiguredJudge::from_config(&config.judge);

    if !judge.is_enabled() && rubric.judgment_items() > 0 {
        warn!(
            judged_items = rubric.judgment_items(),
            "no judgment backend configured; AI-judged items will be reported as errors"
        );
    }
    info!(
        items = rubric.len(),
        source = config
            .rubric
            .path
            .as_deref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "bundled".to_string()),
        "rubric loaded"
    );

    Ok(DiagnosisService::new(
        rubric,
        Arc::new(fetcher),
        Arc::new(judge),
        config.evaluation.clone(),
    ))
}
