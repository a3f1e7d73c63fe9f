use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use super::document::HtmlDocument;
use super::domain::GradedResult;
use super::evaluation::{EvaluationSettings, ItemEvaluator, PreparedItem};
use super::fetcher::{parse_target, FetchError, PageFetcher, TargetError};
use super::judge::JudgmentBackend;
use super::report::{aggregate, DiagnosisReport};
use crate::workflows::rubric::Rubric;

/// Orchestrates one diagnosis: fetch, parse, evaluate every rubric item, aggregate.
pub struct DiagnosisService<F, J> {
    rubric: Arc<Rubric>,
    fetcher: Arc<F>,
    judge: Arc<J>,
    evaluator: ItemEvaluator,
}

impl<F, J> DiagnosisService<F, J>
where
    F: PageFetcher + 'static,
    J: JudgmentBackend + 'static,
{
    pub fn new(
        rubric: Arc<Rubric>,
        fetcher: Arc<F>,
        judge: Arc<J>,
        settings: EvaluationSettings,
    ) -> Self {
        Self {
            rubric,
            fetcher,
            judge,
            evaluator: ItemEvaluator::new(settings),
        }
    }

    pub fn rubric(&self) -> &Rubric {
        &self.rubric
    }

    /// Diagnose a single page.
    ///
    /// Item-level failures never surface here; they are graded as `error` items. Only an
    /// invalid target or a failed retrieval produce an error, and the latter carries the
    /// fallback report for the caller to return.
    pub async fn diagnose(&self, target: &str) -> Result<DiagnosisReport, DiagnosisError> {
        let url = parse_target(target)?;
        let target = url.to_string();

        let page = match self.fetcher.fetch(&url).await {
            Ok(page) => page,
            Err(source) => {
                warn!(target = %target, error = %source, "target retrieval failed");
                let report = DiagnosisReport::retrieval_failure(&target, &source, Utc::now());
                return Err(DiagnosisError::Fetch {
                    source,
                    report: Box::new(report),
                });
            }
        };

        // The parsed DOM is not `Send`; it must be dropped before the first judgment await.
        let prepared: Vec<PreparedItem<'_>> = {
            let document = HtmlDocument::parse(&page.body);
            self.rubric
                .items()
                .iter()
                .map(|item| self.evaluator.prepare(item, &document, &target))
                .collect()
        };

        let pending = prepared
            .iter()
            .filter(|item| matches!(item, PreparedItem::Pending(_)))
            .count();
        let permits = Semaphore::new(self.evaluator.settings().judgment_concurrency.max(1));
        let results = join_all(
            prepared
                .into_iter()
                .map(|item| self.resolve_bounded(item, &permits)),
        )
        .await;

        let report = aggregate(results, &target, Utc::now());
        info!(
            target = %report.target,
            items = report.evaluated_items,
            judged = pending,
            total_score = report.total_score,
            percentage = report.percentage,
            rank = %report.rank,
            "diagnosis complete"
        );

        Ok(report)
    }

    /// Resolves one item, holding a permit while a judgment call is in flight.
    async fn resolve_bounded(&self, item: PreparedItem<'_>, permits: &Semaphore) -> GradedResult {
        let _permit = match item {
            PreparedItem::Pending(_) => permits.acquire().await.ok(),
            PreparedItem::Graded(_) => None,
        };
        self.evaluator.resolve(item, self.judge.as_ref()).await
    }
}

/// Request-level diagnosis failure.
#[derive(Debug, thiserror::Error)]
pub enum DiagnosisError {
    #[error("invalid target: {0}")]
    InvalidTarget(#[from] TargetError),
    #[error("target could not be retrieved: {source}")]
    Fetch {
        source: FetchError,
        report: Box<DiagnosisReport>,
    },
}

impl DiagnosisError {
    /// Fallback report for retrieval failures.
    pub fn report(&self) -> Option<&DiagnosisReport> {
        match self {
            DiagnosisError::InvalidTarget(_) => None,
            DiagnosisError::Fetch { report, .. } => Some(report),
        }
    }
}
