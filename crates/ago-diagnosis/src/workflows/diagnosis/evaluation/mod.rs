mod config;
mod policy;
mod rules;

pub use config::EvaluationSettings;
pub use policy::{
    infer_grade, overall_percentage, GradeBasis, InferredGrade, Rank, ReadinessBand,
    MAX_ITEM_SCORE,
};

use std::time::Duration;

use super::document::{DocumentAccessor, DocumentError};
use super::domain::{GradedResult, ResultSource, RubricItem};
use super::judge::{JudgmentBackend, JudgmentError};

/// Grades rubric items against a document, consulting the judgment backend when needed.
///
/// Evaluation is split in two: [`ItemEvaluator::prepare`] runs every document query
/// synchronously, then [`ItemEvaluator::resolve`] awaits the judgment call (if any).
/// Neither step can fail; every failure is folded into an `error` result for that item.
#[derive(Debug, Clone, Default)]
pub struct ItemEvaluator {
    settings: EvaluationSettings,
}

impl ItemEvaluator {
    pub fn new(settings: EvaluationSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &EvaluationSettings {
        &self.settings
    }

    pub fn prepare<'a, D>(&self, item: &'a RubricItem, document: &D, target: &str) -> PreparedItem<'a>
    where
        D: DocumentAccessor + ?Sized,
    {
        rules::prepare(item, document, target, &self.settings)
            .unwrap_or_else(|err| PreparedItem::Graded(rules::error_result(item, &err)))
    }

    pub async fn resolve<J>(&self, prepared: PreparedItem<'_>, judge: &J) -> GradedResult
    where
        J: JudgmentBackend,
    {
        match prepared {
            PreparedItem::Graded(result) => result,
            PreparedItem::Pending(pending) => match self.request_judgment(&pending, judge).await {
                Ok(reply) => rules::judged_result(pending.item, reply, pending.source),
                Err(err) => {
                    tracing::warn!(item = %pending.item.id, error = %err, "rubric item evaluation failed");
                    rules::error_result(pending.item, &err)
                }
            },
        }
    }

    /// Prepares and resolves a single item.
    pub async fn evaluate<D, J>(
        &self,
        item: &RubricItem,
        document: &D,
        judge: &J,
        target: &str,
    ) -> GradedResult
    where
        D: DocumentAccessor + ?Sized,
        J: JudgmentBackend,
    {
        let prepared = self.prepare(item, document, target);
        self.resolve(prepared, judge).await
    }

    async fn request_judgment<J>(
        &self,
        pending: &PendingJudgment<'_>,
        judge: &J,
    ) -> Result<String, EvaluationError>
    where
        J: JudgmentBackend,
    {
        let timeout = self.settings.judgment_timeout;
        let reply = tokio::time::timeout(timeout, judge.complete(&pending.prompt))
            .await
            .map_err(|_| EvaluationError::Timeout(timeout))??;
        Ok(reply)
    }
}

/// Item after the synchronous pass.
#[derive(Debug, Clone, PartialEq)]
pub enum PreparedItem<'a> {
    Graded(GradedResult),
    Pending(PendingJudgment<'a>),
}

/// Judgment call still owed for an `AiJudged` or `Hybrid` item.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingJudgment<'a> {
    pub item: &'a RubricItem,
    pub prompt: String,
    pub source: ResultSource,
}

/// Reason a single rubric item could not be graded.
#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Judgment(#[from] JudgmentError),
    #[error("judgment timed out after {}s", .0.as_secs_f32())]
    Timeout(Duration),
}
