//! Page diagnosis: rubric evaluation, scoring, and report aggregation.

pub mod document;
pub mod domain;
pub mod evaluation;
pub mod fetcher;
pub mod judge;
pub mod report;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use document::{DocumentAccessor, DocumentError, ElementSet, HtmlDocument, MatchedElement};
pub use domain::{EvaluationMethod, GradedResult, ItemId, ResultSource, RubricItem};
pub use evaluation::{
    infer_grade, overall_percentage, EvaluationError, EvaluationSettings, GradeBasis,
    InferredGrade, ItemEvaluator, PendingJudgment, PreparedItem, Rank, ReadinessBand,
    MAX_ITEM_SCORE,
};
pub use fetcher::{parse_target, FetchError, FetchedPage, HttpPageFetcher, PageFetcher, TargetError};
pub use judge::{ConfiguredJudge, JudgmentBackend, JudgmentError, OpenAiJudge};
pub use report::{aggregate, DiagnosisReport};
pub use router::{diagnosis_router, DiagnoseQuery, MISSING_URL_MESSAGE};
pub use service::{DiagnosisError, DiagnosisService};
