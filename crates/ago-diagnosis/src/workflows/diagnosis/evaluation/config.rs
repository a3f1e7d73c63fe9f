use std::time::Duration;

/// Limits applied while evaluating one rubric against one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationSettings {
    /// Upper bound for a single judgment call; exceeding it fails only that item.
    pub judgment_timeout: Duration,
    /// Judgment calls allowed in flight per diagnosis.
    pub judgment_concurrency: usize,
    /// Characters of matched page content embedded in a prompt.
    pub evidence_char_limit: usize,
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self {
            judgment_timeout: Duration::from_secs(30),
            judgment_concurrency: 4,
            evidence_char_limit: 1000,
        }
    }
}
