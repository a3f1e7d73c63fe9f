use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

use super::evaluation::Rank;

/// Stable identifier of a rubric item, unique within one rubric.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// How a rubric item is resolved. Parsed once from the rubric's method code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EvaluationMethod {
    /// `0`: count the elements matching the selector.
    MachineCount,
    /// `1`: ask the judgment backend, passing the matched text content.
    AiJudged,
    /// `2`: ask the judgment backend, passing the matched markup as evidence.
    Hybrid,
    /// Any other code, kept verbatim for reporting.
    Unsupported(String),
}

impl EvaluationMethod {
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "0" => Self::MachineCount,
            "1" => Self::AiJudged,
            "2" => Self::Hybrid,
            other => Self::Unsupported(other.to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Self::MachineCount => "0",
            Self::AiJudged => "1",
            Self::Hybrid => "2",
            Self::Unsupported(code) => code,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::MachineCount => "Machine count",
            Self::AiJudged => "AI judged",
            Self::Hybrid => "Hybrid",
            Self::Unsupported(_) => "Unsupported",
        }
    }

    pub fn needs_judgment(&self) -> bool {
        matches!(self, Self::AiJudged | Self::Hybrid)
    }
}

impl Serialize for EvaluationMethod {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

/// One evaluation rule of a rubric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RubricItem {
    pub id: ItemId,
    pub label: String,
    pub selector: String,
    pub method: EvaluationMethod,
    pub prompt_template: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation_template: Option<String>,
}

impl RubricItem {
    pub const RECOMMENDATION_DELIMITER: char = '|';

    /// False for empty, whitespace-only, or bare `#` / `.` selectors.
    pub fn has_usable_selector(&self) -> bool {
        let selector = self.selector.trim();
        if selector.is_empty() {
            return false;
        }

        let degenerate = selector
            .split(',')
            .map(str::trim)
            .all(|part| part.is_empty() || part.chars().all(|c| c == '#' || c == '.'));
        !degenerate
    }

    /// Selects the recommendation for a score band.
    ///
    /// The template is a `|`-delimited list indexed by score; indices past the end use the
    /// last entry and a missing template yields a generic "add the element" suggestion.
    pub fn recommendation_for(&self, score: u8) -> String {
        let entries: Vec<&str> = self
            .recommendation_template
            .as_deref()
            .map(|template| {
                template
                    .split(Self::RECOMMENDATION_DELIMITER)
                    .map(str::trim)
                    .collect()
            })
            .unwrap_or_default();

        if entries.iter().all(|entry| entry.is_empty()) {
            return format!(
                "Add the missing element for \"{}\" (`{}`).",
                self.label,
                self.selector.trim()
            );
        }

        entries
            .get(usize::from(score))
            .or_else(|| entries.last())
            .map(|entry| entry.to_string())
            .unwrap_or_default()
    }
}

/// Provenance of a graded result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultSource {
    Machine,
    Ai,
    Hybrid,
    Error,
    Unknown,
    System,
}

impl ResultSource {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Machine => "machine",
            Self::Ai => "ai",
            Self::Hybrid => "hybrid",
            Self::Error => "error",
            Self::Unknown => "unknown",
            Self::System => "system",
        }
    }
}

/// Outcome of evaluating one rubric item against one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradedResult {
    pub id: ItemId,
    pub label: String,
    pub score: u8,
    pub rank: Rank,
    pub comment: String,
    pub recommendation: String,
    pub source: ResultSource,
}

impl GradedResult {
    pub const SYSTEM_ID: &'static str = "system";

    /// Synthetic result standing in for the whole rubric when the page could not be read.
    pub fn system_failure(reason: impl fmt::Display) -> Self {
        Self {
            id: ItemId(Self::SYSTEM_ID.to_string()),
            label: "Page retrieval".to_string(),
            score: 0,
            rank: Rank::lowest(),
            comment: format!("The target page could not be retrieved: {reason}"),
            recommendation:
                "Confirm the URL is publicly reachable, returns HTML, and responds promptly."
                    .to_string(),
            source: ResultSource::System,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(selector: &str, recommendation: Option<&str>) -> RubricItem {
        RubricItem {
            id: ItemId::from("check"),
            label: "Check".to_string(),
            selector: selector.to_string(),
            method: EvaluationMethod::MachineCount,
            prompt_template: String::new(),
            recommendation_template: recommendation.map(str::to_string),
        }
    }

    #[test]
    fn method_codes_parse_into_closed_variants() {
        assert_eq!(EvaluationMethod::from_code("0"), EvaluationMethod::MachineCount);
        assert_eq!(EvaluationMethod::from_code(" 1 "), EvaluationMethod::AiJudged);
        assert_eq!(EvaluationMethod::from_code("2"), EvaluationMethod::Hybrid);
        assert_eq!(
            EvaluationMethod::from_code("9"),
            EvaluationMethod::Unsupported("9".to_string())
        );
        assert_eq!(EvaluationMethod::from_code("9").code(), "9");
    }

    #[test]
    fn degenerate_selectors_are_unusable() {
        for selector in ["", "   ", "#", ".", " # ", "#, ."] {
            assert!(
                !item(selector, None).has_usable_selector(),
                "{selector:?} should be rejected"
            );
        }
        for selector in ["h1", "#main", ".hero", "html[lang]", "meta[name=\"description\"]"] {
            assert!(
                item(selector, None).has_usable_selector(),
                "{selector:?} should be accepted"
            );
        }
    }

    #[test]
    fn recommendation_is_indexed_by_score_with_last_entry_fallback() {
        let item = item("h1", Some("Add an h1 | Improve the h1 | Keep the h1"));
        assert_eq!(item.recommendation_for(0), "Add an h1");
        assert_eq!(item.recommendation_for(1), "Improve the h1");
        assert_eq!(item.recommendation_for(5), "Keep the h1");
    }

    #[test]
    fn recommendation_defaults_when_template_missing() {
        let recommendation = item("h1", None).recommendation_for(0);
        assert!(recommendation.contains("Add the missing element"));
        assert!(recommendation.contains("h1"));

        let blank = item("h1", Some("  ")).recommendation_for(3);
        assert!(blank.contains("Add the missing element"));
    }

    #[test]
    fn system_failure_uses_lowest_rank() {
        let result = GradedResult::system_failure("connection refused");
        assert_eq!(result.id.as_str(), "system");
        assert_eq!(result.source, ResultSource::System);
        assert_eq!(result.score, 0);
        assert_eq!(result.rank, Rank::D);
        assert!(result.comment.contains("connection refused"));
    }
}
