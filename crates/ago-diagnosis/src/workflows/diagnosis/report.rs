use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{GradedResult, ResultSource};
use super::evaluation::{overall_percentage, Rank, ReadinessBand, MAX_ITEM_SCORE};

/// Item recommendations folded into the overall recommendation.
const OVERALL_RECOMMENDATION_ITEMS: usize = 3;

/// Response payload for one diagnosis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisReport {
    pub target: String,
    pub timestamp: DateTime<Utc>,
    pub results: Vec<GradedResult>,
    pub total_score: u32,
    pub evaluated_items: usize,
    pub percentage: u8,
    pub rank: Rank,
    pub summary: String,
    pub recommendation: String,
}

/// Folds graded items into a report. Pure: the caller supplies the timestamp.
pub fn aggregate(results: Vec<GradedResult>, target: &str, timestamp: DateTime<Utc>) -> DiagnosisReport {
    let total_score: u32 = results.iter().map(|result| u32::from(result.score)).sum();
    let evaluated_items = results.len();
    let percentage = overall_percentage(total_score, evaluated_items);
    let band = ReadinessBand::from_percentage(percentage);
    let recommendation = overall_recommendation(&results, band);

    DiagnosisReport {
        target: target.to_string(),
        timestamp,
        results,
        total_score,
        evaluated_items,
        percentage,
        rank: Rank::from_percentage(percentage),
        summary: band.summary().to_string(),
        recommendation,
    }
}

/// Recommendations of the weakest graded items (lowest score first, rubric order on ties),
/// or the band's fixed advice when nothing is left to improve.
fn overall_recommendation(results: &[GradedResult], band: ReadinessBand) -> String {
    let mut weakest: Vec<&GradedResult> = results
        .iter()
        .filter(|result| result.score < MAX_ITEM_SCORE && result.rank != Rank::Unrated)
        .filter(|result| !result.recommendation.trim().is_empty())
        .collect();
    weakest.sort_by_key(|result| result.score);

    let mut picked: Vec<&str> = Vec::new();
    for result in weakest {
        let text = result.recommendation.trim();
        if !picked.contains(&text) {
            picked.push(text);
        }
        if picked.len() == OVERALL_RECOMMENDATION_ITEMS {
            break;
        }
    }

    if picked.is_empty() {
        band.recommendation().to_string()
    } else {
        picked.join(" ")
    }
}

impl DiagnosisReport {
    /// Report returned when the target page could not be retrieved.
    pub fn retrieval_failure(
        target: &str,
        reason: impl std::fmt::Display,
        timestamp: DateTime<Utc>,
    ) -> Self {
        aggregate(vec![GradedResult::system_failure(reason)], target, timestamp)
    }

    pub fn band(&self) -> ReadinessBand {
        ReadinessBand::from_percentage(self.percentage)
    }

    pub fn count_by_source(&self, source: ResultSource) -> usize {
        self.results
            .iter()
            .filter(|result| result.source == source)
            .count()
    }

    pub fn result(&self, id: &str) -> Option<&GradedResult> {
        self.results.iter().find(|result| result.id.as_str() == id)
    }
}
