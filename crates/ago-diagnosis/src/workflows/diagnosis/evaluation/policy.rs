use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Highest score a single rubric item can earn.
pub const MAX_ITEM_SCORE: u8 = 5;

/// Letter grade shared by rubric items and whole reports.
///
/// Items are ranked by projecting their 0-5 score onto the percentage scale, so a single
/// threshold table governs both. `Unrated` marks items that were never evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rank {
    #[serde(rename = "-")]
    Unrated,
    D,
    C,
    B,
    A,
    S,
}

impl Rank {
    /// Inclusive lower bounds, best rank first.
    const THRESHOLDS: [(u8, Rank); 4] = [(90, Rank::S), (75, Rank::A), (60, Rank::B), (40, Rank::C)];

    pub fn from_percentage(percentage: u8) -> Self {
        Self::THRESHOLDS
            .iter()
            .find(|(floor, _)| percentage >= *floor)
            .map(|(_, rank)| *rank)
            .unwrap_or(Rank::D)
    }

    pub fn from_item_score(score: u8) -> Self {
        Self::from_percentage(item_percentage(score))
    }

    pub const fn lowest() -> Self {
        Rank::D
    }

    pub const fn label(self) -> &'static str {
        match self {
            Rank::Unrated => "-",
            Rank::D => "D",
            Rank::C => "C",
            Rank::B => "B",
            Rank::A => "A",
            Rank::S => "S",
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn item_percentage(score: u8) -> u8 {
    let score = score.min(MAX_ITEM_SCORE);
    score * (100 / MAX_ITEM_SCORE)
}

/// `round(100 * total / (evaluated * 5))`, rounding halves up; zero when nothing was evaluated.
pub fn overall_percentage(total_score: u32, evaluated_items: usize) -> u8 {
    if evaluated_items == 0 {
        return 0;
    }

    let max = evaluated_items as u64 * u64::from(MAX_ITEM_SCORE);
    let scaled = (u64::from(total_score) * 200 + max) / (2 * max);
    scaled.min(100) as u8
}

/// Qualitative band used for the report summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessBand {
    High,
    Medium,
    Low,
}

impl ReadinessBand {
    pub fn from_percentage(percentage: u8) -> Self {
        match percentage {
            75.. => Self::High,
            40.. => Self::Medium,
            _ => Self::Low,
        }
    }

    pub const fn summary(self) -> &'static str {
        match self {
            Self::High => {
                "The page is well prepared for AI search: structured data, metadata, and content signals are largely in place."
            }
            Self::Medium => {
                "The page is partially optimized for AI search; several signals are missing or could be strengthened."
            }
            Self::Low => {
                "AI search optimization is insufficient: key structured data and metadata are missing, so AI systems will struggle to read and cite this page."
            }
        }
    }

    /// Overall advice used when no individual item has anything left to fix.
    pub const fn recommendation(self) -> &'static str {
        match self {
            Self::High => "Keep structured data and metadata in sync with the page content as it changes.",
            Self::Medium => "Fill in the missing signals listed in the item results, starting with structured data.",
            Self::Low => "Add structured data and core metadata (language, description, canonical URL) so AI systems can read and cite the page.",
        }
    }
}

/// How a score was recovered from judgment text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradeBasis {
    Numeric,
    Positive,
    Mitigated,
    Negative,
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InferredGrade {
    pub score: u8,
    pub rank: Rank,
    pub basis: GradeBasis,
}

impl InferredGrade {
    fn new(score: u8, basis: GradeBasis) -> Self {
        Self {
            score,
            rank: Rank::from_item_score(score),
            basis,
        }
    }
}

struct InferencePatterns {
    explicit: Regex,
    out_of_five: Regex,
    digit: Regex,
    negated_positive: Regex,
    positive: Regex,
    mitigated: Regex,
    negative: Regex,
}

fn patterns() -> &'static InferencePatterns {
    static PATTERNS: OnceLock<InferencePatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| InferencePatterns {
        // Tolerates markdown emphasis and dash separators: `**Score:** 4`, `Score - 4`.
        explicit: Regex::new(r"(?i)\bscore\W{0,4}([0-5])\b").expect("valid score pattern"),
        out_of_five: Regex::new(r"\b([0-5])\s*/\s*5\b").expect("valid ratio pattern"),
        digit: Regex::new(r"[0-9]").expect("valid digit pattern"),
        negated_positive: Regex::new(
            r"(?i)\b(?:not|never|hardly|isn't|aren't|wasn't)\s+(?:\w+\s+)?(?:good|sufficient|appropriate|adequate|excellent|well[- ](?:structured|optimi[sz]ed))\b",
        )
        .expect("valid negation pattern"),
        positive: Regex::new(
            r"(?i)\b(good|sufficient|no (?:major |significant )?(?:issues|problems)|appropriate|excellent|well[- ](?:structured|optimi[sz]ed))\b",
        )
        .expect("valid positive pattern"),
        mitigated: Regex::new(
            r"(?i)\b(partial|partially|somewhat|needs? improvement|could be improved|room for improvement)\b",
        )
        .expect("valid mitigated pattern"),
        negative: Regex::new(
            r"(?i)\b(insufficient|lacking|lacks|not found|missing|absent|poor)\b",
        )
        .expect("valid negative pattern"),
    })
}

/// Recovers a 0-5 score from free-form judgment text.
///
/// Explicit numbers win (`Score: 4`, `3/5`, a bare digit, or the only digit in the reply
/// when it lies in 0-5). Otherwise keyword classes are scanned in priority order
/// positive, mitigated, negative; text matching none of them scores 2. A negated positive
/// phrase ("not sufficient") counts as negative.
pub fn infer_grade(reply: &str) -> InferredGrade {
    if let Some(score) = parse_numeric_score(reply) {
        return InferredGrade::new(score, GradeBasis::Numeric);
    }

    let patterns = patterns();
    if patterns.negated_positive.is_match(reply) {
        InferredGrade::new(1, GradeBasis::Negative)
    } else if patterns.positive.is_match(reply) {
        InferredGrade::new(5, GradeBasis::Positive)
    } else if patterns.mitigated.is_match(reply) {
        InferredGrade::new(3, GradeBasis::Mitigated)
    } else if patterns.negative.is_match(reply) {
        InferredGrade::new(1, GradeBasis::Negative)
    } else {
        InferredGrade::new(2, GradeBasis::Default)
    }
}

fn parse_numeric_score(reply: &str) -> Option<u8> {
    let patterns = patterns();

    let captured = patterns
        .explicit
        .captures(reply)
        .or_else(|| patterns.out_of_five.captures(reply))
        .and_then(|caps| caps.get(1))
        .and_then(|digit| digit.as_str().parse::<u8>().ok());
    if captured.is_some() {
        return captured;
    }

    let mut digits = patterns.digit.find_iter(reply);
    match (digits.next(), digits.next()) {
        (Some(only), None) => only
            .as_str()
            .parse::<u8>()
            .ok()
            .filter(|score| *score <= MAX_ITEM_SCORE),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overall_rank_boundaries_are_inclusive() {
        assert_eq!(Rank::from_percentage(100), Rank::S);
        assert_eq!(Rank::from_percentage(90), Rank::S);
        assert_eq!(Rank::from_percentage(89), Rank::A);
        assert_eq!(Rank::from_percentage(75), Rank::A);
        assert_eq!(Rank::from_percentage(74), Rank::B);
        assert_eq!(Rank::from_percentage(60), Rank::B);
        assert_eq!(Rank::from_percentage(59), Rank::C);
        assert_eq!(Rank::from_percentage(40), Rank::C);
        assert_eq!(Rank::from_percentage(39), Rank::D);
        assert_eq!(Rank::from_percentage(0), Rank::D);
    }

    #[test]
    fn item_ranks_follow_the_shared_scale() {
        let ranks: Vec<Rank> = (0..=5).map(Rank::from_item_score).collect();
        assert_eq!(
            ranks,
            vec![Rank::D, Rank::D, Rank::C, Rank::B, Rank::A, Rank::S]
        );
    }

    #[test]
    fn rank_never_decreases_as_score_increases() {
        for score in 0..MAX_ITEM_SCORE {
            assert!(Rank::from_item_score(score) <= Rank::from_item_score(score + 1));
        }
        for percentage in 0..100u8 {
            assert!(Rank::from_percentage(percentage) <= Rank::from_percentage(percentage + 1));
        }
    }

    #[test]
    fn unrated_sorts_below_every_grade() {
        assert!(Rank::Unrated < Rank::D);
        assert_eq!(Rank::Unrated.label(), "-");
    }

    #[test]
    fn percentage_guards_empty_batches_and_rounds_half_up() {
        assert_eq!(overall_percentage(0, 0), 0);
        assert_eq!(overall_percentage(10, 2), 100);
        assert_eq!(overall_percentage(0, 2), 0);
        assert_eq!(overall_percentage(7, 3), 47);
        // 100 * 1 / 40 = 2.5
        assert_eq!(overall_percentage(1, 8), 3);
        assert_eq!(overall_percentage(5, 8), 13);
    }

    #[test]
    fn summary_bands_split_at_fixed_percentages() {
        assert_eq!(ReadinessBand::from_percentage(100), ReadinessBand::High);
        assert_eq!(ReadinessBand::from_percentage(75), ReadinessBand::High);
        assert_eq!(ReadinessBand::from_percentage(74), ReadinessBand::Medium);
        assert_eq!(ReadinessBand::from_percentage(40), ReadinessBand::Medium);
        assert_eq!(ReadinessBand::from_percentage(39), ReadinessBand::Low);
    }

    #[test]
    fn explicit_scores_are_parsed_directly() {
        let grade = infer_grade("Score: 4\nThe title is descriptive but long.");
        assert_eq!(grade.score, 4);
        assert_eq!(grade.rank, Rank::A);
        assert_eq!(grade.basis, GradeBasis::Numeric);

        assert_eq!(infer_grade("I would rate this 2/5 overall.").score, 2);
        assert_eq!(infer_grade("3").score, 3);
    }

    #[test]
    fn ambiguous_digits_fall_back_to_keywords() {
        let grade = infer_grade("There are 12 headings and the structure is good.");
        assert_eq!(grade.basis, GradeBasis::Positive);
        assert_eq!(grade.score, 5);

        let grade = infer_grade("Only 9 words; content is lacking.");
        assert_eq!(grade.basis, GradeBasis::Negative);
    }

    #[test]
    fn keyword_classes_apply_in_priority_order() {
        let positive = infer_grade("The description is appropriate and clear.");
        assert_eq!((positive.score, positive.rank), (5, Rank::S));

        let mitigated = infer_grade("The heading hierarchy needs improvement.");
        assert_eq!((mitigated.score, mitigated.rank), (3, Rank::B));

        let negative = infer_grade("Structured data is insufficient for this page.");
        assert_eq!((negative.score, negative.rank), (1, Rank::D));

        let neutral = infer_grade("The page talks about shoes.");
        assert_eq!((neutral.score, neutral.rank), (2, Rank::C));
        assert_eq!(neutral.basis, GradeBasis::Default);
    }

    #[test]
    fn decorated_score_lines_are_parsed() {
        let grade = infer_grade("**Score:** 1\nThe h1 heading is good but the title is lacking.");
        assert_eq!((grade.score, grade.rank, grade.basis), (1, Rank::D, GradeBasis::Numeric));

        assert_eq!(infer_grade("Score - 1\nThe h1 is good.").score, 1);
        assert_eq!(infer_grade("SCORE \u{2014} 3\nSee h2 and h3.").score, 3);
        assert_eq!(infer_grade("Score=4").score, 4);
    }

    #[test]
    fn out_of_range_scores_are_not_truncated() {
        let grade = infer_grade("Score: 10 of 10, the page is good.");
        assert_eq!(grade.basis, GradeBasis::Positive);
    }

    #[test]
    fn negated_praise_is_negative() {
        let grade = infer_grade("The structured data is not sufficient.");
        assert_eq!((grade.score, grade.rank, grade.basis), (1, Rank::D, GradeBasis::Negative));

        assert_eq!(infer_grade("The title isn't very good.").basis, GradeBasis::Negative);
        assert_eq!(infer_grade("There are no major issues.").basis, GradeBasis::Positive);
    }

    #[test]
    fn insufficient_is_not_read_as_sufficient() {
        let grade = infer_grade("Alt text coverage is insufficient.");
        assert_eq!(grade.basis, GradeBasis::Negative);
    }
}
