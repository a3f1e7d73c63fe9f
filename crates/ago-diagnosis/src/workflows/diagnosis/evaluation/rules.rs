use super::super::document::{DocumentAccessor, ElementSet};
use super::super::domain::{EvaluationMethod, GradedResult, ResultSource, RubricItem};
use super::config::EvaluationSettings;
use super::policy::{infer_grade, Rank, MAX_ITEM_SCORE};
use super::{EvaluationError, PendingJudgment, PreparedItem};

/// Dispatches one item on its method. Judgment items come back pending with their prompt.
pub(crate) fn prepare<'a, D>(
    item: &'a RubricItem,
    document: &D,
    target: &str,
    settings: &EvaluationSettings,
) -> Result<PreparedItem<'a>, EvaluationError>
where
    D: DocumentAccessor + ?Sized,
{
    if !item.has_usable_selector() {
        return Ok(PreparedItem::Graded(unusable_selector(item)));
    }

    match &item.method {
        EvaluationMethod::MachineCount => {
            let matches = document.query(&item.selector)?;
            Ok(PreparedItem::Graded(machine_count(item, matches.len())))
        }
        EvaluationMethod::AiJudged => {
            let matches = document.query(&item.selector)?;
            Ok(PreparedItem::Pending(PendingJudgment {
                item,
                prompt: build_prompt(item, target, &matches, Evidence::Text, settings),
                source: ResultSource::Ai,
            }))
        }
        EvaluationMethod::Hybrid => {
            let matches = document.query(&item.selector)?;
            Ok(PreparedItem::Pending(PendingJudgment {
                item,
                prompt: build_prompt(item, target, &matches, Evidence::Markup, settings),
                source: ResultSource::Hybrid,
            }))
        }
        EvaluationMethod::Unsupported(code) => Ok(PreparedItem::Graded(unsupported(item, code))),
    }
}

pub(crate) fn unusable_selector(item: &RubricItem) -> GradedResult {
    GradedResult {
        id: item.id.clone(),
        label: item.label.clone(),
        score: 0,
        rank: Rank::from_item_score(0),
        comment: format!(
            "Rubric entry \"{}\" has an unset or invalid selector; the check was skipped.",
            item.label
        ),
        recommendation: "Fix the rubric row by giving this check a valid CSS selector."
            .to_string(),
        source: ResultSource::Machine,
    }
}

/// Binary presence check: any match earns the full score.
pub(crate) fn machine_count(item: &RubricItem, matched: usize) -> GradedResult {
    let score = if matched > 0 { MAX_ITEM_SCORE } else { 0 };
    let selector = item.selector.trim();
    let comment = if matched == 0 {
        format!("No elements match `{selector}`.")
    } else {
        format!("Found {matched} element(s) matching `{selector}`.")
    };

    GradedResult {
        id: item.id.clone(),
        label: item.label.clone(),
        score,
        rank: Rank::from_item_score(score),
        comment,
        recommendation: item.recommendation_for(score),
        source: ResultSource::Machine,
    }
}

pub(crate) fn judged_result(item: &RubricItem, reply: String, source: ResultSource) -> GradedResult {
    let grade = infer_grade(&reply);

    GradedResult {
        id: item.id.clone(),
        label: item.label.clone(),
        score: grade.score,
        rank: grade.rank,
        comment: reply,
        recommendation: item.recommendation_for(grade.score),
        source,
    }
}

pub(crate) fn unsupported(item: &RubricItem, code: &str) -> GradedResult {
    GradedResult {
        id: item.id.clone(),
        label: item.label.clone(),
        score: 0,
        rank: Rank::Unrated,
        comment: format!("Evaluation method `{code}` is not supported; the check was not evaluated."),
        recommendation: "Use method 0 (machine count), 1 (AI judged) or 2 (hybrid) for this rubric row."
            .to_string(),
        source: ResultSource::Unknown,
    }
}

pub(crate) fn error_result(item: &RubricItem, error: &EvaluationError) -> GradedResult {
    GradedResult {
        id: item.id.clone(),
        label: item.label.clone(),
        score: 0,
        rank: Rank::lowest(),
        comment: format!("Evaluation failed: {error}"),
        recommendation: format!(
            "Review the selector `{}` and the page content for \"{}\".",
            item.selector.trim(),
            item.label
        ),
        source: ResultSource::Error,
    }
}

#[derive(Debug, Clone, Copy)]
enum Evidence {
    Text,
    Markup,
}

fn build_prompt(
    item: &RubricItem,
    target: &str,
    matches: &ElementSet,
    evidence: Evidence,
    settings: &EvaluationSettings,
) -> String {
    let selector = item.selector.trim();
    let instructions = render_template(item, target);
    let (heading, content) = match evidence {
        Evidence::Text => ("Matched text", matches.text()),
        Evidence::Markup => ("Matched markup", matches.html()),
    };
    let content = if content.trim().is_empty() {
        format!("(nothing on the page matches `{selector}`)")
    } else {
        truncate_chars(&content, settings.evidence_char_limit)
    };

    format!(
        "{instructions}\n\n\
         Page: {target}\n\
         Check: {label}\n\
         {heading} for `{selector}` ({count} element(s)):\n\
         {content}\n\n\
         Reply with `Score: N` (0-5) on the first line, then a short explanation.",
        label = item.label,
        count = matches.len(),
    )
}

fn render_template(item: &RubricItem, target: &str) -> String {
    let template = item.prompt_template.trim();
    if template.is_empty() {
        return format!("Assess \"{}\" for AI search readiness.", item.label);
    }

    template
        .replace("{url}", target)
        .replace("{label}", &item.label)
}

pub(crate) fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
