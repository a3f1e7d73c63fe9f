use crate::infra::build_diagnosis_service;
use ago_diagnosis::config::AppConfig;
use ago_diagnosis::error::AppError;
use ago_diagnosis::workflows::diagnosis::{DiagnosisReport, GradedResult};
use ago_diagnosis::workflows::rubric::load_configured;
use clap::Args;
use std::fmt;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct DiagnoseArgs {
    /// Page to diagnose (http or https)
    #[arg(long)]
    pub(crate) url: String,
    /// Rubric CSV to load instead of the configured one
    #[arg(long)]
    pub(crate) rubric: Option<PathBuf>,
    /// Print the report as JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct RubricArgs {
    /// Rubric CSV to load instead of the configured one
    #[arg(long)]
    pub(crate) rubric: Option<PathBuf>,
}

pub(crate) async fn run_diagnose(args: DiagnoseArgs) -> Result<(), AppError> {
    let DiagnoseArgs { url, rubric, json } = args;

    let mut config = AppConfig::load()?;
    if let Some(path) = rubric {
        config.rubric.path = Some(path);
    }
    let service = build_diagnosis_service(&config)?;

    match service.diagnose(&url).await {
        Ok(report) => print_report(&report, json),
        Err(err) => {
            if let Some(report) = err.report() {
                print_report(report, json)?;
            }
            Err(err.into())
        }
    }
}

pub(crate) fn run_rubric_listing(args: RubricArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let path = args.rubric.or(config.rubric.path);
    let rubric = load_configured(path.as_deref())?;

    match &path {
        Some(path) => println!("Rubric: {}", path.display()),
        None => println!("Rubric: bundled default"),
    }
    println!(
        "{} item(s), {} requiring judgment",
        rubric.len(),
        rubric.judgment_items()
    );
    for item in rubric.items() {
        let selector = item.selector.trim();
        println!(
            "  {:<20} {:<14} {}",
            item.id.as_str(),
            item.method.label(),
            if selector.is_empty() { "(no selector)" } else { selector }
        );
        println!("      {}", item.label);
    }
    Ok(())
}

fn print_report(report: &DiagnosisReport, json: bool) -> Result<(), AppError> {
    if json {
        let rendered = serde_json::to_string_pretty(report)
            .map_err(|err| AppError::Io(std::io::Error::from(err)))?;
        println!("{rendered}");
    } else {
        print!("{}", TextReport(report));
    }
    Ok(())
}

/// Plain-text rendering of a report for the terminal.
pub(crate) struct TextReport<'a>(pub(crate) &'a DiagnosisReport);

impl fmt::Display for TextReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        let max_score = report.evaluated_items * 5;

        writeln!(f, "AI search optimization diagnosis")?;
        writeln!(f, "Target: {}", report.target)?;
        writeln!(
            f,
            "Diagnosed at: {}",
            report.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        )?;
        writeln!(
            f,
            "Score: {}/{} ({}%), rank {}",
            report.total_score, max_score, report.percentage, report.rank
        )?;
        writeln!(f, "{}", report.summary)?;
        writeln!(f, "Next steps: {}", report.recommendation)?;

        writeln!(f, "\nItems")?;
        for result in &report.results {
            write_item(f, result)?;
        }
        Ok(())
    }
}

fn write_item(f: &mut fmt::Formatter<'_>, result: &GradedResult) -> fmt::Result {
    writeln!(
        f,
        "  [{}] {} ({}/5, {})",
        result.rank,
        result.label,
        result.score,
        result.source.label()
    )?;
    for line in result.comment.lines().filter(|line| !line.trim().is_empty()) {
        writeln!(f, "      {}", line.trim())?;
    }
    if !result.recommendation.is_empty() {
        writeln!(f, "      -> {}", result.recommendation)?;
    }
    Ok(())
}
