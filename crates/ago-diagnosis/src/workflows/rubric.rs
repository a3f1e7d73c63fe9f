//! Rubric loading from CSV.
//!
//! The rubric is static configuration: it is read once (at startup or per CLI run),
//! validated, and shared read-only behind an `Arc` afterwards.

use crate::workflows::diagnosis::{EvaluationMethod, ItemId, RubricItem};
use serde::Deserialize;
use std::collections::HashSet;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const BUNDLED_RUBRIC: &str = include_str!("../../rubric/default.csv");

#[derive(Debug, thiserror::Error)]
pub enum RubricError {
    #[error("failed to read rubric {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid rubric CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("rubric row {row} has no item code")]
    MissingId { row: usize },
    #[error("rubric item code `{0}` appears more than once")]
    DuplicateId(String),
}

/// Ordered, validated list of rubric items.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rubric {
    items: Vec<RubricItem>,
}

impl Rubric {
    pub fn new(items: Vec<RubricItem>) -> Result<Self, RubricError> {
        let mut seen = HashSet::new();
        for item in &items {
            if !seen.insert(item.id.clone()) {
                return Err(RubricError::DuplicateId(item.id.0.clone()));
            }
        }
        Ok(Self { items })
    }

    pub fn items(&self) -> &[RubricItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&RubricItem> {
        self.items.iter().find(|item| item.id.as_str() == id)
    }

    pub fn judgment_items(&self) -> usize {
        self.items
            .iter()
            .filter(|item| item.method.needs_judgment())
            .count()
    }
}

/// Anything that can produce a rubric.
pub trait RubricSource {
    fn load(&self) -> Result<Rubric, RubricError>;

    /// Loads once and wraps the result for read-only sharing across requests.
    fn load_shared(&self) -> Result<Arc<Rubric>, RubricError> {
        self.load().map(Arc::new)
    }
}

#[derive(Debug, Deserialize)]
struct RubricRow {
    #[serde(rename = "item_code", default)]
    id: String,
    #[serde(rename = "item_label", default)]
    label: String,
    #[serde(default)]
    selector: String,
    #[serde(default)]
    method: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    prompt: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    recommendation: Option<String>,
}

impl RubricRow {
    fn into_item(self, row: usize) -> Result<RubricItem, RubricError> {
        let id = self.id.trim();
        if id.is_empty() {
            return Err(RubricError::MissingId { row });
        }

        let label = if self.label.trim().is_empty() {
            id.to_string()
        } else {
            self.label.trim().to_string()
        };

        Ok(RubricItem {
            id: ItemId(id.to_string()),
            label,
            selector: self.selector,
            method: EvaluationMethod::from_code(&self.method),
            prompt_template: self.prompt.unwrap_or_default(),
            recommendation_template: self.recommendation,
        })
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

/// CSV rubric with a header row naming `item_code`, `item_label`, `selector`, `method`,
/// `prompt` and `recommendation`.
pub struct CsvRubricSource {
    path: PathBuf,
}

impl CsvRubricSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Rubric, RubricError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| RubricError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Rubric, RubricError> {
        // Selectors are not trimmed here so that whitespace-only cells reach the evaluator's gate.
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .flexible(true)
            .from_reader(reader);

        let mut items = Vec::new();
        for (index, row) in csv_reader.deserialize::<RubricRow>().enumerate() {
            let row = row?;
            // Row 1 is the header.
            items.push(row.into_item(index + 2)?);
        }

        Rubric::new(items)
    }
}

impl RubricSource for CsvRubricSource {
    fn load(&self) -> Result<Rubric, RubricError> {
        Self::from_path(&self.path)
    }
}

/// Rubric shipped with the crate.
pub struct BundledRubric;

impl RubricSource for BundledRubric {
    fn load(&self) -> Result<Rubric, RubricError> {
        CsvRubricSource::from_reader(BUNDLED_RUBRIC.as_bytes())
    }
}

/// Configured rubric file, or the bundled rubric when no path is set.
pub fn load_configured(path: Option<&Path>) -> Result<Arc<Rubric>, RubricError> {
    match path {
        Some(path) => CsvRubricSource::new(path).load_shared(),
        None => BundledRubric.load_shared(),
    }
}
