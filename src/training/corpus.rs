// Training corpus loading and cleaning.
//
// The corpus is a CSV file with at least `text` and `label` columns. Extra
// columns are ignored. Empty cells count as missing.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::error::ModerationError;

/// A raw corpus row before validation. Either field may be missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusRow {
    pub text: Option<String>,
    pub label: Option<String>,
}

impl CorpusRow {
    pub fn new(text: &str, label: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            label: Some(label.to_string()),
        }
    }
}

/// A validated example.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledText {
    pub text: String,
    pub is_toxic: bool,
}

/// Read a corpus file from disk.
pub fn read_corpus(path: &Path) -> Result<Vec<CorpusRow>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open training corpus {}", path.display()))?;
    read_corpus_from(file).with_context(|| format!("Failed to read {}", path.display()))
}

/// Read corpus rows from any CSV source.
pub fn read_corpus_from<R: Read>(reader: R) -> Result<Vec<CorpusRow>> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

    let headers = rdr.headers()?.clone();
    let column = |name: &str| headers.iter().position(|h| h.trim() == name);
    let (Some(text_idx), Some(label_idx)) = (column("text"), column("label")) else {
        return Err(ModerationError::InvalidTrainingData(
            "dataset must contain 'text' and 'label' columns".to_string(),
        )
        .into());
    };

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let cell = |idx: usize| {
            record
                .get(idx)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        rows.push(CorpusRow {
            text: cell(text_idx),
            label: cell(label_idx),
        });
    }

    Ok(rows)
}

/// Interpret a binary toxicity label.
///
/// Accepts 0/1, 0.0/1.0 and true/false in any case.
pub fn parse_label(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "1.0" | "true" => Some(true),
        "0" | "0.0" | "false" => Some(false),
        _ => None,
    }
}

/// Drop rows without text or label and parse the labels.
///
/// Fails with `EmptyTrainingSet` when nothing survives and with
/// `InvalidTrainingData` on a label that is not binary.
pub fn clean_rows(rows: Vec<CorpusRow>) -> Result<Vec<LabeledText>> {
    let total = rows.len();
    let mut cleaned = Vec::with_capacity(total);

    for row in rows {
        let (Some(text), Some(label)) = (row.text, row.label) else {
            continue;
        };
        let Some(is_toxic) = parse_label(&label) else {
            return Err(ModerationError::InvalidTrainingData(format!(
                "label {label:?} is not a binary toxicity indicator"
            ))
            .into());
        };
        cleaned.push(LabeledText { text, is_toxic });
    }

    let dropped = total - cleaned.len();
    if dropped > 0 {
        info!(dropped, kept = cleaned.len(), "Dropped corpus rows missing text or label");
    }

    if cleaned.is_empty() {
        return Err(ModerationError::EmptyTrainingSet.into());
    }
    Ok(cleaned)
}
