//! Relevance filter stage.
//!
//! Keeps a record when any configured title keyword appears in its title or
//! any abstract keyword appears in its abstract, case-insensitively.
//! Survivors are appended to the filtered-results table.

use crate::config::Settings;
use crate::error::Result;
use crate::paper::{matching_keywords, PaperRecord};
use crate::store;
use std::path::PathBuf;
use tracing::info;

/// Keyword filter over batches of paper records.
pub struct PaperFilter {
    filtered_results_file: PathBuf,
    keywords_title: Vec<String>,
    keywords_abstract: Vec<String>,
}

impl PaperFilter {
    pub fn new(settings: &Settings) -> Self {
        Self {
            filtered_results_file: settings.output.filtered_results_file.clone(),
            keywords_title: settings.filter.keywords.title.clone(),
            keywords_abstract: settings.filter.keywords.abstract_.clone(),
        }
    }

    /// Return the subset of `records` matching any keyword, preserving input
    /// order, and append it to the filtered-results table.
    pub fn filter(&self, records: &[PaperRecord]) -> Result<Vec<PaperRecord>> {
        let kept: Vec<PaperRecord> = records
            .iter()
            .filter(|record| self.matches(record))
            .cloned()
            .collect();

        info!(kept = kept.len(), total = records.len(), "Filtered records");
        store::save(&kept, &self.filtered_results_file)?;
        Ok(kept)
    }

    fn matches(&self, record: &PaperRecord) -> bool {
        !matching_keywords(&record.title, &self.keywords_title).is_empty()
            || !matching_keywords(&record.abstract_text, &self.keywords_abstract).is_empty()
    }
}
