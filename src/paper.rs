//! Paper record model.
//!
//! One [`PaperRecord`] per discovered paper. Field values are plain strings
//! with the sentinel `"N/A"` for anything the source did not provide, which
//! keeps the CSV table schema stable across rows.

use crate::provider::RawHit;
use serde::{Deserialize, Serialize};

/// Sentinel for fields the search source did not provide.
pub const NA: &str = "N/A";

/// A single logged paper, one row of a result table.
///
/// Column names and order match the on-disk CSV header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperRecord {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Authors")]
    pub authors: String,
    #[serde(rename = "Abstract")]
    pub abstract_text: String,
    #[serde(rename = "Publication Year")]
    pub publication_year: String,
    #[serde(rename = "Venue")]
    pub venue: String,
    #[serde(rename = "Citations")]
    pub citations: String,
    #[serde(rename = "URL")]
    pub url: String,
    pub paper_id: String,
    #[serde(rename = "Keywords Matched", with = "keyword_list")]
    pub keywords_matched: Vec<String>,
    #[serde(rename = "Download Failed")]
    pub download_failed: bool,
}

impl PaperRecord {
    /// Normalize a raw search hit into a record.
    ///
    /// Missing fields become [`NA`]; a hit without a venue is attributed to
    /// the search source itself. `keywords_matched` starts empty and
    /// `download_failed` false, both filled in by the search stage.
    pub fn from_hit(hit: RawHit, source_name: &str) -> Self {
        let title = hit.title.unwrap_or_else(|| NA.to_string());
        let paper_id = paper_id(&title);
        Self {
            title,
            authors: hit.authors.unwrap_or_else(|| NA.to_string()),
            abstract_text: hit.snippet.unwrap_or_else(|| NA.to_string()),
            publication_year: hit.year.unwrap_or_else(|| NA.to_string()),
            venue: hit.venue.unwrap_or_else(|| source_name.to_string()),
            citations: hit.citations.unwrap_or_else(|| NA.to_string()),
            url: hit.url.unwrap_or_else(|| NA.to_string()),
            paper_id,
            keywords_matched: Vec::new(),
            download_failed: false,
        }
    }
}

/// Derive a filesystem-safe slug from a paper title.
///
/// Keeps alphanumerics, spaces, hyphens and underscores, trims, then replaces
/// internal spaces with `_`. Deterministic and idempotent, so identical
/// titles always collapse to the same id.
pub fn paper_id(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '-' || *c == '_')
        .collect::<String>()
        .trim()
        .replace(' ', "_")
}

/// Return the keywords contained in `text`, case-insensitively, preserving
/// the configured keyword order.
pub fn matching_keywords(text: &str, keywords: &[String]) -> Vec<String> {
    let haystack = text.to_lowercase();
    keywords
        .iter()
        .filter(|kw| haystack.contains(&kw.to_lowercase()))
        .cloned()
        .collect()
}

/// Serde adapter storing the matched-keyword set as a `", "`-joined string,
/// so it stays a single CSV column.
mod keyword_list {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &[String], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.join(", "))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(raw
            .split(", ")
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect())
    }
}
