//! Settings file loading.
//!
//! All runtime options live in a single YAML file (default
//! `./config/config.yaml`), deserialized once at process start into an
//! immutable [`Settings`] value that is passed to every component by
//! construction. There is no module-level configuration state.

use crate::error::{PaperpipeError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Root settings object, one per process.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub general: GeneralSettings,
    pub search: SearchSettings,
    pub output: OutputSettings,
    pub download: DownloadSettings,
    pub filter: FilterSettings,
}

/// Cross-stage knobs.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneralSettings {
    /// Seconds to let a freshly issued query settle before parsing results.
    #[serde(default = "default_delay_seconds")]
    pub delay_seconds: u64,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            delay_seconds: default_delay_seconds(),
        }
    }
}

/// Search stage options.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchSettings {
    /// Table the search stage appends every visited record to.
    pub output: PathBuf,
    /// Stop once this many matched records have downloaded successfully.
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    /// Seconds between result pages.
    #[serde(default = "default_page_delay")]
    pub delay: u64,
    /// Search again even if the output table already exists (appends).
    #[serde(default)]
    pub force_refresh: bool,
}

/// Stage output tables.
#[derive(Debug, Clone, Deserialize)]
pub struct OutputSettings {
    pub all_results_file: PathBuf,
    pub filtered_results_file: PathBuf,
}

/// Download stage options.
#[derive(Debug, Clone, Deserialize)]
pub struct DownloadSettings {
    /// Folder PDFs are written to, created on demand.
    pub pdf_folder: PathBuf,
}

/// Keyword lists for relevance matching.
#[derive(Debug, Clone, Deserialize)]
pub struct FilterSettings {
    pub keywords: KeywordSettings,
}

/// Lower-case substrings tested against the respective record field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeywordSettings {
    #[serde(default)]
    pub title: Vec<String>,
    #[serde(default, rename = "abstract")]
    pub abstract_: Vec<String>,
}

const fn default_delay_seconds() -> u64 {
    2
}

const fn default_max_results() -> usize {
    20
}

const fn default_page_delay() -> u64 {
    5
}

impl Settings {
    /// Load settings from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`PaperpipeError::Config`] if the file cannot be read and
    /// [`PaperpipeError::Yaml`] if it does not deserialize.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PaperpipeError::Config(format!("Cannot read settings file {:?}: {}", path, e))
        })?;
        let settings: Settings = serde_yaml::from_str(&content)?;
        Ok(settings)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
general:
  delay_seconds: 1
search:
  output: ./out/all_results.csv
  max_results: 5
  delay: 3
output:
  all_results_file: ./out/all_results.csv
  filtered_results_file: ./out/filtered_results.csv
download:
  pdf_folder: ./out/filtered_papers
filter:
  keywords:
    title:
      - rough set
    abstract:
      - granular computing
"#;

    #[test]
    fn test_load_sample() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let settings = Settings::load(file.path()).unwrap();
        assert_eq!(settings.search.max_results, 5);
        assert_eq!(settings.search.delay, 3);
        assert!(!settings.search.force_refresh);
        assert_eq!(settings.general.delay_seconds, 1);
        assert_eq!(settings.filter.keywords.title, vec!["rough set"]);
        assert_eq!(settings.filter.keywords.abstract_, vec!["granular computing"]);
    }

    #[test]
    fn test_defaults_applied() {
        let minimal = r#"
search:
  output: all.csv
output:
  all_results_file: all.csv
  filtered_results_file: filtered.csv
download:
  pdf_folder: pdfs
filter:
  keywords: {}
"#;
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(minimal.as_bytes()).unwrap();

        let settings = Settings::load(file.path()).unwrap();
        assert_eq!(settings.search.max_results, 20);
        assert_eq!(settings.search.delay, 5);
        assert_eq!(settings.general.delay_seconds, 2);
        assert!(settings.filter.keywords.title.is_empty());
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = Settings::load(Path::new("/nonexistent/config.yaml")).unwrap_err();
        assert!(matches!(err, PaperpipeError::Config(_)));
    }
}
