//! Search stage.
//!
//! Pages through a [`SearchProvider`], normalizes every hit into a
//! [`PaperRecord`], tests it against the configured keyword lists, downloads
//! the PDF for matches right away, and appends each visited record to the
//! result table as soon as it is processed. A crash therefore loses at most
//! the record in flight.

use crate::config::Settings;
use crate::download::PdfDownloader;
use crate::error::{PaperpipeError, Result};
use crate::paper::{matching_keywords, PaperRecord, NA};
use crate::provider::{PageToken, SearchProvider};
use crate::store;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Per-keyword match counts over a persisted result table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordStat {
    pub keyword: String,
    pub title_matches: usize,
    pub abstract_matches: usize,
    pub total: usize,
}

/// Drives one search run against a provider.
pub struct PaperSearcher<'a> {
    provider: &'a dyn SearchProvider,
    downloader: &'a PdfDownloader,
    results_file: PathBuf,
    keywords_title: Vec<String>,
    keywords_abstract: Vec<String>,
    max_results: usize,
    page_delay: Duration,
    force_refresh: bool,
}

impl<'a> PaperSearcher<'a> {
    pub fn new(
        settings: &Settings,
        provider: &'a dyn SearchProvider,
        downloader: &'a PdfDownloader,
    ) -> Self {
        Self {
            provider,
            downloader,
            results_file: settings.search.output.clone(),
            keywords_title: settings.filter.keywords.title.clone(),
            keywords_abstract: settings.filter.keywords.abstract_.clone(),
            max_results: settings.search.max_results,
            page_delay: Duration::from_secs(settings.search.delay),
            force_refresh: settings.search.force_refresh,
        }
    }

    /// Search, match, and download papers for `term`.
    ///
    /// If the result table already exists the whole run is skipped and an
    /// empty list returned, making reruns idempotent; `force_refresh`
    /// searches anyway and appends. Every visited record is persisted,
    /// matched or not. Returns the records visited this run.
    pub async fn search(&self, term: &str) -> Result<Vec<PaperRecord>> {
        if term.trim().is_empty() {
            return Err(PaperpipeError::Config(
                "Search term must not be empty".to_string(),
            ));
        }

        if self.results_file.exists() && !self.force_refresh {
            println!(
                "Search results file {:?} already exists. Skipping search.",
                self.results_file
            );
            info!(table = ?self.results_file, "Search skipped, table present");
            return Ok(Vec::new());
        }

        let mut visited = Vec::new();
        let mut downloaded = 0usize;
        let mut token: Option<PageToken> = None;

        println!("\nSearching, filtering, and downloading papers...");

        'pages: loop {
            if downloaded >= self.max_results {
                break;
            }

            let page = match self.provider.fetch_page(term, token.as_deref()).await {
                Ok(page) => page,
                Err(e) => {
                    warn!(error = %e, "Page fetch failed, ending search");
                    break;
                }
            };

            if page.hits.is_empty() {
                println!("No results found on this page. Exiting.");
                break;
            }

            for hit in page.hits {
                if downloaded >= self.max_results {
                    break 'pages;
                }

                let mut record = PaperRecord::from_hit(hit, self.provider.name());
                if record.title == NA {
                    warn!("Skipping result without a title");
                    continue;
                }

                record.keywords_matched = self.matched_keywords(&record);

                if !record.keywords_matched.is_empty() {
                    let ok = self
                        .downloader
                        .fetch_one(&record.url, &record.paper_id)
                        .await;
                    record.download_failed = !ok;
                    if ok {
                        downloaded += 1;
                        println!("Downloaded: {}", record.title);
                    }
                }

                store::save(std::slice::from_ref(&record), &self.results_file)?;
                visited.push(record);
            }

            token = match page.next {
                Some(next) => Some(next),
                None => {
                    println!("No more pages to load. Ending search.");
                    break;
                }
            };

            tokio::time::sleep(self.page_delay).await;
        }

        println!("\nSearch, filter, and download process completed.");
        Ok(visited)
    }

    /// Title matches first, then abstract matches not already present.
    fn matched_keywords(&self, record: &PaperRecord) -> Vec<String> {
        let mut matched = matching_keywords(&record.title, &self.keywords_title);
        for kw in matching_keywords(&record.abstract_text, &self.keywords_abstract) {
            if !matched.contains(&kw) {
                matched.push(kw);
            }
        }
        matched
    }
}

/// Tabulate, per matched keyword, how many rows of a persisted result table
/// matched in the title, the abstract, and in total. Read-only.
pub fn keyword_stats(table: &Path) -> Result<Vec<KeywordStat>> {
    let rows = store::load(table)?;

    let mut stats: Vec<KeywordStat> = Vec::new();
    for row in &rows {
        let title = row.title.to_lowercase();
        let abstract_text = row.abstract_text.to_lowercase();

        for keyword in &row.keywords_matched {
            if keyword.is_empty() {
                continue;
            }
            let index = match stats.iter().position(|s| &s.keyword == keyword) {
                Some(index) => index,
                None => {
                    stats.push(KeywordStat {
                        keyword: keyword.clone(),
                        title_matches: 0,
                        abstract_matches: 0,
                        total: 0,
                    });
                    stats.len() - 1
                }
            };
            let entry = &mut stats[index];

            if title.contains(&keyword.to_lowercase()) {
                entry.title_matches += 1;
            }
            if abstract_text.contains(&keyword.to_lowercase()) {
                entry.abstract_matches += 1;
            }
            entry.total += 1;
        }
    }

    Ok(stats)
}
