//! Stage sequencing.
//!
//! Three stages — search, filter, download — each idempotent and
//! independently invokable. A stage reads its input from the persisted
//! tables only, never from another stage's in-memory state, so any stage can
//! be rerun against files produced by an earlier process. Full-run mode
//! executes all three in order.

use crate::config::Settings;
use crate::download::{DownloadOutcome, PdfDownloader};
use crate::error::Result;
use crate::filter::PaperFilter;
use crate::provider::SearchProvider;
use crate::search::PaperSearcher;
use crate::store;
use tracing::info;

/// One independently invokable unit of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Search,
    Filter,
    Download,
}

/// Row/file counts per stage output, for the status display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageCounts {
    pub all_results: usize,
    pub filtered_results: usize,
    pub downloaded_pdfs: usize,
}

/// Owns the stage components and the provider for one configured run.
pub struct SearchPipeline {
    settings: Settings,
    provider: Box<dyn SearchProvider>,
    downloader: PdfDownloader,
}

impl SearchPipeline {
    pub fn new(settings: Settings, provider: Box<dyn SearchProvider>) -> Result<Self> {
        let downloader = PdfDownloader::new(settings.download.pdf_folder.clone())?;
        Ok(Self {
            settings,
            provider,
            downloader,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run search, filter, and download in sequence.
    pub async fn run_full(&self, term: &str) -> Result<()> {
        println!("Searching for papers...");
        self.run_search(term).await?;

        println!("Filtering papers...");
        self.run_filter()?;

        println!("Downloading PDFs...");
        self.run_download().await?;
        Ok(())
    }

    /// Run a single stage. Search requires the term it should query for.
    pub async fn run_stage(&self, stage: Stage, term: Option<&str>) -> Result<()> {
        match stage {
            Stage::Search => {
                let term = term.ok_or_else(|| {
                    crate::error::PaperpipeError::Config(
                        "Search stage requires a search term".to_string(),
                    )
                })?;
                self.run_search(term).await?;
            }
            Stage::Filter => {
                self.run_filter()?;
            }
            Stage::Download => {
                self.run_download().await?;
            }
        }
        Ok(())
    }

    /// Search stage: query the provider and log every visited record.
    pub async fn run_search(&self, term: &str) -> Result<()> {
        let searcher = PaperSearcher::new(&self.settings, &*self.provider, &self.downloader);
        let visited = searcher.search(term).await?;
        info!(visited = visited.len(), term, "Search stage complete");
        Ok(())
    }

    /// Filter stage: reload the full result table and persist the survivors.
    pub fn run_filter(&self) -> Result<()> {
        let records = store::load(&self.settings.output.all_results_file)?;
        let filter = PaperFilter::new(&self.settings);
        let kept = filter.filter(&records)?;
        println!("Filtered {} of {} papers.", kept.len(), records.len());
        Ok(())
    }

    /// Download stage: reload the filtered table and fetch each PDF.
    pub async fn run_download(&self) -> Result<DownloadOutcome> {
        let records = store::load(&self.settings.output.filtered_results_file)?;
        self.downloader.download(&records).await
    }

    /// Count rows in each stage's output and PDFs on disk. Absent files and
    /// folders count as zero.
    pub fn status(&self) -> Result<StageCounts> {
        let all_results = store::row_count(&self.settings.output.all_results_file)?;
        let filtered_results = store::row_count(&self.settings.output.filtered_results_file)?;

        let pdf_folder = &self.settings.download.pdf_folder;
        let downloaded_pdfs = if pdf_folder.is_dir() {
            std::fs::read_dir(pdf_folder)?
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "pdf"))
                .count()
        } else {
            0
        };

        Ok(StageCounts {
            all_results,
            filtered_results,
            downloaded_pdfs,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::{
        DownloadSettings, FilterSettings, GeneralSettings, KeywordSettings, OutputSettings,
        SearchSettings,
    };
    use crate::error::PaperpipeError;
    use crate::provider::{ProviderPage, RawHit};
    use async_trait::async_trait;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct FakeProvider {
        hits: Vec<RawHit>,
    }

    #[async_trait]
    impl SearchProvider for FakeProvider {
        fn name(&self) -> &str {
            "Fake Scholar"
        }

        async fn fetch_page(&self, _query: &str, token: Option<&str>) -> Result<ProviderPage> {
            let hits = if token.is_none() {
                self.hits.clone()
            } else {
                Vec::new()
            };
            Ok(ProviderPage { hits, next: None })
        }
    }

    fn settings(dir: &TempDir) -> Settings {
        Settings {
            general: GeneralSettings::default(),
            search: SearchSettings {
                output: dir.path().join("all_results.csv"),
                max_results: 20,
                delay: 0,
                force_refresh: false,
            },
            output: OutputSettings {
                all_results_file: dir.path().join("all_results.csv"),
                filtered_results_file: dir.path().join("filtered_results.csv"),
            },
            download: DownloadSettings {
                pdf_folder: dir.path().join("pdfs"),
            },
            filter: FilterSettings {
                keywords: KeywordSettings {
                    title: vec!["rough set".to_string()],
                    abstract_: Vec::new(),
                },
            },
        }
    }

    fn hit(title: &str, url: Option<String>) -> RawHit {
        RawHit {
            title: Some(title.to_string()),
            snippet: Some("An abstract.".to_string()),
            url,
            ..RawHit::default()
        }
    }

    #[tokio::test]
    async fn test_full_run_end_to_end() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rough.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(b"pdf".to_vec(), "application/pdf"))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let cfg = settings(&dir);
        let provider = FakeProvider {
            hits: vec![
                hit("Rough Set Survey", Some(format!("{}/rough.pdf", server.uri()))),
                hit("Bee Flight Dynamics", None),
            ],
        };

        let pipeline = SearchPipeline::new(cfg.clone(), Box::new(provider)).unwrap();
        pipeline.run_full("rough sets").await.unwrap();

        let counts = pipeline.status().unwrap();
        assert_eq!(
            counts,
            StageCounts {
                all_results: 2,
                filtered_results: 1,
                downloaded_pdfs: 1
            }
        );
        assert!(cfg.download.pdf_folder.join("Rough_Set_Survey.pdf").exists());
    }

    #[tokio::test]
    async fn test_stages_run_independently_from_tables() {
        let dir = TempDir::new().unwrap();
        let cfg = settings(&dir);

        // Seed the all-results table directly; no search stage involved.
        let record = crate::paper::PaperRecord {
            title: "Rough Set Basics".to_string(),
            abstract_text: "An abstract.".to_string(),
            paper_id: crate::paper::paper_id("Rough Set Basics"),
            ..crate::paper::PaperRecord::default()
        };
        store::save(&[record], &cfg.output.all_results_file).unwrap();

        let pipeline =
            SearchPipeline::new(cfg.clone(), Box::new(FakeProvider { hits: Vec::new() })).unwrap();

        pipeline.run_stage(Stage::Filter, None).await.unwrap();
        assert_eq!(store::row_count(&cfg.output.filtered_results_file).unwrap(), 1);

        // Download stage reads the filtered table; the record has no URL.
        let outcome = pipeline.run_download().await.unwrap();
        assert_eq!(outcome.attempted, 1);
        assert_eq!(outcome.failed, 1);
    }

    #[tokio::test]
    async fn test_filter_stage_without_input_table() {
        let dir = TempDir::new().unwrap();
        let pipeline =
            SearchPipeline::new(settings(&dir), Box::new(FakeProvider { hits: Vec::new() }))
                .unwrap();

        let err = pipeline.run_filter().unwrap_err();
        assert!(matches!(err, PaperpipeError::TableNotFound(_)));
    }

    #[tokio::test]
    async fn test_search_stage_requires_term() {
        let dir = TempDir::new().unwrap();
        let pipeline =
            SearchPipeline::new(settings(&dir), Box::new(FakeProvider { hits: Vec::new() }))
                .unwrap();

        let err = pipeline.run_stage(Stage::Search, None).await.unwrap_err();
        assert!(matches!(err, PaperpipeError::Config(_)));
    }

    #[tokio::test]
    async fn test_status_all_zero_on_fresh_config() {
        let dir = TempDir::new().unwrap();
        let pipeline =
            SearchPipeline::new(settings(&dir), Box::new(FakeProvider { hits: Vec::new() }))
                .unwrap();
        assert_eq!(pipeline.status().unwrap(), StageCounts::default());
    }
}
