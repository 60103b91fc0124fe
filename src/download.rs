//! PDF retrieval stage.
//!
//! Resolves paper records to PDF files on disk. Failures are isolated per
//! record: a bad URL or server error marks that record failed and moves on.
//! There are no retries.

use crate::error::Result;
use crate::paper::{PaperRecord, NA};
use crate::provider::USER_AGENT;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

/// Bounded timeout for a single PDF fetch.
const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Per-run download accounting, printed at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadOutcome {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Downloads PDFs into a configured folder, one file per `paper_id`.
///
/// Two records with the same `paper_id` write the same file; the later
/// download wins.
pub struct PdfDownloader {
    client: reqwest::Client,
    pdf_folder: PathBuf,
}

impl PdfDownloader {
    /// Create a downloader writing into `pdf_folder`, creating the folder
    /// if it does not exist yet.
    pub fn new(pdf_folder: PathBuf) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| {
                crate::error::PaperpipeError::Config(format!("Failed to build HTTP client: {}", e))
            })?;

        std::fs::create_dir_all(&pdf_folder)?;
        Ok(Self { client, pdf_folder })
    }

    /// Download every record's PDF in input order.
    ///
    /// Records with the `"N/A"` URL sentinel are counted failed without a
    /// network attempt. Prints per-item progress and a summary block.
    pub async fn download(&self, records: &[PaperRecord]) -> Result<DownloadOutcome> {
        std::fs::create_dir_all(&self.pdf_folder)?;

        let total = records.len();
        let mut succeeded = 0;
        let mut failed = 0;

        for (index, record) in records.iter().enumerate() {
            let position = index + 1;
            if record.url == NA || record.url.is_empty() {
                println!(
                    "[{}/{}] Skipping {}: No URL provided.",
                    position, total, record.title
                );
                failed += 1;
                continue;
            }

            if self.fetch_one(&record.url, &record.paper_id).await {
                succeeded += 1;
                println!(
                    "[{}/{}] Successfully downloaded: {}",
                    position, total, record.title
                );
            } else {
                failed += 1;
                println!("[{}/{}] Failed to download: {}", position, total, record.title);
            }
        }

        println!("\n--- Download Summary ---");
        println!("Total papers: {}", total);
        println!("Successfully downloaded: {}", succeeded);
        println!("Failed downloads: {}", failed);
        println!("------------------------");

        Ok(DownloadOutcome {
            attempted: total,
            succeeded,
            failed,
        })
    }

    /// Fetch one PDF to `<pdf_folder>/<paper_id>.pdf`.
    ///
    /// Returns whether the download succeeded; the failure reason is logged,
    /// not propagated.
    pub async fn fetch_one(&self, url: &str, paper_id: &str) -> bool {
        match self.try_fetch(url, paper_id).await {
            Ok(()) => true,
            Err(e) => {
                warn!(paper_id, error = %e, "PDF download failed");
                false
            }
        }
    }

    async fn try_fetch(&self, url: &str, paper_id: &str) -> Result<()> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        let body = response.bytes().await?;

        let file_path = self.pdf_folder.join(format!("{}.pdf", paper_id));
        std::fs::write(&file_path, &body)?;
        debug!(paper_id, bytes = body.len(), path = ?file_path, "PDF written");
        Ok(())
    }
}
