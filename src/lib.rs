//! # paperpipe
//!
//! Academic paper search-filter-download pipeline.
//!
//! ## Modules
//!
//! - [`config`] - YAML settings loading
//! - [`paper`] - Paper record model and slug derivation
//! - [`store`] - Append-only CSV table persistence
//! - [`provider`] - Search providers (Google Scholar scraping)
//! - [`search`] - Search stage and keyword statistics
//! - [`filter`] - Relevance filter stage
//! - [`download`] - PDF download stage
//! - [`pipeline`] - Stage sequencing and status
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use paperpipe::config::Settings;
//! use paperpipe::pipeline::SearchPipeline;
//! use paperpipe::provider::ScholarProvider;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load(std::path::Path::new("./config/config.yaml"))?;
//!     let provider = ScholarProvider::new(settings.general.delay_seconds)?;
//!     let pipeline = SearchPipeline::new(settings, Box::new(provider))?;
//!     pipeline.run_full("rough set theory").await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod download;
pub mod error;
pub mod filter;
pub mod paper;
pub mod pipeline;
pub mod provider;
pub mod search;
pub mod store;

pub use error::{PaperpipeError, Result};
