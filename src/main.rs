//! paperpipe - Academic paper search-filter-download pipeline
//!
//! Searches a scholarly source for papers matching a term, logs every
//! candidate to a CSV table, filters by keyword relevance, and downloads
//! matching PDFs.
//!
//! ## Usage
//!
//! ```bash
//! paperpipe run "rough set theory"      # full pipeline
//! paperpipe search "rough set theory"   # single stage
//! paperpipe                             # interactive menu
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use paperpipe::config::Settings;
use paperpipe::pipeline::{SearchPipeline, Stage, StageCounts};
use paperpipe::provider::ScholarProvider;
use paperpipe::search::keyword_stats;
use std::io::Write;
use std::path::PathBuf;
use tracing::{error, Level};
use tracing_subscriber::{fmt, EnvFilter};

/// Academic paper search-filter-download pipeline
#[derive(Parser)]
#[command(name = "paperpipe")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the config file
    #[arg(long, global = true, default_value = "./config/config.yaml")]
    config: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run search, filter, and download in sequence
    Run {
        /// Search term
        term: String,

        /// Search again even if the result table exists (appends)
        #[arg(long)]
        refresh: bool,
    },

    /// Search for new papers
    Search {
        /// Search term
        term: String,

        /// Search again even if the result table exists (appends)
        #[arg(long)]
        refresh: bool,
    },

    /// Filter the logged papers by keyword relevance
    Filter,

    /// Download PDFs for the filtered papers
    Download,

    /// Show keyword match statistics over the search results
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .init();

    let mut settings = Settings::load(&cli.config)
        .with_context(|| format!("Failed to load settings from {:?}", cli.config))?;

    if let Some(Commands::Run { refresh: true, .. }) | Some(Commands::Search { refresh: true, .. }) =
        &cli.command
    {
        settings.search.force_refresh = true;
    }

    let provider = ScholarProvider::new(settings.general.delay_seconds)
        .context("Failed to initialize search provider")?;
    let pipeline = SearchPipeline::new(settings, Box::new(provider))
        .context("Failed to initialize pipeline")?;

    match cli.command {
        Some(Commands::Run { term, .. }) => pipeline.run_full(&term).await?,
        Some(Commands::Search { term, .. }) => {
            pipeline.run_stage(Stage::Search, Some(&term)).await?
        }
        Some(Commands::Filter) => pipeline.run_stage(Stage::Filter, None).await?,
        Some(Commands::Download) => pipeline.run_stage(Stage::Download, None).await?,
        Some(Commands::Stats) => print_stats(&pipeline)?,
        None => run_menu(&pipeline).await?,
    }

    Ok(())
}

/// Interactive stage menu. Stage failures are reported and the menu
/// continues; only input/output errors on the prompt itself abort.
async fn run_menu(pipeline: &SearchPipeline) -> Result<()> {
    loop {
        display_status(pipeline);

        println!("What would you like to do next?");
        println!("1. Search for new papers");
        println!("2. Filter existing list of papers");
        println!("3. Download filtered papers");
        println!("4. Exit");

        let choice = prompt("Enter your choice (1/2/3/4): ")?;
        let result = match choice.as_str() {
            "1" => {
                let term = prompt("Enter search term: ")?;
                if term.is_empty() {
                    println!("Search term must not be empty.");
                    continue;
                }
                pipeline.run_stage(Stage::Search, Some(&term)).await
            }
            "2" => pipeline.run_stage(Stage::Filter, None).await,
            "3" => pipeline.run_stage(Stage::Download, None).await,
            "4" => break,
            _ => {
                println!("Invalid choice. Please enter 1, 2, 3, or 4.");
                continue;
            }
        };

        if let Err(e) = result {
            error!(error = %e, "Stage failed");
            println!("Stage failed: {}", e);
        }
    }

    Ok(())
}

/// Read one trimmed line from stdin.
fn prompt(message: &str) -> Result<String> {
    print!("{}", message);
    std::io::stdout().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

fn display_status(pipeline: &SearchPipeline) {
    let counts = pipeline.status().unwrap_or_else(|e| {
        error!(error = %e, "Failed to count stage outputs");
        StageCounts::default()
    });

    println!("\n--- Current Status ---");
    println!("1. Papers retrieved: {}", counts.all_results);
    println!("2. Papers filtered: {}", counts.filtered_results);
    println!("3. Papers downloaded: {}", counts.downloaded_pdfs);
    println!("----------------------\n");
}

fn print_stats(pipeline: &SearchPipeline) -> Result<()> {
    let table = &pipeline.settings().search.output;
    let stats = keyword_stats(table)
        .with_context(|| format!("Cannot tabulate statistics for {:?}", table))?;

    println!("\n--- Keyword Combination Statistics ---");
    println!(
        "{:<28} {:>16} {:>19} {:>13}",
        "Keyword", "Matches in Title", "Matches in Abstract", "Total Matches"
    );
    for stat in stats {
        println!(
            "{:<28} {:>16} {:>19} {:>13}",
            stat.keyword, stat.title_matches, stat.abstract_matches, stat.total
        );
    }

    Ok(())
}
