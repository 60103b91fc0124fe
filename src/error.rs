//! Custom error types for paperpipe.
//!
//! This module defines all error types used throughout the application.
//! All functions return `Result<T, PaperpipeError>` instead of using `unwrap()`.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for paperpipe operations.
///
/// Uses `thiserror` for ergonomic error handling and automatic `Display` implementation.
#[derive(Debug, Error)]
pub enum PaperpipeError {
    /// Network/HTTP request error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// HTML parsing error
    #[error("Parse error: {0}")]
    Parse(String),

    /// External source returned an error status
    #[error("API error: {code} - {message}")]
    Api {
        /// HTTP status code
        code: i32,
        /// Error message
        message: String,
    },

    /// CAPTCHA interstitial detected
    #[error("CAPTCHA detected, slow down or change network")]
    Captcha,

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV table error (unwritable path or rows not matching the record schema)
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Result table expected on disk but absent
    #[error("Result table not found: {0:?}")]
    TableNotFound(PathBuf),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// Settings file deserialization error
    #[error("Settings error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias using `PaperpipeError`
pub type Result<T> = std::result::Result<T, PaperpipeError>;
