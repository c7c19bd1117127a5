//! Error types for the replog_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for replog_core operations
///
/// Data-quality problems never surface here; they are collected as
/// `IssueRecord`s on the pipeline output instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Canonical schema validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Registry data error
    #[error("Registry error: {0}")]
    Registry(String),

    /// External text parser error
    #[error("LLM parser error: {0}")]
    Llm(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
