#![forbid(unsafe_code)]

//! Core domain model and business logic for the Replog system.
//!
//! This crate provides:
//! - The canonical workout log schema (sessions, exercises, sets, issues)
//! - Format parsers (CSV, JSON, deterministic text) and an LLM parser seam
//! - The exercise registry with exact-match name resolution and search
//! - The stateless ingest pipeline (normalize, validate, score, hash)
//! - The stateless metrics engine (tonnage, e1rm, PRs, volume flags)

pub mod types;
pub mod error;
pub mod registry;
pub mod resolve;
pub mod normalize;
pub mod hash;
pub mod config;
pub mod logging;
pub mod parse_csv;
pub mod parse_json;
pub mod parse_text;
pub mod llm;
pub mod ingest;
pub mod metrics;
pub mod search;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use hash::canonical_sha256;
pub use ingest::{ingest_log, IngestInput, IngestOptions, IngestOutput, PARSER_VERSION};
pub use llm::LlmParser;
pub use metrics::{compute_metrics, compute_metrics_with_limits, MetricsInput, MetricsOutput, METRICS_VERSION};
pub use registry::{default_registry, Registry};
pub use resolve::resolve_exercise;
pub use search::{search_exercises, SearchOutput, SearchQuery};
