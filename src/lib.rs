//! # sheetdiff
//!
//! A rule-driven comparison engine for two tabular datasets. Records from an
//! old (A) and new (B) dataset are paired by a unique key, compared field by
//! field, and annotated with labels and colors chosen by a reusable template.

pub mod change_detection;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod executor;
pub mod loader;
pub mod matcher;
pub mod output;
pub mod progress;
pub mod record;
pub mod schema;
pub mod validation;
pub mod workspace;

pub use config::EngineConfig;
pub use error::{Result, SheetdiffError};
pub use executor::{execute, DiffResult, DiffRow, DiffSummary, RuleExecutor};
pub use record::{Record, Value};
pub use schema::{ComparisonTemplate, Rule, RuleKind};
pub use validation::{validate_rule, validate_template, ValidationReport};
pub use workspace::SheetdiffWorkspace;

/// Current format version for sheetdiff files
pub const FORMAT_VERSION: &str = "1.0.0";

/// Largest record set either side may have when fuzzy matching
pub const DEFAULT_FUZZY_ROW_LIMIT: usize = 2000;

/// Similarity a fuzzy candidate must exceed
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.8;

/// Rows shown by `compare --preview` without an explicit count
pub const DEFAULT_PREVIEW_ROWS: usize = 50;
