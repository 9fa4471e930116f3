//! Command-line interface for sheetdiff

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sheetdiff")]
#[command(about = "A rule-driven comparison tool for tabular data")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Override workspace location
    #[arg(long, global = true)]
    pub workspace: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize sheetdiff workspace
    Init {
        /// Rewrite the configuration even if it exists
        #[arg(long)]
        force: bool,
    },

    /// Check a template file for structural errors
    Validate {
        /// Template JSON file
        template: PathBuf,

        /// Output format: "pretty", "json"
        #[arg(long, default_value = "pretty")]
        format: String,
    },

    /// Compare two datasets using a template
    Compare {
        /// Old dataset (.json or .csv)
        file_a: PathBuf,

        /// New dataset (.json or .csv)
        file_b: PathBuf,

        /// Template file path or saved template slug
        #[arg(long)]
        template: String,

        /// Override the sheet read from file A
        #[arg(long)]
        sheet_a: Option<String>,

        /// Override the sheet read from file B
        #[arg(long)]
        sheet_b: Option<String>,

        /// Custom output file for the diff result
        #[arg(long)]
        output: Option<PathBuf>,

        /// Show the first N rows without writing anything
        #[arg(long, num_args = 0..=1, value_parser = validate_row_count)]
        preview: Option<Option<usize>>,

        /// Output format: "pretty", "json"
        #[arg(long, default_value = "pretty")]
        format: String,
    },

    /// Manage saved templates
    Template {
        #[command(subcommand)]
        action: TemplateAction,
    },

    /// Show workspace information
    Info {
        /// Output format: "pretty", "json"
        #[arg(long, default_value = "pretty")]
        format: String,
    },
}

#[derive(Subcommand)]
pub enum TemplateAction {
    /// Validate and store a template in the workspace
    Save {
        /// Template JSON file
        path: PathBuf,

        /// Name to store it under (defaults to the template name)
        #[arg(long)]
        slug: Option<String>,
    },

    /// List saved templates
    List {
        /// Output format: "pretty", "json"
        #[arg(long, default_value = "pretty")]
        format: String,
    },

    /// Print a saved template
    Show {
        slug: String,

        /// Output format: "pretty", "json"
        #[arg(long, default_value = "pretty")]
        format: String,
    },
}

/// Parse output format string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Pretty,
    Json,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid output format: {}. Use 'pretty' or 'json'", s)),
        }
    }
}

/// Validate that a row count is greater than 0
fn validate_row_count(s: &str) -> Result<usize, String> {
    let count: usize = s
        .parse()
        .map_err(|_| format!("Invalid row count: '{}'. Must be a positive integer.", s))?;

    if count == 0 {
        return Err("Row count must be greater than 0".to_string());
    }

    Ok(count)
}
