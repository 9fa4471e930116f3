//! Engine configuration

use crate::error::{Result, SheetdiffError};
use serde::{Deserialize, Serialize};

/// Tunables for a comparison run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Largest record set either side may have when fuzzy matching
    #[serde(default = "default_fuzzy_row_limit")]
    pub fuzzy_row_limit: usize,
    /// Annotate rows on the rayon thread pool
    #[serde(default = "default_parallel_rows")]
    pub parallel_rows: bool,
    /// Rows shown by a dry-run preview
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,
}

fn default_fuzzy_row_limit() -> usize {
    crate::DEFAULT_FUZZY_ROW_LIMIT
}

fn default_parallel_rows() -> bool {
    true
}

fn default_preview_rows() -> usize {
    crate::DEFAULT_PREVIEW_ROWS
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fuzzy_row_limit: default_fuzzy_row_limit(),
            parallel_rows: default_parallel_rows(),
            preview_rows: default_preview_rows(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.fuzzy_row_limit == 0 {
            return Err(SheetdiffError::config("fuzzy_row_limit must be greater than 0"));
        }
        if self.preview_rows == 0 {
            return Err(SheetdiffError::config("preview_rows must be greater than 0"));
        }
        Ok(())
    }

    pub fn sequential() -> Self {
        Self {
            parallel_rows: false,
            ..Self::default()
        }
    }
}
