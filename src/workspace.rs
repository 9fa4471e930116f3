//! Workspace management for sheetdiff operations

use crate::config::EngineConfig;
use crate::error::{Result, SheetdiffError};
use crate::schema::{slugify, ComparisonTemplate};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Manages the .sheetdiff workspace directory
#[derive(Debug, Clone)]
pub struct SheetdiffWorkspace {
    /// Project root directory (where .sheetdiff/ lives)
    pub root: PathBuf,
    /// .sheetdiff/ directory path
    pub sheetdiff_dir: PathBuf,
    /// .sheetdiff/templates/ directory path
    pub templates_dir: PathBuf,
    /// .sheetdiff/results/ directory path
    pub results_dir: PathBuf,
}

/// A saved template as shown by `template list`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateEntry {
    pub slug: String,
    pub template_name: String,
    pub rule_count: usize,
}

impl SheetdiffWorkspace {
    /// Find existing workspace or create a new one
    pub fn find_or_create(start_dir: Option<&Path>) -> Result<Self> {
        let current_dir = std::env::current_dir()?;
        let start = start_dir.unwrap_or(&current_dir);

        if let Some(workspace) = Self::find_existing(start) {
            return Ok(workspace);
        }

        Self::create_new(start.to_path_buf())
    }

    /// Find existing .sheetdiff workspace by walking up the directory tree
    fn find_existing(start_dir: &Path) -> Option<Self> {
        let mut current = start_dir;

        loop {
            if current.join(".sheetdiff").is_dir() {
                return Some(Self::from_root(current.to_path_buf()));
            }

            // A git root marks the project boundary
            if current.join(".git").exists() {
                return None;
            }

            current = current.parent()?;
        }
    }

    /// Create a new workspace in the specified root directory
    pub fn create_new(root: PathBuf) -> Result<Self> {
        let workspace = Self::from_root(root);

        fs::create_dir_all(&workspace.sheetdiff_dir)?;
        fs::create_dir_all(&workspace.templates_dir)?;
        fs::create_dir_all(&workspace.results_dir)?;

        workspace.create_config_with_force(false)?;
        workspace.ensure_gitignore()?;

        log::info!("Created sheetdiff workspace at: {}", workspace.root.display());

        Ok(workspace)
    }

    pub fn from_root(root: PathBuf) -> Self {
        let sheetdiff_dir = root.join(".sheetdiff");
        let templates_dir = sheetdiff_dir.join("templates");
        let results_dir = sheetdiff_dir.join("results");

        Self {
            root,
            sheetdiff_dir,
            templates_dir,
            results_dir,
        }
    }

    pub fn config_path(&self) -> PathBuf {
        self.sheetdiff_dir.join("config.json")
    }

    /// Write the configuration file, keeping an existing one unless forced
    pub fn create_config_with_force(&self, force: bool) -> Result<()> {
        let config_path = self.config_path();

        if config_path.exists() && !force {
            return Ok(());
        }

        let defaults = EngineConfig::default();
        let config = serde_json::json!({
            "version": crate::FORMAT_VERSION,
            "created": chrono::Utc::now(),
            "fuzzy_row_limit": defaults.fuzzy_row_limit,
            "parallel_rows": defaults.parallel_rows,
            "preview_rows": defaults.preview_rows
        });

        fs::write(config_path, serde_json::to_string_pretty(&config)?)?;
        Ok(())
    }

    /// Read the engine configuration; a missing file yields defaults
    pub fn load_config(&self) -> Result<EngineConfig> {
        let config_path = self.config_path();
        if !config_path.exists() {
            return Ok(EngineConfig::default());
        }

        let content = fs::read_to_string(&config_path)?;
        let config: EngineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Ensure .gitignore excludes generated results
    pub fn ensure_gitignore(&self) -> Result<()> {
        let gitignore_path = self.root.join(".gitignore");
        let sheetdiff_ignore = "# Ignore generated comparison results\n.sheetdiff/results/\n";

        if gitignore_path.exists() {
            let content = fs::read_to_string(&gitignore_path)?;
            if !content.contains(".sheetdiff/results/") {
                let new_content = if content.ends_with('\n') {
                    format!("{}\n{}", content, sheetdiff_ignore)
                } else {
                    format!("{}\n\n{}", content, sheetdiff_ignore)
                };
                fs::write(gitignore_path, new_content)?;
                log::info!("Updated .gitignore with sheetdiff entries");
            }
        } else {
            fs::write(gitignore_path, sheetdiff_ignore)?;
            log::info!("Created .gitignore with sheetdiff entries");
        }

        Ok(())
    }

    pub fn template_path(&self, slug: &str) -> PathBuf {
        self.templates_dir.join(format!("{}.json", slug))
    }

    /// Path of a result file inside the results directory.
    ///
    /// Names come from template output settings, so anything that could
    /// leave the directory is rejected.
    pub fn result_path(&self, name: &str) -> Result<PathBuf> {
        let name = name.trim();
        if name.is_empty()
            || name.contains(['/', '\\'])
            || name.contains("..")
            || name.starts_with('.')
        {
            return Err(SheetdiffError::invalid_input(format!(
                "Invalid result file name: '{}'",
                name
            )));
        }
        Ok(self.results_dir.join(format!("{}.json", name)))
    }

    pub fn template_exists(&self, slug: &str) -> bool {
        self.template_path(slug).is_file()
    }

    /// Validate and store a template, returning its slug
    pub fn save_template(&self, template: &serde_json::Value, slug: Option<&str>) -> Result<String> {
        let parsed = ComparisonTemplate::from_json(template)?;

        let slug = match slug {
            Some(s) => slugify(s),
            None => parsed.slug(),
        };
        if slug.is_empty() || slug.contains(['/', '\\']) || slug.starts_with('.') {
            return Err(SheetdiffError::invalid_input(format!(
                "Invalid template slug: '{}'",
                slug
            )));
        }

        fs::create_dir_all(&self.templates_dir)?;
        fs::write(self.template_path(&slug), serde_json::to_string_pretty(template)?)?;
        log::info!("Saved template '{}'", slug);

        Ok(slug)
    }

    pub fn load_template(&self, slug: &str) -> Result<ComparisonTemplate> {
        let path = self.template_path(slug);
        if !path.is_file() {
            return Err(SheetdiffError::template_not_found(slug));
        }
        ComparisonTemplate::from_json_str(&fs::read_to_string(path)?)
    }

    /// All saved templates, sorted by slug
    pub fn list_templates(&self) -> Result<Vec<TemplateEntry>> {
        let mut entries = Vec::new();

        if !self.templates_dir.exists() {
            return Ok(entries);
        }

        for entry in fs::read_dir(&self.templates_dir)? {
            let path = entry?.path();
            if path.extension().map_or(true, |ext| ext != "json") {
                continue;
            }
            let Some(slug) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            match self.load_template(slug) {
                Ok(template) => entries.push(TemplateEntry {
                    slug: slug.to_string(),
                    template_name: template.template_name,
                    rule_count: template.rules.len(),
                }),
                Err(e) => log::warn!("Skipping unreadable template '{}': {}", slug, e),
            }
        }

        entries.sort_by(|a, b| a.slug.cmp(&b.slug));
        Ok(entries)
    }

    /// Get workspace statistics
    pub fn stats(&self) -> Result<WorkspaceStats> {
        let mut stats = WorkspaceStats {
            template_count: self.list_templates()?.len(),
            ..Default::default()
        };

        if self.results_dir.exists() {
            for entry in WalkDir::new(&self.results_dir) {
                let entry = entry?;
                if entry.file_type().is_file() {
                    stats.result_count += 1;
                    stats.total_result_size += entry.metadata()?.len();
                }
            }
        }

        Ok(stats)
    }
}

/// Statistics about the workspace
#[derive(Debug, Default, Serialize)]
pub struct WorkspaceStats {
    pub template_count: usize,
    pub result_count: usize,
    pub total_result_size: u64,
}
