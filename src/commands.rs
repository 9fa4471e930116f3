//! Command implementations for sheetdiff CLI

use crate::cli::{Commands, OutputFormat, TemplateAction};
use crate::error::{Result, SheetdiffError};
use crate::executor::RuleExecutor;
use crate::loader::RecordLoader;
use crate::output::{JsonFormatter, PrettyPrinter};
use crate::progress::ProgressReporter;
use crate::schema::ComparisonTemplate;
use crate::validation::validate_template;
use crate::workspace::SheetdiffWorkspace;
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};

/// Arguments of the compare command
#[derive(Debug, Clone)]
pub struct CompareRequest {
    pub file_a: PathBuf,
    pub file_b: PathBuf,
    pub template: String,
    pub sheet_a: Option<String>,
    pub sheet_b: Option<String>,
    pub output: Option<PathBuf>,
    pub preview: Option<Option<usize>>,
    pub format: String,
}

/// Execute a command
pub fn execute_command(command: Commands, workspace_path: Option<&Path>) -> Result<()> {
    match command {
        Commands::Init { force } => init_command(workspace_path, force),
        Commands::Validate { template, format } => {
            validate_command(workspace_path, &template, &format)
        }
        Commands::Compare {
            file_a,
            file_b,
            template,
            sheet_a,
            sheet_b,
            output,
            preview,
            format,
        } => compare_command(
            workspace_path,
            CompareRequest {
                file_a,
                file_b,
                template,
                sheet_a,
                sheet_b,
                output,
                preview,
                format,
            },
        ),
        Commands::Template { action } => template_command(workspace_path, action),
        Commands::Info { format } => info_command(workspace_path, &format),
    }
}

/// Initialize sheetdiff workspace
fn init_command(workspace_path: Option<&Path>, force: bool) -> Result<()> {
    let current_dir = std::env::current_dir()?;
    let root = workspace_path.unwrap_or(&current_dir);

    // init never searches parent directories
    let workspace = SheetdiffWorkspace::create_new(root.to_path_buf())?;
    if force {
        workspace.create_config_with_force(true)?;
    }

    println!("✅ Initialized sheetdiff workspace at: {}", workspace.root.display());
    println!("📁 Workspace directory: {}", workspace.sheetdiff_dir.display());

    Ok(())
}

/// Print the validation report of a template file
fn validate_command(workspace_path: Option<&Path>, template: &Path, format: &str) -> Result<()> {
    let output_format = parse_format(format)?;
    let path = resolve_input_path(workspace_path, template)?;

    let document: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
    let report = validate_template(&document);

    match output_format {
        OutputFormat::Pretty => {
            PrettyPrinter::print_validation_report(&path.display().to_string(), &report)
        }
        OutputFormat::Json => println!("{}", JsonFormatter::format(&report)?),
    }

    if report.valid {
        Ok(())
    } else {
        Err(SheetdiffError::validation(report.errors))
    }
}

/// Compare two datasets and report or store the result
fn compare_command(workspace_path: Option<&Path>, request: CompareRequest) -> Result<()> {
    let output_format = parse_format(&request.format)?;
    let workspace = SheetdiffWorkspace::find_or_create(workspace_path)?;
    let config = workspace.load_config()?;

    let template = resolve_template(&workspace, &request.template)?;
    template.validate()?;

    let sheet_a = request
        .sheet_a
        .clone()
        .unwrap_or_else(|| template.sheet_config.file_a_sheet.clone());
    let sheet_b = request
        .sheet_b
        .clone()
        .unwrap_or_else(|| template.sheet_config.sheet_b().to_string());

    let file_a = resolve_against(&workspace.root, &request.file_a);
    let file_b = resolve_against(&workspace.root, &request.file_b);

    let mut progress = match output_format {
        OutputFormat::Pretty => ProgressReporter::new_for_compare(),
        OutputFormat::Json => ProgressReporter::new_minimal(),
    };

    let loader = RecordLoader::new(template.sheet_config.header_row);
    let records_a = loader.load(&file_a, &sheet_a)?;
    let records_b = loader.load(&file_b, &sheet_b)?;
    progress.finish_load(&format!(
        "Loaded {} + {} records",
        records_a.len(),
        records_b.len()
    ));

    let executor = RuleExecutor::new(config.clone());
    let matches = executor.match_records(&template, &records_a, &records_b)?;
    progress.finish_match(&format!("Matched {} pairs", matches.pairs.len()));

    let result = executor.annotate(&template, &records_a, &records_b, matches);
    progress.finish_rules(&format!(
        "Annotated {} rows in {:.2?}",
        result.rows.len(),
        progress.elapsed()
    ));
    drop(progress);

    if let Some(preview) = request.preview {
        let limit = preview.unwrap_or(config.preview_rows);
        match output_format {
            OutputFormat::Pretty => {
                println!("👀 Preview (nothing written)");
                PrettyPrinter::print_diff_result(&result, Some(limit));
            }
            OutputFormat::Json => {
                println!("{}", JsonFormatter::format_diff_result(&result, Some(limit))?)
            }
        }
        return Ok(());
    }

    let output_path = match &request.output {
        Some(path) => resolve_against(&workspace.root, path),
        None => {
            let today = chrono::Local::now().date_naive();
            let name = render_output_name(
                &template.output_config.output_filename_template,
                &file_a,
                &file_b,
                today,
            );
            workspace.result_path(&name)?
        }
    };

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&output_path, JsonFormatter::format(&result)?)?;
    log::info!("Wrote comparison result to {}", output_path.display());

    match output_format {
        OutputFormat::Pretty => {
            PrettyPrinter::print_diff_result(&result, Some(config.preview_rows));
            println!("\n💾 Result saved to: {}", output_path.display());
        }
        OutputFormat::Json => println!("{}", JsonFormatter::format(&result)?),
    }

    Ok(())
}

fn template_command(workspace_path: Option<&Path>, action: TemplateAction) -> Result<()> {
    let workspace = SheetdiffWorkspace::find_or_create(workspace_path)?;

    match action {
        TemplateAction::Save { path, slug } => {
            let path = resolve_against(&workspace.root, &path);
            let document: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
            let slug = workspace.save_template(&document, slug.as_deref())?;
            println!("✅ Saved template as '{}'", slug);
        }
        TemplateAction::List { format } => {
            let templates = workspace.list_templates()?;
            match parse_format(&format)? {
                OutputFormat::Pretty => PrettyPrinter::print_template_list(&templates),
                OutputFormat::Json => println!("{}", JsonFormatter::format(&templates)?),
            }
        }
        TemplateAction::Show { slug, format } => {
            let template = workspace.load_template(&slug)?;
            match parse_format(&format)? {
                OutputFormat::Pretty => PrettyPrinter::print_template(&template),
                OutputFormat::Json => println!("{}", JsonFormatter::format(&template)?),
            }
        }
    }

    Ok(())
}

fn info_command(workspace_path: Option<&Path>, format: &str) -> Result<()> {
    let output_format = parse_format(format)?;
    let workspace = SheetdiffWorkspace::find_or_create(workspace_path)?;
    let stats = workspace.stats()?;

    match output_format {
        OutputFormat::Pretty => PrettyPrinter::print_workspace_stats(&stats),
        OutputFormat::Json => println!("{}", JsonFormatter::format(&stats)?),
    }

    Ok(())
}

fn parse_format(format: &str) -> Result<OutputFormat> {
    OutputFormat::parse(format).map_err(SheetdiffError::invalid_input)
}

/// A template argument is a file path when such a file exists, otherwise a saved slug
fn resolve_template(workspace: &SheetdiffWorkspace, template: &str) -> Result<ComparisonTemplate> {
    let path = resolve_against(&workspace.root, Path::new(template));
    if path.is_file() {
        log::debug!("Loading template from {}", path.display());
        return ComparisonTemplate::from_json_str(&fs::read_to_string(path)?);
    }
    workspace.load_template(template)
}

/// Relative paths resolve against the working directory first, then the workspace root
fn resolve_against(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() || path.exists() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

fn resolve_input_path(workspace_path: Option<&Path>, path: &Path) -> Result<PathBuf> {
    let resolved = match workspace_path {
        Some(root) => resolve_against(root, path),
        None => path.to_path_buf(),
    };
    if !resolved.is_file() {
        return Err(SheetdiffError::invalid_input(format!(
            "File not found: {}",
            resolved.display()
        )));
    }
    Ok(resolved)
}

/// Expand `{date}`, `{file_a}` and `{file_b}` in an output filename template
pub fn render_output_name(template: &str, file_a: &Path, file_b: &Path, date: NaiveDate) -> String {
    let stem = |path: &Path| {
        path.file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string()
    };
    template
        .replace("{date}", &date.format("%Y%m%d").to_string())
        .replace("{file_a}", &stem(file_a))
        .replace("{file_b}", &stem(file_b))
}
