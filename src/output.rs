//! Output formatting utilities

use crate::error::Result;
use crate::executor::{DiffResult, DiffRow, RowSource};
use crate::matcher::MatchWarnings;
use crate::schema::{ComparisonTemplate, REMARKS_COLUMN};
use crate::validation::ValidationReport;
use crate::workspace::{TemplateEntry, WorkspaceStats};

/// Pretty printer for sheetdiff output
pub struct PrettyPrinter;

impl PrettyPrinter {
    /// Print workspace statistics
    pub fn print_workspace_stats(stats: &WorkspaceStats) {
        println!("📊 Sheetdiff Workspace Statistics");
        println!("├─ Templates: {}", stats.template_count);
        println!("├─ Results: {}", stats.result_count);
        println!("└─ Result size: {}", format_bytes(stats.total_result_size));
    }

    pub fn print_validation_report(source: &str, report: &ValidationReport) {
        if report.valid {
            println!("✅ Template is valid: {}", source);
            return;
        }

        println!("❌ Template is invalid: {}", source);
        for (i, error) in report.errors.iter().enumerate() {
            let prefix = if i == report.errors.len() - 1 { "└─" } else { "├─" };
            println!("{} {}", prefix, error);
        }
    }

    /// Print saved template list
    pub fn print_template_list(templates: &[TemplateEntry]) {
        if templates.is_empty() {
            println!("No templates found.");
            return;
        }

        println!("📋 Saved Templates:");
        for (i, entry) in templates.iter().enumerate() {
            let prefix = if i == templates.len() - 1 { "└─" } else { "├─" };
            println!(
                "{} {} ({}, {} rules)",
                prefix, entry.slug, entry.template_name, entry.rule_count
            );
        }
    }

    pub fn print_template(template: &ComparisonTemplate) {
        let mapping = &template.column_mapping;
        println!("📋 Template: {}", template.template_name);
        if let Some(description) = &template.description {
            println!("├─ Description: {}", description);
        }
        println!(
            "├─ Sheets: {} → {}",
            template.sheet_config.file_a_sheet,
            template.sheet_config.sheet_b()
        );
        println!("├─ Key: [{}]", mapping.unique_key.join(", "));
        println!("├─ Compare: [{}]", mapping.compare_fields.join(", "));
        if template.rules.is_empty() {
            println!("└─ Rules: none");
            return;
        }
        println!("└─ Rules: {}", template.rules.len());
        for (i, rule) in template.rules.iter().enumerate() {
            let prefix = if i == template.rules.len() - 1 { "   └─" } else { "   ├─" };
            println!("{} {} → {}", prefix, rule.rule_type().as_str(), rule.target_column());
        }
    }

    /// Print a diff result, listing at most `row_limit` rows
    pub fn print_diff_result(result: &DiffResult, row_limit: Option<usize>) {
        let summary = &result.summary;
        println!("🔍 Comparison Results");
        println!("├─ Total rows: {}", summary.total);
        println!("├─ ➕ Additions: {}", summary.additions);
        println!("├─ ➖ Deletions: {}", summary.deletions);
        println!("├─ ✏️  Changes: {}", summary.changes);
        let last = if result.warnings.is_some() { "├─" } else { "└─" };
        println!("{} ✅ Unchanged: {}", last, summary.unchanged);

        if let Some(warnings) = &result.warnings {
            Self::print_warnings(warnings);
        }

        let shown = row_limit.unwrap_or(result.rows.len()).min(result.rows.len());
        if shown == 0 {
            return;
        }

        println!();
        println!("Rows:");
        for (i, row) in result.rows.iter().take(shown).enumerate() {
            let prefix = if i == shown - 1 { "└─" } else { "├─" };
            println!("{} {}", prefix, describe_row(row));
        }
        if shown < result.rows.len() {
            println!("   ... and {} more rows", result.rows.len() - shown);
        }
    }

    fn print_warnings(warnings: &MatchWarnings) {
        println!("└─ ⚠️  Warnings");
        let mut lines = Vec::new();
        if let Some(count) = warnings.duplicate_keys_a {
            lines.push(format!("Duplicate keys in file A: {}", count));
        }
        if let Some(count) = warnings.duplicate_keys_b {
            lines.push(format!("Duplicate keys in file B: {}", count));
        }
        for (i, line) in lines.iter().enumerate() {
            let prefix = if i == lines.len() - 1 { "   └─" } else { "   ├─" };
            println!("{} {}", prefix, line);
        }
    }
}

/// One-line summary of a row: source, key values, remarks and other columns
fn describe_row(row: &DiffRow) -> String {
    let marker = match row.source {
        RowSource::B => "B",
        RowSource::A => "A",
        RowSource::Matched => "=",
    };
    let values = row
        .values
        .iter()
        .map(|(field, value)| format!("{}={}", field, value))
        .collect::<Vec<_>>()
        .join(", ");

    let mut line = format!("[{}] {}", marker, values);
    if let Some(remarks) = row.remarks().filter(|r| !r.label.is_empty()) {
        line.push_str(&format!(" → {}", remarks.label));
    }
    for (column, cell) in &row.output_columns {
        if column != REMARKS_COLUMN {
            line.push_str(&format!(" | {}: {}", column, cell.label));
        }
    }
    if !row.changed_fields.is_empty() {
        line.push_str(&format!(" (changed: {})", row.changed_fields.join(", ")));
    }
    line
}

/// JSON formatter for machine-readable output
pub struct JsonFormatter;

impl JsonFormatter {
    /// Format any serializable data as JSON
    pub fn format<T: serde::Serialize + ?Sized>(data: &T) -> Result<String> {
        Ok(serde_json::to_string_pretty(data)?)
    }

    /// Format a diff result, truncating rows to `row_limit`
    pub fn format_diff_result(result: &DiffResult, row_limit: Option<usize>) -> Result<String> {
        match row_limit {
            Some(limit) if limit < result.rows.len() => {
                let json = serde_json::json!({
                    "rows": &result.rows[..limit],
                    "summary": result.summary,
                    "warnings": result.warnings,
                    "truncated": true
                });
                Ok(serde_json::to_string_pretty(&json)?)
            }
            _ => Self::format(result),
        }
    }
}

/// Format bytes in human-readable format
fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}
