//! Rule execution: matching plus per-row annotation into a diff result

use crate::change_detection::{evaluate_conditions, fields_changed, resolve_outcome_label};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::matcher::{exact_match, fuzzy_match_with_limit, MatchOutcome, MatchWarnings};
use crate::record::{Record, Value};
use crate::schema::{
    ComparisonTemplate, MatchMethod, Rule, RuleKind, DEFAULT_ADDITION_COLOR,
    DEFAULT_ADDITION_LABEL, DEFAULT_CHANGED_COLOR, DEFAULT_CHANGED_LABEL,
    DEFAULT_DELETION_COLOR, DEFAULT_DELETION_LABEL, REMARKS_COLUMN,
};
use indexmap::IndexMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Which input an output row came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowSource {
    #[serde(rename = "A")]
    A,
    #[serde(rename = "B")]
    B,
    #[serde(rename = "matched")]
    Matched,
}

/// Situation a row is annotated in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleContext {
    Addition,
    Deletion,
    Matched,
}

/// Label and color written to one output column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputCell {
    pub label: String,
    pub color: Option<String>,
}

impl OutputCell {
    fn new(label: String, color: impl Into<Option<String>>) -> Self {
        Self {
            label,
            color: color.into(),
        }
    }
}

/// One annotated output row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffRow {
    /// Key, display and compare fields from the authoritative record
    pub values: IndexMap<String, Value>,
    pub source: RowSource,
    pub output_columns: IndexMap<String, OutputCell>,
    pub changed_fields: Vec<String>,
    /// A-side values of matched rows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_values: Option<IndexMap<String, Value>>,
}

impl DiffRow {
    pub fn remarks(&self) -> Option<&OutputCell> {
        self.output_columns.get(REMARKS_COLUMN)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub total: usize,
    pub additions: usize,
    pub deletions: usize,
    pub changes: usize,
    pub unchanged: usize,
}

impl DiffSummary {
    fn from_rows(rows: &[DiffRow]) -> Self {
        let mut summary = DiffSummary {
            total: rows.len(),
            ..Default::default()
        };
        for row in rows {
            match row.source {
                RowSource::B => summary.additions += 1,
                RowSource::A => summary.deletions += 1,
                RowSource::Matched if row.changed_fields.is_empty() => summary.unchanged += 1,
                RowSource::Matched => summary.changes += 1,
            }
        }
        summary
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffResult {
    pub rows: Vec<DiffRow>,
    pub summary: DiffSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warnings: Option<MatchWarnings>,
}

/// Evaluate one rule for one row.
///
/// Pure: the outcome depends only on the arguments. `changed` is the set of
/// compare fields that differ for a matched pair.
pub fn evaluate_rule(
    rule: &Rule,
    record_a: Option<&Record>,
    record_b: Option<&Record>,
    context: RuleContext,
    changed: &[String],
) -> Option<OutputCell> {
    let label_source = match context {
        RuleContext::Deletion => record_a,
        RuleContext::Addition | RuleContext::Matched => record_b,
    }?;

    match (&rule.kind, context) {
        (RuleKind::Presence(config), RuleContext::Addition) => Some(OutputCell::new(
            resolve_outcome_label(&config.only_in_file_b.outcome_label, label_source),
            config
                .only_in_file_b
                .color
                .clone()
                .unwrap_or_else(|| DEFAULT_ADDITION_COLOR.to_string()),
        )),
        (RuleKind::Presence(config), RuleContext::Deletion) => Some(OutputCell::new(
            resolve_outcome_label(&config.only_in_file_a.outcome_label, label_source),
            config
                .only_in_file_a
                .color
                .clone()
                .unwrap_or_else(|| DEFAULT_DELETION_COLOR.to_string()),
        )),
        (RuleKind::Presence(_), RuleContext::Matched) => None,
        (RuleKind::Change(config), RuleContext::Matched) => config
            .fields
            .iter()
            .any(|field| changed.contains(field))
            .then(|| {
                OutputCell::new(
                    resolve_outcome_label(&config.outcome_label, label_source),
                    config.color.clone(),
                )
            }),
        (RuleKind::Change(_), _) => None,
        (RuleKind::Condition(config), _) => {
            evaluate_conditions(record_a, record_b, &config.conditions, config.condition_join).then(
                || {
                    OutputCell::new(
                        resolve_outcome_label(&config.outcome_label, label_source),
                        config.color.clone(),
                    )
                },
            )
        }
        (RuleKind::RowMatch(_), _) | (RuleKind::Formula(_), _) => None,
    }
}

/// Runs a template's rules over two record sets
#[derive(Debug, Clone, Default)]
pub struct RuleExecutor {
    config: EngineConfig,
}

impl RuleExecutor {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Match the two record sets and annotate every row
    pub fn execute(
        &self,
        template: &ComparisonTemplate,
        records_a: &[Record],
        records_b: &[Record],
    ) -> Result<DiffResult> {
        template.validate()?;
        let matches = self.match_records(template, records_a, records_b)?;
        Ok(self.annotate(template, records_a, records_b, matches))
    }

    /// Pair records using the template's ROW_MATCH rule
    pub fn match_records(
        &self,
        template: &ComparisonTemplate,
        records_a: &[Record],
        records_b: &[Record],
    ) -> Result<MatchOutcome> {
        let key_fields = &template.column_mapping.unique_key;
        let row_match = template.row_match();
        match row_match.method {
            MatchMethod::Exact => Ok(exact_match(records_a, records_b, key_fields)),
            MatchMethod::Fuzzy => fuzzy_match_with_limit(
                records_a,
                records_b,
                key_fields,
                row_match.fuzzy_threshold,
                self.config.fuzzy_row_limit,
            ),
        }
    }

    /// Annotate matched pairs and unmatched records into the final result
    pub fn annotate(
        &self,
        template: &ComparisonTemplate,
        records_a: &[Record],
        records_b: &[Record],
        matches: MatchOutcome,
    ) -> DiffResult {
        let rules: Vec<&Rule> = template.annotation_rules().collect();
        let output_fields = template.column_mapping.output_fields();
        let compare_fields = &template.column_mapping.compare_fields;
        let keep_unannotated = template.output_config.include_unmatched_rows;

        let annotate_addition = |&j: &usize| {
            unmatched_row(
                &rules,
                &records_b[j],
                RowSource::B,
                &output_fields,
                keep_unannotated,
            )
        };
        let annotate_deletion = |&i: &usize| {
            unmatched_row(
                &rules,
                &records_a[i],
                RowSource::A,
                &output_fields,
                keep_unannotated,
            )
        };
        let annotate_pair = |&(i, j): &(usize, usize)| {
            matched_row(
                &rules,
                &records_a[i],
                &records_b[j],
                &output_fields,
                compare_fields,
            )
        };

        let (additions, deletions, matched): (Vec<DiffRow>, Vec<DiffRow>, Vec<DiffRow>) =
            if self.config.parallel_rows {
                (
                    matches.only_b.par_iter().filter_map(annotate_addition).collect(),
                    matches.only_a.par_iter().filter_map(annotate_deletion).collect(),
                    matches.pairs.par_iter().map(annotate_pair).collect(),
                )
            } else {
                (
                    matches.only_b.iter().filter_map(annotate_addition).collect(),
                    matches.only_a.iter().filter_map(annotate_deletion).collect(),
                    matches.pairs.iter().map(annotate_pair).collect(),
                )
            };

        let dropped = matches.only_a.len() + matches.only_b.len() - additions.len() - deletions.len();
        if dropped > 0 {
            log::debug!("Dropped {} unmatched row(s) with no annotation", dropped);
        }

        let mut rows = additions;
        rows.extend(deletions);
        rows.extend(matched);

        let summary = DiffSummary::from_rows(&rows);
        log::info!(
            "Compared with '{}': {} rows ({} added, {} deleted, {} changed, {} unchanged)",
            template.template_name,
            summary.total,
            summary.additions,
            summary.deletions,
            summary.changes,
            summary.unchanged
        );

        DiffResult {
            rows,
            summary,
            warnings: (!matches.warnings.is_empty()).then_some(matches.warnings),
        }
    }
}

/// Convenience entry point with the default engine configuration
pub fn execute(
    template: &ComparisonTemplate,
    records_a: &[Record],
    records_b: &[Record],
) -> Result<DiffResult> {
    RuleExecutor::default().execute(template, records_a, records_b)
}

/// Apply rules in order; the first rule to fire for a column owns it
fn output_columns(
    rules: &[&Rule],
    record_a: Option<&Record>,
    record_b: Option<&Record>,
    context: RuleContext,
    changed: &[String],
) -> IndexMap<String, OutputCell> {
    let mut columns: IndexMap<String, OutputCell> = IndexMap::new();
    for rule in rules {
        let column = rule.target_column();
        if columns.contains_key(column) {
            continue;
        }
        if let Some(cell) = evaluate_rule(rule, record_a, record_b, context, changed) {
            columns.insert(column.to_string(), cell);
        }
    }
    columns
}

fn project(record: &Record, fields: &[String]) -> IndexMap<String, Value> {
    fields
        .iter()
        .map(|field| {
            (
                field.clone(),
                record.get(field).cloned().unwrap_or(Value::Null),
            )
        })
        .collect()
}

fn unmatched_row(
    rules: &[&Rule],
    record: &Record,
    source: RowSource,
    output_fields: &[String],
    keep_unannotated: bool,
) -> Option<DiffRow> {
    let (record_a, record_b, context, default_label, default_color) = match source {
        RowSource::B => (
            None,
            Some(record),
            RuleContext::Addition,
            DEFAULT_ADDITION_LABEL,
            DEFAULT_ADDITION_COLOR,
        ),
        _ => (
            Some(record),
            None,
            RuleContext::Deletion,
            DEFAULT_DELETION_LABEL,
            DEFAULT_DELETION_COLOR,
        ),
    };

    let mut columns = output_columns(rules, record_a, record_b, context, &[]);
    if !columns.contains_key(REMARKS_COLUMN) {
        if columns.is_empty() && !keep_unannotated {
            return None;
        }
        columns.insert(
            REMARKS_COLUMN.to_string(),
            OutputCell::new(default_label.to_string(), default_color.to_string()),
        );
    }

    Some(DiffRow {
        values: project(record, output_fields),
        source,
        output_columns: columns,
        changed_fields: Vec::new(),
        original_values: None,
    })
}

fn matched_row(
    rules: &[&Rule],
    record_a: &Record,
    record_b: &Record,
    output_fields: &[String],
    compare_fields: &[String],
) -> DiffRow {
    let changed = fields_changed(record_a, record_b, compare_fields);
    let mut columns = output_columns(
        rules,
        Some(record_a),
        Some(record_b),
        RuleContext::Matched,
        &changed,
    );

    if !columns.contains_key(REMARKS_COLUMN) {
        let remarks = if changed.is_empty() {
            OutputCell::new(String::new(), None::<String>)
        } else {
            OutputCell::new(
                DEFAULT_CHANGED_LABEL.to_string(),
                DEFAULT_CHANGED_COLOR.to_string(),
            )
        };
        columns.insert(REMARKS_COLUMN.to_string(), remarks);
    }

    DiffRow {
        values: project(record_b, output_fields),
        source: RowSource::Matched,
        output_columns: columns,
        changed_fields: changed,
        original_values: Some(project(record_a, output_fields)),
    }
}
