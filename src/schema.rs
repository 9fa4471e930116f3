//! Comparison template and rule data model

use crate::error::{Result, SheetdiffError};
use crate::record::Value;
use crate::validation::validate_template;
use indexmap::IndexMap;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

/// Shared annotation column used when a rule has no `output_column`
pub const REMARKS_COLUMN: &str = "Remarks";

pub const DEFAULT_ADDITION_LABEL: &str = "Addition";
pub const DEFAULT_ADDITION_COLOR: &str = "#C6EFCE";
pub const DEFAULT_DELETION_LABEL: &str = "Deletion";
pub const DEFAULT_DELETION_COLOR: &str = "#FFC7CE";
pub const DEFAULT_CHANGED_LABEL: &str = "Changed";
pub const DEFAULT_CHANGED_COLOR: &str = "#FFEB9C";
pub const DEFAULT_CONDITION_COLOR: &str = "#FFC7CE";

/// The five rule kinds a template may declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleType {
    PresenceRule,
    ChangeRule,
    ConditionRule,
    RowMatch,
    FormulaRule,
}

impl RuleType {
    pub const ALL: [RuleType; 5] = [
        RuleType::PresenceRule,
        RuleType::ChangeRule,
        RuleType::ConditionRule,
        RuleType::RowMatch,
        RuleType::FormulaRule,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleType::PresenceRule => "PRESENCE_RULE",
            RuleType::ChangeRule => "CHANGE_RULE",
            RuleType::ConditionRule => "CONDITION_RULE",
            RuleType::RowMatch => "ROW_MATCH",
            RuleType::FormulaRule => "FORMULA_RULE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

/// Condition operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    IsEmpty,
    IsNotEmpty,
    Equals,
    NotEquals,
    Contains,
    StartsWith,
    ChangedFromEmpty,
    ChangedToEmpty,
    DateIsBefore,
    DateIsAfter,
    ChangedFromPattern,
    ChangedToPattern,
}

impl Operator {
    pub const ALL: [Operator; 12] = [
        Operator::IsEmpty,
        Operator::IsNotEmpty,
        Operator::Equals,
        Operator::NotEquals,
        Operator::Contains,
        Operator::StartsWith,
        Operator::ChangedFromEmpty,
        Operator::ChangedToEmpty,
        Operator::DateIsBefore,
        Operator::DateIsAfter,
        Operator::ChangedFromPattern,
        Operator::ChangedToPattern,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::IsEmpty => "is_empty",
            Operator::IsNotEmpty => "is_not_empty",
            Operator::Equals => "equals",
            Operator::NotEquals => "not_equals",
            Operator::Contains => "contains",
            Operator::StartsWith => "starts_with",
            Operator::ChangedFromEmpty => "changed_from_empty",
            Operator::ChangedToEmpty => "changed_to_empty",
            Operator::DateIsBefore => "date_is_before",
            Operator::DateIsAfter => "date_is_after",
            Operator::ChangedFromPattern => "changed_from_pattern",
            Operator::ChangedToPattern => "changed_to_pattern",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == s)
    }

    /// Whether the operator reads the condition's `value`
    pub fn requires_value(&self) -> bool {
        !matches!(
            self,
            Operator::IsEmpty
                | Operator::IsNotEmpty
                | Operator::ChangedFromEmpty
                | Operator::ChangedToEmpty
        )
    }
}

/// How a list of conditions is folded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConditionJoin {
    #[default]
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
}

impl ConditionJoin {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "AND" => Some(Self::And),
            "OR" => Some(Self::Or),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: Operator, value: Option<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }
}

/// Label and color for one side of a presence rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceOutcome {
    pub outcome_label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceRuleConfig {
    #[serde(default = "default_only_in_file_b")]
    pub only_in_file_b: PresenceOutcome,
    #[serde(default = "default_only_in_file_a")]
    pub only_in_file_a: PresenceOutcome,
}

fn default_only_in_file_b() -> PresenceOutcome {
    PresenceOutcome {
        outcome_label: DEFAULT_ADDITION_LABEL.to_string(),
        color: Some(DEFAULT_ADDITION_COLOR.to_string()),
    }
}

fn default_only_in_file_a() -> PresenceOutcome {
    PresenceOutcome {
        outcome_label: DEFAULT_DELETION_LABEL.to_string(),
        color: Some(DEFAULT_DELETION_COLOR.to_string()),
    }
}

impl Default for PresenceRuleConfig {
    fn default() -> Self {
        Self {
            only_in_file_b: default_only_in_file_b(),
            only_in_file_a: default_only_in_file_a(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRuleConfig {
    pub fields: Vec<String>,
    #[serde(default = "default_changed_label")]
    pub outcome_label: String,
    #[serde(default = "default_changed_color")]
    pub color: String,
}

fn default_changed_label() -> String {
    DEFAULT_CHANGED_LABEL.to_string()
}

fn default_changed_color() -> String {
    DEFAULT_CHANGED_COLOR.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionRuleConfig {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub condition_join: ConditionJoin,
    pub outcome_label: String,
    #[serde(default = "default_condition_color")]
    pub color: String,
}

fn default_condition_color() -> String {
    DEFAULT_CONDITION_COLOR.to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMethod {
    #[default]
    Exact,
    Fuzzy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowMatchConfig {
    #[serde(default)]
    pub method: MatchMethod,
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: f64,
}

fn default_fuzzy_threshold() -> f64 {
    crate::DEFAULT_FUZZY_THRESHOLD
}

impl Default for RowMatchConfig {
    fn default() -> Self {
        Self {
            method: MatchMethod::Exact,
            fuzzy_threshold: crate::DEFAULT_FUZZY_THRESHOLD,
        }
    }
}

/// What a formula-bearing column contributes to the comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormulaAction {
    CompareValue,
    CompareExpression,
    Skip,
}

impl FormulaAction {
    pub const ALL: [FormulaAction; 3] = [
        FormulaAction::CompareValue,
        FormulaAction::CompareExpression,
        FormulaAction::Skip,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FormulaAction::CompareValue => "compare_value",
            FormulaAction::CompareExpression => "compare_expression",
            FormulaAction::Skip => "skip",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == s)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FormulaRuleConfig {
    #[serde(default)]
    pub column_actions: IndexMap<String, FormulaAction>,
}

/// Rule configuration, one variant per rule type
#[derive(Debug, Clone, PartialEq)]
pub enum RuleKind {
    Presence(PresenceRuleConfig),
    Change(ChangeRuleConfig),
    Condition(ConditionRuleConfig),
    RowMatch(RowMatchConfig),
    Formula(FormulaRuleConfig),
}

impl RuleKind {
    pub fn rule_type(&self) -> RuleType {
        match self {
            RuleKind::Presence(_) => RuleType::PresenceRule,
            RuleKind::Change(_) => RuleType::ChangeRule,
            RuleKind::Condition(_) => RuleType::ConditionRule,
            RuleKind::RowMatch(_) => RuleType::RowMatch,
            RuleKind::Formula(_) => RuleType::FormulaRule,
        }
    }

    /// ROW_MATCH and FORMULA_RULE configure the run rather than annotate rows
    pub fn annotates_rows(&self) -> bool {
        !matches!(self, RuleKind::RowMatch(_) | RuleKind::Formula(_))
    }
}

/// A single template rule
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawRule")]
pub struct Rule {
    pub kind: RuleKind,
    /// Empty means the shared Remarks column
    pub output_column: String,
}

impl Rule {
    pub fn new(kind: RuleKind) -> Self {
        Self {
            kind,
            output_column: String::new(),
        }
    }

    pub fn with_output_column(mut self, column: impl Into<String>) -> Self {
        self.output_column = column.into();
        self
    }

    pub fn rule_type(&self) -> RuleType {
        self.kind.rule_type()
    }

    /// Column this rule writes to
    pub fn target_column(&self) -> &str {
        if self.output_column.is_empty() {
            REMARKS_COLUMN
        } else {
            &self.output_column
        }
    }
}

#[derive(Deserialize)]
struct RawRule {
    rule_type: RuleType,
    #[serde(default)]
    config: serde_json::Value,
    #[serde(default)]
    output_column: String,
}

impl TryFrom<RawRule> for Rule {
    type Error = serde_json::Error;

    fn try_from(raw: RawRule) -> std::result::Result<Self, Self::Error> {
        let config = match raw.config {
            serde_json::Value::Null => serde_json::Value::Object(serde_json::Map::new()),
            other => other,
        };
        let kind = match raw.rule_type {
            RuleType::PresenceRule => RuleKind::Presence(serde_json::from_value(config)?),
            RuleType::ChangeRule => RuleKind::Change(serde_json::from_value(config)?),
            RuleType::ConditionRule => RuleKind::Condition(serde_json::from_value(config)?),
            RuleType::RowMatch => RuleKind::RowMatch(serde_json::from_value(config)?),
            RuleType::FormulaRule => RuleKind::Formula(serde_json::from_value(config)?),
        };
        Ok(Rule {
            kind,
            output_column: raw.output_column,
        })
    }
}

impl Serialize for Rule {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Rule", 3)?;
        state.serialize_field("rule_type", &self.rule_type())?;
        match &self.kind {
            RuleKind::Presence(config) => state.serialize_field("config", config)?,
            RuleKind::Change(config) => state.serialize_field("config", config)?,
            RuleKind::Condition(config) => state.serialize_field("config", config)?,
            RuleKind::RowMatch(config) => state.serialize_field("config", config)?,
            RuleKind::Formula(config) => state.serialize_field("config", config)?,
        }
        state.serialize_field("output_column", &self.output_column)?;
        state.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetConfig {
    pub file_a_sheet: String,
    #[serde(default)]
    pub file_b_sheet: Option<String>,
    #[serde(default)]
    pub header_row: usize,
}

impl SheetConfig {
    /// Sheet to read from file B, falling back to file A's sheet
    pub fn sheet_b(&self) -> &str {
        self.file_b_sheet.as_deref().unwrap_or(&self.file_a_sheet)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub unique_key: Vec<String>,
    #[serde(default)]
    pub compare_fields: Vec<String>,
    #[serde(default)]
    pub formula_fields: IndexMap<String, String>,
    #[serde(default)]
    pub ignored_fields: Vec<String>,
    #[serde(default)]
    pub display_fields: Vec<String>,
}

impl ColumnMapping {
    /// Key, display and compare fields in that order, without repeats
    pub fn output_fields(&self) -> Vec<String> {
        let mut fields: Vec<String> = Vec::new();
        for field in self
            .unique_key
            .iter()
            .chain(&self.display_fields)
            .chain(&self.compare_fields)
        {
            if !fields.contains(field) {
                fields.push(field.clone());
            }
        }
        fields
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_true")]
    pub add_remarks_column: bool,
    #[serde(default = "default_true")]
    pub include_summary_sheet: bool,
    #[serde(default = "default_true")]
    pub highlight_changed_cells: bool,
    #[serde(default = "default_filename_template")]
    pub output_filename_template: String,
    #[serde(default = "default_output_sheet_name")]
    pub output_sheet_name: String,
    #[serde(default)]
    pub included_columns: Option<Vec<String>>,
    #[serde(default)]
    pub column_order: Option<Vec<String>>,
    /// Keep unmatched records that no rule annotated
    #[serde(default = "default_true")]
    pub include_unmatched_rows: bool,
}

fn default_true() -> bool {
    true
}

fn default_filename_template() -> String {
    "comparison_{date}".to_string()
}

fn default_output_sheet_name() -> String {
    "Comparison".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            add_remarks_column: true,
            include_summary_sheet: true,
            highlight_changed_cells: true,
            output_filename_template: default_filename_template(),
            output_sheet_name: default_output_sheet_name(),
            included_columns: None,
            column_order: None,
            include_unmatched_rows: true,
        }
    }
}

/// A complete, user-authored comparison template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonTemplate {
    pub template_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub sheet_config: SheetConfig,
    pub column_mapping: ColumnMapping,
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub output_config: OutputConfig,
}

impl ComparisonTemplate {
    /// Validate raw JSON and only then build the typed template
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let report = validate_template(value);
        if !report.valid {
            return Err(SheetdiffError::validation(report.errors));
        }
        serde_json::from_value(value.clone())
            .map_err(|e| SheetdiffError::validation(vec![e.to_string()]))
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(s)?;
        Self::from_json(&value)
    }

    /// Re-run structural validation on a typed template
    pub fn validate(&self) -> Result<()> {
        let value = serde_json::to_value(self)?;
        let report = validate_template(&value);
        if report.valid {
            Ok(())
        } else {
            Err(SheetdiffError::validation(report.errors))
        }
    }

    /// The first ROW_MATCH rule, or exact matching at the default threshold
    pub fn row_match(&self) -> RowMatchConfig {
        self.rules
            .iter()
            .find_map(|rule| match &rule.kind {
                RuleKind::RowMatch(config) => Some(config.clone()),
                _ => None,
            })
            .unwrap_or_default()
    }

    /// Rules that take part in row annotation, in template order
    pub fn annotation_rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(|rule| rule.kind.annotates_rows())
    }

    /// File-safe identifier derived from the template name
    pub fn slug(&self) -> String {
        slugify(&self.template_name)
    }
}

pub fn slugify(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}
