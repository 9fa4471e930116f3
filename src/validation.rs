//! Structural validation of templates and rules.
//!
//! Operates on raw JSON so that malformed input (hand-written or generated
//! rule suggestions) is rejected with readable messages before any typed
//! parsing or execution happens. Checks are structural only: whether a named
//! field exists in the data is not examined.

use crate::schema::{ConditionJoin, FormulaAction, Operator, RuleType};
use serde::Serialize;
use serde_json::{Map, Value};

/// Outcome of a validation pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

/// Validate a single rule object
pub fn validate_rule(rule: &Value) -> ValidationReport {
    ValidationReport::from_errors(rule_errors(rule))
}

fn rule_errors(rule: &Value) -> Vec<String> {
    let mut errors = Vec::new();

    let Some(rule_obj) = rule.as_object() else {
        errors.push("Rule must be an object".to_string());
        return errors;
    };

    let Some(raw_type) = rule_obj.get("rule_type") else {
        errors.push("Missing 'rule_type'".to_string());
        return errors;
    };

    let Some(rule_type) = raw_type.as_str().and_then(RuleType::parse) else {
        let valid: Vec<&str> = RuleType::ALL.iter().map(|t| t.as_str()).collect();
        errors.push(format!(
            "Unknown rule_type '{}'. Valid: {}",
            display_json(raw_type),
            valid.join(", ")
        ));
        return errors;
    };

    if let Some(column) = rule_obj.get("output_column") {
        if !column.is_string() {
            errors.push("output_column must be a string".to_string());
        }
    }

    let empty = Map::new();
    let config = match rule_obj.get("config") {
        None | Some(Value::Null) => &empty,
        Some(Value::Object(map)) => map,
        Some(_) => {
            errors.push(format!("{}.config must be an object", rule_type.as_str()));
            return errors;
        }
    };

    match rule_type {
        RuleType::PresenceRule => check_presence(config, &mut errors),
        RuleType::ChangeRule => check_change(config, &mut errors),
        RuleType::ConditionRule => check_condition(config, &mut errors),
        RuleType::RowMatch => check_row_match(config, &mut errors),
        RuleType::FormulaRule => check_formula(config, &mut errors),
    }

    errors
}

fn check_presence(config: &Map<String, Value>, errors: &mut Vec<String>) {
    for key in ["only_in_file_b", "only_in_file_a"] {
        if let Some(entry) = config.get(key) {
            let has_label = entry
                .get("outcome_label")
                .map(Value::is_string)
                .unwrap_or(false);
            if !has_label {
                errors.push(format!("PRESENCE_RULE.{} missing 'outcome_label'", key));
            }
        }
    }
}

fn check_change(config: &Map<String, Value>, errors: &mut Vec<String>) {
    match config.get("fields") {
        Some(Value::Array(fields)) => {
            for (i, field) in fields.iter().enumerate() {
                if !field.is_string() {
                    errors.push(format!("CHANGE_RULE.fields[{}] must be a string", i));
                }
            }
        }
        _ => errors.push("CHANGE_RULE.config must have 'fields' (list)".to_string()),
    }
}

fn check_condition(config: &Map<String, Value>, errors: &mut Vec<String>) {
    match config.get("conditions") {
        None => errors.push("CONDITION_RULE.config must have 'conditions'".to_string()),
        Some(Value::Array(conditions)) => {
            for (i, condition) in conditions.iter().enumerate() {
                let Some(cond) = condition.as_object() else {
                    errors.push(format!("CONDITION_RULE.conditions[{}] must be an object", i));
                    continue;
                };
                if !cond.get("field").map(Value::is_string).unwrap_or(false) {
                    errors.push(format!("CONDITION_RULE.conditions[{}] missing 'field'", i));
                }
                let operator = cond.get("operator").unwrap_or(&Value::Null);
                if operator.as_str().and_then(Operator::parse).is_none() {
                    errors.push(format!(
                        "CONDITION_RULE.conditions[{}] invalid operator '{}'",
                        i,
                        display_json(operator)
                    ));
                }
            }
        }
        Some(_) => errors.push("CONDITION_RULE.conditions must be a list".to_string()),
    }

    if !config
        .get("outcome_label")
        .map(Value::is_string)
        .unwrap_or(false)
    {
        errors.push("CONDITION_RULE.config missing 'outcome_label'".to_string());
    }

    if let Some(join) = config.get("condition_join") {
        if join.as_str().and_then(ConditionJoin::parse).is_none() {
            errors.push(format!(
                "CONDITION_RULE.condition_join must be 'AND' or 'OR', got '{}'",
                display_json(join)
            ));
        }
    }
}

fn check_row_match(config: &Map<String, Value>, errors: &mut Vec<String>) {
    if let Some(method) = config.get("method") {
        if !matches!(method.as_str(), Some("exact") | Some("fuzzy")) {
            errors.push("ROW_MATCH.method must be one of exact, fuzzy".to_string());
        }
    }

    if let Some(threshold) = config.get("fuzzy_threshold") {
        let in_range = threshold
            .as_f64()
            .map(|t| (0.0..=1.0).contains(&t))
            .unwrap_or(false);
        if !in_range {
            errors.push("ROW_MATCH.fuzzy_threshold must be between 0.0 and 1.0".to_string());
        }
    }
}

fn check_formula(config: &Map<String, Value>, errors: &mut Vec<String>) {
    match config.get("column_actions") {
        None => {}
        Some(Value::Object(actions)) => {
            for (column, action) in actions {
                if action.as_str().and_then(FormulaAction::parse).is_none() {
                    errors.push(format!(
                        "FORMULA_RULE.column_actions['{}'] invalid action '{}'",
                        column,
                        display_json(action)
                    ));
                }
            }
        }
        Some(_) => errors.push("FORMULA_RULE.column_actions must be an object".to_string()),
    }
}

/// Validate a whole template object, rule errors namespaced by index
pub fn validate_template(template: &Value) -> ValidationReport {
    let mut errors = Vec::new();

    let Some(obj) = template.as_object() else {
        return ValidationReport::from_errors(vec!["Template must be an object".to_string()]);
    };

    for key in ["template_name", "sheet_config", "column_mapping", "rules"] {
        if !obj.contains_key(key) {
            errors.push(format!("Missing required key: '{}'", key));
        }
    }
    if !errors.is_empty() {
        return ValidationReport::from_errors(errors);
    }

    if !obj["template_name"].is_string() {
        errors.push("template_name must be a string".to_string());
    }

    if !obj["sheet_config"]
        .get("file_a_sheet")
        .map(Value::is_string)
        .unwrap_or(false)
    {
        errors.push("sheet_config missing 'file_a_sheet'".to_string());
    }

    let has_key = obj["column_mapping"]
        .get("unique_key")
        .and_then(Value::as_array)
        .map(|keys| !keys.is_empty())
        .unwrap_or(false);
    if !has_key {
        errors.push("column_mapping must have non-empty 'unique_key'".to_string());
    }

    match &obj["rules"] {
        Value::Array(rules) => {
            for (i, rule) in rules.iter().enumerate() {
                for err in rule_errors(rule) {
                    errors.push(format!("rules[{}]: {}", i, err));
                }
            }
        }
        _ => errors.push("'rules' must be a list".to_string()),
    }

    ValidationReport::from_errors(errors)
}

/// Render a JSON scalar the way a user typed it
fn display_json(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}
