//! Field-level change detection and condition evaluation

use crate::record::{Record, Value};
use crate::schema::{Condition, ConditionJoin, Operator};
use chrono::{NaiveDate, NaiveDateTime};
use regex::{Captures, Regex, RegexBuilder};
use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};
use thiserror::Error;

/// Text date layouts tried in order; the first that parses wins
pub const DATE_FORMATS: [&str; 5] = ["%d/%m/%Y", "%Y-%m-%d", "%d-%m-%Y", "%m/%d/%Y", "%d %b %Y"];

/// Why a single condition could not be evaluated
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("operator '{operator}' on field '{field}' needs a value")]
    MissingValue { field: String, operator: &'static str },

    #[error("unparsable value '{value}' for field '{field}'")]
    UnparsableValue { field: String, value: String },

    #[error("invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
}

/// Normalized form of an optional value; absent is empty
pub fn normalize(value: Option<&Value>) -> String {
    value.map(Value::normalized).unwrap_or_default()
}

fn is_blank(value: Option<&Value>) -> bool {
    value.map(Value::is_blank).unwrap_or(true)
}

/// Fields whose normalized values differ between the two records
pub fn fields_changed(record_a: &Record, record_b: &Record, fields: &[String]) -> Vec<String> {
    fields
        .iter()
        .filter(|field| normalize(record_a.get(*field)) != normalize(record_b.get(*field)))
        .cloned()
        .collect()
}

/// Evaluate one condition; failures degrade to `false`.
///
/// The current record is B when present, otherwise A; the previous record is A.
pub fn evaluate_condition(
    record_a: Option<&Record>,
    record_b: Option<&Record>,
    condition: &Condition,
) -> bool {
    match try_evaluate_condition(record_a, record_b, condition) {
        Ok(result) => result,
        Err(err @ EvalError::InvalidPattern { .. }) => {
            log::warn!("Condition on '{}' does not fire: {}", condition.field, err);
            false
        }
        Err(err) => {
            log::debug!("Condition on '{}' does not fire: {}", condition.field, err);
            false
        }
    }
}

/// Evaluate one condition, reporting why it could not be decided
pub fn try_evaluate_condition(
    record_a: Option<&Record>,
    record_b: Option<&Record>,
    condition: &Condition,
) -> Result<bool, EvalError> {
    let field = condition.field.as_str();
    let current = record_b.or(record_a).and_then(|r| r.get(field));
    let previous = record_a.and_then(|r| r.get(field));

    let expected = || {
        condition.value.as_ref().ok_or_else(|| EvalError::MissingValue {
            field: field.to_string(),
            operator: condition.operator.as_str(),
        })
    };

    let result = match condition.operator {
        Operator::IsEmpty => is_blank(current),
        Operator::IsNotEmpty => !is_blank(current),
        Operator::Equals => normalize(current) == expected()?.normalized(),
        Operator::NotEquals => normalize(current) != expected()?.normalized(),
        Operator::Contains => normalize(current)
            .to_lowercase()
            .contains(&expected()?.normalized().to_lowercase()),
        Operator::StartsWith => normalize(current)
            .to_lowercase()
            .starts_with(&expected()?.normalized().to_lowercase()),
        Operator::ChangedFromEmpty => is_blank(previous) && !is_blank(current),
        Operator::ChangedToEmpty => !is_blank(previous) && is_blank(current),
        Operator::DateIsBefore => {
            let limit = expected()?;
            date_of(field, current)? < date_of(field, Some(limit))?
        }
        Operator::DateIsAfter => {
            let limit = expected()?;
            date_of(field, current)? > date_of(field, Some(limit))?
        }
        Operator::ChangedFromPattern => {
            pattern(&expected()?.normalized())?.is_match(&normalize(previous))
        }
        Operator::ChangedToPattern => {
            pattern(&expected()?.normalized())?.is_match(&normalize(current))
        }
    };

    Ok(result)
}

/// Fold a condition list. An empty list is `true` under AND and `false` under OR.
///
/// Every condition is evaluated on its own, so a condition that cannot be
/// evaluated only makes itself false.
pub fn evaluate_conditions(
    record_a: Option<&Record>,
    record_b: Option<&Record>,
    conditions: &[Condition],
    join: ConditionJoin,
) -> bool {
    let mut results = conditions
        .iter()
        .map(|condition| evaluate_condition(record_a, record_b, condition));
    match join {
        ConditionJoin::And => results.all(|r| r),
        ConditionJoin::Or => results.any(|r| r),
    }
}

fn date_of(field: &str, value: Option<&Value>) -> Result<NaiveDate, EvalError> {
    value.and_then(parse_date).ok_or_else(|| EvalError::UnparsableValue {
        field: field.to_string(),
        value: normalize(value),
    })
}

/// Interpret a value as a calendar date
pub fn parse_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Date(d) => Some(*d),
        Value::DateTime(dt) => Some(dt.date()),
        Value::Text(s) => parse_date_str(s),
        _ => None,
    }
}

fn parse_date_str(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(s, format).ok())
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}

type CompiledPattern = Result<Regex, EvalError>;

fn pattern_cache() -> &'static RwLock<HashMap<String, CompiledPattern>> {
    static PATTERNS: OnceLock<RwLock<HashMap<String, CompiledPattern>>> = OnceLock::new();
    PATTERNS.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Case-insensitive regex for a condition value, compiled once per pattern.
///
/// Compile failures are cached too, so a bad pattern is reported without
/// being rebuilt for every row.
fn pattern(source: &str) -> CompiledPattern {
    if let Ok(cache) = pattern_cache().read() {
        if let Some(compiled) = cache.get(source) {
            return compiled.clone();
        }
    }

    let compiled = RegexBuilder::new(source)
        .case_insensitive(true)
        .build()
        .map_err(|e| EvalError::InvalidPattern {
            pattern: source.to_string(),
            message: e.to_string(),
        });
    if let Ok(mut cache) = pattern_cache().write() {
        cache.insert(source.to_string(), compiled.clone());
    }
    compiled
}

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\{(\w[\w\s]*)\}").unwrap_or_else(|e| unreachable!("placeholder regex: {e}"))
    })
}

/// Replace `{FieldName}` tokens with the record's normalized values.
///
/// Tokens naming absent fields become empty. Text that is not a token is left
/// as is, and substituted values are never expanded again.
pub fn resolve_outcome_label(template: &str, record: &Record) -> String {
    if !template.contains('{') {
        return template.to_string();
    }
    placeholder_regex()
        .replace_all(template, |caps: &Captures| normalize(record.get(&caps[1])))
        .into_owned()
}
