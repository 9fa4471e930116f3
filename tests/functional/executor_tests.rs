//! Functional tests for end-to-end rule execution

use serde_json::json;
use sheetdiff::executor::{execute, RowSource, RuleExecutor};
use sheetdiff::record::record_from;
use sheetdiff::{ComparisonTemplate, EngineConfig, Record, SheetdiffError, Value};

fn template(compare_fields: &[&str], rules: serde_json::Value) -> ComparisonTemplate {
    ComparisonTemplate::from_json(&json!({
        "template_name": "Functional",
        "sheet_config": {"file_a_sheet": "Sheet1"},
        "column_mapping": {"unique_key": ["id"], "compare_fields": compare_fields},
        "rules": rules
    }))
    .unwrap()
}

fn row(pairs: &[(&str, &str)]) -> Record {
    record_from(pairs.iter().map(|(k, v)| (*k, Value::from(*v))))
}

#[test]
fn test_renamed_person_is_changed() {
    let t = template(&["name"], json!([]));
    let a = vec![row(&[("id", "1"), ("name", "Alice")])];
    let b = vec![row(&[("id", "1"), ("name", "Alicia")])];

    let result = execute(&t, &a, &b).unwrap();

    assert_eq!(result.rows.len(), 1);
    assert_eq!(result.rows[0].source, RowSource::Matched);
    assert_eq!(result.rows[0].changed_fields, vec!["name"]);
    assert_eq!(result.rows[0].remarks().unwrap().label, "Changed");
    assert_eq!(result.summary.changes, 1);
}

#[test]
fn test_addition_with_default_presence_rule() {
    let t = template(&["name"], json!([{"rule_type": "PRESENCE_RULE"}]));
    let b = vec![row(&[("id", "9"), ("name", "New")])];

    let result = execute(&t, &[], &b).unwrap();

    assert_eq!(result.rows.len(), 1);
    let remarks = result.rows[0].remarks().unwrap();
    assert_eq!(result.rows[0].source, RowSource::B);
    assert_eq!(remarks.label, "Addition");
    assert_eq!(remarks.color.as_deref(), Some("#C6EFCE"));
    assert_eq!(result.summary.additions, 1);
}

#[test]
fn test_duplicate_keys_reported() {
    let t = template(&["name"], json!([]));
    let a = vec![
        row(&[("id", "1"), ("name", "First")]),
        row(&[("id", "1"), ("name", "Second")]),
    ];
    let b = vec![row(&[("id", "1"), ("name", "First")])];

    let result = execute(&t, &a, &b).unwrap();

    let warnings = result.warnings.expect("duplicate warning expected");
    assert_eq!(warnings.duplicate_keys_a, Some(1));
    assert_eq!(warnings.duplicate_keys_b, None);
    assert_eq!(result.summary.unchanged, 1);
    assert_eq!(result.summary.deletions, 1);

    let deleted = result.rows.iter().find(|r| r.source == RowSource::A).unwrap();
    assert_eq!(deleted.values["name"], Value::from("Second"));
}

#[test]
fn test_status_cleared_condition() {
    let t = template(&["Status"], json!([
        {"rule_type": "CONDITION_RULE", "config": {
            "conditions": [{"field": "Status", "operator": "changed_to_empty"}],
            "outcome_label": "Status cleared"
        }}
    ]));
    let a = vec![row(&[("id", "1"), ("Status", "Active"), ("Other", "x")])];
    let b = vec![row(&[("id", "1"), ("Status", ""), ("Other", "y")])];

    let result = execute(&t, &a, &b).unwrap();
    let remarks = result.rows[0].remarks().unwrap();
    assert_eq!(remarks.label, "Status cleared");
    assert_eq!(remarks.color.as_deref(), Some("#FFC7CE"));
}

#[test]
fn test_fuzzy_threshold_controls_matching() {
    let rules = |threshold: f64| {
        json!([{"rule_type": "ROW_MATCH", "config": {"method": "fuzzy", "fuzzy_threshold": threshold}}])
    };
    let a = vec![row(&[("id", "ALICE SMITH"), ("dept", "HR")])];
    let b = vec![row(&[("id", "ALISE SMITH"), ("dept", "HR")])];

    let loose = execute(&template(&["dept"], rules(0.8)), &a, &b).unwrap();
    assert_eq!(loose.summary.unchanged, 1);
    assert_eq!(loose.rows.len(), 1);

    let strict = execute(&template(&["dept"], rules(0.95)), &a, &b).unwrap();
    assert_eq!(strict.summary.additions, 1);
    assert_eq!(strict.summary.deletions, 1);
    assert_eq!(strict.summary.unchanged, 0);
}

#[test]
fn test_fuzzy_row_limit_from_config() {
    let t = template(&[], json!([{"rule_type": "ROW_MATCH", "config": {"method": "fuzzy"}}]));
    let a: Vec<Record> = (0..5).map(|i| row(&[("id", &i.to_string())])).collect();
    let config = EngineConfig {
        fuzzy_row_limit: 4,
        ..EngineConfig::default()
    };

    let err = RuleExecutor::new(config).execute(&t, &a, &[]).unwrap_err();
    assert!(matches!(
        err,
        SheetdiffError::MatchSizeExceeded { side: 'A', rows: 5, limit: 4 }
    ));
}

#[test]
fn test_execution_is_deterministic() {
    let t = template(&["name", "city"], json!([
        {"rule_type": "PRESENCE_RULE"},
        {"rule_type": "CHANGE_RULE", "config": {"fields": ["city"], "outcome_label": "Moved to {city}"}}
    ]));
    let a: Vec<Record> = (0..30)
        .map(|i| row(&[("id", &i.to_string()), ("name", "n"), ("city", "Oslo")]))
        .collect();
    let b: Vec<Record> = (10..40)
        .map(|i| row(&[("id", &i.to_string()), ("name", "n"), ("city", if i % 2 == 0 { "Oslo" } else { "Bergen" })]))
        .collect();

    let first = serde_json::to_string(&execute(&t, &a, &b).unwrap()).unwrap();
    let second = serde_json::to_string(&execute(&t, &a, &b).unwrap()).unwrap();
    assert_eq!(first, second);

    let result = execute(&t, &a, &b).unwrap();
    assert_eq!(result.summary.total, 40);
    let moved = result
        .rows
        .iter()
        .find(|r| r.values["id"] == Value::from("11"))
        .unwrap();
    assert_eq!(moved.remarks().unwrap().label, "Moved to Bergen");
}

#[test]
fn test_summary_partitions_rows() {
    let t = template(&["v"], json!([]));
    let a = vec![
        row(&[("id", "1"), ("v", "a")]),
        row(&[("id", "2"), ("v", "b")]),
        row(&[("id", "3"), ("v", "c")]),
    ];
    let b = vec![
        row(&[("id", "2"), ("v", "b")]),
        row(&[("id", "3"), ("v", "z")]),
        row(&[("id", "4"), ("v", "d")]),
    ];

    let s = execute(&t, &a, &b).unwrap().summary;
    assert_eq!(s.total, s.additions + s.deletions + s.changes + s.unchanged);
    assert_eq!((s.additions, s.deletions, s.changes, s.unchanged), (1, 1, 1, 1));
}

#[test]
fn test_invalid_typed_template_rejected() {
    let mut t = template(&["name"], json!([]));
    t.column_mapping.unique_key.clear();

    let err = execute(&t, &[], &[]).unwrap_err();
    assert!(matches!(err, SheetdiffError::Validation { .. }));
}

#[test]
fn test_ordering_additions_deletions_matched() {
    let t = template(&["v"], json!([]));
    let a = vec![row(&[("id", "1"), ("v", "a")]), row(&[("id", "2"), ("v", "a")])];
    let b = vec![row(&[("id", "2"), ("v", "a")]), row(&[("id", "3"), ("v", "a")])];

    let sources: Vec<RowSource> = execute(&t, &a, &b).unwrap().rows.iter().map(|r| r.source).collect();
    assert_eq!(sources, vec![RowSource::B, RowSource::A, RowSource::Matched]);
}
