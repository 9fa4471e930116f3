//! Edge case tests for input data handling

use crate::common::{CliTestRunner, TestFixture};
use serde_json::json;
use sheetdiff::loader::RecordLoader;
use sheetdiff::{execute, ComparisonTemplate, SheetdiffError, Value};

fn id_template(compare: &[&str]) -> ComparisonTemplate {
    ComparisonTemplate::from_json(&json!({
        "template_name": "Edge",
        "sheet_config": {"file_a_sheet": "Sheet1"},
        "column_mapping": {"unique_key": ["id"], "compare_fields": compare},
        "rules": []
    }))
    .unwrap()
}

#[test]
fn test_integer_and_float_keys_match() {
    let fixture = TestFixture::new().unwrap();
    let a_path = fixture.create_json("a.json", &json!([{"id": 1, "qty": 2}])).unwrap();
    let b_path = fixture.create_json("b.json", &json!([{"id": 1.0, "qty": 2.0}])).unwrap();

    let loader = RecordLoader::default();
    let a = loader.load(&a_path, "Sheet1").unwrap();
    let b = loader.load(&b_path, "Sheet1").unwrap();

    let result = execute(&id_template(&["qty"]), &a, &b).unwrap();
    assert_eq!(result.summary.unchanged, 1);
    assert_eq!(result.rows.len(), 1);
}

#[test]
fn test_csv_text_against_json_numbers() {
    let fixture = TestFixture::new().unwrap();
    let a_path = fixture.create_csv("a.csv", &[vec!["id", "qty"], vec!["7", "3"]]).unwrap();
    let b_path = fixture.create_json("b.json", &json!([{"id": 7, "qty": 3}])).unwrap();

    let loader = RecordLoader::default();
    let a = loader.load(&a_path, "ignored").unwrap();
    let b = loader.load(&b_path, "ignored").unwrap();

    let result = execute(&id_template(&["qty"]), &a, &b).unwrap();
    assert_eq!(result.summary.unchanged, 1);
}

#[test]
fn test_whitespace_only_difference_is_not_a_change() {
    let a = vec![sheetdiff::record::record_from([("id", "1"), ("name", "Ann ")])];
    let b = vec![sheetdiff::record::record_from([("id", " 1"), ("name", "Ann")])];

    let result = execute(&id_template(&["name"]), &a, &b).unwrap();
    assert_eq!(result.summary.unchanged, 1);
    assert_eq!(result.rows[0].remarks().unwrap().label, "");
}

#[test]
fn test_unicode_csv() {
    let fixture = TestFixture::new().unwrap();
    let path = fixture
        .create_csv("u.csv", &[vec!["id", "name"], vec!["1", "Café ☕"], vec!["2", "北京"]])
        .unwrap();

    let records = RecordLoader::default().load(&path, "Sheet1").unwrap();
    assert_eq!(records[1]["name"], Value::from("北京"));
}

#[test]
fn test_header_row_offset_from_template() {
    let runner = CliTestRunner::new().unwrap();
    let fixture = runner.fixture();

    let template = fixture
        .create_json("t.json", &json!({
            "template_name": "Offset",
            "sheet_config": {"file_a_sheet": "Sheet1", "header_row": 1},
            "column_mapping": {"unique_key": ["id"], "compare_fields": ["v"]},
            "rules": []
        }))
        .unwrap();
    let a = fixture.create_csv("a.csv", &[vec!["Report title"], vec!["id", "v"], vec!["1", "x"]]).unwrap();
    let b = fixture.create_csv("b.csv", &[vec!["Report title"], vec!["id", "v"], vec!["1", "y"]]).unwrap();
    let output = fixture.root().join("offset.json");

    runner.expect_success(&[
        "compare", &a.to_string_lossy(), &b.to_string_lossy(),
        "--template", &template.to_string_lossy(),
        "--output", &output.to_string_lossy(),
    ]);

    let result: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(result["summary"]["changes"], 1);
}

#[test]
fn test_nested_json_rows_rejected() {
    let fixture = TestFixture::new().unwrap();
    let path = fixture
        .create_json("nested.json", &json!([{"id": 1, "tags": ["a", "b"]}]))
        .unwrap();

    let err = RecordLoader::default().load(&path, "Sheet1").unwrap_err();
    assert!(matches!(err, SheetdiffError::Json(_)));
}

#[test]
fn test_missing_input_file() {
    let fixture = TestFixture::new().unwrap();
    let err = RecordLoader::default()
        .load(&fixture.root().join("absent.csv"), "Sheet1")
        .unwrap_err();
    assert!(err.to_string().contains("File not found"));
}

#[test]
fn test_empty_inputs_produce_empty_result() {
    let result = execute(&id_template(&["v"]), &[], &[]).unwrap();
    assert!(result.rows.is_empty());
    assert_eq!(result.summary.total, 0);
    assert!(result.warnings.is_none());
}
