//! Integration tests for the compare command

use crate::common::{assertions, sample_data, CliTestRunner};
use sheetdiff::SheetdiffError;

fn path_str(path: &std::path::Path) -> String {
    path.to_string_lossy().to_string()
}

#[test]
fn test_compare_json_sheets_writes_result() {
    let runner = CliTestRunner::new().unwrap();
    let fixture = runner.fixture();

    let template = fixture.create_json("roster.json", &sample_data::roster_template()).unwrap();
    let old = fixture.create_json("old.json", &sample_data::old_roster()).unwrap();
    let new = fixture.create_json("new.json", &sample_data::new_roster()).unwrap();

    runner.expect_success(&[
        "compare", &path_str(&old), &path_str(&new), "--template", &path_str(&template),
    ]);

    let result = assertions::read_json(&fixture.only_result_file()).unwrap();
    assert_eq!(result["summary"]["total"], 4);
    assert_eq!(result["summary"]["additions"], 1);
    assert_eq!(result["summary"]["deletions"], 1);
    assert_eq!(result["summary"]["changes"], 1);
    assert_eq!(result["summary"]["unchanged"], 1);

    let rows = result["rows"].as_array().unwrap();
    assert_eq!(rows[0]["source"], "B");
    assert_eq!(rows[0]["output_columns"]["Remarks"]["label"], "New starter");
    assert_eq!(rows[0]["output_columns"]["Remarks"]["color"], "#C6EFCE");
    assert_eq!(rows[1]["source"], "A");
    assert_eq!(rows[1]["output_columns"]["Remarks"]["label"], "Leaver");
    assert_eq!(rows[3]["values"]["name"], "Bob");
    assert_eq!(rows[3]["output_columns"]["Remarks"]["label"], "Bob went on leave");
    assert_eq!(rows[3]["output_columns"]["Remarks"]["color"], "#FFA500");
    assert_eq!(rows[3]["changed_fields"], serde_json::json!(["status"]));
    assert!(result.get("warnings").is_none());
}

#[test]
fn test_compare_csv_with_output_name_template() {
    let runner = CliTestRunner::new().unwrap();
    let fixture = runner.fixture();

    let template = fixture.create_json("prices.json", &sample_data::prices_template()).unwrap();
    let old = fixture.create_csv("january.csv", &sample_data::old_prices_csv()).unwrap();
    let new = fixture.create_csv("february.csv", &sample_data::new_prices_csv()).unwrap();

    runner.expect_success(&[
        "compare", &path_str(&old), &path_str(&new), "--template", &path_str(&template),
    ]);

    let result_path = fixture.workspace.result_path("january_vs_february").unwrap();
    let result = assertions::read_json(&result_path).unwrap();
    assert_eq!(result["summary"]["changes"], 1);
    assert_eq!(result["summary"]["unchanged"], 1);

    let changed = result["rows"]
        .as_array()
        .unwrap()
        .iter()
        .find(|row| row["values"]["sku"] == "A1")
        .unwrap();
    assert_eq!(changed["output_columns"]["Remarks"]["label"], "Changed");
    assert_eq!(changed["original_values"]["price"], "1.50");
    assert_eq!(changed["values"]["price"], "1.60");
}

#[test]
fn test_compare_with_saved_template_slug() {
    let runner = CliTestRunner::new().unwrap();
    let fixture = runner.fixture();

    let template = fixture.create_json("roster.json", &sample_data::roster_template()).unwrap();
    let old = fixture.create_json("old.json", &sample_data::old_roster()).unwrap();
    let new = fixture.create_json("new.json", &sample_data::new_roster()).unwrap();

    runner.expect_success(&["template", "save", &path_str(&template)]);
    runner.expect_success(&[
        "compare", &path_str(&old), &path_str(&new), "--template", "staff_roster", "--format", "json",
    ]);

    assertions::assert_file_exists_and_not_empty(&fixture.only_result_file());
}

#[test]
fn test_compare_explicit_output_path() {
    let runner = CliTestRunner::new().unwrap();
    let fixture = runner.fixture();

    let template = fixture.create_json("roster.json", &sample_data::roster_template()).unwrap();
    let old = fixture.create_json("old.json", &sample_data::old_roster()).unwrap();
    let new = fixture.create_json("new.json", &sample_data::new_roster()).unwrap();
    let output = fixture.root().join("out").join("diff.json");

    runner.expect_success(&[
        "compare", &path_str(&old), &path_str(&new),
        "--template", &path_str(&template),
        "--output", &path_str(&output),
    ]);

    assertions::assert_json_contains_keys(&output, &["rows", "summary"]).unwrap();
}

#[test]
fn test_preview_writes_nothing() {
    let runner = CliTestRunner::new().unwrap();
    let fixture = runner.fixture();

    let template = fixture.create_json("roster.json", &sample_data::roster_template()).unwrap();
    let old = fixture.create_json("old.json", &sample_data::old_roster()).unwrap();
    let new = fixture.create_json("new.json", &sample_data::new_roster()).unwrap();

    runner.expect_success(&[
        "compare", &path_str(&old), &path_str(&new), "--template", &path_str(&template), "--preview", "2",
    ]);
    runner.expect_success(&[
        "compare", &path_str(&old), &path_str(&new), "--template", &path_str(&template), "--preview",
    ]);

    let written = std::fs::read_dir(&fixture.workspace.results_dir).unwrap().count();
    assert_eq!(written, 0);
}

#[test]
fn test_sheet_override() {
    let runner = CliTestRunner::new().unwrap();
    let fixture = runner.fixture();

    let template = fixture.create_json("roster.json", &sample_data::roster_template()).unwrap();
    let old = fixture
        .create_json("old.json", &serde_json::json!({"Archive": sample_data::old_roster()["Staff"]}))
        .unwrap();
    let new = fixture.create_json("new.json", &sample_data::new_roster()).unwrap();

    let err = runner.expect_failure(&[
        "compare", &path_str(&old), &path_str(&new), "--template", &path_str(&template),
    ]);
    assert!(err.to_string().contains("Sheet 'Staff' not found"));

    runner.expect_success(&[
        "compare", &path_str(&old), &path_str(&new),
        "--template", &path_str(&template), "--sheet-a", "Archive",
    ]);
}

#[test]
fn test_unknown_template_fails() {
    let runner = CliTestRunner::new().unwrap();
    let fixture = runner.fixture();
    let old = fixture.create_json("old.json", &sample_data::old_roster()).unwrap();

    let err = runner.expect_failure(&[
        "compare", &path_str(&old), &path_str(&old), "--template", "no_such_template",
    ]);
    assert!(matches!(err, SheetdiffError::TemplateNotFound { .. }));
}

#[test]
fn test_invalid_format_rejected() {
    let runner = CliTestRunner::new().unwrap();
    let err = runner.expect_failure(&["info", "--format", "yaml"]);
    assert!(matches!(err, SheetdiffError::InvalidInput { .. }));
}

#[test]
fn test_output_name_cannot_escape_results_dir() {
    let runner = CliTestRunner::new().unwrap();
    let fixture = runner.fixture();

    let mut escaping = sample_data::prices_template();
    escaping["output_config"]["output_filename_template"] = serde_json::json!("../../escaped_{date}");
    let template = fixture.create_json("escape.json", &escaping).unwrap();
    let old = fixture.create_csv("january.csv", &sample_data::old_prices_csv()).unwrap();
    let new = fixture.create_csv("february.csv", &sample_data::new_prices_csv()).unwrap();

    let err = runner.expect_failure(&[
        "compare", &path_str(&old), &path_str(&new), "--template", &path_str(&template),
    ]);
    assert!(matches!(err, SheetdiffError::InvalidInput { .. }));

    let escaped = std::fs::read_dir(fixture.root())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .any(|entry| entry.file_name().to_string_lossy().starts_with("escaped_"));
    assert!(!escaped);
}
