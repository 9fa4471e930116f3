//! Unit tests for workspace management functionality

use serde_json::json;
use sheetdiff::workspace::SheetdiffWorkspace;
use sheetdiff::EngineConfig;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_workspace_layout() {
    let temp_dir = TempDir::new().unwrap();
    let workspace = SheetdiffWorkspace::create_new(temp_dir.path().to_path_buf()).unwrap();

    assert_eq!(workspace.root, temp_dir.path());
    assert_eq!(workspace.sheetdiff_dir, temp_dir.path().join(".sheetdiff"));
    assert_eq!(workspace.templates_dir, temp_dir.path().join(".sheetdiff").join("templates"));
    assert_eq!(workspace.results_dir, temp_dir.path().join(".sheetdiff").join("results"));
    assert_eq!(
        workspace.result_path("jan").unwrap().parent().unwrap(),
        workspace.results_dir
    );
}

#[test]
fn test_workspace_find_existing() {
    let temp_dir = TempDir::new().unwrap();
    let parent_workspace = SheetdiffWorkspace::create_new(temp_dir.path().to_path_buf()).unwrap();

    let sub_dir = temp_dir.path().join("subdir");
    fs::create_dir(&sub_dir).unwrap();

    let found = SheetdiffWorkspace::find_or_create(Some(&sub_dir)).unwrap();
    assert_eq!(found.root, parent_workspace.root);
}

#[test]
fn test_workspace_find_or_create_new() {
    let temp_dir = TempDir::new().unwrap();
    let workspace = SheetdiffWorkspace::find_or_create(Some(temp_dir.path())).unwrap();
    assert!(workspace.sheetdiff_dir.exists());
}

#[test]
fn test_config_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let workspace = SheetdiffWorkspace::create_new(temp_dir.path().to_path_buf()).unwrap();

    fs::write(
        workspace.config_path(),
        r#"{"version": "1.0.0", "fuzzy_row_limit": 10, "parallel_rows": false}"#,
    )
    .unwrap();
    let config = workspace.load_config().unwrap();
    assert_eq!(config.fuzzy_row_limit, 10);
    assert!(!config.parallel_rows);
    assert_eq!(config.preview_rows, EngineConfig::default().preview_rows);
}

#[test]
fn test_missing_config_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let workspace = SheetdiffWorkspace::from_root(temp_dir.path().to_path_buf());
    assert_eq!(workspace.load_config().unwrap(), EngineConfig::default());
}

#[test]
fn test_slug_rejects_path_separators() {
    let temp_dir = TempDir::new().unwrap();
    let workspace = SheetdiffWorkspace::create_new(temp_dir.path().to_path_buf()).unwrap();
    let template = json!({
        "template_name": "T",
        "sheet_config": {"file_a_sheet": "S"},
        "column_mapping": {"unique_key": ["id"]},
        "rules": []
    });

    assert!(workspace.save_template(&template, Some("../escape")).is_err());
    assert_eq!(workspace.save_template(&template, None).unwrap(), "t");
}

#[test]
fn test_list_skips_unreadable_templates() {
    let temp_dir = TempDir::new().unwrap();
    let workspace = SheetdiffWorkspace::create_new(temp_dir.path().to_path_buf()).unwrap();
    fs::write(workspace.template_path("junk"), "not json").unwrap();
    fs::write(workspace.templates_dir.join("notes.txt"), "hello").unwrap();

    assert!(workspace.list_templates().unwrap().is_empty());
}
