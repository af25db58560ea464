mod common;

use assert_cmd::Command;
use common::{TestWorkspace, fixture_path};
use predicates::str::contains;
use serde_json::Value;

fn bin() -> Command {
    Command::cargo_bin("pim-hierarchy").expect("binary exists")
}

#[test]
fn analyze_writes_json_to_stdout() {
    let output = bin()
        .args(["analyze", "-i", fixture_path("catalogue.csv").to_str().unwrap()])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let value: Value = serde_json::from_slice(&output).expect("json output");
    assert_eq!(value["rowCount"], 20);
    assert_eq!(value["hierarchy"][0]["recordId"], "Category");
    assert_eq!(value["hierarchy"][1]["recordId"], "SKU");
    assert_eq!(value["hierarchy"][1]["recordName"], "Name");
    let weight = value["uomSuggestions"]
        .as_array()
        .expect("uom array")
        .iter()
        .find(|entry| entry["header"] == "Weight")
        .expect("weight suggestion");
    assert_eq!(weight["detectedUom"], "kg");
    assert!(value.get("trace").is_none());
}

#[test]
fn analyze_with_trace_wraps_result() {
    let workspace = TestWorkspace::new();
    let output_path = workspace.path().join("analysis.json");
    bin()
        .args([
            "analyze",
            "-i",
            fixture_path("catalogue.csv").to_str().unwrap(),
            "-o",
            output_path.to_str().unwrap(),
            "--trace",
        ])
        .assert()
        .success();
    let contents = std::fs::read_to_string(&output_path).expect("read output");
    let value: Value = serde_json::from_str(&contents).expect("json output");
    assert_eq!(value["result"]["columnCount"], 5);
    let stages: Vec<&str> = value["trace"]
        .as_array()
        .expect("trace entries")
        .iter()
        .filter_map(|entry| entry["stage"].as_str())
        .collect();
    assert_eq!(stages.first(), Some(&"profile"));
    assert!(stages.contains(&"conservation"));
}

#[test]
fn analyze_emits_yaml_on_request() {
    bin()
        .args([
            "analyze",
            "-i",
            fixture_path("catalogue.csv").to_str().unwrap(),
            "--format",
            "yaml",
        ])
        .assert()
        .success()
        .stdout(contains("recordId: Category"));
}

#[test]
fn tsv_input_is_detected_by_extension() {
    let output = bin()
        .args(["analyze", "-i", fixture_path("catalogue.tsv").to_str().unwrap()])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let value: Value = serde_json::from_slice(&output).expect("json output");
    assert_eq!(value["columnCount"], 3);
    assert_eq!(value["hierarchy"][0]["recordId"], "Category");
}

#[test]
fn custom_delimiter_and_forced_sku_flags_apply() {
    let workspace = TestWorkspace::new();
    let mut contents = String::from("Category;SKU;Name\n");
    for i in 0..12 {
        contents.push_str(&format!("{};S{i:02};Item {i}\n", ["Shoes", "Bags"][i % 2]));
    }
    let input = workspace.write("semicolon.csv", &contents);
    let output = bin()
        .args([
            "analyze",
            "-i",
            input.to_str().unwrap(),
            "--delimiter",
            "semicolon",
            "--forced-sku",
            "Category",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let value: Value = serde_json::from_slice(&output).expect("json output");
    assert_eq!(value["hierarchy"].as_array().map(Vec::len), Some(1));
    assert_eq!(value["config"]["forcedSkuHeaders"][0], "Category");
}

#[test]
fn config_file_sets_thresholds_and_flags_override_it() {
    let workspace = TestWorkspace::new();
    let config = workspace.write("thresholds.yaml", "skuThreshold: 0.9\nminPropertiesPerLevel: 2\n");
    let output = bin()
        .args([
            "analyze",
            "-i",
            fixture_path("catalogue.csv").to_str().unwrap(),
            "--config",
            config.to_str().unwrap(),
            "--min-properties",
            "4",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let value: Value = serde_json::from_slice(&output).expect("json output");
    assert_eq!(value["config"]["skuThreshold"], 0.9);
    assert_eq!(value["config"]["minPropertiesPerLevel"], 4);
}

#[test]
fn profile_prints_column_table() {
    bin()
        .args(["profile", "-i", fixture_path("catalogue.csv").to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("cardinality"))
        .stdout(contains("Category"))
        .stdout(contains("Weight"));
}

#[test]
fn presets_prints_each_alternative() {
    bin()
        .args(["presets", "-i", fixture_path("catalogue.csv").to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("Recommended (parent_variant"))
        .stdout(contains("Flat (flat"))
        .stdout(contains("Parent-Variant"));
}

#[test]
fn tree_prints_nested_counts() {
    bin()
        .args(["tree", "-i", fixture_path("catalogue.csv").to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("Category"))
        .stdout(contains("Shoes ("));
}

#[test]
fn ragged_rows_fail_with_row_index() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("ragged.csv", "Category,SKU\nShoes,A1\nBags\n");
    bin()
        .args(["analyze", "-i", input.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(contains("Row 1 has 1 value(s)"));
}

#[test]
fn out_of_range_threshold_is_rejected() {
    bin()
        .args([
            "analyze",
            "-i",
            fixture_path("catalogue.csv").to_str().unwrap(),
            "--sku-threshold",
            "1.5",
        ])
        .assert()
        .failure()
        .stderr(contains("skuThreshold"));
}

#[test]
fn missing_input_reports_path() {
    bin()
        .args(["profile", "-i", "does-not-exist.csv"])
        .assert()
        .failure()
        .stderr(contains("does-not-exist.csv"));
}
