use serde_json::Value;
use sheetplot::compiler::{build_chart, build_grouped_charts};
use sheetplot::config::ChartConfig;
use sheetplot::data::SheetGrid;
use sheetplot::header::{analyze_header_level, groups_by_header_level, load_worksheet};
use sheetplot::reconcile::Reconciled;
use sheetplot::sanitize::SanitizeRules;
use sheetplot::session::{ChartSession, EditOutcome};
use sheetplot::surface::MemorySurface;
use std::fs;
use std::process::{Command, Stdio};

/// Helper function to run sheetplot with arguments
fn run_sheetplot(args: &[&str]) -> Result<Vec<u8>, String> {
    let output = Command::new("cargo")
        .args(["run", "--quiet", "--bin", "sheetplot", "--"])
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| format!("Failed to spawn process: {}", e))?;

    if output.status.success() {
        Ok(output.stdout)
    } else {
        Err(String::from_utf8_lossy(&output.stderr).to_string())
    }
}

fn run_json(args: &[&str]) -> Value {
    let stdout = run_sheetplot(args).unwrap_or_else(|e| panic!("sheetplot failed: {}", e));
    serde_json::from_slice(&stdout).expect("Output is not valid JSON")
}

/// Check if bytes are a valid PNG
fn is_valid_png(bytes: &[u8]) -> bool {
    bytes.len() > 8 && bytes[0..8] == [137, 80, 78, 71, 13, 10, 26, 10]
}

fn load_csv(path: &str) -> SheetGrid {
    let csv = fs::read_to_string(path).expect("Failed to read test CSV");
    SheetGrid::from_csv_reader("Sheet1", csv.as_bytes()).expect("Failed to parse test CSV")
}

fn scatter_values(chart: &Value, column: &str) -> Vec<f64> {
    chart["series"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["type"] == "scatter" && s["column"] == column)
        .unwrap_or_else(|| panic!("no scatter series for {}", column))["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["coordinates"][1].as_f64().unwrap())
        .collect()
}

// =============================================================================
// Library pipeline
// =============================================================================

#[test]
fn test_pipeline_robot_medians() {
    let ws = load_worksheet(&load_csv("test/robot.csv"), "-");
    assert_eq!(ws.header_row_count, 1);
    assert_eq!(ws.columns, vec!["序号", "机械手-X", "机械手-Y"]);

    let chart = build_chart(&ws, &SanitizeRules::default()).unwrap();
    assert_eq!(chart.columns(), &["机械手-X", "机械手-Y"]);

    let boxplot = chart.boxplot().unwrap();
    let medians: Vec<f64> = boxplot.tooltips.iter().map(|t| t.stats.as_ref().unwrap().median).collect();
    assert_eq!(medians, vec![3.0, 4.0]);
    assert!(chart.scatter_series().all(|(_, s)| s.data.len() == 3));
}

#[test]
fn test_pipeline_multilevel_groups() {
    let ws = load_worksheet(&load_csv("test/multilevel.csv"), "-");
    assert_eq!(ws.header_row_count, 2);
    assert_eq!(
        ws.columns,
        vec!["序号", "机械手A-X", "机械手A-Y", "机械手B-X", "机械手B-Y"]
    );
    assert!(analyze_header_level(&ws.header_rows).is_multi_level);

    let groups = groups_by_header_level(&ws, "-");
    let charts = build_grouped_charts(&ws, &groups, &SanitizeRules::default());
    let names: Vec<&str> = charts.iter().map(|c| c.group.as_str()).collect();
    assert_eq!(names, vec!["X", "Y"]);

    // The average row is not charted
    let x = &charts[0].chart;
    assert!(x.scatter_series().all(|(_, s)| s.data.len() == 3));
    assert_eq!(x.title.as_ref().unwrap().text, "X analysis");
}

#[test]
fn test_session_patches_after_filtered_rows() {
    let config = ChartConfig::default();
    let mut session = ChartSession::open(load_csv("test/summary_rows.csv"), MemorySurface::default(), &config).unwrap();

    // Grid row 5 is "3,11,21", after an empty row and a max row
    let outcome = session.commit_edit(5, 1, "99").unwrap();
    assert_eq!(outcome, EditOutcome::Patched(Reconciled::PatchedSeries));

    let chart = session.chart().unwrap();
    let (_, a) = chart.scatter_series().find(|(_, s)| s.column == "A").unwrap();
    let ys: Vec<f64> = a.data.iter().map(|p| p.y()).collect();
    assert_eq!(ys, vec![10.0, 12.0, 99.0, 13.0]);

    // Box plot still shows the pre-edit quartiles until the next rebuild
    assert_eq!(chart.boxplot().unwrap().data[0].median(), Some(11.5));

    let outcome = session.commit_edit(5, 1, "oops").unwrap();
    assert_eq!(outcome, EditOutcome::Rebuilt(2));
    let chart = session.chart().unwrap();
    assert_eq!(chart.boxplot().unwrap().data[0].median(), Some(12.0));
}

// =============================================================================
// Binary
// =============================================================================

#[test]
fn test_cli_json_output() {
    let chart = run_json(&["test/robot.csv"]);
    assert_eq!(chart["xAxis"]["labels"], serde_json::json!(["机械手-X", "机械手-Y"]));
    assert_eq!(chart["series"][0]["type"], "boxplot");
    assert_eq!(scatter_values(&chart, "机械手-X"), vec![1.0, 3.0, 5.0]);
    assert_eq!(chart["generation"], 1);
}

#[test]
fn test_cli_edit_patch_and_rebuild() {
    let patched = run_json(&["test/summary_rows.csv", "--edit", "B6=99"]);
    assert_eq!(scatter_values(&patched, "A"), vec![10.0, 12.0, 99.0, 13.0]);
    assert_eq!(patched["generation"], 1);

    let rebuilt = run_json(&["test/summary_rows.csv", "--edit", "B6=abc"]);
    assert_eq!(scatter_values(&rebuilt, "A"), vec![10.0, 12.0, 13.0]);
    assert_eq!(rebuilt["generation"], 2);
}

#[test]
fn test_cli_grouped() {
    let charts = run_json(&["test/multilevel.csv", "--grouped"]);
    let charts = charts.as_array().unwrap();
    assert_eq!(charts.len(), 2);
    assert_eq!(charts[1]["group"], "Y");
    assert_eq!(charts[1]["chart"]["title"]["text"], "Y analysis");
}

#[test]
fn test_cli_json_grid() {
    let chart = run_json(&["test/grid.json", "--json"]);
    assert_eq!(scatter_values(&chart, "Left"), vec![0.5, 0.25]);
    assert_eq!(scatter_values(&chart, "Right"), vec![0.75, 1.5, 2.0]);
}

#[test]
fn test_cli_layout_with_merges() {
    let layout = run_json(&["test/multilevel.csv", "--format", "layout", "--merge", "B1:C1", "--merge", "D1:E1"]);
    assert_eq!(layout["merges"], serde_json::json!(["B1:C1", "D1:E1"]));
    assert_eq!(layout["rows"]["0"]["cells"]["1"]["merge"], serde_json::json!([0, 1]));
    assert_eq!(layout["rows"]["0"]["cells"]["1"]["text"], "机械手A");
}

#[test]
fn test_cli_png_output() {
    let bytes = run_sheetplot(&["test/robot.csv", "--format", "png"]).expect("png render failed");
    assert!(is_valid_png(&bytes), "Output is not a valid PNG");
}

#[test]
fn test_cli_svg_with_edit() {
    let bytes = run_sheetplot(&["test/robot.csv", "--format", "svg", "--edit", "B3=30"]).expect("svg render failed");
    let svg = String::from_utf8(bytes).unwrap();
    assert!(svg.contains("<svg"));
}

#[test]
fn test_cli_no_chartable_data() {
    let result = run_sheetplot(&["test/no_numbers.csv"]);
    assert!(result.is_err());
    assert!(result.unwrap_err().contains("No chartable data"));
}

#[test]
fn test_cli_rejects_bad_edit() {
    let result = run_sheetplot(&["test/robot.csv", "--edit", "nonsense"]);
    assert!(result.is_err());
    assert!(result.unwrap_err().contains("CELL=VALUE"));
}

#[test]
fn test_cli_rejects_row_past_sheet_limit() {
    let result = run_sheetplot(&["test/robot.csv", "--edit", "A99999999999=1"]);
    assert!(result.is_err());
    assert!(result.unwrap_err().contains("Error: Invalid edit"));
}
