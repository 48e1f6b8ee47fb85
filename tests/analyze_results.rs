use std::fs;
use std::path::Path;

use approx::assert_relative_eq;
use backtest_analyzer::data::{load, save};
use backtest_analyzer::metrics::tracking_error_line;
use backtest_analyzer::validation::FileOutcome;
use backtest_analyzer::{
    analyze, tracking_error, AnalyzerConfig, AnalyzerError, LoaderError, MetricsError,
    ResultAnalyzer,
};

const SCENARIO: &str = r#"[
    {"date": "2024-01-01", "price": 10, "value": 10.5},
    {"date": "2024-01-03", "price": 12, "value": 11},
    {"date": "2024-01-02", "price": 11, "value": 10.8}
]"#;

fn write(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_analyze_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "results.json", SCENARIO);

    let (te, chart) = analyze(&path).expect("analysis failed");
    assert_relative_eq!(te, -0.1, epsilon = 1e-12);
    assert_eq!(tracking_error_line(te), "Tracking error: -10.00%");
    assert_eq!(chart.lines.len(), 2);
    assert_eq!(chart.lines[0].points.len(), 3);
}

#[test]
fn test_zero_first_price() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        dir.path(),
        "zero.json",
        r#"[{"date": "2024-01-02", "price": 5, "value": 5},
            {"date": "2024-01-01", "price": 0, "value": 1}]"#,
    );

    let err = analyze(&path).unwrap_err();
    assert!(matches!(
        err,
        AnalyzerError::Metrics(MetricsError::DivisionByZero)
    ));
}

#[test]
fn test_empty_array_loads_but_has_no_tracking_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "empty.json", "[]");

    let series = load(&path).expect("empty array should load");
    assert!(series.is_empty());
    assert!(matches!(
        tracking_error(&series),
        Err(MetricsError::InsufficientData(_))
    ));
}

#[test]
fn test_invalid_json_is_malformed() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "broken.json", "[{\"date\": ");

    assert!(matches!(load(&path), Err(LoaderError::MalformedInput(_))));
}

#[test]
fn test_save_then_load_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let source = write(
        dir.path(),
        "source.json",
        r#"[
            {"date": "2024-01-02T10:15:00", "price": 11, "value": 10.8,
             "deltas": [0.5, 0.25], "deltasStdDev": [0.01, 0.02], "priceStdDev": 0.03},
            {"date": "2024-01-01", "price": 10, "value": 10.5}
        ]"#,
    );

    let original = load(&source).unwrap();
    let copy = dir.path().join("copy.json");
    save(&original, &copy).unwrap();
    let reloaded = load(&copy).unwrap();

    assert_eq!(original, reloaded);
    assert_eq!(reloaded.records()[1].deltas, Some(vec![0.5, 0.25]));
}

#[test]
fn test_chart_written_only_on_request() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "results.json", SCENARIO);

    let (_, chart) = analyze(&path).unwrap();
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);

    let svg = dir.path().join("chart.svg");
    chart.save_svg(&svg).unwrap();
    let contents = fs::read_to_string(&svg).unwrap();
    assert!(contents.contains("<svg"));
}

#[test]
fn test_summarize_folder_reports_failures_per_file() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a_output.json", SCENARIO);
    write(dir.path(), "b_output.json", "[]");
    write(dir.path(), "notes.txt", "not a result file");

    let batch = ResultAnalyzer::default()
        .summarize_folder(dir.path())
        .unwrap();

    assert_eq!(batch.len(), 2);
    let first = batch[0].result.as_ref().expect("first file should succeed");
    assert_relative_eq!(first.tracking_error, -0.1, epsilon = 1e-12);
    assert!(batch[0].line().starts_with("a_output.json: Tracking error: -10.00%"));
    assert!(batch[1].result.is_err());
    assert!(batch[1].line().contains("error"));
}

#[test]
fn test_check_folder_uses_configured_fields() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a_output.json", SCENARIO);
    write(dir.path(), "b_output.json", "{ not json");

    let config = AnalyzerConfig::from_yaml(
        "validation:\n  expected_fields: [date, price, value, priceStdDev]\n",
    )
    .unwrap();
    let report = ResultAnalyzer::new(config).check_folder(dir.path()).unwrap();

    assert_eq!(report.files.len(), 2);
    assert!(!report.all_passed());
    assert_eq!(
        report.files[0].outcome,
        FileOutcome::MissingFields(vec!["priceStdDev".to_string()])
    );
    assert!(matches!(report.files[1].outcome, FileOutcome::Unparseable(_)));
    assert!(report.summary().ends_with("0/2 files have the expected structure"));
}

#[test]
fn test_shipped_config_matches_defaults() {
    let config = AnalyzerConfig::load("config/default.yaml").unwrap();
    assert_eq!(config, AnalyzerConfig::default());
}
