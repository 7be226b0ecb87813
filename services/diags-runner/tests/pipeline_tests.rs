//! End-to-end tests for the diagnostics runner pipeline.
//!
//! Data files are written as CDL text, which the reader accepts directly.

use std::fs;
use std::path::Path;

use diags_runner::{parse_run_config, prepare_inputs, JobStatus, Pipeline, RunConfig};
use diagnostics::SetInputs;
use tempfile::TempDir;

// ============================================================================
// Helper functions
// ============================================================================

fn grid_cdl(name: &str, var: &str, units: &str, values: &[f64]) -> String {
    format!(
        r#"netcdf {name} {{
dimensions:
	lat = 2 ;
	lon = 4 ;
variables:
	double lat(lat) ;
		lat:units = "degrees_north" ;
	double lon(lon) ;
		lon:units = "degrees_east" ;
	double {var}(lat, lon) ;
		{var}:units = "{units}" ;
data:

 lat = -45, 45 ;

 lon = 45, 135, 225, 315 ;

 {var} = {values} ;
}}
"#,
        values = join(values)
    )
}

fn zonal_cdl(name: &str, var: &str, values: &[f64]) -> String {
    format!(
        r#"netcdf {name} {{
dimensions:
	lat = {n} ;
variables:
	double lat(lat) ;
		lat:units = "degrees_north" ;
	double {var}(lat) ;
		{var}:units = "K" ;
data:

 lat = {lats} ;

 {var} = {values} ;
}}
"#,
        n = values.len(),
        lats = join(&(0..values.len()).map(|i| -60.0 + 30.0 * i as f64).collect::<Vec<_>>()),
        values = join(values)
    )
}

fn series_cdl(name: &str, var: &str, units: &str, values: &[f64]) -> String {
    format!(
        r#"netcdf {name} {{
dimensions:
	time = {n} ;
variables:
	double time(time) ;
		time:units = "months since 2000-01-01" ;
	double {var}(time) ;
		{var}:units = "{units}" ;
data:

 time = {times} ;

 {var} = {values} ;
}}
"#,
        n = values.len(),
        times = join(&(0..values.len()).map(|i| i as f64).collect::<Vec<_>>()),
        values = join(values)
    )
}

fn join(values: &[f64]) -> String {
    values.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", ")
}

/// Writes the data files of a small run into `dir`.
fn write_data(dir: &Path) {
    let ts_test = [280.0, 285.0, 290.0, 295.0, 270.0, 275.0, 280.0, 285.0];
    let ts_ref = [279.0, 284.0, 291.0, 293.0, 271.0, 274.0, 279.0, 286.0];
    let files = [
        ("ts_test.cdl", grid_cdl("ts_test", "TS", "K", &ts_test)),
        ("ts_ref.cdl", grid_cdl("ts_ref", "TS", "K", &ts_ref)),
        (
            "landfrac.cdl",
            grid_cdl("landfrac", "LANDFRAC", "fraction", &[0.0, 0.2, 0.9, 1.0, 0.6, 0.1, 0.0, 1.0]),
        ),
        ("zonal_test.cdl", zonal_cdl("zonal_test", "TS", &[255.0, 280.0, 300.0, 281.0, 256.0])),
        ("zonal_ref.cdl", zonal_cdl("zonal_ref", "TS", &[250.0, 279.0, 302.0, 280.0, 252.0])),
        (
            "nino_test.cdl",
            series_cdl("nino_test", "NINO34", "degC", &[-2.0, -1.0, -0.5, 0.5, 1.0, 2.0]),
        ),
        ("nino_ref.cdl", series_cdl("nino_ref", "NINO34", "degC", &[-1.5, -0.5, 0.5, 1.5])),
        (
            "prect_test.cdl",
            series_cdl("prect_test", "PRECT", "mm/day", &[-1.0, -0.5, -0.2, 0.6, 1.2, 2.4]),
        ),
        ("prect_ref.cdl", series_cdl("prect_ref", "PRECT", "mm/day", &[-0.9, -0.3, 0.7, 2.1])),
    ];
    for (name, text) in files {
        fs::write(dir.join(name), text).unwrap();
    }
}

fn run_file(results: &Path) -> String {
    format!(
        r#"
parameters:
  results_dir: {results}
  case_id: e2e
  dpi: 25
  contour_levels: [5, 10, 15, 20]
  diff_levels: [-2, -1, 0, 1, 2]
jobs:
  - name: ts-map
    set: enso_diags
    kind: map
    test: {{ path: ts_test.cdl, var: TS }}
    reference: {{ path: ts_ref.cdl, var: TS }}
    units: degC
    mask: {{ path: landfrac.cdl, var: LANDFRAC, high_limit: 0.5 }}
    overrides:
      output_file: ts-map
      output_format_subplot: [png]
  - name: ts-zonal
    set: zonal_mean_xy
    kind: line
    test: {{ path: zonal_test.cdl, var: TS }}
    reference: {{ path: zonal_ref.cdl, var: TS }}
    overrides: {{ output_file: ts-zonal }}
  - name: prect-scatter
    set: enso_diags
    kind: scatter
    x:
      test: {{ path: nino_test.cdl, var: NINO34 }}
      reference: {{ path: nino_ref.cdl, var: NINO34 }}
    y:
      test: {{ path: prect_test.cdl, var: PRECT }}
      reference: {{ path: prect_ref.cdl, var: PRECT }}
    overrides: {{ output_file: prect-scatter }}
"#,
        results = results.display()
    )
}

fn setup() -> (TempDir, TempDir, RunConfig) {
    let data = TempDir::new().unwrap();
    let results = TempDir::new().unwrap();
    write_data(data.path());
    let config = parse_run_config(&run_file(results.path()), data.path()).unwrap();
    (data, results, config)
}

// ============================================================================
// Input preparation
// ============================================================================

#[test]
fn test_map_inputs_are_converted_and_masked() {
    let (_data, _results, config) = setup();
    let SetInputs::Map(map) = prepare_inputs(&config.jobs[0]).unwrap() else {
        panic!("expected map inputs");
    };

    assert_eq!(map.test.units(), Some("degC"));
    assert!((map.test.data()[0] - 6.85).abs() < 1e-9);
    // land fraction above 0.5 is masked in both fields
    let expected = [false, false, true, true, true, false, false, true];
    assert_eq!(map.test.mask().unwrap(), &expected);
    assert_eq!(map.reference.mask().unwrap(), &expected);
    assert!(map.metrics.diff.rmse.is_some());
}

#[test]
fn test_scatter_inputs_use_variable_names() {
    let (_data, _results, config) = setup();
    let SetInputs::Scatter { x, y } = prepare_inputs(&config.jobs[2]).unwrap() else {
        panic!("expected scatter inputs");
    };
    assert_eq!(x.axis_label(), "NINO34 anomaly (degC)");
    assert_eq!(y.axis_label(), "PRECT anomaly (mm/day)");
    assert_eq!(y.test.len(), 6);
    assert_eq!(y.reference.len(), 4);
}

// ============================================================================
// Full runs
// ============================================================================

#[test]
fn test_run_all_jobs() {
    let (_data, results, config) = setup();
    let reports = Pipeline::new(config).run(None);
    assert_eq!(reports.len(), 3);
    assert!(reports.iter().all(|r| !r.is_failure()), "{:?}", reports);

    let root = results.path();
    assert!(root.join("enso_diags/e2e/ts-map.png").is_file());
    for i in 0..3 {
        assert!(root.join(format!("enso_diags/e2e/ts-map.{}.png", i)).is_file());
    }
    assert!(root.join("zonal_mean_xy/e2e/ts-zonal.png").is_file());
    assert!(root.join("enso_diags/e2e/prect-scatter.png").is_file());

    let map = reports.iter().find(|r| r.name == "ts-map").unwrap();
    match &map.status {
        JobStatus::Saved { paths } => assert_eq!(paths.len(), 4),
        other => panic!("unexpected status {:?}", other),
    }
}

#[test]
fn test_set_filter() {
    let (_data, results, config) = setup();
    let reports = Pipeline::new(config).run(Some("zonal_mean_xy"));
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].name, "ts-zonal");
    assert!(!results.path().join("enso_diags").exists());
}

#[test]
fn test_failed_job_does_not_stop_others() {
    let (data, _results, mut config) = setup();
    fs::remove_file(data.path().join("zonal_ref.cdl")).unwrap();
    config.jobs[0].overrides.insert("backend".into(), serde_yaml::Value::from("vcs"));

    let reports = Pipeline::new(config).run(None);
    let status = |name: &str| &reports.iter().find(|r| r.name == name).unwrap().status;

    match status("ts-zonal") {
        JobStatus::Failed { error } => assert!(error.contains("zonal_ref.cdl"), "{}", error),
        other => panic!("expected failure, got {:?}", other),
    }
    match status("ts-map") {
        JobStatus::Failed { error } => assert!(error.contains("vcs"), "{}", error),
        other => panic!("expected failure, got {:?}", other),
    }
    assert!(matches!(status("prect-scatter"), JobStatus::Saved { .. }));
}

#[test]
fn test_report_serializes() {
    let (_data, _results, config) = setup();
    let reports = Pipeline::new(config).run(Some("zonal_mean_xy"));
    let json = serde_json::to_value(&reports).unwrap();
    assert_eq!(json[0]["status"]["status"], "saved");
    assert_eq!(json[0]["set"], "zonal_mean_xy");
}
