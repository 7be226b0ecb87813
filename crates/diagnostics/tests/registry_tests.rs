//! Tests for renderer dispatch through the registry.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use diagnostics::{
    DiagnosticRenderer, InputKind, MapInputs, PlotOutcome, PlotParameters, PlotSummary,
    RendererRegistry, SetInputs,
};
use diags_common::{Axis, DiagsError, DiagsResult, Field, MetricsDict};
use field_transform::difference;
use test_utils::{create_two_by_two_field, offset_field, temp_results_dir};

// ============================================================================
// Helper functions
// ============================================================================

fn params(results_dir: &std::path::Path) -> PlotParameters {
    PlotParameters {
        dpi: 25.0,
        results_dir: results_dir.to_path_buf(),
        case_id: "case".into(),
        output_file: "figure".into(),
        ..Default::default()
    }
}

fn map_inputs() -> SetInputs {
    let test = create_two_by_two_field("TS", "K", [250.0, 260.0, 270.0, 280.0]);
    let reference = offset_field(&test, 2.0);
    let diff = difference(&test, &reference).unwrap();
    let metrics = MetricsDict::compute(&test, &reference, &diff).unwrap();
    SetInputs::Map(Box::new(MapInputs {
        test,
        reference,
        diff,
        metrics,
        test_conf: None,
        ref_conf: None,
    }))
}

fn zonal(id: &str, values: Vec<f64>) -> Field {
    Field::series(id, Axis::latitude(vec![-60.0, -20.0, 20.0, 60.0]), values)
        .unwrap()
        .with_units("K")
}

struct CountingRenderer {
    calls: Arc<AtomicUsize>,
}

impl DiagnosticRenderer for CountingRenderer {
    fn set_name(&self) -> &str {
        "enso_diags"
    }

    fn input_kind(&self) -> InputKind {
        InputKind::Map
    }

    fn render(&self, _inputs: &SetInputs, _params: &PlotParameters) -> DiagsResult<PlotOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(PlotOutcome::Skipped {
            reason: "counting".into(),
        })
    }
}

// ============================================================================
// Dispatch
// ============================================================================

#[test]
fn test_render_map_through_registry() {
    let tmp = temp_results_dir();
    let registry = RendererRegistry::with_defaults();
    let outcome = registry.render("enso_diags", &map_inputs(), &params(tmp.path())).unwrap();
    assert!(outcome.is_saved());
    assert!(tmp.path().join("enso_diags/case/figure.png").is_file());
}

#[test]
fn test_render_zonal_mean_line() {
    let tmp = temp_results_dir();
    let registry = RendererRegistry::with_defaults();
    let inputs = SetInputs::Line {
        test: zonal("TS", vec![262.0, 290.0, 291.0, 258.0]),
        reference: zonal("TS", vec![260.0, 292.0, 293.0, 255.0]),
    };

    let outcome = registry.render("zonal_mean_xy", &inputs, &params(tmp.path())).unwrap();
    let saved = outcome.saved().unwrap();
    assert!(saved.paths[0].ends_with("zonal_mean_xy/case/figure.png"));
    let PlotSummary::Line(summary) = &saved.summary else {
        panic!("expected a line summary");
    };
    assert_eq!(summary.ylim, (255.0, 293.0));
    assert_eq!(summary.legend, vec!["Reference", "Test"]);
}

#[test]
fn test_unsupported_backend_is_an_error_at_dispatch() {
    let tmp = temp_results_dir();
    let mut params = params(tmp.path());
    params.backend = "vcs".into();
    let registry = RendererRegistry::with_defaults();
    let err = registry.render("enso_diags", &map_inputs(), &params).unwrap_err();
    assert!(matches!(err, DiagsError::UnsupportedBackend(ref b) if b == "vcs"));
}

#[test]
fn test_inputs_without_renderer() {
    let tmp = temp_results_dir();
    let registry = RendererRegistry::with_defaults();
    let err = registry
        .render("zonal_mean_xy", &map_inputs(), &params(tmp.path()))
        .unwrap_err();
    assert!(matches!(err, DiagsError::InvalidParameter { .. }));
}

#[test]
fn test_register_replaces_existing_renderer() {
    let tmp = temp_results_dir();
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = RendererRegistry::with_defaults();
    registry.register(Box::new(CountingRenderer { calls: calls.clone() }));

    let outcome = registry.render("enso_diags", &map_inputs(), &params(tmp.path())).unwrap();
    assert!(!outcome.is_saved());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    // the scatter renderer is untouched
    let enso = registry.dispatch("cartopy", "enso_diags").unwrap();
    assert_eq!(enso.kinds().count(), 2);
}

#[test]
fn test_outcome_serializes_with_status() {
    let outcome = PlotOutcome::Skipped {
        reason: "backend 'vcs' is not supported".into(),
    };
    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["status"], "skipped");
}
