//! ENSO diagnostics figures: the three-panel comparison map and the anomaly
//! scatter with regime fits.

use diags_common::{DiagsResult, Field, MetricsDict, StatsBundle};
use renderer::{
    plot_panel_map, AnomalyPair, Figure, PanelSpec, ScatterLabels, TitleTriplet, PANELS,
    SUBPLOT_BORDER,
};
use tracing::{debug, warn};

use crate::outcome::{PlotOutcome, PlotSummary, SavedPlot};
use crate::output::{file_stem, save_figure, save_subplots};
use crate::parameter::PlotParameters;

pub const SET_NAME: &str = "enso_diags";

const MAP_SUPTITLE_Y: f64 = 0.97;
const SCATTER_SUPTITLE_Y: f64 = 0.93;

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

fn set_name(params: &PlotParameters) -> &str {
    if params.current_set.is_empty() {
        SET_NAME
    } else {
        &params.current_set
    }
}

/// Draw test, reference and difference panels and save the figure.
///
/// The test and reference panels use `contour_levels`, the difference panel
/// `diff_levels`. Confidence hatching only applies to the test and reference
/// panels.
pub fn plot_map(
    reference: &Field,
    test: &Field,
    diff: &Field,
    metrics: &MetricsDict,
    ref_conf: Option<&Field>,
    test_conf: Option<&Field>,
    params: &PlotParameters,
) -> DiagsResult<PlotOutcome> {
    if !params.backend_supported() {
        warn!(backend = %params.backend, "Skipping map plot for unsupported backend");
        return Ok(PlotOutcome::Skipped {
            reason: format!("backend '{}' is not supported", params.backend),
        });
    }
    params.validate()?;
    let region = params.region()?;

    let panels: [(&Field, &[f64], &str, TitleTriplet, Option<&Field>, &StatsBundle); 3] = [
        (
            test,
            &params.contour_levels,
            &params.test_colormap,
            TitleTriplet::new(
                non_empty(&params.test_name_yrs),
                non_empty(&params.test_title),
                test.units().map(str::to_string),
            ),
            test_conf,
            &metrics.test,
        ),
        (
            reference,
            &params.contour_levels,
            &params.reference_colormap,
            TitleTriplet::new(
                non_empty(&params.ref_name_yrs),
                non_empty(&params.reference_title),
                reference.units().map(str::to_string),
            ),
            ref_conf,
            &metrics.reference,
        ),
        (
            diff,
            &params.diff_levels,
            &params.diff_colormap,
            TitleTriplet::new(
                None,
                non_empty(&params.diff_title),
                test.units().map(str::to_string),
            ),
            None,
            &metrics.diff,
        ),
    ];

    let mut figure = Figure::new(params.figsize, params.dpi)?;
    let mut summaries = Vec::with_capacity(panels.len());
    let panels = panels.into_iter().enumerate();
    for (i, (field, levels, colormap, titles, confidence, stats)) in panels {
        let spec = PanelSpec {
            field,
            levels,
            colormap,
            titles,
            region: &region,
            confidence,
            stats: Some(stats),
        };
        summaries.push(plot_panel_map(&mut figure, i, &spec)?);
    }
    figure.suptitle(&params.main_title, MAP_SUPTITLE_Y);

    let stem = file_stem(set_name(params), params)?;
    let paths = save_figure(&figure, &stem, &params.output_format)?;
    let rects: Vec<_> = PANELS.iter().map(|p| p.with_border(SUBPLOT_BORDER)).collect();
    let subplot_paths = save_subplots(&figure, &stem, &rects, &params.output_format_subplot)?;
    debug!(files = paths.len() + subplot_paths.len(), "Map figure written");

    Ok(PlotOutcome::Saved(SavedPlot {
        paths,
        subplot_paths,
        summary: PlotSummary::Map { panels: summaries },
    }))
}

/// Scatter `y` anomalies against `x` anomalies for test and reference and
/// save the figure.
pub fn plot_scatter(
    x: &AnomalyPair,
    y: &AnomalyPair,
    params: &PlotParameters,
) -> DiagsResult<PlotOutcome> {
    params.validate()?;
    let labels = ScatterLabels {
        test_title: params.test_title.clone(),
        test_name_yrs: params.test_name_yrs.clone(),
        reference_title: params.reference_title.clone(),
        ref_name_yrs: params.ref_name_yrs.clone(),
    };

    let mut figure = Figure::new(params.figsize, params.dpi)?;
    let summary = renderer::plot_scatter(&mut figure, x, y, &labels)?;
    figure.suptitle(&params.main_title, SCATTER_SUPTITLE_Y);

    let stem = file_stem(set_name(params), params)?;
    let paths = save_figure(&figure, &stem, &params.output_format)?;

    Ok(PlotOutcome::Saved(SavedPlot {
        paths,
        subplot_paths: Vec::new(),
        summary: PlotSummary::Scatter(summary),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_name_prefers_current_set() {
        let mut params = PlotParameters::default();
        assert_eq!(set_name(&params), "enso_diags");
        params.current_set = "enso_diags_map".into();
        assert_eq!(set_name(&params), "enso_diags_map");
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(""), None);
        assert_eq!(non_empty("v2"), Some("v2".to_string()));
    }
}
