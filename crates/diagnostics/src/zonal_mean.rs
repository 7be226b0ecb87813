//! Zonal mean line plots: test against reference along latitude.

use diags_common::{AxisKind, DiagsResult, Field};
use renderer::{plot_line_comparison, Figure, LineSeries};

use crate::outcome::{PlotOutcome, PlotSummary, SavedPlot};
use crate::output::{file_stem, save_figure};
use crate::parameter::PlotParameters;

pub const SET_NAME: &str = "zonal_mean_xy";

fn xlabel(field: &Field) -> String {
    match field.axes().iter().find(|a| a.len() > 1) {
        Some(axis) if axis.kind == AxisKind::Latitude => "Latitude".to_string(),
        Some(axis) => axis.name.clone(),
        None => String::new(),
    }
}

fn series_label(title: &str, default: &str) -> String {
    if title.is_empty() {
        default.to_string()
    } else {
        title.to_string()
    }
}

/// Draw `test` and `reference` as lines and save the figure.
///
/// Both fields must have a single non-degenerate axis.
pub fn plot_zonal_mean(
    test: &Field,
    reference: &Field,
    params: &PlotParameters,
) -> DiagsResult<PlotOutcome> {
    params.validate()?;
    let test_series = LineSeries::from_field(test, series_label(&params.test_title, "Test"))?;
    let ref_label = series_label(&params.reference_title, "Reference");
    let ref_series = LineSeries::from_field(reference, ref_label)?;

    let mut figure = Figure::new(params.figsize, params.dpi)?;
    let summary = plot_line_comparison(
        &mut figure,
        &test_series,
        &ref_series,
        &params.main_title,
        test.units().unwrap_or_default(),
        &xlabel(test),
    )?;

    let set = if params.current_set.is_empty() {
        SET_NAME
    } else {
        &params.current_set
    };
    let stem = file_stem(set, params)?;
    let paths = save_figure(&figure, &stem, &params.output_format)?;

    Ok(PlotOutcome::Saved(SavedPlot {
        paths,
        subplot_paths: Vec::new(),
        summary: PlotSummary::Line(summary),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use diags_common::Axis;

    #[test]
    fn test_xlabel_names_long_axis() {
        let lat = Axis::latitude(vec![-30.0, 0.0, 30.0]);
        let zonal = Field::series("TS", lat, vec![1.0, 2.0, 3.0]).unwrap();
        assert_eq!(xlabel(&zonal), "Latitude");

        let lev = Axis::level(vec![1000.0, 500.0]);
        let profile = Field::series("T", lev, vec![280.0, 250.0]).unwrap();
        assert_eq!(xlabel(&profile), profile.axes()[0].name);
    }
}
