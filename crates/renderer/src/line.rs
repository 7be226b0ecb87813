//! Test vs reference line plot over a shared 1-D coordinate, used for zonal
//! means.

use diags_common::{DiagsError, DiagsResult, Field};
use serde::Serialize;
use tracing::debug;

use plotters::prelude::{Color, EmptyElement, LineSeries as PolyLine, PathElement};

use crate::chart::{
    chart_error, draw_chart, rgb, widen, Chart, ChartAxes, ChartStyle, LegendCorner,
};
use crate::figure::{Figure, PageRect, BLACK};
use crate::text::{HAlign, TextStyle, VAlign};

/// Plot area in page coordinates.
pub const LINE_AXES: PageRect = PageRect::new(0.123, 0.55, 0.737, 0.35);

const TITLE_Y: f64 = 0.92;
const UNITS_POS: (f64, f64) = (0.855, 0.91);

/// Test line color.
const TEST_COLOR: [u8; 4] = [220, 40, 30, 255];

/// A named 1-D series. NaN y values leave gaps.
#[derive(Debug, Clone, PartialEq)]
pub struct LineSeries {
    pub label: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl LineSeries {
    pub fn new(label: impl Into<String>, x: Vec<f64>, y: Vec<f64>) -> DiagsResult<Self> {
        if x.len() != y.len() {
            return Err(DiagsError::ShapeMismatch {
                expected: vec![x.len()],
                actual: vec![y.len()],
            });
        }
        Ok(Self {
            label: label.into(),
            x,
            y,
        })
    }

    /// Series along the single non-degenerate axis of `field`; masked cells
    /// become gaps.
    pub fn from_field(field: &Field, label: impl Into<String>) -> DiagsResult<Self> {
        let mut axes = field.axes().iter().filter(|a| a.len() > 1);
        let (Some(axis), None) = (axes.next(), axes.next()) else {
            return Err(DiagsError::InvalidField(format!(
                "'{}' is not one-dimensional: shape {:?}",
                field.id(),
                field.shape()
            )));
        };
        let y = (0..field.len()).map(|i| field.value(i).unwrap_or(f64::NAN)).collect();
        Self::new(label, axis.values.clone(), y)
    }

    fn finite_y(&self) -> impl Iterator<Item = f64> + '_ {
        self.y.iter().copied().filter(|v| v.is_finite())
    }

    /// Runs of consecutive finite points.
    fn segments(&self) -> Vec<Vec<(f64, f64)>> {
        let mut out = Vec::new();
        let mut current = Vec::new();
        for (&x, &y) in self.x.iter().zip(&self.y) {
            if x.is_finite() && y.is_finite() {
                current.push((x, y));
            } else if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
        }
        if !current.is_empty() {
            out.push(current);
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineSummary {
    pub xlim: (f64, f64),
    pub ylim: (f64, f64),
    pub segments: usize,
    pub legend: Vec<String>,
}

/// Draw `reference` (black) and `test` (red) in one box.
///
/// The y range spans the minimum and maximum of both series.
pub fn plot_line_comparison(
    figure: &mut Figure,
    test: &LineSeries,
    reference: &LineSeries,
    title: &str,
    units: &str,
    xlabel: &str,
) -> DiagsResult<LineSummary> {
    let ys: Vec<f64> = test.finite_y().chain(reference.finite_y()).collect();
    if ys.is_empty() {
        return Err(DiagsError::InvalidField("both line series are empty".into()));
    }
    let ylim = ys
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let xlim = test
        .x
        .iter()
        .chain(&reference.x)
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let xlim = widen(xlim, "xlim")?;
    let ylim = widen(ylim, "ylim")?;

    let axes = ChartAxes {
        xlim,
        ylim,
        xlabel: Some(xlabel),
        ylabel: None,
        legend: Some(LegendCorner::UpperRight),
    };
    let series = [(reference, BLACK), (test, TEST_COLOR)];
    let segments = draw_chart(figure, LINE_AXES, &axes, |chart, style| {
        let mut segments = 0;
        for (line, color) in &series {
            segments += draw_line(chart, style, line, *color)?;
        }
        Ok(segments)
    })?;

    let (tx, ty) = figure.page_point(0.5, TITLE_Y);
    let title_style = TextStyle::new(figure.points(12.0)).align(HAlign::Center, VAlign::Baseline);
    figure.text(tx, ty, title, &title_style);
    figure.page_text(UNITS_POS.0, UNITS_POS.1, units, 9.0, HAlign::Right);

    debug!(segments, ?xlim, ?ylim, "Line comparison layout");
    Ok(LineSummary {
        xlim,
        ylim,
        segments,
        legend: series.iter().map(|(line, _)| line.label.clone()).collect(),
    })
}

/// Draw each finite run of `line`; returns the number of runs.
fn draw_line(
    chart: &mut Chart<'_, '_>,
    style: &ChartStyle,
    line: &LineSeries,
    color: [u8; 4],
) -> DiagsResult<usize> {
    let color = rgb(color);
    let width = style.line_px;
    let runs = line.segments();
    for run in &runs {
        if let [point] = run.as_slice() {
            // An isolated point is drawn as a short tick so it stays visible.
            let tick = width as i32 * 2;
            chart
                .draw_series(std::iter::once(
                    EmptyElement::at(*point)
                        + PathElement::new(vec![(-tick, 0), (tick, 0)], color.stroke_width(width)),
                ))
                .map_err(chart_error)?;
        } else {
            chart
                .draw_series(PolyLine::new(run.iter().copied(), color.stroke_width(width)))
                .map_err(chart_error)?;
        }
    }

    // A series with no points still gets a legend row.
    let key = style.legend_key_px;
    chart
        .draw_series(std::iter::empty::<PathElement<(f64, f64)>>())
        .map_err(chart_error)?
        .label(line.label.as_str())
        .legend(move |(x, y)| {
            PathElement::new(vec![(x, y), (x + key, y)], color.stroke_width(width))
        });
    Ok(runs.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use diags_common::Axis;

    #[test]
    fn test_segments_split_at_gaps() {
        let series = LineSeries::new(
            "t",
            vec![0.0, 1.0, 2.0, 3.0, 4.0],
            vec![1.0, f64::NAN, 2.0, 3.0, f64::NAN],
        )
        .unwrap();
        let runs = series.segments();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[1], vec![(2.0, 2.0), (3.0, 3.0)]);
    }

    #[test]
    fn test_from_field_uses_long_axis() {
        let field = Field::new(
            "TS",
            vec![Axis::time(vec![0.0]), Axis::latitude(vec![-45.0, 0.0, 45.0])],
            vec![270.0, 300.0, 275.0],
        )
        .unwrap()
        .with_mask(vec![false, true, false])
        .unwrap();
        let series = LineSeries::from_field(&field, "Test").unwrap();
        assert_eq!(series.x, vec![-45.0, 0.0, 45.0]);
        assert!(series.y[1].is_nan());
    }

    #[test]
    fn test_from_field_rejects_2d() {
        let field = Field::lat_lon("TS", vec![0.0, 1.0], vec![0.0, 1.0], vec![0.0; 4]).unwrap();
        assert!(LineSeries::from_field(&field, "Test").is_err());
    }
}
