//! Anomaly scatter plot with least-squares regime fits.
//!
//! Test points are black squares and reference points red circles. Each
//! series gets one fit over all points when the y variable is `TAUX`, and
//! otherwise separate fits for positive and negative x anomalies.

use diags_common::{DiagsError, DiagsResult};
use plotters::prelude::{Circle, Color, EmptyElement, PathElement, Rectangle};
use serde::Serialize;
use tracing::{debug, warn};

use crate::chart::{
    chart_error, dashes, draw_chart, rgb, Chart, ChartAxes, ChartStyle, LegendCorner,
};
use crate::figure::{Figure, PageRect, BLACK};

/// Plot area in page coordinates.
pub const SCATTER_AXES: PageRect = PageRect::new(0.125, 0.11, 0.775, 0.77);

const RED: [u8; 4] = [255, 0, 0, 255];

/// Scatter marker shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Square,
    Circle,
}

/// One variable's anomalies for the test and reference runs.
#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyPair {
    pub var: String,
    pub units: String,
    pub test: Vec<f64>,
    pub reference: Vec<f64>,
}

impl AnomalyPair {
    pub fn new(
        var: impl Into<String>,
        units: impl Into<String>,
        test: Vec<f64>,
        reference: Vec<f64>,
    ) -> Self {
        Self {
            var: var.into(),
            units: units.into(),
            test,
            reference,
        }
    }

    /// Axis label, e.g. `TS anomaly (K)`.
    pub fn axis_label(&self) -> String {
        format!("{} anomaly ({})", self.var, self.units)
    }
}

/// Titles used for the two series in the legend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScatterLabels {
    pub test_title: String,
    pub test_name_yrs: String,
    pub reference_title: String,
    pub ref_name_yrs: String,
}

impl ScatterLabels {
    pub fn test_label(&self) -> String {
        series_label(&self.test_title, "Test", &self.test_name_yrs)
    }

    pub fn reference_label(&self) -> String {
        series_label(&self.reference_title, "Reference", &self.ref_name_yrs)
    }
}

fn series_label(title: &str, default: &str, years: &str) -> String {
    let mut label = if title.is_empty() { default.to_string() } else { title.to_string() };
    if !years.is_empty() {
        label.push_str(" : ");
        label.push_str(years);
    }
    label
}

/// `y = intercept + slope * x`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    pub fn at(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Ordinary least-squares line through the points.
///
/// Returns `None` for fewer than two points or when all x are equal.
pub fn linear_fit(x: &[f64], y: &[f64]) -> Option<LinearFit> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }
    let mean_x = x[..n].iter().sum::<f64>() / n as f64;
    let mean_y = y[..n].iter().sum::<f64>() / n as f64;
    let (sxx, sxy) = x[..n]
        .iter()
        .zip(&y[..n])
        .fold((0.0, 0.0), |(sxx, sxy), (&xi, &yi)| {
            let dx = xi - mean_x;
            (sxx + dx * dx, sxy + dx * (yi - mean_y))
        });
    if sxx == 0.0 || !sxx.is_finite() {
        return None;
    }
    let slope = sxy / sxx;
    Some(LinearFit {
        slope,
        intercept: mean_y - slope * mean_x,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Series {
    Test,
    Reference,
}

impl Series {
    fn name(self) -> &'static str {
        match self {
            Series::Test => "Test",
            Series::Reference => "Reference",
        }
    }

    fn color(self) -> [u8; 4] {
        match self {
            Series::Test => BLACK,
            Series::Reference => RED,
        }
    }

    fn marker(self) -> Marker {
        match self {
            Series::Test => Marker::Square,
            Series::Reference => Marker::Circle,
        }
    }
}

/// Which points a fit covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Regime {
    All,
    /// x > 0
    Positive,
    /// x < 0
    Negative,
}

impl Regime {
    fn prefix(self) -> &'static str {
        match self {
            Regime::All => "",
            Regime::Positive => "positive ",
            Regime::Negative => "negative ",
        }
    }

    fn selects(self, x: f64) -> bool {
        match self {
            Regime::All => true,
            Regime::Positive => x > 0.0,
            Regime::Negative => x < 0.0,
        }
    }

    /// Span the fit line is drawn over, given the series' x range.
    fn span(self, (xmin, xmax): (f64, f64)) -> (f64, f64) {
        match self {
            Regime::All => (xmin, xmax),
            Regime::Positive => (0.0, xmax),
            Regime::Negative => (xmin, 0.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitLine {
    pub series: Series,
    pub regime: Regime,
    pub fit: LinearFit,
    pub span: (f64, f64),
    pub dashed: bool,
    pub label: String,
}

/// A regime whose line was not drawn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRegime {
    pub series: Series,
    pub regime: Regime,
    pub points: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterSummary {
    pub fits: Vec<FitLine>,
    pub skipped: Vec<SkippedRegime>,
    pub xlim: (f64, f64),
    pub ylim: (f64, f64),
    pub xlabel: String,
    pub ylabel: String,
    pub legend: Vec<String>,
}

/// Draw the scatter of `y` against `x` with regime fits into `figure`.
pub fn plot_scatter(
    figure: &mut Figure,
    x: &AnomalyPair,
    y: &AnomalyPair,
    labels: &ScatterLabels,
) -> DiagsResult<ScatterSummary> {
    let test = paired_points(&x.test, &y.test, "test")?;
    let reference = paired_points(&x.reference, &y.reference, "reference")?;

    let regimes: &[Regime] = if y.var == "TAUX" {
        &[Regime::All]
    } else {
        &[Regime::Positive, Regime::Negative]
    };

    let mut fits = Vec::new();
    let mut skipped = Vec::new();
    for (series, points) in [(Series::Test, &test), (Series::Reference, &reference)] {
        let x_range = x_extent(points);
        for &regime in regimes {
            let (xs, ys): (Vec<f64>, Vec<f64>) =
                points.iter().filter(|(px, _)| regime.selects(*px)).copied().unzip();
            match linear_fit(&xs, &ys) {
                Some(fit) => fits.push(FitLine {
                    series,
                    regime,
                    fit,
                    span: regime.span(x_range),
                    dashed: regime == Regime::Negative,
                    label: format!(
                        "Linear fit for {}TS anomalies: {} (slope = {:.2})",
                        regime.prefix(),
                        series.name(),
                        fit.slope
                    ),
                }),
                None => {
                    warn!(
                        series = series.name(),
                        regime = ?regime,
                        points = xs.len(),
                        "Not enough spread to fit regime; skipping line"
                    );
                    skipped.push(SkippedRegime {
                        series,
                        regime,
                        points: xs.len(),
                    });
                }
            }
        }
    }

    let max_abs = |pts: &[(f64, f64)]| pts.iter().map(|(_, v)| v.abs()).fold(0.0, f64::max);
    let limit = max_abs(&test).max(max_abs(&reference)) + 1.0;
    let ylim = (-limit, limit);
    let xlim = x_limits(&test, &reference, &fits);

    let xlabel = x.axis_label();
    let ylabel = y.axis_label();
    let series_labels = [
        (Series::Test, labels.test_label()),
        (Series::Reference, labels.reference_label()),
    ];
    let axes = ChartAxes {
        xlim,
        ylim,
        xlabel: Some(xlabel.as_str()),
        ylabel: Some(ylabel.as_str()),
        legend: Some(LegendCorner::UpperLeft),
    };

    draw_chart(figure, SCATTER_AXES, &axes, |chart, style| {
        for line in &fits {
            if let Some(ends) = clip_fit(&line.fit, line.span, ylim) {
                draw_fit(chart, style, line, ends)?;
            }
        }
        for ((series, label), points) in series_labels.iter().zip([&test, &reference]) {
            draw_markers(chart, style, *series, label, points)?;
        }
        Ok(())
    })?;

    let mut legend: Vec<String> = fits.iter().map(|f| f.label.clone()).collect();
    legend.extend(series_labels.into_iter().map(|(_, label)| label));

    debug!(fits = fits.len(), skipped = skipped.len(), ?xlim, ?ylim, "Scatter layout");
    Ok(ScatterSummary {
        fits,
        skipped,
        xlim,
        ylim,
        xlabel,
        ylabel,
        legend,
    })
}

fn draw_fit<'a>(
    chart: &mut Chart<'a, 'a>,
    style: &ChartStyle,
    line: &FitLine,
    (from, to): ((f64, f64), (f64, f64)),
) -> DiagsResult<()> {
    let color = rgb(line.series.color());
    let width = style.line_px;
    let key = style.legend_key_px;
    let anno = if line.dashed {
        let anno = chart
            .draw_series(
                dashes(from, to)
                    .into_iter()
                    .map(|dash| PathElement::new(dash, color.stroke_width(width))),
            )
            .map_err(chart_error)?;
        anno.legend(move |(x, y)| {
            EmptyElement::at((x, y))
                + PathElement::new(vec![(0, 0), (key * 2 / 5, 0)], color.stroke_width(width))
                + PathElement::new(vec![(key * 3 / 5, 0), (key, 0)], color.stroke_width(width))
        })
    } else {
        let anno = chart
            .draw_series(std::iter::once(PathElement::new(
                vec![from, to],
                color.stroke_width(width),
            )))
            .map_err(chart_error)?;
        anno.legend(move |(x, y)| {
            PathElement::new(vec![(x, y), (x + key, y)], color.stroke_width(width))
        })
    };
    anno.label(line.label.as_str());
    Ok(())
}

fn draw_markers(
    chart: &mut Chart<'_, '_>,
    style: &ChartStyle,
    series: Series,
    label: &str,
    points: &[(f64, f64)],
) -> DiagsResult<()> {
    let color = rgb(series.color());
    let half = style.marker_px;
    match series.marker() {
        Marker::Square => {
            chart
                .draw_series(points.iter().map(|&p| {
                    EmptyElement::at(p)
                        + Rectangle::new([(-half, -half), (half, half)], color.filled())
                }))
                .map_err(chart_error)?
                .label(label)
                .legend(move |(x, y)| {
                    Rectangle::new([(x - half, y - half), (x + half, y + half)], color.filled())
                });
        }
        Marker::Circle => {
            chart
                .draw_series(points.iter().map(|&p| Circle::new(p, half, color.filled())))
                .map_err(chart_error)?
                .label(label)
                .legend(move |(x, y)| Circle::new((x, y), half, color.filled()));
        }
    }
    Ok(())
}

/// Part of the fit line over `span` whose y stays inside `ylim`.
fn clip_fit(
    fit: &LinearFit,
    span: (f64, f64),
    ylim: (f64, f64),
) -> Option<((f64, f64), (f64, f64))> {
    let (mut x0, mut x1) = span;
    if fit.slope != 0.0 {
        let a = (ylim.0 - fit.intercept) / fit.slope;
        let b = (ylim.1 - fit.intercept) / fit.slope;
        x0 = x0.max(a.min(b));
        x1 = x1.min(a.max(b));
    } else if !(ylim.0..=ylim.1).contains(&fit.intercept) {
        return None;
    }
    (x0 < x1).then(|| ((x0, fit.at(x0)), (x1, fit.at(x1))))
}

/// Zip x and y anomalies, dropping non-finite pairs.
fn paired_points(x: &[f64], y: &[f64], series: &str) -> DiagsResult<Vec<(f64, f64)>> {
    if x.len() != y.len() {
        return Err(DiagsError::ShapeMismatch {
            expected: vec![x.len()],
            actual: vec![y.len()],
        });
    }
    let points: Vec<(f64, f64)> = x
        .iter()
        .zip(y)
        .map(|(&a, &b)| (a, b))
        .filter(|(a, b)| a.is_finite() && b.is_finite())
        .collect();
    if points.is_empty() {
        return Err(DiagsError::invalid_parameter(
            series,
            "no finite anomaly pairs to plot",
        ));
    }
    Ok(points)
}

fn x_extent(points: &[(f64, f64)]) -> (f64, f64) {
    points
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(x, _)| (lo.min(x), hi.max(x)))
}

/// Data extent (points and fit spans) plus a 5% margin.
fn x_limits(test: &[(f64, f64)], reference: &[(f64, f64)], fits: &[FitLine]) -> (f64, f64) {
    let (t0, t1) = x_extent(test);
    let (r0, r1) = x_extent(reference);
    let (mut lo, mut hi) = (t0.min(r0), t1.max(r1));
    for line in fits {
        lo = lo.min(line.span.0);
        hi = hi.max(line.span.1);
    }
    let margin = (hi - lo) * 0.05;
    (lo - margin, hi + margin)
}
