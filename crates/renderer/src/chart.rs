//! Cartesian charts drawn with `plotters` onto a region of a [`Figure`].
//!
//! The figure's pixels are handed to a `BitMapBackend` as an RGB buffer, so
//! charts share the page with text and panels drawn by the rest of the crate.

use diags_common::{DiagsError, DiagsResult};
use once_cell::sync::Lazy;
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;
use plotters::style::{register_font, FontStyle};
use tracing::{debug, warn};

use crate::figure::{Figure, PageRect};
use crate::text::FONT_DATA;

/// Font family registered with plotters.
pub const FONT_FAMILY: &str = "sans-serif";

/// Tick labels requested per axis.
const MAX_TICKS: usize = 9;
/// Dashes per dashed line.
const DASH_COUNT: usize = 16;

static FONT_REGISTERED: Lazy<bool> = Lazy::new(|| {
    match register_font(FONT_FAMILY, FontStyle::Normal, FONT_DATA) {
        Ok(()) => true,
        Err(_) => {
            warn!("Failed to register chart font");
            false
        }
    }
});

/// A chart over `f64` data coordinates drawing into a figure buffer.
pub type Chart<'a, 'b> =
    ChartContext<'a, BitMapBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

/// Corner of the plot area holding the legend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegendCorner {
    UpperLeft,
    UpperRight,
}

impl LegendCorner {
    fn position(self) -> SeriesLabelPosition {
        match self {
            LegendCorner::UpperLeft => SeriesLabelPosition::UpperLeft,
            LegendCorner::UpperRight => SeriesLabelPosition::UpperRight,
        }
    }
}

/// Limits and decorations of one chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartAxes<'s> {
    pub xlim: (f64, f64),
    pub ylim: (f64, f64),
    pub xlabel: Option<&'s str>,
    pub ylabel: Option<&'s str>,
    pub legend: Option<LegendCorner>,
}

/// Pixel sizes derived from the figure's dpi.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartStyle {
    pub tick_px: u32,
    pub desc_px: u32,
    pub legend_px: u32,
    pub frame_px: u32,
    pub line_px: u32,
    pub marker_px: i32,
    pub legend_key_px: i32,
    x_label_area: u32,
    y_label_area: u32,
}

impl ChartStyle {
    pub fn for_figure(figure: &Figure) -> Self {
        let px = |pt: f32| figure.points(pt).round().max(1.0);
        Self {
            tick_px: px(8.0) as u32,
            desc_px: px(10.0) as u32,
            legend_px: px(8.0) as u32,
            frame_px: px(0.8) as u32,
            line_px: px(1.5) as u32,
            marker_px: (px(1.4) as i32).max(1),
            legend_key_px: px(20.0) as i32,
            x_label_area: px(30.0) as u32,
            y_label_area: px(42.0) as u32,
        }
    }
}

/// Map any plotters failure into the crate error.
pub fn chart_error<E: std::fmt::Display>(e: E) -> DiagsError {
    DiagsError::RenderError(format!("chart drawing failed: {}", e))
}

/// Plotters color for an RGBA byte color; alpha is ignored.
pub fn rgb(color: [u8; 4]) -> RGBColor {
    RGBColor(color[0], color[1], color[2])
}

/// Draw a chart whose plotting area is `area` (page coordinates).
///
/// Tick labels and axis titles sit outside the area. `draw` adds the data
/// series; the legend and a full frame are drawn after it.
pub fn draw_chart<R, F>(
    figure: &mut Figure,
    area: PageRect,
    axes: &ChartAxes<'_>,
    draw: F,
) -> DiagsResult<R>
where
    F: for<'c> FnOnce(&mut Chart<'c, 'c>, &ChartStyle) -> DiagsResult<R>,
{
    if !*FONT_REGISTERED {
        debug!("Drawing chart without a registered font");
    }
    let xlim = widen(axes.xlim, "xlim")?;
    let ylim = widen(axes.ylim, "ylim")?;
    let style = ChartStyle::for_figure(figure);
    let plot = figure.to_pixels(area);

    let left = plot.left.round().max(0.0) as u32;
    let top = plot.top.round().max(0.0) as u32;
    let y_area = style.y_label_area.min(left);
    let x_area = style.x_label_area;
    let width = (plot.width().round().max(1.0) as u32) + y_area;
    let height = (plot.height().round().max(1.0) as u32) + x_area;

    figure.with_rgb(|buffer, size| {
        let root = BitMapBackend::with_buffer(buffer, size).into_drawing_area();
        let region = root.shrink((left - y_area, top), (width, height));

        let mut chart = ChartBuilder::on(&region)
            .margin(0)
            .x_label_area_size(x_area)
            .y_label_area_size(y_area)
            .build_cartesian_2d(xlim.0..xlim.1, ylim.0..ylim.1)
            .map_err(chart_error)?;

        let mut mesh = chart.configure_mesh();
        mesh.disable_mesh()
            .x_labels(MAX_TICKS)
            .y_labels(MAX_TICKS)
            .x_label_formatter(&format_tick)
            .y_label_formatter(&format_tick)
            .label_style((FONT_FAMILY, style.tick_px))
            .axis_desc_style((FONT_FAMILY, style.desc_px))
            .axis_style(BLACK.stroke_width(style.frame_px));
        if let Some(label) = axes.xlabel {
            mesh.x_desc(label);
        }
        if let Some(label) = axes.ylabel {
            mesh.y_desc(label);
        }
        mesh.draw().map_err(chart_error)?;

        let result = draw(&mut chart, &style)?;

        if let Some(corner) = axes.legend {
            chart
                .configure_series_labels()
                .position(corner.position())
                .margin(style.legend_px)
                .label_font((FONT_FAMILY, style.legend_px))
                .background_style(WHITE.mix(0.9))
                .border_style(RGBColor(204, 204, 204))
                .draw()
                .map_err(chart_error)?;
        }

        chart
            .plotting_area()
            .draw(&Rectangle::new(
                [(xlim.0, ylim.0), (xlim.1, ylim.1)],
                BLACK.stroke_width(style.frame_px),
            ))
            .map_err(chart_error)?;
        region.present().map_err(chart_error)?;
        Ok(result)
    })
}

/// Shortest decimal rendering of a tick value, without trailing zeros.
pub fn format_tick(value: &f64) -> String {
    let text = format!("{:.4}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    match text {
        "-0" | "" => "0".to_string(),
        _ => text.to_string(),
    }
}

/// Split the segment `from`..`to` into `DASH_COUNT` dashes.
pub fn dashes(from: (f64, f64), to: (f64, f64)) -> Vec<Vec<(f64, f64)>> {
    let lerp = |t: f64| (from.0 + (to.0 - from.0) * t, from.1 + (to.1 - from.1) * t);
    let period = 1.0 / DASH_COUNT as f64;
    (0..DASH_COUNT)
        .map(|i| {
            let start = i as f64 * period;
            vec![lerp(start), lerp(start + period * 0.6)]
        })
        .collect()
}

/// Reject non-finite limits and widen an empty range around its value.
pub fn widen(lim: (f64, f64), name: &str) -> DiagsResult<(f64, f64)> {
    let (lo, hi) = lim;
    if !lo.is_finite() || !hi.is_finite() {
        return Err(DiagsError::invalid_parameter(
            name,
            format!("axis limits must be finite, got ({}, {})", lo, hi),
        ));
    }
    if hi > lo {
        return Ok((lo, hi));
    }
    let half = if lo == 0.0 { 1.0 } else { lo.abs() * 0.05 };
    Ok((lo.min(hi) - half, lo.max(hi) + half))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_tick_trims_zeros() {
        assert_eq!(format_tick(&2.0), "2");
        assert_eq!(format_tick(&0.5), "0.5");
        assert_eq!(format_tick(&-2.5), "-2.5");
        assert_eq!(format_tick(&0.25), "0.25");
        assert_eq!(format_tick(&-0.00001), "0");
        assert_eq!(format_tick(&120.0), "120");
    }

    #[test]
    fn test_dashes_cover_the_segment() {
        let parts = dashes((0.0, 0.0), (16.0, 32.0));
        assert_eq!(parts.len(), DASH_COUNT);
        assert_eq!(parts[0][0], (0.0, 0.0));
        let last = &parts[DASH_COUNT - 1];
        assert!((last[0].0 - 15.0).abs() < 1e-9);
        assert!((last[1].1 - 31.2).abs() < 1e-9);
    }

    #[test]
    fn test_empty_limits_are_widened() {
        let x = widen((2.0, 2.0), "xlim").unwrap();
        assert!(x.0 < 2.0 && x.1 > 2.0);
        assert_eq!(widen((0.0, 0.0), "ylim").unwrap(), (-1.0, 1.0));
        assert!(widen((0.0, f64::INFINITY), "xlim").is_err());
    }

    #[test]
    fn test_chart_draws_inside_figure() {
        let mut figure = Figure::new([4.0, 3.0], 50.0).unwrap();
        let axes = ChartAxes {
            xlim: (-1.0, 1.0),
            ylim: (0.0, 10.0),
            xlabel: Some("x"),
            ylabel: Some("y"),
            legend: None,
        };
        let area = PageRect::new(0.2, 0.2, 0.7, 0.7);
        let drawn = draw_chart(&mut figure, area, &axes, |chart, style| {
            chart
                .draw_series(LineSeries::new(
                    vec![(-1.0, 0.0), (1.0, 10.0)],
                    RED.stroke_width(style.line_px),
                ))
                .map_err(chart_error)?;
            Ok(42)
        })
        .unwrap();
        assert_eq!(drawn, 42);

        // The frame's bottom-left corner is black; the page corner stays white.
        let corner = figure.to_pixels(area);
        let (x, y) = (corner.left.round() as u32, corner.bottom.round() as u32 - 1);
        let dark = (x.saturating_sub(1)..=x + 1)
            .flat_map(|px| (y.saturating_sub(1)..=y + 1).map(move |py| (px, py)))
            .any(|(px, py)| figure.pixel(px, py).map_or(false, |c| c[0] < 128));
        assert!(dark);
        assert_eq!(figure.pixel(0, 0), Some([255, 255, 255, 255]));
    }
}
