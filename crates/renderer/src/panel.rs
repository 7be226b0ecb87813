//! Single map panel: filled field, optional significance hatching, ticks,
//! titles, colorbar and summary statistics.
//!
//! Three panels stack vertically on the page; [`PANELS`] holds their
//! rectangles in page coordinates. [`plot_panel_map`] draws into one of them
//! and never saves the figure.

use diags_common::{AxisKind, DiagsError, DiagsResult, Field, RegionSpec, StatsBundle};
use field_transform::add_cyclic;
use serde::Serialize;
use tracing::{debug, warn};

use crate::colormap::{Colormap, Norm, LUT_SIZE};
use crate::figure::{Border, Figure, LineStyle, PageRect, PixelRect, BLACK};
use crate::levels::{padded_levels, ColorbarFormat, BOUNDARY_COLORS};
use crate::text::{HAlign, TextStyle, VAlign};
use crate::ticks::{format_latitude, format_longitude, latitude_ticks, longitude_ticks};

/// Panel rectangles (x, y, w, h) in page coordinates, top to bottom.
pub const PANELS: [PageRect; 3] = [
    PageRect::new(0.1691, 0.6810, 0.6465, 0.2258),
    PageRect::new(0.1691, 0.3961, 0.6465, 0.2258),
    PageRect::new(0.1691, 0.1112, 0.6465, 0.2258),
];

/// Padding around a panel when saving it on its own.
pub const SUBPLOT_BORDER: Border = Border {
    left: -0.06,
    bottom: -0.03,
    right: 0.13,
    top: 0.03,
};

pub const HATCH_CAPTION: &str = "Hatched when pvalue < 0.05";

const TITLE_PT: f32 = 11.5;
const SIDE_TITLE_PT: f32 = 9.5;
const TICK_LABEL_PT: f32 = 8.0;
const COLORBAR_LABEL_PT: f32 = 9.0;
const TICK_LENGTH_PT: f32 = 3.5;

/// Confidence values at or above this are hatched.
const HATCH_THRESHOLD: f64 = 0.5;

/// Colorbar rectangle to the right of a panel.
pub fn colorbar_rect(panel: PageRect) -> PageRect {
    PageRect::new(panel.x + 0.6635, panel.y + 0.0115, 0.0326, 0.1792)
}

/// Left label, centred title and right label above a panel. `None` skips.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TitleTriplet {
    pub left: Option<String>,
    pub center: Option<String>,
    pub right: Option<String>,
}

impl TitleTriplet {
    pub fn new(left: Option<String>, center: Option<String>, right: Option<String>) -> Self {
        Self {
            left,
            center,
            right,
        }
    }
}

/// Inputs for one map panel.
#[derive(Debug, Clone)]
pub struct PanelSpec<'a> {
    /// Must squeeze to (lat, lon).
    pub field: &'a Field,
    /// Contour levels; empty means continuous coloring.
    pub levels: &'a [f64],
    pub colormap: &'a str,
    pub titles: TitleTriplet,
    pub region: &'a RegionSpec,
    /// Significance field; cells at or above 0.5 are hatched.
    pub confidence: Option<&'a Field>,
    pub stats: Option<&'a StatsBundle>,
}

/// What a panel drew, for callers and tests.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelSummary {
    pub panel_index: usize,
    pub colormap: String,
    pub map_rect: PixelRect,
    pub lon_ticks: Vec<f64>,
    pub lat_ticks: Vec<f64>,
    pub lon_labels: Vec<String>,
    pub lat_labels: Vec<String>,
    /// printf pattern of the colorbar labels when levels were given.
    pub colorbar_format: Option<String>,
    pub colorbar_labels: Vec<String>,
    pub stats_labels: Vec<String>,
    pub stats_values: Vec<String>,
    pub hatched_cells: usize,
}

impl PanelSummary {
    pub fn is_discrete(&self) -> bool {
        self.colorbar_format.is_some()
    }

    pub fn is_hatched(&self) -> bool {
        self.hatched_cells > 0
    }
}

/// Draw panel `panel_index` (0, 1 or 2) of a three-panel map.
pub fn plot_panel_map(
    figure: &mut Figure,
    panel_index: usize,
    spec: &PanelSpec<'_>,
) -> DiagsResult<PanelSummary> {
    let panel = *PANELS.get(panel_index).ok_or_else(|| {
        DiagsError::invalid_parameter(
            "panel_index",
            format!("panel index {} is out of range 0..=2", panel_index),
        )
    })?;
    let region = spec.region;
    region.validate()?;

    let colormap = Colormap::by_name(spec.colormap)?;
    let field = add_cyclic(&spec.field.squeeze_2d()?)?;
    let grid = GridSampler::new(&field)?;

    let norm = if spec.levels.is_empty() {
        let (vmin, vmax) = value_range(spec.field);
        Norm::linear(vmin, vmax, LUT_SIZE)
    } else {
        Norm::boundary(padded_levels(spec.levels)?, BOUNDARY_COLORS)?
    };

    // Screen height/width = aspect * lat extent / lon extent, i.e. 1:2 boxes.
    let panel_px = figure.to_pixels(panel);
    let ratio = (region.aspect() * region.lat_covered() / region.lon_covered()) as f32;
    let map = panel_px.fit_ratio(ratio);
    debug!(
        panel_index,
        aspect = region.aspect(),
        width = map.width(),
        height = map.height(),
        "Panel map layout"
    );

    let lon_at = |x: u32| {
        let t = (x as f64 + 0.5 - map.left as f64) / map.width() as f64;
        region.lon_west + t * region.lon_covered()
    };
    let lat_at = |y: u32| {
        let t = (y as f64 + 0.5 - map.top as f64) / map.height() as f64;
        region.lat_north - t * region.lat_covered()
    };

    figure.fill_pixels(map, |x, y| {
        let value = grid.bilinear(lon_at(x), lat_at(y))?;
        norm.index(value).map(|i| colormap.color(i))
    });

    let hatched_cells = match spec.confidence {
        Some(conf) => draw_hatching(figure, map, conf, region, &lon_at, &lat_at)?,
        None => 0,
    };

    figure.stroke_rect(map, BLACK, figure.points(0.8));
    let mid = map.center_x();
    figure.polyline(
        &[(mid, map.top), (mid, map.bottom)],
        &LineStyle::solid(BLACK, figure.points(0.5)),
    );

    let lon_ticks = longitude_ticks(region.lon_west, region.lon_east);
    let lat_ticks = latitude_ticks(region.lat_south, region.lat_north);
    let lon_labels: Vec<String> = lon_ticks.iter().map(|&v| format_longitude(v)).collect();
    let lat_labels: Vec<String> = lat_ticks.iter().map(|&v| format_latitude(v)).collect();
    draw_ticks(figure, map, region, &lon_ticks, &lon_labels, &lat_ticks, &lat_labels);
    draw_titles(figure, map, &spec.titles);

    let (colorbar_format, colorbar_labels) =
        draw_colorbar(figure, colorbar_rect(panel), &colormap, &norm, spec.levels);

    let (stats_labels, stats_values) = match spec.stats {
        Some(stats) => draw_stats(figure, panel, stats),
        None => (Vec::new(), Vec::new()),
    };

    if spec.confidence.is_some() {
        let y = panel.y - 0.0355;
        figure.page_text(panel.x + 0.25, y, HATCH_CAPTION, SIDE_TITLE_PT, HAlign::Right);
    }

    Ok(PanelSummary {
        panel_index,
        colormap: colormap.name().to_string(),
        map_rect: map,
        lon_ticks,
        lat_ticks,
        lon_labels,
        lat_labels,
        colorbar_format,
        colorbar_labels,
        stats_labels,
        stats_values,
        hatched_cells,
    })
}

fn value_range(field: &Field) -> (f64, f64) {
    let range = field.valid_values().fold(None, |acc: Option<(f64, f64)>, v| match acc {
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        None => Some((v, v)),
    });
    range.unwrap_or_else(|| {
        warn!(field = field.id(), "No valid values for continuous coloring");
        (0.0, 1.0)
    })
}

/// Samples a (lat, lon) field at arbitrary coordinates.
struct GridSampler<'a> {
    field: &'a Field,
    lats: &'a [f64],
    lons: &'a [f64],
}

impl<'a> GridSampler<'a> {
    fn new(field: &'a Field) -> DiagsResult<Self> {
        let axes = field.axes();
        if axes.len() != 2
            || axes[0].kind != AxisKind::Latitude
            || axes[1].kind != AxisKind::Longitude
        {
            return Err(DiagsError::InvalidField(format!(
                "'{}' is not a (lat, lon) grid",
                field.id()
            )));
        }
        if axes[0].is_empty() || axes[1].is_empty() {
            return Err(DiagsError::InvalidField(format!("'{}' has an empty axis", field.id())));
        }
        Ok(Self {
            field,
            lats: &axes[0].values,
            lons: &axes[1].values,
        })
    }

    fn wrap_lon(&self, lon: f64) -> f64 {
        let lon0 = self.lons[0];
        lon0 + (lon - lon0).rem_euclid(360.0)
    }

    fn at(&self, i: usize, j: usize) -> Option<f64> {
        self.field.value(i * self.lons.len() + j)
    }

    /// Bilinear interpolation; `None` if any contributing cell is masked.
    fn bilinear(&self, lon: f64, lat: f64) -> Option<f64> {
        let (i0, i1, ti) = bracket(self.lats, lat);
        let (j0, j1, tj) = bracket(self.lons, self.wrap_lon(lon));
        let v00 = self.at(i0, j0)?;
        let v01 = self.at(i0, j1)?;
        let v10 = self.at(i1, j0)?;
        let v11 = self.at(i1, j1)?;
        let top = v00 + (v01 - v00) * tj;
        let bottom = v10 + (v11 - v10) * tj;
        Some(top + (bottom - top) * ti)
    }

    fn nearest(&self, lon: f64, lat: f64) -> Option<f64> {
        let (i0, i1, ti) = bracket(self.lats, lat);
        let (j0, j1, tj) = bracket(self.lons, self.wrap_lon(lon));
        let i = if ti < 0.5 { i0 } else { i1 };
        let j = if tj < 0.5 { j0 } else { j1 };
        self.at(i, j)
    }
}

/// Indices around `x` in a monotonic array and the fraction between them.
/// Values outside the array clamp to the nearest end.
fn bracket(values: &[f64], x: f64) -> (usize, usize, f64) {
    let n = values.len();
    if n == 1 {
        return (0, 0, 0.0);
    }
    let ascending = values[n - 1] >= values[0];
    let before = |a: f64, b: f64| if ascending { a <= b } else { a >= b };

    if before(x, values[0]) {
        return (0, 0, 0.0);
    }
    if before(values[n - 1], x) {
        return (n - 1, n - 1, 0.0);
    }
    // First index whose value is past x.
    let hi = values.partition_point(|&v| before(v, x)).clamp(1, n - 1);
    let lo = hi - 1;
    let span = values[hi] - values[lo];
    let t = if span == 0.0 { 0.0 } else { (x - values[lo]) / span };
    (lo, hi, t.clamp(0.0, 1.0))
}

fn draw_hatching(
    figure: &mut Figure,
    map: PixelRect,
    confidence: &Field,
    region: &RegionSpec,
    lon_at: &dyn Fn(u32) -> f64,
    lat_at: &dyn Fn(u32) -> f64,
) -> DiagsResult<usize> {
    let squeezed = confidence.squeeze_2d()?;
    let cells = count_significant(&squeezed, region);
    let conf = add_cyclic(&squeezed)?;
    let grid = GridSampler::new(&conf)?;

    let spacing = figure.points(6.0).max(4.0) as u32;
    let thickness = (figure.points(0.6).max(1.0)) as u32;
    figure.fill_pixels(map, |x, y| {
        if (x + y) % spacing >= thickness {
            return None;
        }
        match grid.nearest(lon_at(x), lat_at(y)) {
            Some(v) if v >= HATCH_THRESHOLD => Some([0, 0, 0]),
            _ => None,
        }
    });
    Ok(cells)
}

fn count_significant(conf: &Field, region: &RegionSpec) -> usize {
    let (Some(lat), Some(lon)) = (conf.latitude(), conf.longitude()) else {
        return 0;
    };
    let nlon = lon.len();
    (0..conf.len())
        .filter(|&idx| {
            let (i, j) = (idx / nlon, idx % nlon);
            region.contains(lon.values[j], lat.values[i])
                && conf.value(idx).is_some_and(|v| v >= HATCH_THRESHOLD)
        })
        .count()
}

fn draw_ticks(
    figure: &mut Figure,
    map: PixelRect,
    region: &RegionSpec,
    lon_ticks: &[f64],
    lon_labels: &[String],
    lat_ticks: &[f64],
    lat_labels: &[String],
) {
    let tick_len = figure.points(TICK_LENGTH_PT);
    let gap = figure.points(2.0);
    let tick_style = LineStyle::solid(BLACK, figure.points(1.0));
    let label_size = figure.points(TICK_LABEL_PT);

    for (tick, label) in lon_ticks.iter().zip(lon_labels) {
        let x = map.left + ((tick - region.lon_west) / region.lon_covered()) as f32 * map.width();
        figure.polyline(&[(x, map.bottom), (x, map.bottom + tick_len)], &tick_style);
        let style = TextStyle::new(label_size).align(HAlign::Center, VAlign::Top);
        figure.text(x, map.bottom + tick_len + gap, label, &style);
    }

    for (tick, label) in lat_ticks.iter().zip(lat_labels) {
        let t = ((tick - region.lat_south) / region.lat_covered()) as f32;
        let y = map.bottom - t * map.height();
        figure.polyline(&[(map.left - tick_len, y), (map.left, y)], &tick_style);
        let style = TextStyle::new(label_size).align(HAlign::Right, VAlign::Center);
        figure.text(map.left - tick_len - gap, y, label, &style);
    }
}

fn draw_titles(figure: &mut Figure, map: PixelRect, titles: &TitleTriplet) {
    let y = map.top - figure.points(6.0);
    if let Some(left) = &titles.left {
        let style = TextStyle::new(figure.points(SIDE_TITLE_PT));
        figure.text(map.left, y, left, &style);
    }
    if let Some(center) = &titles.center {
        let style = TextStyle::new(figure.points(TITLE_PT)).align(HAlign::Center, VAlign::Baseline);
        figure.text(map.center_x(), y, center, &style);
    }
    if let Some(right) = &titles.right {
        let style =
            TextStyle::new(figure.points(SIDE_TITLE_PT)).align(HAlign::Right, VAlign::Baseline);
        figure.text(map.right, y, right, &style);
    }
}

/// Returns the label format pattern (discrete bars only) and the labels.
fn draw_colorbar(
    figure: &mut Figure,
    rect: PageRect,
    colormap: &Colormap,
    norm: &Norm,
    levels: &[f64],
) -> (Option<String>, Vec<String>) {
    let bar = figure.to_pixels(rect);
    let height = bar.height();
    let label_size = figure.points(COLORBAR_LABEL_PT);

    let (pattern, labels) = match norm {
        Norm::Boundary { .. } => {
            let n = norm.n_regions();
            let bin = height / n as f32;
            for k in 0..n {
                let cell = PixelRect {
                    left: bar.left,
                    right: bar.right,
                    top: bar.bottom - (k + 1) as f32 * bin,
                    bottom: bar.bottom - k as f32 * bin,
                };
                let [r, g, b] = colormap.color(norm.region_index(k));
                figure.fill_rect(cell, [r, g, b, 255]);
            }

            let fmt = ColorbarFormat::for_levels(levels);
            let labels: Vec<String> = levels.iter().map(|&v| fmt.format(v)).collect();
            let style = TextStyle::new(label_size).align(HAlign::Right, VAlign::Center);
            let x = bar.right + figure.points(fmt.pad);
            for (i, label) in labels.iter().enumerate() {
                // Level i sits on the boundary above the lower padding bin.
                let y = bar.bottom - (i + 1) as f32 * bin;
                figure.text(x, y, label.trim_start(), &style);
            }
            (Some(fmt.pattern()), labels)
        }
        Norm::Linear { vmin, vmax, .. } => {
            let (vmin, vmax) = (*vmin, *vmax);
            figure.fill_pixels(bar, |_, y| {
                let t = (bar.bottom as f64 - y as f64 - 0.5) / height as f64;
                Some(colormap.sample(t))
            });

            let fmt = ColorbarFormat::for_magnitude(vmin.abs().max(vmax.abs()));
            let x = bar.right + figure.points(3.0);
            let style = TextStyle::new(label_size).align(HAlign::Left, VAlign::Center);
            let labels: Vec<String> = (0..5)
                .map(|i| {
                    let t = i as f64 / 4.0;
                    let label = fmt.format(vmin + (vmax - vmin) * t);
                    let y = bar.bottom - t as f32 * height;
                    figure.text(x, y, label.trim_start(), &style);
                    label
                })
                .collect();
            (None, labels)
        }
    };

    figure.stroke_rect(bar, BLACK, figure.points(0.5));
    (pattern, labels)
}

fn draw_stats(
    figure: &mut Figure,
    panel: PageRect,
    stats: &StatsBundle,
) -> (Vec<String>, Vec<String>) {
    let mut labels: Vec<String> = ["Max", "Min", "Mean", "STD"].map(String::from).to_vec();
    let mut values: Vec<String> = [stats.max, stats.min, stats.mean, stats.std]
        .iter()
        .map(|v| format!("{:.2}", v))
        .collect();
    draw_stats_column(figure, panel, 0.2107, &labels, &values);

    // A constant field has no correlation; CORR still shows, as nan.
    if let Some(rmse) = stats.rmse {
        let bottom_labels = ["RMSE", "CORR"].map(String::from);
        let corr = stats.corr.map_or_else(|| "nan".to_string(), |c| format!("{:.2}", c));
        let bottom_values = [format!("{:.2}", rmse), corr];
        draw_stats_column(figure, panel, -0.0205, &bottom_labels, &bottom_values);
        labels.extend(bottom_labels);
        values.extend(bottom_values);
    }
    (labels, values)
}

fn draw_stats_column(
    figure: &mut Figure,
    panel: PageRect,
    dy: f64,
    labels: &[String],
    values: &[String],
) {
    let y = panel.y + dy;
    figure.page_text(panel.x + 0.6635, y, &labels.join("\n"), SIDE_TITLE_PT, HAlign::Left);
    figure.page_text(panel.x + 0.7635, y, &values.join("\n"), SIDE_TITLE_PT, HAlign::Right);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bracket_ascending() {
        let v = [0.0, 10.0, 20.0];
        assert_eq!(bracket(&v, 5.0), (0, 1, 0.5));
        assert_eq!(bracket(&v, 20.0), (2, 2, 0.0));
        assert_eq!(bracket(&v, -3.0), (0, 0, 0.0));
        assert_eq!(bracket(&v, 10.0), (1, 2, 0.0));
    }

    #[test]
    fn test_bracket_descending() {
        let v = [20.0, 10.0, 0.0];
        let (lo, hi, t) = bracket(&v, 15.0);
        assert_eq!((lo, hi), (0, 1));
        assert!((t - 0.5).abs() < 1e-12);
        assert_eq!(bracket(&v, 25.0), (0, 0, 0.0));
    }

    #[test]
    fn test_colorbar_rect() {
        let rect = colorbar_rect(PANELS[0]);
        assert!((rect.x - (0.1691 + 0.6635)).abs() < 1e-12);
        assert!((rect.y - (0.6810 + 0.0115)).abs() < 1e-12);
        assert_eq!((rect.w, rect.h), (0.0326, 0.1792));
    }

    #[test]
    fn test_sampler_interpolates_and_respects_mask() {
        let values = vec![0.0, 10.0, 20.0, 30.0];
        let field = Field::lat_lon("T", vec![0.0, 10.0], vec![0.0, 10.0], values)
            .unwrap()
            .with_mask(vec![false, false, false, true])
            .unwrap();
        let grid = GridSampler::new(&field).unwrap();
        assert_eq!(grid.bilinear(5.0, 0.0), Some(5.0));
        assert_eq!(grid.bilinear(5.0, 5.0), None);
        assert_eq!(grid.nearest(1.0, 9.0), Some(20.0));
    }
}
