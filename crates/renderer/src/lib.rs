//! Figure rendering for climate diagnostics.
//!
//! Implements the figure types used by the diagnostic sets:
//! - Three-panel maps (test, reference, difference) with colorbars and stats
//! - Scatter plots with regime-split linear fits
//! - Line comparisons of two 1-D series
//!
//! Everything draws into an owned [`Figure`], which is written out with
//! [`Figure::save`].

pub mod chart;
pub mod colormap;
pub mod encode;
pub mod figure;
pub mod levels;
pub mod line;
pub mod panel;
pub mod png;
pub mod scatter;
pub mod text;
pub mod ticks;

pub use chart::{draw_chart, ChartAxes, LegendCorner};
pub use colormap::{Colormap, Norm};
pub use encode::{encode, normalize_format, OutputFormat};
pub use figure::{Border, Figure, LineStyle, PageRect, PixelRect};
pub use line::{plot_line_comparison, LineSeries, LineSummary};
pub use panel::{
    colorbar_rect, plot_panel_map, PanelSpec, PanelSummary, TitleTriplet, HATCH_CAPTION, PANELS,
    SUBPLOT_BORDER,
};
pub use scatter::{
    linear_fit, plot_scatter, AnomalyPair, FitLine, LinearFit, Marker, Regime, ScatterLabels,
    ScatterSummary, Series, SkippedRegime,
};
