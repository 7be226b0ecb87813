//! Diagnostic sets built on the renderer.
//!
//! A set turns prepared fields into saved figures under
//! `{results_dir}/{set}/{case_id}/`. Sets are looked up through a
//! [`RendererRegistry`] keyed by backend, set name and input kind.

pub mod enso;
pub mod outcome;
pub mod output;
pub mod parameter;
pub mod registry;
pub mod zonal_mean;

pub use enso::{plot_map, plot_scatter};
pub use outcome::{PlotOutcome, PlotSummary, SavedPlot};
pub use output::{file_stem, output_dir, output_path, save_figure, save_subplots, subplot_path};
pub use parameter::{PlotParameters, SUPPORTED_BACKENDS};
pub use registry::{
    DiagnosticRenderer, InputKind, MapInputs, RendererRegistry, RendererSet, SetInputs,
};
pub use zonal_mean::plot_zonal_mean;
