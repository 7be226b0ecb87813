use std::path::PathBuf;

use renderer::{LineSummary, PanelSummary, ScatterSummary};
use serde::Serialize;

/// What a renderer drew.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlotSummary {
    Map { panels: Vec<PanelSummary> },
    Scatter(ScatterSummary),
    Line(LineSummary),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavedPlot {
    /// Full figure files, one per output format.
    pub paths: Vec<PathBuf>,
    /// Per-panel files, one per panel and subplot format.
    pub subplot_paths: Vec<PathBuf>,
    pub summary: PlotSummary,
}

/// Result of a plotting call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PlotOutcome {
    Saved(SavedPlot),
    /// Nothing was drawn, e.g. the backend is not one we render.
    Skipped { reason: String },
}

impl PlotOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Saved(_))
    }

    pub fn saved(&self) -> Option<&SavedPlot> {
        match self {
            Self::Saved(plot) => Some(plot),
            Self::Skipped { .. } => None,
        }
    }

    /// Every file written, full figures first.
    pub fn all_paths(&self) -> Vec<PathBuf> {
        match self {
            Self::Saved(plot) => plot.paths.iter().chain(&plot.subplot_paths).cloned().collect(),
            Self::Skipped { .. } => Vec::new(),
        }
    }
}
