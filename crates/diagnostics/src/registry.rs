//! Renderer lookup by backend and set name.
//!
//! Each diagnostic set registers one renderer per kind of input it accepts.
//! The runner asks the registry for the set named in its job and hands the
//! renderer the prepared inputs.

use std::collections::BTreeMap;
use std::fmt;

use diags_common::{DiagsError, DiagsResult, Field, MetricsDict};
use renderer::AnomalyPair;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::enso;
use crate::outcome::PlotOutcome;
use crate::parameter::{PlotParameters, SUPPORTED_BACKENDS};
use crate::zonal_mean;

/// The shape of data a renderer consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    Map,
    Scatter,
    Line,
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Map => "map",
            Self::Scatter => "scatter",
            Self::Line => "line",
        };
        f.write_str(name)
    }
}

/// Test, reference and difference maps with their statistics.
#[derive(Debug, Clone)]
pub struct MapInputs {
    pub test: Field,
    pub reference: Field,
    pub diff: Field,
    pub metrics: MetricsDict,
    pub test_conf: Option<Field>,
    pub ref_conf: Option<Field>,
}

/// Prepared data for one figure.
#[derive(Debug, Clone)]
pub enum SetInputs {
    Map(Box<MapInputs>),
    Scatter { x: AnomalyPair, y: AnomalyPair },
    Line { test: Field, reference: Field },
}

impl SetInputs {
    pub fn kind(&self) -> InputKind {
        match self {
            Self::Map(_) => InputKind::Map,
            Self::Scatter { .. } => InputKind::Scatter,
            Self::Line { .. } => InputKind::Line,
        }
    }
}

/// Draws and saves the figure of one diagnostic set.
pub trait DiagnosticRenderer: Send + Sync {
    fn set_name(&self) -> &str;

    fn input_kind(&self) -> InputKind;

    /// Render `inputs`; they must be of [`Self::input_kind`].
    fn render(&self, inputs: &SetInputs, params: &PlotParameters) -> DiagsResult<PlotOutcome>;
}

fn wrong_inputs(renderer: &dyn DiagnosticRenderer, inputs: &SetInputs) -> DiagsError {
    DiagsError::invalid_parameter(
        "inputs",
        format!(
            "{} {} renderer cannot draw {} inputs",
            renderer.set_name(),
            renderer.input_kind(),
            inputs.kind()
        ),
    )
}

pub struct EnsoMapRenderer;

impl DiagnosticRenderer for EnsoMapRenderer {
    fn set_name(&self) -> &str {
        enso::SET_NAME
    }

    fn input_kind(&self) -> InputKind {
        InputKind::Map
    }

    fn render(&self, inputs: &SetInputs, params: &PlotParameters) -> DiagsResult<PlotOutcome> {
        let SetInputs::Map(map) = inputs else {
            return Err(wrong_inputs(self, inputs));
        };
        enso::plot_map(
            &map.reference,
            &map.test,
            &map.diff,
            &map.metrics,
            map.ref_conf.as_ref(),
            map.test_conf.as_ref(),
            params,
        )
    }
}

pub struct EnsoScatterRenderer;

impl DiagnosticRenderer for EnsoScatterRenderer {
    fn set_name(&self) -> &str {
        enso::SET_NAME
    }

    fn input_kind(&self) -> InputKind {
        InputKind::Scatter
    }

    fn render(&self, inputs: &SetInputs, params: &PlotParameters) -> DiagsResult<PlotOutcome> {
        match inputs {
            SetInputs::Scatter { x, y } => enso::plot_scatter(x, y, params),
            _ => Err(wrong_inputs(self, inputs)),
        }
    }
}

pub struct ZonalMeanRenderer;

impl DiagnosticRenderer for ZonalMeanRenderer {
    fn set_name(&self) -> &str {
        zonal_mean::SET_NAME
    }

    fn input_kind(&self) -> InputKind {
        InputKind::Line
    }

    fn render(&self, inputs: &SetInputs, params: &PlotParameters) -> DiagsResult<PlotOutcome> {
        match inputs {
            SetInputs::Line { test, reference } => {
                zonal_mean::plot_zonal_mean(test, reference, params)
            }
            _ => Err(wrong_inputs(self, inputs)),
        }
    }
}

/// Renderers registered under one set name, keyed by input kind.
#[derive(Default)]
pub struct RendererSet {
    renderers: BTreeMap<InputKind, Box<dyn DiagnosticRenderer>>,
}

impl RendererSet {
    pub fn for_kind(&self, kind: InputKind) -> DiagsResult<&dyn DiagnosticRenderer> {
        self.renderers.get(&kind).map(|r| r.as_ref()).ok_or_else(|| {
            let message = format!("no {} renderer registered for this set", kind);
            DiagsError::invalid_parameter("inputs", message)
        })
    }

    pub fn kinds(&self) -> impl Iterator<Item = InputKind> + '_ {
        self.renderers.keys().copied()
    }
}

/// Registry of diagnostic renderers by set name.
#[derive(Default)]
pub struct RendererRegistry {
    sets: BTreeMap<String, RendererSet>,
}

impl RendererRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in sets: `enso_diags` (map and scatter) and
    /// `zonal_mean_xy` (line).
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(EnsoMapRenderer));
        registry.register(Box::new(EnsoScatterRenderer));
        registry.register(Box::new(ZonalMeanRenderer));
        registry
    }

    /// Add a renderer, replacing any with the same set name and input kind.
    pub fn register(&mut self, renderer: Box<dyn DiagnosticRenderer>) {
        let set = self.sets.entry(renderer.set_name().to_string()).or_default();
        debug!(set = renderer.set_name(), kind = %renderer.input_kind(), "Registered renderer");
        set.renderers.insert(renderer.input_kind(), renderer);
    }

    pub fn set_names(&self) -> impl Iterator<Item = &str> {
        self.sets.keys().map(String::as_str)
    }

    /// Renderers for `set_name` under `backend`.
    pub fn dispatch(&self, backend: &str, set_name: &str) -> DiagsResult<&RendererSet> {
        if !SUPPORTED_BACKENDS.contains(&backend) {
            return Err(DiagsError::UnsupportedBackend(backend.to_string()));
        }
        self.sets
            .get(set_name)
            .ok_or_else(|| DiagsError::UnknownSet(set_name.to_string()))
    }

    /// Dispatch on `params.backend` and `set_name`, then render `inputs`.
    pub fn render(
        &self,
        set_name: &str,
        inputs: &SetInputs,
        params: &PlotParameters,
    ) -> DiagsResult<PlotOutcome> {
        let renderer = self.dispatch(&params.backend, set_name)?.for_kind(inputs.kind())?;
        renderer.render(inputs, params)
    }
}
