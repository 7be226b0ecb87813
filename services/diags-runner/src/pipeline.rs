//! Job pipeline: read variables, convert and mask them, compute statistics
//! and hand the prepared inputs to the registered renderer.

use std::path::PathBuf;

use anyhow::{Context, Result};
use diagnostics::{MapInputs, PlotOutcome, RendererRegistry, SetInputs};
use diags_common::{Field, MetricsDict};
use field_transform::{convert_units, difference, mask_by};
use rayon::prelude::*;
use renderer::AnomalyPair;
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::config::{JobConfig, JobKind, RunConfig, ScatterAxisConfig, VarSource};

/// Outcome of one job.
#[derive(Debug, Serialize)]
pub struct JobReport {
    pub name: String,
    pub set: String,
    pub status: JobStatus,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatus {
    Saved { paths: Vec<PathBuf> },
    Skipped { reason: String },
    Failed { error: String },
}

impl JobReport {
    pub fn is_failure(&self) -> bool {
        matches!(self.status, JobStatus::Failed { .. })
    }
}

/// Runs the jobs of a [`RunConfig`].
pub struct Pipeline {
    config: RunConfig,
    registry: RendererRegistry,
}

impl Pipeline {
    pub fn new(config: RunConfig) -> Self {
        Self::with_registry(config, RendererRegistry::with_defaults())
    }

    pub fn with_registry(config: RunConfig, registry: RendererRegistry) -> Self {
        Self { config, registry }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run every job (or only those of `set_filter`) in parallel on the
    /// current rayon pool. A failing job does not stop the others.
    pub fn run(&self, set_filter: Option<&str>) -> Vec<JobReport> {
        let jobs: Vec<&JobConfig> = self
            .config
            .jobs
            .iter()
            .filter(|job| set_filter.map_or(true, |set| job.set == set))
            .collect();
        info!(jobs = jobs.len(), "Running diagnostics jobs");

        jobs.into_par_iter()
            .map(|job| {
                let status = match self.run_job(job) {
                    Ok(PlotOutcome::Saved(saved)) => JobStatus::Saved {
                        paths: saved.paths.into_iter().chain(saved.subplot_paths).collect(),
                    },
                    Ok(PlotOutcome::Skipped { reason }) => {
                        warn!(job = %job.name, %reason, "Job skipped");
                        JobStatus::Skipped { reason }
                    }
                    Err(e) => {
                        error!(job = %job.name, error = %format!("{:#}", e), "Job failed");
                        JobStatus::Failed {
                            error: format!("{:#}", e),
                        }
                    }
                };
                JobReport {
                    name: job.name.clone(),
                    set: job.set.clone(),
                    status,
                }
            })
            .collect()
    }

    #[instrument(skip_all, fields(job = %job.name, set = %job.set))]
    fn run_job(&self, job: &JobConfig) -> Result<PlotOutcome> {
        let params = job.parameters(&self.config.parameters)?;
        let inputs = prepare_inputs(job)?;
        let outcome = self.registry.render(&job.set, &inputs, &params)?;
        if outcome.is_saved() {
            info!(files = outcome.all_paths().len(), "Job complete");
        }
        Ok(outcome)
    }
}

/// Read and transform the data a job needs.
pub fn prepare_inputs(job: &JobConfig) -> Result<SetInputs> {
    match job.kind {
        JobKind::Map => prepare_map(job),
        JobKind::Line => {
            let (test, reference) = read_pair(job)?;
            Ok(SetInputs::Line { test, reference })
        }
        JobKind::Scatter => {
            let x = job.x.as_ref().context("scatter job has no x")?;
            let y = job.y.as_ref().context("scatter job has no y")?;
            Ok(SetInputs::Scatter {
                x: anomaly_pair(x)?,
                y: anomaly_pair(y)?,
            })
        }
    }
}

fn prepare_map(job: &JobConfig) -> Result<SetInputs> {
    let (mut test, mut reference) = read_pair(job)?;

    if let Some(mask) = &job.mask {
        let mask_field = read_var(&VarSource {
            path: mask.path.clone(),
            var: mask.var.clone(),
        })?;
        test = mask_by(&test, &mask_field, mask.low_limit, mask.high_limit)?;
        reference = mask_by(&reference, &mask_field, mask.low_limit, mask.high_limit)?;
    }

    let diff = difference(&test, &reference)?;
    let metrics = MetricsDict::compute(&test, &reference, &diff)?;
    let test_conf = job.test_conf.as_ref().map(read_var).transpose()?;
    let ref_conf = job.ref_conf.as_ref().map(read_var).transpose()?;

    Ok(SetInputs::Map(Box::new(MapInputs {
        test,
        reference,
        diff,
        metrics,
        test_conf,
        ref_conf,
    })))
}

fn read_pair(job: &JobConfig) -> Result<(Field, Field)> {
    let test = job.test.as_ref().context("job has no test variable")?;
    let reference = job.reference.as_ref().context("job has no reference variable")?;
    let units = job.units.as_deref();
    Ok((read_converted(test, units)?, read_converted(reference, units)?))
}

fn read_var(source: &VarSource) -> Result<Field> {
    netcdf_reader::read_field(&source.path, &source.var)
        .with_context(|| format!("Failed to read {} from {}", source.var, source.path.display()))
}

fn read_converted(source: &VarSource, units: Option<&str>) -> Result<Field> {
    let field = read_var(source)?;
    match units {
        Some(target) => convert_units(&field, target)
            .with_context(|| format!("Failed to convert {} to {}", source.var, target)),
        None => Ok(field),
    }
}

/// Masked cells become NaN so both series keep their time alignment.
fn anomaly_pair(axis: &ScatterAxisConfig) -> Result<AnomalyPair> {
    let units = axis.units.as_deref();
    let test = read_converted(&axis.test, units)?;
    let reference = read_converted(&axis.reference, units)?;
    let label = axis.label.clone().unwrap_or_else(|| axis.test.var.clone());
    let units = test.units().unwrap_or_default().to_string();
    Ok(AnomalyPair::new(label, units, values_or_nan(&test), values_or_nan(&reference)))
}

fn values_or_nan(field: &Field) -> Vec<f64> {
    (0..field.len()).map(|i| field.value(i).unwrap_or(f64::NAN)).collect()
}
