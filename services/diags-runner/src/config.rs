//! Run configuration.
//!
//! A run file holds global plot parameters and the jobs to render:
//!
//! ```yaml
//! parameters:
//!   results_dir: ${RESULTS_DIR:-./results}
//!   case_id: TS-NINO34
//! jobs:
//!   - name: ts-map
//!     set: enso_diags
//!     kind: map
//!     test: { path: test/TS.nc, var: TS }
//!     reference: { path: obs/TS.nc, var: TS }
//!     units: degC
//!     overrides:
//!       output_file: ts-map
//!       contour_levels: [-2, -1, 0, 1, 2]
//! ```
//!
//! Supports environment variable substitution using `${VAR}` and
//! `${VAR:-default}` syntax. Relative data paths are resolved against the
//! directory of the run file.

use anyhow::{Context, Result};
use diagnostics::PlotParameters;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

// ============================================================================
// Run file
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub parameters: PlotParameters,
    pub jobs: Vec<JobConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Map,
    Scatter,
    Line,
}

/// A variable in a data file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarSource {
    pub path: PathBuf,
    pub var: String,
}

/// Cells where `var` falls outside `[low_limit, high_limit]` are masked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskConfig {
    pub path: PathBuf,
    pub var: String,
    #[serde(default)]
    pub low_limit: Option<f64>,
    #[serde(default)]
    pub high_limit: Option<f64>,
}

/// One axis of a scatter job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatterAxisConfig {
    /// Name on the axis label; defaults to the test variable name.
    #[serde(default)]
    pub label: Option<String>,
    pub test: VarSource,
    pub reference: VarSource,
    #[serde(default)]
    pub units: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    pub name: String,
    pub set: String,
    pub kind: JobKind,

    // map and line jobs
    #[serde(default)]
    pub test: Option<VarSource>,
    #[serde(default)]
    pub reference: Option<VarSource>,
    /// Target units for test and reference.
    #[serde(default)]
    pub units: Option<String>,
    #[serde(default)]
    pub mask: Option<MaskConfig>,
    #[serde(default)]
    pub test_conf: Option<VarSource>,
    #[serde(default)]
    pub ref_conf: Option<VarSource>,

    // scatter jobs
    #[serde(default)]
    pub x: Option<ScatterAxisConfig>,
    #[serde(default)]
    pub y: Option<ScatterAxisConfig>,

    /// Plot parameters replacing the global ones for this job.
    #[serde(default)]
    pub overrides: BTreeMap<String, serde_yaml::Value>,
}

impl JobConfig {
    /// Global parameters with this job's overrides applied.
    pub fn parameters(&self, global: &PlotParameters) -> Result<PlotParameters> {
        if self.overrides.is_empty() {
            return Ok(global.clone());
        }
        let mut value = serde_yaml::to_value(global)?;
        let mapping = value
            .as_mapping_mut()
            .context("Plot parameters did not serialize to a mapping")?;
        for (key, override_value) in &self.overrides {
            let key_value = serde_yaml::Value::String(key.clone());
            anyhow::ensure!(
                mapping.contains_key(&key_value),
                "Job {}: unknown plot parameter '{}'",
                self.name,
                key
            );
            mapping.insert(key_value, override_value.clone());
        }
        serde_yaml::from_value(value)
            .with_context(|| format!("Job {}: invalid parameter overrides", self.name))
    }

    fn data_paths_mut(&mut self) -> Vec<&mut PathBuf> {
        let mut paths: Vec<&mut PathBuf> = Vec::new();
        for source in [&mut self.test, &mut self.reference, &mut self.test_conf, &mut self.ref_conf]
            .into_iter()
            .flatten()
        {
            paths.push(&mut source.path);
        }
        if let Some(mask) = &mut self.mask {
            paths.push(&mut mask.path);
        }
        for axis in [&mut self.x, &mut self.y].into_iter().flatten() {
            paths.push(&mut axis.test.path);
            paths.push(&mut axis.reference.path);
        }
        paths
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Load, expand and validate a run file.
pub fn load_run_config<P: AsRef<Path>>(path: P) -> Result<RunConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read run file: {}", path.display()))?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    parse_run_config(&content, base_dir)
        .with_context(|| format!("Invalid run file: {}", path.display()))
}

/// Parse run file text; relative data paths are joined onto `base_dir`.
pub fn parse_run_config(content: &str, base_dir: &Path) -> Result<RunConfig> {
    let expanded = expand_env_vars(content)?;
    let mut config: RunConfig = serde_yaml::from_str(&expanded).context("Failed to parse YAML")?;

    for job in &mut config.jobs {
        for path in job.data_paths_mut() {
            if path.is_relative() {
                *path = base_dir.join(&*path);
            }
        }
    }

    validate_run_config(&config)?;
    Ok(config)
}

// ============================================================================
// Environment Variable Expansion
// ============================================================================

/// Expand environment variables in the format ${VAR} or ${VAR:-default}
fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::new();
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'

            let mut var_expr = String::new();
            let mut brace_count = 1;

            while brace_count > 0 {
                match chars.next() {
                    Some('{') => {
                        brace_count += 1;
                        var_expr.push('{');
                    }
                    Some('}') => {
                        brace_count -= 1;
                        if brace_count > 0 {
                            var_expr.push('}');
                        }
                    }
                    Some(c) => var_expr.push(c),
                    None => anyhow::bail!("Unclosed variable substitution: ${{{}", var_expr),
                }
            }

            result.push_str(&resolve_var_expr(&var_expr)?);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

/// Resolve variable expression (supports VAR and VAR:-default syntax)
fn resolve_var_expr(expr: &str) -> Result<String> {
    if let Some((var_name, default)) = expr.split_once(":-") {
        match std::env::var(var_name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        }
    } else {
        std::env::var(expr.trim()).with_context(|| format!("Environment variable {} not set", expr))
    }
}

// ============================================================================
// Validation
// ============================================================================

fn validate_run_config(config: &RunConfig) -> Result<()> {
    config
        .parameters
        .validate()
        .context("Invalid global plot parameters")?;

    let mut names = std::collections::HashSet::new();
    for job in &config.jobs {
        anyhow::ensure!(!job.name.is_empty(), "Job name cannot be empty");
        anyhow::ensure!(names.insert(job.name.as_str()), "Duplicate job name: {}", job.name);
        anyhow::ensure!(!job.set.is_empty(), "Job {}: set cannot be empty", job.name);

        match job.kind {
            JobKind::Map | JobKind::Line => {
                anyhow::ensure!(
                    job.test.is_some() && job.reference.is_some(),
                    "Job {}: {:?} jobs need test and reference variables",
                    job.name,
                    job.kind
                );
            }
            JobKind::Scatter => {
                anyhow::ensure!(
                    job.x.is_some() && job.y.is_some(),
                    "Job {}: scatter jobs need x and y",
                    job.name
                );
            }
        }

        if let Some(mask) = &job.mask {
            anyhow::ensure!(
                job.kind == JobKind::Map,
                "Job {}: only map jobs can be masked",
                job.name
            );
            if let (Some(low), Some(high)) = (mask.low_limit, mask.high_limit) {
                anyhow::ensure!(
                    low <= high,
                    "Job {}: mask low_limit {} is above high_limit {}",
                    job.name,
                    low,
                    high
                );
            }
        }

        job.parameters(&config.parameters)?
            .validate()
            .with_context(|| format!("Job {}: invalid plot parameters", job.name))?;
    }
    Ok(())
}
