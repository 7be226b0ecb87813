//! Diagnostics runner library.
//!
//! This module exposes the run configuration and job pipeline for testing.

pub mod config;
pub mod pipeline;

pub use config::{load_run_config, parse_run_config, JobConfig, JobKind, RunConfig};
pub use pipeline::{prepare_inputs, JobReport, JobStatus, Pipeline};
