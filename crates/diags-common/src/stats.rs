//! Descriptive statistics attached to plotted fields.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{DiagsError, DiagsResult};
use crate::field::Field;

/// Scalar statistics for one displayed field.
///
/// `rmse` and `corr` are only present for comparison panels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatsBundle {
    pub max: f64,
    pub min: f64,
    pub mean: f64,
    pub std: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rmse: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corr: Option<f64>,
}

impl StatsBundle {
    /// Max/min/mean/population std over the unmasked cells of a field.
    pub fn describe(field: &Field) -> DiagsResult<Self> {
        let values: Vec<f64> = field.valid_values().collect();
        if values.is_empty() {
            return Err(DiagsError::InvalidField(format!(
                "'{}' has no unmasked values",
                field.id()
            )));
        }

        let n = values.len() as f64;
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

        Ok(Self {
            max,
            min,
            mean,
            std: var.sqrt(),
            rmse: None,
            corr: None,
        })
    }

    /// Describe `field` and add RMSE / correlation against `other`.
    ///
    /// Only cells valid in both fields take part in the comparison.
    pub fn compare(field: &Field, other: &Field) -> DiagsResult<Self> {
        field.ensure_same_shape(other)?;
        let mut bundle = Self::describe(field)?;

        let pairs: Vec<(f64, f64)> = (0..field.len())
            .filter_map(|i| Some((field.value(i)?, other.value(i)?)))
            .collect();
        if pairs.is_empty() {
            return Ok(bundle);
        }

        let n = pairs.len() as f64;
        let rmse = (pairs.iter().map(|(a, b)| (a - b).powi(2)).sum::<f64>() / n).sqrt();
        let mean_a = pairs.iter().map(|(a, _)| a).sum::<f64>() / n;
        let mean_b = pairs.iter().map(|(_, b)| b).sum::<f64>() / n;
        let cov: f64 = pairs.iter().map(|(a, b)| (a - mean_a) * (b - mean_b)).sum();
        let var_a: f64 = pairs.iter().map(|(a, _)| (a - mean_a).powi(2)).sum();
        let var_b: f64 = pairs.iter().map(|(_, b)| (b - mean_b).powi(2)).sum();
        let denom = (var_a * var_b).sqrt();

        bundle.rmse = Some(rmse);
        bundle.corr = if denom > 0.0 { Some(cov / denom) } else { None };
        Ok(bundle)
    }

    /// Build a bundle from a name → value mapping.
    pub fn from_map(map: &HashMap<String, f64>) -> DiagsResult<Self> {
        let required = |name: &str| {
            map.get(name).copied().ok_or_else(|| {
                DiagsError::invalid_parameter("stats", format!("missing '{}'", name))
            })
        };

        Ok(Self {
            max: required("max")?,
            min: required("min")?,
            mean: required("mean")?,
            std: required("std")?,
            rmse: map.get("rmse").copied(),
            corr: map.get("corr").copied(),
        })
    }

    /// Look up a statistic by name.
    pub fn get(&self, name: &str) -> Option<f64> {
        match name {
            "max" => Some(self.max),
            "min" => Some(self.min),
            "mean" => Some(self.mean),
            "std" => Some(self.std),
            "rmse" => self.rmse,
            "corr" => self.corr,
            _ => None,
        }
    }

    /// True when both comparison statistics are available.
    pub fn has_comparison(&self) -> bool {
        self.rmse.is_some() && self.corr.is_some()
    }
}

/// Statistics for the three panels of a comparison figure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsDict {
    pub test: StatsBundle,
    #[serde(rename = "ref")]
    pub reference: StatsBundle,
    pub diff: StatsBundle,
}

impl MetricsDict {
    /// Test and reference get plain descriptions; the difference panel
    /// carries RMSE and correlation of test against reference.
    pub fn compute(test: &Field, reference: &Field, diff: &Field) -> DiagsResult<Self> {
        let comparison = StatsBundle::compare(test, reference)?;
        let mut diff_stats = StatsBundle::describe(diff)?;
        diff_stats.rmse = comparison.rmse;
        diff_stats.corr = comparison.corr;

        Ok(Self {
            test: StatsBundle::describe(test)?,
            reference: StatsBundle::describe(reference)?,
            diff: diff_stats,
        })
    }
}
