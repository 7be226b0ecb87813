//! Plot parameters shared by every diagnostic set.

use std::path::{Path, PathBuf};

use diags_common::{DiagsError, DiagsResult, RegionSpec};
use renderer::OutputFormat;
use serde::{Deserialize, Serialize};

/// Backends whose figures this crate can draw.
pub const SUPPORTED_BACKENDS: [&str; 3] = ["cartopy", "mpl", "matplotlib"];

/// Configuration consumed by the plotting functions.
///
/// Every field has a default, so a JSON or YAML document only needs the
/// keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotParameters {
    pub backend: String,
    /// Width and height in inches.
    pub figsize: [f64; 2],
    pub dpi: f64,

    pub contour_levels: Vec<f64>,
    pub diff_levels: Vec<f64>,
    pub test_colormap: String,
    pub reference_colormap: String,
    pub diff_colormap: String,
    /// Only the first region is plotted.
    pub regions: Vec<String>,

    pub main_title: String,
    pub test_title: String,
    pub reference_title: String,
    pub diff_title: String,
    pub test_name_yrs: String,
    pub ref_name_yrs: String,

    pub results_dir: PathBuf,
    pub case_id: String,
    /// Set being rendered; empty means the renderer's own set name.
    pub current_set: String,
    pub output_file: String,
    pub output_format: Vec<String>,
    pub output_format_subplot: Vec<String>,
    /// Log output directories at info level.
    pub print_statements: bool,
}

impl Default for PlotParameters {
    fn default() -> Self {
        Self {
            backend: "cartopy".to_string(),
            figsize: [8.5, 11.0],
            dpi: 150.0,
            contour_levels: Vec::new(),
            diff_levels: Vec::new(),
            test_colormap: "cet_rainbow.rgb".to_string(),
            reference_colormap: "cet_rainbow.rgb".to_string(),
            diff_colormap: "diverging_bwr.rgb".to_string(),
            regions: vec!["global".to_string()],
            main_title: String::new(),
            test_title: String::new(),
            reference_title: String::new(),
            diff_title: "Model - Observation".to_string(),
            test_name_yrs: String::new(),
            ref_name_yrs: String::new(),
            results_dir: PathBuf::from("."),
            case_id: String::new(),
            current_set: String::new(),
            output_file: "output".to_string(),
            output_format: vec!["png".to_string()],
            output_format_subplot: Vec::new(),
            print_statements: false,
        }
    }
}

impl PlotParameters {
    pub fn from_json_str(json: &str) -> DiagsResult<Self> {
        let params: Self = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> DiagsResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Whether figures can be drawn for the configured backend.
    pub fn backend_supported(&self) -> bool {
        SUPPORTED_BACKENDS.contains(&self.backend.as_str())
    }

    /// The plotted region (first entry of `regions`, global if empty).
    pub fn region(&self) -> DiagsResult<RegionSpec> {
        match self.regions.first() {
            Some(name) => RegionSpec::lookup(name),
            None => Ok(RegionSpec::global()),
        }
    }

    pub fn output_formats(&self) -> DiagsResult<Vec<OutputFormat>> {
        self.output_format.iter().map(|f| OutputFormat::parse(f)).collect()
    }

    pub fn subplot_formats(&self) -> DiagsResult<Vec<OutputFormat>> {
        self.output_format_subplot.iter().map(|f| OutputFormat::parse(f)).collect()
    }

    /// Reject values no figure could be drawn with.
    ///
    /// The backend is not checked here; an unsupported backend skips
    /// plotting instead of failing.
    pub fn validate(&self) -> DiagsResult<()> {
        if self.figsize.iter().any(|s| !(*s > 0.0) || !s.is_finite()) {
            return Err(DiagsError::invalid_parameter(
                "figsize",
                format!("{:?} must be positive", self.figsize),
            ));
        }
        if !(self.dpi > 0.0) || !self.dpi.is_finite() {
            let message = format!("{} must be positive", self.dpi);
            return Err(DiagsError::invalid_parameter("dpi", message));
        }
        if self.output_file.is_empty() {
            return Err(DiagsError::invalid_parameter("output_file", "must not be empty"));
        }
        self.region()?;
        self.output_formats()?;
        self.subplot_formats()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = PlotParameters::default();
        assert_eq!(params.backend, "cartopy");
        assert_eq!(params.figsize, [8.5, 11.0]);
        assert_eq!(params.output_format, vec!["png"]);
        assert!(params.output_format_subplot.is_empty());
        assert!(params.backend_supported());
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let params = PlotParameters::from_json_str(
            r#"{"backend": "mpl", "contour_levels": [1, 2, 3], "output_format": ["PNG", "jpg"]}"#,
        )
        .unwrap();
        assert_eq!(params.backend, "mpl");
        assert_eq!(params.contour_levels, vec![1.0, 2.0, 3.0]);
        assert_eq!(params.dpi, 150.0);
        assert_eq!(
            params.output_formats().unwrap(),
            vec![OutputFormat::Png, OutputFormat::Jpeg]
        );
    }

    #[test]
    fn test_unsupported_backend_is_not_a_validation_error() {
        let params = PlotParameters {
            backend: "vcs".into(),
            ..Default::default()
        };
        assert!(!params.backend_supported());
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_validation_errors() {
        let bad_format = PlotParameters {
            output_format: vec!["svg".into()],
            ..Default::default()
        };
        assert!(matches!(bad_format.validate(), Err(DiagsError::UnsupportedFormat(_))));

        let bad_dpi = PlotParameters {
            dpi: 0.0,
            ..Default::default()
        };
        assert!(matches!(bad_dpi.validate(), Err(DiagsError::InvalidParameter { .. })));

        let bad_region = PlotParameters {
            regions: vec!["ATLANTIS".into()],
            ..Default::default()
        };
        assert!(bad_region.validate().is_err());
    }

    #[test]
    fn test_malformed_json_is_config_error() {
        let err = PlotParameters::from_json_str("{not json").unwrap_err();
        assert!(err.is_configuration_error());
    }
}
