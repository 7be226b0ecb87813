//! NetCDF reader for climatology and time-series files.
//!
//! Variables are read into [`diags_common::Field`]s with their coordinate
//! axes, units and missing-value mask.
//!
//! # Implementation Notes
//!
//! By default this uses the `ncdump` command-line tool and parses the CDL
//! text it prints (see [`cdl`]). Building with the `native` feature reads
//! files through libnetcdf instead, which requires libhdf5-dev and
//! libnetcdf-dev on the build host.
//!
//! Packed variables are unpacked with `scale_factor` / `add_offset`, and
//! cells equal to `_FillValue` or `missing_value` (or printed as `_`) are
//! masked.

pub mod cdl;
pub mod error;
#[cfg(feature = "native")]
pub mod native;

use std::path::Path;
use std::process::Command;

use diags_common::{Axis, AxisKind, Field};
use tracing::{debug, instrument};

pub use cdl::{AttrValue, CdlDataset, CdlDimension, CdlVariable};
pub use error::{NetCdfError, NetCdfResult};

/// Read variable `name` from the NetCDF file at `path`.
///
/// Files with a `.cdl` extension are read as CDL text directly.
#[instrument(skip_all, fields(var = name))]
pub fn read_field<P: AsRef<Path>>(path: P, name: &str) -> NetCdfResult<Field> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(NetCdfError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} does not exist", path.display()),
        )));
    }

    if path.extension().map_or(false, |ext| ext.eq_ignore_ascii_case("cdl")) {
        return read_field_cdl(path, name);
    }

    #[cfg(feature = "native")]
    {
        native::read_field(path, name)
    }
    #[cfg(not(feature = "native"))]
    {
        read_field_ncdump(path, name)
    }
}

/// Read variable `name` by parsing `ncdump` output.
pub fn read_field_ncdump(path: &Path, name: &str) -> NetCdfResult<Field> {
    let header = cdl::parse(&run_ncdump(path, &["-h"])?)?;
    if header.variable(name).is_none() {
        return Err(NetCdfError::MissingData(format!(
            "variable {} in {}",
            name,
            path.display()
        )));
    }

    let mut wanted = vec![name.to_string()];
    wanted.extend(header.coordinate_names(name));
    let selection = wanted.join(",");

    let dataset = cdl::parse(&run_ncdump(path, &["-p", "9,17", "-v", &selection])?)?;
    let field = field_from_cdl(&dataset, name)?;
    debug!(shape = ?field.shape(), units = ?field.units(), "Read variable via ncdump");
    Ok(field)
}

/// Read variable `name` from a CDL text file, as written by `ncdump`.
pub fn read_field_cdl(path: &Path, name: &str) -> NetCdfResult<Field> {
    let dataset = cdl::parse(&std::fs::read_to_string(path)?)?;
    let field = field_from_cdl(&dataset, name)?;
    debug!(shape = ?field.shape(), units = ?field.units(), "Read variable from CDL text");
    Ok(field)
}

/// List the data variables (non-coordinate) declared in a file.
pub fn list_variables<P: AsRef<Path>>(path: P) -> NetCdfResult<Vec<String>> {
    let header = cdl::parse(&run_ncdump(path.as_ref(), &["-h"])?)?;
    Ok(header
        .variables
        .iter()
        .filter(|v| header.dimension(&v.name).is_none())
        .map(|v| v.name.clone())
        .collect())
}

fn run_ncdump(path: &Path, args: &[&str]) -> NetCdfResult<String> {
    let output = Command::new("ncdump")
        .args(args)
        .arg(path)
        .output()
        .map_err(|e| NetCdfError::CommandError(format!("Failed to run ncdump: {}", e)))?;

    if !output.status.success() {
        return Err(NetCdfError::CommandError(format!(
            "ncdump failed: {}",
            String::from_utf8_lossy(&output.stderr)
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Build a field from a parsed CDL dataset that includes `name`'s data.
pub fn field_from_cdl(dataset: &CdlDataset, name: &str) -> NetCdfResult<Field> {
    let variable = dataset
        .variable(name)
        .ok_or_else(|| NetCdfError::MissingData(format!("variable {}", name)))?;
    let raw = variable
        .data
        .as_ref()
        .ok_or_else(|| NetCdfError::MissingData(format!("data section for {}", name)))?;

    let mut axes = Vec::with_capacity(variable.dimensions.len());
    for dim_name in &variable.dimensions {
        let dim = dataset
            .dimension(dim_name)
            .ok_or_else(|| NetCdfError::MissingData(format!("dimension {}", dim_name)))?;
        axes.push(axis_from_cdl(dataset, dim_name, dim.len)?);
    }

    let packing =
        Packing::from_attributes(|attr| variable.attribute(attr).and_then(AttrValue::as_number));
    let (data, mask) = packing.unpack(raw.iter().copied());

    let units = variable
        .attribute("units")
        .and_then(AttrValue::as_text)
        .map(str::to_string);
    build_field(name, axes, data, mask, units)
}

fn axis_from_cdl(dataset: &CdlDataset, dim_name: &str, len: usize) -> NetCdfResult<Axis> {
    let coord = dataset.variable(dim_name).filter(|v| v.dimensions.len() == 1);
    let units = coord
        .and_then(|v| v.attribute("units"))
        .and_then(AttrValue::as_text)
        .map(str::to_string);

    let values = match coord.and_then(|v| v.data.as_ref()) {
        Some(values) => {
            if values.len() != len {
                return Err(NetCdfError::InvalidFormat(format!(
                    "coordinate {} has {} values, dimension has {}",
                    dim_name,
                    values.len(),
                    len
                )));
            }
            values.iter().map(|v| v.unwrap_or(f64::NAN)).collect()
        }
        None => (0..len).map(|i| i as f64).collect(),
    };

    Ok(axis_with_units(dim_name, units, values))
}

pub(crate) fn axis_with_units(name: &str, units: Option<String>, values: Vec<f64>) -> Axis {
    let kind = AxisKind::infer(name, units.as_deref());
    let axis = Axis::new(name, kind, values);
    match units {
        Some(u) => axis.with_units(u),
        None => axis,
    }
}

pub(crate) fn build_field(
    name: &str,
    axes: Vec<Axis>,
    data: Vec<f64>,
    mask: Vec<bool>,
    units: Option<String>,
) -> NetCdfResult<Field> {
    let to_format = |e: diags_common::DiagsError| NetCdfError::InvalidFormat(e.to_string());
    let mut field = Field::new(name, axes, data).map_err(to_format)?;
    if mask.iter().any(|&m| m) {
        field = field.with_mask(mask).map_err(to_format)?;
    }
    if let Some(units) = units {
        field = field.with_units(units);
    }
    Ok(field)
}

/// CF packing and missing-value attributes of a variable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Packing {
    scale_factor: f64,
    add_offset: f64,
    fill_value: Option<f64>,
    missing_value: Option<f64>,
}

impl Packing {
    pub(crate) fn from_attributes(get: impl Fn(&str) -> Option<f64>) -> Self {
        Self {
            scale_factor: get("scale_factor").unwrap_or(1.0),
            add_offset: get("add_offset").unwrap_or(0.0),
            fill_value: get("_FillValue"),
            missing_value: get("missing_value"),
        }
    }

    fn is_missing(&self, raw: f64) -> bool {
        raw.is_nan() || Some(raw) == self.fill_value || Some(raw) == self.missing_value
    }

    /// Unpack raw values; missing cells become NaN and are flagged in the mask.
    pub(crate) fn unpack(&self, raw: impl Iterator<Item = Option<f64>>) -> (Vec<f64>, Vec<bool>) {
        raw.map(|value| match value {
            Some(v) if !self.is_missing(v) => (v * self.scale_factor + self.add_offset, false),
            _ => (f64::NAN, true),
        })
        .unzip()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packing_unpacks_and_masks() {
        let packing = Packing::from_attributes(|name| match name {
            "scale_factor" => Some(0.5),
            "add_offset" => Some(200.0),
            "_FillValue" => Some(-1.0),
            _ => None,
        });
        let (data, mask) = packing.unpack([Some(10.0), Some(-1.0), None].into_iter());
        assert_eq!(data[0], 205.0);
        assert!(data[1].is_nan() && data[2].is_nan());
        assert_eq!(mask, vec![false, true, true]);
    }

    #[test]
    fn test_index_axis_when_no_coordinate_variable() {
        let ds = cdl::parse(
            "netcdf x {\ndimensions:\n\tn = 3 ;\nvariables:\n\tdouble v(n) ;\n\
             data:\n v = 1, 2, 3 ;\n}\n",
        )
        .unwrap();
        let field = field_from_cdl(&ds, "v").unwrap();
        assert_eq!(field.axes()[0].values, vec![0.0, 1.0, 2.0]);
        assert_eq!(field.axes()[0].kind, AxisKind::Other);
        assert!(field.mask().is_none());
        assert_eq!(field.units(), None);
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_field("/nonexistent/TS_ANN_climo.nc", "TS").unwrap_err();
        assert!(matches!(err, NetCdfError::IoError(_)));
    }
}
