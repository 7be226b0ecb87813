//! Native NetCDF reading using the netcdf library.
//!
//! Faster than the ncdump subprocess path and avoids printing whole
//! variables as text. Enabled with the `native` feature.

use std::path::Path;

use diags_common::Field;
use tracing::debug;

use crate::error::{NetCdfError, NetCdfResult};
use crate::{axis_with_units, build_field, Packing};

/// Read variable `name` with libnetcdf.
pub fn read_field(path: &Path, name: &str) -> NetCdfResult<Field> {
    let file = netcdf::open(path)
        .map_err(|e| NetCdfError::InvalidFormat(format!("Failed to open NetCDF: {}", e)))?;
    let variable = file
        .variable(name)
        .ok_or_else(|| NetCdfError::MissingData(format!("variable {}", name)))?;

    let mut axes = Vec::new();
    for dim in variable.dimensions() {
        let dim_name = dim.name();
        let len = dim.len();
        let (values, units) = match file.variable(&dim_name) {
            Some(coord) => {
                let values: Vec<f64> = coord.get_values(..).map_err(|e| {
                    NetCdfError::InvalidFormat(format!("Failed to read {}: {}", dim_name, e))
                })?;
                (values, get_str_attr(&coord, "units"))
            }
            None => ((0..len).map(|i| i as f64).collect(), None),
        };
        axes.push(axis_with_units(&dim_name, units, values));
    }

    let raw: Vec<f64> = variable
        .get_values(..)
        .map_err(|e| NetCdfError::InvalidFormat(format!("Failed to read {}: {}", name, e)))?;
    let packing = Packing::from_attributes(|attr| get_f64_attr(&variable, attr));
    let (data, mask) = packing.unpack(raw.into_iter().map(Some));

    let field = build_field(name, axes, data, mask, get_str_attr(&variable, "units"))?;
    debug!(shape = ?field.shape(), "Read variable via libnetcdf");
    Ok(field)
}

/// Check if a variable has an attribute with the given name.
fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

fn get_f64_attr(var: &netcdf::Variable, name: &str) -> Option<f64> {
    if !has_attr(var, name) {
        return None;
    }
    let attr_value = var.attribute_value(name)?.ok()?;
    f64::try_from(attr_value).ok()
}

fn get_str_attr(var: &netcdf::Variable, name: &str) -> Option<String> {
    if !has_attr(var, name) {
        return None;
    }
    match var.attribute_value(name)?.ok()? {
        netcdf::AttributeValue::Str(s) => Some(s),
        _ => None,
    }
}
