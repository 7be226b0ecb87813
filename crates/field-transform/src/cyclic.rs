//! Cyclic longitude wrapping so map fills have no seam at the wrap point.

use diags_common::{Axis, AxisKind, DiagsError, DiagsResult, Field};

/// Append a longitude column at `lon[0] + 360` that repeats the first column.
///
/// The longitude axis must be the last (fastest varying) axis.
pub fn add_cyclic(field: &Field) -> DiagsResult<Field> {
    let axes = field.axes();
    let lon_idx = field.axis_index(AxisKind::Longitude).ok_or_else(|| {
        DiagsError::InvalidField(format!("'{}' has no longitude axis", field.id()))
    })?;
    if lon_idx != axes.len() - 1 {
        return Err(DiagsError::InvalidField(format!(
            "'{}' longitude must be the last axis",
            field.id()
        )));
    }

    let lon = &axes[lon_idx];
    let nlon = lon.len();
    if nlon == 0 {
        return Err(DiagsError::InvalidField(format!(
            "'{}' has an empty longitude axis",
            field.id()
        )));
    }

    let mut lon_values = lon.values.clone();
    lon_values.push(lon.values[0] + 360.0);
    let mut new_axes: Vec<Axis> = axes.to_vec();
    new_axes[lon_idx] = Axis {
        values: lon_values,
        ..lon.clone()
    };

    let rows = field.len() / nlon;
    let mut data = Vec::with_capacity(rows * (nlon + 1));
    let mut mask = field.mask().map(|_| Vec::with_capacity(rows * (nlon + 1)));

    for row in field.data().chunks_exact(nlon) {
        data.extend_from_slice(row);
        data.push(row[0]);
    }
    if let (Some(out), Some(src)) = (mask.as_mut(), field.mask()) {
        for row in src.chunks_exact(nlon) {
            out.extend_from_slice(row);
            out.push(row[0]);
        }
    }

    field.regrid_parts(new_axes, data, mask)
}
