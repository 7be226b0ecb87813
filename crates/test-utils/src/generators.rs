//! Synthetic climate fields with predictable values.

use diags_common::{Axis, Field};

/// Cell-centred latitudes and longitudes for a regular global grid.
///
/// Latitudes run south to north, longitudes start at 0.
pub fn global_axes(nlat: usize, nlon: usize) -> (Vec<f64>, Vec<f64>) {
    let dlat = 180.0 / nlat as f64;
    let dlon = 360.0 / nlon as f64;
    let lat = (0..nlat).map(|j| -90.0 + dlat * (j as f64 + 0.5)).collect();
    let lon = (0..nlon).map(|i| dlon * (i as f64 + 0.5)).collect();
    (lat, lon)
}

/// Build a global `(lat, lon)` field from `f(lat, lon)`.
pub fn create_test_field<F>(id: &str, units: &str, nlat: usize, nlon: usize, f: F) -> Field
where
    F: Fn(f64, f64) -> f64,
{
    let (lat, lon) = global_axes(nlat, nlon);
    let mut data = Vec::with_capacity(nlat * nlon);
    for &y in &lat {
        for &x in &lon {
            data.push(f(y, x));
        }
    }
    Field::lat_lon(id, lat, lon, data)
        .expect("generated grid is consistent")
        .with_units(units)
}

/// Surface temperature in Kelvin, warm at the equator and cold at the poles.
///
/// Values range from about 240 K to 300 K.
pub fn create_temperature_field(nlat: usize, nlon: usize) -> Field {
    create_test_field("TS", "K", nlat, nlon, |lat, lon| {
        240.0 + 60.0 * lat.to_radians().cos() + lon.to_radians().sin()
    })
}

/// Land fraction: 1 in the eastern hemisphere, 0 in the western.
pub fn create_land_fraction_field(nlat: usize, nlon: usize) -> Field {
    create_test_field("LANDFRAC", "fraction", nlat, nlon, |_, lon| {
        if lon < 180.0 {
            1.0
        } else {
            0.0
        }
    })
}

/// A 2x2 lon/lat field with the given row-major values.
///
/// Latitudes are -45/45 and longitudes 90/270.
pub fn create_two_by_two_field(id: &str, units: &str, values: [f64; 4]) -> Field {
    Field::lat_lon(id, vec![-45.0, 45.0], vec![90.0, 270.0], values.to_vec())
        .expect("2x2 grid is consistent")
        .with_units(units)
}

/// Copy of `field` with `offset` added to every value.
pub fn offset_field(field: &Field, offset: f64) -> Field {
    field.map_values(|v| v + offset)
}

/// A monthly time series along a `time` axis.
pub fn create_series(id: &str, units: &str, values: Vec<f64>) -> Field {
    let time = (0..values.len()).map(|t| t as f64).collect();
    Field::series(id, Axis::time(time), values)
        .expect("series is consistent")
        .with_units(units)
}

/// Paired anomalies with a different slope on each side of zero.
///
/// `x` runs evenly from `-span` to `span`; `y = slope_pos * x` for `x > 0`
/// and `y = slope_neg * x` otherwise.
pub fn create_regime_anomalies(
    n: usize,
    span: f64,
    slope_pos: f64,
    slope_neg: f64,
) -> (Vec<f64>, Vec<f64>) {
    let step = if n > 1 { 2.0 * span / (n - 1) as f64 } else { 0.0 };
    let x: Vec<f64> = (0..n).map(|i| -span + step * i as f64).collect();
    let y = x
        .iter()
        .map(|&v| if v > 0.0 { slope_pos * v } else { slope_neg * v })
        .collect();
    (x, y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_axes() {
        let (lat, lon) = global_axes(4, 8);
        assert_eq!(lat, vec![-67.5, -22.5, 22.5, 67.5]);
        assert_eq!(lon[0], 22.5);
        assert_eq!(lon.len(), 8);
    }

    #[test]
    fn test_temperature_field_range() {
        let field = create_temperature_field(18, 36);
        for v in field.data() {
            assert!((239.0..=301.0).contains(v), "out of range: {}", v);
        }
        assert_eq!(field.units(), Some("K"));
    }

    #[test]
    fn test_two_by_two_layout() {
        let field = create_two_by_two_field("TS", "K", [1.0, 2.0, 3.0, 4.0]);
        assert_eq!(field.shape(), vec![2, 2]);
        assert_eq!(field.latitude().unwrap().values, vec![-45.0, 45.0]);
    }

    #[test]
    fn test_regime_anomalies() {
        let (x, y) = create_regime_anomalies(5, 2.0, 3.0, 1.0);
        assert_eq!(x, vec![-2.0, -1.0, 0.0, 1.0, 2.0]);
        assert_eq!(y, vec![-2.0, -1.0, 0.0, 3.0, 6.0]);
    }
}
