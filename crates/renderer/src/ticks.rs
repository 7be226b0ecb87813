//! Map tick placement and degree labels.

/// Tick spacing in degrees for an extent of `degrees_covered`.
pub fn determine_tick_step(degrees_covered: f64) -> f64 {
    if degrees_covered > 180.0 {
        60.0
    } else if degrees_covered > 60.0 {
        30.0
    } else if degrees_covered > 20.0 {
        10.0
    } else {
        1.0
    }
}

/// `start, start + step, ...` strictly below `stop`.
fn arange(start: f64, stop: f64, step: f64) -> Vec<f64> {
    if step <= 0.0 || stop <= start {
        return Vec::new();
    }
    let n = ((stop - start) / step).ceil() as usize;
    (0..n).map(|i| start + i as f64 * step).collect()
}

/// Longitude ticks: every step from `west`, plus `east - 0.5` so the
/// closing meridian shows on the right edge without overlapping the left.
pub fn longitude_ticks(west: f64, east: f64) -> Vec<f64> {
    let mut ticks = arange(west, east, determine_tick_step(east - west));
    ticks.push(east - 0.5);
    ticks
}

/// Latitude ticks: every step from `south`, plus `north`.
pub fn latitude_ticks(south: f64, north: f64) -> Vec<f64> {
    let mut ticks = arange(south, north, determine_tick_step(north - south));
    ticks.push(north);
    ticks
}

/// Degree label for a longitude, wrapped to (-180, 180]: `60°E`, `120°W`,
/// `0°E` at zero, `180°` on the antimeridian.
pub fn format_longitude(lon: f64) -> String {
    let mut wrapped = (lon + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 {
        wrapped = 180.0;
    }
    if wrapped == 0.0 {
        return "0°E".to_string();
    }
    let magnitude = wrapped.abs().round_ties_even();
    if magnitude == 180.0 {
        "180°".to_string()
    } else if wrapped > 0.0 {
        format!("{}°E", magnitude)
    } else {
        format!("{}°W", magnitude)
    }
}

/// Degree label for a latitude: `30°N`, `45°S`, `0°`.
pub fn format_latitude(lat: f64) -> String {
    let magnitude = format_g(lat.abs());
    if magnitude == "0" {
        "0°".to_string()
    } else if lat > 0.0 {
        format!("{}°N", magnitude)
    } else {
        format!("{}°S", magnitude)
    }
}

/// Shortest decimal form, like printf `%g` for typical tick values.
fn format_g(v: f64) -> String {
    if v.fract() == 0.0 {
        return format!("{:.0}", v);
    }
    let s = format!("{:.4}", v);
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}
