//! Named lon/lat regions used to set plot extents and tick spacing.

use serde::{Deserialize, Serialize};

use crate::error::{DiagsError, DiagsResult};

/// A named lon/lat rectangle in degrees.
///
/// Longitudes use the 0–360 convention of the model grids; `lon_east` may
/// exceed 360 for boxes that wrap past the prime meridian.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSpec {
    pub name: String,
    pub lon_west: f64,
    pub lon_east: f64,
    pub lat_south: f64,
    pub lat_north: f64,
}

/// Built-in regions: (name, lon_west, lon_east, lat_south, lat_north).
const REGIONS: &[(&str, f64, f64, f64, f64)] = &[
    ("global", 0.0, 360.0, -90.0, 90.0),
    ("60S60N", 0.0, 360.0, -60.0, 60.0),
    ("TROPICS", 0.0, 360.0, -20.0, 20.0),
    ("20S20N", 0.0, 360.0, -20.0, 20.0),
    ("20N50N", 0.0, 360.0, 20.0, 50.0),
    ("50S20S", 0.0, 360.0, -50.0, -20.0),
    ("50N90N", 0.0, 360.0, 50.0, 90.0),
    ("90S50S", 0.0, 360.0, -90.0, -50.0),
    ("NHEX", 0.0, 360.0, 30.0, 90.0),
    ("SHEX", 0.0, 360.0, -90.0, -30.0),
    ("polar_N", 0.0, 360.0, 50.0, 90.0),
    ("polar_S", 0.0, 360.0, -90.0, -55.0),
    ("NINO12", 270.0, 280.0, -10.0, 0.0),
    ("NINO3", 210.0, 270.0, -5.0, 5.0),
    ("NINO34", 190.0, 240.0, -5.0, 5.0),
    ("NINO4", 160.0, 210.0, -5.0, 5.0),
    ("CONUS", 235.0, 295.0, 20.0, 50.0),
];

impl RegionSpec {
    /// Create a region, rejecting degenerate or out-of-range rectangles.
    pub fn new(
        name: impl Into<String>,
        lon_west: f64,
        lon_east: f64,
        lat_south: f64,
        lat_north: f64,
    ) -> DiagsResult<Self> {
        let region = Self {
            name: name.into(),
            lon_west,
            lon_east,
            lat_south,
            lat_north,
        };
        region.validate()?;
        Ok(region)
    }

    /// The whole globe, 0–360 / -90–90.
    pub fn global() -> Self {
        Self {
            name: "global".to_string(),
            lon_west: 0.0,
            lon_east: 360.0,
            lat_south: -90.0,
            lat_north: 90.0,
        }
    }

    /// Look up a built-in region by name.
    pub fn lookup(name: &str) -> DiagsResult<Self> {
        REGIONS
            .iter()
            .find(|(n, ..)| *n == name)
            .map(|&(n, w, e, s, north)| Self {
                name: n.to_string(),
                lon_west: w,
                lon_east: e,
                lat_south: s,
                lat_north: north,
            })
            .ok_or_else(|| DiagsError::InvalidRegion {
                name: name.to_string(),
                message: "not a known region".to_string(),
            })
    }

    /// Names of all built-in regions.
    pub fn known_names() -> impl Iterator<Item = &'static str> {
        REGIONS.iter().map(|(n, ..)| *n)
    }

    /// Parse "west,east,south,north" into a custom region.
    pub fn from_extent_str(name: &str, s: &str) -> DiagsResult<Self> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(DiagsError::InvalidRegion {
                name: name.to_string(),
                message: format!("expected 'west,east,south,north', got '{}'", s),
            });
        }

        let mut values = [0.0f64; 4];
        for (slot, part) in values.iter_mut().zip(&parts) {
            *slot = part.parse().map_err(|_| DiagsError::InvalidRegion {
                name: name.to_string(),
                message: format!("invalid number '{}'", part),
            })?;
        }

        Self::new(name, values[0], values[1], values[2], values[3])
    }

    pub fn validate(&self) -> DiagsResult<()> {
        let invalid = |message: String| DiagsError::InvalidRegion {
            name: self.name.clone(),
            message,
        };

        let all_finite = [self.lon_west, self.lon_east, self.lat_south, self.lat_north]
            .iter()
            .all(|v| v.is_finite());
        if !all_finite {
            return Err(invalid("bounds must be finite".to_string()));
        }
        if self.lon_east <= self.lon_west {
            return Err(invalid(format!(
                "lon_east {} must exceed lon_west {}",
                self.lon_east, self.lon_west
            )));
        }
        if self.lon_covered() > 360.0 {
            return Err(invalid("longitude span exceeds 360 degrees".to_string()));
        }
        if self.lat_north <= self.lat_south {
            return Err(invalid(format!(
                "lat_north {} must exceed lat_south {}",
                self.lat_north, self.lat_south
            )));
        }
        if self.lat_south < -90.0 || self.lat_north > 90.0 {
            return Err(invalid("latitudes must lie within [-90, 90]".to_string()));
        }
        Ok(())
    }

    /// Degrees of longitude covered.
    pub fn lon_covered(&self) -> f64 {
        self.lon_east - self.lon_west
    }

    /// Degrees of latitude covered.
    pub fn lat_covered(&self) -> f64 {
        self.lat_north - self.lat_south
    }

    /// Map aspect ratio (height / width) for a plate carrée panel.
    ///
    /// The full globe is drawn at aspect 360 / (2 * 180) = 1.
    pub fn aspect(&self) -> f64 {
        self.lon_covered() / (2.0 * self.lat_covered())
    }

    /// Check whether a point lies inside the region (longitude taken mod 360).
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        if lat < self.lat_south || lat > self.lat_north {
            return false;
        }
        let mut lon = lon;
        while lon < self.lon_west {
            lon += 360.0;
        }
        while lon > self.lon_west + 360.0 {
            lon -= 360.0;
        }
        lon <= self.lon_east
    }
}

impl Default for RegionSpec {
    fn default() -> Self {
        Self::global()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_region() {
        let nino34 = RegionSpec::lookup("NINO34").unwrap();
        assert_eq!(nino34.lon_covered(), 50.0);
        assert_eq!(nino34.lat_covered(), 10.0);
    }

    #[test]
    fn test_lookup_unknown_region() {
        let err = RegionSpec::lookup("ATLANTIS").unwrap_err();
        assert!(err.to_string().contains("ATLANTIS"));
    }

    #[test]
    fn test_builtin_regions_are_valid() {
        for name in RegionSpec::known_names() {
            RegionSpec::lookup(name).unwrap().validate().unwrap();
        }
    }

    #[test]
    fn test_degenerate_region_rejected() {
        assert!(RegionSpec::new("flat", 0.0, 10.0, 5.0, 5.0).is_err());
        assert!(RegionSpec::new("thin", 10.0, 10.0, 0.0, 5.0).is_err());
        assert!(RegionSpec::new("tall", 0.0, 10.0, -95.0, 5.0).is_err());
    }

    #[test]
    fn test_parse_extent() {
        let region = RegionSpec::from_extent_str("box", "100, 160, -10, 10").unwrap();
        assert_eq!(region.lon_west, 100.0);
        assert_eq!(region.lat_north, 10.0);
        assert!(RegionSpec::from_extent_str("box", "1,2,3").is_err());
        assert!(RegionSpec::from_extent_str("box", "a,2,3,4").is_err());
    }

    #[test]
    fn test_contains_wraps_longitude() {
        let region = RegionSpec::new("dateline", 160.0, 210.0, -5.0, 5.0).unwrap();
        assert!(region.contains(-170.0, 0.0));
        assert!(region.contains(170.0, 0.0));
        assert!(!region.contains(100.0, 0.0));
        assert!(!region.contains(170.0, 10.0));
    }

    #[test]
    fn test_global_aspect_is_one() {
        assert_eq!(RegionSpec::global().aspect(), 1.0);
    }
}
