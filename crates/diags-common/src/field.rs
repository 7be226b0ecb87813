//! Gridded physical fields with units, masks and coordinate axes.

use serde::{Deserialize, Serialize};

use crate::error::{DiagsError, DiagsResult};

/// Role of a coordinate axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisKind {
    Longitude,
    Latitude,
    Time,
    Level,
    Other,
}

impl AxisKind {
    /// Guess the axis role from a NetCDF dimension name and its units.
    ///
    /// Follows the CF conventions loosely: `degrees_east` / `degrees_north`
    /// win over the name, then common names (`lon`, `lat`, `time`, `lev`,
    /// `plev`) are recognised.
    pub fn infer(name: &str, units: Option<&str>) -> Self {
        if let Some(units) = units {
            let units = units.to_ascii_lowercase();
            if units.starts_with("degrees_east") || units == "degree_east" {
                return AxisKind::Longitude;
            }
            if units.starts_with("degrees_north") || units == "degree_north" {
                return AxisKind::Latitude;
            }
            if units.contains(" since ") {
                return AxisKind::Time;
            }
        }

        match name.to_ascii_lowercase().as_str() {
            "lon" | "longitude" | "x" => AxisKind::Longitude,
            "lat" | "latitude" | "y" => AxisKind::Latitude,
            "time" | "t" => AxisKind::Time,
            "lev" | "level" | "plev" | "ilev" | "z" | "depth" => AxisKind::Level,
            _ => AxisKind::Other,
        }
    }
}

/// A coordinate axis attached to a field dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    pub name: String,
    pub kind: AxisKind,
    pub values: Vec<f64>,
    pub units: Option<String>,
}

impl Axis {
    pub fn new(name: impl Into<String>, kind: AxisKind, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            kind,
            values,
            units: None,
        }
    }

    /// Longitude axis in `degrees_east`.
    pub fn longitude(values: Vec<f64>) -> Self {
        Self {
            units: Some("degrees_east".to_string()),
            ..Self::new("lon", AxisKind::Longitude, values)
        }
    }

    /// Latitude axis in `degrees_north`.
    pub fn latitude(values: Vec<f64>) -> Self {
        Self {
            units: Some("degrees_north".to_string()),
            ..Self::new("lat", AxisKind::Latitude, values)
        }
    }

    pub fn time(values: Vec<f64>) -> Self {
        Self::new("time", AxisKind::Time, values)
    }

    pub fn level(values: Vec<f64>) -> Self {
        Self::new("lev", AxisKind::Level, values)
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A labelled, optionally masked, gridded array.
///
/// Data is stored row-major in axis order, so for a `(lat, lon)` field the
/// longitude index varies fastest. A mask entry of `true` marks an invalid
/// cell. The mask (when present) always has the same length as the data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    id: String,
    units: Option<String>,
    data: Vec<f64>,
    mask: Option<Vec<bool>>,
    axes: Vec<Axis>,
}

impl Field {
    /// Create a field, checking that the data matches the axis lengths.
    pub fn new(id: impl Into<String>, axes: Vec<Axis>, data: Vec<f64>) -> DiagsResult<Self> {
        let expected: usize = axes.iter().map(Axis::len).product();
        if data.len() != expected {
            return Err(DiagsError::ShapeMismatch {
                expected: axes.iter().map(Axis::len).collect(),
                actual: vec![data.len()],
            });
        }

        Ok(Self {
            id: id.into(),
            units: None,
            data,
            mask: None,
            axes,
        })
    }

    /// Convenience constructor for a `(lat, lon)` field.
    pub fn lat_lon(
        id: impl Into<String>,
        lat: Vec<f64>,
        lon: Vec<f64>,
        data: Vec<f64>,
    ) -> DiagsResult<Self> {
        Self::new(id, vec![Axis::latitude(lat), Axis::longitude(lon)], data)
    }

    /// Convenience constructor for a 1-D series along a single axis.
    pub fn series(id: impl Into<String>, axis: Axis, data: Vec<f64>) -> DiagsResult<Self> {
        Self::new(id, vec![axis], data)
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }

    pub fn without_units(mut self) -> Self {
        self.units = None;
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Attach a mask; it must have one entry per data value.
    pub fn with_mask(mut self, mask: Vec<bool>) -> DiagsResult<Self> {
        if mask.len() != self.data.len() {
            return Err(DiagsError::ShapeMismatch {
                expected: self.shape(),
                actual: vec![mask.len()],
            });
        }
        self.mask = Some(mask);
        Ok(self)
    }

    /// Replace the data, keeping axes, units and mask.
    pub fn with_data(mut self, data: Vec<f64>) -> DiagsResult<Self> {
        if data.len() != self.data.len() {
            return Err(DiagsError::ShapeMismatch {
                expected: self.shape(),
                actual: vec![data.len()],
            });
        }
        self.data = data;
        Ok(self)
    }

    /// Replace axes, data and mask together (used when the grid changes shape).
    pub fn regrid_parts(
        &self,
        axes: Vec<Axis>,
        data: Vec<f64>,
        mask: Option<Vec<bool>>,
    ) -> DiagsResult<Self> {
        let mut field = Field::new(self.id.clone(), axes, data)?;
        field.units = self.units.clone();
        match mask {
            Some(mask) => field.with_mask(mask),
            None => Ok(field),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn units(&self) -> Option<&str> {
        self.units.as_deref()
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn mask(&self) -> Option<&[bool]> {
        self.mask.as_deref()
    }

    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    pub fn shape(&self) -> Vec<usize> {
        self.axes.iter().map(Axis::len).collect()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn axis(&self, kind: AxisKind) -> Option<&Axis> {
        self.axes.iter().find(|a| a.kind == kind)
    }

    pub fn axis_index(&self, kind: AxisKind) -> Option<usize> {
        self.axes.iter().position(|a| a.kind == kind)
    }

    pub fn longitude(&self) -> Option<&Axis> {
        self.axis(AxisKind::Longitude)
    }

    pub fn latitude(&self) -> Option<&Axis> {
        self.axis(AxisKind::Latitude)
    }

    /// True when the cell is masked or holds a NaN.
    pub fn is_masked(&self, idx: usize) -> bool {
        let masked = self
            .mask
            .as_ref()
            .and_then(|m| m.get(idx).copied())
            .unwrap_or(false);
        masked || self.data.get(idx).map_or(true, |v| v.is_nan())
    }

    /// Value at a flat index, `None` if masked.
    pub fn value(&self, idx: usize) -> Option<f64> {
        if self.is_masked(idx) {
            None
        } else {
            self.data.get(idx).copied()
        }
    }

    /// Iterate over unmasked, finite values.
    pub fn valid_values(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.data.len()).filter_map(move |i| self.value(i))
    }

    pub fn valid_count(&self) -> usize {
        self.valid_values().count()
    }

    /// Apply `f` to every value, returning a new field with the same mask.
    pub fn map_values<F>(&self, f: F) -> Field
    where
        F: Fn(f64) -> f64,
    {
        Field {
            data: self.data.iter().map(|&v| f(v)).collect(),
            ..self.clone()
        }
    }

    /// Same-shape check used by binary operations.
    pub fn ensure_same_shape(&self, other: &Field) -> DiagsResult<()> {
        if self.shape() != other.shape() {
            return Err(DiagsError::ShapeMismatch {
                expected: self.shape(),
                actual: other.shape(),
            });
        }
        Ok(())
    }

    /// Drop length-1 axes and require a `(lat, lon)` field.
    pub fn squeeze_2d(&self) -> DiagsResult<Field> {
        let axes: Vec<Axis> = self.axes.iter().filter(|a| a.len() != 1).cloned().collect();
        let kinds: Vec<AxisKind> = axes.iter().map(|a| a.kind).collect();
        if kinds != [AxisKind::Latitude, AxisKind::Longitude] {
            return Err(DiagsError::InvalidField(format!(
                "'{}' does not squeeze to (lat, lon): axes {:?}",
                self.id, kinds
            )));
        }

        Ok(Field {
            axes,
            ..self.clone()
        })
    }
}
