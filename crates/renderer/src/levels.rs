//! Contour level sets and colorbar label formatting.

use diags_common::{DiagsError, DiagsResult};

/// Sentinel added below and above user levels so every value falls in a bin.
pub const LEVEL_PAD: f64 = 1.0e8;

/// Colors spread over the bins of a boundary norm.
pub const BOUNDARY_COLORS: usize = 256;

/// Levels must be finite and non-decreasing.
pub fn validate_levels(levels: &[f64]) -> DiagsResult<()> {
    if let Some(bad) = levels.iter().find(|v| !v.is_finite()) {
        return Err(DiagsError::InvalidLevels(format!(
            "level {} is not finite",
            bad
        )));
    }
    if let Some(w) = levels.windows(2).find(|w| w[1] < w[0]) {
        return Err(DiagsError::InvalidLevels(format!(
            "levels must be non-decreasing, found {} after {}",
            w[1], w[0]
        )));
    }
    Ok(())
}

/// `[-1e8] + levels + [1e8]`, after validation.
pub fn padded_levels(levels: &[f64]) -> DiagsResult<Vec<f64>> {
    validate_levels(levels)?;
    let mut padded = Vec::with_capacity(levels.len() + 2);
    padded.push(-LEVEL_PAD);
    padded.extend_from_slice(levels);
    padded.push(LEVEL_PAD);
    Ok(padded)
}

/// printf-style `%W.Pf` format and tick padding for colorbar labels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorbarFormat {
    pub width: usize,
    pub precision: usize,
    /// Label padding in points.
    pub pad: f32,
}

impl ColorbarFormat {
    /// Choose the format from the largest absolute level.
    pub fn for_magnitude(maxval: f64) -> Self {
        let (width, precision, pad) = if maxval < 1.0 {
            (5, 3, 30.0)
        } else if maxval < 10.0 {
            (5, 2, 25.0)
        } else if maxval < 100.0 {
            (5, 1, 25.0)
        } else {
            (6, 1, 30.0)
        };
        Self {
            width,
            precision,
            pad,
        }
    }

    pub fn for_levels(levels: &[f64]) -> Self {
        let maxval = levels.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        Self::for_magnitude(maxval)
    }

    /// The printf pattern, e.g. `%5.3f`.
    pub fn pattern(&self) -> String {
        format!("%{}.{}f", self.width, self.precision)
    }

    /// Format like printf: right-aligned in `width` with `precision` decimals.
    pub fn format(&self, value: f64) -> String {
        format!("{:>w$.p$}", value, w = self.width, p = self.precision)
    }
}

/// Colorbar tick labels for user levels.
pub fn colorbar_labels(levels: &[f64]) -> Vec<String> {
    let fmt = ColorbarFormat::for_levels(levels);
    levels.iter().map(|&v| fmt.format(v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_rule_boundaries() {
        assert_eq!(ColorbarFormat::for_magnitude(0.5).pattern(), "%5.3f");
        assert_eq!(ColorbarFormat::for_magnitude(1.0).pattern(), "%5.2f");
        assert_eq!(ColorbarFormat::for_magnitude(50.0).pattern(), "%5.1f");
        assert_eq!(ColorbarFormat::for_magnitude(100.0).pattern(), "%6.1f");
        assert_eq!(ColorbarFormat::for_magnitude(0.5).pad, 30.0);
        assert_eq!(ColorbarFormat::for_magnitude(50.0).pad, 25.0);
    }

    #[test]
    fn test_printf_like_output() {
        let fmt = ColorbarFormat::for_magnitude(0.5);
        assert_eq!(fmt.format(0.25), "0.250");
        assert_eq!(fmt.format(-0.5), "-0.500");
        let fmt = ColorbarFormat::for_magnitude(50.0);
        assert_eq!(fmt.format(5.0), "  5.0");
    }

    #[test]
    fn test_padded_levels() {
        assert_eq!(
            padded_levels(&[1.0, 2.0]).unwrap(),
            vec![-1.0e8, 1.0, 2.0, 1.0e8]
        );
        assert_eq!(padded_levels(&[]).unwrap(), vec![-1.0e8, 1.0e8]);
    }

    #[test]
    fn test_decreasing_levels_rejected() {
        assert!(matches!(
            validate_levels(&[1.0, 0.5]),
            Err(DiagsError::InvalidLevels(_))
        ));
        assert!(validate_levels(&[1.0, 1.0, 2.0]).is_ok());
        assert!(validate_levels(&[f64::NAN]).is_err());
    }
}
