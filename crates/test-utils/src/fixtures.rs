//! Common fixtures for diagnostics tests.

/// Contour levels used by the surface temperature tests (Kelvin).
pub const TS_LEVELS: [f64; 7] = [240.0, 250.0, 260.0, 270.0, 280.0, 290.0, 300.0];

/// Difference levels symmetric about zero.
pub const DIFF_LEVELS: [f64; 8] = [-5.0, -3.0, -2.0, -1.0, 1.0, 2.0, 3.0, 5.0];

/// Levels whose largest magnitude is below 1.
pub const SMALL_LEVELS: [f64; 5] = [-0.5, -0.25, 0.0, 0.25, 0.5];

/// Built-in region names exercised across the suite.
pub mod regions {
    pub const GLOBAL: &str = "global";
    pub const TROPICS: &str = "TROPICS";
    pub const NINO34: &str = "NINO34";
}

/// Colormap names used in parameter fixtures.
pub mod colormaps {
    pub const TEST: &str = "viridis";
    pub const REFERENCE: &str = "cet_rainbow.rgb";
    pub const DIFF: &str = "diverging_bwr.rgb";
}
