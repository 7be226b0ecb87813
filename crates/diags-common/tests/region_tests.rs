//! Tests for region specifications and error classification.

use diags_common::{DiagsError, RegionSpec};

// ============================================================================
// Constructor tests
// ============================================================================

#[test]
fn test_region_new_valid() {
    let region = RegionSpec::new("box", 100.0, 160.0, -10.0, 10.0).unwrap();
    assert_eq!(region.lon_covered(), 60.0);
    assert_eq!(region.lat_covered(), 20.0);
}

#[test]
fn test_region_default_is_global() {
    let region = RegionSpec::default();
    assert_eq!(region.name, "global");
    assert_eq!(region.lon_covered(), 360.0);
    assert_eq!(region.lat_covered(), 180.0);
}

#[test]
fn test_region_wrapping_past_360_is_allowed() {
    let region = RegionSpec::new("pacific", 120.0, 420.0, -30.0, 30.0).unwrap();
    assert_eq!(region.lon_covered(), 300.0);
}

#[test]
fn test_region_more_than_full_circle_rejected() {
    let err = RegionSpec::new("too_wide", 0.0, 400.0, -30.0, 30.0).unwrap_err();
    assert!(matches!(err, DiagsError::InvalidRegion { .. }));
}

#[test]
fn test_region_nan_rejected() {
    assert!(RegionSpec::new("nan", f64::NAN, 10.0, 0.0, 1.0).is_err());
}

// ============================================================================
// Lookup tests
// ============================================================================

#[test]
fn test_lookup_nino_boxes() {
    let nino3 = RegionSpec::lookup("NINO3").unwrap();
    assert_eq!((nino3.lon_west, nino3.lon_east), (210.0, 270.0));

    let nino4 = RegionSpec::lookup("NINO4").unwrap();
    assert_eq!((nino4.lat_south, nino4.lat_north), (-5.0, 5.0));
}

#[test]
fn test_lookup_is_case_sensitive() {
    assert!(RegionSpec::lookup("Global").is_err());
    assert!(RegionSpec::lookup("global").is_ok());
}

#[test]
fn test_region_serde_roundtrip_shape() {
    let region = RegionSpec::lookup("TROPICS").unwrap();
    let json = serde_json::to_string(&region).unwrap();
    assert!(json.contains("\"lat_south\":-20.0"));
}

// ============================================================================
// Error classification
// ============================================================================

#[test]
fn test_configuration_errors_classified() {
    assert!(DiagsError::UnsupportedBackend("vcs".into()).is_configuration_error());
    assert!(DiagsError::UnknownSet("set99".into()).is_configuration_error());
    assert!(!DiagsError::RenderError("boom".into()).is_configuration_error());
}

#[test]
fn test_unit_conversion_error_names_units() {
    let err = DiagsError::UnitConversion {
        from: "furlong".into(),
        to: "K".into(),
        reason: "unknown unit".into(),
    };
    let msg = err.to_string();
    assert!(msg.contains("furlong"));
    assert!(msg.contains("'K'"));
}
