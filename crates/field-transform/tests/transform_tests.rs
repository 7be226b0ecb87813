//! Tests for unit conversion and range masking of fields.

use diags_common::{DiagsError, Field};
use field_transform::{add_cyclic, convert_units, difference, mask_by};
use test_utils::{
    assert_approx_eq, create_land_fraction_field, create_temperature_field, create_test_field,
    create_two_by_two_field,
};

// ============================================================================
// convert_units: special cases
// ============================================================================

#[test]
fn test_fraction_scaled_by_100() {
    let field = create_test_field("CLDTOT", "fraction", 6, 12, |lat, lon| {
        ((lat + 90.0) / 180.0 * (lon / 360.0)).clamp(0.0, 1.0)
    });
    let converted = convert_units(&field, "%").unwrap();

    assert_eq!(converted.units(), Some("%"));
    for (before, after) in field.data().iter().zip(converted.data()) {
        assert_eq!(*after, before * 100.0);
    }
}

#[test]
fn test_gpm_divided_by_980() {
    let field = create_test_field("Z3", "gpm", 4, 8, |lat, _| 5_000.0 + 10.0 * lat);
    let converted = convert_units(&field, "hectometer").unwrap();

    assert_eq!(converted.units(), Some("hectometer"));
    for (before, after) in field.data().iter().zip(converted.data()) {
        assert_approx_eq!(*after, before / 980.0, 1e-12);
    }
}

#[test]
fn test_unlabeled_sst_relabelled_only() {
    let field = create_two_by_two_field("SST", "degC", [1.0, 2.0, 3.0, 4.0]).without_units();
    let converted = convert_units(&field, "degC").unwrap();
    assert_eq!(converted.units(), Some("degC"));
    assert_eq!(converted.data(), field.data());
}

#[test]
fn test_unlabeled_icefrac_scaled() {
    let field = create_two_by_two_field("ICEFRAC", "1", [0.0, 0.25, 0.5, 1.0]).without_units();
    let converted = convert_units(&field, "%").unwrap();
    assert_eq!(converted.data(), &[0.0, 25.0, 50.0, 100.0]);
}

#[test]
fn test_unlabeled_other_field_is_an_error() {
    let field = create_two_by_two_field("TREFHT", "K", [1.0; 4]).without_units();
    let err = convert_units(&field, "K").unwrap_err();
    assert!(matches!(err, DiagsError::UnitConversion { .. }));
}

#[test]
fn test_mb_to_hpa_relabels_without_scaling() {
    let field = create_two_by_two_field("PSL", "mb", [1000.0, 1010.0, 990.0, 1020.0]);
    let converted = convert_units(&field, "hPa").unwrap();
    assert_eq!(converted.data(), field.data());
    assert_eq!(converted.units(), Some("hPa"));
}

#[test]
fn test_mb_to_pa_goes_through_registry() {
    let field = create_two_by_two_field("PSL", "mb", [1000.0, 1010.0, 990.0, 1020.0]);
    let converted = convert_units(&field, "Pa").unwrap();
    assert_eq!(converted.data(), &[100_000.0, 101_000.0, 99_000.0, 102_000.0]);
}

#[test]
fn test_mb_to_incompatible_unit_fails() {
    let field = create_two_by_two_field("PSL", "mb", [1000.0; 4]);
    assert!(convert_units(&field, "K").is_err());
}

// ============================================================================
// convert_units: generic path
// ============================================================================

#[test]
fn test_kelvin_to_celsius() {
    let field = create_temperature_field(4, 8);
    let converted = convert_units(&field, "degC").unwrap();
    for (before, after) in field.data().iter().zip(converted.data()) {
        assert_approx_eq!(*after, before - 273.15, 1e-9);
    }
}

#[test]
fn test_precip_rate_to_mm_per_day() {
    let field = create_two_by_two_field("PRECT", "m/s", [1e-8, 2e-8, 0.0, 5e-8]);
    let converted = convert_units(&field, "mm/day").unwrap();
    assert_approx_eq!(converted.data()[0], 0.864, 1e-9);
    assert_approx_eq!(converted.data()[3], 4.32, 1e-9);
}

#[test]
fn test_unknown_unit_pair_surfaces_error() {
    let field = create_two_by_two_field("X", "furlong/fortnight", [1.0; 4]);
    match convert_units(&field, "m/s") {
        Err(DiagsError::UnitConversion { from, to, .. }) => {
            assert_eq!(from, "furlong/fortnight");
            assert_eq!(to, "m/s");
        }
        other => panic!("expected conversion error, got {:?}", other),
    }
}

#[test]
fn test_convert_units_keeps_mask_and_input() {
    let field = create_two_by_two_field("TS", "K", [273.15; 4])
        .with_mask(vec![false, true, false, false])
        .unwrap();
    let snapshot = field.clone();
    let converted = convert_units(&field, "degC").unwrap();

    assert_eq!(converted.mask(), field.mask());
    assert_eq!(field, snapshot);
}

// ============================================================================
// mask_by
// ============================================================================

#[test]
fn test_mask_low_limit_marks_exactly_below() {
    let field = create_temperature_field(6, 12);
    let land = create_test_field("LANDFRAC", "fraction", 6, 12, |lat, lon| {
        ((lat + lon) / 450.0).clamp(0.0, 1.0)
    });

    let masked = mask_by(&field, &land, Some(0.65), None).unwrap();
    let mask = masked.mask().unwrap();
    for (i, m) in land.data().iter().enumerate() {
        assert_eq!(mask[i], *m < 0.65, "cell {}", i);
    }
    assert_eq!(masked.data(), field.data());
}

#[test]
fn test_mask_without_limits_is_identity_copy() {
    let field = create_temperature_field(4, 8)
        .with_mask(vec![false; 32])
        .unwrap();
    let land = create_land_fraction_field(4, 8);

    let out = mask_by(&field, &land, None, None).unwrap();
    assert_eq!(out, field);
}

#[test]
fn test_mask_does_not_mutate_inputs() {
    let field = create_temperature_field(4, 8);
    let land = create_land_fraction_field(4, 8);
    let field_before = field.clone();
    let land_before = land.clone();

    let _ = mask_by(&field, &land, Some(0.5), Some(0.9)).unwrap();

    assert_eq!(field, field_before);
    assert_eq!(land, land_before);
}

#[test]
fn test_mask_ors_with_existing_mask() {
    let field = create_two_by_two_field("TS", "K", [1.0, 2.0, 3.0, 4.0])
        .with_mask(vec![true, false, false, false])
        .unwrap();
    let land = create_two_by_two_field("LANDFRAC", "fraction", [1.0, 1.0, 0.0, 1.0]);

    let out = mask_by(&field, &land, Some(0.5), None).unwrap();
    assert_eq!(out.mask().unwrap(), &[true, false, true, false]);
}

#[test]
fn test_convert_then_mask_pipeline() {
    let trefht = create_temperature_field(6, 12);
    let land = create_land_fraction_field(6, 12);

    let test = mask_by(&convert_units(&trefht, "K").unwrap(), &land, Some(0.65), None).unwrap();
    let valid = test.valid_count();
    assert_eq!(valid, 36, "only the eastern half should survive");
}

// ============================================================================
// add_cyclic / difference
// ============================================================================

#[test]
fn test_cyclic_then_difference() {
    let test = create_two_by_two_field("TS", "K", [1.0, 2.0, 3.0, 4.0]);
    let reference = create_two_by_two_field("TS", "K", [0.5, 0.5, 0.5, 0.5]);

    let diff = difference(&test, &reference).unwrap();
    let wrapped = add_cyclic(&diff).unwrap();

    assert_eq!(wrapped.longitude().unwrap().values, vec![90.0, 270.0, 450.0]);
    assert_eq!(wrapped.data(), &[0.5, 1.5, 0.5, 2.5, 3.5, 2.5]);
}

#[test]
fn test_cyclic_rejects_missing_longitude() {
    let series = Field::series(
        "NINO34",
        diags_common::Axis::time(vec![0.0, 1.0]),
        vec![0.1, 0.2],
    )
    .unwrap();
    assert!(add_cyclic(&series).is_err());
}
