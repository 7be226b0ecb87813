//! Cell-wise arithmetic between fields on identical grids.

use diags_common::{DiagsResult, Field};

/// `test - reference`, cell by cell. Grids must match exactly.
///
/// The result is masked wherever either input is masked and carries the
/// test field's units.
pub fn difference(test: &Field, reference: &Field) -> DiagsResult<Field> {
    test.ensure_same_shape(reference)?;

    let data: Vec<f64> = test
        .data()
        .iter()
        .zip(reference.data())
        .map(|(a, b)| a - b)
        .collect();

    let mask = match (test.mask(), reference.mask()) {
        (None, None) => None,
        _ => Some((0..test.len()).map(|i| test.is_masked(i) || reference.is_masked(i)).collect()),
    };

    let diff = test
        .regrid_parts(test.axes().to_vec(), data, mask)?
        .with_id(format!("{}_diff", test.id()));
    Ok(diff)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difference_combines_masks() {
        let a = Field::lat_lon("TS", vec![0.0], vec![0.0, 1.0], vec![5.0, 7.0])
            .unwrap()
            .with_units("K");
        let b = Field::lat_lon("TS", vec![0.0], vec![0.0, 1.0], vec![2.0, 3.0])
            .unwrap()
            .with_mask(vec![false, true])
            .unwrap();

        let diff = difference(&a, &b).unwrap();
        assert_eq!(diff.data(), &[3.0, 4.0]);
        assert_eq!(diff.mask().unwrap(), &[false, true]);
        assert_eq!(diff.units(), Some("K"));
        assert_eq!(diff.id(), "TS_diff");
    }

    #[test]
    fn test_difference_shape_mismatch() {
        let a = Field::lat_lon("A", vec![0.0], vec![0.0, 1.0], vec![1.0, 2.0]).unwrap();
        let b = Field::lat_lon("B", vec![0.0, 1.0], vec![0.0], vec![1.0, 2.0]).unwrap();
        assert!(difference(&a, &b).is_err());
    }
}
