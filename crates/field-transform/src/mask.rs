//! Range masking of a field against a companion field.

use diags_common::{DiagsResult, Field};
use tracing::debug;

/// Mask `field` wherever `mask_field` falls outside `[low_limit, high_limit]`.
///
/// A missing bound means no constraint on that side; with both missing the
/// field is returned unchanged. The computed exclusion is OR-ed with any mask
/// already on `field`. Cells that are masked in `mask_field` add no
/// exclusion. Both inputs are left untouched.
pub fn mask_by(
    field: &Field,
    mask_field: &Field,
    low_limit: Option<f64>,
    high_limit: Option<f64>,
) -> DiagsResult<Field> {
    if low_limit.is_none() && high_limit.is_none() {
        return Ok(field.clone());
    }
    field.ensure_same_shape(mask_field)?;

    let existing = field.mask();
    let mask: Vec<bool> = (0..field.len())
        .map(|i| {
            let excluded = match mask_field.value(i) {
                Some(v) => {
                    low_limit.map_or(false, |low| v < low)
                        || high_limit.map_or(false, |high| v > high)
                }
                None => false,
            };
            excluded || existing.map_or(false, |m| m[i])
        })
        .collect();

    debug!(
        field = field.id(),
        mask_field = mask_field.id(),
        ?low_limit,
        ?high_limit,
        masked = mask.iter().filter(|&&m| m).count(),
        "Applied range mask"
    );

    field.clone().with_mask(mask)
}
