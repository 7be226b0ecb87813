//! Transforms applied to physical fields before statistics and plotting.
//!
//! - Unit conversion with a small units registry
//! - Range masking against a companion field
//! - Cyclic longitude wrapping
//! - Cell-wise differences on identical grids

pub mod arith;
pub mod cyclic;
pub mod mask;
pub mod units;

pub use arith::difference;
pub use cyclic::add_cyclic;
pub use mask::mask_by;
pub use units::{convert_units, LinearConversion, UnitRegistry};
