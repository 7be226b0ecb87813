//! Common types shared across the climate-diags crates.

pub mod error;
pub mod field;
pub mod region;
pub mod stats;

pub use error::{DiagsError, DiagsResult};
pub use field::{Axis, AxisKind, Field};
pub use region::RegionSpec;
pub use stats::{MetricsDict, StatsBundle};
