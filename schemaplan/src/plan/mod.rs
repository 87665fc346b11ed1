//! Migration plans: ordered, primitive, independently applicable operations
//! realizing a delta against stored records.

mod builder;
mod convert;
mod ops;

pub use builder::{build, build_with, BuildOptions};
pub use convert::{Conversion, NumericPolicy};
pub use ops::{MigrationOperation, MigrationPlan};
