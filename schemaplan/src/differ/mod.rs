//! Schema diffing: classified, deterministically ordered deltas between two
//! versions of a model schema.

mod changes;
mod rename;

pub use changes::{diff, Change, Delta};
pub use rename::RENAME_SIMILARITY_THRESHOLD;
