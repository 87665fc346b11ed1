//! Schema version diffing and migration-plan generation for object models.
//!
//! Two immutable [`Snapshot`]s of a model schema go into [`diff`]; the
//! resulting [`Delta`] feeds [`build`], which derives an ordered
//! [`MigrationPlan`]; [`validate`] statically proves the plan produces the
//! target schema before anything touches stored data; and [`emitter::emit`]
//! projects a snapshot into the generated model-class fixture consumed by
//! migration tests. [`SchemaHistory`] retains every accepted version of a
//! lineage and guarantees that stepwise and direct upgrade plans agree.
//!
//! Everything here is a pure function over immutable values: reading schema
//! definitions, writing fixtures, and executing plans against stored records
//! are the callers' business.

pub mod differ;
pub mod emitter;
pub mod errors;
pub mod history;
pub mod plan;
pub mod schema;
pub mod validator;

pub use differ::{diff, Change, Delta, RENAME_SIMILARITY_THRESHOLD};
pub use errors::{DiffError, HistoryError, PlanError, SchemaError, ValidationError};
pub use history::SchemaHistory;
pub use plan::{build, build_with, BuildOptions, Conversion, MigrationOperation, MigrationPlan, NumericPolicy};
pub use schema::{Field, FieldType, Snapshot, Value};
pub use validator::{check_equivalent, compose, validate};
