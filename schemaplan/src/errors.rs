use thiserror::Error;

use crate::schema::FieldType;

/// Errors raised while constructing snapshots or recording them in a lineage.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Model class name was empty.
    #[error("model name must not be empty")]
    EmptyName,

    /// Schema versions start at 1.
    #[error("schema version must be at least 1")]
    VersionZero,

    /// A field was declared with an empty name.
    #[error("field name must not be empty")]
    EmptyFieldName,

    /// Two fields in one snapshot share a name.
    #[error("duplicate field '{name}'")]
    DuplicateField { name: String },

    /// A declared default literal does not conform to the field's type.
    #[error("default value for field '{field}' does not match declared type {ty}")]
    DefaultTypeMismatch { field: String, ty: FieldType },

    /// Object links are optional pointers; a non-nullable link is unrepresentable.
    #[error("object reference field '{field}' must be nullable")]
    NonNullableObject { field: String },

    /// A snapshot was offered to a history tracking a different model.
    #[error("snapshot '{snapshot}' does not belong to lineage '{lineage}'")]
    LineageNameMismatch { lineage: String, snapshot: String },

    /// Versions within a lineage must strictly increase.
    #[error("version {version} is not greater than latest recorded version {latest}")]
    NonMonotonicVersion { version: u32, latest: u32 },

    /// Snapshot JSON could not be parsed.
    #[error("invalid snapshot json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while diffing two snapshots.
#[derive(Debug, Error)]
pub enum DiffError {
    /// The target snapshot must carry a strictly greater version.
    #[error("cannot diff version {from} against {to}: target version must be greater")]
    VersionOrder { from: u32, to: u32 },

    /// The two snapshots describe different model classes.
    #[error("snapshots describe different models ('{from}' vs '{to}')")]
    LineageMismatch { from: String, to: String },

    /// Two or more rename pairings tie under the similarity rule; the diff
    /// refuses to guess.
    #[error("ambiguous rename for removed field '{removed}': candidate targets {candidates:?} tie")]
    AmbiguousRename { removed: String, candidates: Vec<String> },
}

/// Errors raised while turning a delta into a migration plan.
#[derive(Debug, Error)]
pub enum PlanError {
    /// The conversion table has no rule for this type pair.
    #[error("no conversion rule for field '{field}': {from} -> {to}")]
    UnrepresentableChange {
        field: String,
        from: FieldType,
        to: FieldType,
    },

    /// Making a field non-nullable needs a fill value for stored nulls, and
    /// the delta carries none.
    #[error("field '{field}' cannot become non-nullable without a default to fill stored nulls")]
    UnfillableNullability { field: String },

    /// The operation does not carry enough information to be undone.
    #[error("operation {op} on field '{field}' is not reversible")]
    NotReversible { op: String, field: String },
}

/// Errors raised by static plan validation and chain composition.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Symbolic application of the plan does not produce the target schema.
    #[error("plan does not produce the target schema: {detail}")]
    IncompletePlan { detail: String },

    /// An operation touches a field that is missing, already dropped, or
    /// would collide with an existing one.
    #[error("operation {op} references missing or conflicting field '{field}'")]
    DanglingReference { op: String, field: String },

    /// Two plans that should describe the same upgrade disagree.
    #[error("plan chain is inconsistent: {detail}")]
    ChainInconsistency { detail: String },
}

/// Umbrella error for lineage-level operations that cross component
/// boundaries.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// No snapshot recorded under that version.
    #[error("no snapshot recorded for version {version}")]
    UnknownVersion { version: u32 },

    /// Snapshot bookkeeping failed.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Diffing two recorded snapshots failed.
    #[error("diff error: {0}")]
    Diff(#[from] DiffError),

    /// Plan construction failed.
    #[error("plan error: {0}")]
    Plan(#[from] PlanError),

    /// A derived plan failed validation.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
}
