//! Primitive, order-sensitive migration operation records.

use serde::{Deserialize, Serialize};

use crate::errors::PlanError;
use crate::schema::{FieldType, Value};

use super::convert::{lookup, Conversion};

/// A single migration step. Each operation carries everything an external
/// engine needs to apply it without consulting the rest of the plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum MigrationOperation {
    AddField {
        name: String,
        #[serde(rename = "type")]
        ty: FieldType,
        #[serde(default, skip_serializing_if = "is_false")]
        nullable: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<Value>,
    },
    DropField {
        name: String,
    },
    RenameField {
        from: String,
        to: String,
    },
    ConvertType {
        field: String,
        from: FieldType,
        to: FieldType,
        conversion: Conversion,
    },
    SetNullable {
        field: String,
        nullable: bool,
        /// Value written over stored nulls when tightening.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fill: Option<Value>,
    },
    SetDefault {
        field: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<Value>,
    },
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl MigrationOperation {
    /// Short operation name used in validation error messages and exports.
    pub fn kind(&self) -> &'static str {
        match self {
            MigrationOperation::AddField { .. } => "add_field",
            MigrationOperation::DropField { .. } => "drop_field",
            MigrationOperation::RenameField { .. } => "rename_field",
            MigrationOperation::ConvertType { .. } => "convert_type",
            MigrationOperation::SetNullable { .. } => "set_nullable",
            MigrationOperation::SetDefault { .. } => "set_default",
        }
    }

    /// Whether applying this operation can discard stored information.
    pub fn lossy(&self) -> bool {
        match self {
            MigrationOperation::DropField { .. } => true,
            MigrationOperation::ConvertType { conversion, .. } => !conversion.lossless(),
            MigrationOperation::SetNullable { nullable: false, .. } => true,
            _ => false,
        }
    }
}

/// Ordered sequence of operations migrating records of one model class from
/// one schema version to the next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationPlan {
    /// Model class the plan addresses.
    pub model: String,
    pub from_version: u32,
    pub to_version: u32,
    pub ops: Vec<MigrationOperation>,
}

impl MigrationPlan {
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// True when no operation in the plan can discard stored information.
    pub fn is_lossless(&self) -> bool {
        self.ops.iter().all(|op| !op.lossy())
    }

    /// Export the plan as self-describing JSON records for an external
    /// migration engine.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Derive the plan that undoes this one, operations reversed.
    ///
    /// Only operations carrying enough information to be undone are
    /// reversible: renames flip, additions drop the added field, nullability
    /// tightenings loosen again, and type conversions invert when the
    /// opposite direction is itself lossless. Drops, default changes, and
    /// loosenings discard prior state and are rejected.
    pub fn invert(&self) -> Result<MigrationPlan, PlanError> {
        let mut ops = Vec::with_capacity(self.ops.len());
        for op in self.ops.iter().rev() {
            let inverse = match op {
                MigrationOperation::AddField { name, .. } => MigrationOperation::DropField { name: name.clone() },
                MigrationOperation::RenameField { from, to } => MigrationOperation::RenameField {
                    from: to.clone(),
                    to: from.clone(),
                },
                MigrationOperation::ConvertType { field, from, to, .. } => {
                    let conversion = lookup(to, from, None).filter(|c| c.lossless()).ok_or_else(|| {
                        PlanError::NotReversible {
                            op: op.kind().to_string(),
                            field: field.clone(),
                        }
                    })?;
                    MigrationOperation::ConvertType {
                        field: field.clone(),
                        from: to.clone(),
                        to: from.clone(),
                        conversion,
                    }
                }
                MigrationOperation::SetNullable {
                    field,
                    nullable: false,
                    ..
                } => MigrationOperation::SetNullable {
                    field: field.clone(),
                    nullable: true,
                    fill: None,
                },
                MigrationOperation::DropField { name } => {
                    return Err(PlanError::NotReversible {
                        op: op.kind().to_string(),
                        field: name.clone(),
                    });
                }
                MigrationOperation::SetNullable { field, .. } | MigrationOperation::SetDefault { field, .. } => {
                    return Err(PlanError::NotReversible {
                        op: op.kind().to_string(),
                        field: field.clone(),
                    });
                }
            };
            ops.push(inverse);
        }
        Ok(MigrationPlan {
            model: self.model.clone(),
            from_version: self.to_version,
            to_version: self.from_version,
            ops,
        })
    }
}
