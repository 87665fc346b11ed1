//! Converts a delta into an ordered migration plan.
//!
//! Operation order is fixed: renames first (so later steps address fields
//! under their new names), then additions, then per-field conversions in the
//! order ConvertType, SetNullable, SetDefault, and removals last (so nothing
//! an earlier step still needs is dropped).

use std::collections::HashMap;

use crate::differ::{Change, Delta};
use crate::errors::PlanError;
use crate::schema::Value;

use super::convert::{lookup, NumericPolicy};
use super::{MigrationOperation, MigrationPlan};

/// Knobs for plan construction.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    /// Policy for Float -> Integer narrowing; narrowings are rejected
    /// without one.
    pub numeric_policy: Option<NumericPolicy>,
}

/// Build a migration plan from a delta with default options.
pub fn build(delta: &Delta) -> Result<MigrationPlan, PlanError> {
    build_with(delta, BuildOptions::default())
}

/// Build a migration plan from a delta.
///
/// Fails when a type change has no conversion rule, or when a field becomes
/// non-nullable without a default to fill stored nulls.
pub fn build_with(delta: &Delta, options: BuildOptions) -> Result<MigrationPlan, PlanError> {
    // Target defaults recorded in the delta, used as fill values when a
    // field tightens to non-nullable.
    let new_defaults: HashMap<&str, Option<Value>> = delta
        .changes
        .iter()
        .filter_map(|c| match c {
            Change::DefaultChanged { field, to, .. } => Some((field.as_str(), to.clone())),
            _ => None,
        })
        .collect();

    let mut renames = Vec::new();
    let mut additions = Vec::new();
    let mut conversions = Vec::new();
    let mut removals = Vec::new();

    for change in &delta.changes {
        match change {
            Change::Renamed { from, to } => renames.push(MigrationOperation::RenameField {
                from: from.clone(),
                to: to.clone(),
            }),
            Change::Added { field } => additions.push(MigrationOperation::AddField {
                name: field.name.clone(),
                ty: field.ty.clone(),
                nullable: field.nullable,
                default: field.default.clone(),
            }),
            Change::Removed { name } => removals.push(MigrationOperation::DropField { name: name.clone() }),
            Change::TypeChanged { field, from, to } => {
                let conversion =
                    lookup(from, to, options.numeric_policy).ok_or_else(|| PlanError::UnrepresentableChange {
                        field: field.clone(),
                        from: from.clone(),
                        to: to.clone(),
                    })?;
                conversions.push(MigrationOperation::ConvertType {
                    field: field.clone(),
                    from: from.clone(),
                    to: to.clone(),
                    conversion,
                });
            }
            Change::NullabilityChanged { field, to, .. } => {
                let fill = if *to {
                    None
                } else {
                    let fill = new_defaults.get(field.as_str()).cloned().flatten();
                    if fill.is_none() {
                        return Err(PlanError::UnfillableNullability { field: field.clone() });
                    }
                    fill
                };
                conversions.push(MigrationOperation::SetNullable {
                    field: field.clone(),
                    nullable: *to,
                    fill,
                });
            }
            Change::DefaultChanged { field, to, .. } => conversions.push(MigrationOperation::SetDefault {
                field: field.clone(),
                default: to.clone(),
            }),
        }
    }

    let mut ops = renames;
    ops.append(&mut additions);
    ops.append(&mut conversions);
    ops.append(&mut removals);

    Ok(MigrationPlan {
        model: delta.model.clone(),
        from_version: delta.from_version,
        to_version: delta.to_version,
        ops,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::differ::diff;
    use crate::plan::Conversion;
    use crate::schema::{Field, FieldType, Snapshot, Value};

    fn snap(version: u32, fields: Vec<Field>) -> Snapshot {
        Snapshot::new("Person", version, fields).unwrap()
    }

    #[test]
    fn test_added_nullable_field_plan() {
        let v1 = snap(
            1,
            vec![
                Field::new("firstName", FieldType::String),
                Field::new("lastName", FieldType::String),
                Field::new("age", FieldType::Integer),
            ],
        );
        let v2 = snap(
            2,
            vec![
                Field::new("firstName", FieldType::String),
                Field::new("lastName", FieldType::String),
                Field::new("age", FieldType::Integer),
                Field::new("email", FieldType::String).nullable(),
            ],
        );
        let plan = build(&diff(&v1, &v2).unwrap()).unwrap();
        assert_eq!(plan.model, "Person");
        assert_eq!((plan.from_version, plan.to_version), (1, 2));
        assert_eq!(
            plan.ops,
            vec![MigrationOperation::AddField {
                name: "email".into(),
                ty: FieldType::String,
                nullable: true,
                default: None,
            }]
        );
        assert!(plan.is_lossless());
    }

    #[test]
    fn test_operation_ordering() {
        let v1 = snap(
            1,
            vec![
                Field::new("legacy", FieldType::Binary),
                Field::new("nm", FieldType::String),
                Field::new("score", FieldType::Integer),
            ],
        );
        let v2 = snap(
            2,
            vec![
                Field::new("name", FieldType::String),
                Field::new("score", FieldType::Float),
                Field::new("joined", FieldType::Date).nullable(),
            ],
        );
        let plan = build(&diff(&v1, &v2).unwrap()).unwrap();
        let kinds: Vec<&str> = plan.ops.iter().map(|op| op.kind()).collect();
        assert_eq!(kinds, vec!["rename_field", "add_field", "convert_type", "drop_field"]);
    }

    #[test]
    fn test_narrowing_without_policy_is_unrepresentable() {
        let v1 = snap(1, vec![Field::new("score", FieldType::Float)]);
        let v2 = snap(2, vec![Field::new("score", FieldType::Integer)]);
        let err = build(&diff(&v1, &v2).unwrap()).unwrap_err();
        assert!(matches!(err, PlanError::UnrepresentableChange { field, .. } if field == "score"));
    }

    #[test]
    fn test_narrowing_with_policy_builds() {
        let v1 = snap(1, vec![Field::new("score", FieldType::Float)]);
        let v2 = snap(2, vec![Field::new("score", FieldType::Integer)]);
        let options = BuildOptions {
            numeric_policy: Some(NumericPolicy::Truncate),
        };
        let plan = build_with(&diff(&v1, &v2).unwrap(), options).unwrap();
        assert_eq!(
            plan.ops,
            vec![MigrationOperation::ConvertType {
                field: "score".into(),
                from: FieldType::Float,
                to: FieldType::Integer,
                conversion: Conversion::Narrow(NumericPolicy::Truncate),
            }]
        );
        assert!(!plan.is_lossless());
    }

    #[test]
    fn test_object_to_boolean_is_unrepresentable() {
        let v1 = snap(1, vec![Field::new("pet", FieldType::Object("Dog".into())).nullable()]);
        let v2 = snap(2, vec![Field::new("pet", FieldType::Boolean).nullable()]);
        let err = build(&diff(&v1, &v2).unwrap()).unwrap_err();
        assert!(matches!(err, PlanError::UnrepresentableChange { .. }));
    }

    #[test]
    fn test_tightening_without_default_fails() {
        let v1 = snap(1, vec![Field::new("email", FieldType::String).nullable()]);
        let v2 = snap(2, vec![Field::new("email", FieldType::String)]);
        let err = build(&diff(&v1, &v2).unwrap()).unwrap_err();
        assert!(matches!(err, PlanError::UnfillableNullability { field } if field == "email"));
    }

    #[test]
    fn test_tightening_uses_new_default_as_fill() {
        let v1 = snap(1, vec![Field::new("email", FieldType::String).nullable()]);
        let v2 = snap(
            2,
            vec![Field::new("email", FieldType::String).with_default(Value::String("unknown".into()))],
        );
        let plan = build(&diff(&v1, &v2).unwrap()).unwrap();
        assert_eq!(
            plan.ops,
            vec![
                MigrationOperation::SetNullable {
                    field: "email".into(),
                    nullable: false,
                    fill: Some(Value::String("unknown".into())),
                },
                MigrationOperation::SetDefault {
                    field: "email".into(),
                    default: Some(Value::String("unknown".into())),
                },
            ]
        );
    }

    #[test]
    fn test_loosening_needs_no_fill() {
        let v1 = snap(1, vec![Field::new("email", FieldType::String)]);
        let v2 = snap(2, vec![Field::new("email", FieldType::String).nullable()]);
        let plan = build(&diff(&v1, &v2).unwrap()).unwrap();
        assert_eq!(
            plan.ops,
            vec![MigrationOperation::SetNullable {
                field: "email".into(),
                nullable: true,
                fill: None,
            }]
        );
    }
}
