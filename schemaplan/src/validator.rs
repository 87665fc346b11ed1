//! Static plan validation and chain composition.
//!
//! Plans are checked symbolically, against field sets rather than stored
//! records: every operation must reference a live field, and the final
//! field set must equal the target snapshot's.

use std::collections::BTreeMap;

use crate::errors::ValidationError;
use crate::plan::{MigrationOperation, MigrationPlan};
use crate::schema::{Field, Snapshot};

/// Validate a plan against its source and target snapshots.
///
/// Checks operation-by-operation reference integrity, then compares the
/// symbolic result to the target field set (names, types, nullability,
/// defaults).
pub fn validate(plan: &MigrationPlan, from: &Snapshot, to: &Snapshot) -> Result<(), ValidationError> {
    if plan.model != from.name() || plan.model != to.name() {
        return Err(ValidationError::IncompletePlan {
            detail: format!(
                "plan targets model '{}' but snapshots describe '{}' and '{}'",
                plan.model,
                from.name(),
                to.name()
            ),
        });
    }
    if plan.from_version != from.version() || plan.to_version != to.version() {
        return Err(ValidationError::IncompletePlan {
            detail: format!(
                "plan spans v{}..v{} but snapshots carry v{} and v{}",
                plan.from_version,
                plan.to_version,
                from.version(),
                to.version()
            ),
        });
    }

    let result = apply(plan, from)?;

    for (name, field) in &result {
        let Some(target) = to.field(name) else {
            return Err(ValidationError::IncompletePlan {
                detail: format!("field '{name}' is not part of the target schema"),
            });
        };
        if field.ty != target.ty {
            return Err(ValidationError::IncompletePlan {
                detail: format!("field '{name}' ends as {} but the target declares {}", field.ty, target.ty),
            });
        }
        if field.nullable != target.nullable {
            return Err(ValidationError::IncompletePlan {
                detail: format!("field '{name}' ends with nullability {}", field.nullable),
            });
        }
        if field.default != target.default {
            return Err(ValidationError::IncompletePlan {
                detail: format!("field '{name}' ends with a different default"),
            });
        }
    }
    for field in to.fields() {
        if !result.contains_key(&field.name) {
            return Err(ValidationError::IncompletePlan {
                detail: format!("target field '{}' is never produced", field.name),
            });
        }
    }
    Ok(())
}

/// Chain two plans over a shared intermediate version.
pub fn compose(first: &MigrationPlan, second: &MigrationPlan) -> Result<MigrationPlan, ValidationError> {
    if first.model != second.model {
        return Err(ValidationError::ChainInconsistency {
            detail: format!("plans address different models ('{}' vs '{}')", first.model, second.model),
        });
    }
    if first.to_version != second.from_version {
        return Err(ValidationError::ChainInconsistency {
            detail: format!(
                "plan ending at v{} cannot chain into plan starting at v{}",
                first.to_version, second.from_version
            ),
        });
    }
    let mut ops = first.ops.clone();
    ops.extend(second.ops.iter().cloned());
    Ok(MigrationPlan {
        model: first.model.clone(),
        from_version: first.from_version,
        to_version: second.to_version,
        ops,
    })
}

/// Check that two plans over the same version span produce the same schema
/// when applied symbolically to `from`. This is what guarantees incremental
/// and direct upgrades agree.
pub fn check_equivalent(a: &MigrationPlan, b: &MigrationPlan, from: &Snapshot) -> Result<(), ValidationError> {
    if a.from_version != b.from_version || a.to_version != b.to_version {
        return Err(ValidationError::ChainInconsistency {
            detail: format!(
                "plans span different versions (v{}..v{} vs v{}..v{})",
                a.from_version, a.to_version, b.from_version, b.to_version
            ),
        });
    }
    let result_a = apply(a, from)?;
    let result_b = apply(b, from)?;
    if result_a != result_b {
        let field = result_a
            .iter()
            .find(|&(name, field)| result_b.get(name) != Some(field))
            .map(|(name, _)| name.clone())
            .or_else(|| result_b.keys().find(|name| !result_a.contains_key(*name)).cloned())
            .unwrap_or_default();
        return Err(ValidationError::ChainInconsistency {
            detail: format!("plans disagree on field '{field}'"),
        });
    }
    Ok(())
}

fn dangling(op: &MigrationOperation, field: &str) -> ValidationError {
    ValidationError::DanglingReference {
        op: op.kind().to_string(),
        field: field.to_string(),
    }
}

/// Symbolically apply a plan to the source snapshot's field set.
fn apply(plan: &MigrationPlan, from: &Snapshot) -> Result<BTreeMap<String, Field>, ValidationError> {
    let mut fields: BTreeMap<String, Field> = from
        .fields()
        .iter()
        .map(|f| (f.name.clone(), f.clone()))
        .collect();

    for op in &plan.ops {
        match op {
            MigrationOperation::AddField {
                name,
                ty,
                nullable,
                default,
            } => {
                if fields.contains_key(name) {
                    return Err(dangling(op, name));
                }
                if let Some(default) = default
                    && !default.matches(ty)
                {
                    return Err(ValidationError::IncompletePlan {
                        detail: format!("add_field '{name}' declares a default that does not match {ty}"),
                    });
                }
                fields.insert(
                    name.clone(),
                    Field {
                        name: name.clone(),
                        ty: ty.clone(),
                        nullable: *nullable,
                        default: default.clone(),
                    },
                );
            }
            MigrationOperation::DropField { name } => {
                if fields.remove(name).is_none() {
                    return Err(dangling(op, name));
                }
            }
            MigrationOperation::RenameField { from, to } => {
                if fields.contains_key(to) {
                    return Err(dangling(op, to));
                }
                let Some(mut field) = fields.remove(from) else {
                    return Err(dangling(op, from));
                };
                field.name = to.clone();
                fields.insert(to.clone(), field);
            }
            MigrationOperation::ConvertType { field, from, to, .. } => {
                let Some(entry) = fields.get_mut(field) else {
                    return Err(dangling(op, field));
                };
                if entry.ty != *from {
                    return Err(ValidationError::IncompletePlan {
                        detail: format!("convert_type on '{field}' expects {from} but the field is {}", entry.ty),
                    });
                }
                entry.ty = to.clone();
            }
            MigrationOperation::SetNullable { field, nullable, fill } => {
                let Some(entry) = fields.get_mut(field) else {
                    return Err(dangling(op, field));
                };
                if entry.nullable && !nullable && fill.is_none() {
                    return Err(ValidationError::IncompletePlan {
                        detail: format!("set_nullable on '{field}' tightens without a fill value"),
                    });
                }
                if let Some(fill) = fill
                    && !fill.matches(&entry.ty)
                {
                    return Err(ValidationError::IncompletePlan {
                        detail: format!("set_nullable on '{field}' carries a fill that does not match {}", entry.ty),
                    });
                }
                entry.nullable = *nullable;
            }
            MigrationOperation::SetDefault { field, default } => {
                let Some(entry) = fields.get_mut(field) else {
                    return Err(dangling(op, field));
                };
                if let Some(default) = default
                    && !default.matches(&entry.ty)
                {
                    return Err(ValidationError::IncompletePlan {
                        detail: format!("set_default on '{field}' does not match {}", entry.ty),
                    });
                }
                entry.default = default.clone();
            }
        }
    }

    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::differ::diff;
    use crate::plan::{build, build_with, BuildOptions, NumericPolicy};
    use crate::schema::{Field, FieldType, Value};

    fn snap(version: u32, fields: Vec<Field>) -> Snapshot {
        Snapshot::new("Person", version, fields).unwrap()
    }

    fn person_v1() -> Snapshot {
        snap(
            1,
            vec![
                Field::new("firstName", FieldType::String),
                Field::new("lastName", FieldType::String),
                Field::new("age", FieldType::Integer),
            ],
        )
    }

    fn person_v2() -> Snapshot {
        snap(
            2,
            vec![
                Field::new("firstName", FieldType::String),
                Field::new("lastName", FieldType::String),
                Field::new("age", FieldType::Integer),
                Field::new("email", FieldType::String).nullable(),
            ],
        )
    }

    #[test]
    fn test_builder_output_validates() {
        let v1 = person_v1();
        let v2 = person_v2();
        let plan = build(&diff(&v1, &v2).unwrap()).unwrap();
        assert!(validate(&plan, &v1, &v2).is_ok());
    }

    #[test]
    fn test_missing_operation_is_incomplete() {
        let v1 = person_v1();
        let v2 = person_v2();
        let mut plan = build(&diff(&v1, &v2).unwrap()).unwrap();
        plan.ops.clear();
        let err = validate(&plan, &v1, &v2).unwrap_err();
        assert!(matches!(err, ValidationError::IncompletePlan { detail } if detail.contains("email")));
    }

    #[test]
    fn test_convert_on_missing_field_dangles() {
        let v1 = person_v1();
        let v2 = person_v2();
        let plan = MigrationPlan {
            model: "Person".into(),
            from_version: 1,
            to_version: 2,
            ops: vec![MigrationOperation::ConvertType {
                field: "ghost".into(),
                from: FieldType::Integer,
                to: FieldType::Float,
                conversion: crate::plan::Conversion::Widen,
            }],
        };
        let err = validate(&plan, &v1, &v2).unwrap_err();
        assert!(matches!(err, ValidationError::DanglingReference { field, .. } if field == "ghost"));
    }

    #[test]
    fn test_duplicate_add_dangles() {
        let v1 = person_v1();
        let v2 = person_v2();
        let plan = MigrationPlan {
            model: "Person".into(),
            from_version: 1,
            to_version: 2,
            ops: vec![MigrationOperation::AddField {
                name: "age".into(),
                ty: FieldType::Integer,
                nullable: false,
                default: None,
            }],
        };
        let err = validate(&plan, &v1, &v2).unwrap_err();
        assert!(matches!(err, ValidationError::DanglingReference { op, field } if op == "add_field" && field == "age"));
    }

    #[test]
    fn test_use_after_drop_dangles() {
        let v1 = snap(1, vec![Field::new("a", FieldType::Integer)]);
        let v2 = snap(2, Vec::new());
        let plan = MigrationPlan {
            model: "Person".into(),
            from_version: 1,
            to_version: 2,
            ops: vec![
                MigrationOperation::DropField { name: "a".into() },
                MigrationOperation::SetDefault {
                    field: "a".into(),
                    default: Some(Value::Int(1)),
                },
            ],
        };
        let err = validate(&plan, &v1, &v2).unwrap_err();
        assert!(matches!(err, ValidationError::DanglingReference { op, field } if op == "set_default" && field == "a"));
    }

    #[test]
    fn test_compose_requires_matching_versions() {
        let p1 = MigrationPlan {
            model: "Person".into(),
            from_version: 1,
            to_version: 2,
            ops: Vec::new(),
        };
        let p3 = MigrationPlan {
            model: "Person".into(),
            from_version: 3,
            to_version: 4,
            ops: Vec::new(),
        };
        let err = compose(&p1, &p3).unwrap_err();
        assert!(matches!(err, ValidationError::ChainInconsistency { .. }));
    }

    #[test]
    fn test_composed_chain_matches_direct_plan() {
        let v1 = person_v1();
        let v2 = person_v2();
        let v3 = snap(
            3,
            vec![
                Field::new("firstName", FieldType::String),
                Field::new("lastName", FieldType::String),
                Field::new("age", FieldType::Float),
                Field::new("email", FieldType::String).nullable(),
            ],
        );

        let p12 = build(&diff(&v1, &v2).unwrap()).unwrap();
        let p23 = build(&diff(&v2, &v3).unwrap()).unwrap();
        let composed = compose(&p12, &p23).unwrap();
        let direct = build(&diff(&v1, &v3).unwrap()).unwrap();

        assert_eq!((composed.from_version, composed.to_version), (1, 3));
        assert!(validate(&composed, &v1, &v3).is_ok());
        assert!(check_equivalent(&composed, &direct, &v1).is_ok());
    }

    #[test]
    fn test_inequivalent_plans_detected() {
        let v1 = person_v1();
        let direct = MigrationPlan {
            model: "Person".into(),
            from_version: 1,
            to_version: 2,
            ops: vec![MigrationOperation::AddField {
                name: "email".into(),
                ty: FieldType::String,
                nullable: true,
                default: None,
            }],
        };
        let wrong = MigrationPlan {
            model: "Person".into(),
            from_version: 1,
            to_version: 2,
            ops: vec![MigrationOperation::AddField {
                name: "phone".into(),
                ty: FieldType::String,
                nullable: true,
                default: None,
            }],
        };
        let err = check_equivalent(&direct, &wrong, &v1).unwrap_err();
        assert!(matches!(err, ValidationError::ChainInconsistency { detail } if detail.contains("email")));
    }

    #[test]
    fn test_narrowing_chain_validates() {
        let v1 = snap(1, vec![Field::new("score", FieldType::Float)]);
        let v2 = snap(2, vec![Field::new("score", FieldType::Integer)]);
        let options = BuildOptions {
            numeric_policy: Some(NumericPolicy::Round),
        };
        let plan = build_with(&diff(&v1, &v2).unwrap(), options).unwrap();
        assert!(validate(&plan, &v1, &v2).is_ok());
    }
}
