//! Change classification and delta computation between two snapshots.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::errors::DiffError;
use crate::schema::{Field, FieldType, Snapshot, Value};

use super::rename::detect_renames;

/// A single classified difference, scoped to one field identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum Change {
    Added { field: Field },
    Removed { name: String },
    Renamed { from: String, to: String },
    TypeChanged { field: String, from: FieldType, to: FieldType },
    NullabilityChanged { field: String, from: bool, to: bool },
    DefaultChanged { field: String, from: Option<Value>, to: Option<Value> },
}

/// Ordered set of classified differences between two snapshots.
///
/// Ordering is stable and deterministic: removals first (source declaration
/// order), then additions (target declaration order), then modifications
/// (source declaration order, with the per-field sub-order Renamed,
/// TypeChanged, NullabilityChanged, DefaultChanged).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    /// Model class both snapshots describe.
    pub model: String,
    pub from_version: u32,
    pub to_version: u32,
    pub changes: Vec<Change>,
}

impl Delta {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Compute the structural delta between two versions of a model schema.
///
/// Fails when the versions are not strictly increasing, when the snapshots
/// describe different models, or when rename detection is ambiguous.
pub fn diff(from: &Snapshot, to: &Snapshot) -> Result<Delta, DiffError> {
    if to.version() <= from.version() {
        return Err(DiffError::VersionOrder {
            from: from.version(),
            to: to.version(),
        });
    }
    if from.name() != to.name() {
        return Err(DiffError::LineageMismatch {
            from: from.name().to_string(),
            to: to.name().to_string(),
        });
    }

    let removed: Vec<(usize, &Field)> = from
        .fields()
        .iter()
        .enumerate()
        .filter(|(_, f)| to.field(&f.name).is_none())
        .collect();
    let added: Vec<(usize, &Field)> = to
        .fields()
        .iter()
        .enumerate()
        .filter(|(_, f)| from.field(&f.name).is_none())
        .collect();

    let pairs = detect_renames(&removed, &added)?;
    let renamed_from: HashSet<&str> = pairs.iter().map(|&(r, _)| removed[r].1.name.as_str()).collect();
    let renamed_to: HashSet<&str> = pairs.iter().map(|&(_, a)| added[a].1.name.as_str()).collect();

    let mut changes = Vec::new();

    for (_, field) in &removed {
        if !renamed_from.contains(field.name.as_str()) {
            changes.push(Change::Removed {
                name: field.name.clone(),
            });
        }
    }

    for (_, field) in &added {
        if !renamed_to.contains(field.name.as_str()) {
            changes.push(Change::Added { field: (*field).clone() });
        }
    }

    // Rename pairs ride in the modifications bucket at the removed field's
    // declaration position.
    let mut rename_at: BTreeMap<usize, (&Field, &Field)> = BTreeMap::new();
    for &(r, a) in &pairs {
        rename_at.insert(removed[r].0, (removed[r].1, added[a].1));
    }

    for (pos, field) in from.fields().iter().enumerate() {
        if let Some((old, new)) = rename_at.get(&pos) {
            changes.push(Change::Renamed {
                from: old.name.clone(),
                to: new.name.clone(),
            });
            if old.default != new.default {
                changes.push(Change::DefaultChanged {
                    field: new.name.clone(),
                    from: old.default.clone(),
                    to: new.default.clone(),
                });
            }
            continue;
        }
        let Some(new) = to.field(&field.name) else {
            continue;
        };
        if field.ty != new.ty {
            changes.push(Change::TypeChanged {
                field: field.name.clone(),
                from: field.ty.clone(),
                to: new.ty.clone(),
            });
        }
        if field.nullable != new.nullable {
            changes.push(Change::NullabilityChanged {
                field: field.name.clone(),
                from: field.nullable,
                to: new.nullable,
            });
        }
        if field.default != new.default {
            changes.push(Change::DefaultChanged {
                field: field.name.clone(),
                from: field.default.clone(),
                to: new.default.clone(),
            });
        }
    }

    Ok(Delta {
        model: from.name().to_string(),
        from_version: from.version(),
        to_version: to.version(),
        changes,
    })
}
