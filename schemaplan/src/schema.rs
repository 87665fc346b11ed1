//! Field and snapshot value types for versioned object schemas.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::SchemaError;

/// Declared type of a schema field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Integer,
    Float,
    Boolean,
    String,
    Binary,
    Date,
    /// Link to another model class, by class name.
    Object(String),
    /// Homogeneous list of values.
    List(Box<FieldType>),
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::Integer => write!(f, "integer"),
            FieldType::Float => write!(f, "float"),
            FieldType::Boolean => write!(f, "boolean"),
            FieldType::String => write!(f, "string"),
            FieldType::Binary => write!(f, "binary"),
            FieldType::Date => write!(f, "date"),
            FieldType::Object(class) => write!(f, "object<{class}>"),
            FieldType::List(inner) => write!(f, "list<{inner}>"),
        }
    }
}

/// A literal default value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
    Bytes(Vec<u8>),
    Date(DateTime<Utc>),
    List(Vec<Value>),
}

impl Value {
    /// Check whether this literal conforms to the declared field type.
    pub fn matches(&self, ty: &FieldType) -> bool {
        match (self, ty) {
            (Value::Int(_), FieldType::Integer)
            | (Value::Float(_), FieldType::Float)
            | (Value::Bool(_), FieldType::Boolean)
            | (Value::String(_), FieldType::String)
            | (Value::Bytes(_), FieldType::Binary)
            | (Value::Date(_), FieldType::Date) => true,
            (Value::List(items), FieldType::List(inner)) => items.iter().all(|v| v.matches(inner)),
            _ => false,
        }
    }
}

/// One declared field of a model schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Field name, unique within a snapshot.
    pub name: String,

    /// Declared type.
    #[serde(rename = "type")]
    pub ty: FieldType,

    /// Whether stored values may be null.
    #[serde(default, skip_serializing_if = "is_false")]
    pub nullable: bool,

    /// Declared default literal, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl Field {
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            nullable: false,
            default: None,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }
}

/// Immutable, versioned set of named, typed fields for one model class.
///
/// A new version of a schema is always a new `Snapshot`; nothing mutates a
/// prior one. Field order is declaration order and is preserved through
/// serialization, diffing, and fixture emission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    name: String,
    version: u32,
    fields: Vec<Field>,
    generated_at: DateTime<Utc>,
}

impl Snapshot {
    /// Construct a snapshot, rejecting anything that violates the field
    /// invariants: names non-empty and unique, defaults conforming to their
    /// declared type, object links nullable.
    pub fn new(name: impl Into<String>, version: u32, fields: Vec<Field>) -> Result<Self, SchemaError> {
        let name = name.into();
        check(&name, version, &fields)?;
        Ok(Self {
            name,
            version,
            fields,
            generated_at: Utc::now(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Declaration position of a field.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Parse a snapshot produced by `to_json`, re-checking the construction
    /// invariants since the source is external.
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let parsed: Snapshot = serde_json::from_str(json)?;
        check(&parsed.name, parsed.version, &parsed.fields)?;
        Ok(parsed)
    }
}

fn check(name: &str, version: u32, fields: &[Field]) -> Result<(), SchemaError> {
    if name.is_empty() {
        return Err(SchemaError::EmptyName);
    }
    if version == 0 {
        return Err(SchemaError::VersionZero);
    }
    let mut seen = HashSet::new();
    for field in fields {
        if field.name.is_empty() {
            return Err(SchemaError::EmptyFieldName);
        }
        if !seen.insert(field.name.as_str()) {
            return Err(SchemaError::DuplicateField {
                name: field.name.clone(),
            });
        }
        if matches!(field.ty, FieldType::Object(_)) && !field.nullable {
            return Err(SchemaError::NonNullableObject {
                field: field.name.clone(),
            });
        }
        if let Some(default) = &field.default
            && !default.matches(&field.ty)
        {
            return Err(SchemaError::DefaultTypeMismatch {
                field: field.name.clone(),
                ty: field.ty.clone(),
            });
        }
    }
    Ok(())
}
