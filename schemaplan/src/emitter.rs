//! Renders a snapshot as a generated Kotlin model class.
//!
//! Purely a projection: the snapshot is assumed well-formed, fields are
//! emitted in declaration order, and the output matches the shape of the
//! generated migration-test fixtures byte for byte.

use std::fmt::Write;

use crate::schema::{Field, FieldType, Snapshot, Value};

/// Render the snapshot as the generated model-class fixture for its version.
pub fn emit(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "// Realm schema version {}", snapshot.version());
    let _ = writeln!(out, "class {} : RealmObject {{", snapshot.name());
    for field in snapshot.fields() {
        let _ = writeln!(out, "    var {}: {} = {}", field.name, kotlin_type(field), kotlin_default(field));
    }
    let _ = writeln!(out, "}}");
    out
}

fn kotlin_type(field: &Field) -> String {
    let base = base_type(&field.ty);
    if field.nullable { format!("{base}?") } else { base }
}

fn base_type(ty: &FieldType) -> String {
    match ty {
        FieldType::Integer => "Int".into(),
        FieldType::Float => "Double".into(),
        FieldType::Boolean => "Boolean".into(),
        FieldType::String => "String".into(),
        FieldType::Binary => "ByteArray".into(),
        FieldType::Date => "RealmInstant".into(),
        FieldType::Object(class) => class.clone(),
        FieldType::List(inner) => format!("RealmList<{}>", base_type(inner)),
    }
}

fn kotlin_default(field: &Field) -> String {
    if let Some(value) = &field.default {
        return literal(value);
    }
    if field.nullable {
        return "null".into();
    }
    zero_value(&field.ty)
}

/// Zero value emitted when a non-nullable field declares no default.
fn zero_value(ty: &FieldType) -> String {
    match ty {
        FieldType::Integer => "0".into(),
        FieldType::Float => "0.0".into(),
        FieldType::Boolean => "false".into(),
        FieldType::String => "\"\"".into(),
        FieldType::Binary => "ByteArray(0)".into(),
        FieldType::Date => "RealmInstant.from(0, 0)".into(),
        // Object fields are nullable by construction.
        FieldType::Object(_) => "null".into(),
        FieldType::List(_) => "realmListOf()".into(),
    }
}

fn literal(value: &Value) -> String {
    match value {
        Value::Int(v) => v.to_string(),
        Value::Float(v) => {
            if v.fract() == 0.0 && v.is_finite() {
                format!("{v:.1}")
            } else {
                v.to_string()
            }
        }
        Value::Bool(v) => v.to_string(),
        Value::String(s) => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
        Value::Bytes(bytes) => {
            let items: Vec<String> = bytes.iter().map(|b| b.to_string()).collect();
            format!("byteArrayOf({})", items.join(", "))
        }
        Value::Date(d) => format!("RealmInstant.from({}, {})", d.timestamp(), d.timestamp_subsec_nanos()),
        Value::List(items) => {
            let items: Vec<String> = items.iter().map(literal).collect();
            format!("realmListOf({})", items.join(", "))
        }
    }
}
