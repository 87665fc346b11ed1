//! Table-driven type conversion rules.
//!
//! Only conversions that are lossless by construction, or explicitly
//! policy-gated, are representable. Anything else is rejected at plan-build
//! time rather than discovered against live data.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::schema::FieldType;

/// Rounding behavior for numeric narrowing conversions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericPolicy {
    Truncate,
    Round,
}

/// How a stored value moves from one declared type to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Conversion {
    /// Numeric widening; every source value is representable in the target.
    Widen,
    /// Render the source value as its string form.
    Format,
    /// Reinterpret a date as epoch milliseconds, or back.
    EpochMillis,
    /// Boolean to 0/1.
    BoolToInt,
    /// String to its UTF-8 bytes.
    Utf8Bytes,
    /// Float to integer under an explicit rounding policy.
    Narrow(NumericPolicy),
}

impl Conversion {
    /// Whether the conversion preserves all representable source values.
    pub fn lossless(self) -> bool {
        !matches!(self, Conversion::Narrow(_))
    }
}

/// Type constructor, ignoring payloads such as the linked class or list
/// element type. Conversion rules are keyed on constructors; parameterized
/// types never convert across payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum TypeKind {
    Integer,
    Float,
    Boolean,
    String,
    Binary,
    Date,
    Object,
    List,
}

fn kind(ty: &FieldType) -> TypeKind {
    match ty {
        FieldType::Integer => TypeKind::Integer,
        FieldType::Float => TypeKind::Float,
        FieldType::Boolean => TypeKind::Boolean,
        FieldType::String => TypeKind::String,
        FieldType::Binary => TypeKind::Binary,
        FieldType::Date => TypeKind::Date,
        FieldType::Object(_) => TypeKind::Object,
        FieldType::List(_) => TypeKind::List,
    }
}

enum Rule {
    Lossless(Conversion),
    /// Permitted only when the caller supplies a numeric policy.
    NeedsPolicy,
}

static RULES: Lazy<HashMap<(TypeKind, TypeKind), Rule>> = Lazy::new(|| {
    use Conversion::*;
    use TypeKind::*;
    HashMap::from([
        ((Integer, Float), Rule::Lossless(Widen)),
        ((Float, Integer), Rule::NeedsPolicy),
        ((Integer, String), Rule::Lossless(Format)),
        ((Float, String), Rule::Lossless(Format)),
        ((Boolean, String), Rule::Lossless(Format)),
        ((Date, String), Rule::Lossless(Format)),
        ((Date, Integer), Rule::Lossless(EpochMillis)),
        ((Integer, Date), Rule::Lossless(EpochMillis)),
        ((Boolean, Integer), Rule::Lossless(BoolToInt)),
        ((String, Binary), Rule::Lossless(Utf8Bytes)),
    ])
});

/// Look up the conversion for a type pair, honoring the optional numeric
/// policy. `None` means the pair is unrepresentable.
pub(crate) fn lookup(from: &FieldType, to: &FieldType, policy: Option<NumericPolicy>) -> Option<Conversion> {
    match RULES.get(&(kind(from), kind(to)))? {
        Rule::Lossless(conversion) => Some(*conversion),
        Rule::NeedsPolicy => policy.map(Conversion::Narrow),
    }
}
