//! Declared field types and typed values
//!
//! The declared type set is closed: no nested, array, map, or union types.
//! Type names are resolved through an explicit alias table so SQL-flavored
//! spellings ("VARCHAR", "BIGINT") map onto the canonical set.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type of a custom field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    Bool,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
}

impl FieldType {
    /// Resolve a type name, including SQL-flavored aliases.
    pub fn parse(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "bool" | "boolean" => Ok(FieldType::Bool),
            "int" | "integer" => Ok(FieldType::Int),
            "long" | "bigint" => Ok(FieldType::Long),
            "float" => Ok(FieldType::Float),
            "double" => Ok(FieldType::Double),
            "bytes" | "binary" | "blob" => Ok(FieldType::Bytes),
            "string" | "varchar" | "text" => Ok(FieldType::String),
            other => Err(Error::InvalidType(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Bool => "bool",
            FieldType::Int => "int",
            FieldType::Long => "long",
            FieldType::Float => "float",
            FieldType::Double => "double",
            FieldType::Bytes => "bytes",
            FieldType::String => "string",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FieldType {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        Self::parse(value)
    }
}

/// A value coerced to a declared field type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Bool(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Bytes(Vec<u8>),
    String(String),
}

impl FieldValue {
    /// Coerce a logical (JSON) value into the declared type.
    ///
    /// Numeric literals widen (int into a long field) but never silently
    /// truncate; strings go through standard textual parsing and fail
    /// loudly when unparsable. Nested values are rejected outright.
    pub fn coerce(value: &serde_json::Value, ty: FieldType) -> Result<Self> {
        use serde_json::Value;

        if value.is_array() || value.is_object() || value.is_null() {
            return Err(Error::MalformedRecord(format!(
                "cannot encode {} into declared type {}",
                kind_of(value),
                ty
            )));
        }

        match ty {
            FieldType::Bool => match value {
                Value::Bool(b) => Ok(FieldValue::Bool(*b)),
                Value::String(s) => s
                    .trim()
                    .parse::<bool>()
                    .map(FieldValue::Bool)
                    .map_err(|_| unparsable(s, ty)),
                _ => Err(mismatch(value, ty)),
            },
            FieldType::Int => match value {
                Value::Number(n) => {
                    let wide = n.as_i64().ok_or_else(|| mismatch(value, ty))?;
                    i32::try_from(wide)
                        .map(FieldValue::Int)
                        .map_err(|_| Error::MalformedRecord(format!(
                            "value {} does not fit declared type int",
                            wide
                        )))
                }
                Value::String(s) => s
                    .trim()
                    .parse::<i32>()
                    .map(FieldValue::Int)
                    .map_err(|_| unparsable(s, ty)),
                _ => Err(mismatch(value, ty)),
            },
            FieldType::Long => match value {
                Value::Number(n) => n
                    .as_i64()
                    .map(FieldValue::Long)
                    .ok_or_else(|| mismatch(value, ty)),
                Value::String(s) => s
                    .trim()
                    .parse::<i64>()
                    .map(FieldValue::Long)
                    .map_err(|_| unparsable(s, ty)),
                _ => Err(mismatch(value, ty)),
            },
            FieldType::Float => match value {
                Value::Number(n) => {
                    let wide = n.as_f64().ok_or_else(|| mismatch(value, ty))?;
                    let narrow = wide as f32;
                    if narrow.is_infinite() && wide.is_finite() {
                        return Err(Error::MalformedRecord(format!(
                            "value {} does not fit declared type float",
                            wide
                        )));
                    }
                    Ok(FieldValue::Float(narrow))
                }
                Value::String(s) => s
                    .trim()
                    .parse::<f32>()
                    .map(FieldValue::Float)
                    .map_err(|_| unparsable(s, ty)),
                _ => Err(mismatch(value, ty)),
            },
            FieldType::Double => match value {
                Value::Number(n) => n
                    .as_f64()
                    .map(FieldValue::Double)
                    .ok_or_else(|| mismatch(value, ty)),
                Value::String(s) => s
                    .trim()
                    .parse::<f64>()
                    .map(FieldValue::Double)
                    .map_err(|_| unparsable(s, ty)),
                _ => Err(mismatch(value, ty)),
            },
            FieldType::Bytes => match value {
                Value::String(s) => Ok(FieldValue::Bytes(s.clone().into_bytes())),
                _ => Err(mismatch(value, ty)),
            },
            FieldType::String => match value {
                Value::String(s) => Ok(FieldValue::String(s.clone())),
                Value::Bool(b) => Ok(FieldValue::String(b.to_string())),
                Value::Number(n) => Ok(FieldValue::String(n.to_string())),
                _ => Err(mismatch(value, ty)),
            },
        }
    }

    /// Logical (JSON) view of the value, for translation back out.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::{json, Value};
        match self {
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Int(i) => json!(i),
            FieldValue::Long(l) => json!(l),
            FieldValue::Float(f) => json!(f),
            FieldValue::Double(d) => json!(d),
            FieldValue::Bytes(b) => json!(b),
            FieldValue::String(s) => Value::String(s.clone()),
        }
    }
}

/// Render any logical value as the string stored in `unknown_fields`.
///
/// Plain strings pass through unquoted; everything else keeps its JSON text.
pub fn value_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn kind_of(value: &serde_json::Value) -> &'static str {
    use serde_json::Value;
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn mismatch(value: &serde_json::Value, ty: FieldType) -> Error {
    Error::MalformedRecord(format!(
        "cannot encode {} into declared type {}",
        kind_of(value),
        ty
    ))
}

fn unparsable(raw: &str, ty: FieldType) -> Error {
    Error::MalformedRecord(format!("'{}' is not parsable as declared type {}", raw, ty))
}
