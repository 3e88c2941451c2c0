//! The `value` module defines the dynamic value model: the variants a
//! channel can carry and the conversions into them.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::convert::TryFrom;

/// A value to be logged.
///
/// Schemas drive all sizing and encoding; a `Value` is only the carrier. A
/// `Record` keeps its fields in a `BTreeMap` so its iteration order is
/// deterministic, which matters when a schema is derived from a value's
/// shape.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
  Int(i32),
  Long(i64),
  Double(f64),
  Bool(bool),
  Str(String),
  List(Vec<Value>),
  Record(BTreeMap<String, Value>),
}

impl Value {
  /// A textual description of the variant type; used for error messages.
  pub(crate) fn typename(&self) -> &'static str {
    use Value::*;

    match self {
      Int(_) => "int",
      Long(_) => "long",
      Double(_) => "double",
      Bool(_) => "bool",
      Str(_) => "string",
      List(_) => "list",
      Record(_) => "record",
    }
  }

  /// Builds a `Record` value from `(name, value)` pairs.
  pub fn record<K, I>(fields: I) -> Value
  where
    K: Into<String>,
    I: IntoIterator<Item = (K, Value)>,
  {
    Value::Record(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
  }
}

/// Returns an error stating that a given value type cannot be handled by a
/// schema.
pub(crate) fn unexpected_type(expected: &'static str, found: &Value) -> Error {
  Error::ValueType {
    expected,
    found: found.typename(),
  }
}

impl From<i32> for Value {
  fn from(v: i32) -> Self {
    Value::Int(v)
  }
}

impl From<i64> for Value {
  fn from(v: i64) -> Self {
    Value::Long(v)
  }
}

impl From<f64> for Value {
  fn from(v: f64) -> Self {
    Value::Double(v)
  }
}

impl From<bool> for Value {
  fn from(v: bool) -> Self {
    Value::Bool(v)
  }
}

impl From<&str> for Value {
  fn from(v: &str) -> Self {
    Value::Str(v.to_owned())
  }
}

impl From<String> for Value {
  fn from(v: String) -> Self {
    Value::Str(v)
  }
}

impl<V: Into<Value>> From<Vec<V>> for Value {
  fn from(v: Vec<V>) -> Self {
    Value::List(v.into_iter().map(Into::into).collect())
  }
}

impl<'a> TryFrom<&'a serde_json::Value> for Value {
  type Error = Error;

  fn try_from(json: &'a serde_json::Value) -> Result<Self> {
    use serde_json::Value as Json;

    match json {
      Json::Bool(b) => Ok(Value::Bool(*b)),
      Json::Number(n) => {
        if let Some(i) = n.as_i64() {
          Ok(Value::Long(i))
        } else if let Some(f) = n.as_f64() {
          Ok(Value::Double(f))
        } else {
          Err(Error::UnsupportedType(format!("json number {}", n)))
        }
      }
      Json::String(s) => Ok(Value::Str(s.clone())),
      Json::Array(xs) => xs
        .iter()
        .map(Value::try_from)
        .collect::<Result<Vec<_>>>()
        .map(Value::List),
      Json::Object(map) => map
        .iter()
        .map(|(k, v)| Ok((k.clone(), Value::try_from(v)?)))
        .collect::<Result<BTreeMap<_, _>>>()
        .map(Value::Record),
      Json::Null => Err(Error::UnsupportedType("json null".to_owned())),
    }
  }
}
