//! Deriving schemas from type descriptions.
//!
//! There is no runtime field reflection to lean on, so the derivation input
//! is an explicit [`TypeDesc`] tree: either written out by the caller,
//! produced by [`Loggable::type_desc`], or recovered from a runtime value's
//! shape via [`TypeDesc::of_value`]. Whatever the path, the derived schema
//! and the wire format are the same.

use crate::error::{Error, Result};
use crate::schema::{self, RecordSchema, Schema, TypedRecordSchema};
use crate::value::Value;
use std::sync::Arc;

/// Name of the discriminator property probed for on struct descriptions,
/// matched case-insensitively.
pub const AS_TYPE: &str = "AS_TYPE";

/// A description of a loggable type.
#[derive(Clone, Debug, PartialEq)]
pub enum TypeDesc {
  Int32,
  Int64,
  Float64,
  Bool,
  Str,

  /// An enumeration with a fixed, ordered set of constant names.
  Enum {
    name: String,
    constants: Vec<String>,
  },

  /// A homogeneous sequence.
  List(Box<TypeDesc>),

  /// An aggregate of named fields, in declaration order. `statics` carries
  /// constant properties attached to the type rather than its values; a
  /// string-valued `AS_TYPE` entry marks the type as discriminator-tagged.
  Struct {
    name: String,
    fields: Vec<(String, TypeDesc)>,
    statics: Vec<(String, Value)>,
  },
}

impl TypeDesc {
  /// The registry identity for this description: primitive names, nominal
  /// enum/struct names, and structural keys for anonymous shapes.
  pub fn key(&self) -> String {
    match self {
      TypeDesc::Int32 => "i32".to_owned(),
      TypeDesc::Int64 => "i64".to_owned(),
      TypeDesc::Float64 => "f64".to_owned(),
      TypeDesc::Bool => "bool".to_owned(),
      TypeDesc::Str => "str".to_owned(),
      TypeDesc::Enum { name, .. } => name.clone(),
      TypeDesc::List(elem) => format!("list<{}>", elem.key()),
      TypeDesc::Struct { name, fields, .. } => {
        if name.is_empty() {
          let inner = fields
            .iter()
            .map(|(n, d)| format!("{}:{}", n, d.key()))
            .collect::<Vec<_>>()
            .join(",");
          format!("record{{{}}}", inner)
        } else {
          name.clone()
        }
      }
    }
  }

  /// Recovers a description from a runtime value's shape, for the
  /// name-indexed write path.
  ///
  /// A list takes its element description from its first element, so an
  /// empty list carries no usable type information and is rejected; declare
  /// such channels explicitly instead.
  pub fn of_value(value: &Value) -> Result<TypeDesc> {
    match value {
      Value::Int(_) => Ok(TypeDesc::Int32),
      Value::Long(_) => Ok(TypeDesc::Int64),
      Value::Double(_) => Ok(TypeDesc::Float64),
      Value::Bool(_) => Ok(TypeDesc::Bool),
      Value::Str(_) => Ok(TypeDesc::Str),
      Value::List(xs) => match xs.first() {
        Some(x) => Ok(TypeDesc::List(Box::new(TypeDesc::of_value(x)?))),
        None => Err(Error::UnsupportedType(
          "empty list has no element type".to_owned(),
        )),
      },
      Value::Record(map) => {
        let fields = map
          .iter()
          .map(|(k, v)| Ok((k.clone(), TypeDesc::of_value(v)?)))
          .collect::<Result<Vec<_>>>()?;
        Ok(TypeDesc::Struct {
          name: String::new(),
          fields,
          statics: Vec::new(),
        })
      }
    }
  }
}

/// Produces the schema for a type description.
///
/// Primitives map to their schema kinds, enums keep their declared constant
/// order, lists derive their element recursively, and structs become
/// records, or typed records when an `AS_TYPE` static is present. A struct
/// name reappearing within its own fields means the description is
/// recursive, which the wire format cannot express; that fails fast.
pub fn derive(desc: &TypeDesc) -> Result<Arc<dyn Schema>> {
  let mut stack = Vec::new();
  derive_with(desc, &mut stack)
}

fn derive_with(desc: &TypeDesc, stack: &mut Vec<String>) -> Result<Arc<dyn Schema>> {
  match desc {
    TypeDesc::Int32 => Ok(schema::int32()),
    TypeDesc::Int64 => Ok(schema::int64()),
    TypeDesc::Float64 => Ok(schema::float64()),
    TypeDesc::Bool => Ok(schema::boolean()),
    TypeDesc::Str => Ok(schema::string()),
    TypeDesc::Enum { constants, .. } => Ok(schema::enumeration(constants.iter().cloned())),
    TypeDesc::List(elem) => Ok(schema::list(derive_with(elem, stack)?)),
    TypeDesc::Struct {
      name,
      fields,
      statics,
    } => {
      if !name.is_empty() {
        if stack.iter().any(|n| n == name) {
          return Err(Error::UnsupportedType(format!(
            "cyclic type description through {}",
            name
          )));
        }
        stack.push(name.clone());
      }
      let derived = fields
        .iter()
        .map(|(fname, fdesc)| Ok((fname.clone(), derive_with(fdesc, stack)?)))
        .collect::<Result<Vec<_>>>();
      if !name.is_empty() {
        stack.pop();
      }
      let derived = derived?;

      match discriminator(statics) {
        Some(type_name) => Ok(Arc::new(TypedRecordSchema::new(type_name, derived))),
        None => Ok(Arc::new(RecordSchema::new(derived))),
      }
    }
  }
}

/// Probes the statics for a string-valued `AS_TYPE` property. A non-string
/// entry under that name is treated as absent.
fn discriminator(statics: &[(String, Value)]) -> Option<String> {
  statics.iter().find_map(|(name, value)| match value {
    Value::Str(s) if name.eq_ignore_ascii_case(AS_TYPE) => Some(s.clone()),
    _ => None,
  })
}

/// Types that know their own description and how to present themselves as a
/// loggable value.
///
/// Implemented for the primitive Rust types and `Vec<T>`; user types
/// implement it by listing their fields:
///
/// ```
/// use rrlog::derive::{Loggable, TypeDesc};
/// use rrlog::value::Value;
///
/// struct Pose { x: f64, y: f64 }
///
/// impl Loggable for Pose {
///   fn type_desc() -> TypeDesc {
///     TypeDesc::Struct {
///       name: "Pose".to_owned(),
///       fields: vec![
///         ("x".to_owned(), TypeDesc::Float64),
///         ("y".to_owned(), TypeDesc::Float64),
///       ],
///       statics: Vec::new(),
///     }
///   }
///
///   fn to_value(&self) -> Value {
///     Value::record(vec![
///       ("x", Value::Double(self.x)),
///       ("y", Value::Double(self.y)),
///     ])
///   }
/// }
/// ```
pub trait Loggable {
  fn type_desc() -> TypeDesc;
  fn to_value(&self) -> Value;
}

impl Loggable for i32 {
  fn type_desc() -> TypeDesc {
    TypeDesc::Int32
  }

  fn to_value(&self) -> Value {
    Value::Int(*self)
  }
}

impl Loggable for i64 {
  fn type_desc() -> TypeDesc {
    TypeDesc::Int64
  }

  fn to_value(&self) -> Value {
    Value::Long(*self)
  }
}

impl Loggable for f64 {
  fn type_desc() -> TypeDesc {
    TypeDesc::Float64
  }

  fn to_value(&self) -> Value {
    Value::Double(*self)
  }
}

impl Loggable for bool {
  fn type_desc() -> TypeDesc {
    TypeDesc::Bool
  }

  fn to_value(&self) -> Value {
    Value::Bool(*self)
  }
}

impl Loggable for String {
  fn type_desc() -> TypeDesc {
    TypeDesc::Str
  }

  fn to_value(&self) -> Value {
    Value::Str(self.clone())
  }
}

impl<T: Loggable> Loggable for Vec<T> {
  fn type_desc() -> TypeDesc {
    TypeDesc::List(Box::new(T::type_desc()))
  }

  fn to_value(&self) -> Value {
    Value::List(self.iter().map(Loggable::to_value).collect())
  }
}
