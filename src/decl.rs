//! Declarative schema descriptions: a serde-deserializable mirror of the
//! schema algebra's parameter-carrying kinds, so channels can be declared
//! in YAML or JSON configuration rather than code.

use crate::error::{Error, Result};
use crate::schema::{self, RecordSchema, Schema};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// The declared type of a channel, record field or list element.
#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum TypeDecl {
  /// A named builtin: `i32`, `i64`, `f64`, `bool` or `str`.
  Name(String),

  /// An enumeration of possible string values.
  ///
  /// Declared order is the ordinal order on the wire.
  Enum {
    #[serde(rename = "enum")]
    constants: Vec<String>,
  },

  /// A nested record or list.
  Nested(CompositeDecl),
}

/// A composite declaration: a record of named fields or a homogeneous list.
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompositeDecl {
  /// Field name to type. A `BTreeMap` is used so the declared field order
  /// is deterministic (sorted by name) no matter the config format.
  Record(BTreeMap<String, TypeDecl>),
  List(Box<TypeDecl>),
}

impl TypeDecl {
  /// Builds the schema this declaration describes.
  pub fn build(&self) -> Result<Arc<dyn Schema>> {
    match self {
      TypeDecl::Name(name) => builtin(name),
      TypeDecl::Enum { constants } => Ok(schema::enumeration(constants.iter().cloned())),
      TypeDecl::Nested(composite) => composite.build(),
    }
  }
}

impl CompositeDecl {
  pub fn build(&self) -> Result<Arc<dyn Schema>> {
    match self {
      CompositeDecl::Record(fields) => {
        let fields = fields
          .iter()
          .map(|(name, decl)| Ok((name.clone(), decl.build()?)))
          .collect::<Result<Vec<_>>>()?;
        Ok(Arc::new(RecordSchema::new(fields)))
      }
      CompositeDecl::List(elem) => Ok(schema::list(elem.build()?)),
    }
  }
}

fn builtin(name: &str) -> Result<Arc<dyn Schema>> {
  match name {
    "i32" => Ok(schema::int32()),
    "i64" => Ok(schema::int64()),
    "f64" => Ok(schema::float64()),
    "bool" => Ok(schema::boolean()),
    "str" => Ok(schema::string()),
    _ => Err(Error::UnsupportedType(format!(
      "unknown builtin type name '{}'",
      name
    ))),
  }
}
