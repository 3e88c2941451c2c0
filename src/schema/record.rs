//! Structured-record schemas: plain records, discriminator-carrying typed
//! records, and custom-component records with a caller-supplied encoder.
//! All three share wire tag 0 and are indistinguishable to a reader.

use crate::error::{Error, Result};
use crate::schema::primitive::{str_size, StrSchema};
use crate::schema::{count_i32, Schema, Tag, TAG_LEN, TYPE_FIELD};
use crate::sink::EntryBuf;
use crate::value::{unexpected_type, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

type Fields = Vec<(String, Arc<dyn Schema>)>;

fn as_record<'a>(value: &'a Value) -> Result<&'a BTreeMap<String, Value>> {
  match value {
    Value::Record(map) => Ok(map),
    v => Err(unexpected_type("record", v)),
  }
}

fn field_value<'a>(map: &'a BTreeMap<String, Value>, name: &str) -> Result<&'a Value> {
  map
    .get(name)
    .ok_or_else(|| Error::MissingField(name.to_owned()))
}

fn fields_descriptor_size(fields: &Fields) -> usize {
  fields
    .iter()
    .map(|(name, schema)| 4 + name.len() + schema.schema_size())
    .sum()
}

fn encode_fields_descriptor(fields: &Fields, buf: &mut EntryBuf) -> Result<()> {
  for (name, schema) in fields {
    buf.put_str(name)?;
    schema.encode_schema(buf)?;
  }
  Ok(())
}

fn fields_obj_size(fields: &Fields, map: &BTreeMap<String, Value>) -> Result<usize> {
  let mut size = 0;
  for (name, schema) in fields {
    size += schema.obj_size(field_value(map, name)?)?;
  }
  Ok(size)
}

fn encode_fields_obj(
  fields: &Fields,
  map: &BTreeMap<String, Value>,
  buf: &mut EntryBuf,
) -> Result<()> {
  for (name, schema) in fields {
    schema.encode_obj(field_value(map, name)?, buf)?;
  }
  Ok(())
}

/// Schema for a record of named fields.
///
/// Field order is fixed at construction and drives sizing, the descriptor
/// and value encoding alike. Fields present in a value but absent from the
/// schema are not encoded; the schema, not the value, drives the process.
#[derive(Clone, Debug)]
pub struct RecordSchema {
  fields: Fields,
}

impl RecordSchema {
  pub fn new<I, S>(fields: I) -> Self
  where
    I: IntoIterator<Item = (S, Arc<dyn Schema>)>,
    S: Into<String>,
  {
    RecordSchema {
      fields: fields.into_iter().map(|(n, s)| (n.into(), s)).collect(),
    }
  }

  pub fn fields(&self) -> &[(String, Arc<dyn Schema>)] {
    &self.fields
  }
}

impl Schema for RecordSchema {
  fn tag(&self) -> Tag {
    Tag::Record
  }

  fn schema_size(&self) -> usize {
    TAG_LEN + 4 + fields_descriptor_size(&self.fields)
  }

  fn encode_schema(&self, buf: &mut EntryBuf) -> Result<()> {
    buf.put_i32(Tag::Record.code())?;
    buf.put_i32(count_i32("record field list", self.fields.len())?)?;
    encode_fields_descriptor(&self.fields, buf)
  }

  fn obj_size(&self, value: &Value) -> Result<usize> {
    fields_obj_size(&self.fields, as_record(value)?)
  }

  fn encode_obj(&self, value: &Value, buf: &mut EntryBuf) -> Result<()> {
    encode_fields_obj(&self.fields, as_record(value)?, buf)
  }
}

/// A record with an implicit leading `.type` discriminator field.
///
/// Wire-identical to a [`RecordSchema`] whose first field is a string named
/// `.type` holding the type name; the discriminator value comes from the
/// schema, never from the value being written.
#[derive(Clone, Debug)]
pub struct TypedRecordSchema {
  type_name: String,
  fields: Fields,
}

impl TypedRecordSchema {
  pub fn new<N, I, S>(type_name: N, fields: I) -> Self
  where
    N: Into<String>,
    I: IntoIterator<Item = (S, Arc<dyn Schema>)>,
    S: Into<String>,
  {
    TypedRecordSchema {
      type_name: type_name.into(),
      fields: fields.into_iter().map(|(n, s)| (n.into(), s)).collect(),
    }
  }

  pub fn type_name(&self) -> &str {
    &self.type_name
  }
}

impl Schema for TypedRecordSchema {
  fn tag(&self) -> Tag {
    Tag::Record
  }

  fn schema_size(&self) -> usize {
    TAG_LEN
      + 4
      + 4
      + TYPE_FIELD.len()
      + StrSchema.schema_size()
      + fields_descriptor_size(&self.fields)
  }

  fn encode_schema(&self, buf: &mut EntryBuf) -> Result<()> {
    buf.put_i32(Tag::Record.code())?;
    // the field count includes the discriminator
    buf.put_i32(count_i32("record field list", self.fields.len() + 1)?)?;
    buf.put_str(TYPE_FIELD)?;
    StrSchema.encode_schema(buf)?;
    encode_fields_descriptor(&self.fields, buf)
  }

  fn obj_size(&self, value: &Value) -> Result<usize> {
    Ok(str_size(&self.type_name) + fields_obj_size(&self.fields, as_record(value)?)?)
  }

  fn encode_obj(&self, value: &Value, buf: &mut EntryBuf) -> Result<()> {
    let map = as_record(value)?;
    buf.put_str(&self.type_name)?;
    encode_fields_obj(&self.fields, map, buf)
  }
}

/// A typed record whose component values come from a caller-supplied
/// encoder instead of record-field lookup.
///
/// The encoder maps the incoming value to one component value per declared
/// component, in order. It runs once for sizing and once for encoding on
/// every write, so it must be deterministic and side-effect-free.
pub struct CustomSchema {
  type_name: String,
  components: Fields,
  encoder: Box<dyn Fn(&Value) -> Vec<Value> + Send + Sync>,
}

impl CustomSchema {
  /// Builds the schema, rejecting component name and schema lists of
  /// differing length.
  pub fn new<N, F>(
    type_name: N,
    names: Vec<String>,
    schemas: Vec<Arc<dyn Schema>>,
    encoder: F,
  ) -> Result<Self>
  where
    N: Into<String>,
    F: Fn(&Value) -> Vec<Value> + Send + Sync + 'static,
  {
    if names.len() != schemas.len() {
      return Err(Error::MismatchedComponents {
        expected: names.len(),
        actual: schemas.len(),
      });
    }
    Ok(CustomSchema {
      type_name: type_name.into(),
      components: names.into_iter().zip(schemas).collect(),
      encoder: Box::new(encoder),
    })
  }

  pub fn type_name(&self) -> &str {
    &self.type_name
  }

  fn parts(&self, value: &Value) -> Result<Vec<Value>> {
    let parts = (self.encoder)(value);
    if parts.len() != self.components.len() {
      return Err(Error::MismatchedComponents {
        expected: self.components.len(),
        actual: parts.len(),
      });
    }
    Ok(parts)
  }
}

impl fmt::Debug for CustomSchema {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CustomSchema")
      .field("type_name", &self.type_name)
      .field("components", &self.components)
      .finish()
  }
}

impl Schema for CustomSchema {
  fn tag(&self) -> Tag {
    Tag::Record
  }

  fn schema_size(&self) -> usize {
    TAG_LEN
      + 4
      + 4
      + TYPE_FIELD.len()
      + StrSchema.schema_size()
      + fields_descriptor_size(&self.components)
  }

  fn encode_schema(&self, buf: &mut EntryBuf) -> Result<()> {
    buf.put_i32(Tag::Record.code())?;
    buf.put_i32(count_i32("component list", self.components.len() + 1)?)?;
    buf.put_str(TYPE_FIELD)?;
    StrSchema.encode_schema(buf)?;
    encode_fields_descriptor(&self.components, buf)
  }

  fn obj_size(&self, value: &Value) -> Result<usize> {
    let parts = self.parts(value)?;
    let mut size = str_size(&self.type_name);
    for ((_, schema), part) in self.components.iter().zip(&parts) {
      size += schema.obj_size(part)?;
    }
    Ok(size)
  }

  fn encode_obj(&self, value: &Value, buf: &mut EntryBuf) -> Result<()> {
    let parts = self.parts(value)?;
    buf.put_str(&self.type_name)?;
    for ((_, schema), part) in self.components.iter().zip(&parts) {
      schema.encode_obj(part, buf)?;
    }
    Ok(())
  }
}
