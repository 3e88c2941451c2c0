//! The translation adapter: a schema over one shape of value that delegates
//! to a schema over another, via a pre-serialization transform. Invisible on
//! the wire.

use crate::error::Result;
use crate::schema::{Schema, Tag};
use crate::sink::EntryBuf;
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// Wraps a base schema with a value transform applied before sizing and
/// encoding. Tag, descriptor and descriptor size are the base's own.
///
/// The transform runs once for sizing and once for encoding on every write,
/// so it must be deterministic and side-effect-free.
pub struct TranslateSchema {
  base: Arc<dyn Schema>,
  map: Box<dyn Fn(&Value) -> Value + Send + Sync>,
}

impl TranslateSchema {
  pub fn new<F>(base: Arc<dyn Schema>, map: F) -> Self
  where
    F: Fn(&Value) -> Value + Send + Sync + 'static,
  {
    TranslateSchema {
      base,
      map: Box::new(map),
    }
  }

  pub fn base(&self) -> &Arc<dyn Schema> {
    &self.base
  }
}

impl fmt::Debug for TranslateSchema {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TranslateSchema")
      .field("base", &self.base)
      .finish()
  }
}

impl Schema for TranslateSchema {
  fn tag(&self) -> Tag {
    self.base.tag()
  }

  fn schema_size(&self) -> usize {
    self.base.schema_size()
  }

  fn encode_schema(&self, buf: &mut EntryBuf) -> Result<()> {
    self.base.encode_schema(buf)
  }

  fn obj_size(&self, value: &Value) -> Result<usize> {
    self.base.obj_size(&(self.map)(value))
  }

  fn encode_obj(&self, value: &Value, buf: &mut EntryBuf) -> Result<()> {
    self.base.encode_obj(&(self.map)(value), buf)
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::schema::{self, descriptor_bytes, value_bytes};

  fn meters_from_millis() -> TranslateSchema {
    TranslateSchema::new(schema::float64(), |v| match v {
      Value::Long(ms) => Value::Double(*ms as f64 / 1000.0),
      other => other.clone(),
    })
  }

  #[test]
  fn descriptor_is_the_base_descriptor() {
    let translated = meters_from_millis();
    assert_eq!(
      descriptor_bytes(&translated).expect("translated"),
      descriptor_bytes(&*schema::float64()).expect("base"),
    );
    assert_eq!(translated.tag(), Tag::Float64);
  }

  #[test]
  fn values_encode_as_the_mapped_value() {
    let translated = meters_from_millis();
    assert_eq!(
      value_bytes(&translated, &Value::Long(1500)).expect("translated"),
      value_bytes(&*schema::float64(), &Value::Double(1.5)).expect("base"),
    );
  }
}
