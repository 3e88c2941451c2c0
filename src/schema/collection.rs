//! Enumeration and homogeneous list schemas.

use crate::error::{Error, Result};
use crate::schema::{count_i32, Schema, Tag, TAG_LEN};
use crate::sink::EntryBuf;
use crate::value::{unexpected_type, Value};
use std::sync::Arc;

/// Schema for enumerations of string constants.
///
/// The descriptor carries the constant names in order; values travel as a
/// 4-byte ordinal. A value given as a name resolves its ordinal by linear
/// lookup over the declared constants, an already-resolved ordinal is only
/// range-checked.
#[derive(Clone, Debug)]
pub struct EnumSchema {
  constants: Vec<String>,
}

impl EnumSchema {
  pub fn new<I, S>(constants: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    EnumSchema {
      constants: constants.into_iter().map(Into::into).collect(),
    }
  }

  pub fn constants(&self) -> &[String] {
    &self.constants
  }

  fn ordinal(&self, value: &Value) -> Result<i32> {
    match value {
      Value::Str(s) => self
        .constants
        .iter()
        .position(|c| c == s)
        .map(|i| i as i32)
        .ok_or_else(|| Error::InvalidEnumValue(s.clone())),
      Value::Int(i) => {
        if (0..self.constants.len() as i32).contains(i) {
          Ok(*i)
        } else {
          Err(Error::InvalidEnumValue(i.to_string()))
        }
      }
      v => Err(unexpected_type("enum name or ordinal", v)),
    }
  }
}

impl Schema for EnumSchema {
  fn tag(&self) -> Tag {
    Tag::Enum
  }

  fn schema_size(&self) -> usize {
    TAG_LEN + 4 + self.constants.iter().map(|c| 4 + c.len()).sum::<usize>()
  }

  fn encode_schema(&self, buf: &mut EntryBuf) -> Result<()> {
    buf.put_i32(Tag::Enum.code())?;
    buf.put_i32(count_i32("enum constant list", self.constants.len())?)?;
    for constant in &self.constants {
      buf.put_str(constant)?;
    }
    Ok(())
  }

  fn obj_size(&self, value: &Value) -> Result<usize> {
    self.ordinal(value).map(|_| 4)
  }

  fn encode_obj(&self, value: &Value, buf: &mut EntryBuf) -> Result<()> {
    buf.put_i32(self.ordinal(value)?)
  }
}

/// Schema for homogeneous lists: a 4-byte count followed by that many
/// element encodings.
#[derive(Clone, Debug)]
pub struct ListSchema {
  elem: Arc<dyn Schema>,
}

impl ListSchema {
  pub fn new(elem: Arc<dyn Schema>) -> Self {
    ListSchema { elem }
  }

  pub fn elem(&self) -> &Arc<dyn Schema> {
    &self.elem
  }

  fn elements<'a>(&self, value: &'a Value) -> Result<&'a [Value]> {
    match value {
      Value::List(xs) => Ok(xs),
      v => Err(unexpected_type("list", v)),
    }
  }
}

impl Schema for ListSchema {
  fn tag(&self) -> Tag {
    Tag::List
  }

  fn schema_size(&self) -> usize {
    TAG_LEN + self.elem.schema_size()
  }

  fn encode_schema(&self, buf: &mut EntryBuf) -> Result<()> {
    buf.put_i32(Tag::List.code())?;
    self.elem.encode_schema(buf)
  }

  fn obj_size(&self, value: &Value) -> Result<usize> {
    let xs = self.elements(value)?;
    count_i32("list", xs.len())?;
    let mut size = 4;
    for x in xs {
      size += self.elem.obj_size(x)?;
    }
    Ok(size)
  }

  fn encode_obj(&self, value: &Value, buf: &mut EntryBuf) -> Result<()> {
    let xs = self.elements(value)?;
    buf.put_i32(count_i32("list", xs.len())?)?;
    for x in xs {
      self.elem.encode_obj(x, buf)?;
    }
    Ok(())
  }
}
