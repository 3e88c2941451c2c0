//! The five primitive schema kinds. Each descriptor is the bare tag.

use crate::error::Result;
use crate::schema::{Schema, Tag};
use crate::sink::EntryBuf;
use crate::value::{unexpected_type, Value};
use std::convert::TryFrom;

/// Size on the wire of a string value: length prefix plus UTF-8 bytes.
pub(crate) fn str_size(s: &str) -> usize {
  4 + s.len()
}

fn as_i32(value: &Value) -> Result<i32> {
  match value {
    Value::Int(x) => Ok(*x),
    // longs narrow when they fit, so JSON-sourced integers can feed an
    // i32 channel
    Value::Long(x) => {
      i32::try_from(*x).map_err(|_| unexpected_type("int (32-bit range)", value))
    }
    v => Err(unexpected_type("int", v)),
  }
}

fn as_i64(value: &Value) -> Result<i64> {
  match value {
    Value::Int(x) => Ok(i64::from(*x)),
    Value::Long(x) => Ok(*x),
    v => Err(unexpected_type("long", v)),
  }
}

fn as_f64(value: &Value) -> Result<f64> {
  match value {
    Value::Double(x) => Ok(*x),
    Value::Int(x) => Ok(f64::from(*x)),
    Value::Long(x) => Ok(*x as f64),
    v => Err(unexpected_type("double", v)),
  }
}

/// Two's-complement big-endian 32-bit integer.
#[derive(Copy, Clone, Debug, Default)]
pub struct Int32Schema;

impl Schema for Int32Schema {
  fn tag(&self) -> Tag {
    Tag::Int32
  }

  fn obj_size(&self, value: &Value) -> Result<usize> {
    as_i32(value).map(|_| 4)
  }

  fn encode_obj(&self, value: &Value, buf: &mut EntryBuf) -> Result<()> {
    buf.put_i32(as_i32(value)?)
  }
}

/// Two's-complement big-endian 64-bit integer.
#[derive(Copy, Clone, Debug, Default)]
pub struct Int64Schema;

impl Schema for Int64Schema {
  fn tag(&self) -> Tag {
    Tag::Int64
  }

  fn obj_size(&self, value: &Value) -> Result<usize> {
    as_i64(value).map(|_| 8)
  }

  fn encode_obj(&self, value: &Value, buf: &mut EntryBuf) -> Result<()> {
    buf.put_i64(as_i64(value)?)
  }
}

/// IEEE-754 big-endian double. Integer values widen losslessly enough for
/// logging purposes.
#[derive(Copy, Clone, Debug, Default)]
pub struct Float64Schema;

impl Schema for Float64Schema {
  fn tag(&self) -> Tag {
    Tag::Float64
  }

  fn obj_size(&self, value: &Value) -> Result<usize> {
    as_f64(value).map(|_| 8)
  }

  fn encode_obj(&self, value: &Value, buf: &mut EntryBuf) -> Result<()> {
    buf.put_f64(as_f64(value)?)
  }
}

/// Single byte, `0x00` false and `0x01` true.
#[derive(Copy, Clone, Debug, Default)]
pub struct BoolSchema;

impl Schema for BoolSchema {
  fn tag(&self) -> Tag {
    Tag::Bool
  }

  fn obj_size(&self, value: &Value) -> Result<usize> {
    match value {
      Value::Bool(_) => Ok(1),
      v => Err(unexpected_type("bool", v)),
    }
  }

  fn encode_obj(&self, value: &Value, buf: &mut EntryBuf) -> Result<()> {
    match value {
      Value::Bool(b) => buf.put_bool(*b),
      v => Err(unexpected_type("bool", v)),
    }
  }
}

/// Length-prefixed UTF-8 string. The length counts bytes, not codepoints.
#[derive(Copy, Clone, Debug, Default)]
pub struct StrSchema;

impl Schema for StrSchema {
  fn tag(&self) -> Tag {
    Tag::Str
  }

  fn obj_size(&self, value: &Value) -> Result<usize> {
    match value {
      Value::Str(s) => Ok(str_size(s)),
      v => Err(unexpected_type("string", v)),
    }
  }

  fn encode_obj(&self, value: &Value, buf: &mut EntryBuf) -> Result<()> {
    match value {
      Value::Str(s) => buf.put_str(s),
      v => Err(unexpected_type("string", v)),
    }
  }
}
