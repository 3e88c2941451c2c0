//! The `schema` module implements the schema algebra: the closed set of
//! schema kinds, each of which knows how to size and serialize both its own
//! wire descriptor and the values it governs.

use crate::error::{Error, Result};
use crate::sink::EntryBuf;
use crate::value::Value;
use std::fmt::Debug;
use std::sync::Arc;

mod collection;
mod primitive;
mod record;
mod translate;

pub use collection::{EnumSchema, ListSchema};
pub use primitive::{BoolSchema, Float64Schema, Int32Schema, Int64Schema, StrSchema};
pub use record::{CustomSchema, RecordSchema, TypedRecordSchema};
pub use translate::TranslateSchema;

/// Number of bytes a kind tag occupies on the wire.
pub const TAG_LEN: usize = 4;

/// Name of the implicit discriminator field in typed and custom records.
pub const TYPE_FIELD: &str = ".type";

/// The stable kind registry. Tag values are part of the wire format and must
/// never be renumbered. Reflected, typed and custom records are
/// wire-identical and share `Record`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[repr(i32)]
pub enum Tag {
  Record = 0,
  Int32 = 1,
  Int64 = 2,
  Float64 = 3,
  Str = 4,
  Bool = 5,
  Enum = 6,
  List = 7,
}

impl Tag {
  /// Wire value for this kind.
  pub fn code(self) -> i32 {
    self as i32
  }
}

/// The contract every schema kind satisfies.
///
/// Size accounting must be exact: `encode_schema` produces `schema_size`
/// bytes, `encode_obj` produces `obj_size(value)` bytes, and any
/// disagreement surfaces as [`Error::SizeMismatch`] before the sink sees a
/// byte. Descriptors always begin with the kind tag.
///
/// The provided methods cover the parameterless kinds, whose descriptor is
/// the tag alone; parameterized kinds override both.
///
/// [`Error::SizeMismatch`]: crate::Error::SizeMismatch
pub trait Schema: Debug + Send + Sync {
  /// The kind tag of this schema.
  fn tag(&self) -> Tag;

  /// Number of bytes `encode_schema` will produce.
  fn schema_size(&self) -> usize {
    TAG_LEN
  }

  /// Writes this schema's wire descriptor, starting with its tag.
  fn encode_schema(&self, buf: &mut EntryBuf) -> Result<()> {
    buf.put_i32(self.tag().code())
  }

  /// Exact number of bytes `encode_obj` will produce for `value`.
  fn obj_size(&self, value: &Value) -> Result<usize>;

  /// Writes `value`, consuming exactly `obj_size(value)` bytes.
  fn encode_obj(&self, value: &Value, buf: &mut EntryBuf) -> Result<()>;
}

/// Encodes `schema`'s descriptor into an exact-sized buffer.
pub fn descriptor_bytes(schema: &dyn Schema) -> Result<Vec<u8>> {
  let mut buf = EntryBuf::with_capacity(schema.schema_size());
  schema.encode_schema(&mut buf)?;
  buf.finish()
}

/// Encodes `value` under `schema` into an exact-sized buffer.
pub fn value_bytes(schema: &dyn Schema, value: &Value) -> Result<Vec<u8>> {
  let mut buf = EntryBuf::with_capacity(schema.obj_size(value)?);
  schema.encode_obj(value, &mut buf)?;
  buf.finish()
}

/// Checks that `len` fits a 32-bit wire count.
pub(crate) fn count_i32(what: &'static str, len: usize) -> Result<i32> {
  if len > i32::MAX as usize {
    Err(Error::Oversize { what, len })
  } else {
    Ok(len as i32)
  }
}

pub fn int32() -> Arc<dyn Schema> {
  Arc::new(Int32Schema)
}

pub fn int64() -> Arc<dyn Schema> {
  Arc::new(Int64Schema)
}

pub fn float64() -> Arc<dyn Schema> {
  Arc::new(Float64Schema)
}

pub fn boolean() -> Arc<dyn Schema> {
  Arc::new(BoolSchema)
}

pub fn string() -> Arc<dyn Schema> {
  Arc::new(StrSchema)
}

/// Shorthand for an [`EnumSchema`] over `constants`.
pub fn enumeration<I, S>(constants: I) -> Arc<dyn Schema>
where
  I: IntoIterator<Item = S>,
  S: Into<String>,
{
  Arc::new(EnumSchema::new(constants))
}

/// Shorthand for a [`ListSchema`] over `elem`.
pub fn list(elem: Arc<dyn Schema>) -> Arc<dyn Schema> {
  Arc::new(ListSchema::new(elem))
}
