//! The crate-wide error type.

use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Every detectable format or ordering violation maps to one of these
/// variants and is raised at the point of detection; none are swallowed.
#[derive(Error, Debug)]
pub enum Error {
  /// Channel registration with a name this writer already uses.
  #[error("duplicate channel name: {0}")]
  DuplicateChannel(String),

  /// Message write against an index this writer never issued.
  #[error("channel index {0} is not bound to this writer")]
  UnknownChannel(u32),

  /// A schema's size accounting disagrees with the bytes it produced.
  /// Indicates a bug in a schema implementation; fatal to that write.
  #[error("size accounting mismatch: expected {expected} bytes, produced {produced}")]
  SizeMismatch { expected: usize, produced: usize },

  /// An enum value that names no declared constant, or an ordinal outside
  /// the declared range.
  #[error("'{0}' is not a declared enum constant")]
  InvalidEnumValue(String),

  /// Schema derivation hit a type description it cannot handle.
  #[error("cannot derive a schema: {0}")]
  UnsupportedType(String),

  /// A custom schema's component names and schemas differ in count, or its
  /// encoder returned a list of the wrong arity.
  #[error("component count mismatch: {expected} expected, {actual} given")]
  MismatchedComponents { expected: usize, actual: usize },

  /// Passthrough of an I/O failure from the byte sink. The stream is in an
  /// indeterminate state afterwards.
  #[error("sink i/o failure")]
  SinkIo(#[from] std::io::Error),

  /// Operation on a writer after `close`.
  #[error("writer is closed")]
  WriterClosed,

  /// Stream header magic or version mismatch.
  #[error("bad stream header: {found:02x?}")]
  BadHeader { found: [u8; 4] },

  /// A value of the wrong variant was handed to a schema.
  #[error("unexpected value type: {found}, expected {expected}")]
  ValueType {
    expected: &'static str,
    found: &'static str,
  },

  /// A record value lacks a field its schema declares.
  #[error("record value is missing field '{0}'")]
  MissingField(String),

  /// A string or collection too long for a 32-bit wire count.
  #[error("{what} of length {len} does not fit a 32-bit count")]
  Oversize { what: &'static str, len: usize },
}
