//! Typed, self-describing binary logging.
//!
//! # Goals
//!
//! * Append strongly typed value streams ("channels") to a compact binary
//!   log
//! * Self-describing output: channel names and schemas travel in the
//!   stream, so readers need no out-of-band metadata
//! * Exact byte accounting: every entry is sized up front and written in
//!   one contiguous sink call
//!
//! # Example
//!
//! ```
//! use rrlog::prelude::*;
//!
//! # fn main() -> rrlog::Result<()> {
//! let sink = MemSink::new();
//! let writer = LogWriter::new(Box::new(sink.clone()))?;
//!
//! let ints = writer.add_channel("ints", rrlog::schema::int32())?;
//! writer.write(ints, &Value::Int(42))?;
//! writer.close()?;
//!
//! assert_eq!(&sink.bytes()[..4], &[0x52, 0x52, 0x00, 0x01]);
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod decl;
pub mod derive;
pub mod error;
pub mod registry;
pub mod schema;
pub mod sink;
pub mod value;
pub mod writer;

pub use error::{Error, Result};

/// A collection of commonly used types.
pub mod prelude {
  pub use crate::channel::{Channel, Downsampler, Typed};
  pub use crate::derive::{Loggable, TypeDesc};
  pub use crate::error::{Error, Result};
  pub use crate::registry::SchemaRegistry;
  pub use crate::schema::Schema;
  pub use crate::sink::{FileSink, MemSink, Sink};
  pub use crate::value::Value;
  pub use crate::writer::{ChannelId, LogWriter};
}
