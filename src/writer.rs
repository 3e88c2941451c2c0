//! The writer engine: header emission, the channel table, and the schema
//! and message entries that make up a log stream.

use crate::derive::TypeDesc;
use crate::error::{Error, Result};
use crate::registry::SchemaRegistry;
use crate::schema::Schema;
use crate::sink::{EntryBuf, FileSink, Sink};
use crate::value::Value;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

#[cfg(test)]
mod test;

// distinguishes writers so a ChannelId cannot cross between them
static NEXT_WRITER_ID: AtomicU64 = AtomicU64::new(0);

/// First two header bytes of every stream.
pub const MAGIC: [u8; 2] = [0x52, 0x52];
/// Wire format version, stored big-endian in the header's last two bytes.
/// Readers must reject any other value.
pub const VERSION: u16 = 1;

const SCHEMA_ENTRY: i32 = 0;
const MESSAGE_ENTRY: i32 = 1;
// entry kind plus name length or channel index
const ENTRY_PREFIX: usize = 8;

/// Validates a stream header against [`MAGIC`] and [`VERSION`].
pub fn check_header(header: [u8; 4]) -> Result<()> {
  if header[..2] == MAGIC && header[2..] == VERSION.to_be_bytes() {
    Ok(())
  } else {
    Err(Error::BadHeader { found: header })
  }
}

/// A channel registered with a specific writer. Indices are dense, 0-based
/// in declaration order, and never reused.
///
/// An id carries the identity of the writer that issued it, so handing it
/// to any other writer fails with [`Error::UnknownChannel`] even when the
/// index would be in range there.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ChannelId {
  writer: u64,
  index: u32,
}

impl ChannelId {
  /// The wire index of this channel.
  pub fn index(self) -> u32 {
    self.index
  }
}

struct ChannelRec {
  name: String,
  schema: Arc<dyn Schema>,
}

struct WriterState {
  // None once the writer is closed
  sink: Option<Box<dyn Sink>>,
  channels: Vec<ChannelRec>,
}

impl WriterState {
  fn index_of(&self, name: &str) -> Option<u32> {
    self.channels.iter().position(|c| c.name == name).map(|i| i as u32)
  }

  fn check_open(&self) -> Result<()> {
    if self.sink.is_none() {
      Err(Error::WriterClosed)
    } else {
      Ok(())
    }
  }

  /// Hands one assembled entry to the sink. An I/O failure leaves the
  /// stream in an indeterminate state, so the sink is released and every
  /// later operation refuses.
  fn emit(&mut self, entry: &[u8]) -> Result<()> {
    let sink = self.sink.as_mut().ok_or(Error::WriterClosed)?;
    if let Err(err) = sink.put(entry) {
      self.sink = None;
      return Err(err);
    }
    Ok(())
  }

  /// Appends a channel and emits its schema entry in one atomic sink write.
  /// Nothing is emitted and nothing is registered on failure.
  fn register(&mut self, name: &str, schema: Arc<dyn Schema>) -> Result<u32> {
    self.check_open()?;
    let index = self.channels.len() as u32;

    let mut buf = EntryBuf::with_capacity(ENTRY_PREFIX + name.len() + schema.schema_size());
    buf.put_i32(SCHEMA_ENTRY)?;
    buf.put_str(name)?;
    schema.encode_schema(&mut buf)?;
    let entry = buf.finish()?;

    self.emit(&entry)?;
    self.channels.push(ChannelRec {
      name: name.to_owned(),
      schema,
    });
    debug!(channel = name, index, "registered channel");
    Ok(index)
  }

  /// Emits one message entry in one atomic sink write. The value encoding
  /// is sized, assembled and checked in full before the sink is touched.
  fn emit_message(&mut self, index: u32, schema: &dyn Schema, value: &Value) -> Result<()> {
    self.check_open()?;
    let n = schema.obj_size(value)?;

    let mut buf = EntryBuf::with_capacity(ENTRY_PREFIX + n);
    buf.put_i32(MESSAGE_ENTRY)?;
    buf.put_i32(index as i32)?;
    schema.encode_obj(value, &mut buf)?;
    let entry = buf.finish()?;

    self.emit(&entry)
  }
}

/// Appends typed value streams to a byte sink.
///
/// A writer is a shared resource: every operation takes its mutex, so entry
/// order is exactly the order of calls. Each channel's schema entry is
/// emitted once, at registration, before any message on that channel.
pub struct LogWriter {
  id: u64,
  state: Mutex<WriterState>,
  registry: Arc<SchemaRegistry>,
}

impl LogWriter {
  /// Wraps a sink, emitting the stream header immediately.
  pub fn new(sink: Box<dyn Sink>) -> Result<Self> {
    LogWriter::with_registry(sink, SchemaRegistry::global())
  }

  /// Like [`new`](Self::new) with an explicit registry for the dynamic
  /// write path.
  pub fn with_registry(mut sink: Box<dyn Sink>, registry: Arc<SchemaRegistry>) -> Result<Self> {
    let mut header = [0u8; 4];
    header[..2].copy_from_slice(&MAGIC);
    header[2..].copy_from_slice(&VERSION.to_be_bytes());
    sink.put(&header)?;
    Ok(LogWriter {
      id: NEXT_WRITER_ID.fetch_add(1, Ordering::Relaxed),
      state: Mutex::new(WriterState {
        sink: Some(sink),
        channels: Vec::new(),
      }),
      registry,
    })
  }

  /// Opens a fresh log file at `path`.
  pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
    LogWriter::new(Box::new(FileSink::create(path)?))
  }

  /// The registry consulted by the dynamic write path.
  pub fn registry(&self) -> &Arc<SchemaRegistry> {
    &self.registry
  }

  /// Registers a channel, emitting its schema entry. Fails with
  /// [`Error::DuplicateChannel`] (emitting nothing) if the name is taken.
  pub fn add_channel(&self, name: &str, schema: Arc<dyn Schema>) -> Result<ChannelId> {
    let mut state = self.state.lock();
    if state.index_of(name).is_some() {
      return Err(Error::DuplicateChannel(name.to_owned()));
    }
    let writer = self.id;
    state.register(name, schema).map(|index| ChannelId { writer, index })
  }

  /// True if a channel with `name` has been registered with this writer.
  pub fn has_channel(&self, name: &str) -> bool {
    self.state.lock().index_of(name).is_some()
  }

  /// Writes one value on a registered channel. The id must be one this
  /// writer issued; ids from other writers are rejected even when their
  /// index is in range here.
  pub fn write(&self, channel: ChannelId, value: &Value) -> Result<()> {
    if channel.writer != self.id {
      return Err(Error::UnknownChannel(channel.index));
    }
    let mut state = self.state.lock();
    let schema = state
      .channels
      .get(channel.index as usize)
      .map(|c| Arc::clone(&c.schema))
      .ok_or(Error::UnknownChannel(channel.index))?;
    state.emit_message(channel.index, schema.as_ref(), value)
  }

  /// Writes through a `(name, schema)` handle, registering the channel
  /// first if this writer has not seen the name. Registration and write
  /// happen under one lock acquisition.
  ///
  /// If the name is already bound, the channel's registered schema governs
  /// the stream and `schema` is ignored.
  pub fn write_with(&self, name: &str, schema: &Arc<dyn Schema>, value: &Value) -> Result<()> {
    let mut state = self.state.lock();
    let index = match state.index_of(name) {
      Some(i) => i,
      None => state.register(name, Arc::clone(schema))?,
    };
    let schema = Arc::clone(&state.channels[index as usize].schema);
    state.emit_message(index, schema.as_ref(), value)
  }

  /// The dynamically typed write path: an unknown name gets a channel whose
  /// schema is derived from the value's runtime shape via the registry.
  /// The first-seen schema prevails for the channel's lifetime.
  pub fn write_named(&self, name: &str, value: &Value) -> Result<()> {
    let mut state = self.state.lock();
    let index = match state.index_of(name) {
      Some(i) => i,
      None => {
        let desc = TypeDesc::of_value(value)?;
        let schema = self.registry.schema_of(&desc)?;
        state.register(name, schema)?
      }
    };
    let schema = Arc::clone(&state.channels[index as usize].schema);
    state.emit_message(index, schema.as_ref(), value)
  }

  /// Flushes and releases the sink. Every later operation, including a
  /// second `close`, fails with [`Error::WriterClosed`].
  pub fn close(&self) -> Result<()> {
    let mut state = self.state.lock();
    let mut sink = state.sink.take().ok_or(Error::WriterClosed)?;
    sink.flush()?;
    debug!(channels = state.channels.len(), "closed log writer");
    Ok(())
  }
}
