//! The `sink` module defines where encoded bytes go: an append-only byte
//! sink that receives one whole entry per call, plus the exact-capacity
//! buffer entries are assembled in.

use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

/// An append-only byte sink.
///
/// Writers hand a sink one complete entry at a time, so a mid-entry
/// truncation cannot occur under an atomic `put`. No buffering guarantees
/// are made to callers; a sink may buffer internally until `flush`.
pub trait Sink: Send {
  /// Appends `entry` in full.
  fn put(&mut self, entry: &[u8]) -> Result<()>;

  /// Pushes any internally buffered bytes to the underlying medium.
  fn flush(&mut self) -> Result<()> {
    Ok(())
  }
}

/// A buffered file sink.
pub struct FileSink {
  out: BufWriter<File>,
}

impl FileSink {
  /// Creates (or truncates) the file at `path`.
  pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
    let file = File::create(path)?;
    Ok(FileSink {
      out: BufWriter::new(file),
    })
  }
}

impl Sink for FileSink {
  fn put(&mut self, entry: &[u8]) -> Result<()> {
    self.out.write_all(entry)?;
    Ok(())
  }

  fn flush(&mut self) -> Result<()> {
    self.out.flush()?;
    Ok(())
  }
}

/// Adapts any `Write` impl (pipes, sockets, ...) into a sink.
pub struct IoSink<W> {
  out: W,
}

impl<W: Write + Send> IoSink<W> {
  pub fn new(out: W) -> Self {
    IoSink { out }
  }
}

impl<W: Write + Send> Sink for IoSink<W> {
  fn put(&mut self, entry: &[u8]) -> Result<()> {
    self.out.write_all(entry)?;
    Ok(())
  }

  fn flush(&mut self) -> Result<()> {
    self.out.flush()?;
    Ok(())
  }
}

/// An in-memory sink over a shared buffer.
///
/// Cloning yields another handle to the same buffer, so a test or tool can
/// keep one clone, hand the other to a writer, and read the accumulated
/// stream back after the writer closes.
#[derive(Clone, Default)]
pub struct MemSink {
  buf: Arc<Mutex<Vec<u8>>>,
}

impl MemSink {
  pub fn new() -> Self {
    MemSink::default()
  }

  /// A snapshot of everything written so far.
  pub fn bytes(&self) -> Vec<u8> {
    self.buf.lock().clone()
  }

  pub fn len(&self) -> usize {
    self.buf.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.buf.lock().is_empty()
  }
}

impl Sink for MemSink {
  fn put(&mut self, entry: &[u8]) -> Result<()> {
    self.buf.lock().extend_from_slice(entry);
    Ok(())
  }
}

/// An assembly buffer with a fixed byte budget.
///
/// Each log entry is built in one of these, sized up front from the schema's
/// own accounting. Writing past the budget fails immediately and `finish`
/// fails unless the buffer is exactly full, so a schema whose size and
/// encode methods disagree is caught before any byte reaches the sink.
///
/// All multi-byte values are written big-endian; strings are length-prefixed
/// UTF-8 with the length counting bytes, not codepoints.
pub struct EntryBuf {
  bytes: Vec<u8>,
  cap: usize,
}

impl EntryBuf {
  pub fn with_capacity(cap: usize) -> Self {
    EntryBuf {
      bytes: Vec::with_capacity(cap),
      cap,
    }
  }

  /// Bytes written so far.
  pub fn len(&self) -> usize {
    self.bytes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.bytes.is_empty()
  }

  pub fn put_bytes(&mut self, bytes: &[u8]) -> Result<()> {
    if self.bytes.len() + bytes.len() > self.cap {
      return Err(Error::SizeMismatch {
        expected: self.cap,
        produced: self.bytes.len() + bytes.len(),
      });
    }
    self.bytes.extend_from_slice(bytes);
    Ok(())
  }

  pub fn put_i32(&mut self, v: i32) -> Result<()> {
    self.put_bytes(&v.to_be_bytes())
  }

  pub fn put_u16(&mut self, v: u16) -> Result<()> {
    self.put_bytes(&v.to_be_bytes())
  }

  pub fn put_i64(&mut self, v: i64) -> Result<()> {
    self.put_bytes(&v.to_be_bytes())
  }

  pub fn put_f64(&mut self, v: f64) -> Result<()> {
    self.put_bytes(&v.to_be_bytes())
  }

  pub fn put_bool(&mut self, v: bool) -> Result<()> {
    self.put_bytes(&[v as u8])
  }

  /// Writes an `i32` byte length followed by the UTF-8 bytes.
  pub fn put_str(&mut self, s: &str) -> Result<()> {
    let bytes = s.as_bytes();
    if bytes.len() > i32::MAX as usize {
      return Err(Error::Oversize {
        what: "string",
        len: bytes.len(),
      });
    }
    self.put_i32(bytes.len() as i32)?;
    self.put_bytes(bytes)
  }

  /// Consumes the buffer, failing unless every budgeted byte was written.
  pub fn finish(self) -> Result<Vec<u8>> {
    if self.bytes.len() != self.cap {
      return Err(Error::SizeMismatch {
        expected: self.cap,
        produced: self.bytes.len(),
      });
    }
    Ok(self.bytes)
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn exact_fill_finishes() {
    let mut buf = EntryBuf::with_capacity(6);
    buf.put_u16(0x0102).expect("u16");
    buf.put_i32(-1).expect("i32");
    assert_eq!(buf.finish().expect("full"), vec![1, 2, 0xff, 0xff, 0xff, 0xff]);
  }

  #[test]
  fn overflow_is_rejected() {
    let mut buf = EntryBuf::with_capacity(3);
    let err = buf.put_i32(7).unwrap_err();
    match err {
      Error::SizeMismatch { expected: 3, produced: 4 } => {}
      other => panic!("unexpected error: {:?}", other),
    }
  }

  #[test]
  fn underfull_finish_is_rejected() {
    let mut buf = EntryBuf::with_capacity(8);
    buf.put_i32(7).expect("i32");
    assert!(buf.finish().is_err());
  }

  #[test]
  fn strings_are_length_prefixed_in_bytes() {
    // two codepoints, three bytes
    let mut buf = EntryBuf::with_capacity(4 + 3);
    buf.put_str("aé").expect("str");
    assert_eq!(buf.finish().expect("full"), vec![0, 0, 0, 3, 0x61, 0xc3, 0xa9]);
  }

  #[test]
  fn mem_sink_accumulates_entries() {
    let sink = MemSink::new();
    let mut handle = sink.clone();
    handle.put(&[1, 2]).expect("put");
    handle.put(&[3]).expect("put");
    assert_eq!(sink.bytes(), vec![1, 2, 3]);
  }
}
