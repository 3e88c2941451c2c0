//! Channel handles: named, schema-carrying bundles bound to a writer, a
//! typed wrapper over them, and a downsampling wrapper that bounds the
//! emission rate.

use crate::derive::Loggable;
use crate::error::Result;
use crate::schema::Schema;
use crate::value::Value;
use crate::writer::LogWriter;
use parking_lot::Mutex;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A `(name, schema, writer)` bundle.
///
/// Binding is lazy: the channel registers itself with the writer on the
/// first `put`, so handles can be created freely at startup.
#[derive(Clone)]
pub struct Channel {
  name: String,
  schema: Arc<dyn Schema>,
  writer: Arc<LogWriter>,
}

impl Channel {
  pub fn new<N: Into<String>>(writer: Arc<LogWriter>, name: N, schema: Arc<dyn Schema>) -> Self {
    Channel {
      name: name.into(),
      schema,
      writer,
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn schema(&self) -> &Arc<dyn Schema> {
    &self.schema
  }

  /// Forwards one value to the writer.
  pub fn put(&self, value: &Value) -> Result<()> {
    self.writer.write_with(&self.name, &self.schema, value)
  }
}

/// A statically typed handle over a [`Channel`].
pub struct Typed<T: Loggable> {
  chan: Channel,
  _value: PhantomData<fn(&T)>,
}

impl<T: Loggable> Typed<T> {
  /// Creates a handle whose schema comes from the writer's registry (and so
  /// is derived at most once per type).
  pub fn new<N: Into<String>>(writer: Arc<LogWriter>, name: N) -> Result<Self> {
    let schema = writer.registry().schema_of_type::<T>()?;
    Ok(Typed {
      chan: Channel::new(writer, name, schema),
      _value: PhantomData,
    })
  }

  pub fn put(&self, value: &T) -> Result<()> {
    self.chan.put(&value.to_value())
  }

  /// The underlying dynamic handle.
  pub fn as_channel(&self) -> &Channel {
    &self.chan
  }
}

/// The admission rule behind [`Downsampler`], kept free of clocks so it can
/// be exercised directly.
///
/// `admit(now)` emits iff `now` has reached the next due time, then rounds
/// the due time up to the following period boundary. The due time starts at
/// zero so the first call always emits. This bounds the rate without fixing
/// it: the emitted stream is aperiodic, but two emissions are never less
/// than one period apart.
#[derive(Debug)]
pub struct RateGate {
  period_ns: u64,
  next_due_ns: u64,
}

impl RateGate {
  pub fn new(period: Duration) -> Self {
    RateGate {
      period_ns: period.as_nanos() as u64,
      next_due_ns: 0,
    }
  }

  pub fn admit(&mut self, now_ns: u64) -> bool {
    if self.period_ns == 0 {
      return true;
    }
    if now_ns < self.next_due_ns {
      return false;
    }
    self.next_due_ns = (now_ns / self.period_ns + 1) * self.period_ns;
    true
  }
}

/// Wraps a channel with a minimum period between writes, measured on a
/// monotonic clock. Values arriving before the period has elapsed are
/// dropped silently.
pub struct Downsampler {
  chan: Channel,
  gate: Mutex<RateGate>,
  epoch: Instant,
}

impl Downsampler {
  pub fn new(chan: Channel, period: Duration) -> Self {
    Downsampler {
      chan,
      gate: Mutex::new(RateGate::new(period)),
      epoch: Instant::now(),
    }
  }

  pub fn put(&self, value: &Value) -> Result<()> {
    let now_ns = self.epoch.elapsed().as_nanos() as u64;
    if self.gate.lock().admit(now_ns) {
      self.chan.put(value)
    } else {
      Ok(())
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::registry::SchemaRegistry;
  use crate::schema;
  use crate::sink::MemSink;
  use proptest::prelude::*;

  fn fresh_writer() -> (Arc<LogWriter>, MemSink) {
    let sink = MemSink::new();
    let registry = Arc::new(SchemaRegistry::new());
    let writer =
      LogWriter::with_registry(Box::new(sink.clone()), registry).expect("header write");
    (Arc::new(writer), sink)
  }

  #[test]
  fn handles_bind_lazily() {
    let (writer, _sink) = fresh_writer();
    let chan = Channel::new(Arc::clone(&writer), "volts", schema::float64());
    assert!(!writer.has_channel("volts"));

    chan.put(&Value::Double(11.9)).expect("put");
    assert!(writer.has_channel("volts"));
  }

  #[test]
  fn typed_handles_convert_values() {
    let (writer, sink) = fresh_writer();
    let chan = Typed::<i32>::new(Arc::clone(&writer), "count").expect("handle");
    chan.put(&3).expect("put");

    let stream = sink.bytes();
    // message payload is the last four bytes
    assert_eq!(&stream[stream.len() - 4..], &3i32.to_be_bytes());
  }

  #[test]
  fn gate_admits_the_first_call() {
    let mut gate = RateGate::new(Duration::from_nanos(100));
    assert!(gate.admit(0));
  }

  #[test]
  fn gate_rounds_the_due_time_to_period_boundaries() {
    let mut gate = RateGate::new(Duration::from_nanos(100));
    assert!(gate.admit(250));
    // due advances to 300, not 350
    assert!(!gate.admit(299));
    assert!(gate.admit(300));
  }

  #[test]
  fn zero_period_always_admits() {
    let mut gate = RateGate::new(Duration::from_nanos(0));
    assert!(gate.admit(5));
    assert!(gate.admit(5));
  }

  #[test]
  fn downsampler_forwards_the_first_value() {
    let (writer, sink) = fresh_writer();
    let chan = Channel::new(writer, "v", schema::int32());
    let sampled = Downsampler::new(chan, Duration::from_secs(3600));
    sampled.put(&Value::Int(1)).expect("put");
    let first_len = sink.len();
    assert!(first_len > 4);

    // well inside the hour: dropped without error
    sampled.put(&Value::Int(2)).expect("put");
    assert_eq!(sink.len(), first_len);
  }

  proptest! {
    // any two emissions are at least one period apart, at strictly
    // increasing times
    #[test]
    fn prop_emissions_are_at_least_a_period_apart(
      period in 1u64..1_000,
      steps in prop::collection::vec(0u64..500, 1..50),
    ) {
      let mut gate = RateGate::new(Duration::from_nanos(period));
      let mut now = 0u64;
      let mut emitted = Vec::new();
      for step in steps {
        now += step + 1; // strictly increasing clock
        if gate.admit(now) {
          emitted.push(now);
        }
      }
      prop_assert!(!emitted.is_empty());
      for pair in emitted.windows(2) {
        prop_assert!(pair[1] > pair[0]);
        prop_assert!(pair[1] - pair[0] >= period);
      }
    }
  }
}
