use super::*;
use crate::registry::SchemaRegistry;
use crate::schema::{self, EnumSchema, TypedRecordSchema};
use crate::sink::MemSink;
use hex::FromHex;

fn fresh_writer() -> (LogWriter, MemSink) {
  let sink = MemSink::new();
  let registry = Arc::new(SchemaRegistry::new());
  let writer =
    LogWriter::with_registry(Box::new(sink.clone()), registry).expect("header write");
  (writer, sink)
}

fn bytes(hex_str: &str) -> Vec<u8> {
  let clean: String = hex_str.split_whitespace().collect();
  Vec::from_hex(clean).expect("bad hex literal")
}

#[test]
fn empty_log_is_just_the_header() {
  let (writer, sink) = fresh_writer();
  writer.close().expect("close");
  assert_eq!(sink.bytes(), bytes("52 52 00 01"));
}

#[test]
fn header_is_rr_version_one() {
  let (_writer, sink) = fresh_writer();
  assert_eq!(sink.bytes(), vec![0x52, 0x52, 0x00, 0x01]);
}

#[test]
fn check_header_accepts_only_the_magic_and_version() {
  assert!(check_header([0x52, 0x52, 0x00, 0x01]).is_ok());
  for bad in &[
    [0x52, 0x52, 0x00, 0x02],
    [0x52, 0x53, 0x00, 0x01],
    [0x00, 0x00, 0x00, 0x00],
  ] {
    match check_header(*bad).unwrap_err() {
      Error::BadHeader { found } => assert_eq!(found, *bad),
      other => panic!("unexpected error: {:?}", other),
    }
  }
}

#[test]
fn int32_channel_with_one_message() {
  let (writer, sink) = fresh_writer();
  let ints = writer.add_channel("ints", schema::int32()).expect("channel");
  writer.write(ints, &Value::Int(42)).expect("write");
  writer.close().expect("close");

  assert_eq!(
    sink.bytes(),
    bytes(
      "52 52 00 01 \
       00 00 00 00 00 00 00 04 69 6e 74 73 00 00 00 01 \
       00 00 00 01 00 00 00 00 00 00 00 2a"
    )
  );
}

#[test]
fn float64_list_message() {
  let (writer, sink) = fresh_writer();
  let xs = writer
    .add_channel("xs", schema::list(schema::float64()))
    .expect("channel");
  writer
    .write(xs, &Value::List(vec![Value::Double(2.0), Value::Double(3.0)]))
    .expect("write");

  assert_eq!(
    sink.bytes(),
    bytes(
      "52 52 00 01 \
       00 00 00 00 00 00 00 02 78 73 00 00 00 07 00 00 00 03 \
       00 00 00 01 00 00 00 00 00 00 00 02 \
       40 00 00 00 00 00 00 00 40 08 00 00 00 00 00 00"
    )
  );
}

#[test]
fn typed_record_prepends_the_discriminator() {
  let (writer, sink) = fresh_writer();
  let schema = Arc::new(TypedRecordSchema::new(
    "Pt",
    vec![("x", schema::float64()), ("y", schema::float64())],
  ));
  let p = writer.add_channel("p", schema).expect("channel");
  writer
    .write(
      p,
      &Value::record(vec![("x", Value::Double(1.0)), ("y", Value::Double(2.0))]),
    )
    .expect("write");

  assert_eq!(
    sink.bytes(),
    bytes(
      "52 52 00 01 \
       00 00 00 00 00 00 00 01 70 \
       00 00 00 00 00 00 00 03 \
       00 00 00 05 2e 74 79 70 65 00 00 00 04 \
       00 00 00 01 78 00 00 00 03 \
       00 00 00 01 79 00 00 00 03 \
       00 00 00 01 00 00 00 00 \
       00 00 00 02 50 74 \
       3f f0 00 00 00 00 00 00 \
       40 00 00 00 00 00 00 00"
    )
  );
}

#[test]
fn enum_channel_writes_ordinals() {
  let (writer, sink) = fresh_writer();
  let schema = Arc::new(EnumSchema::new(vec!["RED", "GREEN", "BLUE"]));
  let c = writer.add_channel("c", schema).expect("channel");
  writer.write(c, &Value::Str("GREEN".to_owned())).expect("write");

  assert_eq!(
    sink.bytes(),
    bytes(
      "52 52 00 01 \
       00 00 00 00 00 00 00 01 63 \
       00 00 00 06 00 00 00 03 \
       00 00 00 03 52 45 44 \
       00 00 00 05 47 52 45 45 4e \
       00 00 00 04 42 4c 55 45 \
       00 00 00 01 00 00 00 00 00 00 00 01"
    )
  );
}

#[test]
fn duplicate_names_are_rejected_without_output() {
  let (writer, sink) = fresh_writer();
  writer.add_channel("a", schema::int32()).expect("first");
  let after_first = sink.bytes();

  let err = writer.add_channel("a", schema::int64()).unwrap_err();
  match err {
    Error::DuplicateChannel(name) => assert_eq!(name, "a"),
    other => panic!("unexpected error: {:?}", other),
  }
  assert_eq!(sink.bytes(), after_first);
}

#[test]
fn channel_indices_are_dense_and_in_declaration_order() {
  let (writer, sink) = fresh_writer();
  let ids: Vec<ChannelId> = (0..3)
    .map(|i| {
      writer
        .add_channel(&format!("ch{}", i), schema::int32())
        .expect("channel")
    })
    .collect();
  assert_eq!(ids.iter().map(|id| id.index()).collect::<Vec<_>>(), vec![0, 1, 2]);

  for id in &ids {
    writer.write(*id, &Value::Int(7)).expect("write");
  }

  // each message entry names its own channel index
  let stream = sink.bytes();
  let messages = &stream[stream.len() - 3 * 12..];
  for (i, chunk) in messages.chunks(12).enumerate() {
    assert_eq!(&chunk[..4], &1i32.to_be_bytes());
    assert_eq!(&chunk[4..8], &(i as i32).to_be_bytes());
  }
}

#[test]
fn foreign_channel_ids_are_rejected_even_when_in_range() {
  let (writer_a, _sink_a) = fresh_writer();
  writer_a.add_channel("one", schema::int32()).expect("channel");
  let stray = writer_a.add_channel("two", schema::int32()).expect("channel");

  // writer_b has just as many channels, so the stray index is in range
  // here; only the issuing writer may use the id
  let (writer_b, sink_b) = fresh_writer();
  writer_b.add_channel("one", schema::int32()).expect("channel");
  writer_b.add_channel("two", schema::int32()).expect("channel");
  let before = sink_b.bytes();

  match writer_b.write(stray, &Value::Int(0)).unwrap_err() {
    Error::UnknownChannel(index) => assert_eq!(index, 1),
    other => panic!("unexpected error: {:?}", other),
  }
  assert_eq!(sink_b.bytes(), before);

  // the issuing writer still accepts it
  writer_a.write(stray, &Value::Int(0)).expect("own id");
}

#[test]
fn write_with_registers_on_first_use_only() {
  let (writer, sink) = fresh_writer();
  let schema = schema::float64();
  writer
    .write_with("volts", &schema, &Value::Double(12.0))
    .expect("first");
  writer
    .write_with("volts", &schema, &Value::Double(12.5))
    .expect("second");

  assert_eq!(
    sink.bytes(),
    bytes(
      "52 52 00 01 \
       00 00 00 00 00 00 00 05 76 6f 6c 74 73 00 00 00 03 \
       00 00 00 01 00 00 00 00 40 28 00 00 00 00 00 00 \
       00 00 00 01 00 00 00 00 40 29 00 00 00 00 00 00"
    )
  );
}

#[test]
fn dynamic_writes_derive_a_schema_from_the_value() {
  let (writer, sink) = fresh_writer();
  writer.write_named("flag", &Value::Bool(true)).expect("first");
  writer.write_named("flag", &Value::Bool(false)).expect("second");
  assert!(writer.has_channel("flag"));

  assert_eq!(
    sink.bytes(),
    bytes(
      "52 52 00 01 \
       00 00 00 00 00 00 00 04 66 6c 61 67 00 00 00 05 \
       00 00 00 01 00 00 00 00 01 \
       00 00 00 01 00 00 00 00 00"
    )
  );
}

#[test]
fn dynamic_schema_drift_fails_in_encoding() {
  let (writer, _sink) = fresh_writer();
  writer.write_named("v", &Value::Double(1.0)).expect("first");
  // the first-seen schema prevails; a string no longer fits
  assert!(writer.write_named("v", &Value::Str("x".to_owned())).is_err());
}

#[test]
fn operations_after_close_fail() {
  let (writer, _sink) = fresh_writer();
  let ch = writer.add_channel("a", schema::int32()).expect("channel");
  writer.close().expect("close");

  assert!(matches!(writer.write(ch, &Value::Int(1)), Err(Error::WriterClosed)));
  assert!(matches!(
    writer.add_channel("b", schema::int32()),
    Err(Error::WriterClosed)
  ));
  assert!(matches!(writer.close(), Err(Error::WriterClosed)));
}

#[test]
fn an_io_failure_poisons_the_writer() {
  // accepts the header, then fails every entry
  struct FailingSink {
    puts: u32,
  }

  impl Sink for FailingSink {
    fn put(&mut self, _entry: &[u8]) -> Result<()> {
      if self.puts == 0 {
        self.puts += 1;
        Ok(())
      } else {
        Err(Error::SinkIo(std::io::Error::new(
          std::io::ErrorKind::Other,
          "boom",
        )))
      }
    }
  }

  let writer = LogWriter::with_registry(
    Box::new(FailingSink { puts: 0 }),
    Arc::new(SchemaRegistry::new()),
  )
  .expect("header write");

  assert!(matches!(
    writer.add_channel("a", schema::int32()),
    Err(Error::SinkIo(_))
  ));
  assert!(matches!(
    writer.add_channel("b", schema::int32()),
    Err(Error::WriterClosed)
  ));
}

#[test]
fn lying_size_accounting_is_caught_before_io() {
  use crate::schema::Tag;

  // claims two bytes, produces four
  #[derive(Debug)]
  struct Lying;

  impl crate::schema::Schema for Lying {
    fn tag(&self) -> Tag {
      Tag::Int32
    }

    fn obj_size(&self, _value: &Value) -> Result<usize> {
      Ok(2)
    }

    fn encode_obj(&self, _value: &Value, buf: &mut EntryBuf) -> Result<()> {
      buf.put_i32(0)
    }
  }

  let (writer, sink) = fresh_writer();
  let ch = writer.add_channel("bad", Arc::new(Lying)).expect("channel");
  let before = sink.bytes();

  match writer.write(ch, &Value::Int(0)).unwrap_err() {
    Error::SizeMismatch { expected, produced } => {
      assert_eq!(expected, 10);
      assert_eq!(produced, 12);
    }
    other => panic!("unexpected error: {:?}", other),
  }
  assert_eq!(sink.bytes(), before);
}

#[test]
fn failed_writes_emit_nothing() {
  let (writer, sink) = fresh_writer();
  let ch = writer.add_channel("a", schema::int32()).expect("channel");
  let before = sink.bytes();
  assert!(writer.write(ch, &Value::Str("nope".to_owned())).is_err());
  assert_eq!(sink.bytes(), before);
}
