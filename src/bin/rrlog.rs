use anyhow::{anyhow, Context, Result};
use rrlog::decl::TypeDecl;
use rrlog::value::Value;
use rrlog::writer::LogWriter;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::convert::TryFrom;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
  name = "rrlog",
  about = "Converts a JSON-lines capture into a binary log stream"
)]
struct Opt {
  /// Path to a YAML file declaring channel schemas
  #[structopt(short, long)]
  schema: Option<PathBuf>,

  /// Output file
  #[structopt(short)]
  out_file: Option<PathBuf>,

  /// Path to the capture; one JSON object per line, mapping channel names
  /// to values
  file: PathBuf,
}

impl Opt {
  fn output_file_path(&self) -> PathBuf {
    if let Some(path) = &self.out_file {
      path.clone()
    } else {
      let mut input_file = self.file.clone();
      input_file.set_extension("rr");
      input_file
    }
  }
}

fn run(opt: &Opt) -> Result<()> {
  let writer = LogWriter::create(opt.output_file_path())
    .with_context(|| "couldn't open output log")?;

  // Channels declared up front get their declared schemas; anything else
  // goes through the dynamic path below.
  if let Some(path) = &opt.schema {
    let schema_file =
      File::open(path).with_context(|| format!("couldn't open {}", path.display()))?;
    let decls: BTreeMap<String, TypeDecl> =
      serde_yaml::from_reader(schema_file).with_context(|| "failed to parse schema")?;
    for (name, decl) in &decls {
      let schema = decl
        .build()
        .with_context(|| format!("bad declaration for channel '{}'", name))?;
      writer.add_channel(name, schema)?;
    }
  }

  let data_file = File::open(&opt.file)
    .with_context(|| format!("couldn't open {}", opt.file.display()))?;
  for (lineno, line) in BufReader::new(data_file).lines().enumerate() {
    let line = line?;
    if line.trim().is_empty() {
      continue;
    }
    let json = serde_json::from_str::<JsonValue>(&line)
      .with_context(|| format!("line {}: invalid json", lineno + 1))?;
    let entries = json
      .as_object()
      .ok_or_else(|| anyhow!("line {}: expected an object", lineno + 1))?;

    for (channel, json_value) in entries {
      let value = Value::try_from(json_value)
        .with_context(|| format!("line {}: channel '{}'", lineno + 1, channel))?;
      writer
        .write_named(channel, &value)
        .with_context(|| format!("line {}: channel '{}'", lineno + 1, channel))?;
    }
  }

  writer.close()?;
  Ok(())
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .init();

  let opt = Opt::from_args();
  run(&opt)
}
