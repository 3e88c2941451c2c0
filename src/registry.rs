//! The schema registry: a shared map from type identity to schema, with
//! memoizing derivation behind [`SchemaRegistry::schema_of`].

use crate::derive::{derive, Loggable, TypeDesc};
use crate::error::Result;
use crate::schema::Schema;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

static GLOBAL: Lazy<Arc<SchemaRegistry>> = Lazy::new(|| Arc::new(SchemaRegistry::new()));

/// Maps type identities (see [`TypeDesc::key`]) to schemas.
///
/// An ordinary value, so tests and embedders can hold their own instance;
/// the process-wide one lives behind [`SchemaRegistry::global`]. All
/// operations are safe under concurrent access, and entries persist until
/// explicitly overwritten.
#[derive(Default)]
pub struct SchemaRegistry {
  map: Mutex<HashMap<String, Arc<dyn Schema>>>,
}

impl SchemaRegistry {
  pub fn new() -> Self {
    SchemaRegistry::default()
  }

  /// The process-wide registry.
  pub fn global() -> Arc<SchemaRegistry> {
    Arc::clone(&GLOBAL)
  }

  /// Inserts or replaces the schema registered under `key`. Replacement is
  /// allowed but discouraged; streams already carrying the old descriptor
  /// are unaffected.
  pub fn register<K: Into<String>>(&self, key: K, schema: Arc<dyn Schema>) {
    let key = key.into();
    if self.map.lock().insert(key.clone(), schema).is_some() {
      warn!(%key, "replaced a registered schema");
    }
  }

  pub fn lookup(&self, key: &str) -> Option<Arc<dyn Schema>> {
    self.map.lock().get(key).cloned()
  }

  /// Returns the schema registered for `desc`'s identity, deriving and
  /// storing one if none is registered yet.
  pub fn schema_of(&self, desc: &TypeDesc) -> Result<Arc<dyn Schema>> {
    let key = desc.key();
    if let Some(schema) = self.lookup(&key) {
      return Ok(schema);
    }
    let schema = derive(desc)?;
    debug!(%key, "derived schema");
    let mut map = self.map.lock();
    Ok(Arc::clone(map.entry(key).or_insert(schema)))
  }

  /// [`schema_of`](Self::schema_of) over a type's own description.
  pub fn schema_of_type<T: Loggable>(&self) -> Result<Arc<dyn Schema>> {
    self.schema_of(&T::type_desc())
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::schema;

  #[test]
  fn lookup_misses_before_registration() {
    let registry = SchemaRegistry::new();
    assert!(registry.lookup("i32").is_none());
  }

  #[test]
  fn registered_schemas_are_returned_as_is() {
    let registry = SchemaRegistry::new();
    let schema = schema::int32();
    registry.register("counter", Arc::clone(&schema));
    let found = registry.lookup("counter").expect("registered");
    assert!(Arc::ptr_eq(&schema, &found));
  }

  #[test]
  fn derivation_is_memoized() {
    let registry = SchemaRegistry::new();
    let first = registry.schema_of(&TypeDesc::Float64).expect("derive");
    let second = registry.schema_of(&TypeDesc::Float64).expect("memoized");
    assert!(Arc::ptr_eq(&first, &second));
  }

  #[test]
  fn explicit_registration_wins_over_derivation() {
    let registry = SchemaRegistry::new();
    let custom = schema::string();
    registry.register("i32", Arc::clone(&custom));
    let found = registry.schema_of(&TypeDesc::Int32).expect("lookup");
    assert!(Arc::ptr_eq(&custom, &found));
  }

  #[test]
  fn typed_lookup_goes_through_the_type_desc() {
    let registry = SchemaRegistry::new();
    let schema = registry.schema_of_type::<Vec<f64>>().expect("derive");
    let again = registry
      .schema_of(&TypeDesc::List(Box::new(TypeDesc::Float64)))
      .expect("same key");
    assert!(Arc::ptr_eq(&schema, &again));
  }
}
