//! Dynamic values returned by symbol handlers.
//!
//! Live Discord objects are graphs: a guild holds channels that point back
//! at the guild. [`LiveObject`] is shared through `Arc` with interior-mutable
//! fields so such graphs, including self-references, can be represented and
//! later serialized with cycle detection.

use bytes::Bytes;
use parking_lot::RwLock;
use serde_json::{Number, Value};
use std::fmt;
use std::sync::Arc;

/// A value produced by a handler, before serialization.
#[derive(Clone, Debug)]
pub enum LiveValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Bytes(Bytes),
    List(Vec<LiveValue>),
    /// Keyed collection such as a `Collection<Snowflake, Message>`
    Map {
        type_name: String,
        entries: Vec<(String, LiveValue)>,
    },
    Set {
        type_name: String,
        values: Vec<LiveValue>,
    },
    Function {
        name: String,
    },
    Object(Arc<LiveObject>),
}

impl LiveValue {
    /// Convert plain JSON. Objects become `Object` instances.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n),
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::List(items.into_iter().map(Self::from_json).collect()),
            Value::Object(map) => Self::Object(LiveObject::from_json("Object", map)),
        }
    }

    /// Wrap a JSON entity under a type name, e.g. a fetched `Message`.
    pub fn entity(type_name: &str, value: Value) -> Self {
        match value {
            Value::Object(map) => Self::Object(LiveObject::from_json(type_name, map)),
            other => Self::from_json(other),
        }
    }

    /// Build a keyed collection from a JSON array of entities.
    ///
    /// `key_path` is a dotted path into each entity (`"id"`, `"user.id"`);
    /// entities without a key fall back to their position.
    pub fn collection(type_name: &str, item_type: &str, key_path: &str, items: Vec<Value>) -> Self {
        let entries = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                let key = lookup_path(&item, key_path)
                    .map(json_key)
                    .unwrap_or_else(|| index.to_string());
                (key, Self::entity(item_type, item))
            })
            .collect();
        Self::Map {
            type_name: type_name.to_string(),
            entries,
        }
    }

    pub fn string(s: impl Into<String>) -> Self {
        Self::String(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<Value> for LiveValue {
    fn from(value: Value) -> Self {
        Self::from_json(value)
    }
}

fn lookup_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, segment| current.get(segment))
}

fn json_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// A shared object with named fields.
pub struct LiveObject {
    type_name: String,
    fields: RwLock<Vec<(String, LiveValue)>>,
    /// Canonical JSON form; serialization uses it instead of walking fields
    canonical: Option<Value>,
}

impl LiveObject {
    pub fn new(type_name: impl Into<String>, fields: Vec<(String, LiveValue)>) -> Arc<Self> {
        Arc::new(Self {
            type_name: type_name.into(),
            fields: RwLock::new(fields),
            canonical: None,
        })
    }

    /// An object whose serialized form is `canonical`.
    pub fn with_canonical(
        type_name: impl Into<String>,
        fields: Vec<(String, LiveValue)>,
        canonical: Value,
    ) -> Arc<Self> {
        Arc::new(Self {
            type_name: type_name.into(),
            fields: RwLock::new(fields),
            canonical: Some(canonical),
        })
    }

    fn from_json(type_name: &str, map: serde_json::Map<String, Value>) -> Arc<Self> {
        let fields = map
            .into_iter()
            .map(|(key, value)| (key, LiveValue::from_json(value)))
            .collect();
        Self::new(type_name, fields)
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn canonical(&self) -> Option<&Value> {
        self.canonical.as_ref()
    }

    /// Set or replace a field.
    pub fn set_field(&self, name: &str, value: LiveValue) {
        let mut fields = self.fields.write();
        match fields.iter_mut().find(|(key, _)| key == name) {
            Some(slot) => slot.1 = value,
            None => fields.push((name.to_string(), value)),
        }
    }

    pub fn field(&self, name: &str) -> Option<LiveValue> {
        self.fields
            .read()
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
    }

    /// Snapshot of the fields, in insertion order.
    pub fn fields(&self) -> Vec<(String, LiveValue)> {
        self.fields.read().clone()
    }
}

// Fields are omitted: objects may contain themselves.
impl fmt::Debug for LiveObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveObject")
            .field("type_name", &self.type_name)
            .field("fields", &self.fields.read().len())
            .field("canonical", &self.canonical.is_some())
            .finish()
    }
}
