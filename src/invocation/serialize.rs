//! Depth-bounded conversion of live values into JSON.
//!
//! | value | JSON |
//! |---|---|
//! | collection | `{type, size, entries: [[key, value]...], truncated?}` |
//! | set | `{type, size, values, truncated?}` |
//! | bytes | `{type: "Buffer", length}` |
//! | function | `{type: "Function", name}` |
//! | object on the current path | `"[Circular]"` |
//! | nesting past `max_depth` | `"[MaxDepth]"` |
//! | list past `max_items` | items, then `"[Truncated: N more items]"` |
//!
//! Objects with a canonical hook serialize as the hook's value.

use serde_json::{json, Map, Value};
use std::sync::Arc;

use super::value::{LiveObject, LiveValue};
use crate::config::SerializationConfig;

pub const CIRCULAR: &str = "[Circular]";
pub const MAX_DEPTH: &str = "[MaxDepth]";

/// Serialize `value` under `limits`.
pub fn serialize_value(value: &LiveValue, limits: &SerializationConfig) -> Value {
    let mut walker = Walker {
        limits,
        path: Vec::new(),
    };
    walker.walk(value, 0)
}

fn truncation_marker(remaining: usize) -> Value {
    Value::String(format!("[Truncated: {} more items]", remaining))
}

struct Walker<'a> {
    limits: &'a SerializationConfig,
    /// Objects on the path from the root to the current value
    path: Vec<*const LiveObject>,
}

impl Walker<'_> {
    fn walk(&mut self, value: &LiveValue, depth: usize) -> Value {
        match value {
            LiveValue::Null => Value::Null,
            LiveValue::Bool(b) => Value::Bool(*b),
            LiveValue::Number(n) => Value::Number(n.clone()),
            LiveValue::String(s) => Value::String(self.clip(s)),
            LiveValue::Bytes(bytes) => json!({ "type": "Buffer", "length": bytes.len() }),
            LiveValue::Function { name } => json!({ "type": "Function", "name": name }),
            _ if depth >= self.limits.max_depth => Value::String(MAX_DEPTH.to_string()),
            LiveValue::List(items) => {
                let mut out: Vec<Value> = items
                    .iter()
                    .take(self.limits.max_items)
                    .map(|item| self.walk(item, depth + 1))
                    .collect();
                if items.len() > self.limits.max_items {
                    out.push(truncation_marker(items.len() - self.limits.max_items));
                }
                Value::Array(out)
            }
            LiveValue::Map { type_name, entries } => {
                let kept: Vec<Value> = entries
                    .iter()
                    .take(self.limits.max_entries)
                    .map(|(key, item)| json!([key, self.walk(item, depth + 1)]))
                    .collect();
                let mut out = json!({
                    "type": type_name,
                    "size": entries.len(),
                    "entries": kept,
                });
                if entries.len() > self.limits.max_entries {
                    out["truncated"] = truncation_marker(entries.len() - self.limits.max_entries);
                }
                out
            }
            LiveValue::Set { type_name, values } => {
                let kept: Vec<Value> = values
                    .iter()
                    .take(self.limits.max_items)
                    .map(|item| self.walk(item, depth + 1))
                    .collect();
                let mut out = json!({
                    "type": type_name,
                    "size": values.len(),
                    "values": kept,
                });
                if values.len() > self.limits.max_items {
                    out["truncated"] = truncation_marker(values.len() - self.limits.max_items);
                }
                out
            }
            LiveValue::Object(object) => self.walk_object(object, depth),
        }
    }

    fn walk_object(&mut self, object: &Arc<LiveObject>, depth: usize) -> Value {
        if let Some(canonical) = object.canonical() {
            return canonical.clone();
        }

        let ptr = Arc::as_ptr(object);
        if self.path.contains(&ptr) {
            return Value::String(CIRCULAR.to_string());
        }

        self.path.push(ptr);
        let fields = object.fields();
        let mut out = Map::new();
        for (name, field) in fields.iter().take(self.limits.max_fields) {
            out.insert(name.clone(), self.walk(field, depth + 1));
        }
        if fields.len() > self.limits.max_fields {
            out.insert(
                "__truncated".to_string(),
                Value::String(format!("[Truncated: {} more fields]", fields.len() - self.limits.max_fields)),
            );
        }
        self.path.pop();
        Value::Object(out)
    }

    fn clip(&self, s: &str) -> String {
        match s.char_indices().nth(self.limits.max_string_len) {
            Some((cut, _)) => format!("{}…", &s[..cut]),
            None => s.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn limits() -> SerializationConfig {
        SerializationConfig::default()
    }

    #[test]
    fn test_self_reference_terminates() {
        let guild = LiveObject::new("Guild", vec![("id".into(), LiveValue::string("1"))]);
        guild.set_field("self", LiveValue::Object(Arc::clone(&guild)));

        let json = serialize_value(&LiveValue::Object(guild), &limits());
        assert_eq!(json["id"], "1");
        assert_eq!(json["self"], CIRCULAR);
    }

    #[test]
    fn test_shared_non_cyclic_objects_are_repeated() {
        let user = LiveObject::new("User", vec![("id".into(), LiveValue::string("7"))]);
        let list = LiveValue::List(vec![
            LiveValue::Object(Arc::clone(&user)),
            LiveValue::Object(user),
        ]);
        let json = serialize_value(&list, &limits());
        assert_eq!(json[0]["id"], "7");
        assert_eq!(json[1]["id"], "7");
    }

    #[test]
    fn test_large_collection_truncated() {
        let entries = (0..10_000)
            .map(|i| (i.to_string(), LiveValue::Number(i.into())))
            .collect();
        let value = LiveValue::Map {
            type_name: "Collection".into(),
            entries,
        };
        let json = serialize_value(&value, &limits());
        assert_eq!(json["size"], 10_000);
        assert_eq!(json["entries"].as_array().unwrap().len(), 100);
        assert_eq!(json["entries"][0], json!(["0", 0]));
        assert_eq!(json["truncated"], "[Truncated: 9900 more items]");
    }

    #[test]
    fn test_list_truncation_marker() {
        let mut small = limits();
        small.max_items = 2;
        let value = LiveValue::List((0..5).map(|i| LiveValue::Number(i.into())).collect());
        assert_eq!(
            serialize_value(&value, &small),
            json!([0, 1, "[Truncated: 3 more items]"])
        );
    }

    #[test]
    fn test_depth_limit() {
        let mut shallow = limits();
        shallow.max_depth = 2;
        let inner = LiveObject::new("C", vec![("leaf".into(), LiveValue::Bool(true))]);
        let middle = LiveObject::new("B", vec![("c".into(), LiveValue::Object(inner))]);
        let outer = LiveObject::new("A", vec![("b".into(), LiveValue::Object(middle))]);

        let json = serialize_value(&LiveValue::Object(outer), &shallow);
        assert_eq!(json["b"]["c"], MAX_DEPTH);
    }

    #[test]
    fn test_special_markers() {
        let obj = LiveObject::new(
            "Attachment",
            vec![
                ("file".into(), LiveValue::Bytes(Bytes::from_static(b"abc"))),
                ("handler".into(), LiveValue::Function { name: "onClick".into() }),
                (
                    "flags".into(),
                    LiveValue::Set {
                        type_name: "Set".into(),
                        values: vec![LiveValue::string("a")],
                    },
                ),
            ],
        );
        let json = serialize_value(&LiveValue::Object(obj), &limits());
        assert_eq!(json["file"], json!({"type": "Buffer", "length": 3}));
        assert_eq!(json["handler"], json!({"type": "Function", "name": "onClick"}));
        assert_eq!(json["flags"], json!({"type": "Set", "size": 1, "values": ["a"]}));
    }

    #[test]
    fn test_canonical_hook_wins() {
        let embed = LiveObject::with_canonical(
            "EmbedBuilder",
            vec![("internal".into(), LiveValue::Null)],
            json!({"title": "hi"}),
        );
        assert_eq!(serialize_value(&LiveValue::Object(embed), &limits()), json!({"title": "hi"}));
    }

    #[test]
    fn test_long_strings_clipped() {
        let mut tight = limits();
        tight.max_string_len = 3;
        assert_eq!(serialize_value(&LiveValue::string("abcdef"), &tight), json!("abc…"));
        assert_eq!(serialize_value(&LiveValue::string("abc"), &tight), json!("abc"));
    }
}
