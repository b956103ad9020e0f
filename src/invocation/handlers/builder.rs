//! Builder handlers for embeds, components, commands and attachments.
//!
//! Builder state travels as local target data (a JSON object). Each step
//! returns the next state as a builder object whose canonical form is that
//! JSON, so chaining is `result -> target.data -> next call`.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Map, Value};

use super::native::parse_datetime;
use super::{arg, HandlerCall, HandlerError, SymbolHandler};
use crate::invocation::value::{LiveObject, LiveValue};

/// One builder step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderOp {
    /// Static `Builder.from(data)`
    From,
    /// `data[field] = arg0`
    Set(&'static str),
    /// Colors as integers, `#rrggbb` or a few names
    SetColor(&'static str),
    /// RFC 3339 timestamp, now when omitted
    SetTimestamp(&'static str),
    /// Append every argument (arrays flattened) to `data[field]`
    Push(&'static str),
    /// Replace `data[field]` with the flattened arguments
    Replace(&'static str),
    /// Append `arg0` to `options` with the given option type
    PushOption(u8),
    /// Plain JSON of the current state
    ToJson,
}

#[derive(Debug, Clone)]
pub struct BuilderHandler {
    type_name: &'static str,
    op: BuilderOp,
    /// Field holding base64 content, surfaced as binary in results
    binary_field: Option<&'static str>,
}

impl BuilderHandler {
    pub fn new(type_name: &'static str, op: BuilderOp) -> Self {
        Self {
            type_name,
            op,
            binary_field: None,
        }
    }

    pub fn binary(mut self, field: &'static str) -> Self {
        self.binary_field = Some(field);
        self
    }

    fn current_state(&self, call: &HandlerCall<'_>) -> Result<Map<String, Value>, HandlerError> {
        match call.target_data {
            None | Some(Value::Null) => Ok(Map::new()),
            Some(Value::Object(map)) => Ok(map.clone()),
            Some(other) => Err(HandlerError::InvalidTarget(format!(
                "{} state must be an object, got {}",
                self.type_name, other
            ))),
        }
    }

    fn apply(&self, call: &HandlerCall<'_>, mut state: Map<String, Value>) -> Result<Map<String, Value>, HandlerError> {
        match self.op {
            BuilderOp::From => match arg(call.args, 0, "data")? {
                Value::Object(map) => return Ok(map.clone()),
                other => {
                    return Err(HandlerError::InvalidArgument {
                        index: 0,
                        message: format!("builder data must be an object, got {}", other),
                    })
                }
            },
            BuilderOp::Set(field) => {
                state.insert(field.to_string(), arg(call.args, 0, field)?.clone());
            }
            BuilderOp::SetColor(field) => {
                state.insert(field.to_string(), json!(resolve_color(arg(call.args, 0, field)?)?));
            }
            BuilderOp::SetTimestamp(field) => {
                let timestamp = match call.args.first() {
                    None | Some(Value::Null) => Utc::now(),
                    Some(Value::String(s)) => parse_datetime(s, 0)?,
                    Some(Value::Number(n)) => n
                        .as_i64()
                        .and_then(chrono::DateTime::from_timestamp_millis)
                        .ok_or_else(|| HandlerError::InvalidArgument {
                            index: 0,
                            message: format!("{} is not a millisecond timestamp", n),
                        })?,
                    Some(other) => {
                        return Err(HandlerError::InvalidArgument {
                            index: 0,
                            message: format!("timestamp must be a date string or milliseconds, got {}", other),
                        })
                    }
                };
                state.insert(
                    field.to_string(),
                    json!(timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)),
                );
            }
            BuilderOp::Push(field) => {
                let mut items = match state.remove(field) {
                    Some(Value::Array(items)) => items,
                    _ => Vec::new(),
                };
                items.extend(flatten_args(call.args));
                state.insert(field.to_string(), Value::Array(items));
            }
            BuilderOp::Replace(field) => {
                state.insert(field.to_string(), Value::Array(flatten_args(call.args)));
            }
            BuilderOp::PushOption(option_type) => {
                let mut option = match arg(call.args, 0, "option")? {
                    Value::Object(map) => map.clone(),
                    other => {
                        return Err(HandlerError::InvalidArgument {
                            index: 0,
                            message: format!("option must be an object, got {}", other),
                        })
                    }
                };
                for required in ["name", "description"] {
                    if !option.get(required).map_or(false, Value::is_string) {
                        return Err(HandlerError::InvalidArgument {
                            index: 0,
                            message: format!("option needs a string '{}'", required),
                        });
                    }
                }
                option.insert("type".to_string(), json!(option_type));
                let mut options = match state.remove("options") {
                    Some(Value::Array(items)) => items,
                    _ => Vec::new(),
                };
                options.push(Value::Object(option));
                state.insert("options".to_string(), Value::Array(options));
            }
            BuilderOp::ToJson => {}
        }
        Ok(state)
    }

    fn to_live(&self, state: Map<String, Value>) -> Result<LiveValue, HandlerError> {
        let Some(field) = self.binary_field else {
            let canonical = Value::Object(state.clone());
            let fields = state
                .into_iter()
                .map(|(k, v)| (k, LiveValue::from_json(v)))
                .collect();
            return Ok(LiveValue::Object(LiveObject::with_canonical(
                self.type_name,
                fields,
                canonical,
            )));
        };

        let mut fields = Vec::with_capacity(state.len());
        for (key, value) in state {
            if key == field {
                let encoded = value.as_str().unwrap_or_default();
                let decoded = BASE64
                    .decode(encoded)
                    .map_err(|e| HandlerError::InvalidArgument {
                        index: 0,
                        message: format!("{} is not valid base64: {}", field, e),
                    })?;
                fields.push((key, LiveValue::Bytes(Bytes::from(decoded))));
            } else {
                fields.push((key, LiveValue::from_json(value)));
            }
        }
        Ok(LiveValue::Object(LiveObject::new(self.type_name, fields)))
    }
}

fn flatten_args(args: &[Value]) -> Vec<Value> {
    args.iter()
        .flat_map(|a| match a {
            Value::Array(items) => items.clone(),
            Value::Null => Vec::new(),
            other => vec![other.clone()],
        })
        .collect()
}

const NAMED_COLORS: &[(&str, u32)] = &[
    ("Default", 0x000000),
    ("White", 0xFFFFFF),
    ("Red", 0xED4245),
    ("Green", 0x57F287),
    ("Blue", 0x3498DB),
    ("Yellow", 0xFEE75C),
    ("Blurple", 0x5865F2),
    ("Fuchsia", 0xEB459E),
];

fn resolve_color(value: &Value) -> Result<u32, HandlerError> {
    let invalid = |message: String| HandlerError::InvalidArgument { index: 0, message };
    match value {
        Value::Number(n) => n
            .as_u64()
            .and_then(|c| u32::try_from(c).ok())
            .filter(|c| *c <= 0xFFFFFF)
            .ok_or_else(|| invalid(format!("{} is not a color", n))),
        Value::String(s) => {
            if let Some(hex) = s.strip_prefix('#') {
                return u32::from_str_radix(hex, 16)
                    .ok()
                    .filter(|c| hex.len() == 6 && *c <= 0xFFFFFF)
                    .ok_or_else(|| invalid(format!("'{}' is not a #rrggbb color", s)));
            }
            NAMED_COLORS
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(s))
                .map(|(_, c)| *c)
                .ok_or_else(|| invalid(format!("unknown color '{}'", s)))
        }
        Value::Array(rgb) if rgb.len() == 3 => {
            let mut color = 0u32;
            for channel in rgb {
                let c = channel
                    .as_u64()
                    .filter(|c| *c <= 255)
                    .ok_or_else(|| invalid(format!("{} is not an RGB channel", channel)))?;
                color = (color << 8) | c as u32;
            }
            Ok(color)
        }
        other => Err(invalid(format!("{} is not a color", other))),
    }
}

#[async_trait]
impl SymbolHandler for BuilderHandler {
    fn describe(&self) -> Value {
        json!({
            "handler": "builder",
            "type": self.type_name,
            "step": format!("{:?}", self.op),
        })
    }

    async fn call(&self, call: HandlerCall<'_>) -> Result<LiveValue, HandlerError> {
        let state = self.current_state(&call)?;
        let next = self.apply(&call, state)?;
        if self.op == BuilderOp::ToJson {
            return Ok(LiveValue::from_json(Value::Object(next)));
        }
        self.to_live(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SerializationConfig;
    use crate::connection::InMemoryConnection;
    use crate::invocation::serialize::serialize_value;
    use std::collections::BTreeMap;

    async fn step(handler: BuilderHandler, data: Option<Value>, args: Vec<Value>) -> Result<Value, HandlerError> {
        let conn = InMemoryConnection::new();
        let ids = BTreeMap::new();
        let call = HandlerCall {
            symbol: "builder",
            target: None,
            target_data: data.as_ref(),
            args: &args,
            ids: &ids,
            connection: &conn,
        };
        let value = handler.call(call).await?;
        Ok(serialize_value(&value, &SerializationConfig::default()))
    }

    #[tokio::test]
    async fn test_embed_chain() {
        let title = step(BuilderHandler::new("EmbedBuilder", BuilderOp::Set("title")), None, vec![json!("Hello")])
            .await
            .unwrap();
        assert_eq!(title, json!({"title": "Hello"}));

        let colored = step(
            BuilderHandler::new("EmbedBuilder", BuilderOp::SetColor("color")),
            Some(title),
            vec![json!("#ff0000")],
        )
        .await
        .unwrap();
        assert_eq!(colored, json!({"title": "Hello", "color": 0xFF0000}));

        let fields = step(
            BuilderHandler::new("EmbedBuilder", BuilderOp::Push("fields")),
            Some(colored),
            vec![json!({"name": "a", "value": "1"}), json!([{"name": "b", "value": "2"}])],
        )
        .await
        .unwrap();
        assert_eq!(fields["fields"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_colors() {
        assert_eq!(resolve_color(&json!("Blurple")).unwrap(), 0x5865F2);
        assert_eq!(resolve_color(&json!([255, 0, 1])).unwrap(), 0xFF0001);
        assert!(resolve_color(&json!("#12")).is_err());
        assert!(resolve_color(&json!(0x1000000)).is_err());
    }

    #[tokio::test]
    async fn test_slash_command_options() {
        let handler = BuilderHandler::new("SlashCommandBuilder", BuilderOp::PushOption(3));
        let out = step(handler.clone(), Some(json!({"name": "ping"})), vec![json!({"name": "target", "description": "who"})])
            .await
            .unwrap();
        assert_eq!(out["options"][0]["type"], json!(3));
        assert!(step(handler, None, vec![json!({"name": "x"})]).await.is_err());
    }

    #[tokio::test]
    async fn test_attachment_binary_field() {
        let handler = BuilderHandler::new("AttachmentBuilder", BuilderOp::From).binary("attachment");
        let out = step(handler, None, vec![json!({"attachment": "aGVsbG8=", "name": "hello.txt"})])
            .await
            .unwrap();
        assert_eq!(out["attachment"], json!({"type": "Buffer", "length": 5}));
        assert_eq!(out["name"], "hello.txt");
    }

    #[tokio::test]
    async fn test_timestamp_and_to_json() {
        let stamped = step(
            BuilderHandler::new("EmbedBuilder", BuilderOp::SetTimestamp("timestamp")),
            None,
            vec![json!("2024-01-01T00:00:00Z")],
        )
        .await
        .unwrap();
        assert_eq!(stamped["timestamp"], "2024-01-01T00:00:00.000Z");

        let plain = step(BuilderHandler::new("EmbedBuilder", BuilderOp::ToJson), Some(stamped.clone()), vec![])
            .await
            .unwrap();
        assert_eq!(plain, stamped);
    }

    #[tokio::test]
    async fn test_invalid_state_rejected() {
        let err = step(BuilderHandler::new("EmbedBuilder", BuilderOp::Set("title")), Some(json!([1])), vec![json!("x")])
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::InvalidTarget(_)));
    }
}
