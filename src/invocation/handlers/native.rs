//! Native handlers: pure functions over arguments and local target data.
//!
//! None of these touch the network. Local containers (`Collection`,
//! `PermissionsBitField`) are stateless: each call receives the current
//! state as target data and returns the new state.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};

use super::{arg, arg_str, opt_arg, HandlerCall, HandlerError, SymbolHandler};
use crate::invocation::value::{LiveObject, LiveValue};

/// Signature of a native function.
pub type NativeFn = fn(&HandlerCall<'_>) -> Result<LiveValue, HandlerError>;

#[derive(Debug, Clone)]
pub struct NativeHandler {
    name: &'static str,
    func: NativeFn,
}

impl NativeHandler {
    pub fn new(name: &'static str, func: NativeFn) -> Self {
        Self { name, func }
    }
}

#[async_trait]
impl SymbolHandler for NativeHandler {
    fn describe(&self) -> Value {
        json!({ "handler": "native", "function": self.name })
    }

    async fn call(&self, call: HandlerCall<'_>) -> Result<LiveValue, HandlerError> {
        (self.func)(&call)
    }
}

// ── Formatting ───────────────────────────────────────────────────────────────

fn wrapped(call: &HandlerCall<'_>, name: &str, prefix: &str, suffix: &str) -> Result<LiveValue, HandlerError> {
    let content = arg_str(call.args, 0, name)?;
    Ok(LiveValue::String(format!("{}{}{}", prefix, content, suffix)))
}

pub fn user_mention(call: &HandlerCall<'_>) -> Result<LiveValue, HandlerError> {
    wrapped(call, "userId", "<@", ">")
}

pub fn channel_mention(call: &HandlerCall<'_>) -> Result<LiveValue, HandlerError> {
    wrapped(call, "channelId", "<#", ">")
}

pub fn role_mention(call: &HandlerCall<'_>) -> Result<LiveValue, HandlerError> {
    wrapped(call, "roleId", "<@&", ">")
}

pub fn bold(call: &HandlerCall<'_>) -> Result<LiveValue, HandlerError> {
    wrapped(call, "content", "**", "**")
}

pub fn italic(call: &HandlerCall<'_>) -> Result<LiveValue, HandlerError> {
    wrapped(call, "content", "_", "_")
}

pub fn underline(call: &HandlerCall<'_>) -> Result<LiveValue, HandlerError> {
    wrapped(call, "content", "__", "__")
}

pub fn strikethrough(call: &HandlerCall<'_>) -> Result<LiveValue, HandlerError> {
    wrapped(call, "content", "~~", "~~")
}

pub fn spoiler(call: &HandlerCall<'_>) -> Result<LiveValue, HandlerError> {
    wrapped(call, "content", "||", "||")
}

pub fn inline_code(call: &HandlerCall<'_>) -> Result<LiveValue, HandlerError> {
    wrapped(call, "content", "`", "`")
}

pub fn quote(call: &HandlerCall<'_>) -> Result<LiveValue, HandlerError> {
    wrapped(call, "content", "> ", "")
}

pub fn block_quote(call: &HandlerCall<'_>) -> Result<LiveValue, HandlerError> {
    wrapped(call, "content", ">>> ", "")
}

/// `codeBlock(content)` or `codeBlock(language, content)`.
pub fn code_block(call: &HandlerCall<'_>) -> Result<LiveValue, HandlerError> {
    let first = arg_str(call.args, 0, "content")?;
    let formatted = match opt_arg(call.args, 1) {
        Some(_) => format!("```{}\n{}\n```", first, arg_str(call.args, 1, "content")?),
        None => format!("```\n{}\n```", first),
    };
    Ok(LiveValue::String(formatted))
}

/// `hyperlink(content, url, title?)`.
pub fn hyperlink(call: &HandlerCall<'_>) -> Result<LiveValue, HandlerError> {
    let content = arg_str(call.args, 0, "content")?;
    let url = arg_str(call.args, 1, "url")?;
    let link = match opt_arg(call.args, 2) {
        Some(_) => format!("[{}]({} \"{}\")", content, url, arg_str(call.args, 2, "title")?),
        None => format!("[{}]({})", content, url),
    };
    Ok(LiveValue::String(link))
}

pub fn escape_markdown(call: &HandlerCall<'_>) -> Result<LiveValue, HandlerError> {
    let text = arg_str(call.args, 0, "text")?;
    let mut escaped = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        if matches!(c, '\\' | '*' | '_' | '~' | '`' | '|') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    Ok(LiveValue::String(escaped))
}

/// `formatEmoji(emojiId, animated?)`.
pub fn format_emoji(call: &HandlerCall<'_>) -> Result<LiveValue, HandlerError> {
    let id = arg_str(call.args, 0, "emojiId")?;
    let animated = opt_arg(call.args, 1).and_then(Value::as_bool).unwrap_or(false);
    let prefix = if animated { "a" } else { "" };
    Ok(LiveValue::String(format!("<{}:_:{}>", prefix, id)))
}

const TIMESTAMP_STYLES: &str = "tTdDfFR";

/// `time(timestamp?, style?)`: a Discord timestamp tag. Numbers are seconds.
pub fn time(call: &HandlerCall<'_>) -> Result<LiveValue, HandlerError> {
    let seconds = match opt_arg(call.args, 0) {
        None => Utc::now().timestamp(),
        Some(Value::Number(n)) => n.as_i64().ok_or_else(|| HandlerError::InvalidArgument {
            index: 0,
            message: format!("timestamp must be an integer, got {}", n),
        })?,
        Some(Value::String(s)) => parse_datetime(s, 0)?.timestamp(),
        Some(other) => {
            return Err(HandlerError::InvalidArgument {
                index: 0,
                message: format!("timestamp must be seconds or an ISO date, got {}", other),
            })
        }
    };
    let tag = match opt_arg(call.args, 1) {
        None => format!("<t:{}>", seconds),
        Some(_) => {
            let style = arg_str(call.args, 1, "style")?;
            if style.chars().count() != 1 || !TIMESTAMP_STYLES.contains(style.as_str()) {
                return Err(HandlerError::InvalidArgument {
                    index: 1,
                    message: format!("style must be one of {}", TIMESTAMP_STYLES),
                });
            }
            format!("<t:{}:{}>", seconds, style)
        }
    };
    Ok(LiveValue::String(tag))
}

pub(crate) fn parse_datetime(raw: &str, index: usize) -> Result<DateTime<Utc>, HandlerError> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| HandlerError::InvalidArgument {
            index,
            message: format!("'{}' is not an RFC 3339 date: {}", raw, e),
        })
}

// ── Snowflakes ───────────────────────────────────────────────────────────────

/// Milliseconds since the Unix epoch at the first second of 2015.
pub const DISCORD_EPOCH: u64 = 1_420_070_400_000;

fn snowflake_arg(call: &HandlerCall<'_>, index: usize) -> Result<u64, HandlerError> {
    let raw = arg_str(call.args, index, "snowflake")?;
    raw.trim().parse().map_err(|_| HandlerError::InvalidArgument {
        index,
        message: format!("'{}' is not a snowflake", raw),
    })
}

fn millis_to_iso(ms: u64) -> Value {
    i64::try_from(ms)
        .ok()
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .map_or(Value::Null, |dt| json!(dt.to_rfc3339()))
}

pub fn snowflake_deconstruct(call: &HandlerCall<'_>) -> Result<LiveValue, HandlerError> {
    let id = snowflake_arg(call, 0)?;
    let timestamp = (id >> 22) + DISCORD_EPOCH;
    Ok(LiveValue::entity(
        "DeconstructedSnowflake",
        json!({
            "id": id.to_string(),
            "timestamp": timestamp,
            "date": millis_to_iso(timestamp),
            "workerId": (id & 0x3E0000) >> 17,
            "processId": (id & 0x1F000) >> 12,
            "increment": id & 0xFFF,
        }),
    ))
}

pub fn snowflake_timestamp_from(call: &HandlerCall<'_>) -> Result<LiveValue, HandlerError> {
    let id = snowflake_arg(call, 0)?;
    Ok(LiveValue::Number(((id >> 22) + DISCORD_EPOCH).into()))
}

/// `SnowflakeUtil.generate(timestamp?)` with worker, process and increment zero.
pub fn snowflake_generate(call: &HandlerCall<'_>) -> Result<LiveValue, HandlerError> {
    let millis: i64 = match opt_arg(call.args, 0) {
        None => Utc::now().timestamp_millis(),
        Some(Value::Number(n)) => n.as_i64().unwrap_or(-1),
        Some(Value::String(s)) => parse_datetime(s, 0)?.timestamp_millis(),
        Some(other) => {
            return Err(HandlerError::InvalidArgument {
                index: 0,
                message: format!("timestamp must be milliseconds or an ISO date, got {}", other),
            })
        }
    };
    let millis = u64::try_from(millis)
        .ok()
        .filter(|ms| *ms >= DISCORD_EPOCH)
        .ok_or_else(|| HandlerError::InvalidArgument {
            index: 0,
            message: "timestamp predates the Discord epoch".to_string(),
        })?;
    Ok(LiveValue::String(((millis - DISCORD_EPOCH) << 22).to_string()))
}

// ── Permission bitfields ─────────────────────────────────────────────────────

/// Permission flag names and their bit positions.
pub const PERMISSION_FLAGS: &[(&str, u32)] = &[
    ("CreateInstantInvite", 0),
    ("KickMembers", 1),
    ("BanMembers", 2),
    ("Administrator", 3),
    ("ManageChannels", 4),
    ("ManageGuild", 5),
    ("AddReactions", 6),
    ("ViewAuditLog", 7),
    ("PrioritySpeaker", 8),
    ("Stream", 9),
    ("ViewChannel", 10),
    ("SendMessages", 11),
    ("SendTTSMessages", 12),
    ("ManageMessages", 13),
    ("EmbedLinks", 14),
    ("AttachFiles", 15),
    ("ReadMessageHistory", 16),
    ("MentionEveryone", 17),
    ("UseExternalEmojis", 18),
    ("ViewGuildInsights", 19),
    ("Connect", 20),
    ("Speak", 21),
    ("MuteMembers", 22),
    ("DeafenMembers", 23),
    ("MoveMembers", 24),
    ("UseVAD", 25),
    ("ChangeNickname", 26),
    ("ManageNicknames", 27),
    ("ManageRoles", 28),
    ("ManageWebhooks", 29),
    ("ManageGuildExpressions", 30),
    ("UseApplicationCommands", 31),
    ("RequestToSpeak", 32),
    ("ManageEvents", 33),
    ("ManageThreads", 34),
    ("CreatePublicThreads", 35),
    ("CreatePrivateThreads", 36),
    ("UseExternalStickers", 37),
    ("SendMessagesInThreads", 38),
    ("UseEmbeddedActivities", 39),
    ("ModerateMembers", 40),
];

const ADMINISTRATOR: u64 = 1 << 3;

/// Resolve a flag name, decimal bitfield, number, array or `{bitfield}` object.
pub fn resolve_permissions(value: &Value, index: usize) -> Result<u64, HandlerError> {
    let invalid = |message: String| HandlerError::InvalidArgument { index, message };
    match value {
        Value::Null => Ok(0),
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| invalid(format!("{} is not a permission bitfield", n))),
        Value::String(s) => {
            if let Ok(bits) = s.trim().parse::<u64>() {
                return Ok(bits);
            }
            PERMISSION_FLAGS
                .iter()
                .find(|(name, _)| *name == s.trim())
                .map(|(_, bit)| 1u64 << bit)
                .ok_or_else(|| invalid(format!("unknown permission '{}'", s)))
        }
        Value::Array(items) => items
            .iter()
            .try_fold(0u64, |acc, item| Ok(acc | resolve_permissions(item, index)?)),
        Value::Object(map) => match map.get("bitfield") {
            Some(bits) => resolve_permissions(bits, index),
            None => Err(invalid("permission object has no bitfield".to_string())),
        },
        Value::Bool(_) => Err(invalid("a boolean is not a permission".to_string())),
    }
}

fn current_permissions(call: &HandlerCall<'_>) -> Result<u64, HandlerError> {
    match call.target_data {
        None => Ok(0),
        Some(data) => resolve_permissions(data, 0)
            .map_err(|e| HandlerError::InvalidTarget(e.to_string())),
    }
}

fn permissions_value(bits: u64) -> LiveValue {
    LiveValue::Object(LiveObject::with_canonical(
        "PermissionsBitField",
        vec![("bitfield".to_string(), LiveValue::string(bits.to_string()))],
        json!({ "bitfield": bits.to_string() }),
    ))
}

fn all_args_permissions(call: &HandlerCall<'_>) -> Result<u64, HandlerError> {
    call.args
        .iter()
        .enumerate()
        .try_fold(0u64, |acc, (index, value)| Ok(acc | resolve_permissions(value, index)?))
}

/// `PermissionsBitField.resolve(permissions)`: the decimal bitfield.
pub fn permissions_resolve(call: &HandlerCall<'_>) -> Result<LiveValue, HandlerError> {
    let bits = resolve_permissions(arg(call.args, 0, "permissions")?, 0)?;
    Ok(LiveValue::String(bits.to_string()))
}

/// `PermissionsBitField#has(permission, checkAdmin = true)`.
pub fn permissions_has(call: &HandlerCall<'_>) -> Result<LiveValue, HandlerError> {
    let current = current_permissions(call)?;
    let wanted = resolve_permissions(arg(call.args, 0, "permission")?, 0)?;
    let check_admin = opt_arg(call.args, 1).and_then(Value::as_bool).unwrap_or(true);
    let granted = (check_admin && current & ADMINISTRATOR != 0) || current & wanted == wanted;
    Ok(LiveValue::Bool(granted))
}

pub fn permissions_add(call: &HandlerCall<'_>) -> Result<LiveValue, HandlerError> {
    let current = current_permissions(call)?;
    Ok(permissions_value(current | all_args_permissions(call)?))
}

pub fn permissions_remove(call: &HandlerCall<'_>) -> Result<LiveValue, HandlerError> {
    let current = current_permissions(call)?;
    Ok(permissions_value(current & !all_args_permissions(call)?))
}

pub fn permissions_to_array(call: &HandlerCall<'_>) -> Result<LiveValue, HandlerError> {
    let current = current_permissions(call)?;
    let names = PERMISSION_FLAGS
        .iter()
        .filter(|(_, bit)| current & (1u64 << bit) != 0)
        .map(|(name, _)| LiveValue::string(*name))
        .collect();
    Ok(LiveValue::List(names))
}

// ── Collections ──────────────────────────────────────────────────────────────

fn json_key(value: &Value, index: usize) -> Result<String, HandlerError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(HandlerError::InvalidArgument {
            index,
            message: format!("collection keys must be strings, got {}", other),
        }),
    }
}

/// Entries of the target collection: an object, or an array of `[key, value]` pairs.
fn collection_entries(call: &HandlerCall<'_>) -> Result<Vec<(String, Value)>, HandlerError> {
    match call.target_data {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Object(map)) => Ok(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()),
        Some(Value::Array(pairs)) => pairs
            .iter()
            .map(|pair| match pair.as_array().map(Vec::as_slice) {
                Some([key, value]) => json_key(key, 0)
                    .map(|k| (k, value.clone()))
                    .map_err(|e| HandlerError::InvalidTarget(e.to_string())),
                _ => Err(HandlerError::InvalidTarget(format!(
                    "collection entries must be [key, value] pairs, got {}",
                    pair
                ))),
            })
            .collect(),
        Some(other) => Err(HandlerError::InvalidTarget(format!(
            "a collection must be an object or an entry list, got {}",
            other
        ))),
    }
}

fn collection_value(entries: Vec<(String, Value)>) -> LiveValue {
    LiveValue::Map {
        type_name: "Collection".to_string(),
        entries: entries
            .into_iter()
            .map(|(k, v)| (k, LiveValue::from_json(v)))
            .collect(),
    }
}

fn key_arg(call: &HandlerCall<'_>) -> Result<String, HandlerError> {
    json_key(arg(call.args, 0, "key")?, 0)
}

pub fn collection_get(call: &HandlerCall<'_>) -> Result<LiveValue, HandlerError> {
    let key = key_arg(call)?;
    let found = collection_entries(call)?
        .into_iter()
        .find(|(k, _)| *k == key)
        .map_or(LiveValue::Null, |(_, v)| LiveValue::from_json(v));
    Ok(found)
}

pub fn collection_has(call: &HandlerCall<'_>) -> Result<LiveValue, HandlerError> {
    let key = key_arg(call)?;
    Ok(LiveValue::Bool(collection_entries(call)?.iter().any(|(k, _)| *k == key)))
}

/// Returns the updated collection.
pub fn collection_set(call: &HandlerCall<'_>) -> Result<LiveValue, HandlerError> {
    let key = key_arg(call)?;
    let value = call.args.get(1).cloned().unwrap_or(Value::Null);
    let mut entries = collection_entries(call)?;
    match entries.iter_mut().find(|(k, _)| *k == key) {
        Some(slot) => slot.1 = value,
        None => entries.push((key, value)),
    }
    Ok(collection_value(entries))
}

/// Returns the updated collection.
pub fn collection_delete(call: &HandlerCall<'_>) -> Result<LiveValue, HandlerError> {
    let key = key_arg(call)?;
    let mut entries = collection_entries(call)?;
    entries.retain(|(k, _)| *k != key);
    Ok(collection_value(entries))
}

pub fn collection_clear(_call: &HandlerCall<'_>) -> Result<LiveValue, HandlerError> {
    Ok(collection_value(Vec::new()))
}

pub fn collection_keys(call: &HandlerCall<'_>) -> Result<LiveValue, HandlerError> {
    Ok(LiveValue::List(
        collection_entries(call)?
            .into_iter()
            .map(|(k, _)| LiveValue::String(k))
            .collect(),
    ))
}

pub fn collection_values(call: &HandlerCall<'_>) -> Result<LiveValue, HandlerError> {
    Ok(LiveValue::List(
        collection_entries(call)?
            .into_iter()
            .map(|(_, v)| LiveValue::from_json(v))
            .collect(),
    ))
}

fn take_edge(call: &HandlerCall<'_>, from_end: bool) -> Result<LiveValue, HandlerError> {
    let mut values: Vec<Value> = collection_entries(call)?.into_iter().map(|(_, v)| v).collect();
    if from_end {
        values.reverse();
    }
    match opt_arg(call.args, 0) {
        None => Ok(values.into_iter().next().map_or(LiveValue::Null, LiveValue::from_json)),
        Some(count) => {
            let count = count.as_u64().ok_or_else(|| HandlerError::InvalidArgument {
                index: 0,
                message: format!("amount must be a non-negative integer, got {}", count),
            })?;
            let mut taken: Vec<Value> = values.into_iter().take(count as usize).collect();
            if from_end {
                taken.reverse();
            }
            Ok(LiveValue::List(taken.into_iter().map(LiveValue::from_json).collect()))
        }
    }
}

/// `first()` or `first(amount)`.
pub fn collection_first(call: &HandlerCall<'_>) -> Result<LiveValue, HandlerError> {
    take_edge(call, false)
}

/// `last()` or `last(amount)`.
pub fn collection_last(call: &HandlerCall<'_>) -> Result<LiveValue, HandlerError> {
    take_edge(call, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SerializationConfig;
    use crate::connection::InMemoryConnection;
    use crate::invocation::serialize::serialize_value;
    use std::collections::BTreeMap;

    fn run(func: NativeFn, target_data: Option<Value>, args: Vec<Value>) -> Result<Value, HandlerError> {
        let conn = InMemoryConnection::new();
        let ids = BTreeMap::new();
        let call = HandlerCall {
            symbol: "test",
            target: None,
            target_data: target_data.as_ref(),
            args: &args,
            ids: &ids,
            connection: &conn,
        };
        func(&call).map(|v| serialize_value(&v, &SerializationConfig::default()))
    }

    #[test]
    fn test_formatters() {
        assert_eq!(run(user_mention, None, vec![json!("42")]).unwrap(), json!("<@42>"));
        assert_eq!(run(role_mention, None, vec![json!(7)]).unwrap(), json!("<@&7>"));
        assert_eq!(run(bold, None, vec![json!("hi")]).unwrap(), json!("**hi**"));
        assert_eq!(
            run(code_block, None, vec![json!("rs"), json!("fn main() {}")]).unwrap(),
            json!("```rs\nfn main() {}\n```")
        );
        assert_eq!(run(code_block, None, vec![json!("x")]).unwrap(), json!("```\nx\n```"));
        assert_eq!(
            run(hyperlink, None, vec![json!("docs"), json!("https://x.test")]).unwrap(),
            json!("[docs](https://x.test)")
        );
        assert_eq!(run(escape_markdown, None, vec![json!("*a_b*")]).unwrap(), json!("\\*a\\_b\\*"));
        assert_eq!(run(format_emoji, None, vec![json!("5"), json!(true)]).unwrap(), json!("<a:_:5>"));
        assert!(matches!(run(bold, None, vec![]), Err(HandlerError::MissingArgument { .. })));
    }

    #[test]
    fn test_time_tags() {
        assert_eq!(run(time, None, vec![json!(1700000000), json!("R")]).unwrap(), json!("<t:1700000000:R>"));
        assert_eq!(
            run(time, None, vec![json!("2024-01-01T00:00:00Z")]).unwrap(),
            json!("<t:1704067200>")
        );
        assert!(run(time, None, vec![json!(1), json!("x")]).is_err());
    }

    #[test]
    fn test_snowflakes() {
        // 2015-01-01T00:00:01Z, worker 1, process 0, increment 7
        let id: u64 = (1000u64 << 22) | (1 << 17) | 7;
        let parts = run(snowflake_deconstruct, None, vec![json!(id.to_string())]).unwrap();
        assert_eq!(parts["timestamp"], json!(DISCORD_EPOCH + 1000));
        assert_eq!(parts["workerId"], json!(1));
        assert_eq!(parts["increment"], json!(7));

        let generated = run(snowflake_generate, None, vec![json!(DISCORD_EPOCH + 1000)]).unwrap();
        assert_eq!(generated, json!((1000u64 << 22).to_string()));
        assert!(run(snowflake_generate, None, vec![json!(5)]).is_err());
        assert!(run(snowflake_timestamp_from, None, vec![json!("abc")]).is_err());
    }

    #[test]
    fn test_permissions() {
        assert_eq!(
            run(permissions_resolve, None, vec![json!(["KickMembers", "BanMembers"])]).unwrap(),
            json!("6")
        );
        let added = run(permissions_add, Some(json!("2")), vec![json!("SendMessages")]).unwrap();
        assert_eq!(added, json!({"bitfield": "2050"}));
        let removed = run(permissions_remove, Some(json!({"bitfield": "2050"})), vec![json!(2)]).unwrap();
        assert_eq!(removed, json!({"bitfield": "2048"}));

        assert_eq!(run(permissions_has, Some(json!("8")), vec![json!("BanMembers")]).unwrap(), json!(true));
        assert_eq!(
            run(permissions_has, Some(json!("8")), vec![json!("BanMembers"), json!(false)]).unwrap(),
            json!(false)
        );
        assert_eq!(
            run(permissions_to_array, Some(json!("3")), vec![]).unwrap(),
            json!(["CreateInstantInvite", "KickMembers"])
        );
        assert!(run(permissions_resolve, None, vec![json!("Fly")]).is_err());
    }

    #[test]
    fn test_collections() {
        let data = json!([["a", 1], ["b", 2]]);
        assert_eq!(run(collection_get, Some(data.clone()), vec![json!("b")]).unwrap(), json!(2));
        assert_eq!(run(collection_has, Some(data.clone()), vec![json!("z")]).unwrap(), json!(false));

        let updated = run(collection_set, Some(data.clone()), vec![json!("c"), json!(3)]).unwrap();
        assert_eq!(updated["size"], 3);
        assert_eq!(updated["entries"][2], json!(["c", 3]));

        let deleted = run(collection_delete, Some(data.clone()), vec![json!("a")]).unwrap();
        assert_eq!(deleted["entries"], json!([["b", 2]]));

        assert_eq!(run(collection_first, Some(data.clone()), vec![]).unwrap(), json!(1));
        assert_eq!(run(collection_last, Some(data.clone()), vec![json!(1)]).unwrap(), json!([2]));
        assert_eq!(run(collection_keys, Some(data), vec![]).unwrap(), json!(["a", "b"]));
        assert!(run(collection_get, Some(json!("nope")), vec![json!("a")]).is_err());
    }
}
