//! Invocation context and target resolution.
//!
//! A call carries optional target ids (`guildId`, `channelId`, ...). The
//! resolver turns the ids a symbol actually needs into live handles, and
//! substitutes `$ref` placeholders inside call arguments.
//!
//! ```text
//!   message ──► channel (thread accepted)
//!   member, role, emoji, event ──► guild (explicit or configured default)
//!   guild, channel, thread, user, sticker, invite, webhook ──► (none)
//! ```

pub mod refs;

pub use refs::resolve_refs;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;

use crate::connection::{DiscordConnection, TargetKey};
use crate::error::GatewayError;

/// Kinds of live entities a call can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Guild,
    Channel,
    Thread,
    Message,
    User,
    Member,
    Role,
    Emoji,
    Sticker,
    Event,
    Invite,
    Webhook,
}

impl TargetKind {
    pub const ALL: [TargetKind; 12] = [
        TargetKind::Guild,
        TargetKind::Channel,
        TargetKind::Thread,
        TargetKind::Message,
        TargetKind::User,
        TargetKind::Member,
        TargetKind::Role,
        TargetKind::Emoji,
        TargetKind::Sticker,
        TargetKind::Event,
        TargetKind::Invite,
        TargetKind::Webhook,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Guild => "guild",
            Self::Channel => "channel",
            Self::Thread => "thread",
            Self::Message => "message",
            Self::User => "user",
            Self::Member => "member",
            Self::Role => "role",
            Self::Emoji => "emoji",
            Self::Sticker => "sticker",
            Self::Event => "event",
            Self::Invite => "invite",
            Self::Webhook => "webhook",
        }
    }

    /// Context field carrying this kind's id.
    pub fn context_field(&self) -> &'static str {
        match self {
            Self::Guild => "guildId",
            Self::Channel => "channelId",
            Self::Thread => "threadId",
            Self::Message => "messageId",
            Self::User => "userId",
            Self::Member => "memberId",
            Self::Role => "roleId",
            Self::Emoji => "emojiId",
            Self::Sticker => "stickerId",
            Self::Event => "eventId",
            Self::Invite => "inviteCode",
            Self::Webhook => "webhookId",
        }
    }

    /// Accepts `guild`, `guildId`, `guild_id` and `scheduledEvent` spellings.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized: String = raw
            .trim()
            .chars()
            .filter(|c| *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        let base = normalized
            .strip_suffix("id")
            .or_else(|| normalized.strip_suffix("code"))
            .unwrap_or(&normalized);
        match base {
            "scheduledevent" => Some(Self::Event),
            other => Self::ALL.iter().copied().find(|k| k.as_str() == other),
        }
    }

    /// Kind whose id must be known before this one can be resolved.
    pub fn dependency(&self) -> Option<TargetKind> {
        match self {
            Self::Message => Some(Self::Channel),
            Self::Member | Self::Role | Self::Emoji | Self::Event => Some(Self::Guild),
            _ => None,
        }
    }

    /// REST path used to fetch one entity of this kind.
    ///
    /// `None` when the kind needs a parent id the key does not carry.
    pub fn fetch_path(&self, key: &TargetKey) -> Option<String> {
        let id = urlencoding::encode(&key.id);
        let parent = key.parent.as_deref().map(urlencoding::encode);
        let path = match (self, parent) {
            (Self::Guild, _) => format!("/guilds/{}", id),
            (Self::Channel | Self::Thread, _) => format!("/channels/{}", id),
            (Self::User, _) => format!("/users/{}", id),
            (Self::Sticker, _) => format!("/stickers/{}", id),
            (Self::Invite, _) => format!("/invites/{}", id),
            (Self::Webhook, _) => format!("/webhooks/{}", id),
            (Self::Message, Some(channel)) => format!("/channels/{}/messages/{}", channel, id),
            (Self::Member, Some(guild)) => format!("/guilds/{}/members/{}", guild, id),
            (Self::Role, Some(guild)) => format!("/guilds/{}/roles/{}", guild, id),
            (Self::Emoji, Some(guild)) => format!("/guilds/{}/emojis/{}", guild, id),
            (Self::Event, Some(guild)) => format!("/guilds/{}/scheduled-events/{}", guild, id),
            (Self::Message | Self::Member | Self::Role | Self::Emoji | Self::Event, None) => {
                return None
            }
        };
        Some(path)
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional target ids scoped to one call. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct InvocationContext {
    #[serde(default, alias = "guild_id", deserialize_with = "snowflake", skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<String>,
    #[serde(default, alias = "channel_id", deserialize_with = "snowflake", skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(default, alias = "thread_id", deserialize_with = "snowflake", skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(default, alias = "message_id", deserialize_with = "snowflake", skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, alias = "user_id", deserialize_with = "snowflake", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, alias = "member_id", deserialize_with = "snowflake", skip_serializing_if = "Option::is_none")]
    pub member_id: Option<String>,
    #[serde(default, alias = "role_id", deserialize_with = "snowflake", skip_serializing_if = "Option::is_none")]
    pub role_id: Option<String>,
    #[serde(default, alias = "emoji_id", deserialize_with = "snowflake", skip_serializing_if = "Option::is_none")]
    pub emoji_id: Option<String>,
    #[serde(default, alias = "sticker_id", deserialize_with = "snowflake", skip_serializing_if = "Option::is_none")]
    pub sticker_id: Option<String>,
    #[serde(default, alias = "event_id", deserialize_with = "snowflake", skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(default, alias = "invite_code", deserialize_with = "snowflake", skip_serializing_if = "Option::is_none")]
    pub invite_code: Option<String>,
    #[serde(default, alias = "webhook_id", deserialize_with = "snowflake", skip_serializing_if = "Option::is_none")]
    pub webhook_id: Option<String>,
}

/// Ids may arrive as JSON strings or integers.
fn snowflake<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    match raw {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
        Some(Value::Number(n)) if n.is_u64() => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected an id string, got {}",
            other
        ))),
    }
}

impl InvocationContext {
    /// Parse a context object from a tool call. `null` is the empty context.
    pub fn from_value(value: Option<&Value>) -> Result<Self, GatewayError> {
        match value {
            None | Some(Value::Null) => Ok(Self::default()),
            Some(v @ Value::Object(_)) => serde_json::from_value(v.clone())
                .map_err(|e| GatewayError::Validation(format!("invalid context: {}", e))),
            Some(other) => Err(GatewayError::Validation(format!(
                "context must be an object, got {}",
                other
            ))),
        }
    }

    pub fn get(&self, kind: TargetKind) -> Option<&str> {
        self.slot(kind).as_deref()
    }

    pub fn set(&mut self, kind: TargetKind, id: impl Into<String>) {
        *self.slot_mut(kind) = Some(id.into());
    }

    pub fn is_empty(&self) -> bool {
        TargetKind::ALL.iter().all(|k| self.get(*k).is_none())
    }

    /// Ids of `self` layered over `base`.
    pub fn merged_over(&self, base: &InvocationContext) -> InvocationContext {
        let mut merged = base.clone();
        for kind in TargetKind::ALL {
            if let Some(id) = self.get(kind) {
                merged.set(kind, id);
            }
        }
        merged
    }

    fn slot(&self, kind: TargetKind) -> &Option<String> {
        match kind {
            TargetKind::Guild => &self.guild_id,
            TargetKind::Channel => &self.channel_id,
            TargetKind::Thread => &self.thread_id,
            TargetKind::Message => &self.message_id,
            TargetKind::User => &self.user_id,
            TargetKind::Member => &self.member_id,
            TargetKind::Role => &self.role_id,
            TargetKind::Emoji => &self.emoji_id,
            TargetKind::Sticker => &self.sticker_id,
            TargetKind::Event => &self.event_id,
            TargetKind::Invite => &self.invite_code,
            TargetKind::Webhook => &self.webhook_id,
        }
    }

    fn slot_mut(&mut self, kind: TargetKind) -> &mut Option<String> {
        match kind {
            TargetKind::Guild => &mut self.guild_id,
            TargetKind::Channel => &mut self.channel_id,
            TargetKind::Thread => &mut self.thread_id,
            TargetKind::Message => &mut self.message_id,
            TargetKind::User => &mut self.user_id,
            TargetKind::Member => &mut self.member_id,
            TargetKind::Role => &mut self.role_id,
            TargetKind::Emoji => &mut self.emoji_id,
            TargetKind::Sticker => &mut self.sticker_id,
            TargetKind::Event => &mut self.event_id,
            TargetKind::Invite => &mut self.invite_code,
            TargetKind::Webhook => &mut self.webhook_id,
        }
    }
}

/// Where an id came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdSource {
    Context,
    /// Configured default guild
    Default,
    /// Thread id standing in for a channel id
    Thread,
}

/// Why a kind is part of a call's requirements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementOrigin {
    /// The symbol's bound target
    Target,
    /// Parent of another requirement
    Dependency,
    /// Placeholder in a REST route
    Route,
    /// `$ref` inside the call arguments
    Reference,
}

/// How a live handle was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    Cache,
    Fetch,
}

/// A kind the resolver has to provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Need {
    pub kind: TargetKind,
    pub origin: RequirementOrigin,
    /// Whether a live handle must be looked up, not just the id
    pub fetch: bool,
}

impl Need {
    pub fn target(kind: TargetKind) -> Self {
        Self { kind, origin: RequirementOrigin::Target, fetch: true }
    }

    pub fn id_only(kind: TargetKind, origin: RequirementOrigin) -> Self {
        Self { kind, origin, fetch: false }
    }
}

/// One entry of the `contextRequirements` report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Requirement {
    pub kind: TargetKind,
    pub origin: RequirementOrigin,
    pub required: bool,
    pub provided: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_source: Option<IdSource>,
    /// `None` when only the id was needed
    pub resolved: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ResolutionSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Requirement {
    fn is_satisfied(&self) -> bool {
        self.provided && self.resolved != Some(false)
    }
}

/// A live handle for the call's bound target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedTarget {
    pub kind: TargetKind,
    pub id: String,
    pub handle: Value,
    pub source: ResolutionSource,
}

/// Output of [`ContextResolver::resolve`].
#[derive(Debug, Clone, Default)]
pub struct ResolvedContext {
    /// Ids available to route placeholders
    pub ids: BTreeMap<TargetKind, String>,
    pub requirements: Vec<Requirement>,
    pub targets: Vec<ResolvedTarget>,
}

impl ResolvedContext {
    pub fn target(&self, kind: TargetKind) -> Option<&ResolvedTarget> {
        self.targets.iter().find(|t| t.kind == kind)
    }

    pub fn is_satisfied(&self) -> bool {
        self.requirements.iter().all(Requirement::is_satisfied)
    }

    /// First unmet requirement, as the error a live call raises.
    pub fn first_failure(&self) -> Option<GatewayError> {
        self.requirements
            .iter()
            .find(|r| !r.is_satisfied())
            .map(|r| GatewayError::UnresolvedTarget {
                kind: r.kind.to_string(),
                id: r.id.clone(),
                reason: r.error.clone().unwrap_or_else(|| "not resolved".to_string()),
            })
    }

    pub fn requirements_json(&self) -> Value {
        json!(self.requirements)
    }
}

/// Resolves target ids into live handles, cache first.
#[derive(Debug, Clone, Default)]
pub struct ContextResolver {
    default_guild_id: Option<String>,
}

impl ContextResolver {
    pub fn new(default_guild_id: Option<String>) -> Self {
        Self {
            default_guild_id: default_guild_id.filter(|g| !g.trim().is_empty()),
        }
    }

    /// Id of `kind` in `ctx`, applying the default guild and the
    /// thread-as-channel fallback.
    pub fn effective_id(&self, ctx: &InvocationContext, kind: TargetKind) -> Option<(String, IdSource)> {
        if let Some(id) = ctx.get(kind) {
            return Some((id.to_string(), IdSource::Context));
        }
        match kind {
            TargetKind::Guild => self
                .default_guild_id
                .clone()
                .map(|id| (id, IdSource::Default)),
            TargetKind::Channel => ctx
                .get(TargetKind::Thread)
                .map(|id| (id.to_string(), IdSource::Thread)),
            _ => None,
        }
    }

    /// Expand needs with their dependencies, parents first, one entry per kind.
    pub fn expand(needs: &[Need]) -> Vec<Need> {
        let mut ordered: Vec<Need> = Vec::new();
        for need in needs {
            let mut chain = vec![*need];
            let mut current = need.kind;
            while let Some(parent) = current.dependency() {
                chain.push(Need::id_only(parent, RequirementOrigin::Dependency));
                current = parent;
            }
            for item in chain.into_iter().rev() {
                match ordered.iter_mut().find(|n| n.kind == item.kind) {
                    Some(existing) => {
                        existing.fetch |= item.fetch;
                        if item.origin == RequirementOrigin::Target {
                            existing.origin = RequirementOrigin::Target;
                        }
                    }
                    None => ordered.push(item),
                }
            }
        }
        ordered
    }

    /// Resolve `needs` against `ctx`.
    ///
    /// With `strict`, the first unmet requirement is returned as
    /// [`GatewayError::UnresolvedTarget`]. Otherwise every requirement is
    /// reported with `resolved: false` where it failed.
    pub async fn resolve(
        &self,
        ctx: &InvocationContext,
        needs: &[Need],
        connection: &dyn DiscordConnection,
        strict: bool,
    ) -> Result<ResolvedContext, GatewayError> {
        let mut resolved = ResolvedContext::default();

        for need in Self::expand(needs) {
            let requirement = self.resolve_one(ctx, need, connection, &mut resolved).await;
            let failed = !requirement.is_satisfied();
            resolved.requirements.push(requirement);
            if failed && strict {
                if let Some(err) = resolved.first_failure() {
                    return Err(err);
                }
            }
        }

        Ok(resolved)
    }

    async fn resolve_one(
        &self,
        ctx: &InvocationContext,
        need: Need,
        connection: &dyn DiscordConnection,
        resolved: &mut ResolvedContext,
    ) -> Requirement {
        let kind = need.kind;
        let mut requirement = Requirement {
            kind,
            origin: need.origin,
            required: true,
            provided: false,
            id: None,
            id_source: None,
            resolved: need.fetch.then_some(false),
            source: None,
            error: None,
        };

        let Some((id, id_source)) = self.effective_id(ctx, kind) else {
            let hint = if kind == TargetKind::Guild {
                " and no default guild is configured"
            } else {
                ""
            };
            requirement.error = Some(format!("context has no {}{}", kind.context_field(), hint));
            return requirement;
        };
        requirement.provided = true;
        requirement.id = Some(id.clone());
        requirement.id_source = Some(id_source);
        resolved.ids.insert(kind, id.clone());

        if !need.fetch {
            return requirement;
        }

        let parent = match kind.dependency() {
            Some(parent_kind) => match resolved.ids.get(&parent_kind) {
                Some(parent_id) => Some(parent_id.clone()),
                None => {
                    requirement.error = Some(format!(
                        "{} requires a {} id",
                        kind,
                        parent_kind.context_field()
                    ));
                    return requirement;
                }
            },
            None => None,
        };
        let key = TargetKey::new(id.clone(), parent);

        let (handle, source) = match connection.cached(kind, &key) {
            Some(handle) => (handle, ResolutionSource::Cache),
            None => match connection.fetch(kind, &key).await {
                Ok(handle) => (handle, ResolutionSource::Fetch),
                Err(e) => {
                    log::debug!("Failed to resolve {} {}: {}", kind, id, e);
                    requirement.error = Some(e.to_string());
                    return requirement;
                }
            },
        };

        requirement.resolved = Some(true);
        requirement.source = Some(source);
        resolved.targets.push(ResolvedTarget { kind, id, handle, source });
        requirement
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::InMemoryConnection;

    #[test]
    fn test_context_accepts_aliases_and_numbers() {
        let ctx = InvocationContext::from_value(Some(&json!({
            "guild_id": "1",
            "channelId": 22,
            "threadId": ""
        })))
        .unwrap();
        assert_eq!(ctx.get(TargetKind::Guild), Some("1"));
        assert_eq!(ctx.get(TargetKind::Channel), Some("22"));
        assert_eq!(ctx.get(TargetKind::Thread), None);
    }

    #[test]
    fn test_context_rejects_unknown_fields() {
        let err = InvocationContext::from_value(Some(&json!({"serverId": "1"}))).unwrap_err();
        assert_eq!(err.code(), "validation_error");
        assert!(InvocationContext::from_value(Some(&json!("1"))).is_err());
        assert!(InvocationContext::from_value(None).unwrap().is_empty());
    }

    #[test]
    fn test_target_kind_parse() {
        assert_eq!(TargetKind::parse("guildId"), Some(TargetKind::Guild));
        assert_eq!(TargetKind::parse("guild_id"), Some(TargetKind::Guild));
        assert_eq!(TargetKind::parse("inviteCode"), Some(TargetKind::Invite));
        assert_eq!(TargetKind::parse("scheduledEvent"), Some(TargetKind::Event));
        assert_eq!(TargetKind::parse("server"), None);
    }

    #[test]
    fn test_fetch_paths_need_parents() {
        let member = TargetKey::new("5", Some("1".into()));
        assert_eq!(
            TargetKind::Member.fetch_path(&member).as_deref(),
            Some("/guilds/1/members/5")
        );
        assert_eq!(TargetKind::Member.fetch_path(&TargetKey::new("5", None)), None);
        assert_eq!(
            TargetKind::Invite.fetch_path(&TargetKey::new("abc", None)).as_deref(),
            Some("/invites/abc")
        );
    }

    #[test]
    fn test_merged_over_prefers_item_ids() {
        let mut base = InvocationContext::default();
        base.set(TargetKind::Guild, "1");
        base.set(TargetKind::Channel, "2");
        let mut item = InvocationContext::default();
        item.set(TargetKind::Channel, "3");

        let merged = item.merged_over(&base);
        assert_eq!(merged.get(TargetKind::Guild), Some("1"));
        assert_eq!(merged.get(TargetKind::Channel), Some("3"));
    }

    #[test]
    fn test_expand_orders_dependencies_first() {
        let needs = ContextResolver::expand(&[
            Need::target(TargetKind::Member),
            Need::id_only(TargetKind::Guild, RequirementOrigin::Route),
        ]);
        assert_eq!(needs.len(), 2);
        assert_eq!(needs[0].kind, TargetKind::Guild);
        assert!(!needs[0].fetch);
        assert_eq!(needs[1].kind, TargetKind::Member);
        assert!(needs[1].fetch);
    }

    #[tokio::test]
    async fn test_resolve_cache_then_fetch() {
        let conn = InMemoryConnection::new()
            .with_cached(TargetKind::Channel, "10", json!({"id": "10", "name": "general"}))
            .with_remote(TargetKind::Message, "99", json!({"id": "99", "content": "hi"}));
        let mut ctx = InvocationContext::default();
        ctx.set(TargetKind::Channel, "10");
        ctx.set(TargetKind::Message, "99");

        let resolver = ContextResolver::default();
        let resolved = resolver
            .resolve(&ctx, &[Need::target(TargetKind::Channel), Need::target(TargetKind::Message)], &conn, true)
            .await
            .unwrap();

        assert_eq!(resolved.target(TargetKind::Channel).unwrap().source, ResolutionSource::Cache);
        assert_eq!(resolved.target(TargetKind::Message).unwrap().source, ResolutionSource::Fetch);
        assert_eq!(conn.fetches(), vec![(TargetKind::Message, "99".to_string())]);
    }

    #[tokio::test]
    async fn test_default_guild_applies_to_member_dependency() {
        let conn = InMemoryConnection::new().with_remote(TargetKind::Member, "5", json!({"user": {"id": "5"}}));
        let mut ctx = InvocationContext::default();
        ctx.set(TargetKind::Member, "5");

        let resolver = ContextResolver::new(Some("777".into()));
        let resolved = resolver
            .resolve(&ctx, &[Need::target(TargetKind::Member)], &conn, true)
            .await
            .unwrap();
        assert_eq!(resolved.ids.get(&TargetKind::Guild).map(String::as_str), Some("777"));
        assert_eq!(resolved.requirements[0].id_source, Some(IdSource::Default));
    }

    #[tokio::test]
    async fn test_missing_guild_is_unresolved() {
        let conn = InMemoryConnection::new();
        let mut ctx = InvocationContext::default();
        ctx.set(TargetKind::Role, "3");
        let resolver = ContextResolver::default();

        let err = resolver
            .resolve(&ctx, &[Need::target(TargetKind::Role)], &conn, true)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "unresolved_target");

        // soft mode reports instead of failing
        let report = resolver
            .resolve(&ctx, &[Need::target(TargetKind::Role)], &conn, false)
            .await
            .unwrap();
        assert!(!report.is_satisfied());
        assert_eq!(report.requirements.len(), 2);
        assert_eq!(report.requirements[1].resolved, Some(false));
    }

    #[tokio::test]
    async fn test_thread_stands_in_for_channel() {
        let conn = InMemoryConnection::new().with_remote(TargetKind::Message, "9", json!({"id": "9"}));
        let mut ctx = InvocationContext::default();
        ctx.set(TargetKind::Thread, "44");
        ctx.set(TargetKind::Message, "9");

        let resolved = ContextResolver::default()
            .resolve(&ctx, &[Need::target(TargetKind::Message)], &conn, true)
            .await
            .unwrap();
        assert_eq!(resolved.ids.get(&TargetKind::Channel).map(String::as_str), Some("44"));
        assert_eq!(resolved.requirements[0].id_source, Some(IdSource::Thread));
    }
}
